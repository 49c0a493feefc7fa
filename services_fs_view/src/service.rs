//! Wiki View Service implementation
//!
//! Every call builds a fresh node table, resolves its path(s) against the
//! repository, and drops the table when it returns.

use std::sync::Arc;

use core_types::EntityRef;
use fs_view::{
    file_content, members, resolve_path, DirectoryEntry, Intent, MoveSource, NodeId, NodeKind,
    NodeTable, RequestContext, ViewConfig, ViewError,
};
use log::debug;
use policy::Right;
use services_storage::Repository;

use crate::mutation::{add_member, move_node, remove_member};
use crate::operations::{Caller, StatInfo, WikiViewOperations};
use crate::session::SessionStore;

/// The Wiki View Service
pub struct WikiViewService {
    repository: Arc<dyn Repository>,
    config: ViewConfig,
    sessions: SessionStore,
}

impl WikiViewService {
    /// Creates a service with a session store sized from `config`
    pub fn new(repository: Arc<dyn Repository>, config: ViewConfig) -> Self {
        let sessions = SessionStore::from_config(&config);
        Self::with_sessions(repository, config, sessions)
    }

    pub fn with_sessions(
        repository: Arc<dyn Repository>,
        config: ViewConfig,
        sessions: SessionStore,
    ) -> Self {
        Self {
            repository,
            config,
            sessions,
        }
    }

    pub fn config(&self) -> &ViewConfig {
        &self.config
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Runs one request against a fresh node table
    fn request<T>(
        &self,
        caller: Caller<'_>,
        intent: Intent,
        f: impl FnOnce(&mut NodeTable, &RequestContext<'_>) -> Result<T, ViewError>,
    ) -> Result<T, ViewError> {
        let storage = self.sessions.get_or_create(&caller.principal.name);
        let ctx = RequestContext::new(self.repository.as_ref(), caller.policy, &self.config)
            .with_intent(intent)
            .with_principal(caller.principal.clone())
            .with_temp_store(storage.as_ref());
        debug!("{}: {:?} for {}", ctx.id, intent, caller.principal.name);

        let mut table = NodeTable::new();
        let result = f(&mut table, &ctx);
        if let Err(err) = &result {
            debug!("{}: failed with {}", ctx.id, err);
        }
        result
    }

    fn parent_of(table: &NodeTable, id: NodeId) -> Result<NodeId, ViewError> {
        table
            .parent(id)
            .ok_or_else(|| ViewError::MethodNotAllowed("the root cannot be changed".to_string()))
    }

    fn check_readable(
        ctx: &RequestContext<'_>,
        table: &NodeTable,
        id: NodeId,
    ) -> Result<(), ViewError> {
        match table.reference(id) {
            Some(reference @ (EntityRef::Page(_) | EntityRef::Attachment(_))) => {
                ctx.access().check(Right::View, reference)
            }
            _ => Ok(()),
        }
    }
}

impl WikiViewOperations for WikiViewService {
    fn ls(&self, caller: Caller<'_>, path: &str) -> Result<Vec<DirectoryEntry>, ViewError> {
        self.request(caller, Intent::Read, |table, ctx| {
            let id = resolve_path(table, ctx, path)?;
            if !table.kind(id).capabilities().is_collection {
                return Err(ViewError::BadRequest(format!("{} is not a collection", path)));
            }
            let children = members(table, ctx, id);
            Ok(children
                .into_iter()
                .map(|child| DirectoryEntry::from_node(table, child))
                .collect())
        })
    }

    fn stat(&self, caller: Caller<'_>, path: &str) -> Result<StatInfo, ViewError> {
        self.request(caller, Intent::Read, |table, ctx| {
            let id = resolve_path(table, ctx, path)?;
            Self::check_readable(ctx, table, id)?;
            let exists = table.exists(ctx, id);

            let (created_at, updated_at) = match table.kind(id) {
                NodeKind::Page { .. } | NodeKind::WikiFile { .. } if exists => {
                    let document = table.document(ctx.repository, id)?;
                    (Some(document.created_at), Some(document.updated_at))
                }
                _ => (None, None),
            };
            let size = if exists && !table.kind(id).capabilities().is_collection {
                Some(file_content(table, ctx, id)?.len())
            } else {
                None
            };

            Ok(StatInfo {
                entry: DirectoryEntry::from_node(table, id),
                exists,
                size,
                created_at,
                updated_at,
            })
        })
    }

    fn read(&self, caller: Caller<'_>, path: &str) -> Result<Vec<u8>, ViewError> {
        self.request(caller, Intent::Read, |table, ctx| {
            let id = resolve_path(table, ctx, path)?;
            Self::check_readable(ctx, table, id)?;
            file_content(table, ctx, id)
        })
    }

    fn mkcol(&self, caller: Caller<'_>, path: &str) -> Result<(), ViewError> {
        self.request(caller, Intent::CreateCollection, |table, ctx| {
            let id = resolve_path(table, ctx, path)?;
            if table.exists(ctx, id) {
                return Err(ViewError::MethodNotAllowed(format!("{} already exists", path)));
            }
            let parent = Self::parent_of(table, id)?;
            add_member(table, ctx, parent, id, None)
        })
    }

    fn put(&self, caller: Caller<'_>, path: &str, data: &[u8]) -> Result<(), ViewError> {
        self.request(caller, Intent::CreateFile, |table, ctx| {
            let id = resolve_path(table, ctx, path)?;
            if table.kind(id).capabilities().is_collection {
                return Err(ViewError::MethodNotAllowed(format!(
                    "{} is a collection",
                    path
                )));
            }
            let parent = Self::parent_of(table, id)?;
            add_member(table, ctx, parent, id, Some(data))
        })
    }

    fn delete(&self, caller: Caller<'_>, path: &str) -> Result<(), ViewError> {
        self.request(caller, Intent::Delete, |table, ctx| {
            let id = resolve_path(table, ctx, path)?;
            if !table.kind(id).capabilities().can_remove {
                return Err(ViewError::MethodNotAllowed(format!("{} cannot be removed", path)));
            }
            let parent = Self::parent_of(table, id)?;
            remove_member(table, ctx, parent, id)
        })
    }

    fn rename(&self, caller: Caller<'_>, from: &str, to: &str) -> Result<(), ViewError> {
        let moving = self.request(caller, Intent::Move(MoveSource::Unknown), |table, ctx| {
            let source = resolve_path(table, ctx, from)?;
            Ok(match table.kind(source) {
                NodeKind::Page { .. } => MoveSource::Page,
                NodeKind::SpaceGroup { .. } => MoveSource::Space,
                NodeKind::Attachment { .. } => MoveSource::Attachment,
                _ => MoveSource::Unknown,
            })
        })?;

        self.request(caller, Intent::Move(moving), |table, ctx| {
            let source = resolve_path(table, ctx, from)?;
            let destination = resolve_path(table, ctx, to)?;
            move_node(table, ctx, source, destination)
        })
    }
}
