//! Tree nodes
//!
//! Nodes live in a [`NodeTable`] created for one request. A node points to
//! its parent by [`NodeId`], so the chain from any node back to the root is
//! acyclic by construction and dies with the table.

use std::cell::OnceCell;

use core_types::{AttachmentRef, EntityRef, PageRef, SpaceRef};
use services_storage::{Document, Repository};

use crate::consts::{ATTACHMENTS_VIEW, ORPHANS_VIEW, PAGES_VIEW, WIKI_TXT, WIKI_XML};
use crate::context::RequestContext;
use crate::error::ViewError;
use crate::grouping::GroupName;

/// Index of a node in its table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// Which base view a space directory belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewKind {
    /// Spaces, nested spaces and their pages
    Pages,
    /// Pages holding attachments, per space
    Attachments,
}

/// Format of a page file view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WikiFileFormat {
    Text,
    Xml,
}

impl WikiFileFormat {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            WIKI_TXT => Some(WikiFileFormat::Text),
            WIKI_XML => Some(WikiFileFormat::Xml),
            _ => None,
        }
    }

    pub fn file_name(&self) -> &'static str {
        match self {
            WikiFileFormat::Text => WIKI_TXT,
            WikiFileFormat::Xml => WIKI_XML,
        }
    }
}

/// What a node stands for
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NodeKind {
    WikiRoot,
    RootGroup { view: ViewKind },
    OrphanGroup,
    SpaceGroup { space: SpaceRef, view: ViewKind },
    PageLetterGroup { space: SpaceRef, group: GroupName },
    AttachmentLetterGroup { space: SpaceRef, group: GroupName },
    Page { page: PageRef },
    Attachment { attachment: AttachmentRef },
    WikiFile { page: PageRef, format: WikiFileFormat },
    TempFile { name: String },
}

/// What can be done with a node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// Tokens can be decoded below it
    pub can_decode: bool,
    pub is_collection: bool,
    /// It accepts new children
    pub can_add_member: bool,
    /// Its parent may remove it
    pub can_remove: bool,
    pub can_move: bool,
}

impl NodeKind {
    /// Returns the name the node is listed under
    pub fn display_name(&self) -> String {
        match self {
            NodeKind::WikiRoot => String::new(),
            NodeKind::RootGroup {
                view: ViewKind::Pages,
            } => PAGES_VIEW.to_string(),
            NodeKind::RootGroup {
                view: ViewKind::Attachments,
            } => ATTACHMENTS_VIEW.to_string(),
            NodeKind::OrphanGroup => ORPHANS_VIEW.to_string(),
            NodeKind::SpaceGroup {
                space,
                view: ViewKind::Pages,
            } => space.name().to_string(),
            NodeKind::SpaceGroup {
                space,
                view: ViewKind::Attachments,
            } => space.to_string(),
            NodeKind::PageLetterGroup { group, .. }
            | NodeKind::AttachmentLetterGroup { group, .. } => group.name(),
            NodeKind::Page { page } => page.to_string(),
            NodeKind::Attachment { attachment } => attachment.filename().to_string(),
            NodeKind::WikiFile { format, .. } => format.file_name().to_string(),
            NodeKind::TempFile { name } => name.clone(),
        }
    }

    pub fn capabilities(&self) -> Capabilities {
        let (can_decode, is_collection, can_add_member, can_remove, can_move) = match self {
            NodeKind::WikiRoot | NodeKind::OrphanGroup => (true, true, true, false, false),
            NodeKind::RootGroup {
                view: ViewKind::Pages,
            } => (true, true, true, false, false),
            NodeKind::RootGroup {
                view: ViewKind::Attachments,
            } => (true, true, true, false, false),
            NodeKind::SpaceGroup {
                view: ViewKind::Pages,
                ..
            } => (true, true, true, true, true),
            NodeKind::SpaceGroup {
                view: ViewKind::Attachments,
                ..
            } => (true, true, true, false, false),
            NodeKind::PageLetterGroup { .. } => (true, true, true, true, false),
            NodeKind::AttachmentLetterGroup { .. } => (true, true, true, false, false),
            NodeKind::Page { .. } => (true, true, true, true, true),
            NodeKind::Attachment { .. } => (false, false, false, true, true),
            NodeKind::WikiFile { .. } | NodeKind::TempFile { .. } => {
                (false, false, false, true, false)
            }
        };
        Capabilities {
            can_decode,
            is_collection,
            can_add_member,
            can_remove,
            can_move,
        }
    }

    /// Returns the entity behind the node, None for purely virtual nodes
    pub fn reference(&self) -> Option<EntityRef> {
        match self {
            NodeKind::WikiRoot
            | NodeKind::RootGroup { .. }
            | NodeKind::OrphanGroup
            | NodeKind::TempFile { .. } => None,
            NodeKind::SpaceGroup { space, .. }
            | NodeKind::PageLetterGroup { space, .. }
            | NodeKind::AttachmentLetterGroup { space, .. } => {
                Some(EntityRef::Space(space.clone()))
            }
            NodeKind::Page { page } | NodeKind::WikiFile { page, .. } => {
                Some(EntityRef::Page(page.clone()))
            }
            NodeKind::Attachment { attachment } => Some(EntityRef::Attachment(attachment.clone())),
        }
    }

    /// Returns the space of a space directory or letter group
    pub fn space(&self) -> Option<&SpaceRef> {
        match self {
            NodeKind::SpaceGroup { space, .. }
            | NodeKind::PageLetterGroup { space, .. }
            | NodeKind::AttachmentLetterGroup { space, .. } => Some(space),
            _ => None,
        }
    }

    /// Returns the page of a page node
    pub fn page(&self) -> Option<&PageRef> {
        match self {
            NodeKind::Page { page } => Some(page),
            _ => None,
        }
    }
}

/// One node of the request tree
#[derive(Debug)]
pub struct Node {
    pub kind: NodeKind,
    name: String,
    relative_path: String,
    parent: Option<NodeId>,
    document: OnceCell<Document>,
}

impl Node {
    /// Returns the listed name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the path segment this node adds to its parent's path
    pub fn relative_path(&self) -> &str {
        &self.relative_path
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }
}

/// Request-scoped node arena
#[derive(Debug)]
pub struct NodeTable {
    nodes: Vec<Node>,
}

impl NodeTable {
    /// Creates a table holding the wiki root
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                kind: NodeKind::WikiRoot,
                name: String::new(),
                relative_path: String::new(),
                parent: None,
                document: OnceCell::new(),
            }],
        }
    }

    /// Returns the wiki root
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Returns a node
    ///
    /// # Panics
    ///
    /// Panics if `id` was handed out by another table.
    pub fn get(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.get(id).kind
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).parent
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Adds a child node below `parent`
    ///
    /// `segment` is the token the child is reached by. Structural
    /// invariants of the kind are checked here.
    pub fn insert(
        &mut self,
        parent: NodeId,
        kind: NodeKind,
        segment: &str,
    ) -> Result<NodeId, ViewError> {
        self.validate(parent, &kind)?;
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            name: kind.display_name(),
            kind,
            relative_path: format!("/{}", segment),
            parent: Some(parent),
            document: OnceCell::new(),
        });
        Ok(id)
    }

    /// Adds a child reached by its display name
    pub fn insert_named(&mut self, parent: NodeId, kind: NodeKind) -> Result<NodeId, ViewError> {
        let segment = kind.display_name();
        self.insert(parent, kind, &segment)
    }

    fn validate(&self, parent: NodeId, kind: &NodeKind) -> Result<(), ViewError> {
        let parent_kind = self.kind(parent);
        match kind {
            NodeKind::WikiRoot => Err(ViewError::internal("the wiki root cannot be nested")),
            NodeKind::Page { page } => {
                page.require_space()?;
                Ok(())
            }
            NodeKind::PageLetterGroup { space, .. } => match parent_kind {
                NodeKind::SpaceGroup {
                    space: parent_space,
                    view: ViewKind::Pages,
                } if parent_space == space => Ok(()),
                _ => Err(ViewError::internal(format!(
                    "letter group of {} must sit in its pages directory",
                    space
                ))),
            },
            NodeKind::AttachmentLetterGroup { space, .. } => match parent_kind {
                NodeKind::SpaceGroup {
                    space: parent_space,
                    view: ViewKind::Attachments,
                } if parent_space == space => Ok(()),
                _ => Err(ViewError::internal(format!(
                    "attachment group of {} must sit in its attachments directory",
                    space
                ))),
            },
            NodeKind::SpaceGroup { space, .. } if !space.is_well_formed() => Err(
                ViewError::bad_request(format!("{:?} is not a valid space", space.to_string())),
            ),
            _ => Ok(()),
        }
    }

    /// Returns the full path of a node
    pub fn path(&self, id: NodeId) -> String {
        let mut segments = Vec::new();
        let mut current = Some(id);
        while let Some(node_id) = current {
            let node = self.get(node_id);
            segments.push(node.relative_path.as_str());
            current = node.parent;
        }
        let path: String = segments.into_iter().rev().collect();
        if path.is_empty() {
            "/".to_string()
        } else {
            path
        }
    }

    /// Iterates from `id` up to the root, `id` included
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(Some(id), move |current| self.parent(*current))
    }

    /// Describes the chain from the root down to `id`
    ///
    /// Two resolutions of the same path produce equal descriptions.
    pub fn describe(&self, id: NodeId) -> Vec<(NodeKind, String)> {
        let mut chain: Vec<_> = self
            .ancestors(id)
            .map(|node_id| {
                let node = self.get(node_id);
                (node.kind.clone(), node.relative_path.clone())
            })
            .collect();
        chain.reverse();
        chain
    }

    pub fn reference(&self, id: NodeId) -> Option<EntityRef> {
        self.kind(id).reference()
    }

    /// Returns the closest enclosing node that is not a letter group
    ///
    /// Letter groups hand their mutations to the space directory they
    /// bucket.
    pub fn semantic_parent(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        match self.kind(parent) {
            NodeKind::PageLetterGroup { .. } | NodeKind::AttachmentLetterGroup { .. } => {
                self.semantic_parent(parent)
            }
            _ => Some(parent),
        }
    }

    /// Returns true if the entity behind the node exists
    pub fn exists(&self, ctx: &RequestContext<'_>, id: NodeId) -> bool {
        let repository = ctx.repository;
        match self.kind(id) {
            NodeKind::WikiRoot | NodeKind::RootGroup { .. } | NodeKind::OrphanGroup => true,
            NodeKind::SpaceGroup { space, .. } => repository.space_exists(space),
            NodeKind::PageLetterGroup { space, group } => repository
                .child_pages_with_prefix(space, group.key())
                .map(|pages| !pages.is_empty())
                .unwrap_or(false),
            NodeKind::AttachmentLetterGroup { space, group } => repository
                .pages_with_attachments_in_space(space)
                .map(|pages| pages.iter().any(|page| group.matches(page.name())))
                .unwrap_or(false),
            NodeKind::Page { page } | NodeKind::WikiFile { page, .. } => {
                repository.document_exists(page)
            }
            NodeKind::Attachment { attachment } => repository
                .attachments_for_page(attachment.page())
                .map(|files| files.iter().any(|f| f == attachment.filename()))
                .unwrap_or(false),
            NodeKind::TempFile { .. } => ctx
                .temp_store()
                .map_or(false, |store| store.contains(&self.path(id))),
        }
    }

    /// Returns the snapshot of a page node, fetching it on first use
    pub fn document(&self, repository: &dyn Repository, id: NodeId) -> Result<&Document, ViewError> {
        let node = self.get(id);
        let page = match &node.kind {
            NodeKind::Page { page } | NodeKind::WikiFile { page, .. } => page,
            other => {
                return Err(ViewError::internal(format!(
                    "{} has no document",
                    other.display_name()
                )))
            }
        };
        if let Some(document) = node.document.get() {
            return Ok(document);
        }
        let document = repository.get_document(page)?;
        Ok(node.document.get_or_init(|| document))
    }

    /// Drops the cached snapshot of a node
    pub fn invalidate(&mut self, id: NodeId) {
        self.nodes[id.0].document = OnceCell::new();
    }
}

impl Default for NodeTable {
    fn default() -> Self {
        Self::new()
    }
}
