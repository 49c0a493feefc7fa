//! Per-request context
//!
//! Everything a resolver, enumerator or mutation needs besides the node
//! table: the repository, the access policy bound to the caller, what the
//! request intends to do, and where the caller's scratch files live.

use core_types::{EntityRef, PageRef, RequestId};
use log::debug;
use policy::{AccessPolicy, Right};
use services_storage::Repository;

use crate::config::ViewConfig;
use crate::error::ViewError;
use crate::grouping::GroupingStrategy;

/// What a move request moves, once its source has been resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MoveSource {
    /// The source itself is being resolved
    #[default]
    Unknown,
    Page,
    Space,
    Attachment,
}

/// What the request is going to do with the path it resolves
///
/// Decoding the last token depends on it: a token that names nothing yet is
/// a new attachment for a file upload, a new page for a directory creation,
/// and an error for a read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Intent {
    #[default]
    Read,
    CreateCollection,
    CreateFile,
    Move(MoveSource),
    Delete,
}

impl Intent {
    pub fn is_create_file(&self) -> bool {
        matches!(self, Intent::CreateFile)
    }

    pub fn is_create_collection(&self) -> bool {
        matches!(self, Intent::CreateCollection)
    }

    pub fn is_move(&self) -> bool {
        matches!(self, Intent::Move(_))
    }

    /// True for any request that may name a node that does not exist yet
    pub fn is_create_or_move(&self) -> bool {
        matches!(
            self,
            Intent::CreateFile | Intent::CreateCollection | Intent::Move(_)
        )
    }

    /// Returns what is being moved, None for other requests
    pub fn move_source(&self) -> Option<MoveSource> {
        match self {
            Intent::Move(source) => Some(*source),
            _ => None,
        }
    }
}

/// The user a request runs for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub name: String,
    /// The user's own profile page, which cannot be renamed through the view
    pub profile_page: Option<PageRef>,
}

impl Principal {
    pub fn anonymous() -> Self {
        Self {
            name: "anonymous".to_string(),
            profile_page: None,
        }
    }

    pub fn user(name: impl Into<String>, profile_page: PageRef) -> Self {
        Self {
            name: name.into(),
            profile_page: Some(profile_page),
        }
    }

    /// Returns true if `page` is this user's profile page
    pub fn owns_profile(&self, page: &PageRef) -> bool {
        self.profile_page.as_ref() == Some(page)
    }
}

/// Scratch files of one user, keyed by full path
///
/// Editors and file managers create hidden and backup files next to the
/// files they edit. These are kept out of the repository.
pub trait TempStore: Send + Sync {
    /// Returns the names of the temp files directly under `scope`
    fn names_under(&self, scope: &str) -> Vec<String>;

    fn contains(&self, path: &str) -> bool;

    fn read(&self, path: &str) -> Option<Vec<u8>>;

    fn write(&self, path: &str, data: Vec<u8>);

    /// Returns true if a file was removed
    fn remove(&self, path: &str) -> bool;
}

/// Answers access questions, deriving `overwrite` from repository state
#[derive(Clone, Copy)]
pub struct AccessChecker<'a> {
    policy: &'a dyn AccessPolicy,
    repository: &'a dyn Repository,
}

impl<'a> AccessChecker<'a> {
    pub fn new(policy: &'a dyn AccessPolicy, repository: &'a dyn Repository) -> Self {
        Self { policy, repository }
    }

    /// Returns true if the right is held on the target
    ///
    /// `Overwrite` on a page means `Delete` if the page exists and `Edit`
    /// otherwise. On any other entity it means `Edit`.
    pub fn has_access(&self, right: Right, target: &EntityRef) -> bool {
        let effective = match (right, target) {
            (Right::Overwrite, EntityRef::Page(page)) => {
                if self.repository.document_exists(page) {
                    Right::Delete
                } else {
                    Right::Edit
                }
            }
            (Right::Overwrite, _) => Right::Edit,
            (other, _) => other,
        };
        let granted = self.policy.has_access(effective, target);
        if !granted {
            debug!(
                "{} refused {} ({}) on {}",
                self.policy.name(),
                right,
                effective,
                target
            );
        }
        granted
    }

    /// Like [`has_access`](Self::has_access), but fails with `Forbidden`
    pub fn check(&self, right: Right, target: impl Into<EntityRef>) -> Result<(), ViewError> {
        let target = target.into();
        if self.has_access(right, &target) {
            Ok(())
        } else {
            Err(ViewError::Forbidden {
                right,
                target: target.to_string(),
            })
        }
    }

    /// Returns true if the caller may see the page
    pub fn can_view(&self, page: &PageRef) -> bool {
        self.has_access(Right::View, &EntityRef::Page(page.clone()))
    }
}

/// Context of one request
pub struct RequestContext<'a> {
    pub id: RequestId,
    pub repository: &'a dyn Repository,
    pub intent: Intent,
    pub principal: Principal,
    pub config: &'a ViewConfig,
    policy: &'a dyn AccessPolicy,
    temp_store: Option<&'a dyn TempStore>,
}

impl<'a> RequestContext<'a> {
    /// Creates a read context for an anonymous caller
    pub fn new(
        repository: &'a dyn Repository,
        policy: &'a dyn AccessPolicy,
        config: &'a ViewConfig,
    ) -> Self {
        Self {
            id: RequestId::new(),
            repository,
            intent: Intent::Read,
            principal: Principal::anonymous(),
            config,
            policy,
            temp_store: None,
        }
    }

    pub fn with_intent(mut self, intent: Intent) -> Self {
        self.intent = intent;
        self
    }

    pub fn with_principal(mut self, principal: Principal) -> Self {
        self.principal = principal;
        self
    }

    pub fn with_temp_store(mut self, store: &'a dyn TempStore) -> Self {
        self.temp_store = Some(store);
        self
    }

    pub fn access(&self) -> AccessChecker<'a> {
        AccessChecker::new(self.policy, self.repository)
    }

    pub fn grouping(&self) -> GroupingStrategy {
        GroupingStrategy::new(self.config.grouping)
    }

    pub fn temp_store(&self) -> Option<&'a dyn TempStore> {
        self.temp_store
    }

    /// Returns the temp store or fails the request
    pub fn require_temp_store(&self) -> Result<&'a dyn TempStore, ViewError> {
        self.temp_store
            .ok_or_else(|| ViewError::bad_request("no session to keep temporary files in"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_types::SpaceRef;
    use policy::{GrantTable, Scope};
    use services_storage::InMemoryRepository;

    fn main_page(name: &str) -> PageRef {
        PageRef::new(name, SpaceRef::new("Main"))
    }

    #[test]
    fn test_intent_predicates() {
        assert!(Intent::CreateFile.is_create_or_move());
        assert!(Intent::Move(MoveSource::Unknown).is_create_or_move());
        assert!(!Intent::Read.is_create_or_move());
        assert!(!Intent::Delete.is_create_or_move());
        assert_eq!(
            Intent::Move(MoveSource::Attachment).move_source(),
            Some(MoveSource::Attachment)
        );
        assert_eq!(Intent::Delete.move_source(), None);
    }

    #[test]
    fn test_overwrite_is_delete_on_existing_page() {
        let repo = InMemoryRepository::new();
        repo.add_page(main_page("A"), None).unwrap();
        let table = GrantTable::permissive().deny(Right::Delete, Scope::Wiki);
        let access = AccessChecker::new(&table, &repo);

        assert!(!access.has_access(Right::Overwrite, &main_page("A").into()));
        assert!(access.has_access(Right::Overwrite, &main_page("B").into()));
    }

    #[test]
    fn test_overwrite_is_edit_on_missing_page() {
        let repo = InMemoryRepository::new();
        let table = GrantTable::permissive().deny(Right::Edit, Scope::Wiki);
        let access = AccessChecker::new(&table, &repo);

        let err = access.check(Right::Overwrite, main_page("B")).unwrap_err();
        assert!(matches!(err, ViewError::Forbidden { right: Right::Overwrite, .. }));
    }

    #[test]
    fn test_principal_profile() {
        let profile = PageRef::new("alice", SpaceRef::new("XWiki"));
        let alice = Principal::user("alice", profile.clone());
        assert!(alice.owns_profile(&profile));
        assert!(!Principal::anonymous().owns_profile(&profile));
    }
}
