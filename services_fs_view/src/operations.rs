//! Wiki view operations
//!
//! This module defines the operations a protocol front end performs on the
//! wiki view, one per request.

use fs_view::{DirectoryEntry, Principal, ViewError};
use policy::AccessPolicy;
use serde::Serialize;

/// Who is asking
///
/// The policy is already bound to the principal; the view only asks it
/// questions.
#[derive(Clone, Copy)]
pub struct Caller<'a> {
    pub principal: &'a Principal,
    pub policy: &'a dyn AccessPolicy,
}

impl<'a> Caller<'a> {
    pub fn new(principal: &'a Principal, policy: &'a dyn AccessPolicy) -> Self {
        Self { principal, policy }
    }
}

/// Metadata about a node
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatInfo {
    pub entry: DirectoryEntry,
    /// Whether the entity behind the node exists
    pub exists: bool,
    /// Size in bytes (files only)
    pub size: Option<usize>,
    /// Creation time of the page (pages and wiki files only)
    pub created_at: Option<u64>,
    /// Last update time of the page (pages and wiki files only)
    pub updated_at: Option<u64>,
}

/// Wiki view operations trait
pub trait WikiViewOperations {
    /// List a collection
    ///
    /// Entries the caller may not view are left out.
    fn ls(&self, caller: Caller<'_>, path: &str) -> Result<Vec<DirectoryEntry>, ViewError>;

    /// Get metadata about the node at `path`
    fn stat(&self, caller: Caller<'_>, path: &str) -> Result<StatInfo, ViewError>;

    /// Read the content of a file
    fn read(&self, caller: Caller<'_>, path: &str) -> Result<Vec<u8>, ViewError>;

    /// Create a collection (a space or a page)
    fn mkcol(&self, caller: Caller<'_>, path: &str) -> Result<(), ViewError>;

    /// Create or replace a file
    fn put(&self, caller: Caller<'_>, path: &str, data: &[u8]) -> Result<(), ViewError>;

    /// Remove the node at `path`
    fn delete(&self, caller: Caller<'_>, path: &str) -> Result<(), ViewError>;

    /// Move (rename) the node at `from` to `to`
    fn rename(&self, caller: Caller<'_>, from: &str, to: &str) -> Result<(), ViewError>;
}
