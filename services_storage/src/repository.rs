//! Repository port
//!
//! Every query and write the wiki view needs from the document store.

use core_types::{AttachmentRef, PageRef, RefError, SpaceRef};
use thiserror::Error;

use crate::Document;

/// Errors reported by a repository
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// The entity does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// The reference cannot address a stored entity
    #[error("Invalid reference: {0}")]
    InvalidReference(#[from] RefError),

    /// The backend failed to execute the query or write
    #[error("Backend failure: {0}")]
    Backend(String),
}

/// The document repository as seen by the wiki view
///
/// Implementations must be safe to share between request workers. Each
/// method is its own unit of work; callers get no atomicity across calls.
pub trait Repository: Send + Sync {
    /// Returns true if the page has been saved
    fn document_exists(&self, page: &PageRef) -> bool;

    /// Returns true if the space exists
    fn space_exists(&self, space: &SpaceRef) -> bool;

    /// Fetches a snapshot of the page
    ///
    /// An absent page yields a new, unsaved document.
    fn get_document(&self, page: &PageRef) -> Result<Document, StorageError>;

    /// Creates or updates a page from a snapshot
    fn save_document(&self, document: &Document) -> Result<(), StorageError>;

    /// Deletes a page and its attachments
    fn delete_document(&self, page: &PageRef) -> Result<(), StorageError>;

    /// Renames a page, replacing any page already at `destination`
    fn rename_document(&self, page: &PageRef, destination: &PageRef) -> Result<(), StorageError>;

    /// Lists the pages living directly in a space
    fn child_pages_of_space(&self, space: &SpaceRef) -> Result<Vec<PageRef>, StorageError>;

    /// Lists the pages whose legacy parent is `page`
    fn child_pages_of_page(&self, page: &PageRef) -> Result<Vec<PageRef>, StorageError>;

    /// Lists the pages of a space whose uppercased name starts with `prefix`
    fn child_pages_with_prefix(
        &self,
        space: &SpaceRef,
        prefix: &str,
    ) -> Result<Vec<PageRef>, StorageError>;

    /// Lists the names of the spaces nested directly in `space`
    fn child_spaces(&self, space: &SpaceRef) -> Result<Vec<String>, StorageError>;

    /// Lists the names of the top-level spaces
    fn root_spaces(&self) -> Result<Vec<String>, StorageError>;

    /// Lists every space, nested ones included
    fn all_spaces(&self) -> Result<Vec<SpaceRef>, StorageError>;

    /// Lists the attachment file names of a page
    fn attachments_for_page(&self, page: &PageRef) -> Result<Vec<String>, StorageError>;

    /// Lists the pages of a space that hold at least one attachment
    fn pages_with_attachments_in_space(
        &self,
        space: &SpaceRef,
    ) -> Result<Vec<PageRef>, StorageError>;

    /// Lists the pages whose legacy parent is not an existing page
    fn orphan_pages(&self) -> Result<Vec<PageRef>, StorageError>;

    /// Reads the bytes of an attachment
    fn attachment_content(&self, attachment: &AttachmentRef) -> Result<Vec<u8>, StorageError>;

    /// Creates or replaces an attachment, creating its page if needed
    fn save_attachment(&self, attachment: &AttachmentRef, data: &[u8])
        -> Result<(), StorageError>;

    /// Deletes an attachment
    fn delete_attachment(&self, attachment: &AttachmentRef) -> Result<(), StorageError>;

    /// Moves (and possibly renames) an attachment to another page
    fn move_attachment(
        &self,
        attachment: &AttachmentRef,
        destination: &AttachmentRef,
    ) -> Result<(), StorageError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_error_from_ref_error() {
        let err: StorageError = RefError::MissingSpace("A".to_string()).into();
        assert!(matches!(err, StorageError::InvalidReference(_)));
        assert!(format!("{}", err).contains("no enclosing space"));
    }
}
