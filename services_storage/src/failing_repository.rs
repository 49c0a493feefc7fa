//! # Failing Repository
//!
//! A Repository wrapper that can simulate write failures for testing how
//! multi-step mutations behave when storage gives out halfway through.
//! Reads always pass through.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use core_types::{AttachmentRef, PageRef, SpaceRef};
use log::warn;

use crate::{Document, Repository, StorageError};

/// Policy for when failures should occur
#[derive(Debug, Clone)]
pub enum FailurePolicy {
    /// Never fail (passthrough)
    Never,
    /// Fail every write once N writes have succeeded
    AfterWrites(usize),
    /// Fail writes touching specific pages
    OnPages(Vec<PageRef>),
}

/// Wrapper around a Repository that can simulate failures
pub struct FailingRepository<R: Repository> {
    inner: R,
    policy: Mutex<FailurePolicy>,
    write_count: AtomicUsize,
}

impl<R: Repository> FailingRepository<R> {
    /// Create a new failing repository with the given policy
    pub fn new(inner: R, policy: FailurePolicy) -> Self {
        Self {
            inner,
            policy: Mutex::new(policy),
            write_count: AtomicUsize::new(0),
        }
    }

    /// Get the underlying repository (for inspection)
    pub fn inner(&self) -> &R {
        &self.inner
    }

    /// Get the number of writes that have succeeded
    pub fn write_count(&self) -> usize {
        self.write_count.load(Ordering::SeqCst)
    }

    /// Reset the failure policy
    pub fn set_policy(&self, policy: FailurePolicy) {
        if let Ok(mut current) = self.policy.lock() {
            *current = policy;
        }
        self.write_count.store(0, Ordering::SeqCst);
    }

    /// Runs a write unless the policy says it should fail
    fn write<T>(
        &self,
        page: &PageRef,
        op: impl FnOnce(&R) -> Result<T, StorageError>,
    ) -> Result<T, StorageError> {
        let should_fail = match &*self
            .policy
            .lock()
            .map_err(|_| StorageError::Backend("failure policy lock poisoned".to_string()))?
        {
            FailurePolicy::Never => false,
            FailurePolicy::AfterWrites(n) => self.write_count() >= *n,
            FailurePolicy::OnPages(pages) => pages.contains(page),
        };
        if should_fail {
            warn!("injected write failure on {}", page);
            return Err(StorageError::Backend(format!(
                "injected write failure on {}",
                page
            )));
        }

        let result = op(&self.inner)?;
        self.write_count.fetch_add(1, Ordering::SeqCst);
        Ok(result)
    }
}

impl<R: Repository> Repository for FailingRepository<R> {
    fn document_exists(&self, page: &PageRef) -> bool {
        self.inner.document_exists(page)
    }

    fn space_exists(&self, space: &SpaceRef) -> bool {
        self.inner.space_exists(space)
    }

    fn get_document(&self, page: &PageRef) -> Result<Document, StorageError> {
        self.inner.get_document(page)
    }

    fn save_document(&self, document: &Document) -> Result<(), StorageError> {
        self.write(&document.reference, |r| r.save_document(document))
    }

    fn delete_document(&self, page: &PageRef) -> Result<(), StorageError> {
        self.write(page, |r| r.delete_document(page))
    }

    fn rename_document(&self, page: &PageRef, destination: &PageRef) -> Result<(), StorageError> {
        self.write(page, |r| r.rename_document(page, destination))
    }

    fn child_pages_of_space(&self, space: &SpaceRef) -> Result<Vec<PageRef>, StorageError> {
        self.inner.child_pages_of_space(space)
    }

    fn child_pages_of_page(&self, page: &PageRef) -> Result<Vec<PageRef>, StorageError> {
        self.inner.child_pages_of_page(page)
    }

    fn child_pages_with_prefix(
        &self,
        space: &SpaceRef,
        prefix: &str,
    ) -> Result<Vec<PageRef>, StorageError> {
        self.inner.child_pages_with_prefix(space, prefix)
    }

    fn child_spaces(&self, space: &SpaceRef) -> Result<Vec<String>, StorageError> {
        self.inner.child_spaces(space)
    }

    fn root_spaces(&self) -> Result<Vec<String>, StorageError> {
        self.inner.root_spaces()
    }

    fn all_spaces(&self) -> Result<Vec<SpaceRef>, StorageError> {
        self.inner.all_spaces()
    }

    fn attachments_for_page(&self, page: &PageRef) -> Result<Vec<String>, StorageError> {
        self.inner.attachments_for_page(page)
    }

    fn pages_with_attachments_in_space(
        &self,
        space: &SpaceRef,
    ) -> Result<Vec<PageRef>, StorageError> {
        self.inner.pages_with_attachments_in_space(space)
    }

    fn orphan_pages(&self) -> Result<Vec<PageRef>, StorageError> {
        self.inner.orphan_pages()
    }

    fn attachment_content(&self, attachment: &AttachmentRef) -> Result<Vec<u8>, StorageError> {
        self.inner.attachment_content(attachment)
    }

    fn save_attachment(
        &self,
        attachment: &AttachmentRef,
        data: &[u8],
    ) -> Result<(), StorageError> {
        self.write(attachment.page(), |r| r.save_attachment(attachment, data))
    }

    fn delete_attachment(&self, attachment: &AttachmentRef) -> Result<(), StorageError> {
        self.write(attachment.page(), |r| r.delete_attachment(attachment))
    }

    fn move_attachment(
        &self,
        attachment: &AttachmentRef,
        destination: &AttachmentRef,
    ) -> Result<(), StorageError> {
        self.write(attachment.page(), |r| {
            r.move_attachment(attachment, destination)
        })
    }
}
