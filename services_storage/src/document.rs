//! Document snapshots

use core_types::PageRef;
use serde::{Deserialize, Serialize};

/// A point-in-time copy of a page
///
/// Mutating a snapshot has no effect until it is handed back to
/// [`Repository::save_document`](crate::Repository::save_document).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// The page this snapshot belongs to
    pub reference: PageRef,
    /// Wiki markup content
    pub content: String,
    /// Legacy parent page, independent of space containment
    pub parent: Option<PageRef>,
    /// Creation time (Unix seconds, or a logical clock)
    pub created_at: u64,
    /// Last content update time
    pub updated_at: u64,
    /// Content locale, empty for the default locale
    pub locale: String,
    /// True until the document has been saved once
    pub is_new: bool,
}

impl Document {
    /// Creates an unsaved, empty document
    pub fn new(reference: PageRef) -> Self {
        Self {
            reference,
            content: String::new(),
            parent: None,
            created_at: 0,
            updated_at: 0,
            locale: String::new(),
            is_new: true,
        }
    }

    /// Sets the content
    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    /// Sets the legacy parent
    pub fn with_parent(mut self, parent: PageRef) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Returns true if the page has been saved at least once
    pub fn exists(&self) -> bool {
        !self.is_new
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_types::SpaceRef;

    #[test]
    fn test_new_document_is_unsaved() {
        let doc = Document::new(PageRef::new("A", SpaceRef::new("Main")));
        assert!(doc.is_new);
        assert!(!doc.exists());
        assert!(doc.content.is_empty());
        assert_eq!(doc.parent, None);
    }

    #[test]
    fn test_document_builders() {
        let parent = PageRef::new("WebHome", SpaceRef::new("Main"));
        let doc = Document::new(PageRef::new("A", SpaceRef::new("Main")))
            .with_content("hello")
            .with_parent(parent.clone());

        assert_eq!(doc.content, "hello");
        assert_eq!(doc.parent, Some(parent));
    }
}
