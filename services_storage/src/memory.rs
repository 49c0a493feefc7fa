//! In-memory repository
//!
//! A complete [`Repository`] kept in process memory. Timestamps come from a
//! logical clock that advances on every write, so tests are deterministic.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use core_types::{AttachmentRef, PageRef, SpaceRef};
use log::debug;

use crate::{Document, Repository, StorageError};

#[derive(Debug, Default)]
struct State {
    spaces: BTreeSet<SpaceRef>,
    documents: BTreeMap<PageRef, Document>,
    attachments: BTreeMap<PageRef, BTreeMap<String, Vec<u8>>>,
    clock: u64,
}

impl State {
    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    /// Registers a space and every enclosing space
    fn register_space(&mut self, space: &SpaceRef) {
        let mut current = Some(space.clone());
        while let Some(space) = current {
            current = space.parent();
            self.spaces.insert(space);
        }
    }

    fn store(&mut self, document: &Document) -> Result<(), StorageError> {
        let space = document.reference.require_space()?.clone();
        self.register_space(&space);
        let now = self.tick();
        let mut stored = document.clone();
        if stored.is_new || stored.created_at == 0 {
            stored.created_at = now;
        }
        stored.updated_at = now;
        stored.is_new = false;
        self.documents.insert(stored.reference.clone(), stored);
        Ok(())
    }

    fn ensure_page(&mut self, page: &PageRef) -> Result<(), StorageError> {
        if !self.documents.contains_key(page) {
            self.store(&Document::new(page.clone()))?;
        }
        Ok(())
    }
}

/// Repository backed by ordered maps behind a lock
#[derive(Debug, Default)]
pub struct InMemoryRepository {
    state: RwLock<State>,
}

impl InMemoryRepository {
    /// Creates an empty repository
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a page with the given legacy parent and default content
    pub fn add_page(&self, page: PageRef, parent: Option<PageRef>) -> Result<(), StorageError> {
        let mut document = Document::new(page).with_content("");
        document.parent = parent;
        self.save_document(&document)
    }

    /// Creates an empty space (and its enclosing spaces)
    pub fn add_space(&self, space: &SpaceRef) -> Result<(), StorageError> {
        self.write()?.register_space(space);
        Ok(())
    }

    /// Returns the number of saved pages
    pub fn page_count(&self) -> usize {
        self.read().map(|state| state.documents.len()).unwrap_or(0)
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, State>, StorageError> {
        self.state
            .read()
            .map_err(|_| StorageError::Backend("repository lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, State>, StorageError> {
        self.state
            .write()
            .map_err(|_| StorageError::Backend("repository lock poisoned".to_string()))
    }
}

impl Repository for InMemoryRepository {
    fn document_exists(&self, page: &PageRef) -> bool {
        self.read()
            .map(|state| state.documents.contains_key(page))
            .unwrap_or(false)
    }

    fn space_exists(&self, space: &SpaceRef) -> bool {
        self.read()
            .map(|state| state.spaces.contains(space))
            .unwrap_or(false)
    }

    fn get_document(&self, page: &PageRef) -> Result<Document, StorageError> {
        page.require_space()?;
        let state = self.read()?;
        Ok(state
            .documents
            .get(page)
            .cloned()
            .unwrap_or_else(|| Document::new(page.clone())))
    }

    fn save_document(&self, document: &Document) -> Result<(), StorageError> {
        debug!("save {}", document.reference);
        self.write()?.store(document)
    }

    fn delete_document(&self, page: &PageRef) -> Result<(), StorageError> {
        debug!("delete {}", page);
        let mut state = self.write()?;
        if state.documents.remove(page).is_none() {
            return Err(StorageError::NotFound(page.to_string()));
        }
        state.attachments.remove(page);
        Ok(())
    }

    fn rename_document(&self, page: &PageRef, destination: &PageRef) -> Result<(), StorageError> {
        debug!("rename {} -> {}", page, destination);
        let space = destination.require_space()?.clone();
        let mut state = self.write()?;
        let mut document = state
            .documents
            .remove(page)
            .ok_or_else(|| StorageError::NotFound(page.to_string()))?;
        state.register_space(&space);
        document.reference = destination.clone();
        document.updated_at = state.tick();
        state.documents.insert(destination.clone(), document);
        state.attachments.remove(destination);
        if let Some(files) = state.attachments.remove(page) {
            state.attachments.insert(destination.clone(), files);
        }
        Ok(())
    }

    fn child_pages_of_space(&self, space: &SpaceRef) -> Result<Vec<PageRef>, StorageError> {
        let state = self.read()?;
        Ok(state
            .documents
            .keys()
            .filter(|page| page.is_in(space))
            .cloned()
            .collect())
    }

    fn child_pages_of_page(&self, page: &PageRef) -> Result<Vec<PageRef>, StorageError> {
        let state = self.read()?;
        Ok(state
            .documents
            .values()
            .filter(|doc| doc.parent.as_ref() == Some(page))
            .map(|doc| doc.reference.clone())
            .collect())
    }

    fn child_pages_with_prefix(
        &self,
        space: &SpaceRef,
        prefix: &str,
    ) -> Result<Vec<PageRef>, StorageError> {
        let prefix = prefix.to_uppercase();
        let state = self.read()?;
        Ok(state
            .documents
            .keys()
            .filter(|page| page.is_in(space) && page.name().to_uppercase().starts_with(&prefix))
            .cloned()
            .collect())
    }

    fn child_spaces(&self, space: &SpaceRef) -> Result<Vec<String>, StorageError> {
        let state = self.read()?;
        Ok(state
            .spaces
            .iter()
            .filter(|candidate| candidate.parent().as_ref() == Some(space))
            .map(|candidate| candidate.name().to_string())
            .collect())
    }

    fn root_spaces(&self) -> Result<Vec<String>, StorageError> {
        let state = self.read()?;
        Ok(state
            .spaces
            .iter()
            .filter(|space| space.is_root())
            .map(|space| space.name().to_string())
            .collect())
    }

    fn all_spaces(&self) -> Result<Vec<SpaceRef>, StorageError> {
        Ok(self.read()?.spaces.iter().cloned().collect())
    }

    fn attachments_for_page(&self, page: &PageRef) -> Result<Vec<String>, StorageError> {
        let state = self.read()?;
        Ok(state
            .attachments
            .get(page)
            .map(|files| files.keys().cloned().collect())
            .unwrap_or_default())
    }

    fn pages_with_attachments_in_space(
        &self,
        space: &SpaceRef,
    ) -> Result<Vec<PageRef>, StorageError> {
        let state = self.read()?;
        Ok(state
            .attachments
            .iter()
            .filter(|(page, files)| page.is_in(space) && !files.is_empty())
            .map(|(page, _)| page.clone())
            .collect())
    }

    fn orphan_pages(&self) -> Result<Vec<PageRef>, StorageError> {
        let state = self.read()?;
        Ok(state
            .documents
            .values()
            .filter(|doc| match &doc.parent {
                Some(parent) => !state.documents.contains_key(parent),
                None => true,
            })
            .map(|doc| doc.reference.clone())
            .collect())
    }

    fn attachment_content(&self, attachment: &AttachmentRef) -> Result<Vec<u8>, StorageError> {
        let state = self.read()?;
        state
            .attachments
            .get(attachment.page())
            .and_then(|files| files.get(attachment.filename()))
            .cloned()
            .ok_or_else(|| StorageError::NotFound(attachment.to_string()))
    }

    fn save_attachment(
        &self,
        attachment: &AttachmentRef,
        data: &[u8],
    ) -> Result<(), StorageError> {
        debug!("save attachment {} ({} bytes)", attachment, data.len());
        let mut state = self.write()?;
        state.ensure_page(attachment.page())?;
        state
            .attachments
            .entry(attachment.page().clone())
            .or_default()
            .insert(attachment.filename().to_string(), data.to_vec());
        Ok(())
    }

    fn delete_attachment(&self, attachment: &AttachmentRef) -> Result<(), StorageError> {
        debug!("delete attachment {}", attachment);
        let mut state = self.write()?;
        state
            .attachments
            .get_mut(attachment.page())
            .and_then(|files| files.remove(attachment.filename()))
            .map(|_| ())
            .ok_or_else(|| StorageError::NotFound(attachment.to_string()))
    }

    fn move_attachment(
        &self,
        attachment: &AttachmentRef,
        destination: &AttachmentRef,
    ) -> Result<(), StorageError> {
        debug!("move attachment {} -> {}", attachment, destination);
        let mut state = self.write()?;
        let data = state
            .attachments
            .get_mut(attachment.page())
            .and_then(|files| files.remove(attachment.filename()))
            .ok_or_else(|| StorageError::NotFound(attachment.to_string()))?;
        state.ensure_page(destination.page())?;
        state
            .attachments
            .entry(destination.page().clone())
            .or_default()
            .insert(destination.filename().to_string(), data);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn main_page(name: &str) -> PageRef {
        PageRef::new(name, SpaceRef::new("Main"))
    }

    #[test]
    fn test_get_missing_document_is_new() {
        let repo = InMemoryRepository::new();
        let doc = repo.get_document(&main_page("A")).unwrap();
        assert!(doc.is_new);
        assert!(!repo.document_exists(&main_page("A")));
    }

    #[test]
    fn test_get_relative_document_fails() {
        let repo = InMemoryRepository::new();
        let result = repo.get_document(&PageRef::relative("A"));
        assert!(matches!(result, Err(StorageError::InvalidReference(_))));
    }

    #[test]
    fn test_save_registers_space_chain() {
        let repo = InMemoryRepository::new();
        let space = SpaceRef::new("Main").child("Sub");
        repo.add_page(PageRef::new("A", space.clone()), None).unwrap();

        assert!(repo.space_exists(&space));
        assert!(repo.space_exists(&SpaceRef::new("Main")));
        assert_eq!(repo.root_spaces().unwrap(), vec!["Main".to_string()]);
        assert_eq!(
            repo.child_spaces(&SpaceRef::new("Main")).unwrap(),
            vec!["Sub".to_string()]
        );
    }

    #[test]
    fn test_save_sets_timestamps() {
        let repo = InMemoryRepository::new();
        repo.add_page(main_page("A"), None).unwrap();
        let first = repo.get_document(&main_page("A")).unwrap();
        assert!(!first.is_new);
        assert!(first.created_at > 0);

        repo.save_document(&first.clone().with_content("v2")).unwrap();
        let second = repo.get_document(&main_page("A")).unwrap();
        assert_eq!(second.created_at, first.created_at);
        assert!(second.updated_at > first.updated_at);
        assert_eq!(second.content, "v2");
    }

    #[test]
    fn test_child_pages_with_prefix_is_case_insensitive() {
        let repo = InMemoryRepository::new();
        for name in ["alpha", "Apple", "beta", "AB"] {
            repo.add_page(main_page(name), None).unwrap();
        }

        let mut names: Vec<String> = repo
            .child_pages_with_prefix(&SpaceRef::new("Main"), "a")
            .unwrap()
            .into_iter()
            .map(|p| p.name().to_string())
            .collect();
        names.sort();
        assert_eq!(names, vec!["AB", "Apple", "alpha"]);
    }

    #[test]
    fn test_legacy_children_and_orphans() {
        let repo = InMemoryRepository::new();
        repo.add_page(main_page("Root"), None).unwrap();
        repo.add_page(main_page("Child"), Some(main_page("Root")))
            .unwrap();
        repo.add_page(main_page("Lost"), Some(main_page("Gone")))
            .unwrap();

        assert_eq!(
            repo.child_pages_of_page(&main_page("Root")).unwrap(),
            vec![main_page("Child")]
        );
        let orphans = repo.orphan_pages().unwrap();
        assert!(orphans.contains(&main_page("Root")));
        assert!(orphans.contains(&main_page("Lost")));
        assert!(!orphans.contains(&main_page("Child")));
    }

    #[test]
    fn test_rename_moves_attachments() {
        let repo = InMemoryRepository::new();
        let att = AttachmentRef::new(main_page("A"), "a.txt");
        repo.save_attachment(&att, b"data").unwrap();

        let destination = PageRef::new("B", SpaceRef::new("Other"));
        repo.rename_document(&main_page("A"), &destination).unwrap();

        assert!(!repo.document_exists(&main_page("A")));
        assert!(repo.document_exists(&destination));
        assert!(repo.space_exists(&SpaceRef::new("Other")));
        assert_eq!(
            repo.attachments_for_page(&destination).unwrap(),
            vec!["a.txt".to_string()]
        );
    }

    #[test]
    fn test_rename_missing_page_fails() {
        let repo = InMemoryRepository::new();
        let result = repo.rename_document(&main_page("A"), &main_page("B"));
        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }

    #[test]
    fn test_attachment_lifecycle() {
        let repo = InMemoryRepository::new();
        let att = AttachmentRef::new(main_page("A"), "a.txt");
        repo.save_attachment(&att, b"one").unwrap();

        assert!(repo.document_exists(&main_page("A")));
        assert_eq!(repo.attachment_content(&att).unwrap(), b"one".to_vec());
        assert_eq!(
            repo.pages_with_attachments_in_space(&SpaceRef::new("Main"))
                .unwrap(),
            vec![main_page("A")]
        );

        let moved = AttachmentRef::new(main_page("B"), "b.txt");
        repo.move_attachment(&att, &moved).unwrap();
        assert!(repo.attachment_content(&att).is_err());
        assert_eq!(repo.attachment_content(&moved).unwrap(), b"one".to_vec());

        repo.delete_attachment(&moved).unwrap();
        assert!(matches!(
            repo.delete_attachment(&moved),
            Err(StorageError::NotFound(_))
        ));
    }

    #[test]
    fn test_delete_document() {
        let repo = InMemoryRepository::new();
        repo.add_page(main_page("A"), None).unwrap();
        repo.delete_document(&main_page("A")).unwrap();
        assert_eq!(repo.page_count(), 0);
        assert!(repo.delete_document(&main_page("A")).is_err());
    }
}
