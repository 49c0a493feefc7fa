//! Reference types
//!
//! A reference names an entity of one wiki by its fully-qualified
//! hierarchical name. References carry no state of the entity itself.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::serialize::{serialize_attachment, serialize_page, serialize_space};

/// Errors produced while building or parsing references
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RefError {
    /// The serialized form is not a well-formed reference
    #[error("Malformed reference: {0}")]
    Malformed(String),

    /// A page reference has no enclosing space
    #[error("Page has no enclosing space: {0}")]
    MissingSpace(String),
}

/// A space, possibly nested inside other spaces
///
/// Segments are ordered outermost first and are never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SpaceRef {
    segments: Vec<String>,
}

impl SpaceRef {
    /// Creates a top-level space
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            segments: vec![name.into()],
        }
    }

    /// Creates a space from its segments, outermost first
    pub fn from_segments<I, S>(segments: I) -> Result<Self, RefError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let segments: Vec<String> = segments.into_iter().map(Into::into).collect();
        if segments.is_empty() || segments.iter().any(|s| s.is_empty()) {
            return Err(RefError::Malformed(segments.join(".")));
        }
        Ok(Self { segments })
    }

    /// Creates a space nested directly inside this one
    pub fn child(&self, name: impl Into<String>) -> Self {
        let mut segments = self.segments.clone();
        segments.push(name.into());
        Self { segments }
    }

    /// Returns the enclosing space, if this is not a top-level space
    pub fn parent(&self) -> Option<SpaceRef> {
        if self.segments.len() < 2 {
            return None;
        }
        Some(Self {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        })
    }

    /// Returns the last segment
    pub fn name(&self) -> &str {
        // Non-empty by construction.
        self.segments.last().map(String::as_str).unwrap_or_default()
    }

    /// Returns every segment, outermost first
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Returns true for a top-level space
    pub fn is_root(&self) -> bool {
        self.segments.len() == 1
    }

    /// Returns true if every segment is a non-empty name
    pub fn is_well_formed(&self) -> bool {
        !self.segments.is_empty() && self.segments.iter().all(|s| !s.is_empty())
    }
}

impl fmt::Display for SpaceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&serialize_space(self))
    }
}

/// A page
///
/// The enclosing space is optional only so that relative names can be parsed
/// and later completed with [`PageRef::or_in_space`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PageRef {
    space: Option<SpaceRef>,
    name: String,
}

impl PageRef {
    /// Creates a page inside a space
    pub fn new(name: impl Into<String>, space: SpaceRef) -> Self {
        Self {
            space: Some(space),
            name: name.into(),
        }
    }

    /// Creates a page reference that does not name its space
    pub fn relative(name: impl Into<String>) -> Self {
        Self {
            space: None,
            name: name.into(),
        }
    }

    /// Returns the page name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the enclosing space, if known
    pub fn space(&self) -> Option<&SpaceRef> {
        self.space.as_ref()
    }

    /// Returns the enclosing space or fails for a relative reference
    pub fn require_space(&self) -> Result<&SpaceRef, RefError> {
        self.space
            .as_ref()
            .ok_or_else(|| RefError::MissingSpace(self.name.clone()))
    }

    /// Completes a relative reference with the given space
    ///
    /// A reference that already names its space is returned unchanged.
    pub fn or_in_space(self, space: &SpaceRef) -> Self {
        match self.space {
            Some(_) => self,
            None => Self::new(self.name, space.clone()),
        }
    }

    /// Returns the page with the same name inside another space
    pub fn moved_to(&self, space: &SpaceRef) -> Self {
        Self::new(self.name.clone(), space.clone())
    }

    /// Returns true if the page lives directly in `space`
    pub fn is_in(&self, space: &SpaceRef) -> bool {
        self.space.as_ref() == Some(space)
    }

    /// Returns true if the name and every space segment are non-empty
    pub fn is_well_formed(&self) -> bool {
        !self.name.is_empty() && self.space.as_ref().map_or(true, SpaceRef::is_well_formed)
    }
}

impl fmt::Display for PageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&serialize_page(self))
    }
}

/// A file attached to a page
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AttachmentRef {
    page: PageRef,
    filename: String,
}

impl AttachmentRef {
    /// Creates an attachment reference
    pub fn new(page: PageRef, filename: impl Into<String>) -> Self {
        Self {
            page,
            filename: filename.into(),
        }
    }

    /// Returns the owning page
    pub fn page(&self) -> &PageRef {
        &self.page
    }

    /// Returns the file name
    pub fn filename(&self) -> &str {
        &self.filename
    }
}

impl fmt::Display for AttachmentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&serialize_attachment(self))
    }
}

/// Any referenceable entity
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityRef {
    Space(SpaceRef),
    Page(PageRef),
    Attachment(AttachmentRef),
}

impl EntityRef {
    /// Returns the space the entity lives in (or is)
    pub fn space(&self) -> Option<&SpaceRef> {
        match self {
            EntityRef::Space(space) => Some(space),
            EntityRef::Page(page) => page.space(),
            EntityRef::Attachment(attachment) => attachment.page().space(),
        }
    }

    /// Returns the page the entity belongs to, if any
    pub fn page(&self) -> Option<&PageRef> {
        match self {
            EntityRef::Space(_) => None,
            EntityRef::Page(page) => Some(page),
            EntityRef::Attachment(attachment) => Some(attachment.page()),
        }
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityRef::Space(space) => write!(f, "space {}", space),
            EntityRef::Page(page) => write!(f, "page {}", page),
            EntityRef::Attachment(attachment) => write!(f, "attachment {}", attachment),
        }
    }
}

impl From<SpaceRef> for EntityRef {
    fn from(space: SpaceRef) -> Self {
        EntityRef::Space(space)
    }
}

impl From<PageRef> for EntityRef {
    fn from(page: PageRef) -> Self {
        EntityRef::Page(page)
    }
}

impl From<AttachmentRef> for EntityRef {
    fn from(attachment: AttachmentRef) -> Self {
        EntityRef::Attachment(attachment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_space_hierarchy() {
        let main = SpaceRef::new("Main");
        let sub = main.child("Sub");

        assert_eq!(sub.name(), "Sub");
        assert_eq!(sub.parent(), Some(main.clone()));
        assert!(main.is_root());
        assert!(!sub.is_root());
        assert_eq!(main.parent(), None);
    }

    #[test]
    fn test_space_from_segments_rejects_empty() {
        assert!(SpaceRef::from_segments(Vec::<String>::new()).is_err());
        assert!(SpaceRef::from_segments(["Main", ""]).is_err());
        assert!(SpaceRef::from_segments(["Main", "Sub"]).is_ok());
    }

    #[test]
    fn test_relative_page_requires_space() {
        let page = PageRef::relative("WebHome");
        assert!(matches!(
            page.require_space(),
            Err(RefError::MissingSpace(_))
        ));

        let completed = page.or_in_space(&SpaceRef::new("Main"));
        assert_eq!(completed.require_space().unwrap(), &SpaceRef::new("Main"));
    }

    #[test]
    fn test_or_in_space_keeps_existing_space() {
        let page = PageRef::new("A", SpaceRef::new("Sandbox"));
        let same = page.clone().or_in_space(&SpaceRef::new("Main"));
        assert_eq!(same, page);
    }

    #[test]
    fn test_moved_to() {
        let page = PageRef::new("A", SpaceRef::new("Old"));
        let moved = page.moved_to(&SpaceRef::new("New"));
        assert_eq!(moved.name(), "A");
        assert!(moved.is_in(&SpaceRef::new("New")));
    }

    #[test]
    fn test_entity_ref_space_and_page() {
        let page = PageRef::new("A", SpaceRef::new("Main"));
        let attachment = AttachmentRef::new(page.clone(), "a.png");
        let entity = EntityRef::from(attachment);

        assert_eq!(entity.space(), Some(&SpaceRef::new("Main")));
        assert_eq!(entity.page(), Some(&page));
        assert_eq!(EntityRef::from(SpaceRef::new("Main")).page(), None);
    }

    #[test]
    fn test_serde_json_shape() {
        let page = PageRef::new("A", SpaceRef::new("Main"));
        let json = serde_json::to_string(&page).unwrap();
        let back: PageRef = serde_json::from_str(&json).unwrap();
        assert_eq!(back, page);
    }
}
