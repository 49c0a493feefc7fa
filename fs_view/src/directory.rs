//! Directory entries
//!
//! The flat description of a node handed to the protocol layer.

use core_types::EntityRef;
use serde::{Deserialize, Serialize};

use crate::node::{NodeId, NodeKind, NodeTable};

/// What kind of entry a listing shows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    /// A synthetic directory with no entity behind it
    View,
    Space,
    LetterGroup,
    Page,
    Attachment,
    WikiFile,
    TempFile,
}

impl From<&NodeKind> for EntryKind {
    fn from(kind: &NodeKind) -> Self {
        match kind {
            NodeKind::WikiRoot | NodeKind::RootGroup { .. } | NodeKind::OrphanGroup => {
                EntryKind::View
            }
            NodeKind::SpaceGroup { .. } => EntryKind::Space,
            NodeKind::PageLetterGroup { .. } | NodeKind::AttachmentLetterGroup { .. } => {
                EntryKind::LetterGroup
            }
            NodeKind::Page { .. } => EntryKind::Page,
            NodeKind::Attachment { .. } => EntryKind::Attachment,
            NodeKind::WikiFile { .. } => EntryKind::WikiFile,
            NodeKind::TempFile { .. } => EntryKind::TempFile,
        }
    }
}

/// A single entry in a listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryEntry {
    /// Name of this entry
    pub name: String,
    /// Full path of this entry
    pub path: String,
    pub kind: EntryKind,
    pub is_collection: bool,
    /// Entity behind the entry, if any
    pub reference: Option<EntityRef>,
}

impl DirectoryEntry {
    /// Describes a node of a table
    pub fn from_node(table: &NodeTable, id: NodeId) -> Self {
        let node = table.get(id);
        Self {
            name: node.name().to_string(),
            path: table.path(id),
            kind: EntryKind::from(&node.kind),
            is_collection: node.kind.capabilities().is_collection,
            reference: node.kind.reference(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::ViewKind;
    use core_types::SpaceRef;

    #[test]
    fn test_entry_from_space_node() {
        let mut table = NodeTable::new();
        let spaces = table
            .insert_named(
                table.root(),
                NodeKind::RootGroup {
                    view: ViewKind::Pages,
                },
            )
            .unwrap();
        let main = table
            .insert_named(
                spaces,
                NodeKind::SpaceGroup {
                    space: SpaceRef::new("Main"),
                    view: ViewKind::Pages,
                },
            )
            .unwrap();

        let entry = DirectoryEntry::from_node(&table, main);
        assert_eq!(entry.name, "Main");
        assert_eq!(entry.path, "/spaces/Main");
        assert_eq!(entry.kind, EntryKind::Space);
        assert!(entry.is_collection);
        assert_eq!(entry.reference, Some(EntityRef::Space(SpaceRef::new("Main"))));

        let root = DirectoryEntry::from_node(&table, table.root());
        assert_eq!(root.kind, EntryKind::View);
        assert_eq!(root.reference, None);
    }
}
