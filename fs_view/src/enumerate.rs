//! Directory listings
//!
//! Listing never fails: a query or node that cannot be produced is logged
//! and left out, so one broken page does not hide its siblings.

use core_types::{serialize_page, AttachmentRef, EntityRef, PageRef, SpaceRef};
use log::{debug, warn};
use policy::Right;
use services_storage::StorageError;

use crate::context::RequestContext;
use crate::grouping::{GroupName, GroupingStrategy};
use crate::node::{NodeId, NodeKind, NodeTable, ViewKind, WikiFileFormat};

/// Lists the children of a node
pub fn members(table: &mut NodeTable, ctx: &RequestContext<'_>, id: NodeId) -> Vec<NodeId> {
    let mut listing = Listing {
        table,
        ctx,
        parent: id,
        members: Vec::new(),
    };

    match listing.table.kind(id).clone() {
        NodeKind::WikiRoot => {
            listing.push_named(NodeKind::RootGroup {
                view: ViewKind::Pages,
            });
            listing.push_named(NodeKind::RootGroup {
                view: ViewKind::Attachments,
            });
            listing.push_named(NodeKind::OrphanGroup);
        }
        NodeKind::RootGroup {
            view: ViewKind::Pages,
        } => {
            for name in listing.query("root spaces", ctx.repository.root_spaces()) {
                listing.push_named(NodeKind::SpaceGroup {
                    space: SpaceRef::new(name),
                    view: ViewKind::Pages,
                });
            }
        }
        NodeKind::RootGroup {
            view: ViewKind::Attachments,
        } => {
            for space in listing.query("all spaces", ctx.repository.all_spaces()) {
                listing.push_named(NodeKind::SpaceGroup {
                    space,
                    view: ViewKind::Attachments,
                });
            }
        }
        NodeKind::OrphanGroup => {
            let orphans = listing.query("orphan pages", ctx.repository.orphan_pages());
            for page in listing.visible(orphans) {
                listing.push_named(NodeKind::Page { page });
            }
        }
        NodeKind::SpaceGroup {
            space,
            view: ViewKind::Pages,
        } => {
            for name in listing.query("child spaces", ctx.repository.child_spaces(&space)) {
                listing.push_named(NodeKind::SpaceGroup {
                    space: space.child(name),
                    view: ViewKind::Pages,
                });
            }
            let pages = listing.query("space pages", ctx.repository.child_pages_of_space(&space));
            let pages = listing.visible(pages);
            listing.push_grouped(&space, pages, ViewKind::Pages);
        }
        NodeKind::SpaceGroup {
            space,
            view: ViewKind::Attachments,
        } => {
            let pages = listing.query(
                "pages with attachments",
                ctx.repository.pages_with_attachments_in_space(&space),
            );
            let pages = listing.visible(pages);
            listing.push_grouped(&space, pages, ViewKind::Attachments);
        }
        NodeKind::PageLetterGroup { space, group } => {
            let pages = listing.query(
                "prefixed pages",
                ctx.repository.child_pages_with_prefix(&space, group.key()),
            );
            for page in listing.visible(pages) {
                listing.push_short(page);
            }
        }
        NodeKind::AttachmentLetterGroup { space, group } => {
            let pages = listing.query(
                "pages with attachments",
                ctx.repository.pages_with_attachments_in_space(&space),
            );
            let pages = pages
                .into_iter()
                .filter(|page| group.matches(page.name()))
                .collect();
            for page in listing.visible(pages) {
                listing.push_short(page);
            }
        }
        NodeKind::Page { page } => {
            if !ctx.access().can_view(&page) {
                debug!("{}: {} is not visible, listing nothing", ctx.id, page);
                return Vec::new();
            }
            listing.push_page_children(&page);
        }
        NodeKind::Attachment { .. } | NodeKind::WikiFile { .. } | NodeKind::TempFile { .. } => {
            return Vec::new();
        }
    }

    listing.push_temp_files();
    listing.members
}

/// Returns true if listing `candidate` below `id` would repeat a page of the
/// current chain
///
/// The legacy parent relation is user data and may loop; the walk stops at
/// the first ancestor that is not a page.
pub fn creates_cycle(table: &NodeTable, id: NodeId, candidate: &str) -> bool {
    table
        .ancestors(id)
        .take_while(|ancestor| matches!(table.kind(*ancestor), NodeKind::Page { .. }))
        .any(|ancestor| table.get(ancestor).name() == candidate)
}

struct Listing<'t, 'c, 'a> {
    table: &'t mut NodeTable,
    ctx: &'c RequestContext<'a>,
    parent: NodeId,
    members: Vec<NodeId>,
}

impl Listing<'_, '_, '_> {
    fn query<T>(&self, what: &str, result: Result<Vec<T>, StorageError>) -> Vec<T> {
        result.unwrap_or_else(|err| {
            warn!(
                "{}: failed to list {} of {}: {}",
                self.ctx.id,
                what,
                self.table.path(self.parent),
                err
            );
            Vec::new()
        })
    }

    fn visible(&self, pages: Vec<PageRef>) -> Vec<PageRef> {
        let access = self.ctx.access();
        pages.into_iter().filter(|page| access.can_view(page)).collect()
    }

    fn push(&mut self, kind: NodeKind, segment: &str) {
        match self.table.insert(self.parent, kind, segment) {
            Ok(id) => self.members.push(id),
            Err(err) => warn!(
                "{}: skipping {:?} in {}: {}",
                self.ctx.id,
                segment,
                self.table.path(self.parent),
                err
            ),
        }
    }

    fn push_named(&mut self, kind: NodeKind) {
        let segment = kind.display_name();
        self.push(kind, &segment);
    }

    /// Pushes a page reached by its name within its space
    fn push_short(&mut self, page: PageRef) {
        let segment = page.name().to_string();
        self.push(NodeKind::Page { page }, &segment);
    }

    /// Lists pages flat, or as letter groups once there are enough of them
    fn push_grouped(&mut self, space: &SpaceRef, pages: Vec<PageRef>, view: ViewKind) {
        let length = self.ctx.grouping().prefix_length(pages.len());
        if length == 0 {
            for page in pages {
                self.push_short(page);
            }
            return;
        }

        let keys = GroupingStrategy::buckets(pages.iter().map(|page| page.name()), length);
        for key in keys {
            let group = match GroupName::from_key(&key) {
                Ok(group) => group,
                Err(err) => {
                    warn!("{}: skipping bucket {:?}: {}", self.ctx.id, key, err);
                    continue;
                }
            };
            let space = space.clone();
            self.push_named(match view {
                ViewKind::Pages => NodeKind::PageLetterGroup { space, group },
                ViewKind::Attachments => NodeKind::AttachmentLetterGroup { space, group },
            });
        }
    }

    fn push_page_children(&mut self, page: &PageRef) {
        let ctx = self.ctx;
        let repository = ctx.repository;
        let access = ctx.access();

        let children = self.query("child pages", repository.child_pages_of_page(page));
        for child in children {
            let name = child.to_string();
            if creates_cycle(self.table, self.parent, &name) {
                debug!("{}: {} would loop below {}", ctx.id, name, page);
                continue;
            }
            if !access.can_view(&child) {
                continue;
            }
            let segment = if child.space() == page.space() {
                serialize_page(&PageRef::relative(child.name()))
            } else {
                name
            };
            self.push(NodeKind::Page { page: child }, &segment);
        }

        let files = self.query("attachments", repository.attachments_for_page(page));
        for file in files {
            let attachment = AttachmentRef::new(page.clone(), file);
            if !access.has_access(Right::View, &EntityRef::Attachment(attachment.clone())) {
                continue;
            }
            self.push_named(NodeKind::Attachment { attachment });
        }

        for format in [WikiFileFormat::Text, WikiFileFormat::Xml] {
            self.push_named(NodeKind::WikiFile {
                page: page.clone(),
                format,
            });
        }
    }

    fn push_temp_files(&mut self) {
        let Some(store) = self.ctx.temp_store() else {
            return;
        };
        let scope = self.table.path(self.parent);
        for name in store.names_under(&scope) {
            self.push_named(NodeKind::TempFile { name });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ViewConfig;
    use crate::grouping::GroupingThresholds;
    use crate::resolver::resolve_path;
    use policy::{AllowAll, GrantTable, Scope};
    use services_storage::{InMemoryRepository, Repository};

    fn main_page(name: &str) -> PageRef {
        PageRef::new(name, SpaceRef::new("Main"))
    }

    fn names(table: &NodeTable, ids: &[NodeId]) -> Vec<String> {
        ids.iter().map(|id| table.get(*id).name().to_string()).collect()
    }

    fn list(repo: &InMemoryRepository, config: &ViewConfig, path: &str) -> Vec<String> {
        let ctx = RequestContext::new(repo, &AllowAll, config);
        let mut table = NodeTable::new();
        let id = resolve_path(&mut table, &ctx, path).unwrap();
        let ids = members(&mut table, &ctx, id);
        names(&table, &ids)
    }

    #[test]
    fn test_root_members() {
        let repo = InMemoryRepository::new();
        assert_eq!(
            list(&repo, &ViewConfig::default(), "/"),
            vec!["spaces", "attachments", "orphans"]
        );
    }

    #[test]
    fn test_small_space_is_flat() {
        let repo = InMemoryRepository::new();
        repo.add_page(main_page("A"), None).unwrap();
        repo.add_page(main_page("B"), None).unwrap();
        repo.add_page(PageRef::new("C", SpaceRef::new("Main").child("Sub")), None)
            .unwrap();

        assert_eq!(
            list(&repo, &ViewConfig::default(), "/spaces/Main"),
            vec!["Sub", "Main.A", "Main.B"]
        );
    }

    #[test]
    fn test_large_space_is_grouped() {
        let repo = InMemoryRepository::new();
        for name in ["Alpha", "apple", "Beta", "Gamma"] {
            repo.add_page(main_page(name), None).unwrap();
        }
        let config = ViewConfig {
            grouping: GroupingThresholds {
                one_letter: 4,
                two_letters: 100,
                three_letters: 1000,
            },
            ..ViewConfig::default()
        };

        assert_eq!(
            list(&repo, &config, "/spaces/Main"),
            vec!["_A_", "_B_", "_G_"]
        );
        assert_eq!(
            list(&repo, &config, "/spaces/Main/_A_"),
            vec!["Main.Alpha", "Main.apple"]
        );
    }

    #[test]
    fn test_grouping_counts_visible_pages_only() {
        let repo = InMemoryRepository::new();
        for name in ["Alpha", "Beta", "Gamma", "Secret"] {
            repo.add_page(main_page(name), None).unwrap();
        }
        let config = ViewConfig {
            grouping: GroupingThresholds {
                one_letter: 4,
                two_letters: 100,
                three_letters: 1000,
            },
            ..ViewConfig::default()
        };
        let policy = GrantTable::permissive().deny(Right::View, Scope::Page(main_page("Secret")));
        let ctx = RequestContext::new(&repo, &policy, &config);
        let mut table = NodeTable::new();
        let id = resolve_path(&mut table, &ctx, "/spaces/Main").unwrap();
        let ids = members(&mut table, &ctx, id);

        assert_eq!(names(&table, &ids), vec!["Main.Alpha", "Main.Beta", "Main.Gamma"]);
    }

    #[test]
    fn test_page_members() {
        let repo = InMemoryRepository::new();
        repo.add_page(main_page("A"), None).unwrap();
        repo.add_page(main_page("B"), Some(main_page("A"))).unwrap();
        repo.add_page(PageRef::new("C", SpaceRef::new("Other")), Some(main_page("A")))
            .unwrap();
        repo.save_attachment(&AttachmentRef::new(main_page("A"), "x.png"), b"x")
            .unwrap();

        let config = ViewConfig::default();
        let ctx = RequestContext::new(&repo, &AllowAll, &config);
        let mut table = NodeTable::new();
        let id = resolve_path(&mut table, &ctx, "/spaces/Main/A").unwrap();
        let ids = members(&mut table, &ctx, id);

        assert_eq!(
            names(&table, &ids),
            vec!["Main.B", "Other.C", "x.png", "wiki.txt", "wiki.xml"]
        );
        let paths: Vec<String> = ids.iter().map(|id| table.path(*id)).collect();
        assert_eq!(paths[0], "/spaces/Main/A/B");
        assert_eq!(paths[1], "/spaces/Main/A/Other.C");
    }

    #[test]
    fn test_dotted_child_resolves_back_to_itself() {
        let repo = InMemoryRepository::new();
        repo.add_page(main_page("A"), None).unwrap();
        repo.add_page(main_page("Release 1.0"), Some(main_page("A")))
            .unwrap();

        let config = ViewConfig::default();
        let ctx = RequestContext::new(&repo, &AllowAll, &config);
        let mut table = NodeTable::new();
        let id = resolve_path(&mut table, &ctx, "/spaces/Main/A").unwrap();
        let ids = members(&mut table, &ctx, id);
        let path = table.path(ids[0]);
        assert_eq!(path, "/spaces/Main/A/Release 1\\.0");

        let mut fresh = NodeTable::new();
        let again = resolve_path(&mut fresh, &ctx, &path).unwrap();
        assert_eq!(
            fresh.kind(again),
            &NodeKind::Page {
                page: main_page("Release 1.0")
            }
        );
    }

    #[test]
    fn test_hidden_page_lists_nothing() {
        let repo = InMemoryRepository::new();
        repo.add_page(main_page("A"), None).unwrap();
        let config = ViewConfig::default();
        let policy = GrantTable::permissive().deny(Right::View, Scope::Page(main_page("A")));
        let ctx = RequestContext::new(&repo, &policy, &config);
        let mut table = NodeTable::new();
        let id = resolve_path(&mut table, &ctx, "/spaces/Main/A").unwrap();

        assert!(members(&mut table, &ctx, id).is_empty());
    }

    #[test]
    fn test_cycle_is_cut() {
        let repo = InMemoryRepository::new();
        repo.add_page(main_page("A"), Some(main_page("C"))).unwrap();
        repo.add_page(main_page("B"), Some(main_page("A"))).unwrap();
        repo.add_page(main_page("C"), Some(main_page("B"))).unwrap();

        let config = ViewConfig::default();
        let ctx = RequestContext::new(&repo, &AllowAll, &config);
        let mut table = NodeTable::new();
        let c = resolve_path(&mut table, &ctx, "/spaces/Main/A/B/C").unwrap();
        assert!(creates_cycle(&table, c, "Main.A"));
        assert!(!creates_cycle(&table, c, "Main.D"));

        let ids = members(&mut table, &ctx, c);
        assert_eq!(names(&table, &ids), vec!["wiki.txt", "wiki.xml"]);
    }

    #[test]
    fn test_orphans_are_visible_pages_without_parent() {
        let repo = InMemoryRepository::new();
        repo.add_page(main_page("Root"), None).unwrap();
        repo.add_page(main_page("Child"), Some(main_page("Root"))).unwrap();
        repo.add_page(main_page("Lost"), Some(main_page("Gone"))).unwrap();

        assert_eq!(
            list(&repo, &ViewConfig::default(), "/orphans"),
            vec!["Main.Lost", "Main.Root"]
        );
    }

    #[test]
    fn test_attachment_view_members() {
        let repo = InMemoryRepository::new();
        repo.add_page(main_page("Plain"), None).unwrap();
        repo.save_attachment(&AttachmentRef::new(main_page("Docs"), "a.pdf"), b"a")
            .unwrap();
        repo.save_attachment(
            &AttachmentRef::new(PageRef::new("P", SpaceRef::new("Main").child("Sub")), "b.pdf"),
            b"b",
        )
        .unwrap();

        let config = ViewConfig::default();
        assert_eq!(list(&repo, &config, "/attachments"), vec!["Main", "Main.Sub"]);
        assert_eq!(list(&repo, &config, "/attachments/Main"), vec!["Main.Docs"]);
    }

    #[test]
    fn test_attachment_letter_group_members() {
        let repo = InMemoryRepository::new();
        for name in ["Alpha", "Beta"] {
            repo.save_attachment(&AttachmentRef::new(main_page(name), "f.txt"), b"f")
                .unwrap();
        }
        repo.add_page(main_page("Another"), None).unwrap();

        assert_eq!(
            list(&repo, &ViewConfig::default(), "/attachments/Main/_A_"),
            vec!["Main.Alpha"]
        );
    }

    #[test]
    fn test_listing_does_not_write() {
        let repo = InMemoryRepository::new();
        repo.add_page(main_page("A"), None).unwrap();
        let before = repo.page_count();
        list(&repo, &ViewConfig::default(), "/spaces/Main/A");
        assert_eq!(repo.page_count(), before);
        assert!(repo.document_exists(&main_page("A")));
    }
}
