//! Tree mutations
//!
//! Creating, removing and moving nodes. Every access check a mutation needs
//! is made before its first write. Once writing has started, a storage
//! failure stops the mutation where it is: items already written stay
//! written and the error says how far it got.

use core_types::{PageRef, SpaceRef};
use fs_view::{NodeId, NodeKind, NodeTable, RequestContext, ViewError, ViewKind, WikiFileFormat};
use log::{error, info};
use policy::Right;
use services_storage::{Document, StorageError};

/// Adds `child` to `parent`
///
/// `content` carries the bytes of a file upload and is None when a
/// collection is created.
pub fn add_member(
    table: &mut NodeTable,
    ctx: &RequestContext<'_>,
    parent: NodeId,
    child: NodeId,
    content: Option<&[u8]>,
) -> Result<(), ViewError> {
    let access = ctx.access();
    let parent_kind = table.kind(parent).clone();
    let child_kind = table.kind(child).clone();
    if content.is_some() && child_kind.capabilities().is_collection {
        return Err(ViewError::MethodNotAllowed(format!(
            "{} is a collection and cannot hold file content",
            table.path(child)
        )));
    }

    match (&parent_kind, &child_kind) {
        (NodeKind::Page { page }, _) => {
            access.check(Right::Edit, page.clone())?;
            match &child_kind {
                NodeKind::TempFile { .. } => write_temp(table, ctx, child, content)?,
                NodeKind::Page { page: new_page } => {
                    access.check(Right::Edit, new_page.clone())?;
                    let mut document = placeholder(ctx, new_page)?;
                    document.parent = Some(page.clone());
                    ctx.repository.save_document(&document)?;
                }
                NodeKind::WikiFile {
                    format: WikiFileFormat::Xml,
                    ..
                } => {
                    return Err(ViewError::MethodNotAllowed(
                        "wiki.xml is read-only".to_string(),
                    ))
                }
                NodeKind::WikiFile {
                    format: WikiFileFormat::Text,
                    ..
                } => {
                    let bytes = content
                        .ok_or_else(|| ViewError::BadRequest("wiki.txt needs content".into()))?;
                    let text = String::from_utf8(bytes.to_vec()).map_err(|_| {
                        ViewError::BadRequest("wiki.txt content is not UTF-8".to_string())
                    })?;
                    let mut document = table.document(ctx.repository, parent)?.clone();
                    document.content = text;
                    ctx.repository.save_document(&document)?;
                    table.invalidate(parent);
                }
                NodeKind::Attachment { attachment } => {
                    let bytes = content.ok_or_else(|| {
                        ViewError::BadRequest(format!("{} needs content", attachment))
                    })?;
                    ctx.repository.save_attachment(attachment, bytes)?;
                }
                other => {
                    return Err(ViewError::Internal(format!(
                        "a page cannot hold {}",
                        other.display_name()
                    )))
                }
            }
        }
        (_, NodeKind::TempFile { .. }) => write_temp(table, ctx, child, content)?,
        (
            NodeKind::SpaceGroup {
                view: ViewKind::Pages,
                ..
            },
            NodeKind::Page { page },
        ) => {
            access.check(Right::Edit, page.clone())?;
            ctx.repository.save_document(&placeholder(ctx, page)?)?;
        }
        (
            NodeKind::RootGroup {
                view: ViewKind::Pages,
            },
            NodeKind::SpaceGroup { space, .. },
        ) => {
            let home = PageRef::new(ctx.config.home_page.clone(), space.clone());
            access.check(Right::Edit, home.clone())?;
            ctx.repository.save_document(&placeholder(ctx, &home)?)?;
        }
        (NodeKind::PageLetterGroup { .. } | NodeKind::AttachmentLetterGroup { .. }, _) => {
            let semantic = table.semantic_parent(parent).ok_or_else(|| {
                ViewError::Internal("letter group without a directory".to_string())
            })?;
            return add_member(table, ctx, semantic, child, content);
        }
        _ => {
            return Err(ViewError::BadRequest(format!(
                "{} cannot be created in {}",
                child_kind.display_name(),
                table.path(parent)
            )))
        }
    }

    info!("{}: created {}", ctx.id, table.path(child));
    table.invalidate(child);
    Ok(())
}

/// Removes `child` from `parent`
pub fn remove_member(
    table: &mut NodeTable,
    ctx: &RequestContext<'_>,
    parent: NodeId,
    child: NodeId,
) -> Result<(), ViewError> {
    let access = ctx.access();
    let parent_kind = table.kind(parent).clone();
    let child_kind = table.kind(child).clone();

    match (&parent_kind, &child_kind) {
        (NodeKind::Page { page }, _) => {
            access.check(Right::Edit, page.clone())?;
            match &child_kind {
                NodeKind::TempFile { .. } => remove_temp(table, ctx, child)?,
                NodeKind::WikiFile { .. } => access.check(Right::Delete, page.clone())?,
                NodeKind::Attachment { attachment } => {
                    ctx.repository.delete_attachment(attachment)?
                }
                NodeKind::Page { page: removed } => {
                    access.check(Right::Delete, removed.clone())?;
                    delete_if_exists(ctx, removed)?;
                }
                other => {
                    return Err(ViewError::Internal(format!(
                        "a page cannot hold {}",
                        other.display_name()
                    )))
                }
            }
        }
        (_, NodeKind::TempFile { .. }) => remove_temp(table, ctx, child)?,
        (
            NodeKind::SpaceGroup {
                view: ViewKind::Pages,
                ..
            },
            NodeKind::Page { page },
        ) => {
            access.check(Right::Delete, page.clone())?;
            delete_if_exists(ctx, page)?;
        }
        (
            NodeKind::SpaceGroup {
                space,
                view: ViewKind::Pages,
            },
            NodeKind::PageLetterGroup { group, .. },
        ) => {
            let pages = ctx.repository.child_pages_with_prefix(space, group.key())?;
            delete_all(ctx, &format!("delete of {}", table.path(child)), &pages)?;
        }
        (
            NodeKind::RootGroup {
                view: ViewKind::Pages,
            },
            NodeKind::SpaceGroup { space, .. },
        ) => {
            let pages = ctx.repository.child_pages_of_space(space)?;
            delete_all(ctx, &format!("delete of space {}", space), &pages)?;
        }
        (NodeKind::PageLetterGroup { .. } | NodeKind::AttachmentLetterGroup { .. }, _) => {
            let semantic = table.semantic_parent(parent).ok_or_else(|| {
                ViewError::Internal("letter group without a directory".to_string())
            })?;
            return remove_member(table, ctx, semantic, child);
        }
        _ => {
            return Err(ViewError::BadRequest(format!(
                "{} cannot be removed from {}",
                child_kind.display_name(),
                table.path(parent)
            )))
        }
    }

    info!("{}: removed {}", ctx.id, table.path(child));
    table.invalidate(child);
    Ok(())
}

/// Moves (renames) `source` to `destination`
pub fn move_node(
    table: &mut NodeTable,
    ctx: &RequestContext<'_>,
    source: NodeId,
    destination: NodeId,
) -> Result<(), ViewError> {
    let source_kind = table.kind(source).clone();
    let destination_kind = table.kind(destination).clone();
    if !source_kind.capabilities().can_move {
        return Err(ViewError::BadRequest(format!(
            "{} cannot be moved",
            table.path(source)
        )));
    }
    if source_kind == destination_kind {
        return Err(ViewError::BadRequest(format!(
            "{} is already there",
            table.path(source)
        )));
    }

    match (&source_kind, &destination_kind) {
        (NodeKind::Page { page: from }, NodeKind::Page { page: to }) => {
            move_page(ctx, from, to)?
        }
        (
            NodeKind::SpaceGroup {
                space: from,
                view: ViewKind::Pages,
            },
            NodeKind::SpaceGroup {
                space: to,
                view: ViewKind::Pages,
            },
        ) => {
            let same_container = match (
                table.semantic_parent(source),
                table.semantic_parent(destination),
            ) {
                (Some(a), Some(b)) => table.kind(a) == table.kind(b),
                _ => false,
            };
            if !same_container {
                return Err(ViewError::BadRequest(format!(
                    "{} can only be renamed within its parent",
                    from
                )));
            }
            move_space(ctx, from, to)?
        }
        (NodeKind::Attachment { attachment: from }, NodeKind::Attachment { attachment: to }) => {
            let access = ctx.access();
            access.check(Right::Edit, from.page().clone())?;
            access.check(Right::Edit, to.page().clone())?;
            ctx.repository.move_attachment(from, to)?;
        }
        _ => {
            return Err(ViewError::BadRequest(format!(
                "{} cannot be moved to {}",
                table.path(source),
                table.path(destination)
            )))
        }
    }

    info!(
        "{}: moved {} to {}",
        ctx.id,
        table.path(source),
        table.path(destination)
    );
    table.invalidate(source);
    table.invalidate(destination);
    Ok(())
}

fn move_page(ctx: &RequestContext<'_>, from: &PageRef, to: &PageRef) -> Result<(), ViewError> {
    let access = ctx.access();
    access.check(Right::Edit, from.clone())?;

    let target_space = to.require_space()?;
    if !ctx.repository.space_exists(target_space) {
        return Err(ViewError::BadRequest(format!(
            "space {} does not exist",
            target_space
        )));
    }
    if ctx.principal.owns_profile(from) {
        return Err(ViewError::MethodNotAllowed(format!(
            "{} is the profile page of {}",
            from, ctx.principal.name
        )));
    }
    access.check(Right::Overwrite, to.clone())?;
    let (own, mut children): (Vec<PageRef>, Vec<PageRef>) = ctx
        .repository
        .child_pages_of_page(from)?
        .into_iter()
        .partition(|child| child == from);
    for child in &children {
        access.check(Right::Edit, child.clone())?;
    }

    ctx.repository.rename_document(from, to)?;
    // A page that is its own parent keeps pointing at itself under the new name.
    if !own.is_empty() {
        children.push(to.clone());
    }
    apply_batch(ctx, &format!("re-parenting children of {}", from), &children, |child| {
        let mut document = ctx.repository.get_document(child)?;
        document.parent = Some(to.clone());
        ctx.repository.save_document(&document)
    })
}

fn move_space(ctx: &RequestContext<'_>, from: &SpaceRef, to: &SpaceRef) -> Result<(), ViewError> {
    if ctx.repository.space_exists(to) {
        return Err(ViewError::BadRequest(format!("space {} already exists", to)));
    }
    let access = ctx.access();
    access.check(Right::Edit, to.clone())?;

    let pages = ctx.repository.child_pages_of_space(from)?;
    for page in &pages {
        access.check(Right::Overwrite, page.clone())?;
        if ctx.principal.owns_profile(page) {
            return Err(ViewError::MethodNotAllowed(format!(
                "{} holds the profile page of {}",
                from, ctx.principal.name
            )));
        }
    }

    apply_batch(ctx, &format!("rename of space {} to {}", from, to), &pages, |page| {
        ctx.repository.rename_document(page, &page.moved_to(to))
    })
}

/// Checks delete on every page, then deletes them one by one
fn delete_all(ctx: &RequestContext<'_>, what: &str, pages: &[PageRef]) -> Result<(), ViewError> {
    let access = ctx.access();
    for page in pages {
        access.check(Right::Delete, page.clone())?;
    }
    apply_batch(ctx, what, pages, |page| ctx.repository.delete_document(page))
}

fn apply_batch<T>(
    ctx: &RequestContext<'_>,
    what: &str,
    items: &[T],
    mut op: impl FnMut(&T) -> Result<(), StorageError>,
) -> Result<(), ViewError> {
    for (done, item) in items.iter().enumerate() {
        if let Err(err) = op(item) {
            error!(
                "{}: {} partially applied {} of {}: {}",
                ctx.id,
                what,
                done,
                items.len(),
                err
            );
            return Err(ViewError::Internal(format!(
                "{} partially applied {} of {}: {}",
                what,
                done,
                items.len(),
                err
            )));
        }
    }
    Ok(())
}

fn placeholder(ctx: &RequestContext<'_>, page: &PageRef) -> Result<Document, ViewError> {
    let mut document = ctx.repository.get_document(page)?;
    document.content = ctx.config.placeholder_content.clone();
    if document.is_new {
        document.locale = ctx.config.default_locale.clone();
    }
    Ok(document)
}

fn delete_if_exists(ctx: &RequestContext<'_>, page: &PageRef) -> Result<(), ViewError> {
    if ctx.repository.document_exists(page) {
        ctx.repository.delete_document(page)?;
    }
    Ok(())
}

fn write_temp(
    table: &NodeTable,
    ctx: &RequestContext<'_>,
    child: NodeId,
    content: Option<&[u8]>,
) -> Result<(), ViewError> {
    let data = content.map(<[u8]>::to_vec).unwrap_or_default();
    ctx.require_temp_store()?.write(&table.path(child), data);
    Ok(())
}

fn remove_temp(table: &NodeTable, ctx: &RequestContext<'_>, child: NodeId) -> Result<(), ViewError> {
    let path = table.path(child);
    if !ctx.require_temp_store()?.remove(&path) {
        return Err(ViewError::BadRequest(format!("{} does not exist", path)));
    }
    Ok(())
}
