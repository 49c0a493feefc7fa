//! Path resolution
//!
//! A path is decoded one token at a time. Each node kind knows which
//! children it can have, so the node reached so far decodes the next token.
//! Whether a token is the last one matters: a name that does not exist yet
//! is acceptable at the end of a create or move request and nowhere else.

use core_types::{parse_page_ref, parse_space_ref, AttachmentRef, PageRef, SpaceRef};
use log::debug;

use crate::consts::{is_temp_resource, ATTACHMENTS_VIEW, ORPHANS_VIEW, PAGES_VIEW};
use crate::context::{MoveSource, RequestContext};
use crate::error::ViewError;
use crate::grouping::GroupName;
use crate::node::{NodeId, NodeKind, NodeTable, ViewKind, WikiFileFormat};
use crate::path::PathResolver;

/// Resolves a full path from the root of the table
pub fn resolve_path(
    table: &mut NodeTable,
    ctx: &RequestContext<'_>,
    path: &str,
) -> Result<NodeId, ViewError> {
    let tokens = PathResolver::split_path(path)?;
    let root = table.root();
    resolve(table, ctx, root, &tokens)
}

/// Resolves `tokens` starting at `start`
///
/// Decoding never writes to the repository. Resolving the same tokens with
/// the same repository state and intent yields the same node chain.
pub fn resolve(
    table: &mut NodeTable,
    ctx: &RequestContext<'_>,
    start: NodeId,
    tokens: &[&str],
) -> Result<NodeId, ViewError> {
    if tokens.is_empty() {
        return Ok(start);
    }
    resolve_from(table, ctx, start, tokens, 0)
}

fn resolve_from(
    table: &mut NodeTable,
    ctx: &RequestContext<'_>,
    node: NodeId,
    tokens: &[&str],
    next: usize,
) -> Result<NodeId, ViewError> {
    let child = decode(table, ctx, node, tokens, next)?;
    if next + 1 == tokens.len() {
        Ok(child)
    } else {
        resolve_from(table, ctx, child, tokens, next + 1)
    }
}

/// Decodes `tokens[next]` below `node`
fn decode(
    table: &mut NodeTable,
    ctx: &RequestContext<'_>,
    node: NodeId,
    tokens: &[&str],
    next: usize,
) -> Result<NodeId, ViewError> {
    let token = tokens[next];
    let last = next + 1 == tokens.len();
    let kind = table.kind(node).clone();

    if !kind.capabilities().can_decode {
        return Err(ViewError::bad_request(format!(
            "{} has no children",
            table.path(node)
        )));
    }
    if is_temp_resource(token) {
        return table.insert(
            node,
            NodeKind::TempFile {
                name: token.to_string(),
            },
            token,
        );
    }

    let decoded = match kind {
        NodeKind::WikiRoot => decode_base_view(token)?,
        NodeKind::RootGroup {
            view: ViewKind::Pages,
        } => {
            if last && ctx.intent.is_create_file() {
                return Err(not_found(table, node, token));
            }
            NodeKind::SpaceGroup {
                space: SpaceRef::new(token),
                view: ViewKind::Pages,
            }
        }
        NodeKind::RootGroup {
            view: ViewKind::Attachments,
        } => NodeKind::SpaceGroup {
            space: parse_space_ref(token)?,
            view: ViewKind::Attachments,
        },
        NodeKind::OrphanGroup => {
            let page = parse_page_ref(token)?;
            if page.space().is_none()
                || !ctx.repository.document_exists(&page)
                || (last && ctx.intent.is_create_or_move())
            {
                return Err(not_found(table, node, token));
            }
            NodeKind::Page { page }
        }
        NodeKind::SpaceGroup {
            space,
            view: ViewKind::Pages,
        } => match decode_in_pages_dir(ctx, &space, token, last)? {
            Some(kind) => kind,
            None => return Err(not_found(table, node, token)),
        },
        NodeKind::SpaceGroup {
            space,
            view: ViewKind::Attachments,
        } => {
            if GroupName::is_group_token(token) && !(last && ctx.intent.is_create_or_move()) {
                NodeKind::AttachmentLetterGroup {
                    space,
                    group: GroupName::from_token(token)?,
                }
            } else {
                let page = PageRef::new(token, space);
                if !ctx.repository.document_exists(&page) {
                    return Err(not_found(table, node, token));
                }
                NodeKind::Page { page }
            }
        }
        NodeKind::PageLetterGroup { space, group } => {
            if !group.matches(token) || (last && ctx.intent.is_create_file()) {
                return Err(not_found(table, node, token));
            }
            NodeKind::Page {
                page: PageRef::new(token, space),
            }
        }
        NodeKind::AttachmentLetterGroup { space, .. } => {
            let page = PageRef::new(token, space);
            if !ctx.repository.document_exists(&page) || (last && ctx.intent.is_create_or_move()) {
                return Err(not_found(table, node, token));
            }
            NodeKind::Page { page }
        }
        NodeKind::Page { page } => decode_in_page(ctx, &page, token, last)?,
        NodeKind::Attachment { .. } | NodeKind::WikiFile { .. } | NodeKind::TempFile { .. } => {
            return Err(ViewError::bad_request(format!(
                "{} has no children",
                table.path(node)
            )))
        }
    };

    debug!(
        "{}: {:?} below {} decoded as {}",
        ctx.id,
        token,
        table.path(node),
        decoded.display_name()
    );
    table.insert(node, decoded, token)
}

fn decode_base_view(token: &str) -> Result<NodeKind, ViewError> {
    match token {
        PAGES_VIEW => Ok(NodeKind::RootGroup {
            view: ViewKind::Pages,
        }),
        ATTACHMENTS_VIEW => Ok(NodeKind::RootGroup {
            view: ViewKind::Attachments,
        }),
        ORPHANS_VIEW => Ok(NodeKind::OrphanGroup),
        other => Err(ViewError::bad_request(format!("no base view named {:?}", other))),
    }
}

/// Decodes a token inside a space of the pages view
///
/// Returns None when the token names nothing.
fn decode_in_pages_dir(
    ctx: &RequestContext<'_>,
    space: &SpaceRef,
    token: &str,
    last: bool,
) -> Result<Option<NodeKind>, ViewError> {
    if GroupName::is_group_token(token) && !(last && ctx.intent.is_create_or_move()) {
        return Ok(Some(NodeKind::PageLetterGroup {
            space: space.clone(),
            group: GroupName::from_token(token)?,
        }));
    }

    let moving = if last { ctx.intent.move_source() } else { None };
    let page = PageRef::new(token, space.clone());
    if ctx.intent.is_create_collection()
        || moving == Some(MoveSource::Page)
        || ctx.repository.document_exists(&page)
    {
        return Ok(Some(NodeKind::Page { page }));
    }

    let child_space = space.child(token);
    if moving == Some(MoveSource::Space) || ctx.repository.space_exists(&child_space) {
        return Ok(Some(NodeKind::SpaceGroup {
            space: child_space,
            view: ViewKind::Pages,
        }));
    }

    // Older clients address pages by their full name inside the space.
    if token.starts_with(&format!("{}.", space.name())) {
        if let Ok(page) = parse_page_ref(token) {
            if page.space().is_some() && ctx.repository.document_exists(&page) {
                return Ok(Some(NodeKind::Page { page }));
            }
        }
    }

    Ok(None)
}

fn decode_in_page(
    ctx: &RequestContext<'_>,
    page: &PageRef,
    token: &str,
    last: bool,
) -> Result<NodeKind, ViewError> {
    if let Some(format) = WikiFileFormat::from_name(token) {
        return Ok(NodeKind::WikiFile {
            page: page.clone(),
            format,
        });
    }

    let is_attachment = ctx
        .repository
        .attachments_for_page(page)?
        .iter()
        .any(|name| name == token);
    if is_attachment
        || (last && ctx.intent.is_create_file())
        || (last && ctx.intent.move_source() == Some(MoveSource::Attachment))
    {
        return Ok(NodeKind::Attachment {
            attachment: AttachmentRef::new(page.clone(), token),
        });
    }

    let child = parse_page_ref(token)?;
    let child = match page.space() {
        Some(space) => child.or_in_space(space),
        None => child,
    };
    Ok(NodeKind::Page { page: child })
}

fn not_found(table: &NodeTable, node: NodeId, token: &str) -> ViewError {
    ViewError::bad_request(format!(
        "{:?} cannot be resolved below {}",
        token,
        table.path(node)
    ))
}
