//! File content of leaf nodes
//!
//! `wiki.txt` carries the page markup as is. `wiki.xml` is a self-contained
//! export of the page snapshot and is read-only.

use services_storage::Document;

use crate::context::RequestContext;
use crate::error::ViewError;
use crate::node::{NodeId, NodeKind, NodeTable, WikiFileFormat};

/// Returns the bytes served for a file node
pub fn file_content(
    table: &NodeTable,
    ctx: &RequestContext<'_>,
    id: NodeId,
) -> Result<Vec<u8>, ViewError> {
    match table.kind(id) {
        NodeKind::WikiFile { format, .. } => {
            let format = *format;
            let document = table.document(ctx.repository, id)?;
            if !document.exists() {
                return Err(ViewError::bad_request(format!(
                    "{} does not exist",
                    document.reference
                )));
            }
            Ok(match format {
                WikiFileFormat::Text => document.content.clone().into_bytes(),
                WikiFileFormat::Xml => render_xml(document).into_bytes(),
            })
        }
        NodeKind::Attachment { attachment } => Ok(ctx.repository.attachment_content(attachment)?),
        NodeKind::TempFile { .. } => ctx
            .require_temp_store()?
            .read(&table.path(id))
            .ok_or_else(|| ViewError::bad_request(format!("{} does not exist", table.path(id)))),
        _ => Err(ViewError::bad_request(format!(
            "{} is a directory",
            table.path(id)
        ))),
    }
}

/// Renders a page snapshot as an XML document
pub fn render_xml(document: &Document) -> String {
    let mut xml = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<document>\n");
    let mut field = |name: &str, value: &str| {
        xml.push_str(&format!("  <{}>{}</{}>\n", name, escape(value), name));
    };
    field("reference", &document.reference.to_string());
    field(
        "space",
        &document
            .reference
            .space()
            .map(|space| space.to_string())
            .unwrap_or_default(),
    );
    field("name", document.reference.name());
    field(
        "parent",
        &document
            .parent
            .as_ref()
            .map(|parent| parent.to_string())
            .unwrap_or_default(),
    );
    field("locale", &document.locale);
    field("created", &document.created_at.to_string());
    field("updated", &document.updated_at.to_string());
    field("content", &document.content);
    xml.push_str("</document>\n");
    xml
}

fn escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            other => escaped.push(other),
        }
    }
    escaped
}
