//! Reference serialization
//!
//! Spaces are joined with `.`, a page is `space.name` and an attachment is
//! `space.name@filename`. The reserved characters `.`, `@` and `\` are
//! escaped with `\` wherever they occur inside a name, which keeps parsing the
//! exact inverse of serialization.
//!
//! ```
//! use core_types::{parse_page_ref, serialize_page, PageRef, SpaceRef};
//!
//! let page = PageRef::new("Release 1.0", SpaceRef::new("Main").child("Notes"));
//! let text = serialize_page(&page);
//! assert_eq!(text, "Main.Notes.Release 1\\.0");
//! assert_eq!(parse_page_ref(&text).unwrap(), page);
//! ```

use crate::refs::{AttachmentRef, PageRef, RefError, SpaceRef};

const SPACE_SEPARATOR: char = '.';
const ATTACHMENT_SEPARATOR: char = '@';
const ESCAPE: char = '\\';

fn is_reserved(c: char) -> bool {
    c == SPACE_SEPARATOR || c == ATTACHMENT_SEPARATOR || c == ESCAPE
}

fn escape_into(out: &mut String, name: &str) {
    for c in name.chars() {
        if is_reserved(c) {
            out.push(ESCAPE);
        }
        out.push(c);
    }
}

/// Serializes a space reference
pub fn serialize_space(space: &SpaceRef) -> String {
    let mut out = String::new();
    for (i, segment) in space.segments().iter().enumerate() {
        if i > 0 {
            out.push(SPACE_SEPARATOR);
        }
        escape_into(&mut out, segment);
    }
    out
}

/// Serializes a page reference
///
/// A relative reference serializes to its bare (escaped) name.
pub fn serialize_page(page: &PageRef) -> String {
    let mut out = match page.space() {
        Some(space) => {
            let mut s = serialize_space(space);
            s.push(SPACE_SEPARATOR);
            s
        }
        None => String::new(),
    };
    escape_into(&mut out, page.name());
    out
}

/// Serializes an attachment reference
pub fn serialize_attachment(attachment: &AttachmentRef) -> String {
    let mut out = serialize_page(attachment.page());
    out.push(ATTACHMENT_SEPARATOR);
    escape_into(&mut out, attachment.filename());
    out
}

/// Splits on every unescaped `separator`, keeping escapes in the pieces
fn split_raw(input: &str, separator: char) -> Result<Vec<&str>, RefError> {
    let mut pieces = Vec::new();
    let mut start = 0;
    let mut escaped = false;
    for (i, c) in input.char_indices() {
        if escaped {
            escaped = false;
        } else if c == ESCAPE {
            escaped = true;
        } else if c == separator {
            pieces.push(&input[start..i]);
            start = i + c.len_utf8();
        }
    }
    if escaped {
        return Err(RefError::Malformed(input.to_string()));
    }
    pieces.push(&input[start..]);
    Ok(pieces)
}

/// Removes escapes from one name, rejecting empty names and stray separators
fn unescape(raw: &str, whole: &str) -> Result<String, RefError> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c == ESCAPE {
            match chars.next() {
                Some(next) if is_reserved(next) => out.push(next),
                _ => return Err(RefError::Malformed(whole.to_string())),
            }
        } else if is_reserved(c) {
            return Err(RefError::Malformed(whole.to_string()));
        } else {
            out.push(c);
        }
    }
    if out.is_empty() {
        return Err(RefError::Malformed(whole.to_string()));
    }
    Ok(out)
}

fn parse_segments(input: &str) -> Result<Vec<String>, RefError> {
    split_raw(input, SPACE_SEPARATOR)?
        .into_iter()
        .map(|raw| unescape(raw, input))
        .collect()
}

/// Parses a serialized space reference
pub fn parse_space_ref(input: &str) -> Result<SpaceRef, RefError> {
    SpaceRef::from_segments(parse_segments(input)?)
}

/// Parses a serialized page reference
///
/// A single name without separator yields a relative reference.
pub fn parse_page_ref(input: &str) -> Result<PageRef, RefError> {
    let mut segments = parse_segments(input)?;
    let name = segments
        .pop()
        .ok_or_else(|| RefError::Malformed(input.to_string()))?;
    if segments.is_empty() {
        return Ok(PageRef::relative(name));
    }
    Ok(PageRef::new(name, SpaceRef::from_segments(segments)?))
}

/// Parses a serialized attachment reference
pub fn parse_attachment_ref(input: &str) -> Result<AttachmentRef, RefError> {
    let pieces = split_raw(input, ATTACHMENT_SEPARATOR)?;
    let [page, filename] = pieces.as_slice() else {
        return Err(RefError::Malformed(input.to_string()));
    };
    let page = parse_page_ref(page)?;
    let filename = unescape(filename, input)?;
    Ok(AttachmentRef::new(page, filename))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(space: &[&str], name: &str) -> PageRef {
        PageRef::new(name, SpaceRef::from_segments(space.iter().copied()).unwrap())
    }

    #[test]
    fn test_serialize_simple_page() {
        assert_eq!(serialize_page(&page(&["Main"], "WebHome")), "Main.WebHome");
    }

    #[test]
    fn test_serialize_nested_space() {
        let space = SpaceRef::new("Main").child("Sub");
        assert_eq!(serialize_space(&space), "Main.Sub");
        assert_eq!(serialize_page(&PageRef::new("A", space)), "Main.Sub.A");
    }

    #[test]
    fn test_serialize_relative_page() {
        assert_eq!(serialize_page(&PageRef::relative("A.B")), "A\\.B");
    }

    #[test]
    fn test_serialize_attachment() {
        let attachment = AttachmentRef::new(page(&["Main"], "A"), "photo.png");
        assert_eq!(serialize_attachment(&attachment), "Main.A@photo\\.png");
    }

    #[test]
    fn test_parse_simple_page() {
        assert_eq!(
            parse_page_ref("Main.WebHome").unwrap(),
            page(&["Main"], "WebHome")
        );
    }

    #[test]
    fn test_parse_relative_page() {
        let parsed = parse_page_ref("WebHome").unwrap();
        assert_eq!(parsed.space(), None);
        assert_eq!(parsed.name(), "WebHome");
    }

    #[test]
    fn test_parse_nested_space() {
        let space = parse_space_ref("Main.Sub").unwrap();
        assert_eq!(space.segments(), &["Main".to_string(), "Sub".to_string()]);
    }

    #[test]
    fn test_parse_escaped_names() {
        let parsed = parse_page_ref("Dev\\.Ops.Release 1\\.0").unwrap();
        assert_eq!(parsed, page(&["Dev.Ops"], "Release 1.0"));
    }

    #[test]
    fn test_parse_attachment() {
        let parsed = parse_attachment_ref("Main.A@photo\\.png").unwrap();
        assert_eq!(parsed.page(), &page(&["Main"], "A"));
        assert_eq!(parsed.filename(), "photo.png");
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(parse_page_ref("").is_err());
        assert!(parse_page_ref("Main..A").is_err());
        assert!(parse_page_ref("Main.A\\").is_err());
        assert!(parse_page_ref("Main.A@b").is_err());
        assert!(parse_space_ref(".Main").is_err());
        assert!(parse_attachment_ref("Main.A").is_err());
        assert!(parse_attachment_ref("Main.A@x@y").is_err());
        assert!(parse_attachment_ref("Main.A@").is_err());
    }

    #[test]
    fn test_round_trip_with_reserved_characters() {
        let refs = [
            page(&["Main"], "WebHome"),
            page(&["a.b", "c@d"], "e\\f"),
            page(&["Main", "Sub", "Deeper"], "Ünïcode page"),
            page(&["x"], "trailing."),
        ];
        for r in refs {
            assert_eq!(parse_page_ref(&serialize_page(&r)).unwrap(), r);
        }

        let attachment = AttachmentRef::new(page(&["Main"], "A@B"), "x.y\\z");
        assert_eq!(
            parse_attachment_ref(&serialize_attachment(&attachment)).unwrap(),
            attachment
        );
    }

    #[test]
    fn test_equality_matches_serialized_form() {
        let a = page(&["Main"], "A");
        let b = parse_page_ref("Main.A").unwrap();
        assert_eq!(a == b, serialize_page(&a) == serialize_page(&b));

        let c = page(&["Main", "A"], "B");
        let d = page(&["Main"], "A.B");
        assert_ne!(c, d);
        assert_ne!(serialize_page(&c), serialize_page(&d));
    }
}
