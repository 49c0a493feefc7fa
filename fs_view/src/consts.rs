//! Reserved names that are part of the path contract

/// Marker opening and closing every grouping directory name
pub const GROUP_MARKER: char = '_';

/// Plain-text view of a page
pub const WIKI_TXT: &str = "wiki.txt";

/// XML export view of a page
pub const WIKI_XML: &str = "wiki.xml";

/// Base view listing spaces and their pages
pub const PAGES_VIEW: &str = "spaces";

/// Base view listing pages that hold attachments
pub const ATTACHMENTS_VIEW: &str = "attachments";

/// Base view listing pages without an existing parent
pub const ORPHANS_VIEW: &str = "orphans";

/// Returns true for names that editors and file managers create as scratch
/// files. These never reach the repository.
pub fn is_temp_resource(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    name.starts_with('.') || name.ends_with('~') || lower == "desktop.ini" || lower == "thumbs.db"
}
