//! Request path handling
//!
//! Splits a request path into the tokens the resolver decodes one by one.

use thiserror::Error;

/// Errors that can occur while splitting a request path
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PathError {
    /// A component is empty, `.` or `..`
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// A component contains a character that can never name a node
    #[error("Invalid component: {0:?}")]
    InvalidComponent(String),
}

/// Path tokenizer
pub struct PathResolver;

impl PathResolver {
    /// Splits a path into tokens
    ///
    /// The root path (`/` or the empty string) yields no tokens.
    ///
    /// # Examples
    ///
    /// ```
    /// use fs_view::PathResolver;
    ///
    /// let tokens = PathResolver::split_path("/spaces/Main/WebHome/wiki.txt").unwrap();
    /// assert_eq!(tokens, vec!["spaces", "Main", "WebHome", "wiki.txt"]);
    ///
    /// assert!(PathResolver::split_path("/").unwrap().is_empty());
    /// ```
    pub fn split_path(path: &str) -> Result<Vec<&str>, PathError> {
        let path = path.trim_matches('/');
        if path.is_empty() {
            return Ok(Vec::new());
        }

        let components: Vec<&str> = path.split('/').collect();
        for component in &components {
            if component.is_empty() {
                return Err(PathError::InvalidPath(
                    "Path contains empty component".to_string(),
                ));
            }
            if *component == "." || *component == ".." {
                return Err(PathError::InvalidPath(
                    "Relative path components (. or ..) are not supported".to_string(),
                ));
            }
            if !Self::is_valid_name(component) {
                return Err(PathError::InvalidComponent(component.to_string()));
            }
        }

        Ok(components)
    }

    /// Splits a path into its parent path and last token
    ///
    /// Returns None for the root path.
    pub fn split_last(path: &str) -> Result<Option<(Vec<&str>, &str)>, PathError> {
        let mut tokens = Self::split_path(path)?;
        Ok(tokens.pop().map(|last| (tokens, last)))
    }

    /// Validates a single token
    pub fn is_valid_name(name: &str) -> bool {
        !name.is_empty()
            && name != "."
            && name != ".."
            && !name.contains('/')
            && !name.contains('\0')
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_nested_path() {
        let result = PathResolver::split_path("spaces/Main/WebHome").unwrap();
        assert_eq!(result, vec!["spaces", "Main", "WebHome"]);
    }

    #[test]
    fn test_split_path_with_slashes() {
        let result = PathResolver::split_path("/orphans/Main.A/").unwrap();
        assert_eq!(result, vec!["orphans", "Main.A"]);
    }

    #[test]
    fn test_root_path_has_no_tokens() {
        assert!(PathResolver::split_path("").unwrap().is_empty());
        assert!(PathResolver::split_path("///").unwrap().is_empty());
    }

    #[test]
    fn test_double_slash() {
        let result = PathResolver::split_path("spaces//Main");
        assert!(matches!(result, Err(PathError::InvalidPath(_))));
    }

    #[test]
    fn test_dot_components() {
        assert!(matches!(
            PathResolver::split_path("spaces/./Main"),
            Err(PathError::InvalidPath(_))
        ));
        assert!(matches!(
            PathResolver::split_path("spaces/../orphans"),
            Err(PathError::InvalidPath(_))
        ));
    }

    #[test]
    fn test_nul_component() {
        let result = PathResolver::split_path("spaces/Ma\0in");
        assert!(matches!(result, Err(PathError::InvalidComponent(_))));
    }

    #[test]
    fn test_split_last() {
        let (parent, last) = PathResolver::split_last("/spaces/Main/A").unwrap().unwrap();
        assert_eq!(parent, vec!["spaces", "Main"]);
        assert_eq!(last, "A");
        assert!(PathResolver::split_last("/").unwrap().is_none());
    }

    #[test]
    fn test_is_valid_name() {
        assert!(PathResolver::is_valid_name("wiki.txt"));
        assert!(PathResolver::is_valid_name("_AB_"));
        assert!(PathResolver::is_valid_name(".hidden"));

        assert!(!PathResolver::is_valid_name(""));
        assert!(!PathResolver::is_valid_name(".."));
        assert!(!PathResolver::is_valid_name("has/slash"));
    }
}
