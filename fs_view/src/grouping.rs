//! Letter grouping of large listings
//!
//! When a space holds many pages, its listing is replaced by one directory
//! per name prefix. The prefix length grows with the number of pages so
//! that each bucket stays small.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::consts::GROUP_MARKER;
use crate::error::ViewError;

/// Listing sizes at which the prefix length grows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupingThresholds {
    /// Group by one letter from this many pages on
    pub one_letter: usize,
    /// Group by two letters from this many pages on
    pub two_letters: usize,
    /// Group by three letters from this many pages on
    pub three_letters: usize,
}

impl Default for GroupingThresholds {
    fn default() -> Self {
        Self {
            one_letter: 40,
            two_letters: 200,
            three_letters: 5000,
        }
    }
}

/// Chooses prefix lengths and bucket keys
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GroupingStrategy {
    thresholds: GroupingThresholds,
}

impl GroupingStrategy {
    pub fn new(thresholds: GroupingThresholds) -> Self {
        Self { thresholds }
    }

    /// Returns the prefix length to group `count` names by, 0 for no grouping
    pub fn prefix_length(&self, count: usize) -> usize {
        if count < self.thresholds.one_letter {
            0
        } else if count < self.thresholds.two_letters {
            1
        } else if count < self.thresholds.three_letters {
            2
        } else {
            3
        }
    }

    /// Returns the uppercased first `length` characters of `name`
    ///
    /// Names shorter than `length` are used whole.
    pub fn bucket_key(name: &str, length: usize) -> String {
        name.chars().take(length).collect::<String>().to_uppercase()
    }

    /// Returns the distinct bucket keys for a set of names, in order
    pub fn buckets<'a, I>(names: I, length: usize) -> BTreeSet<String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        names
            .into_iter()
            .map(|name| Self::bucket_key(name, length))
            .collect()
    }
}

/// Name of a letter group directory: `_KEY_` with a non-empty uppercase key
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupName {
    key: String,
}

impl GroupName {
    /// Creates a group name from a bucket key
    pub fn from_key(key: &str) -> Result<Self, ViewError> {
        if key.is_empty() || key != key.to_uppercase() {
            return Err(ViewError::internal(format!(
                "invalid letter group key {:?}",
                key
            )));
        }
        Ok(Self {
            key: key.to_string(),
        })
    }

    /// Parses a full `_KEY_` name
    ///
    /// A name that does not follow the pattern is a broken invariant, not a
    /// user error: callers screen user tokens with
    /// [`GroupName::from_token`].
    pub fn parse(name: &str) -> Result<Self, ViewError> {
        let key = name
            .strip_prefix(GROUP_MARKER)
            .and_then(|rest| rest.strip_suffix(GROUP_MARKER))
            .ok_or_else(|| ViewError::internal(format!("invalid letter group name {:?}", name)))?;
        Self::from_key(key)
    }

    /// Returns true if a path token is shaped like a group name
    pub fn is_group_token(token: &str) -> bool {
        token.chars().count() >= 2
            && token.starts_with(GROUP_MARKER)
            && token.ends_with(GROUP_MARKER)
    }

    /// Builds a group name from a user token, uppercasing it
    pub fn from_token(token: &str) -> Result<Self, ViewError> {
        if token.chars().count() == 2 {
            return Err(ViewError::bad_request(format!(
                "{:?} is not a valid group name",
                token
            )));
        }
        Self::parse(&token.to_uppercase())
    }

    /// Returns the uppercase key
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Returns the directory name
    pub fn name(&self) -> String {
        format!("{}{}{}", GROUP_MARKER, self.key, GROUP_MARKER)
    }

    /// Returns true if `name` belongs to this group
    pub fn matches(&self, name: &str) -> bool {
        name.to_uppercase().starts_with(&self.key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_length_boundaries() {
        let strategy = GroupingStrategy::default();
        assert_eq!(strategy.prefix_length(0), 0);
        assert_eq!(strategy.prefix_length(39), 0);
        assert_eq!(strategy.prefix_length(40), 1);
        assert_eq!(strategy.prefix_length(199), 1);
        assert_eq!(strategy.prefix_length(200), 2);
        assert_eq!(strategy.prefix_length(4999), 2);
        assert_eq!(strategy.prefix_length(5000), 3);
    }

    #[test]
    fn test_custom_thresholds() {
        let strategy = GroupingStrategy::new(GroupingThresholds {
            one_letter: 3,
            two_letters: 6,
            three_letters: 9,
        });
        assert_eq!(strategy.prefix_length(2), 0);
        assert_eq!(strategy.prefix_length(3), 1);
        assert_eq!(strategy.prefix_length(9), 3);
    }

    #[test]
    fn test_bucket_key() {
        assert_eq!(GroupingStrategy::bucket_key("alpha", 1), "A");
        assert_eq!(GroupingStrategy::bucket_key("alpha", 2), "AL");
        assert_eq!(GroupingStrategy::bucket_key("A", 3), "A");
        assert_eq!(GroupingStrategy::bucket_key("émile", 1), "É");
    }

    #[test]
    fn test_buckets_are_distinct_and_sorted() {
        let names = ["beta", "Alpha", "apple", "Bravo", "c"];
        let buckets = GroupingStrategy::buckets(names.iter().copied(), 1);
        assert_eq!(
            buckets.into_iter().collect::<Vec<_>>(),
            vec!["A".to_string(), "B".to_string(), "C".to_string()]
        );
    }

    #[test]
    fn test_group_name_parse() {
        let group = GroupName::parse("_AB_").unwrap();
        assert_eq!(group.key(), "AB");
        assert_eq!(group.name(), "_AB_");

        assert!(matches!(GroupName::parse("AB"), Err(ViewError::Internal(_))));
        assert!(matches!(GroupName::parse("__"), Err(ViewError::Internal(_))));
        assert!(matches!(GroupName::parse("_ab_"), Err(ViewError::Internal(_))));
    }

    #[test]
    fn test_group_name_from_token() {
        assert_eq!(GroupName::from_token("_ab_").unwrap().key(), "AB");
        assert!(matches!(
            GroupName::from_token("__"),
            Err(ViewError::BadRequest(_))
        ));
    }

    #[test]
    fn test_group_tokens() {
        assert!(GroupName::is_group_token("_A_"));
        assert!(GroupName::is_group_token("__"));
        assert!(!GroupName::is_group_token("_"));
        assert!(!GroupName::is_group_token("_A"));
        assert!(!GroupName::is_group_token("WebHome"));
    }

    #[test]
    fn test_group_matches() {
        let group = GroupName::from_key("AL").unwrap();
        assert!(group.matches("alpha"));
        assert!(group.matches("ALTO"));
        assert!(!group.matches("beta"));
    }
}
