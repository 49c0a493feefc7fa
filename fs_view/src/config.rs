//! View configuration

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::grouping::GroupingThresholds;

/// Errors raised while loading a configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Tunables of the wiki view
///
/// Every field has a default, so a partial JSON document is enough:
///
/// ```
/// use fs_view::ViewConfig;
///
/// let config = ViewConfig::from_json(r#"{ "home_page": "Start" }"#).unwrap();
/// assert_eq!(config.home_page, "Start");
/// assert_eq!(config.grouping.one_letter, 40);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
    /// When listings switch to letter groups
    pub grouping: GroupingThresholds,
    /// Content given to pages created as directories
    pub placeholder_content: String,
    /// Page created when a space is created
    pub home_page: String,
    /// Locale recorded on pages created through the view
    pub default_locale: String,
    /// Number of users whose temp files are kept
    pub session_capacity: usize,
    /// Seconds of inactivity after which a user's temp files are dropped
    pub session_max_idle_secs: u64,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            grouping: GroupingThresholds::default(),
            placeholder_content: "This page was created through the file view.".to_string(),
            home_page: "WebHome".to_string(),
            default_locale: String::new(),
            session_capacity: 1024,
            session_max_idle_secs: 300,
        }
    }
}

impl ViewConfig {
    /// Parses and validates a JSON configuration
    pub fn from_json(input: &str) -> Result<Self, ConfigError> {
        let config: ViewConfig = serde_json::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the invariants serde cannot express
    pub fn validate(&self) -> Result<(), ConfigError> {
        let g = &self.grouping;
        if !(g.one_letter <= g.two_letters && g.two_letters <= g.three_letters) {
            return Err(ConfigError::Invalid(format!(
                "grouping thresholds must not decrease ({}, {}, {})",
                g.one_letter, g.two_letters, g.three_letters
            )));
        }
        if self.home_page.is_empty() {
            return Err(ConfigError::Invalid("home_page is empty".to_string()));
        }
        if self.session_capacity == 0 {
            return Err(ConfigError::Invalid(
                "session_capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
