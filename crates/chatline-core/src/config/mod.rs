//! Timeline engine configuration.
//!
//! Policy constants (page size, pagination look-ahead, near-bottom distance)
//! and the current-user identity are passed in at construction time instead of
//! being read from global state. Every field has a documented default, so a
//! config file only needs to name the values it overrides.

#![allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::util::normalize_text_option;

const DEFAULT_PAGE_SIZE: usize = 40;
const DEFAULT_OLDER_LOOKAHEAD_FRACTION: f64 = 0.5;
const DEFAULT_NEWER_TRIGGER_ROWS: usize = 5;
const DEFAULT_NEAR_BOTTOM_DISTANCE: f64 = 10.0;

/// Construction-time configuration for a channel timeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields, default)]
pub struct TimelineConfig {
    /// Number of messages requested per page, in both directions.
    pub page_size: usize,
    /// Fraction of one page used as the look-ahead window before the oldest
    /// loaded row; an older page is requested once a row inside it displays.
    pub older_lookahead_fraction: f64,
    /// Rows from the newest loaded row that trigger a newer-page request.
    pub newer_trigger_rows: usize,
    /// Distance from the live end, in layout units, that still counts as
    /// "near bottom".
    pub near_bottom_distance: f64,
    /// Scroll to the bottom for messages sent by the current user, even when
    /// scrolled up.
    pub follow_local_sends: bool,
    /// Current user identity; live arrivals from this sender count as local sends.
    pub current_user_id: Option<String>,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            older_lookahead_fraction: DEFAULT_OLDER_LOOKAHEAD_FRACTION,
            newer_trigger_rows: DEFAULT_NEWER_TRIGGER_ROWS,
            near_bottom_distance: DEFAULT_NEAR_BOTTOM_DISTANCE,
            follow_local_sends: true,
            current_user_id: None,
        }
    }
}

impl TimelineConfig {
    /// Parse a JSON config payload and validate it.
    pub fn parse(raw: &str) -> Result<Self> {
        let mut config = serde_json::from_str::<Self>(raw)?;
        config.normalize();
        config.validate()?;
        Ok(config)
    }

    /// Load a JSON config file. A missing file yields the defaults.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No timeline config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path)?;
        Self::parse(&raw).map_err(|error| match error {
            Error::Serialization(error) => Error::Config(format!(
                "failed to parse config at {}: {error}",
                path.display()
            )),
            other => other,
        })
    }

    /// Reject values the engine cannot operate with.
    pub fn validate(&self) -> Result<()> {
        if self.page_size == 0 {
            return Err(Error::Config("page_size must be at least 1".to_string()));
        }
        if !(self.older_lookahead_fraction.is_finite()
            && (0.0..=1.0).contains(&self.older_lookahead_fraction))
        {
            return Err(Error::Config(
                "older_lookahead_fraction must be between 0 and 1".to_string(),
            ));
        }
        if !self.near_bottom_distance.is_finite() || self.near_bottom_distance < 0.0 {
            return Err(Error::Config(
                "near_bottom_distance must be a non-negative number".to_string(),
            ));
        }
        Ok(())
    }

    /// Look-ahead window before the oldest loaded row, in rows.
    #[must_use]
    pub fn older_lookahead_rows(&self) -> usize {
        (self.page_size as f64 * self.older_lookahead_fraction).round() as usize
    }

    /// Whether `sender_id` is the configured current user.
    #[must_use]
    pub fn is_current_user(&self, sender_id: Option<&str>) -> bool {
        matches!(
            (self.current_user_id.as_deref(), sender_id),
            (Some(current), Some(sender)) if current == sender
        )
    }

    fn normalize(&mut self) {
        self.current_user_id = normalize_text_option(self.current_user_id.take());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_policy() {
        let config = TimelineConfig::default();
        assert_eq!(config.page_size, 40);
        assert_eq!(config.older_lookahead_rows(), 20);
        assert_eq!(config.newer_trigger_rows, 5);
        assert!(config.follow_local_sends);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn parse_fills_missing_fields_with_defaults() {
        let config = TimelineConfig::parse(r#"{"page_size": 10, "current_user_id": " me "}"#)
            .expect("config should parse");
        assert_eq!(config.page_size, 10);
        assert_eq!(config.older_lookahead_rows(), 5);
        assert_eq!(config.current_user_id.as_deref(), Some("me"));
        assert!(config.is_current_user(Some("me")));
        assert!(!config.is_current_user(Some("you")));
        assert!(!config.is_current_user(None));
    }

    #[test]
    fn parse_rejects_unknown_fields() {
        let error = TimelineConfig::parse(r#"{"page_size": 10, "unexpected": true}"#).unwrap_err();
        assert!(error.to_string().contains("unknown field"));
    }

    #[test]
    fn parse_rejects_zero_page_size() {
        let error = TimelineConfig::parse(r#"{"page_size": 0}"#).unwrap_err();
        assert!(matches!(error, Error::Config(_)));
    }

    #[test]
    fn parse_rejects_out_of_range_fraction() {
        assert!(TimelineConfig::parse(r#"{"older_lookahead_fraction": 1.5}"#).is_err());
        assert!(TimelineConfig::parse(r#"{"near_bottom_distance": -1.0}"#).is_err());
    }

    #[test]
    fn load_from_missing_path_returns_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = TimelineConfig::load_from_path(&dir.path().join("missing.json")).unwrap();
        assert_eq!(config, TimelineConfig::default());
    }

    #[test]
    fn load_from_path_reports_parse_errors_as_config_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("timeline.json");
        std::fs::write(&path, "{ not json").unwrap();
        let error = TimelineConfig::load_from_path(&path).unwrap_err();
        assert!(matches!(error, Error::Config(_)));
    }
}
