//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/dashpulse/config.toml`
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/dashpulse/` (~/.config/dashpulse/)
//! - State/Logs: `$XDG_STATE_HOME/dashpulse/` (~/.local/state/dashpulse/)

use crate::error::{Error, Result};
use chrono::{FixedOffset, Offset, Utc};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Returns a best-effort home directory path.
fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns XDG_CONFIG_HOME or ~/.config
fn xdg_config_home() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
}

/// Returns XDG_STATE_HOME or ~/.local/state
fn xdg_state_home() -> PathBuf {
    std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/state"))
}

/// Main configuration struct
#[derive(Debug, Deserialize, Default, Clone)]
pub struct Config {
    /// Dashboard report settings
    #[serde(default)]
    pub report: ReportConfig,

    /// Recency classification thresholds
    #[serde(default)]
    pub recency: RecencyConfig,

    /// District engagement settings
    #[serde(default)]
    pub engagement: EngagementConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Dashboard report settings
#[derive(Debug, Deserialize, Clone)]
pub struct ReportConfig {
    /// Number of users in the top-N list
    #[serde(default = "default_top_users")]
    pub top_users: usize,

    /// Offset (minutes east of UTC) used for calendar bucketing and for
    /// timestamps that carry no offset of their own
    #[serde(default)]
    pub utc_offset_minutes: i32,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            top_users: default_top_users(),
            utc_offset_minutes: 0,
        }
    }
}

impl ReportConfig {
    /// The reporting offset as a chrono [`FixedOffset`].
    ///
    /// Falls back to UTC for out-of-range values; [`Config::validate`]
    /// rejects those up front.
    pub fn offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_minutes.saturating_mul(60))
            .unwrap_or_else(utc_offset)
    }
}

fn default_top_users() -> usize {
    5
}

/// Thresholds (in days) for the recency buckets
#[derive(Debug, Deserialize, Clone)]
pub struct RecencyConfig {
    /// Logins at most this many days old are `lastWeek`
    #[serde(default = "default_last_week_days")]
    pub last_week_days: i64,

    /// Logins at most this many days old (and older than a week) are `lastMonth`
    #[serde(default = "default_last_month_days")]
    pub last_month_days: i64,
}

impl Default for RecencyConfig {
    fn default() -> Self {
        Self {
            last_week_days: default_last_week_days(),
            last_month_days: default_last_month_days(),
        }
    }
}

/// Largest accepted recency threshold, in days (about a century).
pub const MAX_THRESHOLD_DAYS: i64 = 36_500;

fn default_last_week_days() -> i64 {
    7
}

fn default_last_month_days() -> i64 {
    30
}

/// District engagement settings
#[derive(Debug, Deserialize, Clone)]
pub struct EngagementConfig {
    /// Number of trailing calendar weeks that must all show activity
    #[serde(default = "default_consistency_weeks")]
    pub consistency_weeks: u32,

    /// Whether to fill in the estimated `dashboardViews` figure
    #[serde(default = "default_estimate_views")]
    pub estimate_views: bool,

    /// Multiplier used for the views estimate
    #[serde(default = "default_views_per_active_user")]
    pub views_per_active_user: u64,
}

impl Default for EngagementConfig {
    fn default() -> Self {
        Self {
            consistency_weeks: default_consistency_weeks(),
            estimate_views: default_estimate_views(),
            views_per_active_user: default_views_per_active_user(),
        }
    }
}

fn default_consistency_weeks() -> u32 {
    4
}

fn default_estimate_views() -> bool {
    true
}

fn default_views_per_active_user() -> u64 {
    3
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Maximum number of log files to keep
    #[serde(default = "default_max_log_files")]
    pub max_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            max_files: default_max_log_files(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_log_files() -> usize {
    5
}

pub(crate) fn utc_offset() -> FixedOffset {
    Utc.fix()
}

impl Config {
    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            return Ok(Config::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config file {:?}: {}", path, e)))?;

        Self::from_toml(&content)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration, returning error message if invalid
    pub fn validate(&self) -> Result<()> {
        if self.recency.last_week_days < 0 || self.recency.last_month_days < 0 {
            return Err(Error::Config(
                "recency thresholds must not be negative".to_string(),
            ));
        }
        if self.recency.last_month_days > MAX_THRESHOLD_DAYS
            || self.recency.last_week_days > MAX_THRESHOLD_DAYS
        {
            return Err(Error::Config(format!(
                "recency thresholds must not exceed {} days",
                MAX_THRESHOLD_DAYS
            )));
        }
        if self.recency.last_week_days > self.recency.last_month_days {
            return Err(Error::Config(
                "recency.last_week_days must not exceed recency.last_month_days".to_string(),
            ));
        }
        if self.engagement.consistency_weeks == 0 {
            return Err(Error::Config(
                "engagement.consistency_weeks must be at least 1".to_string(),
            ));
        }
        if self.report.utc_offset_minutes.unsigned_abs() >= 24 * 60 {
            return Err(Error::Config(
                "report.utc_offset_minutes must be within +/- 24 hours".to_string(),
            ));
        }
        Ok(())
    }

    /// Returns the default config file path
    ///
    /// `$XDG_CONFIG_HOME/dashpulse/config.toml` (~/.config/dashpulse/config.toml)
    pub fn config_path() -> PathBuf {
        xdg_config_home().join("dashpulse").join("config.toml")
    }

    /// Returns the state directory path (for logs)
    ///
    /// `$XDG_STATE_HOME/dashpulse/` (~/.local/state/dashpulse/)
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join("dashpulse")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.report.top_users, 5);
        assert_eq!(config.recency.last_week_days, 7);
        assert_eq!(config.recency.last_month_days, 30);
        assert_eq!(config.engagement.consistency_weeks, 4);
        assert_eq!(config.engagement.views_per_active_user, 3);
        assert!(config.engagement.estimate_views);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_config() {
        let toml = r#"
[report]
top_users = 3
utc_offset_minutes = 180

[engagement]
estimate_views = false

[logging]
level = "debug"
"#;
        let config = Config::from_toml(toml).unwrap();

        assert_eq!(config.report.top_users, 3);
        assert_eq!(config.report.offset().local_minus_utc(), 3 * 3600);
        assert!(!config.engagement.estimate_views);
        assert_eq!(config.engagement.consistency_weeks, 4);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_validation_rejects_inverted_thresholds() {
        let toml = r#"
[recency]
last_week_days = 40
last_month_days = 30
"#;
        assert!(matches!(Config::from_toml(toml), Err(Error::Config(_))));
    }

    #[test]
    fn test_validation_rejects_oversized_thresholds() {
        let toml = r#"
[recency]
last_week_days = 7
last_month_days = 9000000000000000
"#;
        assert!(matches!(Config::from_toml(toml), Err(Error::Config(_))));

        let toml = format!(
            "[recency]\nlast_week_days = 7\nlast_month_days = {}\n",
            MAX_THRESHOLD_DAYS
        );
        let config = Config::from_toml(&toml).unwrap();
        assert_eq!(config.recency.last_month_days, MAX_THRESHOLD_DAYS);
    }

    #[test]
    fn test_validation_rejects_zero_weeks() {
        let toml = r#"
[engagement]
consistency_weeks = 0
"#;
        assert!(Config::from_toml(toml).is_err());
    }

    #[test]
    fn test_validation_rejects_huge_offset() {
        let mut config = Config::default();
        config.report.utc_offset_minutes = 24 * 60;
        assert!(config.validate().is_err());
        assert_eq!(config.report.offset(), utc_offset());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[report]\ntop_users = 10\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.report.top_users, 10);

        let missing = dir.path().join("missing.toml");
        assert!(Config::load_from(&missing).is_err());
    }
}
