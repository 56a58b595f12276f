//! Run configuration.
//!
//! A [`SweepConfig`] is built once per run (defaults, then an optional YAML
//! file, then environment variables, then CLI flags) and passed explicitly to
//! every component that needs a policy knob.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SweepError};

/// Default region label.
pub const DEFAULT_REGION: &str = "eu-west-2";

/// Default retention floor per repository.
pub const DEFAULT_MIN_IMAGE_COUNT: usize = 3;

/// Default age threshold in days.
pub const DEFAULT_MAX_AGE_DAYS: u32 = 7;

/// Default maximum notification message length.
pub const DEFAULT_MAX_MESSAGE_LENGTH: usize = 4000;

/// Registry per-call deletion limit.
pub const DEFAULT_MAX_BATCH_SIZE: usize = 100;

/// Configuration for one cleanup run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct SweepConfig {
    /// Region the registry and orchestrator live in
    pub region: String,

    /// Images always kept per repository
    pub min_image_count: usize,

    /// Images pushed within this many days are kept
    pub max_age_days: u32,

    /// Actually delete images (otherwise dry run)
    pub delete_enabled: bool,

    /// Send a summary notification
    pub notify_enabled: bool,

    /// Maximum length of a single notification message
    pub max_message_length: usize,

    /// Maximum digests per deletion call
    pub max_batch_size: usize,

    /// Notification channel
    pub slack_channel: Option<String>,

    /// Notification token
    #[serde(skip_serializing)]
    pub slack_token: Option<String>,

    /// Where to write the delete-candidate export
    pub export_path: Option<PathBuf>,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            region: DEFAULT_REGION.to_string(),
            min_image_count: DEFAULT_MIN_IMAGE_COUNT,
            max_age_days: DEFAULT_MAX_AGE_DAYS,
            delete_enabled: false,
            notify_enabled: false,
            max_message_length: DEFAULT_MAX_MESSAGE_LENGTH,
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
            slack_channel: None,
            slack_token: None,
            export_path: None,
        }
    }
}

impl SweepConfig {
    /// Load a YAML config file. Missing keys fall back to defaults.
    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path).map_err(|e| {
            SweepError::Config(format!("Failed to read config {}: {}", path.display(), e))
        })?;
        let config: SweepConfig = serde_yaml::from_str(&data)?;
        Ok(config)
    }

    /// Defaults overridden by process environment variables.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Override fields from environment-style variables.
    ///
    /// `lookup` resolves a variable name to its value; unset variables leave
    /// the field untouched.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(region) = lookup("AWS_REGION") {
            self.region = region;
        }
        if let Some(v) = lookup("KEEP_MIN_IMAGE_COUNT") {
            self.min_image_count = parse_number("KEEP_MIN_IMAGE_COUNT", &v)?;
        }
        if let Some(v) = lookup("KEEP_IMAGES_NEWER_THAN_DAYS") {
            self.max_age_days = parse_number("KEEP_IMAGES_NEWER_THAN_DAYS", &v)?;
        }
        if let Some(v) = lookup("DELETE_ENABLED") {
            self.delete_enabled = str_to_bool(&v);
        }
        if let Some(v) = lookup("SLACK_ENABLED") {
            self.notify_enabled = str_to_bool(&v);
        }
        if let Some(v) = lookup("SLACK_MAX_MESSAGE_LENGTH") {
            self.max_message_length = parse_number("SLACK_MAX_MESSAGE_LENGTH", &v)?;
        }
        if let Some(v) = lookup("MAX_BATCH_SIZE") {
            self.max_batch_size = parse_number("MAX_BATCH_SIZE", &v)?;
        }
        if let Some(channel) = lookup("SLACK_CHANNEL") {
            self.slack_channel = Some(channel);
        }
        if let Some(token) = lookup("SLACK_TOKEN") {
            self.slack_token = Some(token);
        }
        if let Some(path) = lookup("EXPORT_PATH") {
            self.export_path = Some(PathBuf::from(path));
        }
        Ok(())
    }

    /// Reject values no run can work with.
    pub fn validate(&self) -> Result<()> {
        if self.max_batch_size == 0 {
            return Err(SweepError::Config(
                "max-batch-size must be greater than zero".to_string(),
            ));
        }
        if self.max_message_length == 0 {
            return Err(SweepError::Config(
                "max-message-length must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Retention policy derived from this config.
    pub fn retention_policy(&self) -> RetentionPolicy {
        RetentionPolicy {
            min_image_count: self.min_image_count,
            max_age_days: self.max_age_days,
        }
    }
}

/// Keep-criteria knobs for the retention evaluator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetentionPolicy {
    /// Retention floor: images always kept per repository
    pub min_image_count: usize,

    /// Age threshold in days
    pub max_age_days: u32,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            min_image_count: DEFAULT_MIN_IMAGE_COUNT,
            max_age_days: DEFAULT_MAX_AGE_DAYS,
        }
    }
}

impl RetentionPolicy {
    /// Images pushed at or after this instant are recent.
    ///
    /// A window reaching past the earliest representable instant keeps
    /// every image.
    pub fn cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now.checked_sub_signed(Duration::days(i64::from(self.max_age_days)))
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}

/// Truthy strings: `yes`, `y`, `true` (case-insensitive).
pub fn str_to_bool(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "yes" | "y" | "true"
    )
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value.trim().parse().map_err(|_| {
        SweepError::Config(format!("{} must be a non-negative integer, got '{}'", key, value))
    })
}
