//! Import session settings.

use std::time::Duration;

use epd_client::config::{parse_optional_var, parse_var, ConfigError};
use epd_core::auto_map::HeuristicPolicy;
use epd_core::csv_preview::ParseMode;

/// Default delay between two progress polls.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;

/// Tunable parameters for an [`ImportSession`](crate::ImportSession).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportConfig {
    /// Delay between the end of one progress poll and the start of the next.
    pub poll_interval: Duration,
    /// Give up after this many polls. `None` polls until a terminal status.
    pub max_polls: Option<u32>,
    /// Which auto-mapper matches end up in the initial mapping.
    pub heuristic_policy: HeuristicPolicy,
    /// How the selected file is tokenized for the preview.
    pub parse_mode: ParseMode,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            max_polls: None,
            heuristic_policy: HeuristicPolicy::default(),
            parse_mode: ParseMode::default(),
        }
    }
}

impl ImportConfig {
    /// Load configuration from the process environment.
    ///
    /// | Env Var                   | Default     |
    /// |---------------------------|-------------|
    /// | `IMPORT_POLL_INTERVAL_MS` | `1000`      |
    /// | `IMPORT_MAX_POLLS`        | unbounded   |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let interval_ms: u64 =
            parse_var(&lookup, "IMPORT_POLL_INTERVAL_MS", DEFAULT_POLL_INTERVAL_MS)?;
        let max_polls: Option<u32> = parse_optional_var(&lookup, "IMPORT_MAX_POLLS")?;

        if max_polls == Some(0) {
            return Err(ConfigError::Invalid {
                name: "IMPORT_MAX_POLLS",
                value: "0".to_string(),
            });
        }

        Ok(Self {
            poll_interval: Duration::from_millis(interval_ms),
            max_polls,
            ..Default::default()
        })
    }
}
