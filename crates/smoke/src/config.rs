//! Smoke run configuration loaded from environment variables.

use std::time::Duration;

use epd_client::config::{parse_var, require_var, ConfigError};
use epd_client::ClientConfig;

/// Polls the import check waits for before giving up.
pub const DEFAULT_IMPORT_MAX_POLLS: u32 = 60;

/// Login credentials for one role.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmokeConfig {
    pub client: ClientConfig,
    pub admin: Credentials,
    /// Therapist checks are skipped when unset.
    pub therapist: Option<Credentials>,
    /// Client-portal checks are skipped when unset.
    pub client_user: Option<Credentials>,
    pub import_poll_interval: Duration,
    pub import_max_polls: u32,
}

impl SmokeConfig {
    /// Load configuration from the process environment.
    ///
    /// | Env Var                    | Required | Default |
    /// |----------------------------|----------|---------|
    /// | `EPD_API_URL`              | no       | `http://localhost:3000` |
    /// | `REQUEST_TIMEOUT_SECS`     | no       | `30`    |
    /// | `SMOKE_ADMIN_EMAIL`        | yes      | --      |
    /// | `SMOKE_ADMIN_PASSWORD`     | yes      | --      |
    /// | `SMOKE_THERAPIST_EMAIL`    | no       | --      |
    /// | `SMOKE_THERAPIST_PASSWORD` | no       | --      |
    /// | `SMOKE_CLIENT_EMAIL`       | no       | --      |
    /// | `SMOKE_CLIENT_PASSWORD`    | no       | --      |
    /// | `IMPORT_POLL_INTERVAL_MS`  | no       | `1000`  |
    /// | `SMOKE_IMPORT_MAX_POLLS`   | no       | `60`    |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut client = ClientConfig::from_lookup(&lookup)?;
        // The run logs in itself; a preset token would mask auth failures.
        client.token = None;

        let admin = Credentials {
            email: require_var(&lookup, "SMOKE_ADMIN_EMAIL")?,
            password: require_var(&lookup, "SMOKE_ADMIN_PASSWORD")?,
        };

        let therapist =
            optional_credentials(&lookup, "SMOKE_THERAPIST_EMAIL", "SMOKE_THERAPIST_PASSWORD")?;
        let client_user =
            optional_credentials(&lookup, "SMOKE_CLIENT_EMAIL", "SMOKE_CLIENT_PASSWORD")?;

        let interval_ms: u64 = parse_var(&lookup, "IMPORT_POLL_INTERVAL_MS", 1000)?;
        let import_max_polls =
            parse_var(&lookup, "SMOKE_IMPORT_MAX_POLLS", DEFAULT_IMPORT_MAX_POLLS)?;

        Ok(Self {
            client,
            admin,
            therapist,
            client_user,
            import_poll_interval: Duration::from_millis(interval_ms),
            import_max_polls,
        })
    }
}

/// Both variables set, or neither. One without the other is a mistake.
fn optional_credentials<F>(
    lookup: &F,
    email_var: &'static str,
    password_var: &'static str,
) -> Result<Option<Credentials>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let email = lookup(email_var).filter(|v| !v.trim().is_empty());
    let password = lookup(password_var).filter(|v| !v.is_empty());
    match (email, password) {
        (Some(email), Some(password)) => Ok(Some(Credentials { email, password })),
        (None, None) => Ok(None),
        (Some(_), None) => Err(ConfigError::Missing(password_var)),
        (None, Some(_)) => Err(ConfigError::Missing(email_var)),
    }
}
