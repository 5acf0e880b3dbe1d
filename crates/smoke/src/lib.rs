//! `epd-smoke` library crate.
//!
//! End-to-end smoke checks against a running EPD backend: health,
//! authentication, client CRUD, therapist and appointment listings, a CSV
//! import and cleanup of everything the run created.

pub mod checks;
pub mod config;
pub mod context;
pub mod report;
pub mod runner;

pub use config::{Credentials, SmokeConfig};
pub use context::{Role, TestRunContext};
pub use report::{Check, CheckResult, Outcome, Phase, SmokeReport, TestResult};
pub use runner::{run, run_with, RunOptions};

/// Errors raised by an individual smoke check.
#[derive(Debug, thiserror::Error)]
pub enum SmokeError {
    #[error(transparent)]
    Api(#[from] epd_client::ApiError),

    #[error(transparent)]
    Import(#[from] epd_import::SessionError),

    #[error("{0}")]
    Assertion(String),
}

/// Fail a check with a formatted message unless `cond` holds.
pub(crate) fn ensure(cond: bool, message: impl FnOnce() -> String) -> Result<(), SmokeError> {
    if cond {
        Ok(())
    } else {
        Err(SmokeError::Assertion(message()))
    }
}
