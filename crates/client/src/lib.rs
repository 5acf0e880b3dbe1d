//! REST client for the EPD backend.
//!
//! Wraps the JSON API (bearer-token auth, `{ success, data }` envelopes)
//! with [`reqwest`] and decodes every response into a typed result at the
//! boundary, so callers never see half-populated payloads.

pub mod api;
pub mod config;
pub mod envelope;

pub use api::{ApiClient, ApiError};
pub use config::{ClientConfig, ConfigError};
