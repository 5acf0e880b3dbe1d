//! `epd-import` library crate.
//!
//! The CSV import session controller, the backend seam it talks through,
//! the events it broadcasts and the view models a front end renders. The
//! terminal front end lives in `main.rs`.

pub mod backend;
pub mod config;
pub mod events;
pub mod file;
pub mod render;
pub mod session;
pub mod views;

pub use backend::ImportBackend;
pub use config::ImportConfig;
pub use events::ImportEvent;
pub use file::SelectedFile;
pub use session::{ImportSession, SessionError, SessionSnapshot, SessionState};
