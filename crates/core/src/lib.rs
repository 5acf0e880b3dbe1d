//! Pure domain logic for the EPD CSV bulk import.
//!
//! This crate has zero I/O: no HTTP, no async, no filesystem. It owns the
//! canonical field sets, the CSV preview parser, the column auto-mapper and
//! the import progress types shared by the client and the session
//! controller.

pub mod auto_map;
pub mod csv_preview;
pub mod error;
pub mod field_mapping;
pub mod fields;
pub mod import_progress;
pub mod mapping;
