//! View models built from a [`SessionSnapshot`](crate::SessionSnapshot).
//!
//! Pure functions; rendering them is up to the front end.

pub mod mapping_editor;
pub mod progress;
pub mod results;

pub use mapping_editor::{build_mapping_editor, FieldOption, MappingEditorView, MappingRow};
pub use progress::{build_progress, ProgressView};
pub use results::{build_results, CategoryCount, ResultsView, DETAIL_ERROR_LIMIT};
