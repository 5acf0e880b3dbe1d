//! Results view for a finished job.
//!
//! Row errors are counted per keyword category and the first
//! [`DETAIL_ERROR_LIMIT`] are listed in full.

use epd_core::import_progress::{
    categorize_errors, ErrorCategory, ImportProgress, ImportStatus, RowError,
};
use serde::Serialize;

/// Row errors listed individually; the rest are only counted.
pub const DETAIL_ERROR_LIMIT: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryCount {
    pub category: ErrorCategory,
    pub label: &'static str,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultsView {
    pub import_id: String,
    pub succeeded: bool,
    pub total_rows: u64,
    pub successful_rows: u64,
    pub failed_rows: u64,
    /// Non-empty categories in display order.
    pub categories: Vec<CategoryCount>,
    pub errors: Vec<RowError>,
    /// Errors beyond [`DETAIL_ERROR_LIMIT`].
    pub remaining_errors: usize,
}

pub fn build_results(progress: &ImportProgress) -> ResultsView {
    let categories = categorize_errors(&progress.errors)
        .into_iter()
        .map(|(category, count)| CategoryCount {
            category,
            label: category.label(),
            count,
        })
        .collect();

    ResultsView {
        import_id: progress.import_id.clone(),
        succeeded: progress.status == ImportStatus::Completed,
        total_rows: progress.total_rows,
        successful_rows: progress.successful_rows,
        failed_rows: progress.failed_rows,
        categories,
        errors: progress
            .errors
            .iter()
            .take(DETAIL_ERROR_LIMIT)
            .cloned()
            .collect(),
        remaining_errors: progress.errors.len().saturating_sub(DETAIL_ERROR_LIMIT),
    }
}
