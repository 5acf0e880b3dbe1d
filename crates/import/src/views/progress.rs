//! Progress view for a running or finished job.

use epd_core::import_progress::{ImportProgress, ImportStatus};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressView {
    pub status: ImportStatus,
    pub processed_rows: u64,
    pub total_rows: u64,
    pub successful_rows: u64,
    pub failed_rows: u64,
    /// 0 when the job reports no rows.
    pub percent: u8,
}

impl ProgressView {
    /// Short status line, e.g. `processing 40/100 (40%)`.
    pub fn summary(&self) -> String {
        format!(
            "{} {}/{} ({}%)",
            self.status, self.processed_rows, self.total_rows, self.percent
        )
    }
}

pub fn build_progress(progress: &ImportProgress) -> ProgressView {
    ProgressView {
        status: progress.status,
        processed_rows: progress.processed_rows,
        total_rows: progress.total_rows,
        successful_rows: progress.successful_rows,
        failed_rows: progress.failed_rows,
        percent: progress.percent_complete(),
    }
}
