//! Server-side import job snapshots and row error categorisation.
//!
//! [`ImportProgress`] is what the progress endpoint returns. It is only ever
//! replaced by a newer poll response, never edited locally.

use serde::{Deserialize, Serialize};

/// Status of a server-side import job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportStatus {
    Processing,
    Completed,
    Failed,
}

impl ImportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// `completed` and `failed` end polling; `processing` does not.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Processing)
    }
}

impl std::fmt::Display for ImportStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A row the backend could not import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowError {
    pub row_number: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_name: Option<String>,
    pub message: String,
}

/// Polled snapshot of an import job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportProgress {
    pub import_id: String,
    pub total_rows: u64,
    pub processed_rows: u64,
    pub successful_rows: u64,
    pub failed_rows: u64,
    pub status: ImportStatus,
    #[serde(default)]
    pub errors: Vec<RowError>,
}

impl ImportProgress {
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Processed share of the total in whole percent, clamped to 0..=100.
    /// A job with zero total rows reports 0.
    pub fn percent_complete(&self) -> u8 {
        if self.total_rows == 0 {
            return 0;
        }
        let pct = self.processed_rows.saturating_mul(100) / self.total_rows;
        pct.min(100) as u8
    }
}

// ---------------------------------------------------------------------------
// Row error categories
// ---------------------------------------------------------------------------

/// Keyword bucket a row error message falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    Email,
    Required,
    Bsn,
    Date,
    Other,
}

impl ErrorCategory {
    /// All categories in display order.
    pub const ALL: [ErrorCategory; 5] = [
        Self::Email,
        Self::Required,
        Self::Bsn,
        Self::Date,
        Self::Other,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Email => "Invalid email addresses",
            Self::Required => "Missing required fields",
            Self::Bsn => "Invalid BSN numbers",
            Self::Date => "Invalid dates",
            Self::Other => "Other errors",
        }
    }

    /// Bucket a message by keyword, case-insensitively. First match wins in
    /// the order email, required, BSN, date.
    pub fn categorize(message: &str) -> Self {
        let lower = message.to_lowercase();

        if contains_any(&lower, &["email", "e-mail"]) {
            Self::Email
        } else if contains_any(&lower, &["required", "verplicht"]) {
            Self::Required
        } else if contains_any(&lower, &["bsn"]) {
            Self::Bsn
        } else if contains_any(&lower, &["date", "datum"]) {
            Self::Date
        } else {
            Self::Other
        }
    }
}

fn contains_any(haystack: &str, words: &[&str]) -> bool {
    words.iter().any(|w| haystack.contains(w))
}

/// Count errors per category, omitting empty categories, in
/// [`ErrorCategory::ALL`] order.
pub fn categorize_errors(errors: &[RowError]) -> Vec<(ErrorCategory, usize)> {
    let mut counts = [0usize; ErrorCategory::ALL.len()];
    for error in errors {
        let category = ErrorCategory::categorize(&error.message);
        if let Some(i) = ErrorCategory::ALL.iter().position(|c| *c == category) {
            counts[i] += 1;
        }
    }

    ErrorCategory::ALL
        .iter()
        .zip(counts)
        .filter(|(_, n)| *n > 0)
        .map(|(c, n)| (*c, n))
        .collect()
}
