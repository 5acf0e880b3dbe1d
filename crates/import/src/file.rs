//! Selected files and the CSV file-type guard.

use std::path::Path;

use epd_client::api::CSV_MIME_TYPE;

/// A file picked for import, held in memory until upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    pub name: String,
    /// MIME type as reported by whoever picked the file.
    pub mime_type: String,
    pub contents: Vec<u8>,
}

/// The reported MIME type was not `text/csv`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Only CSV files can be imported (received '{0}')")]
pub struct UnsupportedFileType(pub String);

impl SelectedFile {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, contents: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            contents,
        }
    }

    /// Shorthand for a file reported as `text/csv`.
    pub fn csv(name: impl Into<String>, contents: impl Into<Vec<u8>>) -> Self {
        Self::new(name, CSV_MIME_TYPE, contents.into())
    }

    /// Read a file from disk, deriving its MIME type from the extension.
    pub async fn from_path(path: &Path) -> std::io::Result<Self> {
        let contents = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self::new(name, mime_for_path(path), contents))
    }
}

/// Accept only `text/csv`. Parameters such as `; charset=utf-8` are allowed.
pub fn check_file_type(mime_type: &str) -> Result<(), UnsupportedFileType> {
    let essence = mime_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    if essence == CSV_MIME_TYPE {
        Ok(())
    } else {
        Err(UnsupportedFileType(mime_type.to_string()))
    }
}

/// MIME type a file picker would report for `path`, by extension.
pub fn mime_for_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("csv") => CSV_MIME_TYPE,
        Some("txt") => "text/plain",
        Some("json") => "application/json",
        Some("xlsx") => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        Some("xls") => "application/vnd.ms-excel",
        _ => "application/octet-stream",
    }
}
