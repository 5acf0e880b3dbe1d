//! The transport seam between the session controller and the EPD backend.

use async_trait::async_trait;
use epd_client::envelope::StartImportResponse;
use epd_client::{ApiClient, ApiError};
use epd_core::fields::ImportType;
use epd_core::import_progress::ImportProgress;
use epd_core::mapping::ColumnMapping;

/// Server-side import operations the session controller needs.
///
/// [`ApiClient`] is the production implementation; tests drive the
/// controller with scripted in-memory backends.
#[async_trait]
pub trait ImportBackend: Send + Sync {
    /// Upload a file with its import type and column mapping.
    async fn start_import(
        &self,
        file_name: &str,
        contents: Vec<u8>,
        import_type: ImportType,
        mapping: &ColumnMapping,
    ) -> Result<StartImportResponse, ApiError>;

    /// Fetch the current progress snapshot of a job.
    async fn get_import_progress(&self, import_id: &str) -> Result<ImportProgress, ApiError>;
}

#[async_trait]
impl ImportBackend for ApiClient {
    async fn start_import(
        &self,
        file_name: &str,
        contents: Vec<u8>,
        import_type: ImportType,
        mapping: &ColumnMapping,
    ) -> Result<StartImportResponse, ApiError> {
        ApiClient::start_import(self, file_name, contents, import_type, mapping).await
    }

    async fn get_import_progress(&self, import_id: &str) -> Result<ImportProgress, ApiError> {
        ApiClient::get_import_progress(self, import_id).await
    }
}
