//! CSV import session controller.
//!
//! [`ImportSession`] drives one import from file selection to the final
//! progress snapshot:
//!
//! ```text
//! idle -> uploading (parse) -> idle          preview + mapping loaded
//! idle -> uploading (submit) -> processing   job id received
//! processing -> completed | error            polled status / failure
//! any -> idle                                reset
//! ```
//!
//! Handles are cheap to clone and share one state behind a
//! [`tokio::sync::Mutex`] that is never held across a backend call. Polls
//! are strictly sequential. Every [`reset`](ImportSession::reset) bumps
//! the session generation and cancels the running polling loop; results
//! that come back for an older generation are dropped.
//!
//! State changes are broadcast as [`ImportEvent`]s. Call
//! [`ImportSession::subscribe`] to receive them.

use std::sync::Arc;

use epd_client::ApiError;
use epd_core::auto_map::{self, HeaderSuggestion};
use epd_core::csv_preview::{self, CsvPreview};
use epd_core::error::CoreError;
use epd_core::field_mapping::FieldMappingTable;
use epd_core::fields::ImportType;
use epd_core::import_progress::{ImportProgress, ImportStatus};
use epd_core::mapping::ColumnMapping;
use serde::Serialize;
use tokio::sync::{broadcast, Mutex};
use tokio_util::sync::CancellationToken;

use crate::backend::ImportBackend;
use crate::config::ImportConfig;
use crate::events::ImportEvent;
use crate::file::{check_file_type, SelectedFile, UnsupportedFileType};

/// Broadcast channel capacity for session events.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Shown when the backend reports the job as `failed`.
pub const BACKEND_FAILURE_MESSAGE: &str =
    "The import failed on the server. Check the file and try again.";

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// Lifecycle state of an import session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    Uploading,
    Processing,
    Completed,
    Error,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Uploading => "uploading",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Error => "error",
        }
    }

    /// A file is being parsed or an import is running.
    pub fn is_busy(&self) -> bool {
        matches!(self, Self::Uploading | Self::Processing)
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time copy of a session, for rendering.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub generation: u64,
    pub state: SessionState,
    pub import_type: ImportType,
    pub file_name: Option<String>,
    pub preview: Option<CsvPreview>,
    pub mapping: ColumnMapping,
    /// Ranked candidates per header, in header order.
    pub suggestions: Vec<HeaderSuggestion>,
    pub import_id: Option<String>,
    pub progress: Option<ImportProgress>,
    pub error_message: Option<String>,
}

impl SessionSnapshot {
    /// An idle snapshot with nothing loaded.
    pub fn empty(generation: u64, import_type: ImportType) -> Self {
        Self {
            generation,
            state: SessionState::Idle,
            import_type,
            file_name: None,
            preview: None,
            mapping: ColumnMapping::new(),
            suggestions: Vec::new(),
            import_id: None,
            progress: None,
            error_message: None,
        }
    }

    /// A preview is loaded and at least one column is mapped.
    pub fn can_upload(&self) -> bool {
        self.preview.is_some() && !self.mapping.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    UnsupportedFileType(#[from] UnsupportedFileType),

    #[error("Could not read the CSV file: {0}")]
    Parse(String),

    #[error("Invalid import input: {0}")]
    Validation(String),

    #[error("Select a CSV file and map at least one column before importing")]
    NotReady,

    #[error("An import is already running")]
    Busy,

    #[error("Import request failed: {0}")]
    Network(#[from] ApiError),

    #[error("The server reported import {import_id} as failed")]
    BackendFailure { import_id: String },

    #[error("No final status after {0} progress polls")]
    PollLimit(u32),

    /// The session was reset while the operation was running.
    #[error("The import session was reset")]
    Superseded,
}

impl SessionError {
    /// Message stored in the session and shown to the user.
    pub fn user_message(&self) -> String {
        match self {
            Self::Network(e) => e.user_message(),
            Self::BackendFailure { .. } => BACKEND_FAILURE_MESSAGE.to_string(),
            Self::PollLimit(_) => {
                "The server did not finish the import in time. Check the import list later."
                    .to_string()
            }
            other => other.to_string(),
        }
    }
}

impl From<CoreError> for SessionError {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::Parse(msg) => Self::Parse(msg),
            CoreError::Validation(msg) => Self::Validation(msg),
        }
    }
}

// ---------------------------------------------------------------------------
// Controller
// ---------------------------------------------------------------------------

struct Inner {
    view: SessionSnapshot,
    /// The parsed file, kept for upload.
    file: Option<SelectedFile>,
    /// Cancels the polling loop of the current generation.
    cancel: CancellationToken,
}

/// Shared handle to one import session.
#[derive(Clone)]
pub struct ImportSession {
    inner: Arc<Mutex<Inner>>,
    backend: Arc<dyn ImportBackend>,
    config: Arc<ImportConfig>,
    table: FieldMappingTable,
    event_tx: broadcast::Sender<ImportEvent>,
}

impl ImportSession {
    /// Create an idle session using the bundled Dutch header table.
    pub fn new(
        backend: Arc<dyn ImportBackend>,
        import_type: ImportType,
        config: ImportConfig,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(Mutex::new(Inner {
                view: SessionSnapshot::empty(0, import_type),
                file: None,
                cancel: CancellationToken::new(),
            })),
            backend,
            config: Arc::new(config),
            table: FieldMappingTable::default(),
            event_tx,
        }
    }

    /// Use another header table for auto-mapping.
    pub fn with_table(mut self, table: FieldMappingTable) -> Self {
        self.table = table;
        self
    }

    pub fn config(&self) -> &ImportConfig {
        &self.config
    }

    /// Subscribe to session events.
    pub fn subscribe(&self) -> broadcast::Receiver<ImportEvent> {
        self.event_tx.subscribe()
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        self.inner.lock().await.view.clone()
    }

    pub async fn can_upload(&self) -> bool {
        self.inner.lock().await.view.can_upload()
    }

    /// Switch between client and therapist import. A loaded preview is
    /// mapped again against the new field set.
    pub async fn set_import_type(&self, import_type: ImportType) -> Result<(), SessionError> {
        let mut inner = self.inner.lock().await;
        if inner.view.state.is_busy() {
            return Err(SessionError::Busy);
        }
        if inner.view.import_type == import_type {
            return Ok(());
        }

        inner.view.import_type = import_type;
        if let Some(headers) = inner.view.preview.as_ref().map(|p| p.headers.clone()) {
            let (mapping, suggestions) = self.propose(&headers, import_type);
            inner.view.mapping = mapping;
            inner.view.suggestions = suggestions;
        }

        tracing::debug!(generation = inner.view.generation, %import_type, "Import type changed");
        Ok(())
    }

    /// Load a file: check its type, parse the preview and propose a mapping.
    ///
    /// A file that is not `text/csv` is refused without touching the
    /// session. A parse failure leaves the session idle with the error
    /// message set and no preview.
    pub async fn select_file(&self, file: SelectedFile) -> Result<(), SessionError> {
        check_file_type(&file.mime_type)?;

        let generation = {
            let mut inner = self.inner.lock().await;
            if inner.view.state.is_busy() {
                return Err(SessionError::Busy);
            }
            inner.view.state = SessionState::Uploading;
            inner.view.error_message = None;
            inner.view.import_id = None;
            inner.view.progress = None;
            let generation = inner.view.generation;
            self.emit_state(generation, SessionState::Uploading);
            generation
        };

        let parsed = csv_preview::parse_csv_bytes(&file.contents, self.config.parse_mode);

        let mut inner = self.inner.lock().await;
        if inner.view.generation != generation {
            return Err(SessionError::Superseded);
        }
        inner.view.state = SessionState::Idle;

        match parsed {
            Ok(preview) => {
                let (mapping, suggestions) = self.propose(&preview.headers, inner.view.import_type);

                tracing::info!(
                    generation,
                    file = %file.name,
                    columns = preview.headers.len(),
                    rows = preview.total_row_count,
                    mapped_columns = mapping.len(),
                    "CSV preview loaded",
                );

                self.emit(ImportEvent::PreviewLoaded {
                    generation,
                    headers: preview.headers.clone(),
                    total_rows: preview.total_row_count,
                    mapped_columns: mapping.len(),
                });

                inner.view.file_name = Some(file.name.clone());
                inner.view.preview = Some(preview);
                inner.view.mapping = mapping;
                inner.view.suggestions = suggestions;
                inner.file = Some(file);
                self.emit_state(generation, SessionState::Idle);
                Ok(())
            }
            Err(e) => {
                let err = SessionError::from(e);
                tracing::warn!(generation, file = %file.name, error = %err, "CSV preview failed");

                inner.view.file_name = None;
                inner.view.preview = None;
                inner.view.mapping = ColumnMapping::new();
                inner.view.suggestions.clear();
                inner.view.error_message = Some(err.user_message());
                inner.file = None;
                self.emit_state(generation, SessionState::Idle);
                Err(err)
            }
        }
    }

    /// Map `source` to `target`, or unmap it when `target` is `None`.
    /// Assigning a target that another column already uses is allowed.
    pub async fn update_column_mapping(&self, source: &str, target: Option<&str>) {
        let mut inner = self.inner.lock().await;
        inner.view.mapping.update(source, target);
        tracing::debug!(
            generation = inner.view.generation,
            column = source,
            field = ?target,
            "Column mapping updated",
        );
    }

    /// Upload the selected file and poll the job until it finishes.
    ///
    /// Returns the final snapshot when the job completes. Every failure is
    /// also recorded in the session as the `error` state with a user
    /// message, except [`SessionError::Superseded`] (the session was reset
    /// underneath the call) and the pre-flight refusals, which leave the
    /// session untouched.
    pub async fn start_import(&self) -> Result<ImportProgress, SessionError> {
        let (generation, cancel, file, import_type, mapping) = {
            let mut inner = self.inner.lock().await;
            if inner.view.state.is_busy() {
                return Err(SessionError::Busy);
            }
            if !inner.view.can_upload() {
                return Err(SessionError::NotReady);
            }
            let Some(file) = inner.file.clone() else {
                return Err(SessionError::NotReady);
            };

            let cancel = CancellationToken::new();
            inner.cancel = cancel.clone();
            inner.view.state = SessionState::Uploading;
            inner.view.error_message = None;
            inner.view.import_id = None;
            inner.view.progress = None;

            let generation = inner.view.generation;
            self.emit_state(generation, SessionState::Uploading);
            (
                generation,
                cancel,
                file,
                inner.view.import_type,
                inner.view.mapping.clone(),
            )
        };

        let result = self
            .run_import(generation, &cancel, file, import_type, &mapping)
            .await;

        if let Err(e) = &result {
            self.fail(generation, e).await;
        }
        result
    }

    /// Return to an empty idle session and abandon any running import.
    pub async fn reset(&self) {
        let mut inner = self.inner.lock().await;
        inner.cancel.cancel();
        inner.cancel = CancellationToken::new();

        let generation = inner.view.generation + 1;
        let import_type = inner.view.import_type;
        inner.view = SessionSnapshot::empty(generation, import_type);
        inner.file = None;

        self.emit(ImportEvent::Reset { generation });
        self.emit_state(generation, SessionState::Idle);
        tracing::info!(generation, "Import session reset");
    }

    // ---- private helpers ----

    async fn run_import(
        &self,
        generation: u64,
        cancel: &CancellationToken,
        file: SelectedFile,
        import_type: ImportType,
        mapping: &ColumnMapping,
    ) -> Result<ImportProgress, SessionError> {
        let accepted = tokio::select! {
            _ = cancel.cancelled() => return Err(SessionError::Superseded),
            result = self.backend.start_import(&file.name, file.contents, import_type, mapping) => result?,
        };
        let import_id = accepted.import_id;

        self.update(generation, |inner| {
            inner.view.state = SessionState::Processing;
            inner.view.import_id = Some(import_id.clone());
            vec![
                ImportEvent::ImportStarted {
                    generation,
                    import_id: import_id.clone(),
                },
                ImportEvent::StateChanged {
                    generation,
                    state: SessionState::Processing,
                },
            ]
        })
        .await?;

        tracing::info!(generation, import_id = %import_id, "Import accepted, polling progress");

        let mut polls: u32 = 0;
        loop {
            if let Some(max) = self.config.max_polls {
                if polls >= max {
                    return Err(SessionError::PollLimit(max));
                }
            }
            polls += 1;

            let progress = tokio::select! {
                _ = cancel.cancelled() => return Err(SessionError::Superseded),
                result = self.backend.get_import_progress(&import_id) => result?,
            };

            tracing::debug!(
                generation,
                import_id = %import_id,
                poll = polls,
                status = %progress.status,
                processed = progress.processed_rows,
                total = progress.total_rows,
                "Import progress",
            );

            let status = progress.status;
            self.update(generation, |inner| {
                inner.view.progress = Some(progress.clone());
                let mut events = vec![ImportEvent::ProgressUpdated {
                    generation,
                    progress: progress.clone(),
                }];
                if status == ImportStatus::Completed {
                    inner.view.state = SessionState::Completed;
                    events.push(ImportEvent::StateChanged {
                        generation,
                        state: SessionState::Completed,
                    });
                    events.push(ImportEvent::Completed {
                        generation,
                        import_id: import_id.clone(),
                        successful_rows: progress.successful_rows,
                        failed_rows: progress.failed_rows,
                    });
                }
                events
            })
            .await?;

            match status {
                ImportStatus::Processing => {}
                ImportStatus::Completed => {
                    tracing::info!(
                        generation,
                        import_id = %import_id,
                        polls,
                        successful = progress.successful_rows,
                        failed = progress.failed_rows,
                        "Import completed",
                    );
                    return Ok(progress);
                }
                ImportStatus::Failed => {
                    return Err(SessionError::BackendFailure { import_id });
                }
            }

            tokio::select! {
                _ = cancel.cancelled() => return Err(SessionError::Superseded),
                _ = tokio::time::sleep(self.config.poll_interval) => {}
            }
        }
    }

    /// Apply `f` if the session is still at `generation`, then broadcast
    /// the events it returns.
    async fn update<F>(&self, generation: u64, f: F) -> Result<(), SessionError>
    where
        F: FnOnce(&mut Inner) -> Vec<ImportEvent>,
    {
        let mut inner = self.inner.lock().await;
        if inner.view.generation != generation {
            tracing::debug!(
                stale = generation,
                current = inner.view.generation,
                "Dropping result for a reset session",
            );
            return Err(SessionError::Superseded);
        }
        for event in f(&mut *inner) {
            self.emit(event);
        }
        Ok(())
    }

    async fn fail(&self, generation: u64, err: &SessionError) {
        if matches!(
            err,
            SessionError::Superseded | SessionError::Busy | SessionError::NotReady
        ) {
            return;
        }

        let message = err.user_message();
        let result = self
            .update(generation, |inner| {
                inner.view.state = SessionState::Error;
                inner.view.error_message = Some(message.clone());
                vec![
                    ImportEvent::StateChanged {
                        generation,
                        state: SessionState::Error,
                    },
                    ImportEvent::Failed {
                        generation,
                        message: message.clone(),
                    },
                ]
            })
            .await;

        if result.is_ok() {
            tracing::warn!(generation, error = %err, "Import failed");
        }
    }

    fn propose(
        &self,
        headers: &[String],
        import_type: ImportType,
    ) -> (ColumnMapping, Vec<HeaderSuggestion>) {
        let mapping =
            auto_map::auto_map_with(headers, import_type, &self.table, self.config.heuristic_policy);
        let suggestions = auto_map::suggest(headers, import_type, &self.table);
        (mapping, suggestions)
    }

    fn emit_state(&self, generation: u64, state: SessionState) {
        self.emit(ImportEvent::StateChanged { generation, state });
    }

    fn emit(&self, event: ImportEvent) {
        // No subscribers is fine.
        let _ = self.event_tx.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn busy_states() {
        assert!(SessionState::Uploading.is_busy());
        assert!(SessionState::Processing.is_busy());
        assert!(!SessionState::Idle.is_busy());
        assert!(!SessionState::Completed.is_busy());
        assert!(!SessionState::Error.is_busy());
    }

    #[test]
    fn can_upload_needs_preview_and_mapping() {
        let mut snapshot = SessionSnapshot::empty(0, ImportType::Clients);
        assert!(!snapshot.can_upload());

        snapshot.preview = Some(CsvPreview {
            headers: vec!["Voornaam".into()],
            rows: vec![vec!["Jan".into()]],
            total_row_count: 1,
        });
        assert!(!snapshot.can_upload());

        snapshot.mapping.update("Voornaam", Some("first_name"));
        assert!(snapshot.can_upload());
    }

    #[test]
    fn backend_failure_uses_generic_message() {
        let err = SessionError::BackendFailure {
            import_id: "imp-1".into(),
        };
        assert_eq!(err.user_message(), BACKEND_FAILURE_MESSAGE);
    }

    #[test]
    fn parse_errors_keep_their_message() {
        let err = SessionError::from(CoreError::Parse("empty file".into()));
        assert_eq!(err.user_message(), "Could not read the CSV file: empty file");
    }

    #[test]
    fn validation_errors_are_not_reported_as_parse_errors() {
        let err = SessionError::from(CoreError::Validation("unknown import type".into()));
        assert!(matches!(err, SessionError::Validation(_)));
        assert_eq!(err.user_message(), "Invalid import input: unknown import type");
    }
}
