//! Shared helpers for session integration tests: a scripted in-memory
//! backend and session builders with short poll intervals.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use epd_client::envelope::StartImportResponse;
use epd_client::ApiError;
use epd_core::fields::ImportType;
use epd_core::import_progress::{ImportProgress, ImportStatus, RowError};
use epd_core::mapping::ColumnMapping;
use epd_import::{ImportBackend, ImportConfig, ImportEvent, ImportSession, SessionState};
use tokio::sync::broadcast;

pub const IMPORT_ID: &str = "imp-test";

/// Rows reported by every scripted progress snapshot.
pub const TOTAL_ROWS: u64 = 3;

pub const CLIENT_CSV: &str = "\
Voornaam,Achternaam,E-mailadres,Telefoon
Jan,Jansen,jan@example.nl,0612345678
Piet,Pietersen,piet@example.nl,0687654321
Klaas,de Vries,klaas@example.nl,
";

/// One scripted answer to a progress poll.
#[derive(Debug, Clone)]
pub enum Step {
    Progress(ImportStatus, u64),
    /// Answer after a delay.
    Slow(Duration, ImportStatus, u64),
    /// Non-2xx answer with this status and body.
    Fail(u16, &'static str),
}

/// What the backend received on upload.
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: String,
    pub import_type: ImportType,
    pub mapping: ColumnMapping,
    pub size: usize,
}

#[derive(Default)]
pub struct ScriptedBackend {
    /// Reject the upload with this status and body.
    pub start_failure: Option<(u16, &'static str)>,
    steps: Mutex<VecDeque<Step>>,
    pub uploads: Mutex<Vec<Upload>>,
    polls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedBackend {
    /// A backend with no scripted polls.
    pub fn idle() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_steps(steps: impl IntoIterator<Item = Step>) -> Arc<Self> {
        Arc::new(Self {
            steps: Mutex::new(steps.into_iter().collect()),
            ..Default::default()
        })
    }

    pub fn rejecting_upload(status: u16, body: &'static str) -> Arc<Self> {
        Arc::new(Self {
            start_failure: Some((status, body)),
            ..Default::default()
        })
    }

    pub fn polls(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }

    /// Highest number of progress requests that were running at once.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn uploads(&self) -> Vec<Upload> {
        self.uploads.lock().unwrap().clone()
    }

    /// Wait until at least `n` polls have started.
    pub async fn wait_for_polls(&self, n: usize) {
        for _ in 0..400 {
            if self.polls() >= n {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("backend saw {} polls, expected {n}", self.polls());
    }
}

pub fn progress(status: ImportStatus, processed: u64) -> ImportProgress {
    let errors = if status == ImportStatus::Processing {
        Vec::new()
    } else {
        vec![RowError {
            row_number: 3,
            field_name: Some("phone".into()),
            message: "Telefoonnummer is verplicht".into(),
        }]
    };
    ImportProgress {
        import_id: IMPORT_ID.to_string(),
        total_rows: TOTAL_ROWS,
        processed_rows: processed,
        successful_rows: processed.saturating_sub(errors.len() as u64),
        failed_rows: errors.len() as u64,
        status,
        errors,
    }
}

#[async_trait]
impl ImportBackend for ScriptedBackend {
    async fn start_import(
        &self,
        file_name: &str,
        contents: Vec<u8>,
        import_type: ImportType,
        mapping: &ColumnMapping,
    ) -> Result<StartImportResponse, ApiError> {
        self.uploads.lock().unwrap().push(Upload {
            file_name: file_name.to_string(),
            import_type,
            mapping: mapping.clone(),
            size: contents.len(),
        });

        if let Some((status, body)) = self.start_failure {
            return Err(ApiError::Status {
                status,
                body: body.to_string(),
            });
        }

        Ok(StartImportResponse {
            import_id: IMPORT_ID.to_string(),
            message: "Import gestart".to_string(),
        })
    }

    async fn get_import_progress(&self, import_id: &str) -> Result<ImportProgress, ApiError> {
        assert_eq!(import_id, IMPORT_ID);

        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);
        self.polls.fetch_add(1, Ordering::SeqCst);

        let step = self.steps.lock().unwrap().pop_front();
        let result = match step {
            Some(Step::Progress(status, processed)) => Ok(progress(status, processed)),
            Some(Step::Slow(delay, status, processed)) => {
                tokio::time::sleep(delay).await;
                Ok(progress(status, processed))
            }
            Some(Step::Fail(status, body)) => Err(ApiError::Status {
                status,
                body: body.to_string(),
            }),
            None => Err(ApiError::Status {
                status: 500,
                body: "script exhausted".to_string(),
            }),
        };

        tokio::task::yield_now().await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

pub fn fast_config() -> ImportConfig {
    ImportConfig {
        poll_interval: Duration::from_millis(5),
        ..Default::default()
    }
}

pub fn client_session(backend: &Arc<ScriptedBackend>) -> ImportSession {
    ImportSession::new(backend.clone(), ImportType::Clients, fast_config())
}

/// States announced on `events` so far, in order.
pub fn drain_states(events: &mut broadcast::Receiver<ImportEvent>) -> Vec<SessionState> {
    let mut states = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let ImportEvent::StateChanged { state, .. } = event {
            states.push(state);
        }
    }
    states
}
