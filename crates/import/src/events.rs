//! Events broadcast by an [`ImportSession`](crate::ImportSession).
//!
//! Every event carries the session generation it belongs to, so a
//! subscriber can drop anything emitted before the last reset.

use epd_core::import_progress::ImportProgress;
use serde::Serialize;

use crate::session::SessionState;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ImportEvent {
    /// The session moved to a new state.
    StateChanged { generation: u64, state: SessionState },

    /// A file was parsed and an initial mapping proposed.
    PreviewLoaded {
        generation: u64,
        headers: Vec<String>,
        total_rows: usize,
        mapped_columns: usize,
    },

    /// The backend accepted the upload and assigned a job id.
    ImportStarted { generation: u64, import_id: String },

    /// A progress poll returned a new snapshot.
    ProgressUpdated {
        generation: u64,
        progress: ImportProgress,
    },

    /// The job reached `completed`.
    Completed {
        generation: u64,
        import_id: String,
        successful_rows: u64,
        failed_rows: u64,
    },

    /// The session entered the error state.
    Failed { generation: u64, message: String },

    /// The session was reset; `generation` is the new generation.
    Reset { generation: u64 },
}

impl ImportEvent {
    pub fn generation(&self) -> u64 {
        match self {
            Self::StateChanged { generation, .. }
            | Self::PreviewLoaded { generation, .. }
            | Self::ImportStarted { generation, .. }
            | Self::ProgressUpdated { generation, .. }
            | Self::Completed { generation, .. }
            | Self::Failed { generation, .. }
            | Self::Reset { generation } => *generation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_type_tag() {
        let event = ImportEvent::StateChanged {
            generation: 2,
            state: SessionState::Processing,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "state_changed");
        assert_eq!(json["state"], "processing");
        assert_eq!(json["generation"], 2);
    }

    #[test]
    fn reset_reports_the_new_generation() {
        assert_eq!(ImportEvent::Reset { generation: 5 }.generation(), 5);
    }
}
