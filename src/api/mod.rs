//! Client side of the conversion backend's REST API.
//!
//! This module provides:
//! - [`Api`]: one method per backend endpoint, implemented over HTTP by
//!   [`HttpApi`] and by in-memory mocks in tests
//! - [`ApiWorker`]: runs requests on a background thread so the terminal UI
//!   never blocks on the network
//! - The request and response payload types

mod http;
mod types;
mod worker;

pub use http::{HttpApi, DEFAULT_SERVER};
pub use types::{
    ConversionResult, ConvertRequest, Device, HistoryEntry, MediaKind, SheetText, StatusPayload,
    TaskCreated, TaskId, TaskStatus,
};
pub use worker::{ApiReply, ApiRequest, ApiWorker};

use crate::settings::SheetsSettings;
use std::path::Path;
use thiserror::Error;

/// Errors returned by backend calls.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request never produced an HTTP response (connection refused,
    /// timeout, DNS failure).
    #[error("could not reach backend: {0}")]
    Transport(String),

    /// The backend answered with a non-success status.
    #[error("backend returned {code}: {message}")]
    Status { code: u16, message: String },

    /// The response body was not the expected JSON.
    #[error("unexpected response: {0}")]
    Decode(String),

    /// The backend answered 2xx but reported the operation as failed.
    #[error("{0}")]
    Rejected(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ApiError {
    /// Message suitable for showing to the user.
    ///
    /// Backend-supplied messages are shown verbatim; transport problems keep
    /// their descriptive prefix.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Status { message, .. } => message.clone(),
            ApiError::Rejected(message) => message.clone(),
            other => other.to_string(),
        }
    }
}

/// The conversion backend.
///
/// Every method blocks until the backend answers. The TUI calls these through
/// [`ApiWorker`]; the headless `convert` command calls them directly.
pub trait Api: Send + Sync {
    /// `POST /api/convert`: queues a media-to-MIDI conversion.
    fn create_task(&self, request: &ConvertRequest) -> Result<TaskId, ApiError>;

    /// `GET /api/status/{id}`.
    fn task_status(&self, task_id: &TaskId) -> Result<StatusPayload, ApiError>;

    /// `POST /api/stop/{id}`: asks the backend to cancel a running task.
    fn stop_task(&self, task_id: &TaskId) -> Result<(), ApiError>;

    /// `POST /api/convert-to-sheets`: renders a converted MIDI file as sheet
    /// text using the given settings.
    fn convert_to_sheets(
        &self,
        midi_filename: &str,
        settings: &SheetsSettings,
    ) -> Result<SheetText, ApiError>;

    /// `POST /api/upload-midi`: uploads a local MIDI file and returns the name
    /// the backend stored it under.
    fn upload_midi(&self, path: &Path) -> Result<String, ApiError>;

    /// `GET /api/history?limit=n`, newest first.
    fn history(&self, limit: usize) -> Result<Vec<HistoryEntry>, ApiError>;

    /// `POST /api/history/delete`.
    fn delete_history(&self, timestamp: f64) -> Result<(), ApiError>;

    /// `GET /api/settings`. Returns `None` when the backend has nothing saved.
    fn load_settings(&self) -> Result<Option<SheetsSettings>, ApiError>;

    /// `POST /api/settings`.
    fn save_settings(&self, settings: &SheetsSettings) -> Result<(), ApiError>;

    /// `GET /api/health`.
    fn health(&self) -> Result<(), ApiError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_prefers_backend_text() {
        let err = ApiError::Status {
            code: 400,
            message: "Invalid media URL".to_string(),
        };
        assert_eq!(err.user_message(), "Invalid media URL");
        assert_eq!(err.to_string(), "backend returned 400: Invalid media URL");

        let err = ApiError::Transport("connection refused".to_string());
        assert_eq!(
            err.user_message(),
            "could not reach backend: connection refused"
        );
    }
}
