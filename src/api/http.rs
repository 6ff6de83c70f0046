//! Blocking HTTP implementation of [`Api`].

use super::types::{
    ErrorBody, HistoryEntry, SheetText, SheetsResponse, StatusPayload, TaskCreated, TaskId,
    UploadResponse,
};
use super::{Api, ApiError, ConvertRequest};
use crate::settings::SheetsSettings;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// Backend address used when neither `--server` nor `SHEETTUI_SERVER` is set.
pub const DEFAULT_SERVER: &str = "http://127.0.0.1:5000";

/// Multipart boundary for MIDI uploads. Never appears in a MIDI header chunk.
const UPLOAD_BOUNDARY: &str = "----sheettui-upload-7f3a91c2";

/// Talks to the backend over HTTP with a shared `ureq` agent.
pub struct HttpApi {
    agent: ureq::Agent,
    base: String,
}

impl HttpApi {
    /// Creates a client for the backend at `base` (e.g. `http://127.0.0.1:5000`).
    pub fn new(base: impl Into<String>) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(Duration::from_secs(5))
            .timeout_read(Duration::from_secs(120))
            .timeout_write(Duration::from_secs(30))
            .build();
        let base = base.into().trim_end_matches('/').to_string();
        Self { agent, base }
    }

    /// The base URL requests are sent to.
    pub fn base(&self) -> &str {
        &self.base
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    /// Runs a request and returns the response body as text.
    ///
    /// Non-2xx responses become [`ApiError::Status`] carrying the backend's
    /// `error` field, or the raw body when there is none.
    fn send(
        &self,
        request: ureq::Request,
        call: impl FnOnce(ureq::Request) -> Result<ureq::Response, ureq::Error>,
    ) -> Result<String, ApiError> {
        let url = request.url().to_string();
        match call(request) {
            Ok(resp) => resp.into_string().map_err(ApiError::Io),
            Err(ureq::Error::Status(code, resp)) => {
                let text = resp.into_string().unwrap_or_default();
                let message = serde_json::from_str::<ErrorBody>(&text)
                    .ok()
                    .and_then(|body| body.error)
                    .unwrap_or_else(|| {
                        if text.trim().is_empty() {
                            format!("HTTP {}", code)
                        } else {
                            text.trim().to_string()
                        }
                    });
                debug!(%url, code, %message, "backend returned error status");
                Err(ApiError::Status { code, message })
            }
            Err(err) => Err(ApiError::Transport(err.to_string())),
        }
    }

    fn get_json<T: DeserializeOwned>(&self, request: ureq::Request) -> Result<T, ApiError> {
        let body = self.send(request, |req| req.call())?;
        decode(&body)
    }

    fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let payload = serde_json::to_string(body).map_err(|e| ApiError::Decode(e.to_string()))?;
        let request = self
            .agent
            .post(&self.url(path))
            .set("Content-Type", "application/json");
        let text = self.send(request, |req| req.send_string(&payload))?;
        decode(&text)
    }
}

fn decode<T: DeserializeOwned>(body: &str) -> Result<T, ApiError> {
    serde_json::from_str(body).map_err(|e| ApiError::Decode(e.to_string()))
}

/// Builds a `multipart/form-data` body with a single `file` part.
fn multipart_body(filename: &str, contents: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(contents.len() + 256);
    body.extend_from_slice(format!("--{}\r\n", UPLOAD_BOUNDARY).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\n",
            filename.replace('"', "_")
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: audio/midi\r\n\r\n");
    body.extend_from_slice(contents);
    body.extend_from_slice(format!("\r\n--{}--\r\n", UPLOAD_BOUNDARY).as_bytes());
    body
}

impl Api for HttpApi {
    fn create_task(&self, request: &ConvertRequest) -> Result<TaskId, ApiError> {
        let created: TaskCreated = self.post_json("/api/convert", request)?;
        debug!(task_id = %created.task_id, "conversion task created");
        Ok(created.task_id)
    }

    fn task_status(&self, task_id: &TaskId) -> Result<StatusPayload, ApiError> {
        let request = self
            .agent
            .get(&self.url(&format!("/api/status/{}", task_id)));
        self.get_json(request)
    }

    fn stop_task(&self, task_id: &TaskId) -> Result<(), ApiError> {
        let request = self
            .agent
            .post(&self.url(&format!("/api/stop/{}", task_id)));
        self.send(request, |req| req.call())?;
        Ok(())
    }

    fn convert_to_sheets(
        &self,
        midi_filename: &str,
        settings: &SheetsSettings,
    ) -> Result<SheetText, ApiError> {
        let body = json!({
            "midi_filename": midi_filename,
            "settings": settings,
        });
        let resp: SheetsResponse = self.post_json("/api/convert-to-sheets", &body)?;
        if !resp.success {
            return Err(ApiError::Rejected(
                resp.error
                    .unwrap_or_else(|| "Sheet conversion failed".to_string()),
            ));
        }
        Ok(SheetText {
            text: resp.sheet_text.unwrap_or_default(),
            sheets_filename: resp.sheets_filename,
        })
    }

    fn upload_midi(&self, path: &Path) -> Result<String, ApiError> {
        let contents = std::fs::read(path)?;
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload.mid");
        let body = multipart_body(filename, &contents);
        let request = self.agent.post(&self.url("/api/upload-midi")).set(
            "Content-Type",
            &format!("multipart/form-data; boundary={}", UPLOAD_BOUNDARY),
        );
        let text = self.send(request, |req| req.send_bytes(&body))?;
        let uploaded: UploadResponse = decode(&text)?;
        Ok(uploaded.midi_filename)
    }

    fn history(&self, limit: usize) -> Result<Vec<HistoryEntry>, ApiError> {
        let request = self
            .agent
            .get(&self.url("/api/history"))
            .query("limit", &limit.to_string());
        self.get_json(request)
    }

    fn delete_history(&self, timestamp: f64) -> Result<(), ApiError> {
        let _: serde_json::Value =
            self.post_json("/api/history/delete", &json!({ "timestamp": timestamp }))?;
        Ok(())
    }

    fn load_settings(&self) -> Result<Option<SheetsSettings>, ApiError> {
        let request = self.agent.get(&self.url("/api/settings"));
        let value: serde_json::Value = self.get_json(request)?;
        match &value {
            serde_json::Value::Object(map) if map.is_empty() => Ok(None),
            serde_json::Value::Object(_) => serde_json::from_value(value)
                .map(Some)
                .map_err(|e| ApiError::Decode(e.to_string())),
            _ => Ok(None),
        }
    }

    fn save_settings(&self, settings: &SheetsSettings) -> Result<(), ApiError> {
        let _: serde_json::Value = self.post_json("/api/settings", settings)?;
        Ok(())
    }

    fn health(&self) -> Result<(), ApiError> {
        let request = self.agent.get(&self.url("/api/health"));
        self.send(request, |req| req.call())?;
        Ok(())
    }
}
