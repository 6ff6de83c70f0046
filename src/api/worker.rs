//! Background thread that executes backend requests.
//!
//! The terminal UI submits [`ApiRequest`]s and drains [`ApiReply`]s once per
//! frame. A single worker thread handles requests one at a time, so replies
//! arrive in submission order: a status poll is never applied after a later
//! one.

use super::{Api, ApiError, ConvertRequest, HistoryEntry, SheetText, StatusPayload, TaskId};
use crate::settings::SheetsSettings;
use crossbeam_channel::{unbounded, Receiver, Sender, TryRecvError};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use tracing::{debug, warn};

/// Work for the background thread.
#[derive(Debug, Clone)]
pub enum ApiRequest {
    CreateTask(ConvertRequest),
    TaskStatus(TaskId),
    StopTask(TaskId),
    ConvertToSheets {
        midi_filename: String,
        settings: SheetsSettings,
    },
    UploadMidi(PathBuf),
    History { limit: usize },
    DeleteHistory { timestamp: f64 },
    LoadSettings,
    SaveSettings(SheetsSettings),
    Health,
}

/// Result of one [`ApiRequest`], tagged with enough context to route it.
#[derive(Debug)]
pub enum ApiReply {
    TaskCreated(Result<TaskId, ApiError>),
    TaskStatus {
        task_id: TaskId,
        result: Result<StatusPayload, ApiError>,
    },
    TaskStopped {
        task_id: TaskId,
        result: Result<(), ApiError>,
    },
    Sheets {
        midi_filename: String,
        result: Result<SheetText, ApiError>,
    },
    Uploaded {
        path: PathBuf,
        result: Result<String, ApiError>,
    },
    History(Result<Vec<HistoryEntry>, ApiError>),
    HistoryDeleted {
        timestamp: f64,
        result: Result<(), ApiError>,
    },
    SettingsLoaded(Result<Option<SheetsSettings>, ApiError>),
    SettingsSaved(Result<(), ApiError>),
    Health(Result<(), ApiError>),
}

/// Executes a single request against the backend.
pub fn execute(api: &dyn Api, request: ApiRequest) -> ApiReply {
    match request {
        ApiRequest::CreateTask(req) => ApiReply::TaskCreated(api.create_task(&req)),
        ApiRequest::TaskStatus(task_id) => {
            let result = api.task_status(&task_id);
            ApiReply::TaskStatus { task_id, result }
        }
        ApiRequest::StopTask(task_id) => {
            let result = api.stop_task(&task_id);
            ApiReply::TaskStopped { task_id, result }
        }
        ApiRequest::ConvertToSheets {
            midi_filename,
            settings,
        } => {
            let result = api.convert_to_sheets(&midi_filename, &settings);
            ApiReply::Sheets {
                midi_filename,
                result,
            }
        }
        ApiRequest::UploadMidi(path) => {
            let result = api.upload_midi(&path);
            ApiReply::Uploaded { path, result }
        }
        ApiRequest::History { limit } => ApiReply::History(api.history(limit)),
        ApiRequest::DeleteHistory { timestamp } => {
            let result = api.delete_history(timestamp);
            ApiReply::HistoryDeleted { timestamp, result }
        }
        ApiRequest::LoadSettings => ApiReply::SettingsLoaded(api.load_settings()),
        ApiRequest::SaveSettings(settings) => ApiReply::SettingsSaved(api.save_settings(&settings)),
        ApiRequest::Health => ApiReply::Health(api.health()),
    }
}

/// Handle to the background request thread.
///
/// Dropping the handle closes the request channel; the thread finishes the
/// request it is working on and exits.
pub struct ApiWorker {
    requests: Sender<ApiRequest>,
    replies: Receiver<ApiReply>,
    in_flight: usize,
}

impl ApiWorker {
    /// Starts the worker thread.
    ///
    /// # Errors
    ///
    /// Returns an error if the OS refuses to create the thread.
    pub fn spawn(api: Arc<dyn Api>) -> std::io::Result<Self> {
        let (req_tx, req_rx) = unbounded::<ApiRequest>();
        let (reply_tx, reply_rx) = unbounded::<ApiReply>();

        thread::Builder::new()
            .name("api-worker".into())
            .spawn(move || {
                for request in req_rx.iter() {
                    debug!(?request, "executing backend request");
                    let reply = execute(api.as_ref(), request);
                    if reply_tx.send(reply).is_err() {
                        // UI side is gone
                        break;
                    }
                }
                debug!("api worker exiting");
            })?;

        Ok(Self {
            requests: req_tx,
            replies: reply_rx,
            in_flight: 0,
        })
    }

    /// Queues a request. Returns false if the worker thread has exited.
    pub fn submit(&mut self, request: ApiRequest) -> bool {
        match self.requests.send(request) {
            Ok(()) => {
                self.in_flight += 1;
                true
            }
            Err(err) => {
                warn!(request = ?err.0, "api worker is not running");
                false
            }
        }
    }

    /// Returns the next finished reply without blocking.
    pub fn try_recv(&mut self) -> Option<ApiReply> {
        match self.replies.try_recv() {
            Ok(reply) => {
                self.in_flight = self.in_flight.saturating_sub(1);
                Some(reply)
            }
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// Number of submitted requests whose replies have not been drained yet.
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// True while any request is outstanding.
    pub fn is_busy(&self) -> bool {
        self.in_flight > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ConversionResult, Device, TaskStatus};
    use std::path::Path;
    use std::sync::Mutex;
    use std::time::{Duration, Instant};

    /// Records calls; every status poll reports a running task and stop fails.
    struct ScriptedApi {
        calls: Mutex<Vec<String>>,
    }

    impl Api for ScriptedApi {
        fn create_task(&self, request: &ConvertRequest) -> Result<TaskId, ApiError> {
            self.calls.lock().unwrap().push(format!("create {}", request.media_url));
            Ok(TaskId::new("t1"))
        }

        fn task_status(&self, task_id: &TaskId) -> Result<StatusPayload, ApiError> {
            self.calls.lock().unwrap().push(format!("status {}", task_id));
            Ok(StatusPayload {
                status: TaskStatus::Processing,
                progress: Some("Transcribing".to_string()),
                error: None,
                result: ConversionResult::default(),
            })
        }

        fn stop_task(&self, _task_id: &TaskId) -> Result<(), ApiError> {
            Err(ApiError::Status {
                code: 500,
                message: "boom".to_string(),
            })
        }

        fn convert_to_sheets(
            &self,
            midi_filename: &str,
            _settings: &SheetsSettings,
        ) -> Result<SheetText, ApiError> {
            Ok(SheetText {
                text: format!("sheet for {}", midi_filename),
                sheets_filename: None,
            })
        }

        fn upload_midi(&self, _path: &Path) -> Result<String, ApiError> {
            Ok("up.mid".to_string())
        }

        fn history(&self, _limit: usize) -> Result<Vec<HistoryEntry>, ApiError> {
            Ok(Vec::new())
        }

        fn delete_history(&self, _timestamp: f64) -> Result<(), ApiError> {
            Ok(())
        }

        fn load_settings(&self) -> Result<Option<SheetsSettings>, ApiError> {
            Ok(None)
        }

        fn save_settings(&self, _settings: &SheetsSettings) -> Result<(), ApiError> {
            Ok(())
        }

        fn health(&self) -> Result<(), ApiError> {
            Ok(())
        }
    }

    fn drain(worker: &mut ApiWorker, count: usize) -> Vec<ApiReply> {
        let deadline = Instant::now() + Duration::from_secs(5);
        let mut replies = Vec::new();
        while replies.len() < count && Instant::now() < deadline {
            match worker.try_recv() {
                Some(reply) => replies.push(reply),
                None => thread::sleep(Duration::from_millis(5)),
            }
        }
        replies
    }

    #[test]
    fn test_replies_arrive_in_submission_order() {
        let api = Arc::new(ScriptedApi {
            calls: Mutex::new(Vec::new()),
        });
        let mut worker = ApiWorker::spawn(api.clone()).unwrap();

        worker.submit(ApiRequest::CreateTask(ConvertRequest {
            media_url: "https://youtu.be/x".to_string(),
            device: Device::Cpu,
        }));
        worker.submit(ApiRequest::TaskStatus(TaskId::new("t1")));
        worker.submit(ApiRequest::StopTask(TaskId::new("t1")));
        assert!(worker.in_flight() > 0);

        let replies = drain(&mut worker, 3);
        assert_eq!(replies.len(), 3);
        assert!(matches!(replies[0], ApiReply::TaskCreated(Ok(_))));
        assert!(matches!(replies[1], ApiReply::TaskStatus { .. }));
        assert!(matches!(
            replies[2],
            ApiReply::TaskStopped {
                result: Err(ApiError::Status { code: 500, .. }),
                ..
            }
        ));
        assert!(!worker.is_busy());
        assert_eq!(
            *api.calls.lock().unwrap(),
            vec!["create https://youtu.be/x", "status t1"]
        );
    }

    #[test]
    fn test_execute_routes_sheet_request() {
        let api = ScriptedApi {
            calls: Mutex::new(Vec::new()),
        };
        let reply = execute(
            &api,
            ApiRequest::ConvertToSheets {
                midi_filename: "a.mid".to_string(),
                settings: SheetsSettings::default(),
            },
        );
        match reply {
            ApiReply::Sheets {
                midi_filename,
                result: Ok(sheet),
            } => {
                assert_eq!(midi_filename, "a.mid");
                assert_eq!(sheet.text, "sheet for a.mid");
            }
            other => panic!("unexpected reply {:?}", other),
        }
    }
}
