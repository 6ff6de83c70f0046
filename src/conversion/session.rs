//! Blocking conversion driver.
//!
//! Runs a [`TaskController`] to completion by calling the backend directly on
//! the current thread. Used by the headless `convert` command; the terminal
//! UI drives the same controller through the API worker instead.

use super::{
    ControllerEvent, ConversionError, ConversionSource, Effect, Phase, Progress, TaskController,
};
use crate::api::{Api, ConversionResult};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

/// Longest single sleep, so a stop request is noticed promptly.
const MAX_SLEEP: Duration = Duration::from_millis(100);

/// Source of time for a [`ConversionSession`].
pub trait Clock {
    fn now(&self) -> Instant;
    fn sleep(&self, duration: Duration);
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Runs one conversion to a final state.
pub struct ConversionSession<'a, C: Clock> {
    api: &'a dyn Api,
    clock: C,
    controller: TaskController,
    stop: Arc<AtomicBool>,
}

impl<'a, C: Clock> ConversionSession<'a, C> {
    pub fn new(api: &'a dyn Api, clock: C) -> Self {
        Self {
            api,
            clock,
            controller: TaskController::new(),
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Flag that requests a stop when set from another thread.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    pub fn controller(&self) -> &TaskController {
        &self.controller
    }

    /// Converts `source` and blocks until the task finishes.
    ///
    /// `on_progress` is called whenever the progress line changes.
    ///
    /// # Returns
    ///
    /// `Ok(Some(result))` on completion, `Ok(None)` if the task was cancelled.
    ///
    /// # Errors
    ///
    /// Returns the failure the controller reported (start failure, backend
    /// error or timeout).
    pub fn run(
        &mut self,
        source: ConversionSource,
        mut on_progress: impl FnMut(&Progress),
    ) -> Result<Option<ConversionResult>, ConversionError> {
        let button = source.button();
        let mut pending = self.controller.dispatch(
            ControllerEvent::Start { source, button },
            self.clock.now(),
        );
        let mut outcome: Option<Result<Option<ConversionResult>, ConversionError>> = None;
        let mut last_progress = Progress::default();

        loop {
            while let Some(effect) = pending.pop() {
                if let Some(event) = self.perform(effect, &mut outcome) {
                    let mut more = self.controller.dispatch(event, self.clock.now());
                    pending.append(&mut more);
                }
            }

            if self.controller.progress() != &last_progress {
                last_progress = self.controller.progress().clone();
                if last_progress.visible {
                    on_progress(&last_progress);
                }
            }

            match self.controller.phase() {
                Phase::Completed | Phase::Failed(_) if outcome.is_some() => break,
                Phase::Cancelled => {
                    outcome.get_or_insert(Ok(None));
                    break;
                }
                Phase::Idle => break,
                _ => {}
            }

            if self.stop.load(Ordering::SeqCst) && !self.controller.is_stopping() {
                pending = self
                    .controller
                    .dispatch(ControllerEvent::Stop, self.clock.now());
                continue;
            }

            if let Some(deadline) = self.controller.next_deadline() {
                let now = self.clock.now();
                if deadline > now {
                    self.clock.sleep((deadline - now).min(MAX_SLEEP));
                }
            }
            pending = self
                .controller
                .dispatch(ControllerEvent::Tick, self.clock.now());
        }

        outcome.unwrap_or(Ok(None))
    }

    /// Carries out one effect, returning the event its response produces.
    fn perform(
        &self,
        effect: Effect,
        outcome: &mut Option<Result<Option<ConversionResult>, ConversionError>>,
    ) -> Option<ControllerEvent> {
        match effect {
            Effect::CreateTask(request) => {
                Some(ControllerEvent::Created(self.api.create_task(&request)))
            }
            Effect::FetchStatus(task_id) => {
                let result = self.api.task_status(&task_id);
                Some(ControllerEvent::StatusReceived { task_id, result })
            }
            Effect::CancelTask(task_id) => {
                let result = self.api.stop_task(&task_id);
                Some(ControllerEvent::StopFinished { task_id, result })
            }
            Effect::Completed(result) => {
                debug!(midi = ?result.midi_name, "conversion result received");
                *outcome = Some(Ok(Some(result)));
                None
            }
            Effect::Alert(error) => {
                *outcome = Some(Err(error));
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{
        ApiError, ConvertRequest, Device, HistoryEntry, SheetText, StatusPayload, TaskId,
        TaskStatus,
    };
    use crate::conversion::{MAX_POLL_ATTEMPTS, POLL_INTERVAL};
    use crate::settings::SheetsSettings;
    use std::cell::Cell;
    use std::collections::VecDeque;
    use std::path::Path;
    use std::sync::Mutex;

    /// Clock that only moves when slept.
    struct ManualClock {
        now: Cell<Instant>,
        slept: Cell<Duration>,
    }

    impl ManualClock {
        fn new() -> Self {
            Self {
                now: Cell::new(Instant::now()),
                slept: Cell::new(Duration::ZERO),
            }
        }
    }

    impl Clock for &ManualClock {
        fn now(&self) -> Instant {
            self.now.get()
        }

        fn sleep(&self, duration: Duration) {
            self.now.set(self.now.get() + duration);
            self.slept.set(self.slept.get() + duration);
        }
    }

    /// Backend that replays queued status responses, then reports `processing`.
    struct MockApi {
        create: Mutex<Option<Result<TaskId, ApiError>>>,
        statuses: Mutex<VecDeque<Result<StatusPayload, ApiError>>>,
        stop_fails: bool,
        stop_calls: Mutex<u32>,
        status_calls: Mutex<u32>,
    }

    impl MockApi {
        fn new(statuses: Vec<Result<StatusPayload, ApiError>>) -> Self {
            Self {
                create: Mutex::new(Some(Ok(TaskId::new("task-1")))),
                statuses: Mutex::new(statuses.into()),
                stop_fails: false,
                stop_calls: Mutex::new(0),
                status_calls: Mutex::new(0),
            }
        }
    }

    fn payload(status: TaskStatus) -> StatusPayload {
        StatusPayload {
            status,
            progress: None,
            error: None,
            result: ConversionResult::default(),
        }
    }

    impl Api for MockApi {
        fn create_task(&self, _request: &ConvertRequest) -> Result<TaskId, ApiError> {
            self.create
                .lock()
                .unwrap()
                .take()
                .unwrap_or_else(|| Ok(TaskId::new("task-1")))
        }

        fn task_status(&self, _task_id: &TaskId) -> Result<StatusPayload, ApiError> {
            *self.status_calls.lock().unwrap() += 1;
            self.statuses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(payload(TaskStatus::Processing)))
        }

        fn stop_task(&self, _task_id: &TaskId) -> Result<(), ApiError> {
            *self.stop_calls.lock().unwrap() += 1;
            if self.stop_fails {
                Err(ApiError::Status {
                    code: 500,
                    message: "Internal Server Error".to_string(),
                })
            } else {
                Ok(())
            }
        }

        fn convert_to_sheets(
            &self,
            _midi_filename: &str,
            _settings: &SheetsSettings,
        ) -> Result<SheetText, ApiError> {
            Err(ApiError::Rejected("unused".to_string()))
        }

        fn upload_midi(&self, _path: &Path) -> Result<String, ApiError> {
            Err(ApiError::Rejected("unused".to_string()))
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

    fn source() -> ConversionSource {
        ConversionSource::new("https://youtu.be/abc", Device::Cpu).unwrap()
    }

    #[test]
    fn test_session_completes() {
        let mut done = payload(TaskStatus::Completed);
        done.result.midi_name = Some("abc.mid".to_string());
        let api = MockApi::new(vec![
            Ok(payload(TaskStatus::Processing)),
            Err(ApiError::Transport("reset".to_string())),
            Ok(done),
        ]);
        let clock = ManualClock::new();
        let mut session = ConversionSession::new(&api, &clock);

        let mut messages = Vec::new();
        let result = session
            .run(source(), |p| messages.push(p.message.clone()))
            .unwrap();

        assert_eq!(result.unwrap().midi_name.as_deref(), Some("abc.mid"));
        assert_eq!(*api.status_calls.lock().unwrap(), 3);
        assert_eq!(messages.first().map(String::as_str), Some("Starting conversion..."));
        assert_eq!(messages.last().map(String::as_str), Some("Done!"));
        // Three polls, each after the full interval
        assert!(clock.slept.get() >= POLL_INTERVAL * 3);
    }

    #[test]
    fn test_session_start_failure() {
        let api = MockApi::new(Vec::new());
        *api.create.lock().unwrap() = Some(Err(ApiError::Transport("refused".to_string())));
        let clock = ManualClock::new();
        let mut session = ConversionSession::new(&api, &clock);

        let err = session.run(source(), |_| {}).unwrap_err();
        assert!(matches!(err, ConversionError::Start(_)));
        assert_eq!(*api.status_calls.lock().unwrap(), 0);
    }

    #[test]
    fn test_session_backend_error() {
        let mut failed = payload(TaskStatus::Error);
        failed.error = Some("Unsupported media".to_string());
        let api = MockApi::new(vec![Ok(failed)]);
        let clock = ManualClock::new();
        let mut session = ConversionSession::new(&api, &clock);

        let err = session.run(source(), |_| {}).unwrap_err();
        assert_eq!(err, ConversionError::Backend("Unsupported media".to_string()));
    }

    #[test]
    fn test_session_timeout() {
        let api = MockApi::new(Vec::new());
        let clock = ManualClock::new();
        let mut session = ConversionSession::new(&api, &clock);

        let err = session.run(source(), |_| {}).unwrap_err();
        assert_eq!(err, ConversionError::Timeout);
        assert_eq!(*api.status_calls.lock().unwrap(), MAX_POLL_ATTEMPTS);
    }

    #[test]
    fn test_session_stop_with_failing_cancel() {
        let mut api = MockApi::new(Vec::new());
        api.stop_fails = true;
        let clock = ManualClock::new();
        let mut session = ConversionSession::new(&api, &clock);
        let stop = session.stop_handle();

        let mut polls_seen = 0;
        let result = session.run(source(), |p| {
            if p.message == "Processing..." {
                polls_seen += 1;
                stop.store(true, Ordering::SeqCst);
            }
        });

        assert_eq!(result, Ok(None));
        assert_eq!(polls_seen, 1);
        assert_eq!(*api.stop_calls.lock().unwrap(), 1);
        assert_eq!(session.controller().phase(), &Phase::Cancelled);
        assert!(session.controller().buttons().is_reset());
    }
}
