//! Conversion task state machine.
//!
//! The controller never touches the network or the clock. Callers feed it
//! [`ControllerEvent`]s along with the current time and carry out the
//! [`Effect`]s it returns; responses come back as further events. This keeps
//! every transition synchronous and testable.
//!
//! ```text
//! Idle -> Submitting -> Polling -> Completed | Cancelled | Failed
//!   ^                                 |
//!   +------------ after RESET_DELAY --+
//! ```

use super::{
    ButtonBank, ButtonId, ConversionError, ConversionSource, MAX_POLL_ATTEMPTS, POLL_INTERVAL,
    RESET_DELAY,
};
use crate::api::{ApiError, ConversionResult, ConvertRequest, StatusPayload, TaskId, TaskStatus};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Where the controller is in a conversion's life.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    /// Waiting for the backend to assign a task id.
    Submitting,
    Polling,
    Completed,
    Cancelled,
    Failed(ConversionError),
}

impl Phase {
    /// True for the three final phases.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Phase::Completed | Phase::Cancelled | Phase::Failed(_)
        )
    }
}

/// Inputs to [`TaskController::dispatch`].
#[derive(Debug)]
pub enum ControllerEvent {
    /// The user pressed a convert button.
    Start {
        source: ConversionSource,
        button: ButtonId,
    },
    /// The create-task request finished.
    Created(Result<TaskId, ApiError>),
    /// A status poll finished.
    StatusReceived {
        task_id: TaskId,
        result: Result<StatusPayload, ApiError>,
    },
    /// The user pressed the stop control.
    Stop,
    /// The cancel request finished.
    StopFinished {
        task_id: TaskId,
        result: Result<(), ApiError>,
    },
    /// Time has passed.
    Tick,
}

/// Work the caller must carry out on the controller's behalf.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    CreateTask(ConvertRequest),
    FetchStatus(TaskId),
    CancelTask(TaskId),
    /// Show the finished conversion.
    Completed(ConversionResult),
    /// Show an error message to the user.
    Alert(ConversionError),
}

/// The progress line shown under the convert buttons.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Progress {
    pub message: String,
    /// Fill of the progress bar, 0-100.
    pub percent: u8,
    pub visible: bool,
}

impl Progress {
    fn show(&mut self, message: impl Into<String>, percent: u8) {
        self.message = message.into();
        self.percent = percent;
        self.visible = true;
    }

    fn hide(&mut self) {
        self.visible = false;
    }
}

/// Drives a single conversion task from creation to its final state.
///
/// Only one task is tracked at a time. The task id, the stop flag and the
/// button state are all owned here.
#[derive(Debug, Default)]
pub struct TaskController {
    phase: Phase,
    task_id: Option<TaskId>,
    /// Set by [`ControllerEvent::Stop`]; any response arriving afterwards is
    /// discarded.
    stopped: bool,
    attempts: u32,
    /// A status request is in flight; no new poll until it answers.
    awaiting_status: bool,
    next_poll_at: Option<Instant>,
    reset_at: Option<Instant>,
    buttons: ButtonBank,
    progress: Progress,
}

impl TaskController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn task_id(&self) -> Option<&TaskId> {
        self.task_id.as_ref()
    }

    pub fn buttons(&self) -> &ButtonBank {
        &self.buttons
    }

    pub fn progress(&self) -> &Progress {
        &self.progress
    }

    /// Status polls processed for the current task.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// True while a task is being created or polled.
    pub fn is_running(&self) -> bool {
        matches!(self.phase, Phase::Submitting | Phase::Polling)
    }

    /// True once stop has been requested for the current task.
    pub fn is_stopping(&self) -> bool {
        self.stopped
    }

    /// The next instant at which a [`ControllerEvent::Tick`] would do
    /// something, if any.
    pub fn next_deadline(&self) -> Option<Instant> {
        let poll = if self.phase == Phase::Polling && !self.awaiting_status && !self.stopped {
            self.next_poll_at
        } else {
            None
        };
        match (poll, self.reset_at) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Applies one event and returns the effects to perform.
    ///
    /// Events that are not legal in the current phase, and responses for a
    /// task that is no longer being polled, are ignored.
    pub fn dispatch(&mut self, event: ControllerEvent, now: Instant) -> Vec<Effect> {
        match event {
            ControllerEvent::Start { source, button } => self.start(source, button),
            ControllerEvent::Created(result) => self.on_created(result, now),
            ControllerEvent::StatusReceived { task_id, result } => {
                self.on_status(task_id, result, now)
            }
            ControllerEvent::Stop => self.stop(),
            ControllerEvent::StopFinished { task_id, result } => {
                self.on_stop_finished(task_id, result, now)
            }
            ControllerEvent::Tick => self.tick(now),
        }
    }

    fn start(&mut self, source: ConversionSource, button: ButtonId) -> Vec<Effect> {
        if self.phase != Phase::Idle {
            debug!(phase = ?self.phase, "start ignored, conversion already active");
            return Vec::new();
        }

        info!(url = %source.media_url, device = source.device.as_str(), "starting conversion");
        self.phase = Phase::Submitting;
        self.task_id = None;
        self.stopped = false;
        self.attempts = 0;
        self.awaiting_status = false;
        self.next_poll_at = None;
        self.reset_at = None;
        self.buttons.begin(button);
        self.progress.show("Starting conversion...", 10);

        vec![Effect::CreateTask(source.to_request())]
    }

    fn on_created(&mut self, result: Result<TaskId, ApiError>, now: Instant) -> Vec<Effect> {
        if self.phase != Phase::Submitting {
            debug!(phase = ?self.phase, "task creation response ignored");
            return Vec::new();
        }

        match result {
            Ok(task_id) => {
                debug!(%task_id, "polling task");
                self.task_id = Some(task_id);
                self.phase = Phase::Polling;
                self.next_poll_at = Some(now + POLL_INTERVAL);
                Vec::new()
            }
            Err(err) => {
                warn!(error = %err, "failed to create conversion task");
                self.fail(ConversionError::Start(err.user_message()), now)
            }
        }
    }

    fn on_status(
        &mut self,
        task_id: TaskId,
        result: Result<StatusPayload, ApiError>,
        now: Instant,
    ) -> Vec<Effect> {
        if self.phase != Phase::Polling || self.task_id.as_ref() != Some(&task_id) {
            debug!(%task_id, phase = ?self.phase, "stale status response ignored");
            return Vec::new();
        }
        self.awaiting_status = false;
        if self.stopped {
            debug!(%task_id, "status response after stop ignored");
            return Vec::new();
        }

        let attempt = self.attempts;
        self.attempts += 1;

        match result {
            Ok(payload) => match payload.status {
                TaskStatus::Completed => {
                    info!(%task_id, "conversion completed");
                    self.phase = Phase::Completed;
                    self.progress.show("Done!", 100);
                    self.next_poll_at = None;
                    self.reset_at = Some(now + RESET_DELAY);
                    return vec![Effect::Completed(payload.result)];
                }
                TaskStatus::Cancelled => {
                    info!(%task_id, "conversion cancelled by backend");
                    self.cancelled(now);
                    return Vec::new();
                }
                TaskStatus::Error => {
                    let message = payload
                        .error
                        .unwrap_or_else(|| "Conversion failed".to_string());
                    warn!(%task_id, error = %message, "conversion failed");
                    return self.fail(ConversionError::Backend(message), now);
                }
                TaskStatus::Pending | TaskStatus::Processing | TaskStatus::Other => {
                    let message = payload
                        .progress
                        .filter(|p| !p.is_empty())
                        .unwrap_or_else(|| "Processing...".to_string());
                    let percent = 60 + attempt * 30 / MAX_POLL_ATTEMPTS;
                    self.progress.show(message, percent.min(90) as u8);
                }
            },
            Err(err) => {
                // Logged and retried on the next tick
                warn!(%task_id, attempt = self.attempts, error = %err, "status check failed");
            }
        }

        if self.attempts >= MAX_POLL_ATTEMPTS {
            warn!(%task_id, attempts = self.attempts, "conversion timed out");
            return self.fail(ConversionError::Timeout, now);
        }

        self.next_poll_at = Some(now + POLL_INTERVAL);
        Vec::new()
    }

    fn stop(&mut self) -> Vec<Effect> {
        if self.phase != Phase::Polling || self.stopped {
            debug!(phase = ?self.phase, "stop ignored");
            return Vec::new();
        }
        let Some(task_id) = self.task_id.clone() else {
            return Vec::new();
        };

        info!(%task_id, "stopping conversion");
        self.stopped = true;
        self.buttons.stopping();
        vec![Effect::CancelTask(task_id)]
    }

    fn on_stop_finished(
        &mut self,
        task_id: TaskId,
        result: Result<(), ApiError>,
        now: Instant,
    ) -> Vec<Effect> {
        if self.phase != Phase::Polling || self.task_id.as_ref() != Some(&task_id) {
            debug!(%task_id, phase = ?self.phase, "stale stop response ignored");
            return Vec::new();
        }
        if let Err(err) = result {
            // The user asked to stop; the local state wins regardless
            warn!(%task_id, error = %err, "cancel request failed");
        }
        self.cancelled(now);
        Vec::new()
    }

    fn tick(&mut self, now: Instant) -> Vec<Effect> {
        if let Some(reset_at) = self.reset_at {
            if now >= reset_at {
                self.reset();
                return Vec::new();
            }
        }

        if self.phase != Phase::Polling || self.awaiting_status || self.stopped {
            return Vec::new();
        }
        match (&self.task_id, self.next_poll_at) {
            (Some(task_id), Some(due)) if now >= due => {
                self.awaiting_status = true;
                self.next_poll_at = None;
                vec![Effect::FetchStatus(task_id.clone())]
            }
            _ => Vec::new(),
        }
    }

    fn cancelled(&mut self, now: Instant) {
        self.phase = Phase::Cancelled;
        self.stopped = true;
        self.next_poll_at = None;
        self.buttons.reset_all();
        self.progress.show("Cancelled", self.progress.percent);
        self.reset_at = Some(now + RESET_DELAY);
    }

    fn fail(&mut self, error: ConversionError, now: Instant) -> Vec<Effect> {
        self.phase = Phase::Failed(error.clone());
        self.next_poll_at = None;
        self.awaiting_status = false;
        self.buttons.reset_all();
        self.progress.hide();
        self.reset_at = Some(now + RESET_DELAY);
        vec![Effect::Alert(error)]
    }

    /// Returns to Idle with every control restored.
    fn reset(&mut self) {
        debug!(phase = ?self.phase, "resetting conversion controls");
        self.phase = Phase::Idle;
        self.task_id = None;
        self.stopped = false;
        self.awaiting_status = false;
        self.next_poll_at = None;
        self.reset_at = None;
        self.buttons.reset_all();
        self.progress.hide();
    }
}
