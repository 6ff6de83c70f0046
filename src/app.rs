//! Application state and event handling.
//!
//! This module defines the main application state that ties the conversion
//! controller, the background API worker, the history list and the sheet
//! viewer to the TUI.

use crate::api::{
    Api, ApiError, ApiReply, ApiRequest, ApiWorker, ConversionResult, Device, SheetText,
};
use crate::conversion::{ControllerEvent, ConversionSource, Effect, TaskController};
use crate::history::{entry_for_result, HistoryList, MAX_HISTORY_ENTRIES};
use crate::midi::{check_midi_file, is_midi_path};
use crate::settings::{SheetsSettings, TransposeMode, SETTING_FIELDS};
use crate::sheets::{extract_transposes, layout_sheet, SheetLayout};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// How long status messages stay visible.
const STATUS_TIMEOUT: Duration = Duration::from_secs(3);

/// Which panel receives keyboard input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Focus {
    /// The media URL input and convert buttons.
    #[default]
    Input,
    History,
    Viewer,
}

impl Focus {
    /// Next panel in Tab order. The viewer is only reachable while open.
    pub fn next(self, viewer_open: bool) -> Self {
        match self {
            Focus::Input => Focus::History,
            Focus::History if viewer_open => Focus::Viewer,
            Focus::History | Focus::Viewer => Focus::Input,
        }
    }
}

/// State of the sheet viewer panel.
#[derive(Debug, Clone, Default)]
pub struct SheetViewerState {
    /// Whether the viewer is shown.
    pub open: bool,
    /// Backend name of the MIDI file being viewed.
    pub midi_filename: Option<String>,
    /// Heading shown above the sheet.
    pub title: String,
    /// Last sheet text received for the current file and mode.
    pub sheet: Option<SheetText>,
    /// Coloured layout of `sheet`.
    pub layout: SheetLayout,
    /// Values of the sheet's `Transpose by:` headers.
    pub transposes: Vec<i32>,
    pub mode: TransposeMode,
    /// A sheet request is outstanding.
    pub loading: bool,
    pub error: Option<String>,
    /// Vertical scroll offset in lines.
    pub scroll: u16,
    /// Rows available for the sheet (updated during rendering).
    pub visible_rows: u16,
    /// Show the transposes line under the title.
    pub show_transposes: bool,
}

impl SheetViewerState {
    fn max_scroll(&self) -> u16 {
        u16::try_from(self.layout.lines.len())
            .unwrap_or(u16::MAX)
            .saturating_sub(self.visible_rows.max(1))
    }
}

/// State for the MIDI file browser dialog.
#[derive(Debug, Clone)]
pub struct FileBrowserState {
    /// Whether the browser is open.
    pub open: bool,
    /// Current directory path.
    pub current_dir: PathBuf,
    /// Directories first, then MIDI files.
    pub entries: Vec<PathBuf>,
    /// Currently selected index.
    pub selected: usize,
    /// Scroll offset for long lists.
    pub scroll: usize,
}

impl Default for FileBrowserState {
    fn default() -> Self {
        Self {
            open: false,
            current_dir: std::env::current_dir().unwrap_or_default(),
            entries: Vec::new(),
            selected: 0,
            scroll: 0,
        }
    }
}

/// Lists `dir` for the file browser: a `..` entry when there is a parent,
/// then subdirectories, then `.mid`/`.midi` files, each sorted.
pub fn list_midi_dir(dir: &Path) -> Vec<PathBuf> {
    let mut entries = Vec::new();
    if dir.parent().is_some() {
        entries.push(PathBuf::from(".."));
    }

    if let Ok(read) = std::fs::read_dir(dir) {
        let mut dirs: Vec<PathBuf> = Vec::new();
        let mut files: Vec<PathBuf> = Vec::new();

        for entry in read.flatten() {
            let path = entry.path();
            if path.is_dir() {
                dirs.push(path);
            } else if is_midi_path(&path) {
                files.push(path);
            }
        }

        dirs.sort();
        files.sort();
        entries.extend(dirs);
        entries.extend(files);
    }

    entries
}

/// State for the sheet settings dialog.
#[derive(Debug, Clone, Default)]
pub struct SettingsDialogState {
    /// Whether the dialog is open.
    pub open: bool,
    /// Index into [`SETTING_FIELDS`].
    pub selected: usize,
    /// Edited copy, applied on confirm.
    pub draft: SheetsSettings,
}

/// A modal message that must be dismissed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub title: String,
    pub message: String,
}

impl Alert {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            title: "Error".to_string(),
            message: message.into(),
        }
    }
}

/// Main application state.
pub struct App {
    /// Backend base URL, shown in the header.
    pub server: String,
    /// Device sent with new conversions.
    pub device: Device,
    /// Contents of the media URL input.
    pub url_input: String,
    /// Currently focused panel.
    pub focus: Focus,
    /// Conversion state machine.
    pub controller: TaskController,
    /// Background thread running backend requests.
    worker: ApiWorker,
    /// Conversion history.
    pub history: HistoryList,
    /// Rows available in the history panel (updated during rendering).
    pub history_rows: usize,
    /// Result of the last finished conversion.
    pub last_result: Option<ConversionResult>,
    /// Sheet viewer state.
    pub viewer: SheetViewerState,
    /// Sheet settings sent with every sheet request.
    pub settings: SheetsSettings,
    /// Settings dialog state.
    pub settings_dialog: SettingsDialogState,
    /// MIDI upload browser state.
    pub file_browser: FileBrowserState,
    /// Modal message, if any.
    pub alert: Option<Alert>,
    /// Status message to display.
    pub status_message: Option<(String, Instant)>,
    /// Whether the help overlay is visible.
    pub show_help: bool,
    /// Help menu scroll offset.
    pub help_scroll: u16,
    /// Result of the last health check; None until it answers.
    pub backend_online: Option<bool>,
}

impl App {
    /// Creates the application and queues the startup requests.
    ///
    /// # Arguments
    ///
    /// * `api` - Backend implementation used by the worker thread
    /// * `server` - Backend address for display
    /// * `device` - Initial compute device
    ///
    /// # Errors
    ///
    /// Returns error if the worker thread cannot be started
    pub fn new(api: Arc<dyn Api>, server: impl Into<String>, device: Device) -> Result<Self> {
        let worker = ApiWorker::spawn(api).context("Failed to start API worker")?;

        let mut app = Self {
            server: server.into(),
            device,
            url_input: String::new(),
            focus: Focus::Input,
            controller: TaskController::new(),
            worker,
            history: HistoryList::new(),
            history_rows: 10,
            last_result: None,
            viewer: SheetViewerState::default(),
            settings: SheetsSettings::default(),
            settings_dialog: SettingsDialogState::default(),
            file_browser: FileBrowserState::default(),
            alert: None,
            status_message: None,
            show_help: false,
            help_scroll: 0,
            backend_online: None,
        };

        app.worker.submit(ApiRequest::Health);
        app.worker.submit(ApiRequest::LoadSettings);
        app.refresh_history();
        Ok(app)
    }

    /// Sets a status message to display temporarily.
    pub fn set_status(&mut self, message: impl Into<String>) {
        self.status_message = Some((message.into(), Instant::now()));
    }

    /// Clears expired status messages.
    pub fn clear_expired_status(&mut self) {
        if let Some((_, time)) = &self.status_message {
            if time.elapsed() > STATUS_TIMEOUT {
                self.status_message = None;
            }
        }
    }

    /// Shows a modal error.
    pub fn show_error(&mut self, message: impl Into<String>) {
        self.alert = Some(Alert::error(message));
    }

    pub fn dismiss_alert(&mut self) {
        self.alert = None;
    }

    /// True while the worker has requests outstanding.
    pub fn is_busy(&self) -> bool {
        self.worker.is_busy()
    }

    // ==================== Main loop ====================

    /// Applies finished backend replies and advances the controller clock.
    ///
    /// Called once per frame.
    pub fn update(&mut self, now: Instant) {
        while let Some(reply) = self.worker.try_recv() {
            self.handle_reply(reply, now);
        }
        let effects = self.controller.dispatch(ControllerEvent::Tick, now);
        self.run_effects(effects);
    }

    /// Routes one backend reply.
    fn handle_reply(&mut self, reply: ApiReply, now: Instant) {
        match reply {
            ApiReply::TaskCreated(result) => {
                let effects = self
                    .controller
                    .dispatch(ControllerEvent::Created(result), now);
                self.run_effects(effects);
            }
            ApiReply::TaskStatus { task_id, result } => {
                let effects = self
                    .controller
                    .dispatch(ControllerEvent::StatusReceived { task_id, result }, now);
                self.run_effects(effects);
            }
            ApiReply::TaskStopped { task_id, result } => {
                let effects = self
                    .controller
                    .dispatch(ControllerEvent::StopFinished { task_id, result }, now);
                self.run_effects(effects);
            }
            ApiReply::Sheets {
                midi_filename,
                result,
            } => self.on_sheets(midi_filename, result),
            ApiReply::Uploaded { path, result } => self.on_uploaded(&path, result),
            ApiReply::History(result) => match result {
                Ok(entries) => {
                    debug!(count = entries.len(), "history loaded");
                    self.history.replace(entries);
                }
                Err(err) => {
                    warn!(error = %err, "failed to load history");
                    self.set_status(format!("Could not load history: {}", err.user_message()));
                }
            },
            ApiReply::HistoryDeleted { timestamp, result } => match result {
                Ok(()) => {
                    self.history.remove(timestamp);
                    self.set_status("History item deleted");
                }
                Err(err) => {
                    warn!(timestamp, error = %err, "failed to delete history item");
                    self.show_error(format!("Failed to delete: {}", err.user_message()));
                }
            },
            ApiReply::SettingsLoaded(result) => match result {
                Ok(Some(settings)) => {
                    debug!("sheet settings loaded from backend");
                    self.settings = settings;
                }
                Ok(None) => debug!("backend has no saved settings, using defaults"),
                Err(err) => warn!(error = %err, "failed to load settings, using defaults"),
            },
            ApiReply::SettingsSaved(result) => match result {
                Ok(()) => self.set_status("Settings saved"),
                Err(err) => {
                    warn!(error = %err, "failed to save settings");
                    self.set_status(format!("Settings not saved: {}", err.user_message()));
                }
            },
            ApiReply::Health(result) => {
                let online = result.is_ok();
                if let Err(err) = result {
                    warn!(server = %self.server, error = %err, "backend health check failed");
                }
                self.backend_online = Some(online);
            }
        }
    }

    /// Carries out controller effects.
    fn run_effects(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::CreateTask(request) => {
                    self.worker.submit(ApiRequest::CreateTask(request));
                }
                Effect::FetchStatus(task_id) => {
                    self.worker.submit(ApiRequest::TaskStatus(task_id));
                }
                Effect::CancelTask(task_id) => {
                    self.worker.submit(ApiRequest::StopTask(task_id));
                }
                Effect::Completed(result) => self.on_conversion_completed(result),
                Effect::Alert(err) => self.show_error(format!("Error: {}", err)),
            }
        }
    }

    fn on_conversion_completed(&mut self, result: ConversionResult) {
        let message = match result.conversion_time {
            Some(secs) => format!("Done in: {} s.", secs),
            None => "Done!".to_string(),
        };
        info!(midi = ?result.midi_name, "conversion finished");
        self.set_status(message);
        self.history.record(entry_for_result(result.clone()));
        self.last_result = Some(result);
        // The backend adds its own entry with the authoritative timestamp
        self.refresh_history();
    }

    // ==================== Conversion ====================

    /// Starts converting the URL in the input box.
    pub fn start_conversion(&mut self, now: Instant) {
        let source = match ConversionSource::new(&self.url_input, self.device) {
            Ok(source) => source,
            Err(err) => {
                self.alert = Some(Alert {
                    title: "Input Required".to_string(),
                    message: err.to_string(),
                });
                return;
            }
        };
        let button = source.button();
        let effects = self
            .controller
            .dispatch(ControllerEvent::Start { source, button }, now);
        // An ignored start keeps the previous result on screen
        if effects.iter().any(|e| matches!(e, Effect::CreateTask(_))) {
            self.last_result = None;
        }
        self.run_effects(effects);
    }

    /// Requests cancellation of the running conversion.
    pub fn stop_conversion(&mut self, now: Instant) {
        let effects = self.controller.dispatch(ControllerEvent::Stop, now);
        self.run_effects(effects);
    }

    /// Starts a conversion when idle, stops it when polling.
    pub fn toggle_conversion(&mut self, now: Instant) {
        if self.controller.is_running() {
            self.stop_conversion(now);
        } else {
            self.start_conversion(now);
        }
    }

    pub fn toggle_device(&mut self) {
        self.device = self.device.toggled();
        self.set_status(format!("Device: {}", self.device.as_str()));
    }

    pub fn input_char(&mut self, c: char) {
        self.url_input.push(c);
    }

    pub fn input_backspace(&mut self) {
        self.url_input.pop();
    }

    pub fn input_clear(&mut self) {
        self.url_input.clear();
    }

    // ==================== History ====================

    pub fn refresh_history(&mut self) {
        self.worker.submit(ApiRequest::History {
            limit: MAX_HISTORY_ENTRIES,
        });
    }

    /// Opens the sheet viewer for the highlighted history entry.
    pub fn open_selected_history(&mut self) {
        let Some(entry) = self.history.selected() else {
            return;
        };
        match entry.result.midi_name.clone() {
            Some(midi) => {
                let title = entry.result.title().to_string();
                self.open_viewer(midi, title);
            }
            None => self.set_status("This entry has no MIDI file"),
        }
    }

    /// Asks the backend to delete the highlighted history entry.
    pub fn delete_selected_history(&mut self) {
        if let Some(entry) = self.history.selected() {
            let timestamp = entry.timestamp;
            self.worker.submit(ApiRequest::DeleteHistory { timestamp });
        }
    }

    /// Opens the viewer for the last finished conversion.
    pub fn open_last_result(&mut self) {
        if let Some(result) = &self.last_result {
            if let Some(midi) = result.midi_name.clone() {
                let title = result.title().to_string();
                self.open_viewer(midi, title);
            }
        }
    }

    // ==================== Sheet viewer ====================

    /// Opens the viewer for a MIDI file the backend knows about and requests
    /// its sheet text.
    pub fn open_viewer(&mut self, midi_filename: String, title: String) {
        info!(%midi_filename, "opening sheet viewer");
        self.viewer = SheetViewerState {
            open: true,
            midi_filename: Some(midi_filename),
            title,
            mode: self.viewer.mode,
            visible_rows: self.viewer.visible_rows,
            ..Default::default()
        };
        self.focus = Focus::Viewer;
        self.request_sheets();
    }

    pub fn close_viewer(&mut self) {
        self.viewer.open = false;
        if self.focus == Focus::Viewer {
            self.focus = Focus::History;
        }
    }

    fn request_sheets(&mut self) {
        let Some(midi_filename) = self.viewer.midi_filename.clone() else {
            return;
        };
        self.viewer.loading = true;
        self.viewer.error = None;
        self.worker.submit(ApiRequest::ConvertToSheets {
            midi_filename,
            settings: self.settings.for_mode(self.viewer.mode),
        });
    }

    fn on_sheets(&mut self, midi_filename: String, result: Result<SheetText, ApiError>) {
        if self.viewer.midi_filename.as_deref() != Some(midi_filename.as_str()) {
            debug!(%midi_filename, "sheet response for a closed file ignored");
            return;
        }
        self.viewer.loading = false;
        match result {
            Ok(sheet) => {
                self.viewer.layout = layout_sheet(&sheet.text);
                self.viewer.transposes = extract_transposes(&sheet.text);
                self.viewer.scroll = self.viewer.scroll.min(self.viewer.max_scroll());
                self.viewer.sheet = Some(sheet);
            }
            Err(err) => {
                warn!(%midi_filename, error = %err, "sheet conversion failed");
                self.viewer.error = Some(err.user_message());
            }
        }
    }

    /// Switches between auto and multi transpose and re-fetches the sheet.
    pub fn toggle_transpose_mode(&mut self) {
        if !self.viewer.open {
            return;
        }
        self.viewer.mode = self.viewer.mode.toggled();
        self.viewer.scroll = 0;
        self.set_status(format!("Transpose mode: {}", self.viewer.mode.label()));
        self.request_sheets();
    }

    pub fn toggle_show_transposes(&mut self) {
        self.viewer.show_transposes = !self.viewer.show_transposes;
    }

    /// Scrolls the viewer by `delta` lines, clamped to the sheet.
    pub fn scroll_viewer(&mut self, delta: i32) {
        let next = (self.viewer.scroll as i32 + delta).clamp(0, self.viewer.max_scroll() as i32);
        self.viewer.scroll = next as u16;
    }

    pub fn viewer_page(&self) -> i32 {
        self.viewer.visible_rows.max(1) as i32
    }

    fn sheet_stem(&self) -> String {
        self.viewer
            .midi_filename
            .as_deref()
            .map(|name| {
                Path::new(name)
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .unwrap_or(name)
                    .to_string()
            })
            .unwrap_or_else(|| "sheet".to_string())
    }

    /// Writes the raw sheet text to `<midi>_sheets.txt` in `dir`.
    ///
    /// A backend-supplied file name is reduced to its final component, so the
    /// file always lands directly in `dir`.
    ///
    /// # Errors
    ///
    /// Returns error if no sheet is loaded or the file cannot be written
    pub fn save_sheet_text(&self, dir: &Path) -> Result<PathBuf> {
        let sheet = self
            .viewer
            .sheet
            .as_ref()
            .context("No sheet loaded")?;
        let filename = sheet
            .sheets_filename
            .as_deref()
            .and_then(|name| Path::new(name).file_name())
            .map(|name| name.to_os_string())
            .unwrap_or_else(|| format!("{}_sheets.txt", self.sheet_stem()).into());
        let path = dir.join(filename);
        std::fs::write(&path, &sheet.text)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(path)
    }

    /// Writes the colorized sheet to `<midi>_sheets.html` in `dir`.
    ///
    /// # Errors
    ///
    /// Returns error if no sheet is loaded or the file cannot be written
    pub fn export_sheet_html(&self, dir: &Path) -> Result<PathBuf> {
        if self.viewer.sheet.is_none() {
            anyhow::bail!("No sheet loaded");
        }
        let path = dir.join(format!("{}_sheets.html", self.sheet_stem()));
        let document = html_document(&self.viewer.title, &self.viewer.layout.to_markup());
        std::fs::write(&path, document)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(path)
    }

    // ==================== Upload ====================

    /// Opens the file browser for choosing a MIDI file to upload.
    pub fn open_file_browser(&mut self) {
        self.file_browser.open = true;
        self.file_browser.selected = 0;
        self.file_browser.scroll = 0;
        self.refresh_file_browser();
    }

    fn refresh_file_browser(&mut self) {
        self.file_browser.entries = list_midi_dir(&self.file_browser.current_dir);
        if self.file_browser.selected >= self.file_browser.entries.len() {
            self.file_browser.selected = 0;
        }
    }

    /// Moves selection up in the file browser.
    pub fn file_browser_up(&mut self) {
        if self.file_browser.open && self.file_browser.selected > 0 {
            self.file_browser.selected -= 1;
            if self.file_browser.selected < self.file_browser.scroll {
                self.file_browser.scroll = self.file_browser.selected;
            }
        }
    }

    /// Moves selection down in the file browser.
    pub fn file_browser_down(&mut self) {
        if self.file_browser.open
            && self.file_browser.selected + 1 < self.file_browser.entries.len()
        {
            self.file_browser.selected += 1;
            // Scroll if needed (assuming ~10 visible entries)
            if self.file_browser.selected >= self.file_browser.scroll + 10 {
                self.file_browser.scroll = self.file_browser.selected.saturating_sub(9);
            }
        }
    }

    /// Enters the selected directory or uploads the selected file.
    pub fn file_browser_select(&mut self) {
        if !self.file_browser.open || self.file_browser.entries.is_empty() {
            return;
        }

        let selected_path = self.file_browser.entries[self.file_browser.selected].clone();

        if selected_path == Path::new("..") {
            if let Some(parent) = self.file_browser.current_dir.parent() {
                self.file_browser.current_dir = parent.to_path_buf();
                self.file_browser.selected = 0;
                self.file_browser.scroll = 0;
                self.refresh_file_browser();
            }
        } else if selected_path.is_dir() {
            self.file_browser.current_dir = selected_path;
            self.file_browser.selected = 0;
            self.file_browser.scroll = 0;
            self.refresh_file_browser();
        } else {
            self.file_browser.open = false;
            self.upload_midi(selected_path);
        }
    }

    pub fn file_browser_cancel(&mut self) {
        self.file_browser.open = false;
        self.set_status("Upload cancelled");
    }

    /// Validates a MIDI file locally and uploads it.
    pub fn upload_midi(&mut self, path: PathBuf) {
        match check_midi_file(&path) {
            Ok(summary) => {
                let name = path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or("file")
                    .to_string();
                info!(path = %path.display(), notes = summary.notes, "uploading MIDI file");
                self.set_status(format!("Uploading {} ({})", name, summary.describe()));
                self.worker.submit(ApiRequest::UploadMidi(path));
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "MIDI file rejected");
                self.show_error(format!(
                    "Failed to process {}: {}",
                    path.display(),
                    err
                ));
            }
        }
    }

    fn on_uploaded(&mut self, path: &Path, result: Result<String, ApiError>) {
        match result {
            Ok(midi_filename) => {
                let title = path
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .unwrap_or(&midi_filename)
                    .to_string();
                self.open_viewer(midi_filename, title);
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "upload failed");
                let name = path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or("file");
                self.show_error(format!(
                    "Failed to process {}: {}",
                    name,
                    err.user_message()
                ));
            }
        }
    }

    // ==================== Settings dialog ====================

    pub fn open_settings(&mut self) {
        self.settings_dialog = SettingsDialogState {
            open: true,
            selected: 0,
            draft: self.settings.clone(),
        };
    }

    pub fn settings_up(&mut self) {
        self.settings_dialog.selected = self.settings_dialog.selected.saturating_sub(1);
    }

    pub fn settings_down(&mut self) {
        if self.settings_dialog.selected + 1 < SETTING_FIELDS.len() {
            self.settings_dialog.selected += 1;
        }
    }

    pub fn settings_adjust(&mut self, delta: i32) {
        if let Some(field) = SETTING_FIELDS.get(self.settings_dialog.selected) {
            field.adjust(&mut self.settings_dialog.draft, delta);
        }
    }

    /// Applies the draft, saves it to the backend and refreshes the viewer.
    pub fn settings_confirm(&mut self) {
        self.settings_dialog.open = false;
        if self.settings_dialog.draft == self.settings {
            return;
        }
        self.settings = self.settings_dialog.draft.clone();
        self.worker
            .submit(ApiRequest::SaveSettings(self.settings.clone()));
        if self.viewer.open {
            self.request_sheets();
        }
    }

    pub fn settings_cancel(&mut self) {
        self.settings_dialog.open = false;
    }

    /// Restores the backend defaults in the draft, keeping unknown fields.
    pub fn settings_reset_draft(&mut self) {
        let extra = std::mem::take(&mut self.settings_dialog.draft.extra);
        self.settings_dialog.draft = SheetsSettings {
            extra,
            ..SheetsSettings::default()
        };
    }
}

/// Wraps colorized markup in a standalone HTML page.
pub fn html_document(title: &str, markup: &str) -> String {
    let title = title
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;");
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{title}</title>\n\
         <style>body {{ background: #111827; color: #e5e7eb; }} \
         pre {{ font-family: monospace; font-size: 15px; line-height: 1.6; }} \
         .chord-block {{ display: inline; }}</style>\n</head>\n<body>\n\
         <h3>{title}</h3>\n<pre>{markup}</pre>\n</body>\n</html>\n"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{
        ConvertRequest, HistoryEntry, MediaKind, StatusPayload, TaskId, TaskStatus,
    };
    use crate::conversion::{Phase, POLL_INTERVAL, RESET_DELAY};
    use std::sync::Mutex;
    use std::thread;

    /// Backend whose first status poll reports completion.
    struct FakeBackend {
        stops: Mutex<u32>,
    }

    impl Api for FakeBackend {
        fn create_task(&self, _request: &ConvertRequest) -> Result<TaskId, ApiError> {
            Ok(TaskId::new("t1"))
        }

        fn task_status(&self, _task_id: &TaskId) -> Result<StatusPayload, ApiError> {
            Ok(StatusPayload {
                status: TaskStatus::Completed,
                progress: None,
                error: None,
                result: ConversionResult {
                    kind: MediaKind::Youtube,
                    midi_name: Some("abc.mid".to_string()),
                    conversion_time: Some(4.2),
                    ..Default::default()
                },
            })
        }

        fn stop_task(&self, _task_id: &TaskId) -> Result<(), ApiError> {
            *self.stops.lock().unwrap() += 1;
            Err(ApiError::Transport("connection reset".to_string()))
        }

        fn convert_to_sheets(
            &self,
            midi_filename: &str,
            settings: &SheetsSettings,
        ) -> Result<SheetText, ApiError> {
            let text = if settings.multi_transpose {
                "Transpose by: +2\n\na b\nTranspose by: -1\n\nc d".to_string()
            } else {
                format!("[{}] b, c", midi_filename)
            };
            Ok(SheetText {
                text,
                sheets_filename: None,
            })
        }

        fn upload_midi(&self, _path: &Path) -> Result<String, ApiError> {
            Ok("uploaded.mid".to_string())
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

    fn app() -> App {
        let api = Arc::new(FakeBackend {
            stops: Mutex::new(0),
        });
        App::new(api, "http://test", Device::Cpu).unwrap()
    }

    /// Pumps replies until the worker is idle.
    fn settle(app: &mut App, now: Instant) {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            app.update(now);
            if !app.is_busy() || Instant::now() > deadline {
                break;
            }
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn test_focus_cycle() {
        assert_eq!(Focus::Input.next(false), Focus::History);
        assert_eq!(Focus::History.next(false), Focus::Input);
        assert_eq!(Focus::History.next(true), Focus::Viewer);
        assert_eq!(Focus::Viewer.next(true), Focus::Input);
    }

    #[test]
    fn test_empty_url_raises_alert() {
        let mut app = app();
        app.start_conversion(Instant::now());
        let alert = app.alert.clone().unwrap();
        assert_eq!(alert.message, "Please enter a URL");
        assert_eq!(app.controller.phase(), &Phase::Idle);
    }

    #[test]
    fn test_conversion_through_worker() {
        let mut app = app();
        let start = Instant::now();
        settle(&mut app, start);
        assert_eq!(app.backend_online, Some(true));

        app.url_input = "https://youtu.be/abc".to_string();
        app.start_conversion(start);
        settle(&mut app, start);
        assert_eq!(app.controller.phase(), &Phase::Polling);

        let polled = start + POLL_INTERVAL;
        settle(&mut app, polled);
        assert_eq!(app.controller.phase(), &Phase::Completed);
        assert_eq!(
            app.last_result.as_ref().and_then(|r| r.midi_name.as_deref()),
            Some("abc.mid")
        );
        assert_eq!(
            app.status_message.as_ref().map(|(m, _)| m.as_str()),
            Some("Done in: 4.2 s.")
        );

        settle(&mut app, polled + RESET_DELAY);
        assert_eq!(app.controller.phase(), &Phase::Idle);
        assert!(app.controller.buttons().is_reset());
    }

    #[test]
    fn test_viewer_transpose_mode_refetches() {
        let mut app = app();
        let now = Instant::now();
        app.open_viewer("song.mid".to_string(), "Song".to_string());
        settle(&mut app, now);
        assert!(!app.viewer.loading);
        assert!(app.viewer.transposes.is_empty());
        assert_eq!(app.focus, Focus::Viewer);

        app.toggle_transpose_mode();
        assert_eq!(app.viewer.mode, TransposeMode::Multi);
        settle(&mut app, now);
        assert_eq!(app.viewer.transposes, vec![2, -1]);
    }

    #[test]
    fn test_save_and_export_sheet() {
        let mut app = app();
        let now = Instant::now();
        app.open_viewer("song.mid".to_string(), "Song <1>".to_string());
        settle(&mut app, now);

        let dir = std::env::temp_dir().join("sheettui-app-export");
        std::fs::create_dir_all(&dir).unwrap();

        let txt = app.save_sheet_text(&dir).unwrap();
        assert_eq!(txt.file_name().unwrap(), "song_sheets.txt");
        assert_eq!(std::fs::read_to_string(&txt).unwrap(), "[song.mid] b, c");

        let html = app.export_sheet_html(&dir).unwrap();
        let contents = std::fs::read_to_string(&html).unwrap();
        assert!(contents.contains("<title>Song &lt;1&gt;</title>"));
        assert!(contents.contains("chord-block"));
    }

    #[test]
    fn test_saved_sheet_stays_in_target_dir() {
        let mut app = app();
        let dir = std::env::temp_dir().join("sheettui-app-save").join("inner");
        std::fs::create_dir_all(&dir).unwrap();
        app.viewer.midi_filename = Some("song.mid".to_string());

        let absolute = std::env::temp_dir()
            .join("elsewhere_sheets.txt")
            .to_string_lossy()
            .into_owned();
        for (name, expected) in [
            ("../escape_sheets.txt", "escape_sheets.txt"),
            (absolute.as_str(), "elsewhere_sheets.txt"),
            ("..", "song_sheets.txt"),
        ] {
            app.viewer.sheet = Some(SheetText {
                text: "a b".to_string(),
                sheets_filename: Some(name.to_string()),
            });
            let path = app.save_sheet_text(&dir).unwrap();
            assert_eq!(path.parent(), Some(dir.as_path()));
            assert_eq!(path.file_name().unwrap(), expected);
        }
    }

    #[test]
    fn test_max_scroll_saturates_on_huge_sheets() {
        let viewer = SheetViewerState {
            layout: SheetLayout {
                lines: vec![crate::sheets::SheetLine::Blank; 70_000],
            },
            visible_rows: 10,
            ..Default::default()
        };
        assert_eq!(viewer.max_scroll(), u16::MAX - 10);

        let short = SheetViewerState {
            layout: SheetLayout {
                lines: vec![crate::sheets::SheetLine::Blank; 5],
            },
            visible_rows: 10,
            ..Default::default()
        };
        assert_eq!(short.max_scroll(), 0);
    }

    #[test]
    fn test_start_during_reset_keeps_last_result() {
        let mut app = app();
        let start = Instant::now();
        settle(&mut app, start);

        app.url_input = "https://youtu.be/abc".to_string();
        app.start_conversion(start);
        settle(&mut app, start);
        let polled = start + POLL_INTERVAL;
        settle(&mut app, polled);
        assert_eq!(app.controller.phase(), &Phase::Completed);
        assert!(app.last_result.is_some());

        // The 500 ms reset has not elapsed, so this start is ignored
        app.start_conversion(polled);
        assert_eq!(app.controller.phase(), &Phase::Completed);
        assert_eq!(
            app.last_result.as_ref().and_then(|r| r.midi_name.as_deref()),
            Some("abc.mid")
        );

        settle(&mut app, polled + RESET_DELAY);
        app.start_conversion(polled + RESET_DELAY);
        assert!(app.last_result.is_none());
    }

    #[test]
    fn test_export_without_sheet_fails() {
        let app = app();
        assert!(app.save_sheet_text(&std::env::temp_dir()).is_err());
        assert!(app.export_sheet_html(&std::env::temp_dir()).is_err());
    }

    #[test]
    fn test_upload_rejects_non_midi() {
        let mut app = app();
        app.upload_midi(PathBuf::from("song.mp3"));
        assert!(app
            .alert
            .as_ref()
            .unwrap()
            .message
            .starts_with("Failed to process song.mp3"));
    }

    #[test]
    fn test_settings_dialog_applies_draft() {
        let mut app = app();
        app.open_settings();
        app.settings_down();
        app.settings_adjust(1);
        app.settings_confirm();
        assert!(!app.settings_dialog.open);
        assert_eq!(app.settings.quantize, 40);

        app.open_settings();
        app.settings_adjust(3);
        app.settings_cancel();
        assert_eq!(app.settings.resilience, 2);
    }

    #[test]
    fn test_list_midi_dir_filters_files() {
        let dir = std::env::temp_dir().join("sheettui-browser-test");
        std::fs::create_dir_all(dir.join("sub")).unwrap();
        std::fs::write(dir.join("a.mid"), b"").unwrap();
        std::fs::write(dir.join("b.txt"), b"").unwrap();
        std::fs::write(dir.join("c.MIDI"), b"").unwrap();

        let entries = list_midi_dir(&dir);
        let names: Vec<String> = entries
            .iter()
            .map(|p| {
                p.file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "..".to_string())
            })
            .collect();
        assert_eq!(names[0], "..");
        assert!(names.contains(&"sub".to_string()));
        assert!(names.contains(&"a.mid".to_string()));
        assert!(names.contains(&"c.MIDI".to_string()));
        assert!(!names.contains(&"b.txt".to_string()));
    }
}
