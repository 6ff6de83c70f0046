//! sheettui - A terminal client for a media-to-MIDI and QWERTY sheet backend.
//!
//! This library provides the backend client, the conversion task controller,
//! the sheet colorizer and the terminal UI.

pub mod api;
pub mod app;
pub mod conversion;
pub mod history;
pub mod midi;
pub mod settings;
pub mod sheets;
pub mod ui;

// Re-export commonly used types
pub use api::{Api, ApiError, HttpApi};
pub use app::App;
pub use conversion::{ConversionError, ConversionSession, TaskController};
pub use sheets::{colorize_tempo_text, layout_sheet, SheetLayout};
