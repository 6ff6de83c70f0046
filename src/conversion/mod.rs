//! Media-to-MIDI conversion task control.
//!
//! A conversion is a long-running backend task: it is created with one
//! request, then polled until it completes, fails, or is cancelled. This
//! module provides:
//! - [`TaskController`]: the state machine driving a single task, free of I/O
//! - [`ButtonBank`]: the state of the convert buttons the controller owns
//! - [`ConversionSession`]: a blocking driver for headless use

mod buttons;
mod controller;
mod session;

pub use buttons::{ButtonBank, ButtonId, ButtonMode, ButtonState};
pub use controller::{ControllerEvent, Effect, Phase, Progress, TaskController};
pub use session::{Clock, ConversionSession, SystemClock};

use crate::api::{ConvertRequest, Device};
use std::time::Duration;
use thiserror::Error;

/// Delay between status polls.
pub const POLL_INTERVAL: Duration = Duration::from_millis(2000);

/// Status polls allowed before the task is reported as timed out.
pub const MAX_POLL_ATTEMPTS: u32 = 300;

/// How long a final state stays on screen before the controls reset.
pub const RESET_DELAY: Duration = Duration::from_millis(500);

/// Failures reported to the user.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConversionError {
    #[error("Please enter a URL")]
    EmptyUrl,

    /// The task could not be created.
    #[error("Failed to start conversion: {0}")]
    Start(String),

    /// The backend reported the task as failed.
    #[error("{0}")]
    Backend(String),

    /// No final status within [`MAX_POLL_ATTEMPTS`] polls.
    #[error("Conversion timeout")]
    Timeout,
}

/// What to convert and where.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionSource {
    pub media_url: String,
    pub device: Device,
}

impl ConversionSource {
    /// Builds a source from user input, trimming the URL.
    ///
    /// # Errors
    ///
    /// Returns [`ConversionError::EmptyUrl`] if the URL is blank.
    pub fn new(media_url: &str, device: Device) -> Result<Self, ConversionError> {
        let media_url = media_url.trim();
        if media_url.is_empty() {
            return Err(ConversionError::EmptyUrl);
        }
        Ok(Self {
            media_url: media_url.to_string(),
            device,
        })
    }

    /// The button that starts this kind of source.
    ///
    /// Uploaded audio and Discord attachments go through "Convert MP3";
    /// video links go through "Convert Link".
    pub fn button(&self) -> ButtonId {
        use crate::api::MediaKind;
        match MediaKind::detect(&self.media_url) {
            Some(MediaKind::Youtube) | Some(MediaKind::Tiktok) => ButtonId::ConvertLink,
            _ => ButtonId::ConvertMp3,
        }
    }

    pub(crate) fn to_request(&self) -> ConvertRequest {
        ConvertRequest {
            media_url: self.media_url.clone(),
            device: self.device,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_rejects_blank_url() {
        assert_eq!(
            ConversionSource::new("   ", Device::Cuda),
            Err(ConversionError::EmptyUrl)
        );
        let source = ConversionSource::new("  https://youtu.be/abc ", Device::Cpu).unwrap();
        assert_eq!(source.media_url, "https://youtu.be/abc");
    }

    #[test]
    fn test_source_button() {
        let link = ConversionSource::new("https://youtu.be/abc", Device::Cuda).unwrap();
        assert_eq!(link.button(), ButtonId::ConvertLink);
        let mp3 = ConversionSource::new(
            "https://cdn.discordapp.com/attachments/1/2/song.mp3",
            Device::Cuda,
        )
        .unwrap();
        assert_eq!(mp3.button(), ButtonId::ConvertMp3);
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            ConversionError::Start("HTTP 500".to_string()).to_string(),
            "Failed to start conversion: HTTP 500"
        );
        assert_eq!(ConversionError::Timeout.to_string(), "Conversion timeout");
        assert_ne!(
            ConversionError::Timeout,
            ConversionError::Backend("Conversion timeout".to_string())
        );
    }
}
