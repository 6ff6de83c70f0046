//! Local validation of Standard MIDI Files before upload.
//!
//! The backend renders any uploaded MIDI file to sheet text. Parsing it here
//! first catches files that are not MIDI at all, or that contain no notes,
//! without a round trip.

use midly::{Format, MidiMessage, Smf, Timing, TrackEventKind};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Errors from [`check_midi_file`].
#[derive(Debug, Error)]
pub enum MidiCheckError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("not a MIDI file: {0}")]
    NotMidi(String),

    #[error("MIDI parse error: {0}")]
    Parse(String),

    #[error("MIDI file contains no notes")]
    NoNotes,
}

/// What a valid MIDI file contains.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MidiSummary {
    pub format: &'static str,
    pub tracks: usize,
    /// Resolution for metrical timing; None for SMPTE timecode files.
    pub ticks_per_beat: Option<u16>,
    /// Number of note-on events with non-zero velocity.
    pub notes: usize,
}

impl MidiSummary {
    /// One-line description for the status bar.
    pub fn describe(&self) -> String {
        format!(
            "{} track{}, {} note{}",
            self.tracks,
            if self.tracks == 1 { "" } else { "s" },
            self.notes,
            if self.notes == 1 { "" } else { "s" }
        )
    }
}

/// Returns true for paths ending in `.mid` or `.midi` (case-insensitive).
pub fn is_midi_path(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("mid") || e.eq_ignore_ascii_case("midi"))
        .unwrap_or(false)
}

/// Reads and validates a MIDI file.
///
/// # Arguments
///
/// * `path` - Path to the .mid or .midi file
///
/// # Errors
///
/// Returns error if the file has the wrong extension, cannot be read, does
/// not parse, or has no notes
pub fn check_midi_file<P: AsRef<Path>>(path: P) -> Result<MidiSummary, MidiCheckError> {
    let path = path.as_ref();
    if !is_midi_path(path) {
        return Err(MidiCheckError::NotMidi(path.display().to_string()));
    }
    let data = fs::read(path)?;
    check_midi_bytes(&data)
}

/// Validates an in-memory MIDI file.
pub fn check_midi_bytes(data: &[u8]) -> Result<MidiSummary, MidiCheckError> {
    let smf = Smf::parse(data).map_err(|e| MidiCheckError::Parse(e.to_string()))?;

    let format = match smf.header.format {
        Format::SingleTrack => "single track",
        Format::Parallel => "multi-track",
        Format::Sequential => "sequential",
    };
    let ticks_per_beat = match smf.header.timing {
        Timing::Metrical(tpb) => Some(tpb.as_int()),
        Timing::Timecode(_, _) => None,
    };

    let notes = smf
        .tracks
        .iter()
        .flatten()
        .filter(|event| {
            matches!(
                event.kind,
                TrackEventKind::Midi {
                    message: MidiMessage::NoteOn { vel, .. },
                    ..
                } if vel.as_int() > 0
            )
        })
        .count();

    if notes == 0 {
        return Err(MidiCheckError::NoNotes);
    }

    Ok(MidiSummary {
        format,
        tracks: smf.tracks.len(),
        ticks_per_beat,
        notes,
    })
}
