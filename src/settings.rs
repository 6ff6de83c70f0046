//! Sheet-generation settings.
//!
//! The backend stores these and applies them when it converts a MIDI file to
//! sheet text. Missing fields fall back to the backend's own defaults, and
//! unknown fields (the web front-end keeps its colour theme in the same
//! document) are carried through untouched so saving from here never drops
//! them.

use serde::{Deserialize, Serialize};

/// How transposition is chosen when generating sheet text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransposeMode {
    /// The backend picks the single best transposition.
    #[default]
    Auto,
    /// The backend emits one section per useful transposition.
    Multi,
}

impl TransposeMode {
    pub fn toggled(self) -> Self {
        match self {
            TransposeMode::Auto => TransposeMode::Multi,
            TransposeMode::Multi => TransposeMode::Auto,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TransposeMode::Auto => "Auto",
            TransposeMode::Multi => "Multi",
        }
    }
}

/// Where notes shifted by quantization are placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShiftedPlacement {
    End,
    /// Also used for values this client does not know.
    #[default]
    #[serde(other)]
    Start,
}

/// Where out-of-range notes are placed inside a chord.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutOfRangePlacement {
    Start,
    End,
    /// Low notes go to the start of the chord, high notes to the end. Also
    /// used for values this client does not know.
    #[default]
    #[serde(other)]
    Inorder,
}

/// How the backend breaks sheet text into lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineBreaks {
    Never,
    /// Break after every `break_lines_every` beats. Also used for values
    /// this client does not know.
    #[default]
    #[serde(other)]
    Manually,
}

/// Settings sent with every `convert-to-sheets` request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SheetsSettings {
    pub resilience: u8,
    pub place_shifted_notes: ShiftedPlacement,
    pub place_out_of_range_notes: OutOfRangePlacement,
    pub break_lines_how: LineBreaks,
    pub break_lines_every: u8,
    pub quantize: u16,
    pub classic_chord_order: bool,
    pub sequential_quantizes: bool,
    pub curly_braces_for_quantized_chords: bool,
    pub include_out_of_range: bool,
    pub show_tempo_timing_marks: bool,
    pub show_out_of_range_text_marks: bool,
    pub out_of_range_separator: String,
    pub show_bpm_changes_as_comments: bool,
    pub auto_transpose: bool,
    pub multi_transpose: bool,
    /// Fields this client does not edit, preserved across load/save.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Default for SheetsSettings {
    fn default() -> Self {
        Self {
            resilience: 2,
            place_shifted_notes: ShiftedPlacement::Start,
            place_out_of_range_notes: OutOfRangePlacement::Inorder,
            break_lines_how: LineBreaks::Manually,
            break_lines_every: 4,
            quantize: 35,
            classic_chord_order: true,
            sequential_quantizes: false,
            curly_braces_for_quantized_chords: false,
            include_out_of_range: true,
            show_tempo_timing_marks: true,
            show_out_of_range_text_marks: true,
            out_of_range_separator: ":".to_string(),
            show_bpm_changes_as_comments: true,
            auto_transpose: true,
            multi_transpose: false,
            extra: serde_json::Map::new(),
        }
    }
}

impl SheetsSettings {
    /// Returns a copy with `multi_transpose` set for the given mode.
    pub fn for_mode(&self, mode: TransposeMode) -> Self {
        let mut settings = self.clone();
        settings.multi_transpose = mode == TransposeMode::Multi;
        settings
    }
}

/// One editable row in the settings dialog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingField {
    Resilience,
    Quantize,
    BreakLinesHow,
    BreakLinesEvery,
    PlaceShiftedNotes,
    PlaceOutOfRangeNotes,
    ClassicChordOrder,
    SequentialQuantizes,
    CurlyBraces,
    IncludeOutOfRange,
    ShowTempoMarks,
    ShowOutOfRangeMarks,
    ShowBpmComments,
    AutoTranspose,
}

/// Rows in display order.
pub const SETTING_FIELDS: &[SettingField] = &[
    SettingField::Resilience,
    SettingField::Quantize,
    SettingField::BreakLinesHow,
    SettingField::BreakLinesEvery,
    SettingField::PlaceShiftedNotes,
    SettingField::PlaceOutOfRangeNotes,
    SettingField::ClassicChordOrder,
    SettingField::SequentialQuantizes,
    SettingField::CurlyBraces,
    SettingField::IncludeOutOfRange,
    SettingField::ShowTempoMarks,
    SettingField::ShowOutOfRangeMarks,
    SettingField::ShowBpmComments,
    SettingField::AutoTranspose,
];

fn on_off(value: bool) -> String {
    if value { "On" } else { "Off" }.to_string()
}

impl SettingField {
    pub fn label(self) -> &'static str {
        match self {
            SettingField::Resilience => "Resilience",
            SettingField::Quantize => "Quantize (ms)",
            SettingField::BreakLinesHow => "Break lines",
            SettingField::BreakLinesEvery => "Break lines every",
            SettingField::PlaceShiftedNotes => "Shifted notes",
            SettingField::PlaceOutOfRangeNotes => "Out-of-range notes",
            SettingField::ClassicChordOrder => "Classic chord order",
            SettingField::SequentialQuantizes => "Sequential quantizes",
            SettingField::CurlyBraces => "Braces for quantized chords",
            SettingField::IncludeOutOfRange => "Include out-of-range",
            SettingField::ShowTempoMarks => "Tempo timing marks",
            SettingField::ShowOutOfRangeMarks => "Out-of-range text marks",
            SettingField::ShowBpmComments => "BPM changes as comments",
            SettingField::AutoTranspose => "Auto transpose",
        }
    }

    /// Current value formatted for display.
    pub fn value(self, s: &SheetsSettings) -> String {
        match self {
            SettingField::Resilience => s.resilience.to_string(),
            SettingField::Quantize => s.quantize.to_string(),
            SettingField::BreakLinesHow => format!("{:?}", s.break_lines_how),
            SettingField::BreakLinesEvery => s.break_lines_every.to_string(),
            SettingField::PlaceShiftedNotes => format!("{:?}", s.place_shifted_notes),
            SettingField::PlaceOutOfRangeNotes => format!("{:?}", s.place_out_of_range_notes),
            SettingField::ClassicChordOrder => on_off(s.classic_chord_order),
            SettingField::SequentialQuantizes => on_off(s.sequential_quantizes),
            SettingField::CurlyBraces => on_off(s.curly_braces_for_quantized_chords),
            SettingField::IncludeOutOfRange => on_off(s.include_out_of_range),
            SettingField::ShowTempoMarks => on_off(s.show_tempo_timing_marks),
            SettingField::ShowOutOfRangeMarks => on_off(s.show_out_of_range_text_marks),
            SettingField::ShowBpmComments => on_off(s.show_bpm_changes_as_comments),
            SettingField::AutoTranspose => on_off(s.auto_transpose),
        }
    }

    /// Steps the field by `delta`. Booleans and choices flip regardless of sign.
    pub fn adjust(self, s: &mut SheetsSettings, delta: i32) {
        match self {
            SettingField::Resilience => {
                s.resilience = (s.resilience as i32 + delta).clamp(0, 10) as u8;
            }
            SettingField::Quantize => {
                s.quantize = (s.quantize as i32 + delta * 5).clamp(0, 500) as u16;
            }
            SettingField::BreakLinesEvery => {
                s.break_lines_every = (s.break_lines_every as i32 + delta).clamp(1, 32) as u8;
            }
            SettingField::BreakLinesHow => {
                s.break_lines_how = match s.break_lines_how {
                    LineBreaks::Manually => LineBreaks::Never,
                    LineBreaks::Never => LineBreaks::Manually,
                };
            }
            SettingField::PlaceShiftedNotes => {
                s.place_shifted_notes = match s.place_shifted_notes {
                    ShiftedPlacement::Start => ShiftedPlacement::End,
                    ShiftedPlacement::End => ShiftedPlacement::Start,
                };
            }
            SettingField::PlaceOutOfRangeNotes => {
                s.place_out_of_range_notes = match (s.place_out_of_range_notes, delta >= 0) {
                    (OutOfRangePlacement::Inorder, true) => OutOfRangePlacement::Start,
                    (OutOfRangePlacement::Start, true) => OutOfRangePlacement::End,
                    (OutOfRangePlacement::End, true) => OutOfRangePlacement::Inorder,
                    (OutOfRangePlacement::Inorder, false) => OutOfRangePlacement::End,
                    (OutOfRangePlacement::Start, false) => OutOfRangePlacement::Inorder,
                    (OutOfRangePlacement::End, false) => OutOfRangePlacement::Start,
                };
            }
            SettingField::ClassicChordOrder => s.classic_chord_order = !s.classic_chord_order,
            SettingField::SequentialQuantizes => s.sequential_quantizes = !s.sequential_quantizes,
            SettingField::CurlyBraces => {
                s.curly_braces_for_quantized_chords = !s.curly_braces_for_quantized_chords
            }
            SettingField::IncludeOutOfRange => s.include_out_of_range = !s.include_out_of_range,
            SettingField::ShowTempoMarks => {
                s.show_tempo_timing_marks = !s.show_tempo_timing_marks
            }
            SettingField::ShowOutOfRangeMarks => {
                s.show_out_of_range_text_marks = !s.show_out_of_range_text_marks
            }
            SettingField::ShowBpmComments => {
                s.show_bpm_changes_as_comments = !s.show_bpm_changes_as_comments
            }
            SettingField::AutoTranspose => s.auto_transpose = !s.auto_transpose,
        }
    }
}
