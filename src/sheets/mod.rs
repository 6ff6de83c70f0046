//! QWERTY sheet text analysis and colorization.
//!
//! Sheet text is the backend's plain-text rendering of a MIDI performance as
//! keyboard notation. Chords are separated by short literal tokens whose
//! shape encodes the rhythmic gap before the next chord. This module finds
//! those tokens, assigns every character a duration colour, and renders the
//! result either as HTML markup or as a typed layout for the terminal viewer.

mod colorize;
mod tokenizer;
mod transpose;

pub use colorize::{colorize_tempo_text, layout_sheet, ChordSpan, Glyph, SheetLayout, SheetLine};
pub use tokenizer::{find_separators, out_of_range_mask, separator_at, Separator, SEPARATOR_RULES};
pub use transpose::extract_transposes;

/// Note-length categories used for colouring, shortest to longest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DurationClass {
    SixtyFourth,
    ThirtySecond,
    Sixteenth,
    Eighth,
    Quarter,
    Half,
    Whole,
    Quadruple,
    /// Fallback for text with no timing information.
    Long,
}

/// An RGB colour from the sheet palette.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TempoColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl TempoColor {
    const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Formats the colour as a lowercase `#rrggbb` string.
    pub fn hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl DurationClass {
    /// Returns the display colour for this duration.
    pub const fn color(self) -> TempoColor {
        match self {
            DurationClass::Long | DurationClass::Quadruple => TempoColor::rgb(0xa3, 0xf0, 0xa3),
            DurationClass::Whole => TempoColor::rgb(0x74, 0xda, 0x74),
            DurationClass::Half => TempoColor::rgb(0x9a, 0xda, 0x5a),
            DurationClass::Quarter => TempoColor::rgb(0xc0, 0xc0, 0x5a),
            DurationClass::Eighth => TempoColor::rgb(0xda, 0x7e, 0x5a),
            DurationClass::Sixteenth => TempoColor::rgb(0xda, 0xa6, 0xa6),
            DurationClass::ThirtySecond => TempoColor::rgb(0xff, 0x19, 0x00),
            DurationClass::SixtyFourth => TempoColor::rgb(0x9c, 0x0f, 0x00),
        }
    }

    /// Short human-readable label, used in the viewer legend.
    pub const fn label(self) -> &'static str {
        match self {
            DurationClass::SixtyFourth => "1/64",
            DurationClass::ThirtySecond => "1/32",
            DurationClass::Sixteenth => "1/16",
            DurationClass::Eighth => "1/8",
            DurationClass::Quarter => "1/4",
            DurationClass::Half => "1/2",
            DurationClass::Whole => "1",
            DurationClass::Quadruple => "4",
            DurationClass::Long => "long",
        }
    }
}
