//! Duration colouring of sheet text.
//!
//! [`layout_sheet`] turns raw sheet text into a typed layout of chord spans
//! and coloured glyphs. [`colorize_tempo_text`] renders that layout as HTML
//! markup; the terminal viewer renders the same layout with ratatui styles.

use super::tokenizer::{find_separators, out_of_range_mask};
use super::DurationClass;
use std::fmt::Write;

/// Prefix of the metadata line emitted before each transposed section.
pub(crate) const TRANSPOSE_PREFIX: &str = "Transpose by:";

/// Prefix of comment lines (tempo changes and similar annotations).
const COMMENT_PREFIX: &str = "<!--";

/// A single character with its assigned duration colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Glyph {
    pub ch: char,
    pub class: DurationClass,
    /// Part of an out-of-range marker (`:` plus the following character).
    pub out_of_range: bool,
}

/// Characters played together, up to and including the separator that
/// follows them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChordSpan {
    pub glyphs: Vec<Glyph>,
}

/// One classified line of sheet text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SheetLine {
    /// `Transpose by: ...` header, passed through verbatim.
    Metadata(String),
    /// `<!-- ... -->` annotation, passed through verbatim.
    Comment(String),
    Blank,
    Content(Vec<ChordSpan>),
}

/// The analysed form of a whole sheet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SheetLayout {
    pub lines: Vec<SheetLine>,
}

/// Analyses sheet text line by line.
///
/// A blank line directly after a `Transpose by:` header is dropped; any
/// further blank lines are kept. Empty input yields an empty layout.
pub fn layout_sheet(text: &str) -> SheetLayout {
    let mut layout = SheetLayout::default();
    if text.is_empty() {
        return layout;
    }

    let mut skip_next_blank = false;

    for raw in text.split('\n') {
        let line = raw.strip_suffix('\r').unwrap_or(raw);
        let trimmed = line.trim();

        if trimmed.starts_with(TRANSPOSE_PREFIX) {
            layout.lines.push(SheetLine::Metadata(line.to_string()));
            skip_next_blank = true;
            continue;
        }

        if skip_next_blank && trimmed.is_empty() {
            skip_next_blank = false;
            continue;
        }
        skip_next_blank = false;

        if trimmed.is_empty() {
            layout.lines.push(SheetLine::Blank);
        } else if trimmed.starts_with(COMMENT_PREFIX) {
            layout.lines.push(SheetLine::Comment(line.to_string()));
        } else {
            layout.lines.push(SheetLine::Content(chord_spans(line)));
        }
    }

    layout
}

/// Splits a content line into coloured chord spans.
fn chord_spans(line: &str) -> Vec<ChordSpan> {
    let chars: Vec<char> = line.chars().collect();
    let separators = find_separators(&chars);
    let out_of_range = out_of_range_mask(&chars);

    let glyph = |i: usize, class: DurationClass| Glyph {
        ch: chars[i],
        class,
        out_of_range: out_of_range[i],
    };

    if separators.is_empty() {
        let glyphs = (0..chars.len())
            .map(|i| glyph(i, DurationClass::Long))
            .collect();
        return vec![ChordSpan { glyphs }];
    }

    let mut spans = Vec::with_capacity(separators.len() + 1);
    let mut chord_start = 0;

    for sep in &separators {
        let glyphs = (chord_start..sep.end).map(|i| glyph(i, sep.class)).collect();
        spans.push(ChordSpan { glyphs });
        chord_start = sep.end;
    }

    // Trailing chord inherits the colour of the last separator
    if chord_start < chars.len() {
        let last_class = separators[separators.len() - 1].class;
        let glyphs = (chord_start..chars.len())
            .map(|i| glyph(i, last_class))
            .collect();
        spans.push(ChordSpan { glyphs });
    }

    spans
}

fn push_escaped(out: &mut String, text: &str) {
    for ch in text.chars() {
        push_escaped_char(out, ch);
    }
}

fn push_escaped_char(out: &mut String, ch: char) {
    match ch {
        '&' => out.push_str("&amp;"),
        '<' => out.push_str("&lt;"),
        '>' => out.push_str("&gt;"),
        _ => out.push(ch),
    }
}

fn push_glyph(out: &mut String, glyph: &Glyph) {
    let color = glyph.class.color().hex();
    if glyph.out_of_range {
        let _ = write!(
            out,
            "<span style=\"color:{color}; font-weight: 900; border-bottom: 2px solid; \
             display: inline-flex; justify-content: center; min-width: 0.6em; \
             text-stroke: 0.9px {color}; -webkit-text-stroke: 0.9px {color};\">"
        );
    } else {
        let _ = write!(out, "<span style=\"color:{color}\">");
    }
    push_escaped_char(out, glyph.ch);
    out.push_str("</span>");
}

impl SheetLayout {
    /// Renders the layout as HTML markup, one line per input line.
    pub fn to_markup(&self) -> String {
        let mut out = String::new();
        for line in &self.lines {
            match line {
                SheetLine::Metadata(text) | SheetLine::Comment(text) => push_escaped(&mut out, text),
                SheetLine::Blank => {}
                SheetLine::Content(spans) => {
                    for span in spans {
                        out.push_str("<span class=\"chord-block\">");
                        for glyph in &span.glyphs {
                            push_glyph(&mut out, glyph);
                        }
                        out.push_str("</span>");
                    }
                }
            }
            out.push('\n');
        }
        out
    }
}

/// Converts sheet text into duration-coloured HTML markup.
///
/// Total over all inputs: malformed timing simply falls back to the default
/// colour, and the empty string produces empty output.
pub fn colorize_tempo_text(text: &str) -> String {
    layout_sheet(text).to_markup()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn content(layout: &SheetLayout, index: usize) -> &[ChordSpan] {
        match &layout.lines[index] {
            SheetLine::Content(spans) => spans,
            other => panic!("expected content line, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(colorize_tempo_text(""), "");
        assert!(layout_sheet("").lines.is_empty());
    }

    #[test]
    fn test_deterministic() {
        let text = "Transpose by: +2\n\n[tu] y - o, p... a\n<!-- 120 BPM -->\nC:4 D\n";
        assert_eq!(colorize_tempo_text(text), colorize_tempo_text(text));
    }

    #[test]
    fn test_line_without_separators_is_one_long_span() {
        let layout = layout_sheet("[tyu]");
        let spans = content(&layout, 0);
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].glyphs.len(), 5);
        assert!(spans[0]
            .glyphs
            .iter()
            .all(|g| g.class == DurationClass::Long));

        let markup = colorize_tempo_text("[tyu]");
        assert_eq!(markup.matches("chord-block").count(), 1);
        assert_eq!(markup.matches("color:#a3f0a3").count(), 5);
    }

    #[test]
    fn test_four_dot_separator_coloring() {
        let layout = layout_sheet("A.... B");
        let spans = content(&layout, 0);
        assert_eq!(spans.len(), 2);
        // "A.... " is one chord coloured as a whole note
        assert_eq!(spans[0].glyphs.len(), 6);
        assert!(spans[0]
            .glyphs
            .iter()
            .all(|g| g.class == DurationClass::Whole));
        // Trailing "B" inherits the last separator colour
        assert_eq!(spans[1].glyphs.len(), 1);
        assert_eq!(spans[1].glyphs[0].class, DurationClass::Whole);
    }

    #[test]
    fn test_mid_line_three_dots_are_not_a_separator() {
        let layout = layout_sheet("ab...c");
        let spans = content(&layout, 0);
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].glyphs.len(), 6);
        assert!(spans[0]
            .glyphs
            .iter()
            .all(|g| g.class == DurationClass::Long));

        // At the end of a line they still close the chord
        let layout = layout_sheet("ab...");
        let spans = content(&layout, 0);
        assert_eq!(spans.len(), 1);
        assert!(spans[0]
            .glyphs
            .iter()
            .all(|g| g.class == DurationClass::Whole));
    }

    #[test]
    fn test_each_chord_takes_its_own_separator_color() {
        let layout = layout_sheet("a b, c");
        let spans = content(&layout, 0);
        assert_eq!(spans.len(), 3);
        assert_eq!(spans[0].glyphs[0].class, DurationClass::Eighth);
        assert_eq!(spans[1].glyphs[0].class, DurationClass::Half);
        assert_eq!(spans[2].glyphs[0].class, DurationClass::Half);
    }

    #[test]
    fn test_out_of_range_markup() {
        let markup = colorize_tempo_text("C:4 D");
        let emphasized = "font-weight: 900";
        assert_eq!(markup.matches(emphasized).count(), 2);

        let colon = markup.find(">:</span>").expect("colon span");
        let four = markup.find(">4</span>").expect("digit span");
        assert!(colon < four);
        // The two emphasized spans sit next to each other
        let between = &markup[colon + ">:</span>".len()..four];
        assert!(between.starts_with("<span style=\"color:#da7e5a; font-weight: 900"));
        assert!(!between.contains("</span>"));
        assert!(markup.contains("-webkit-text-stroke: 0.9px #da7e5a"));
    }

    #[test]
    fn test_transpose_header_suppresses_one_blank_line() {
        let layout = layout_sheet("Transpose by: +2\n\n\nabc");
        assert_eq!(
            layout.lines,
            vec![
                SheetLine::Metadata("Transpose by: +2".to_string()),
                SheetLine::Blank,
                content_line("abc"),
            ]
        );

        let markup = colorize_tempo_text("Transpose by: +2\n\n\nabc");
        assert!(markup.starts_with("Transpose by: +2\n\n<span"));
    }

    fn content_line(text: &str) -> SheetLine {
        SheetLine::Content(chord_spans(text))
    }

    #[test]
    fn test_header_without_blank_keeps_next_line() {
        let layout = layout_sheet("Transpose by: -1\nabc");
        assert_eq!(layout.lines.len(), 2);
        assert!(matches!(layout.lines[1], SheetLine::Content(_)));
    }

    #[test]
    fn test_comment_and_metadata_are_escaped() {
        let markup = colorize_tempo_text("<!-- a & b -->\nTranspose by: <3>");
        assert_eq!(
            markup,
            "&lt;!-- a &amp; b --&gt;\nTranspose by: &lt;3&gt;\n"
        );
    }

    #[test]
    fn test_content_characters_are_escaped() {
        let markup = colorize_tempo_text("a<b");
        assert!(markup.contains(">&lt;</span>"));
        assert!(!markup.contains("><</span>"));
    }

    #[test]
    fn test_blank_lines_and_crlf() {
        let layout = layout_sheet("a\r\n\r\nb");
        assert_eq!(layout.lines.len(), 3);
        assert_eq!(layout.lines[1], SheetLine::Blank);
        assert_eq!(content(&layout, 2)[0].glyphs[0].ch, 'b');
    }

    #[test]
    fn test_every_character_colored_once() {
        let line = "[ty]-u - i, o... p.... q...... r";
        let layout = layout_sheet(line);
        let count: usize = content(&layout, 0).iter().map(|s| s.glyphs.len()).sum();
        assert_eq!(count, line.chars().count());
    }
}
