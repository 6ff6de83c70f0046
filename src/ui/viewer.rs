//! Sheet viewer rendering.
//!
//! Draws a [`SheetLayout`] with each glyph in its duration colour, plus a
//! legend of the colours and the current transpose mode.

use crate::app::App;
use crate::sheets::{DurationClass, SheetLayout, SheetLine, TempoColor};
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

/// Classes shown in the legend, shortest first.
const LEGEND: [DurationClass; 8] = [
    DurationClass::SixtyFourth,
    DurationClass::ThirtySecond,
    DurationClass::Sixteenth,
    DurationClass::Eighth,
    DurationClass::Quarter,
    DurationClass::Half,
    DurationClass::Whole,
    DurationClass::Quadruple,
];

fn rgb(color: TempoColor) -> Color {
    Color::Rgb(color.r, color.g, color.b)
}

/// Converts a sheet layout to styled terminal lines.
///
/// Out-of-range glyphs are drawn bold and underlined, mirroring the heavy
/// underlined style of the HTML export.
pub fn sheet_lines(layout: &SheetLayout) -> Vec<Line<'static>> {
    layout
        .lines
        .iter()
        .map(|line| match line {
            SheetLine::Metadata(text) => Line::from(Span::styled(
                text.clone(),
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            )),
            SheetLine::Comment(text) => Line::from(Span::styled(
                text.clone(),
                Style::default()
                    .fg(Color::DarkGray)
                    .add_modifier(Modifier::ITALIC),
            )),
            SheetLine::Blank => Line::from(""),
            SheetLine::Content(spans) => {
                let spans: Vec<Span<'static>> = spans
                    .iter()
                    .flat_map(|chord| chord.glyphs.iter())
                    .map(|glyph| {
                        let mut style = Style::default().fg(rgb(glyph.class.color()));
                        if glyph.out_of_range {
                            style = style.add_modifier(Modifier::BOLD | Modifier::UNDERLINED);
                        }
                        Span::styled(glyph.ch.to_string(), style)
                    })
                    .collect();
                Line::from(spans)
            }
        })
        .collect()
}

fn legend_line() -> Line<'static> {
    let mut spans = vec![Span::styled("Legend: ", Style::default().fg(Color::DarkGray))];
    for class in LEGEND {
        spans.push(Span::styled(
            "\u{25a0}",
            Style::default().fg(rgb(class.color())),
        ));
        spans.push(Span::styled(
            format!("{} ", class.label()),
            Style::default().fg(Color::Gray),
        ));
    }
    Line::from(spans)
}

/// Renders the sheet viewer panel and records how many rows it shows.
///
/// # Arguments
///
/// * `frame` - The frame to render to
/// * `area` - The area to render in
/// * `app` - Application state
/// * `focused` - Whether this panel is focused
pub fn render_viewer(frame: &mut Frame, area: Rect, app: &mut App, focused: bool) {
    let viewer = &app.viewer;
    let title = if viewer.open && !viewer.title.is_empty() {
        format!(" Sheet - {} ", viewer.title)
    } else {
        " Sheet ".to_string()
    };
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(if focused { Color::Cyan } else { Color::Gray }));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    if !viewer.open {
        frame.render_widget(
            Paragraph::new(vec![
                Line::from(Span::styled(
                    "Open a history entry or upload a MIDI file to view its sheet.",
                    Style::default()
                        .fg(Color::DarkGray)
                        .add_modifier(Modifier::ITALIC),
                )),
                Line::from(""),
                legend_line(),
            ]),
            inner,
        );
        return;
    }

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Mode and transposes
            Constraint::Length(1), // Legend
            Constraint::Min(1),    // Sheet
        ])
        .split(inner);

    let mut info = vec![
        Span::styled("Transpose: ", Style::default().fg(Color::DarkGray)),
        Span::styled(
            viewer.mode.label(),
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
    ];
    if viewer.show_transposes && !viewer.transposes.is_empty() {
        let shifts: Vec<String> = viewer.transposes.iter().map(|t| format!("{:+}", t)).collect();
        info.push(Span::styled(
            format!("  Shifts: {}", shifts.join(", ")),
            Style::default().fg(Color::Yellow),
        ));
    }
    if let Some(sheet) = &viewer.sheet {
        if let Some(name) = &sheet.sheets_filename {
            info.push(Span::styled(
                format!("  {}", name),
                Style::default().fg(Color::DarkGray),
            ));
        }
    }
    frame.render_widget(Paragraph::new(Line::from(info)), chunks[0]);
    frame.render_widget(Paragraph::new(legend_line()), chunks[1]);

    let body = chunks[2];
    if viewer.loading {
        frame.render_widget(
            Paragraph::new(Span::styled(
                "Generating sheet...",
                Style::default().fg(Color::Yellow),
            )),
            body,
        );
    } else if let Some(error) = &viewer.error {
        frame.render_widget(
            Paragraph::new(Span::styled(
                format!("Error: {}", error),
                Style::default().fg(Color::Red),
            )),
            body,
        );
    } else {
        let lines = sheet_lines(&viewer.layout);
        frame.render_widget(Paragraph::new(lines).scroll((viewer.scroll, 0)), body);
    }

    app.viewer.visible_rows = body.height;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sheets::layout_sheet;

    #[test]
    fn test_sheet_lines_styles_glyphs() {
        let layout = layout_sheet("Transpose by: +1\n\nab cd\n<!-- 120 bpm -->");
        let lines = sheet_lines(&layout);
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].spans[0].content, "Transpose by: +1");
        // One span per character of the content line
        assert_eq!(lines[1].spans.len(), 5);
        assert!(matches!(lines[1].spans[0].style.fg, Some(Color::Rgb(_, _, _))));
        assert_eq!(lines[2].spans[0].style.fg, Some(Color::DarkGray));
    }

    #[test]
    fn test_out_of_range_glyphs_underlined() {
        let layout = layout_sheet("a:b c");
        let lines = sheet_lines(&layout);
        let underlined: Vec<bool> = lines[0]
            .spans
            .iter()
            .map(|s| s.style.add_modifier.contains(Modifier::UNDERLINED))
            .collect();
        assert_eq!(underlined, vec![false, true, true, false, false]);
    }
}
