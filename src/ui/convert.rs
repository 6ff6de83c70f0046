//! Conversion panel rendering.
//!
//! Shows the media URL input, the convert buttons, the progress bar and the
//! result of the last finished conversion.

use crate::api::MediaKind;
use crate::app::App;
use crate::conversion::{ButtonMode, ButtonState};
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Gauge, Paragraph};
use ratatui::Frame;

fn button_span(button: &ButtonState) -> Span<'static> {
    let style = if button.disabled {
        Style::default().fg(Color::DarkGray)
    } else {
        match button.mode {
            ButtonMode::Idle => Style::default()
                .fg(Color::Black)
                .bg(Color::Green)
                .add_modifier(Modifier::BOLD),
            ButtonMode::Converting => Style::default()
                .fg(Color::White)
                .bg(Color::Red)
                .add_modifier(Modifier::BOLD),
            ButtonMode::Stopping => Style::default().fg(Color::Black).bg(Color::Yellow),
        }
    };
    Span::styled(format!(" {} ", button.label()), style)
}

/// Renders the conversion panel.
///
/// # Arguments
///
/// * `frame` - The frame to render to
/// * `area` - The area to render in
/// * `app` - Application state
/// * `focused` - Whether this panel is focused
pub fn render_convert_panel(frame: &mut Frame, area: Rect, app: &App, focused: bool) {
    let block = Block::default()
        .title(" Convert ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(if focused { Color::Cyan } else { Color::Gray }));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // URL input
            Constraint::Length(1), // Detected source
            Constraint::Length(1), // Buttons
            Constraint::Length(1), // Spacer
            Constraint::Length(1), // Progress
            Constraint::Min(1),    // Last result
        ])
        .split(inner);

    // URL input, showing the tail when it does not fit
    let prefix = "URL: ";
    let max_width = (chunks[0].width as usize).saturating_sub(prefix.len() + 1);
    let chars: Vec<char> = app.url_input.chars().collect();
    let visible: String = chars[chars.len().saturating_sub(max_width)..].iter().collect();
    let mut input_spans = vec![
        Span::styled(prefix, Style::default().fg(Color::DarkGray)),
        Span::styled(visible, Style::default().fg(Color::White)),
    ];
    if focused {
        input_spans.push(Span::styled(
            "_",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::SLOW_BLINK),
        ));
    }
    frame.render_widget(Paragraph::new(Line::from(input_spans)), chunks[0]);

    let source = if app.url_input.trim().is_empty() {
        Span::styled("Paste a YouTube, TikTok or Discord link", Style::default().fg(Color::DarkGray))
    } else {
        match MediaKind::detect(&app.url_input) {
            Some(kind) => Span::styled(
                format!("Source: {}", kind.badge()),
                Style::default().fg(Color::Green),
            ),
            None => Span::styled("Unrecognised link", Style::default().fg(Color::Red)),
        }
    };
    frame.render_widget(Paragraph::new(Line::from(source)), chunks[1]);

    let mut button_spans = Vec::new();
    for button in app.controller.buttons().iter() {
        if !button_spans.is_empty() {
            button_spans.push(Span::raw("  "));
        }
        button_spans.push(button_span(button));
    }
    frame.render_widget(Paragraph::new(Line::from(button_spans)), chunks[2]);

    let progress = app.controller.progress();
    if progress.visible {
        let gauge = Gauge::default()
            .gauge_style(Style::default().fg(Color::Cyan).bg(Color::Black))
            .percent(progress.percent.min(100) as u16)
            .label(progress.message.clone());
        frame.render_widget(gauge, chunks[4]);
    }

    if let Some(result) = &app.last_result {
        let mut lines = vec![Line::from(vec![
            Span::styled(
                format!("[{}] ", result.kind.badge()),
                Style::default().fg(Color::Magenta),
            ),
            Span::styled(
                result.title().to_string(),
                Style::default()
                    .fg(Color::White)
                    .add_modifier(Modifier::BOLD),
            ),
        ])];
        if let Some(midi) = &result.midi_name {
            lines.push(Line::from(vec![
                Span::styled("MIDI: ", Style::default().fg(Color::DarkGray)),
                Span::styled(midi.clone(), Style::default().fg(Color::Magenta)),
                Span::styled("  [v]", Style::default().fg(Color::Yellow)),
                Span::styled(" View sheet", Style::default().fg(Color::DarkGray)),
            ]));
        }
        if let Some(url) = &result.download_url {
            lines.push(Line::from(vec![
                Span::styled("Download: ", Style::default().fg(Color::DarkGray)),
                Span::styled(url.clone(), Style::default().fg(Color::Blue)),
            ]));
        }
        frame.render_widget(Paragraph::new(lines), chunks[5]);
    }
}
