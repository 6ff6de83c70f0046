//! Terminal user interface components.
//!
//! This module provides the visual components for the converter, including
//! the header bar, conversion panel, history list and sheet viewer.

mod convert;
mod dialogs;
mod help;
mod history;
mod viewer;

use crate::app::{App, Focus};
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

pub use convert::render_convert_panel;
pub use dialogs::{render_alert, render_file_browser, render_settings_dialog};
pub use help::render_help;
pub use history::render_history;
pub use viewer::{render_viewer, sheet_lines};

/// Height of the conversion panel.
const CONVERT_PANEL_HEIGHT: u16 = 10;

/// Renders the complete UI and any open overlay.
///
/// The layout is divided into:
/// - Top: header with backend address, device and status message
/// - Left: conversion panel above the history list
/// - Right: sheet viewer
/// - Bottom: key hints
pub fn render(frame: &mut Frame, app: &mut App) {
    let size = frame.area();

    let main_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(10),   // Content
            Constraint::Length(1), // Key hints
        ])
        .split(size);

    let content_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(main_chunks[1]);

    let left_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(CONVERT_PANEL_HEIGHT),
            Constraint::Min(4),
        ])
        .split(content_chunks[0]);

    render_header(frame, main_chunks[0], app);
    render_convert_panel(frame, left_chunks[0], app, app.focus == Focus::Input);

    // Borders take two rows
    app.history_rows = left_chunks[1].height.saturating_sub(2) as usize;
    render_history(frame, left_chunks[1], app, app.focus == Focus::History);

    let focused = app.focus == Focus::Viewer;
    render_viewer(frame, content_chunks[1], app, focused);
    render_key_hints(frame, main_chunks[2], app);

    render_file_browser(frame, app);
    render_settings_dialog(frame, app);
    if app.show_help {
        render_help(frame, app.help_scroll);
    }
    render_alert(frame, app);
}

/// Renders the header bar at the top of the screen.
fn render_header(frame: &mut Frame, area: Rect, app: &App) {
    let block = Block::default()
        .title(" sheettui ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Gray));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Min(30),    // Server
            Constraint::Length(14), // Device
            Constraint::Min(20),    // Status
        ])
        .split(inner);

    let (indicator, indicator_color) = match app.backend_online {
        Some(true) => ("[online]", Color::Green),
        Some(false) => ("[offline]", Color::Red),
        None => ("[...]", Color::DarkGray),
    };
    frame.render_widget(
        Paragraph::new(Line::from(vec![
            Span::styled("Server: ", Style::default().fg(Color::DarkGray)),
            Span::styled(app.server.clone(), Style::default().fg(Color::White)),
            Span::raw(" "),
            Span::styled(indicator, Style::default().fg(indicator_color)),
        ])),
        chunks[0],
    );

    frame.render_widget(
        Paragraph::new(Line::from(vec![
            Span::styled("Device: ", Style::default().fg(Color::DarkGray)),
            Span::styled(
                app.device.as_str().to_uppercase(),
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            ),
        ])),
        chunks[1],
    );

    if let Some((message, _)) = &app.status_message {
        frame.render_widget(
            Paragraph::new(Span::styled(
                message.clone(),
                Style::default().fg(Color::Yellow),
            ))
            .alignment(ratatui::layout::Alignment::Right),
            chunks[2],
        );
    }
}

/// Renders context-sensitive key hints on the bottom row.
fn render_key_hints(frame: &mut Frame, area: Rect, app: &App) {
    let key = Style::default().fg(Color::Yellow);
    let desc = Style::default().fg(Color::DarkGray);

    let mut spans = vec![
        Span::styled("[Tab]", key),
        Span::styled(" Focus  ", desc),
    ];
    match app.focus {
        Focus::Input => {
            spans.push(Span::styled("[Enter]", key));
            let action = if app.controller.is_running() {
                " Stop  "
            } else {
                " Convert  "
            };
            spans.push(Span::styled(action, desc));
            spans.push(Span::styled("[Ctrl+D]", key));
            spans.push(Span::styled(" Device  ", desc));
        }
        Focus::History => {
            spans.push(Span::styled("[Enter]", key));
            spans.push(Span::styled(" Open sheet  ", desc));
            spans.push(Span::styled("[d]", key));
            spans.push(Span::styled(" Delete  ", desc));
            spans.push(Span::styled("[o]", key));
            spans.push(Span::styled(" Upload MIDI  ", desc));
        }
        Focus::Viewer => {
            spans.push(Span::styled("[m]", key));
            spans.push(Span::styled(" Transpose mode  ", desc));
            spans.push(Span::styled("[s]", key));
            spans.push(Span::styled(" Save  ", desc));
            spans.push(Span::styled("[e]", key));
            spans.push(Span::styled(" Export HTML  ", desc));
        }
    }
    spans.push(Span::styled("[F2]", key));
    spans.push(Span::styled(" Settings  ", desc));
    spans.push(Span::styled("[F1]", key));
    spans.push(Span::styled(" Help", desc));

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

/// Helper function to center a rectangle within another rectangle.
pub fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_centered_rect_is_inside() {
        let area = Rect::new(0, 0, 100, 50);
        let popup = centered_rect(60, 40, area);
        assert_eq!(popup.width, 60);
        assert_eq!(popup.height, 20);
        assert_eq!(popup.x, 20);
        assert_eq!(popup.y, 15);
    }
}
