//! Dialog overlays.
//!
//! Provides the MIDI upload browser, the sheet settings editor and the modal
//! alert used for conversion errors.

use crate::app::App;
use crate::settings::SETTING_FIELDS;
use ratatui::layout::{Alignment, Constraint, Direction, Layout};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap};
use ratatui::Frame;
use std::path::Path;

use super::centered_rect;

/// Truncates a path string to fit within max_width, adding "..." prefix if needed.
#[inline]
fn truncate_path(path_str: &str, max_width: usize) -> String {
    let count = path_str.chars().count();
    if count > max_width {
        let keep = max_width.saturating_sub(3);
        let tail: String = path_str.chars().skip(count - keep).collect();
        format!("...{}", tail)
    } else {
        path_str.to_string()
    }
}

/// Extracts the display name from a path, returning "?" if extraction fails.
#[inline]
fn path_display_name(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("?")
        .to_string()
}

/// Renders the MIDI upload browser overlay.
///
/// # Arguments
///
/// * `frame` - The frame to render to
/// * `app` - Application state
pub fn render_file_browser(frame: &mut Frame, app: &App) {
    if !app.file_browser.open {
        return;
    }

    let area = centered_rect(60, 70, frame.area());
    frame.render_widget(Clear, area);

    let block = Block::default()
        .title(" Upload MIDI ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Current path
            Constraint::Length(1), // Separator
            Constraint::Min(5),    // File list
            Constraint::Length(1), // Instructions
        ])
        .split(inner);

    let path_str = app.file_browser.current_dir.display().to_string();
    let max_width = chunks[0].width.saturating_sub(2) as usize;
    let display_path = truncate_path(&path_str, max_width);

    frame.render_widget(
        Paragraph::new(Span::styled(display_path, Style::default().fg(Color::Cyan))),
        chunks[0],
    );

    let visible_height = chunks[2].height as usize;
    let start_idx = app.file_browser.scroll.min(app.file_browser.entries.len());
    let end_idx = (start_idx + visible_height).min(app.file_browser.entries.len());

    if app.file_browser.entries.is_empty() {
        frame.render_widget(
            Paragraph::new(Span::styled(
                "No MIDI files here",
                Style::default()
                    .fg(Color::DarkGray)
                    .add_modifier(Modifier::ITALIC),
            )),
            chunks[2],
        );
    }

    let items: Vec<ListItem> = app.file_browser.entries[start_idx..end_idx]
        .iter()
        .enumerate()
        .map(|(i, path)| {
            let idx = start_idx + i;
            let is_selected = idx == app.file_browser.selected;

            let (icon, name, style) = if path == Path::new("..") {
                (
                    "[..]",
                    "Parent Directory".to_string(),
                    Style::default().fg(Color::Blue),
                )
            } else if path.is_dir() {
                (
                    "[D]",
                    path_display_name(path),
                    Style::default().fg(Color::Blue),
                )
            } else {
                (
                    "[M]",
                    path_display_name(path),
                    Style::default().fg(Color::Magenta),
                )
            };

            let display_style = if is_selected {
                style.add_modifier(Modifier::REVERSED)
            } else {
                style
            };

            ListItem::new(Line::from(vec![
                Span::styled(format!("{} ", icon), Style::default().fg(Color::DarkGray)),
                Span::styled(name, display_style),
            ]))
        })
        .collect();

    frame.render_widget(List::new(items), chunks[2]);

    frame.render_widget(
        Paragraph::new(Line::from(vec![
            Span::styled("[Up/Down]", Style::default().fg(Color::Yellow)),
            Span::styled(" Navigate  ", Style::default().fg(Color::DarkGray)),
            Span::styled("[Enter]", Style::default().fg(Color::Yellow)),
            Span::styled(" Open/Upload  ", Style::default().fg(Color::DarkGray)),
            Span::styled("[Esc]", Style::default().fg(Color::Yellow)),
            Span::styled(" Cancel", Style::default().fg(Color::DarkGray)),
        ])),
        chunks[3],
    );
}

/// Renders the sheet settings dialog overlay.
///
/// # Arguments
///
/// * `frame` - The frame to render to
/// * `app` - Application state
pub fn render_settings_dialog(frame: &mut Frame, app: &App) {
    if !app.settings_dialog.open {
        return;
    }

    let area = centered_rect(50, 70, frame.area());
    frame.render_widget(Clear, area);

    let block = Block::default()
        .title(" Sheet Settings ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(3),    // Fields
            Constraint::Length(1), // Instructions
        ])
        .split(inner);

    let draft = &app.settings_dialog.draft;
    let label_width = SETTING_FIELDS
        .iter()
        .map(|f| f.label().len())
        .max()
        .unwrap_or(0)
        + 2;

    let items: Vec<ListItem> = SETTING_FIELDS
        .iter()
        .enumerate()
        .map(|(i, field)| {
            let selected = i == app.settings_dialog.selected;
            let changed = field.value(draft) != field.value(&app.settings);
            let value_style = if selected {
                Style::default()
                    .fg(Color::Black)
                    .bg(Color::Cyan)
                    .add_modifier(Modifier::BOLD)
            } else if changed {
                Style::default().fg(Color::Yellow)
            } else {
                Style::default().fg(Color::White)
            };
            ListItem::new(Line::from(vec![
                Span::styled(
                    format!("{:width$}", field.label(), width = label_width),
                    Style::default().fg(Color::Gray),
                ),
                Span::styled(format!(" {} ", field.value(draft)), value_style),
            ]))
        })
        .collect();

    // Keep the selected row visible on short terminals
    let rows = chunks[0].height as usize;
    let skip = (app.settings_dialog.selected + 1).saturating_sub(rows);
    let items: Vec<ListItem> = items.into_iter().skip(skip).collect();
    frame.render_widget(List::new(items), chunks[0]);

    frame.render_widget(
        Paragraph::new(Line::from(vec![
            Span::styled("[Up/Down]", Style::default().fg(Color::Yellow)),
            Span::styled(" Select  ", Style::default().fg(Color::DarkGray)),
            Span::styled("[Left/Right]", Style::default().fg(Color::Yellow)),
            Span::styled(" Change  ", Style::default().fg(Color::DarkGray)),
            Span::styled("[r]", Style::default().fg(Color::Yellow)),
            Span::styled(" Defaults  ", Style::default().fg(Color::DarkGray)),
            Span::styled("[Enter]", Style::default().fg(Color::Yellow)),
            Span::styled(" Save  ", Style::default().fg(Color::DarkGray)),
            Span::styled("[Esc]", Style::default().fg(Color::Yellow)),
            Span::styled(" Cancel", Style::default().fg(Color::DarkGray)),
        ])),
        chunks[1],
    );
}

/// Renders the modal alert, if one is pending.
///
/// # Arguments
///
/// * `frame` - The frame to render to
/// * `app` - Application state
pub fn render_alert(frame: &mut Frame, app: &App) {
    let Some(alert) = &app.alert else {
        return;
    };

    let area = centered_rect(50, 25, frame.area());
    frame.render_widget(Clear, area);

    let block = Block::default()
        .title(format!(" {} ", alert.title))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Red));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(1),    // Message
            Constraint::Length(1), // Instructions
        ])
        .split(inner);

    frame.render_widget(
        Paragraph::new(alert.message.clone())
            .style(Style::default().fg(Color::White))
            .wrap(Wrap { trim: true }),
        chunks[0],
    );

    frame.render_widget(
        Paragraph::new(Line::from(vec![
            Span::styled("[Enter/Esc]", Style::default().fg(Color::Yellow)),
            Span::styled(" OK", Style::default().fg(Color::DarkGray)),
        ]))
        .alignment(Alignment::Center),
        chunks[1],
    );
}
