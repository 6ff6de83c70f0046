//! History list rendering.

use crate::api::{HistoryEntry, MediaKind};
use crate::app::App;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, List, ListItem, Paragraph};
use ratatui::Frame;

fn badge_color(kind: MediaKind) -> Color {
    match kind {
        MediaKind::Youtube => Color::Red,
        MediaKind::Tiktok => Color::Magenta,
        MediaKind::Discord => Color::Blue,
        MediaKind::Mp3 => Color::Green,
    }
}

fn entry_line(entry: &HistoryEntry, selected: bool) -> Line<'static> {
    let kind = entry.result.kind;
    let title_style = if selected {
        Style::default()
            .fg(Color::White)
            .add_modifier(Modifier::REVERSED)
    } else {
        Style::default().fg(Color::White)
    };

    let mut spans = vec![
        Span::styled(
            format!("{:8}", kind.badge()),
            Style::default().fg(badge_color(kind)),
        ),
        Span::styled(entry.result.title().to_string(), title_style),
    ];
    if let Some(time) = &entry.time_str {
        spans.push(Span::styled(
            format!("  {}", time),
            Style::default().fg(Color::DarkGray),
        ));
    }
    if let Some(secs) = entry.result.conversion_time {
        spans.push(Span::styled(
            format!("  {:.1}s", secs),
            Style::default().fg(Color::DarkGray),
        ));
    }
    Line::from(spans)
}

/// Renders the conversion history panel.
///
/// # Arguments
///
/// * `frame` - The frame to render to
/// * `area` - The area to render in
/// * `app` - Application state
/// * `focused` - Whether this panel is focused
pub fn render_history(frame: &mut Frame, area: Rect, app: &App, focused: bool) {
    let block = Block::default()
        .title(format!(" History ({}) ", app.history.len()))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(if focused { Color::Cyan } else { Color::Gray }));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    if app.history.is_empty() {
        frame.render_widget(
            Paragraph::new(Span::styled(
                "No conversions yet",
                Style::default()
                    .fg(Color::DarkGray)
                    .add_modifier(Modifier::ITALIC),
            )),
            inner,
        );
        return;
    }

    let start = app.history.scroll();
    let end = (start + inner.height as usize).min(app.history.len());
    let items: Vec<ListItem> = app.history.entries()[start..end]
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            let selected = focused && start + i == app.history.selected_index();
            ListItem::new(entry_line(entry, selected))
        })
        .collect();

    frame.render_widget(List::new(items), inner);
}
