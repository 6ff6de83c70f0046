//! Help overlay rendering.
//!
//! Displays keyboard shortcuts and commands in a modal overlay.

use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};
use ratatui::Frame;

use super::centered_rect;

/// Key binding entry for the help display.
struct KeyBinding {
    key: &'static str,
    description: &'static str,
}

const GENERAL_BINDINGS: &[KeyBinding] = &[
    KeyBinding {
        key: "F1 / ?",
        description: "Toggle this help (? outside the URL input)",
    },
    KeyBinding {
        key: "Ctrl+C / Ctrl+Q",
        description: "Quit",
    },
    KeyBinding {
        key: "Tab",
        description: "Cycle focus between panels",
    },
    KeyBinding {
        key: "F2",
        description: "Sheet settings",
    },
    KeyBinding {
        key: "F5",
        description: "Reload history",
    },
];

const CONVERT_BINDINGS: &[KeyBinding] = &[
    KeyBinding {
        key: "(type)",
        description: "Edit the media URL",
    },
    KeyBinding {
        key: "Enter",
        description: "Convert link / Stop conversion",
    },
    KeyBinding {
        key: "Esc",
        description: "Stop conversion",
    },
    KeyBinding {
        key: "Ctrl+U",
        description: "Clear the URL",
    },
    KeyBinding {
        key: "Ctrl+D",
        description: "Toggle CUDA / CPU",
    },
    KeyBinding {
        key: "Ctrl+V",
        description: "View sheet of last result",
    },
];

const HISTORY_BINDINGS: &[KeyBinding] = &[
    KeyBinding {
        key: "k / Up",
        description: "Previous entry",
    },
    KeyBinding {
        key: "j / Down",
        description: "Next entry",
    },
    KeyBinding {
        key: "Enter",
        description: "Open sheet",
    },
    KeyBinding {
        key: "d / Delete",
        description: "Delete entry",
    },
    KeyBinding {
        key: "o",
        description: "Upload a MIDI file",
    },
];

const VIEWER_BINDINGS: &[KeyBinding] = &[
    KeyBinding {
        key: "k / j",
        description: "Scroll line",
    },
    KeyBinding {
        key: "PgUp / PgDn",
        description: "Scroll page",
    },
    KeyBinding {
        key: "m",
        description: "Toggle auto / multi transpose",
    },
    KeyBinding {
        key: "t",
        description: "Show transpose shifts",
    },
    KeyBinding {
        key: "s",
        description: "Save sheet text",
    },
    KeyBinding {
        key: "e",
        description: "Export coloured HTML",
    },
    KeyBinding {
        key: "Esc",
        description: "Close viewer",
    },
];

/// Renders the help overlay.
///
/// # Arguments
///
/// * `frame` - The frame to render to
/// * `scroll` - Vertical scroll offset
pub fn render_help(frame: &mut Frame, scroll: u16) {
    let area = centered_rect(70, 80, frame.area());

    frame.render_widget(Clear, area);

    let block = Block::default()
        .title(" Help - Keyboard Shortcuts ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(1),    // Scrollable content
            Constraint::Length(1), // Fixed footer
        ])
        .split(inner);

    let mut lines: Vec<Line<'static>> = Vec::new();

    let section_style = Style::default()
        .fg(Color::Yellow)
        .add_modifier(Modifier::BOLD | Modifier::UNDERLINED);
    let key_style = Style::default()
        .fg(Color::Cyan)
        .add_modifier(Modifier::BOLD);
    let desc_style = Style::default().fg(Color::White);

    fn add_section(
        lines: &mut Vec<Line<'static>>,
        title: &'static str,
        bindings: &[KeyBinding],
        section_style: Style,
        key_style: Style,
        desc_style: Style,
    ) {
        lines.push(Line::from(Span::styled(title, section_style)));
        for binding in bindings {
            lines.push(Line::from(vec![
                Span::styled(format!("{:17}", binding.key), key_style),
                Span::styled(binding.description, desc_style),
            ]));
        }
        lines.push(Line::from(""));
    }

    add_section(
        &mut lines,
        "General",
        GENERAL_BINDINGS,
        section_style,
        key_style,
        desc_style,
    );
    add_section(
        &mut lines,
        "Convert",
        CONVERT_BINDINGS,
        section_style,
        key_style,
        desc_style,
    );
    add_section(
        &mut lines,
        "History",
        HISTORY_BINDINGS,
        section_style,
        key_style,
        desc_style,
    );
    add_section(
        &mut lines,
        "Sheet Viewer",
        VIEWER_BINDINGS,
        section_style,
        key_style,
        desc_style,
    );

    let help_text = Paragraph::new(lines).scroll((scroll, 0));
    frame.render_widget(help_text, chunks[0]);

    let footer = Paragraph::new(Line::from(Span::styled(
        "Scroll: Up/Down/j/k  |  Close: F1/?/Esc",
        Style::default()
            .fg(Color::DarkGray)
            .add_modifier(Modifier::ITALIC),
    )));
    frame.render_widget(footer, chunks[1]);
}
