//! sheettui - A terminal client for converting media into QWERTY piano sheets.
//!
//! This application talks to a conversion backend that turns YouTube, TikTok
//! and Discord links into MIDI files, and MIDI files into keyboard sheet
//! text. Sheets are shown with every chord coloured by its duration.
//!
//! # Features
//!
//! - Start and stop backend conversions with live progress
//! - Browse, open and delete conversion history
//! - Upload local MIDI files for sheet generation
//! - Duration-coloured sheet viewer with auto and multi transpose
//! - Sheet text and HTML export
//!
//! # Usage
//!
//! ```bash
//! cargo run                                   # Interactive terminal UI
//! cargo run -- --server http://host:5000      # Use another backend
//! cargo run -- convert https://youtu.be/...   # Convert without the UI
//! cargo run -- colorize song_sheets.txt       # Print coloured markup
//! ```
//!
//! Press `F1` for help with keyboard shortcuts.

use sheettui::api::{Api, Device, HttpApi, DEFAULT_SERVER};
use sheettui::app::{App, Focus};
use sheettui::conversion::{ConversionSession, ConversionSource, SystemClock};
use sheettui::settings::TransposeMode;
use sheettui::sheets::colorize_tempo_text;
use sheettui::ui;

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use std::io::{self, Read, Stdout};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::info;

/// Environment variable that overrides the default backend address.
const SERVER_ENV: &str = "SHEETTUI_SERVER";

/// What to do after parsing the command line.
enum Command {
    /// Run the interactive terminal UI.
    Tui,
    /// Print coloured markup for a sheet text file (`-` for stdin).
    Colorize(PathBuf),
    /// Convert a media link and print the result as JSON.
    Convert(String),
    /// Fetch the sheet text for a MIDI file already on the backend.
    Sheet { midi: String, multi: bool },
}

/// Command-line options for the application.
struct CliOptions {
    /// Backend base URL.
    server: String,
    /// Device for new conversions.
    device: Device,
    /// Write logs to this file instead of stderr.
    log_file: Option<PathBuf>,
    command: Command,
}

fn print_help(program: &str) {
    eprintln!("sheettui - Media to QWERTY piano sheet converter");
    eprintln!();
    eprintln!("Usage: {} [OPTIONS] [COMMAND]", program);
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  convert URL            Convert a media link and print the result");
    eprintln!("  sheet MIDI [--multi]   Print sheet text for a MIDI file on the backend");
    eprintln!("  colorize FILE          Print duration-coloured markup for sheet text");
    eprintln!("                         (use - to read from stdin)");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -s, --server URL       Backend address (default: {})", DEFAULT_SERVER);
    eprintln!("  -d, --device DEVICE    cuda or cpu (default: cuda)");
    eprintln!("  --log FILE             Write logs to FILE (filter with RUST_LOG)");
    eprintln!("  -h, --help             Print this help message");
    eprintln!();
    eprintln!("The backend address can also be set with {}.", SERVER_ENV);
}

impl CliOptions {
    /// Parses command-line arguments.
    ///
    /// Supports:
    /// - `--server <url>` or `-s <url>`: Backend address
    /// - `--device <cuda|cpu>` or `-d <cuda|cpu>`: Conversion device
    /// - `--log <path>`: Log file
    /// - `--help` or `-h`: Print help and exit
    /// - `convert <url>`, `sheet <midi> [--multi]`, `colorize <file>`
    fn parse() -> Result<Self> {
        let args: Vec<String> = std::env::args().collect();
        let program = args.first().map(String::as_str).unwrap_or("sheettui");

        let mut server = std::env::var(SERVER_ENV).unwrap_or_else(|_| DEFAULT_SERVER.to_string());
        let mut device = Device::default();
        let mut log_file: Option<PathBuf> = None;
        let mut command = Command::Tui;
        let mut i = 1;

        let value = |i: usize, flag: &str| -> String {
            match args.get(i) {
                Some(v) => v.clone(),
                None => {
                    eprintln!("Error: {} requires an argument", flag);
                    std::process::exit(1);
                }
            }
        };

        while i < args.len() {
            match args[i].as_str() {
                "--server" | "-s" => {
                    i += 1;
                    server = value(i, "--server");
                }
                "--device" | "-d" => {
                    i += 1;
                    let raw = value(i, "--device");
                    device = match Device::parse(&raw) {
                        Some(d) => d,
                        None => {
                            eprintln!("Error: unknown device '{}' (expected cuda or cpu)", raw);
                            std::process::exit(1);
                        }
                    };
                }
                "--log" => {
                    i += 1;
                    log_file = Some(PathBuf::from(value(i, "--log")));
                }
                "--help" | "-h" => {
                    print_help(program);
                    std::process::exit(0);
                }
                "convert" => {
                    i += 1;
                    command = Command::Convert(value(i, "convert"));
                }
                "colorize" => {
                    i += 1;
                    command = Command::Colorize(PathBuf::from(value(i, "colorize")));
                }
                "sheet" => {
                    i += 1;
                    command = Command::Sheet {
                        midi: value(i, "sheet"),
                        multi: false,
                    };
                }
                "--multi" => match &mut command {
                    Command::Sheet { multi, .. } => *multi = true,
                    _ => {
                        eprintln!("Error: --multi only applies to the sheet command");
                        std::process::exit(1);
                    }
                },
                other => {
                    eprintln!("Unknown option: {}", other);
                    eprintln!("Use --help for usage information");
                    std::process::exit(1);
                }
            }
            i += 1;
        }

        Ok(Self {
            server,
            device,
            log_file,
            command,
        })
    }
}

/// Initializes tracing, to `log_file` when given and stderr otherwise.
fn init_logging(log_file: Option<&Path>) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::from_default_env();
    match log_file {
        Some(path) => {
            let file = std::fs::File::create(path)
                .with_context(|| format!("Failed to create log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(std::sync::Mutex::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
    Ok(())
}

/// Main entry point.
fn main() -> Result<()> {
    // Parse CLI options first (before any terminal setup)
    let cli = CliOptions::parse()?;
    init_logging(cli.log_file.as_deref())?;

    let api = HttpApi::new(cli.server.as_str());

    match cli.command {
        Command::Colorize(path) => run_colorize(&path),
        Command::Convert(url) => run_convert(&api, &url, cli.device),
        Command::Sheet { midi, multi } => run_sheet(&api, &midi, multi),
        Command::Tui => {
            info!(server = %cli.server, "starting terminal UI");
            let mut app = App::new(Arc::new(api), cli.server, cli.device)
                .context("Failed to initialize application")?;

            let mut terminal = setup_terminal().context("Failed to setup terminal")?;
            let result = run_app(&mut terminal, &mut app);
            restore_terminal(&mut terminal).context("Failed to restore terminal")?;
            result
        }
    }
}

/// Prints coloured markup for a sheet text file.
fn run_colorize(path: &Path) -> Result<()> {
    let text = if path == Path::new("-") {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read stdin")?;
        buf
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?
    };
    print!("{}", colorize_tempo_text(&text));
    Ok(())
}

/// Converts a media link without the UI, reporting progress on stderr.
fn run_convert(api: &dyn Api, url: &str, device: Device) -> Result<()> {
    let source = ConversionSource::new(url, device)?;
    let mut session = ConversionSession::new(api, SystemClock);

    let outcome = session.run(source, |progress| {
        eprintln!("[{:>3}%] {}", progress.percent, progress.message);
    })?;

    match outcome {
        Some(result) => {
            let json =
                serde_json::to_string_pretty(&result).context("Failed to encode result")?;
            println!("{}", json);
        }
        None => eprintln!("Conversion was cancelled"),
    }
    Ok(())
}

/// Prints the sheet text for a MIDI file the backend already has.
fn run_sheet(api: &dyn Api, midi: &str, multi: bool) -> Result<()> {
    let settings = api
        .load_settings()
        .context("Failed to load settings")?
        .unwrap_or_default();
    let mode = if multi {
        TransposeMode::Multi
    } else {
        TransposeMode::Auto
    };
    let sheet = api
        .convert_to_sheets(midi, &settings.for_mode(mode))
        .with_context(|| format!("Failed to convert {} to sheets", midi))?;
    println!("{}", sheet.text);
    Ok(())
}

/// Sets up the terminal for TUI rendering.
fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode().context("Failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)
        .context("Failed to enter alternate screen")?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend).context("Failed to create terminal")?;
    Ok(terminal)
}

/// Restores the terminal to its original state.
fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode().context("Failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("Failed to leave alternate screen")?;
    terminal.show_cursor().context("Failed to show cursor")?;
    Ok(())
}

/// Runs the main event loop.
fn run_app(terminal: &mut Terminal<CrosstermBackend<Stdout>>, app: &mut App) -> Result<()> {
    loop {
        app.update(Instant::now());
        app.clear_expired_status();

        terminal.draw(|frame| ui::render(frame, app))?;

        // Short timeout so backend replies and polls are picked up promptly
        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                // Only handle key press events (not release)
                if key.kind == KeyEventKind::Press && handle_key(app, key.code, key.modifiers)? {
                    return Ok(());
                }
            }
        }
    }
}

/// Handles a key press. Returns true when the application should quit.
fn handle_key(app: &mut App, code: KeyCode, modifiers: KeyModifiers) -> Result<bool> {
    let ctrl = modifiers.contains(KeyModifiers::CONTROL);

    // Quit works everywhere
    if ctrl && matches!(code, KeyCode::Char('c') | KeyCode::Char('q')) {
        return Ok(true);
    }

    // Overlays take all input while open
    if app.alert.is_some() {
        if matches!(code, KeyCode::Enter | KeyCode::Esc | KeyCode::Char(' ')) {
            app.dismiss_alert();
        }
        return Ok(false);
    }

    if app.show_help {
        match code {
            KeyCode::Char('?') | KeyCode::Esc | KeyCode::F(1) => {
                app.show_help = false;
                app.help_scroll = 0;
            }
            KeyCode::Up | KeyCode::Char('k') => {
                app.help_scroll = app.help_scroll.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                app.help_scroll = app.help_scroll.saturating_add(1);
            }
            KeyCode::PageUp => app.help_scroll = app.help_scroll.saturating_sub(10),
            KeyCode::PageDown => app.help_scroll = app.help_scroll.saturating_add(10),
            KeyCode::Home => app.help_scroll = 0,
            _ => {}
        }
        return Ok(false);
    }

    if app.file_browser.open {
        match code {
            KeyCode::Up | KeyCode::Char('k') => app.file_browser_up(),
            KeyCode::Down | KeyCode::Char('j') => app.file_browser_down(),
            KeyCode::Enter => app.file_browser_select(),
            KeyCode::Esc => app.file_browser_cancel(),
            _ => {}
        }
        return Ok(false);
    }

    if app.settings_dialog.open {
        match code {
            KeyCode::Up | KeyCode::Char('k') => app.settings_up(),
            KeyCode::Down | KeyCode::Char('j') => app.settings_down(),
            KeyCode::Left | KeyCode::Char('h') => app.settings_adjust(-1),
            KeyCode::Right | KeyCode::Char('l') | KeyCode::Char(' ') => app.settings_adjust(1),
            KeyCode::Char('r') => app.settings_reset_draft(),
            KeyCode::Enter => app.settings_confirm(),
            KeyCode::Esc => app.settings_cancel(),
            _ => {}
        }
        return Ok(false);
    }

    // Global bindings
    match code {
        KeyCode::F(1) => {
            app.show_help = true;
            return Ok(false);
        }
        KeyCode::Char('?') if app.focus != Focus::Input => {
            app.show_help = true;
            return Ok(false);
        }
        KeyCode::Tab => {
            app.focus = app.focus.next(app.viewer.open);
            return Ok(false);
        }
        KeyCode::F(2) => {
            app.open_settings();
            return Ok(false);
        }
        KeyCode::F(5) => {
            app.refresh_history();
            app.set_status("Reloading history");
            return Ok(false);
        }
        KeyCode::Char('o') if ctrl => {
            app.open_file_browser();
            return Ok(false);
        }
        _ => {}
    }

    match app.focus {
        Focus::Input => handle_input_keys(app, code, ctrl),
        Focus::History => handle_history_keys(app, code),
        Focus::Viewer => handle_viewer_keys(app, code),
    }
    Ok(false)
}

/// Handles keys while the URL input is focused.
fn handle_input_keys(app: &mut App, code: KeyCode, ctrl: bool) {
    match code {
        KeyCode::Enter => app.toggle_conversion(Instant::now()),
        KeyCode::Esc => app.stop_conversion(Instant::now()),
        KeyCode::Backspace => app.input_backspace(),
        KeyCode::Char('u') if ctrl => app.input_clear(),
        KeyCode::Char('d') if ctrl => app.toggle_device(),
        KeyCode::Char('v') if ctrl => app.open_last_result(),
        KeyCode::Char(c) if !ctrl => app.input_char(c),
        _ => {}
    }
}

/// Handles keys while the history list is focused.
fn handle_history_keys(app: &mut App, code: KeyCode) {
    match code {
        KeyCode::Up | KeyCode::Char('k') => app.history.select_prev(),
        KeyCode::Down | KeyCode::Char('j') => app.history.select_next(app.history_rows),
        KeyCode::Enter => app.open_selected_history(),
        KeyCode::Char('d') | KeyCode::Delete => app.delete_selected_history(),
        KeyCode::Char('o') => app.open_file_browser(),
        _ => {}
    }
}

/// Handles keys while the sheet viewer is focused.
fn handle_viewer_keys(app: &mut App, code: KeyCode) {
    match code {
        KeyCode::Up | KeyCode::Char('k') => app.scroll_viewer(-1),
        KeyCode::Down | KeyCode::Char('j') => app.scroll_viewer(1),
        KeyCode::PageUp => app.scroll_viewer(-app.viewer_page()),
        KeyCode::PageDown => app.scroll_viewer(app.viewer_page()),
        KeyCode::Home => app.viewer.scroll = 0,
        KeyCode::Char('m') => app.toggle_transpose_mode(),
        KeyCode::Char('t') => app.toggle_show_transposes(),
        KeyCode::Char('s') => save_sheet(app),
        KeyCode::Char('e') => export_sheet(app),
        KeyCode::Esc => app.close_viewer(),
        _ => {}
    }
}

/// Saves the sheet text to the working directory.
fn save_sheet(app: &mut App) {
    let dir = std::env::current_dir().unwrap_or_default();
    match app.save_sheet_text(&dir) {
        Ok(path) => app.set_status(format!("Saved {}", path.display())),
        Err(err) => app.set_status(format!("Save failed: {:#}", err)),
    }
}

/// Exports the coloured sheet to the working directory.
fn export_sheet(app: &mut App) {
    let dir = std::env::current_dir().unwrap_or_default();
    match app.export_sheet_html(&dir) {
        Ok(path) => app.set_status(format!("Exported {}", path.display())),
        Err(err) => app.set_status(format!("Export failed: {:#}", err)),
    }
}
