mod config;
mod document;
mod format;
mod render;
mod search;
mod session;
mod viewport;

use std::env;
use std::fs::{self, File};
use std::io::{self, IsTerminal, Read};
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::{ArgAction, Parser};
use crossterm::event::{self, Event as CEvent, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::{execute, ExecutableCommand};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::document::Document;
use crate::format::{Format, Normalized};
use crate::session::{Flow, Input, Session};

const LOG_ENV: &str = "FOLDVIEW_LOG";

#[derive(Debug, Parser)]
#[command(
    name = "foldview",
    version,
    disable_version_flag = true,
    about = "Browse JSON, YAML, XML or plain text as a foldable tree"
)]
struct Cli {
    /// File to view. Use '-' to read from stdin.
    input: Option<String>,

    /// Print version information.
    #[arg(short = 'v', long, action = ArgAction::Version)]
    version: Option<bool>,

    /// Format to parse the input as (json, yaml, xml, raw).
    #[arg(short, long, value_name = "NAME")]
    format: Option<String>,

    /// Spaces per indentation level; overrides the config file.
    #[arg(long, value_name = "N")]
    tab_size: Option<usize>,

    /// Force interactive viewer mode.
    #[arg(short, long)]
    interactive: bool,

    /// Print the normalized document to stdout instead.
    #[arg(long)]
    plain: bool,
}

enum InputSource {
    File(PathBuf),
    Stdin,
}

fn detect_input(cli: &Cli) -> Result<InputSource> {
    match cli.input.as_deref() {
        Some("-") => Ok(InputSource::Stdin),
        Some(path) => Ok(InputSource::File(PathBuf::from(path))),
        None => {
            if io::stdin().is_terminal() {
                Err(anyhow!(
                    "No input provided. Pass a file or pipe a document into stdin."
                ))
            } else {
                Ok(InputSource::Stdin)
            }
        }
    }
}

fn read_input(source: &InputSource) -> Result<Vec<u8>> {
    match source {
        InputSource::File(path) => {
            fs::read(path).with_context(|| format!("unable to read file {}", path.display()))
        }
        InputSource::Stdin => {
            let mut buf = Vec::new();
            io::stdin()
                .read_to_end(&mut buf)
                .context("unable to read stdin")?;
            Ok(buf)
        }
    }
}

fn default_interactive(input: &InputSource) -> bool {
    matches!(input, InputSource::File(_)) && io::stdout().is_terminal()
}

/// Format order for this run: a recognised `--format` alone, otherwise the
/// configured order.
fn format_order(requested: Option<&str>, config: &Config) -> Vec<Format> {
    match requested.map(str::parse::<Format>) {
        Some(Ok(format)) => vec![format],
        Some(Err(err)) => {
            warn!("{err:#}, falling back to {:?}", config.formats);
            config.formats.clone()
        }
        None => config.formats.clone(),
    }
}

fn plain_render(normalized: &Normalized) -> String {
    let mut out = normalized.lines.join("\n");
    if !out.is_empty() {
        out.push('\n');
    }
    out
}

fn translate_key(key: KeyEvent) -> Input {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Char('c') if ctrl => Input::Interrupt,
        KeyCode::Char('f') if ctrl => Input::StartSearch,
        KeyCode::Char('n') if ctrl => Input::FindNext,
        KeyCode::Char(_) if ctrl || key.modifiers.contains(KeyModifiers::ALT) => Input::Other,
        KeyCode::Char(c) => Input::Char(c),
        KeyCode::Up => Input::Up,
        KeyCode::Down => Input::Down,
        KeyCode::Left => Input::Left,
        KeyCode::Right => Input::Right,
        KeyCode::Enter => Input::Enter,
        KeyCode::Backspace => Input::Backspace,
        KeyCode::Esc => Input::Esc,
        _ => Input::Other,
    }
}

struct TerminalGuard;

impl TerminalGuard {
    fn enter() -> Result<Self> {
        enable_raw_mode()?;
        io::stdout().execute(EnterAlternateScreen)?;
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
    }
}

fn run_interactive(mut session: Session) -> Result<()> {
    let _guard = TerminalGuard::enter()?;

    let stdout = io::stdout();
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    info!(lines = session.document().len(), "viewer started");

    loop {
        terminal.draw(|frame| render::draw(&mut session, frame))?;

        match event::read()? {
            CEvent::Key(key) if key.kind == KeyEventKind::Press => {
                if session.handle(translate_key(key)) == Flow::Quit {
                    break;
                }
            }
            _ => {}
        }
    }

    info!("viewer closed");
    Ok(())
}

/// Sends `tracing` output to the file named by `FOLDVIEW_LOG`. The terminal
/// belongs to the viewer, so without that variable nothing is logged.
fn init_tracing() -> Result<()> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let Some(log_path) = env::var_os(LOG_ENV).map(PathBuf::from) else {
        return Ok(());
    };

    let file = File::options()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("unable to open log file {}", log_path.display()))?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(std::sync::Mutex::new(file)),
        )
        .with(filter)
        .try_init()
        .map_err(|err| anyhow!(err))?;

    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing()?;

    if cli.interactive && cli.plain {
        return Err(anyhow!("--interactive and --plain cannot be used together"));
    }

    let mut config = Config::load()?;
    if let Some(tab_size) = cli.tab_size {
        config.tab_size = tab_size.max(1);
    }

    let input = detect_input(&cli)?;
    let interactive = if cli.interactive {
        true
    } else if cli.plain {
        false
    } else {
        default_interactive(&input)
    };

    let content = read_input(&input)?;
    let order = format_order(cli.format.as_deref(), &config);
    let normalized = format::normalize(&content, &order, config.tab_size)?;

    if !interactive {
        print!("{}", plain_render(&normalized));
        return Ok(());
    }

    let document = Document::build(normalized.lines, config.tab_size);
    let session = Session::new(document, normalized.format, config.tab_size);
    run_interactive(session)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn cli_accepts_short_flags() {
        let cli = Cli::try_parse_from(["foldview", "-f", "yaml", "--tab-size", "4", "doc.yml"])
            .unwrap();
        assert_eq!(cli.format.as_deref(), Some("yaml"));
        assert_eq!(cli.tab_size, Some(4));
        assert_eq!(cli.input.as_deref(), Some("doc.yml"));
    }

    #[test]
    fn lowercase_v_prints_version() {
        let err = Cli::try_parse_from(["foldview", "-v"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayVersion);
    }

    #[test]
    fn known_format_is_tried_alone() {
        let config = Config::default();
        assert_eq!(format_order(Some("XML"), &config), vec![Format::Xml]);
    }

    #[test]
    fn unknown_format_falls_back_to_configured_order() {
        let config = Config::default();
        assert_eq!(format_order(Some("csv"), &config), Format::ALL.to_vec());
        assert_eq!(format_order(None, &config), Format::ALL.to_vec());
    }

    #[test]
    fn ctrl_keys_map_to_commands() {
        let ctrl = |c| KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL);
        assert_eq!(translate_key(ctrl('c')), Input::Interrupt);
        assert_eq!(translate_key(ctrl('f')), Input::StartSearch);
        assert_eq!(translate_key(ctrl('n')), Input::FindNext);
        assert_eq!(translate_key(ctrl('x')), Input::Other);
        assert_eq!(
            translate_key(KeyEvent::new(KeyCode::Char('F'), KeyModifiers::SHIFT)),
            Input::Char('F')
        );
        assert_eq!(
            translate_key(KeyEvent::new(KeyCode::Char(' '), KeyModifiers::NONE)),
            Input::Char(' ')
        );
    }

    #[test]
    fn read_input_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let source = InputSource::File(dir.path().join("missing.json"));
        let err = read_input(&source).unwrap_err();
        assert!(format!("{err:#}").starts_with("unable to read file"));
    }

    #[test]
    fn file_through_normalizer_to_plain_output() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(br#"{"a":{"b":1}}"#).unwrap();

        let content = read_input(&InputSource::File(file.path().to_path_buf())).unwrap();
        let normalized = format::normalize(&content, &Format::ALL, 2).unwrap();
        assert_eq!(normalized.format, Format::Json);
        assert_eq!(
            plain_render(&normalized),
            "{\n  \"a\": {\n    \"b\": 1\n  }\n}\n"
        );
    }
}
