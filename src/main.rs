//! rawline - read one line from the terminal with history recall
//!
//! Reads a line in raw mode, with up/down recall from a history file, then
//! prints the line and the history index the cursor ended on.
//!
//! ```text
//! rawline                     # history from ./history
//! rawline --history ~/.hist   # explicit history file
//! rawline --echo              # let the terminal echo input
//! ```

use std::env;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use tracing::{error, info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use rawline::config::{self, Config};
use rawline::{LineReader, Options, ReadError};

/// Version string from Cargo.toml
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Log filter override, e.g. `RAWLINE_LOG=debug`
const LOG_ENV: &str = "RAWLINE_LOG";

/// Command line settings
#[derive(Default)]
struct Args {
    /// History file given with --history
    history: Option<PathBuf>,
    /// --echo given
    echo: bool,
    /// --no-query given
    no_query: bool,
}

fn print_version() {
    eprintln!("rawline {}", VERSION);
}

fn print_help() {
    eprintln!("rawline {} - raw mode line reader with history recall", VERSION);
    eprintln!();
    eprintln!("Usage: rawline [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -H, --history <PATH>  History file (default: ./history)");
    eprintln!("  -e, --echo            Leave echo to the terminal");
    eprintln!("  --no-query            Skip the cursor position query");
    eprintln!("  -v, --version         Show version");
    eprintln!("  -h, --help            Show this help");
    eprintln!();
    eprintln!("Keys:");
    eprintln!("  Up/Down               Walk the history file");
    eprintln!("  Backspace             Delete the last character");
    eprintln!("  Enter                 Accept the line");
    eprintln!("  Ctrl+C                Abort");
    eprintln!("  Ctrl+D                End of input (on an empty line)");
    eprintln!();
    eprintln!("Configuration: ~/.rawline/config.toml");
    eprintln!("Log: ~/.rawline/rawline.log ({} sets the filter)", LOG_ENV);
}

fn parse_args() -> Result<Args, String> {
    let args: Vec<String> = env::args().collect();
    let mut parsed = Args::default();
    let mut i = 1;

    while i < args.len() {
        match args[i].as_str() {
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            "-v" | "--version" => {
                print_version();
                std::process::exit(0);
            }
            "-H" | "--history" => {
                i += 1;
                if i >= args.len() {
                    return Err("Missing history file argument".to_string());
                }
                parsed.history = Some(PathBuf::from(&args[i]));
            }
            "-e" | "--echo" => {
                parsed.echo = true;
            }
            "--no-query" => {
                parsed.no_query = true;
            }
            arg => {
                return Err(format!("Unknown option: {}", arg));
            }
        }
        i += 1;
    }

    Ok(parsed)
}

/// Log to a file; stdout belongs to the line being edited
fn init_logging() {
    let log_path = config::data_dir()
        .map(|dir| dir.join("rawline.log"))
        .unwrap_or_else(|| PathBuf::from("rawline.log"));

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .ok();

    if let Some(file) = log_file {
        let filter = EnvFilter::try_from_env(LOG_ENV)
            .unwrap_or_else(|_| EnvFilter::new(Level::INFO.to_string()));
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(filter)
            .with_writer(std::sync::Mutex::new(file))
            .with_ansi(false)
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    }
}

fn main() -> anyhow::Result<ExitCode> {
    let args = match parse_args() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("Use --help for usage information");
            std::process::exit(1);
        }
    };

    init_logging();
    info!("rawline {} starting", VERSION);

    let config = Config::load();
    let mut options = Options::from_config(&config);
    options.echo |= args.echo;
    if args.no_query {
        options.query_cursor = false;
    }

    let history = match args.history.or(config.history_file) {
        Some(path) => path,
        None => env::current_dir()
            .context("Failed to get current directory")?
            .join("history"),
    };

    let mut reader = LineReader::with_options(options);
    reader.set_history_source(&history);
    info!(
        "History {} ({} entries)",
        history.display(),
        reader.history_line_count()
    );

    let result = reader.read_line();
    // The terminal did not echo a line break
    println!();

    match result {
        Ok(line) => {
            let index = reader.last_history_line().unwrap_or_default();
            println!("{} {}", line, index);
            Ok(ExitCode::SUCCESS)
        }
        Err(ReadError::Interrupted) => {
            info!("Interrupted");
            Ok(ExitCode::from(130))
        }
        Err(ReadError::Eof) => {
            info!("End of input");
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            error!("{}", e);
            Err(e).context("Failed to read line")
        }
    }
}
