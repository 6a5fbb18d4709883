//! rawline - a minimal raw-mode line reader
//!
//! Reads one line from the terminal with character-at-a-time input,
//! backspace editing, and up/down recall from a plain text history file.
//!
//! ```no_run
//! use rawline::LineReader;
//!
//! let mut reader = LineReader::new(false);
//! reader.set_history_source("history");
//! match reader.read_line() {
//!     Ok(line) => println!("{}", line),
//!     Err(e) => eprintln!("{}", e),
//! }
//! ```

pub mod config;
pub mod core;
pub mod history;
pub mod ui;

#[cfg(test)]
mod testsupport;

pub use crate::config::Config;
pub use crate::core::session::{read_line, LineReader, Options, ReadError};
pub use crate::core::term::{RawPosition, TerminalKind};
pub use crate::core::tty::TerminalError;
pub use crate::history::{HistoryError, HistoryFile, HistoryView};
