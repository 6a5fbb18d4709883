//! Line reading session
//!
//! A [`LineReader`] owns the per-process settings (echo mode, history
//! source, terminal classification) and runs one edit line per
//! [`LineReader::read_line`] call: classify the terminal, snapshot the
//! history, switch to raw mode, optionally ask the terminal where the cursor
//! is, then step the editor until the line completes. The terminal's
//! attributes are restored on every exit path.

use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info, warn};

use super::editor::{Editor, Step};
use super::term::{read_cursor_report, Cursor, RawPosition, TerminalKind};
use super::tty::{self, Capabilities, ModeBackend, RawFlags, RawModeGuard, TerminalError, Tty};
use crate::config::{Config, DEFAULT_UNSUPPORTED_TERMS};
use crate::history::{HistoryFile, HistoryView};
use crate::ui::Renderer;

#[derive(Error, Debug)]
pub enum ReadError {
    #[error(transparent)]
    Terminal(#[from] TerminalError),

    #[error("Terminal I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("Read interrupted")]
    Interrupted,

    #[error("End of input")]
    Eof,
}

pub type Result<T> = std::result::Result<T, ReadError>;

/// Reader settings
#[derive(Clone, Debug)]
pub struct Options {
    /// Leave the terminal's own echo on instead of echoing explicitly
    pub echo: bool,
    /// `TERM` values that cannot be trusted with escape sequences
    pub unsupported_terms: Vec<String>,
    /// Fixed terminal classification; detected from `TERM` when `None`
    pub terminal: Option<TerminalKind>,
    /// Ask the terminal for the cursor position before reading
    pub query_cursor: bool,
    /// How long to wait for the position report
    pub query_timeout: Duration,
    /// Deliver Ctrl+C and friends as bytes instead of signals
    pub disable_signals: bool,
    /// Turn off implementation-defined input processing
    pub disable_extended: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            echo: false,
            unsupported_terms: DEFAULT_UNSUPPORTED_TERMS
                .iter()
                .map(|term| term.to_string())
                .collect(),
            terminal: None,
            query_cursor: true,
            query_timeout: Duration::from_millis(500),
            disable_signals: true,
            disable_extended: true,
        }
    }
}

impl Options {
    pub fn from_config(config: &Config) -> Self {
        Self {
            echo: config.echo,
            unsupported_terms: config.unsupported_terms.clone(),
            terminal: None,
            query_cursor: config.cursor.query_on_start,
            query_timeout: Duration::from_millis(config.cursor.query_timeout_ms),
            disable_signals: config.raw_mode.disable_signals,
            disable_extended: config.raw_mode.disable_extended,
        }
    }

    /// Line discipline features to switch off while reading
    pub fn raw_flags(&self) -> RawFlags {
        let mut flags = RawFlags::for_echo(self.echo);
        if self.disable_signals {
            flags |= RawFlags::SIGNALS;
        }
        if self.disable_extended {
            flags |= RawFlags::EXTENDED;
        }
        flags
    }
}

/// Raw mode line reader with history recall
#[derive(Debug, Default)]
pub struct LineReader {
    options: Options,
    history: Option<HistoryFile>,
    /// History cursor when the last read finished
    last_history_line: Option<usize>,
}

impl LineReader {
    /// Reader with default options and the given echo mode
    pub fn new(echo: bool) -> Self {
        Self::with_options(Options {
            echo,
            ..Options::default()
        })
    }

    pub fn with_options(options: Options) -> Self {
        Self {
            options,
            history: None,
            last_history_line: None,
        }
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn set_history_source(&mut self, path: impl Into<PathBuf>) {
        let file = HistoryFile::new(path);
        debug!("History source: {}", file.path().display());
        self.history = Some(file);
    }

    pub fn history_source(&self) -> Option<&Path> {
        self.history.as_ref().map(HistoryFile::path)
    }

    /// Number of records in the history source; 0 without one
    pub fn history_line_count(&self) -> usize {
        self.history.as_ref().map_or(0, HistoryFile::line_count)
    }

    /// The `index`-th history record; empty when out of range
    pub fn history_line(&self, index: usize) -> String {
        self.history
            .as_ref()
            .map(|file| file.line_at(index))
            .unwrap_or_default()
    }

    /// Where the history cursor stood when the last read finished
    pub fn last_history_line(&self) -> Option<usize> {
        self.last_history_line
    }

    /// Terminal classification for the next read
    pub fn terminal_kind(&self) -> TerminalKind {
        match self.options.terminal {
            Some(kind) => kind,
            None => TerminalKind::from_env(&self.options.unsupported_terms),
        }
    }

    /// Read one line from the controlling terminal
    pub fn read_line(&mut self) -> Result<String> {
        let tty = Tty::open()?;
        let mut input = tty.reader()?;
        let mut out = Renderer::new(io::stdout().lock());
        self.read_line_with(&tty, &mut input, &mut out)
    }

    /// Read one line through the given terminal backend and byte streams
    pub fn read_line_with<B, R, W>(
        &mut self,
        backend: &B,
        input: &mut R,
        out: &mut Renderer<W>,
    ) -> Result<String>
    where
        B: ModeBackend,
        R: Read,
        W: Write,
    {
        let kind = self.terminal_kind();
        info!("Reading line ({:?}, echo: {})", kind, self.options.echo);

        let history = match &self.history {
            Some(file) => HistoryView::new(file.clone()),
            None => HistoryView::empty(),
        };

        let terminal_echo = self.options.echo
            && backend.capabilities().contains(Capabilities::TERMINAL_ECHO);
        if self.options.echo && !terminal_echo {
            debug!("Terminal cannot keep echo on while raw, echoing explicitly");
        }
        let mut guard = tty::enter_raw(backend, self.raw_flags(terminal_echo))?;

        // Escape round trips are what an unsupported terminal gets wrong
        let origin = if self.options.query_cursor && kind.is_escape_capable() {
            self.query_with(&mut guard, input, out)?
        } else {
            RawPosition::default()
        };

        let mut editor = Editor::new(kind, history, Cursor::from_position(origin))
            .with_terminal_echo(terminal_echo);

        let outcome = loop {
            match editor.step(input, out)? {
                Step::Continue => continue,
                Step::Submit => break Ok(()),
                Step::Cancel => break Err(ReadError::Interrupted),
                Step::Eof => break Err(ReadError::Eof),
            }
        };
        self.last_history_line = Some(editor.history().cursor_line());

        guard.restore()?;

        match outcome {
            Ok(()) => {
                let line = editor.into_line();
                debug!("Read {} bytes", line.len());
                Ok(line)
            }
            Err(e) => {
                info!("{}", e);
                Err(e)
            }
        }
    }

    /// Ask the controlling terminal for the cursor position
    pub fn query_cursor_position(&self) -> Result<RawPosition> {
        let tty = Tty::open()?;
        let mut input = tty.reader()?;
        let mut out = Renderer::new(io::stdout().lock());
        let mut guard = tty::enter_raw(&tty, self.raw_flags(false))?;
        let pos = self.query_with(&mut guard, &mut input, &mut out)?;
        guard.restore()?;
        Ok(pos)
    }

    /// Move the terminal cursor to a zero-based position
    pub fn set_cursor_position(&self, pos: RawPosition) -> Result<()> {
        Renderer::new(io::stdout().lock()).move_to(pos)?;
        Ok(())
    }

    /// Options' raw flags, with echo off unless the terminal keeps it
    fn raw_flags(&self, terminal_echo: bool) -> RawFlags {
        let flags = self.options.raw_flags();
        if terminal_echo {
            flags
        } else {
            flags | RawFlags::ECHO
        }
    }

    /// Position query inside an active raw mode; falls back to the origin
    fn query_with<B, R, W>(
        &self,
        guard: &mut RawModeGuard<'_, B>,
        input: &mut R,
        out: &mut Renderer<W>,
    ) -> Result<RawPosition>
    where
        B: ModeBackend,
        R: Read,
        W: Write,
    {
        if !guard.capabilities().contains(Capabilities::READ_TIMEOUT) {
            debug!("Terminal reads cannot time out, skipping cursor query");
            return Ok(RawPosition::default());
        }

        let flags = guard.flags();
        // The reply must not be echoed back at the user
        guard.reconfigure(flags | RawFlags::ECHO, Some(self.options.query_timeout))?;
        out.request_cursor_position()?;
        let report = read_cursor_report(input);
        guard.reconfigure(flags, None)?;

        match report? {
            Some(report) => {
                let pos = report.position();
                debug!("Cursor at {:?}", pos);
                Ok(pos)
            }
            None => {
                warn!(
                    "No cursor position report within {:?}",
                    self.options.query_timeout
                );
                Ok(RawPosition::default())
            }
        }
    }
}

/// Read one line using `history_path` for recall
pub fn read_line(history_path: impl Into<PathBuf>, echo: bool) -> Result<String> {
    let mut reader = LineReader::new(echo);
    reader.set_history_source(history_path);
    reader.read_line()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::tty::Apply;
    use crate::testsupport::{history_fixture, FakeAttrs, FakeTerminal};

    fn reader(kind: TerminalKind) -> LineReader {
        LineReader::with_options(Options {
            terminal: Some(kind),
            query_cursor: false,
            ..Options::default()
        })
    }

    fn read(reader: &mut LineReader, term: &FakeTerminal, input: &[u8]) -> (Result<String>, Vec<u8>) {
        let mut input = input;
        let mut out = Renderer::new(Vec::new());
        let result = reader.read_line_with(term, &mut input, &mut out);
        (result, out.into_inner())
    }

    struct FailingReader;

    impl Read for FailingReader {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "gone"))
        }
    }

    #[test]
    fn test_reads_line_and_restores() {
        let term = FakeTerminal::new();
        let mut reader = reader(TerminalKind::EscapeCapable);
        let (result, out) = read(&mut reader, &term, b"hello world\r");
        assert_eq!(result.unwrap(), "hello world");
        assert_eq!(out, b"hello world".to_vec());
        assert_eq!(term.attrs(), FakeAttrs::default());
        assert_eq!(term.last_apply(), Some(Apply::Flush));
        assert_eq!(reader.last_history_line(), Some(0));
    }

    #[test]
    fn test_interrupt_restores() {
        let term = FakeTerminal::new();
        let mut reader = reader(TerminalKind::EscapeCapable);
        let (result, _) = read(&mut reader, &term, b"abc\x03def\n");
        assert!(matches!(result, Err(ReadError::Interrupted)));
        assert_eq!(term.attrs(), FakeAttrs::default());
    }

    #[test]
    fn test_eof_restores() {
        let term = FakeTerminal::new();
        let mut reader = reader(TerminalKind::EscapeCapable);
        let (result, _) = read(&mut reader, &term, b"");
        assert!(matches!(result, Err(ReadError::Eof)));
        assert_eq!(term.attrs(), FakeAttrs::default());

        let (result, _) = read(&mut reader, &term, b"partial");
        assert_eq!(result.unwrap(), "partial");
    }

    #[test]
    fn test_io_error_restores() {
        let term = FakeTerminal::new();
        let mut reader = reader(TerminalKind::EscapeCapable);
        let mut out = Renderer::new(Vec::new());
        let result = reader.read_line_with(&term, &mut FailingReader, &mut out);
        assert!(matches!(result, Err(ReadError::Io(_))));
        assert_eq!(term.attrs(), FakeAttrs::default());
    }

    #[test]
    fn test_attribute_failure_is_surfaced() {
        let term = FakeTerminal::new();
        term.fail_get(true);
        let mut reader = reader(TerminalKind::EscapeCapable);
        let (result, out) = read(&mut reader, &term, b"abc\n");
        assert!(matches!(
            result,
            Err(ReadError::Terminal(TerminalError::GetAttributes(_)))
        ));
        assert!(out.is_empty());
    }

    #[test]
    fn test_history_recall() {
        let (_dir, path) = history_fixture("foo\nbar\n");
        let term = FakeTerminal::new();
        let mut reader = reader(TerminalKind::EscapeCapable);
        reader.set_history_source(&path);
        assert_eq!(reader.history_line_count(), 2);
        assert_eq!(reader.history_line(0), "foo");
        assert_eq!(reader.history_line(2), "");

        let (result, _) = read(&mut reader, &term, b"\x1b[A\x1b[A\n");
        assert_eq!(result.unwrap(), "foo");
        assert_eq!(reader.last_history_line(), Some(0));

        // Each read starts at the blank line again
        let (result, _) = read(&mut reader, &term, b"\x1b[A\n");
        assert_eq!(result.unwrap(), "bar");
        assert_eq!(reader.last_history_line(), Some(1));
    }

    #[test]
    fn test_unsupported_terminal_ignores_arrows() {
        let (_dir, path) = history_fixture("foo\nbar\n");
        let term = FakeTerminal::new();
        let mut reader = reader(TerminalKind::EscapeUnsupported);
        reader.set_history_source(&path);
        let (result, _) = read(&mut reader, &term, b"A\n");
        assert_eq!(result.unwrap(), "");
        assert_eq!(reader.last_history_line(), Some(2));
    }

    #[test]
    fn test_no_history_source() {
        let reader = LineReader::new(false);
        assert_eq!(reader.history_source(), None);
        assert_eq!(reader.history_line_count(), 0);
        assert_eq!(reader.history_line(0), "");
    }

    #[test]
    fn test_cursor_query() {
        let term = FakeTerminal::new();
        let mut reader = LineReader::with_options(Options {
            terminal: Some(TerminalKind::EscapeCapable),
            ..Options::default()
        });
        let (result, out) = read(&mut reader, &term, b"\x1b[5;3Rab\n");
        assert_eq!(result.unwrap(), "ab");
        assert_eq!(out, b"\x1b[6nab".to_vec());
        assert_eq!(term.attrs(), FakeAttrs::default());
    }

    #[test]
    fn test_cursor_query_without_reply() {
        let term = FakeTerminal::new();
        let mut reader = LineReader::with_options(Options {
            terminal: Some(TerminalKind::EscapeCapable),
            ..Options::default()
        });
        let (result, _) = read(&mut reader, &term, b"");
        assert!(matches!(result, Err(ReadError::Eof)));
        assert_eq!(term.attrs(), FakeAttrs::default());
    }

    #[test]
    fn test_no_cursor_query_on_unsupported_terminal() {
        let term = FakeTerminal::new();
        let mut reader = LineReader::with_options(Options {
            terminal: Some(TerminalKind::EscapeUnsupported),
            ..Options::default()
        });
        let (result, out) = read(&mut reader, &term, b"ab\n");
        assert_eq!(result.unwrap(), "ab");
        assert_eq!(out, b"ab".to_vec());
        assert_eq!(term.attrs(), FakeAttrs::default());
    }

    #[test]
    fn test_terminal_echo_kept() {
        let term = FakeTerminal::new();
        let mut reader = LineReader::with_options(Options {
            echo: true,
            terminal: Some(TerminalKind::EscapeCapable),
            query_cursor: false,
            ..Options::default()
        });
        let (result, out) = read(&mut reader, &term, b"ab\n");
        assert_eq!(result.unwrap(), "ab");
        // The terminal displays the input itself
        assert!(out.is_empty());
    }

    #[test]
    fn test_backend_without_echo_or_timeout() {
        let term = FakeTerminal::limited(Capabilities::empty());
        let mut reader = LineReader::with_options(Options {
            echo: true,
            terminal: Some(TerminalKind::EscapeCapable),
            ..Options::default()
        });
        let (result, out) = read(&mut reader, &term, b"ab\x7f\n");
        assert_eq!(result.unwrap(), "a");
        // No position request, and typed bytes are echoed explicitly
        assert_eq!(out, b"ab\x08 \x08".to_vec());
        assert_eq!(term.attrs(), FakeAttrs::default());
    }

    #[test]
    fn test_raw_flags() {
        let options = Options::default();
        assert_eq!(
            options.raw_flags(),
            RawFlags::CANONICAL | RawFlags::ECHO | RawFlags::SIGNALS | RawFlags::EXTENDED
        );

        let options = Options {
            echo: true,
            disable_signals: false,
            disable_extended: false,
            ..Options::default()
        };
        assert_eq!(options.raw_flags(), RawFlags::CANONICAL);
    }

    #[test]
    fn test_options_from_config() {
        let config: Config = toml::from_str(
            r#"
            echo = true
            unsupported_terms = ["dumb"]

            [cursor]
            query_on_start = false
            query_timeout_ms = 50
            "#,
        )
        .unwrap();
        let options = Options::from_config(&config);
        assert!(options.echo);
        assert_eq!(options.unsupported_terms, vec!["dumb".to_string()]);
        assert!(!options.query_cursor);
        assert_eq!(options.query_timeout, Duration::from_millis(50));
        assert!(options.disable_signals);
        assert_eq!(options.terminal, None);
    }
}
