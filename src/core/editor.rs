//! Edit line state machine
//!
//! Consumes one key per step, updates the edit line and the history
//! cursor, and writes the matching terminal output. Malformed input and
//! out-of-range history navigation are absorbed as no-ops; only I/O
//! failures are returned.

use std::io::{self, Read, Write};

use super::term::{Cursor, EditState, KeyParser, TerminalKind};
use crate::history::HistoryView;
use crate::ui::{EditAction, KeyMapper, Renderer};

/// Outcome of one step
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    /// Keep reading
    Continue,
    /// The line is complete
    Submit,
    /// The user aborted the read
    Cancel,
    /// No more input and nothing typed
    Eof,
}

/// Input state machine for one edit line
#[derive(Debug)]
pub struct Editor {
    state: EditState,
    history: HistoryView,
    parser: KeyParser,
    kind: TerminalKind,
    /// The terminal echoes typed bytes itself
    terminal_echo: bool,
}

impl Editor {
    pub fn new(kind: TerminalKind, history: HistoryView, origin: Cursor) -> Self {
        Self {
            state: EditState::new(origin),
            history,
            parser: KeyParser::new(kind),
            kind,
            terminal_echo: false,
        }
    }

    /// Leave echo of typed bytes to the terminal
    pub fn with_terminal_echo(mut self, terminal_echo: bool) -> Self {
        self.terminal_echo = terminal_echo;
        self
    }

    pub fn state(&self) -> &EditState {
        &self.state
    }

    pub fn history(&self) -> &HistoryView {
        &self.history
    }

    /// Read and apply one key
    pub fn step<R: Read, W: Write>(
        &mut self,
        input: &mut R,
        out: &mut Renderer<W>,
    ) -> io::Result<Step> {
        let Some(key) = self.parser.read_key(input)? else {
            // End of input completes whatever was typed
            return Ok(if self.state.is_empty() {
                Step::Eof
            } else {
                Step::Submit
            });
        };
        let action = KeyMapper::map(key, self.kind);
        tracing::trace!("{:?} -> {:?}", key, action);
        self.apply(action, out)
    }

    /// Apply one edit action
    pub fn apply<W: Write>(&mut self, action: EditAction, out: &mut Renderer<W>) -> io::Result<Step> {
        match action {
            EditAction::Insert(byte) => {
                self.state.push(byte);
                if !self.terminal_echo {
                    out.echo(byte)?;
                }
            }
            EditAction::DeleteBack => {
                if self.state.pop().is_some() {
                    out.erase(1)?;
                }
            }
            EditAction::HistoryPrev => {
                if let Some(line) = self.history.up() {
                    self.show_history(&line, out)?;
                }
            }
            EditAction::HistoryNext => {
                if let Some(line) = self.history.down() {
                    self.show_history(&line, out)?;
                }
            }
            EditAction::Submit => return Ok(Step::Submit),
            EditAction::Cancel => return Ok(Step::Cancel),
            EditAction::EndOfInput => {
                // Only ends the read on an empty line
                if self.state.is_empty() {
                    return Ok(Step::Eof);
                }
            }
            EditAction::Ignore => {}
        }
        Ok(Step::Continue)
    }

    fn show_history<W: Write>(&mut self, line: &str, out: &mut Renderer<W>) -> io::Result<()> {
        tracing::debug!(
            "History {}/{}: {:?}",
            self.history.cursor_line(),
            self.history.total_lines(),
            line
        );
        out.replace_line(self.state.len(), line.as_bytes())?;
        self.state.replace(line.as_bytes());
        Ok(())
    }

    pub fn into_line(self) -> String {
        self.state.into_line()
    }
}
