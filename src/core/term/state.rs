//! Edit line state
//!
//! This module defines the edit buffer, the logical cursor, and the
//! classification of the controlling terminal.

use std::env;

/// Cursor position as reported by the terminal, zero-based.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RawPosition {
    /// Column
    pub x: u16,
    /// Row
    pub y: u16,
}

impl RawPosition {
    pub const fn new(x: u16, y: u16) -> Self {
        Self { x, y }
    }
}

/// Logical cursor of the edit line
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Cursor {
    pub col: u16,
    pub row: u16,
}

impl Cursor {
    /// Start tracking from a reported terminal position
    pub fn from_position(pos: RawPosition) -> Self {
        Self {
            col: pos.x,
            row: pos.y,
        }
    }

    /// Advance one column
    pub fn forward(&mut self) {
        self.col = self.col.saturating_add(1);
    }

    /// Retreat one column, stopping at zero
    pub fn backward(&mut self) {
        self.col = self.col.saturating_sub(1);
    }

    pub fn position(&self) -> RawPosition {
        RawPosition::new(self.col, self.row)
    }
}

/// How special keys arrive from the controlling terminal
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TerminalKind {
    /// Arrow keys arrive as multi-byte escape sequences
    EscapeCapable,
    /// Escape detection is unreliable; bytes are matched one at a time
    EscapeUnsupported,
}

impl TerminalKind {
    /// Classify a terminal identifier against a denylist.
    ///
    /// An unset identifier is treated as escape-capable.
    pub fn classify(term: Option<&str>, unsupported: &[String]) -> Self {
        match term {
            Some(term) if unsupported.iter().any(|t| t == term) => Self::EscapeUnsupported,
            _ => Self::EscapeCapable,
        }
    }

    /// Classify the terminal named by `TERM`
    pub fn from_env(unsupported: &[String]) -> Self {
        let term = env::var("TERM").ok();
        Self::classify(term.as_deref(), unsupported)
    }

    pub fn is_escape_capable(&self) -> bool {
        matches!(self, Self::EscapeCapable)
    }
}

/// The line being edited.
///
/// Bytes are stored as received. The buffer only grows and shrinks at its
/// end, and the cursor column always sits `len()` cells right of the column
/// where editing started.
#[derive(Clone, Debug)]
pub struct EditState {
    buffer: Vec<u8>,
    cursor: Cursor,
    origin: Cursor,
}

impl EditState {
    pub fn new(origin: Cursor) -> Self {
        Self {
            buffer: Vec::with_capacity(64),
            cursor: origin,
            origin,
        }
    }

    /// Append a byte at the end of the line
    pub fn push(&mut self, byte: u8) {
        self.buffer.push(byte);
        self.cursor.forward();
    }

    /// Remove the last byte; no-op on an empty line
    pub fn pop(&mut self) -> Option<u8> {
        let byte = self.buffer.pop()?;
        self.cursor.backward();
        Some(byte)
    }

    /// Replace the whole line (history recall)
    pub fn replace(&mut self, line: &[u8]) {
        self.buffer.clear();
        self.buffer.extend_from_slice(line);
        let len = u16::try_from(line.len()).unwrap_or(u16::MAX);
        self.cursor.col = self.origin.col.saturating_add(len);
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    /// The line as text (invalid UTF-8 is replaced)
    pub fn to_line(&self) -> String {
        String::from_utf8_lossy(&self.buffer).into_owned()
    }

    pub fn into_line(self) -> String {
        match String::from_utf8(self.buffer) {
            Ok(line) => line,
            Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
        }
    }
}

impl Default for EditState {
    fn default() -> Self {
        Self::new(Cursor::default())
    }
}
