//! Key mapping for the edit line
//!
//! Converts decoded keys to editing actions for the current terminal.

use crate::core::term::{Key, TerminalKind};

/// What a key does to the edit line
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EditAction {
    /// Append a byte
    Insert(u8),
    /// Remove the last byte
    DeleteBack,
    /// Show the previous history entry
    HistoryPrev,
    /// Show the next history entry
    HistoryNext,
    /// Complete the line
    Submit,
    /// Abort the read
    Cancel,
    /// End of input requested (Ctrl+D)
    EndOfInput,
    /// No effect
    Ignore,
}

/// Key mapper for converting keys to edit actions
pub struct KeyMapper;

impl KeyMapper {
    pub fn map(key: Key, kind: TerminalKind) -> EditAction {
        match key {
            Key::Char(byte) => EditAction::Insert(byte),
            Key::Backspace => EditAction::DeleteBack,
            Key::Enter => EditAction::Submit,
            Key::Interrupt => EditAction::Cancel,
            Key::EndOfInput => EditAction::EndOfInput,

            // History recall needs reliable sequence detection
            Key::Up if kind.is_escape_capable() => EditAction::HistoryPrev,
            Key::Down if kind.is_escape_capable() => EditAction::HistoryNext,

            // No cursor movement within the line
            Key::Up | Key::Down | Key::Left | Key::Right => EditAction::Ignore,
            Key::Tab | Key::Unknown => EditAction::Ignore,
        }
    }
}
