//! Edit line state and terminal input decoding.

pub mod parser;
pub mod state;

pub use parser::{read_byte, read_cursor_report, CursorReport, Key, KeyParser};
pub use state::{Cursor, EditState, RawPosition, TerminalKind};
