//! Core line reading components.
//!
//! - **tty**: raw mode switching for the controlling terminal
//! - **term**: key decoding, cursor reports, and edit line state
//! - **editor**: per-key state machine over the edit line and history
//! - **session**: one `read_line` call from raw mode entry to restore
//!
//! # Architecture
//!
//! ```text
//! LineReader
//! ├── RawModeGuard (captured attributes, restored on drop)
//! └── Editor
//!     ├── KeyParser (bytes -> keys)
//!     ├── EditState (buffer + cursor)
//!     └── HistoryView (history cursor)
//! ```

pub mod editor;
pub mod session;
pub mod term;
pub mod tty;
