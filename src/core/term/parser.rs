//! Key sequence parser
//!
//! Decodes raw terminal input bytes into keys, and parses the terminal's
//! cursor position report.

use std::io::{self, ErrorKind, Read};

use super::state::{RawPosition, TerminalKind};

const ESC: u8 = 0x1B;

/// Longest escape sequence the parser will consume before giving up
const MAX_SEQUENCE_LEN: usize = 16;

/// Longest cursor position report accepted (`ESC [ 65535 ; 65535 R`)
const MAX_REPORT_LEN: usize = 32;

/// A decoded key
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Key {
    /// Printable byte (space included)
    Char(u8),
    Backspace,
    Tab,
    Enter,
    Up,
    Down,
    Left,
    Right,
    /// Ctrl+C
    Interrupt,
    /// Ctrl+D
    EndOfInput,
    /// Unrecognized control byte or malformed sequence
    Unknown,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
enum ParserState {
    #[default]
    Ground,
    Escape,
    CsiEntry,
    CsiParam,
    /// Linux console function key: `ESC [ [` plus one byte
    CsiLinux,
    Ss3,
}

/// Byte-at-a-time key decoder
#[derive(Debug)]
pub struct KeyParser {
    kind: TerminalKind,
    state: ParserState,
    seq_len: usize,
}

impl KeyParser {
    pub fn new(kind: TerminalKind) -> Self {
        Self {
            kind,
            state: ParserState::Ground,
            seq_len: 0,
        }
    }

    /// Whether a multi-byte sequence is partially consumed
    pub fn in_sequence(&self) -> bool {
        self.state != ParserState::Ground
    }

    /// Drop any partially consumed sequence
    pub fn reset(&mut self) {
        self.state = ParserState::Ground;
        self.seq_len = 0;
    }

    /// Feed a single byte; returns a key once one is complete
    pub fn feed(&mut self, byte: u8) -> Option<Key> {
        match self.state {
            ParserState::Ground => self.ground(byte),
            ParserState::Escape => self.escape(byte),
            ParserState::CsiEntry | ParserState::CsiParam => self.csi(byte),
            ParserState::CsiLinux | ParserState::Ss3 => self.last_byte(byte),
        }
    }

    /// Read bytes until one key is decoded.
    ///
    /// Returns `Ok(None)` at end of input, including when input ends inside
    /// an escape sequence.
    pub fn read_key<R: Read>(&mut self, input: &mut R) -> io::Result<Option<Key>> {
        loop {
            let Some(byte) = read_byte(input)? else {
                if self.in_sequence() {
                    tracing::debug!("input ended inside an escape sequence");
                }
                self.reset();
                return Ok(None);
            };
            if let Some(key) = self.feed(byte) {
                return Ok(Some(key));
            }
        }
    }

    fn ground(&mut self, byte: u8) -> Option<Key> {
        if self.kind == TerminalKind::EscapeUnsupported {
            // No sequence detection: arrow codes arrive bare
            match byte {
                b'A' => return Some(Key::Up),
                b'B' => return Some(Key::Down),
                b'C' => return Some(Key::Right),
                b'D' => return Some(Key::Left),
                ESC => return Some(Key::Unknown),
                _ => {}
            }
        }

        let key = match byte {
            ESC => {
                self.state = ParserState::Escape;
                self.seq_len = 1;
                return None;
            }
            b'\n' | b'\r' => Key::Enter,
            0x7F | 0x08 => Key::Backspace,
            b'\t' => Key::Tab,
            0x03 => Key::Interrupt,
            0x04 => Key::EndOfInput,
            0x20..=0x7E | 0x80..=0xFF => Key::Char(byte),
            _ => Key::Unknown,
        };
        Some(key)
    }

    fn escape(&mut self, byte: u8) -> Option<Key> {
        if is_control(byte) {
            // A lone ESC press; the control byte keeps its meaning
            self.reset();
            return self.ground(byte);
        }
        match byte {
            b'[' => {
                self.state = ParserState::CsiEntry;
                self.seq_len += 1;
                None
            }
            b'O' => {
                self.state = ParserState::Ss3;
                self.seq_len += 1;
                None
            }
            _ => {
                tracing::debug!("Unknown escape: {:?}", byte as char);
                self.reset();
                Some(Key::Unknown)
            }
        }
    }

    fn csi(&mut self, byte: u8) -> Option<Key> {
        self.seq_len += 1;
        if self.seq_len > MAX_SEQUENCE_LEN {
            tracing::debug!("Escape sequence too long, dropping");
            self.reset();
            return Some(Key::Unknown);
        }
        if is_control(byte) {
            tracing::debug!("Control byte {:#04x} inside escape sequence", byte);
            self.reset();
            return self.ground(byte);
        }

        match byte {
            b'[' if self.state == ParserState::CsiEntry => {
                self.state = ParserState::CsiLinux;
                None
            }
            // Parameter and intermediate bytes
            0x20..=0x3F => {
                self.state = ParserState::CsiParam;
                None
            }
            // Final byte
            0x40..=0x7E => {
                self.reset();
                Some(arrow(byte))
            }
            _ => {
                self.reset();
                Some(Key::Unknown)
            }
        }
    }

    /// Byte that completes an SS3 or Linux console sequence
    fn last_byte(&mut self, byte: u8) -> Option<Key> {
        let state = self.state;
        self.reset();
        if is_control(byte) {
            return self.ground(byte);
        }
        match state {
            ParserState::Ss3 => Some(arrow(byte)),
            _ => Some(Key::Unknown),
        }
    }
}

/// C0 controls and DEL abort a partial sequence and are handled as keys
fn is_control(byte: u8) -> bool {
    byte < 0x20 || byte == 0x7F
}

/// Map a sequence final byte to an arrow key
fn arrow(byte: u8) -> Key {
    match byte {
        b'A' => Key::Up,
        b'B' => Key::Down,
        b'C' => Key::Right,
        b'D' => Key::Left,
        _ => {
            tracing::debug!("Unhandled sequence final byte: {:?}", byte as char);
            Key::Unknown
        }
    }
}

/// Read one byte, `None` at end of input
pub fn read_byte<R: Read>(input: &mut R) -> io::Result<Option<u8>> {
    let mut byte = [0u8; 1];
    loop {
        match input.read(&mut byte) {
            Ok(0) => return Ok(None),
            Ok(_) => return Ok(Some(byte[0])),
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
}

/// Cursor position report: ESC [ row ; col R (one-based)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CursorReport {
    pub row: u16,
    pub col: u16,
}

impl CursorReport {
    pub fn to_bytes(&self) -> Vec<u8> {
        format!("\x1b[{};{}R", self.row, self.col).into_bytes()
    }

    /// Parse a complete report
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        let body = bytes.strip_prefix(b"\x1b[")?.strip_suffix(b"R")?;
        let body = std::str::from_utf8(body).ok()?;
        let (row, col) = body.split_once(';')?;
        Some(Self {
            row: row.parse().ok()?,
            col: col.parse().ok()?,
        })
    }

    /// Zero-based position
    pub fn position(&self) -> RawPosition {
        RawPosition::new(self.col.saturating_sub(1), self.row.saturating_sub(1))
    }
}

/// Read a cursor position report from the terminal.
///
/// Bytes preceding the report's ESC are discarded. Returns `Ok(None)` when
/// input ends (or a read times out) before a well-formed report arrives.
pub fn read_cursor_report<R: Read>(input: &mut R) -> io::Result<Option<CursorReport>> {
    let mut report = Vec::with_capacity(MAX_REPORT_LEN);
    while let Some(byte) = read_byte(input)? {
        if report.is_empty() && byte != ESC {
            tracing::debug!("Discarding byte before cursor report: {:#04x}", byte);
            continue;
        }
        report.push(byte);
        if byte == b'R' {
            return Ok(CursorReport::parse(&report));
        }
        if report.len() >= MAX_REPORT_LEN {
            break;
        }
    }
    tracing::debug!("Incomplete cursor report: {:?}", String::from_utf8_lossy(&report));
    Ok(None)
}
