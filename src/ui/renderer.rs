//! Edit line renderer using crossterm
//!
//! Writes the visible side effects of editing: echoed bytes, erased cells,
//! recalled history text, and cursor positioning.

use std::io::{self, Write};

use crossterm::{cursor::MoveTo, style::Print, QueueableCommand};

use crate::core::term::RawPosition;

/// Move left, overwrite with a space, move left again
const ERASE_CELL: &str = "\x08 \x08";

/// Device status report 6: ask for the cursor position
const REQUEST_CURSOR_POSITION: &str = "\x1b[6n";

/// Terminal output for one edit line
pub struct Renderer<W: Write> {
    out: W,
}

impl<W: Write> Renderer<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    /// Echo one input byte as received
    pub fn echo(&mut self, byte: u8) -> io::Result<()> {
        self.out.write_all(&[byte])?;
        self.out.flush()
    }

    /// Visually erase `count` cells left of the cursor
    pub fn erase(&mut self, count: usize) -> io::Result<()> {
        for _ in 0..count {
            self.out.queue(Print(ERASE_CELL))?;
        }
        self.out.flush()
    }

    /// Print a recalled line at the cursor
    pub fn print_line(&mut self, line: &[u8]) -> io::Result<()> {
        self.out.write_all(line)?;
        self.out.flush()
    }

    /// Erase `erase` cells, then print `line` in their place
    pub fn replace_line(&mut self, erase: usize, line: &[u8]) -> io::Result<()> {
        for _ in 0..erase {
            self.out.queue(Print(ERASE_CELL))?;
        }
        self.print_line(line)
    }

    /// Absolute cursor positioning; the wire format is one-based
    pub fn move_to(&mut self, pos: RawPosition) -> io::Result<()> {
        self.out.queue(MoveTo(pos.x, pos.y))?;
        self.out.flush()
    }

    pub fn request_cursor_position(&mut self) -> io::Result<()> {
        self.out.queue(Print(REQUEST_CURSOR_POSITION))?;
        self.out.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output(render: impl FnOnce(&mut Renderer<Vec<u8>>) -> io::Result<()>) -> Vec<u8> {
        let mut renderer = Renderer::new(Vec::new());
        render(&mut renderer).unwrap();
        renderer.into_inner()
    }

    #[test]
    fn test_echo_and_erase() {
        assert_eq!(output(|r| r.echo(b'x')), b"x".to_vec());
        assert_eq!(output(|r| r.erase(0)), Vec::<u8>::new());
        assert_eq!(output(|r| r.erase(2)), b"\x08 \x08\x08 \x08".to_vec());
    }

    #[test]
    fn test_replace_line() {
        assert_eq!(
            output(|r| r.replace_line(1, b"bar")),
            b"\x08 \x08bar".to_vec()
        );
    }

    #[test]
    fn test_move_to_is_one_based() {
        assert_eq!(
            output(|r| r.move_to(RawPosition::new(9, 4))),
            b"\x1b[5;10H".to_vec()
        );
        assert_eq!(
            output(|r| r.move_to(RawPosition::default())),
            b"\x1b[1;1H".to_vec()
        );
    }

    #[test]
    fn test_request_cursor_position() {
        assert_eq!(output(|r| r.request_cursor_position()), b"\x1b[6n".to_vec());
    }
}
