//! Terminal mode control
//!
//! Switches the controlling terminal into raw (non-canonical) input mode and
//! puts the captured attributes back when the returned guard goes away.
//!
//! On Unix the attribute set is the termios structure, read and written
//! through `rustix`. Elsewhere crossterm's raw mode switch is used and the
//! "attribute set" is only whether raw mode was on.

use std::io;
use std::time::Duration;

use bitflags::bitflags;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TerminalError {
    #[error("No controlling terminal: {0}")]
    NoTerminal(#[source] io::Error),

    #[error("Failed to read terminal attributes: {0}")]
    GetAttributes(#[source] io::Error),

    #[error("Failed to set terminal attributes: {0}")]
    SetAttributes(#[source] io::Error),

    #[error("Failed to restore terminal attributes: {0}")]
    Restore(#[source] io::Error),
}

pub type Result<T> = std::result::Result<T, TerminalError>;

bitflags! {
    /// Line discipline features switched off while raw
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct RawFlags: u8 {
        /// Line buffering (ICANON)
        const CANONICAL = 0b0001;
        /// Terminal echo (ECHO)
        const ECHO      = 0b0010;
        /// INTR/QUIT/SUSP signal generation (ISIG)
        const SIGNALS   = 0b0100;
        /// Implementation-defined input processing (IEXTEN)
        const EXTENDED  = 0b1000;
    }
}

impl RawFlags {
    /// Canonical processing off; terminal echo off unless `echo` is set
    pub fn for_echo(echo: bool) -> Self {
        if echo {
            Self::CANONICAL
        } else {
            Self::CANONICAL | Self::ECHO
        }
    }
}

bitflags! {
    /// Raw mode features a backend can honour
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct Capabilities: u8 {
        /// Terminal echo can stay on while raw
        const TERMINAL_ECHO = 0b01;
        /// Reads can be bounded by a timeout
        const READ_TIMEOUT  = 0b10;
    }
}

/// When a new attribute set takes effect
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Apply {
    /// Immediately
    Now,
    /// After pending output drains; pending input is discarded
    Flush,
}

/// Read/write access to a terminal's attribute set
pub trait ModeBackend {
    type Attrs: Clone;

    fn capabilities(&self) -> Capabilities {
        Capabilities::all()
    }

    fn get_attrs(&self) -> io::Result<Self::Attrs>;

    fn set_attrs(&self, attrs: &Self::Attrs, when: Apply) -> io::Result<()>;

    /// Derive the working set from a captured one.
    ///
    /// With `read_timeout`, reads return empty after the timeout instead of
    /// blocking for the first byte.
    fn make_raw(
        &self,
        original: &Self::Attrs,
        flags: RawFlags,
        read_timeout: Option<Duration>,
    ) -> Self::Attrs;
}

/// Raw mode lifetime guard.
///
/// Owns the attribute set captured on entry and is the only thing that
/// restores it, either through [`RawModeGuard::restore`] or on drop.
pub struct RawModeGuard<'a, B: ModeBackend> {
    backend: &'a B,
    original: Option<B::Attrs>,
    flags: RawFlags,
}

/// Capture the current attributes and switch to raw mode
pub fn enter_raw<B: ModeBackend>(backend: &B, flags: RawFlags) -> Result<RawModeGuard<'_, B>> {
    let original = backend.get_attrs().map_err(TerminalError::GetAttributes)?;
    let raw = backend.make_raw(&original, flags, None);
    backend
        .set_attrs(&raw, Apply::Now)
        .map_err(TerminalError::SetAttributes)?;
    tracing::debug!("Entered raw mode ({:?})", flags);

    Ok(RawModeGuard {
        backend,
        original: Some(original),
        flags,
    })
}

impl<'a, B: ModeBackend> RawModeGuard<'a, B> {
    pub fn flags(&self) -> RawFlags {
        self.flags
    }

    pub fn capabilities(&self) -> Capabilities {
        self.backend.capabilities()
    }

    /// Bound (or stop bounding) how long a read waits for the first byte
    pub fn set_read_timeout(&mut self, timeout: Option<Duration>) -> Result<()> {
        self.reconfigure(self.flags, timeout)
    }

    /// Install a different working set derived from the captured attributes
    pub fn reconfigure(&mut self, flags: RawFlags, read_timeout: Option<Duration>) -> Result<()> {
        let Some(original) = self.original.as_ref() else {
            return Ok(());
        };
        let raw = self.backend.make_raw(original, flags, read_timeout);
        self.backend
            .set_attrs(&raw, Apply::Now)
            .map_err(TerminalError::SetAttributes)?;
        self.flags = flags;
        Ok(())
    }

    /// Restore the captured attributes now
    pub fn restore(mut self) -> Result<()> {
        self.restore_inner()
    }

    fn restore_inner(&mut self) -> Result<()> {
        let Some(original) = self.original.take() else {
            return Ok(());
        };
        self.backend
            .set_attrs(&original, Apply::Flush)
            .map_err(TerminalError::Restore)?;
        tracing::debug!("Left raw mode");
        Ok(())
    }
}

impl<B: ModeBackend> Drop for RawModeGuard<'_, B> {
    fn drop(&mut self) {
        if let Err(e) = self.restore_inner() {
            tracing::warn!("{}", e);
        }
    }
}

#[cfg(unix)]
pub use self::unix::{Tty, TtyReader};

#[cfg(not(unix))]
pub use self::fallback::{Tty, TtyReader};

#[cfg(unix)]
mod unix {
    use std::fs::File;
    use std::io::{self, Read};
    use std::time::Duration;

    use rustix::fd::{AsFd, BorrowedFd};
    use rustix::termios::{self, LocalModes, OptionalActions, SpecialCodeIndex, Termios};

    use super::{Apply, ModeBackend, RawFlags, Result, TerminalError};

    /// Either stdin (when it is a tty) or `/dev/tty`
    enum TerminalFd {
        Stdin(io::Stdin),
        DevTty(File),
    }

    impl AsFd for TerminalFd {
        fn as_fd(&self) -> BorrowedFd<'_> {
            match self {
                TerminalFd::Stdin(stdin) => stdin.as_fd(),
                TerminalFd::DevTty(file) => file.as_fd(),
            }
        }
    }

    /// The controlling terminal
    pub struct Tty {
        fd: TerminalFd,
    }

    impl Tty {
        /// Open the controlling terminal, preferring stdin
        pub fn open() -> Result<Self> {
            let stdin = io::stdin();
            let fd = if termios::isatty(&stdin) {
                TerminalFd::Stdin(stdin)
            } else {
                let file = File::options()
                    .read(true)
                    .write(true)
                    .open("/dev/tty")
                    .map_err(TerminalError::NoTerminal)?;
                tracing::debug!("stdin is not a tty, using /dev/tty");
                TerminalFd::DevTty(file)
            };
            Ok(Self { fd })
        }

        /// A byte reader over the same terminal
        pub fn reader(&self) -> io::Result<TtyReader> {
            match &self.fd {
                TerminalFd::Stdin(_) => Ok(TtyReader::Stdin(io::stdin())),
                TerminalFd::DevTty(file) => Ok(TtyReader::DevTty(file.try_clone()?)),
            }
        }
    }

    pub enum TtyReader {
        Stdin(io::Stdin),
        DevTty(File),
    }

    impl Read for TtyReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self {
                TtyReader::Stdin(stdin) => stdin.read(buf),
                TtyReader::DevTty(file) => file.read(buf),
            }
        }
    }

    impl ModeBackend for Tty {
        type Attrs = Termios;

        fn get_attrs(&self) -> io::Result<Termios> {
            Ok(termios::tcgetattr(&self.fd)?)
        }

        fn set_attrs(&self, attrs: &Termios, when: Apply) -> io::Result<()> {
            let action = match when {
                Apply::Now => OptionalActions::Now,
                Apply::Flush => OptionalActions::Flush,
            };
            Ok(termios::tcsetattr(&self.fd, action, attrs)?)
        }

        fn make_raw(
            &self,
            original: &Termios,
            flags: RawFlags,
            read_timeout: Option<Duration>,
        ) -> Termios {
            let mut raw = original.clone();

            let mut local = LocalModes::empty();
            if flags.contains(RawFlags::CANONICAL) {
                local |= LocalModes::ICANON;
            }
            if flags.contains(RawFlags::ECHO) {
                local |= LocalModes::ECHO;
            }
            if flags.contains(RawFlags::SIGNALS) {
                local |= LocalModes::ISIG;
            }
            if flags.contains(RawFlags::EXTENDED) {
                local |= LocalModes::IEXTEN;
            }
            raw.local_modes.remove(local);

            match read_timeout {
                Some(timeout) => {
                    raw.special_codes[SpecialCodeIndex::VMIN] = 0;
                    raw.special_codes[SpecialCodeIndex::VTIME] = deciseconds(timeout);
                }
                None => {
                    raw.special_codes[SpecialCodeIndex::VMIN] = 1;
                    raw.special_codes[SpecialCodeIndex::VTIME] = 0;
                }
            }
            raw
        }
    }

    /// VTIME is counted in tenths of a second, 1..=255
    fn deciseconds(timeout: Duration) -> u8 {
        u8::try_from(timeout.as_millis() / 100)
            .unwrap_or(u8::MAX)
            .max(1)
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_deciseconds_clamped() {
            assert_eq!(deciseconds(Duration::from_millis(0)), 1);
            assert_eq!(deciseconds(Duration::from_millis(500)), 5);
            assert_eq!(deciseconds(Duration::from_secs(60)), 255);
        }
    }
}

#[cfg(not(unix))]
mod fallback {
    use std::io;
    use std::time::Duration;

    use crossterm::terminal;

    use super::{Apply, Capabilities, ModeBackend, RawFlags, Result};

    /// The console, switched through crossterm.
    ///
    /// Raw mode always turns echo off and reads always block.
    pub struct Tty;

    pub type TtyReader = io::Stdin;

    impl Tty {
        pub fn open() -> Result<Self> {
            Ok(Self)
        }

        pub fn reader(&self) -> io::Result<TtyReader> {
            Ok(io::stdin())
        }
    }

    impl ModeBackend for Tty {
        /// Whether raw mode is on
        type Attrs = bool;

        fn capabilities(&self) -> Capabilities {
            Capabilities::empty()
        }

        fn get_attrs(&self) -> io::Result<bool> {
            terminal::is_raw_mode_enabled()
        }

        fn set_attrs(&self, raw: &bool, _when: Apply) -> io::Result<()> {
            if *raw {
                terminal::enable_raw_mode()
            } else {
                terminal::disable_raw_mode()
            }
        }

        fn make_raw(&self, _original: &bool, _flags: RawFlags, _timeout: Option<Duration>) -> bool {
            true
        }
    }
}
