//! Shared test fixtures: an in-memory terminal attribute backend and
//! history file helpers.

use std::cell::{Cell, RefCell};
use std::io;
use std::path::PathBuf;
use std::time::Duration;

use tempfile::TempDir;

use crate::core::tty::{Apply, Capabilities, ModeBackend, RawFlags};

/// Attribute set of the fake terminal
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FakeAttrs {
    pub canonical: bool,
    pub echo: bool,
    pub signals: bool,
    pub extended: bool,
    pub read_timeout: Option<Duration>,
}

impl Default for FakeAttrs {
    fn default() -> Self {
        Self {
            canonical: true,
            echo: true,
            signals: true,
            extended: true,
            read_timeout: None,
        }
    }
}

/// Terminal whose attributes live in memory
#[derive(Default)]
pub struct FakeTerminal {
    attrs: RefCell<FakeAttrs>,
    set_count: Cell<usize>,
    last_apply: Cell<Option<Apply>>,
    fail_get: Cell<bool>,
    fail_set: Cell<bool>,
    /// `None` means everything is supported
    capabilities: Cell<Option<Capabilities>>,
}

impl FakeTerminal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attrs(&self) -> FakeAttrs {
        self.attrs.borrow().clone()
    }

    pub fn set_count(&self) -> usize {
        self.set_count.get()
    }

    pub fn last_apply(&self) -> Option<Apply> {
        self.last_apply.get()
    }

    pub fn fail_get(&self, fail: bool) {
        self.fail_get.set(fail);
    }

    pub fn fail_set(&self, fail: bool) {
        self.fail_set.set(fail);
    }

    /// Terminal that only honours `capabilities`
    pub fn limited(capabilities: Capabilities) -> Self {
        let term = Self::default();
        term.capabilities.set(Some(capabilities));
        term
    }
}

impl ModeBackend for FakeTerminal {
    type Attrs = FakeAttrs;

    fn capabilities(&self) -> Capabilities {
        self.capabilities.get().unwrap_or(Capabilities::all())
    }

    fn get_attrs(&self) -> io::Result<FakeAttrs> {
        if self.fail_get.get() {
            return Err(io::Error::new(io::ErrorKind::Other, "tcgetattr failed"));
        }
        Ok(self.attrs())
    }

    fn set_attrs(&self, attrs: &FakeAttrs, when: Apply) -> io::Result<()> {
        if self.fail_set.get() {
            return Err(io::Error::new(io::ErrorKind::Other, "tcsetattr failed"));
        }
        *self.attrs.borrow_mut() = attrs.clone();
        self.set_count.set(self.set_count.get() + 1);
        self.last_apply.set(Some(when));
        Ok(())
    }

    fn make_raw(
        &self,
        original: &FakeAttrs,
        flags: RawFlags,
        read_timeout: Option<Duration>,
    ) -> FakeAttrs {
        let caps = self.capabilities();
        FakeAttrs {
            canonical: original.canonical && !flags.contains(RawFlags::CANONICAL),
            echo: original.echo
                && !flags.contains(RawFlags::ECHO)
                && caps.contains(Capabilities::TERMINAL_ECHO),
            signals: original.signals && !flags.contains(RawFlags::SIGNALS),
            extended: original.extended && !flags.contains(RawFlags::EXTENDED),
            read_timeout: read_timeout.filter(|_| caps.contains(Capabilities::READ_TIMEOUT)),
        }
    }
}

/// Write a history file into a fresh temporary directory
pub fn history_fixture(content: &str) -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().expect("create temp dir");
    let path = dir.path().join("history");
    std::fs::write(&path, content).expect("write history fixture");
    (dir, path)
}
