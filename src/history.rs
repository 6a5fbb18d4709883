//! Command history for rawline
//!
//! Provides read-only, line-oriented access to a history file and the
//! cursor used to walk it while a line is being edited.
//!
//! The file is never cached: every query reopens it and scans from the
//! start. A missing or unreadable file reads as empty history.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum HistoryError {
    #[error("History file {} is unavailable: {source}", path.display())]
    Unavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// A history file, one entry per line
#[derive(Clone, Debug)]
pub struct HistoryFile {
    path: PathBuf,
}

impl HistoryFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Count the records in the file
    pub fn try_line_count(&self) -> Result<usize, HistoryError> {
        let Some(mut reader) = self.open()? else {
            return Ok(0);
        };
        let mut record = Vec::new();
        let mut count = 0;
        while self.read_record(&mut reader, &mut record)? {
            count += 1;
        }
        Ok(count)
    }

    /// Fetch the `index`-th record (0-based); `None` when out of range
    pub fn try_line_at(&self, index: usize) -> Result<Option<String>, HistoryError> {
        let Some(mut reader) = self.open()? else {
            return Ok(None);
        };
        let mut record = Vec::new();
        let mut current = 0;
        while self.read_record(&mut reader, &mut record)? {
            if current == index {
                return Ok(Some(String::from_utf8_lossy(&record).into_owned()));
            }
            current += 1;
        }
        Ok(None)
    }

    /// Record count; unreadable history counts as empty
    pub fn line_count(&self) -> usize {
        self.try_line_count().unwrap_or_else(|e| {
            tracing::warn!("{}", e);
            0
        })
    }

    /// The `index`-th record, or an empty string when out of range or unreadable
    pub fn line_at(&self, index: usize) -> String {
        match self.try_line_at(index) {
            Ok(Some(line)) => line,
            Ok(None) => {
                tracing::debug!("History index {} out of range", index);
                String::new()
            }
            Err(e) => {
                tracing::warn!("{}", e);
                String::new()
            }
        }
    }

    /// Open for reading; `None` when the file does not exist
    fn open(&self) -> Result<Option<BufReader<File>>, HistoryError> {
        match File::open(&self.path) {
            Ok(file) => Ok(Some(BufReader::new(file))),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!("No history file at {}", self.path.display());
                Ok(None)
            }
            Err(e) => Err(self.unavailable(e)),
        }
    }

    /// Read the next record into `record` without its line ending.
    /// Returns false at end of file.
    fn read_record(
        &self,
        reader: &mut BufReader<File>,
        record: &mut Vec<u8>,
    ) -> Result<bool, HistoryError> {
        record.clear();
        let read = reader
            .read_until(b'\n', record)
            .map_err(|e| self.unavailable(e))?;
        if read == 0 {
            return Ok(false);
        }
        if record.last() == Some(&b'\n') {
            record.pop();
            if record.last() == Some(&b'\r') {
                record.pop();
            }
        }
        Ok(true)
    }

    fn unavailable(&self, source: io::Error) -> HistoryError {
        HistoryError::Unavailable {
            path: self.path.clone(),
            source,
        }
    }
}

/// Position of the edit line within history.
///
/// `cursor_line == total_lines` means no entry is selected (blank line).
/// The record count is a snapshot taken when the view is created.
#[derive(Clone, Debug)]
pub struct HistoryView {
    file: Option<HistoryFile>,
    total_lines: usize,
    cursor_line: usize,
}

impl HistoryView {
    pub fn new(file: HistoryFile) -> Self {
        let total_lines = file.line_count();
        tracing::debug!(
            "History {}: {} entries",
            file.path().display(),
            total_lines
        );
        Self {
            file: Some(file),
            total_lines,
            cursor_line: total_lines,
        }
    }

    /// A view with no history behind it
    pub fn empty() -> Self {
        Self {
            file: None,
            total_lines: 0,
            cursor_line: 0,
        }
    }

    pub fn total_lines(&self) -> usize {
        self.total_lines
    }

    pub fn cursor_line(&self) -> usize {
        self.cursor_line
    }

    /// Step to the previous entry; `None` at the top
    pub fn up(&mut self) -> Option<String> {
        if self.cursor_line == 0 {
            return None;
        }
        self.cursor_line -= 1;
        Some(self.current())
    }

    /// Step to the next entry (or the blank line); `None` at the bottom
    pub fn down(&mut self) -> Option<String> {
        if self.cursor_line >= self.total_lines {
            return None;
        }
        self.cursor_line += 1;
        Some(self.current())
    }

    fn current(&self) -> String {
        match &self.file {
            Some(file) => file.line_at(self.cursor_line),
            None => String::new(),
        }
    }
}

impl Default for HistoryView {
    fn default() -> Self {
        Self::empty()
    }
}
