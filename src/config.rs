//! Configuration management for rawline.
//!
//! Settings are read from `~/.rawline/config.toml`. A missing or malformed
//! file yields the defaults.
//!
//! # Configuration File
//!
//! ```toml
//! # Leave echo to the terminal instead of echoing explicitly
//! echo = false
//!
//! # History file used for up/down recall (optional)
//! history_file = "/home/me/.rawline/history"
//!
//! # TERM values that get no escape sequence handling
//! unsupported_terms = ["emacs", "xterm-256color"]
//!
//! [cursor]
//! query_on_start = true
//! query_timeout_ms = 500
//!
//! [raw_mode]
//! disable_signals = true
//! disable_extended = true
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// `TERM` values treated as escape-unsupported unless configured otherwise
pub const DEFAULT_UNSUPPORTED_TERMS: &[&str] = &["emacs", "xterm-256color"];

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Could not determine config path")]
    NoHome,

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Failed to write config {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Terminal echo stays on while reading
    pub echo: bool,
    /// History source
    pub history_file: Option<PathBuf>,
    /// Escape-unsupported `TERM` values (exact match)
    pub unsupported_terms: Vec<String>,
    /// Cursor position query settings
    pub cursor: CursorConfig,
    /// Raw mode settings
    pub raw_mode: RawModeConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            echo: false,
            history_file: None,
            unsupported_terms: DEFAULT_UNSUPPORTED_TERMS
                .iter()
                .map(|term| term.to_string())
                .collect(),
            cursor: CursorConfig::default(),
            raw_mode: RawModeConfig::default(),
        }
    }
}

/// Cursor position query configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CursorConfig {
    pub query_on_start: bool,
    pub query_timeout_ms: u64,
}

impl Default for CursorConfig {
    fn default() -> Self {
        Self {
            query_on_start: true,
            query_timeout_ms: 500,
        }
    }
}

/// Raw mode configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RawModeConfig {
    pub disable_signals: bool,
    pub disable_extended: bool,
}

impl Default for RawModeConfig {
    fn default() -> Self {
        Self {
            disable_signals: true,
            disable_extended: true,
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn load() -> Self {
        match Self::get_config_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    /// Load configuration from `path`, falling back to defaults
    pub fn load_from(path: &Path) -> Self {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                if e.kind() != io::ErrorKind::NotFound {
                    tracing::warn!("Failed to read config {}: {}", path.display(), e);
                }
                return Self::default();
            }
        };
        match toml::from_str(&content) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Ignoring malformed config {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<(), ConfigError> {
        let path = Self::get_config_path().ok_or(ConfigError::NoHome)?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        let write_err = |source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        fs::write(path, content).map_err(write_err)
    }

    /// Get config file path
    pub fn get_config_path() -> Option<PathBuf> {
        data_dir().map(|dir| dir.join("config.toml"))
    }
}

/// `~/.rawline`, home of the config and log files
pub fn data_dir() -> Option<PathBuf> {
    home_dir().map(|home| home.join(".rawline"))
}

fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert!(!config.echo);
        assert_eq!(config.history_file, None);
        assert_eq!(config.unsupported_terms, vec!["emacs", "xterm-256color"]);
        assert!(config.cursor.query_on_start);
        assert_eq!(config.cursor.query_timeout_ms, 500);
        assert!(config.raw_mode.disable_signals);
        assert!(config.raw_mode.disable_extended);
    }

    #[test]
    fn test_partial_config() {
        let config: Config = toml::from_str(
            r#"
            history_file = "/tmp/hist"

            [raw_mode]
            disable_signals = false
            "#,
        )
        .unwrap();
        assert_eq!(config.history_file, Some(PathBuf::from("/tmp/hist")));
        assert!(!config.raw_mode.disable_signals);
        assert!(config.raw_mode.disable_extended);
        assert_eq!(config.unsupported_terms.len(), 2);
        assert_eq!(config.cursor.query_timeout_ms, 500);
    }

    #[test]
    fn test_empty_denylist() {
        let config: Config = toml::from_str("unsupported_terms = []").unwrap();
        assert!(config.unsupported_terms.is_empty());
    }

    #[test]
    fn test_load_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let missing = Config::load_from(&dir.path().join("missing.toml"));
        assert!(!missing.echo);

        let path = dir.path().join("bad.toml");
        fs::write(&path, "echo = \"maybe\"").unwrap();
        let bad = Config::load_from(&path);
        assert!(!bad.echo);
        assert!(bad.cursor.query_on_start);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut config = Config::default();
        config.echo = true;
        config.cursor.query_timeout_ms = 250;
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path);
        assert!(loaded.echo);
        assert_eq!(loaded.cursor.query_timeout_ms, 250);
        assert_eq!(loaded.unsupported_terms, config.unsupported_terms);
    }
}
