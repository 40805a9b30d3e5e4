//! Optional settings file

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use seriesly_core::WriteOptions;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Defaults for command-line flags, read from `settings.json`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Descend into subdirectories when scanning
    pub recursive: bool,

    /// Keep a `.bak` copy of every file before saving
    pub backup: bool,

    /// Write EPUB3 collection tags
    pub write_collection: bool,

    /// Write calibre tags
    pub write_calibre: bool,

    /// Scan worker threads
    pub jobs: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            recursive: false,
            backup: true,
            write_collection: true,
            write_calibre: true,
            jobs: 4,
        }
    }
}

impl Settings {
    /// Load from `path`, or from the platform config directory when `None`
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path.map(Path::to_path_buf).or_else(default_path) {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    /// Load from `path`; a missing file yields the defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!("No settings at {:?}, using defaults", path);
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read {}", path.display()))
            }
        };

        let settings: Settings = serde_json::from_str(&text)
            .with_context(|| format!("Invalid settings file {}", path.display()))?;
        if settings.jobs < 1 {
            bail!("jobs must be at least 1 in {}", path.display());
        }

        tracing::debug!("Loaded settings from {:?}", path);
        Ok(settings)
    }

    /// Write options after applying the `--no-*` flags
    pub fn write_options(
        &self,
        no_backup: bool,
        no_collection: bool,
        no_calibre: bool,
    ) -> WriteOptions {
        WriteOptions::default()
            .with_backup(self.backup && !no_backup)
            .with_collection(self.write_collection && !no_collection)
            .with_calibre(self.write_calibre && !no_calibre)
    }
}

/// `settings.json` inside the platform config directory
pub fn default_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("com", "seriesly", "Seriesly")
        .map(|dirs| dirs.config_dir().join("settings.json"))
}
