//! Book record types produced by a scan

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Placeholder used for a missing title or author
pub const UNKNOWN: &str = "Unknown";

/// Which metadata convention supplied a book's series value
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum SeriesSource {
    /// EPUB3 `belongs-to-collection` meta element
    Epub3,

    /// Calibre `calibre:series` meta element
    Calibre,

    /// No series present
    #[default]
    None,
}

/// Metadata fields extracted from a package document
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BookMetadata {
    /// Book title
    pub title: String,

    /// Authors joined with ", " in document order
    pub author: String,

    /// Series name, empty when absent
    pub series: String,

    /// Position in series in its original textual form (may be fractional)
    pub series_index: String,

    /// Convention the series was read from
    pub series_source: SeriesSource,
}

impl Default for BookMetadata {
    fn default() -> Self {
        Self {
            title: UNKNOWN.to_string(),
            author: UNKNOWN.to_string(),
            series: String::new(),
            series_index: String::new(),
            series_source: SeriesSource::None,
        }
    }
}

impl BookMetadata {
    /// True when the book belongs to a series
    pub fn has_series(&self) -> bool {
        !self.series.is_empty()
    }
}

/// One discovered container file and its metadata
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BookRecord {
    /// Path of the container file, unique per record
    pub file_path: PathBuf,

    /// Display name (the final path component)
    pub file_name: String,

    #[serde(flatten)]
    pub metadata: BookMetadata,
}

impl BookRecord {
    /// Create a record with the given metadata
    pub fn new(file_path: impl Into<PathBuf>, metadata: BookMetadata) -> Self {
        let file_path = file_path.into();
        let file_name = display_name(&file_path);
        Self {
            file_path,
            file_name,
            metadata,
        }
    }

    /// Create a best-effort record with default metadata
    pub fn unknown(file_path: impl Into<PathBuf>) -> Self {
        Self::new(file_path, BookMetadata::default())
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}
