//! Inputs to a series write

use serde::{Deserialize, Serialize};

/// Target series values for a write
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeriesUpdate {
    /// Series name; empty clears every series tag
    pub series: String,

    /// Position in series; `None` when absent
    pub index: Option<String>,
}

impl SeriesUpdate {
    /// Create an update, trimming both values and treating an empty index as absent
    pub fn new(series: impl AsRef<str>, index: Option<&str>) -> Self {
        let index = index
            .map(str::trim)
            .filter(|index| !index.is_empty())
            .map(str::to_string);
        Self {
            series: series.as_ref().trim().to_string(),
            index,
        }
    }

    /// An update that removes all series information
    pub fn clear() -> Self {
        Self::default()
    }

    /// True when this update removes the series
    pub fn is_clear(&self) -> bool {
        self.series.is_empty()
    }
}

/// How a series write touches the container
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct WriteOptions {
    /// Copy the container to `<path>.bak` before mutating it
    pub backup: bool,

    /// Write the EPUB3 collection elements
    pub write_collection: bool,

    /// Write the calibre meta elements
    pub write_calibre: bool,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            backup: true,
            write_collection: true,
            write_calibre: true,
        }
    }
}

impl WriteOptions {
    pub fn with_backup(mut self, backup: bool) -> Self {
        self.backup = backup;
        self
    }

    pub fn with_collection(mut self, write_collection: bool) -> Self {
        self.write_collection = write_collection;
        self
    }

    pub fn with_calibre(mut self, write_calibre: bool) -> Self {
        self.write_calibre = write_calibre;
        self
    }
}
