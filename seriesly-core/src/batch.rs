//! Batch edit planning and the batch save loop
//!
//! Edits are planned on [`SeriesEdit`] copies of scanned records and then
//! written with [`save_batch`], which keeps going past individual failures.

use crate::error::Result;
use crate::types::{BookRecord, SeriesUpdate, WriteOptions};
use crate::writer;
use regex::Regex;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

static LEADING_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[+-]?(?:\d+(?:\.\d*)?|\.\d+)").expect("valid number regex"));

/// Editable series fields of one book
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeriesEdit {
    pub file_path: PathBuf,
    pub series: String,
    pub series_index: String,
}

impl From<&BookRecord> for SeriesEdit {
    fn from(record: &BookRecord) -> Self {
        Self {
            file_path: record.file_path.clone(),
            series: record.metadata.series.clone(),
            series_index: record.metadata.series_index.clone(),
        }
    }
}

impl SeriesEdit {
    /// Whether series or index differ from the scanned record
    pub fn is_modified(&self, original: &BookRecord) -> bool {
        self.series != original.metadata.series
            || self.series_index != original.metadata.series_index
    }

    /// The update this edit writes
    pub fn to_update(&self) -> SeriesUpdate {
        SeriesUpdate::new(&self.series, Some(self.series_index.as_str()))
    }
}

/// Assign one series name to every edit
pub fn set_series(edits: &mut [SeriesEdit], name: &str) {
    for edit in edits.iter_mut() {
        edit.series = name.to_string();
    }
}

/// Number edits consecutively in order, starting at `start`
pub fn auto_index(edits: &mut [SeriesEdit], start: u32) {
    for (edit, index) in edits.iter_mut().zip(start..) {
        edit.series_index = index.to_string();
    }
}

/// Keep the first edit's index and continue numbering after it
///
/// The first index is read as a leading decimal number (`"2.5"` continues
/// at 3, anything unreadable counts as 0).
pub fn continue_index(edits: &mut [SeriesEdit]) {
    let Some((first, rest)) = edits.split_first_mut() else {
        return;
    };
    let mut next = (leading_number(&first.series_index).floor() as i64).saturating_add(1);
    for edit in rest {
        edit.series_index = next.to_string();
        next = next.saturating_add(1);
    }
}

fn leading_number(value: &str) -> f64 {
    LEADING_NUMBER
        .find(value.trim())
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .filter(|n| n.is_finite())
        .unwrap_or(0.0)
}

/// Name of the directory containing `path`, empty at the filesystem root
pub fn series_from_folder(path: &Path) -> String {
    path.parent()
        .and_then(|parent| parent.file_name())
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Outcome of [`save_batch`]
#[derive(Debug, Default, Serialize)]
pub struct BatchReport {
    pub succeeded: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, String)>,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.succeeded.len()
    }

    pub fn failed(&self) -> usize {
        self.failed.len()
    }

    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Save every edit in order, continuing past failures
pub fn save_batch(edits: &[SeriesEdit], options: &WriteOptions) -> BatchReport {
    save_batch_with(edits, options, |_, _| {})
}

/// [`save_batch`], calling `on_saved` after each file with its outcome
pub fn save_batch_with<F>(
    edits: &[SeriesEdit],
    options: &WriteOptions,
    mut on_saved: F,
) -> BatchReport
where
    F: FnMut(&SeriesEdit, &Result<()>),
{
    let mut report = BatchReport::default();

    for edit in edits {
        let result = writer::save(&edit.file_path, &edit.to_update(), options);
        on_saved(edit, &result);
        match result {
            Ok(()) => report.succeeded.push(edit.file_path.clone()),
            Err(e) => {
                tracing::error!("Failed to save {:?}: {}", edit.file_path, e);
                report.failed.push((edit.file_path.clone(), e.to_string()));
            }
        }
    }

    tracing::debug!(
        "Batch finished: {} saved, {} failed",
        report.succeeded(),
        report.failed()
    );
    report
}
