//! Batch series command implementation

use anyhow::{bail, Result};
use clap::ValueEnum;
use indicatif::{ProgressBar, ProgressStyle};
use seriesly_core::batch::{
    auto_index, continue_index, save_batch_with, series_from_folder, set_series, SeriesEdit,
};
use seriesly_core::{BookRecord, WriteOptions};
use std::collections::HashMap;
use std::path::Path;

/// Where the series name of each book comes from
#[derive(Debug, Clone)]
pub enum Naming {
    /// The same name for every book
    Fixed(String),

    /// The name of the folder containing the book
    FromFolder,
}

/// How books in one series are numbered
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Numbering {
    /// Keep existing indices
    None,

    /// Number books consecutively from `--start`
    Auto,

    /// Keep the first book's index and continue after it
    Continue,
}

/// Set the series of every book in a directory
pub fn batch(
    dir: &Path,
    recursive: bool,
    naming: &Naming,
    numbering: Numbering,
    start: u32,
    dry_run: bool,
    options: &WriteOptions,
) -> Result<()> {
    if !dir.is_dir() {
        bail!("Not a directory: {}", dir.display());
    }

    let records = seriesly_core::scan(dir, recursive);
    if records.is_empty() {
        println!("No EPUB files found in {}", dir.display());
        return Ok(());
    }

    let edits = plan(&records, naming, numbering, start);
    let skipped = records.len() - edits.len();
    println!(
        "Found {} books, {} to update ({} unchanged)",
        records.len(),
        edits.len(),
        skipped
    );

    if dry_run {
        for edit in &edits {
            println!(
                "  {} -> {} #{}",
                edit.file_path.display(),
                edit.series,
                edit.series_index
            );
        }
        return Ok(());
    }

    if edits.is_empty() {
        return Ok(());
    }

    let progress = ProgressBar::new(edits.len() as u64);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos:>7}/{len:7} {msg}")?
            .progress_chars("##-"),
    );

    let report = save_batch_with(&edits, options, |edit, _| {
        if let Some(name) = edit.file_path.file_name() {
            progress.set_message(name.to_string_lossy().into_owned());
        }
        progress.inc(1);
    });
    progress.finish_and_clear();

    println!("\nBatch save complete:");
    println!("  Success: {}", report.succeeded());
    println!("  Errors:  {}", report.failed());
    for (path, reason) in &report.failed {
        println!("    {}: {}", path.display(), reason);
    }

    if !report.is_success() {
        bail!("Batch save completed with {} errors", report.failed());
    }

    Ok(())
}

/// Build the edits for `records`, keeping only books that change
///
/// Books are numbered per series, each series in path order.
fn plan(
    records: &[BookRecord],
    naming: &Naming,
    numbering: Numbering,
    start: u32,
) -> Vec<SeriesEdit> {
    let mut edits: Vec<SeriesEdit> = records.iter().map(SeriesEdit::from).collect();

    match naming {
        Naming::Fixed(name) => set_series(&mut edits, name),
        Naming::FromFolder => {
            for edit in edits.iter_mut() {
                edit.series = series_from_folder(&edit.file_path);
            }
        }
    }

    edits.sort_by(|a, b| a.series.cmp(&b.series));
    for group in edits.chunk_by_mut(|a, b| a.series == b.series) {
        match numbering {
            Numbering::None => {}
            Numbering::Auto => auto_index(group, start),
            Numbering::Continue => continue_index(group),
        }
    }

    let originals: HashMap<&Path, &BookRecord> = records
        .iter()
        .map(|record| (record.file_path.as_path(), record))
        .collect();
    edits.retain(|edit| {
        originals
            .get(edit.file_path.as_path())
            .is_some_and(|original| edit.is_modified(original))
    });
    edits
}

#[cfg(test)]
mod tests {
    use super::*;
    use seriesly_core::BookMetadata;

    fn record(path: &str, series: &str, index: &str) -> BookRecord {
        BookRecord::new(
            path,
            BookMetadata {
                series: series.to_string(),
                series_index: index.to_string(),
                ..Default::default()
            },
        )
    }

    #[test]
    fn test_plan_fixed_name_auto_numbering() {
        let records = vec![
            record("/b/1.epub", "", ""),
            record("/b/2.epub", "Dune", "2"),
            record("/b/3.epub", "", ""),
        ];
        let edits = plan(&records, &Naming::Fixed("Dune".into()), Numbering::Auto, 1);

        let planned: Vec<(&str, &str)> = edits
            .iter()
            .map(|e| (e.file_path.to_str().unwrap(), e.series_index.as_str()))
            .collect();
        assert_eq!(planned, vec![("/b/1.epub", "1"), ("/b/3.epub", "3")]);
    }

    #[test]
    fn test_plan_numbers_each_folder_separately() {
        let records = vec![
            record("/lib/Dune/a.epub", "", ""),
            record("/lib/Dune/b.epub", "", ""),
            record("/lib/Foundation/a.epub", "", ""),
        ];
        let edits = plan(&records, &Naming::FromFolder, Numbering::Auto, 1);

        assert_eq!(edits.len(), 3);
        assert_eq!(edits[1].series, "Dune");
        assert_eq!(edits[1].series_index, "2");
        assert_eq!(edits[2].series, "Foundation");
        assert_eq!(edits[2].series_index, "1");
    }

    #[test]
    fn test_plan_continue_keeps_first() {
        let records = vec![
            record("/s/1.epub", "Saga", "4"),
            record("/s/2.epub", "Saga", ""),
        ];
        let edits = plan(&records, &Naming::Fixed("Saga".into()), Numbering::Continue, 1);
        assert_eq!(edits.len(), 1);
        assert_eq!(edits[0].series_index, "5");
    }
}
