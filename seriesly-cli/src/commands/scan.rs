//! Scan command implementation

use super::source_label;
use anyhow::{bail, Result};
use seriesly_core::BookRecord;
use std::path::Path;

/// List every book in a directory with its series information
pub fn scan(dir: &Path, recursive: bool, json: bool, jobs: usize) -> Result<()> {
    if !dir.is_dir() {
        bail!("Not a directory: {}", dir.display());
    }

    // Configure thread pool
    rayon::ThreadPoolBuilder::new()
        .num_threads(jobs)
        .build_global()
        .ok(); // Ignore if already configured

    let records = seriesly_core::scan(dir, recursive);
    tracing::debug!("Scanned {} books in {:?}", records.len(), dir);

    if json {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    if records.is_empty() {
        println!("No EPUB files found in {}", dir.display());
        return Ok(());
    }

    println!(
        "{:<32} {:<32} {:<24} {:<24} {:>6}  {}",
        "FILE", "TITLE", "AUTHOR", "SERIES", "INDEX", "SOURCE"
    );
    for record in &records {
        print_row(record);
    }
    println!("\n{} books", records.len());

    Ok(())
}

fn print_row(record: &BookRecord) {
    let meta = &record.metadata;
    println!(
        "{:<32} {:<32} {:<24} {:<24} {:>6}  {}",
        truncate(&record.file_name, 32),
        truncate(&meta.title, 32),
        truncate(&meta.author, 24),
        truncate(&meta.series, 24),
        meta.series_index,
        source_label(meta.series_source)
    );
}

fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        s.to_string()
    } else {
        let mut out: String = s.chars().take(width - 1).collect();
        out.push('~');
        out
    }
}
