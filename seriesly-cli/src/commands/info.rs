//! Info command implementation

use super::source_label;
use anyhow::{Context, Result};
use std::path::Path;

/// Display the metadata of one book
pub fn info(input: &Path, json: bool) -> Result<()> {
    let record = seriesly_core::read_book(input)
        .with_context(|| format!("Failed to read {}", input.display()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&record)?);
        return Ok(());
    }

    let meta = &record.metadata;
    println!("File:    {}", record.file_name);
    println!("Title:   {}", meta.title);
    println!("Author:  {}", meta.author);
    if meta.has_series() {
        if meta.series_index.is_empty() {
            println!("Series:  {}", meta.series);
        } else {
            println!("Series:  {} #{}", meta.series, meta.series_index);
        }
        println!("Source:  {}", source_label(meta.series_source));
    } else if !meta.series_index.is_empty() {
        println!("Series:  (none) #{}", meta.series_index);
    } else {
        println!("Series:  (none)");
    }

    Ok(())
}
