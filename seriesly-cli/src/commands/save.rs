//! Save command implementation

use anyhow::{Context, Result};
use seriesly_core::{SeriesUpdate, WriteOptions};
use std::path::Path;

/// Write series information into one book
pub fn save(
    input: &Path,
    series: Option<&str>,
    index: Option<&str>,
    options: &WriteOptions,
) -> Result<()> {
    let update = SeriesUpdate::new(series.unwrap_or_default(), index);

    seriesly_core::save(input, &update, options)
        .with_context(|| format!("Failed to save {}", input.display()))?;

    if update.is_clear() {
        println!("Cleared series in {}", input.display());
    } else {
        match &update.index {
            Some(index) => println!("Saved {} #{} to {}", update.series, index, input.display()),
            None => println!("Saved {} to {}", update.series, input.display()),
        }
    }
    if options.backup {
        tracing::info!(
            "Backup at {:?}",
            seriesly_core::writer::backup_path(input)
        );
    }

    Ok(())
}
