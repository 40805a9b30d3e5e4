//! Write path: series injection and the per-file save sequence

mod inject;

pub use inject::{inject_series, locate_metadata, xml_escape, MetadataSpan};

use crate::archive::EpubArchive;
use crate::container::resolve_existing_package_path;
use crate::error::Result;
use crate::reader::verify_metadata_block;
use crate::types::{SeriesUpdate, WriteOptions};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

/// Write series information into the container at `path`
///
/// Steps run in order and any failure aborts the save: open the archive,
/// resolve and read the package document, reject a document with more than
/// one top-level metadata element, copy the container to its backup
/// path when requested, inject the series tags, then commit. All fallible
/// work before the commit happens in memory, so a failure leaves the
/// container untouched. A backup that was written is kept either way.
pub fn save(path: impl AsRef<Path>, update: &SeriesUpdate, options: &WriteOptions) -> Result<()> {
    let path = path.as_ref();

    let mut archive = EpubArchive::open(path)?;
    let opf_path = resolve_existing_package_path(&mut archive)?;
    let document = archive.read_entry(&opf_path)?;
    verify_metadata_block(&document)?;

    if options.backup {
        let backup = backup_path(path);
        fs::copy(path, &backup)?;
        tracing::info!("Backed up {:?} -> {:?}", path, backup);
    }

    let updated = inject_series(&document, update, options)?;
    archive.replace_entry(opf_path, updated);
    archive.commit()?;

    if update.is_clear() {
        tracing::info!("Cleared series in {:?}", path);
    } else {
        tracing::info!(
            "Saved series '{}' #{} to {:?}",
            update.series,
            update.index.as_deref().unwrap_or("-"),
            path
        );
    }
    Ok(())
}

/// Sibling path the backup of `path` is written to: `<path>.bak`
pub fn backup_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".bak");
    PathBuf::from(name)
}
