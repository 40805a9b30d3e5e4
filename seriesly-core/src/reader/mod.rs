//! Read path: file discovery, metadata extraction and directory scans

mod metadata;

pub use metadata::{extract_metadata, verify_metadata_block};

use crate::archive::EpubArchive;
use crate::container::resolve_existing_package_path;
use crate::error::Result;
use crate::types::BookRecord;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Read one container's metadata, propagating every failure
pub fn read_book(path: impl AsRef<Path>) -> Result<BookRecord> {
    let path = path.as_ref();
    let mut archive = EpubArchive::open(path)?;
    let opf_path = resolve_existing_package_path(&mut archive)?;
    let document = archive.read_entry(&opf_path)?;
    let metadata = extract_metadata(&document)?;
    Ok(BookRecord::new(path, metadata))
}

/// Read one container's metadata, falling back to a default record on failure
pub fn read_book_lenient(path: impl AsRef<Path>) -> BookRecord {
    let path = path.as_ref();
    match read_book(path) {
        Ok(record) => record,
        Err(e) => {
            tracing::warn!("Using default metadata for {:?}: {}", path, e);
            BookRecord::unknown(path)
        }
    }
}

/// Find `.epub` files in `dir`, sorted by path
///
/// Symlinked directories are not followed. A missing or unreadable directory
/// yields no files.
pub fn discover(dir: impl AsRef<Path>, recursive: bool) -> Vec<PathBuf> {
    let mut walker = WalkDir::new(dir.as_ref()).min_depth(1).follow_links(false);
    if !recursive {
        walker = walker.max_depth(1);
    }

    let mut files: Vec<PathBuf> = walker
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::debug!("Skipping: {}", e);
                None
            }
        })
        .map(|entry| entry.into_path())
        .filter(|path| path.is_file() && is_epub(path))
        .collect();
    files.sort();
    files
}

/// Whether `path` has an `.epub` extension (case-insensitive)
pub fn is_epub(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("epub"))
        .unwrap_or(false)
}

/// Scan `dir` for containers and read each one's metadata
///
/// Files are read in parallel. A file that cannot be read yields a default
/// record; the scan itself never fails.
pub fn scan(dir: impl AsRef<Path>, recursive: bool) -> Vec<BookRecord> {
    let files = discover(dir, recursive);
    tracing::debug!("Scanning {} files", files.len());
    files.par_iter().map(|path| read_book_lenient(path)).collect()
}
