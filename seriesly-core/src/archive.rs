//! Zip container access with staged entry replacement
//!
//! The container is read fully into memory on open. Replacements are staged
//! in memory and only [`EpubArchive::commit`] touches the file on disk: it
//! writes a complete new archive next to the original and renames it into
//! place, so a failure at any step leaves the original container intact.
//! Entries that were not replaced are copied raw, byte for byte.

use crate::error::{ArchiveError, Result};
use std::collections::HashMap;
use std::fs;
use std::io::{Cursor, Read, Write};
use std::path::{Path, PathBuf};
use zip::result::ZipError;
use zip::write::FileOptions;
use zip::{ZipArchive, ZipWriter};

/// An open zip container
pub struct EpubArchive {
    path: PathBuf,
    archive: ZipArchive<Cursor<Vec<u8>>>,
    staged: HashMap<String, Vec<u8>>,
}

impl EpubArchive {
    /// Open the container at `path`
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(ArchiveError::NotAFile(path.to_path_buf()).into());
        }

        let data = fs::read(path)?;
        let archive = ZipArchive::new(Cursor::new(data))
            .map_err(|e| ArchiveError::CorruptArchive(e.to_string()))?;

        Ok(Self {
            path: path.to_path_buf(),
            archive,
            staged: HashMap::new(),
        })
    }

    /// Path the archive was opened from
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Entry names in archive order
    pub fn entry_names(&mut self) -> Result<Vec<String>> {
        let mut names = Vec::with_capacity(self.archive.len());
        for i in 0..self.archive.len() {
            let file = self
                .archive
                .by_index_raw(i)
                .map_err(|e| ArchiveError::CorruptArchive(e.to_string()))?;
            names.push(file.name().to_string());
        }
        Ok(names)
    }

    /// Whether `entry` exists in the archive (staged entries included)
    pub fn contains(&self, entry: &str) -> bool {
        self.staged.contains_key(entry) || self.archive.file_names().any(|name| name == entry)
    }

    /// Read the contents of `entry`, preferring a staged replacement
    pub fn read_entry(&mut self, entry: &str) -> Result<Vec<u8>> {
        if let Some(staged) = self.staged.get(entry) {
            return Ok(staged.clone());
        }

        let mut file = self.archive.by_name(entry).map_err(|e| match e {
            ZipError::FileNotFound => ArchiveError::EntryNotFound(entry.to_string()),
            other => ArchiveError::CorruptArchive(other.to_string()),
        })?;

        let mut content = Vec::with_capacity(file.size() as usize);
        file.read_to_end(&mut content)
            .map_err(|e| ArchiveError::CorruptArchive(format!("{}: {}", entry, e)))?;
        Ok(content)
    }

    /// Stage new contents for `entry`; nothing is written until commit
    pub fn replace_entry(&mut self, entry: impl Into<String>, content: Vec<u8>) {
        self.staged.insert(entry.into(), content);
    }

    /// Whether any replacement is staged
    pub fn is_modified(&self) -> bool {
        !self.staged.is_empty()
    }

    /// Write the archive back over the file it was opened from
    pub fn commit(self) -> Result<()> {
        let target = self.path.clone();
        self.commit_to(&target)
    }

    /// Write the archive, with staged replacements applied, to `target`
    ///
    /// The new archive is written to a temporary file in the target's
    /// directory and renamed over `target` once complete.
    pub fn commit_to(mut self, target: &Path) -> Result<()> {
        let dir = target
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));

        let temp = tempfile::Builder::new()
            .prefix(".seriesly-")
            .suffix(".tmp")
            .tempfile_in(dir)?;

        let mut writer = ZipWriter::new(temp);
        let mut pending = self.staged.clone();

        for i in 0..self.archive.len() {
            let file = self
                .archive
                .by_index_raw(i)
                .map_err(|e| ArchiveError::CorruptArchive(e.to_string()))?;

            match pending.remove(file.name()) {
                Some(content) => {
                    let name = file.name().to_string();
                    let mut options = FileOptions::default()
                        .compression_method(file.compression())
                        .last_modified_time(file.last_modified());
                    if let Some(mode) = file.unix_mode() {
                        options = options.unix_permissions(mode);
                    }
                    drop(file);

                    writer.start_file(name, options).map_err(write_error)?;
                    writer.write_all(&content)?;
                }
                None => writer.raw_copy_file(file).map_err(write_error)?,
            }
        }

        // Entries staged under a name the archive did not have go last, sorted
        // so the output does not depend on hash order.
        let mut added: Vec<_> = pending.into_iter().collect();
        added.sort_by(|a, b| a.0.cmp(&b.0));
        for (name, content) in added {
            writer
                .start_file(name, FileOptions::default())
                .map_err(write_error)?;
            writer.write_all(&content)?;
        }

        writer.set_raw_comment(self.archive.comment().to_vec());
        let temp = writer.finish().map_err(write_error)?;

        if let Ok(metadata) = fs::metadata(target) {
            temp.as_file().set_permissions(metadata.permissions())?;
        }
        temp.as_file().sync_all()?;
        temp.persist(target).map_err(|e| e.error)?;

        tracing::debug!("Committed archive {:?}", target);
        Ok(())
    }
}

fn write_error(err: ZipError) -> crate::error::SerieslyError {
    match err {
        ZipError::Io(io) => io.into(),
        other => ArchiveError::CorruptArchive(other.to_string()).into(),
    }
}
