//! Error types for Seriesly Core

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using SerieslyError
pub type Result<T> = std::result::Result<T, SerieslyError>;

/// Top-level error type for all Seriesly operations
#[derive(Debug, Error)]
pub enum SerieslyError {
    #[error("Archive error: {0}")]
    Archive(#[from] ArchiveError),

    #[error("Container error: {0}")]
    Container(#[from] ContainerError),

    #[error("Metadata error: {0}")]
    Metadata(#[from] MetadataError),

    #[error("Injection error: {0}")]
    Inject(#[from] InjectError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while opening, reading or committing a zip container
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("Not a file: {}", .0.display())]
    NotAFile(PathBuf),

    #[error("Corrupt archive: {0}")]
    CorruptArchive(String),

    #[error("Entry not found: {0}")]
    EntryNotFound(String),
}

/// Errors raised while resolving the package document from `META-INF/container.xml`
#[derive(Debug, Error)]
pub enum ContainerError {
    #[error("Missing META-INF/container.xml")]
    MissingContainer,

    #[error("Malformed container descriptor: {0}")]
    MalformedContainer(String),

    #[error("No rootfile with a full-path attribute declared")]
    MissingRootfile,

    #[error("Package document not found in archive: {0}")]
    MissingPackageDocument(String),
}

/// Errors raised while extracting metadata from a package document
#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("Malformed package document: {0}")]
    MalformedDocument(String),

    #[error("Package document has no metadata element")]
    MissingMetadata,

    #[error("Package document has more than one metadata element")]
    DuplicateMetadata,
}

/// Errors raised while rewriting the metadata block of a package document
#[derive(Debug, Error)]
pub enum InjectError {
    #[error("Package document is not valid text: {0}")]
    DecodeError(String),

    #[error("Package document has no balanced metadata tag pair")]
    MissingMetadataTag,
}
