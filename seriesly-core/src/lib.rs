//! Seriesly Core Library
//!
//! Reads and writes book-series metadata inside EPUB containers. Reading
//! recognises both the EPUB3 collection vocabulary and the calibre meta
//! convention; writing rewrites only the series-related span of the package
//! document and copies every other archive entry through untouched.

pub mod archive;
pub mod batch;
pub mod container;
pub mod error;
pub mod reader;
pub mod types;
pub mod writer;

pub use batch::{save_batch, save_batch_with, BatchReport, SeriesEdit};
pub use error::{
    ArchiveError, ContainerError, InjectError, MetadataError, Result, SerieslyError,
};
pub use reader::{read_book, read_book_lenient, scan};
pub use types::{BookMetadata, BookRecord, SeriesSource, SeriesUpdate, WriteOptions, UNKNOWN};
pub use writer::save;
