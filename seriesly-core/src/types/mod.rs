//! Core types shared by the read and write paths

mod options;
mod record;

pub use options::{SeriesUpdate, WriteOptions};
pub use record::{BookMetadata, BookRecord, SeriesSource, UNKNOWN};
