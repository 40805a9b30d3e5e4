//! CLI command implementations

mod batch;
mod info;
mod save;
mod scan;

pub use batch::{batch, Naming, Numbering};
pub use info::info;
pub use save::save;
pub use scan::scan;

use seriesly_core::SeriesSource;

/// Short label for where a series came from
pub(crate) fn source_label(source: SeriesSource) -> &'static str {
    match source {
        SeriesSource::Epub3 => "EPUB3",
        SeriesSource::Calibre => "calibre",
        SeriesSource::None => "-",
    }
}
