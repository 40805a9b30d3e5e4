//! Metadata extraction from a package document
//!
//! Series precedence: an EPUB3 `belongs-to-collection` meta wins, with its
//! index taken from the `group-position` meta refining it. Only when no
//! collection is present are the calibre `calibre:series` /
//! `calibre:series_index` metas consulted.

use crate::error::MetadataError;
use crate::types::{BookMetadata, SeriesSource, UNKNOWN};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

const COLLECTION: &str = "belongs-to-collection";
const GROUP_POSITION: &str = "group-position";
const CALIBRE_SERIES: &str = "calibre:series";
const CALIBRE_SERIES_INDEX: &str = "calibre:series_index";

/// A direct child element of the metadata block
#[derive(Debug, Clone, Default)]
struct MetadataChild {
    name: String,
    attributes: Vec<(String, String)>,
    text: String,
}

impl MetadataChild {
    fn from_start(e: &BytesStart<'_>) -> Self {
        let attributes = e
            .attributes()
            .flatten()
            .map(|attr| {
                let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
                let value = attr
                    .unescape_value()
                    .map(|v| v.into_owned())
                    .unwrap_or_else(|_| String::from_utf8_lossy(&attr.value).into_owned());
                (key, value.trim().to_string())
            })
            .collect();

        Self {
            name: String::from_utf8_lossy(e.name().as_ref()).into_owned(),
            attributes,
            text: String::new(),
        }
    }

    fn attr(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    fn text(&self) -> &str {
        self.text.trim()
    }

    fn is_meta(&self) -> bool {
        self.name == "meta" || self.name.ends_with(":meta")
    }

    /// Value of a calibre meta: `content` when present, the text otherwise
    fn calibre_value(&self) -> &str {
        match self.attr("content") {
            Some(content) if !content.is_empty() => content,
            _ => self.text(),
        }
    }
}

/// Extract title, author and series information from a package document
pub fn extract_metadata(document: &[u8]) -> Result<BookMetadata, MetadataError> {
    let children = metadata_children(document)?;

    let title = children
        .iter()
        .find(|c| c.name == "dc:title")
        .map(|c| c.text())
        .filter(|t| !t.is_empty())
        .unwrap_or(UNKNOWN)
        .to_string();

    let creators: Vec<&str> = children
        .iter()
        .filter(|c| c.name == "dc:creator")
        .map(|c| c.text())
        .collect();
    let author = if creators.is_empty() {
        UNKNOWN.to_string()
    } else {
        creators.join(", ")
    };

    let metas: Vec<&MetadataChild> = children.iter().filter(|c| c.is_meta()).collect();
    let (series, series_index, series_source) = series_from_metas(&metas);

    Ok(BookMetadata {
        title,
        author,
        series,
        series_index,
        series_source,
    })
}

fn series_from_metas(metas: &[&MetadataChild]) -> (String, String, SeriesSource) {
    let collection = metas
        .iter()
        .find(|m| m.attr("property") == Some(COLLECTION));

    if let Some(collection) = collection {
        let index = collection
            .attr("id")
            .and_then(|id| {
                let refines = format!("#{}", id);
                metas.iter().find(|m| {
                    m.attr("refines") == Some(refines.as_str())
                        && m.attr("property") == Some(GROUP_POSITION)
                })
            })
            .map(|m| m.text().to_string())
            .unwrap_or_default();
        return (collection.text().to_string(), index, SeriesSource::Epub3);
    }

    let calibre = |key: &str| {
        metas
            .iter()
            .find(|m| m.attr("name") == Some(key) || m.attr("property") == Some(key))
            .map(|m| m.calibre_value().to_string())
            .unwrap_or_default()
    };

    let series = calibre(CALIBRE_SERIES);
    let index = calibre(CALIBRE_SERIES_INDEX);
    let source = if series.is_empty() {
        SeriesSource::None
    } else {
        SeriesSource::Calibre
    };
    (series, index, source)
}

/// Check that a package document has at most one top-level metadata element
///
/// A document with no metadata element passes; the write path reports that
/// case itself.
pub fn verify_metadata_block(document: &[u8]) -> Result<(), MetadataError> {
    match metadata_children(document) {
        Ok(_) | Err(MetadataError::MissingMetadata) => Ok(()),
        Err(e) => Err(e),
    }
}

/// Collect the direct children of `package > metadata`
fn metadata_children(document: &[u8]) -> Result<Vec<MetadataChild>, MetadataError> {
    let mut reader = Reader::from_reader(document);
    let mut buf = Vec::new();

    let mut depth = 0usize;
    let mut root_is_package = false;
    let mut in_metadata = false;
    let mut metadata_count = 0usize;
    let mut current: Option<MetadataChild> = None;
    let mut children = Vec::new();

    loop {
        let event = reader.read_event_into(&mut buf).map_err(|e| {
            MetadataError::MalformedDocument(format!(
                "at position {}: {}",
                reader.buffer_position(),
                e
            ))
        })?;

        match event {
            Event::Start(e) => {
                depth += 1;
                match depth {
                    1 => root_is_package = e.local_name().as_ref() == b"package",
                    2 if root_is_package && e.local_name().as_ref() == b"metadata" => {
                        metadata_count += 1;
                        in_metadata = true;
                    }
                    3 if in_metadata => current = Some(MetadataChild::from_start(&e)),
                    _ => {}
                }
            }
            Event::Empty(e) => match depth + 1 {
                2 if root_is_package && e.local_name().as_ref() == b"metadata" => {
                    metadata_count += 1;
                }
                3 if in_metadata => children.push(MetadataChild::from_start(&e)),
                _ => {}
            },
            Event::End(_) => {
                match depth {
                    3 if in_metadata => children.extend(current.take()),
                    2 => in_metadata = false,
                    _ => {}
                }
                depth = depth.saturating_sub(1);
            }
            Event::Text(t) => {
                if let Some(child) = current.as_mut() {
                    match t.unescape() {
                        Ok(text) => child.text.push_str(&text),
                        Err(_) => child.text.push_str(&String::from_utf8_lossy(&t)),
                    }
                }
            }
            Event::CData(t) => {
                if let Some(child) = current.as_mut() {
                    child.text.push_str(&String::from_utf8_lossy(&t));
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    match metadata_count {
        0 => Err(MetadataError::MissingMetadata),
        1 => Ok(children),
        _ => Err(MetadataError::DuplicateMetadata),
    }
}
