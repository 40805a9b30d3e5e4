//! Minimal-diff series injection
//!
//! The package document is treated as text with well-defined splice points,
//! never re-serialized. Only the metadata body is touched: every series tag
//! either convention may have written is cut out together with the
//! whitespace run preceding it, and fresh tags are inserted at the top of the
//! body using the body's own indentation and line endings. All other bytes of
//! the document come through unchanged.
//!
//! Injecting the same values twice yields byte-identical output: the cut
//! removes exactly what the insertion adds, and the collection id is derived
//! from the series name rather than drawn at random.

use crate::error::InjectError;
use crate::types::{SeriesUpdate, WriteOptions};
use regex::Regex;
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::ops::Range;
use std::sync::LazyLock;

/// Bytes of body inspected when detecting indentation
const INDENT_SAMPLE: usize = 200;
const DEFAULT_INDENT: &str = "  ";

static XML_DECL_ENCODING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\x{FEFF}?\s*<\?xml[^>]*?\bencoding\s*=\s*["']([^"']+)["']"#)
        .expect("valid encoding regex")
});

static METADATA_OPEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)<([A-Za-z_][\w.\-]*:)?metadata(?:\s[^>]*)?>").expect("valid metadata regex")
});

static CALIBRE_ELEMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\s*<\s*calibre:series(?:_index)?\b[^>]*?(?:/>|>[\s\S]*?<\s*/\s*calibre:series(?:_index)?\s*>)",
    )
    .expect("valid calibre element regex")
});

static SERIES_META: LazyLock<Regex> = LazyLock::new(|| {
    let keys = "(?:calibre:series|calibre:series_index|belongs-to-collection|collection-type|group-position)";
    Regex::new(&format!(
        r#"(?i)\s*<\s*(?:[A-Za-z_][\w.\-]*:)?meta\b[^>]*?\b(?:name|property)\s*=\s*(?:"{keys}"|'{keys}')[^>]*?(?:/>|>[\s\S]*?<\s*/\s*(?:[A-Za-z_][\w.\-]*:)?meta\s*>)"#
    ))
    .expect("valid series meta regex")
});

static ID_ATTRIBUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\bid\s*=\s*(?:"([^"]*)"|'([^']*)')"#).expect("valid id regex")
});

static INDENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n([ \t]+)").expect("valid indent regex"));

/// Byte ranges of the metadata element inside a package document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataSpan {
    /// The opening tag, including any namespace prefix and attributes
    pub open: Range<usize>,

    /// Everything between the opening and closing tags
    pub body: Range<usize>,

    /// The closing tag
    pub close: Range<usize>,
}

/// Locate the first balanced metadata element in `text`
///
/// The closing tag must carry the same namespace prefix as the opening tag,
/// and the body ends at the first such closing tag.
pub fn locate_metadata(text: &str) -> Option<MetadataSpan> {
    for open in METADATA_OPEN.captures_iter(text) {
        let whole = open.get(0)?;
        if whole.as_str().ends_with("/>") {
            continue;
        }

        let prefix = open.get(1).map(|p| p.as_str()).unwrap_or("");
        let close_pattern = format!(r"(?i)<\s*/\s*{}metadata\s*>", regex::escape(prefix));
        let close_re = Regex::new(&close_pattern).ok()?;

        if let Some(close) = close_re.find_at(text, whole.end()) {
            return Some(MetadataSpan {
                open: whole.range(),
                body: whole.end()..close.start(),
                close: close.range(),
            });
        }
    }
    None
}

/// Rewrite the series tags of a package document
///
/// An empty series removes every series tag. `options.write_collection` and
/// `options.write_calibre` select which conventions are written; stale tags
/// of both conventions are always removed.
pub fn inject_series(
    document: &[u8],
    update: &SeriesUpdate,
    options: &WriteOptions,
) -> Result<Vec<u8>, InjectError> {
    let text = decode(document)?;
    let span = locate_metadata(text).ok_or(InjectError::MissingMetadataTag)?;

    let body = &text[span.body.clone()];
    let removed = CALIBRE_ELEMENT.find_iter(body).count();
    let without_calibre = CALIBRE_ELEMENT.replace_all(body, "");
    let removed = removed + SERIES_META.find_iter(&without_calibre).count();
    let cleaned = SERIES_META.replace_all(&without_calibre, "").into_owned();

    let newline = if cleaned.contains("\r\n") { "\r\n" } else { "\n" };
    let rest = if cleaned.starts_with('\n') || cleaned.starts_with("\r\n") {
        cleaned.clone()
    } else {
        format!("{}{}", newline, cleaned)
    };

    let taken = existing_ids(&[
        &text[..span.body.start],
        cleaned.as_str(),
        &text[span.body.end..],
    ]);
    let insertion = build_insertion(update, options, newline, detect_indent(&rest), &taken);

    let new_body = if insertion.is_empty() {
        cleaned
    } else {
        insertion + &rest
    };

    tracing::debug!(
        "Removed {} series tags, wrote {} bytes of new tags",
        removed,
        new_body.len().saturating_sub(rest.len())
    );

    let mut output = String::with_capacity(text.len() + new_body.len());
    output.push_str(&text[..span.body.start]);
    output.push_str(&new_body);
    output.push_str(&text[span.body.end..]);
    Ok(output.into_bytes())
}

fn decode(document: &[u8]) -> Result<&str, InjectError> {
    let text = std::str::from_utf8(document)
        .map_err(|e| InjectError::DecodeError(format!("invalid UTF-8: {}", e)))?;

    if let Some(caps) = XML_DECL_ENCODING.captures(text) {
        let declared = caps[1].trim().to_ascii_lowercase();
        if !matches!(declared.as_str(), "utf-8" | "utf8" | "us-ascii" | "ascii") {
            return Err(InjectError::DecodeError(format!(
                "unsupported declared encoding {}",
                &caps[1]
            )));
        }
    }
    Ok(text)
}

/// Indentation of the first indented line within the first bytes of `body`
fn detect_indent(body: &str) -> &str {
    let mut end = body.len().min(INDENT_SAMPLE);
    while !body.is_char_boundary(end) {
        end -= 1;
    }

    INDENT
        .captures(&body[..end])
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .unwrap_or(DEFAULT_INDENT)
}

fn existing_ids(parts: &[&str]) -> HashSet<String> {
    parts
        .iter()
        .flat_map(|part| ID_ATTRIBUTE.captures_iter(part))
        .filter_map(|caps| caps.get(1).or_else(|| caps.get(2)))
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Derive a collection id from the series name that no element already uses
fn collection_id(series: &str, taken: &HashSet<String>) -> String {
    (0u64..)
        .map(|attempt| {
            let mut hasher = Sha256::new();
            hasher.update(series.as_bytes());
            hasher.update(attempt.to_le_bytes());
            let digest = hasher.finalize();

            let mut word = [0u8; 8];
            word.copy_from_slice(&digest[..8]);
            let draw = u64::from_le_bytes(word);

            // Five digits as long as that range has room, then the full width.
            if attempt < 64 {
                format!("col{}", 10_000 + draw % 90_000)
            } else {
                format!("col{}", draw)
            }
        })
        .find(|candidate| !taken.contains(candidate))
        .unwrap_or_else(|| "col".to_string())
}

fn build_insertion(
    update: &SeriesUpdate,
    options: &WriteOptions,
    newline: &str,
    indent: &str,
    taken: &HashSet<String>,
) -> String {
    if update.series.is_empty() {
        return String::new();
    }

    let mut lines = Vec::new();
    let series = xml_escape(&update.series);
    let index = update.index.as_deref().map(xml_escape);

    if options.write_collection {
        let id = collection_id(&update.series, taken);
        lines.push(format!(
            r#"<meta property="belongs-to-collection" id="{}">{}</meta>"#,
            id, series
        ));
        lines.push(format!(
            r##"<meta refines="#{}" property="collection-type">series</meta>"##,
            id
        ));
        if let Some(index) = &index {
            lines.push(format!(
                r##"<meta refines="#{}" property="group-position">{}</meta>"##,
                id, index
            ));
        }
    }

    if options.write_calibre {
        lines.push(format!(r#"<meta name="calibre:series" content="{}" />"#, series));
        if let Some(index) = &index {
            lines.push(format!(
                r#"<meta name="calibre:series_index" content="{}" />"#,
                index
            ));
        }
    }

    lines
        .iter()
        .map(|line| format!("{}{}{}", newline, indent, line))
        .collect()
}

/// Escape XML special characters
pub fn xml_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="3.0" unique-identifier="uid">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
    <dc:identifier id="uid">urn:uuid:1234</dc:identifier>
    <dc:title>Foundation and Empire</dc:title>
    <!-- keep me -->
    <dc:creator>Isaac Asimov</dc:creator>
  </metadata>
  <manifest/>
</package>
"#;

    fn both() -> WriteOptions {
        WriteOptions::default()
    }

    fn inject(doc: &str, series: &str, index: Option<&str>, options: WriteOptions) -> String {
        let out = inject_series(doc.as_bytes(), &SeriesUpdate::new(series, index), &options)
            .unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_locate_plain_metadata() {
        let span = locate_metadata(DOC).unwrap();
        assert!(DOC[span.open.clone()].starts_with("<metadata xmlns:dc"));
        assert_eq!(&DOC[span.close.clone()], "</metadata>");
        assert!(DOC[span.body.clone()].contains("<dc:title>"));
    }

    #[test]
    fn test_locate_prefixed_metadata_needs_matching_close() {
        let doc = "<opf:package><opf:metadata a=\"1\"><dc:title>x</dc:title></opf:metadata></opf:package>";
        let span = locate_metadata(doc).unwrap();
        assert_eq!(&doc[span.open.clone()], "<opf:metadata a=\"1\">");
        assert_eq!(&doc[span.close.clone()], "</opf:metadata>");

        let mismatched = "<opf:metadata><dc:title>x</dc:title></metadata>";
        assert!(locate_metadata(mismatched).is_none());
    }

    #[test]
    fn test_locate_stops_at_first_close() {
        let doc = "<package><metadata>a</metadata><collection><metadata>b</metadata></collection></package>";
        let span = locate_metadata(doc).unwrap();
        assert_eq!(&doc[span.body], "a");
    }

    #[test]
    fn test_locate_ignores_lookalike_elements() {
        assert!(locate_metadata("<package><metadata-extra>x</metadata-extra></package>").is_none());
        assert!(locate_metadata("<package><metadata/></package>").is_none());
    }

    #[test]
    fn test_missing_metadata_tag() {
        let result = inject_series(
            b"<package><manifest/></package>",
            &SeriesUpdate::new("X", None),
            &both(),
        );
        assert!(matches!(result, Err(InjectError::MissingMetadataTag)));
    }

    #[test]
    fn test_invalid_utf8_is_decode_error() {
        let result = inject_series(
            b"<package><metadata>\xff\xfe</metadata></package>",
            &SeriesUpdate::new("X", None),
            &both(),
        );
        assert!(matches!(result, Err(InjectError::DecodeError(_))));
    }

    #[test]
    fn test_declared_foreign_encoding_is_decode_error() {
        let doc = "<?xml version=\"1.0\" encoding=\"ISO-8859-1\"?><package><metadata></metadata></package>";
        let result = inject_series(doc.as_bytes(), &SeriesUpdate::new("X", None), &both());
        assert!(matches!(result, Err(InjectError::DecodeError(_))));
    }

    #[test]
    fn test_inserts_both_conventions_with_detected_indent() {
        let out = inject(DOC, "Foundation", Some("2"), both());
        let span = locate_metadata(&out).unwrap();
        let body = &out[span.body];
        let lines: Vec<&str> = body.lines().collect();

        assert_eq!(lines[0], "");
        assert!(lines[1].starts_with(r#"    <meta property="belongs-to-collection" id="col"#));
        assert!(lines[1].ends_with(">Foundation</meta>"));
        assert!(lines[2].ends_with(r#"property="collection-type">series</meta>"#));
        assert!(lines[3].ends_with(r#"property="group-position">2</meta>"#));
        assert_eq!(lines[4], r#"    <meta name="calibre:series" content="Foundation" />"#);
        assert_eq!(lines[5], r#"    <meta name="calibre:series_index" content="2" />"#);
        assert_eq!(lines[6], r#"    <dc:identifier id="uid">urn:uuid:1234</dc:identifier>"#);
    }

    #[test]
    fn test_refines_links_to_generated_id() {
        let out = inject(DOC, "Foundation", Some("2"), both().with_calibre(false));
        let id = ID_ATTRIBUTE
            .captures_iter(&out)
            .filter_map(|c| c.get(1).map(|m| m.as_str().to_string()))
            .find(|id| id.starts_with("col"))
            .unwrap();
        assert_eq!(out.matches(&format!("refines=\"#{}\"", id)).count(), 2);
    }

    #[test]
    fn test_untouched_document_outside_body() {
        let out = inject(DOC, "Foundation", Some("2"), both());
        let before = locate_metadata(DOC).unwrap();
        let after = locate_metadata(&out).unwrap();
        assert_eq!(&DOC[..before.body.start], &out[..after.body.start]);
        assert_eq!(&DOC[before.body.end..], &out[after.body.end..]);
    }

    #[test]
    fn test_injection_is_idempotent() {
        let once = inject(DOC, "Foundation", Some("2"), both());
        let twice = inject(&once, "Foundation", Some("2"), both());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_clearing_restores_original_body() {
        let once = inject(DOC, "Foundation", Some("2"), both());
        let cleared = inject(&once, "", None, both());
        assert_eq!(cleared, DOC);
    }

    #[test]
    fn test_clearing_untagged_document_is_noop() {
        assert_eq!(inject(DOC, "", None, both()), DOC);
    }

    #[test]
    fn test_removes_all_legacy_forms() {
        let doc = r##"<package><metadata>
  <dc:title>T</dc:title>
  <calibre:series>Old</calibre:series>
  <calibre:series_index>1</calibre:series_index>
  <meta name="calibre:series" content="Old"/>
  <meta name='calibre:series_index' content='1' />
  <meta property="calibre:series">Old</meta>
  <META PROPERTY="belongs-to-collection" id="c1">Old</META>
  <meta refines="#c1" property="collection-type">series</meta>
  <meta refines="#c1" property="group-position">1</meta>
  <meta name="cover" content="cover-image"/>
</metadata></package>"##;
        let out = inject(doc, "", None, both());
        assert_eq!(
            out,
            "<package><metadata>\n  <dc:title>T</dc:title>\n  <meta name=\"cover\" content=\"cover-image\"/>\n</metadata></package>"
        );
    }

    #[test]
    fn test_flag_isolation_calibre_only() {
        let once = inject(DOC, "Foundation", Some("2"), both());
        let calibre_only = inject(
            &once,
            "Foundation",
            Some("2"),
            both().with_collection(false),
        );
        assert!(!calibre_only.contains("belongs-to-collection"));
        assert!(!calibre_only.contains("collection-type"));
        assert!(!calibre_only.contains("group-position"));
        assert!(calibre_only.contains(r#"<meta name="calibre:series" content="Foundation" />"#));
    }

    #[test]
    fn test_index_omitted_when_absent() {
        let out = inject(DOC, "Foundation", None, both());
        assert!(!out.contains("group-position"));
        assert!(!out.contains("calibre:series_index"));
        assert!(out.contains("collection-type"));
    }

    #[test]
    fn test_values_are_escaped() {
        let out = inject(DOC, "Tom & Jerry's <Best>", Some("1\"2"), both());
        assert!(out.contains(">Tom &amp; Jerry&apos;s &lt;Best&gt;</meta>"));
        assert!(out.contains(r#"content="Tom &amp; Jerry&apos;s &lt;Best&gt;""#));
        assert!(out.contains(r#"content="1&quot;2""#));
        assert_eq!(once_more(&out, "Tom & Jerry's <Best>", Some("1\"2")), out);
    }

    fn once_more(doc: &str, series: &str, index: Option<&str>) -> String {
        inject(doc, series, index, both())
    }

    #[test]
    fn test_single_line_metadata_gets_default_indent() {
        let doc = "<package><metadata><dc:title>T</dc:title></metadata></package>";
        let out = inject(doc, "S", None, both().with_collection(false));
        assert_eq!(
            out,
            "<package><metadata>\n  <meta name=\"calibre:series\" content=\"S\" />\n<dc:title>T</dc:title></metadata></package>"
        );
        assert_eq!(inject(&out, "S", None, both().with_collection(false)), out);
    }

    #[test]
    fn test_crlf_bodies_get_crlf_lines() {
        let doc = "<package>\r\n<metadata>\r\n\t<dc:title>T</dc:title>\r\n</metadata>\r\n</package>";
        let out = inject(doc, "S", Some("3"), both().with_collection(false));
        assert_eq!(
            out,
            "<package>\r\n<metadata>\r\n\t<meta name=\"calibre:series\" content=\"S\" />\r\n\t<meta name=\"calibre:series_index\" content=\"3\" />\r\n\t<dc:title>T</dc:title>\r\n</metadata>\r\n</package>"
        );
    }

    #[test]
    fn test_collection_id_avoids_existing_ids() {
        let mut taken = HashSet::new();
        let first = collection_id("Foundation", &taken);
        assert!(first.starts_with("col"));
        assert_eq!(collection_id("Foundation", &taken), first);

        taken.insert(first.clone());
        let second = collection_id("Foundation", &taken);
        assert_ne!(first, second);
    }

    #[test]
    fn test_generated_id_skips_id_already_in_document() {
        let taken = HashSet::new();
        let expected = collection_id("Foundation", &taken);
        let doc = DOC.replace(
            "<dc:creator>",
            &format!("<dc:creator id=\"{}\">", expected),
        );

        let out = inject(&doc, "Foundation", None, both().with_calibre(false));
        assert!(!out.contains(&format!("property=\"belongs-to-collection\" id=\"{}\"", expected)));
    }

    const PREFIXED_DOC: &str = r##"<?xml version="1.0" encoding="UTF-8"?>
<opf:package xmlns:opf="http://www.idpf.org/2007/opf" version="3.0">
  <opf:metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
    <dc:title>Prefixed</dc:title>
    <opf:meta property="belongs-to-collection" id="c9">Old</opf:meta>
    <opf:meta refines="#c9" property="group-position">4</opf:meta>
    <opf:meta name="calibre:series" content="Old"/>
    <opf:meta name="calibre:series_index" content="4"/>
    <opf:meta name="cover" content="cover-image"/>
  </opf:metadata>
</opf:package>
"##;

    #[test]
    fn test_clearing_removes_prefixed_meta_elements() {
        let out = inject(PREFIXED_DOC, "", None, both());
        assert!(!out.contains("Old"));
        assert!(out.contains(r#"<opf:meta name="cover" content="cover-image"/>"#));

        let meta = crate::reader::extract_metadata(out.as_bytes()).unwrap();
        assert_eq!(meta.series, "");
        assert_eq!(meta.series_index, "");
        assert_eq!(meta.series_source, crate::types::SeriesSource::None);
    }

    #[test]
    fn test_rewriting_prefixed_document_is_idempotent() {
        let once = inject(PREFIXED_DOC, "New", Some("5"), both());
        assert!(!once.contains("Old"));
        assert_eq!(inject(&once, "New", Some("5"), both()), once);

        let meta = crate::reader::extract_metadata(once.as_bytes()).unwrap();
        assert_eq!(meta.series, "New");
        assert_eq!(meta.series_index, "5");
    }
}
