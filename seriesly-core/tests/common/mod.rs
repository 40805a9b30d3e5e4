//! Shared EPUB fixtures for the integration tests

#![allow(dead_code)]

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

pub const OPF_PATH: &str = "OEBPS/content.opf";

pub const CONTAINER_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>
"#;

pub const CHAPTER: &str = "<html><body><p>It was a dark and stormy night.</p></body></html>";

/// Package document wrapping `metadata` (the body of the metadata element)
pub fn opf(metadata: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="3.0" unique-identifier="uid">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:opf="http://www.idpf.org/2007/opf">{}</metadata>
  <manifest>
    <item id="ch1" href="chapter1.xhtml" media-type="application/xhtml+xml"/>
  </manifest>
  <spine>
    <itemref idref="ch1"/>
  </spine>
</package>
"#,
        metadata
    )
}

/// Metadata body of a book with no series information
pub const PLAIN_METADATA: &str = r##"
    <dc:identifier id="uid">urn:uuid:0b0e5c4a-1111-2222-3333-444455556666</dc:identifier>
    <dc:title>Foundation and Empire</dc:title>
    <!-- scanned from a paperback -->
    <dc:creator id="author">Isaac Asimov</dc:creator>
    <meta refines="#author" property="role">aut</meta>
    <dc:language>en</dc:language>
  "##;

/// Metadata body carrying both series conventions
pub const TAGGED_METADATA: &str = r##"
    <dc:identifier id="uid">urn:uuid:0b0e5c4a-1111-2222-3333-444455556666</dc:identifier>
    <dc:title>Foundation and Empire</dc:title>
    <dc:creator>Isaac Asimov</dc:creator>
    <meta property="belongs-to-collection" id="c01">Foundation</meta>
    <meta refines="#c01" property="collection-type">series</meta>
    <meta refines="#c01" property="group-position">2</meta>
    <meta name="calibre:series" content="The Foundation Trilogy"/>
    <meta name="calibre:series_index" content="2.0"/>
    <dc:language>en</dc:language>
  "##;

/// Write an EPUB built from the given entries, in order
pub fn write_entries(path: &Path, entries: &[(&str, &[u8])]) {
    let file = File::create(path).unwrap();
    let mut zip = ZipWriter::new(file);
    for (name, data) in entries {
        let method = if *name == "mimetype" {
            CompressionMethod::Stored
        } else {
            CompressionMethod::Deflated
        };
        zip.start_file(*name, FileOptions::default().compression_method(method))
            .unwrap();
        zip.write_all(data).unwrap();
    }
    zip.finish().unwrap();
}

/// Write a complete EPUB whose package document is `opf_text`
pub fn write_epub(path: &Path, opf_text: &str) {
    write_entries(
        path,
        &[
            ("mimetype", b"application/epub+zip"),
            ("META-INF/container.xml", CONTAINER_XML.as_bytes()),
            (OPF_PATH, opf_text.as_bytes()),
            ("OEBPS/chapter1.xhtml", CHAPTER.as_bytes()),
        ],
    );
}

/// Create `name` in `dir` with the given metadata body
pub fn book(dir: &Path, name: &str, metadata: &str) -> PathBuf {
    let path = dir.join(name);
    write_epub(&path, &opf(metadata));
    path
}

/// Decompressed content of one entry
pub fn read_entry(path: &Path, name: &str) -> Vec<u8> {
    let mut archive = ZipArchive::new(File::open(path).unwrap()).unwrap();
    let mut entry = archive.by_name(name).unwrap();
    let mut data = Vec::new();
    entry.read_to_end(&mut data).unwrap();
    data
}

pub fn read_opf(path: &Path) -> String {
    String::from_utf8(read_entry(path, OPF_PATH)).unwrap()
}

/// Name, compression method and raw (still compressed) bytes of every entry
pub fn raw_entries(path: &Path) -> Vec<(String, CompressionMethod, Vec<u8>)> {
    let mut archive = ZipArchive::new(File::open(path).unwrap()).unwrap();
    (0..archive.len())
        .map(|i| {
            let mut entry = archive.by_index_raw(i).unwrap();
            let mut data = Vec::new();
            entry.read_to_end(&mut data).unwrap();
            (entry.name().to_string(), entry.compression(), data)
        })
        .collect()
}

pub fn file_bytes(path: &Path) -> Vec<u8> {
    fs::read(path).unwrap()
}
