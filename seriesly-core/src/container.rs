//! Package document discovery through `META-INF/container.xml`

use crate::archive::EpubArchive;
use crate::error::{ContainerError, Result, SerieslyError};
use quick_xml::events::Event;
use quick_xml::Reader;

/// Fixed location of the container descriptor
pub const CONTAINER_PATH: &str = "META-INF/container.xml";

/// Resolve the path of the package document inside `archive`
///
/// Only the first declared rootfile is considered; multi-rendition
/// containers are not supported. The returned path is not checked against
/// the archive, use [`resolve_existing_package_path`] for that.
pub fn resolve_package_path(archive: &mut EpubArchive) -> Result<String> {
    if !archive.contains(CONTAINER_PATH) {
        return Err(ContainerError::MissingContainer.into());
    }
    let descriptor = archive.read_entry(CONTAINER_PATH)?;
    Ok(first_rootfile_path(&descriptor)?)
}

/// Resolve the package document path and verify the entry exists
pub fn resolve_existing_package_path(archive: &mut EpubArchive) -> Result<String> {
    let opf_path = resolve_package_path(archive)?;
    if !archive.contains(&opf_path) {
        return Err(SerieslyError::Container(
            ContainerError::MissingPackageDocument(opf_path),
        ));
    }
    tracing::debug!("Resolved package document {}", opf_path);
    Ok(opf_path)
}

/// Extract the `full-path` attribute of the first `rootfile` element
pub fn first_rootfile_path(descriptor: &[u8]) -> std::result::Result<String, ContainerError> {
    let mut reader = Reader::from_reader(descriptor);
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) if e.local_name().as_ref() == b"rootfile" => {
                let full_path = e
                    .attributes()
                    .flatten()
                    .find(|attr| attr.key.local_name().as_ref() == b"full-path")
                    .and_then(|attr| attr.unescape_value().ok().map(|v| v.trim().to_string()))
                    .filter(|path| !path.is_empty());

                return full_path.ok_or(ContainerError::MissingRootfile);
            }
            Ok(Event::Eof) => return Err(ContainerError::MissingRootfile),
            Ok(_) => {}
            Err(e) => {
                return Err(ContainerError::MalformedContainer(format!(
                    "at position {}: {}",
                    reader.buffer_position(),
                    e
                )))
            }
        }
        buf.clear();
    }
}
