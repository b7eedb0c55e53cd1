use crate::common::errors::BusinessError;
use std::io::{Cursor, Read};
use zip::ZipArchive;

const IMAGE_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("'{archive}' is not a readable ZIP archive: {source}")]
    Corrupt {
        archive: String,
        #[source]
        source: zip::result::ZipError,
    },
    #[error("Entry '{entry}' of '{archive}' could not be read: {message}")]
    Entry {
        archive: String,
        entry: String,
        message: String,
    },
    #[error("Extraction of '{0}' was interrupted")]
    Interrupted(String),
}

impl From<ArchiveError> for BusinessError {
    fn from(err: ArchiveError) -> Self {
        BusinessError::ValidationError {
            field: "zip_photos".to_string(),
            message: err.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedImage {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

pub fn is_image_name(name: &str) -> bool {
    name.rsplit_once('.').is_some_and(|(stem, extension)| {
        !stem.is_empty()
            && IMAGE_EXTENSIONS
                .iter()
                .any(|allowed| extension.eq_ignore_ascii_case(allowed))
    })
}

/// Last path segment of an archive entry name, for either separator
pub fn base_name(entry_name: &str) -> &str {
    entry_name
        .rsplit(['/', '\\'])
        .find(|segment| !segment.is_empty())
        .unwrap_or(entry_name)
}

/// Image entries of a ZIP archive in listing order; directories and other files are skipped
pub fn extract_images(archive: &str, bytes: &[u8]) -> Result<Vec<ExtractedImage>, ArchiveError> {
    if bytes.is_empty() {
        return Ok(Vec::new());
    }

    let mut zip = ZipArchive::new(Cursor::new(bytes)).map_err(|source| ArchiveError::Corrupt {
        archive: archive.to_string(),
        source,
    })?;

    let mut images = Vec::new();
    for index in 0..zip.len() {
        let mut entry = zip.by_index(index).map_err(|e| ArchiveError::Entry {
            archive: archive.to_string(),
            entry: format!("#{index}"),
            message: e.to_string(),
        })?;
        if entry.is_dir() {
            continue;
        }

        let file_name = base_name(entry.name()).to_string();
        if !is_image_name(&file_name) {
            continue;
        }

        let mut content = Vec::with_capacity(usize::try_from(entry.size()).unwrap_or(0));
        entry
            .read_to_end(&mut content)
            .map_err(|e| ArchiveError::Entry {
                archive: archive.to_string(),
                entry: file_name.clone(),
                message: e.to_string(),
            })?;
        images.push(ExtractedImage {
            file_name,
            bytes: content,
        });
    }

    tracing::debug!(archive, count = images.len(), "Extracted images from archive");
    Ok(images)
}

/// Runs [`extract_images`] on the blocking pool
pub async fn extract_images_blocking(
    archive: String,
    bytes: Vec<u8>,
) -> Result<Vec<ExtractedImage>, ArchiveError> {
    let name = archive.clone();
    tokio::task::spawn_blocking(move || extract_images(&archive, &bytes))
        .await
        .map_err(|_| ArchiveError::Interrupted(name))?
}
