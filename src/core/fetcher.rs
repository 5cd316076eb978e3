use tracing::info;

use crate::core::downloader::{integrity, Transport};
use crate::core::error::{InstallError, InstallResult};
use crate::core::resolver::Resolution;

/// Media types accepted for archives fetched from a user-supplied URL.
const ARCHIVE_CONTENT_TYPES: &[&str] = &[
    "application/x-modrinth-modpack+zip",
    "application/zip",
    "application/x-zip-compressed",
    "application/octet-stream",
];

const ARCHIVE_EXTENSIONS: &[&str] = &[".mrpack", ".zip"];

pub struct PackFetcher<'a> {
    transport: &'a dyn Transport,
}

impl<'a> PackFetcher<'a> {
    pub fn new(transport: &'a dyn Transport) -> Self {
        Self { transport }
    }

    /// Download the archive bytes for a resolution.
    pub async fn fetch(&self, resolution: &Resolution) -> InstallResult<Vec<u8>> {
        match resolution {
            Resolution::Registry { version, .. } => {
                let archive = version
                    .archive()
                    .ok_or_else(|| InstallError::MissingArchive(version.id.clone()))?;
                info!("Downloading modpack archive {}", archive.filename);

                let fetched = self.transport.get(&archive.url).await?;
                integrity::verify(&archive.filename, &fetched.bytes, &archive.hashes)?;
                Ok(fetched.bytes)
            }
            Resolution::DirectUrl(url) => {
                info!("Downloading modpack archive from {}", url);
                let fetched = self.transport.get(url.as_str()).await?;

                if !is_archive(fetched.content_type.as_deref(), url.path()) {
                    return Err(InstallError::UnsupportedContentType {
                        url: url.to_string(),
                        content_type: fetched.content_type,
                    });
                }
                Ok(fetched.bytes)
            }
        }
    }
}

/// Declared media type check; without one, fall back to the URL's extension.
fn is_archive(content_type: Option<&str>, url_path: &str) -> bool {
    match content_type {
        Some(declared) => {
            let essence = declared
                .split(';')
                .next()
                .unwrap_or_default()
                .trim()
                .to_ascii_lowercase();
            ARCHIVE_CONTENT_TYPES.contains(&essence.as_str())
        }
        None => {
            let path = url_path.to_ascii_lowercase();
            ARCHIVE_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
        }
    }
}
