//! Input resolution: turn a user-supplied path or URL into document bytes.
//!
//! Text extraction works on an in-memory payload, so a URL is downloaded
//! straight into memory and a local file is read whole. The document kind
//! is sniffed from the first bytes, not from the file extension.

use crate::error::ExtractionError;
use std::path::PathBuf;
use tracing::{debug, info};

/// What kind of payload the bytes hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    PlainText,
}

/// A document loaded into memory.
#[derive(Debug, Clone)]
pub struct InputDocument {
    /// File name (last path or URL segment), used to name outputs.
    pub name: String,
    pub bytes: Vec<u8>,
}

impl InputDocument {
    pub fn kind(&self) -> DocumentKind {
        sniff(&self.bytes)
    }

    /// `name` without its extension.
    pub fn stem(&self) -> &str {
        match self.name.rsplit_once('.') {
            Some((stem, _)) if !stem.is_empty() => stem,
            _ => &self.name,
        }
    }
}

/// Classify a payload by its magic bytes.
pub fn sniff(bytes: &[u8]) -> DocumentKind {
    if bytes.starts_with(b"%PDF") {
        DocumentKind::Pdf
    } else {
        DocumentKind::PlainText
    }
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Load the document named by `input`.
///
/// URLs are downloaded with `timeout_secs`; anything else is a local path.
pub async fn resolve_input(input: &str, timeout_secs: u64) -> Result<InputDocument, ExtractionError> {
    if input.trim().is_empty() {
        return Err(ExtractionError::InvalidInput {
            input: input.to_string(),
        });
    }
    if is_url(input) {
        download_url(input, timeout_secs).await
    } else {
        read_local(input).await
    }
}

async fn read_local(path_str: &str) -> Result<InputDocument, ExtractionError> {
    let path = PathBuf::from(path_str);

    let bytes = tokio::fs::read(&path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::PermissionDenied => ExtractionError::PermissionDenied { path: path.clone() },
        std::io::ErrorKind::NotFound => ExtractionError::FileNotFound { path: path.clone() },
        _ => ExtractionError::Internal(format!("Failed to read '{}': {}", path.display(), e)),
    })?;

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "document".to_string());

    debug!("Read local document: {} ({} bytes)", path.display(), bytes.len());
    Ok(InputDocument { name, bytes })
}

async fn download_url(url: &str, timeout_secs: u64) -> Result<InputDocument, ExtractionError> {
    info!("Downloading document from: {}", url);

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| ExtractionError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            ExtractionError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            ExtractionError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    })?;

    if !response.status().is_success() {
        return Err(ExtractionError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| ExtractionError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    info!("Downloaded {} bytes", bytes.len());

    Ok(InputDocument {
        name: filename_from_url(url),
        bytes: bytes.to_vec(),
    })
}

/// Last non-empty path segment of `url`, or `document.pdf`.
fn filename_from_url(url: &str) -> String {
    if let Ok(parsed) = reqwest::Url::parse(url) {
        if let Some(mut segments) = parsed.path_segments() {
            if let Some(last) = segments.next_back() {
                if !last.is_empty() {
                    return last.to_string();
                }
            }
        }
    }

    "document.pdf".to_string()
}
