//! Text extraction: the document-to-text collaborator.
//!
//! pdfium does the PDF parsing; this module only binds the library, walks
//! the pages and concatenates their text, one page per block terminated by
//! `\n`. All of it is blocking work, so the session runs extractors on
//! `spawn_blocking`.

use crate::error::ExtractionError;
use crate::output::DocumentInfo;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Environment variable naming a pdfium library file or its directory.
pub const PDFIUM_LIB_PATH_ENV: &str = "PDFIUM_LIB_PATH";

/// Turns a binary document payload into plain text.
pub trait TextExtractor: Send + Sync {
    fn extract(&self, bytes: &[u8]) -> Result<String, ExtractionError>;
}

/// PDF text extraction via pdfium.
#[derive(Debug, Clone)]
pub struct PdfiumExtractor {
    password: Option<String>,
    library_path: Option<PathBuf>,
}

impl Default for PdfiumExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfiumExtractor {
    /// Extractor that binds pdfium from `PDFIUM_LIB_PATH`, else the system library.
    pub fn new() -> Self {
        Self {
            password: None,
            library_path: std::env::var_os(PDFIUM_LIB_PATH_ENV).map(PathBuf::from),
        }
    }

    pub fn with_password(mut self, password: Option<String>) -> Self {
        self.password = password;
        self
    }

    pub fn with_library_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.library_path = Some(path.into());
        self
    }

    fn bind(&self) -> Result<Pdfium, ExtractionError> {
        let bindings = match self.library_path.as_deref() {
            Some(path) if path.is_dir() => {
                Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(path))
            }
            Some(path) => Pdfium::bind_to_library(path),
            None => Pdfium::bind_to_system_library(),
        }
        .map_err(|e| ExtractionError::PdfiumBindingFailed(format!("{e:?}")))?;
        Ok(Pdfium::new(bindings))
    }

    fn open<'a>(
        &self,
        pdfium: &'a Pdfium,
        bytes: &'a [u8],
    ) -> Result<PdfDocument<'a>, ExtractionError> {
        if !bytes.starts_with(b"%PDF") {
            let mut magic = [0u8; 4];
            let n = bytes.len().min(4);
            magic[..n].copy_from_slice(&bytes[..n]);
            return Err(ExtractionError::NotAPdf { magic });
        }

        let password = self.password.as_deref();
        pdfium.load_pdf_from_byte_slice(bytes, password).map_err(|e| {
            let err_str = format!("{:?}", e);
            if err_str.contains("Password") || err_str.contains("password") {
                if password.is_some() {
                    ExtractionError::WrongPassword
                } else {
                    ExtractionError::PasswordRequired
                }
            } else {
                ExtractionError::CorruptPdf { detail: err_str }
            }
        })
    }

    /// Read page count and metadata without extracting text.
    pub fn inspect(&self, bytes: &[u8]) -> Result<DocumentInfo, ExtractionError> {
        let pdfium = self.bind()?;
        let document = self.open(&pdfium, bytes)?;
        let metadata = document.metadata();

        let get_meta = |tag: PdfDocumentMetadataTagType| -> Option<String> {
            metadata.get(tag).and_then(|t| {
                let v = t.value().trim().to_string();
                if v.is_empty() {
                    None
                } else {
                    Some(v)
                }
            })
        };

        Ok(DocumentInfo {
            page_count: document.pages().len() as usize,
            title: get_meta(PdfDocumentMetadataTagType::Title),
            author: get_meta(PdfDocumentMetadataTagType::Author),
            subject: get_meta(PdfDocumentMetadataTagType::Subject),
        })
    }
}

impl TextExtractor for PdfiumExtractor {
    fn extract(&self, bytes: &[u8]) -> Result<String, ExtractionError> {
        let pdfium = self.bind()?;
        let document = self.open(&pdfium, bytes)?;
        let pages = document.pages();
        info!("PDF loaded: {} pages", pages.len());

        let mut text = String::new();
        for (idx, page) in pages.iter().enumerate() {
            match page.text() {
                Ok(page_text) => {
                    let chunk = page_text.all();
                    debug!("Page {}: {} chars", idx + 1, chunk.len());
                    text.push_str(&chunk);
                }
                Err(e) => warn!("Page {}: no text layer ({:?})", idx + 1, e),
            }
            text.push('\n');
        }

        finish(text)
    }
}

/// UTF-8 text documents (`.txt`, `.md`), passed through as-is.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextExtractor;

impl TextExtractor for PlainTextExtractor {
    fn extract(&self, bytes: &[u8]) -> Result<String, ExtractionError> {
        let text = std::str::from_utf8(bytes).map_err(|e| ExtractionError::InvalidText {
            detail: e.to_string(),
        })?;
        finish(text.trim_start_matches('\u{FEFF}').to_string())
    }
}

/// Picks [`PdfiumExtractor`] for `%PDF` payloads and [`PlainTextExtractor`]
/// for everything else.
#[derive(Debug, Clone, Default)]
pub struct DocumentExtractor {
    pdf: PdfiumExtractor,
}

impl DocumentExtractor {
    pub fn new(pdf: PdfiumExtractor) -> Self {
        Self { pdf }
    }
}

impl TextExtractor for DocumentExtractor {
    fn extract(&self, bytes: &[u8]) -> Result<String, ExtractionError> {
        if bytes.starts_with(b"%PDF") {
            self.pdf.extract(bytes)
        } else {
            PlainTextExtractor.extract(bytes)
        }
    }
}

fn finish(text: String) -> Result<String, ExtractionError> {
    if text.is_empty() {
        return Err(ExtractionError::EmptyText);
    }
    if text.trim().is_empty() {
        warn!("Extracted text is whitespace only (scanned document without a text layer?)");
    }
    Ok(text)
}

/// `true` when `path` points at an existing pdfium library or directory.
pub fn library_path_exists(path: &Path) -> bool {
    if path.is_dir() {
        Pdfium::pdfium_platform_library_name_at_path(path).exists()
    } else {
        path.exists()
    }
}
