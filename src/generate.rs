//! One-shot entry points: document in, mind map out.
//!
//! Each function builds a short-lived [`MindMapSession`] with a no-op
//! renderer, runs it once to `Rendered` and returns the tree with its
//! canonical outline. Use the session directly when you need editing or a
//! live display.

use crate::config::{MindMapConfig, DEFAULT_DOWNLOAD_TIMEOUT_SECS};
use crate::error::{ExtractionError, MindMapError};
use crate::output::{DocumentInfo, GenerationStats, MindMapOutput};
use crate::pipeline::extract::{DocumentExtractor, PdfiumExtractor};
use crate::pipeline::input::{self, DocumentKind};
use crate::pipeline::llm::{LlmOutlineGenerator, OutlineGenerator};
use crate::pipeline::render::write_atomic;
use crate::session::{MindMapSession, SessionBuilder};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Generate a mind map from a PDF or text file, local or remote.
///
/// # Arguments
/// * `input_str` — local file path or HTTP/HTTPS URL
/// * `config` — generation configuration
///
/// # Errors
/// Extraction, provider, transport and parse failures are returned as
/// [`MindMapError`]. Nothing is written anywhere.
pub async fn generate_mindmap(
    input_str: impl AsRef<str>,
    config: &MindMapConfig,
) -> Result<MindMapOutput, MindMapError> {
    let input_str = input_str.as_ref();
    info!("Generating mind map: {}", input_str);

    let document = input::resolve_input(input_str, config.download_timeout_secs).await?;
    generate_from_bytes(&document.bytes, config).await
}

/// Generate a mind map from a document already in memory.
///
/// `%PDF` payloads go through pdfium; anything else must be UTF-8 text.
pub async fn generate_from_bytes(
    bytes: &[u8],
    config: &MindMapConfig,
) -> Result<MindMapOutput, MindMapError> {
    let pdf = PdfiumExtractor::new().with_password(config.password.clone());

    let document = if input::sniff(bytes) == DocumentKind::Pdf {
        Some(inspect_bytes(&pdf, bytes.to_vec()).await?)
    } else {
        None
    };

    let mut session = session_for(config)?
        .extractor(Arc::new(DocumentExtractor::new(pdf)))
        .build();
    session.load_document(bytes.to_vec()).await?;
    finish(session, document).await
}

/// Generate a mind map from plain text, skipping extraction.
pub async fn generate_from_text(
    text: impl Into<String>,
    config: &MindMapConfig,
) -> Result<MindMapOutput, MindMapError> {
    let mut session = session_for(config)?.build();
    session.provide_text(text)?;
    finish(session, None).await
}

/// Generate a mind map and write its outline to `output_path`.
///
/// The file is replaced atomically.
pub async fn generate_to_file(
    input_str: impl AsRef<str>,
    output_path: impl AsRef<Path>,
    config: &MindMapConfig,
) -> Result<GenerationStats, MindMapError> {
    let output = generate_mindmap(input_str, config).await?;
    let path = output_path.as_ref();

    write_atomic(path, &output.markdown).map_err(|source| MindMapError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(output.stats)
}

/// Synchronous wrapper around [`generate_mindmap`].
///
/// Creates a temporary tokio runtime internally.
pub fn generate_sync(
    input_str: impl AsRef<str>,
    config: &MindMapConfig,
) -> Result<MindMapOutput, MindMapError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| MindMapError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(generate_mindmap(input_str, config))
}

/// Read page count and metadata of a PDF without generating anything.
///
/// Does not require an LLM provider or API key.
pub async fn inspect(input_str: impl AsRef<str>) -> Result<DocumentInfo, MindMapError> {
    let document =
        input::resolve_input(input_str.as_ref(), DEFAULT_DOWNLOAD_TIMEOUT_SECS).await?;
    if document.kind() != DocumentKind::Pdf {
        let mut magic = [0u8; 4];
        let n = document.bytes.len().min(4);
        magic[..n].copy_from_slice(&document.bytes[..n]);
        return Err(ExtractionError::NotAPdf { magic }.into());
    }
    inspect_bytes(&PdfiumExtractor::new(), document.bytes).await
}

// ── Internal helpers ─────────────────────────────────────────────────────

fn session_for(config: &MindMapConfig) -> Result<SessionBuilder, MindMapError> {
    let generator: Arc<dyn OutlineGenerator> = Arc::new(LlmOutlineGenerator::from_config(config)?);
    Ok(MindMapSession::builder(generator).config(config))
}

async fn finish(
    mut session: MindMapSession,
    document: Option<DocumentInfo>,
) -> Result<MindMapOutput, MindMapError> {
    let stats = session.generate().await?;
    let tree = session
        .tree()
        .cloned()
        .ok_or_else(|| MindMapError::Internal("session has no tree after generation".into()))?;

    Ok(MindMapOutput {
        markdown: session.outline().to_string(),
        tree,
        stats,
        document,
    })
}

async fn inspect_bytes(
    pdf: &PdfiumExtractor,
    bytes: Vec<u8>,
) -> Result<DocumentInfo, MindMapError> {
    let pdf = pdf.clone();
    let info = tokio::task::spawn_blocking(move || pdf.inspect(&bytes))
        .await
        .map_err(|e| MindMapError::Internal(format!("Inspect task panicked: {e}")))??;
    Ok(info)
}
