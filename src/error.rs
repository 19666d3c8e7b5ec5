//! Error types for the pdf2mindmap library.
//!
//! Each collaborator of the session fails in its own way, so each gets its
//! own error type:
//!
//! * [`ExtractionError`] — the source document could not be turned into text
//!   (missing file, not a PDF, wrong password, pdfium unavailable).
//! * [`GenerationError`] — the outline-generation call failed (transport,
//!   API, timeout, empty completion).
//! * [`ParseError`] — the outline text does not follow the indented-bullet
//!   grammar.
//! * [`ValidationError`] — a node edit was rejected.
//! * [`RenderError`] — the rendering collaborator could not produce output.
//!
//! [`MindMapError`] wraps all of them and is what the session and the
//! one-shot `generate*` functions return. None of these are fatal to a
//! [`crate::session::MindMapSession`]: the session reports them and returns
//! to a state from which the user can retry.

use crate::tree::NodeId;
use std::path::PathBuf;
use thiserror::Error;

/// The source document could not be read or turned into text.
#[derive(Debug, Error)]
pub enum ExtractionError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Document not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input string is not a valid file path or URL.
    #[error("Invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// The payload was handed to the PDF extractor but is not a PDF.
    #[error("Document is not a valid PDF (first bytes: {magic:?})")]
    NotAPdf { magic: [u8; 4] },

    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF is corrupt: {detail}\nTry repairing with: qpdf input.pdf output.pdf")]
    CorruptPdf { detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired,

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF")]
    WrongPassword,

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Install pdfium system-wide, or set PDFIUM_LIB_PATH to the directory\n\
containing libpdfium (pdfium.dll on Windows).\n\
Prebuilt binaries: https://github.com/bblanchon/pdfium-binaries\n"
    )]
    PdfiumBindingFailed(String),

    // ── Text errors ───────────────────────────────────────────────────────
    /// A plain-text document is not valid UTF-8.
    #[error("Document is neither a PDF nor UTF-8 text: {detail}")]
    InvalidText { detail: String },

    /// Extraction succeeded but produced zero characters.
    #[error("No text could be extracted from the document")]
    EmptyText,

    /// Unexpected internal error (task panic, temp file failure).
    #[error("Internal extraction error: {0}")]
    Internal(String),
}

/// The outline-generation request failed.
#[derive(Debug, Clone, Error)]
pub enum GenerationError {
    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// The LLM API returned an error (after any configured retries).
    #[error("LLM API error after {attempts} attempt(s): {message}")]
    Api { attempts: u32, message: String },

    /// The LLM call did not complete within the configured timeout.
    #[error("LLM call timed out after {secs}s")]
    Timeout { secs: u64 },

    /// The completion came back with no text at all.
    #[error("LLM returned an empty completion")]
    EmptyResponse,
}

/// The outline text does not follow the indented-bullet grammar.
///
/// Line numbers are 1-based and refer to the outline text that was parsed,
/// not to the raw model response.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// Not a single `- item` line was found.
    #[error("Outline contains no bullet lines ('- item')")]
    NoBullets,

    /// A bullet marker with nothing after it.
    #[error("Line {line}: bullet has no text")]
    EmptyContent { line: usize },

    /// A line is nested more than one level below the previous bullet.
    #[error("Line {line}: depth {depth} skips a level (deepest allowed here is {max_allowed})")]
    DepthSkip {
        line: usize,
        depth: usize,
        max_allowed: usize,
    },

    /// A line's indentation is not a multiple of the outline's indent unit.
    #[error("Line {line}: indentation of {indent} columns is not a multiple of {unit}")]
    MisalignedIndent {
        line: usize,
        indent: usize,
        unit: usize,
    },

    /// A second top-level bullet was found; a mind map has exactly one root.
    #[error("Line {line}: second top-level bullet; a mind map has exactly one root")]
    MultipleRoots { line: usize },
}

/// A node edit was rejected; the node keeps its previous content.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The new content is empty after trimming.
    #[error("Node content must not be empty")]
    EmptyContent,

    /// The new content spans more than one line.
    #[error("Node content must fit on a single line")]
    MultiLine,

    /// The node id does not belong to this tree.
    #[error("Node {0} does not exist in this mind map")]
    UnknownNode(NodeId),
}

/// The rendering collaborator failed to produce output.
#[derive(Debug, Error)]
pub enum RenderError {
    /// Could not create or write the rendered file.
    #[error("Failed to write rendered mind map '{path}': {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Render options or tree data could not be serialised for embedding.
    #[error("Failed to serialise render data: {0}")]
    Serialize(String),
}

/// All errors returned by the pdf2mindmap library.
#[derive(Debug, Error)]
pub enum MindMapError {
    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error("Outline could not be parsed: {0}")]
    Parse(#[from] ParseError),

    #[error("Edit rejected: {0}")]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Render(#[from] RenderError),

    // ── Session errors ────────────────────────────────────────────────────
    /// The requested action is not available in the session's current state.
    #[error("Cannot {action} while the session is {state}")]
    InvalidState { action: &'static str, state: String },

    /// A node click arrived while edit mode is off.
    #[error("Edit mode is not active")]
    EditModeInactive,

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output Markdown file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}
