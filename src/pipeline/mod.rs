//! Pipeline stages for document-to-mind-map generation.
//!
//! Each submodule implements one step, and the three that talk to the
//! outside world (extraction, the LLM, display) sit behind a trait so the
//! session can be driven by stand-ins in tests.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ extract ──▶ llm ──▶ postprocess ──▶ (markdown::parse) ──▶ render
//! (URL/path) (pdfium)   (LLM)   (<mindmap> tags)                       (markmap)
//! ```
//!
//! 1. [`input`]   — load the user-supplied path or URL into memory
//! 2. [`extract`] — [`extract::TextExtractor`]: pdfium page text, blocking
//! 3. [`llm`]     — [`llm::OutlineGenerator`]: one outline request; the only
//!    stage with network I/O besides downloads
//! 4. [`postprocess`] — pull the outline out of the `<mindmap>` tags
//! 5. [`render`]  — [`render::MindMapRenderer`]: full redraw from the tree

pub mod extract;
pub mod input;
pub mod llm;
pub mod postprocess;
pub mod render;
