//! # pdf2mindmap
//!
//! Turn PDF documents into editable mind maps with a Large Language Model.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input     resolve local file or download from URL
//!  ├─ 2. Extract   page text via pdfium (CPU-bound, spawn_blocking)
//!  ├─ 3. Generate  one LLM call: text → <mindmap> tagged outline
//!  ├─ 4. Extract   pull the outline out of the tags (whole reply if untagged)
//!  ├─ 5. Parse     indented bullets → MindMap tree
//!  └─ 6. Render    markmap HTML page / Markdown file / terminal tree
//! ```
//!
//! After step 6 the tree can be edited node by node. Every edit
//! re-serialises the whole tree to the canonical outline and re-renders it,
//! so the outline and the display never drift apart. [`MindMapSession`]
//! owns that lifecycle.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf2mindmap::{generate_mindmap, MindMapConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from OPENAI_API_KEY / ANTHROPIC_API_KEY / GEMINI_API_KEY
//!     let config = MindMapConfig::default();
//!     let output = generate_mindmap("paper.pdf", &config).await?;
//!     print!("{}", output.markdown);
//!     eprintln!("{} nodes", output.stats.node_count);
//!     Ok(())
//! }
//! ```
//!
//! ## Editing
//!
//! ```rust,no_run
//! use pdf2mindmap::pipeline::render::HtmlRenderer;
//! use pdf2mindmap::{LlmOutlineGenerator, MindMapConfig, MindMapSession, NodeId};
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = MindMapConfig::default();
//! let generator = Arc::new(LlmOutlineGenerator::from_config(&config)?);
//! let mut session = MindMapSession::builder(generator)
//!     .config(&config)
//!     .renderer(HtmlRenderer::new("map.html"))
//!     .build();
//!
//! session.load_document(std::fs::read("paper.pdf")?).await?;
//! session.generate().await?;
//! session.set_edit_mode(true);
//! session.handle_node_click(NodeId::from_index(1), "Background")?;
//! print!("{}", session.outline());
//! # Ok(())
//! # }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf2mindmap` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! pdf2mindmap = { version = "0.3", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod generate;
pub mod markdown;
pub mod observer;
pub mod output;
pub mod pipeline;
pub mod prompts;
pub mod session;
pub mod tree;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{
    MindMapConfig, MindMapConfigBuilder, RenderOptions, DEFAULT_API_TIMEOUT_SECS,
    DEFAULT_DOWNLOAD_TIMEOUT_SECS, DEFAULT_MODEL,
};
pub use error::{
    ExtractionError, GenerationError, MindMapError, ParseError, RenderError, ValidationError,
};
pub use generate::{
    generate_from_bytes, generate_from_text, generate_mindmap, generate_sync, generate_to_file,
    inspect,
};
pub use markdown::{parse, serialize};
pub use observer::{NoopObserver, Notice, NoticeLevel, SessionObserver, SharedObserver};
pub use output::{DocumentInfo, GenerationStats, MindMapOutput};
pub use pipeline::extract::{DocumentExtractor, PdfiumExtractor, PlainTextExtractor, TextExtractor};
pub use pipeline::llm::{Completion, LlmOutlineGenerator, OutlineGenerator, OutlineRequest};
pub use pipeline::postprocess::{extract_outline, ExtractedOutline};
pub use pipeline::render::{MindMapRenderer, NoopRenderer};
pub use session::{EditOutcome, EditResult, MindMapSession, SessionBuilder, SessionState};
pub use tree::{MindMap, MindMapNode, NodeId};
