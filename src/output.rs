//! Result types returned by generation.

use crate::tree::MindMap;
use serde::{Deserialize, Serialize};

/// Basic facts about a source PDF.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentInfo {
    pub page_count: usize,
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
}

/// Numbers describing one successful generation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationStats {
    /// Characters of source text sent to the model.
    pub source_chars: usize,
    /// Nodes in the parsed tree, root included.
    pub node_count: usize,
    /// Deepest level in the parsed tree (root = 0).
    pub max_depth: usize,
    pub input_tokens: u64,
    pub output_tokens: u64,
    /// Transport retries spent on the request.
    pub retries: u32,
    /// Wall-clock time of the request, parse included.
    pub duration_ms: u64,
    /// `true` when the completion had no `<mindmap>` tags and was parsed whole.
    pub used_fallback: bool,
}

/// A generated mind map with its canonical outline.
#[derive(Debug, Clone, Serialize)]
pub struct MindMapOutput {
    /// Canonical indented-bullet Markdown for `tree`.
    pub markdown: String,
    pub tree: MindMap,
    pub stats: GenerationStats,
    /// Present when the source was a PDF.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document: Option<DocumentInfo>,
}
