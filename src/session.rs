//! The mind-map session: text in, editable rendered tree out.
//!
//! ```text
//!   Idle ──provide_text──▶ TextReady ──generate──▶ Generating ──ok──▶ Rendered
//!                              ▲                       │                │  ▲
//!                              └──── Failed ◀──error───┘     node click │  │ re-serialise
//!                                                                       ▼  │ + re-render
//!                                                                  Editing(node)
//! ```
//!
//! The session owns the tree exclusively. Every mutating operation takes
//! `&mut self`, so at most one outline request can be in flight per session.
//! Collaborators (extractor, generator, renderer, observer) are injected
//! through [`SessionBuilder`]; the session never creates clients on its own.
//!
//! No failure is fatal to the session. Each error is reported once to the
//! observer as a [`Notice`], returned to the caller, and the session falls
//! back to the last stable state so the user can retry.

use crate::config::{MindMapConfig, RenderOptions};
use crate::error::{ExtractionError, MindMapError, ValidationError};
use crate::markdown;
use crate::observer::{Notice, NoopObserver, SharedObserver};
use crate::output::GenerationStats;
use crate::pipeline::extract::{DocumentExtractor, TextExtractor};
use crate::pipeline::llm::{OutlineGenerator, OutlineRequest};
use crate::pipeline::postprocess::extract_outline;
use crate::pipeline::render::{MindMapRenderer, NoopRenderer};
use crate::tree::{MindMap, NodeId};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Where the session is in its lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// No source text yet.
    Idle,
    /// Source text is loaded; generation can be requested.
    TextReady,
    /// An outline request is in flight.
    Generating,
    /// A tree is displayed.
    Rendered,
    /// A node edit is being applied.
    Editing(NodeId),
    /// The last outline request failed. Transient: the session moves on to
    /// the previous stable state right after reporting.
    Failed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Idle => f.write_str("Idle"),
            SessionState::TextReady => f.write_str("TextReady"),
            SessionState::Generating => f.write_str("Generating"),
            SessionState::Rendered => f.write_str("Rendered"),
            SessionState::Editing(id) => write!(f, "Editing({id})"),
            SessionState::Failed => f.write_str("Failed"),
        }
    }
}

/// A successfully applied node edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditOutcome {
    pub node: NodeId,
    pub previous: String,
    pub content: String,
}

/// What a node-click handler returns.
///
/// `Err(MindMapError::Render(_))` means the edit *was* applied but the
/// display is stale; [`MindMapSession::rerender`] retries the render.
pub type EditResult = Result<EditOutcome, MindMapError>;

/// Builder for [`MindMapSession`].
pub struct SessionBuilder {
    generator: Arc<dyn OutlineGenerator>,
    extractor: Option<Arc<dyn TextExtractor>>,
    renderer: Option<Box<dyn MindMapRenderer>>,
    observer: Option<SharedObserver>,
    system_prompt: Option<String>,
    render_options: RenderOptions,
}

impl SessionBuilder {
    pub fn extractor(mut self, extractor: Arc<dyn TextExtractor>) -> Self {
        self.extractor = Some(extractor);
        self
    }

    pub fn renderer(mut self, renderer: impl MindMapRenderer + 'static) -> Self {
        self.renderer = Some(Box::new(renderer));
        self
    }

    pub fn observer(mut self, observer: SharedObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn render_options(mut self, options: RenderOptions) -> Self {
        self.render_options = options;
        self
    }

    /// Take the system prompt and render options from `config`.
    pub fn config(mut self, config: &MindMapConfig) -> Self {
        self.system_prompt = config.system_prompt.clone();
        self.render_options = config.render.clone();
        self
    }

    pub fn build(self) -> MindMapSession {
        MindMapSession {
            generator: self.generator,
            extractor: self
                .extractor
                .unwrap_or_else(|| Arc::new(DocumentExtractor::default())),
            renderer: self.renderer.unwrap_or_else(|| Box::new(NoopRenderer)),
            observer: self.observer.unwrap_or_else(|| Arc::new(NoopObserver)),
            system_prompt: self.system_prompt,
            render_options: self.render_options,
            state: SessionState::Idle,
            source_text: None,
            outline: String::new(),
            tree: None,
            edit_mode: false,
            last_stats: None,
        }
    }
}

/// One mind map's lifecycle, from source text through edits.
pub struct MindMapSession {
    generator: Arc<dyn OutlineGenerator>,
    extractor: Arc<dyn TextExtractor>,
    renderer: Box<dyn MindMapRenderer>,
    observer: SharedObserver,
    system_prompt: Option<String>,
    render_options: RenderOptions,
    state: SessionState,
    source_text: Option<String>,
    outline: String,
    tree: Option<MindMap>,
    edit_mode: bool,
    last_stats: Option<GenerationStats>,
}

impl MindMapSession {
    /// Start building a session around an already-constructed generator.
    pub fn builder(generator: Arc<dyn OutlineGenerator>) -> SessionBuilder {
        SessionBuilder {
            generator,
            extractor: None,
            renderer: None,
            observer: None,
            system_prompt: None,
            render_options: RenderOptions::default(),
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// The current tree, if a generation has succeeded.
    pub fn tree(&self) -> Option<&MindMap> {
        self.tree.as_ref()
    }

    /// Canonical outline of the current tree; empty when there is none.
    pub fn outline(&self) -> &str {
        &self.outline
    }

    pub fn source_text(&self) -> Option<&str> {
        self.source_text.as_deref()
    }

    pub fn last_stats(&self) -> Option<&GenerationStats> {
        self.last_stats.as_ref()
    }

    pub fn edit_mode(&self) -> bool {
        self.edit_mode
    }

    pub fn set_edit_mode(&mut self, enabled: bool) {
        debug!("Edit mode {}", if enabled { "on" } else { "off" });
        self.edit_mode = enabled;
    }

    /// End the session and hand the generator back to its owner.
    pub fn into_generator(self) -> Arc<dyn OutlineGenerator> {
        self.generator
    }

    // ── Intake ───────────────────────────────────────────────────────────

    /// Make `text` the source for the next generation.
    ///
    /// Only zero-length text is refused; whitespace-only text is accepted
    /// and left to the generator. The current tree, if any, stays displayed
    /// until the next generation replaces it.
    pub fn provide_text(&mut self, text: impl Into<String>) -> Result<(), MindMapError> {
        if matches!(
            self.state,
            SessionState::Generating | SessionState::Editing(_) | SessionState::Failed
        ) {
            return Err(self.invalid_state("load text"));
        }

        let text = text.into();
        if text.is_empty() {
            let err = ExtractionError::EmptyText;
            self.notify(Notice::error(format!("Could not read document: {err}")));
            return Err(err.into());
        }

        debug!("Source text ready: {} chars", text.len());
        self.source_text = Some(text);
        self.transition(SessionState::TextReady);
        Ok(())
    }

    /// Extract text from a document payload and make it the source.
    ///
    /// Extraction runs on the blocking pool. Returns the number of
    /// characters extracted. On failure no generation is attempted and the
    /// state is unchanged.
    pub async fn load_document(&mut self, bytes: Vec<u8>) -> Result<usize, MindMapError> {
        let extractor = Arc::clone(&self.extractor);
        let extracted = tokio::task::spawn_blocking(move || extractor.extract(&bytes))
            .await
            .map_err(|e| ExtractionError::Internal(format!("Extraction task panicked: {e}")))
            .and_then(|result| result);

        match extracted {
            Ok(text) => {
                let chars = text.chars().count();
                self.provide_text(text)?;
                Ok(chars)
            }
            Err(e) => {
                self.notify(Notice::error(format!("Could not read document: {e}")));
                Err(e.into())
            }
        }
    }

    /// Open an existing outline without calling the generator.
    ///
    /// The outline is parsed, rendered and becomes the session's tree, as if
    /// it had just been generated.
    pub fn open_outline(&mut self, markdown: &str) -> Result<usize, MindMapError> {
        if matches!(
            self.state,
            SessionState::Generating | SessionState::Editing(_) | SessionState::Failed
        ) {
            return Err(self.invalid_state("open an outline"));
        }

        let tree = match markdown::parse(markdown) {
            Ok(tree) => tree,
            Err(e) => {
                self.notify(Notice::error(format!("Outline could not be parsed: {e}")));
                return Err(e.into());
            }
        };
        let outline = tree.to_markdown();
        if let Err(e) = self.renderer.render(&tree, &outline, &self.render_options) {
            self.notify(Notice::error(format!("Mind map could not be displayed: {e}")));
            return Err(e.into());
        }

        let nodes = tree.len();
        self.tree = Some(tree);
        self.outline = outline;
        self.transition(SessionState::Rendered);
        Ok(nodes)
    }

    // ── Generation ───────────────────────────────────────────────────────

    /// Request an outline for the current source text and display it.
    ///
    /// Allowed from `TextReady`, and from `Rendered` to regenerate. On
    /// success the old tree is discarded and replaced wholesale.
    ///
    /// A transport failure passes through `Failed` and lands in `TextReady`.
    /// A parse or render failure returns to the state the call started from.
    /// Either way the previous tree, if any, is untouched.
    pub async fn generate(&mut self) -> Result<GenerationStats, MindMapError> {
        let stable = self.state.clone();
        if !matches!(stable, SessionState::TextReady | SessionState::Rendered) {
            return Err(self.invalid_state("generate"));
        }
        let Some(text) = self.source_text.clone() else {
            return Err(self.invalid_state("generate"));
        };

        let start = Instant::now();
        let source_chars = text.chars().count();
        let request = OutlineRequest::for_text(&text, self.system_prompt.as_deref());

        self.transition(SessionState::Generating);
        self.observer.on_generation_start(source_chars);
        info!("Requesting outline for {} chars of text", source_chars);

        let completion = match self.generator.generate(&request).await {
            Ok(completion) => completion,
            Err(e) => {
                warn!("Outline generation failed: {}", e);
                self.transition(SessionState::Failed);
                self.notify(Notice::error(format!("Mind map generation failed: {e}")));
                self.transition(SessionState::TextReady);
                return Err(e.into());
            }
        };

        let extracted = extract_outline(&completion.text);
        let tree = match markdown::parse(&extracted.text) {
            Ok(tree) => tree,
            Err(e) => {
                warn!("Generated outline did not parse: {}", e);
                self.notify(Notice::error(format!("Outline could not be parsed: {e}")));
                self.transition(stable);
                return Err(e.into());
            }
        };

        let outline = tree.to_markdown();
        if let Err(e) = self.renderer.render(&tree, &outline, &self.render_options) {
            self.notify(Notice::error(format!("Mind map could not be displayed: {e}")));
            self.transition(stable);
            return Err(e.into());
        }

        let stats = GenerationStats {
            source_chars,
            node_count: tree.len(),
            max_depth: tree.max_depth(),
            input_tokens: completion.input_tokens,
            output_tokens: completion.output_tokens,
            retries: completion.retries,
            duration_ms: start.elapsed().as_millis() as u64,
            used_fallback: extracted.fallback,
        };

        self.tree = Some(tree);
        self.outline = outline;
        self.last_stats = Some(stats.clone());
        self.transition(SessionState::Rendered);
        self.observer.on_generation_complete(&stats);

        info!(
            "Mind map ready: {} nodes, depth {}, {}ms",
            stats.node_count, stats.max_depth, stats.duration_ms
        );
        Ok(stats)
    }

    // ── Editing ──────────────────────────────────────────────────────────

    /// Node-click handler: replace `node`'s label with `new_text`.
    ///
    /// Requires a displayed tree and edit mode. On success the whole tree is
    /// re-serialised into the stored outline and re-rendered from scratch.
    /// A rejected edit leaves the node unchanged.
    pub fn handle_node_click(&mut self, node: NodeId, new_text: &str) -> EditResult {
        if self.state != SessionState::Rendered || self.tree.is_none() {
            return Err(self.invalid_state("edit a node"));
        }
        if !self.edit_mode {
            return Err(MindMapError::EditModeInactive);
        }

        self.transition(SessionState::Editing(node));

        let applied = self
            .tree
            .as_mut()
            .ok_or(ValidationError::UnknownNode(node))
            .and_then(|tree| {
                let previous = tree
                    .node(node)
                    .map(|n| n.content().to_string())
                    .ok_or(ValidationError::UnknownNode(node))?;
                tree.set_content(node, new_text)?;
                Ok(previous)
            });

        let previous = match applied {
            Ok(previous) => previous,
            Err(e) => {
                self.notify(Notice::error(format!("Edit rejected: {e}")));
                self.transition(SessionState::Rendered);
                return Err(e.into());
            }
        };

        let mut content = String::new();
        let mut rendered = Ok(());
        if let Some(tree) = self.tree.as_ref() {
            content = tree
                .node(node)
                .map(|n| n.content().to_string())
                .unwrap_or_default();
            self.outline = tree.to_markdown();
            rendered = self.renderer.render(tree, &self.outline, &self.render_options);
        }
        self.transition(SessionState::Rendered);

        if let Err(e) = rendered {
            self.notify(Notice::error(format!(
                "Edit saved but the mind map could not be redrawn: {e}"
            )));
            return Err(e.into());
        }

        debug!("Node {} edited: {:?} → {:?}", node, previous, content);
        Ok(EditOutcome {
            node,
            previous,
            content,
        })
    }

    /// Render the current tree again, e.g. after a failed redraw.
    pub fn rerender(&mut self) -> Result<(), MindMapError> {
        if self.state != SessionState::Rendered {
            return Err(self.invalid_state("re-render"));
        }
        let Some(tree) = self.tree.as_ref() else {
            return Err(self.invalid_state("re-render"));
        };
        if let Err(e) = self.renderer.render(tree, &self.outline, &self.render_options) {
            self.notify(Notice::error(format!("Mind map could not be displayed: {e}")));
            return Err(e.into());
        }
        Ok(())
    }

    // ── Internals ────────────────────────────────────────────────────────

    fn transition(&mut self, to: SessionState) {
        let from = std::mem::replace(&mut self.state, to);
        debug!("Session: {} → {}", from, self.state);
        self.observer.on_state_change(&from, &self.state);
    }

    fn notify(&self, notice: Notice) {
        self.observer.on_notice(&notice);
    }

    fn invalid_state(&self, action: &'static str) -> MindMapError {
        MindMapError::InvalidState {
            action,
            state: self.state.to_string(),
        }
    }
}
