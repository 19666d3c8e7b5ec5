//! Session lifecycle tests with scripted collaborators.
//!
//! No network, no pdfium: the generator replays canned responses, the
//! renderer records what it was asked to draw and the observer records
//! every transition and notice.

use futures::future::{BoxFuture, FutureExt};
use pdf2mindmap::{
    Completion, ExtractionError, GenerationError, MindMap, MindMapError, MindMapRenderer,
    MindMapSession, NodeId, Notice, OutlineGenerator, OutlineRequest, RenderError, RenderOptions,
    SessionObserver, SessionState, TextExtractor, ValidationError,
};
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

// ── Test collaborators ───────────────────────────────────────────────────────

/// Replays one scripted result per request and keeps the requests.
#[derive(Default)]
struct ScriptedGenerator {
    replies: Mutex<VecDeque<Result<String, GenerationError>>>,
    requests: Mutex<Vec<OutlineRequest>>,
}

impl ScriptedGenerator {
    fn new(replies: Vec<Result<&str, GenerationError>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into_iter().map(|r| r.map(String::from)).collect()),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

impl OutlineGenerator for ScriptedGenerator {
    fn generate<'a>(
        &'a self,
        request: &'a OutlineRequest,
    ) -> BoxFuture<'a, Result<Completion, GenerationError>> {
        self.requests.lock().unwrap().push(request.clone());
        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(GenerationError::EmptyResponse));
        async move {
            reply.map(|text| Completion {
                text,
                input_tokens: 100,
                output_tokens: 20,
                retries: 0,
            })
        }
        .boxed()
    }
}

/// Records each render's outline; can be told to fail.
#[derive(Clone, Default)]
struct RecordingRenderer {
    frames: Arc<Mutex<Vec<String>>>,
    fail: Arc<AtomicBool>,
}

impl MindMapRenderer for RecordingRenderer {
    fn render(
        &mut self,
        _tree: &MindMap,
        markdown: &str,
        _options: &RenderOptions,
    ) -> Result<(), RenderError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(RenderError::WriteFailed {
                path: PathBuf::from("display"),
                source: std::io::Error::other("display gone"),
            });
        }
        self.frames.lock().unwrap().push(markdown.to_string());
        Ok(())
    }
}

#[derive(Default)]
struct RecordingObserver {
    transitions: Mutex<Vec<(SessionState, SessionState)>>,
    notices: Mutex<Vec<Notice>>,
}

impl RecordingObserver {
    fn visited(&self) -> Vec<SessionState> {
        self.transitions
            .lock()
            .unwrap()
            .iter()
            .map(|(_, to)| to.clone())
            .collect()
    }

    fn error_count(&self) -> usize {
        self.notices
            .lock()
            .unwrap()
            .iter()
            .filter(|n| n.is_error())
            .count()
    }
}

impl SessionObserver for RecordingObserver {
    fn on_state_change(&self, from: &SessionState, to: &SessionState) {
        self.transitions
            .lock()
            .unwrap()
            .push((from.clone(), to.clone()));
    }

    fn on_notice(&self, notice: &Notice) {
        self.notices.lock().unwrap().push(notice.clone());
    }
}

struct FailingExtractor;

impl TextExtractor for FailingExtractor {
    fn extract(&self, _bytes: &[u8]) -> Result<String, ExtractionError> {
        Err(ExtractionError::CorruptPdf {
            detail: "xref table missing".to_string(),
        })
    }
}

struct Harness {
    session: MindMapSession,
    generator: Arc<ScriptedGenerator>,
    renderer: RecordingRenderer,
    observer: Arc<RecordingObserver>,
}

fn harness(replies: Vec<Result<&str, GenerationError>>) -> Harness {
    let generator = ScriptedGenerator::new(replies);
    let renderer = RecordingRenderer::default();
    let observer = Arc::new(RecordingObserver::default());
    let session = MindMapSession::builder(generator.clone())
        .renderer(renderer.clone())
        .observer(observer.clone())
        .build();
    Harness {
        session,
        generator,
        renderer,
        observer,
    }
}

const TAGGED: &str = "Here you go:\n<mindmap>\n- Root\n  - A\n  - B\n    - B1\n</mindmap>\nEnjoy.";
const CANONICAL: &str = "- Root\n  - A\n  - B\n    - B1\n";

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new("pdf2mindmap=debug"))
        .with_test_writer()
        .try_init();
}

fn node_named(tree: &MindMap, label: &str) -> NodeId {
    tree.iter()
        .find(|v| v.node.content() == label)
        .map(|v| v.id)
        .unwrap()
}

// ── Generation ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn happy_path_reaches_rendered() {
    let mut h = harness(vec![Ok(TAGGED)]);
    h.session.provide_text("Some document text").unwrap();
    let stats = h.session.generate().await.unwrap();

    assert_eq!(h.session.state(), &SessionState::Rendered);
    assert_eq!(h.session.outline(), CANONICAL);
    assert_eq!(stats.node_count, 4);
    assert_eq!(stats.max_depth, 2);
    assert_eq!(stats.input_tokens, 100);
    assert!(!stats.used_fallback);
    assert_eq!(h.renderer.frames.lock().unwrap().as_slice(), [CANONICAL]);
    assert_eq!(
        h.observer.visited(),
        vec![
            SessionState::TextReady,
            SessionState::Generating,
            SessionState::Rendered
        ]
    );
}

#[tokio::test]
async fn request_carries_source_text_in_template() {
    let mut h = harness(vec![Ok(TAGGED)]);
    h.session.provide_text("Photosynthesis converts light").unwrap();
    h.session.generate().await.unwrap();

    let requests = h.generator.requests.lock().unwrap();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].user.contains("Photosynthesis converts light"));
    assert!(requests[0].user.contains("<mindmap>"));
}

#[tokio::test]
async fn untagged_response_falls_back_to_raw_text() {
    init_tracing();
    let mut h = harness(vec![Ok("- Solo\n  - Child\n")]);
    h.session.provide_text("text").unwrap();
    let stats = h.session.generate().await.unwrap();

    assert!(stats.used_fallback);
    assert_eq!(h.session.outline(), "- Solo\n  - Child\n");
    assert_eq!(h.observer.error_count(), 0);
}

#[tokio::test]
async fn transport_failure_passes_through_failed_to_text_ready() {
    let mut h = harness(vec![Err(GenerationError::Timeout { secs: 120 })]);
    h.session.provide_text("text").unwrap();
    let err = h.session.generate().await.unwrap_err();

    assert!(matches!(err, MindMapError::Generation(GenerationError::Timeout { .. })));
    assert_eq!(h.session.state(), &SessionState::TextReady);
    assert!(h.session.tree().is_none());
    assert_eq!(
        h.observer.visited(),
        vec![
            SessionState::TextReady,
            SessionState::Generating,
            SessionState::Failed,
            SessionState::TextReady
        ]
    );
    assert_eq!(h.observer.error_count(), 1);
    assert!(h.renderer.frames.lock().unwrap().is_empty());
}

#[tokio::test]
async fn retry_after_failure_is_a_fresh_request() {
    let mut h = harness(vec![
        Err(GenerationError::Api {
            attempts: 1,
            message: "rate limited".to_string(),
        }),
        Ok(TAGGED),
    ]);
    h.session.provide_text("text").unwrap();
    assert!(h.session.generate().await.is_err());
    h.session.generate().await.unwrap();

    assert_eq!(h.generator.request_count(), 2);
    assert_eq!(h.session.state(), &SessionState::Rendered);
}

#[tokio::test]
async fn unparsable_outline_keeps_previous_tree() {
    let mut h = harness(vec![Ok(TAGGED), Ok("<mindmap>\n- One\n- Two\n</mindmap>")]);
    h.session.provide_text("text").unwrap();
    h.session.generate().await.unwrap();

    let err = h.session.generate().await.unwrap_err();
    assert!(matches!(err, MindMapError::Parse(_)));
    assert_eq!(h.session.state(), &SessionState::Rendered);
    assert_eq!(h.session.outline(), CANONICAL);
    assert_eq!(h.session.tree().map(|t| t.len()), Some(4));
    assert_eq!(h.observer.error_count(), 1);
}

#[tokio::test]
async fn unparsable_first_outline_returns_to_text_ready() {
    let mut h = harness(vec![Ok("I cannot summarise this document.")]);
    h.session.provide_text("text").unwrap();
    let err = h.session.generate().await.unwrap_err();

    assert!(matches!(err, MindMapError::Parse(_)));
    assert_eq!(h.session.state(), &SessionState::TextReady);
    assert!(h.session.tree().is_none());
}

#[tokio::test]
async fn regenerate_replaces_tree_wholesale() {
    let mut h = harness(vec![Ok(TAGGED), Ok("<mindmap>\n- Fresh\n</mindmap>")]);
    h.session.provide_text("text").unwrap();
    h.session.generate().await.unwrap();
    h.session.generate().await.unwrap();

    assert_eq!(h.session.outline(), "- Fresh\n");
    assert_eq!(h.session.tree().map(|t| t.len()), Some(1));
    assert_eq!(h.renderer.frames.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn generate_without_text_is_invalid_state() {
    let mut h = harness(vec![Ok(TAGGED)]);
    let err = h.session.generate().await.unwrap_err();

    assert!(matches!(err, MindMapError::InvalidState { .. }));
    assert_eq!(h.generator.request_count(), 0);
    assert_eq!(h.session.state(), &SessionState::Idle);
}

#[tokio::test]
async fn whitespace_only_text_is_sent_to_generator() {
    let mut h = harness(vec![Ok("<mindmap>\n- Empty document\n</mindmap>")]);
    h.session.provide_text(" \n\t").unwrap();
    h.session.generate().await.unwrap();
    assert_eq!(h.generator.request_count(), 1);
}

// ── Intake ───────────────────────────────────────────────────────────────────

#[test]
fn empty_text_leaves_session_idle() {
    let mut h = harness(vec![]);
    let err = h.session.provide_text("").unwrap_err();

    assert!(matches!(
        err,
        MindMapError::Extraction(ExtractionError::EmptyText)
    ));
    assert_eq!(h.session.state(), &SessionState::Idle);
    assert!(h.session.source_text().is_none());
    assert_eq!(h.observer.error_count(), 1);
}

#[tokio::test]
async fn load_document_extracts_plain_text() {
    let mut h = harness(vec![]);
    let chars = h
        .session
        .load_document(b"Cells divide by mitosis.".to_vec())
        .await
        .unwrap();

    assert_eq!(chars, 24);
    assert_eq!(h.session.source_text(), Some("Cells divide by mitosis."));
    assert_eq!(h.session.state(), &SessionState::TextReady);
}

#[tokio::test]
async fn extraction_failure_changes_nothing() {
    let generator = ScriptedGenerator::new(vec![]);
    let observer = Arc::new(RecordingObserver::default());
    let mut session = MindMapSession::builder(generator.clone())
        .extractor(Arc::new(FailingExtractor))
        .observer(observer.clone())
        .build();

    let err = session.load_document(b"%PDF-1.7".to_vec()).await.unwrap_err();
    assert!(matches!(
        err,
        MindMapError::Extraction(ExtractionError::CorruptPdf { .. })
    ));
    assert_eq!(session.state(), &SessionState::Idle);
    assert_eq!(generator.request_count(), 0);
    assert_eq!(observer.error_count(), 1);
}

// ── Editing ──────────────────────────────────────────────────────────────────

async fn rendered(h: &mut Harness) {
    h.session.provide_text("text").unwrap();
    h.session.generate().await.unwrap();
    h.session.set_edit_mode(true);
}

#[tokio::test]
async fn edit_reserialises_and_rerenders() {
    let mut h = harness(vec![Ok(TAGGED)]);
    rendered(&mut h).await;
    let a = node_named(h.session.tree().unwrap(), "A");

    let outcome = h.session.handle_node_click(a, "A2").unwrap();

    assert_eq!(outcome.previous, "A");
    assert_eq!(outcome.content, "A2");
    assert_eq!(h.session.outline(), "- Root\n  - A2\n  - B\n    - B1\n");
    assert_eq!(h.session.state(), &SessionState::Rendered);
    let frames = h.renderer.frames.lock().unwrap();
    assert_eq!(frames.len(), 2);
    assert_eq!(frames[1], "- Root\n  - A2\n  - B\n    - B1\n");
    assert!(h
        .observer
        .visited()
        .contains(&SessionState::Editing(a)));
}

#[tokio::test]
async fn edit_trims_label() {
    let mut h = harness(vec![Ok(TAGGED)]);
    rendered(&mut h).await;
    let b1 = node_named(h.session.tree().unwrap(), "B1");

    h.session.handle_node_click(b1, "  Leaf  ").unwrap();
    assert_eq!(h.session.outline(), "- Root\n  - A\n  - B\n    - Leaf\n");
}

#[tokio::test]
async fn blank_edit_is_rejected_and_content_kept() {
    let mut h = harness(vec![Ok(TAGGED)]);
    rendered(&mut h).await;
    let a = node_named(h.session.tree().unwrap(), "A");

    for text in ["", "   "] {
        let err = h.session.handle_node_click(a, text).unwrap_err();
        assert!(matches!(
            err,
            MindMapError::Validation(ValidationError::EmptyContent)
        ));
    }

    assert_eq!(h.session.state(), &SessionState::Rendered);
    assert_eq!(h.session.outline(), CANONICAL);
    assert_eq!(h.observer.error_count(), 2);
    assert_eq!(h.renderer.frames.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn multi_line_edit_is_rejected_and_outline_unchanged() {
    let mut h = harness(vec![Ok(TAGGED)]);
    rendered(&mut h).await;
    let a = node_named(h.session.tree().unwrap(), "A");

    let err = h
        .session
        .handle_node_click(a, "A\n  - Injected")
        .unwrap_err();
    assert!(matches!(
        err,
        MindMapError::Validation(ValidationError::MultiLine)
    ));

    let tree = h.session.tree().unwrap();
    assert_eq!(tree.len(), 4);
    assert_eq!(tree.node(a).unwrap().content(), "A");
    assert_eq!(h.session.outline(), CANONICAL);
    assert_eq!(pdf2mindmap::parse(h.session.outline()).unwrap(), *tree);
    assert_eq!(h.session.state(), &SessionState::Rendered);
    assert_eq!(h.observer.error_count(), 1);
    assert_eq!(h.renderer.frames.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn edit_of_unknown_node_is_rejected() {
    let mut h = harness(vec![Ok(TAGGED)]);
    rendered(&mut h).await;

    let err = h
        .session
        .handle_node_click(NodeId::from_index(99), "X")
        .unwrap_err();
    assert!(matches!(
        err,
        MindMapError::Validation(ValidationError::UnknownNode(_))
    ));
    assert_eq!(h.session.state(), &SessionState::Rendered);
}

#[tokio::test]
async fn edit_outside_edit_mode_is_rejected() {
    let mut h = harness(vec![Ok(TAGGED)]);
    h.session.provide_text("text").unwrap();
    h.session.generate().await.unwrap();

    let a = node_named(h.session.tree().unwrap(), "A");
    let err = h.session.handle_node_click(a, "A2").unwrap_err();
    assert!(matches!(err, MindMapError::EditModeInactive));
    assert_eq!(h.session.outline(), CANONICAL);
}

#[test]
fn edit_before_generation_is_invalid_state() {
    let mut h = harness(vec![]);
    h.session.set_edit_mode(true);
    let err = h
        .session
        .handle_node_click(NodeId::ROOT, "X")
        .unwrap_err();
    assert!(matches!(err, MindMapError::InvalidState { .. }));
}

#[tokio::test]
async fn render_failure_after_edit_keeps_edit() {
    let mut h = harness(vec![Ok(TAGGED)]);
    rendered(&mut h).await;
    let a = node_named(h.session.tree().unwrap(), "A");

    h.renderer.fail.store(true, Ordering::SeqCst);
    let err = h.session.handle_node_click(a, "A2").unwrap_err();
    assert!(matches!(err, MindMapError::Render(_)));
    assert_eq!(h.session.state(), &SessionState::Rendered);
    assert_eq!(h.session.outline(), "- Root\n  - A2\n  - B\n    - B1\n");

    h.renderer.fail.store(false, Ordering::SeqCst);
    h.session.rerender().unwrap();
    let frames = h.renderer.frames.lock().unwrap();
    assert_eq!(frames.last().map(String::as_str), Some("- Root\n  - A2\n  - B\n    - B1\n"));
}

#[tokio::test]
async fn edits_keep_sibling_order() {
    let mut h = harness(vec![Ok(TAGGED)]);
    rendered(&mut h).await;
    let b = node_named(h.session.tree().unwrap(), "B");

    h.session.handle_node_click(b, "AAA first alphabetically").unwrap();
    let tree = h.session.tree().unwrap();
    let labels: Vec<&str> = tree
        .node(tree.root())
        .unwrap()
        .children()
        .iter()
        .map(|&id| tree.node(id).unwrap().content())
        .collect();
    assert_eq!(labels, ["A", "AAA first alphabetically"]);
}

// ── Outline intake and lifecycle ─────────────────────────────────────────────

#[test]
fn open_outline_skips_generator() {
    let mut h = harness(vec![]);
    let nodes = h.session.open_outline("- Root\n    - Child\n").unwrap();

    assert_eq!(nodes, 2);
    assert_eq!(h.session.state(), &SessionState::Rendered);
    assert_eq!(h.session.outline(), "- Root\n  - Child\n");
    assert_eq!(h.generator.request_count(), 0);
}

#[test]
fn into_generator_returns_injected_client() {
    let h = harness(vec![]);
    let generator: Arc<dyn OutlineGenerator> = h.generator.clone();
    let back = h.session.into_generator();
    assert!(Arc::ptr_eq(&back, &generator));
}

#[test]
fn blocking_generation_with_tokio_test() {
    let mut h = harness(vec![Ok(TAGGED)]);
    h.session.provide_text("text").unwrap();
    let stats = tokio_test::block_on(h.session.generate()).unwrap();
    assert_eq!(stats.node_count, 4);
}
