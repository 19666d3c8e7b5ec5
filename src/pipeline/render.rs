//! Rendering: the mind-map display collaborator.
//!
//! Layout and drawing belong to markmap, which runs in the browser. What
//! this crate owns is handing it the data: [`HtmlRenderer`] writes a
//! standalone page that loads markmap from a CDN and feeds it the canonical
//! outline plus [`RenderOptions`]. [`TerminalRenderer`] prints an ASCII tree
//! with node ids, which is what the interactive edit prompt refers to.
//!
//! Every render is a full rebuild from the current tree. There is no diffing.

use crate::config::RenderOptions;
use crate::error::RenderError;
use crate::tree::{MindMap, NodeId};
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const D3_URL: &str = "https://cdn.jsdelivr.net/npm/d3@7";
const MARKMAP_LIB_URL: &str = "https://cdn.jsdelivr.net/npm/markmap-lib@0.17/dist/browser/index.iife.js";
const MARKMAP_VIEW_URL: &str = "https://cdn.jsdelivr.net/npm/markmap-view@0.17";

/// Displays a mind map. Called once per generation and once per edit.
pub trait MindMapRenderer: Send {
    /// Replace whatever was displayed before with `tree`.
    ///
    /// `markdown` is the canonical serialisation of `tree`.
    fn render(
        &mut self,
        tree: &MindMap,
        markdown: &str,
        options: &RenderOptions,
    ) -> Result<(), RenderError>;
}

/// Renderer that displays nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopRenderer;

impl MindMapRenderer for NoopRenderer {
    fn render(&mut self, _: &MindMap, _: &str, _: &RenderOptions) -> Result<(), RenderError> {
        Ok(())
    }
}

/// Writes a self-contained markmap HTML page.
#[derive(Debug, Clone)]
pub struct HtmlRenderer {
    path: PathBuf,
    title: String,
}

impl HtmlRenderer {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            title: "Mind Map".to_string(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl MindMapRenderer for HtmlRenderer {
    fn render(
        &mut self,
        tree: &MindMap,
        markdown: &str,
        options: &RenderOptions,
    ) -> Result<(), RenderError> {
        let html = render_html(&self.title, markdown, options)?;
        write_atomic(&self.path, &html).map_err(|source| RenderError::WriteFailed {
            path: self.path.clone(),
            source,
        })?;
        info!(
            "Rendered {} nodes to {}",
            tree.len(),
            self.path.display()
        );
        Ok(())
    }
}

/// Keeps the canonical outline on disk in sync with the tree.
#[derive(Debug, Clone)]
pub struct MarkdownFileRenderer {
    path: PathBuf,
}

impl MarkdownFileRenderer {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl MindMapRenderer for MarkdownFileRenderer {
    fn render(&mut self, _: &MindMap, markdown: &str, _: &RenderOptions) -> Result<(), RenderError> {
        write_atomic(&self.path, markdown).map_err(|source| RenderError::WriteFailed {
            path: self.path.clone(),
            source,
        })
    }
}

/// Prints an ASCII tree with node ids.
pub struct TerminalRenderer<W: Write + Send> {
    out: W,
}

impl<W: Write + Send> TerminalRenderer<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write + Send> MindMapRenderer for TerminalRenderer<W> {
    fn render(&mut self, tree: &MindMap, _: &str, _: &RenderOptions) -> Result<(), RenderError> {
        self.out
            .write_all(render_ascii(tree).as_bytes())
            .and_then(|_| self.out.flush())
            .map_err(|source| RenderError::WriteFailed {
                path: PathBuf::from("<terminal>"),
                source,
            })
    }
}

/// Renders to several targets in order; stops at the first failure.
#[derive(Default)]
pub struct MultiRenderer {
    targets: Vec<Box<dyn MindMapRenderer>>,
}

impl MultiRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, target: impl MindMapRenderer + 'static) -> Self {
        self.targets.push(Box::new(target));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

impl MindMapRenderer for MultiRenderer {
    fn render(
        &mut self,
        tree: &MindMap,
        markdown: &str,
        options: &RenderOptions,
    ) -> Result<(), RenderError> {
        for target in &mut self.targets {
            target.render(tree, markdown, options)?;
        }
        Ok(())
    }
}

/// Build the standalone markmap page for `markdown`.
///
/// Branches are coloured by depth from `options.palette`; the remaining
/// options are passed to `Markmap.create` as-is.
pub fn render_html(
    title: &str,
    markdown: &str,
    options: &RenderOptions,
) -> Result<String, RenderError> {
    let source = script_json(&markdown)?;
    let palette = script_json(&options.palette)?;
    let opts = script_json(options)?;
    debug!("HTML payload: {} bytes of outline", source.len());

    Ok(format!(
        r##"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title}</title>
<style>
html, body {{ margin: 0; height: 100%; }}
svg#mindmap {{ display: block; width: 100vw; height: 100vh; }}
</style>
</head>
<body>
<svg id="mindmap"></svg>
<script src="{D3_URL}"></script>
<script src="{MARKMAP_LIB_URL}"></script>
<script src="{MARKMAP_VIEW_URL}"></script>
<script>
(() => {{
  const source = {source};
  const palette = {palette};
  const options = {opts};
  const {{ Transformer, Markmap }} = window.markmap;
  const {{ root }} = new Transformer().transform(source);
  options.color = (node) => palette[node.state.depth % palette.length];
  Markmap.create("svg#mindmap", options, root);
}})();
</script>
</body>
</html>
"##,
        title = escape_html(title),
    ))
}

/// ASCII tree with `[id]` prefixes, root first.
///
/// ```text
/// [0] Root
/// ├── [1] A
/// └── [2] B
///     └── [3] B1
/// ```
pub fn render_ascii(tree: &MindMap) -> String {
    let mut output = String::new();
    render_ascii_node(tree, tree.root(), &mut output, "", true, true);
    output
}

fn render_ascii_node(
    tree: &MindMap,
    id: NodeId,
    output: &mut String,
    prefix: &str,
    is_last: bool,
    is_root: bool,
) {
    let Some(node) = tree.node(id) else {
        return;
    };

    if !is_root {
        output.push_str(prefix);
        output.push_str(if is_last { "└── " } else { "├── " });
    }
    output.push_str(&format!("[{}] {}\n", id.index(), node.content()));

    let child_prefix = if is_root {
        String::new()
    } else {
        format!("{}{}", prefix, if is_last { "    " } else { "│   " })
    };

    let children = node.children();
    for (i, &child) in children.iter().enumerate() {
        render_ascii_node(tree, child, output, &child_prefix, i + 1 == children.len(), false);
    }
}

/// Write `contents` to `path` via a temp file in the same directory, so
/// readers never see a half-written file.
pub fn write_atomic(path: &Path, contents: &str) -> std::io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(contents.as_bytes())?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

// JSON that is safe to drop inside a <script> element.
fn script_json<T: Serialize + ?Sized>(value: &T) -> Result<String, RenderError> {
    serde_json::to_string(value)
        .map(|json| json.replace("</", "<\\/").replace("<!--", "<\\u0021--"))
        .map_err(|e| RenderError::Serialize(e.to_string()))
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
