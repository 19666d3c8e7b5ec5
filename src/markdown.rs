//! Indented-bullet Markdown ⇄ [`MindMap`].
//!
//! The outline grammar is one node per line:
//!
//! ```text
//! - Root
//!   - Child
//!     - Grandchild
//! ```
//!
//! [`serialize`] always writes the canonical form: `- ` markers and exactly
//! two spaces per depth level. [`parse`] is more forgiving about whitespace
//! (any consistent indent unit, tabs, CRLF, trailing blanks) but strict about
//! structure: one root, no skipped levels, no empty labels. Lines that are
//! not bullets at all (headings, prose, blank lines) are skipped so that a
//! model's chatter around the list does not break the map.

use crate::error::ParseError;
use crate::tree::{MindMap, NodeId};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

/// Indentation emitted per depth level.
pub const INDENT: &str = "  ";

/// Columns a tab expands to when measuring indentation.
const TAB_WIDTH: usize = 4;

static RE_BULLET: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([ \t]*)-(?:[ \t]+(.*))?$").unwrap());

/// Parse an indented bullet list into a tree.
///
/// The first indented bullet fixes the indent unit; every other indentation
/// must be a whole multiple of it, and depth is `indent / unit`. For the
/// canonical two-space form that is simply `indent / 2`. Because the unit is
/// learned from the input, `"- Root\n    - A"` nests `A` at depth 1 rather
/// than rejecting it as a jump from depth 0 to depth 2.
///
/// # Errors
/// * [`ParseError::NoBullets`] — no line matched `- text`
/// * [`ParseError::EmptyContent`] — a bullet with no label
/// * [`ParseError::MisalignedIndent`] — indentation off the unit grid
/// * [`ParseError::DepthSkip`] — a line nested two or more levels below the
///   previous bullet (ambiguous parent, so rejected rather than re-parented)
/// * [`ParseError::MultipleRoots`] — more than one top-level bullet
pub fn parse(markdown: &str) -> Result<MindMap, ParseError> {
    let mut tree: Option<MindMap> = None;
    // ancestors[d] is the most recent node at depth d.
    let mut ancestors: Vec<NodeId> = Vec::new();
    let mut unit: Option<usize> = None;
    let mut skipped = 0usize;

    for (idx, line) in markdown.lines().enumerate() {
        let line_no = idx + 1;
        let Some(caps) = RE_BULLET.captures(line) else {
            if !line.trim().is_empty() {
                skipped += 1;
            }
            continue;
        };

        let text = caps.get(2).map_or("", |m| m.as_str()).trim();
        if text.is_empty() {
            return Err(ParseError::EmptyContent { line: line_no });
        }

        let indent = indent_width(&caps[1]);
        let depth = match (indent, unit) {
            (0, _) => 0,
            (width, None) => {
                unit = Some(width);
                1
            }
            (width, Some(u)) if width % u == 0 => width / u,
            (width, Some(u)) => {
                return Err(ParseError::MisalignedIndent {
                    line: line_no,
                    indent: width,
                    unit: u,
                })
            }
        };

        if let Some(map) = tree.as_mut() {
            if depth == 0 {
                return Err(ParseError::MultipleRoots { line: line_no });
            }
            let max_allowed = ancestors.len();
            if depth > max_allowed {
                return Err(ParseError::DepthSkip {
                    line: line_no,
                    depth,
                    max_allowed,
                });
            }
            ancestors.truncate(depth);
            let parent = ancestors[depth - 1];
            let id = map
                .add_child(parent, text)
                .map_err(|_| ParseError::EmptyContent { line: line_no })?;
            ancestors.push(id);
        } else {
            if depth > 0 {
                return Err(ParseError::DepthSkip {
                    line: line_no,
                    depth,
                    max_allowed: 0,
                });
            }
            let root =
                MindMap::new(text).map_err(|_| ParseError::EmptyContent { line: line_no })?;
            ancestors.push(root.root());
            tree = Some(root);
        }
    }

    if skipped > 0 {
        debug!("Outline parse skipped {} non-bullet lines", skipped);
    }

    tree.ok_or(ParseError::NoBullets)
}

/// Serialise a tree to canonical indented-bullet Markdown.
///
/// Each node becomes `"  " * depth + "- " + content + "\n"` in depth-first
/// pre-order. Content is written as stored; trimming happens when content is
/// set. An absent tree serialises to the empty string.
pub fn serialize(tree: Option<&MindMap>) -> String {
    let Some(tree) = tree else {
        return String::new();
    };

    let mut out = String::new();
    for visit in tree.iter() {
        for _ in 0..visit.depth {
            out.push_str(INDENT);
        }
        out.push_str("- ");
        out.push_str(visit.node.content());
        out.push('\n');
    }
    out
}

fn indent_width(indent: &str) -> usize {
    indent.chars().fold(0, |col, ch| match ch {
        '\t' => (col / TAB_WIDTH + 1) * TAB_WIDTH,
        _ => col + 1,
    })
}
