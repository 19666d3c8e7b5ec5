//! Post-processing: pull the outline out of a raw model completion.
//!
//! The prompt asks the model to wrap its list in `<mindmap>…</mindmap>`.
//! Models mostly comply but like to add a sentence before or after. This
//! module cuts out the tagged section, and when the tags are missing falls
//! back to the full raw completion, untouched, so the parser can still have
//! a go at it.

use crate::prompts::{CLOSE_TAG, OPEN_TAG};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::warn;

/// The outline source handed to the parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedOutline {
    /// Outline Markdown: trimmed tag contents, or the raw completion.
    pub text: String,
    /// `true` when the tags were missing and `text` is the raw completion.
    pub fallback: bool,
}

static RE_MINDMAP: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        "(?s){}(.*?){}",
        regex::escape(OPEN_TAG),
        regex::escape(CLOSE_TAG)
    ))
    .unwrap()
});

static RE_OUTER_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```(?:markdown|md)?\n(.*)\n```$").unwrap());

/// Extract the outline section from a completion.
///
/// 1. First `<mindmap>…</mindmap>` section, trimmed, with any ```markdown
///    fence the model added inside the tags removed.
/// 2. Otherwise the full completion, byte for byte.
pub fn extract_outline(response: &str) -> ExtractedOutline {
    match RE_MINDMAP.captures(response) {
        Some(caps) => ExtractedOutline {
            text: strip_markdown_fences(caps[1].trim()),
            fallback: false,
        },
        None => {
            warn!(
                "Completion has no {}…{} section; using the raw text as outline",
                OPEN_TAG, CLOSE_TAG
            );
            ExtractedOutline {
                text: response.to_string(),
                fallback: true,
            }
        }
    }
}

fn strip_markdown_fences(input: &str) -> String {
    match RE_OUTER_FENCES.captures(input) {
        Some(caps) => caps[1].trim().to_string(),
        None => input.to_string(),
    }
}
