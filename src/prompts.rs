//! Prompts for outline generation.
//!
//! Every prompt lives here so unit tests can inspect them without calling a
//! model. Callers can replace the system prompt through
//! [`crate::config::MindMapConfig::system_prompt`]; the user template is
//! fixed because [`crate::pipeline::postprocess::extract_outline`] depends on
//! the `<mindmap>` tags it asks for.

/// Opening tag the model must wrap its outline in.
pub const OPEN_TAG: &str = "<mindmap>";

/// Closing tag the model must wrap its outline in.
pub const CLOSE_TAG: &str = "</mindmap>";

/// Default system prompt.
pub const DEFAULT_SYSTEM_PROMPT: &str =
    "You are a helpful assistant that creates mind maps in Markdown format.";

/// User message template. `{text}` is replaced with the extracted document text.
pub const OUTLINE_TEMPLATE: &str = r#"Create a mind map of the document below.

Follow these rules precisely:

1. FORMAT
   - Output an indented bullet list using "- " markers
   - Indent each level with exactly two spaces
   - Use exactly one top-level bullet: the document's central topic
   - Never skip a level: a child is indented exactly one level below its parent

2. LABELS
   - Each node label is 3 to 10 words
   - Labels are noun phrases or short statements, not full paragraphs
   - No trailing punctuation

3. HIERARCHY
   - Level 1 holds the main themes (3 to 7 of them)
   - Deeper levels refine their parent: arguments, examples, figures, definitions
   - Merge repeated points; keep the most specific wording
   - Stop at four levels below the root

4. OUTPUT
   - Wrap the whole list in <mindmap> and </mindmap> tags
   - Do NOT add commentary inside the tags
   - Do NOT wrap the list in ``` fences

Document:
"""
{text}
""""#;

/// Build the user message for `text`.
pub fn outline_user_message(text: &str) -> String {
    OUTLINE_TEMPLATE.replace("{text}", text)
}
