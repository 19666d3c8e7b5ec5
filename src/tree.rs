//! Arena-backed mind-map tree.
//!
//! Nodes live in a flat `Vec` owned by [`MindMap`] and refer to each other by
//! [`NodeId`]. The root is always the first slot, so a `MindMap` value can
//! never be empty: "no mind map" is spelled `Option<MindMap>::None`.
//!
//! Nodes are only ever appended (by the parser or [`MindMap::add_child`]) and
//! their content edited in place, which keeps every `NodeId` valid for the
//! lifetime of the tree and keeps sibling order stable under edit.

use crate::error::ValidationError;
use serde::{Serialize, Serializer};
use std::fmt;

/// Index of a node inside its [`MindMap`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// The root of every tree.
    pub const ROOT: NodeId = NodeId(0);

    /// Raw arena index, as shown to users in the edit prompt.
    pub fn index(self) -> usize {
        self.0
    }

    /// Rebuild an id from an index the user typed. Validity is checked by the
    /// tree operations that receive it.
    pub fn from_index(index: usize) -> Self {
        NodeId(index)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A single labelled node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MindMapNode {
    content: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl MindMapNode {
    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Children in display order.
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

/// A rooted mind map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MindMap {
    nodes: Vec<MindMapNode>,
}

impl MindMap {
    /// Create a tree holding only a root node.
    pub fn new(root_content: impl AsRef<str>) -> Result<Self, ValidationError> {
        let content = validated(root_content.as_ref())?;
        Ok(Self {
            nodes: vec![MindMapNode {
                content,
                parent: None,
                children: Vec::new(),
            }],
        })
    }

    pub fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    pub fn node(&self, id: NodeId) -> Option<&MindMapNode> {
        self.nodes.get(id.0)
    }

    /// Number of nodes, root included. Never zero.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always `false`; present for API symmetry with collections.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Append a new last child under `parent`.
    pub fn add_child(
        &mut self,
        parent: NodeId,
        content: impl AsRef<str>,
    ) -> Result<NodeId, ValidationError> {
        if parent.0 >= self.nodes.len() {
            return Err(ValidationError::UnknownNode(parent));
        }
        let content = validated(content.as_ref())?;
        let id = NodeId(self.nodes.len());
        self.nodes.push(MindMapNode {
            content,
            parent: Some(parent),
            children: Vec::new(),
        });
        self.nodes[parent.0].children.push(id);
        Ok(id)
    }

    /// Replace a node's label.
    ///
    /// The new text is trimmed before it is stored. Text that trims to
    /// nothing, or that still contains a line break, is rejected and the
    /// node keeps its previous content.
    pub fn set_content(
        &mut self,
        id: NodeId,
        new_text: impl AsRef<str>,
    ) -> Result<(), ValidationError> {
        let content = validated(new_text.as_ref())?;
        let node = self
            .nodes
            .get_mut(id.0)
            .ok_or(ValidationError::UnknownNode(id))?;
        node.content = content;
        Ok(())
    }

    /// Nesting level of `id` (root = 0). Derived from the parent chain.
    pub fn depth(&self, id: NodeId) -> Option<usize> {
        let mut node = self.node(id)?;
        let mut depth = 0;
        while let Some(parent) = node.parent {
            depth += 1;
            node = &self.nodes[parent.0];
        }
        Some(depth)
    }

    /// Deepest nesting level in the tree.
    pub fn max_depth(&self) -> usize {
        self.iter().map(|v| v.depth).max().unwrap_or(0)
    }

    /// Depth-first, pre-order walk starting at the root.
    ///
    /// Every call starts a fresh walk; the iterator is also `Clone`.
    pub fn iter(&self) -> DepthFirst<'_> {
        DepthFirst {
            tree: self,
            stack: vec![(NodeId::ROOT, 0)],
        }
    }

    /// Case-insensitive substring search over node labels, in pre-order.
    pub fn find(&self, query: &str) -> Vec<NodeId> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }
        self.iter()
            .filter(|v| v.node.content.to_lowercase().contains(&needle))
            .map(|v| v.id)
            .collect()
    }

    /// Labels along the path from the root down to `id`.
    pub fn path(&self, id: NodeId) -> Option<Vec<&str>> {
        let mut labels = Vec::new();
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            let node = self.node(current)?;
            labels.push(node.content.as_str());
            cursor = node.parent;
        }
        labels.reverse();
        Some(labels)
    }

    /// Canonical indented-bullet Markdown for this tree.
    pub fn to_markdown(&self) -> String {
        crate::markdown::serialize(Some(self))
    }

    fn nested(&self, id: NodeId) -> NestedNode<'_> {
        let node = &self.nodes[id.0];
        NestedNode {
            content: &node.content,
            children: node.children.iter().map(|&c| self.nested(c)).collect(),
        }
    }
}

fn validated(text: &str) -> Result<String, ValidationError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        Err(ValidationError::EmptyContent)
    } else if trimmed.contains(['\n', '\r']) {
        // A line break would serialise as extra bullets.
        Err(ValidationError::MultiLine)
    } else {
        Ok(trimmed.to_string())
    }
}

/// One step of a [`DepthFirst`] walk.
#[derive(Debug, Clone, Copy)]
pub struct Visit<'a> {
    pub id: NodeId,
    pub depth: usize,
    pub node: &'a MindMapNode,
}

/// Pre-order iterator returned by [`MindMap::iter`].
#[derive(Debug, Clone)]
pub struct DepthFirst<'a> {
    tree: &'a MindMap,
    stack: Vec<(NodeId, usize)>,
}

impl<'a> Iterator for DepthFirst<'a> {
    type Item = Visit<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let (id, depth) = self.stack.pop()?;
        let node = &self.tree.nodes[id.0];
        // Reverse so the first child is popped first.
        self.stack
            .extend(node.children.iter().rev().map(|&c| (c, depth + 1)));
        Some(Visit { id, depth, node })
    }
}

// Nested `{content, children}` shape, the form mind-map viewers consume.
#[derive(Serialize)]
struct NestedNode<'a> {
    content: &'a str,
    children: Vec<NestedNode<'a>>,
}

impl Serialize for MindMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.nested(NodeId::ROOT).serialize(serializer)
    }
}
