//! Nodes of the normalized regulation tree.
//!
//! The normalized tree is the JSON-facing view of a regulation: a
//! hierarchy of [`RegNode`]s with dash-joined labels, flattened text,
//! and the markup noise of the source document boiled away.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use serde_json::{Map, Value};

/// Category of a normalized node.
///
/// Paragraphs inherit the category of the structure that contains them,
/// so a paragraph under an appendix section is itself `Appendix`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
    Regtext,
    Subpart,
    Emptypart,
    Appendix,
    Interp,
}

impl NodeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeType::Regtext => "regtext",
            NodeType::Subpart => "subpart",
            NodeType::Emptypart => "emptypart",
            NodeType::Appendix => "appendix",
            NodeType::Interp => "interp",
        }
    }
}

/// One node of the normalized tree.
///
/// `title` is empty rather than optional because an empty title is
/// omitted from the JSON form either way. `marker` distinguishes three
/// states the JSON must preserve: absent (`None`, omitted), present but
/// suppressed (`Some("none")` or `Some("")`), and an actual marker.
/// `source` carries the serialized source element for paragraph nodes
/// so that two trees can be compared by content.
#[derive(Debug, Clone, PartialEq)]
pub struct RegNode {
    pub label: Vec<String>,
    pub node_type: NodeType,
    pub text: String,
    pub title: String,
    pub marker: Option<String>,
    pub depth: usize,
    pub children: Vec<RegNode>,
    pub source: Option<String>,
}

impl Default for RegNode {
    fn default() -> RegNode {
        RegNode {
            label: Vec::new(),
            node_type: NodeType::Regtext,
            text: String::new(),
            title: String::new(),
            marker: None,
            depth: 0,
            children: Vec::new(),
            source: None,
        }
    }
}

impl RegNode {
    /// The node label as a single dash-joined string.
    pub fn label_id(&self) -> String {
        self.label.join("-")
    }

    /// Convert the node, and optionally its whole subtree, to JSON.
    pub fn to_json(&self, include_children: bool) -> Value {
        let mut out = Map::new();
        if include_children {
            let children = self
                .children
                .iter()
                .map(|child| child.to_json(true))
                .collect();
            out.insert("children".to_string(), Value::Array(children));
        }
        out.insert(
            "label".to_string(),
            Value::Array(self.label.iter().map(|p| Value::String(p.clone())).collect()),
        );
        out.insert(
            "node_type".to_string(),
            Value::String(self.node_type.as_str().to_string()),
        );
        out.insert("text".to_string(), Value::String(self.text.clone()));
        if !self.title.is_empty() {
            out.insert("title".to_string(), Value::String(self.title.clone()));
        }
        if let Some(marker) = &self.marker {
            out.insert("marker".to_string(), Value::String(marker.clone()));
        }
        Value::Object(out)
    }

    /// Hash of the node's own content, ignoring its position and its
    /// children. Two nodes with equal hashes carry the same text.
    pub fn content_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.node_type.as_str().hash(&mut hasher);
        self.text.hash(&mut hasher);
        self.source.as_deref().unwrap_or("").hash(&mut hasher);
        hasher.finish()
    }

    /// All nodes of the subtree that match the predicate. The node
    /// itself is not considered, only its descendants.
    pub fn find_node<'a>(&'a self, func: &dyn Fn(&RegNode) -> bool) -> Vec<&'a RegNode> {
        let mut matches: Vec<&RegNode> =
            self.children.iter().filter(|child| func(child)).collect();
        for child in &self.children {
            matches.extend(child.find_node(func));
        }
        matches
    }

    /// The node and its whole subtree as a flat list, preorder.
    pub fn flatten(&self) -> Vec<&RegNode> {
        let mut nodes = vec![self];
        for child in &self.children {
            nodes.extend(child.flatten());
        }
        nodes
    }

    /// Every label in the subtree, the node's own label first.
    pub fn labels(&self) -> Vec<String> {
        let mut labels = vec![self.label_id()];
        for child in &self.children {
            labels.extend(child.labels());
        }
        labels
    }

    /// Height of the subtree. A leaf has height 1.
    pub fn height(&self) -> usize {
        1 + self
            .children
            .iter()
            .map(|child| child.height())
            .max()
            .unwrap_or(0)
    }
}
