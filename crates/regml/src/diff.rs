//! Comparing two versions of a regulation.
//!
//! The comparator works on normalized trees, not raw documents, so two
//! versions are judged by what they say rather than how the markup is
//! arranged. It reports per-label operations and is meant for auditing
//! a version history, not for driving change application.

use indexmap::IndexMap;
use serde::Serialize;

use regml_label::cmp_labels;

use crate::doc::XmlElement;
use crate::tree::{build_reg_tree, RegNode};

/// What happened to a label between two versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffOp {
    Added,
    Deleted,
    Modified,
}

/// A single entry of a version comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DiffEntry {
    pub op: DiffOp,
}

/// Compare two regulation documents label by label.
pub fn diff_documents(left: &XmlElement, right: &XmlElement) -> IndexMap<String, DiffEntry> {
    diff_trees(&build_reg_tree(left), &build_reg_tree(right))
}

/// Compare two normalized trees label by label.
///
/// A label only on the left is deleted, only on the right is added. A
/// label on both sides is modified only when its content hash differs,
/// so nodes that merely moved around their parent are not reported.
/// Entries come back in canonical label order.
pub fn diff_trees(left: &RegNode, right: &RegNode) -> IndexMap<String, DiffEntry> {
    let left_nodes = index_nodes(left);
    let right_nodes = index_nodes(right);

    let mut entries: Vec<(String, DiffEntry)> = Vec::new();
    for (label, node) in &left_nodes {
        match right_nodes.get(label) {
            None => entries.push((label.clone(), DiffEntry { op: DiffOp::Deleted })),
            Some(other) => {
                if node.content_hash() != other.content_hash() {
                    entries.push((label.clone(), DiffEntry { op: DiffOp::Modified }));
                }
            }
        }
    }
    for label in right_nodes.keys() {
        if !left_nodes.contains_key(label) {
            entries.push((label.clone(), DiffEntry { op: DiffOp::Added }));
        }
    }

    entries.sort_by(|a, b| cmp_labels(&a.0, &b.0));
    entries.into_iter().collect()
}

fn index_nodes(root: &RegNode) -> IndexMap<String, &RegNode> {
    let mut nodes = IndexMap::new();
    for node in root.flatten() {
        // The first occurrence wins if a label repeats.
        nodes.entry(node.label_id()).or_insert(node);
    }
    nodes
}
