//! Applying a notice's changeset to a regulation document.
//!
//! Directives run in a canonical order regardless of how the notice lists
//! them: additions first (sorted by label so parents land before their
//! children), then moves in notice order, then deletions and modifications
//! in reverse label order (so children are handled before their parents),
//! and finally target and label rewrites in notice order.

use std::collections::HashSet;

use regml_label::{cmp_labels, format_label, parent_label, parse_label, sibling_label};

use crate::doc::{LabelIndex, NodePath, XmlElement, XmlNode};
use crate::text::node_text;

use super::codec::decode_changeset;
use super::toc::{delete_entries, entry_index, find_tocs, make_entry, update_entry, TocFacts};
use super::types::{ApplyOptions, Change, ChangeError};

/// Apply every directive in the notice's changeset to a copy of the
/// regulation, returning the patched document.
///
/// The notice's `fdsys` and `preamble` replace the regulation's before any
/// directives run. Any error aborts the whole notice; the caller's document
/// is never partially patched. With [`ApplyOptions::dry`] set, every lookup
/// and validation still runs but the returned document is unchanged.
pub fn apply_changes(
    regulation: &XmlElement,
    notice: &XmlElement,
    options: &ApplyOptions,
) -> Result<XmlElement, ChangeError> {
    let changes = decode_changeset(notice)?;
    let mut applier = Applier::new(regulation.clone(), options.dry);
    applier.replace_metadata(notice);
    for change in canonical_order(changes) {
        applier.apply(&change)?;
    }
    Ok(applier.into_document())
}

/// Reorder decoded changes into application order.
pub fn canonical_order(changes: Vec<Change>) -> Vec<Change> {
    let mut added = Vec::new();
    let mut moved = Vec::new();
    let mut deleted = Vec::new();
    let mut modified = Vec::new();
    let mut retargets = Vec::new();
    for change in changes {
        match &change {
            Change::Added { .. } => added.push(change),
            Change::Moved { .. } => moved.push(change),
            Change::Deleted { .. } => deleted.push(change),
            Change::Modified { .. } => modified.push(change),
            Change::ChangeTarget { .. } | Change::ChangeLabel { .. } => retargets.push(change),
        }
    }
    let by_label =
        |a: &Change, b: &Change| cmp_labels(a.label().unwrap_or(""), b.label().unwrap_or(""));
    added.sort_by(by_label);
    deleted.sort_by(by_label);
    deleted.reverse();
    modified.sort_by(by_label);
    modified.reverse();

    let mut ordered = added;
    ordered.extend(moved);
    ordered.extend(deleted);
    ordered.extend(modified);
    ordered.extend(retargets);
    ordered
}

#[derive(Clone, Copy)]
enum Side {
    Before,
    After,
}

struct Applier {
    doc: XmlElement,
    index: LabelIndex,
    dry: bool,
}

impl Applier {
    fn new(doc: XmlElement, dry: bool) -> Self {
        let index = LabelIndex::build(&doc);
        Applier { doc, index, dry }
    }

    fn into_document(self) -> XmlElement {
        self.doc
    }

    fn reindex(&mut self) {
        self.index = LabelIndex::build(&self.doc);
    }

    /// Swap in the notice's `fdsys` and `preamble`, each only when both
    /// documents carry the element, at the document's existing position.
    fn replace_metadata(&mut self, notice: &XmlElement) {
        for tag in ["fdsys", "preamble"] {
            let replacement = match notice.find(tag) {
                Some(el) => el.clone(),
                None => continue,
            };
            if let Some(pos) = self.doc.child_position(tag) {
                if !self.dry {
                    if let Some(slot) = self.doc.children.get_mut(pos) {
                        *slot = XmlNode::Element(replacement);
                    }
                }
            }
        }
    }

    fn apply(&mut self, change: &Change) -> Result<(), ChangeError> {
        match change {
            Change::Added {
                label,
                parent,
                before,
                after,
                node,
            } => self.apply_added(
                label,
                parent.as_deref(),
                before.as_deref(),
                after.as_deref(),
                node,
            ),
            Change::Modified {
                label,
                subpath,
                node,
            } => self.apply_modified(label, subpath.as_deref(), node),
            Change::Deleted { label, subpath } => self.apply_deleted(label, subpath.as_deref()),
            Change::Moved {
                label,
                parent,
                before,
                after,
                subpath,
            } => self.apply_moved(
                label,
                parent.as_deref(),
                before.as_deref(),
                after.as_deref(),
                subpath.as_deref(),
            ),
            Change::ChangeTarget {
                old_target,
                new_target,
                text,
            } => self.apply_change_target(old_target, new_target, text.as_deref()),
            Change::ChangeLabel { label, new_label } => {
                self.apply_change_label(label, new_label)
            }
        }
    }

    fn apply_added(
        &mut self,
        label: &str,
        parent: Option<&str>,
        before: Option<&str>,
        after: Option<&str>,
        node: &XmlElement,
    ) -> Result<(), ChangeError> {
        if self.index.contains(label) {
            return Err(ChangeError::DuplicateLabel(label.to_string()));
        }

        let container_label = match parent {
            Some(p) => p.to_string(),
            None => match parent_label(&parse_label(label)) {
                Some(parts) => format_label(&parts),
                None => return Err(ChangeError::MissingParent(label.to_string())),
            },
        };
        let parent_path = self
            .index
            .path(&container_label)
            .ok_or_else(|| ChangeError::MissingParent(container_label.clone()))?
            .clone();
        let container_path = self.resolve_container(&parent_path);
        let container = self
            .doc
            .element_at(&container_path)
            .ok_or_else(|| ChangeError::MissingParent(container_label.clone()))?;

        // An unresolvable hint falls through to the next positioning rule;
        // the last resort is appending to the container.
        let mut insert_at = container.children.len();
        let mut anchor: Option<(String, Side)> = None;
        let mut placed = false;
        if let Some(b) = before {
            if let Some(i) = child_label_index(container, b) {
                insert_at = i;
                anchor = Some((b.to_string(), Side::Before));
                placed = true;
            }
        }
        if !placed {
            if let Some(a) = after {
                if let Some(i) = child_label_index(container, a) {
                    insert_at = i + 1;
                    anchor = Some((a.to_string(), Side::After));
                    placed = true;
                }
            }
        }
        if !placed && parent.is_none() {
            if let Some(sib) = sibling_label(&parse_label(label)) {
                let sib = format_label(&sib);
                if let Some(i) = child_label_index(container, &sib) {
                    insert_at = i + 1;
                    anchor = Some((sib, Side::After));
                }
            }
        }

        if !self.dry {
            if let Some(container) = self.doc.element_at_mut(&container_path) {
                container
                    .children
                    .insert(insert_at, XmlNode::Element(node.clone()));
            }
            self.reindex();
            self.sync_toc_on_add(node, anchor);
        }
        Ok(())
    }

    fn apply_modified(
        &mut self,
        label: &str,
        subpath: Option<&str>,
        node: &XmlElement,
    ) -> Result<(), ChangeError> {
        let path = self
            .index
            .path(label)
            .ok_or_else(|| ChangeError::MissingLabel(label.to_string()))?
            .clone();
        match subpath {
            Some(sp) => {
                let target = self
                    .doc
                    .element_at(&path)
                    .ok_or_else(|| ChangeError::MissingLabel(label.to_string()))?;
                let child_idx = target
                    .child_position(sp)
                    .ok_or_else(|| ChangeError::MissingLabel(format!("{label}/{sp}")))?;
                if !self.dry {
                    if let Some(target) = self.doc.element_at_mut(&path) {
                        if let Some(slot) = target.children.get_mut(child_idx) {
                            *slot = XmlNode::Element(node.clone());
                        }
                    }
                    self.reindex();
                }
            }
            None => {
                if path.is_empty() {
                    return Err(ChangeError::MalformedChange(
                        "cannot replace the document root".to_string(),
                    ));
                }
                if !self.dry {
                    if let Some(slot) = self.doc.node_at_mut(&path) {
                        *slot = XmlNode::Element(node.clone());
                    }
                    self.reindex();
                }
            }
        }
        if !self.dry {
            self.sync_toc_on_modify(node);
        }
        Ok(())
    }

    fn apply_deleted(&mut self, label: &str, subpath: Option<&str>) -> Result<(), ChangeError> {
        let path = self
            .index
            .path(label)
            .ok_or_else(|| ChangeError::MissingLabel(label.to_string()))?
            .clone();
        let (holder_path, remove_idx) = match subpath {
            Some(sp) => {
                let target = self
                    .doc
                    .element_at(&path)
                    .ok_or_else(|| ChangeError::MissingLabel(label.to_string()))?;
                let child_idx = target
                    .child_position(sp)
                    .ok_or_else(|| ChangeError::MissingLabel(format!("{label}/{sp}")))?;
                (path, child_idx)
            }
            None => match path.split_last() {
                Some((last, rest)) => (rest.to_vec(), *last),
                None => {
                    return Err(ChangeError::MalformedChange(
                        "cannot delete the document root".to_string(),
                    ))
                }
            },
        };

        let removed_labels = self
            .doc
            .element_at(&holder_path)
            .and_then(|holder| holder.children.get(remove_idx))
            .and_then(XmlNode::as_element)
            .map(subtree_labels)
            .unwrap_or_default();

        if !self.dry {
            if let Some(holder) = self.doc.element_at_mut(&holder_path) {
                if remove_idx < holder.children.len() {
                    holder.children.remove(remove_idx);
                }
            }
            self.reindex();
            self.sync_toc_on_delete(&removed_labels);
        }
        Ok(())
    }

    fn apply_moved(
        &mut self,
        label: &str,
        parent: Option<&str>,
        before: Option<&str>,
        after: Option<&str>,
        subpath: Option<&str>,
    ) -> Result<(), ChangeError> {
        let parent = parent.ok_or_else(|| ChangeError::MissingParent(label.to_string()))?;
        let source_path = self
            .index
            .path(label)
            .ok_or_else(|| ChangeError::MissingLabel(label.to_string()))?
            .clone();
        let (take_path, take_idx) = match subpath {
            Some(sp) => {
                let el = self
                    .doc
                    .element_at(&source_path)
                    .ok_or_else(|| ChangeError::MissingLabel(label.to_string()))?;
                let idx = el
                    .child_position(sp)
                    .ok_or_else(|| ChangeError::MissingLabel(format!("{label}/{sp}")))?;
                (source_path, idx)
            }
            None => match source_path.split_last() {
                Some((last, rest)) => (rest.to_vec(), *last),
                None => {
                    return Err(ChangeError::MalformedChange(
                        "cannot move the document root".to_string(),
                    ))
                }
            },
        };
        if !self.index.contains(parent) {
            return Err(ChangeError::MissingParent(parent.to_string()));
        }
        if self.dry {
            return Ok(());
        }

        let node = {
            let holder = self
                .doc
                .element_at_mut(&take_path)
                .ok_or_else(|| ChangeError::MissingLabel(label.to_string()))?;
            if take_idx >= holder.children.len() {
                return Err(ChangeError::MissingLabel(label.to_string()));
            }
            holder.children.remove(take_idx)
        };
        self.reindex();

        // Re-resolve the destination: removing the node shifted paths, and
        // a parent inside the moved subtree is gone now.
        let parent_path = self
            .index
            .path(parent)
            .ok_or_else(|| ChangeError::MissingParent(parent.to_string()))?
            .clone();
        let container_path = self.resolve_container(&parent_path);
        let container = self
            .doc
            .element_at(&container_path)
            .ok_or_else(|| ChangeError::MissingParent(parent.to_string()))?;

        let mut insert_at = container.children.len();
        let mut placed = false;
        if let Some(b) = before {
            if let Some(i) = child_label_index(container, b) {
                insert_at = i;
                placed = true;
            }
        }
        if !placed {
            if let Some(a) = after {
                if let Some(i) = child_label_index(container, a) {
                    insert_at = i + 1;
                }
            }
        }

        if let Some(container) = self.doc.element_at_mut(&container_path) {
            container.children.insert(insert_at, node);
        }
        self.reindex();
        Ok(())
    }

    fn apply_change_target(
        &mut self,
        old_target: &str,
        new_target: &str,
        text: Option<&str>,
    ) -> Result<(), ChangeError> {
        if !self.dry {
            retarget_refs(&mut self.doc, old_target, new_target, text);
        }
        Ok(())
    }

    fn apply_change_label(&mut self, label: &str, new_label: &str) -> Result<(), ChangeError> {
        let path = self
            .index
            .path(label)
            .ok_or_else(|| ChangeError::MissingLabel(label.to_string()))?
            .clone();
        if !self.dry {
            if let Some(el) = self.doc.element_at_mut(&path) {
                el.set_attr("label", new_label);
            }
            self.reindex();
        }
        Ok(())
    }

    /// Parts and subparts keep their structural children inside a
    /// `<content>` wrapper; insertions go there when the wrapper exists.
    fn resolve_container(&self, parent_path: &NodePath) -> NodePath {
        let mut path = parent_path.clone();
        if let Some(parent_el) = self.doc.element_at(parent_path) {
            if matches!(parent_el.tag.as_str(), "part" | "subpart") {
                if let Some(idx) = parent_el.child_position("content") {
                    path.push(idx);
                }
            }
        }
        path
    }

    fn sync_toc_on_add(&mut self, node: &XmlElement, anchor: Option<(String, Side)>) {
        let facts = match TocFacts::from_node(node) {
            Some(f) => f,
            None => return,
        };
        let (anchor_label, side) = match anchor {
            Some(a) => a,
            None => return,
        };
        for toc_path in find_tocs(&self.doc) {
            let toc = match self.doc.element_at_mut(&toc_path) {
                Some(t) => t,
                None => continue,
            };
            if let Some(existing) = entry_index(toc, &facts.label) {
                if let Some(XmlNode::Element(entry)) = toc.children.get_mut(existing) {
                    update_entry(entry, &facts);
                }
            } else if let Some(anchor_idx) = entry_index(toc, &anchor_label) {
                let at = match side {
                    Side::Before => anchor_idx,
                    Side::After => anchor_idx + 1,
                };
                toc.children.insert(at, XmlNode::Element(make_entry(&facts)));
            }
        }
    }

    fn sync_toc_on_modify(&mut self, node: &XmlElement) {
        let facts = match TocFacts::from_node(node) {
            Some(f) => f,
            None => return,
        };
        for toc_path in find_tocs(&self.doc) {
            let toc = match self.doc.element_at_mut(&toc_path) {
                Some(t) => t,
                None => continue,
            };
            if let Some(i) = entry_index(toc, &facts.label) {
                if let Some(XmlNode::Element(entry)) = toc.children.get_mut(i) {
                    update_entry(entry, &facts);
                }
            }
        }
    }

    fn sync_toc_on_delete(&mut self, removed: &HashSet<String>) {
        if removed.is_empty() {
            return;
        }
        for toc_path in find_tocs(&self.doc) {
            if let Some(toc) = self.doc.element_at_mut(&toc_path) {
                delete_entries(toc, removed);
            }
        }
    }
}

fn child_label_index(container: &XmlElement, label: &str) -> Option<usize> {
    container
        .children
        .iter()
        .position(|node| node.as_element().and_then(XmlElement::label) == Some(label))
}

fn subtree_labels(el: &XmlElement) -> HashSet<String> {
    let mut labels = HashSet::new();
    if let Some(l) = el.label() {
        labels.insert(l.to_string());
    }
    for d in el.descendants() {
        if let Some(l) = d.label() {
            labels.insert(l.to_string());
        }
    }
    labels
}

fn retarget_refs(el: &mut XmlElement, old: &str, new: &str, filter: Option<&str>) {
    for child in el.children.iter_mut() {
        if let XmlNode::Element(c) = child {
            if c.tag == "ref" && c.attr("target") == Some(old) {
                let matches = match filter {
                    Some(f) => node_text(c).trim().eq_ignore_ascii_case(f),
                    None => true,
                };
                if matches {
                    c.set_attr("target", new);
                }
            }
            retarget_refs(c, old, new, filter);
        }
    }
}
