//! Table of contents maintenance during notice application.
//!
//! Structural edits keep `<tableOfContents>` blocks in step with the body:
//! added nodes get a synthesized entry next to their positioning anchor,
//! modified nodes refresh the entry fields, and deletions drop every entry
//! that pointed into the removed subtree.

use std::collections::HashSet;

use crate::doc::{NodePath, XmlElement, XmlNode};
use crate::text::leading_text;

/// The entry family a structural node belongs to in a table of contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TocKind {
    Section,
    Appendix,
    Subpart,
    Interp,
}

impl TocKind {
    pub fn entry_tag(&self) -> &'static str {
        match self {
            TocKind::Section => "tocSecEntry",
            TocKind::Appendix => "tocAppEntry",
            TocKind::Subpart => "tocSubpartEntry",
            TocKind::Interp => "tocInterpEntry",
        }
    }

    fn designator_tag(&self) -> Option<&'static str> {
        match self {
            TocKind::Section => Some("sectionNum"),
            TocKind::Appendix => Some("appendixLetter"),
            TocKind::Subpart => Some("subpartLetter"),
            TocKind::Interp => None,
        }
    }

    pub fn subject_tag(&self) -> &'static str {
        match self {
            TocKind::Section => "sectionSubject",
            TocKind::Appendix => "appendixSubject",
            TocKind::Subpart => "subpartSubject",
            TocKind::Interp => "interpTitle",
        }
    }
}

/// What a table of contents needs to know about one structural node.
#[derive(Debug, Clone, PartialEq)]
pub struct TocFacts {
    pub kind: TocKind,
    pub label: String,
    pub designator: Option<String>,
    pub subject: Option<String>,
}

impl TocFacts {
    /// Read entry facts off a structural node, or `None` when the node's
    /// kind never appears in a table of contents.
    pub fn from_node(el: &XmlElement) -> Option<TocFacts> {
        let label = el.label()?.to_string();
        let (kind, designator, subject) = match el.tag.as_str() {
            "section" => (
                TocKind::Section,
                el.attr("sectionNum").map(str::to_string),
                el.find("subject").map(leading_text),
            ),
            "appendix" => (
                TocKind::Appendix,
                el.attr("appendixLetter").map(str::to_string),
                el.find("appendixTitle").map(leading_text),
            ),
            "subpart" => (
                TocKind::Subpart,
                el.attr("subpartLetter").map(str::to_string),
                el.find("title").map(leading_text),
            ),
            "interpretations" | "interpSection" | "interpAppendix" | "interpAppSection" => (
                TocKind::Interp,
                None,
                el.find("interpTitle").or_else(|| el.find("title")).map(leading_text),
            ),
            _ => return None,
        };
        Some(TocFacts {
            kind,
            label,
            designator,
            subject,
        })
    }
}

/// Paths of every `<tableOfContents>` in the document.
pub fn find_tocs(root: &XmlElement) -> Vec<NodePath> {
    let mut found = Vec::new();
    collect_tocs(root, &mut Vec::new(), &mut found);
    found
}

fn collect_tocs(el: &XmlElement, path: &mut NodePath, found: &mut Vec<NodePath>) {
    for (i, child) in el.children.iter().enumerate() {
        if let XmlNode::Element(c) = child {
            path.push(i);
            if c.tag == "tableOfContents" {
                found.push(path.clone());
            } else {
                collect_tocs(c, path, found);
            }
            path.pop();
        }
    }
}

/// Child index of the entry targeting `target`, if the TOC has one.
pub fn entry_index(toc: &XmlElement, target: &str) -> Option<usize> {
    toc.children.iter().position(|node| {
        node.as_element().and_then(|el| el.attr("target")) == Some(target)
    })
}

/// Build a fresh entry element for the given facts.
pub fn make_entry(facts: &TocFacts) -> XmlElement {
    let mut entry = XmlElement::new(facts.kind.entry_tag());
    entry.set_attr("target", &facts.label);
    if let (Some(tag), Some(value)) = (facts.kind.designator_tag(), facts.designator.as_deref()) {
        entry.push_element(text_field(tag, value));
    }
    if let Some(subject) = facts.subject.as_deref() {
        entry.push_element(text_field(facts.kind.subject_tag(), subject));
    }
    entry
}

/// Bring an existing entry's fields in line with the node's facts.
///
/// Missing field children are synthesized. Designators compare numerically
/// when both sides parse, so `01` and `1` count as the same section number.
/// Returns whether anything changed.
pub fn update_entry(entry: &mut XmlElement, facts: &TocFacts) -> bool {
    let mut changed = false;
    if let (Some(tag), Some(value)) = (facts.kind.designator_tag(), facts.designator.as_deref()) {
        changed |= set_entry_field(entry, tag, value);
    }
    if let Some(subject) = facts.subject.as_deref() {
        changed |= set_entry_field(entry, facts.kind.subject_tag(), subject);
    }
    changed
}

/// Drop every entry whose target is in the removed label set. Returns the
/// number of entries removed.
pub fn delete_entries(toc: &mut XmlElement, removed: &HashSet<String>) -> usize {
    let before = toc.children.len();
    toc.children.retain(|node| {
        match node.as_element().and_then(|el| el.attr("target")) {
            Some(target) => !removed.contains(target),
            None => true,
        }
    });
    before - toc.children.len()
}

fn text_field(tag: &str, value: &str) -> XmlElement {
    let mut field = XmlElement::new(tag);
    field.push_text(value);
    field
}

fn set_entry_field(entry: &mut XmlElement, tag: &str, value: &str) -> bool {
    match entry.find_mut(tag) {
        Some(field) => {
            let old = leading_text(field);
            if field_equal(&old, value) {
                return false;
            }
            field.children.retain(|c| matches!(c, XmlNode::Element(_)));
            field.children.insert(0, XmlNode::Text(value.to_string()));
            true
        }
        None => {
            entry.push_element(text_field(tag, value));
            true
        }
    }
}

fn field_equal(old: &str, new: &str) -> bool {
    match (old.trim().parse::<i64>(), new.trim().parse::<i64>()) {
        (Ok(a), Ok(b)) => a == b,
        _ => old == new,
    }
}
