#![allow(dead_code)]

use std::collections::BTreeSet;

use regml::doc::XmlElement;
use regml::text::node_text;

/// Every label attribute in the document, the root included.
pub fn label_set(doc: &XmlElement) -> BTreeSet<String> {
    let mut labels: BTreeSet<String> = doc
        .descendants()
        .filter_map(|el| el.label().map(str::to_string))
        .collect();
    if let Some(label) = doc.label() {
        labels.insert(label.to_string());
    }
    labels
}

/// Labels of a container's element children, in document order.
pub fn child_labels(container: &XmlElement) -> Vec<String> {
    container
        .elements()
        .filter_map(|e| e.label().map(str::to_string))
        .collect()
}

/// The content wrapper of the subpart with the given label.
pub fn subpart_content<'a>(doc: &'a XmlElement, label: &str) -> &'a XmlElement {
    doc.descendants()
        .find(|el| el.tag == "subpart" && el.label() == Some(label))
        .and_then(|subpart| subpart.find("content"))
        .expect("subpart content should exist")
}

/// Every `(text, target)` pair of the document's references.
pub fn ref_targets(doc: &XmlElement) -> Vec<(String, String)> {
    doc.descendants()
        .filter(|el| el.tag == "ref")
        .map(|r| {
            (
                node_text(r).trim().to_string(),
                r.attr("target").unwrap_or_default().to_string(),
            )
        })
        .collect()
}

/// Targets of every table of contents entry, in document order.
pub fn toc_targets(doc: &XmlElement) -> Vec<String> {
    doc.descendants()
        .filter(|el| el.tag.starts_with("toc") && el.tag.ends_with("Entry"))
        .filter_map(|e| e.attr("target").map(str::to_string))
        .collect()
}

/// Subject text of the table of contents entry targeting `target`.
pub fn toc_subject(doc: &XmlElement, target: &str) -> Option<String> {
    doc.descendants()
        .filter(|el| el.tag.starts_with("toc") && el.tag.ends_with("Entry"))
        .find(|e| e.attr("target") == Some(target))
        .and_then(|e| e.elements().find(|c| c.tag.ends_with("Subject")))
        .map(|s| node_text(s).trim().to_string())
}
