//! Building the normalized regulation tree from a document.
//!
//! [`build_reg_tree`] walks the structural elements of a regulation
//! (subparts, sections, paragraphs, appendices, interpretations) and
//! produces the [`RegNode`] hierarchy the JSON output and the layer
//! builders work from. Non-structural markup (tables, references,
//! formatting) is flattened into node text along the way.

pub mod node;

pub use node::{NodeType, RegNode};

use crate::doc::xml::serialize_document;
use crate::doc::XmlElement;
use crate::text::{leading_text, node_text, paragraph_text, rendered_text};

/// Subelements of a content block that mark a paragraph as carrying
/// structured content rather than plain introductory text.
const NON_PARA_SUBELEMENTS: [&str; 3] = ["callout", "table", "graphic"];

/// Build the normalized tree rooted at the given element.
///
/// Normally the element is the document root, but any structural
/// element produces a tree of its own subtree.
pub fn build_reg_tree(root: &XmlElement) -> RegNode {
    build_node(root, &[], NodeType::Regtext, 0)
}

fn build_node(
    el: &XmlElement,
    parent_label: &[String],
    parent_type: NodeType,
    depth: usize,
) -> RegNode {
    let mut node = RegNode::default();
    node.depth = depth;
    let mut children: Vec<&XmlElement> = Vec::new();

    match el.tag.as_str() {
        "regulation" => {
            node.label = vec![el
                .find("preamble")
                .and_then(|preamble| preamble.find("cfr"))
                .and_then(|cfr| cfr.find("section"))
                .map(leading_text)
                .unwrap_or_default()];
            node.node_type = NodeType::Regtext;
            node.title = el
                .find("fdsys")
                .and_then(|fdsys| fdsys.find("title"))
                .map(leading_text)
                .unwrap_or_default();

            // Subparts first, then appendices, then interpretations,
            // regardless of where they sit in the document.
            for tag in ["subpart", "appendix", "interpretations"] {
                children.extend(el.descendants().filter(|d| d.tag == tag));
            }
        }
        "subpart" => {
            match el.find("title") {
                Some(title) => {
                    node.node_type = NodeType::Subpart;
                    node.title = leading_text(title);
                    node.label = parent_label.to_vec();
                    node.label.push("Subpart".to_string());
                    node.label
                        .push(el.attr("subpartLetter").unwrap_or_default().to_string());
                }
                None => {
                    node.node_type = NodeType::Emptypart;
                    node.label = parent_label.to_vec();
                    node.label.push("Subpart".to_string());
                }
            }
            if let Some(content) = el.find("content") {
                children.extend(content.elements().filter(|c| c.tag == "section"));
            }
        }
        "section" if !el.attrs.is_empty() => {
            node.title = el.find("subject").map(leading_text).unwrap_or_default();
            node.node_type = NodeType::Regtext;
            node.label = split_label(el);
            children.extend(el.elements().filter(|c| c.tag == "paragraph"));
            promote_intro_text(el, &mut node, &mut children);
        }
        "paragraph" => {
            let content = el.find("content");
            let mut content_text = content.map(rendered_text).unwrap_or_default();
            if let Some(title) = el.find("title") {
                if title.attr("type") == Some("keyterm") {
                    // Keyterms belong to the running text, not the title.
                    content_text = format!("{}{}", leading_text(title), content_text);
                } else {
                    node.title = leading_text(title);
                }
            }
            node.marker = el.attr("marker").map(str::to_string);
            let marker = match node.marker.as_deref() {
                None | Some("none") => "",
                Some(marker) => marker,
            };
            node.label = split_label(el);
            if let Some(graphic) = content.and_then(|c| c.find("graphic")) {
                node.text = graphic.find("text").map(leading_text).unwrap_or_default();
            } else {
                node.text = paragraph_text(marker, &content_text);
            }
            node.node_type = parent_type;
            node.source = Some(serialize_document(el));
            children.extend(el.elements().filter(|c| c.tag == "paragraph"));
        }
        "appendix" => {
            node.node_type = NodeType::Appendix;
            node.title = el
                .find("appendixTitle")
                .map(leading_text)
                .unwrap_or_default();
            node.label = split_label(el);
            children.extend(el.elements().filter(|c| c.tag == "appendixSection"));
        }
        "appendixSection" => {
            node.node_type = NodeType::Appendix;
            node.title = el.find("subject").map(leading_text).unwrap_or_default();
            node.label = split_label(el);
            children.extend(el.elements().filter(|c| c.tag == "paragraph"));
            promote_intro_text(el, &mut node, &mut children);
        }
        "interpretations" => {
            node.node_type = NodeType::Interp;
            node.title = el.find("title").map(leading_text).unwrap_or_default();
            node.label = split_label(el);
            children.extend(el.elements().filter(|c| c.tag == "interpSection"));
        }
        "interpSection" | "interpAppSection" => {
            node.node_type = NodeType::Interp;
            node.title = el.find("title").map(leading_text).unwrap_or_default();
            node.label = split_label(el);
            children.extend(el.elements().filter(|c| c.tag == "interpParagraph"));
        }
        "interpAppendix" => {
            node.node_type = NodeType::Interp;
            node.title = el.find("title").map(leading_text).unwrap_or_default();
            node.label = split_label(el);
            children.extend(el.elements().filter(|c| c.tag == "interpAppSection"));
        }
        "interpParagraph" => {
            let content = el.find("content");
            let mut content_text = content.map(rendered_text).unwrap_or_default();
            if let Some(title) = el.find("title") {
                if title.attr("type") == Some("keyterm") {
                    content_text = format!("{}{}", leading_text(title), content_text);
                } else {
                    node.title = leading_text(title);
                }
            }
            // Interp markers are folded into the text upstream, so the
            // node keeps a normalized marker and an unprefixed text.
            let marker = el.attr("marker").unwrap_or_default();
            node.marker = if marker == "none" {
                Some(String::new())
            } else {
                Some(marker.to_string())
            };
            node.label = split_label(el);
            node.text = content_text;
            node.node_type = NodeType::Interp;
            node.source = Some(serialize_document(el));
            children.extend(el.elements().filter(|c| c.tag == "interpParagraph"));
        }
        _ => {}
    }

    let own_label = node.label.clone();
    let own_type = node.node_type;
    for child in children {
        node.children
            .push(build_node(child, &own_label, own_type, depth + 1));
    }
    node
}

fn split_label(el: &XmlElement) -> Vec<String> {
    match el.label() {
        Some(label) => label.split('-').map(str::to_string).collect(),
        None => Vec::new(),
    }
}

/// Fold an unmarked leading paragraph into the parent's own text.
/// Sections and appendix sections carry their introductory prose this
/// way rather than as a child node.
fn promote_intro_text(el: &XmlElement, node: &mut RegNode, children: &mut Vec<&XmlElement>) {
    let first = match children.first() {
        Some(first) => *first,
        None => return,
    };
    let position = match el.elements().position(|c| c.tag == "paragraph") {
        Some(position) => position,
        None => return,
    };
    if !is_intro_text(first, position) {
        return;
    }
    if let Some(content) = first.find("content") {
        node.text = node_text(content).trim().to_string();
    }
    children.remove(0);
}

/// Whether an element folds a leading intro paragraph into its own
/// text. The layer builders attach such a paragraph's annotations to
/// this element's label instead.
pub(crate) fn wants_intro_text(el: &XmlElement) -> bool {
    matches!(el.tag.as_str(), "section" | "appendixSection")
}

/// An intro paragraph has no title, an explicitly empty marker, a lone
/// content child free of structured subelements, and sits at the very
/// start of its parent.
pub(crate) fn is_intro_text(item: &XmlElement, position: usize) -> bool {
    if item.find("title").is_some() || item.attr("marker") != Some("") {
        return false;
    }
    let mut elements = item.elements();
    let only = match (elements.next(), elements.next()) {
        (Some(only), None) => only,
        _ => return false,
    };
    if position > 1 {
        return false;
    }
    !only
        .elements()
        .any(|c| NON_PARA_SUBELEMENTS.contains(&c.tag.as_str()))
}
