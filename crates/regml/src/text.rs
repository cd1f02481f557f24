//! Plain-text extraction from content elements.
//!
//! Layer offsets and node text both come from a one-level reading of a
//! `<content>` element: the element's own character data plus, for each
//! child element, that child's leading character data. Inline formatting
//! elements (`variable`, `dash`, `callout`) are rewritten during rendering
//! the way the site expects them.

use crate::doc::{XmlElement, XmlNode};

/// One-level text of an element: its own character data plus the leading
/// character data of each direct child element.
///
/// Grandchildren do not contribute, so `<content>a <ref>b<E>c</E></ref>
/// d</content>` reads as `"a bd"` minus the dropped whitespace.
pub fn node_text(el: &XmlElement) -> String {
    let mut out = String::new();
    for child in &el.children {
        match child {
            XmlNode::Text(t) => out.push_str(t),
            XmlNode::Element(c) => out.push_str(&leading_text(c)),
        }
    }
    out
}

/// Character data before the first element child.
pub fn leading_text(el: &XmlElement) -> String {
    let mut out = String::new();
    for child in &el.children {
        match child {
            XmlNode::Text(t) => out.push_str(t),
            XmlNode::Element(_) => break,
        }
    }
    out
}

/// One-level text with inline formatting applied.
///
/// - `variable` renders as `var_{sub}` and keeps its tail;
/// - `dash` renders as its text plus `_____`, and the tail after it is
///   dropped because dashes end a line;
/// - `callout` renders per its `type` (`note` joins its lines, `code`
///   fences them) and drops its tail.
pub fn rendered_text(content: &XmlElement) -> String {
    walk_rendered(content, |_, _| {})
}

/// A `ref` element in a content block, located in rendered-text space.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefSpan {
    pub reftype: String,
    pub target: String,
    pub text: String,
    /// Character position of the reference text within the rendered
    /// content, before any marker or keyterm offset.
    pub start: usize,
}

/// The direct `ref` children of a content element, each with the
/// character position its text occupies in [`rendered_text`].
pub fn ref_spans(content: &XmlElement) -> Vec<RefSpan> {
    let mut spans = Vec::new();
    walk_rendered(content, |el, start| {
        if el.tag == "ref" {
            spans.push(RefSpan {
                reftype: el.attr("reftype").unwrap_or_default().to_string(),
                target: el.attr("target").unwrap_or_default().to_string(),
                text: leading_text(el),
                start,
            });
        }
    });
    spans
}

/// Single walk shared by [`rendered_text`] and [`ref_spans`], so the
/// positions the visitor sees always agree with the rendered output.
/// The visitor fires for each non-formatting element child with the
/// character count accumulated so far.
fn walk_rendered<F>(content: &XmlElement, mut visit: F) -> String
where
    F: FnMut(&XmlElement, usize),
{
    let mut out = String::new();
    let mut chars = 0usize;
    let mut skip_tail = false;
    for child in &content.children {
        match child {
            XmlNode::Text(t) => {
                if !skip_tail {
                    out.push_str(t);
                    chars += t.chars().count();
                }
                skip_tail = false;
            }
            XmlNode::Element(c) => {
                skip_tail = false;
                let chunk = match c.tag.as_str() {
                    "variable" => render_variable(c),
                    "dash" => {
                        skip_tail = true;
                        format!("{}_____", leading_text(c))
                    }
                    "callout" => {
                        skip_tail = true;
                        render_callout(c)
                    }
                    _ => {
                        visit(c, chars);
                        leading_text(c)
                    }
                };
                out.push_str(&chunk);
                chars += chunk.chars().count();
            }
        }
    }
    out
}

fn render_variable(variable: &XmlElement) -> String {
    let var = leading_text(variable);
    match variable.find("subscript") {
        Some(subscript) => format!("{}_{{{}}}", var, leading_text(subscript)),
        None => var,
    }
}

fn render_callout(callout: &XmlElement) -> String {
    let lines: Vec<String> = callout
        .elements()
        .filter(|el| el.tag == "line")
        .map(leading_text)
        .collect();
    match callout.attr("type") {
        Some("note") => {
            if lines.is_empty() {
                node_text(callout).trim().to_string()
            } else {
                lines.join("\n").trim().to_string()
            }
        }
        Some("code") => format!("```\n{}```", lines.join("\n")),
        _ => String::new(),
    }
}

/// Full display text of a paragraph: marker and content joined by one
/// space, trimmed so an empty marker leaves the content alone.
pub fn paragraph_text(marker: &str, content_text: &str) -> String {
    format!("{} {}", marker, content_text).trim().to_string()
}

/// Character positions of every word-bounded occurrence of `target` in
/// `source`. An empty target matches nowhere.
pub fn find_all_occurrences(source: &str, target: &str) -> Vec<usize> {
    if target.is_empty() {
        return Vec::new();
    }
    let pattern = format!(r"\b{}\b", regex::escape(target));
    let re = match regex::Regex::new(&pattern) {
        Ok(re) => re,
        Err(_) => return Vec::new(),
    };
    re.find_iter(source)
        .map(|m| source[..m.start()].chars().count())
        .collect()
}

/// Offset that the marker and a keyterm title add in front of a
/// paragraph's content text.
///
/// Interpretation paragraphs never show their marker, so it contributes
/// nothing there. Offsets count characters, not bytes.
pub fn content_offset(tag: &str, marker: &str, title: Option<&XmlElement>) -> usize {
    let marker_offset = if !marker.is_empty() && tag != "interpParagraph" {
        marker.chars().count() + 1
    } else {
        0
    };
    let keyterm_offset = match title {
        Some(t) if t.attr("type") == Some("keyterm") => leading_text(t).chars().count(),
        _ => 0,
    };
    marker_offset + keyterm_offset
}
