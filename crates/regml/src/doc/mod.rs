//! Document model for RegML trees.
//!
//! A parsed document is an owned recursive value: [`XmlElement`] nodes with
//! ordered attributes and mixed-content children. Structural mutation is
//! addressed through [`NodePath`]s (child-index routes from the root), and
//! label lookups go through a [`LabelIndex`] that is rebuilt after each
//! structural change rather than re-scanning the tree per lookup.

pub mod xml;

use indexmap::IndexMap;

/// A child-index route from the document root down to a node.
pub type NodePath = Vec<usize>;

/// One node of a parsed document: character data or an element.
#[derive(Debug, Clone, PartialEq)]
pub enum XmlNode {
    Text(String),
    Element(XmlElement),
}

impl XmlNode {
    pub fn as_element(&self) -> Option<&XmlElement> {
        match self {
            XmlNode::Element(el) => Some(el),
            XmlNode::Text(_) => None,
        }
    }

    pub fn as_element_mut(&mut self) -> Option<&mut XmlElement> {
        match self {
            XmlNode::Element(el) => Some(el),
            XmlNode::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            XmlNode::Text(t) => Some(t),
            XmlNode::Element(_) => None,
        }
    }
}

/// An element with its tag, ordered attributes, and children.
///
/// Attribute order is preserved so re-serialized documents keep their
/// original shape.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct XmlElement {
    pub tag: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<XmlNode>,
}

impl XmlElement {
    pub fn new(tag: &str) -> Self {
        XmlElement {
            tag: tag.to_string(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Look up an attribute value by name.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Set an attribute, replacing any existing value for the same name.
    pub fn set_attr(&mut self, name: &str, value: &str) {
        for (k, v) in &mut self.attrs {
            if k == name {
                *v = value.to_string();
                return;
            }
        }
        self.attrs.push((name.to_string(), value.to_string()));
    }

    /// The `label` attribute, if the element carries one.
    pub fn label(&self) -> Option<&str> {
        self.attr("label")
    }

    /// Direct element children, skipping interleaved text.
    pub fn elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(XmlNode::as_element)
    }

    pub fn elements_mut(&mut self) -> impl Iterator<Item = &mut XmlElement> {
        self.children.iter_mut().filter_map(XmlNode::as_element_mut)
    }

    /// First direct child element with the given tag.
    pub fn find(&self, tag: &str) -> Option<&XmlElement> {
        self.elements().find(|el| el.tag == tag)
    }

    pub fn find_mut(&mut self, tag: &str) -> Option<&mut XmlElement> {
        self.elements_mut().find(|el| el.tag == tag)
    }

    /// First descendant element with the given tag, in document order.
    pub fn find_descendant(&self, tag: &str) -> Option<&XmlElement> {
        self.descendants().find(|el| el.tag == tag)
    }

    /// Raw child index of the first child element with the given tag.
    pub fn child_position(&self, tag: &str) -> Option<usize> {
        self.children.iter().position(|node| {
            node.as_element()
                .map(|el| el.tag == tag)
                .unwrap_or(false)
        })
    }

    /// Concatenated direct text children.
    pub fn text(&self) -> String {
        let mut out = String::new();
        for child in &self.children {
            if let XmlNode::Text(t) = child {
                out.push_str(t);
            }
        }
        out
    }

    pub fn push_element(&mut self, el: XmlElement) {
        self.children.push(XmlNode::Element(el));
    }

    pub fn push_text(&mut self, text: &str) {
        self.children.push(XmlNode::Text(text.to_string()));
    }

    /// Resolve a non-empty path to the child node it addresses.
    pub fn node_at(&self, path: &[usize]) -> Option<&XmlNode> {
        let (&first, rest) = path.split_first()?;
        let node = self.children.get(first)?;
        if rest.is_empty() {
            return Some(node);
        }
        node.as_element()?.node_at(rest)
    }

    pub fn node_at_mut(&mut self, path: &[usize]) -> Option<&mut XmlNode> {
        let (&first, rest) = path.split_first()?;
        let node = self.children.get_mut(first)?;
        if rest.is_empty() {
            return Some(node);
        }
        node.as_element_mut()?.node_at_mut(rest)
    }

    /// Resolve a path to an element; the empty path is the element itself.
    pub fn element_at(&self, path: &[usize]) -> Option<&XmlElement> {
        if path.is_empty() {
            return Some(self);
        }
        self.node_at(path)?.as_element()
    }

    pub fn element_at_mut(&mut self, path: &[usize]) -> Option<&mut XmlElement> {
        if path.is_empty() {
            return Some(self);
        }
        self.node_at_mut(path)?.as_element_mut()
    }

    /// Depth-first pre-order iterator over descendant elements.
    ///
    /// The element itself is not yielded, matching `.//tag`-style scans.
    pub fn descendants(&self) -> Descendants<'_> {
        let mut stack = Vec::with_capacity(self.children.len());
        for child in self.children.iter().rev() {
            stack.push(child);
        }
        Descendants { stack }
    }
}

pub struct Descendants<'a> {
    stack: Vec<&'a XmlNode>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a XmlElement;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(node) = self.stack.pop() {
            if let XmlNode::Element(el) = node {
                for child in el.children.iter().rev() {
                    self.stack.push(child);
                }
                return Some(el);
            }
        }
        None
    }
}

/// Label to node-path index over a document tree.
///
/// Duplicate labels keep the first occurrence in document order; the
/// validator reports duplicates separately.
///
/// # Example
///
/// ```
/// use regml::doc::{xml, LabelIndex};
///
/// let doc = xml::parse_document(
///     r#"<part label="1234"><content><section label="1234-1"/></content></part>"#,
/// )
/// .unwrap();
/// let index = LabelIndex::build(&doc);
/// assert_eq!(index.path("1234-1"), Some(&vec![0, 0]));
/// assert!(index.contains("1234"));
/// assert!(!index.contains("1234-2"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct LabelIndex {
    map: IndexMap<String, NodePath>,
}

impl LabelIndex {
    pub fn build(root: &XmlElement) -> Self {
        let mut index = LabelIndex::default();
        index.collect(root, &mut Vec::new());
        index
    }

    fn collect(&mut self, el: &XmlElement, path: &mut NodePath) {
        if let Some(label) = el.label() {
            if !self.map.contains_key(label) {
                self.map.insert(label.to_string(), path.clone());
            }
        }
        for (i, child) in el.children.iter().enumerate() {
            if let XmlNode::Element(child_el) = child {
                path.push(i);
                self.collect(child_el, path);
                path.pop();
            }
        }
    }

    pub fn path(&self, label: &str) -> Option<&NodePath> {
        self.map.get(label)
    }

    pub fn contains(&self, label: &str) -> bool {
        self.map.contains_key(label)
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.map.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doc::xml::parse_document;

    fn sample() -> XmlElement {
        parse_document(
            r#"<part label="1234">
                 <content>
                   <section label="1234-1">
                     <subject>First</subject>
                     <paragraph label="1234-1-a" marker="a">
                       <content>Text with <ref target="1234-1">a ref</ref> inside.</content>
                     </paragraph>
                   </section>
                 </content>
               </part>"#,
        )
        .unwrap()
    }

    #[test]
    fn attr_lookup_and_replace() {
        let mut el = XmlElement::new("section");
        el.set_attr("label", "1234-1");
        el.set_attr("sectionNum", "1");
        assert_eq!(el.attr("label"), Some("1234-1"));
        el.set_attr("label", "1234-2");
        assert_eq!(el.attr("label"), Some("1234-2"));
        assert_eq!(el.attrs.len(), 2);
    }

    #[test]
    fn find_and_descendants() {
        let doc = sample();
        assert!(doc.find("content").is_some());
        assert!(doc.find("section").is_none());
        let tags: Vec<&str> = doc.descendants().map(|el| el.tag.as_str()).collect();
        assert_eq!(
            tags,
            vec!["content", "section", "subject", "paragraph", "content", "ref"]
        );
    }

    #[test]
    fn text_skips_child_elements() {
        let doc = sample();
        let para_content = doc
            .find_descendant("paragraph")
            .and_then(|p| p.find("content"))
            .unwrap();
        assert_eq!(para_content.text(), "Text with  inside.");
    }

    #[test]
    fn path_navigation() {
        let doc = sample();
        let index = LabelIndex::build(&doc);
        let path = index.path("1234-1-a").unwrap();
        let el = doc.element_at(path).unwrap();
        assert_eq!(el.tag, "paragraph");
        assert_eq!(el.attr("marker"), Some("a"));
        assert_eq!(doc.element_at(&[]).unwrap().tag, "part");
        assert!(doc.element_at(&[9]).is_none());
    }

    #[test]
    fn index_prefers_first_duplicate() {
        let doc = parse_document(
            r#"<part label="1234"><paragraph label="1234-1"/><paragraph label="1234-1"/></part>"#,
        )
        .unwrap();
        let index = LabelIndex::build(&doc);
        assert_eq!(index.path("1234-1"), Some(&vec![0]));
        assert_eq!(index.len(), 2);
    }
}
