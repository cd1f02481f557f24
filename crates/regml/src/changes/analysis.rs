//! Merging a notice's section-by-section analysis into a regulation.

use crate::doc::{XmlElement, XmlNode};

/// Fold the notice's `<analysis>` block into the regulation.
///
/// A regulation that has no analysis yet adopts the notice's block whole;
/// otherwise the notice's `<analysisSection>` children are appended to the
/// existing block. Notices without analysis leave the document alone.
pub fn merge_analysis(regulation: &mut XmlElement, notice: &XmlElement) {
    let incoming = match notice.find("analysis") {
        Some(el) => el,
        None => return,
    };
    match regulation.child_position("analysis") {
        Some(pos) => {
            let sections: Vec<XmlNode> = incoming
                .elements()
                .filter(|el| el.tag == "analysisSection")
                .cloned()
                .map(XmlNode::Element)
                .collect();
            if let Some(XmlNode::Element(existing)) = regulation.children.get_mut(pos) {
                existing.children.extend(sections);
            }
        }
        None => regulation.push_element(incoming.clone()),
    }
}
