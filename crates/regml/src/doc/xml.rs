//! XML codec for RegML documents.
//!
//! A hand-rolled reader and writer for the slice of XML the corpus uses:
//! elements, attributes in either quote style, character data, CDATA
//! sections, comments, processing instructions, and the five named entities
//! plus numeric character references. Namespace prefixes are kept exactly as
//! written; nothing is expanded or resolved.
//!
//! Whitespace-only character data is dropped while reading, so structural
//! parents end up with element-only child lists and child indices stay
//! stable across a parse/serialize round trip.

use thiserror::Error;

use super::{XmlElement, XmlNode};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum XmlError {
    #[error("Unexpected end of input")]
    UnexpectedEnd,
    #[error("Unexpected character: {0}")]
    UnexpectedChar(char),
    #[error("Mismatched closing tag: expected </{expected}>, found </{found}>")]
    MismatchedTag { expected: String, found: String },
    #[error("Unknown entity: &{0};")]
    UnknownEntity(String),
    #[error("Invalid character reference")]
    InvalidCharRef,
    #[error("Document has no root element")]
    NoRoot,
    #[error("Content after the root element")]
    TrailingContent,
}

/// Parse a document string into its root element.
///
/// The XML declaration, DOCTYPE, processing instructions, and comments are
/// skipped. A leading byte-order mark is tolerated.
pub fn parse_document(input: &str) -> Result<XmlElement, XmlError> {
    let mut parser = XmlParser {
        input: input.trim_start_matches('\u{feff}'),
        pos: 0,
    };
    parser.skip_misc()?;
    if parser.is_at_end() {
        return Err(XmlError::NoRoot);
    }
    let root = parser.parse_element()?;
    parser.skip_misc()?;
    if !parser.is_at_end() {
        return Err(XmlError::TrailingContent);
    }
    Ok(root)
}

struct XmlParser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> XmlParser<'a> {
    /// Skip whitespace, declarations, DOCTYPE, PIs, and comments.
    fn skip_misc(&mut self) -> Result<(), XmlError> {
        loop {
            self.skip_whitespace();
            if self.peek_str("<?") {
                self.skip_past("?>")?;
            } else if self.peek_str("<!--") {
                self.skip_past("-->")?;
            } else if self.peek_str("<!DOCTYPE") {
                self.skip_past(">")?;
            } else {
                return Ok(());
            }
        }
    }

    fn parse_element(&mut self) -> Result<XmlElement, XmlError> {
        self.expect('<')?;
        let tag = self.parse_name()?;
        let mut el = XmlElement::new(&tag);

        loop {
            self.skip_whitespace();
            match self.peek() {
                Some('/') => {
                    self.advance();
                    self.expect('>')?;
                    return Ok(el);
                }
                Some('>') => {
                    self.advance();
                    break;
                }
                Some(c) if is_name_start(c) => {
                    let name = self.parse_name()?;
                    self.skip_whitespace();
                    self.expect('=')?;
                    self.skip_whitespace();
                    let value = self.parse_attr_value()?;
                    el.attrs.push((name, value));
                }
                Some(c) => return Err(XmlError::UnexpectedChar(c)),
                None => return Err(XmlError::UnexpectedEnd),
            }
        }

        loop {
            if self.is_at_end() {
                return Err(XmlError::UnexpectedEnd);
            }
            if self.peek_str("</") {
                self.advance_by(2);
                let closing = self.parse_name()?;
                self.skip_whitespace();
                self.expect('>')?;
                if closing != el.tag {
                    return Err(XmlError::MismatchedTag {
                        expected: el.tag.clone(),
                        found: closing,
                    });
                }
                return Ok(el);
            } else if self.peek_str("<!--") {
                self.skip_past("-->")?;
            } else if self.peek_str("<![CDATA[") {
                self.advance_by(9);
                let start = self.pos;
                let end = self.input[start..]
                    .find("]]>")
                    .ok_or(XmlError::UnexpectedEnd)?;
                let raw = &self.input[start..start + end];
                if !raw.is_empty() {
                    el.children.push(XmlNode::Text(raw.to_string()));
                }
                self.pos = start + end + 3;
            } else if self.peek_str("<?") {
                self.skip_past("?>")?;
            } else if self.peek() == Some('<') {
                let child = self.parse_element()?;
                el.children.push(XmlNode::Element(child));
            } else {
                let text = self.parse_text()?;
                if !text.trim().is_empty() {
                    el.children.push(XmlNode::Text(text));
                }
            }
        }
    }

    fn parse_text(&mut self) -> Result<String, XmlError> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c == '<' {
                break;
            }
            self.advance();
        }
        decode_entities(&self.input[start..self.pos])
    }

    fn parse_name(&mut self) -> Result<String, XmlError> {
        match self.peek() {
            Some(c) if is_name_start(c) => {}
            Some(c) => return Err(XmlError::UnexpectedChar(c)),
            None => return Err(XmlError::UnexpectedEnd),
        }
        let start = self.pos;
        while let Some(c) = self.peek() {
            if is_name_char(c) {
                self.advance();
            } else {
                break;
            }
        }
        Ok(self.input[start..self.pos].to_string())
    }

    fn parse_attr_value(&mut self) -> Result<String, XmlError> {
        let quote = match self.peek() {
            Some(c @ ('"' | '\'')) => c,
            Some(c) => return Err(XmlError::UnexpectedChar(c)),
            None => return Err(XmlError::UnexpectedEnd),
        };
        self.advance();
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c == quote {
                break;
            }
            self.advance();
        }
        if self.is_at_end() {
            return Err(XmlError::UnexpectedEnd);
        }
        let raw = &self.input[start..self.pos];
        self.advance();
        decode_entities(raw)
    }

    fn skip_past(&mut self, marker: &str) -> Result<(), XmlError> {
        match self.input[self.pos..].find(marker) {
            Some(idx) => {
                self.pos += idx + marker.len();
                Ok(())
            }
            None => Err(XmlError::UnexpectedEnd),
        }
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn peek_str(&self, s: &str) -> bool {
        self.input[self.pos..].starts_with(s)
    }

    fn advance(&mut self) {
        if let Some(c) = self.peek() {
            self.pos += c.len_utf8();
        }
    }

    fn advance_by(&mut self, n: usize) {
        for _ in 0..n {
            self.advance();
        }
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn expect(&mut self, expected: char) -> Result<(), XmlError> {
        if self.peek() == Some(expected) {
            self.advance();
            Ok(())
        } else {
            match self.peek() {
                Some(c) => Err(XmlError::UnexpectedChar(c)),
                None => Err(XmlError::UnexpectedEnd),
            }
        }
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }
}

fn is_name_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == ':'
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | ':')
}

fn decode_entities(raw: &str) -> Result<String, XmlError> {
    if !raw.contains('&') {
        return Ok(raw.to_string());
    }
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(idx) = rest.find('&') {
        out.push_str(&rest[..idx]);
        rest = &rest[idx + 1..];
        let end = match rest.find(';') {
            Some(i) if i <= 32 => i,
            _ => return Err(XmlError::UnknownEntity(rest.chars().take(8).collect())),
        };
        let name = &rest[..end];
        match name {
            "amp" => out.push('&'),
            "lt" => out.push('<'),
            "gt" => out.push('>'),
            "quot" => out.push('"'),
            "apos" => out.push('\''),
            _ if name.starts_with("#x") || name.starts_with("#X") => {
                let code = u32::from_str_radix(&name[2..], 16)
                    .map_err(|_| XmlError::InvalidCharRef)?;
                out.push(char::from_u32(code).ok_or(XmlError::InvalidCharRef)?);
            }
            _ if name.starts_with('#') => {
                let code: u32 = name[1..].parse().map_err(|_| XmlError::InvalidCharRef)?;
                out.push(char::from_u32(code).ok_or(XmlError::InvalidCharRef)?);
            }
            _ => return Err(XmlError::UnknownEntity(name.to_string())),
        }
        rest = &rest[end + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

// ── Serializer ─────────────────────────────────────────────────────────────

/// Serialize a node to an XML string.
///
/// - `tab`: indentation string (e.g. `"  "`); use `""` for compact output.
/// - `indent`: current indentation prefix (used in recursion).
///
/// Elements whose children include character data are always rendered
/// inline so mixed content survives untouched; element-only children are
/// indented one level per depth when `tab` is non-empty.
pub fn to_xml(node: &XmlNode, tab: &str, indent: &str) -> String {
    match node {
        XmlNode::Text(s) => format!("{}{}", indent, escape_text(s)),
        XmlNode::Element(el) => element_to_xml(el, tab, indent),
    }
}

/// Compact serialization of a document.
pub fn serialize_document(root: &XmlElement) -> String {
    element_to_xml(root, "", "")
}

/// Indented serialization of a document, with a trailing newline.
pub fn serialize_document_pretty(root: &XmlElement) -> String {
    let mut out = element_to_xml(root, "  ", "");
    out.push('\n');
    out
}

fn element_to_xml(el: &XmlElement, tab: &str, indent: &str) -> String {
    let do_indent = !tab.is_empty();
    let has_text = el
        .children
        .iter()
        .any(|c| matches!(c, XmlNode::Text(_)));

    let mut attr_str = String::new();
    for (k, v) in &el.attrs {
        attr_str.push(' ');
        attr_str.push_str(k);
        attr_str.push_str("=\"");
        attr_str.push_str(&escape_attr(v));
        attr_str.push('"');
    }

    if el.children.is_empty() {
        return format!("{}<{}{}/>", indent, el.tag, attr_str);
    }

    if has_text || !do_indent {
        let children_str: String = el
            .children
            .iter()
            .map(|c| to_xml(c, "", ""))
            .collect();
        format!(
            "{}<{}{}>{}</{}>",
            indent, el.tag, attr_str, children_str, el.tag
        )
    } else {
        let child_indent = format!("{}{}", indent, tab);
        let mut children_str = String::new();
        for child in &el.children {
            children_str.push('\n');
            children_str.push_str(&to_xml(child, tab, &child_indent));
        }
        format!(
            "{}<{}{}>{}\n{}</{}>",
            indent, el.tag, attr_str, children_str, indent, el.tag
        )
    }
}

fn escape_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
    out
}

fn escape_attr(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_simple_element() {
        let el = parse_document(r#"<section label="1234-1" sectionNum="1"/>"#).unwrap();
        assert_eq!(el.tag, "section");
        assert_eq!(el.attr("label"), Some("1234-1"));
        assert_eq!(el.attr("sectionNum"), Some("1"));
        assert!(el.children.is_empty());
    }

    #[test]
    fn both_attribute_quote_styles() {
        let el = parse_document(r#"<ref target="1234-1" reftype='internal'/>"#).unwrap();
        assert_eq!(el.attr("target"), Some("1234-1"));
        assert_eq!(el.attr("reftype"), Some("internal"));
    }

    #[test]
    fn whitespace_only_text_is_dropped() {
        let el = parse_document("<part>\n  <content>\n    <section/>\n  </content>\n</part>")
            .unwrap();
        assert_eq!(el.children.len(), 1);
        let content = el.find("content").unwrap();
        assert_eq!(content.children.len(), 1);
    }

    #[test]
    fn mixed_content_survives() {
        let el = parse_document(
            r#"<content>See <ref target="1234-2">paragraph 2</ref> of this part.</content>"#,
        )
        .unwrap();
        assert_eq!(el.children.len(), 3);
        assert_eq!(el.children[0].as_text(), Some("See "));
        assert_eq!(el.children[2].as_text(), Some(" of this part."));
    }

    #[test]
    fn entities_decode_in_text_and_attrs() {
        let el = parse_document(
            r#"<p title="a &quot;b&quot; &amp; c">1 &lt; 2 &#38; 3 &gt; 2 &#x41;</p>"#,
        )
        .unwrap();
        assert_eq!(el.attr("title"), Some("a \"b\" & c"));
        assert_eq!(el.text(), "1 < 2 & 3 > 2 A");
    }

    #[test]
    fn prolog_comments_and_pi_skipped() {
        let el = parse_document(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<!-- header -->\n<part><!-- inner --><section/><?pi data?></part>",
        )
        .unwrap();
        assert_eq!(el.tag, "part");
        assert_eq!(el.children.len(), 1);
    }

    #[test]
    fn cdata_keeps_raw_text() {
        let el = parse_document("<code><![CDATA[if a < b & c]]></code>").unwrap();
        assert_eq!(el.text(), "if a < b & c");
    }

    #[test]
    fn mismatched_tag_is_an_error() {
        let err = parse_document("<part><section></part></section>").unwrap_err();
        assert_eq!(
            err,
            XmlError::MismatchedTag {
                expected: "section".to_string(),
                found: "part".to_string(),
            }
        );
    }

    #[test]
    fn unknown_entity_is_an_error() {
        let err = parse_document("<p>&nbsp;</p>").unwrap_err();
        assert_eq!(err, XmlError::UnknownEntity("nbsp".to_string()));
    }

    #[test]
    fn trailing_content_is_an_error() {
        assert_eq!(
            parse_document("<part/><part/>").unwrap_err(),
            XmlError::TrailingContent
        );
        assert_eq!(parse_document("  \n ").unwrap_err(), XmlError::NoRoot);
    }

    #[test]
    fn serialize_escapes_and_self_closes() {
        let el = parse_document(r#"<p note="a &amp; b">x &lt; y<br/></p>"#).unwrap();
        assert_eq!(
            serialize_document(&el),
            r#"<p note="a &amp; b">x &lt; y<br/></p>"#
        );
    }

    #[test]
    fn roundtrip_preserves_structure() {
        let src = r#"<part label="1234"><tableOfContents><tocSecEntry target="1234-1"><sectionNum>1</sectionNum><sectionSubject>Authority</sectionSubject></tocSecEntry></tableOfContents><content><section label="1234-1"><subject>Authority</subject><paragraph label="1234-1-a" marker="a"><content>Text.</content></paragraph></section></content></part>"#;
        let el = parse_document(src).unwrap();
        let out = serialize_document(&el);
        assert_eq!(out, src);
        assert_eq!(parse_document(&out).unwrap(), el);
    }

    #[test]
    fn pretty_indents_element_children_only() {
        let el =
            parse_document("<part><content><paragraph>Some <em>text</em> here.</paragraph></content></part>")
                .unwrap();
        assert_eq!(
            serialize_document_pretty(&el),
            "<part>\n  <content>\n    <paragraph>Some <em>text</em> here.</paragraph>\n  </content>\n</part>\n"
        );
    }
}
