//! Layer builders: auxiliary JSON views over a regulation document.
//!
//! Each builder is a pure function from a document tree to an
//! insertion-ordered map keyed by label. Builders never mutate the
//! tree; offsets they report are character positions into the node
//! text the normalized tree produces for the same element.

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::changes::toc::TocKind;
use crate::doc::XmlElement;
use crate::settings::Settings;
use crate::text::{content_offset, find_all_occurrences, leading_text, ref_spans, rendered_text};
use crate::tree::{is_intro_text, wants_intro_text};

/// A paragraph marker and where it sits in the paragraph text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MarkerEntry {
    pub locations: Vec<usize>,
    pub text: String,
}

/// One internal citation occurrence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CitationEntry {
    pub citation: Vec<String>,
    pub offsets: Vec<[usize; 2]>,
}

/// One table of contents entry as the front end consumes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TocLayerEntry {
    pub index: Vec<String>,
    pub title: String,
}

/// A keyterm leading a paragraph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeytermEntry {
    pub key_term: String,
    pub locations: Vec<usize>,
}

/// Occurrences of a defined term inside one paragraph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TermReference {
    pub offsets: Vec<[usize; 2]>,
    #[serde(rename = "ref")]
    pub target: String,
}

/// Where a term is defined and the span of its defining mention.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TermDefinition {
    pub position: [usize; 2],
    pub reference: String,
    pub term: String,
}

/// A link from regulation text to commentary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InterpReference {
    pub reference: String,
}

/// Document metadata for one CFR part.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegMeta {
    pub cfr_title_number: u32,
    pub cfr_title_text: String,
    pub effective_date: String,
    pub reg_letter: String,
    pub statutory_name: String,
}

/// The terms layer: per-label reference occurrences plus the
/// definition table the references point into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermsLayer {
    pub references: IndexMap<String, Vec<TermReference>>,
    pub definitions: IndexMap<String, TermDefinition>,
}

impl TermsLayer {
    /// The layer in its JSON wire shape: one key per label, with the
    /// definition table under the final `referenced` key.
    pub fn to_json(&self) -> Value {
        let mut out = Map::new();
        for (label, references) in &self.references {
            out.insert(
                label.clone(),
                serde_json::to_value(references).unwrap_or_default(),
            );
        }
        out.insert(
            "referenced".to_string(),
            serde_json::to_value(&self.definitions).unwrap_or_default(),
        );
        Value::Object(out)
    }
}

/// Paragraph markers, skipping paragraphs whose marker is suppressed.
pub fn build_marker_layer(root: &XmlElement) -> IndexMap<String, Vec<MarkerEntry>> {
    let mut layer = IndexMap::new();
    for (_, _, paragraph) in tagged_paragraphs(root, "paragraph") {
        let marker = paragraph.attr("marker").unwrap_or_default();
        if marker.is_empty() || marker == "none" {
            continue;
        }
        let label = match paragraph.label() {
            Some(label) => label.to_string(),
            None => continue,
        };
        layer.insert(
            label,
            vec![MarkerEntry {
                locations: vec![0],
                text: marker.to_string(),
            }],
        );
    }
    layer
}

/// Internal citations with their character spans in each paragraph's
/// rendered text. Citations in an intro paragraph are recorded under
/// the enclosing section's label, matching where the normalized tree
/// puts that text.
pub fn build_internal_citations_layer(root: &XmlElement) -> IndexMap<String, Vec<CitationEntry>> {
    let mut layer = IndexMap::new();
    for (parent, position, paragraph) in all_paragraphs(root) {
        let content = match paragraph.find("content") {
            Some(content) => content,
            None => continue,
        };
        let label = match layer_label(parent, position, paragraph) {
            Some(label) => label,
            None => continue,
        };
        let offset = content_offset(
            &paragraph.tag,
            normalized_marker(paragraph),
            paragraph.find("title"),
        );

        let mut positions: IndexMap<String, Vec<usize>> = IndexMap::new();
        let mut targets: IndexMap<String, Vec<String>> = IndexMap::new();
        for span in ref_spans(content) {
            if span.reftype != "internal" || span.text.is_empty() {
                continue;
            }
            positions
                .entry(span.text.clone())
                .or_default()
                .push(span.start + offset);
            targets.insert(span.text, split_label(&span.target));
        }

        let mut citations: Vec<CitationEntry> = Vec::new();
        for (text, starts) in &positions {
            let length = text.chars().count();
            for start in starts {
                let entry = CitationEntry {
                    citation: targets[text].clone(),
                    offsets: vec![[*start, start + length]],
                };
                if !citations.contains(&entry) {
                    citations.push(entry);
                }
            }
        }
        if !citations.is_empty() {
            layer.insert(label, citations);
        }
    }
    layer
}

/// Table of contents entries grouped under the label of the element
/// that owns each `<tableOfContents>`. Subpart entries are structural
/// only and do not appear in the layer.
pub fn build_toc_layer(root: &XmlElement) -> IndexMap<String, Vec<TocLayerEntry>> {
    let mut tocs = Vec::new();
    collect_tocs(root, None, &mut tocs);

    let mut layer = IndexMap::new();
    for (owner, toc) in tocs {
        let label = match owner.and_then(XmlElement::label) {
            Some(label) => label.to_string(),
            None => continue,
        };
        let mut entries = Vec::new();
        for kind in [TocKind::Section, TocKind::Appendix, TocKind::Interp] {
            for entry in toc.elements().filter(|e| e.tag == kind.entry_tag()) {
                let target = match entry.attr("target") {
                    Some(target) => target,
                    None => continue,
                };
                entries.push(TocLayerEntry {
                    index: split_label(target),
                    title: entry
                        .find(kind.subject_tag())
                        .map(leading_text)
                        .unwrap_or_default(),
                });
            }
        }
        layer.insert(label, entries);
    }
    layer
}

/// Keyterms, one entry per paragraph that leads with one.
pub fn build_keyterm_layer(root: &XmlElement) -> IndexMap<String, Vec<KeytermEntry>> {
    let mut layer = IndexMap::new();
    for (_, _, paragraph) in all_paragraphs(root) {
        let title = match paragraph.find("title") {
            Some(title) if title.attr("type") == Some("keyterm") => title,
            _ => continue,
        };
        let label = match paragraph.label() {
            Some(label) => label.to_string(),
            None => continue,
        };
        layer.insert(
            label,
            vec![KeytermEntry {
                key_term: leading_text(title),
                locations: vec![0],
            }],
        );
    }
    layer
}

/// Defined terms and every bounded occurrence referencing them.
///
/// Definition keys are `singular(term):label`; the singular form uses
/// a small stemmer with pass-through overrides from [`Settings`].
pub fn build_terms_layer(root: &XmlElement, settings: &Settings) -> TermsLayer {
    let paragraphs = all_paragraphs(root);

    let mut definitions: IndexMap<String, TermDefinition> = IndexMap::new();
    for (_, _, paragraph) in &paragraphs {
        let content = match paragraph.find("content") {
            Some(content) => content,
            None => continue,
        };
        let defs: Vec<&XmlElement> = content.elements().filter(|c| c.tag == "def").collect();
        if defs.is_empty() {
            continue;
        }
        let label = match paragraph.label() {
            Some(label) => label.to_string(),
            None => continue,
        };
        let offset = content_offset(
            &paragraph.tag,
            normalized_marker(paragraph),
            paragraph.find("title"),
        );
        let par_text = rendered_text(content);
        let par_text = par_text.trim();

        for def in defs {
            let term = match def.attr("term") {
                Some(term) => term,
                None => continue,
            };
            let def_text = leading_text(def);
            let start = match find_all_occurrences(par_text, &def_text).first() {
                Some(start) => *start,
                None => continue,
            };
            let key = format!("{}:{}", singularize(&term.to_lowercase(), settings), label);
            definitions.insert(
                key,
                TermDefinition {
                    position: [start + offset, start + def_text.chars().count() + offset],
                    reference: label.clone(),
                    term: term.to_string(),
                },
            );
        }
    }

    let mut references: IndexMap<String, Vec<TermReference>> = IndexMap::new();
    for (parent, position, paragraph) in &paragraphs {
        let content = match paragraph.find("content") {
            Some(content) => content,
            None => continue,
        };
        let spans: Vec<_> = ref_spans(content)
            .into_iter()
            .filter(|span| span.reftype == "term")
            .collect();
        if spans.is_empty() {
            continue;
        }
        let label = match layer_label(parent, *position, paragraph) {
            Some(label) => label,
            None => continue,
        };
        let offset = content_offset(
            &paragraph.tag,
            normalized_marker(paragraph),
            paragraph.find("title"),
        );

        let mut starts: IndexMap<String, Vec<usize>> = IndexMap::new();
        let mut targets: IndexMap<String, String> = IndexMap::new();
        for span in spans {
            if span.text.is_empty() {
                continue;
            }
            let key = definitions
                .iter()
                .find(|(_, d)| d.reference == span.target)
                .map(|(key, _)| key.clone());
            let key = match key {
                Some(key) => key,
                None => continue,
            };
            starts
                .entry(span.text.clone())
                .or_default()
                .push(span.start + offset);
            targets.insert(span.text, key);
        }

        let mut entries: Vec<TermReference> = Vec::new();
        for (text, positions) in &starts {
            let length = text.chars().count();
            let entry = TermReference {
                offsets: positions.iter().map(|s| [*s, s + length]).collect(),
                target: targets[text].clone(),
            };
            if !entries.contains(&entry) {
                entries.push(entry);
            }
        }
        references.insert(label, entries);
    }

    TermsLayer {
        references,
        definitions,
    }
}

/// Cross-links from regulation labels to the commentary that covers
/// them, plus a part-level link to the whole supplement.
pub fn build_interp_layer(root: &XmlElement) -> IndexMap<String, Vec<InterpReference>> {
    let mut layer = IndexMap::new();
    let interpretations = match root.find_descendant("interpretations") {
        Some(interpretations) => interpretations,
        None => return layer,
    };

    if let Some(first_label) = interpretations.label() {
        let part = first_label.split('-').next().unwrap_or_default();
        layer.insert(
            part.to_string(),
            vec![InterpReference {
                reference: first_label.to_string(),
            }],
        );
    }
    for tag in ["interpSection", "interpParagraph"] {
        for el in interpretations.descendants().filter(|d| d.tag == tag) {
            if let (Some(target), Some(label)) = (el.attr("target"), el.label()) {
                layer.insert(
                    target.to_string(),
                    vec![InterpReference {
                        reference: label.to_string(),
                    }],
                );
            }
        }
    }
    layer
}

/// Regulation metadata keyed by CFR part number.
pub fn build_meta_layer(root: &XmlElement, settings: &Settings) -> IndexMap<String, Vec<RegMeta>> {
    let preamble = root.find("preamble");
    let fdsys = root.find("fdsys");
    let part = preamble
        .and_then(|p| p.find("cfr"))
        .and_then(|c| c.find("section"))
        .map(leading_text)
        .unwrap_or_default();

    let meta = RegMeta {
        cfr_title_number: fdsys
            .and_then(|f| f.find("cfrTitleNum"))
            .map(leading_text)
            .unwrap_or_default()
            .trim()
            .parse()
            .unwrap_or_default(),
        cfr_title_text: fdsys
            .and_then(|f| f.find("cfrTitleText"))
            .map(leading_text)
            .unwrap_or_default(),
        effective_date: preamble
            .and_then(|p| p.find("effectiveDate"))
            .map(leading_text)
            .unwrap_or_default(),
        reg_letter: settings.reg_letter(&part),
        statutory_name: fdsys
            .and_then(|f| f.find("title"))
            .map(leading_text)
            .unwrap_or_default(),
    };

    let mut layer = IndexMap::new();
    layer.insert(part, vec![meta]);
    layer
}

/// All `tag` elements in document order, each with its parent element
/// and its element position within that parent.
fn tagged_paragraphs<'a>(
    root: &'a XmlElement,
    tag: &str,
) -> Vec<(&'a XmlElement, usize, &'a XmlElement)> {
    fn collect<'a>(
        el: &'a XmlElement,
        tag: &str,
        out: &mut Vec<(&'a XmlElement, usize, &'a XmlElement)>,
    ) {
        for (position, child) in el.elements().enumerate() {
            if child.tag == tag {
                out.push((el, position, child));
            }
            collect(child, tag, out);
        }
    }
    let mut out = Vec::new();
    collect(root, tag, &mut out);
    out
}

/// Every `<tableOfContents>` with the element whose label owns it. A
/// toc inside a `<content>` wrapper belongs to the wrapper's parent.
fn collect_tocs<'a>(
    el: &'a XmlElement,
    parent: Option<&'a XmlElement>,
    out: &mut Vec<(Option<&'a XmlElement>, &'a XmlElement)>,
) {
    for child in el.elements() {
        if child.tag == "tableOfContents" {
            let owner = if el.tag == "content" { parent } else { Some(el) };
            out.push((owner, child));
        }
        collect_tocs(child, Some(el), out);
    }
}

/// Regulation paragraphs first, then interpretation paragraphs.
fn all_paragraphs(root: &XmlElement) -> Vec<(&XmlElement, usize, &XmlElement)> {
    let mut out = tagged_paragraphs(root, "paragraph");
    out.extend(tagged_paragraphs(root, "interpParagraph"));
    out
}

/// The label a paragraph's layer entries belong to. Intro paragraphs
/// dissolve into their parent, so their entries follow the parent's
/// label.
fn layer_label(parent: &XmlElement, position: usize, paragraph: &XmlElement) -> Option<String> {
    if wants_intro_text(parent) && is_intro_text(paragraph, position) {
        parent.label().map(str::to_string)
    } else {
        paragraph.label().map(str::to_string)
    }
}

fn normalized_marker(paragraph: &XmlElement) -> &str {
    match paragraph.attr("marker") {
        None | Some("none") => "",
        Some(marker) => marker,
    }
}

fn split_label(label: &str) -> Vec<String> {
    label.split('-').map(str::to_string).collect()
}

/// Singular form of a multi-word term, lowercased input assumed. The
/// overrides cover nouns the suffix rules would mangle.
pub(crate) fn singularize(term: &str, settings: &Settings) -> String {
    if settings.special_singular_nouns.iter().any(|n| n == term) {
        return term.to_string();
    }
    if let Some(stem) = term.strip_suffix("ies") {
        if !stem.is_empty() {
            return format!("{}y", stem);
        }
    }
    for suffix in ["ses", "xes", "zes", "ches", "shes"] {
        if let Some(stem) = term.strip_suffix(suffix) {
            return format!("{}{}", stem, &suffix[..suffix.len() - 2]);
        }
    }
    if term.ends_with('s') && !term.ends_with("ss") {
        return term[..term.len() - 1].to_string();
    }
    term.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doc::xml::parse_document;

    fn parse(xml: &str) -> XmlElement {
        parse_document(xml).unwrap()
    }

    #[test]
    fn marker_layer_skips_suppressed_markers() {
        let section = parse(
            r#"<section label="1234-1" sectionNum="1">
  <subject>S</subject>
  <paragraph label="1234-1-a" marker="(a)"><content>A</content></paragraph>
  <paragraph label="1234-1-b" marker="none"><content>B</content></paragraph>
  <paragraph label="1234-1-c"><content>C</content></paragraph>
</section>"#,
        );
        let layer = build_marker_layer(&section);
        let labels: Vec<&String> = layer.keys().collect();
        assert_eq!(labels, vec!["1234-1-a"]);
        assert_eq!(
            layer["1234-1-a"],
            vec![MarkerEntry {
                locations: vec![0],
                text: "(a)".to_string(),
            }]
        );
    }

    #[test]
    fn citations_attach_intro_text_to_the_section() {
        let section = parse(
            r#"<section label="1234-1" sectionNum="1">
  <subject>S</subject>
  <paragraph label="1234-1-p1" marker="">
    <content>See <ref target="1234-2" reftype="internal">§ 1234.2</ref> below.</content>
  </paragraph>
</section>"#,
        );
        let layer = build_internal_citations_layer(&section);
        let labels: Vec<&String> = layer.keys().collect();
        assert_eq!(labels, vec!["1234-1"]);
        assert_eq!(
            layer["1234-1"],
            vec![CitationEntry {
                citation: vec!["1234".to_string(), "2".to_string()],
                offsets: vec![[4, 12]],
            }]
        );
    }

    #[test]
    fn repeated_citation_text_yields_one_entry_per_position() {
        let section = parse(
            r#"<section label="1234-1" sectionNum="1">
  <subject>S</subject>
  <paragraph label="1234-1-a" marker="(a)">
    <content>Also <ref target="1234-3" reftype="internal">§ 1234.3</ref> and <ref target="1234-3" reftype="internal">§ 1234.3</ref>.</content>
  </paragraph>
</section>"#,
        );
        let layer = build_internal_citations_layer(&section);
        let entries = &layer["1234-1-a"];
        // The "(a) " marker shifts both spans by four characters.
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].offsets, vec![[9, 17]]);
        assert_eq!(entries[1].offsets, vec![[22, 30]]);
        assert_eq!(entries[0].citation, entries[1].citation);
    }

    #[test]
    fn external_and_term_refs_stay_out_of_citations() {
        let section = parse(
            r#"<section label="1234-1" sectionNum="1">
  <subject>S</subject>
  <paragraph label="1234-1-a" marker="(a)">
    <content>Per <ref target="USC:15-1601" reftype="external">15 U.S.C. 1601</ref>.</content>
  </paragraph>
</section>"#,
        );
        assert!(build_internal_citations_layer(&section).is_empty());
    }

    #[test]
    fn toc_layer_groups_entries_under_the_owning_label() {
        let part = parse(
            r#"<part label="1234">
  <content>
    <tableOfContents>
      <tocSecEntry target="1234-1"><sectionNum>1</sectionNum><sectionSubject>First</sectionSubject></tocSecEntry>
      <tocSubpartEntry target="1234-Subpart-A"><subpartLetter>A</subpartLetter><subpartSubject>General</subpartSubject></tocSubpartEntry>
      <tocAppEntry target="1234-A"><appendixLetter>A</appendixLetter><appendixSubject>Appendix A</appendixSubject></tocAppEntry>
      <tocInterpEntry target="1234-Interp"><interpTitle>Supplement I</interpTitle></tocInterpEntry>
    </tableOfContents>
  </content>
</part>"#,
        );
        let layer = build_toc_layer(&part);
        let entries = &layer["1234"];
        // Grouped by entry family; subpart entries never surface.
        let indexes: Vec<&Vec<String>> = entries.iter().map(|e| &e.index).collect();
        assert_eq!(
            indexes,
            vec![
                &vec!["1234".to_string(), "1".to_string()],
                &vec!["1234".to_string(), "A".to_string()],
                &vec!["1234".to_string(), "Interp".to_string()],
            ]
        );
        assert_eq!(entries[0].title, "First");
    }

    #[test]
    fn keyterm_layer_reads_both_paragraph_kinds() {
        let root = parse(
            r#"<regulation>
  <section label="1234-1" sectionNum="1">
    <subject>S</subject>
    <paragraph label="1234-1-a" marker="(a)">
      <title type="keyterm">Finance charge.</title>
      <content>Means the cost.</content>
    </paragraph>
  </section>
  <interpSection label="1234-1-Interp">
    <title>Section 1234.1</title>
    <interpParagraph label="1234-1-a-Interp" marker="1.">
      <title type="keyterm">Coverage.</title>
      <content>Commentary.</content>
    </interpParagraph>
  </interpSection>
</regulation>"#,
        );
        let layer = build_keyterm_layer(&root);
        assert_eq!(layer["1234-1-a"][0].key_term, "Finance charge.");
        assert_eq!(layer["1234-1-a-Interp"][0].key_term, "Coverage.");
    }

    #[test]
    fn terms_layer_links_references_to_definitions() {
        let section = parse(
            r#"<section label="1234-2" sectionNum="2">
  <subject>Definitions.</subject>
  <paragraph label="1234-2-a" marker="(a)">
    <content><def term="Finance charges">Finance charges</def> means costs.</content>
  </paragraph>
  <paragraph label="1234-2-b" marker="(b)">
    <content>All <ref target="1234-2-a" reftype="term">finance charges</ref> apply.</content>
  </paragraph>
</section>"#,
        );
        let layer = build_terms_layer(&section, &Settings::builtin());

        let definition = &layer.definitions["finance charge:1234-2-a"];
        assert_eq!(definition.reference, "1234-2-a");
        assert_eq!(definition.term, "Finance charges");
        // "(a) " pushes the defining mention four characters right.
        assert_eq!(definition.position, [4, 19]);

        let references = &layer.references["1234-2-b"];
        assert_eq!(
            references,
            &vec![TermReference {
                offsets: vec![[8, 23]],
                target: "finance charge:1234-2-a".to_string(),
            }]
        );

        let json = layer.to_json();
        let keys: Vec<&String> = json.as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["1234-2-b", "referenced"]);
    }

    #[test]
    fn term_refs_without_a_definition_leave_an_empty_entry() {
        let section = parse(
            r#"<section label="1234-3" sectionNum="3">
  <subject>S</subject>
  <paragraph label="1234-3-a" marker="(a)">
    <content>An <ref target="9999-1-a" reftype="term">orphan term</ref>.</content>
  </paragraph>
</section>"#,
        );
        let layer = build_terms_layer(&section, &Settings::builtin());
        assert!(layer.references["1234-3-a"].is_empty());
        assert!(layer.definitions.is_empty());
    }

    #[test]
    fn singularizer_handles_suffixes_and_overrides() {
        let settings = Settings::builtin();
        assert_eq!(singularize("loans", &settings), "loan");
        assert_eq!(singularize("activities", &settings), "activity");
        assert_eq!(singularize("bonuses", &settings), "bonus");
        assert_eq!(singularize("churches", &settings), "church");
        assert_eq!(singularize("business", &settings), "business");
        assert_eq!(singularize("bonus", &settings), "bonus");
        assert_eq!(
            singularize("escrow account analysis", &settings),
            "escrow account analysis"
        );
    }

    #[test]
    fn interp_layer_keys_targets_and_the_part() {
        let root = parse(
            r#"<regulation>
  <interpretations label="1234-Interp">
    <title>Supplement I</title>
    <interpSection label="1234-1-Interp" target="1234-1">
      <title>Section 1234.1</title>
      <interpParagraph label="1234-1-a-Interp" target="1234-1-a">
        <content>1. Note.</content>
      </interpParagraph>
    </interpSection>
  </interpretations>
</regulation>"#,
        );
        let layer = build_interp_layer(&root);
        let labels: Vec<&String> = layer.keys().collect();
        assert_eq!(labels, vec!["1234", "1234-1", "1234-1-a"]);
        assert_eq!(layer["1234"][0].reference, "1234-Interp");
        assert_eq!(layer["1234-1"][0].reference, "1234-1-Interp");
        assert_eq!(layer["1234-1-a"][0].reference, "1234-1-a-Interp");
    }

    #[test]
    fn meta_layer_reads_preamble_and_fdsys() {
        let root = parse(
            r#"<regulation>
  <fdsys>
    <cfrTitleNum>12</cfrTitleNum>
    <cfrTitleText>Banks and Banking</cfrTitleText>
    <title>TRUTH IN LENDING</title>
  </fdsys>
  <preamble>
    <cfr><section>1026</section></cfr>
    <effectiveDate>2013-01-10</effectiveDate>
  </preamble>
</regulation>"#,
        );
        let layer = build_meta_layer(&root, &Settings::builtin());
        assert_eq!(
            layer["1026"],
            vec![RegMeta {
                cfr_title_number: 12,
                cfr_title_text: "Banks and Banking".to_string(),
                effective_date: "2013-01-10".to_string(),
                reg_letter: "Z".to_string(),
                statutory_name: "TRUTH IN LENDING".to_string(),
            }]
        );
    }
}
