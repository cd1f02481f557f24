//! Label-level validation of regulation and notice documents.
//!
//! Schema conformance is someone else's job; these checks cover the
//! invariants the core algorithms themselves depend on. Findings are
//! collected as events rather than raised, so tooling can show
//! everything wrong with a document in one pass.

use std::collections::HashSet;
use std::fmt;

use indexmap::IndexMap;

use crate::doc::XmlElement;
use crate::layers::{singularize, CitationEntry, TermsLayer};
use crate::settings::Settings;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Ok,
    Info,
    Warning,
    Error,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Ok => "OK",
            Severity::Info => "INFO",
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
            Severity::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationEvent {
    pub severity: Severity,
    pub message: String,
}

impl fmt::Display for ValidationEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.severity, self.message)
    }
}

/// Accumulates validation events across any number of checks.
#[derive(Debug, Default)]
pub struct Validator {
    events: Vec<ValidationEvent>,
}

impl Validator {
    pub fn new() -> Validator {
        Validator::default()
    }

    pub fn events(&self) -> &[ValidationEvent] {
        &self.events
    }

    /// A document is usable when nothing at `Error` level or above was
    /// found. Info and warning events are advisory.
    pub fn is_valid(&self) -> bool {
        self.events.iter().all(|e| e.severity < Severity::Error)
    }

    fn record(&mut self, severity: Severity, message: String) {
        self.events.push(ValidationEvent { severity, message });
    }

    /// Every label in the document must be unique; the engine's label
    /// index silently keeps the first occurrence otherwise.
    pub fn validate_labels(&mut self, root: &XmlElement) {
        let mut seen = HashSet::new();
        let mut duplicated = HashSet::new();
        for el in root.descendants() {
            if let Some(label) = el.label() {
                if !seen.insert(label) && duplicated.insert(label) {
                    self.record(
                        Severity::Error,
                        format!(
                            "DUPLICATE LABEL: the label {} appears more than once in the document",
                            label
                        ),
                    );
                }
            }
        }
        if duplicated.is_empty() {
            self.record(
                Severity::Ok,
                "All labels in the document are unique.".to_string(),
            );
        }
    }

    /// Every term reference must resolve to a definition in the terms
    /// layer, and every definition must actually define something.
    pub fn validate_terms(&mut self, root: &XmlElement, terms: &TermsLayer, settings: &Settings) {
        for definition in terms.definitions.values() {
            self.record(
                Severity::Info,
                format!(
                    "TERM: \"{}\" defined in: {}",
                    definition.term, definition.reference
                ),
            );
        }

        let mut problems = false;
        for el in root.descendants() {
            if el.tag != "content" {
                continue;
            }
            for def in el.elements().filter(|c| c.tag == "def") {
                let term = def.attr("term").unwrap_or_default();
                if term.is_empty() {
                    self.record(
                        Severity::Warning,
                        "EMPTY DEFINITION: a def element carries no term attribute".to_string(),
                    );
                    problems = true;
                }
            }
        }

        for tag in ["paragraph", "interpParagraph"] {
            for paragraph in root.descendants().filter(|d| d.tag == tag) {
                let content = match paragraph.find("content") {
                    Some(content) => content,
                    None => continue,
                };
                let label = paragraph.label().unwrap_or_default();
                for r in content
                    .descendants()
                    .filter(|d| d.tag == "ref" && d.attr("reftype") == Some("term"))
                {
                    let term = singularize(
                        &crate::text::leading_text(r).to_lowercase(),
                        settings,
                    );
                    let target = r.attr("target").unwrap_or_default();
                    let key = format!("{}:{}", term, target);
                    if !terms.definitions.contains_key(&key) {
                        self.record(
                            Severity::Warning,
                            format!(
                                "MISSING DEFINITION: in {} the term \"{}\" was referenced; \
                                 it is expected to be defined in {} but is not.",
                                label, term, target
                            ),
                        );
                        problems = true;
                    }
                }
            }
        }

        if problems {
            self.record(
                Severity::Warning,
                "There were some problems with references to terms. While these are \
                 usually not fatal, they can result in the wrong text being highlighted \
                 or incorrect links within the regulation text."
                    .to_string(),
            );
        } else {
            self.record(
                Severity::Ok,
                "All term references in the text point to existent definitions.".to_string(),
            );
        }
    }

    /// Every label the citations layer mentions, as a key or as a
    /// target, must exist in the document.
    pub fn validate_internal_cites(
        &mut self,
        root: &XmlElement,
        cites: &IndexMap<String, Vec<CitationEntry>>,
    ) {
        let labels: HashSet<&str> = root.descendants().filter_map(XmlElement::label).collect();

        let mut problems = false;
        for (label, entries) in cites {
            if !labels.contains(label.as_str()) {
                self.record(
                    Severity::Error,
                    format!(
                        "NONEXISTENT LABEL: the citations layer references label {} \
                         but that label does not exist in the document",
                        label
                    ),
                );
                problems = true;
            }
            for entry in entries {
                let citation = entry.citation.join("-");
                if !labels.contains(citation.as_str()) {
                    self.record(
                        Severity::Error,
                        format!(
                            "NONEXISTENT CITATION: there is a reference to label {} in {} \
                             but that referenced label does not exist.",
                            citation, label
                        ),
                    );
                    problems = true;
                }
            }
        }

        if problems {
            self.record(
                Severity::Error,
                "There were some problems with the internal citations. While these are \
                 not necessarily fatal, they can result in non-functioning links."
                    .to_string(),
            );
        } else {
            self.record(
                Severity::Ok,
                "All internal references in the text point to existing labels.".to_string(),
            );
        }
    }

    /// A changeset should not repeat the same directive; the engine
    /// would apply it twice and usually fail on the second pass.
    pub fn validate_changeset(&mut self, notice: &XmlElement) {
        let changeset = match notice.find_descendant("changeset") {
            Some(changeset) => changeset,
            None => return,
        };

        let mut counts: IndexMap<(String, String, String), usize> = IndexMap::new();
        for change in changeset.elements().filter(|c| c.tag == "change") {
            let op = change.attr("operation").unwrap_or_default().to_string();
            let label = change
                .label()
                .or_else(|| change.attr("oldTarget"))
                .unwrap_or_default()
                .to_string();
            let subpath = change.attr("subpath").unwrap_or_default().to_string();
            *counts.entry((op, label, subpath)).or_insert(0) += 1;
        }

        let mut problems = false;
        for ((op, label, _), count) in &counts {
            if *count > 1 {
                self.record(
                    Severity::Warning,
                    format!(
                        "DUPLICATE CHANGE: the changeset contains {} {} directives for {}",
                        count, op, label
                    ),
                );
                problems = true;
            }
        }
        if !problems {
            self.record(
                Severity::Ok,
                "No duplicate change directives in the changeset.".to_string(),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doc::xml::parse_document;
    use crate::layers::{build_internal_citations_layer, build_terms_layer};

    fn parse(xml: &str) -> XmlElement {
        parse_document(xml).unwrap()
    }

    fn worst(validator: &Validator) -> Severity {
        validator
            .events()
            .iter()
            .map(|e| e.severity)
            .max()
            .unwrap_or(Severity::Ok)
    }

    #[test]
    fn severities_are_ordered() {
        assert!(Severity::Ok < Severity::Info);
        assert!(Severity::Warning < Severity::Error);
        assert!(Severity::Error < Severity::Critical);
        assert_eq!(Severity::Warning.to_string(), "WARNING");
    }

    #[test]
    fn duplicate_labels_are_errors() {
        let doc = parse(
            r#"<regulation>
  <section label="1234-1" sectionNum="1"><subject>A</subject></section>
  <section label="1234-1" sectionNum="1"><subject>B</subject></section>
</regulation>"#,
        );
        let mut validator = Validator::new();
        validator.validate_labels(&doc);
        assert!(!validator.is_valid());
        assert!(validator.events()[0].message.contains("DUPLICATE LABEL"));
        assert!(validator.events()[0].message.contains("1234-1"));
    }

    #[test]
    fn unique_labels_record_a_single_ok() {
        let doc = parse(
            r#"<regulation>
  <section label="1234-1" sectionNum="1"><subject>A</subject></section>
</regulation>"#,
        );
        let mut validator = Validator::new();
        validator.validate_labels(&doc);
        assert!(validator.is_valid());
        assert_eq!(worst(&validator), Severity::Ok);
    }

    #[test]
    fn resolved_term_references_pass() {
        let doc = parse(
            r#"<regulation>
  <section label="1234-2" sectionNum="2">
    <subject>Definitions.</subject>
    <paragraph label="1234-2-a" marker="(a)">
      <content><def term="loan">Loan</def> means credit.</content>
    </paragraph>
    <paragraph label="1234-2-b" marker="(b)">
      <content>Each <ref target="1234-2-a" reftype="term">loan</ref> counts.</content>
    </paragraph>
  </section>
</regulation>"#,
        );
        let settings = Settings::builtin();
        let terms = build_terms_layer(&doc, &settings);
        let mut validator = Validator::new();
        validator.validate_terms(&doc, &terms, &settings);

        assert!(validator.is_valid());
        let severities: Vec<Severity> = validator.events().iter().map(|e| e.severity).collect();
        assert!(severities.contains(&Severity::Info));
        assert_eq!(*severities.last().unwrap(), Severity::Ok);
    }

    #[test]
    fn unresolved_term_references_warn_but_stay_valid() {
        let doc = parse(
            r#"<regulation>
  <section label="1234-2" sectionNum="2">
    <subject>S</subject>
    <paragraph label="1234-2-a" marker="(a)">
      <content>The <ref target="1234-9-z" reftype="term">finance charges</ref> rule.</content>
    </paragraph>
  </section>
</regulation>"#,
        );
        let settings = Settings::builtin();
        let terms = build_terms_layer(&doc, &settings);
        let mut validator = Validator::new();
        validator.validate_terms(&doc, &terms, &settings);

        assert!(validator.is_valid());
        let missing = validator
            .events()
            .iter()
            .find(|e| e.message.contains("MISSING DEFINITION"))
            .unwrap();
        assert_eq!(missing.severity, Severity::Warning);
        // The reference is reported in singular form.
        assert!(missing.message.contains("finance charge"));
    }

    #[test]
    fn citations_to_missing_labels_are_errors() {
        let doc = parse(
            r#"<regulation>
  <section label="1234-1" sectionNum="1">
    <subject>S</subject>
    <paragraph label="1234-1-a" marker="(a)">
      <content>See <ref target="1234-9" reftype="internal">§ 1234.9</ref>.</content>
    </paragraph>
  </section>
</regulation>"#,
        );
        let cites = build_internal_citations_layer(&doc);
        let mut validator = Validator::new();
        validator.validate_internal_cites(&doc, &cites);

        assert!(!validator.is_valid());
        assert!(validator
            .events()
            .iter()
            .any(|e| e.message.contains("NONEXISTENT CITATION") && e.message.contains("1234-9")));
    }

    #[test]
    fn duplicate_directives_warn() {
        let notice = parse(
            r#"<notice>
  <changeset>
    <change operation="deleted" label="1234-1-a"/>
    <change operation="deleted" label="1234-1-a"/>
    <change operation="modified" label="1234-1-b"><paragraph label="1234-1-b"/></change>
  </changeset>
</notice>"#,
        );
        let mut validator = Validator::new();
        validator.validate_changeset(&notice);

        assert!(validator.is_valid());
        assert_eq!(validator.events().len(), 1);
        let event = &validator.events()[0];
        assert_eq!(event.severity, Severity::Warning);
        assert!(event.message.contains("2 deleted directives for 1234-1-a"));
    }
}
