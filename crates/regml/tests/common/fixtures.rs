#![allow(dead_code)]

use regml::doc::xml::parse_document;
use regml::doc::XmlElement;

pub fn parse(xml: &str) -> XmlElement {
    parse_document(xml).expect("fixture XML should parse")
}

/// Part 1234: two lettered subparts, a table of contents, term
/// definitions, and internal cross references.
pub fn base_regulation() -> XmlElement {
    parse(BASE_REGULATION)
}

/// A notice wrapping the given change directives, with the preamble
/// fields the version sequencer reads.
pub fn notice(
    document_number: &str,
    effective_date: &str,
    applies_to: &str,
    changes: &str,
) -> XmlElement {
    parse(&format!(
        r#"<notice>
  <fdsys>
    <title>TEST CASE RUNNING ACT</title>
    <date>{effective_date}</date>
  </fdsys>
  <preamble>
    <documentNumber>{document_number}</documentNumber>
    <cfr><title>12</title><section>1234</section></cfr>
    <effectiveDate>{effective_date}</effectiveDate>
  </preamble>
  <changeset leftDocumentNumber="{applies_to}" rightDocumentNumber="{document_number}">
{changes}
  </changeset>
</notice>"#
    ))
}

pub const BASE_REGULATION: &str = r#"<regulation>
  <fdsys>
    <title>TEST CASE RUNNING ACT</title>
    <date>2014-11-03</date>
  </fdsys>
  <preamble>
    <documentNumber>2014-00001</documentNumber>
    <cfr><title>12</title><section>1234</section></cfr>
    <effectiveDate>2014-11-03</effectiveDate>
  </preamble>
  <part label="1234">
    <tableOfContents>
      <tocSecEntry target="1234-1">
        <sectionNum>1</sectionNum>
        <sectionSubject>Authority.</sectionSubject>
      </tocSecEntry>
      <tocSecEntry target="1234-2">
        <sectionNum>2</sectionNum>
        <sectionSubject>Definitions.</sectionSubject>
      </tocSecEntry>
    </tableOfContents>
    <content>
      <subpart subpartLetter="A" label="1234-Subpart-A">
        <title>General</title>
        <content>
          <section label="1234-1" sectionNum="1">
            <subject>Authority.</subject>
            <paragraph label="1234-1-a" marker="(a)">
              <content>This part implements the Act; see <ref target="1234-2" reftype="internal">§ 1234.2</ref>.</content>
            </paragraph>
          </section>
        </content>
      </subpart>
      <subpart subpartLetter="B" label="1234-Subpart-B">
        <title>Standards</title>
        <content>
          <section label="1234-2" sectionNum="2">
            <subject>Definitions.</subject>
            <paragraph label="1234-2-a" marker="(a)">
              <content><def term="loan">Loan</def> means an extension of credit.</content>
            </paragraph>
            <paragraph label="1234-2-b" marker="(b)">
              <content>Each <ref target="1234-2-a" reftype="term">loan</ref> is explained <ref target="1234-1" reftype="internal">see above</ref> or <ref target="1234-1" reftype="internal">see below</ref>.</content>
            </paragraph>
          </section>
        </content>
      </subpart>
    </content>
  </part>
</regulation>"#;
