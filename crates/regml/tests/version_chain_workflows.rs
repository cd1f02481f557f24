mod common;

use common::assertions::label_set;
use common::fixtures::{base_regulation, notice};
use regml::diff::{diff_documents, DiffOp};
use regml::layers::{build_internal_citations_layer, build_marker_layer, build_terms_layer};
use regml::settings::Settings;
use regml::tree::build_reg_tree;
use regml::validate::Validator;
use regml::version::{apply_through, document_number, VersionError};

fn revise_authority() -> regml::doc::XmlElement {
    notice(
        "2015-10001",
        "2015-06-01",
        "2014-00001",
        r#"<change operation="modified" label="1234-1-a">
             <paragraph label="1234-1-a" marker="(a)">
               <content>Implements the Act as amended; see <ref target="1234-2" reftype="internal">§ 1234.2</ref>.</content>
             </paragraph>
           </change>"#,
    )
}

fn add_retention() -> regml::doc::XmlElement {
    notice(
        "2016-20002",
        "2016-06-01",
        "2015-10001",
        r#"<change operation="added" label="1234-1-b">
             <paragraph label="1234-1-b" marker="(b)"><content>Records retention.</content></paragraph>
           </change>"#,
    )
}

#[test]
fn notices_chain_in_effective_date_order() {
    let base = base_regulation();
    // Listed out of order on purpose.
    let notices = vec![add_retention(), revise_authority()];

    let steps = apply_through(&base, &notices, &Settings::builtin()).unwrap();

    assert_eq!(steps.len(), 2);
    assert_eq!(steps[0].notice.document_number, "2015-10001");
    assert_eq!(steps[1].notice.document_number, "2016-20002");
    assert_eq!(
        document_number(&steps[1].document).as_deref(),
        Some("2016-20002")
    );

    let first = diff_documents(&base, &steps[0].document);
    assert_eq!(first.len(), 1);
    assert_eq!(first["1234-1-a"].op, DiffOp::Modified);

    let second = diff_documents(&steps[0].document, &steps[1].document);
    assert_eq!(second.len(), 1);
    assert_eq!(second["1234-1-b"].op, DiffOp::Added);
}

#[test]
fn one_bad_notice_fails_the_whole_chain() {
    let base = base_regulation();
    let broken = notice(
        "2016-20002",
        "2016-06-01",
        "2015-10001",
        r#"<change operation="deleted" label="1234-9-q"/>"#,
    );

    match apply_through(&base, &[revise_authority(), broken], &Settings::builtin()) {
        Err(VersionError::Apply {
            document_number, ..
        }) => assert_eq!(document_number, "2016-20002"),
        other => panic!("unexpected: {:?}", other),
    }
}

#[test]
fn layers_and_validation_describe_the_final_version() {
    let base = base_regulation();
    let settings = Settings::builtin();
    let steps = apply_through(&base, &[revise_authority(), add_retention()], &settings).unwrap();
    let current = &steps.last().unwrap().document;

    let tree = build_reg_tree(current);
    let labels = tree.labels();
    assert!(labels.contains(&"1234-Subpart-B".to_string()));
    assert!(labels.contains(&"1234-1-b".to_string()));

    let markers = build_marker_layer(current);
    assert_eq!(markers["1234-1-b"][0].text, "(b)");

    let cites = build_internal_citations_layer(current);
    assert!(cites.contains_key("1234-2-b"));

    let terms = build_terms_layer(current, &settings);
    assert!(terms.definitions.contains_key("loan:1234-2-a"));

    let mut validator = Validator::new();
    validator.validate_labels(current);
    validator.validate_internal_cites(current, &cites);
    validator.validate_terms(current, &terms, &settings);
    assert!(validator.is_valid());

    // Every version keeps the full label set reachable.
    assert!(label_set(current).contains("1234-Subpart-A"));
}
