//! Entity expansion limits.

mod common;

use common::{Diagnostics, Files, recovering, scan_bytes, scan_text};
use xscan::{
    config::XmlScanConfig, error::XmlScanError, io::XmlInputSource, parser::XmlDocumentScanner,
};

/// Nested entities, each referencing the one below `fanout` times.
fn laughs(depth: usize, fanout: usize) -> String {
    let mut doc = String::from("<!DOCTYPE r [<!ENTITY l0 'lol'>");
    for level in 1..=depth {
        let refs = format!("&l{};", level - 1).repeat(fanout);
        doc.push_str(&format!("<!ENTITY l{level} '{refs}'>"));
    }
    doc.push_str(&format!("]><r>&l{depth};</r>"));
    doc
}

fn expansions(depth: usize, fanout: usize) -> usize {
    (1..=depth + 1).map(|level| fanout.pow(level as u32 - 1)).sum()
}

fn limited(limit: usize) -> XmlScanConfig {
    XmlScanConfig {
        entity_expansion_limit: Some(limit),
        ..Default::default()
    }
}

#[test]
fn unlimited_expansion() {
    let outcome = scan_text(&laughs(3, 10), XmlScanConfig::default());
    assert!(!outcome.result.unwrap());
    assert!(outcome.errors.is_empty(), "{:?}", outcome.errors);
    let text = outcome
        .events
        .iter()
        .filter(|e| *e == "chars(lol)")
        .count();
    assert_eq!(text, 1000);
}

#[test]
fn exceeding_the_limit_is_fatal_once() {
    let outcome = scan_text(&laughs(3, 10), limited(100));
    match outcome.result {
        Err(XmlScanError::Fatal(error)) => {
            assert_eq!(error.key(), "EntityExpansionLimitExceeded");
            assert!(error.message.contains("\"100\""), "{}", error.message);
        }
        other => panic!("{other:?}"),
    }
    assert_eq!(outcome.errors, vec!["F:EntityExpansionLimitExceeded"]);
}

#[test]
fn documents_within_the_limit() {
    let total = expansions(2, 5);
    assert_eq!(total, 31);
    let outcome = scan_text(&laughs(2, 5), limited(total));
    assert!(!outcome.result.unwrap());
    assert!(outcome.errors.is_empty(), "{:?}", outcome.errors);

    let outcome = scan_text(&laughs(2, 5), limited(total - 2));
    assert!(outcome.result.is_err());
    assert_eq!(outcome.errors, vec!["F:EntityExpansionLimitExceeded"]);
}

#[test]
fn limits_apply_per_document() {
    let doc = laughs(1, 8);
    let mut scanner = XmlDocumentScanner::new(limited(10));
    let errors = Diagnostics::default();
    scanner.set_error_handler(Some(Box::new(errors.clone())));
    for _ in 0..3 {
        let source = XmlInputSource::from_bytes(Some("doc.xml"), doc.as_bytes().to_vec());
        assert!(scanner.open(source).unwrap());
        assert!(!scanner.scan_document(true).unwrap());
    }
    assert!(errors.0.borrow().is_empty(), "{:?}", errors.0.borrow());
}

#[test]
fn parameter_references_in_values_count() {
    let files = Files::default().with(
        "p.dtd",
        "<!ENTITY % a 'x'><!ENTITY % b '%a;%a;%a;%a;'><!ENTITY % c '%b;%b;%b;%b;'>",
    );
    let doc = "<!DOCTYPE r SYSTEM 'p.dtd'><r/>";
    let outcome = scan_bytes(doc, XmlScanConfig::default(), files.clone());
    assert!(outcome.well_formed, "{:?}", outcome.errors);

    let outcome = scan_bytes(
        doc,
        XmlScanConfig {
            continue_after_fatal_error: true,
            ..limited(3)
        },
        files,
    );
    assert!(
        outcome
            .errors
            .contains(&"F:EntityExpansionLimitExceeded".to_owned()),
        "{:?}",
        outcome.errors
    );
}

#[test]
fn recovery_after_the_limit() {
    let outcome = scan_text(&laughs(2, 10), XmlScanConfig {
        entity_expansion_limit: Some(50),
        ..recovering()
    });
    assert!(!outcome.result.unwrap());
    assert!(!outcome.well_formed);
    assert!(
        outcome
            .errors
            .iter()
            .all(|e| e == "F:EntityExpansionLimitExceeded")
    );
    assert_eq!(outcome.events.last().map(String::as_str), Some("endDocument"));
}
