//! Entity recursion checks.

mod common;

use common::{Files, recovering, scan_bytes, scan_text};
use xscan::{config::XmlScanConfig, error::XmlScanError};

/// A document declaring a cycle of `length` general entities and
/// referencing the first one from the root element.
fn cycle(length: usize) -> String {
    let mut doc = String::from("<!DOCTYPE r [");
    for i in 0..length {
        let next = (i + 1) % length;
        doc.push_str(&format!("<!ENTITY e{i} 'x&e{next};'>"));
    }
    doc.push_str("]><r>&e0;</r>");
    doc
}

#[test]
fn cycles_are_fatal() {
    for length in 1..=3 {
        let outcome = scan_text(&cycle(length), XmlScanConfig::default());
        match outcome.result {
            Err(XmlScanError::Fatal(error)) => {
                assert_eq!(error.key(), "RecursiveReference", "cycle of {length}");
                let path = (0..=length)
                    .map(|i| format!("e{}", i % length))
                    .collect::<Vec<_>>()
                    .join(" -> ");
                assert!(error.message.contains(&path), "{}", error.message);
            }
            other => panic!("cycle of {length}: {other:?}"),
        }
    }
}

#[test]
fn cycles_are_skipped_when_recovering() {
    for length in 1..=3 {
        let outcome = scan_text(&cycle(length), recovering());
        assert!(!outcome.result.unwrap(), "cycle of {length}");
        assert_eq!(outcome.errors, vec!["F:RecursiveReference"], "cycle of {length}");
        let text = outcome
            .events
            .iter()
            .filter(|e| *e == "chars(x)")
            .count();
        assert_eq!(text, length, "cycle of {length}");
        let starts = outcome
            .events
            .iter()
            .filter(|e| e.starts_with("startEntity("))
            .count();
        let ends = outcome
            .events
            .iter()
            .filter(|e| e.starts_with("endEntity("))
            .count();
        assert_eq!(starts, length + 1);
        assert_eq!(starts, ends);
        assert_eq!(outcome.events.last().map(String::as_str), Some("endDocument"));
    }
}

#[test]
fn repeated_references_are_not_recursion() {
    let outcome = scan_text(
        "<!DOCTYPE r [<!ENTITY a 'a'><!ENTITY b '&a;&a;'>]><r>&b;&b;&a;</r>",
        XmlScanConfig::default(),
    );
    assert!(!outcome.result.unwrap());
    assert!(outcome.errors.is_empty(), "{:?}", outcome.errors);
}

#[test]
fn external_entity_referencing_itself() {
    let files = Files::default().with("self.xml", "<i>&self;</i>");
    let outcome = scan_bytes(
        "<!DOCTYPE r [<!ENTITY self SYSTEM 'self.xml'>]><r>&self;</r>",
        recovering(),
        files,
    );
    assert_eq!(outcome.errors, vec!["F:RecursiveReference"]);
    assert_eq!(
        outcome
            .events
            .iter()
            .filter(|e| *e == "start(i)")
            .count(),
        1
    );
}

#[test]
fn parameter_entity_cycle() {
    let files = Files::default()
        .with("a.ent", "<!ENTITY x 'a'>%b;")
        .with("b.ent", "<!ENTITY y 'b'>%a;");
    let outcome = scan_bytes(
        "<!DOCTYPE r [<!ENTITY % a SYSTEM 'a.ent'><!ENTITY % b SYSTEM 'b.ent'> %a;]><r>&x;&y;</r>",
        recovering(),
        files,
    );
    assert!(
        outcome.errors.contains(&"F:RecursiveReference".to_owned()),
        "{:?}",
        outcome.errors
    );
    assert!(outcome.events.contains(&"chars(a)".to_owned()));
    assert!(outcome.events.contains(&"chars(b)".to_owned()));
    assert_eq!(outcome.events.last().map(String::as_str), Some("endDocument"));
}
