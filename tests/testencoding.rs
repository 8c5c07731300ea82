//! Encoding detection and decoding of document entities.

mod common;

use common::{Files, Outcome, recovering, scan_bytes};
use xscan::{config::XmlScanConfig, error::XmlScanError};

fn utf16(text: &str, big_endian: bool, bom: bool) -> Vec<u8> {
    let mut bytes = vec![];
    let units = bom
        .then_some(0xFEFF)
        .into_iter()
        .chain(text.encode_utf16());
    for unit in units {
        if big_endian {
            bytes.extend_from_slice(&unit.to_be_bytes());
        } else {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
    }
    bytes
}

fn scan(bytes: Vec<u8>) -> Outcome {
    scan_bytes(bytes, XmlScanConfig::default(), Files::default())
}

const DOC: &str = "<r a='\u{e9}'>\u{3042}\u{1F600}</r>";

fn assert_doc(outcome: &Outcome, encoding: &str) {
    assert!(outcome.errors.is_empty(), "{:?}", outcome.errors);
    assert_eq!(outcome.events[0], format!("startDocument({encoding})"));
    assert!(
        outcome
            .events
            .contains(&"start(r a=\u{e9})".to_owned())
    );
    assert!(
        outcome
            .events
            .contains(&"chars(\u{3042}\u{1F600})".to_owned())
    );
}

#[test]
fn utf8_with_and_without_bom() {
    let mut bytes = vec![0xEF, 0xBB, 0xBF];
    bytes.extend_from_slice(DOC.as_bytes());
    assert_doc(&scan(bytes), "UTF-8");

    assert_doc(&scan(DOC.as_bytes().to_vec()), "UTF-8");

    let doc = format!("<?xml version='1.0'?>{DOC}");
    let outcome = scan(doc.into_bytes());
    assert_doc(&outcome, "UTF-8");
    assert_eq!(outcome.events[1], "xmlDecl(1.0,,)");
}

#[test]
fn utf16_byte_order_marks() {
    assert_doc(&scan(utf16(DOC, true, true)), "UTF-16BE");
    assert_doc(&scan(utf16(DOC, false, true)), "UTF-16LE");

    let doc = format!("<?xml version='1.0' encoding='UTF-16'?>{DOC}");
    let outcome = scan(utf16(&doc, false, true));
    assert_doc(&outcome, "UTF-16LE");
    assert_eq!(outcome.events[1], "xmlDecl(1.0,UTF-16,)");
}

#[test]
fn utf16_without_bom_is_sniffed() {
    let doc = format!("<?xml version='1.0' encoding='UTF-16'?>{DOC}");
    assert_doc(&scan(utf16(&doc, true, false)), "UTF-16BE");
    assert_doc(&scan(utf16(&doc, false, false)), "UTF-16LE");
}

#[test]
fn declared_single_byte_encodings() {
    let mut bytes = b"<?xml version='1.0' encoding='ISO-8859-1'?><r>caf".to_vec();
    bytes.push(0xE9);
    bytes.extend_from_slice(b"</r>");
    let outcome = scan(bytes);
    assert!(outcome.errors.is_empty(), "{:?}", outcome.errors);
    assert_eq!(outcome.events[1], "xmlDecl(1.0,ISO-8859-1,)");
    assert!(outcome.events.contains(&"chars(caf\u{e9})".to_owned()));

    let mut bytes = b"<?xml version='1.0' encoding='windows-1252'?><r>".to_vec();
    bytes.push(0x80);
    bytes.extend_from_slice(b"</r>");
    let outcome = scan(bytes);
    assert!(outcome.errors.is_empty(), "{:?}", outcome.errors);
    assert!(outcome.events.contains(&"chars(\u{20AC})".to_owned()));
}

#[test]
fn ascii_rejects_high_bytes() {
    let mut bytes = b"<?xml version='1.0' encoding='US-ASCII'?><r>".to_vec();
    bytes.push(0xE9);
    bytes.extend_from_slice(b"</r>");
    let outcome = scan_bytes(bytes, recovering(), Files::default());
    assert_eq!(outcome.errors, vec!["F:InvalidASCII"]);
    assert!(!outcome.well_formed);
}

#[test]
fn malformed_utf8_is_fatal() {
    let outcome = scan(b"<r>a\x80</r>".to_vec());
    match outcome.result {
        Err(XmlScanError::Fatal(error)) => assert_eq!(error.key(), "InvalidByte"),
        other => panic!("{other:?}"),
    }

    let outcome = scan_bytes(b"<r>a\xE3\x81".to_vec(), recovering(), Files::default());
    assert!(!outcome.result.unwrap());
    assert_eq!(outcome.errors, vec!["F:ExpectedByte"]);
}

#[test]
fn unknown_encoding_names() {
    let outcome = scan_bytes(
        b"<?xml version='1.0' encoding='no such thing'?><r/>".to_vec(),
        recovering(),
        Files::default(),
    );
    assert!(!outcome.well_formed);
    assert_eq!(outcome.errors.first().map(String::as_str), Some("F:EncodingDeclInvalid"));
}

#[test]
fn truncated_documents_in_encoding_rs_encodings() {
    for tail in ["<r>&abc", "<r a", "<r>x\r", "<r></r", "<r>]]"] {
        let mut bytes = b"<?xml version='1.0' encoding='windows-1252'?>".to_vec();
        bytes.extend_from_slice(tail.as_bytes());
        let outcome = scan(bytes.clone());
        assert!(
            matches!(outcome.result, Err(XmlScanError::Fatal(_))),
            "{tail:?}: {:?}",
            outcome.result
        );
        assert!(!outcome.well_formed);

        let outcome = scan_bytes(bytes, recovering(), Files::default());
        assert!(matches!(outcome.result, Ok(false)), "{tail:?}: {:?}", outcome.result);
        assert!(!outcome.errors.is_empty(), "{tail:?}");
    }
}
