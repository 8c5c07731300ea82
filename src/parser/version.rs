//! Detection of the XML version of a document before it is scanned.
//!
//! The version decides which character rules the entity scanner applies,
//! so it must be known before the XML declaration is scanned for real.
//! The detector reads the beginning of the declaration with XML 1.0 rules
//! and puts a canonical copy of what it consumed back in front of the
//! buffer, leaving the document scanner to scan the declaration again.

use crate::{
    error::{XmlScanError, XmlScanErrors},
    io::XmlInputSource,
};

use super::{XmlEntityManager, entity::XML_DOCUMENT_ENTITY, scanner::XmlScanner};

/// The XML version whose character rules are applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub enum XmlVersion {
    #[default]
    Xml10,
    Xml11,
}

impl XmlVersion {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Xml10 => "1.0",
            Self::Xml11 => "1.1",
        }
    }
}

const EXPECTED_VERSION_STRING: &str = "<?xml version=";
const XML11_VERSION: [char; 3] = ['1', '.', '1'];

#[derive(Debug)]
pub struct XmlVersionDetector {
    expected: [char; 19],
    encoding: Option<String>,
}

impl XmlVersionDetector {
    pub fn new() -> Self {
        let mut expected = [' '; 19];
        for (slot, c) in expected.iter_mut().zip(EXPECTED_VERSION_STRING.chars()) {
            *slot = c;
        }
        Self {
            expected,
            encoding: None,
        }
    }

    /// Open the document entity of `source` and find the version it
    /// declares.
    ///
    /// Documents without a declaration, or whose declaration cannot be
    /// read this far, are XML 1.0. Returns `None` if the document could
    /// not be read at all; the failure has been reported.
    pub fn determine_doc_version(
        &mut self,
        scanner: &mut XmlScanner,
        source: XmlInputSource,
    ) -> Result<Option<XmlVersion>, XmlScanError> {
        match self.detect(&mut scanner.em, source) {
            Ok(version) => Ok(Some(version)),
            Err(err) => {
                // the end of an entity that was never announced
                scanner.em.pending.clear();
                match err {
                    XmlScanError::EndOfDocument => {
                        scanner.fatal_error(XmlScanErrors::XmlErrPrematureEOF, &[])?
                    }
                    err => scanner.report_decoding_error(err)?,
                }
                Ok(None)
            }
        }
    }

    fn detect(
        &mut self,
        em: &mut XmlEntityManager,
        source: XmlInputSource,
    ) -> Result<XmlVersion, XmlScanError> {
        self.encoding = em.setup_current_entity(XML_DOCUMENT_ENTITY, source, false, true)?;
        em.set_scanner_version(XmlVersion::Xml10);

        let mut scanner = em.scanner();
        if !scanner.skip_string("<?xml")? {
            return Ok(XmlVersion::Xml10);
        }
        if !scanner.skip_decl_spaces()? {
            self.fixup_current_entity(em, 5);
            return Ok(XmlVersion::Xml10);
        }
        if !scanner.skip_string("version")? {
            self.fixup_current_entity(em, 6);
            return Ok(XmlVersion::Xml10);
        }
        scanner.skip_decl_spaces()?;
        if scanner.peek_char()? != '=' {
            self.fixup_current_entity(em, 13);
            return Ok(XmlVersion::Xml10);
        }
        scanner.scan_char()?;
        scanner.skip_decl_spaces()?;
        self.expected[14] = scanner.scan_char()?;
        for i in 0..XML11_VERSION.len() {
            self.expected[15 + i] = scanner.scan_char()?;
        }
        self.expected[18] = scanner.scan_char()?;
        self.fixup_current_entity(em, 19);

        if self.expected[15..18] == XML11_VERSION {
            Ok(XmlVersion::Xml11)
        } else {
            Ok(XmlVersion::Xml10)
        }
    }

    /// Install the rules of `version` and announce the document entity to
    /// the scanner.
    pub fn start_document_parsing(&mut self, em: &mut XmlEntityManager, version: XmlVersion) {
        em.set_scanner_version(version);
        em.announce_current_entity(self.encoding.take());
    }

    /// Replace the characters consumed so far by the first `length`
    /// characters of the expected declaration.
    fn fixup_current_entity(&self, em: &mut XmlEntityManager, length: usize) {
        let Some(entity) = em.current.as_mut() else {
            return;
        };
        let needed = entity.count - entity.position + length;
        if needed > entity.ch.len() {
            entity.ch.resize(needed + 1, '\0');
        }
        if entity.position < length {
            let (position, count) = (entity.position, entity.count);
            if count + length - position > entity.ch.len() {
                entity.ch.resize(count + length - position, '\0');
            }
            entity.ch.copy_within(position..count, length);
            entity.count += length - position;
        } else {
            entity.ch[length..entity.position].fill(' ');
        }
        entity.ch[..length].copy_from_slice(&self.expected[..length]);
        entity.position = 0;
        entity.base_char_offset = 0;
        entity.start_position = 0;
        entity.line_number = 1;
        entity.column_number = 1;
    }
}

impl Default for XmlVersionDetector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        config::XmlScanConfig,
        parser::{XmlEntityEvent, scanner::tests::Collect},
    };

    use super::*;

    fn detect(text: &str) -> (XmlScanner, Option<XmlVersion>) {
        let mut scanner = XmlScanner::new(XmlScanConfig {
            continue_after_fatal_error: true,
            ..Default::default()
        });
        scanner
            .em
            .set_error_handler(Some(Box::new(Collect::default())));
        let mut detector = XmlVersionDetector::new();
        let version = detector
            .determine_doc_version(
                &mut scanner,
                XmlInputSource::from_bytes(Some("doc.xml"), text.as_bytes().to_vec()),
            )
            .unwrap();
        if let Some(version) = version {
            detector.start_document_parsing(&mut scanner.em, version);
        }
        (scanner, version)
    }

    fn remaining(scanner: &mut XmlScanner) -> String {
        let mut out = String::new();
        let mut scanner = scanner.em.scanner();
        while let Ok(c) = scanner.scan_char() {
            out.push(c);
        }
        out
    }

    #[test]
    fn declared_versions() {
        let (mut scanner, version) = detect("<?xml version='1.1'?><r/>");
        #[cfg(feature = "xml11")]
        assert_eq!(scanner.em.scanner_version(), XmlVersion::Xml11);
        assert_eq!(version, Some(XmlVersion::Xml11));
        assert_eq!(remaining(&mut scanner), "<?xml version='1.1'?><r/>");

        let (mut scanner, version) = detect("<?xml  version = \"1.0\" ?><r/>");
        assert_eq!(version, Some(XmlVersion::Xml10));
        assert_eq!(remaining(&mut scanner), "<?xml version=\"1.0\" ?><r/>");
    }

    #[test]
    fn partial_declarations_are_restored() {
        let (mut scanner, version) = detect("<?xml-stylesheet?><r/>");
        assert_eq!(version, Some(XmlVersion::Xml10));
        assert_eq!(remaining(&mut scanner), "<?xml-stylesheet?><r/>");

        let (mut scanner, _) = detect("<?xml encoding='UTF-8'?><r/>");
        assert_eq!(remaining(&mut scanner), "<?xml encoding='UTF-8'?><r/>");

        let (mut scanner, _) = detect("<r/>");
        assert_eq!(remaining(&mut scanner), "<r/>");
    }

    #[test]
    fn document_entity_is_announced() {
        let (mut scanner, _) = detect("<r/>");
        match scanner.em.next_entity_event() {
            Some(XmlEntityEvent::Start { name, encoding, .. }) => {
                assert_eq!(name, XML_DOCUMENT_ENTITY);
                assert_eq!(encoding.as_deref(), Some("UTF-8"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn empty_document() {
        let (scanner, version) = detect("");
        assert_eq!(version, None);
        assert!(!scanner.em.has_entity_events());
    }
}
