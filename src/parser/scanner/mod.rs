//! Scanning routines shared by the document scanner and the DTD scanner.
//!
//! [`XmlScanner`] owns the entity manager and the configuration. The
//! productions that appear both in documents and in DTD subsets (XML and
//! text declarations, processing instructions, comments, attribute values,
//! external identifiers and character references) are scanned by the
//! methods in the submodules.

mod attribute;
mod charref;
mod comment;
mod external_id;
mod pi;
mod xmldecl;

use crate::{
    config::XmlScanConfig,
    error::{XmlScanError, XmlScanErrors},
    io::{XmlEntityResolver, XmlInputSource},
};

use super::{XmlEntityManager, XmlEntityScanner, XmlStringBuffer, XmlVersion};

pub(crate) use attribute::builtin_entity;
pub use external_id::XmlExternalId;
pub use xmldecl::XmlDeclaration;

/// The part of a scanner shared by every scanning component.
pub struct XmlScanner {
    pub(crate) em: XmlEntityManager,
    pub(crate) config: XmlScanConfig,
    /// `standalone="yes"` was declared.
    pub(crate) standalone: bool,
    /// Set while an attribute value is scanned.
    pub(crate) scanning_attribute: bool,
    /// The text of the last character reference scanned in content, such
    /// as `#x41`.
    pub(crate) char_ref_literal: Option<String>,
    string_buffer: XmlStringBuffer,
    digits: XmlStringBuffer,
}

impl XmlScanner {
    pub fn new(config: XmlScanConfig) -> Self {
        Self {
            em: XmlEntityManager::new(&config),
            config,
            standalone: false,
            scanning_attribute: false,
            char_ref_literal: None,
            string_buffer: XmlStringBuffer::new(),
            digits: XmlStringBuffer::new(),
        }
    }

    /// Forget the state of the previous document.
    pub fn reset(&mut self) {
        self.em.reset(&self.config);
        self.standalone = false;
        self.scanning_attribute = false;
        self.char_ref_literal = None;
    }

    pub fn config(&self) -> &XmlScanConfig {
        &self.config
    }

    /// Replace the configuration. It takes effect on the next [`reset`](Self::reset).
    pub fn set_config(&mut self, config: XmlScanConfig) {
        self.config = config;
    }

    pub fn entity_manager(&self) -> &XmlEntityManager {
        &self.em
    }

    pub fn entity_manager_mut(&mut self) -> &mut XmlEntityManager {
        &mut self.em
    }

    pub fn set_entity_resolver(&mut self, resolver: Option<Box<dyn XmlEntityResolver>>) {
        self.em.set_entity_resolver(resolver);
    }

    pub fn is_standalone(&self) -> bool {
        self.standalone
    }

    pub(crate) fn scanner(&mut self) -> XmlEntityScanner<'_> {
        self.em.scanner()
    }

    pub(crate) fn fatal_error(
        &mut self,
        code: XmlScanErrors,
        args: &[&str],
    ) -> Result<(), XmlScanError> {
        self.em.report_fatal(code, args)
    }

    /// Whether a declared `version` can be scanned with the rules in use.
    pub(crate) fn version_supported(&self, version: &str) -> bool {
        match self.em.scanner_version() {
            XmlVersion::Xml10 => version == "1.0",
            XmlVersion::Xml11 => version == "1.0" || version == "1.1",
        }
    }

    /// Characters that may not appear literally in the current entity.
    pub(crate) fn is_invalid_literal(&self, c: char) -> bool {
        let external = self.em.current_entity().is_some_and(|e| e.is_external());
        self.em.char_rules().is_data_invalid(c, external)
    }

    /// Characters that may not be referred to by a character reference.
    pub(crate) fn is_invalid(&self, c: char) -> bool {
        self.em.char_rules().is_invalid(c)
    }

    /// Report a decoding failure that ended a scanning step.
    ///
    /// Errors of other kinds are given back.
    pub(crate) fn report_decoding_error(
        &mut self,
        error: XmlScanError,
    ) -> Result<(), XmlScanError> {
        match error {
            XmlScanError::MalformedByteSequence { code, args } => {
                let args = args.iter().map(|arg| arg.as_str()).collect::<Vec<_>>();
                self.fatal_error(code, &args)
            }
            XmlScanError::CharConversion(_) => {
                self.fatal_error(XmlScanErrors::XmlErrCharConversionFailure, &[])
            }
            other => Err(other),
        }
    }

    /// Open the document entity.
    pub fn start_document_entity(&mut self, source: XmlInputSource) -> Result<(), XmlScanError> {
        self.em.start_document_entity(source)
    }
}

impl Default for XmlScanner {
    fn default() -> Self {
        Self::new(XmlScanConfig::default())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use crate::error::{XmlError, XmlErrorHandler};

    use super::*;

    /// Collects the keys of every reported diagnostic.
    #[derive(Clone, Default)]
    pub(crate) struct Collect(pub std::rc::Rc<std::cell::RefCell<Vec<String>>>);

    impl XmlErrorHandler for Collect {
        fn warning(&mut self, error: &XmlError) {
            self.0.borrow_mut().push(format!("W:{}", error.key()));
        }
        fn error(&mut self, error: &XmlError) {
            self.0.borrow_mut().push(format!("E:{}", error.key()));
        }
        fn fatal_error(&mut self, error: &XmlError) {
            self.0.borrow_mut().push(format!("F:{}", error.key()));
        }
    }

    pub(crate) fn scanner_over(text: &str, config: XmlScanConfig) -> (XmlScanner, Collect) {
        let mut scanner = XmlScanner::new(config);
        let collect = Collect::default();
        scanner.em.set_error_handler(Some(Box::new(collect.clone())));
        scanner
            .start_document_entity(XmlInputSource::from_string(Some("test.xml"), text))
            .unwrap();
        while scanner.em.next_entity_event().is_some() {}
        (scanner, collect)
    }

    #[test]
    fn supported_versions() {
        let mut scanner = XmlScanner::default();
        assert!(scanner.version_supported("1.0"));
        assert!(!scanner.version_supported("1.1"));
        scanner.em.set_scanner_version(XmlVersion::Xml11);
        #[cfg(feature = "xml11")]
        assert!(scanner.version_supported("1.1"));
        assert!(!scanner.version_supported("2.0"));
    }

    #[test]
    fn decoding_errors_are_fatal() {
        let mut config = XmlScanConfig::default();
        config.continue_after_fatal_error = true;
        let (mut scanner, collect) = scanner_over("<r/>", config);
        scanner
            .report_decoding_error(XmlScanError::CharConversion("bad".to_owned()))
            .unwrap();
        assert!(
            scanner
                .report_decoding_error(XmlScanError::EndOfDocument)
                .unwrap_err()
                .is_end_of_document()
        );
        assert_eq!(*collect.0.borrow(), vec!["F:CharConversionFailure"]);
    }
}
