//! The document scanner.
//!
//! [`XmlDocumentScanner`] is a state machine driven by
//! [`dispatch`](XmlDocumentScanner::dispatch). The states are grouped by
//! the region of the document they belong to, and each group is run by a
//! dispatcher: the XML declaration, the prolog, the DTD, the content of
//! the root element and what trails it. Control passes from one dispatcher
//! to the next as the document is scanned.
//!
//! The content dispatcher is implemented in `fragment`, as it is all a
//! scanner of external parsed entities needs.

use crate::{
    chvalid::XmlCharValid,
    config::XmlScanConfig,
    error::{XmlErrorHandler, XmlScanError, XmlScanErrors},
    io::{XmlEntityResolver, XmlInputSource, XmlResourceIdentifier},
};

use super::{
    QName, XmlAttributes, XmlEntityManager, XmlStringBuffer, XmlVersionDetector,
    dtd::{XmlDtdScanner, XmlEntityDeclScanner},
    entity::XML_FRAGMENT_ENTITY,
    handler::{XmlDocumentHandler, XmlExternalSubsetResolver},
    scanner::XmlScanner,
};

/// The states of the document scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XmlScannerState {
    XmlDecl,
    Prolog,
    Doctype,
    DtdInternalDecls,
    DtdExternal,
    DtdExternalDecls,
    RootElement,
    Content,
    StartOfMarkup,
    Comment,
    Pi,
    Cdata,
    Reference,
    TextDecl,
    TrailingMisc,
    /// The document was scanned to its end.
    Terminated,
    /// Scanning stopped before the end of the document.
    EndOfInput,
}

/// The dispatchers of the document scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XmlDispatcher {
    XmlDecl,
    Prolog,
    Dtd,
    Content,
    TrailingMisc,
    /// The content dispatcher of a fragment scanner.
    FragmentContent,
}

/// A pull scanner of XML documents and external parsed entities.
pub struct XmlDocumentScanner {
    pub(crate) scanner: XmlScanner,
    pub(crate) handler: Option<Box<dyn XmlDocumentHandler>>,
    dtd_scanner: Box<dyn XmlDtdScanner>,
    external_subset_resolver: Option<Box<dyn XmlExternalSubsetResolver>>,
    detector: XmlVersionDetector,
    pub(crate) state: XmlScannerState,
    pub(crate) dispatcher: XmlDispatcher,
    pub(crate) fragment: bool,

    /// The open elements, innermost last.
    pub(crate) elements: Vec<QName>,
    /// Open start tags, open elements and open markup of any other kind.
    pub(crate) markup_depth: usize,
    /// The markup depth at which each open entity started.
    pub(crate) entity_depths: Vec<usize>,
    /// Set while the brackets of a possible `]]>` in content are collected.
    pub(crate) in_scan_content: bool,
    /// References to undeclared entities are validity errors, not fatal.
    pub(crate) is_entity_declared_vc: bool,
    pub(crate) saw_space: bool,

    seen_doctype: bool,
    has_external_dtd: bool,
    doctype_name: Option<String>,
    doctype_public_id: Option<String>,
    doctype_system_id: Option<String>,
    external_subset_source: Option<XmlInputSource>,

    pub(crate) element_qname: QName,
    pub(crate) attribute_qname: QName,
    pub(crate) attributes: XmlAttributes,
    /// Characters of content that could not be delivered as a view.
    pub(crate) content: XmlStringBuffer,
    /// Comments, processing instructions and CDATA sections.
    pub(crate) text: XmlStringBuffer,
    pub(crate) value: XmlStringBuffer,
    pub(crate) raw: XmlStringBuffer,
}

impl XmlDocumentScanner {
    pub fn new(config: XmlScanConfig) -> Self {
        Self::with_mode(config, false)
    }

    /// Create a scanner of external parsed entities: content, optionally
    /// preceded by a text declaration.
    pub fn new_fragment(config: XmlScanConfig) -> Self {
        Self::with_mode(config, true)
    }

    fn with_mode(config: XmlScanConfig, fragment: bool) -> Self {
        let (state, dispatcher) = Self::initial_state(fragment);
        Self {
            scanner: XmlScanner::new(config),
            handler: None,
            dtd_scanner: Box::new(XmlEntityDeclScanner::new()),
            external_subset_resolver: None,
            detector: XmlVersionDetector::new(),
            state,
            dispatcher,
            fragment,
            elements: vec![],
            markup_depth: 0,
            entity_depths: vec![],
            in_scan_content: false,
            is_entity_declared_vc: false,
            saw_space: false,
            seen_doctype: false,
            has_external_dtd: false,
            doctype_name: None,
            doctype_public_id: None,
            doctype_system_id: None,
            external_subset_source: None,
            element_qname: QName::default(),
            attribute_qname: QName::default(),
            attributes: XmlAttributes::new(),
            content: XmlStringBuffer::new(),
            text: XmlStringBuffer::new(),
            value: XmlStringBuffer::new(),
            raw: XmlStringBuffer::new(),
        }
    }

    fn initial_state(fragment: bool) -> (XmlScannerState, XmlDispatcher) {
        if fragment {
            (XmlScannerState::TextDecl, XmlDispatcher::FragmentContent)
        } else {
            (XmlScannerState::XmlDecl, XmlDispatcher::XmlDecl)
        }
    }

    /// Forget the state of the previous document.
    ///
    /// The handlers and resolvers stay installed.
    pub fn reset(&mut self) {
        self.scanner.reset();
        self.dtd_scanner.reset();
        (self.state, self.dispatcher) = Self::initial_state(self.fragment);
        self.elements.clear();
        self.markup_depth = 0;
        self.entity_depths.clear();
        self.in_scan_content = false;
        self.is_entity_declared_vc = false;
        self.saw_space = false;
        self.seen_doctype = false;
        self.has_external_dtd = false;
        self.doctype_name = None;
        self.doctype_public_id = None;
        self.doctype_system_id = None;
        self.external_subset_source = None;
        self.attributes.remove_all();
    }

    pub fn config(&self) -> &XmlScanConfig {
        self.scanner.config()
    }

    /// Replace the configuration. It takes effect with the next input
    /// source.
    pub fn set_config(&mut self, config: XmlScanConfig) {
        self.scanner.set_config(config);
    }

    pub fn set_document_handler(&mut self, handler: Option<Box<dyn XmlDocumentHandler>>) {
        self.handler = handler;
    }

    pub fn take_document_handler(&mut self) -> Option<Box<dyn XmlDocumentHandler>> {
        self.handler.take()
    }

    pub fn set_error_handler(&mut self, handler: Option<Box<dyn XmlErrorHandler>>) {
        self.scanner.em.set_error_handler(handler);
    }

    pub fn set_entity_resolver(&mut self, resolver: Option<Box<dyn XmlEntityResolver>>) {
        self.scanner.set_entity_resolver(resolver);
    }

    pub fn set_external_subset_resolver(
        &mut self,
        resolver: Option<Box<dyn XmlExternalSubsetResolver>>,
    ) {
        self.external_subset_resolver = resolver;
    }

    /// Replace the scanner of the DTD subsets.
    pub fn set_dtd_scanner(&mut self, dtd_scanner: Box<dyn XmlDtdScanner>) {
        self.dtd_scanner = dtd_scanner;
    }

    pub fn entity_manager(&self) -> &XmlEntityManager {
        &self.scanner.em
    }

    pub fn entity_manager_mut(&mut self) -> &mut XmlEntityManager {
        &mut self.scanner.em
    }

    pub fn state(&self) -> XmlScannerState {
        self.state
    }

    pub fn dispatcher(&self) -> XmlDispatcher {
        self.dispatcher
    }

    pub fn is_fragment(&self) -> bool {
        self.fragment
    }

    /// The depth of the open elements.
    pub fn element_depth(&self) -> usize {
        self.elements.len()
    }

    /// Reset the scanner and start scanning `source`.
    pub fn set_input_source(&mut self, source: XmlInputSource) -> Result<(), XmlScanError> {
        self.reset();
        if self.fragment {
            self.scanner
                .em
                .start_entity_with_source(XML_FRAGMENT_ENTITY, source, false, true)
        } else {
            self.scanner.start_document_entity(source)
        }
    }

    /// Reset the scanner and start scanning `source` with the character
    /// rules of the XML version it declares.
    ///
    /// Returns `false` if the document could not be read at all; the
    /// failure has been reported.
    pub fn open(&mut self, source: XmlInputSource) -> Result<bool, XmlScanError> {
        if self.fragment {
            self.set_input_source(source)?;
            return Ok(true);
        }
        self.reset();
        match self
            .detector
            .determine_doc_version(&mut self.scanner, source)?
        {
            Some(version) => {
                self.detector
                    .start_document_parsing(&mut self.scanner.em, version);
                Ok(true)
            }
            None => {
                self.state = XmlScannerState::EndOfInput;
                Ok(false)
            }
        }
    }

    /// Close every open reader.
    pub fn close(&mut self) {
        self.scanner.em.close_readers();
    }

    /// Scan the document.
    ///
    /// With `complete`, the whole document is scanned. Otherwise a single
    /// step is taken and `true` means that there is more to scan.
    pub fn scan_document(&mut self, complete: bool) -> Result<bool, XmlScanError> {
        loop {
            if !self.dispatch(complete)? {
                return Ok(false);
            }
            if !complete {
                return Ok(true);
            }
        }
    }

    /// Run the current dispatcher.
    ///
    /// Returns `true` if there is more to scan. Without `complete` a
    /// dispatcher returns after each step; with it, when it hands control
    /// to another dispatcher.
    ///
    /// Encoding failures and a premature end of the document are reported
    /// and end the scan with `Ok(false)`. A fatal error is returned as
    /// `Err` unless the scanner continues after fatal errors.
    pub fn dispatch(&mut self, complete: bool) -> Result<bool, XmlScanError> {
        if matches!(
            self.state,
            XmlScannerState::Terminated | XmlScannerState::EndOfInput
        ) {
            return Ok(false);
        }
        let dispatcher = self.dispatcher;
        let res = match dispatcher {
            XmlDispatcher::XmlDecl => self.dispatch_xml_decl(),
            XmlDispatcher::Prolog => self.dispatch_prolog(complete),
            XmlDispatcher::Dtd => self.dispatch_dtd(complete),
            XmlDispatcher::Content | XmlDispatcher::FragmentContent => {
                self.dispatch_content(complete)
            }
            XmlDispatcher::TrailingMisc => self.dispatch_trailing_misc(complete),
        };
        match res {
            Ok(more) => Ok(more),
            Err(XmlScanError::EndOfDocument) => {
                self.drain_entity_events()?;
                self.end_of_input(dispatcher)?;
                Ok(false)
            }
            Err(
                err @ (XmlScanError::MalformedByteSequence { .. }
                | XmlScanError::CharConversion(_)),
            ) => {
                self.state = XmlScannerState::EndOfInput;
                self.scanner.report_decoding_error(err)?;
                Ok(false)
            }
            Err(err) => Err(err),
        }
    }

    fn end_of_input(&mut self, dispatcher: XmlDispatcher) -> Result<(), XmlScanError> {
        match dispatcher {
            XmlDispatcher::TrailingMisc | XmlDispatcher::FragmentContent
                if self.markup_depth == 0 =>
            {
                self.state = XmlScannerState::Terminated;
                Ok(())
            }
            _ => {
                self.state = XmlScannerState::EndOfInput;
                self.scanner
                    .fatal_error(XmlScanErrors::XmlErrPrematureEOF, &[])
            }
        }
    }

    fn read_external_subset(&self) -> bool {
        self.scanner.config.validation || self.scanner.config.load_external_dtd
    }

    /// Scan an XML or text declaration, `<?xml` having been consumed, and
    /// apply what it declares.
    pub(crate) fn scan_xml_decl_or_text_decl(&mut self, text_decl: bool) -> Result<(), XmlScanError> {
        let decl = self
            .scanner
            .scan_xml_decl_or_text_decl(text_decl, &mut self.text)?;
        self.markup_depth = self.markup_depth.saturating_sub(1);

        if text_decl {
            notify!(self, text_decl(decl.version.as_deref(), decl.encoding.as_deref()));
        } else {
            notify!(
                self,
                xml_decl(
                    decl.version.as_deref(),
                    decl.encoding.as_deref(),
                    decl.standalone.as_deref()
                )
            );
        }
        self.scanner.apply_declaration(&decl, text_decl)
    }

    /// Scan a processing instruction whose target starts with `xml`,
    /// `<?xml` having been consumed.
    pub(crate) fn scan_xml_prefixed_pi(&mut self) -> Result<(), XmlScanError> {
        let target = self.scanner.scan_xml_prefixed_target()?;
        self.scanner.scan_pi_data(&target, &mut self.text)?;
        self.end_pi(&target)
    }

    /// Scan `<?xml` at the start of an entity, if it is there.
    pub(crate) fn scan_xml_decl_start(&mut self, text_decl: bool) -> Result<(), XmlScanError> {
        if self.scanner.scanner().skip_string("<?xml")? {
            self.markup_depth += 1;
            if self.scanner.scanner().peek_char()?.is_xml_name_char() {
                self.scan_xml_prefixed_pi()?;
            } else {
                self.scan_xml_decl_or_text_decl(text_decl)?;
            }
        }
        if let Some(entity) = self.scanner.em.current_entity_mut() {
            entity.set_may_read_chunks(true);
        }
        Ok(())
    }

    fn dispatch_xml_decl(&mut self) -> Result<bool, XmlScanError> {
        // the prolog follows whether there is a declaration or not
        self.state = XmlScannerState::Prolog;
        self.dispatcher = XmlDispatcher::Prolog;
        self.drain_entity_events()?;
        self.scan_xml_decl_start(false)?;
        Ok(true)
    }

    fn dispatch_prolog(&mut self, complete: bool) -> Result<bool, XmlScanError> {
        loop {
            let mut again = false;
            self.drain_entity_events()?;
            match self.state {
                XmlScannerState::Prolog => {
                    self.scanner.scanner().skip_spaces()?;
                    self.state = if self.scanner.scanner().skip_char('<')? {
                        XmlScannerState::StartOfMarkup
                    } else if self.scanner.scanner().skip_char('&')? {
                        XmlScannerState::Reference
                    } else {
                        XmlScannerState::Content
                    };
                    again = true;
                }
                XmlScannerState::StartOfMarkup => {
                    self.markup_depth += 1;
                    if self.scanner.scanner().skip_char('!')? {
                        if self.scanner.scanner().skip_char('-')? {
                            if !self.scanner.scanner().skip_char('-')? {
                                self.scanner
                                    .fatal_error(XmlScanErrors::XmlErrInvalidCommentStart, &[])?;
                            }
                            self.state = XmlScannerState::Comment;
                            again = true;
                        } else if self.scanner.scanner().skip_string("DOCTYPE")? {
                            self.state = XmlScannerState::Doctype;
                            again = true;
                        } else {
                            self.markup_not_recognized_in_prolog()?;
                        }
                    } else if self.scanner.scanner().peek_char()?.is_xml_name_start_char() {
                        self.state = XmlScannerState::RootElement;
                        self.dispatcher = XmlDispatcher::Content;
                        return Ok(true);
                    } else if self.scanner.scanner().skip_char('?')? {
                        self.state = XmlScannerState::Pi;
                        again = true;
                    } else {
                        self.markup_not_recognized_in_prolog()?;
                    }
                }
                XmlScannerState::Comment => {
                    self.scan_comment()?;
                    self.state = XmlScannerState::Prolog;
                }
                XmlScannerState::Pi => {
                    self.scan_pi()?;
                    self.state = XmlScannerState::Prolog;
                }
                XmlScannerState::Doctype => {
                    if self.scanner.config.disallow_doctype {
                        self.scanner
                            .fatal_error(XmlScanErrors::XmlErrDoctypeNotAllowed, &[])?;
                    }
                    if self.seen_doctype {
                        self.scanner
                            .fatal_error(XmlScanErrors::XmlErrAlreadySeenDoctype, &[])?;
                    }
                    self.seen_doctype = true;

                    if self.scan_doctype_decl()? {
                        self.state = XmlScannerState::DtdInternalDecls;
                        self.dispatcher = XmlDispatcher::Dtd;
                        return Ok(true);
                    }
                    let standalone = self.scanner.standalone;
                    if self.doctype_system_id.is_some() {
                        self.is_entity_declared_vc = !standalone;
                        if self.read_external_subset() {
                            self.state = XmlScannerState::DtdExternal;
                            self.dispatcher = XmlDispatcher::Dtd;
                            return Ok(true);
                        }
                    } else if let Some(source) = self.external_subset_source.take() {
                        self.is_entity_declared_vc = !standalone;
                        if self.read_external_subset() {
                            self.dtd_scanner
                                .set_input_source(&mut self.scanner, Some(source))?;
                            self.state = XmlScannerState::DtdExternalDecls;
                            self.dispatcher = XmlDispatcher::Dtd;
                            return Ok(true);
                        }
                    }
                    // a DOCTYPE without subsets
                    self.dtd_scanner.set_input_source(&mut self.scanner, None)?;
                    self.state = XmlScannerState::Prolog;
                }
                XmlScannerState::Content => {
                    self.scanner
                        .fatal_error(XmlScanErrors::XmlErrContentIllegalInProlog, &[])?;
                    self.scanner.scanner().scan_char()?;
                    self.state = XmlScannerState::Prolog;
                }
                XmlScannerState::Reference => {
                    self.scanner
                        .fatal_error(XmlScanErrors::XmlErrReferenceIllegalInProlog, &[])?;
                    self.state = XmlScannerState::Prolog;
                }
                _ => self.state = XmlScannerState::Prolog,
            }
            if !(complete || again) {
                return Ok(true);
            }
        }
    }

    fn markup_not_recognized_in_prolog(&mut self) -> Result<(), XmlScanError> {
        self.scanner
            .fatal_error(XmlScanErrors::XmlErrMarkupNotRecognizedInProlog, &[])?;
        self.markup_depth = self.markup_depth.saturating_sub(1);
        self.state = XmlScannerState::Prolog;
        Ok(())
    }

    /// Scan a document type declaration, `<!DOCTYPE` having been consumed.
    ///
    /// Returns whether an internal subset follows.
    ///
    /// ```text
    /// [28] doctypedecl ::= '<!DOCTYPE' S Name (S ExternalID)? S?
    ///                      ('[' intSubset ']' S?)? '>'
    /// ```
    fn scan_doctype_decl(&mut self) -> Result<bool, XmlScanError> {
        if !self.scanner.scanner().skip_spaces()? {
            self.scanner.fatal_error(
                XmlScanErrors::XmlErrSpaceRequiredBeforeRootElementTypeInDoctypeDecl,
                &[],
            )?;
        }
        self.doctype_name = self
            .scanner
            .scanner()
            .scan_name()?
            .map(|name| name.to_string());
        if self.doctype_name.is_none() {
            self.scanner
                .fatal_error(XmlScanErrors::XmlErrRootElementTypeRequired, &[])?;
        }

        if self.scanner.scanner().skip_spaces()? {
            let id = self.scanner.scan_external_id(false)?;
            self.doctype_public_id = id.public_id;
            self.doctype_system_id = id.system_id;
            self.scanner.scanner().skip_spaces()?;
        }
        self.has_external_dtd = self.doctype_system_id.is_some();

        if !self.has_external_dtd {
            if let Some(resolver) = self.external_subset_resolver.as_deref_mut() {
                let base = self.scanner.em.expanded_system_id();
                self.external_subset_source = resolver
                    .get_external_subset(self.doctype_name.as_deref().unwrap_or_default(), base);
                self.has_external_dtd = self.external_subset_source.is_some();
            }
        }

        let name = self.doctype_name.as_deref().unwrap_or_default();
        match self.external_subset_source.as_ref() {
            Some(source) => notify!(
                self,
                doctype_decl(name, source.public_id.as_deref(), source.system_id.as_deref())
            ),
            None => notify!(
                self,
                doctype_decl(
                    name,
                    self.doctype_public_id.as_deref(),
                    self.doctype_system_id.as_deref()
                )
            ),
        }

        if self.scanner.scanner().skip_char('[')? {
            return Ok(true);
        }
        self.scanner.scanner().skip_spaces()?;
        if !self.scanner.scanner().skip_char('>')? {
            self.scanner.fatal_error(
                XmlScanErrors::XmlErrDoctypedeclUnterminated,
                &[self.doctype_name.as_deref().unwrap_or_default()],
            )?;
        }
        self.markup_depth = self.markup_depth.saturating_sub(1);
        Ok(false)
    }

    fn dispatch_dtd(&mut self, complete: bool) -> Result<bool, XmlScanError> {
        loop {
            let mut again = false;
            match self.state {
                XmlScannerState::DtdInternalDecls => {
                    let standalone = self.scanner.standalone;
                    let read_external = self.read_external_subset();
                    let has_external = self.has_external_dtd && read_external;
                    let more = self.dtd_scanner.scan_internal_subset(
                        &mut self.scanner,
                        true,
                        standalone,
                        has_external,
                    )?;
                    if !more {
                        self.end_internal_subset()?;
                        let next = if self.doctype_system_id.is_some() {
                            self.is_entity_declared_vc = !standalone;
                            read_external.then_some(XmlScannerState::DtdExternal)
                        } else if let Some(source) = self.external_subset_source.take() {
                            self.is_entity_declared_vc = !standalone;
                            if read_external {
                                self.dtd_scanner
                                    .set_input_source(&mut self.scanner, Some(source))?;
                                Some(XmlScannerState::DtdExternalDecls)
                            } else {
                                None
                            }
                        } else {
                            self.is_entity_declared_vc =
                                self.dtd_scanner.has_pe_references() && !standalone;
                            None
                        };
                        match next {
                            Some(state) => self.state = state,
                            None => return Ok(self.leave_dtd()),
                        }
                    }
                }
                XmlScannerState::DtdExternal => {
                    let identifier = XmlResourceIdentifier::new(
                        self.doctype_public_id.as_deref(),
                        self.doctype_system_id.as_deref(),
                        None,
                        None,
                    );
                    let source = self.scanner.em.resolve_entity(&identifier)?;
                    self.dtd_scanner
                        .set_input_source(&mut self.scanner, Some(source))?;
                    self.state = XmlScannerState::DtdExternalDecls;
                    again = true;
                }
                XmlScannerState::DtdExternalDecls => {
                    if !self
                        .dtd_scanner
                        .scan_external_subset(&mut self.scanner, true)?
                    {
                        return Ok(self.leave_dtd());
                    }
                }
                _ => return Ok(self.leave_dtd()),
            }
            if !(complete || again) {
                return Ok(true);
            }
        }
    }

    fn leave_dtd(&mut self) -> bool {
        self.state = XmlScannerState::Prolog;
        self.dispatcher = XmlDispatcher::Prolog;
        true
    }

    /// Scan the end of a document type declaration after its internal
    /// subset.
    fn end_internal_subset(&mut self) -> Result<(), XmlScanError> {
        self.drain_entity_events()?;
        if !self.scanner.scanner().skip_char(']')? {
            self.scanner.fatal_error(
                XmlScanErrors::XmlErrExpectedSquareBracketToCloseInternalSubset,
                &[],
            )?;
        }
        self.scanner.scanner().skip_spaces()?;
        if !self.scanner.scanner().skip_char('>')? {
            self.scanner.fatal_error(
                XmlScanErrors::XmlErrDoctypedeclUnterminated,
                &[self.doctype_name.as_deref().unwrap_or_default()],
            )?;
        }
        self.markup_depth = self.markup_depth.saturating_sub(1);
        Ok(())
    }

    /// Scan the start tag of the root element.
    ///
    /// A document without a DOCTYPE may get its external subset from the
    /// external subset resolver, given the name of the root element. The
    /// subset is read before the start tag is reported.
    ///
    /// Returns whether the root element is empty.
    pub(crate) fn scan_root_element(&mut self) -> Result<bool, XmlScanError> {
        let resolve = self.external_subset_resolver.is_some()
            && !self.seen_doctype
            && !self.scanner.config.disallow_doctype
            && self.read_external_subset();
        if !resolve {
            return self.scan_start_element();
        }
        self.scan_start_element_name()?;
        self.resolve_external_subset_and_read()?;
        self.scan_start_element_after_name()
    }

    fn resolve_external_subset_and_read(&mut self) -> Result<(), XmlScanError> {
        let root = self.element_qname.rawname().to_owned();
        let base = self.scanner.em.expanded_system_id();
        let Some(source) = self
            .external_subset_resolver
            .as_deref_mut()
            .and_then(|resolver| resolver.get_external_subset(&root, base))
        else {
            return Ok(());
        };

        self.doctype_public_id = source.public_id.clone();
        self.doctype_system_id = source.system_id.clone();
        notify!(
            self,
            doctype_decl(
                &root,
                self.doctype_public_id.as_deref(),
                self.doctype_system_id.as_deref()
            )
        );
        self.doctype_name = Some(root);

        self.dtd_scanner
            .set_input_source(&mut self.scanner, Some(source))?;
        while self
            .dtd_scanner
            .scan_external_subset(&mut self.scanner, true)?
        {}
        Ok(())
    }

    /// The depth of the open elements is back to zero after the end tag of
    /// the root element.
    ///
    /// Returns whether control passes to another dispatcher.
    pub(crate) fn element_depth_is_zero(&mut self) -> bool {
        if self.fragment {
            return false;
        }
        self.state = XmlScannerState::TrailingMisc;
        self.dispatcher = XmlDispatcher::TrailingMisc;
        true
    }

    fn dispatch_trailing_misc(&mut self, complete: bool) -> Result<bool, XmlScanError> {
        loop {
            let mut again = false;
            self.drain_entity_events()?;
            match self.state {
                XmlScannerState::TrailingMisc => {
                    self.scanner.scanner().skip_spaces()?;
                    self.state = if self.scanner.scanner().skip_char('<')? {
                        XmlScannerState::StartOfMarkup
                    } else if self.scanner.scanner().skip_char('&')? {
                        XmlScannerState::Reference
                    } else {
                        XmlScannerState::Content
                    };
                    again = true;
                }
                XmlScannerState::StartOfMarkup => {
                    self.markup_depth += 1;
                    if self.scanner.scanner().skip_char('?')? {
                        self.state = XmlScannerState::Pi;
                        again = true;
                    } else if self.scanner.scanner().skip_char('!')? {
                        self.state = XmlScannerState::Comment;
                        again = true;
                    } else if self.scanner.scanner().skip_char('/')? {
                        // a stray end tag: skip it
                        self.scanner
                            .fatal_error(XmlScanErrors::XmlErrMarkupNotRecognizedInMisc, &[])?;
                        self.scanner.scanner().scan_name()?;
                        self.scanner.scanner().skip_spaces()?;
                        self.scanner.scanner().skip_char('>')?;
                        self.markup_depth = self.markup_depth.saturating_sub(1);
                        self.state = XmlScannerState::TrailingMisc;
                    } else if self.scanner.scanner().peek_char()?.is_xml_name_start_char() {
                        // a second root element is scanned like the first one
                        self.scanner
                            .fatal_error(XmlScanErrors::XmlErrMarkupNotRecognizedInMisc, &[])?;
                        if self.scan_start_element()? {
                            self.state = XmlScannerState::TrailingMisc;
                        } else {
                            self.state = XmlScannerState::Content;
                            self.dispatcher = XmlDispatcher::Content;
                            return Ok(true);
                        }
                    } else {
                        self.scanner
                            .fatal_error(XmlScanErrors::XmlErrMarkupNotRecognizedInMisc, &[])?;
                        self.markup_depth = self.markup_depth.saturating_sub(1);
                        self.state = XmlScannerState::TrailingMisc;
                    }
                }
                XmlScannerState::Pi => {
                    self.scan_pi()?;
                    self.state = XmlScannerState::TrailingMisc;
                }
                XmlScannerState::Comment => {
                    if !self.scanner.scanner().skip_string("--")? {
                        self.scanner
                            .fatal_error(XmlScanErrors::XmlErrInvalidCommentStart, &[])?;
                    }
                    self.scan_comment()?;
                    self.state = XmlScannerState::TrailingMisc;
                }
                XmlScannerState::Content => {
                    // the end of the document is reached here
                    self.scanner.scanner().peek_char()?;
                    self.scanner
                        .fatal_error(XmlScanErrors::XmlErrContentIllegalInTrailingMisc, &[])?;
                    self.scanner.scanner().scan_char()?;
                    self.state = XmlScannerState::TrailingMisc;
                }
                XmlScannerState::Reference => {
                    self.scanner
                        .fatal_error(XmlScanErrors::XmlErrReferenceIllegalInTrailingMisc, &[])?;
                    self.state = XmlScannerState::TrailingMisc;
                }
                XmlScannerState::Terminated => return Ok(false),
                _ => self.state = XmlScannerState::TrailingMisc,
            }
            if !(complete || again) {
                return Ok(true);
            }
        }
    }
}

impl Default for XmlDocumentScanner {
    fn default() -> Self {
        Self::new(XmlScanConfig::default())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::{cell::RefCell, rc::Rc};

    use crate::parser::{XmlString, scanner::tests::Collect};

    use super::*;

    #[derive(Clone, Default)]
    pub(crate) struct Events(pub Rc<RefCell<Vec<String>>>);

    impl Events {
        fn push(&self, event: String) {
            self.0.borrow_mut().push(event);
        }
    }

    impl XmlDocumentHandler for Events {
        fn start_document(&mut self, encoding: Option<&str>) {
            self.push(format!("startDocument({})", encoding.unwrap_or("")));
        }
        fn xml_decl(&mut self, version: Option<&str>, encoding: Option<&str>, standalone: Option<&str>) {
            self.push(format!(
                "xmlDecl({},{},{})",
                version.unwrap_or(""),
                encoding.unwrap_or(""),
                standalone.unwrap_or("")
            ));
        }
        fn text_decl(&mut self, version: Option<&str>, encoding: Option<&str>) {
            self.push(format!("textDecl({},{})", version.unwrap_or(""), encoding.unwrap_or("")));
        }
        fn doctype_decl(&mut self, root: &str, public_id: Option<&str>, system_id: Option<&str>) {
            self.push(format!(
                "doctype({root},{},{})",
                public_id.unwrap_or(""),
                system_id.unwrap_or("")
            ));
        }
        fn start_general_entity(
            &mut self,
            name: &str,
            _: Option<&XmlResourceIdentifier>,
            _: Option<&str>,
        ) {
            self.push(format!("startEntity({name})"));
        }
        fn end_general_entity(&mut self, name: &str) {
            self.push(format!("endEntity({name})"));
        }
        fn comment(&mut self, text: XmlString<'_>) {
            self.push(format!("comment({text})"));
        }
        fn processing_instruction(&mut self, target: &str, data: XmlString<'_>) {
            self.push(format!("pi({target},{data})"));
        }
        fn start_element(&mut self, element: &QName, attributes: &XmlAttributes) {
            let attrs = attributes
                .iter()
                .map(|attr| format!(" {}={}", attr.name.rawname(), attr.value))
                .collect::<String>();
            self.push(format!("start({}{attrs})", element.rawname()));
        }
        fn empty_element(&mut self, element: &QName, _: &XmlAttributes) {
            self.push(format!("empty({})", element.rawname()));
        }
        fn end_element(&mut self, element: &QName) {
            self.push(format!("end({})", element.rawname()));
        }
        fn characters(&mut self, text: XmlString<'_>) {
            // adjacent runs are merged so that tests do not depend on
            // buffer boundaries
            let mut events = self.0.borrow_mut();
            if let Some(last) = events.last_mut().filter(|e| e.starts_with("chars(")) {
                last.pop();
                last.push_str(&text.to_string());
                last.push(')');
            } else {
                events.push(format!("chars({text})"));
            }
        }
        fn start_cdata(&mut self) {
            self.push("startCDATA".to_owned());
        }
        fn end_cdata(&mut self) {
            self.push("endCDATA".to_owned());
        }
        fn end_document(&mut self) {
            self.push("endDocument".to_owned());
        }
    }

    pub(crate) fn scan_with(
        text: &str,
        config: XmlScanConfig,
        fragment: bool,
    ) -> (Vec<String>, Vec<String>, Result<bool, XmlScanError>) {
        let mut scanner = if fragment {
            XmlDocumentScanner::new_fragment(config)
        } else {
            XmlDocumentScanner::new(config)
        };
        let events = Events::default();
        let errors = Collect::default();
        scanner.set_document_handler(Some(Box::new(events.clone())));
        scanner.set_error_handler(Some(Box::new(errors.clone())));
        scanner
            .set_input_source(XmlInputSource::from_string(Some("doc.xml"), text))
            .unwrap();
        let res = scanner.scan_document(true);
        let events = events.0.borrow().clone();
        let errors = errors.0.borrow().clone();
        (events, errors, res)
    }

    fn scan(text: &str) -> (Vec<String>, Vec<String>) {
        let (events, errors, res) = scan_with(text, XmlScanConfig::default(), false);
        assert!(!res.unwrap());
        (events, errors)
    }

    fn recovering() -> XmlScanConfig {
        XmlScanConfig {
            continue_after_fatal_error: true,
            ..Default::default()
        }
    }

    #[test]
    fn prolog_and_trailing_misc() {
        let (events, errors) = scan(
            "<?xml version='1.0' standalone='yes'?>\n<!--c--><?p d?>\n<r/>\n<!--t-->\n",
        );
        assert!(errors.is_empty());
        assert_eq!(
            events,
            vec![
                "startDocument()",
                "xmlDecl(1.0,,yes)",
                "comment(c)",
                "pi(p,d)",
                "empty(r)",
                "comment(t)",
                "endDocument"
            ]
        );
    }

    #[test]
    fn xml_prefixed_target_is_a_pi() {
        let (events, errors) = scan("<?xml-stylesheet href='a'?><r/>");
        assert!(errors.is_empty());
        assert_eq!(events[1], "pi(xml-stylesheet,href='a')");
    }

    #[test]
    fn doctype_with_internal_subset() {
        let (events, errors) = scan(
            "<!DOCTYPE r [<!ENTITY e 'v'>]><r>&e;</r>",
        );
        assert!(errors.is_empty());
        assert_eq!(
            events,
            vec![
                "startDocument()",
                "doctype(r,,)",
                "start(r)",
                "startEntity(e)",
                "chars(v)",
                "endEntity(e)",
                "end(r)",
                "endDocument"
            ]
        );
    }

    #[test]
    fn doctype_rules() {
        let config = XmlScanConfig {
            disallow_doctype: true,
            ..recovering()
        };
        let (_, errors, _) = scan_with("<!DOCTYPE r><!DOCTYPE r><r/>", config, false);
        assert_eq!(
            errors,
            vec!["F:DoctypeNotAllowed", "F:DoctypeNotAllowed", "F:AlreadySeenDoctype"]
        );
    }

    #[test]
    fn content_in_prolog() {
        let (_, errors, res) = scan_with("x&<r/>", recovering(), false);
        assert!(!res.unwrap());
        assert_eq!(
            errors,
            vec!["F:ContentIllegalInProlog", "F:ReferenceIllegalInProlog"]
        );
    }

    #[test]
    fn trailing_content() {
        let (events, errors, _) = scan_with("<r/>x<s>y</s>", recovering(), false);
        assert_eq!(
            errors,
            vec!["F:ContentIllegalInTrailingMisc", "F:MarkupNotRecognizedInMisc"]
        );
        assert!(events.contains(&"start(s)".to_owned()));
        assert_eq!(events.last().map(|e| e.as_str()), Some("endDocument"));
    }

    #[test]
    fn premature_end() {
        let (events, errors, res) = scan_with("<r><a>", recovering(), false);
        assert!(!res.unwrap());
        assert_eq!(errors, vec!["F:PrematureEOF"]);
        assert_eq!(events.last().map(|e| e.as_str()), Some("endDocument"));

        let (_, errors, _) = scan_with("", recovering(), false);
        assert_eq!(errors, vec!["F:PrematureEOF"]);

        let (_, _, res) = scan_with("<r>", XmlScanConfig::default(), false);
        assert!(res.unwrap_err().is_fatal());
    }

    #[test]
    fn stepwise_dispatch() {
        let mut scanner = XmlDocumentScanner::default();
        let events = Events::default();
        scanner.set_document_handler(Some(Box::new(events.clone())));
        scanner
            .set_input_source(XmlInputSource::from_string(None, "<r>a<b/>c</r>"))
            .unwrap();
        let mut steps = 0;
        while scanner.dispatch(false).unwrap() {
            steps += 1;
            assert!(steps < 100);
        }
        assert_eq!(scanner.state(), XmlScannerState::Terminated);
        assert_eq!(
            *events.0.borrow(),
            vec![
                "startDocument()",
                "start(r)",
                "chars(a)",
                "empty(b)",
                "chars(c)",
                "end(r)",
                "endDocument"
            ]
        );
    }

    struct Subset;

    impl XmlExternalSubsetResolver for Subset {
        fn get_external_subset(
            &mut self,
            root_name: &str,
            _: Option<&str>,
        ) -> Option<XmlInputSource> {
            let subset = format!("<!ENTITY e 'from {root_name}'>");
            Some(XmlInputSource::from_string(Some("subset.dtd"), subset))
        }
    }

    #[test]
    fn external_subset_without_doctype() {
        let mut scanner = XmlDocumentScanner::default();
        let events = Events::default();
        scanner.set_document_handler(Some(Box::new(events.clone())));
        scanner.set_external_subset_resolver(Some(Box::new(Subset)));
        scanner
            .set_input_source(XmlInputSource::from_string(None, "<r>&e;</r>"))
            .unwrap();
        assert!(!scanner.scan_document(true).unwrap());
        assert_eq!(
            *events.0.borrow(),
            vec![
                "startDocument()",
                "doctype(r,,subset.dtd)",
                "start(r)",
                "startEntity(e)",
                "chars(from r)",
                "endEntity(e)",
                "end(r)",
                "endDocument"
            ]
        );
    }

    #[test]
    fn open_detects_the_version() {
        let mut scanner = XmlDocumentScanner::default();
        let events = Events::default();
        scanner.set_document_handler(Some(Box::new(events.clone())));
        let source = XmlInputSource::from_bytes(Some("doc.xml"), "<?xml version='1.0'?><r/>");
        assert!(scanner.open(source).unwrap());
        assert!(!scanner.scan_document(true).unwrap());
        assert_eq!(
            *events.0.borrow(),
            vec![
                "startDocument(UTF-8)",
                "xmlDecl(1.0,,)",
                "empty(r)",
                "endDocument"
            ]
        );
    }
}
