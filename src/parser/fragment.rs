//! The content dispatcher.
//!
//! Everything between the start tag of the root element and its end tag is
//! scanned here: elements, character data, references, CDATA sections,
//! comments and processing instructions. A fragment scanner runs the same
//! dispatcher over a whole external parsed entity, where reaching the end
//! of the input at markup depth zero is the normal way to finish.

use crate::{
    chvalid::XmlCharValid,
    error::{XmlErrorLevel, XmlScanError, XmlScanErrors},
    io::XmlResourceIdentifier,
};

use super::{
    QName, XmlDocumentScanner, XmlEntityEvent, XmlScannerState, XmlString,
    entity::{XML_DOCUMENT_ENTITY, XML_DTD_ENTITY, XML_FRAGMENT_ENTITY, is_pseudo_entity},
    scanner::builtin_entity,
};

/// Entities whose boundaries the DTD scanner takes care of.
fn is_dtd_entity(name: &str) -> bool {
    name == XML_DTD_ENTITY || name.starts_with('%')
}

/// Entities reported as the document itself.
fn is_document_entity(name: &str) -> bool {
    name == XML_DOCUMENT_ENTITY || name == XML_FRAGMENT_ENTITY
}

impl XmlDocumentScanner {
    /// Report the entity boundaries crossed since the last call.
    pub(crate) fn drain_entity_events(&mut self) -> Result<(), XmlScanError> {
        while let Some(event) = self.scanner.em.next_entity_event() {
            match event {
                XmlEntityEvent::Start { name, .. } | XmlEntityEvent::End { name }
                    if is_dtd_entity(&name) => {}
                XmlEntityEvent::Start {
                    name,
                    identifier,
                    encoding,
                    skipped,
                } => self.start_entity(&name, identifier.as_ref(), encoding.as_deref(), skipped)?,
                XmlEntityEvent::End { name } => self.end_entity(&name)?,
            }
        }
        Ok(())
    }

    fn start_entity(
        &mut self,
        name: &str,
        identifier: Option<&XmlResourceIdentifier>,
        encoding: Option<&str>,
        skipped: bool,
    ) -> Result<(), XmlScanError> {
        self.entity_depths.push(self.markup_depth);

        if self.scanner.standalone && self.scanner.em.is_entity_decl_in_external_subset(name) {
            self.scanner.fatal_error(
                XmlScanErrors::XmlErrReferenceToExternallyDeclaredEntityWhenStandalone,
                &[name],
            )?;
        }
        if is_document_entity(name) {
            notify!(self, start_document(encoding));
            return Ok(());
        }
        if !self.scanner.scanning_attribute {
            notify!(self, start_general_entity(name, identifier, encoding));
        }

        // an external parsed entity may start with a text declaration
        let external = self
            .scanner
            .em
            .current_entity()
            .is_some_and(|entity| entity.name() == name && entity.is_external());
        if !skipped && external {
            self.state = XmlScannerState::TextDecl;
        }
        Ok(())
    }

    fn end_entity(&mut self, name: &str) -> Result<(), XmlScanError> {
        // a bracket run cut by the end of an entity
        if self.in_scan_content && !self.content.is_empty() {
            notify!(self, characters(self.content.as_xml_string()));
            self.content.clear();
        }

        let depth = self.entity_depths.pop().unwrap_or_default();
        if is_document_entity(name) {
            notify!(self, end_document());
            return Ok(());
        }
        if !is_pseudo_entity(name) && self.markup_depth != depth {
            self.scanner
                .fatal_error(XmlScanErrors::XmlErrMarkupEntityMismatch, &[])?;
        }
        if !self.scanner.scanning_attribute {
            notify!(self, end_general_entity(name));
        }
        Ok(())
    }

    /// The markup depth at which the innermost open entity started.
    fn entity_start_depth(&self) -> usize {
        self.entity_depths.last().copied().unwrap_or_default()
    }

    /// Scan a comment, `<!--` having been consumed.
    pub(crate) fn scan_comment(&mut self) -> Result<(), XmlScanError> {
        self.scanner.scan_comment(&mut self.text)?;
        self.markup_depth = self.markup_depth.saturating_sub(1);
        notify!(self, comment(self.text.as_xml_string()));
        Ok(())
    }

    /// Scan a processing instruction, `<?` having been consumed.
    pub(crate) fn scan_pi(&mut self) -> Result<(), XmlScanError> {
        let target = self.scanner.scan_pi(&mut self.text)?;
        self.end_pi(target.as_deref().unwrap_or_default())
    }

    /// Report a processing instruction whose data is in `self.text`.
    pub(crate) fn end_pi(&mut self, target: &str) -> Result<(), XmlScanError> {
        self.markup_depth = self.markup_depth.saturating_sub(1);
        notify!(self, processing_instruction(target, self.text.as_xml_string()));
        Ok(())
    }

    /// Scan a start tag, `<` having been consumed.
    ///
    /// Returns whether the element is empty.
    ///
    /// ```text
    /// [40] STag         ::= '<' Name (S Attribute)* S? '>'
    /// [44] EmptyElemTag ::= '<' Name (S Attribute)* S? '/>'
    /// ```
    pub(crate) fn scan_start_element(&mut self) -> Result<bool, XmlScanError> {
        self.scan_start_element_name()?;
        self.scan_start_element_after_name()
    }

    /// Scan the element name of a start tag and the spaces after it.
    pub(crate) fn scan_start_element_name(&mut self) -> Result<(), XmlScanError> {
        let found = if self.scanner.config.namespaces {
            self.scanner.em.scanner().scan_qname(&mut self.element_qname)?
        } else {
            let name = self.scanner.scanner().scan_name()?;
            let found = name.is_some();
            self.element_qname = QName::new(None, name.clone(), name, None);
            found
        };
        if !found {
            self.element_qname.clear();
        }
        self.saw_space = self.scanner.scanner().skip_spaces()?;
        Ok(())
    }

    /// Scan the attributes and the end of a start tag whose name has been
    /// scanned, and report the element.
    pub(crate) fn scan_start_element_after_name(&mut self) -> Result<bool, XmlScanError> {
        let rawname = self.element_qname.rawname().to_owned();
        self.elements.push(self.element_qname.clone());
        self.attributes.remove_all();

        let empty = loop {
            let c = self.scanner.scanner().peek_char()?;
            if c == '>' {
                self.scanner.scanner().scan_char()?;
                break false;
            }
            if c == '/' {
                self.scanner.scanner().scan_char()?;
                if !self.scanner.scanner().skip_char('>')? {
                    self.scanner
                        .fatal_error(XmlScanErrors::XmlErrElementUnterminated, &[&rawname])?;
                }
                break true;
            }
            if !c.is_xml_name_start_char() || !self.saw_space {
                self.scanner
                    .fatal_error(XmlScanErrors::XmlErrElementUnterminated, &[&rawname])?;
            }
            self.scan_attribute(&rawname)?;
            self.saw_space = self.scanner.scanner().skip_spaces()?;
        };

        if empty {
            self.markup_depth = self.markup_depth.saturating_sub(1);
            if self.markup_depth < self.entity_start_depth() {
                self.scanner
                    .fatal_error(XmlScanErrors::XmlErrElementEntityMismatch, &[&rawname])?;
            }
            notify!(self, empty_element(&self.element_qname, &self.attributes));
            self.elements.pop();
        } else {
            notify!(self, start_element(&self.element_qname, &self.attributes));
        }
        Ok(empty)
    }

    /// ```text
    /// [41] Attribute ::= Name Eq AttValue
    /// ```
    fn scan_attribute(&mut self, ele_name: &str) -> Result<(), XmlScanError> {
        let found = if self.scanner.config.namespaces {
            self.scanner.em.scanner().scan_qname(&mut self.attribute_qname)?
        } else {
            let name = self.scanner.scanner().scan_name()?;
            let found = name.is_some();
            self.attribute_qname = QName::new(None, name.clone(), name, None);
            found
        };
        if !found {
            self.attribute_qname.clear();
        }
        let att_name = self.attribute_qname.rawname().to_owned();

        self.scanner.scanner().skip_spaces()?;
        if !self.scanner.scanner().skip_char('=')? {
            self.scanner.fatal_error(
                XmlScanErrors::XmlErrEqRequiredInAttribute,
                &[ele_name, &att_name],
            )?;
        }
        self.scanner.scanner().skip_spaces()?;

        let len = self.attributes.len();
        let cdata = self.scanner.em.symbol_table().add_symbol("CDATA");
        let index = self
            .attributes
            .add_attribute(&self.attribute_qname, cdata, "");
        if self.attributes.len() == len {
            self.scanner.fatal_error(
                XmlScanErrors::XmlErrAttributeNotUnique,
                &[ele_name, &att_name],
            )?;
        }

        let unchanged = self.scanner.scan_attribute_value(
            &mut self.value,
            &mut self.raw,
            &att_name,
            self.is_entity_declared_vc,
            ele_name,
        )?;
        self.attributes.set_value(index, &self.value.to_string());
        if !unchanged {
            self.attributes
                .set_non_normalized_value(index, Some(&self.raw.to_string()));
        }
        self.attributes.set_specified(index, true);
        Ok(())
    }

    /// Scan an end tag, `</` having been consumed.
    ///
    /// Returns whether the markup depth is back to zero.
    ///
    /// ```text
    /// [42] ETag ::= '</' Name S? '>'
    /// ```
    fn scan_end_element(&mut self) -> Result<bool, XmlScanError> {
        let Some(element) = self.elements.pop() else {
            // only a fragment reaches an end tag with nothing open
            let name = self.scanner.scanner().scan_name()?;
            self.scanner.fatal_error(
                XmlScanErrors::XmlErrETagWithoutStartTag,
                &[name.as_deref().unwrap_or_default()],
            )?;
            self.scanner.scanner().skip_spaces()?;
            self.scanner.scanner().skip_char('>')?;
            self.markup_depth = self.markup_depth.saturating_sub(1);
            return Ok(false);
        };

        let rawname = element.rawname();
        if !self.scanner.scanner().skip_string(rawname)? {
            self.scanner
                .fatal_error(XmlScanErrors::XmlErrETagRequired, &[rawname])?;
        }
        self.scanner.scanner().skip_spaces()?;
        if !self.scanner.scanner().skip_char('>')? {
            self.scanner
                .fatal_error(XmlScanErrors::XmlErrETagUnterminated, &[rawname])?;
        }

        self.markup_depth = self.markup_depth.saturating_sub(2);
        if self.markup_depth < self.entity_start_depth() {
            self.scanner
                .fatal_error(XmlScanErrors::XmlErrElementEntityMismatch, &[rawname])?;
        }
        notify!(self, end_element(&element));
        Ok(self.markup_depth == 0)
    }

    /// Scan a CDATA section, `<![CDATA[` having been consumed.
    ///
    /// ```text
    /// [18] CDSect  ::= CDStart CData CDEnd
    /// [20] CData   ::= (Char* - (Char* ']]>' Char*))
    /// ```
    fn scan_cdata_section(&mut self) -> Result<(), XmlScanError> {
        notify!(self, start_cdata());
        loop {
            self.text.clear();
            if self.scanner.scanner().scan_data("]]", &mut self.text)? {
                if !self.text.is_empty() {
                    notify!(self, characters(self.text.as_xml_string()));
                }
                let c = self.scanner.scanner().peek_char()?;
                if self.scanner.is_invalid_literal(c) {
                    self.scanner.fatal_error(
                        XmlScanErrors::XmlErrInvalidCharInCDSect,
                        &[&format!("{:x}", c as u32)],
                    )?;
                    self.scanner.scanner().scan_char()?;
                }
                continue;
            }

            if !self.text.is_empty() {
                notify!(self, characters(self.text.as_xml_string()));
            }
            self.text.clear();
            while self.scanner.scanner().skip_char(']')? {
                self.text.append_char(']');
            }
            if !self.text.is_empty() {
                notify!(self, characters(self.text.as_xml_string()));
            }
            if self.scanner.scanner().skip_char('>')? {
                break;
            }
            self.text.clear();
            self.text.append_str("]]");
            notify!(self, characters(self.text.as_xml_string()));
        }
        self.markup_depth = self.markup_depth.saturating_sub(1);
        notify!(self, end_cdata());
        Ok(())
    }

    /// Scan a character reference, `&#` having been consumed.
    fn scan_char_reference(&mut self) -> Result<(), XmlScanError> {
        self.value.clear();
        let c = self
            .scanner
            .scan_char_reference_value(&mut self.value, None)?;
        self.markup_depth = self.markup_depth.saturating_sub(1);
        let literal = self.scanner.char_ref_literal.take();
        if c.is_none() {
            return Ok(());
        }
        if let Some(literal) = literal.as_deref() {
            notify!(self, start_general_entity(literal, None, None));
        }
        notify!(self, characters(self.value.as_xml_string()));
        if let Some(literal) = literal.as_deref() {
            notify!(self, end_general_entity(literal));
        }
        Ok(())
    }

    /// Scan an entity reference, `&` having been consumed, and start the
    /// entity it names.
    ///
    /// ```text
    /// [68] EntityRef ::= '&' Name ';'
    /// ```
    fn scan_entity_reference(&mut self) -> Result<(), XmlScanError> {
        let Some(symbol) = self.scanner.scanner().scan_name()? else {
            self.markup_depth = self.markup_depth.saturating_sub(1);
            return self
                .scanner
                .fatal_error(XmlScanErrors::XmlErrNameRequiredInReference, &[]);
        };
        let name: &str = &symbol;
        if !self.scanner.scanner().skip_char(';')? {
            self.scanner
                .fatal_error(XmlScanErrors::XmlErrSemicolonRequiredInReference, &[name])?;
        }
        self.markup_depth = self.markup_depth.saturating_sub(1);

        if let Some(c) = builtin_entity(name) {
            self.handle_character(c, name);
            return Ok(());
        }
        if self.scanner.em.is_unparsed_entity(name) {
            return self
                .scanner
                .fatal_error(XmlScanErrors::XmlErrReferenceToUnparsedEntity, &[name]);
        }
        if !self.scanner.em.is_declared_entity(name) {
            if !self.is_entity_declared_vc {
                self.scanner
                    .fatal_error(XmlScanErrors::XmlErrEntityNotDeclared, &[name])?;
            } else if self.scanner.config.validation {
                self.scanner.em.report(
                    XmlErrorLevel::XmlErrError,
                    XmlScanErrors::XmlErrEntityNotDeclared,
                    &[name],
                )?;
            }
        }
        self.scanner.em.start_entity(name, false)
    }

    /// Report the character a predefined entity stands for.
    fn handle_character(&mut self, c: char, entity: &str) {
        let notify_refs = self.scanner.config.notify_builtin_refs;
        if notify_refs {
            notify!(self, start_general_entity(entity, None, None));
        }
        let chars = [c];
        notify!(self, characters(XmlString::new(&chars)));
        if notify_refs {
            notify!(self, end_general_entity(entity));
        }
    }

    /// Scan character data and report it.
    ///
    /// Returns the character that stopped the scan, if it still needs to
    /// be looked at.
    fn scan_content(&mut self) -> Result<Option<char>, XmlScanError> {
        // boundaries are reported before the data that follows them
        self.scanner.scanner().peek_char()?;
        self.drain_entity_events()?;

        let (text, mut next) = self.scanner.em.scanner().scan_content()?;
        let empty = text.is_empty();
        if next == Some('\r') {
            // from a character reference expanded in an internal entity
            self.content.clear();
            self.content.append(text);
            self.scanner.scanner().scan_char()?;
            self.content.append_char('\r');
            notify!(self, characters(self.content.as_xml_string()));
            self.content.clear();
            return Ok(None);
        }
        if !empty {
            notify!(self, characters(text));
        }

        if next == Some(']') && empty {
            self.content.clear();
            self.in_scan_content = true;
            let c = self.scanner.scanner().scan_char()?;
            self.content.append_char(c);
            if self.scanner.scanner().skip_char(']')? {
                self.content.append_char(']');
                while self.scanner.scanner().skip_char(']')? {
                    self.content.append_char(']');
                }
                if self.scanner.scanner().skip_char('>')? {
                    self.scanner
                        .fatal_error(XmlScanErrors::XmlErrCDEndInContent, &[])?;
                }
            }
            self.drain_entity_events()?;
            if !self.content.is_empty() {
                notify!(self, characters(self.content.as_xml_string()));
                self.content.clear();
            }
            self.in_scan_content = false;
            next = None;
        }
        Ok(next)
    }

    /// Scan character data until markup or a reference starts.
    fn scan_content_loop(&mut self, complete: bool) -> Result<(), XmlScanError> {
        loop {
            match self.scan_content()? {
                Some('<') => {
                    self.scanner.scanner().scan_char()?;
                    self.state = XmlScannerState::StartOfMarkup;
                    return Ok(());
                }
                Some('&') => {
                    self.scanner.scanner().scan_char()?;
                    self.state = XmlScannerState::Reference;
                    return Ok(());
                }
                Some(c) if self.scanner.is_invalid_literal(c) => {
                    self.scanner.fatal_error(
                        XmlScanErrors::XmlErrInvalidCharInContent,
                        &[&format!("{:x}", c as u32)],
                    )?;
                    self.scanner.scanner().scan_char()?;
                }
                _ => {}
            }
            if !complete {
                return Ok(());
            }
        }
    }

    fn markup_not_recognized_in_content(&mut self) -> Result<(), XmlScanError> {
        self.markup_depth = self.markup_depth.saturating_sub(1);
        self.state = XmlScannerState::Content;
        self.scanner
            .fatal_error(XmlScanErrors::XmlErrMarkupNotRecognizedInContent, &[])
    }

    /// Run the content dispatcher.
    ///
    /// Returns `true` when there is more to scan.
    pub(crate) fn dispatch_content(&mut self, complete: bool) -> Result<bool, XmlScanError> {
        loop {
            let mut again = false;
            self.drain_entity_events()?;
            match self.state {
                XmlScannerState::Content => {
                    if self.scanner.scanner().skip_char('<')? {
                        self.state = XmlScannerState::StartOfMarkup;
                        again = true;
                    } else if self.scanner.scanner().skip_char('&')? {
                        self.state = XmlScannerState::Reference;
                        again = true;
                    } else {
                        self.scan_content_loop(complete)?;
                    }
                }
                XmlScannerState::StartOfMarkup => {
                    self.markup_depth += 1;
                    if self.scanner.scanner().skip_char('/')? {
                        if self.scan_end_element()? && self.element_depth_is_zero() {
                            return Ok(true);
                        }
                        self.state = XmlScannerState::Content;
                    } else if self.scanner.scanner().peek_char()?.is_xml_name_start_char() {
                        self.scan_start_element()?;
                        self.state = XmlScannerState::Content;
                    } else if self.scanner.scanner().skip_char('!')? {
                        if self.scanner.scanner().skip_char('-')? {
                            if !self.scanner.scanner().skip_char('-')? {
                                self.scanner
                                    .fatal_error(XmlScanErrors::XmlErrInvalidCommentStart, &[])?;
                            }
                            self.state = XmlScannerState::Comment;
                            again = true;
                        } else if self.scanner.scanner().skip_string("[CDATA[")? {
                            self.state = XmlScannerState::Cdata;
                            again = true;
                        } else if !self.fragment && self.scanner.scanner().skip_string("DOCTYPE")? {
                            self.state = XmlScannerState::Doctype;
                            again = true;
                        } else {
                            self.markup_not_recognized_in_content()?;
                        }
                    } else if self.scanner.scanner().skip_char('?')? {
                        self.state = XmlScannerState::Pi;
                        again = true;
                    } else {
                        self.markup_not_recognized_in_content()?;
                    }
                }
                XmlScannerState::Comment => {
                    self.scan_comment()?;
                    self.state = XmlScannerState::Content;
                }
                XmlScannerState::Pi => {
                    self.scan_pi()?;
                    self.state = XmlScannerState::Content;
                }
                XmlScannerState::Cdata => {
                    self.scan_cdata_section()?;
                    self.state = XmlScannerState::Content;
                }
                XmlScannerState::Reference => {
                    self.markup_depth += 1;
                    self.state = XmlScannerState::Content;
                    if self.scanner.scanner().skip_char('#')? {
                        self.scan_char_reference()?;
                    } else {
                        self.scan_entity_reference()?;
                    }
                }
                XmlScannerState::TextDecl => {
                    self.scan_xml_decl_start(true)?;
                    self.state = XmlScannerState::Content;
                }
                XmlScannerState::RootElement => {
                    if self.scan_root_element()? && self.element_depth_is_zero() {
                        return Ok(true);
                    }
                    self.state = XmlScannerState::Content;
                }
                XmlScannerState::Doctype => {
                    self.markup_depth = self.markup_depth.saturating_sub(1);
                    self.state = XmlScannerState::Content;
                    self.scanner
                        .fatal_error(XmlScanErrors::XmlErrDoctypeIllegalInContent, &[])?;
                }
                _ => self.state = XmlScannerState::Content,
            }
            if !(complete || again) {
                return Ok(true);
            }
        }
    }
}
