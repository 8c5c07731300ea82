//! Scanning of the DTD.
//!
//! Only entity declarations matter to a scanner that does not validate:
//! they decide what entity references in the document expand to. The
//! [`XmlEntityDeclScanner`] registers `<!ENTITY>` declarations with the
//! entity manager, expands parameter entity references at the declaration
//! level and steps over every other kind of markup declaration.

use crate::{
    chvalid::XmlCharValid,
    error::{XmlErrorLevel, XmlScanError, XmlScanErrors},
    io::XmlInputSource,
};

use super::{
    XmlEntityEvent, XmlStringBuffer,
    entity::{XML_DTD_ENTITY, is_pseudo_entity},
    scanner::XmlScanner,
};

/// A scanner of the internal and external subsets of the DTD.
///
/// The document scanner hands its [`XmlScanner`] to every call, so that
/// the subsets are read through the same entity manager as the document.
pub trait XmlDtdScanner {
    /// Forget the DTD of the previous document.
    fn reset(&mut self);

    /// Set the source of the external subset.
    ///
    /// `None` announces a document type declaration without any subset.
    fn set_input_source(
        &mut self,
        ctx: &mut XmlScanner,
        source: Option<XmlInputSource>,
    ) -> Result<(), XmlScanError>;

    /// Scan the internal subset, `[` having been consumed.
    ///
    /// Returns `true` while there is more to scan, and `false` in front of
    /// the `]` that closes the subset.
    fn scan_internal_subset(
        &mut self,
        ctx: &mut XmlScanner,
        complete: bool,
        standalone: bool,
        has_external_subset: bool,
    ) -> Result<bool, XmlScanError>;

    /// Scan the external subset set with
    /// [`set_input_source`](XmlDtdScanner::set_input_source).
    ///
    /// Returns `true` while there is more to scan.
    fn scan_external_subset(
        &mut self,
        ctx: &mut XmlScanner,
        complete: bool,
    ) -> Result<bool, XmlScanError>;

    /// Whether the internal subset referenced a parameter entity.
    fn has_pe_references(&self) -> bool;
}

/// The default [`XmlDtdScanner`].
pub struct XmlEntityDeclScanner {
    in_internal_subset: bool,
    standalone: bool,
    has_external_subset: bool,
    seen_pe_references: bool,
    /// The external subset ended.
    ended: bool,
    text_decl_pending: bool,
    /// The number of open `INCLUDE` sections.
    include_depth: usize,
    literal: XmlStringBuffer,
    text: XmlStringBuffer,
}

impl XmlEntityDeclScanner {
    pub fn new() -> Self {
        Self {
            in_internal_subset: false,
            standalone: false,
            has_external_subset: false,
            seen_pe_references: false,
            ended: false,
            text_decl_pending: false,
            include_depth: 0,
            literal: XmlStringBuffer::new(),
            text: XmlStringBuffer::new(),
        }
    }

    /// Take the boundaries of parameter entities and of the external
    /// subset off the queue of entity events.
    fn drain_events(&mut self, ctx: &mut XmlScanner) {
        while let Some(event) = ctx
            .em
            .next_entity_event_if(|event| is_dtd_event(event.name()))
        {
            if let XmlEntityEvent::End { name } = event {
                if name == XML_DTD_ENTITY {
                    self.ended = true;
                    ctx.em.end_external_subset();
                }
            }
        }
    }

    /// Whether the scanner is in the internal subset and outside every
    /// external parameter entity.
    fn scanning_internal_subset(&self, ctx: &XmlScanner) -> bool {
        self.in_internal_subset
            && !ctx
                .em
                .current_entity()
                .into_iter()
                .chain(ctx.em.entity_stack.iter())
                .any(|entity| entity.is_external() && !is_pseudo_entity(entity.name()))
    }

    /// Scan the text declaration that may start the external entity
    /// `name`.
    fn scan_text_decl(&mut self, ctx: &mut XmlScanner, name: &str) -> Result<(), XmlScanError> {
        ctx.scanner().peek_char()?;
        self.drain_events(ctx);
        if !ctx.em.current_entity().is_some_and(|entity| entity.name() == name) {
            // the entity is empty
            return Ok(());
        }
        if ctx.scanner().skip_string("<?xml")? {
            if ctx.scanner().peek_char()?.is_xml_name_char() {
                let target = ctx.scan_xml_prefixed_target()?;
                ctx.scan_pi_data(&target, &mut self.text)?;
            } else {
                let decl = ctx.scan_xml_decl_or_text_decl(true, &mut self.text)?;
                ctx.apply_declaration(&decl, true)?;
            }
        }
        if let Some(entity) = ctx.em.current_entity_mut() {
            entity.set_may_read_chunks(true);
        }
        Ok(())
    }

    /// Scan markup declarations, conditional sections, PIs, comments and
    /// parameter entity references.
    ///
    /// ```text
    /// [28b] intSubset  ::= (markupdecl | DeclSep)*
    /// [28a] DeclSep    ::= PEReference | S
    /// [31]  extSubsetDecl ::= ( markupdecl | conditionalSect | DeclSep)*
    /// ```
    fn scan_decls(&mut self, ctx: &mut XmlScanner, complete: bool) -> Result<bool, XmlScanError> {
        loop {
            ctx.scanner().skip_spaces()?;
            let c = ctx.scanner().peek_char()?;
            self.drain_events(ctx);
            if self.ended {
                if self.include_depth > 0 {
                    self.include_depth = 0;
                    ctx.fatal_error(XmlScanErrors::XmlErrIncludeSectUnterminated, &[])?;
                }
                return Ok(false);
            }

            if self.include_depth > 0 && ctx.scanner().skip_string("]]>")? {
                self.include_depth -= 1;
            } else if c == ']' && self.scanning_internal_subset(ctx) {
                return Ok(false);
            } else if ctx.scanner().skip_char('%')? {
                self.scan_pe_reference(ctx)?;
            } else if ctx.scanner().skip_string("<!")? {
                self.scan_markup_decl(ctx)?;
            } else if ctx.scanner().skip_string("<?")? {
                ctx.scan_pi(&mut self.text)?;
            } else {
                ctx.fatal_error(XmlScanErrors::XmlErrMarkupNotRecognizedInDTD, &[])?;
                ctx.scanner().scan_char()?;
            }
            if !complete {
                return Ok(true);
            }
        }
    }

    /// `<!` has been consumed.
    fn scan_markup_decl(&mut self, ctx: &mut XmlScanner) -> Result<(), XmlScanError> {
        if ctx.scanner().skip_string("ENTITY")? {
            self.scan_entity_decl(ctx)
        } else if ctx.scanner().skip_string("ELEMENT")?
            || ctx.scanner().skip_string("ATTLIST")?
            || ctx.scanner().skip_string("NOTATION")?
        {
            self.skip_decl(ctx)
        } else if ctx.scanner().skip_string("--")? {
            ctx.scan_comment(&mut self.text)
        } else if ctx.scanner().skip_char('[')? {
            self.scan_conditional_section(ctx)
        } else {
            ctx.fatal_error(XmlScanErrors::XmlErrMarkupNotRecognizedInDTD, &[])?;
            self.skip_decl(ctx)
        }
    }

    /// Step over a declaration up to its closing `>`.
    fn skip_decl(&mut self, ctx: &mut XmlScanner) -> Result<(), XmlScanError> {
        let mut quote = None;
        loop {
            if !self.peek_in_subset(ctx)? {
                return ctx.fatal_error(XmlScanErrors::XmlErrMarkupNotRecognizedInDTD, &[]);
            }
            let c = ctx.scanner().scan_char()?;
            match quote {
                Some(q) if c == q => quote = None,
                Some(_) => {}
                None if c == '\'' || c == '"' => quote = Some(c),
                None if c == '>' => return Ok(()),
                None => {}
            }
        }
    }

    /// Make sure the next character is in the DTD, so that it can be
    /// consumed. Returns `false` once the external subset has ended.
    fn peek_in_subset(&mut self, ctx: &mut XmlScanner) -> Result<bool, XmlScanError> {
        ctx.scanner().peek_char()?;
        self.drain_events(ctx);
        Ok(!self.ended)
    }

    /// `<![` has been consumed.
    ///
    /// ```text
    /// [62] includeSect ::= '<![' S? 'INCLUDE' S? '[' extSubsetDecl ']]>'
    /// [63] ignoreSect  ::= '<![' S? 'IGNORE' S? '[' ignoreSectContents* ']]>'
    /// ```
    fn scan_conditional_section(&mut self, ctx: &mut XmlScanner) -> Result<(), XmlScanError> {
        if self.scanning_internal_subset(ctx) {
            ctx.fatal_error(XmlScanErrors::XmlErrConditionalSectionInInternalSubset, &[])?;
        }
        self.skip_separator(ctx, false)?;
        let include = if ctx.scanner().skip_string("INCLUDE")? {
            true
        } else if ctx.scanner().skip_string("IGNORE")? {
            false
        } else {
            return ctx.fatal_error(XmlScanErrors::XmlErrMarkupNotRecognizedInDTD, &[]);
        };
        self.skip_separator(ctx, false)?;
        if !ctx.scanner().skip_char('[')? {
            ctx.fatal_error(XmlScanErrors::XmlErrMarkupNotRecognizedInDTD, &[])?;
        }
        if include {
            self.include_depth += 1;
            return Ok(());
        }

        let mut depth = 1;
        loop {
            if !self.peek_in_subset(ctx)? {
                return ctx.fatal_error(XmlScanErrors::XmlErrIgnoreSectUnterminated, &[]);
            }
            let c = ctx.scanner().scan_char()?;
            if c == '<' && ctx.scanner().skip_string("![")? {
                depth += 1;
            } else if c == ']' && ctx.scanner().skip_string("]>")? {
                depth -= 1;
                if depth == 0 {
                    return Ok(());
                }
            }
        }
    }

    /// Skip spaces and, outside the internal subset, parameter entity
    /// references.
    ///
    /// Returns whether a separator was found, or `true` if none is
    /// `required`. Crossing an entity boundary counts as a separator.
    fn skip_separator(&mut self, ctx: &mut XmlScanner, required: bool) -> Result<bool, XmlScanError> {
        let depth = ctx.em.entity_depth();
        let saw_space = ctx.scanner().skip_spaces()?;
        self.drain_events(ctx);
        if self.ended || self.scanning_internal_subset(ctx) || !ctx.scanner().skip_char('%')? {
            return Ok(!required || saw_space || depth != ctx.em.entity_depth());
        }
        loop {
            self.scan_pe_reference(ctx)?;
            ctx.scanner().skip_spaces()?;
            self.drain_events(ctx);
            if self.ended || !ctx.scanner().skip_char('%')? {
                return Ok(true);
            }
        }
    }

    /// Scan a parameter entity reference, `%` having been consumed, and
    /// start the entity.
    ///
    /// ```text
    /// [69] PEReference ::= '%' Name ';'
    /// ```
    fn scan_pe_reference(&mut self, ctx: &mut XmlScanner) -> Result<(), XmlScanError> {
        let Some(name) = ctx.scanner().scan_name()? else {
            return ctx.fatal_error(XmlScanErrors::XmlErrNameRequiredInPEReference, &[]);
        };
        if !ctx.scanner().skip_char(';')? {
            return ctx.fatal_error(XmlScanErrors::XmlErrSemicolonRequiredInPEReference, &[&name]);
        }
        self.start_pe(ctx, &name, false)
    }

    fn start_pe(&mut self, ctx: &mut XmlScanner, name: &str, literal: bool) -> Result<(), XmlScanError> {
        let pe_name = format!("%{name}");
        if !ctx.em.is_declared_entity(&pe_name) {
            if self.standalone || !(self.has_external_subset || self.seen_pe_references) {
                ctx.fatal_error(XmlScanErrors::XmlErrEntityNotDeclared, &[name])?;
            } else if ctx.em.validation() {
                ctx.em.report(
                    XmlErrorLevel::XmlErrError,
                    XmlScanErrors::XmlErrEntityNotDeclared,
                    &[name],
                )?;
            }
        }
        if self.in_internal_subset {
            self.seen_pe_references = true;
        }

        let depth = ctx.em.entity_depth();
        ctx.em.start_entity(&pe_name, literal)?;
        self.drain_events(ctx);
        let external = ctx
            .em
            .current_entity()
            .is_some_and(|entity| entity.name() == pe_name && entity.is_external());
        if ctx.em.entity_depth() > depth && external {
            self.scan_text_decl(ctx, &pe_name)?;
        }
        Ok(())
    }

    /// Scan an entity declaration, `<!ENTITY` having been consumed, and
    /// register the entity.
    ///
    /// ```text
    /// [70] EntityDecl ::= GEDecl | PEDecl
    /// [71] GEDecl     ::= '<!ENTITY' S Name S EntityDef S? '>'
    /// [72] PEDecl     ::= '<!ENTITY' S '%' S Name S PEDef S? '>'
    /// [73] EntityDef  ::= EntityValue | (ExternalID NDataDecl?)
    /// [74] PEDef      ::= EntityValue | ExternalID
    /// [76] NDataDecl  ::= S 'NDATA' S Name
    /// ```
    fn scan_entity_decl(&mut self, ctx: &mut XmlScanner) -> Result<(), XmlScanError> {
        let internal = self.scanning_internal_subset(ctx);
        let mut is_pe = false;
        let mut saw_pe_ref = false;
        if ctx.scanner().skip_spaces()? {
            if ctx.scanner().skip_char('%')? {
                if self.skip_separator(ctx, true)? {
                    is_pe = true;
                } else if internal {
                    ctx.fatal_error(
                        XmlScanErrors::XmlErrSpaceRequiredBeforeEntityNameInEntityDecl,
                        &[],
                    )?;
                    is_pe = true;
                } else {
                    saw_pe_ref = true;
                }
            }
        } else if internal || !ctx.scanner().skip_char('%')? {
            ctx.fatal_error(
                XmlScanErrors::XmlErrSpaceRequiredBeforeEntityNameInEntityDecl,
                &[],
            )?;
        } else if ctx.scanner().skip_spaces()? {
            ctx.fatal_error(XmlScanErrors::XmlErrSpaceRequiredBeforePercentInPEDecl, &[])?;
        } else {
            saw_pe_ref = true;
        }

        // `<!ENTITY %pe;` names the entity through a parameter entity
        while saw_pe_ref {
            self.scan_pe_reference(ctx)?;
            ctx.scanner().skip_spaces()?;
            self.drain_events(ctx);
            if !ctx.scanner().skip_char('%')? {
                break;
            }
            if !is_pe {
                if self.skip_separator(ctx, true)? {
                    is_pe = true;
                    break;
                }
                is_pe = ctx.scanner().skip_char('%')?;
            }
        }

        let name = ctx.scanner().scan_name()?;
        if name.is_none() {
            ctx.fatal_error(XmlScanErrors::XmlErrEntityNameRequiredInEntityDecl, &[])?;
        }
        let name_arg = name.as_deref().unwrap_or_default();
        if !self.skip_separator(ctx, true)? {
            ctx.fatal_error(
                XmlScanErrors::XmlErrSpaceRequiredAfterEntityNameInEntityDecl,
                &[name_arg],
            )?;
        }

        let id = ctx.scan_external_id(false)?;
        let saw_space = self.skip_separator(ctx, true)?;
        let mut notation = None;
        if !is_pe && ctx.scanner().skip_string("NDATA")? {
            if !saw_space {
                ctx.fatal_error(
                    XmlScanErrors::XmlErrSpaceRequiredBeforeNDATAInUnparsedEntityDecl,
                    &[name_arg],
                )?;
            }
            if !self.skip_separator(ctx, true)? {
                ctx.fatal_error(
                    XmlScanErrors::XmlErrSpaceRequiredBeforeNotationNameInUnparsedEntityDecl,
                    &[name_arg],
                )?;
            }
            notation = ctx.scanner().scan_name()?;
            if notation.is_none() {
                ctx.fatal_error(
                    XmlScanErrors::XmlErrNotationNameRequiredForUnparsedEntityDecl,
                    &[name_arg],
                )?;
            }
        }

        let mut param_entity_refs = 0;
        if id.system_id.is_none() {
            param_entity_refs = self.scan_entity_value(ctx, name_arg)?;
            if self.ended {
                return Ok(());
            }
        }
        self.skip_separator(ctx, false)?;
        if !ctx.scanner().skip_char('>')? {
            ctx.fatal_error(XmlScanErrors::XmlErrEntityDeclUnterminated, &[name_arg])?;
        }

        let Some(name) = name else {
            return Ok(());
        };
        let name = if is_pe {
            format!("%{name}")
        } else {
            name.to_string()
        };
        let base = ctx.em.expanded_system_id().map(str::to_owned);
        match (id.system_id, notation) {
            (Some(system_id), Some(notation)) => ctx.em.add_unparsed_entity(
                &name,
                id.public_id.as_deref(),
                &system_id,
                base.as_deref(),
                &notation,
            ),
            (Some(system_id), None) => ctx.em.add_external_entity(
                &name,
                id.public_id.as_deref(),
                &system_id,
                base.as_deref(),
            ),
            (None, _) => {
                let value = self.literal.to_string();
                ctx.em.add_internal_entity(&name, &value, param_entity_refs)
            }
        }
    }

    /// Scan the value of an internal entity into `self.literal`.
    ///
    /// Character references are replaced, general entity references are
    /// kept as written and parameter entity references are expanded.
    /// Returns the number of parameter entity references the value makes,
    /// directly or through the entities it references.
    ///
    /// ```text
    /// [9] EntityValue ::= '"' ([^%&"] | PEReference | Reference)* '"'
    ///                   | "'" ([^%&'] | PEReference | Reference)* "'"
    /// ```
    fn scan_entity_value(&mut self, ctx: &mut XmlScanner, name: &str) -> Result<usize, XmlScanError> {
        self.literal.clear();
        let quote = ctx.scanner().peek_char()?;
        if quote != '\'' && quote != '"' {
            ctx.fatal_error(XmlScanErrors::XmlErrOpenQuoteMissingInDecl, &[name])?;
            return Ok(0);
        }
        ctx.scanner().scan_char()?;

        let depth = ctx.em.entity_depth();
        let mut param_entity_refs = 0;
        loop {
            let (text, _) = ctx.em.scanner().scan_literal(quote)?;
            self.literal.append(text);
            let c = ctx.scanner().peek_char()?;
            self.drain_events(ctx);
            if self.ended {
                return ctx
                    .fatal_error(XmlScanErrors::XmlErrCloseQuoteMissingInDecl, &[name])
                    .map(|()| 0);
            }
            if c == quote && ctx.em.entity_depth() == depth {
                break;
            }
            match c {
                '&' => {
                    ctx.scanner().scan_char()?;
                    if ctx.scanner().skip_char('#')? {
                        ctx.scan_char_reference_value(&mut self.literal, None)?;
                    } else {
                        self.scan_bypassed_reference(ctx)?;
                    }
                }
                '%' => {
                    ctx.scanner().scan_char()?;
                    param_entity_refs += self.scan_pe_in_entity_value(ctx)?;
                }
                c if ctx.is_invalid_literal(c) => {
                    ctx.fatal_error(
                        XmlScanErrors::XmlErrInvalidCharInEntityValue,
                        &[&format!("{:x}", c as u32)],
                    )?;
                    ctx.scanner().scan_char()?;
                }
                _ => {
                    let c = ctx.scanner().scan_char()?;
                    self.literal.append_char(c);
                }
            }
        }
        ctx.char_ref_literal = None;
        if !ctx.scanner().skip_char(quote)? {
            ctx.fatal_error(XmlScanErrors::XmlErrCloseQuoteMissingInDecl, &[name])?;
        }
        Ok(param_entity_refs)
    }

    /// Keep a general entity reference in an entity value as written.
    fn scan_bypassed_reference(&mut self, ctx: &mut XmlScanner) -> Result<(), XmlScanError> {
        self.literal.append_char('&');
        let name = ctx.scanner().scan_name()?;
        match name.as_deref() {
            Some(name) => self.literal.append_str(name),
            None => ctx.fatal_error(XmlScanErrors::XmlErrNameRequiredInReference, &[])?,
        }
        if ctx.scanner().skip_char(';')? {
            self.literal.append_char(';');
        } else {
            ctx.fatal_error(
                XmlScanErrors::XmlErrSemicolonRequiredInReference,
                &[name.as_deref().unwrap_or_default()],
            )?;
        }
        Ok(())
    }

    /// Expand a parameter entity reference in an entity value, `%` having
    /// been consumed. Returns the number of references it makes.
    fn scan_pe_in_entity_value(&mut self, ctx: &mut XmlScanner) -> Result<usize, XmlScanError> {
        let Some(name) = ctx.scanner().scan_name()? else {
            ctx.fatal_error(XmlScanErrors::XmlErrNameRequiredInPEReference, &[])?;
            return Ok(0);
        };
        if !ctx.scanner().skip_char(';')? {
            ctx.fatal_error(XmlScanErrors::XmlErrSemicolonRequiredInPEReference, &[&name])?;
        } else if self.scanning_internal_subset(ctx) {
            ctx.fatal_error(XmlScanErrors::XmlErrPEReferenceWithinMarkup, &[&name])?;
        }
        let refs = 1 + ctx.em.param_entity_ref_count(&format!("%{name}"));
        self.start_pe(ctx, &name, true)?;
        Ok(refs)
    }
}

impl Default for XmlEntityDeclScanner {
    fn default() -> Self {
        Self::new()
    }
}

/// Entities whose boundaries matter to the DTD scanner.
fn is_dtd_event(name: &str) -> bool {
    name == XML_DTD_ENTITY || name.starts_with('%')
}

impl XmlDtdScanner for XmlEntityDeclScanner {
    fn reset(&mut self) {
        self.in_internal_subset = false;
        self.standalone = false;
        self.has_external_subset = false;
        self.seen_pe_references = false;
        self.ended = false;
        self.text_decl_pending = false;
        self.include_depth = 0;
        self.literal.clear();
        self.text.clear();
    }

    fn set_input_source(
        &mut self,
        ctx: &mut XmlScanner,
        source: Option<XmlInputSource>,
    ) -> Result<(), XmlScanError> {
        let Some(source) = source else {
            return Ok(());
        };
        ctx.em.start_external_subset();
        ctx.em.start_dtd_entity(source)?;
        self.drain_events(ctx);
        self.ended = false;
        self.text_decl_pending = true;
        Ok(())
    }

    fn scan_internal_subset(
        &mut self,
        ctx: &mut XmlScanner,
        complete: bool,
        standalone: bool,
        has_external_subset: bool,
    ) -> Result<bool, XmlScanError> {
        self.in_internal_subset = true;
        self.standalone = standalone;
        self.has_external_subset = has_external_subset;
        let more = self.scan_decls(ctx, complete)?;
        if !more {
            self.in_internal_subset = false;
        }
        Ok(more)
    }

    fn scan_external_subset(
        &mut self,
        ctx: &mut XmlScanner,
        complete: bool,
    ) -> Result<bool, XmlScanError> {
        self.in_internal_subset = false;
        self.standalone = ctx.standalone;
        if self.text_decl_pending {
            self.text_decl_pending = false;
            self.scan_text_decl(ctx, XML_DTD_ENTITY)?;
        }
        if self.ended {
            return Ok(false);
        }
        self.scan_decls(ctx, complete)
    }

    fn has_pe_references(&self) -> bool {
        self.seen_pe_references
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::HashMap, io};

    use crate::{
        config::XmlScanConfig,
        io::{XmlEntityResolver, XmlResourceIdentifier},
        parser::{XmlDocumentScanner, XmlEntity, document::tests::Events, scanner::tests::Collect},
    };

    use super::*;

    #[derive(Default)]
    struct Files(HashMap<&'static str, &'static str>);

    impl XmlEntityResolver for Files {
        fn resolve_entity(
            &mut self,
            identifier: &XmlResourceIdentifier,
        ) -> io::Result<Option<XmlInputSource>> {
            let text = identifier
                .literal_system_id
                .as_deref()
                .and_then(|id| self.0.get(id));
            Ok(text.map(|text| {
                XmlInputSource::from_string(identifier.literal_system_id.as_deref(), *text)
            }))
        }
    }

    struct Scanned {
        scanner: XmlDocumentScanner,
        events: Vec<String>,
        errors: Vec<String>,
    }

    fn scan_files(doc: &str, files: &[(&'static str, &'static str)], config: XmlScanConfig) -> Scanned {
        let mut scanner = XmlDocumentScanner::new(config);
        let events = Events::default();
        let errors = Collect::default();
        scanner.set_document_handler(Some(Box::new(events.clone())));
        scanner.set_error_handler(Some(Box::new(errors.clone())));
        scanner.set_entity_resolver(Some(Box::new(Files(files.iter().copied().collect()))));
        scanner
            .set_input_source(XmlInputSource::from_string(Some("doc.xml"), doc))
            .unwrap();
        let _ = scanner.scan_document(true);
        let events = events.0.borrow().clone();
        let errors = errors.0.borrow().clone();
        Scanned {
            scanner,
            events,
            errors,
        }
    }

    fn recovering() -> XmlScanConfig {
        XmlScanConfig {
            continue_after_fatal_error: true,
            ..Default::default()
        }
    }

    fn internal_text<'a>(scanned: &'a Scanned, name: &str) -> Option<&'a str> {
        match scanned.scanner.entity_manager().get_entity(name)? {
            XmlEntity::Internal { text, .. } => Some(text.as_str()),
            _ => None,
        }
    }

    #[test]
    fn entity_declarations() {
        let scanned = scan_files(
            concat!(
                "<!DOCTYPE r [\n",
                "<!ELEMENT r (#PCDATA)>\n",
                "<!ATTLIST r a CDATA '>'>\n",
                "<!-- <!ENTITY no 'x'> -->\n",
                "<?pi <!ENTITY no 'x'>?>\n",
                "<!ENTITY g 'a&#65;&amp;&h;'>\n",
                "<!ENTITY g 'again'>\n",
                "<!ENTITY % p \"<!ENTITY q 'from p'>\">\n",
                "%p;\n",
                "<!ENTITY x SYSTEM 'x.ent'>\n",
                "<!NOTATION n SYSTEM 'n'>\n",
                "<!ENTITY u PUBLIC '-//u' 'u.bin' NDATA n>\n",
                "]><r/>"
            ),
            &[],
            XmlScanConfig::default(),
        );
        assert!(scanned.errors.is_empty(), "{:?}", scanned.errors);
        assert_eq!(internal_text(&scanned, "g"), Some("aA&amp;&h;"));
        assert_eq!(internal_text(&scanned, "q"), Some("from p"));
        assert!(internal_text(&scanned, "%p").is_some());
        let em = scanned.scanner.entity_manager();
        assert!(!em.is_declared_entity("no"));
        assert!(em.is_external_entity("x"));
        assert!(em.is_unparsed_entity("u"));
    }

    #[test]
    fn parameter_entity_reference_counts() {
        let scanned = scan_files(
            concat!(
                "<!DOCTYPE r SYSTEM 'r.dtd'>",
                "<r/>"
            ),
            &[(
                "r.dtd",
                "<!ENTITY % a 'x'><!ENTITY % b '%a;%a;'><!ENTITY % c '%b;%a;'>",
            )],
            XmlScanConfig::default(),
        );
        assert!(scanned.errors.is_empty(), "{:?}", scanned.errors);
        let em = scanned.scanner.entity_manager();
        assert_eq!(em.param_entity_ref_count("%a"), 0);
        assert_eq!(em.param_entity_ref_count("%b"), 2);
        assert_eq!(em.param_entity_ref_count("%c"), 4);
        assert_eq!(internal_text(&scanned, "%c"), Some("xxx"));
    }

    #[test]
    fn external_subset_and_conditional_sections() {
        let scanned = scan_files(
            "<!DOCTYPE r SYSTEM 'r.dtd' [<!ENTITY a 'internal'>]><r>&a;&b;&c;</r>",
            &[(
                "r.dtd",
                concat!(
                    "<?xml version='1.0' encoding='UTF-8'?>\n",
                    "<!ENTITY a 'external'>\n",
                    "<!ENTITY % on 'INCLUDE'>\n",
                    "<![%on;[ <!ENTITY b 'included'> ]]>\n",
                    "<![IGNORE[ <!ENTITY c 'ignored'> <![INCLUDE[ ]]> ]]>\n",
                    "<!ENTITY c 'declared'>\n"
                ),
            )],
            XmlScanConfig::default(),
        );
        assert!(scanned.errors.is_empty(), "{:?}", scanned.errors);
        let text = scanned
            .events
            .iter()
            .filter_map(|event| event.strip_prefix("chars("))
            .collect::<Vec<_>>();
        assert_eq!(text, vec!["internal)", "included)", "declared)"]);
        assert!(scanned.scanner.entity_manager().is_entity_decl_in_external_subset("b"));
        assert!(!scanned.scanner.entity_manager().is_entity_decl_in_external_subset("a"));
    }

    #[test]
    fn external_parameter_entity_with_text_declaration() {
        let scanned = scan_files(
            "<!DOCTYPE r [<!ENTITY % ext SYSTEM 'ext.ent'> %ext;]><r>&e;</r>",
            &[(
                "ext.ent",
                "<?xml encoding='UTF-8'?><!ENTITY e 'from ext'>",
            )],
            XmlScanConfig::default(),
        );
        assert!(scanned.errors.is_empty(), "{:?}", scanned.errors);
        assert!(scanned.events.contains(&"chars(from ext)".to_owned()));
    }

    #[test]
    fn malformed_declarations() {
        let scanned = scan_files(
            concat!(
                "<!DOCTYPE r [",
                "<!ENTITYa 'x'>",
                "<!ENTITY b'x'>",
                "<!ENTITY c 'x'",
                "<!ENTITY d >",
                "<!ENTITY % p 'x'>",
                "<!ENTITY e '%p;'>",
                "<!BOGUS>",
                "<![INCLUDE[]]>",
                "]><r/>"
            ),
            &[],
            recovering(),
        );
        assert_eq!(
            scanned.errors,
            vec![
                "F:MSG_SPACE_REQUIRED_BEFORE_ENTITY_NAME_IN_ENTITYDECL",
                "F:MSG_SPACE_REQUIRED_AFTER_ENTITY_NAME_IN_ENTITYDECL",
                "F:EntityDeclUnterminated",
                "F:OpenQuoteMissingInDecl",
                "F:PEReferenceWithinMarkup",
                "F:MSG_MARKUP_NOT_RECOGNIZED_IN_DTD",
                "F:ConditionalSectionInInternalSubset",
            ]
        );
    }

    #[test]
    fn undeclared_parameter_entities() {
        let scanned = scan_files("<!DOCTYPE r [%missing;]><r/>", &[], recovering());
        assert_eq!(scanned.errors, vec!["F:EntityNotDeclared"]);

        // the external subset may declare it
        let scanned = scan_files(
            "<!DOCTYPE r SYSTEM 'r.dtd' [%missing;]><r/>",
            &[("r.dtd", "")],
            XmlScanConfig::default(),
        );
        assert!(scanned.errors.is_empty(), "{:?}", scanned.errors);
    }

    #[test]
    fn unterminated_sections() {
        let scanned = scan_files(
            "<!DOCTYPE r SYSTEM 'r.dtd'><r/>",
            &[("r.dtd", "<![INCLUDE[ <!ENTITY a 'x'>")],
            recovering(),
        );
        assert_eq!(scanned.errors, vec!["F:IncludeSectUnterminated"]);

        let scanned = scan_files(
            "<!DOCTYPE r SYSTEM 'r.dtd'><r/>",
            &[("r.dtd", "<![IGNORE[ <!ENTITY a 'x'>")],
            recovering(),
        );
        assert_eq!(scanned.errors, vec!["F:IgnoreSectUnterminated"]);
    }
}
