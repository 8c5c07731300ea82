use crate::error::{XmlScanError, XmlScanErrors};

use super::{XmlScanner, XmlStringBuffer};

/// The pseudo attributes of an XML or text declaration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlDeclaration {
    pub version: Option<String>,
    pub encoding: Option<String>,
    pub standalone: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DeclState {
    Version,
    Encoding,
    Standalone,
    Done,
}

macro_rules! decl_error {
    ($text_decl:expr, $in_text:ident, $in_xml:ident) => {
        if $text_decl {
            XmlScanErrors::$in_text
        } else {
            XmlScanErrors::$in_xml
        }
    };
}

impl XmlScanner {
    /// Scan an XML declaration or a text declaration. `<?xml` has already
    /// been consumed.
    ///
    /// ```text
    /// [23] XMLDecl      ::= '<?xml' VersionInfo EncodingDecl? SDDecl? S? '?>'
    /// [24] VersionInfo  ::= S 'version' Eq (' VersionNum ' | " VersionNum ")
    /// [80] EncodingDecl ::= S 'encoding' Eq ('"' EncName '"' |  "'" EncName "'" )
    /// [32] SDDecl       ::= S 'standalone' Eq (("'" ('yes' | 'no') "'")
    ///                       | ('"' ('yes' | 'no') '"'))
    /// [77] TextDecl     ::= '<?xml' VersionInfo? EncodingDecl S? '?>'
    /// ```
    pub(crate) fn scan_xml_decl_or_text_decl(
        &mut self,
        text_decl: bool,
        buffer: &mut XmlStringBuffer,
    ) -> Result<XmlDeclaration, XmlScanError> {
        let mut decl = XmlDeclaration::default();
        let mut state = DeclState::Version;
        let mut data_found = false;

        let mut saw_space = self.scanner().skip_decl_spaces()?;
        // references are not recognized in pseudo attribute values
        let literal = self.em.current_entity_mut().map(|entity| {
            let literal = entity.literal;
            entity.literal = false;
            literal
        });
        while self.scanner().peek_char()? != '?' {
            data_found = true;
            let name = self.scan_pseudo_attribute(text_decl, buffer)?;
            let value = buffer.to_string();
            match (state, name) {
                (DeclState::Version, Some("version")) => {
                    if !saw_space {
                        self.fatal_error(
                            decl_error!(
                                text_decl,
                                XmlErrSpaceRequiredBeforeVersionInTextDecl,
                                XmlErrSpaceRequiredBeforeVersionInXMLDecl
                            ),
                            &[],
                        )?;
                    }
                    state = DeclState::Encoding;
                    if !self.version_supported(&value) {
                        self.fatal_error(XmlScanErrors::XmlErrVersionNotSupported, &[&value])?;
                    }
                    decl.version = Some(value);
                }
                (DeclState::Version | DeclState::Encoding, Some("encoding")) => {
                    if state == DeclState::Version && !text_decl {
                        self.fatal_error(XmlScanErrors::XmlErrVersionInfoRequired, &[])?;
                    }
                    if !saw_space {
                        self.fatal_error(
                            decl_error!(
                                text_decl,
                                XmlErrSpaceRequiredBeforeEncodingInTextDecl,
                                XmlErrSpaceRequiredBeforeEncodingInXMLDecl
                            ),
                            &[],
                        )?;
                    }
                    decl.encoding = Some(value);
                    state = if text_decl {
                        DeclState::Done
                    } else {
                        DeclState::Standalone
                    };
                }
                (DeclState::Version, _) => {
                    self.fatal_error(
                        decl_error!(
                            text_decl,
                            XmlErrEncodingDeclRequired,
                            XmlErrVersionInfoRequired
                        ),
                        &[],
                    )?;
                }
                (DeclState::Encoding | DeclState::Standalone, Some("standalone"))
                    if !text_decl =>
                {
                    if !saw_space {
                        self.fatal_error(XmlScanErrors::XmlErrSpaceRequiredBeforeStandalone, &[])?;
                    }
                    state = DeclState::Done;
                    if value != "yes" && value != "no" {
                        self.fatal_error(XmlScanErrors::XmlErrSDDeclInvalid, &[&value])?;
                    }
                    decl.standalone = Some(value);
                }
                (DeclState::Encoding | DeclState::Standalone, _) => {
                    self.fatal_error(XmlScanErrors::XmlErrEncodingDeclRequired, &[])?;
                }
                (DeclState::Done, _) => {
                    self.fatal_error(XmlScanErrors::XmlErrNoMorePseudoAttributes, &[])?;
                }
            }
            saw_space = self.scanner().skip_decl_spaces()?;
        }
        if literal == Some(true) {
            if let Some(entity) = self.em.current_entity_mut() {
                entity.literal = true;
            }
        }

        if text_decl && state != DeclState::Done {
            self.fatal_error(XmlScanErrors::XmlErrMorePseudoAttributes, &[])?;
        }
        if text_decl {
            if !data_found && decl.encoding.is_none() {
                self.fatal_error(XmlScanErrors::XmlErrEncodingDeclRequired, &[])?;
            }
        } else if !data_found && decl.version.is_none() {
            self.fatal_error(XmlScanErrors::XmlErrVersionInfoRequired, &[])?;
        }

        if !self.scanner().skip_char('?')? {
            self.fatal_error(XmlScanErrors::XmlErrXMLDeclUnterminated, &[])?;
        }
        if !self.scanner().skip_char('>')? {
            self.fatal_error(XmlScanErrors::XmlErrXMLDeclUnterminated, &[])?;
        }
        Ok(decl)
    }

    /// Apply what an XML or text declaration declares to the current
    /// entity.
    ///
    /// The encoding is switched unless it was specified when the entity
    /// was opened.
    pub(crate) fn apply_declaration(
        &mut self,
        decl: &XmlDeclaration,
        text_decl: bool,
    ) -> Result<(), XmlScanError> {
        if !text_decl {
            self.standalone = decl.standalone.as_deref() == Some("yes");
        }
        if let Some(version) = decl.version.as_deref() {
            let version = if version == "1.1" { "1.1" } else { "1.0" };
            self.scanner().set_xml_version(version);
        }
        if let Some(encoding) = decl.encoding.as_deref() {
            let external = self
                .em
                .current_entity()
                .is_some_and(|entity| entity.is_encoding_externally_specified());
            if !external {
                self.scanner().set_encoding(encoding)?;
            }
        }
        Ok(())
    }

    /// Scan one pseudo attribute into `value`, returning its name.
    ///
    /// Only `version`, `encoding` and `standalone` are recognized; any
    /// other name is reported and `None` is returned in its place.
    pub(crate) fn scan_pseudo_attribute(
        &mut self,
        text_decl: bool,
        value: &mut XmlStringBuffer,
    ) -> Result<Option<&'static str>, XmlScanError> {
        let name = self.scan_pseudo_attribute_name()?;
        if name.is_none() {
            self.fatal_error(XmlScanErrors::XmlErrPseudoAttrNameExpected, &[])?;
        }
        let name_arg = name.unwrap_or_default();
        self.scanner().skip_decl_spaces()?;
        if !self.scanner().skip_char('=')? {
            self.fatal_error(
                decl_error!(
                    text_decl,
                    XmlErrEqRequiredInTextDecl,
                    XmlErrEqRequiredInXMLDecl
                ),
                &[name_arg],
            )?;
        }
        self.scanner().skip_decl_spaces()?;
        let quote = self.scanner().peek_char()?;
        if quote != '\'' && quote != '"' {
            self.fatal_error(
                decl_error!(
                    text_decl,
                    XmlErrQuoteRequiredInTextDecl,
                    XmlErrQuoteRequiredInXMLDecl
                ),
                &[name_arg],
            )?;
        }
        self.scanner().scan_char()?;

        value.clear();
        loop {
            let (text, next) = self.em.scanner().scan_literal(quote)?;
            value.append(text);
            match next {
                Some(c) if c == quote => break,
                Some(c @ ('&' | '%' | '<' | ']')) => {
                    self.scanner().scan_char()?;
                    value.append_char(c);
                }
                Some(c) if self.is_invalid_literal(c) => {
                    self.fatal_error(
                        decl_error!(
                            text_decl,
                            XmlErrInvalidCharInTextDecl,
                            XmlErrInvalidCharInXMLDecl
                        ),
                        &[&format!("{:x}", c as u32)],
                    )?;
                    self.scanner().scan_char()?;
                }
                _ => {}
            }
        }
        if !self.scanner().skip_char(quote)? {
            self.fatal_error(
                decl_error!(
                    text_decl,
                    XmlErrCloseQuoteMissingInTextDecl,
                    XmlErrCloseQuoteMissingInXMLDecl
                ),
                &[name_arg],
            )?;
        }
        Ok(name)
    }

    fn scan_pseudo_attribute_name(&mut self) -> Result<Option<&'static str>, XmlScanError> {
        let name = match self.scanner().peek_char()? {
            'v' => "version",
            'e' => "encoding",
            's' => "standalone",
            _ => return Ok(None),
        };
        Ok(self.scanner().skip_string(name)?.then_some(name))
    }
}
