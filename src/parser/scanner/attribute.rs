use crate::{
    error::{XmlErrorLevel, XmlScanError, XmlScanErrors},
    parser::{XmlEntityEvent, XmlString},
};

use super::{XmlScanner, XmlStringBuffer};

/// Append `text` to `value`, replacing control characters with spaces.
///
/// Returns whether anything was replaced.
fn append_normalized(value: &mut XmlStringBuffer, text: XmlString<'_>) -> bool {
    let mut replaced = false;
    for &c in text.as_slice() {
        if c < '\u{20}' {
            value.append_char(' ');
            replaced = true;
        } else {
            value.append_char(c);
        }
    }
    replaced
}

const BUILTIN_ENTITIES: [(&str, char); 5] = [
    ("amp", '&'),
    ("apos", '\''),
    ("lt", '<'),
    ("gt", '>'),
    ("quot", '"'),
];

/// The character a predefined entity stands for.
pub(crate) fn builtin_entity(name: &str) -> Option<char> {
    BUILTIN_ENTITIES
        .iter()
        .find(|(builtin, _)| *builtin == name)
        .map(|&(_, c)| c)
}

impl XmlScanner {
    /// Scan an attribute value, expanding references and normalizing white
    /// space. The scanner is positioned at the opening quote.
    ///
    /// `value` receives the normalized value, and `raw` the value as
    /// written, with references kept as written. With `check_entities`,
    /// references to undeclared entities are validity errors rather than
    /// fatal errors.
    ///
    /// Returns whether the value is unchanged by normalization.
    ///
    /// ```text
    /// [10] AttValue ::= '"' ([^<&"] | Reference)* '"'
    ///                 | "'" ([^<&'] | Reference)* "'"
    /// ```
    pub(crate) fn scan_attribute_value(
        &mut self,
        value: &mut XmlStringBuffer,
        raw: &mut XmlStringBuffer,
        att_name: &str,
        check_entities: bool,
        ele_name: &str,
    ) -> Result<bool, XmlScanError> {
        let quote = self.scanner().peek_char()?;
        if quote != '\'' && quote != '"' {
            self.fatal_error(XmlScanErrors::XmlErrOpenQuoteExpected, &[ele_name, att_name])?;
        }
        self.scanner().scan_char()?;
        let entity_depth = self.em.entity_depth();

        value.clear();
        raw.clear();
        let (text, mut next) = self.em.scanner().scan_literal(quote)?;
        raw.append(text);
        let replaced = append_normalized(value, text);
        if next == Some(quote) && !replaced {
            self.scan_close_quote(quote, att_name, ele_name)?;
            return Ok(true);
        }

        if next != Some(quote) {
            self.scanning_attribute = true;
            let res = self.scan_attribute_value_parts(
                value,
                raw,
                &mut next,
                quote,
                entity_depth,
                (att_name, check_entities, ele_name),
            );
            self.scanning_attribute = false;
            res?;
        }
        self.scan_close_quote(quote, att_name, ele_name)?;
        Ok(raw.as_slice() == value.as_slice())
    }

    fn scan_attribute_value_parts(
        &mut self,
        value: &mut XmlStringBuffer,
        raw: &mut XmlStringBuffer,
        next: &mut Option<char>,
        quote: char,
        entity_depth: usize,
        (att_name, check_entities, ele_name): (&str, bool, &str),
    ) -> Result<(), XmlScanError> {
        loop {
            let same_depth = entity_depth == self.em.entity_depth();
            match *next {
                Some('&') => {
                    self.scanner().skip_char('&')?;
                    if same_depth {
                        raw.append_char('&');
                    }
                    if self.scanner().skip_char('#')? {
                        if same_depth {
                            raw.append_char('#');
                        }
                        self.scan_char_reference_value(value, Some(&mut *raw))?;
                    } else {
                        self.scan_entity_reference_in_attribute(
                            value,
                            raw,
                            same_depth,
                            check_entities,
                        )?;
                    }
                }
                Some('<') => {
                    self.fatal_error(
                        XmlScanErrors::XmlErrLessthanInAttValue,
                        &[ele_name, att_name],
                    )?;
                    self.scanner().scan_char()?;
                    if same_depth {
                        raw.append_char('<');
                    }
                }
                Some(c @ ('%' | ']')) => {
                    self.scanner().scan_char()?;
                    value.append_char(c);
                    if same_depth {
                        raw.append_char(c);
                    }
                }
                Some('\n' | '\r') => {
                    self.scanner().scan_char()?;
                    value.append_char(' ');
                    if same_depth {
                        raw.append_char('\n');
                    }
                }
                Some(c) if self.is_invalid_literal(c) => {
                    self.fatal_error(
                        XmlScanErrors::XmlErrInvalidCharInAttValue,
                        &[ele_name, att_name, &format!("{:x}", c as u32)],
                    )?;
                    self.scanner().scan_char()?;
                    if same_depth {
                        raw.append_char(c);
                    }
                }
                _ => {}
            }

            let (text, c) = self.em.scanner().scan_literal(quote)?;
            self.string_buffer.clear();
            self.string_buffer.append(text);
            append_normalized(value, text);
            *next = c;
            self.drain_attribute_entity_events()?;
            let same_depth = entity_depth == self.em.entity_depth();
            if same_depth {
                raw.append_chars(self.string_buffer.as_slice());
            }
            if *next == Some(quote) && same_depth {
                return Ok(());
            }
        }
    }

    fn scan_entity_reference_in_attribute(
        &mut self,
        value: &mut XmlStringBuffer,
        raw: &mut XmlStringBuffer,
        same_depth: bool,
        check_entities: bool,
    ) -> Result<(), XmlScanError> {
        let name = self.scanner().scan_name()?;
        match name.as_deref() {
            Some(name) if same_depth => raw.append_str(name),
            Some(_) => {}
            None => self.fatal_error(XmlScanErrors::XmlErrNameRequiredInReference, &[])?,
        }
        let name = name.as_deref().unwrap_or_default();
        if !self.scanner().skip_char(';')? {
            self.fatal_error(XmlScanErrors::XmlErrSemicolonRequiredInReference, &[name])?;
        } else if same_depth {
            raw.append_char(';');
        }

        if let Some(c) = builtin_entity(name) {
            value.append_char(c);
        } else if self.em.is_external_entity(name) {
            self.fatal_error(XmlScanErrors::XmlErrReferenceToExternalEntity, &[name])?;
        } else {
            if !self.em.is_declared_entity(name) {
                if check_entities {
                    if self.config.validation {
                        self.em.report(
                            XmlErrorLevel::XmlErrError,
                            XmlScanErrors::XmlErrEntityNotDeclared,
                            &[name],
                        )?;
                    }
                } else {
                    self.fatal_error(XmlScanErrors::XmlErrEntityNotDeclared, &[name])?;
                }
            }
            self.em.start_entity(name, true)?;
            self.drain_attribute_entity_events()?;
        }
        Ok(())
    }

    fn scan_close_quote(
        &mut self,
        quote: char,
        att_name: &str,
        ele_name: &str,
    ) -> Result<(), XmlScanError> {
        if self.scanner().scan_char()? != quote {
            self.fatal_error(XmlScanErrors::XmlErrCloseQuoteExpected, &[ele_name, att_name])?;
        }
        Ok(())
    }

    /// Consume the entity events raised while an attribute value is scanned.
    ///
    /// Entities expanded in attribute values are not reported to the
    /// document handler, and they start and end within the value.
    pub(crate) fn drain_attribute_entity_events(&mut self) -> Result<(), XmlScanError> {
        while let Some(event) = self.em.next_entity_event() {
            if let XmlEntityEvent::Start {
                name,
                skipped: false,
                ..
            } = &event
            {
                if self.standalone && self.em.is_entity_decl_in_external_subset(name) {
                    self.fatal_error(
                        XmlScanErrors::XmlErrReferenceToExternallyDeclaredEntityWhenStandalone,
                        &[name],
                    )?;
                }
            }
        }
        Ok(())
    }
}
