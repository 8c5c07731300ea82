use crate::error::{XmlScanError, XmlScanErrors};

use super::{XmlScanner, XmlStringBuffer};

impl XmlScanner {
    /// Scan the value of a character reference. `&#` has already been
    /// consumed.
    ///
    /// The referenced character is appended to `buf`, and the reference
    /// text after `&#` to `raw`. Returns `None` if the reference does not
    /// denote a legal character.
    ///
    /// ```text
    /// [66] CharRef ::= '&#' [0-9]+ ';' | '&#x' [0-9a-fA-F]+ ';'
    /// ```
    pub(crate) fn scan_char_reference_value(
        &mut self,
        buf: &mut XmlStringBuffer,
        mut raw: Option<&mut XmlStringBuffer>,
    ) -> Result<Option<char>, XmlScanError> {
        let hex = self.scanner().skip_char('x')?;
        if hex {
            if let Some(raw) = raw.as_deref_mut() {
                raw.append_char('x');
            }
        }

        self.digits.clear();
        loop {
            let c = self.em.scanner().peek_char()?;
            let digit = if hex {
                c.is_ascii_hexdigit()
            } else {
                c.is_ascii_digit()
            };
            if !digit {
                break;
            }
            self.em.scanner().scan_char()?;
            self.digits.append_char(c);
            if let Some(raw) = raw.as_deref_mut() {
                raw.append_char(c);
            }
        }
        if self.digits.is_empty() {
            let code = if hex {
                XmlScanErrors::XmlErrHexdigitRequiredInCharRef
            } else {
                XmlScanErrors::XmlErrDigitRequiredInCharRef
            };
            self.fatal_error(code, &[])?;
        }

        if !self.scanner().skip_char(';')? {
            self.fatal_error(XmlScanErrors::XmlErrSemicolonRequiredInCharRef, &[])?;
        }
        if let Some(raw) = raw {
            raw.append_char(';');
        }

        let digits = self.digits.to_string();
        let parsed = u32::from_str_radix(&digits, if hex { 16 } else { 10 }).ok();
        let value = parsed
            .and_then(char::from_u32)
            .filter(|&c| !self.is_invalid(c));
        let literal = if hex {
            format!("x{digits}")
        } else {
            digits
        };
        match value {
            Some(c) => buf.append_char(c),
            None => self.fatal_error(XmlScanErrors::XmlErrInvalidCharRef, &[&literal])?,
        }
        if self.config.notify_char_refs && parsed.is_some() && !self.scanning_attribute {
            self.char_ref_literal = Some(format!("#{literal}"));
        }
        Ok(value)
    }
}
