use crate::{
    chvalid::XmlCharValid,
    error::{XmlScanError, XmlScanErrors},
};

use super::{XmlScanner, XmlStringBuffer};

/// The identifiers of an external identifier.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlExternalId {
    pub public_id: Option<String>,
    pub system_id: Option<String>,
}

impl XmlScanner {
    /// Scan an external identifier.
    ///
    /// With `optional_system_id`, a public identifier need not be followed
    /// by a system identifier, as in notation declarations.
    ///
    /// ```text
    /// [75] ExternalID    ::= 'SYSTEM' S SystemLiteral
    ///                      | 'PUBLIC' S PubidLiteral S SystemLiteral
    /// [11] SystemLiteral ::= ('"' [^"]* '"') | ("'" [^']* "'")
    /// ```
    pub(crate) fn scan_external_id(
        &mut self,
        optional_system_id: bool,
    ) -> Result<XmlExternalId, XmlScanError> {
        let mut id = XmlExternalId::default();
        let mut literal = std::mem::take(&mut self.string_buffer);
        let res = self.scan_external_id_into(optional_system_id, &mut id, &mut literal);
        self.string_buffer = literal;
        res.map(|()| id)
    }

    fn scan_external_id_into(
        &mut self,
        optional_system_id: bool,
        id: &mut XmlExternalId,
        literal: &mut XmlStringBuffer,
    ) -> Result<(), XmlScanError> {
        if self.scanner().skip_string("PUBLIC")? {
            if !self.scanner().skip_spaces()? {
                self.fatal_error(XmlScanErrors::XmlErrSpaceRequiredAfterPUBLIC, &[])?;
            }
            self.scan_pubid_literal(literal)?;
            id.public_id = Some(literal.to_string());
            if !self.scanner().skip_spaces()? && !optional_system_id {
                self.fatal_error(XmlScanErrors::XmlErrSpaceRequiredBetweenPublicAndSystem, &[])?;
            }
        }

        if id.public_id.is_none() && !self.scanner().skip_string("SYSTEM")? {
            return Ok(());
        }
        if id.public_id.is_none() && !self.scanner().skip_spaces()? {
            self.fatal_error(XmlScanErrors::XmlErrSpaceRequiredAfterSYSTEM, &[])?;
        }
        let quote = self.scanner().peek_char()?;
        if quote != '\'' && quote != '"' {
            if id.public_id.is_some() && optional_system_id {
                return Ok(());
            }
            self.fatal_error(XmlScanErrors::XmlErrQuoteRequiredInSystemID, &[])?;
        }
        self.scanner().scan_char()?;

        literal.clear();
        loop {
            let (text, next) = self.em.scanner().scan_literal(quote)?;
            literal.append(text);
            if next == Some(quote) {
                break;
            }
            let c = self.scanner().peek_char()?;
            if matches!(c, '<' | '&' | '%' | ']') {
                literal.append_char(self.scanner().scan_char()?);
            } else if self.is_invalid_literal(c) {
                self.fatal_error(
                    XmlScanErrors::XmlErrInvalidCharInSystemID,
                    &[&format!("{:x}", c as u32)],
                )?;
                self.scanner().scan_char()?;
            }
        }
        id.system_id = Some(literal.to_string());
        if !self.scanner().skip_char(quote)? {
            self.fatal_error(XmlScanErrors::XmlErrSystemIDUnterminated, &[])?;
        }
        Ok(())
    }

    /// Scan a public identifier literal into `literal`, collapsing runs of
    /// white space to single spaces and trimming both ends.
    ///
    /// Returns `false` if the literal held characters outside the public
    /// identifier set or was not a literal at all.
    ///
    /// ```text
    /// [12] PubidLiteral ::= '"' PubidChar* '"' | "'" (PubidChar - "'")* "'"
    /// [13] PubidChar    ::= #x20 | #xD | #xA | [a-zA-Z0-9] | [-'()+,./:=?;!*#@$_%]
    /// ```
    pub(crate) fn scan_pubid_literal(
        &mut self,
        literal: &mut XmlStringBuffer,
    ) -> Result<bool, XmlScanError> {
        literal.clear();
        let quote = self.scanner().scan_char()?;
        if quote != '\'' && quote != '"' {
            self.fatal_error(XmlScanErrors::XmlErrQuoteRequiredInPublicID, &[])?;
            return Ok(false);
        }

        let mut skip_space = true;
        let mut data_ok = true;
        loop {
            let c = self.scanner().scan_char()?;
            if c == ' ' || c == '\n' || c == '\r' {
                if !skip_space {
                    literal.append_char(' ');
                    skip_space = true;
                }
            } else if c == quote {
                if literal.last() == Some(' ') {
                    literal.truncate(literal.len() - 1);
                }
                return Ok(data_ok);
            } else if c.is_xml_pubid_char() {
                literal.append_char(c);
                skip_space = false;
            } else {
                data_ok = false;
                self.fatal_error(
                    XmlScanErrors::XmlErrInvalidCharInPublicID,
                    &[&format!("{:x}", c as u32)],
                )?;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{config::XmlScanConfig, parser::scanner::tests::scanner_over};

    use super::*;

    fn recovering() -> XmlScanConfig {
        XmlScanConfig {
            continue_after_fatal_error: true,
            ..Default::default()
        }
    }

    #[test]
    fn system_identifier() {
        let (mut scanner, collect) =
            scanner_over("SYSTEM 'sub/doc&x%.dtd'>", XmlScanConfig::default());
        let id = scanner.scan_external_id(false).unwrap();
        assert_eq!(id.public_id, None);
        assert_eq!(id.system_id.as_deref(), Some("sub/doc&x%.dtd"));
        assert_eq!(scanner.scanner().peek_char().unwrap(), '>');
        assert!(collect.0.borrow().is_empty());
    }

    #[test]
    fn public_identifier_is_normalized() {
        let (mut scanner, collect) = scanner_over(
            "PUBLIC \"  -//Test//DTD\n  Doc//EN \" \"doc.dtd\">",
            XmlScanConfig::default(),
        );
        let id = scanner.scan_external_id(false).unwrap();
        assert_eq!(id.public_id.as_deref(), Some("-//Test//DTD Doc//EN"));
        assert_eq!(id.system_id.as_deref(), Some("doc.dtd"));
        assert!(collect.0.borrow().is_empty());
    }

    #[test]
    fn optional_system_identifier() {
        let (mut scanner, _) = scanner_over("PUBLIC 'pub'>", XmlScanConfig::default());
        let id = scanner.scan_external_id(true).unwrap();
        assert_eq!(id.public_id.as_deref(), Some("pub"));
        assert_eq!(id.system_id, None);
    }

    #[test]
    fn no_external_identifier() {
        let (mut scanner, _) = scanner_over("[<!ENTITY", XmlScanConfig::default());
        assert_eq!(
            scanner.scan_external_id(false).unwrap(),
            XmlExternalId::default()
        );
        assert_eq!(scanner.scanner().peek_char().unwrap(), '[');
    }

    #[test]
    fn malformed_identifiers() {
        let (mut scanner, collect) = scanner_over("PUBLIC'a{b''c'>", recovering());
        let id = scanner.scan_external_id(false).unwrap();
        assert_eq!(id.public_id.as_deref(), Some("ab"));
        assert_eq!(id.system_id.as_deref(), Some("c"));
        assert_eq!(
            *collect.0.borrow(),
            vec![
                "F:SpaceRequiredAfterPUBLIC",
                "F:InvalidCharInPublicID",
                "F:SpaceRequiredBetweenPublicAndSystem"
            ]
        );
    }
}
