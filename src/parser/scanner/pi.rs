use crate::{
    chvalid::XmlCharValid,
    dict::Symbol,
    error::{XmlScanError, XmlScanErrors},
};

use super::{XmlScanner, XmlStringBuffer};

impl XmlScanner {
    /// Scan a processing instruction. `<?` has already been consumed.
    ///
    /// Returns the target, or `None` if it is missing, and leaves the data
    /// in `data`.
    ///
    /// ```text
    /// [16] PI       ::= '<?' PITarget (S (Char* - (Char* '?>' Char*)))? '?>'
    /// [17] PITarget ::= Name - (('X' | 'x') ('M' | 'm') ('L' | 'l'))
    /// ```
    pub(crate) fn scan_pi(
        &mut self,
        data: &mut XmlStringBuffer,
    ) -> Result<Option<Symbol>, XmlScanError> {
        let target = if self.config.namespaces {
            self.scanner().scan_ncname()?
        } else {
            self.scanner().scan_name()?
        };
        if target.is_none() {
            self.fatal_error(XmlScanErrors::XmlErrPITargetRequired, &[])?;
        }
        self.scan_pi_data(target.as_deref().unwrap_or_default(), data)?;
        Ok(target)
    }

    /// Scan the rest of a target starting with `xml`, `<?xml` having been
    /// consumed, as in `<?xml-stylesheet`.
    pub(crate) fn scan_xml_prefixed_target(&mut self) -> Result<String, XmlScanError> {
        let namespaces = self.config.namespaces;
        let mut target = String::from("xml");
        loop {
            let c = self.scanner().peek_char()?;
            let more = if namespaces {
                c.is_xml_ncname_char()
            } else {
                c.is_xml_name_char()
            };
            if !more {
                return Ok(target);
            }
            target.push(self.scanner().scan_char()?);
        }
    }

    /// Scan the data of a processing instruction whose target has been
    /// consumed, up to and including `?>`.
    pub(crate) fn scan_pi_data(
        &mut self,
        target: &str,
        data: &mut XmlStringBuffer,
    ) -> Result<(), XmlScanError> {
        if target.eq_ignore_ascii_case("xml") {
            self.fatal_error(XmlScanErrors::XmlErrReservedPITarget, &[])?;
        }

        data.clear();
        if !self.scanner().skip_spaces()? {
            if self.scanner().skip_string("?>")? {
                return Ok(());
            }
            if self.config.namespaces && self.scanner().peek_char()? == ':' {
                self.scanner().scan_char()?;
                let mut colon_name = format!("{target}:");
                if let Some(name) = self.scanner().scan_name()? {
                    colon_name.push_str(&name);
                }
                self.fatal_error(XmlScanErrors::XmlErrColonNotLegalWithNS, &[&colon_name])?;
                self.scanner().skip_spaces()?;
            } else {
                self.fatal_error(XmlScanErrors::XmlErrSpaceRequiredInPI, &[])?;
            }
        }

        while self.scanner().scan_data("?>", data)? {
            let c = self.scanner().peek_char()?;
            if self.is_invalid_literal(c) {
                self.fatal_error(
                    XmlScanErrors::XmlErrInvalidCharInPI,
                    &[&format!("{:x}", c as u32)],
                )?;
                self.scanner().scan_char()?;
            }
        }
        Ok(())
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
    fn target_and_data() {
        let (mut scanner, collect) =
            scanner_over("target  some ? data?><r/>", XmlScanConfig::default());
        let mut data = XmlStringBuffer::new();
        let target = scanner.scan_pi(&mut data).unwrap();
        assert_eq!(target.as_deref(), Some("target"));
        assert_eq!(data.to_string(), "some ? data");
        assert_eq!(scanner.scanner().peek_char().unwrap(), '<');
        assert!(collect.0.borrow().is_empty());
    }

    #[test]
    fn empty_data() {
        let (mut scanner, _) = scanner_over("empty?>", XmlScanConfig::default());
        let mut data = XmlStringBuffer::new();
        data.append_str("stale");
        let target = scanner.scan_pi(&mut data).unwrap();
        assert_eq!(target.as_deref(), Some("empty"));
        assert!(data.is_empty());
    }

    #[test]
    fn reserved_and_colon_targets() {
        let (mut scanner, collect) = scanner_over("XmL data?>", recovering());
        let mut data = XmlStringBuffer::new();
        scanner.scan_pi(&mut data).unwrap();
        assert_eq!(data.to_string(), "data");

        let (mut scanner, ns) = scanner_over("a:b c?>", recovering());
        let target = scanner.scan_pi(&mut data).unwrap();
        assert_eq!(target.as_deref(), Some("a"));
        assert_eq!(data.to_string(), "c");

        assert_eq!(*collect.0.borrow(), vec!["F:ReservedPITarget"]);
        assert_eq!(*ns.0.borrow(), vec!["F:ColonNotLegalWithNS"]);
    }

    #[test]
    fn missing_space_and_target() {
        let (mut scanner, collect) = scanner_over("?data?>", recovering());
        let mut data = XmlStringBuffer::new();
        assert!(scanner.scan_pi(&mut data).unwrap().is_none());
        assert_eq!(data.to_string(), "?data");
        assert_eq!(
            *collect.0.borrow(),
            vec!["F:PITargetRequired", "F:SpaceRequiredInPI"]
        );
    }

    #[test]
    fn invalid_characters_are_reported() {
        let (mut scanner, collect) = scanner_over("t a\u{1}b?>", recovering());
        let mut data = XmlStringBuffer::new();
        scanner.scan_pi(&mut data).unwrap();
        assert_eq!(data.to_string(), "ab");
        assert_eq!(*collect.0.borrow(), vec!["F:InvalidCharInPI"]);
    }
}
