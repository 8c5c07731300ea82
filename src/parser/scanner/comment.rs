use crate::error::{XmlScanError, XmlScanErrors};

use super::{XmlScanner, XmlStringBuffer};

impl XmlScanner {
    /// Scan a comment into `text`. `<!--` has already been consumed.
    ///
    /// ```text
    /// [15] Comment ::= '<!--' ((Char - '-') | ('-' (Char - '-')))* '-->'
    /// ```
    pub(crate) fn scan_comment(&mut self, text: &mut XmlStringBuffer) -> Result<(), XmlScanError> {
        text.clear();
        while self.scanner().scan_data("--", text)? {
            let c = self.scanner().peek_char()?;
            if self.is_invalid_literal(c) {
                self.fatal_error(
                    XmlScanErrors::XmlErrInvalidCharInComment,
                    &[&format!("{:x}", c as u32)],
                )?;
                self.scanner().scan_char()?;
            }
        }
        if !self.scanner().skip_char('>')? {
            self.fatal_error(XmlScanErrors::XmlErrDashDashInComment, &[])?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::{config::XmlScanConfig, parser::scanner::tests::scanner_over};

    use super::*;

    #[test]
    fn comment_text() {
        let (mut scanner, collect) =
            scanner_over(" a - b\r\n c -->x", XmlScanConfig::default());
        let mut text = XmlStringBuffer::new();
        scanner.scan_comment(&mut text).unwrap();
        assert_eq!(text.to_string(), " a - b\n c ");
        assert_eq!(scanner.scanner().peek_char().unwrap(), 'x');
        assert!(collect.0.borrow().is_empty());
    }

    #[test]
    fn double_dash_inside() {
        let config = XmlScanConfig {
            continue_after_fatal_error: true,
            ..Default::default()
        };
        let (mut scanner, collect) = scanner_over("a--b-->", config);
        let mut text = XmlStringBuffer::new();
        scanner.scan_comment(&mut text).unwrap();
        assert_eq!(text.to_string(), "a");
        assert_eq!(*collect.0.borrow(), vec!["F:DashDashInComment"]);
    }
}
