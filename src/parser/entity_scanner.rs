//! Character-level scanning of the current entity.
//!
//! Every primitive works on the buffer of the entity the manager is
//! currently reading. Line ends of external entities are normalized to
//! `'\n'` as they are scanned, and the location of the entity is kept up
//! to date. XML 1.1 adds `NEL` and `LINE SEPARATOR` to the line ends and
//! rejects restricted characters in external entities; the difference is
//! captured by [`XmlCharRules`].

use crate::{
    chvalid::XmlCharValid,
    dict::Symbol,
    error::{XmlScanError, XmlScanErrors},
};

use super::{
    QName, XmlEntityManager, XmlString, XmlStringBuffer, XmlVersion, entity::ScannedEntity,
};

/// The character classes that depend on the XML version of an entity.
pub(crate) trait XmlCharRules: Sync {
    /// Characters other than `'\n'` that end a line in an external entity.
    fn is_external_newline(&self, c: char) -> bool;
    /// Characters that form a single line end together with a preceding `'\r'`.
    fn follows_cr(&self, c: char) -> bool;
    /// Characters that may appear in character data as they are.
    fn is_content(&self, c: char, external: bool) -> bool;
    fn is_space(&self, c: char, external: bool) -> bool;
    /// Characters that may not appear in comments, PIs and CDATA sections.
    fn is_data_invalid(&self, c: char, external: bool) -> bool;
    /// Characters that may not appear in a document at all.
    fn is_invalid(&self, c: char) -> bool;
}

pub(crate) struct Xml10Rules;

impl XmlCharRules for Xml10Rules {
    fn is_external_newline(&self, c: char) -> bool {
        c == '\r'
    }

    fn follows_cr(&self, c: char) -> bool {
        c == '\n'
    }

    fn is_content(&self, c: char, _external: bool) -> bool {
        c.is_xml_content_char()
    }

    fn is_space(&self, c: char, _external: bool) -> bool {
        c.is_xml_blank_char()
    }

    fn is_data_invalid(&self, c: char, _external: bool) -> bool {
        !c.is_xml_char()
    }

    fn is_invalid(&self, c: char) -> bool {
        !c.is_xml_char()
    }
}

#[cfg(feature = "xml11")]
pub(crate) struct Xml11Rules;

#[cfg(feature = "xml11")]
impl XmlCharRules for Xml11Rules {
    fn is_external_newline(&self, c: char) -> bool {
        matches!(c, '\r' | '\u{85}' | '\u{2028}')
    }

    fn follows_cr(&self, c: char) -> bool {
        matches!(c, '\n' | '\u{85}')
    }

    fn is_content(&self, c: char, external: bool) -> bool {
        if external {
            c.is_xml11_content_char()
        } else {
            c.is_xml11_internal_entity_content_char()
        }
    }

    fn is_space(&self, c: char, external: bool) -> bool {
        if external {
            c.is_xml11_space()
        } else {
            c.is_xml_blank_char()
        }
    }

    fn is_data_invalid(&self, c: char, external: bool) -> bool {
        // control characters may only appear literally in internal entities
        if external {
            !c.is_xml11_char() || c.is_xml11_restricted_char()
        } else {
            !c.is_xml11_char()
        }
    }

    fn is_invalid(&self, c: char) -> bool {
        !c.is_xml11_char()
    }
}

impl XmlEntityManager {
    pub(crate) fn char_rules(&self) -> &'static dyn XmlCharRules {
        match self.version {
            XmlVersion::Xml10 => &Xml10Rules,
            #[cfg(feature = "xml11")]
            XmlVersion::Xml11 => &Xml11Rules,
            #[cfg(not(feature = "xml11"))]
            XmlVersion::Xml11 => &Xml10Rules,
        }
    }

    /// A scanner over the current entity, following the rules of the
    /// selected XML version.
    pub fn scanner(&mut self) -> XmlEntityScanner<'_> {
        XmlEntityScanner {
            rules: self.char_rules(),
            em: self,
        }
    }
}

/// Scanning primitives over the current entity of an [`XmlEntityManager`].
///
/// A primitive that reaches the end of the buffer refills it; one that
/// reaches the end of an entity may continue in the entity below it, which
/// is reported through the manager's entity events. Exhausting the document
/// entity is [`XmlScanError::EndOfDocument`].
///
/// The primitives returning [`XmlString`] consume the scanner, because the
/// returned view borrows the entity buffer.
pub struct XmlEntityScanner<'a> {
    em: &'a mut XmlEntityManager,
    rules: &'static dyn XmlCharRules,
}

impl<'a> XmlEntityScanner<'a> {
    fn entity(&mut self) -> Result<&mut ScannedEntity, XmlScanError> {
        self.em.current.as_mut().ok_or(XmlScanError::EndOfDocument)
    }

    fn load(&mut self, offset: usize, change_entity: bool) -> Result<bool, XmlScanError> {
        self.em.load(offset, change_entity)
    }

    /// Make sure a character is available at the current position.
    fn fill(&mut self) -> Result<(), XmlScanError> {
        let entity = self.entity()?;
        if entity.position == entity.count {
            self.load(0, true)?;
        }
        Ok(())
    }

    fn add_symbol(&mut self, offset: usize, length: usize) -> Result<Symbol, XmlScanError> {
        let em = &mut *self.em;
        let entity = em.current.as_ref().ok_or(XmlScanError::EndOfDocument)?;
        Ok(em.symbols.add_chars(&entity.ch[offset..offset + length]))
    }

    pub fn is_external(&self) -> bool {
        self.em.current.as_ref().is_some_and(|e| e.is_external)
    }

    pub fn base_system_id(&self) -> Option<&str> {
        self.em
            .current
            .as_ref()?
            .entity_location
            .expanded_system_id
            .as_deref()
    }

    /// Record the version declared by the XML or text declaration.
    pub fn set_xml_version(&mut self, version: &'static str) {
        if let Some(entity) = self.em.current.as_mut() {
            entity.xml_version = version;
        }
    }

    /// Switch the decoder of the current entity to `encoding`.
    pub fn set_encoding(&mut self, encoding: &str) -> Result<(), XmlScanError> {
        self.em.switch_encoding(encoding)
    }

    /// Return the next character without consuming it.
    ///
    /// Line ends of external entities are returned as `'\n'`.
    pub fn peek_char(&mut self) -> Result<char, XmlScanError> {
        let rules = self.rules;
        self.fill()?;
        let entity = self.entity()?;
        let c = entity.ch[entity.position];
        if entity.is_external && rules.is_external_newline(c) {
            Ok('\n')
        } else {
            Ok(c)
        }
    }

    /// Consume the next character.
    pub fn scan_char(&mut self) -> Result<char, XmlScanError> {
        let rules = self.rules;
        self.fill()?;
        let entity = self.entity()?;
        let c = entity.ch[entity.position];
        entity.position += 1;
        let external = entity.is_external;
        if c == '\n' || (external && rules.is_external_newline(c)) {
            entity.line_number += 1;
            entity.column_number = 1;
            if entity.position == entity.count {
                entity.ch[0] = c;
                self.load(1, false)?;
            }
            if c == '\r' && external {
                let entity = self.entity()?;
                if entity.position < entity.count && rules.follows_cr(entity.ch[entity.position]) {
                    entity.position += 1;
                }
            }
            return Ok('\n');
        }
        entity.column_number += 1;
        Ok(c)
    }

    /// Consume a run of characters starting with a `start` character and
    /// continuing with `rest` characters.
    ///
    /// With `qname`, the run also ends before a second colon. Returns the
    /// position and length of the run in the buffer, and the position of
    /// the colon.
    fn scan_name_run(
        &mut self,
        start: impl Fn(char) -> bool,
        rest: impl Fn(char) -> bool,
        qname: bool,
    ) -> Result<Option<(usize, usize, Option<usize>)>, XmlScanError> {
        self.fill()?;
        let entity = self.entity()?;
        let mut offset = entity.position;
        if !start(entity.ch[offset]) {
            return Ok(None);
        }
        let mut colon = None;
        loop {
            let entity = self.entity()?;
            let c = entity.ch[entity.position];
            if !rest(c) {
                break;
            }
            if qname && c == ':' {
                if colon.is_some() {
                    break;
                }
                colon = Some(entity.position);
            }
            entity.position += 1;
            if entity.position == entity.count {
                let length = entity.position - offset;
                entity.ch.copy_within(offset..entity.position, 0);
                colon = colon.map(|index| index - offset);
                offset = 0;
                if self.load(length, false)? {
                    break;
                }
            }
        }
        let entity = self.entity()?;
        let length = entity.position - offset;
        entity.column_number += length;
        Ok((length > 0).then_some((offset, length, colon)))
    }

    /// Scan a `Nmtoken`.
    pub fn scan_nmtoken(&mut self) -> Result<Option<Symbol>, XmlScanError> {
        let name = |c: char| c.is_xml_name_char();
        match self.scan_name_run(name, name, false)? {
            Some((offset, length, _)) => self.add_symbol(offset, length).map(Some),
            None => Ok(None),
        }
    }

    /// Scan a `Name`.
    pub fn scan_name(&mut self) -> Result<Option<Symbol>, XmlScanError> {
        match self.scan_name_run(
            |c| c.is_xml_name_start_char(),
            |c| c.is_xml_name_char(),
            false,
        )? {
            Some((offset, length, _)) => self.add_symbol(offset, length).map(Some),
            None => Ok(None),
        }
    }

    /// Scan an `NCName`.
    pub fn scan_ncname(&mut self) -> Result<Option<Symbol>, XmlScanError> {
        match self.scan_name_run(
            |c| c.is_xml_ncname_start_char(),
            |c| c.is_xml_ncname_char(),
            false,
        )? {
            Some((offset, length, _)) => self.add_symbol(offset, length).map(Some),
            None => Ok(None),
        }
    }

    /// Scan a qualified name into `qname`.
    ///
    /// ```text
    /// [NS 7] QName ::= PrefixedName | UnprefixedName
    /// ```
    ///
    /// Returns `false` if no name starts at the current position. A name
    /// whose local part does not start like an `NCName` is still returned
    /// after `IllegalQName` has been reported.
    pub fn scan_qname(&mut self, qname: &mut QName) -> Result<bool, XmlScanError> {
        let Some((offset, length, colon)) = self.scan_name_run(
            |c| c.is_xml_ncname_start_char(),
            |c| c.is_xml_name_char(),
            true,
        )?
        else {
            return Ok(false);
        };
        let rawname = self.add_symbol(offset, length)?;
        let Some(index) = colon else {
            *qname = QName::new(None, Some(rawname.clone()), Some(rawname), None);
            return Ok(true);
        };

        let prefix = self.add_symbol(offset, index - offset)?;
        let local_start = index + 1;
        let local_len = offset + length - local_start;
        let localpart = self.add_symbol(local_start, local_len)?;
        *qname = QName::new(Some(prefix), Some(localpart), Some(rawname), None);
        let legal = self.em.current.as_ref().is_some_and(|entity| {
            local_len > 0 && entity.ch[local_start].is_xml_ncname_start_char()
        });
        if !legal {
            self.em.report_fatal(XmlScanErrors::XmlErrIllegalQName, &[])?;
        }
        Ok(true)
    }

    /// Move the last character of the buffer to its front and refill.
    fn shift_last_char(&mut self) -> Result<(), XmlScanError> {
        let entity = self.entity()?;
        if entity.position == entity.count {
            self.load(0, true)?;
        } else if entity.position + 1 == entity.count {
            entity.ch[0] = entity.ch[entity.count - 1];
            self.load(1, false)?;
            let entity = self.entity()?;
            entity.position = 0;
            entity.start_position = 0;
        }
        Ok(())
    }

    /// Consume a run of line ends at the current position, replacing each
    /// of them with a single `'\n'`.
    ///
    /// Returns where the normalized run starts, the number of line ends,
    /// and whether the run stopped just before the end of the buffer.
    fn normalize_newlines(&mut self) -> Result<(usize, usize, bool), XmlScanError> {
        let rules = self.rules;
        let entity = self.entity()?;
        let mut offset = entity.position;
        let external = entity.is_external;
        let c = entity.ch[offset];
        if c != '\n' && !(external && rules.is_external_newline(c)) {
            return Ok((offset, 0, false));
        }

        let mut newlines = 0;
        loop {
            let entity = self.entity()?;
            let c = entity.ch[entity.position];
            entity.position += 1;
            if c == '\r' && external {
                newlines += 1;
                entity.line_number += 1;
                entity.column_number = 1;
                if entity.position == entity.count {
                    offset = 0;
                    entity.base_char_offset += entity.position - entity.start_position;
                    entity.position = newlines;
                    entity.start_position = newlines;
                    if self.load(newlines, false)? {
                        break;
                    }
                }
                let entity = self.entity()?;
                if entity.position < entity.count && rules.follows_cr(entity.ch[entity.position]) {
                    entity.position += 1;
                    offset += 1;
                }
            } else if c == '\n' || (external && rules.is_external_newline(c)) {
                newlines += 1;
                entity.line_number += 1;
                entity.column_number = 1;
                if entity.position == entity.count {
                    offset = 0;
                    entity.base_char_offset += entity.position - entity.start_position;
                    entity.position = newlines;
                    entity.start_position = newlines;
                    if self.load(newlines, false)? {
                        break;
                    }
                }
            } else {
                entity.position -= 1;
                break;
            }
            let entity = self.entity()?;
            if entity.position + 1 >= entity.count {
                break;
            }
        }
        let entity = self.entity()?;
        let position = entity.position;
        entity.ch[offset..position].fill('\n');
        Ok((offset, newlines, position + 1 == entity.count))
    }

    fn into_view(self, offset: usize, length: usize) -> Result<XmlString<'a>, XmlScanError> {
        let em: &'a XmlEntityManager = self.em;
        let entity = em.current.as_ref().ok_or(XmlScanError::EndOfDocument)?;
        Ok(XmlString::new(&entity.ch[offset..offset + length]))
    }

    /// Scan character data up to markup, a reference or a line end that
    /// could not be normalized in this call.
    ///
    /// Returns the data and the next character, if known. `None` does not
    /// mean the end of the input. The data is only valid until the scanner
    /// is used again.
    pub fn scan_content(mut self) -> Result<(XmlString<'a>, Option<char>), XmlScanError> {
        let rules = self.rules;
        self.shift_last_char()?;
        let (offset, newlines, at_end) = self.normalize_newlines()?;
        let entity = self.entity()?;
        if at_end {
            let length = entity.position - offset;
            return Ok((self.into_view(offset, length)?, None));
        }

        let external = entity.is_external;
        while entity.position < entity.count && rules.is_content(entity.ch[entity.position], external)
        {
            entity.position += 1;
        }
        let length = entity.position - offset;
        entity.column_number += length - newlines;
        let next = (entity.position < entity.count).then(|| {
            let c = entity.ch[entity.position];
            if external && rules.is_external_newline(c) {
                '\n'
            } else {
                c
            }
        });
        Ok((self.into_view(offset, length)?, next))
    }

    /// Scan the data of a literal up to `quote`, a reference or a
    /// character that needs attention.
    ///
    /// A quote inside an entity expanded in the literal does not end it:
    /// it is returned as part of the data, and `None` is returned in its
    /// place as the next character.
    pub fn scan_literal(mut self, quote: char) -> Result<(XmlString<'a>, Option<char>), XmlScanError> {
        let rules = self.rules;
        self.shift_last_char()?;
        let (offset, newlines, at_end) = self.normalize_newlines()?;
        let entity = self.entity()?;
        if at_end {
            let length = entity.position - offset;
            return Ok((self.into_view(offset, length)?, None));
        }

        let external = entity.is_external;
        let literal = entity.literal;
        while entity.position < entity.count {
            let c = entity.ch[entity.position];
            if (c == quote && (!literal || external)) || c == '%' || !rules.is_content(c, external) {
                break;
            }
            entity.position += 1;
        }
        let length = entity.position - offset;
        entity.column_number += length - newlines;
        let next = (entity.position < entity.count)
            .then(|| entity.ch[entity.position])
            .filter(|&c| !(c == quote && literal));
        Ok((self.into_view(offset, length)?, next))
    }

    /// Scan data up to `delimiter` into `buffer`.
    ///
    /// Returns `true` if there is more data before the delimiter, and
    /// `false` once the delimiter has been consumed or the entity ended
    /// before it.
    pub fn scan_data(
        &mut self,
        delimiter: &str,
        buffer: &mut XmlStringBuffer,
    ) -> Result<bool, XmlScanError> {
        let rules = self.rules;
        let delimiter = delimiter.chars().collect::<Vec<_>>();
        let delim_len = delimiter.len();
        self.fill()?;

        let mut next_entity = false;
        loop {
            let entity = self.entity()?;
            if next_entity || entity.position + delim_len <= entity.count {
                break;
            }
            let (position, count) = (entity.position, entity.count);
            entity.ch.copy_within(position..count, 0);
            next_entity = self.load(count - position, false)?;
            let entity = self.entity()?;
            entity.position = 0;
            entity.start_position = 0;
        }

        let entity = self.entity()?;
        if entity.position + delim_len > entity.count {
            // the entity ends before the delimiter
            let length = entity.count - entity.position;
            buffer.append_chars(&entity.ch[entity.position..entity.count]);
            entity.column_number += length;
            entity.base_char_offset += entity.position - entity.start_position;
            entity.position = entity.count;
            entity.start_position = entity.count;
            self.load(0, true)?;
            return Ok(false);
        }

        let (offset, newlines, at_end) = self.normalize_newlines()?;
        let entity = self.entity()?;
        if at_end {
            buffer.append_chars(&entity.ch[offset..entity.position]);
            return Ok(true);
        }

        let external = entity.is_external;
        let mut found = false;
        'outer: while entity.position < entity.count {
            let c = entity.ch[entity.position];
            entity.position += 1;
            if c == delimiter[0] {
                let delim_offset = entity.position - 1;
                for (i, &d) in delimiter.iter().enumerate().skip(1) {
                    if entity.position == entity.count {
                        entity.position -= i;
                        break 'outer;
                    }
                    let c = entity.ch[entity.position];
                    entity.position += 1;
                    if d != c {
                        entity.position -= 1;
                        break;
                    }
                }
                if entity.position == delim_offset + delim_len {
                    found = true;
                    break;
                }
            } else if c == '\n' || (external && rules.is_external_newline(c)) {
                entity.position -= 1;
                break;
            } else if rules.is_data_invalid(c, external) {
                entity.position -= 1;
                let length = entity.position - offset;
                entity.column_number += length - newlines;
                buffer.append_chars(&entity.ch[offset..entity.position]);
                return Ok(true);
            }
        }
        let length = entity.position - offset;
        entity.column_number += length - newlines;
        let end = if found {
            entity.position - delim_len
        } else {
            entity.position
        };
        buffer.append_chars(&entity.ch[offset..end]);
        Ok(!found)
    }

    /// Consume `c` if it is the next character.
    ///
    /// `'\n'` also matches the line ends of external entities.
    pub fn skip_char(&mut self, c: char) -> Result<bool, XmlScanError> {
        let rules = self.rules;
        self.fill()?;
        let entity = self.entity()?;
        let cc = entity.ch[entity.position];
        if cc == c {
            entity.position += 1;
            if c == '\n' {
                entity.line_number += 1;
                entity.column_number = 1;
            } else {
                entity.column_number += 1;
            }
            return Ok(true);
        }
        if c == '\n' && entity.is_external && rules.is_external_newline(cc) {
            entity.position += 1;
            entity.line_number += 1;
            entity.column_number = 1;
            if cc == '\r' {
                if entity.position == entity.count {
                    entity.ch[0] = cc;
                    self.load(1, false)?;
                }
                let entity = self.entity()?;
                if entity.position < entity.count && rules.follows_cr(entity.ch[entity.position]) {
                    entity.position += 1;
                }
            }
            return Ok(true);
        }
        Ok(false)
    }

    fn skip_spaces_with(&mut self, decl: bool) -> Result<bool, XmlScanError> {
        let rules = self.rules;
        let is_space = |c: char, external: bool| {
            if decl {
                c.is_xml_blank_char()
            } else {
                rules.is_space(c, external)
            }
        };
        let is_newline = |c: char, external: bool| {
            c == '\n'
                || (external && if decl { c == '\r' } else { rules.is_external_newline(c) })
        };
        let follows_cr = |c: char| if decl { c == '\n' } else { rules.follows_cr(c) };

        self.fill()?;
        let entity = self.entity()?;
        let external = entity.is_external;
        let mut c = entity.ch[entity.position];
        if !is_space(c, external) {
            return Ok(false);
        }
        loop {
            let mut entity_changed = false;
            let entity = self.entity()?;
            if is_newline(c, external) {
                entity.line_number += 1;
                entity.column_number = 1;
                if entity.position + 1 == entity.count {
                    entity.ch[0] = c;
                    entity_changed = self.load(1, true)?;
                    if !entity_changed {
                        // load left the position after the kept character
                        let entity = self.entity()?;
                        entity.position = 0;
                        entity.start_position = 0;
                    }
                }
                if c == '\r' && external && !entity_changed {
                    let entity = self.entity()?;
                    if entity.position + 1 < entity.count
                        && follows_cr(entity.ch[entity.position + 1])
                    {
                        entity.position += 1;
                    }
                }
            } else {
                entity.column_number += 1;
            }
            if !entity_changed {
                self.entity()?.position += 1;
            }
            self.fill()?;
            let entity = self.entity()?;
            c = entity.ch[entity.position];
            if !is_space(c, external) {
                return Ok(true);
            }
        }
    }

    /// Consume white space. Returns `true` if any was found.
    pub fn skip_spaces(&mut self) -> Result<bool, XmlScanError> {
        self.skip_spaces_with(false)
    }

    /// Consume the white space allowed in XML and text declarations, which
    /// is scanned before the version of the entity is known.
    pub fn skip_decl_spaces(&mut self) -> Result<bool, XmlScanError> {
        self.skip_spaces_with(true)
    }

    /// Consume `s` if the input continues with it. Nothing is consumed
    /// otherwise.
    pub fn skip_string(&mut self, s: &str) -> Result<bool, XmlScanError> {
        self.fill()?;
        let length = s.chars().count();
        for (i, expected) in s.chars().enumerate() {
            let entity = self.entity()?;
            let c = entity.ch[entity.position];
            entity.position += 1;
            if c != expected {
                entity.position -= i + 1;
                return Ok(false);
            }
            if i + 1 < length && entity.position == entity.count {
                let count = entity.count;
                entity.ch.copy_within(count - i - 1..count, 0);
                if self.load(i + 1, false)? {
                    let entity = self.entity()?;
                    entity.start_position -= i + 1;
                    entity.position -= i + 1;
                    return Ok(false);
                }
            }
        }
        self.entity()?.column_number += length;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use crate::io::XmlInputSource;

    use super::*;

    fn manager(text: &str) -> XmlEntityManager {
        let mut em = XmlEntityManager::default();
        em.start_document_entity(XmlInputSource::from_string(None, text))
            .unwrap();
        em
    }

    fn position(em: &XmlEntityManager) -> (usize, usize) {
        (em.line_number().unwrap(), em.column_number().unwrap())
    }

    #[test]
    fn scan_char_normalizes_line_ends() {
        let mut em = manager("a\r\nb\rc");
        assert_eq!(em.scanner().peek_char().unwrap(), 'a');
        assert_eq!(em.scanner().scan_char().unwrap(), 'a');
        assert_eq!(position(&em), (1, 2));
        assert_eq!(em.scanner().peek_char().unwrap(), '\n');
        assert_eq!(em.scanner().scan_char().unwrap(), '\n');
        assert_eq!(position(&em), (2, 1));
        assert_eq!(em.scanner().scan_char().unwrap(), 'b');
        assert!(em.scanner().skip_char('\n').unwrap());
        assert_eq!(position(&em), (3, 1));
        assert!(!em.scanner().skip_char('x').unwrap());
        assert!(em.scanner().skip_char('c').unwrap());
        assert!(matches!(
            em.scanner().scan_char(),
            Err(XmlScanError::EndOfDocument)
        ));
    }

    #[test]
    fn qualified_names() {
        let mut em = manager("p:local a:b:c 1x q:");
        let mut qname = QName::default();
        assert!(em.scanner().scan_qname(&mut qname).unwrap());
        assert_eq!(qname.prefix.as_deref(), Some("p"));
        assert_eq!(qname.localpart.as_deref(), Some("local"));
        assert_eq!(qname.rawname(), "p:local");

        assert!(em.scanner().skip_spaces().unwrap());
        assert!(em.scanner().scan_qname(&mut qname).unwrap());
        assert_eq!(qname.rawname(), "a:b");
        assert_eq!(em.scanner().scan_char().unwrap(), ':');
        assert_eq!(em.scanner().scan_name().unwrap().as_deref(), Some("c"));

        em.scanner().skip_spaces().unwrap();
        assert!(!em.scanner().scan_qname(&mut qname).unwrap());
        assert_eq!(em.scanner().scan_nmtoken().unwrap().as_deref(), Some("1x"));

        em.scanner().skip_spaces().unwrap();
        let err = em.scanner().scan_qname(&mut qname).unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(
            em.error_reporter().last_error().unwrap().code,
            XmlScanErrors::XmlErrIllegalQName
        );
    }

    #[test]
    fn names_across_refills() {
        let name = "n".repeat(100);
        let mut em = manager(&format!("{name} rest"));
        assert_eq!(em.scanner().scan_name().unwrap().as_deref(), Some(name.as_str()));
        assert_eq!(position(&em), (1, 101));
        assert!(em.scanner().skip_spaces().unwrap());
        assert_eq!(em.scanner().scan_ncname().unwrap().as_deref(), Some("rest"));
    }

    #[test]
    fn content_with_line_ends() {
        let mut em = manager("ab\r\ncd\rx<");
        let (content, next) = em.scanner().scan_content().unwrap();
        assert_eq!(content, "ab");
        assert_eq!(next, Some('\n'));
        let (content, next) = em.scanner().scan_content().unwrap();
        assert_eq!(content, "\ncd");
        assert_eq!(next, Some('\n'));
        let (content, next) = em.scanner().scan_content().unwrap();
        assert_eq!(content, "\nx");
        assert_eq!(next, Some('<'));
        assert_eq!(position(&em), (3, 2));
    }

    #[cfg(feature = "xml11")]
    #[test]
    fn xml11_line_ends() {
        let text = "a\u{85}b\u{2028}c<";
        let mut em = manager(text);
        let (content, next) = em.scanner().scan_content().unwrap();
        assert_eq!(content, text.trim_end_matches('<'));
        assert_eq!(next, Some('<'));

        let mut em = manager(text);
        em.set_scanner_version(XmlVersion::Xml11);
        let (content, next) = em.scanner().scan_content().unwrap();
        assert_eq!(content, "a");
        assert_eq!(next, Some('\n'));
        let (content, _) = em.scanner().scan_content().unwrap();
        assert_eq!(content, "\nb");
        let (content, next) = em.scanner().scan_content().unwrap();
        assert_eq!(content, "\nc");
        assert_eq!(next, Some('<'));
        assert_eq!(position(&em), (3, 2));

        let mut em = manager("\r\u{85}x");
        em.set_scanner_version(XmlVersion::Xml11);
        assert_eq!(em.scanner().scan_char().unwrap(), '\n');
        assert_eq!(em.scanner().scan_char().unwrap(), 'x');
    }

    #[test]
    fn literal_stops_at_quote() {
        let mut em = manager("one two\" rest");
        let (value, next) = em.scanner().scan_literal('"').unwrap();
        assert_eq!(value, "one two");
        assert_eq!(next, Some('"'));
        assert!(em.scanner().skip_char('"').unwrap());
    }

    #[test]
    fn data_up_to_delimiter() {
        let mut em = manager("ab]c]]>tail");
        let mut buffer = XmlStringBuffer::new();
        assert!(!em.scanner().scan_data("]]", &mut buffer).unwrap());
        assert_eq!(buffer.as_xml_string(), "ab]c");
        assert_eq!(em.scanner().peek_char().unwrap(), '>');

        let mut em = manager("abc");
        let mut buffer = XmlStringBuffer::new();
        assert!(em.scanner().scan_data("]]", &mut buffer).unwrap());
        assert_eq!(buffer.as_xml_string(), "abc");
        assert!(matches!(
            em.scanner().scan_data("]]", &mut buffer),
            Err(XmlScanError::EndOfDocument)
        ));
    }

    #[test]
    fn data_stops_at_invalid_characters() {
        let mut em = manager("a\u{1}b-->");
        let mut buffer = XmlStringBuffer::new();
        assert!(em.scanner().scan_data("-->", &mut buffer).unwrap());
        assert_eq!(buffer.as_xml_string(), "a");
        assert_eq!(em.scanner().scan_char().unwrap(), '\u{1}');
    }

    #[test]
    fn skip_string_across_refills() {
        let text = format!("{}DOCTYPE root", " ".repeat(62));
        let mut em = manager(&text);
        assert!(em.scanner().skip_spaces().unwrap());
        assert!(em.scanner().skip_string("DOCTYPE").unwrap());
        assert_eq!(position(&em), (1, 70));

        let text = format!("{}DOCTYPX", " ".repeat(62));
        let mut em = manager(&text);
        em.scanner().skip_spaces().unwrap();
        assert!(!em.scanner().skip_string("DOCTYPE").unwrap());
        assert_eq!(em.scanner().peek_char().unwrap(), 'D');
        assert!(em.scanner().skip_string("DOC").unwrap());
    }

    #[test]
    fn spaces_count_lines() {
        let mut em = manager(" \r\n\t\n x");
        assert!(em.scanner().skip_spaces().unwrap());
        assert_eq!(position(&em), (3, 2));
        assert!(!em.scanner().skip_spaces().unwrap());
        assert!(!em.scanner().skip_decl_spaces().unwrap());
        assert_eq!(em.scanner().scan_char().unwrap(), 'x');
    }
}
