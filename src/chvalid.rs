//! Character classes of XML 1.0 and XML 1.1.
//!
//! Name characters follow the productions of XML 1.0 Fifth Edition, which
//! coincide with the ones of XML 1.1.

pub trait XmlCharValid {
    /// ```text
    /// [2] Char ::= #x9 | #xA | #xD | [#x20-#xD7FF] | [#xE000-#xFFFD] | [#x10000-#x10FFFF]
    /// ```
    fn is_xml_char(&self) -> bool;
    /// ```text
    /// [3] S ::= (#x20 | #x9 | #xD | #xA)+
    /// ```
    fn is_xml_blank_char(&self) -> bool;
    fn is_xml_name_start_char(&self) -> bool;
    fn is_xml_name_char(&self) -> bool;
    fn is_xml_ncname_start_char(&self) -> bool;
    fn is_xml_ncname_char(&self) -> bool;
    /// ```text
    /// [13] PubidChar ::= #x20 | #xD | #xA | [a-zA-Z0-9] | [-'()+,./:=?;!*#@$_%]
    /// ```
    fn is_xml_pubid_char(&self) -> bool;
    /// Characters that may appear in character data without any special handling.
    ///
    /// Newlines and the markup delimiters `<`, `&` and `]` are excluded.
    fn is_xml_content_char(&self) -> bool;
    /// ```text
    /// [2] Char ::= [#x1-#xD7FF] | [#xE000-#xFFFD] | [#x10000-#x10FFFF]
    /// ```
    fn is_xml11_char(&self) -> bool;
    /// ```text
    /// [2a] RestrictedChar ::= [#x1-#x8] | [#xB-#xC] | [#xE-#x1F] | [#x7F-#x84] | [#x86-#x9F]
    /// ```
    fn is_xml11_restricted_char(&self) -> bool;
    /// White space including `NEL` and `LINE SEPARATOR`.
    fn is_xml11_space(&self) -> bool;
    /// Content characters of external XML 1.1 entities.
    fn is_xml11_content_char(&self) -> bool;
    /// Content characters of internal XML 1.1 entities, where `NEL` and
    /// `LINE SEPARATOR` are not line ends and restricted characters, which
    /// can only come from character references, are allowed.
    fn is_xml11_internal_entity_content_char(&self) -> bool;
}

impl XmlCharValid for char {
    fn is_xml_char(&self) -> bool {
        matches!(*self, '\u{9}' | '\u{A}' | '\u{D}' | '\u{20}'..='\u{D7FF}' | '\u{E000}'..='\u{FFFD}' | '\u{10000}'..='\u{10FFFF}')
    }

    fn is_xml_blank_char(&self) -> bool {
        matches!(*self, '\u{20}' | '\u{9}' | '\u{A}' | '\u{D}')
    }

    fn is_xml_name_start_char(&self) -> bool {
        *self == ':' || self.is_xml_ncname_start_char()
    }

    fn is_xml_name_char(&self) -> bool {
        *self == ':' || self.is_xml_ncname_char()
    }

    fn is_xml_ncname_start_char(&self) -> bool {
        matches!(
            *self,
            'a'..='z'
                | 'A'..='Z'
                | '_'
                | '\u{C0}'..='\u{D6}'
                | '\u{D8}'..='\u{F6}'
                | '\u{F8}'..='\u{2FF}'
                | '\u{370}'..='\u{37D}'
                | '\u{37F}'..='\u{1FFF}'
                | '\u{200C}'..='\u{200D}'
                | '\u{2070}'..='\u{218F}'
                | '\u{2C00}'..='\u{2FEF}'
                | '\u{3001}'..='\u{D7FF}'
                | '\u{F900}'..='\u{FDCF}'
                | '\u{FDF0}'..='\u{FFFD}'
                | '\u{10000}'..='\u{EFFFF}'
        )
    }

    fn is_xml_ncname_char(&self) -> bool {
        self.is_xml_ncname_start_char()
            || matches!(
                *self,
                '-' | '.' | '0'..='9' | '\u{B7}' | '\u{300}'..='\u{36F}' | '\u{203F}'..='\u{2040}'
            )
    }

    fn is_xml_pubid_char(&self) -> bool {
        matches!(
            *self,
            '\u{20}' | '\u{D}' | '\u{A}' | 'a'..='z' | 'A'..='Z' | '0'..='9'
        ) || "-'()+,./:=?;!*#@$_%".contains(*self)
    }

    fn is_xml_content_char(&self) -> bool {
        !matches!(*self, '\n' | '\r' | '<' | '&' | ']') && self.is_xml_char()
    }

    fn is_xml11_char(&self) -> bool {
        matches!(*self, '\u{1}'..='\u{D7FF}' | '\u{E000}'..='\u{FFFD}' | '\u{10000}'..='\u{10FFFF}')
    }

    fn is_xml11_restricted_char(&self) -> bool {
        matches!(
            *self,
            '\u{1}'..='\u{8}'
                | '\u{B}'..='\u{C}'
                | '\u{E}'..='\u{1F}'
                | '\u{7F}'..='\u{84}'
                | '\u{86}'..='\u{9F}'
        )
    }

    fn is_xml11_space(&self) -> bool {
        self.is_xml_blank_char() || matches!(*self, '\u{85}' | '\u{2028}')
    }

    fn is_xml11_content_char(&self) -> bool {
        self.is_xml11_internal_entity_content_char()
            && !self.is_xml11_restricted_char()
            && !matches!(*self, '\u{85}' | '\u{2028}')
    }

    fn is_xml11_internal_entity_content_char(&self) -> bool {
        !matches!(*self, '\n' | '\r' | '<' | '&' | ']') && self.is_xml11_char()
    }
}

/// Check `name` against the IANA encoding name production.
///
/// ```text
/// EncName ::= [A-Za-z] ([A-Za-z0-9._] | '-')*
/// ```
pub fn is_valid_iana_encoding(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
}

/// Check whether the whole `name` matches the `Name` production.
pub fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next().is_some_and(|c| c.is_xml_name_start_char()) && chars.all(|c| c.is_xml_name_char())
}

/// Check whether the whole `name` matches the `NCName` production.
pub fn is_valid_ncname(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next().is_some_and(|c| c.is_xml_ncname_start_char())
        && chars.all(|c| c.is_xml_ncname_char())
}
