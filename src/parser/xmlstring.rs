use std::fmt::Display;

/// A borrowed run of characters.
///
/// Views returned by the entity scanner point into the entity buffer and are
/// only valid until the next scanning call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct XmlString<'a> {
    chars: &'a [char],
}

impl<'a> XmlString<'a> {
    pub fn new(chars: &'a [char]) -> Self {
        Self { chars }
    }

    pub fn as_slice(&self) -> &'a [char] {
        self.chars
    }

    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    pub fn last(&self) -> Option<char> {
        self.chars.last().copied()
    }

    pub fn eq_str(&self, s: &str) -> bool {
        self.chars.iter().copied().eq(s.chars())
    }
}

impl Display for XmlString<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for &c in self.chars {
            write!(f, "{c}")?;
        }
        Ok(())
    }
}

impl PartialEq<str> for XmlString<'_> {
    fn eq(&self, other: &str) -> bool {
        self.eq_str(other)
    }
}

impl PartialEq<&str> for XmlString<'_> {
    fn eq(&self, other: &&str) -> bool {
        self.eq_str(other)
    }
}

/// A growable scratch buffer of characters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlStringBuffer {
    buf: Vec<char>,
}

impl XmlStringBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    pub fn clear(&mut self) {
        self.buf.clear();
    }

    pub fn append_char(&mut self, c: char) {
        self.buf.push(c);
    }

    pub fn append(&mut self, s: XmlString<'_>) {
        self.buf.extend_from_slice(s.as_slice());
    }

    pub fn append_chars(&mut self, chars: &[char]) {
        self.buf.extend_from_slice(chars);
    }

    pub fn append_str(&mut self, s: &str) {
        self.buf.extend(s.chars());
    }

    pub fn truncate(&mut self, len: usize) {
        self.buf.truncate(len);
    }

    pub fn as_slice(&self) -> &[char] {
        &self.buf
    }

    pub fn as_xml_string(&self) -> XmlString<'_> {
        XmlString::new(&self.buf)
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn last(&self) -> Option<char> {
        self.buf.last().copied()
    }
}

impl Display for XmlStringBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.as_xml_string().fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_and_view() {
        let mut buf = XmlStringBuffer::new();
        buf.append_str("ab");
        buf.append_char('\u{1F600}');
        buf.append(XmlString::new(&['c']));
        assert_eq!(buf.len(), 4);
        assert_eq!(buf.to_string(), "ab\u{1F600}c");
        assert!(buf.as_xml_string() == "ab\u{1F600}c");
        assert_eq!(buf.last(), Some('c'));
        buf.truncate(1);
        assert_eq!(buf.to_string(), "a");
    }
}
