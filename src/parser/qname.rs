use std::{borrow::Cow, fmt::Display};

use crate::dict::Symbol;

/// A qualified name.
///
/// The scanner reuses one `QName` per scanning routine and mutates it in
/// place; callers clone what they keep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QName {
    pub prefix: Option<Symbol>,
    pub localpart: Option<Symbol>,
    pub rawname: Option<Symbol>,
    pub uri: Option<Symbol>,
}

impl QName {
    pub fn new(
        prefix: Option<Symbol>,
        localpart: Option<Symbol>,
        rawname: Option<Symbol>,
        uri: Option<Symbol>,
    ) -> Self {
        Self {
            prefix,
            localpart,
            rawname,
            uri,
        }
    }

    pub fn set_values(&mut self, other: &QName) {
        self.clone_from(other);
    }

    pub fn clear(&mut self) {
        self.prefix = None;
        self.localpart = None;
        self.rawname = None;
        self.uri = None;
    }

    pub fn rawname(&self) -> &str {
        self.rawname.as_deref().unwrap_or("")
    }
}

impl Display for QName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(uri) = self.uri.as_deref() {
            write!(f, "{{{uri}}}")?;
        }
        write!(f, "{}", self.rawname())
    }
}

/// Split a qualified name at its first colon.
///
/// ```text
/// [NS 5] QName ::= (Prefix ':')? LocalPart
/// ```
///
/// Returns `None` if the name has no prefix.
///
/// # Note
/// This function does not perform validation.
pub fn split_qname2(name: &str) -> Option<(&str, &str)> {
    // nasty but valid
    if name.starts_with(':') {
        return None;
    }
    name.split_once(':').filter(|qname| !qname.1.is_empty())
}

/// Builds the QName `"prefix:ncname"`.
///
/// If `prefix` is `Some` and not empty, return `Cow::Owned(QName)`.  
/// Otherwise, return `Cow::Borrowed(ncname)`.
pub fn build_qname<'a>(ncname: &'a str, prefix: Option<&str>) -> Cow<'a, str> {
    let Some(prefix) = prefix.filter(|p| !p.is_empty()) else {
        return Cow::Borrowed(ncname);
    };
    Cow::Owned(format!("{prefix}:{ncname}"))
}
