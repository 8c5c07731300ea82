//! URI references and system identifier expansion.
//!
//! System identifiers found in documents are URI references that are
//! resolved against the base URI of the entity they appear in. When no base
//! is known, the current working directory of the process is used as the
//! base; it is cached in a [`UserDir`] owned by whoever expands the ids.

use std::{borrow::Cow, env, fmt::Display, path::Path};

fn is_mark(c: u8) -> bool {
    matches!(c, b'-' | b'_' | b'.' | b'!' | b'~' | b'*' | b'\'' | b'(' | b')')
}

fn is_unreserved(c: u8) -> bool {
    c.is_ascii_alphanumeric() || is_mark(c)
}

fn is_reserved(c: u8) -> bool {
    matches!(
        c,
        b';' | b'/' | b'?' | b':' | b'@' | b'&' | b'=' | b'+' | b'$' | b',' | b'[' | b']'
    )
}

fn to_hexdigit(c: u8) -> char {
    (if c < 10 { c + b'0' } else { c - 10 + b'A' }) as char
}

// `pct-encoded   = "%" HEXDIG HEXDIG`
fn starts_with_pct_encoded(p: &[u8]) -> bool {
    p.len() >= 3 && p[0] == b'%' && p[1].is_ascii_hexdigit() && p[2].is_ascii_hexdigit()
}

/// Characters allowed in a URI reference without escaping.
fn is_uri_char(c: u8) -> bool {
    is_unreserved(c) || is_reserved(c) || c == b'#' || c == b'%'
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UriError {
    /// The reference contains a character that must be escaped.
    InvalidCharacter(char),
    /// A `%` is not followed by two hexadecimal digits.
    InvalidEscape,
    /// The scheme is malformed.
    InvalidScheme,
    /// A relative reference cannot be resolved without an absolute base.
    RelativeBase,
}

impl Display for UriError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidCharacter(c) => write!(f, "URI contains an invalid character '{c}'"),
            Self::InvalidEscape => write!(f, "URI contains an invalid escape sequence"),
            Self::InvalidScheme => write!(f, "URI has an invalid scheme"),
            Self::RelativeBase => write!(f, "base URI is not absolute"),
        }
    }
}

impl std::error::Error for UriError {}

/// A parsed URI reference.
///
/// ```text
/// URI-reference = [ scheme ":" ] [ "//" authority ] path [ "?" query ] [ "#" fragment ]
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlURI {
    pub scheme: Option<String>,
    pub authority: Option<String>,
    pub path: String,
    pub query: Option<String>,
    pub fragment: Option<String>,
}

impl XmlURI {
    /// Parse a URI reference, which may be relative.
    pub fn parse(s: &str) -> Result<Self, UriError> {
        let bytes = s.as_bytes();
        let mut i = 0;
        while i < bytes.len() {
            let c = bytes[i];
            if !c.is_ascii() || !is_uri_char(c) {
                let c = s[i..].chars().next().unwrap_or('\u{FFFD}');
                return Err(UriError::InvalidCharacter(c));
            }
            if c == b'%' && !starts_with_pct_encoded(&bytes[i..]) {
                return Err(UriError::InvalidEscape);
            }
            i += 1;
        }

        let mut uri = Self::default();
        let mut rest = s;
        if let Some(pos) = rest.find([':', '/', '?', '#']) {
            if rest.as_bytes()[pos] == b':' {
                let scheme = &rest[..pos];
                let mut chars = scheme.bytes();
                if !chars.next().is_some_and(|c| c.is_ascii_alphabetic())
                    || !chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, b'+' | b'-' | b'.'))
                {
                    return Err(UriError::InvalidScheme);
                }
                uri.scheme = Some(scheme.to_owned());
                rest = &rest[pos + 1..];
            }
        }
        if let Some((before, fragment)) = rest.split_once('#') {
            uri.fragment = Some(fragment.to_owned());
            rest = before;
        }
        if let Some((before, query)) = rest.split_once('?') {
            uri.query = Some(query.to_owned());
            rest = before;
        }
        if let Some(after) = rest.strip_prefix("//") {
            let end = after.find('/').unwrap_or(after.len());
            uri.authority = Some(after[..end].to_owned());
            rest = &after[end..];
        }
        uri.path = rest.to_owned();
        Ok(uri)
    }

    pub fn is_absolute(&self) -> bool {
        self.scheme.is_some()
    }

    /// Resolve `reference` against `self` following RFC 3986 section 5.2.
    pub fn resolve(&self, reference: &XmlURI) -> Result<XmlURI, UriError> {
        if reference.scheme.is_some() {
            return Ok(XmlURI {
                path: remove_dot_segments(&reference.path).into_owned(),
                ..reference.clone()
            });
        }
        if self.scheme.is_none() {
            return Err(UriError::RelativeBase);
        }
        let mut target = XmlURI {
            scheme: self.scheme.clone(),
            fragment: reference.fragment.clone(),
            ..Default::default()
        };
        if reference.authority.is_some() {
            target.authority = reference.authority.clone();
            target.path = remove_dot_segments(&reference.path).into_owned();
            target.query = reference.query.clone();
            return Ok(target);
        }
        target.authority = self.authority.clone();
        if reference.path.is_empty() {
            target.path = self.path.clone();
            target.query = reference.query.clone().or_else(|| self.query.clone());
        } else {
            if reference.path.starts_with('/') {
                target.path = remove_dot_segments(&reference.path).into_owned();
            } else {
                let merged = if self.authority.is_some() && self.path.is_empty() {
                    format!("/{}", reference.path)
                } else {
                    match self.path.rfind('/') {
                        Some(pos) => format!("{}{}", &self.path[..=pos], reference.path),
                        None => reference.path.clone(),
                    }
                };
                target.path = remove_dot_segments(&merged).into_owned();
            }
            target.query = reference.query.clone();
        }
        Ok(target)
    }
}

impl Display for XmlURI {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(scheme) = self.scheme.as_deref() {
            write!(f, "{scheme}:")?;
        }
        if let Some(authority) = self.authority.as_deref() {
            write!(f, "//{authority}")?;
        }
        write!(f, "{}", self.path)?;
        if let Some(query) = self.query.as_deref() {
            write!(f, "?{query}")?;
        }
        if let Some(fragment) = self.fragment.as_deref() {
            write!(f, "#{fragment}")?;
        }
        Ok(())
    }
}

/// Remove `.` and `..` segments from `path` (RFC 3986 section 5.2.4).
///
/// If `path` has no dot segments, it is returned as is.
pub fn remove_dot_segments(path: &str) -> Cow<'_, str> {
    if !path.split('/').any(|seg| seg == "." || seg == "..") {
        return Cow::Borrowed(path);
    }
    let absolute = path.starts_with('/');
    let mut segments: Vec<&str> = vec![];
    let mut trailing_slash = false;
    for seg in path.split('/').skip(absolute as usize) {
        trailing_slash = false;
        match seg {
            "." => trailing_slash = true,
            ".." => {
                segments.pop();
                trailing_slash = true;
            }
            seg => segments.push(seg),
        }
    }
    let mut out = String::with_capacity(path.len());
    if absolute {
        out.push('/');
    }
    out.push_str(&segments.join("/"));
    if trailing_slash && !out.is_empty() && !out.ends_with('/') {
        out.push('/');
    }
    Cow::Owned(out)
}

/// Escape every byte of `s` that may not appear in a URI, except the ones in `except`.
pub fn escape_url_except<'a>(s: &'a str, except: &[u8]) -> Cow<'a, str> {
    if s.bytes().all(|c| is_uri_char(c) || except.contains(&c)) {
        return Cow::Borrowed(s);
    }
    let mut out = String::with_capacity(s.len() + 8);
    for c in s.bytes() {
        if is_uri_char(c) || except.contains(&c) {
            out.push(c as char);
        } else {
            out.push('%');
            out.push(to_hexdigit(c >> 4));
            out.push(to_hexdigit(c & 0xF));
        }
    }
    Cow::Owned(out)
}

/// Repair common mistakes in system identifiers written as file paths.
///
/// Backslashes become slashes, a leading drive letter or UNC prefix is
/// turned into a `file:` URI, and characters that may not appear in a URI
/// are escaped.
pub fn fix_uri(s: &str) -> Cow<'_, str> {
    let mut fixed = Cow::Borrowed(s);
    if fixed.contains('\\') {
        fixed = Cow::Owned(fixed.replace('\\', "/"));
    }
    let bytes = fixed.as_bytes();
    if bytes.len() >= 2 && bytes[1] == b':' && bytes[0].is_ascii_alphabetic() {
        fixed = Cow::Owned(format!("file:///{fixed}"));
    } else if fixed.starts_with("//") {
        fixed = Cow::Owned(format!("file:{fixed}"));
    }
    match escape_url_except(&fixed, b"") {
        Cow::Borrowed(_) => fixed,
        Cow::Owned(escaped) => Cow::Owned(escaped),
    }
}

/// The URI of the current working directory, computed on first use.
#[derive(Debug, Default)]
pub struct UserDir {
    cached: Option<XmlURI>,
}

impl UserDir {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `dir` instead of the working directory of the process.
    pub fn with_path(dir: impl AsRef<Path>) -> Self {
        Self {
            cached: Some(Self::dir_to_uri(dir.as_ref())),
        }
    }

    fn dir_to_uri(dir: &Path) -> XmlURI {
        let mut path = dir.to_string_lossy().replace('\\', "/");
        if !path.starts_with('/') {
            path.insert(0, '/');
        }
        if !path.ends_with('/') {
            path.push('/');
        }
        XmlURI {
            scheme: Some("file".to_owned()),
            authority: Some(String::new()),
            path: escape_url_except(&path, b"").into_owned(),
            ..Default::default()
        }
    }

    pub fn uri(&mut self) -> &XmlURI {
        self.cached.get_or_insert_with(|| {
            let dir = env::current_dir().unwrap_or_else(|_| Path::new("/").to_path_buf());
            Self::dir_to_uri(&dir)
        })
    }

    /// Drop the cached value so that the next query reads the working directory again.
    pub fn invalidate(&mut self) {
        self.cached = None;
    }
}

fn resolve_base(base_system_id: Option<&str>, system_id: &str, user_dir: &mut UserDir) -> XmlURI {
    match base_system_id {
        Some(base) if !base.is_empty() && base != system_id => {
            match XmlURI::parse(fix_uri(base).trim()) {
                Ok(base) if base.is_absolute() => base,
                Ok(base) => {
                    let user = user_dir.uri().clone();
                    user.resolve(&base).unwrap_or(user)
                }
                Err(_) => user_dir.uri().clone(),
            }
        }
        _ => user_dir.uri().clone(),
    }
}

/// Expand a system identifier to an absolute URI.
///
/// An absolute `system_id` is returned unchanged. A relative one is
/// resolved against `base_system_id`, itself resolved against the user
/// directory when relative. With `strict`, a malformed identifier is an
/// error; otherwise it is repaired with [`fix_uri`] first, and returned
/// unchanged if it still cannot be resolved.
pub fn expand_system_id(
    system_id: &str,
    base_system_id: Option<&str>,
    strict: bool,
    user_dir: &mut UserDir,
) -> Result<String, UriError> {
    if system_id.is_empty() {
        return Ok(system_id.to_owned());
    }
    let reference = match XmlURI::parse(system_id) {
        Ok(uri) if uri.is_absolute() => return Ok(system_id.to_owned()),
        Ok(uri) => uri,
        Err(err) if strict => return Err(err),
        Err(_) => match XmlURI::parse(fix_uri(system_id).trim()) {
            Ok(uri) if uri.is_absolute() => return Ok(uri.to_string()),
            Ok(uri) => uri,
            Err(_) => return Ok(system_id.to_owned()),
        },
    };
    let base = resolve_base(base_system_id, system_id, user_dir);
    match base.resolve(&reference) {
        Ok(uri) => Ok(uri.to_string()),
        Err(err) if strict => Err(err),
        Err(_) => Ok(system_id.to_owned()),
    }
}

/// Convert a `file:` URI or a plain path to a file system path.
pub fn uri_to_path(uri: &str) -> Option<Cow<'_, str>> {
    match XmlURI::parse(uri) {
        Ok(parsed) if parsed.scheme.as_deref() == Some("file") => {
            unescape_url(&parsed.path).map(|path| Cow::Owned(path.into_owned()))
        }
        Ok(parsed) if parsed.scheme.is_some() => None,
        _ => Some(Cow::Borrowed(uri)),
    }
}

/// Decode `%XX` escapes.
pub fn unescape_url(url: &str) -> Option<Cow<'_, str>> {
    if !url.contains('%') {
        return Some(Cow::Borrowed(url));
    }
    let bytes = url.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && starts_with_pct_encoded(&bytes[i..]) {
            let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).ok()?;
            out.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).ok().map(Cow::Owned)
}
