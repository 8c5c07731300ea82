//! Input sources and their resolution.
//!
//! An entity is read from an [`XmlInputSource`], which the scanner obtains
//! from an [`XmlEntityResolver`] given the entity's [`XmlResourceIdentifier`].
//! Byte sources are wrapped in a [`RewindableInputStream`] so that the first
//! bytes can be sniffed for the encoding, then read through an
//! [`XmlCharReader`].

mod reader;
mod rewindable;

use std::{
    fmt::Debug,
    fs::File,
    io::{self, ErrorKind, Read, stdin},
    path::Path,
};

pub use reader::*;
pub use rewindable::*;

use crate::uri::uri_to_path;

/// Identifiers of an external resource.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlResourceIdentifier {
    pub public_id: Option<String>,
    /// The system identifier as written in the document.
    pub literal_system_id: Option<String>,
    /// The base URI the literal system identifier is relative to.
    pub base_system_id: Option<String>,
    /// The absolute URI of the resource.
    pub expanded_system_id: Option<String>,
}

impl XmlResourceIdentifier {
    pub fn new(
        public_id: Option<&str>,
        literal_system_id: Option<&str>,
        base_system_id: Option<&str>,
        expanded_system_id: Option<&str>,
    ) -> Self {
        Self {
            public_id: public_id.map(|s| s.to_owned()),
            literal_system_id: literal_system_id.map(|s| s.to_owned()),
            base_system_id: base_system_id.map(|s| s.to_owned()),
            expanded_system_id: expanded_system_id.map(|s| s.to_owned()),
        }
    }
}

/// A source of an entity.
///
/// A character stream takes precedence over a byte stream. If neither is
/// given, the resource is opened by its system identifier.
#[derive(Default)]
pub struct XmlInputSource {
    pub public_id: Option<String>,
    pub system_id: Option<String>,
    pub base_system_id: Option<String>,
    pub byte_stream: Option<Box<dyn Read>>,
    pub char_stream: Option<String>,
    /// The encoding specified by the application, overriding detection.
    pub encoding: Option<String>,
}

impl XmlInputSource {
    pub fn new(public_id: Option<&str>, system_id: Option<&str>, base_system_id: Option<&str>) -> Self {
        Self {
            public_id: public_id.map(|s| s.to_owned()),
            system_id: system_id.map(|s| s.to_owned()),
            base_system_id: base_system_id.map(|s| s.to_owned()),
            ..Default::default()
        }
    }

    pub fn from_bytes(system_id: Option<&str>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            system_id: system_id.map(|s| s.to_owned()),
            byte_stream: Some(Box::new(io::Cursor::new(bytes.into()))),
            ..Default::default()
        }
    }

    pub fn from_reader(system_id: Option<&str>, reader: impl Read + 'static) -> Self {
        Self {
            system_id: system_id.map(|s| s.to_owned()),
            byte_stream: Some(Box::new(reader)),
            ..Default::default()
        }
    }

    pub fn from_string(system_id: Option<&str>, text: impl Into<String>) -> Self {
        Self {
            system_id: system_id.map(|s| s.to_owned()),
            char_stream: Some(text.into()),
            ..Default::default()
        }
    }

    pub fn with_encoding(mut self, encoding: &str) -> Self {
        self.encoding = Some(encoding.to_owned());
        self
    }
}

impl Debug for XmlInputSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("XmlInputSource")
            .field("public_id", &self.public_id)
            .field("system_id", &self.system_id)
            .field("base_system_id", &self.base_system_id)
            .field("byte_stream", &self.byte_stream.is_some())
            .field("char_stream", &self.char_stream.is_some())
            .field("encoding", &self.encoding)
            .finish()
    }
}

/// Resolves external entities to input sources.
pub trait XmlEntityResolver {
    /// Return `Ok(None)` to let the scanner open the expanded system id itself.
    fn resolve_entity(
        &mut self,
        identifier: &XmlResourceIdentifier,
    ) -> io::Result<Option<XmlInputSource>>;
}

/// Opens `file:` URIs and plain paths. `-` is the standard input.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultEntityResolver;

impl DefaultEntityResolver {
    pub fn open(&self, system_id: &str) -> io::Result<Box<dyn Read>> {
        if system_id == "-" {
            return Ok(Box::new(stdin()));
        }
        let Some(path) = uri_to_path(system_id) else {
            return Err(io::Error::new(
                ErrorKind::Unsupported,
                format!("{system_id} is not a local resource"),
            ));
        };
        let path = Path::new(path.as_ref());
        if !path.is_file() {
            return Err(io::Error::new(
                ErrorKind::NotFound,
                format!("{} is not found", path.display()),
            ));
        }
        File::open(path).map(|file| Box::new(file) as Box<dyn Read>)
    }
}

impl XmlEntityResolver for DefaultEntityResolver {
    fn resolve_entity(
        &mut self,
        identifier: &XmlResourceIdentifier,
    ) -> io::Result<Option<XmlInputSource>> {
        let Some(system_id) = identifier
            .expanded_system_id
            .as_deref()
            .or(identifier.literal_system_id.as_deref())
        else {
            return Ok(None);
        };
        let stream = self.open(system_id)?;
        Ok(Some(XmlInputSource {
            public_id: identifier.public_id.clone(),
            system_id: Some(system_id.to_owned()),
            base_system_id: identifier.base_system_id.clone(),
            byte_stream: Some(stream),
            ..Default::default()
        }))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn default_resolver_opens_files() {
        let dir = std::env::temp_dir().join(format!("xscan-io-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("e.ent");
        File::create(&path).unwrap().write_all(b"text").unwrap();

        let uri = format!("file://{}", path.to_string_lossy());
        let identifier = XmlResourceIdentifier::new(None, Some("e.ent"), None, Some(&uri));
        let mut source = DefaultEntityResolver
            .resolve_entity(&identifier)
            .unwrap()
            .unwrap();
        let mut text = String::new();
        source.byte_stream.take().unwrap().read_to_string(&mut text).unwrap();
        assert_eq!(text, "text");
        assert_eq!(source.system_id.as_deref(), Some(uri.as_str()));

        let missing = XmlResourceIdentifier::new(None, Some("none.ent"), None, Some("file:///no/such/file.ent"));
        let err = DefaultEntityResolver.resolve_entity(&missing).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let remote = XmlResourceIdentifier::new(None, None, None, Some("http://example.com/a.dtd"));
        assert_eq!(
            DefaultEntityResolver.resolve_entity(&remote).unwrap_err().kind(),
            ErrorKind::Unsupported
        );
        std::fs::remove_dir_all(&dir).ok();
    }
}
