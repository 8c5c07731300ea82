//! Declared entities and the cursor over an open entity.

use crate::io::{XmlCharReader, XmlResourceIdentifier};

/// Name of the document entity.
pub const XML_DOCUMENT_ENTITY: &str = "[xml]";
/// Name of the external subset of the DTD.
pub const XML_DTD_ENTITY: &str = "[dtd]";
/// Name of the entity a fragment is read from.
pub const XML_FRAGMENT_ENTITY: &str = "$fragment$";

/// Whether `name` designates an entity that is not declared in a DTD.
pub fn is_pseudo_entity(name: &str) -> bool {
    name == XML_DOCUMENT_ENTITY || name == XML_DTD_ENTITY || name == XML_FRAGMENT_ENTITY
}

/// An entity declared in the DTD.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlEntity {
    Internal {
        name: String,
        /// The replacement text.
        text: String,
        in_external_subset: bool,
        /// The number of parameter entity references, direct and indirect,
        /// in the value of a parameter entity.
        param_entity_refs: usize,
    },
    External {
        name: String,
        entity_location: XmlResourceIdentifier,
        /// The notation name of an unparsed entity.
        notation: Option<String>,
        in_external_subset: bool,
    },
}

impl XmlEntity {
    pub fn name(&self) -> &str {
        match self {
            Self::Internal { name, .. } | Self::External { name, .. } => name,
        }
    }

    pub fn is_external(&self) -> bool {
        matches!(self, Self::External { .. })
    }

    pub fn is_unparsed(&self) -> bool {
        matches!(
            self,
            Self::External {
                notation: Some(_),
                ..
            }
        )
    }

    pub fn is_entity_declared_in_external_subset(&self) -> bool {
        match self {
            Self::Internal {
                in_external_subset, ..
            }
            | Self::External {
                in_external_subset, ..
            } => *in_external_subset,
        }
    }

    pub fn is_parameter_entity(&self) -> bool {
        self.name().starts_with('%')
    }
}

/// The live state of an entity being scanned.
///
/// `ch[start_position..count]` holds the characters loaded by the last
/// refill, and `ch[position]` is the next character to scan. The buffer is
/// borrowed from the manager's pool and given back when the entity ends.
pub struct ScannedEntity {
    pub(crate) name: String,
    pub(crate) entity_location: XmlResourceIdentifier,
    pub(crate) reader: Box<dyn XmlCharReader>,
    pub(crate) ch: Vec<char>,
    pub(crate) position: usize,
    pub(crate) count: usize,
    pub(crate) start_position: usize,
    pub(crate) line_number: usize,
    pub(crate) column_number: usize,
    /// Characters consumed before `start_position`.
    pub(crate) base_char_offset: usize,
    pub(crate) encoding: Option<String>,
    pub(crate) externally_specified_encoding: bool,
    pub(crate) xml_version: &'static str,
    pub(crate) is_external: bool,
    /// `true` if the entity is expanded inside a literal.
    pub(crate) literal: bool,
    pub(crate) may_read_chunks: bool,
}

impl ScannedEntity {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        name: &str,
        entity_location: XmlResourceIdentifier,
        reader: Box<dyn XmlCharReader>,
        ch: Vec<char>,
        encoding: Option<String>,
        literal: bool,
        may_read_chunks: bool,
        is_external: bool,
    ) -> Self {
        Self {
            name: name.to_owned(),
            entity_location,
            reader,
            ch,
            position: 0,
            count: 0,
            start_position: 0,
            line_number: 1,
            column_number: 1,
            base_char_offset: 0,
            encoding,
            externally_specified_encoding: false,
            xml_version: "1.0",
            is_external,
            literal,
            may_read_chunks,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn entity_location(&self) -> &XmlResourceIdentifier {
        &self.entity_location
    }

    pub fn is_external(&self) -> bool {
        self.is_external
    }

    pub fn encoding(&self) -> Option<&str> {
        self.encoding.as_deref()
    }

    pub fn is_encoding_externally_specified(&self) -> bool {
        self.externally_specified_encoding
    }

    pub fn set_encoding_externally_specified(&mut self, value: bool) {
        self.externally_specified_encoding = value;
    }

    pub fn may_read_chunks(&self) -> bool {
        self.may_read_chunks
    }

    /// Allow the reader to read more than one byte at a time.
    ///
    /// Called once the XML or text declaration has been scanned, that is,
    /// once the encoding cannot change anymore.
    pub fn set_may_read_chunks(&mut self, may_read_chunks: bool) {
        self.may_read_chunks = may_read_chunks;
        self.reader.set_may_read_chunks(may_read_chunks);
    }

    pub fn character_offset(&self) -> usize {
        self.base_char_offset + (self.position - self.start_position)
    }
}

impl std::fmt::Debug for ScannedEntity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScannedEntity")
            .field("name", &self.name)
            .field("position", &self.position)
            .field("count", &self.count)
            .field("base_char_offset", &self.base_char_offset)
            .field("start_position", &self.start_position)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::StringReader;

    #[test]
    fn entity_kinds() {
        let internal = XmlEntity::Internal {
            name: "%pe".to_owned(),
            text: "<!ENTITY e 'x'>".to_owned(),
            in_external_subset: true,
            param_entity_refs: 0,
        };
        assert!(!internal.is_external());
        assert!(internal.is_parameter_entity());
        assert!(internal.is_entity_declared_in_external_subset());

        let unparsed = XmlEntity::External {
            name: "pic".to_owned(),
            entity_location: XmlResourceIdentifier::new(None, Some("pic.gif"), None, None),
            notation: Some("gif".to_owned()),
            in_external_subset: false,
        };
        assert!(unparsed.is_external());
        assert!(unparsed.is_unparsed());
        assert_eq!(unparsed.name(), "pic");
    }

    #[test]
    fn character_offset() {
        let mut entity = ScannedEntity::new(
            "e",
            XmlResourceIdentifier::default(),
            Box::new(StringReader::new("abc")),
            vec!['\0'; 8],
            None,
            false,
            false,
            false,
        );
        entity.base_char_offset = 10;
        entity.start_position = 2;
        entity.position = 5;
        assert_eq!(entity.character_offset(), 13);
    }
}
