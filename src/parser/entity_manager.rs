//! The entity manager.
//!
//! The manager keeps the declared entities, opens entities when they are
//! referenced and keeps the stack of the entities being scanned. The
//! character-level work on the current entity is done by the
//! [`XmlEntityScanner`](super::XmlEntityScanner) it hands out.
//!
//! Entity boundaries are not reported through a callback. Instead every
//! start and end is queued as an [`XmlEntityEvent`], and the scanner driving
//! the manager drains the queue after each scanning step. This keeps the
//! manager free of references to its consumer.

use std::{
    collections::{HashMap, VecDeque},
    io::{self, ErrorKind},
};

use crate::{
    config::{DEFAULT_INTERNAL_BUFFER_SIZE, DEFAULT_XMLDECL_BUFFER_SIZE, XmlScanConfig},
    dict::XmlSymbolTable,
    encoding::{
        EncodingLookupError, XmlCharEncoding, detect_encoding, detect_ucs_byte_order,
        detect_utf16_byte_order, lookup_encoding,
    },
    error::{
        XmlErrorHandler, XmlErrorLevel, XmlErrorLocation, XmlErrorReporter, XmlScanError,
        XmlScanErrors, debug_entity_trace,
    },
    io::{
        DecodingReader, DefaultEntityResolver, RewindableInputStream, StringReader,
        XmlCharReader, XmlEntityResolver, XmlInputSource, XmlResourceIdentifier,
    },
    uri::{UriError, UserDir, expand_system_id},
};

use super::{
    XmlVersion,
    entity::{ScannedEntity, XML_DOCUMENT_ENTITY, XML_DTD_ENTITY, XmlEntity, is_pseudo_entity},
    pools::{ByteBufferPool, CharacterBufferPool, DEFAULT_POOL_SIZE},
};

/// A change of the current entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlEntityEvent {
    /// An entity was entered.
    ///
    /// A `skipped` entity was not entered at all: it is undeclared, could
    /// not be expanded, or is not to be expanded. Its start is immediately
    /// followed by its end.
    Start {
        name: String,
        identifier: Option<XmlResourceIdentifier>,
        encoding: Option<String>,
        skipped: bool,
    },
    End {
        name: String,
    },
}

impl XmlEntityEvent {
    pub fn name(&self) -> &str {
        match self {
            Self::Start { name, .. } | Self::End { name } => name,
        }
    }
}

pub struct XmlEntityManager {
    pub(crate) entities: HashMap<String, XmlEntity>,
    pub(crate) current: Option<ScannedEntity>,
    pub(crate) entity_stack: Vec<ScannedEntity>,
    pub(crate) pending: VecDeque<XmlEntityEvent>,
    pub(crate) symbols: XmlSymbolTable,
    pub(crate) reporter: XmlErrorReporter,
    pub(crate) version: XmlVersion,
    resolver: Option<Box<dyn XmlEntityResolver>>,
    byte_pool: ByteBufferPool,
    char_pool: CharacterBufferPool,
    user_dir: UserDir,
    in_external_subset: bool,
    entity_expansion_count: usize,
    // where the document entity ended, for diagnostics raised after it
    end_location: Option<XmlErrorLocation>,

    validation: bool,
    external_general_entities: bool,
    external_parameter_entities: bool,
    allow_java_encodings: bool,
    strict_uri: bool,
    warn_on_duplicate_entity_def: bool,
    buffer_size: usize,
    entity_expansion_limit: Option<usize>,
}

impl XmlEntityManager {
    pub fn new(config: &XmlScanConfig) -> Self {
        Self {
            entities: HashMap::new(),
            current: None,
            entity_stack: vec![],
            pending: VecDeque::new(),
            symbols: XmlSymbolTable::new(),
            reporter: XmlErrorReporter::new(config.continue_after_fatal_error),
            version: XmlVersion::Xml10,
            resolver: None,
            byte_pool: ByteBufferPool::new(DEFAULT_POOL_SIZE, config.buffer_size),
            char_pool: CharacterBufferPool::new(
                DEFAULT_POOL_SIZE,
                config.buffer_size,
                DEFAULT_INTERNAL_BUFFER_SIZE,
            ),
            user_dir: UserDir::new(),
            in_external_subset: false,
            entity_expansion_count: 0,
            end_location: None,
            validation: config.validation,
            external_general_entities: config.external_general_entities,
            external_parameter_entities: config.external_parameter_entities,
            allow_java_encodings: config.allow_java_encodings,
            strict_uri: config.standard_uri_conformant,
            warn_on_duplicate_entity_def: config.warn_on_duplicate_entity_def,
            buffer_size: config.buffer_size,
            entity_expansion_limit: config.entity_expansion_limit,
        }
    }

    /// Apply `config` and forget every entity and every counter.
    ///
    /// Open readers are closed.
    pub fn reset(&mut self, config: &XmlScanConfig) {
        self.close_readers();
        self.entities.clear();
        self.pending.clear();
        self.version = XmlVersion::Xml10;
        self.in_external_subset = false;
        self.entity_expansion_count = 0;
        self.end_location = None;
        self.reporter.reset();
        self.reporter.continue_after_fatal_error = config.continue_after_fatal_error;
        self.validation = config.validation;
        self.external_general_entities = config.external_general_entities;
        self.external_parameter_entities = config.external_parameter_entities;
        self.allow_java_encodings = config.allow_java_encodings;
        self.strict_uri = config.standard_uri_conformant;
        self.warn_on_duplicate_entity_def = config.warn_on_duplicate_entity_def;
        self.entity_expansion_limit = config.entity_expansion_limit;
        if self.buffer_size != config.buffer_size {
            self.buffer_size = config.buffer_size;
            self.byte_pool.set_buffer_size(config.buffer_size);
            self.char_pool.set_external_buffer_size(config.buffer_size);
        }
    }

    pub fn set_entity_resolver(&mut self, resolver: Option<Box<dyn XmlEntityResolver>>) {
        self.resolver = resolver;
    }

    pub fn set_error_handler(&mut self, handler: Option<Box<dyn XmlErrorHandler>>) {
        self.reporter.set_error_handler(handler);
    }

    pub fn error_reporter(&self) -> &XmlErrorReporter {
        &self.reporter
    }

    pub fn error_reporter_mut(&mut self) -> &mut XmlErrorReporter {
        &mut self.reporter
    }

    pub fn symbol_table(&mut self) -> &mut XmlSymbolTable {
        &mut self.symbols
    }

    pub fn validation(&self) -> bool {
        self.validation
    }

    /// Select the character rules of the entity scanner.
    pub fn set_scanner_version(&mut self, version: XmlVersion) {
        #[cfg(not(feature = "xml11"))]
        let version = {
            let _ = version;
            XmlVersion::Xml10
        };
        self.version = version;
    }

    pub fn scanner_version(&self) -> XmlVersion {
        self.version
    }

    pub fn start_external_subset(&mut self) {
        self.in_external_subset = true;
    }

    pub fn end_external_subset(&mut self) {
        self.in_external_subset = false;
    }

    pub fn in_external_subset(&self) -> bool {
        self.in_external_subset
    }

    /// Report a diagnostic at the current location.
    pub fn report(
        &mut self,
        level: XmlErrorLevel,
        code: XmlScanErrors,
        args: &[&str],
    ) -> Result<(), XmlScanError> {
        let location = self.location();
        self.reporter.report(level, code, args, location)
    }

    pub fn report_fatal(&mut self, code: XmlScanErrors, args: &[&str]) -> Result<(), XmlScanError> {
        self.report(XmlErrorLevel::XmlErrFatal, code, args)
    }

    fn expand(&mut self, literal: Option<&str>, base: Option<&str>) -> Option<String> {
        let literal = literal?;
        Some(
            expand_system_id(literal, base, false, &mut self.user_dir)
                .unwrap_or_else(|_| literal.to_owned()),
        )
    }

    fn expand_strict(
        &mut self,
        literal: Option<&str>,
        base: Option<&str>,
    ) -> Result<Option<String>, UriError> {
        literal
            .map(|literal| expand_system_id(literal, base, self.strict_uri, &mut self.user_dir))
            .transpose()
    }

    /// Expand `literal` against `base` to an absolute URI.
    pub fn expand_system_id(&mut self, literal: &str, base: Option<&str>) -> String {
        self.expand(Some(literal), base)
            .unwrap_or_else(|| literal.to_owned())
    }

    //
    // declarations
    //

    /// Report a redeclaration of `name`, if it is one.
    fn is_redeclared(&mut self, name: &str) -> Result<bool, XmlScanError> {
        if !self.entities.contains_key(name) {
            return Ok(false);
        }
        if self.warn_on_duplicate_entity_def {
            self.report(
                XmlErrorLevel::XmlErrWarning,
                XmlScanErrors::XmlWarDuplicateEntityDefinition,
                &[name],
            )?;
        }
        Ok(true)
    }

    /// Declare an internal entity. The first declaration of a name wins.
    ///
    /// `param_entity_refs` is only meaningful for parameter entities, whose
    /// names start with `%`.
    pub fn add_internal_entity(
        &mut self,
        name: &str,
        text: &str,
        param_entity_refs: usize,
    ) -> Result<(), XmlScanError> {
        if self.is_redeclared(name)? {
            return Ok(());
        }
        let entity = XmlEntity::Internal {
            name: name.to_owned(),
            text: text.to_owned(),
            in_external_subset: self.in_external_subset,
            param_entity_refs,
        };
        self.entities.insert(name.to_owned(), entity);
        Ok(())
    }

    /// Declare an external parsed entity.
    ///
    /// Without `base_system_id`, the system id is taken relative to the
    /// innermost external entity being scanned.
    pub fn add_external_entity(
        &mut self,
        name: &str,
        public_id: Option<&str>,
        literal_system_id: &str,
        base_system_id: Option<&str>,
    ) -> Result<(), XmlScanError> {
        if self.is_redeclared(name)? {
            return Ok(());
        }
        let base = match base_system_id {
            Some(base) => Some(base.to_owned()),
            None if self.entity_stack.is_empty() => self
                .current
                .as_ref()
                .and_then(|entity| entity.entity_location.expanded_system_id.clone()),
            None => self
                .entity_stack
                .iter()
                .rev()
                .find_map(|entity| entity.entity_location.expanded_system_id.clone()),
        };
        let expanded = self.expand(Some(literal_system_id), base.as_deref());
        let entity_location = XmlResourceIdentifier::new(
            public_id,
            Some(literal_system_id),
            base.as_deref(),
            expanded.as_deref(),
        );
        let entity = XmlEntity::External {
            name: name.to_owned(),
            entity_location,
            notation: None,
            in_external_subset: self.in_external_subset,
        };
        self.entities.insert(name.to_owned(), entity);
        Ok(())
    }

    /// Declare an unparsed entity.
    pub fn add_unparsed_entity(
        &mut self,
        name: &str,
        public_id: Option<&str>,
        system_id: &str,
        base_system_id: Option<&str>,
        notation: &str,
    ) -> Result<(), XmlScanError> {
        if self.is_redeclared(name)? {
            return Ok(());
        }
        let entity_location =
            XmlResourceIdentifier::new(public_id, Some(system_id), base_system_id, None);
        let entity = XmlEntity::External {
            name: name.to_owned(),
            entity_location,
            notation: Some(notation.to_owned()),
            in_external_subset: self.in_external_subset,
        };
        self.entities.insert(name.to_owned(), entity);
        Ok(())
    }

    pub fn get_entity(&self, name: &str) -> Option<&XmlEntity> {
        self.entities.get(name)
    }

    pub fn is_declared_entity(&self, name: &str) -> bool {
        self.entities.contains_key(name)
    }

    pub fn is_external_entity(&self, name: &str) -> bool {
        self.entities.get(name).is_some_and(|e| e.is_external())
    }

    pub fn is_unparsed_entity(&self, name: &str) -> bool {
        self.entities.get(name).is_some_and(|e| e.is_unparsed())
    }

    pub fn is_entity_decl_in_external_subset(&self, name: &str) -> bool {
        self.entities
            .get(name)
            .is_some_and(|e| e.is_entity_declared_in_external_subset())
    }

    /// The number of parameter entity references in the replacement text
    /// of the internal parameter entity `name`.
    pub fn param_entity_ref_count(&self, name: &str) -> usize {
        if !name.starts_with('%') {
            return 0;
        }
        match self.entities.get(name) {
            Some(XmlEntity::Internal {
                param_entity_refs, ..
            }) => *param_entity_refs,
            _ => 0,
        }
    }

    //
    // resolution
    //

    /// Find the input source of an external entity.
    ///
    /// A missing base system id is taken from the current entity. The
    /// installed resolver is asked first; if it has no answer, the source
    /// designates the entity by its system id and is opened on demand.
    pub fn resolve_entity(
        &mut self,
        identifier: &XmlResourceIdentifier,
    ) -> Result<XmlInputSource, XmlScanError> {
        let mut identifier = identifier.clone();
        let mut need_expand = identifier.expanded_system_id.is_none();
        if identifier.base_system_id.is_none() {
            if let Some(expanded) = self
                .current
                .as_ref()
                .and_then(|entity| entity.entity_location.expanded_system_id.clone())
            {
                identifier.base_system_id = Some(expanded);
                need_expand = true;
            }
        }
        if self.resolver.is_some() {
            if need_expand {
                identifier.expanded_system_id = self.expand(
                    identifier.literal_system_id.as_deref(),
                    identifier.base_system_id.as_deref(),
                );
            }
            if let Some(resolver) = self.resolver.as_mut() {
                if let Some(source) = resolver.resolve_entity(&identifier)? {
                    return Ok(source);
                }
            }
        }
        Ok(XmlInputSource::new(
            identifier.public_id.as_deref(),
            identifier.literal_system_id.as_deref(),
            identifier.base_system_id.as_deref(),
        ))
    }

    //
    // entity stack
    //

    fn push_skipped(&mut self, name: &str, identifier: Option<XmlResourceIdentifier>) {
        debug_entity_trace(|| format!("skipped entity {name}\n"));
        self.pending.push_back(XmlEntityEvent::Start {
            name: name.to_owned(),
            identifier,
            encoding: None,
            skipped: true,
        });
        self.pending.push_back(XmlEntityEvent::End {
            name: name.to_owned(),
        });
    }

    fn expanded_location(&mut self, location: &XmlResourceIdentifier) -> XmlResourceIdentifier {
        let expanded = self.expand(
            location.literal_system_id.as_deref(),
            location.base_system_id.as_deref(),
        );
        XmlResourceIdentifier {
            expanded_system_id: expanded,
            ..location.clone()
        }
    }

    /// Start the declared entity `name`.
    ///
    /// Undeclared entities, unparsed entities, external entities whose
    /// expansion is disabled and recursive references are skipped.
    pub fn start_entity(&mut self, name: &str, literal: bool) -> Result<(), XmlScanError> {
        let Some(entity) = self.entities.get(name).cloned() else {
            self.push_skipped(name, None);
            return Ok(());
        };

        let external = entity.is_external();
        if let XmlEntity::External {
            entity_location,
            notation,
            ..
        } = &entity
        {
            let parameter = name.starts_with('%');
            if notation.is_some()
                || (!parameter && !self.external_general_entities)
                || (parameter && !self.external_parameter_entities)
            {
                let identifier = self.expanded_location(entity_location);
                self.push_skipped(name, Some(identifier));
                return Ok(());
            }
        }

        if let Some(current) = self.current.as_ref() {
            let size = self.entity_stack.len();
            let found = (0..=size).rev().find(|&i| {
                let active = if i == size {
                    current
                } else {
                    &self.entity_stack[i]
                };
                active.name == name
            });
            if let Some(i) = found {
                let mut path = name.to_owned();
                if i < size {
                    for active in self.entity_stack.iter().skip(i + 1) {
                        path.push_str(" -> ");
                        path.push_str(&active.name);
                    }
                    path.push_str(" -> ");
                    path.push_str(&current.name);
                }
                path.push_str(" -> ");
                path.push_str(name);
                self.report_fatal(XmlScanErrors::XmlErrRecursiveReference, &[name, &path])?;
                let identifier = match &entity {
                    XmlEntity::External {
                        entity_location, ..
                    } => Some(self.expanded_location(entity_location)),
                    XmlEntity::Internal { .. } => None,
                };
                self.push_skipped(name, identifier);
                return Ok(());
            }
        }

        let source = match &entity {
            XmlEntity::External {
                entity_location, ..
            } => self.resolve_entity(entity_location)?,
            XmlEntity::Internal { text, .. } => XmlInputSource::from_string(None, text.as_str()),
        };
        self.start_entity_with_source(name, source, literal, external)
    }

    /// Start the document entity.
    pub fn start_document_entity(&mut self, source: XmlInputSource) -> Result<(), XmlScanError> {
        self.end_location = None;
        self.start_entity_with_source(XML_DOCUMENT_ENTITY, source, false, true)
    }

    /// Start the external subset of the DTD.
    pub fn start_dtd_entity(&mut self, source: XmlInputSource) -> Result<(), XmlScanError> {
        self.start_entity_with_source(XML_DTD_ENTITY, source, false, true)
    }

    /// Start an entity read from `source`.
    pub fn start_entity_with_source(
        &mut self,
        name: &str,
        source: XmlInputSource,
        literal: bool,
        is_external: bool,
    ) -> Result<(), XmlScanError> {
        let encoding = self.setup_current_entity(name, source, literal, is_external)?;

        if let Some(limit) = self.entity_expansion_limit {
            if !is_pseudo_entity(name) {
                self.entity_expansion_count += self.param_entity_ref_count(name);
                let exceeded = self.entity_expansion_count > limit;
                self.entity_expansion_count += 1;
                if exceeded {
                    self.entity_expansion_count = 0;
                    self.report_fatal(
                        XmlScanErrors::XmlErrEntityExpansionLimitExceeded,
                        &[&limit.to_string()],
                    )?;
                }
            }
        }

        self.announce_current_entity(encoding);
        Ok(())
    }

    /// Queue the start of the current entity.
    pub(crate) fn announce_current_entity(&mut self, encoding: Option<String>) {
        let Some(current) = self.current.as_ref() else {
            return;
        };
        debug_entity_trace(|| {
            format!(
                "start entity {} ({})\n",
                current.name,
                current
                    .entity_location
                    .expanded_system_id
                    .as_deref()
                    .unwrap_or("internal")
            )
        });
        self.pending.push_back(XmlEntityEvent::Start {
            name: current.name.clone(),
            identifier: Some(current.entity_location.clone()),
            encoding,
            skipped: false,
        });
    }

    /// Make `source` the current entity, pushing the previous one.
    ///
    /// Returns the encoding the entity is read with, if it is read from a
    /// byte stream or the application specified one.
    pub fn setup_current_entity(
        &mut self,
        name: &str,
        source: XmlInputSource,
        literal: bool,
        is_external: bool,
    ) -> Result<Option<String>, XmlScanError> {
        let XmlInputSource {
            public_id,
            system_id: literal_system_id,
            base_system_id,
            byte_stream,
            char_stream,
            encoding,
        } = source;
        let externally_specified = encoding.is_some();

        let expanded_system_id = self
            .expand_strict(literal_system_id.as_deref(), base_system_id.as_deref())
            .map_err(|err| XmlScanError::Io(io::Error::new(ErrorKind::InvalidInput, err)))?;
        let base_system_id = base_system_id.or_else(|| expanded_system_id.clone());

        let (reader, encoding): (Box<dyn XmlCharReader>, Option<String>) = match char_stream {
            Some(text) => (Box::new(StringReader::new(&text)), encoding),
            None => {
                let stream = match byte_stream {
                    Some(stream) => stream,
                    None => {
                        let Some(system_id) = expanded_system_id
                            .as_deref()
                            .or(literal_system_id.as_deref())
                        else {
                            return Err(XmlScanError::Io(io::Error::new(
                                ErrorKind::NotFound,
                                format!("entity {name} has neither a stream nor a system id"),
                            )));
                        };
                        DefaultEntityResolver.open(system_id)?
                    }
                };
                let mut stream = RewindableInputStream::new(stream);
                let mut b4 = [0u8; 4];
                let mut count = 0;
                while count < 4 {
                    match stream.read_and_buffer()? {
                        Some(byte) => {
                            b4[count] = byte;
                            count += 1;
                        }
                        None => break,
                    }
                }
                let b4 = &b4[..count];
                match encoding {
                    None => {
                        let info = detect_encoding(b4);
                        stream.set_start_offset(info.bom_len);
                        stream.rewind();
                        let reader = self.create_reader(stream, info.name, info.big_endian)?;
                        (reader, Some(info.name.to_owned()))
                    }
                    Some(encoding) => {
                        let encoding = encoding.to_ascii_uppercase();
                        let (bom_len, big_endian) = match encoding.as_str() {
                            "UTF-8" if b4.starts_with(&[0xEF, 0xBB, 0xBF]) => (3, None),
                            "UTF-16" => {
                                let (big_endian, bom_len) = detect_utf16_byte_order(b4);
                                (bom_len, big_endian)
                            }
                            "ISO-10646-UCS-4" | "ISO-10646-UCS-2" => {
                                (0, detect_ucs_byte_order(&encoding, b4))
                            }
                            _ => (0, None),
                        };
                        stream.set_start_offset(bom_len);
                        stream.rewind();
                        let reader = self.create_reader(stream, &encoding, big_endian)?;
                        (reader, Some(encoding))
                    }
                }
            }
        };

        let buffer = self.char_pool.get_buffer(is_external);
        let mut entity = ScannedEntity::new(
            name,
            XmlResourceIdentifier {
                public_id,
                literal_system_id,
                base_system_id,
                expanded_system_id,
            },
            reader,
            buffer,
            encoding.clone(),
            literal,
            false,
            is_external,
        );
        entity.set_encoding_externally_specified(externally_specified);
        if let Some(current) = self.current.take() {
            self.entity_stack.push(current);
        }
        self.current = Some(entity);
        Ok(encoding)
    }

    /// Build a reader decoding `stream` as `encoding`.
    ///
    /// An unusable encoding is a fatal error; when scanning goes on, the
    /// entity is read as ISO-8859-1.
    pub(crate) fn create_reader(
        &mut self,
        stream: RewindableInputStream,
        encoding: &str,
        big_endian: Option<bool>,
    ) -> Result<Box<dyn XmlCharReader>, XmlScanError> {
        let decoded = match lookup_encoding(encoding, big_endian, self.allow_java_encodings) {
            Ok(decoded) => decoded,
            Err(EncodingLookupError::ByteOrderUnsupported) => {
                self.report_fatal(XmlScanErrors::XmlErrEncodingByteOrderUnsupported, &[encoding])?;
                XmlCharEncoding::ISO8859_1
            }
            Err(EncodingLookupError::InvalidName | EncodingLookupError::Unsupported) => {
                self.report_fatal(XmlScanErrors::XmlErrEncodingDeclInvalid, &[encoding])?;
                XmlCharEncoding::ISO8859_1
            }
        };
        let bytes = self.byte_pool.get_buffer(decoded.min_bytes_per_char() > 1);
        Ok(Box::new(DecodingReader::new(stream, decoded, bytes)))
    }

    /// Switch the decoder of the current entity after an encoding
    /// declaration has been scanned.
    ///
    /// Nothing happens for character streams, or if the encoding does not
    /// change. A declared `UTF-16` does not override the byte order found
    /// while sniffing, and a declared UCS-4 or UCS-2 keeps it.
    pub(crate) fn switch_encoding(&mut self, encoding: &str) -> Result<(), XmlScanError> {
        let Some(current) = self.current.as_mut() else {
            return Ok(());
        };
        if current.reader.encoding().is_none() || current.encoding.as_deref() == Some(encoding) {
            return Ok(());
        }
        let upper = encoding.to_ascii_uppercase();
        let mut big_endian = None;
        if let Some(present) = current
            .encoding
            .as_deref()
            .filter(|present| present.starts_with("UTF-16"))
        {
            if upper == "UTF-16" {
                return Ok(());
            }
            if upper == "ISO-10646-UCS-4" || upper == "ISO-10646-UCS-2" {
                big_endian = Some(present == "UTF-16BE");
            }
        }

        let reader = std::mem::replace(&mut current.reader, Box::new(StringReader::new("")));
        let may_read_chunks = current.may_read_chunks;
        let Some(stream) = reader.into_byte_stream() else {
            return Ok(());
        };
        let mut reader = self.create_reader(stream, encoding, big_endian)?;
        reader.set_may_read_chunks(may_read_chunks);
        if let Some(current) = self.current.as_mut() {
            current.reader = reader;
            current.encoding = Some(encoding.to_owned());
        }
        Ok(())
    }

    /// Read more characters into the buffer of the current entity, keeping
    /// `ch[..offset]`.
    ///
    /// Returns `true` if the current entity is exhausted. With
    /// `change_entity`, an exhausted entity is ended and scanning goes on in
    /// the entity below it; exhausting the document entity is
    /// [`XmlScanError::EndOfDocument`].
    pub(crate) fn load(&mut self, offset: usize, change_entity: bool) -> Result<bool, XmlScanError> {
        let Some(entity) = self.current.as_mut() else {
            return Err(XmlScanError::EndOfDocument);
        };
        entity.base_char_offset += entity.position - entity.start_position;
        if offset >= entity.ch.len() {
            let len = (entity.ch.len() << 1).max(offset + 1);
            entity.ch.resize(len, '\0');
        }
        let mut length = entity.ch.len() - offset;
        if !entity.may_read_chunks && length > DEFAULT_XMLDECL_BUFFER_SIZE {
            length = DEFAULT_XMLDECL_BUFFER_SIZE;
        }
        let count = entity.reader.read(&mut entity.ch[offset..offset + length])?;
        if count > 0 {
            entity.count = offset + count;
            entity.position = offset;
            entity.start_position = offset;
            return Ok(false);
        }

        entity.count = offset;
        entity.position = offset;
        entity.start_position = offset;
        if change_entity {
            self.end_entity();
            let Some(entity) = self.current.as_ref() else {
                return Err(XmlScanError::EndOfDocument);
            };
            if entity.position == entity.count {
                self.load(0, true)?;
            }
        }
        Ok(true)
    }

    /// End the current entity and continue with the one below it.
    pub fn end_entity(&mut self) {
        if self.current.is_some() && self.entity_stack.is_empty() {
            self.end_location = Some(self.location());
        }
        let Some(mut entity) = self.current.take() else {
            return;
        };
        debug_entity_trace(|| format!("end entity {}\n", entity.name));
        self.pending.push_back(XmlEntityEvent::End {
            name: entity.name.clone(),
        });
        entity.reader.close().ok();
        if let Some(buffer) = entity.reader.take_byte_buffer() {
            self.byte_pool.return_buffer(buffer);
        }
        self.char_pool
            .return_buffer(std::mem::take(&mut entity.ch), entity.is_external);
        self.current = self.entity_stack.pop();
    }

    /// Close every open reader. Errors are ignored.
    pub fn close_readers(&mut self) {
        if let Some(mut entity) = self.current.take() {
            entity.reader.close().ok();
        }
        for mut entity in self.entity_stack.drain(..).rev() {
            entity.reader.close().ok();
        }
    }

    /// Take the oldest queued entity event.
    pub fn next_entity_event(&mut self) -> Option<XmlEntityEvent> {
        self.pending.pop_front()
    }

    /// Take the oldest queued entity event if `f` accepts it.
    pub fn next_entity_event_if(
        &mut self,
        f: impl FnOnce(&XmlEntityEvent) -> bool,
    ) -> Option<XmlEntityEvent> {
        self.pending.front().filter(|&event| f(event))?;
        self.pending.pop_front()
    }

    pub fn has_entity_events(&self) -> bool {
        !self.pending.is_empty()
    }

    //
    // locator
    //

    pub fn current_entity(&self) -> Option<&ScannedEntity> {
        self.current.as_ref()
    }

    pub fn current_entity_mut(&mut self) -> Option<&mut ScannedEntity> {
        self.current.as_mut()
    }

    /// The depth of the entity stack, the current entity included.
    pub fn entity_depth(&self) -> usize {
        self.entity_stack.len() + self.current.is_some() as usize
    }

    fn innermost_external(&self) -> Option<&ScannedEntity> {
        match self.current.as_ref() {
            Some(current) if current.is_external => Some(current),
            Some(_) => self.entity_stack.iter().rev().find(|e| e.is_external),
            None => None,
        }
    }

    fn located_system_id(
        &self,
        get: impl Fn(&XmlResourceIdentifier) -> Option<&String>,
    ) -> Option<&str> {
        let current = self.current.as_ref()?;
        get(&current.entity_location)
            .or_else(|| {
                self.entity_stack
                    .iter()
                    .rev()
                    .find_map(|entity| get(&entity.entity_location))
            })
            .map(|s| s.as_str())
    }

    pub fn public_id(&self) -> Option<&str> {
        self.current.as_ref()?.entity_location.public_id.as_deref()
    }

    pub fn literal_system_id(&self) -> Option<&str> {
        self.located_system_id(|id| id.literal_system_id.as_ref())
    }

    pub fn expanded_system_id(&self) -> Option<&str> {
        self.located_system_id(|id| id.expanded_system_id.as_ref())
    }

    pub fn base_system_id(&self) -> Option<&str> {
        self.located_system_id(|id| id.base_system_id.as_ref())
    }

    pub fn line_number(&self) -> Option<usize> {
        self.innermost_external().map(|e| e.line_number)
    }

    pub fn column_number(&self) -> Option<usize> {
        self.innermost_external().map(|e| e.column_number)
    }

    pub fn character_offset(&self) -> Option<usize> {
        self.innermost_external().map(|e| e.character_offset())
    }

    pub fn encoding(&self) -> Option<&str> {
        self.innermost_external()?.encoding.as_deref()
    }

    pub fn xml_version(&self) -> Option<&'static str> {
        self.innermost_external().map(|e| e.xml_version)
    }

    pub fn location(&self) -> XmlErrorLocation {
        if self.current.is_none() {
            if let Some(location) = &self.end_location {
                return location.clone();
            }
        }
        XmlErrorLocation {
            line: self.line_number().unwrap_or(0),
            column: self.column_number().unwrap_or(0),
            char_offset: self.character_offset().unwrap_or(0),
            public_id: self.public_id().map(|s| s.to_owned()),
            system_id: self.expanded_system_id().map(|s| s.to_owned()),
        }
    }
}

impl Default for XmlEntityManager {
    fn default() -> Self {
        Self::new(&XmlScanConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> XmlEntityManager {
        let mut em = XmlEntityManager::default();
        em.set_error_handler(Some(Box::new(Silent)));
        em
    }

    struct Silent;
    impl XmlErrorHandler for Silent {
        fn warning(&mut self, _: &crate::error::XmlError) {}
        fn error(&mut self, _: &crate::error::XmlError) {}
        fn fatal_error(&mut self, _: &crate::error::XmlError) {}
    }

    fn drain(em: &mut XmlEntityManager) -> Vec<String> {
        let mut events = vec![];
        while let Some(event) = em.next_entity_event() {
            events.push(match event {
                XmlEntityEvent::Start { name, skipped, .. } => {
                    format!("start {name}{}", if skipped { " skipped" } else { "" })
                }
                XmlEntityEvent::End { name } => format!("end {name}"),
            });
        }
        events
    }

    #[test]
    fn first_declaration_wins() {
        let mut em = manager();
        em.add_internal_entity("e", "one", 0).unwrap();
        em.add_internal_entity("e", "two", 0).unwrap();
        match em.get_entity("e").unwrap() {
            XmlEntity::Internal { text, .. } => assert_eq!(text, "one"),
            _ => panic!("e is internal"),
        }
        em.add_internal_entity("%pe", "%a;%b;", 2).unwrap();
        assert_eq!(em.param_entity_ref_count("%pe"), 2);
        assert_eq!(em.param_entity_ref_count("e"), 0);
        em.add_unparsed_entity("pic", None, "pic.gif", None, "gif").unwrap();
        assert!(em.is_unparsed_entity("pic"));
        assert!(em.is_external_entity("pic"));
        assert!(!em.is_entity_decl_in_external_subset("pic"));
    }

    #[test]
    fn undeclared_entity_is_skipped() {
        let mut em = manager();
        em.start_document_entity(XmlInputSource::from_string(None, "<r/>"))
            .unwrap();
        em.start_entity("nope", false).unwrap();
        assert_eq!(
            drain(&mut em),
            vec!["start [xml]", "start nope skipped", "end nope"]
        );
    }

    #[test]
    fn recursion_is_reported_with_its_path() {
        let mut em = manager();
        em.reporter.continue_after_fatal_error = true;
        em.add_internal_entity("a", "&b;", 0).unwrap();
        em.add_internal_entity("b", "&a;", 0).unwrap();
        em.start_document_entity(XmlInputSource::from_string(None, "&a;"))
            .unwrap();
        em.start_entity("a", false).unwrap();
        em.start_entity("b", false).unwrap();
        em.start_entity("a", false).unwrap();
        let error = em.reporter.last_error().unwrap();
        assert_eq!(error.code, XmlScanErrors::XmlErrRecursiveReference);
        assert!(error.message.contains("a -> b -> a"));
        assert_eq!(
            drain(&mut em),
            vec!["start [xml]", "start a", "start b", "start a skipped", "end a"]
        );
        assert_eq!(em.entity_depth(), 3);
    }

    #[test]
    fn expansion_limit() {
        let mut config = XmlScanConfig::default();
        config.entity_expansion_limit = Some(1);
        let mut em = XmlEntityManager::new(&config);
        em.set_error_handler(Some(Box::new(Silent)));
        em.add_internal_entity("e", "x", 0).unwrap();
        em.start_document_entity(XmlInputSource::from_string(None, ""))
            .unwrap();
        em.start_entity("e", false).unwrap();
        em.end_entity();
        em.start_entity("e", false).unwrap();
        em.end_entity();
        let err = em.start_entity("e", false).unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(em.error_reporter().nb_fatal_errors, 1);
    }

    #[test]
    fn load_crosses_entity_ends() {
        let mut em = manager();
        em.add_internal_entity("e", "in", 0).unwrap();
        em.start_document_entity(XmlInputSource::from_string(None, "ab"))
            .unwrap();
        assert!(!em.load(0, true).unwrap());
        em.start_entity("e", false).unwrap();
        assert!(!em.load(0, true).unwrap());
        assert_eq!(em.current_entity().unwrap().name(), "e");
        let entity = em.current_entity_mut().unwrap();
        entity.position = entity.count;
        assert!(em.load(0, true).unwrap());
        assert_eq!(em.current_entity().unwrap().name(), "[xml]");
        let entity = em.current_entity_mut().unwrap();
        entity.position = entity.count;
        assert!(matches!(em.load(0, true), Err(XmlScanError::EndOfDocument)));
        assert_eq!(
            drain(&mut em),
            vec!["start [xml]", "start e", "end e", "end [xml]"]
        );
    }

    #[test]
    fn sniffed_encodings() {
        let mut em = manager();
        let bytes = b"\xFF\xFE<\0r\0/\0>\0".to_vec();
        em.start_document_entity(XmlInputSource::from_bytes(Some("file:///doc.xml"), bytes))
            .unwrap();
        assert_eq!(em.encoding(), Some("UTF-16LE"));
        assert_eq!(em.expanded_system_id(), Some("file:///doc.xml"));
        assert_eq!(em.line_number(), Some(1));

        let mut em = manager();
        let source = XmlInputSource::from_bytes(None, b"\xEF\xBB\xBF<r/>".to_vec())
            .with_encoding("utf-8");
        let encoding = em.setup_current_entity("[xml]", source, false, true).unwrap();
        assert_eq!(encoding.as_deref(), Some("UTF-8"));
        assert!(em.current_entity().unwrap().is_encoding_externally_specified());
    }
}
