//! Features and properties recognized by the scanner.
//!
//! The names follow the SAX and Xerces conventions so that existing
//! configuration tables can be reused verbatim.

use anyhow::{Result, bail};
use const_format::concatcp;

pub const SAX_FEATURE_PREFIX: &str = "http://xml.org/sax/features/";
pub const XERCES_FEATURE_PREFIX: &str = "http://apache.org/xml/features/";
pub const XERCES_PROPERTY_PREFIX: &str = "http://apache.org/xml/properties/";

pub const NAMESPACES: &str = concatcp!(SAX_FEATURE_PREFIX, "namespaces");
pub const VALIDATION: &str = concatcp!(SAX_FEATURE_PREFIX, "validation");
pub const EXTERNAL_GENERAL_ENTITIES: &str =
    concatcp!(SAX_FEATURE_PREFIX, "external-general-entities");
pub const EXTERNAL_PARAMETER_ENTITIES: &str =
    concatcp!(SAX_FEATURE_PREFIX, "external-parameter-entities");
pub const LOAD_EXTERNAL_DTD: &str = concatcp!(XERCES_FEATURE_PREFIX, "nonvalidating/load-external-dtd");
pub const DISALLOW_DOCTYPE_DECL: &str = concatcp!(XERCES_FEATURE_PREFIX, "disallow-doctype-decl");
pub const NOTIFY_CHAR_REFS: &str = concatcp!(XERCES_FEATURE_PREFIX, "scanner/notify-char-refs");
pub const NOTIFY_BUILTIN_REFS: &str =
    concatcp!(XERCES_FEATURE_PREFIX, "scanner/notify-builtin-refs");
pub const WARN_ON_DUPLICATE_ENTITYDEF: &str =
    concatcp!(XERCES_FEATURE_PREFIX, "warn-on-duplicate-entitydef");
pub const ALLOW_JAVA_ENCODINGS: &str = concatcp!(XERCES_FEATURE_PREFIX, "allow-java-encodings");
pub const STANDARD_URI_CONFORMANT: &str =
    concatcp!(XERCES_FEATURE_PREFIX, "standard-uri-conformant");
pub const CONTINUE_AFTER_FATAL_ERROR: &str =
    concatcp!(XERCES_FEATURE_PREFIX, "continue-after-fatal-error");

pub const BUFFER_SIZE: &str = concatcp!(XERCES_PROPERTY_PREFIX, "input-buffer-size");
pub const ENTITY_EXPANSION_LIMIT: &str = concatcp!(XERCES_PROPERTY_PREFIX, "security-manager");

/// Default size of the byte and external-entity character buffers.
pub const DEFAULT_BUFFER_SIZE: usize = 2048;
/// Default size of the character buffers of internal entities.
pub const DEFAULT_INTERNAL_BUFFER_SIZE: usize = 512;
/// Number of characters read at once before the XML declaration has been scanned.
pub const DEFAULT_XMLDECL_BUFFER_SIZE: usize = 64;
/// Default limit of entity expansions when a security limit is requested
/// without an explicit value.
pub const DEFAULT_ENTITY_EXPANSION_LIMIT: usize = 100_000;

/// The configuration of one scanner instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlScanConfig {
    pub namespaces: bool,
    pub validation: bool,
    pub external_general_entities: bool,
    pub external_parameter_entities: bool,
    pub load_external_dtd: bool,
    pub disallow_doctype: bool,
    pub notify_char_refs: bool,
    pub notify_builtin_refs: bool,
    pub warn_on_duplicate_entity_def: bool,
    pub allow_java_encodings: bool,
    pub standard_uri_conformant: bool,
    pub continue_after_fatal_error: bool,
    pub buffer_size: usize,
    /// `None` disables the expansion limit.
    pub entity_expansion_limit: Option<usize>,
}

impl Default for XmlScanConfig {
    fn default() -> Self {
        Self {
            namespaces: true,
            validation: false,
            external_general_entities: true,
            external_parameter_entities: true,
            load_external_dtd: true,
            disallow_doctype: false,
            notify_char_refs: false,
            notify_builtin_refs: false,
            warn_on_duplicate_entity_def: false,
            allow_java_encodings: false,
            standard_uri_conformant: false,
            continue_after_fatal_error: false,
            buffer_size: DEFAULT_BUFFER_SIZE,
            entity_expansion_limit: None,
        }
    }
}

impl XmlScanConfig {
    fn feature_mut(&mut self, name: &str) -> Option<&mut bool> {
        Some(match name {
            NAMESPACES => &mut self.namespaces,
            VALIDATION => &mut self.validation,
            EXTERNAL_GENERAL_ENTITIES => &mut self.external_general_entities,
            EXTERNAL_PARAMETER_ENTITIES => &mut self.external_parameter_entities,
            LOAD_EXTERNAL_DTD => &mut self.load_external_dtd,
            DISALLOW_DOCTYPE_DECL => &mut self.disallow_doctype,
            NOTIFY_CHAR_REFS => &mut self.notify_char_refs,
            NOTIFY_BUILTIN_REFS => &mut self.notify_builtin_refs,
            WARN_ON_DUPLICATE_ENTITYDEF => &mut self.warn_on_duplicate_entity_def,
            ALLOW_JAVA_ENCODINGS => &mut self.allow_java_encodings,
            STANDARD_URI_CONFORMANT => &mut self.standard_uri_conformant,
            CONTINUE_AFTER_FATAL_ERROR => &mut self.continue_after_fatal_error,
            _ => return None,
        })
    }

    pub fn set_feature(&mut self, name: &str, state: bool) -> Result<()> {
        match self.feature_mut(name) {
            Some(feature) => {
                *feature = state;
                Ok(())
            }
            None => bail!("Feature '{name}' is not recognized."),
        }
    }

    pub fn get_feature(&self, name: &str) -> Result<bool> {
        let mut copy = self.clone();
        match copy.feature_mut(name) {
            Some(feature) => Ok(*feature),
            None => bail!("Feature '{name}' is not recognized."),
        }
    }

    /// Set a numeric property.
    ///
    /// For the expansion limit, `0` removes the limit.
    pub fn set_property(&mut self, name: &str, value: usize) -> Result<()> {
        match name {
            BUFFER_SIZE => {
                if value < DEFAULT_XMLDECL_BUFFER_SIZE {
                    bail!(
                        "Property '{name}' must be at least {DEFAULT_XMLDECL_BUFFER_SIZE}, but {value} is given."
                    );
                }
                self.buffer_size = value;
            }
            ENTITY_EXPANSION_LIMIT => {
                self.entity_expansion_limit = (value != 0).then_some(value);
            }
            _ => bail!("Property '{name}' is not recognized."),
        }
        Ok(())
    }

    pub fn get_property(&self, name: &str) -> Result<usize> {
        match name {
            BUFFER_SIZE => Ok(self.buffer_size),
            ENTITY_EXPANSION_LIMIT => Ok(self.entity_expansion_limit.unwrap_or(0)),
            _ => bail!("Property '{name}' is not recognized."),
        }
    }
}
