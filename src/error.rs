//! Diagnostics produced while scanning.
//!
//! Every problem the scanner detects is identified by an [`XmlScanErrors`] code
//! and classified by an [`XmlErrorLevel`]. Codes carry a stable key (the
//! identifier used by message catalogs) and a message template whose `{0}`,
//! `{1}`, ... placeholders are filled with the arguments of the report.
//!
//! Reports go through an [`XmlErrorReporter`], which forwards them to a
//! user-supplied [`XmlErrorHandler`] and decides whether scanning may go on.

use std::{
    fmt::Display,
    io::{self, Write},
};

use crate::{encoding::EncodingError, globals::GLOBAL_STATE};

/// Write `msg` to `out`, or to the standard error when no writer is given.
pub fn generic_error_default(out: Option<&mut (dyn Write + 'static)>, msg: &str) {
    if let Some(out) = out {
        write!(out, "{msg}").ok();
    } else {
        eprint!("{msg}");
    }
}

/// Format a message and route it through the current generic error function.
#[macro_export]
macro_rules! generic_error {
    ($($arg:tt)*) => {
        $crate::globals::GLOBAL_STATE.with_borrow_mut(|state| {
            let msg = format!($($arg)*);
            let func = state.generic_error;
            func(state.generic_error_context.as_deref_mut(), &msg);
        })
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum XmlErrorLevel {
    #[default]
    XmlErrNone = 0,
    /// A simple warning
    XmlErrWarning = 1,
    /// A recoverable error, usually a validity constraint
    XmlErrError = 2,
    /// A fatal error, usually a well-formedness constraint
    XmlErrFatal = 3,
}

impl Display for XmlErrorLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::XmlErrNone => write!(f, "none"),
            Self::XmlErrWarning => write!(f, "warning"),
            Self::XmlErrError => write!(f, "error"),
            Self::XmlErrFatal => write!(f, "fatal error"),
        }
    }
}

macro_rules! impl_xml_scan_errors {
    ( $( $variant:ident $( = $default:literal )? => ($key:literal, $template:literal) ),* $(,)? ) => {
        #[repr(C)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum XmlScanErrors {
            $(
                $variant $( = $default )?
            ),*
        }

        impl XmlScanErrors {
            /// The stable key of this diagnostic.
            pub fn key(&self) -> &'static str {
                match self {
                    $( Self:: $variant => $key ),*
                }
            }

            /// The message template of this diagnostic.
            pub fn template(&self) -> &'static str {
                match self {
                    $( Self:: $variant => $template ),*
                }
            }

            /// Look a code up by its key.
            pub fn from_key(key: &str) -> Option<Self> {
                $(
                    if key == $key {
                        return Some(Self:: $variant);
                    }
                )*
                None
            }
        }

        impl TryFrom<i32> for XmlScanErrors {
            type Error = anyhow::Error;
            fn try_from(value: i32) -> Result<Self, Self::Error> {
                $(
                    if value == Self:: $variant as i32 {
                        return Ok(Self:: $variant);
                    }
                )*
                Err(anyhow::anyhow!("Invalid convert from value '{value}' to {}", std::any::type_name::<Self>()))
            }
        }

        impl Default for XmlScanErrors {
            fn default() -> Self {
                Self::XmlErrOK
            }
        }
    };
}

impl_xml_scan_errors!(
    XmlErrOK = 0 => ("OK", "No error"),
    // entity management
    XmlErrRecursiveReference => ("RecursiveReference", "Recursive entity reference \"{0}\". (Reference path: {1})"),
    XmlErrEntityExpansionLimitExceeded => ("EntityExpansionLimitExceeded", "The parser has encountered more than \"{0}\" entity expansions in this document; this is the limit imposed by the application."),
    XmlErrEncodingByteOrderUnsupported => ("EncodingByteOrderUnsupported", "Given byte order for encoding \"{0}\" is not supported."),
    XmlErrEncodingDeclInvalid => ("EncodingDeclInvalid", "Invalid encoding name \"{0}\"."),
    XmlWarDuplicateEntityDefinition => ("MSG_DUPLICATE_ENTITY_DEFINITION", "Entity \"{0}\" is declared more than once."),
    XmlErrReferenceToExternallyDeclaredEntityWhenStandalone => ("MSG_REFERENCE_TO_EXTERNALLY_DECLARED_ENTITY_WHEN_STANDALONE", "The reference to entity \"{0}\" declared in the external subset of the DTD is not permitted in a standalone document."),
    // decoding
    XmlErrInvalidByte => ("InvalidByte", "Invalid byte {0} of {1}-byte UTF-8 sequence."),
    XmlErrExpectedByte => ("ExpectedByte", "Expected byte {0} of {1}-byte UTF-8 sequence."),
    XmlErrInvalidHighSurrogate => ("InvalidHighSurrogate", "High surrogate bits in UTF-8 sequence must not exceed 0x10 but found 0x{0}."),
    XmlErrInvalidASCII => ("InvalidASCII", "Byte \"{0}\" is not a member of the (7-bit) ASCII character set."),
    XmlErrInvalidCodePoint => ("InvalidCodePoint", "The value 0x{0} decoded as {1} is not a Unicode scalar value."),
    XmlErrCharConversionFailure => ("CharConversionFailure", "An entity determined to be in a certain encoding must not contain sequences illegal in that encoding."),
    // qualified names
    XmlErrIllegalQName => ("IllegalQName", "Element or attribute do not match QName production: QName::=(NCName':')?NCName."),
    // XML and text declarations
    XmlErrSpaceRequiredBeforeVersionInXMLDecl => ("SpaceRequiredBeforeVersionInXMLDecl", "White space is required before the version pseudo attribute in the XML declaration."),
    XmlErrSpaceRequiredBeforeVersionInTextDecl => ("SpaceRequiredBeforeVersionInTextDecl", "White space is required before the version pseudo attribute in the text declaration."),
    XmlErrSpaceRequiredBeforeEncodingInXMLDecl => ("SpaceRequiredBeforeEncodingInXMLDecl", "White space is required before the encoding pseudo attribute in the XML declaration."),
    XmlErrSpaceRequiredBeforeEncodingInTextDecl => ("SpaceRequiredBeforeEncodingInTextDecl", "White space is required before the encoding pseudo attribute in the text declaration."),
    XmlErrSpaceRequiredBeforeStandalone => ("SpaceRequiredBeforeStandalone", "White space is required before the encoding pseudo attribute in the XML declaration."),
    XmlErrVersionInfoRequired => ("VersionInfoRequired", "The version is required in the XML declaration."),
    XmlErrEncodingDeclRequired => ("EncodingDeclRequired", "The encoding declaration is required in the text declaration."),
    XmlErrSDDeclInvalid => ("SDDeclInvalid", "The standalone document declaration value must be \"yes\" or \"no\", not \"{0}\"."),
    XmlErrNoMorePseudoAttributes => ("NoMorePseudoAttributes", "No more pseudo attributes are allowed."),
    XmlErrMorePseudoAttributes => ("MorePseudoAttributes", "More pseudo attributes are expected."),
    XmlErrPseudoAttrNameExpected => ("PseudoAttrNameExpected", "A pseudo attribute name is expected."),
    XmlErrXMLDeclUnterminated => ("XMLDeclUnterminated", "The XML declaration must end with \"?>\"."),
    XmlErrTextDeclUnterminated => ("TextDeclUnterminated", "The text declaration must end with \"?>\"."),
    XmlErrVersionNotSupported => ("VersionNotSupported", "XML version \"{0}\" is not supported."),
    XmlErrEqRequiredInXMLDecl => ("EqRequiredInXMLDecl", "The '' = '' character must follow \"{0}\" in the XML declaration."),
    XmlErrEqRequiredInTextDecl => ("EqRequiredInTextDecl", "The '' = '' character must follow \"{0}\" in the text declaration."),
    XmlErrQuoteRequiredInXMLDecl => ("QuoteRequiredInXMLDecl", "The value following \"{0}\" in the XML declaration must be a quoted string."),
    XmlErrQuoteRequiredInTextDecl => ("QuoteRequiredInTextDecl", "The value following \"{0}\" in the text declaration must be a quoted string."),
    XmlErrInvalidCharInXMLDecl => ("InvalidCharInXMLDecl", "An invalid XML character (Unicode: 0x{0}) was found in the XML declaration."),
    XmlErrInvalidCharInTextDecl => ("InvalidCharInTextDecl", "An invalid XML character (Unicode: 0x{0}) was found in the text declaration."),
    XmlErrCloseQuoteMissingInXMLDecl => ("CloseQuoteMissingInXMLDecl", "closing quote in the value following \"{0}\" in the XML declaration is missing."),
    XmlErrCloseQuoteMissingInTextDecl => ("CloseQuoteMissingInTextDecl", "closing quote in the value following \"{0}\" in the text declaration is missing."),
    // processing instructions
    XmlErrPITargetRequired => ("PITargetRequired", "The processing instruction must begin with the name of the target."),
    XmlErrReservedPITarget => ("ReservedPITarget", "The processing instruction target matching \"[xX][mM][lL]\" is not allowed."),
    XmlErrSpaceRequiredInPI => ("SpaceRequiredInPI", "White space is required between the processing instruction target and data."),
    XmlErrColonNotLegalWithNS => ("ColonNotLegalWithNS", "A colon is not allowed in the name ''{0}'' when namespaces are enabled."),
    XmlErrInvalidCharInPI => ("InvalidCharInPI", "An invalid XML character (Unicode: 0x{0}) was found in the processing instruction."),
    XmlErrPIUnterminated => ("PIUnterminated", "The processing instruction must end with ''?>''."),
    // comments
    XmlErrInvalidCommentStart => ("InvalidCommentStart", "Comment must start with \"<!--\"."),
    XmlErrDashDashInComment => ("DashDashInComment", "The string \"--\" is not permitted within comments."),
    XmlErrInvalidCharInComment => ("InvalidCharInComment", "An invalid XML character (Unicode: 0x{0}) was found in the comment."),
    XmlErrCommentUnterminated => ("CommentUnterminated", "The comment must end with \"-->\"."),
    // attributes
    XmlErrOpenQuoteExpected => ("OpenQuoteExpected", "Open quote is expected for attribute \"{1}\" associated with an element type \"{0}\"."),
    XmlErrCloseQuoteExpected => ("CloseQuoteExpected", "Close quote is expected for attribute \"{1}\" associated with an element type \"{0}\"."),
    XmlErrLessthanInAttValue => ("LessthanInAttValue", "The value of attribute \"{1}\" associated with an element type \"{0}\" must not contain the ''<'' character."),
    XmlErrInvalidCharInAttValue => ("InvalidCharInAttValue", "An invalid XML character (Unicode: 0x{2}) was found in the value of attribute \"{1}\" and element is \"{0}\"."),
    XmlErrAttributeNotUnique => ("AttributeNotUnique", "Attribute \"{1}\" was already specified for element \"{0}\"."),
    XmlErrEqRequiredInAttribute => ("EqRequiredInAttribute", "Attribute name \"{1}\" associated with an element type \"{0}\" must be followed by the '' = '' character."),
    XmlErrReferenceToExternalEntity => ("ReferenceToExternalEntity", "The external entity reference \"&{0};\" is not permitted in an attribute value."),
    // external identifiers
    XmlErrSpaceRequiredAfterPUBLIC => ("SpaceRequiredAfterPUBLIC", "White spaces are required after keyword PUBLIC."),
    XmlErrSpaceRequiredAfterSYSTEM => ("SpaceRequiredAfterSYSTEM", "White space is required after keyword SYSTEM."),
    XmlErrSpaceRequiredBetweenPublicAndSystem => ("SpaceRequiredBetweenPublicAndSystem", "White spaces are required between publicId and systemId."),
    XmlErrQuoteRequiredInPublicID => ("QuoteRequiredInPublicID", "The public identifier must begin with either a single or double quote character."),
    XmlErrQuoteRequiredInSystemID => ("QuoteRequiredInSystemID", "The system identifier must begin with either a single or double quote character."),
    XmlErrInvalidCharInPublicID => ("InvalidCharInPublicID", "An invalid character (Unicode: 0x{0}) was found in the public identifier."),
    XmlErrInvalidCharInSystemID => ("InvalidCharInSystemID", "An invalid XML character (Unicode: 0x{0}) was found in the system identifier."),
    XmlErrPublicIDUnterminated => ("PublicIDUnterminated", "The public identifier must end with the matching quote character."),
    XmlErrSystemIDUnterminated => ("SystemIDUnterminated", "The system identifier must end with the matching quote character."),
    // references
    XmlErrHexdigitRequiredInCharRef => ("HexdigitRequiredInCharRef", "A hexadecimal representation must immediately follow the \"&#x\" in a character reference."),
    XmlErrDigitRequiredInCharRef => ("DigitRequiredInCharRef", "A decimal representation must immediately follow the \"&#\" in a character reference."),
    XmlErrSemicolonRequiredInCharRef => ("SemicolonRequiredInCharRef", "The character reference must end with the ';' delimiter."),
    XmlErrInvalidCharRef => ("InvalidCharRef", "Character reference \"&#{0}\" is an invalid XML character."),
    XmlErrNameRequiredInReference => ("NameRequiredInReference", "The entity name must immediately follow the '&' in the entity reference."),
    XmlErrSemicolonRequiredInReference => ("SemicolonRequiredInReference", "The reference to entity \"{0}\" must end with the '';'' delimiter."),
    XmlErrReferenceToUnparsedEntity => ("ReferenceToUnparsedEntity", "The unparsed entity reference \"&{0};\" is not permitted."),
    XmlErrEntityNotDeclared => ("EntityNotDeclared", "The entity \"{0}\" was referenced, but not declared."),
    // content
    XmlErrInvalidCharInContent => ("InvalidCharInContent", "An invalid XML character (Unicode: 0x{0}) was found in the element content of the document."),
    XmlErrCDEndInContent => ("CDEndInContent", "The character sequence \"]]>\" must not appear in content unless used to mark the end of a CDATA section."),
    XmlErrInvalidCharInCDSect => ("InvalidCharInCDSect", "An invalid XML character (Unicode: 0x{0}) was found in the CDATA section."),
    XmlErrCDSectUnterminated => ("CDSectUnterminated", "The CDATA section must end with \"]]>\"."),
    XmlErrMarkupNotRecognizedInContent => ("MarkupNotRecognizedInContent", "The content of elements must consist of well-formed character data or markup."),
    XmlErrDoctypeIllegalInContent => ("DoctypeIllegalInContent", "A DOCTYPE is not allowed in content."),
    XmlErrElementUnterminated => ("ElementUnterminated", "Element type \"{0}\" must be followed by either attribute specifications, \">\" or \"/>\"."),
    XmlErrElementEntityMismatch => ("ElementEntityMismatch", "The element \"{0}\" must start and end within the same entity."),
    XmlErrMarkupEntityMismatch => ("MarkupEntityMismatch", "XML document structures must start and end within the same entity."),
    XmlErrETagRequired => ("ETagRequired", "The element type \"{0}\" must be terminated by the matching end-tag \"</{0}>\"."),
    XmlErrETagUnterminated => ("ETagUnterminated", "The end-tag for element type \"{0}\" must end with a ''>'' delimiter."),
    XmlErrETagWithoutStartTag => ("ETagWithoutStartTag", "The end-tag \"</{0}>\" does not match any open start-tag."),
    XmlErrPrematureEOF => ("PrematureEOF", "Premature end of file."),
    // prolog and trailing misc
    XmlErrReferenceIllegalInProlog => ("ReferenceIllegalInProlog", "Content is not allowed in prolog."),
    XmlErrContentIllegalInProlog => ("ContentIllegalInProlog", "Content is not allowed in prolog."),
    XmlErrMarkupNotRecognizedInProlog => ("MarkupNotRecognizedInProlog", "The markup in the document preceding the root element must be well-formed."),
    XmlErrRootElementRequired => ("RootElementRequired", "The root element is required in a well-formed document."),
    XmlErrMarkupNotRecognizedInMisc => ("MarkupNotRecognizedInMisc", "The markup in the document following the root element must be well-formed."),
    XmlErrContentIllegalInTrailingMisc => ("ContentIllegalInTrailingMisc", "Content is not allowed in trailing section."),
    XmlErrReferenceIllegalInTrailingMisc => ("ReferenceIllegalInTrailingMisc", "Reference is not allowed in trailing section."),
    // document type declaration
    XmlErrDoctypeNotAllowed => ("DoctypeNotAllowed", "DOCTYPE is disallowed when the feature \"disallow-doctype-decl\" set to true."),
    XmlErrAlreadySeenDoctype => ("AlreadySeenDoctype", "Already seen doctype."),
    XmlErrSpaceRequiredBeforeRootElementTypeInDoctypeDecl => ("MSG_SPACE_REQUIRED_BEFORE_ROOT_ELEMENT_TYPE_IN_DOCTYPEDECL", "White space is required after \"<!DOCTYPE\" in the document type declaration."),
    XmlErrRootElementTypeRequired => ("MSG_ROOT_ELEMENT_TYPE_REQUIRED", "The root element type must appear after \"<!DOCTYPE\" in the document type declaration."),
    XmlErrDoctypedeclUnterminated => ("DoctypedeclUnterminated", "The document type declaration for root element type \"{0}\" must end with ''>''."),
    XmlErrExpectedSquareBracketToCloseInternalSubset => ("EXPECTED_SQUARE_BRACKET_TO_CLOSE_INTERNAL_SUBSET", "Expected ']' to close the internal subset."),
    // declarations inside the DTD subsets
    XmlErrMarkupNotRecognizedInDTD => ("MSG_MARKUP_NOT_RECOGNIZED_IN_DTD", "The markup declarations contained or pointed to by the document type declaration must be well-formed."),
    XmlErrSpaceRequiredBeforeEntityNameInEntityDecl => ("MSG_SPACE_REQUIRED_BEFORE_ENTITY_NAME_IN_ENTITYDECL", "White space is required after \"<!ENTITY\" in the entity declaration."),
    XmlErrSpaceRequiredBeforePercentInPEDecl => ("MSG_SPACE_REQUIRED_BEFORE_PERCENT_IN_PEDECL", "White space is required between \"<!ENTITY\" and the '%' character in the parameter entity declaration."),
    XmlErrEntityNameRequiredInEntityDecl => ("MSG_ENTITY_NAME_REQUIRED_IN_ENTITYDECL", "The entity name is required in the entity declaration."),
    XmlErrSpaceRequiredAfterEntityNameInEntityDecl => ("MSG_SPACE_REQUIRED_AFTER_ENTITY_NAME_IN_ENTITYDECL", "White space is required between the entity name \"{0}\" and the definition in the entity declaration."),
    XmlErrSpaceRequiredBeforeNDATAInUnparsedEntityDecl => ("MSG_SPACE_REQUIRED_BEFORE_NDATA_IN_UNPARSED_ENTITYDECL", "White space is required before \"NDATA\" in the declaration for the entity \"{0}\"."),
    XmlErrSpaceRequiredBeforeNotationNameInUnparsedEntityDecl => ("MSG_SPACE_REQUIRED_BEFORE_NOTATION_NAME_IN_UNPARSED_ENTITYDECL", "White space is required between \"NDATA\" and the notation name in the declaration for the entity \"{0}\"."),
    XmlErrNotationNameRequiredForUnparsedEntityDecl => ("MSG_NOTATION_NAME_REQUIRED_FOR_UNPARSED_ENTITYDECL", "The notation name is required after \"NDATA\" in the declaration for the entity \"{0}\"."),
    XmlErrEntityDeclUnterminated => ("EntityDeclUnterminated", "The declaration for the entity \"{0}\" must end with ''>''."),
    XmlErrOpenQuoteMissingInDecl => ("OpenQuoteMissingInDecl", "Open quote is expected in the declaration of \"{0}\"."),
    XmlErrCloseQuoteMissingInDecl => ("CloseQuoteMissingInDecl", "Close quote is expected in the declaration of \"{0}\"."),
    XmlErrInvalidCharInEntityValue => ("InvalidCharInEntityValue", "An invalid XML character (Unicode: 0x{0}) was found in the literal entity value."),
    XmlErrExternalIDRequired => ("ExternalIDRequired", "The external entity declaration must begin with either \"SYSTEM\" or \"PUBLIC\"."),
    XmlErrNameRequiredInPEReference => ("NameRequiredInPEReference", "The entity name must immediately follow the '%' in the parameter entity reference."),
    XmlErrSemicolonRequiredInPEReference => ("SemicolonRequiredInPEReference", "The parameter entity reference \"%{0};\" must end with the '';'' delimiter."),
    XmlErrPEReferenceWithinMarkup => ("PEReferenceWithinMarkup", "The parameter entity reference \"%{0};\" cannot occur within markup in the internal subset of the DTD."),
    XmlErrIncludeSectUnterminated => ("IncludeSectUnterminated", "The included conditional section must end with \"]]>\"."),
    XmlErrIgnoreSectUnterminated => ("IgnoreSectUnterminated", "The excluded conditional section must end with \"]]>\"."),
    XmlErrConditionalSectionInInternalSubset => ("ConditionalSectionInInternalSubset", "Conditional sections are not allowed in the internal subset."),
);

/// Fill the `{n}` placeholders of `template` with `args`.
///
/// Doubled single quotes (`''`) collapse to one, as in message catalogs.
pub fn format_message(template: &str, args: &[&str]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '{' => {
                let mut index = String::new();
                while let Some(&d) = chars.peek() {
                    if d.is_ascii_digit() {
                        index.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                if !index.is_empty() && chars.peek() == Some(&'}') {
                    chars.next();
                    let arg = index
                        .parse::<usize>()
                        .ok()
                        .and_then(|i| args.get(i))
                        .copied()
                        .unwrap_or("null");
                    out.push_str(arg);
                } else {
                    out.push('{');
                    out.push_str(&index);
                }
            }
            '\'' if chars.peek() == Some(&'\'') => {
                chars.next();
                out.push('\'');
            }
            c => out.push(c),
        }
    }
    out
}

/// A reported diagnostic together with the location it was reported at.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct XmlError {
    pub code: XmlScanErrors,
    pub level: XmlErrorLevel,
    pub message: String,
    pub line: usize,
    pub column: usize,
    pub char_offset: usize,
    pub public_id: Option<String>,
    pub system_id: Option<String>,
}

impl XmlError {
    pub fn key(&self) -> &'static str {
        self.code.key()
    }

    pub fn is_fatal(&self) -> bool {
        self.level == XmlErrorLevel::XmlErrFatal
    }
}

impl Display for XmlError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(system_id) = self.system_id.as_deref() {
            write!(f, "{system_id}:")?;
        }
        write!(
            f,
            "{}:{}: {}: {}",
            self.line, self.column, self.level, self.message
        )
    }
}

/// Location of the scanner at the time a diagnostic is raised.
#[derive(Debug, Clone, Default)]
pub struct XmlErrorLocation {
    pub line: usize,
    pub column: usize,
    pub char_offset: usize,
    pub public_id: Option<String>,
    pub system_id: Option<String>,
}

/// Receiver of diagnostics.
///
/// The default methods print the diagnostic through the generic error function.
pub trait XmlErrorHandler {
    fn warning(&mut self, error: &XmlError) {
        generic_error!("{error}\n");
    }

    fn error(&mut self, error: &XmlError) {
        generic_error!("{error}\n");
    }

    fn fatal_error(&mut self, error: &XmlError) {
        generic_error!("{error}\n");
    }
}

/// The handler used when the application does not install one.
#[derive(Debug, Default)]
pub struct DefaultErrorHandler;

impl XmlErrorHandler for DefaultErrorHandler {}

/// The number of diagnostics delivered to the handler per document.
/// Counting goes on past this limit.
pub const XML_MAX_ERRORS: usize = 100;

/// Severity-classified reporter shared by every scanning component.
pub struct XmlErrorReporter {
    handler: Option<Box<dyn XmlErrorHandler>>,
    pub(crate) continue_after_fatal_error: bool,
    pub nb_warnings: usize,
    pub nb_errors: usize,
    pub nb_fatal_errors: usize,
    last_error: Option<XmlError>,
}

impl XmlErrorReporter {
    pub fn new(continue_after_fatal_error: bool) -> Self {
        Self {
            handler: None,
            continue_after_fatal_error,
            nb_warnings: 0,
            nb_errors: 0,
            nb_fatal_errors: 0,
            last_error: None,
        }
    }

    pub fn set_error_handler(&mut self, handler: Option<Box<dyn XmlErrorHandler>>) {
        self.handler = handler;
    }

    pub fn take_error_handler(&mut self) -> Option<Box<dyn XmlErrorHandler>> {
        self.handler.take()
    }

    /// `true` if no fatal error has been reported.
    pub fn well_formed(&self) -> bool {
        self.nb_fatal_errors == 0
    }

    pub fn last_error(&self) -> Option<&XmlError> {
        self.last_error.as_ref()
    }

    pub fn reset(&mut self) {
        self.nb_warnings = 0;
        self.nb_errors = 0;
        self.nb_fatal_errors = 0;
        self.last_error = None;
    }

    /// Deliver a diagnostic.
    ///
    /// A fatal error is returned as `Err` unless the reporter was asked to
    /// continue after fatal errors.
    pub fn report(
        &mut self,
        level: XmlErrorLevel,
        code: XmlScanErrors,
        args: &[&str],
        location: XmlErrorLocation,
    ) -> Result<(), XmlScanError> {
        let error = XmlError {
            code,
            level,
            message: format_message(code.template(), args),
            line: location.line,
            column: location.column,
            char_offset: location.char_offset,
            public_id: location.public_id,
            system_id: location.system_id,
        };
        let delivered = self.nb_warnings + self.nb_errors + self.nb_fatal_errors;
        let mut fallback = DefaultErrorHandler;
        let handler: &mut dyn XmlErrorHandler = match self.handler.as_deref_mut() {
            Some(handler) => handler,
            None => &mut fallback,
        };
        let deliver = delivered < XML_MAX_ERRORS;
        match level {
            XmlErrorLevel::XmlErrNone => {}
            XmlErrorLevel::XmlErrWarning => {
                self.nb_warnings += 1;
                if deliver {
                    handler.warning(&error);
                }
            }
            XmlErrorLevel::XmlErrError => {
                self.nb_errors += 1;
                if deliver {
                    handler.error(&error);
                }
            }
            XmlErrorLevel::XmlErrFatal => {
                self.nb_fatal_errors += 1;
                if deliver {
                    handler.fatal_error(&error);
                }
            }
        }
        let ret = if level == XmlErrorLevel::XmlErrFatal && !self.continue_after_fatal_error {
            Err(XmlScanError::Fatal(Box::new(error.clone())))
        } else {
            Ok(())
        };
        self.last_error = Some(error);
        ret
    }
}

impl Default for XmlErrorReporter {
    fn default() -> Self {
        Self::new(false)
    }
}

/// The error type of every scanning operation.
#[derive(Debug)]
pub enum XmlScanError {
    /// The document entity is exhausted.
    EndOfDocument,
    /// A fatal error stopped scanning.
    Fatal(Box<XmlError>),
    /// The byte stream is not valid in its encoding.
    MalformedByteSequence {
        code: XmlScanErrors,
        args: Vec<String>,
    },
    /// The byte stream could not be converted to characters.
    CharConversion(String),
    Io(io::Error),
}

impl XmlScanError {
    pub fn is_end_of_document(&self) -> bool {
        matches!(self, Self::EndOfDocument)
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal(_))
    }

    pub fn malformed(code: XmlScanErrors, args: &[&dyn Display]) -> Self {
        Self::MalformedByteSequence {
            code,
            args: args.iter().map(|arg| arg.to_string()).collect(),
        }
    }
}

impl Display for XmlScanError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EndOfDocument => write!(f, "end of document entity"),
            Self::Fatal(error) => write!(f, "{error}"),
            Self::MalformedByteSequence { code, args } => {
                let args = args.iter().map(|arg| arg.as_str()).collect::<Vec<_>>();
                write!(f, "{}", format_message(code.template(), &args))
            }
            Self::CharConversion(msg) => write!(f, "character conversion failure: {msg}"),
            Self::Io(error) => write!(f, "{error}"),
        }
    }
}

impl std::error::Error for XmlScanError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(error) => Some(error),
            _ => None,
        }
    }
}

impl From<io::Error> for XmlScanError {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<EncodingError> for XmlScanError {
    fn from(value: EncodingError) -> Self {
        match value {
            EncodingError::Malformed { code, args, .. } => Self::MalformedByteSequence { code, args },
            other => Self::CharConversion(other.to_string()),
        }
    }
}

/// Route `msg` to the generic error function when entity debugging is on.
pub(crate) fn debug_entity_trace(msg: impl FnOnce() -> String) {
    if GLOBAL_STATE.with_borrow(|state| state.debug_entities) {
        generic_error!("{}", msg());
    }
}
