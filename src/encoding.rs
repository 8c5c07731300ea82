//! Character encodings of entities.
//!
//! This module detects the encoding of an entity from its first bytes,
//! maps encoding names to decoders, and decodes bytes into Unicode scalar
//! values. UTF-8, UTF-16, UCS-4, UCS-2, US-ASCII, ISO-8859-1 and EBCDIC
//! CP037 have dedicated decoders; other names are looked up in `encoding_rs`.

use std::{borrow::Cow, fmt::Display};

use encoding_rs::{DecoderResult, Encoding, REPLACEMENT, UTF_16BE};

use crate::{chvalid::is_valid_iana_encoding, error::XmlScanErrors};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XmlCharEncoding {
    UTF8,
    UTF16 { big_endian: bool },
    UCS4 { big_endian: bool },
    UCS2 { big_endian: bool },
    ASCII,
    ISO8859_1,
    /// EBCDIC code page 037.
    CP037,
    /// Any other encoding known to `encoding_rs`.
    Other(&'static Encoding),
}

impl XmlCharEncoding {
    pub fn get_name(&self) -> &'static str {
        match *self {
            Self::UTF8 => "UTF-8",
            Self::UTF16 { big_endian: true } => "UTF-16BE",
            Self::UTF16 { big_endian: false } => "UTF-16LE",
            Self::UCS4 { .. } => "ISO-10646-UCS-4",
            Self::UCS2 { .. } => "ISO-10646-UCS-2",
            Self::ASCII => "US-ASCII",
            Self::ISO8859_1 => "ISO-8859-1",
            Self::CP037 => "CP037",
            Self::Other(encoding) => encoding.name(),
        }
    }

    /// The least number of bytes a character is encoded with.
    pub fn min_bytes_per_char(&self) -> usize {
        match *self {
            Self::UTF16 { .. } | Self::UCS2 { .. } => 2,
            Self::UCS4 { .. } => 4,
            Self::Other(encoding) if encoding == UTF_16BE || encoding == encoding_rs::UTF_16LE => 2,
            _ => 1,
        }
    }

    pub fn is_utf16(&self) -> bool {
        match *self {
            Self::UTF16 { .. } => true,
            Self::Other(encoding) => encoding == UTF_16BE || encoding == encoding_rs::UTF_16LE,
            _ => false,
        }
    }

    pub fn decoder(&self) -> XmlDecoder {
        let kind = match *self {
            Self::UTF8 => DecoderKind::Utf8,
            Self::UTF16 { big_endian } => DecoderKind::Utf16 { big_endian },
            Self::UCS4 { big_endian } => DecoderKind::Ucs4 { big_endian },
            Self::UCS2 { big_endian } => DecoderKind::Ucs2 { big_endian },
            Self::ASCII => DecoderKind::Ascii,
            Self::ISO8859_1 => DecoderKind::Latin1,
            Self::CP037 => DecoderKind::Cp037,
            Self::Other(encoding) => DecoderKind::Rs {
                decoder: Box::new(encoding.new_decoder()),
                pending: String::new(),
                pending_pos: 0,
                malformed: false,
                finished: false,
            },
        };
        XmlDecoder {
            encoding: *self,
            kind,
        }
    }
}

/// The result of sniffing the first bytes of an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodingInfo {
    /// The canonical (upper case) name of the detected encoding.
    pub name: &'static str,
    /// `None` if the byte order is unknown or irrelevant.
    pub big_endian: Option<bool>,
    /// The number of bytes of the byte order mark to skip.
    pub bom_len: usize,
}

impl EncodingInfo {
    const fn new(name: &'static str, big_endian: Option<bool>, bom_len: usize) -> Self {
        Self {
            name,
            big_endian,
            bom_len,
        }
    }
}

/// Guess the encoding of an entity from its first (up to four) bytes.
///
/// The guess is only precise enough to read the XML or text declaration;
/// an encoding declaration may refine it afterwards.
pub fn detect_encoding(b4: &[u8]) -> EncodingInfo {
    match b4 {
        [0xFE, 0xFF, ..] => EncodingInfo::new("UTF-16BE", Some(true), 2),
        [0xFF, 0xFE, ..] => EncodingInfo::new("UTF-16LE", Some(false), 2),
        [0xEF, 0xBB, 0xBF, ..] => EncodingInfo::new("UTF-8", None, 3),
        [0x00, 0x00, 0x00, 0x3C, ..] => EncodingInfo::new("ISO-10646-UCS-4", Some(true), 0),
        [0x3C, 0x00, 0x00, 0x00, ..] => EncodingInfo::new("ISO-10646-UCS-4", Some(false), 0),
        // unusual octet orders 2143 and 3412
        [0x00, 0x00, 0x3C, 0x00, ..] | [0x00, 0x3C, 0x00, 0x00, ..] => {
            EncodingInfo::new("ISO-10646-UCS-4", None, 0)
        }
        [0x00, 0x3C, 0x00, 0x3F, ..] => EncodingInfo::new("UTF-16BE", Some(true), 0),
        [0x3C, 0x00, 0x3F, 0x00, ..] => EncodingInfo::new("UTF-16LE", Some(false), 0),
        [0x4C, 0x6F, 0xA7, 0x94, ..] => EncodingInfo::new("CP037", None, 0),
        _ => EncodingInfo::new("UTF-8", None, 0),
    }
}

/// Sniff the byte order of an externally declared UTF-16 entity.
///
/// Returns the byte order and the length of the byte order mark.
pub fn detect_utf16_byte_order(b4: &[u8]) -> (Option<bool>, usize) {
    match b4 {
        [0xFE, 0xFF, ..] => (Some(true), 2),
        [0xFF, 0xFE, ..] => (Some(false), 2),
        [0x00, 0x3C, 0x00, 0x3F, ..] => (Some(true), 0),
        [0x3C, 0x00, 0x3F, 0x00, ..] => (Some(false), 0),
        _ => (None, 0),
    }
}

/// Sniff the byte order of an externally declared UCS-4 or UCS-2 entity.
pub fn detect_ucs_byte_order(name: &str, b4: &[u8]) -> Option<bool> {
    if name == "ISO-10646-UCS-4" {
        match b4 {
            [0x00, 0x00, 0x00, 0x3C, ..] => Some(true),
            [0x3C, 0x00, 0x00, 0x00, ..] => Some(false),
            _ => None,
        }
    } else {
        match b4 {
            [0x00, 0x3C, ..] => Some(true),
            [0x3C, 0x00, ..] => Some(false),
            _ => None,
        }
    }
}

const ASCII_NAMES: &[&str] = &[
    "US-ASCII",
    "ASCII",
    "ANSI_X3.4-1968",
    "ANSI_X3.4-1986",
    "ISO646-US",
    "US",
    "IBM367",
    "CP367",
    "CSASCII",
    "ISO-IR-6",
];

const LATIN1_NAMES: &[&str] = &[
    "ISO-8859-1",
    "ISO_8859-1",
    "ISO8859-1",
    "LATIN1",
    "L1",
    "ISO-IR-100",
    "IBM819",
    "CP819",
    "CSISOLATIN1",
];

const CP037_NAMES: &[&str] = &["CP037", "EBCDIC-CP-US", "EBCDIC-CP-CA", "EBCDIC-CP-NL", "IBM037", "CSIBM037"];

/// Map a Java encoding name to its IANA name.
pub fn get_java_encoding_alias(name: &str) -> Option<Cow<'static, str>> {
    let upper = name.to_ascii_uppercase();
    let alias = match upper.as_str() {
        "UTF8" => "UTF-8",
        "UTF-16" | "UTF16" | "UNICODE" => "UTF-16",
        "UNICODEBIG" | "UNICODEBIGUNMARKED" => "UTF-16BE",
        "UNICODELITTLE" | "UNICODELITTLEUNMARKED" => "UTF-16LE",
        "ASCII" => "US-ASCII",
        "ISO8859_1" => "ISO-8859-1",
        "CP1252" => "WINDOWS-1252",
        "SJIS" => "SHIFT_JIS",
        "EUC_JP" => "EUC-JP",
        "EUC_KR" => "EUC-KR",
        "ISO2022JP" => "ISO-2022-JP",
        "BIG5" => "BIG5",
        "KOI8_R" => "KOI8-R",
        _ => {
            if let Some(num) = upper.strip_prefix("ISO8859_") {
                if !num.is_empty() && num.bytes().all(|b| b.is_ascii_digit()) {
                    return Some(Cow::Owned(format!("ISO-8859-{num}")));
                }
            }
            return None;
        }
    };
    Some(Cow::Borrowed(alias))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodingLookupError {
    /// UCS-4 or UCS-2 was requested but the byte order is not known.
    ByteOrderUnsupported,
    /// The name does not match the IANA encoding name production.
    InvalidName,
    /// The name is well-formed, but no decoder is known for it.
    Unsupported,
}

/// Find the decoder for an encoding name.
///
/// `big_endian` is the byte order sniffed from the entity, if any.
pub fn lookup_encoding(
    name: &str,
    big_endian: Option<bool>,
    allow_java_encodings: bool,
) -> Result<XmlCharEncoding, EncodingLookupError> {
    let upper = name.to_ascii_uppercase();
    match upper.as_str() {
        "UTF-8" => return Ok(XmlCharEncoding::UTF8),
        "UTF-16" if big_endian.is_some() => {
            return Ok(XmlCharEncoding::UTF16 {
                big_endian: big_endian == Some(true),
            });
        }
        "UTF-16BE" => return Ok(XmlCharEncoding::UTF16 { big_endian: true }),
        "UTF-16LE" => return Ok(XmlCharEncoding::UTF16 { big_endian: false }),
        "ISO-10646-UCS-4" => {
            return big_endian
                .map(|big_endian| XmlCharEncoding::UCS4 { big_endian })
                .ok_or(EncodingLookupError::ByteOrderUnsupported);
        }
        "ISO-10646-UCS-2" => {
            return big_endian
                .map(|big_endian| XmlCharEncoding::UCS2 { big_endian })
                .ok_or(EncodingLookupError::ByteOrderUnsupported);
        }
        _ => {}
    }

    if !is_valid_iana_encoding(name) {
        return Err(EncodingLookupError::InvalidName);
    }
    if let Some(found) = lookup_iana_name(&upper) {
        return Ok(found);
    }
    if allow_java_encodings {
        if let Some(alias) = get_java_encoding_alias(name) {
            if let Some(found) = lookup_iana_name(&alias) {
                return Ok(found);
            }
        }
    }
    Err(EncodingLookupError::Unsupported)
}

fn lookup_iana_name(upper: &str) -> Option<XmlCharEncoding> {
    if upper == "UTF-8" {
        Some(XmlCharEncoding::UTF8)
    } else if upper == "UTF-16" {
        // byte order is decided by the byte order mark, big endian without one
        Some(XmlCharEncoding::Other(UTF_16BE))
    } else if upper == "UTF-16BE" {
        Some(XmlCharEncoding::UTF16 { big_endian: true })
    } else if upper == "UTF-16LE" {
        Some(XmlCharEncoding::UTF16 { big_endian: false })
    } else if ASCII_NAMES.contains(&upper) {
        Some(XmlCharEncoding::ASCII)
    } else if LATIN1_NAMES.contains(&upper) {
        Some(XmlCharEncoding::ISO8859_1)
    } else if CP037_NAMES.contains(&upper) {
        Some(XmlCharEncoding::CP037)
    } else {
        Encoding::for_label(upper.as_bytes())
            .filter(|&encoding| encoding != REPLACEMENT)
            .map(XmlCharEncoding::Other)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncodingError {
    /// The input holds a byte sequence that is illegal in its encoding.
    ///
    /// `read` is the number of bytes consumed before the malformed sequence.
    Malformed {
        code: XmlScanErrors,
        args: Vec<String>,
        read: usize,
    },
    /// A decoder of `encoding_rs` rejected the input.
    Conversion {
        encoding: &'static str,
        read: usize,
    },
    Other {
        msg: Cow<'static, str>,
    },
}

impl EncodingError {
    fn malformed(code: XmlScanErrors, args: &[&dyn Display], read: usize) -> Self {
        Self::Malformed {
            code,
            args: args.iter().map(|arg| arg.to_string()).collect(),
            read,
        }
    }
}

impl Display for EncodingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Malformed { code, args, .. } => {
                let args = args.iter().map(|arg| arg.as_str()).collect::<Vec<_>>();
                write!(
                    f,
                    "{}",
                    crate::error::format_message(code.template(), &args)
                )
            }
            Self::Conversion { encoding, .. } => {
                write!(f, "malformed input for encoding {encoding}")
            }
            Self::Other { msg } => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for EncodingError {}

enum DecoderKind {
    Utf8,
    Utf16 { big_endian: bool },
    Ucs4 { big_endian: bool },
    Ucs2 { big_endian: bool },
    Ascii,
    Latin1,
    Cp037,
    Rs {
        decoder: Box<encoding_rs::Decoder>,
        pending: String,
        pending_pos: usize,
        malformed: bool,
        // `decoder` has seen the last input and must not be used again
        finished: bool,
    },
}

/// A stateful decoder from bytes to Unicode scalar values.
pub struct XmlDecoder {
    encoding: XmlCharEncoding,
    kind: DecoderKind,
}

impl XmlDecoder {
    pub fn encoding(&self) -> XmlCharEncoding {
        self.encoding
    }

    /// `true` if the decoder holds decoded characters not yet returned.
    pub fn has_pending(&self) -> bool {
        match &self.kind {
            DecoderKind::Rs {
                pending,
                pending_pos,
                ..
            } => *pending_pos < pending.len(),
            _ => false,
        }
    }

    /// Decode `src` into `dst`.
    ///
    /// Returns the number of bytes consumed and characters written. An
    /// incomplete sequence at the end of `src` is left unconsumed unless
    /// `last` is set, in which case it is an error.
    pub fn decode(
        &mut self,
        src: &[u8],
        dst: &mut [char],
        last: bool,
    ) -> Result<(usize, usize), EncodingError> {
        match &mut self.kind {
            DecoderKind::Utf8 => decode_utf8(src, dst, last),
            DecoderKind::Utf16 { big_endian } => decode_utf16(src, dst, last, *big_endian),
            DecoderKind::Ucs4 { big_endian } => decode_ucs4(src, dst, last, *big_endian),
            DecoderKind::Ucs2 { big_endian } => decode_ucs2(src, dst, last, *big_endian),
            DecoderKind::Ascii => {
                let len = src.len().min(dst.len());
                for (i, (&b, out)) in src[..len].iter().zip(dst.iter_mut()).enumerate() {
                    if b >= 0x80 {
                        return Err(EncodingError::malformed(
                            XmlScanErrors::XmlErrInvalidASCII,
                            &[&b],
                            i,
                        ));
                    }
                    *out = b as char;
                }
                Ok((len, len))
            }
            DecoderKind::Latin1 => {
                let len = src.len().min(dst.len());
                for (&b, out) in src[..len].iter().zip(dst.iter_mut()) {
                    *out = b as char;
                }
                Ok((len, len))
            }
            DecoderKind::Cp037 => {
                let len = src.len().min(dst.len());
                for (&b, out) in src[..len].iter().zip(dst.iter_mut()) {
                    *out = CP037_TABLE[b as usize];
                }
                Ok((len, len))
            }
            DecoderKind::Rs {
                decoder,
                pending,
                pending_pos,
                malformed,
                finished,
            } => {
                let mut read = 0;
                if *pending_pos >= pending.len() {
                    if *malformed {
                        return Err(EncodingError::Conversion {
                            encoding: self.encoding.get_name(),
                            read: 0,
                        });
                    }
                    if *finished {
                        return Ok((0, 0));
                    }
                    let needed = decoder
                        .max_utf8_buffer_length_without_replacement(src.len())
                        .unwrap_or(src.len() * 3 + 16);
                    let mut out = String::with_capacity(needed);
                    let (result, r) = decoder.decode_to_string_without_replacement(src, &mut out, last);
                    read = r;
                    *finished = last && matches!(result, DecoderResult::InputEmpty);
                    if let DecoderResult::Malformed(_, _) = result {
                        if out.is_empty() {
                            return Err(EncodingError::Conversion {
                                encoding: self.encoding.get_name(),
                                read,
                            });
                        }
                        // deliver what was decoded, fail on the next call
                        *malformed = true;
                    }
                    *pending = out;
                    *pending_pos = 0;
                }
                let mut written = 0;
                for c in pending[*pending_pos..].chars() {
                    if written == dst.len() {
                        break;
                    }
                    dst[written] = c;
                    written += 1;
                    *pending_pos += c.len_utf8();
                }
                Ok((read, written))
            }
        }
    }
}

fn invalid_byte(position: usize, count: usize, read: usize) -> EncodingError {
    EncodingError::malformed(XmlScanErrors::XmlErrInvalidByte, &[&position, &count], read)
}

fn expected_byte(position: usize, count: usize, read: usize) -> EncodingError {
    EncodingError::malformed(XmlScanErrors::XmlErrExpectedByte, &[&position, &count], read)
}

fn decode_utf8(src: &[u8], dst: &mut [char], last: bool) -> Result<(usize, usize), EncodingError> {
    let mut read = 0;
    let mut written = 0;
    while read < src.len() && written < dst.len() {
        let b0 = src[read];
        if b0 < 0x80 {
            dst[written] = b0 as char;
            read += 1;
            written += 1;
            continue;
        }
        let count = match b0 {
            0xC0..=0xDF => 2,
            0xE0..=0xEF => 3,
            0xF0..=0xF7 => 4,
            _ => return Err(invalid_byte(1, 1, read)),
        };
        let rest = &src[read..];
        // check every continuation byte present, even if the sequence is incomplete
        for i in 1..count {
            let Some(&b) = rest.get(i) else {
                if last {
                    return Err(expected_byte(i + 1, count, read));
                }
                return Ok((read, written));
            };
            if b & 0xC0 != 0x80 {
                return Err(invalid_byte(i + 1, count, read));
            }
            let overlong_or_surrogate = i == 1
                && match count {
                    2 => b0 & 0x1E == 0,
                    3 => (b0 & 0x0F == 0 && b & 0x20 == 0) || (b0 == 0xED && b >= 0xA0),
                    _ => b0 & 0x07 == 0 && b & 0x30 == 0,
                };
            if overlong_or_surrogate {
                return Err(invalid_byte(if count == 2 { 1 } else { 2 }, count, read));
            }
        }
        let code = match count {
            2 => ((b0 as u32 & 0x1F) << 6) | (rest[1] as u32 & 0x3F),
            3 => ((b0 as u32 & 0x0F) << 12) | ((rest[1] as u32 & 0x3F) << 6) | (rest[2] as u32 & 0x3F),
            _ => {
                let uuuuu = ((b0 as u32 & 0x07) << 2) | ((rest[1] as u32 & 0x30) >> 4);
                if uuuuu > 0x10 {
                    return Err(EncodingError::malformed(
                        XmlScanErrors::XmlErrInvalidHighSurrogate,
                        &[&format!("{uuuuu:X}")],
                        read,
                    ));
                }
                ((b0 as u32 & 0x07) << 18)
                    | ((rest[1] as u32 & 0x3F) << 12)
                    | ((rest[2] as u32 & 0x3F) << 6)
                    | (rest[3] as u32 & 0x3F)
            }
        };
        let Some(c) = char::from_u32(code) else {
            return Err(invalid_code_point(code, "UTF-8", read));
        };
        dst[written] = c;
        read += count;
        written += 1;
    }
    Ok((read, written))
}

fn invalid_code_point(code: u32, encoding: &str, read: usize) -> EncodingError {
    EncodingError::malformed(
        XmlScanErrors::XmlErrInvalidCodePoint,
        &[&format!("{code:X}"), &encoding],
        read,
    )
}

fn read_u16(bytes: &[u8], big_endian: bool) -> u16 {
    if big_endian {
        u16::from_be_bytes([bytes[0], bytes[1]])
    } else {
        u16::from_le_bytes([bytes[0], bytes[1]])
    }
}

fn decode_utf16(
    src: &[u8],
    dst: &mut [char],
    last: bool,
    big_endian: bool,
) -> Result<(usize, usize), EncodingError> {
    let mut read = 0;
    let mut written = 0;
    while written < dst.len() && src.len() - read >= 2 {
        let unit = read_u16(&src[read..], big_endian);
        let (code, len) = match unit {
            0xD800..=0xDBFF => {
                if src.len() - read < 4 {
                    if last {
                        return Err(invalid_code_point(unit as u32, "UTF-16", read));
                    }
                    break;
                }
                let low = read_u16(&src[read + 2..], big_endian);
                if !(0xDC00..=0xDFFF).contains(&low) {
                    return Err(invalid_code_point(unit as u32, "UTF-16", read));
                }
                (
                    0x10000 + (((unit as u32) - 0xD800) << 10) + ((low as u32) - 0xDC00),
                    4,
                )
            }
            0xDC00..=0xDFFF => return Err(invalid_code_point(unit as u32, "UTF-16", read)),
            unit => (unit as u32, 2),
        };
        let Some(c) = char::from_u32(code) else {
            return Err(invalid_code_point(code, "UTF-16", read));
        };
        dst[written] = c;
        written += 1;
        read += len;
    }
    if last && written < dst.len() && src.len() - read == 1 {
        return Err(expected_byte(2, 2, read));
    }
    Ok((read, written))
}

fn decode_ucs4(
    src: &[u8],
    dst: &mut [char],
    last: bool,
    big_endian: bool,
) -> Result<(usize, usize), EncodingError> {
    let mut read = 0;
    let mut written = 0;
    while written < dst.len() && src.len() - read >= 4 {
        let bytes = [src[read], src[read + 1], src[read + 2], src[read + 3]];
        let code = if big_endian {
            u32::from_be_bytes(bytes)
        } else {
            u32::from_le_bytes(bytes)
        };
        let Some(c) = char::from_u32(code) else {
            return Err(invalid_code_point(code, "ISO-10646-UCS-4", read));
        };
        dst[written] = c;
        written += 1;
        read += 4;
    }
    let rem = src.len() - read;
    if last && written < dst.len() && rem > 0 {
        return Err(expected_byte(rem + 1, 4, read));
    }
    Ok((read, written))
}

fn decode_ucs2(
    src: &[u8],
    dst: &mut [char],
    last: bool,
    big_endian: bool,
) -> Result<(usize, usize), EncodingError> {
    let mut read = 0;
    let mut written = 0;
    while written < dst.len() && src.len() - read >= 2 {
        let code = read_u16(&src[read..], big_endian) as u32;
        let Some(c) = char::from_u32(code) else {
            return Err(invalid_code_point(code, "ISO-10646-UCS-2", read));
        };
        dst[written] = c;
        written += 1;
        read += 2;
    }
    if last && written < dst.len() && src.len() - read == 1 {
        return Err(expected_byte(2, 2, read));
    }
    Ok((read, written))
}

const CP037_TABLE: [char; 256] = [
    '\u{0000}', '\u{0001}', '\u{0002}', '\u{0003}', '\u{009C}', '\u{0009}', '\u{0086}', '\u{007F}',
    '\u{0097}', '\u{008D}', '\u{008E}', '\u{000B}', '\u{000C}', '\u{000D}', '\u{000E}', '\u{000F}',
    '\u{0010}', '\u{0011}', '\u{0012}', '\u{0013}', '\u{009D}', '\u{0085}', '\u{0008}', '\u{0087}',
    '\u{0018}', '\u{0019}', '\u{0092}', '\u{008F}', '\u{001C}', '\u{001D}', '\u{001E}', '\u{001F}',
    '\u{0080}', '\u{0081}', '\u{0082}', '\u{0083}', '\u{0084}', '\u{000A}', '\u{0017}', '\u{001B}',
    '\u{0088}', '\u{0089}', '\u{008A}', '\u{008B}', '\u{008C}', '\u{0005}', '\u{0006}', '\u{0007}',
    '\u{0090}', '\u{0091}', '\u{0016}', '\u{0093}', '\u{0094}', '\u{0095}', '\u{0096}', '\u{0004}',
    '\u{0098}', '\u{0099}', '\u{009A}', '\u{009B}', '\u{0014}', '\u{0015}', '\u{009E}', '\u{001A}',
    '\u{0020}', '\u{00A0}', '\u{00E2}', '\u{00E4}', '\u{00E0}', '\u{00E1}', '\u{00E3}', '\u{00E5}',
    '\u{00E7}', '\u{00F1}', '\u{00A2}', '\u{002E}', '\u{003C}', '\u{0028}', '\u{002B}', '\u{007C}',
    '\u{0026}', '\u{00E9}', '\u{00EA}', '\u{00EB}', '\u{00E8}', '\u{00ED}', '\u{00EE}', '\u{00EF}',
    '\u{00EC}', '\u{00DF}', '\u{0021}', '\u{0024}', '\u{002A}', '\u{0029}', '\u{003B}', '\u{00AC}',
    '\u{002D}', '\u{002F}', '\u{00C2}', '\u{00C4}', '\u{00C0}', '\u{00C1}', '\u{00C3}', '\u{00C5}',
    '\u{00C7}', '\u{00D1}', '\u{00A6}', '\u{002C}', '\u{0025}', '\u{005F}', '\u{003E}', '\u{003F}',
    '\u{00F8}', '\u{00C9}', '\u{00CA}', '\u{00CB}', '\u{00C8}', '\u{00CD}', '\u{00CE}', '\u{00CF}',
    '\u{00CC}', '\u{0060}', '\u{003A}', '\u{0023}', '\u{0040}', '\u{0027}', '\u{003D}', '\u{0022}',
    '\u{00D8}', '\u{0061}', '\u{0062}', '\u{0063}', '\u{0064}', '\u{0065}', '\u{0066}', '\u{0067}',
    '\u{0068}', '\u{0069}', '\u{00AB}', '\u{00BB}', '\u{00F0}', '\u{00FD}', '\u{00FE}', '\u{00B1}',
    '\u{00B0}', '\u{006A}', '\u{006B}', '\u{006C}', '\u{006D}', '\u{006E}', '\u{006F}', '\u{0070}',
    '\u{0071}', '\u{0072}', '\u{00AA}', '\u{00BA}', '\u{00E6}', '\u{00B8}', '\u{00C6}', '\u{00A4}',
    '\u{00B5}', '\u{007E}', '\u{0073}', '\u{0074}', '\u{0075}', '\u{0076}', '\u{0077}', '\u{0078}',
    '\u{0079}', '\u{007A}', '\u{00A1}', '\u{00BF}', '\u{00D0}', '\u{00DD}', '\u{00DE}', '\u{00AE}',
    '\u{005E}', '\u{00A3}', '\u{00A5}', '\u{00B7}', '\u{00A9}', '\u{00A7}', '\u{00B6}', '\u{00BC}',
    '\u{00BD}', '\u{00BE}', '\u{005B}', '\u{005D}', '\u{00AF}', '\u{00A8}', '\u{00B4}', '\u{00D7}',
    '\u{007B}', '\u{0041}', '\u{0042}', '\u{0043}', '\u{0044}', '\u{0045}', '\u{0046}', '\u{0047}',
    '\u{0048}', '\u{0049}', '\u{00AD}', '\u{00F4}', '\u{00F6}', '\u{00F2}', '\u{00F3}', '\u{00F5}',
    '\u{007D}', '\u{004A}', '\u{004B}', '\u{004C}', '\u{004D}', '\u{004E}', '\u{004F}', '\u{0050}',
    '\u{0051}', '\u{0052}', '\u{00B9}', '\u{00FB}', '\u{00FC}', '\u{00F9}', '\u{00FA}', '\u{00FF}',
    '\u{005C}', '\u{00F7}', '\u{0053}', '\u{0054}', '\u{0055}', '\u{0056}', '\u{0057}', '\u{0058}',
    '\u{0059}', '\u{005A}', '\u{00B2}', '\u{00D4}', '\u{00D6}', '\u{00D2}', '\u{00D3}', '\u{00D5}',
    '\u{0030}', '\u{0031}', '\u{0032}', '\u{0033}', '\u{0034}', '\u{0035}', '\u{0036}', '\u{0037}',
    '\u{0038}', '\u{0039}', '\u{00B3}', '\u{00DB}', '\u{00DC}', '\u{00D9}', '\u{00DA}', '\u{009F}',
];
