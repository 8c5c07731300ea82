use std::io::{self, ErrorKind, Read};

use crate::{
    encoding::{XmlCharEncoding, XmlDecoder},
    error::XmlScanError,
};

use super::RewindableInputStream;

/// A source of characters for one entity.
pub trait XmlCharReader {
    /// Read characters into `buf`.
    ///
    /// Returns `0` at the end of the input. Otherwise at least one character
    /// is read.
    fn read(&mut self, buf: &mut [char]) -> Result<usize, XmlScanError>;

    /// The encoding this reader decodes, or `None` for character sources.
    fn encoding(&self) -> Option<XmlCharEncoding> {
        None
    }

    fn set_may_read_chunks(&mut self, _may_read_chunks: bool) {}

    fn close(&mut self) -> io::Result<()> {
        Ok(())
    }

    /// Give the byte buffer back, so that it can be reused.
    fn take_byte_buffer(&mut self) -> Option<Vec<u8>> {
        None
    }

    /// Turn the reader back into its byte stream, with the bytes not yet
    /// decoded pushed back.
    ///
    /// Returns `None` if the reader does not read from a byte stream.
    fn into_byte_stream(self: Box<Self>) -> Option<RewindableInputStream>;
}

/// Reads the characters of a string, typically the replacement text of an
/// internal entity.
pub struct StringReader {
    chars: Vec<char>,
    pos: usize,
}

impl StringReader {
    pub fn new(text: &str) -> Self {
        Self {
            chars: text.chars().collect(),
            pos: 0,
        }
    }
}

impl XmlCharReader for StringReader {
    fn read(&mut self, buf: &mut [char]) -> Result<usize, XmlScanError> {
        let len = buf.len().min(self.chars.len() - self.pos);
        buf[..len].copy_from_slice(&self.chars[self.pos..self.pos + len]);
        self.pos += len;
        Ok(len)
    }

    fn into_byte_stream(self: Box<Self>) -> Option<RewindableInputStream> {
        None
    }
}

/// Decodes a byte stream with an [`XmlDecoder`].
pub struct DecodingReader {
    stream: RewindableInputStream,
    decoder: XmlDecoder,
    bytes: Vec<u8>,
    start: usize,
    end: usize,
    eof: bool,
}

impl DecodingReader {
    /// Create a reader decoding `stream` as `encoding` through the byte buffer `bytes`.
    pub fn new(stream: RewindableInputStream, encoding: XmlCharEncoding, mut bytes: Vec<u8>) -> Self {
        let min = encoding.min_bytes_per_char().max(4);
        if bytes.len() < min {
            bytes.resize(min, 0);
        }
        Self {
            stream,
            decoder: encoding.decoder(),
            bytes,
            start: 0,
            end: 0,
            eof: false,
        }
    }

    fn fill(&mut self, chars_wanted: usize) -> io::Result<()> {
        if self.start > 0 {
            self.bytes.copy_within(self.start..self.end, 0);
            self.end -= self.start;
            self.start = 0;
        }
        if self.end == self.bytes.len() {
            let len = self.bytes.len();
            self.bytes.resize(len << 1, 0);
        }
        let bpc = self.decoder.encoding().min_bytes_per_char();
        let want = (chars_wanted * bpc).clamp(1, self.bytes.len() - self.end);
        loop {
            match self.stream.read(&mut self.bytes[self.end..self.end + want]) {
                Ok(0) => {
                    self.eof = true;
                    return Ok(());
                }
                Ok(n) => {
                    self.end += n;
                    return Ok(());
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }
}

impl XmlCharReader for DecodingReader {
    fn read(&mut self, buf: &mut [char]) -> Result<usize, XmlScanError> {
        if buf.is_empty() {
            return Ok(0);
        }
        loop {
            if self.start < self.end || self.eof || self.decoder.has_pending() {
                let (read, written) =
                    self.decoder
                        .decode(&self.bytes[self.start..self.end], buf, self.eof)?;
                self.start += read;
                if written > 0 {
                    return Ok(written);
                }
                if self.eof {
                    return Ok(0);
                }
            }
            self.fill(buf.len())?;
        }
    }

    fn encoding(&self) -> Option<XmlCharEncoding> {
        Some(self.decoder.encoding())
    }

    fn set_may_read_chunks(&mut self, may_read_chunks: bool) {
        self.stream.set_may_read_chunks(may_read_chunks);
    }

    fn close(&mut self) -> io::Result<()> {
        self.stream.close();
        Ok(())
    }

    fn take_byte_buffer(&mut self) -> Option<Vec<u8>> {
        self.start = 0;
        self.end = 0;
        Some(std::mem::take(&mut self.bytes))
    }

    fn into_byte_stream(self: Box<Self>) -> Option<RewindableInputStream> {
        let mut stream = self.stream;
        stream.unread(&self.bytes[self.start..self.end]);
        Some(stream)
    }
}
