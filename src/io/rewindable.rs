use std::io::{self, ErrorKind, Read};

use crate::config::DEFAULT_XMLDECL_BUFFER_SIZE;

/// A byte stream that remembers what has been read so far, so that it can
/// be read again from the start.
///
/// Until chunks may be read, every byte is buffered and handed out one at a
/// time, which keeps readers from decoding past the XML or text declaration
/// with a guessed encoding. Once [`set_may_read_chunks`] has been called,
/// buffered bytes are drained and the inner stream is read directly.
///
/// [`set_may_read_chunks`]: RewindableInputStream::set_may_read_chunks
pub struct RewindableInputStream {
    inner: Box<dyn Read>,
    data: Vec<u8>,
    start_offset: usize,
    end_offset: Option<usize>,
    offset: usize,
    mark: usize,
    may_read_chunks: bool,
}

impl RewindableInputStream {
    pub fn new(inner: Box<dyn Read>) -> Self {
        Self {
            inner,
            data: Vec::with_capacity(DEFAULT_XMLDECL_BUFFER_SIZE),
            start_offset: 0,
            end_offset: None,
            offset: 0,
            mark: 0,
            may_read_chunks: false,
        }
    }

    /// Set the position [`rewind`](Self::rewind) goes back to.
    pub fn set_start_offset(&mut self, offset: usize) {
        self.start_offset = offset;
    }

    pub fn rewind(&mut self) {
        self.offset = self.start_offset;
    }

    pub fn mark(&mut self) {
        self.mark = self.offset;
    }

    pub fn reset(&mut self) {
        self.offset = self.mark;
    }

    pub fn may_read_chunks(&self) -> bool {
        self.may_read_chunks
    }

    pub fn set_may_read_chunks(&mut self, may_read_chunks: bool) {
        self.may_read_chunks = may_read_chunks;
    }

    fn read_inner_byte(&mut self) -> io::Result<Option<u8>> {
        let mut byte = [0];
        loop {
            match self.inner.read(&mut byte) {
                Ok(0) => return Ok(None),
                Ok(_) => return Ok(Some(byte[0])),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }

    /// Read one byte from the inner stream and keep it for rewinding.
    pub fn read_and_buffer(&mut self) -> io::Result<Option<u8>> {
        if self.offset < self.data.len() {
            let byte = self.data[self.offset];
            self.offset += 1;
            return Ok(Some(byte));
        }
        if self.end_offset == Some(self.offset) {
            return Ok(None);
        }
        match self.read_inner_byte()? {
            Some(byte) => {
                self.data.push(byte);
                self.offset += 1;
                Ok(Some(byte))
            }
            None => {
                self.end_offset = Some(self.offset);
                Ok(None)
            }
        }
    }

    /// Read the next byte.
    pub fn read_byte(&mut self) -> io::Result<Option<u8>> {
        if self.offset < self.data.len() {
            let byte = self.data[self.offset];
            self.offset += 1;
            return Ok(Some(byte));
        }
        if self.end_offset == Some(self.offset) {
            return Ok(None);
        }
        if self.may_read_chunks {
            return self.read_inner_byte();
        }
        self.read_and_buffer()
    }

    /// Push `bytes` back so that they are read again next.
    ///
    /// `bytes` must be the bytes most recently read from this stream.
    pub fn unread(&mut self, bytes: &[u8]) {
        let len = bytes.len();
        if len == 0 {
            return;
        }
        if self.offset >= len && self.data[self.offset - len..self.offset] == *bytes {
            self.offset -= len;
            return;
        }
        self.data
            .splice(self.offset..self.offset, bytes.iter().copied());
        if let Some(end) = self.end_offset.as_mut() {
            *end += len;
        }
    }

    /// Close the inner stream by replacing it with an empty one.
    pub fn close(&mut self) {
        self.inner = Box::new(io::empty());
        self.end_offset = Some(self.data.len());
    }
}

impl Read for RewindableInputStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        let bytes_left = self.data.len() - self.offset;
        if bytes_left == 0 {
            if self.end_offset == Some(self.offset) {
                return Ok(0);
            }
            if self.may_read_chunks {
                return self.inner.read(buf);
            }
            return match self.read_and_buffer()? {
                Some(byte) => {
                    buf[0] = byte;
                    Ok(1)
                }
                None => Ok(0),
            };
        }
        let len = buf.len().min(bytes_left);
        buf[..len].copy_from_slice(&self.data[self.offset..self.offset + len]);
        self.offset += len;
        Ok(len)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn rewind_after_sniffing() {
        let mut stream = RewindableInputStream::new(Box::new(Cursor::new(b"\xEF\xBB\xBF<a/>".to_vec())));
        let mut b4 = vec![];
        for _ in 0..4 {
            b4.extend(stream.read_and_buffer().unwrap());
        }
        assert_eq!(b4, b"\xEF\xBB\xBF<");
        stream.set_start_offset(3);
        stream.rewind();

        let mut buf = [0; 16];
        // buffered bytes first, then one byte at a time
        assert_eq!(stream.read(&mut buf).unwrap(), 1);
        assert_eq!(buf[0], b'<');
        assert_eq!(stream.read(&mut buf).unwrap(), 1);
        assert_eq!(buf[0], b'a');

        stream.set_may_read_chunks(true);
        assert_eq!(stream.read(&mut buf).unwrap(), 2);
        assert_eq!(&buf[..2], b"/>");
        assert_eq!(stream.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn unread_bytes() {
        let mut stream = RewindableInputStream::new(Box::new(Cursor::new(b"abcdef".to_vec())));
        stream.set_may_read_chunks(true);
        let mut buf = [0; 4];
        assert_eq!(stream.read(&mut buf).unwrap(), 4);
        stream.unread(b"cd");
        let mut rest = vec![];
        stream.read_to_end(&mut rest).unwrap();
        assert_eq!(rest, b"cdef");

        let mut stream = RewindableInputStream::new(Box::new(Cursor::new(b"xyz".to_vec())));
        assert_eq!(stream.read_byte().unwrap(), Some(b'x'));
        assert_eq!(stream.read_byte().unwrap(), Some(b'y'));
        stream.unread(b"y");
        assert_eq!(stream.read_byte().unwrap(), Some(b'y'));
        assert_eq!(stream.read_byte().unwrap(), Some(b'z'));
        assert_eq!(stream.read_byte().unwrap(), None);
        stream.mark();
        assert_eq!(stream.read_byte().unwrap(), None);
    }
}
