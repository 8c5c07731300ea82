//! Reusable buffers.
//!
//! Every entity needs a character buffer and, when it is read from bytes, a
//! byte buffer. Buffers are recycled per entity manager, so that documents
//! with many entity references do not allocate for each of them.

/// The number of buffers kept per size.
pub const DEFAULT_POOL_SIZE: usize = 3;

#[derive(Debug)]
pub struct ByteBufferPool {
    pool_size: usize,
    small_size: usize,
    large_size: usize,
    small: Vec<Vec<u8>>,
    large: Vec<Vec<u8>>,
}

impl ByteBufferPool {
    /// Small buffers hold `buffer_size` bytes, large ones twice as many.
    pub fn new(pool_size: usize, buffer_size: usize) -> Self {
        Self {
            pool_size,
            small_size: buffer_size,
            large_size: buffer_size << 1,
            small: Vec::with_capacity(pool_size),
            large: Vec::with_capacity(pool_size),
        }
    }

    pub fn get_buffer(&mut self, large: bool) -> Vec<u8> {
        if large {
            self.large.pop().unwrap_or_else(|| vec![0; self.large_size])
        } else {
            self.small.pop().unwrap_or_else(|| vec![0; self.small_size])
        }
    }

    /// Keep `buffer` for reuse. Buffers of a foreign size or beyond the pool
    /// capacity are dropped.
    pub fn return_buffer(&mut self, buffer: Vec<u8>) {
        let pool = if buffer.len() == self.small_size {
            &mut self.small
        } else if buffer.len() == self.large_size {
            &mut self.large
        } else {
            return;
        };
        if pool.len() < self.pool_size {
            pool.push(buffer);
        }
    }

    /// Change the buffer size. Pooled buffers are discarded.
    pub fn set_buffer_size(&mut self, buffer_size: usize) {
        self.small_size = buffer_size;
        self.large_size = buffer_size << 1;
        self.small.clear();
        self.large.clear();
    }
}

#[derive(Debug)]
pub struct CharacterBufferPool {
    pool_size: usize,
    external_size: usize,
    internal_size: usize,
    external: Vec<Vec<char>>,
    internal: Vec<Vec<char>>,
}

impl CharacterBufferPool {
    pub fn new(pool_size: usize, external_size: usize, internal_size: usize) -> Self {
        Self {
            pool_size,
            external_size,
            internal_size,
            external: Vec::with_capacity(pool_size),
            internal: Vec::with_capacity(pool_size),
        }
    }

    pub fn get_buffer(&mut self, external: bool) -> Vec<char> {
        if external {
            self.external
                .pop()
                .unwrap_or_else(|| vec!['\0'; self.external_size])
        } else {
            self.internal
                .pop()
                .unwrap_or_else(|| vec!['\0'; self.internal_size])
        }
    }

    /// Keep `buffer` for reuse. A buffer that has grown while scanning a long
    /// token is dropped.
    pub fn return_buffer(&mut self, buffer: Vec<char>, external: bool) {
        let (pool, size) = if external {
            (&mut self.external, self.external_size)
        } else {
            (&mut self.internal, self.internal_size)
        };
        if buffer.len() == size && pool.len() < self.pool_size {
            pool.push(buffer);
        }
    }

    pub fn set_external_buffer_size(&mut self, external_size: usize) {
        self.external_size = external_size;
        self.external.clear();
    }
}
