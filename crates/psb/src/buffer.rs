//! Byte buffer primitives: a refcounted read slice with an advancing
//! prefix, and a growable write buffer.
//!
//! [`ByteSlice`] is the input side: cloning is cheap, sub-slices share
//! the backing storage, and prefix removal is O(1). Multiple readers
//! over disjoint slices of the same storage can coexist because the
//! storage is immutable. [`ByteStream`] is the output side and can be
//! frozen into a [`ByteSlice`] without copying.

use bytes::{Buf, BufMut, Bytes, BytesMut};

/// Immutable, refcounted byte slice with O(1) prefix removal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ByteSlice {
    inner: Bytes,
}

impl ByteSlice {
    /// Creates an empty slice.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of bytes left in the slice.
    #[inline]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// True when no bytes are left.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// View of the remaining bytes.
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.inner
    }

    /// Removes up to `n` bytes from the front, returning how many were
    /// actually removed. A short count means the slice ran out.
    #[inline]
    pub fn advance(&mut self, n: usize) -> usize {
        let n = n.min(self.inner.len());
        self.inner.advance(n);
        n
    }

    /// Removes exactly `n` bytes from the front and returns them as a
    /// slice sharing the same backing storage, or `None` if fewer than
    /// `n` bytes remain. No bytes are consumed on failure.
    #[inline]
    pub fn take_slice(&mut self, n: usize) -> Option<ByteSlice> {
        if n <= self.inner.len() {
            Some(ByteSlice {
                inner: self.inner.split_to(n),
            })
        } else {
            None
        }
    }

    /// Copies the remaining bytes into a fresh vector.
    pub fn to_vec(&self) -> Vec<u8> {
        self.inner.to_vec()
    }
}

impl From<Bytes> for ByteSlice {
    fn from(inner: Bytes) -> Self {
        ByteSlice { inner }
    }
}

impl From<Vec<u8>> for ByteSlice {
    fn from(v: Vec<u8>) -> Self {
        ByteSlice {
            inner: Bytes::from(v),
        }
    }
}

impl From<&[u8]> for ByteSlice {
    fn from(v: &[u8]) -> Self {
        ByteSlice {
            inner: Bytes::copy_from_slice(v),
        }
    }
}

impl<const N: usize> From<[u8; N]> for ByteSlice {
    fn from(v: [u8; N]) -> Self {
        ByteSlice {
            inner: Bytes::copy_from_slice(&v),
        }
    }
}

impl AsRef<[u8]> for ByteSlice {
    fn as_ref(&self) -> &[u8] {
        self.as_slice()
    }
}

impl std::ops::Deref for ByteSlice {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.as_slice()
    }
}

impl PartialEq<[u8]> for ByteSlice {
    fn eq(&self, other: &[u8]) -> bool {
        self.as_slice() == other
    }
}

impl PartialEq<&[u8]> for ByteSlice {
    fn eq(&self, other: &&[u8]) -> bool {
        self.as_slice() == *other
    }
}

/// Growable, appendable byte buffer.
#[derive(Debug, Default)]
pub struct ByteStream {
    buf: BytesMut,
}

impl ByteStream {
    /// Creates an empty stream.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a stream with `capacity` bytes pre-allocated.
    pub fn with_capacity(capacity: usize) -> Self {
        ByteStream {
            buf: BytesMut::with_capacity(capacity),
        }
    }

    /// Ensures room for at least `additional` more bytes.
    #[inline]
    pub fn reserve(&mut self, additional: usize) {
        self.buf.reserve(additional);
    }

    /// Appends one byte.
    #[inline]
    pub fn put_u8(&mut self, byte: u8) {
        self.buf.put_u8(byte);
    }

    /// Appends a run of bytes.
    #[inline]
    pub fn write(&mut self, bytes: &[u8]) {
        self.buf.put_slice(bytes);
    }

    /// Number of bytes written so far.
    #[inline]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// True when nothing has been written.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// View of the bytes written so far.
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    /// Detaches the written bytes as an immutable [`ByteSlice`],
    /// leaving this stream empty but with its capacity intact.
    pub fn take(&mut self) -> ByteSlice {
        ByteSlice {
            inner: self.buf.split().freeze(),
        }
    }

    /// Consumes the stream, converting it into a [`ByteSlice`].
    pub fn freeze(self) -> ByteSlice {
        ByteSlice {
            inner: self.buf.freeze(),
        }
    }
}
