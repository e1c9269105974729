//! Pull-style decoder for portable storage bytes.
//!
//! A [`Reader`] advances a cursor through one storage block and exposes
//! a typed pull API, DOM-less: no intermediate tree is built. The
//! engine keeps three pieces of state beyond the cursor: the last type
//! tag seen, the recursion depth, and the array space accumulator that
//! bounds how many element bytes all still-open arrays may claim.
//!
//! A reader is single use: after any error its state is unspecified and
//! it must be discarded.

use crate::buffer::ByteSlice;
use crate::error::DecodeError;
use crate::limits::{FORMAT_VERSION, MAX_READ_DEPTH, SIGNATURE_A, SIGNATURE_B};
use crate::tag::{
    Tag, ARRAY_FLAG, RAW_SIZE_MARK_BYTE, RAW_SIZE_MARK_DWORD, RAW_SIZE_MARK_MASK,
    RAW_SIZE_MARK_WORD,
};

/// One in-flight container while skipping an unknown value.
#[derive(Debug, Clone, Copy)]
enum SkipFrame {
    /// Array with `remaining` elements of type `elem` left to walk.
    Array { remaining: usize, elem: u8 },
    /// Object with `remaining` fields left to walk.
    Object { remaining: usize },
}

/// Streaming reader over one storage block.
#[derive(Debug)]
pub struct Reader {
    remaining: ByteSlice,
    skip_stack: Vec<SkipFrame>,
    /// Budget for element bytes of all arrays whose headers have been
    /// accepted but whose bodies are still pending. Prevents sibling
    /// arrays from collectively over-claiming the buffer.
    array_space: usize,
    /// Last type tag read; the root is implicitly an object.
    last_tag: u8,
    depth: usize,
}

impl Reader {
    /// Opens a storage block, consuming and validating its header.
    pub fn new(source: impl Into<ByteSlice>) -> Result<Reader, DecodeError> {
        let source = source.into();
        let mut reader = Reader {
            array_space: source.len(),
            remaining: source,
            skip_stack: Vec::new(),
            last_tag: Tag::Object as u8,
            depth: 0,
        };

        let sig_a = u32::from_le_bytes(reader.read_fixed("storage signature")?);
        let sig_b = u32::from_le_bytes(reader.read_fixed("storage signature")?);
        if sig_a != SIGNATURE_A || sig_b != SIGNATURE_B {
            return Err(DecodeError::Signature);
        }
        let version = reader.read_fixed::<1>("storage version")?[0];
        if version != FORMAT_VERSION {
            return Err(DecodeError::Version { version });
        }
        Ok(reader)
    }

    /// Current nesting of open objects and arrays.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Last type tag byte read.
    pub fn last_tag(&self) -> u8 {
        self.last_tag
    }

    /// Unprocessed bytes.
    pub fn remaining(&self) -> &ByteSlice {
        &self.remaining
    }

    /// Verifies the traversal consumed a complete object tree. Extra
    /// bytes after the root object are not an error.
    pub fn check_complete(&self) -> Result<(), DecodeError> {
        if self.depth != 0 || self.last_tag != Tag::Object as u8 {
            return Err(DecodeError::Incomplete);
        }
        Ok(())
    }

    // =========================================================================
    // PRIMITIVES
    // =========================================================================

    /// Reads `N` bytes, failing with the given context on truncation.
    #[inline]
    fn read_fixed<const N: usize>(
        &mut self,
        context: &'static str,
    ) -> Result<[u8; N], DecodeError> {
        let available = self.remaining.as_slice();
        if available.len() < N {
            return Err(DecodeError::NotEnoughBytes { context });
        }
        let mut out = [0u8; N];
        out.copy_from_slice(&available[..N]);
        self.remaining.advance(N);
        Ok(out)
    }

    #[inline]
    fn read_tag(&mut self) -> Result<u8, DecodeError> {
        Ok(self.read_fixed::<1>("type tag")?[0])
    }

    /// Reads a varint of any of the four widths. The low two bits of
    /// the first byte select the width; the remaining bits carry the
    /// value.
    fn read_varint(&mut self) -> Result<usize, DecodeError> {
        let first = match self.remaining.as_slice().first() {
            Some(&b) => b,
            None => return Err(DecodeError::NotEnoughBytes { context: "varint" }),
        };
        let raw = match first & RAW_SIZE_MARK_MASK {
            RAW_SIZE_MARK_BYTE => u64::from(self.read_fixed::<1>("varint")?[0]),
            RAW_SIZE_MARK_WORD => u64::from(u16::from_le_bytes(self.read_fixed("varint")?)),
            RAW_SIZE_MARK_DWORD => u64::from(u32::from_le_bytes(self.read_fixed("varint")?)),
            _ => u64::from_le_bytes(self.read_fixed("varint")?),
        };
        let value = raw >> 2;
        usize::try_from(value).map_err(|_| DecodeError::IntegerOutOfRange {
            value: value as i128,
            min: 0,
            max: usize::MAX as i128,
        })
    }

    /// Reads a length-prefixed field name. Names are at most 255 bytes
    /// by construction of the one-byte length prefix.
    fn read_name(&mut self) -> Result<ByteSlice, DecodeError> {
        let len = usize::from(self.read_fixed::<1>("key length")?[0]);
        self.remaining
            .take_slice(len)
            .ok_or(DecodeError::NotEnoughBytes {
                context: "key name",
            })
    }

    /// Length-prefixed payload shared by string and binary reads.
    /// `expected` shapes the tag-mismatch error for the caller's kind.
    fn raw<F>(&mut self, expected: F) -> Result<ByteSlice, DecodeError>
    where
        F: FnOnce(&'static str) -> DecodeError,
    {
        if self.last_tag != Tag::String as u8 {
            return Err(expected(self.last_tag_name()));
        }
        let len = self.read_varint()?;
        self.remaining
            .take_slice(len)
            .ok_or(DecodeError::NotEnoughBytes {
                context: "string payload",
            })
    }

    /// Name of the last tag for error messages.
    fn last_tag_name(&self) -> &'static str {
        if self.last_tag & ARRAY_FLAG != 0 {
            return "array";
        }
        match Tag::from_u8(self.last_tag) {
            Some(tag) => tag.name(),
            None => "invalid tag",
        }
    }

    fn increment_depth(&mut self) -> Result<(), DecodeError> {
        if self.depth == MAX_READ_DEPTH {
            return Err(DecodeError::MaxDepth);
        }
        self.depth += 1;
        Ok(())
    }

    // =========================================================================
    // TYPED PULL API
    // =========================================================================

    /// Reads a boolean. Any nonzero payload byte is `true`.
    pub fn boolean(&mut self) -> Result<bool, DecodeError> {
        if self.last_tag != Tag::Bool as u8 {
            return Err(DecodeError::Boolean {
                found: self.last_tag_name(),
            });
        }
        Ok(self.read_fixed::<1>("boolean")?[0] != 0)
    }

    /// Reads any signed integer tag, widened to `i64`.
    pub fn integer(&mut self) -> Result<i64, DecodeError> {
        match Tag::from_u8(self.last_tag) {
            Some(Tag::Int64) => Ok(i64::from_le_bytes(self.read_fixed("int64")?)),
            Some(Tag::Int32) => Ok(i64::from(i32::from_le_bytes(self.read_fixed("int32")?))),
            Some(Tag::Int16) => Ok(i64::from(i16::from_le_bytes(self.read_fixed("int16")?))),
            Some(Tag::Int8) => Ok(i64::from(self.read_fixed::<1>("int8")?[0] as i8)),
            _ => Err(DecodeError::Integer {
                found: self.last_tag_name(),
            }),
        }
    }

    /// Reads any unsigned integer tag, widened to `u64`.
    pub fn unsigned_integer(&mut self) -> Result<u64, DecodeError> {
        match Tag::from_u8(self.last_tag) {
            Some(Tag::Uint64) => Ok(u64::from_le_bytes(self.read_fixed("uint64")?)),
            Some(Tag::Uint32) => Ok(u64::from(u32::from_le_bytes(self.read_fixed("uint32")?))),
            Some(Tag::Uint16) => Ok(u64::from(u16::from_le_bytes(self.read_fixed("uint16")?))),
            Some(Tag::Uint8) => Ok(u64::from(self.read_fixed::<1>("uint8")?[0])),
            _ => Err(DecodeError::UnsignedInteger {
                found: self.last_tag_name(),
            }),
        }
    }

    /// Reads a double.
    pub fn real(&mut self) -> Result<f64, DecodeError> {
        if self.last_tag != Tag::Double as u8 {
            return Err(DecodeError::Number {
                found: self.last_tag_name(),
            });
        }
        Ok(f64::from_le_bytes(self.read_fixed("double")?))
    }

    /// Reads a string value as owned UTF-8 text.
    pub fn string(&mut self) -> Result<String, DecodeError> {
        let raw = self.raw(|found| DecodeError::String { found })?;
        String::from_utf8(raw.to_vec()).map_err(|_| DecodeError::InvalidUtf8)
    }

    /// Reads a string value as bytes, sharing the input storage.
    pub fn binary(&mut self) -> Result<ByteSlice, DecodeError> {
        self.raw(|found| DecodeError::Binary { found })
    }

    /// Reads a string value into `dest`, which must match its length
    /// exactly.
    pub fn binary_into(&mut self, dest: &mut [u8]) -> Result<(), DecodeError> {
        let value = self.raw(|found| DecodeError::Binary { found })?;
        if value.len() != dest.len() {
            return Err(DecodeError::FixedBinary {
                expected: dest.len(),
                actual: value.len(),
            });
        }
        dest.copy_from_slice(value.as_slice());
        Ok(())
    }

    // =========================================================================
    // CONTAINERS
    // =========================================================================

    /// Opens an array and returns its element count. Afterwards the
    /// last tag is the element tag.
    ///
    /// The count is accepted only if every element can claim at least
    /// `max(min_wire_size(element tag), min_element_size)` bytes out of
    /// the remaining budget; accepted counts debit the budget so that
    /// pending sibling arrays cannot collectively exceed the buffer.
    pub fn start_array(&mut self, min_element_size: usize) -> Result<usize, DecodeError> {
        self.increment_depth()?;

        if self.last_tag == Tag::Array as u8 {
            self.last_tag = self.read_tag()?;
        }
        if self.last_tag & ARRAY_FLAG == 0 {
            return Err(DecodeError::Array {
                found: self.last_tag_name(),
            });
        }
        self.last_tag &= !ARRAY_FLAG;
        let elem = Tag::from_u8(self.last_tag).ok_or(DecodeError::InvalidTag {
            tag: self.last_tag,
        })?;

        let count = self.read_varint()?;
        let budget = self.array_space.min(self.remaining.len());
        let floor = elem.min_wire_size().max(min_element_size);
        if budget / floor < count {
            return Err(DecodeError::NotEnoughBytes {
                context: "array elements",
            });
        }
        self.array_space = budget - count * floor;
        Ok(count)
    }

    /// True when `remaining` hits zero; restores the last tag to array
    /// so that arrays of arrays chain correctly.
    pub fn is_array_end(&mut self, remaining: usize) -> bool {
        if remaining == 0 {
            self.last_tag = Tag::Array as u8;
        }
        remaining == 0
    }

    /// Closes an array opened with [`Reader::start_array`].
    pub fn end_array(&mut self) {
        self.depth -= 1;
    }

    /// Opens an object and returns its field count.
    pub fn start_object(&mut self) -> Result<usize, DecodeError> {
        self.increment_depth()?;
        if self.last_tag != Tag::Object as u8 {
            return Err(DecodeError::Object {
                found: self.last_tag_name(),
            });
        }
        self.last_tag = 0;
        self.read_varint()
    }

    /// Closes an object opened with [`Reader::start_object`].
    pub fn end_object(&mut self) {
        self.depth -= 1;
    }

    /// Reads field names until one matches `map`, skipping the values
    /// of unmatched names. `state` is the number of wire fields still
    /// unread, as returned by [`Reader::start_object`].
    ///
    /// Returns the matched index, or `None` once the object is
    /// exhausted (restoring the last tag to object). After a match the
    /// last tag is the matched value's tag.
    pub fn key(
        &mut self,
        map: &[&'static str],
        state: &mut usize,
    ) -> Result<Option<usize>, DecodeError> {
        while *state != 0 {
            *state -= 1;

            let name = self.read_name()?;
            self.last_tag = self.read_tag()?;
            if let Some(index) = map
                .iter()
                .position(|entry| entry.as_bytes() == name.as_slice())
            {
                return Ok(Some(index));
            }
            self.skip_next()?;
        }
        self.last_tag = Tag::Object as u8;
        Ok(None)
    }

    // =========================================================================
    // SKIP
    // =========================================================================

    /// Consumes a run of `count` fixed-arithmetic values of the last
    /// tag's type in one bounds check.
    fn skip_fixed(&mut self, count: usize) -> Result<(), DecodeError> {
        let elem = Tag::from_u8(self.last_tag).ok_or(DecodeError::InvalidTag {
            tag: self.last_tag,
        })?;
        let size = elem.min_wire_size();
        if self.remaining.len() / size < count {
            return Err(DecodeError::NotEnoughBytes {
                context: "fixed size values",
            });
        }
        self.remaining.advance(size * count);
        Ok(())
    }

    /// Dispatches on the last tag: consumes one scalar or string, or
    /// opens a container and pushes a frame for it.
    fn skip_open(&mut self) -> Result<(), DecodeError> {
        let tag = self.last_tag;
        if tag & ARRAY_FLAG != 0 || tag == Tag::Array as u8 {
            let remaining = self.start_array(0)?;
            let elem = self.last_tag;
            self.skip_stack.push(SkipFrame::Array { remaining, elem });
        } else if tag == Tag::Object as u8 {
            let remaining = self.start_object()?;
            self.skip_stack.push(SkipFrame::Object { remaining });
        } else if tag == Tag::String as u8 {
            self.raw(|found| DecodeError::String { found })?;
        } else {
            self.skip_fixed(1)?;
        }
        Ok(())
    }

    /// Advances past exactly one well-formed value without
    /// interpreting it. Iterative: nesting costs heap frames, not call
    /// frames, and is bounded by the shared depth limit.
    pub(crate) fn skip_next(&mut self) -> Result<(), DecodeError> {
        debug_assert!(self.skip_stack.is_empty());
        self.skip_stack.clear();
        self.skip_open()?;

        while let Some(frame) = self.skip_stack.last().copied() {
            match frame {
                SkipFrame::Array { remaining: 0, .. } => {
                    self.skip_stack.pop();
                    self.end_array();
                }
                SkipFrame::Object { remaining: 0 } => {
                    self.skip_stack.pop();
                    self.end_object();
                }
                SkipFrame::Array { remaining, elem } => {
                    self.last_tag = elem;
                    let fixed = Tag::from_u8(elem).is_some_and(Tag::is_fixed_arithmetic);
                    if fixed {
                        self.skip_fixed(remaining)?;
                        if let Some(SkipFrame::Array { remaining, .. }) =
                            self.skip_stack.last_mut()
                        {
                            *remaining = 0;
                        }
                    } else {
                        if let Some(SkipFrame::Array { remaining, .. }) =
                            self.skip_stack.last_mut()
                        {
                            *remaining -= 1;
                        }
                        self.skip_open()?;
                    }
                }
                SkipFrame::Object { .. } => {
                    if let Some(SkipFrame::Object { remaining }) = self.skip_stack.last_mut() {
                        *remaining -= 1;
                    }
                    self.read_name()?;
                    self.last_tag = self.read_tag()?;
                    self.skip_open()?;
                }
            }
        }
        Ok(())
    }
}
