//! Push-style encoder for portable storage bytes.
//!
//! A [`Writer`] is the mirror image of the reader: scalar and
//! structural pushes emit tags, varints, and little-endian payloads in
//! wire order. The one asymmetry is arrays: the element type tag is
//! not known until the first element is pushed, so the array header is
//! deferred and flushed together with the first value's tag.
//!
//! The writer owns its output buffer until [`Writer::take_bytes`]
//! transfers it out; the writer then re-primes itself and can encode
//! the next message. A failed push leaves the buffer unusable and the
//! caller should discard the writer.

use crate::buffer::{ByteSlice, ByteStream};
use crate::error::EncodeError;
use crate::limits::{
    FORMAT_VERSION, HEADER_SIZE, MAX_KEY_LEN, SIGNATURE_A, SIGNATURE_B, VARINT_MAX,
};
use crate::tag::{
    Tag, ARRAY_FLAG, RAW_SIZE_MARK_BYTE, RAW_SIZE_MARK_DWORD, RAW_SIZE_MARK_INT64,
    RAW_SIZE_MARK_WORD,
};

/// Streaming writer producing one storage block.
#[derive(Debug)]
pub struct Writer {
    bytes: ByteStream,
    /// Element count of an array whose header is still deferred.
    array_count: Option<usize>,
    /// Set after a key or array start: the next value push must emit
    /// its type tag first.
    needs_tag: bool,
}

impl Default for Writer {
    fn default() -> Self {
        Self::new()
    }
}

impl Writer {
    /// Creates a writer primed with the storage block header.
    pub fn new() -> Writer {
        let mut writer = Writer {
            bytes: ByteStream::new(),
            array_count: None,
            needs_tag: false,
        };
        writer.write_header();
        writer
    }

    fn write_header(&mut self) {
        self.bytes.reserve(HEADER_SIZE);
        self.bytes.write(&SIGNATURE_A.to_le_bytes());
        self.bytes.write(&SIGNATURE_B.to_le_bytes());
        self.bytes.put_u8(FORMAT_VERSION);
    }

    /// Bytes written so far, header included.
    pub fn as_bytes(&self) -> &[u8] {
        self.bytes.as_slice()
    }

    /// Takes the encoded message and re-primes the writer for the next
    /// one.
    pub fn take_bytes(&mut self) -> ByteSlice {
        let out = self.bytes.take();
        self.array_count = None;
        self.needs_tag = false;
        self.write_header();
        out
    }

    /// Emits `tag`, flushing a deferred array header if one is
    /// pending: the tag gains the array flag and is followed by the
    /// element count.
    fn write_tag(&mut self, tag: u8) -> Result<(), EncodeError> {
        if let Some(count) = self.array_count.take() {
            self.bytes.put_u8(tag | ARRAY_FLAG);
            self.write_varint(count)?;
        } else {
            self.bytes.put_u8(tag);
        }
        self.needs_tag = false;
        Ok(())
    }

    /// Emits `value` as the smallest varint width that fits.
    fn write_varint(&mut self, value: usize) -> Result<(), EncodeError> {
        let value = value as u64;
        if value <= u64::from(u8::MAX >> 2) {
            self.bytes.put_u8((value as u8) << 2 | RAW_SIZE_MARK_BYTE);
        } else if value <= u64::from(u16::MAX >> 2) {
            let packed = (value as u16) << 2 | u16::from(RAW_SIZE_MARK_WORD);
            self.bytes.write(&packed.to_le_bytes());
        } else if value <= u64::from(u32::MAX >> 2) {
            let packed = (value as u32) << 2 | u32::from(RAW_SIZE_MARK_DWORD);
            self.bytes.write(&packed.to_le_bytes());
        } else if value <= VARINT_MAX {
            let packed = value << 2 | u64::from(RAW_SIZE_MARK_INT64);
            self.bytes.write(&packed.to_le_bytes());
        } else {
            return Err(EncodeError::VarintSize { value });
        }
        Ok(())
    }

    #[inline]
    fn tag_for_value(&mut self, tag: Tag) -> Result<(), EncodeError> {
        if self.needs_tag {
            self.write_tag(tag as u8)?;
        }
        Ok(())
    }

    // =========================================================================
    // SCALAR PUSHES
    // =========================================================================

    pub fn boolean(&mut self, value: bool) -> Result<(), EncodeError> {
        self.tag_for_value(Tag::Bool)?;
        self.bytes.put_u8(u8::from(value));
        Ok(())
    }

    pub fn int8(&mut self, value: i8) -> Result<(), EncodeError> {
        self.tag_for_value(Tag::Int8)?;
        self.bytes.write(&value.to_le_bytes());
        Ok(())
    }

    pub fn int16(&mut self, value: i16) -> Result<(), EncodeError> {
        self.tag_for_value(Tag::Int16)?;
        self.bytes.write(&value.to_le_bytes());
        Ok(())
    }

    pub fn int32(&mut self, value: i32) -> Result<(), EncodeError> {
        self.tag_for_value(Tag::Int32)?;
        self.bytes.write(&value.to_le_bytes());
        Ok(())
    }

    pub fn int64(&mut self, value: i64) -> Result<(), EncodeError> {
        self.tag_for_value(Tag::Int64)?;
        self.bytes.write(&value.to_le_bytes());
        Ok(())
    }

    pub fn uint8(&mut self, value: u8) -> Result<(), EncodeError> {
        self.tag_for_value(Tag::Uint8)?;
        self.bytes.put_u8(value);
        Ok(())
    }

    pub fn uint16(&mut self, value: u16) -> Result<(), EncodeError> {
        self.tag_for_value(Tag::Uint16)?;
        self.bytes.write(&value.to_le_bytes());
        Ok(())
    }

    pub fn uint32(&mut self, value: u32) -> Result<(), EncodeError> {
        self.tag_for_value(Tag::Uint32)?;
        self.bytes.write(&value.to_le_bytes());
        Ok(())
    }

    pub fn uint64(&mut self, value: u64) -> Result<(), EncodeError> {
        self.tag_for_value(Tag::Uint64)?;
        self.bytes.write(&value.to_le_bytes());
        Ok(())
    }

    pub fn float64(&mut self, value: f64) -> Result<(), EncodeError> {
        self.tag_for_value(Tag::Double)?;
        self.bytes.write(&value.to_le_bytes());
        Ok(())
    }

    /// Writes text. Strings and binary are identical on the wire.
    pub fn string(&mut self, value: &str) -> Result<(), EncodeError> {
        self.binary(value.as_bytes())
    }

    /// Writes a length-prefixed byte run.
    pub fn binary(&mut self, value: &[u8]) -> Result<(), EncodeError> {
        self.tag_for_value(Tag::String)?;
        self.write_varint(value.len())?;
        self.bytes.write(value);
        Ok(())
    }

    // =========================================================================
    // CONTAINERS
    // =========================================================================

    /// Begins an array of `count` elements. The header is deferred
    /// until the first element push supplies the element tag. Calling
    /// this while another array header is pending flushes the outer
    /// header as an array-of-arrays.
    pub fn start_array(&mut self, count: usize) -> Result<(), EncodeError> {
        if self.array_count.is_some() {
            self.write_tag(Tag::Array as u8)?;
        }
        self.needs_tag = true;
        self.array_count = Some(count);
        Ok(())
    }

    /// Flushes the header of a pending empty array. A zero-count array
    /// never sees an element push, so the element tag must be supplied
    /// here instead.
    pub fn write_empty_array(&mut self, elem: Tag) -> Result<(), EncodeError> {
        debug_assert!(self.array_count == Some(0));
        self.write_tag(elem as u8)
    }

    /// Closes the current array. Nothing to emit; counts were written
    /// up front.
    pub fn end_array(&mut self) {}

    /// Begins an object of `count` fields. The root object carries no
    /// tag, only its field count.
    pub fn start_object(&mut self, count: usize) -> Result<(), EncodeError> {
        if self.needs_tag {
            self.write_tag(Tag::Object as u8)?;
        }
        self.write_varint(count)
    }

    /// Writes a field key and arms the tag for the following value.
    pub fn key(&mut self, name: &str) -> Result<(), EncodeError> {
        if name.len() > MAX_KEY_LEN {
            return Err(EncodeError::KeySize { len: name.len() });
        }
        self.bytes.put_u8(name.len() as u8);
        self.bytes.write(name.as_bytes());
        self.needs_tag = true;
        Ok(())
    }

    /// Closes the current object.
    pub fn end_object(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: [u8; 9] = [0x01, 0x11, 0x01, 0x01, 0x01, 0x01, 0x02, 0x01, 0x01];

    #[test]
    fn empty_object_is_header_plus_zero_count() {
        let mut writer = Writer::new();
        writer.start_object(0).unwrap();
        writer.end_object();
        let bytes = writer.take_bytes();
        let mut expected = HEADER.to_vec();
        expected.push(0x00);
        assert_eq!(bytes.as_slice(), &expected[..]);
    }

    #[test]
    fn single_uint64_field_layout() {
        let mut writer = Writer::new();
        writer.start_object(1).unwrap();
        writer.key("height").unwrap();
        writer.uint64(0x1234).unwrap();
        writer.end_object();
        let bytes = writer.take_bytes();

        let mut expected = HEADER.to_vec();
        expected.push(0x04); // varint(1)
        expected.push(0x06);
        expected.extend_from_slice(b"height");
        expected.push(0x05); // uint64 tag
        expected.extend_from_slice(&0x1234u64.to_le_bytes());
        assert_eq!(bytes.as_slice(), &expected[..]);
    }

    #[test]
    fn array_header_is_deferred_to_first_element() {
        let mut writer = Writer::new();
        writer.start_object(1).unwrap();
        writer.key("xs").unwrap();
        writer.start_array(3).unwrap();
        for v in [1u16, 2, 3] {
            writer.uint16(v).unwrap();
        }
        writer.end_array();
        writer.end_object();
        let bytes = writer.take_bytes();

        let mut expected = HEADER.to_vec();
        expected.push(0x04);
        expected.push(0x02);
        expected.extend_from_slice(b"xs");
        expected.push(0x87); // uint16 | ARRAY_FLAG
        expected.push(0x0c); // varint(3)
        expected.extend_from_slice(&[0x01, 0x00, 0x02, 0x00, 0x03, 0x00]);
        assert_eq!(bytes.as_slice(), &expected[..]);
    }

    #[test]
    fn array_of_arrays_flushes_outer_header() {
        let mut writer = Writer::new();
        writer.start_object(1).unwrap();
        writer.key("m").unwrap();
        writer.start_array(2).unwrap();
        writer.start_array(1).unwrap();
        writer.uint8(7).unwrap();
        writer.end_array();
        writer.start_array(0).unwrap();
        writer.write_empty_array(Tag::Uint8).unwrap();
        writer.end_array();
        writer.end_array();
        writer.end_object();
        let bytes = writer.take_bytes();

        let mut expected = HEADER.to_vec();
        expected.push(0x04);
        expected.push(0x01);
        expected.push(b'm');
        expected.push(Tag::Array as u8 | ARRAY_FLAG); // 0x8d
        expected.push(0x08); // outer count 2
        expected.push(0x88); // uint8 | ARRAY_FLAG
        expected.push(0x04); // inner count 1
        expected.push(0x07);
        expected.push(0x88); // empty inner
        expected.push(0x00);
        assert_eq!(bytes.as_slice(), &expected[..]);
    }

    #[test]
    fn varint_widths_are_smallest_fit() {
        let mut writer = Writer::new();
        writer.write_varint(63).unwrap();
        writer.write_varint(64).unwrap();
        writer.write_varint(16383).unwrap();
        writer.write_varint(16384).unwrap();
        let bytes = writer.take_bytes();
        let body = &bytes.as_slice()[9..];
        assert_eq!(body[0], 63 << 2);
        assert_eq!(&body[1..3], &((64u16 << 2) | 1).to_le_bytes());
        assert_eq!(&body[3..5], &((16383u16 << 2) | 1).to_le_bytes());
        assert_eq!(&body[5..9], &((16384u32 << 2) | 2).to_le_bytes());
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn varint_rejects_values_above_62_bits() {
        let mut writer = Writer::new();
        let err = writer.write_varint(usize::MAX).unwrap_err();
        assert_eq!(
            err,
            EncodeError::VarintSize {
                value: usize::MAX as u64
            }
        );
    }

    #[test]
    fn oversized_key_is_rejected() {
        let mut writer = Writer::new();
        writer.start_object(1).unwrap();
        let name = "k".repeat(300);
        let err = writer.key(&name).unwrap_err();
        assert_eq!(err, EncodeError::KeySize { len: 300 });
    }

    #[test]
    fn take_bytes_reprimes_for_reuse() {
        let mut writer = Writer::new();
        writer.start_object(0).unwrap();
        writer.end_object();
        let first = writer.take_bytes();

        writer.start_object(0).unwrap();
        writer.end_object();
        let second = writer.take_bytes();

        assert_eq!(first, second);
        assert_eq!(first.len(), 10);
    }

    #[test]
    fn string_and_binary_share_encoding() {
        let mut a = Writer::new();
        a.start_object(1).unwrap();
        a.key("v").unwrap();
        a.string("abc").unwrap();
        a.end_object();

        let mut b = Writer::new();
        b.start_object(1).unwrap();
        b.key("v").unwrap();
        b.binary(b"abc").unwrap();
        b.end_object();

        assert_eq!(a.take_bytes(), b.take_bytes());
    }
}
