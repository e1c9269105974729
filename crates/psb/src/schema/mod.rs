//! Schema-driven traversal: object maps bridging user aggregates with
//! the reader and writer engines.
//!
//! A type becomes wire-capable by implementing [`ReadBytes`] and
//! [`WriteBytes`]. Scalars, strings, binary, fixed byte arrays, and
//! nested vectors are provided here; aggregates implement the traits by
//! declaring an object map (a list of field descriptors) and handing
//! it to [`read::object`] or [`write::object`].
//!
//! ```
//! use psb::schema::{read, write, ReadBytes, WriteBytes};
//! use psb::{DecodeError, EncodeError, Reader, Writer};
//!
//! #[derive(Default, Debug, PartialEq)]
//! struct Handshake {
//!     network_id: [u8; 16],
//!     my_port: u32,
//!     rpc_port: u16,
//! }
//!
//! impl ReadBytes for Handshake {
//!     fn read_bytes(source: &mut Reader) -> Result<Self, DecodeError> {
//!         let mut out = Handshake::default();
//!         read::object(source, &mut [
//!             &mut read::field("network_id", &mut out.network_id),
//!             &mut read::field("my_port", &mut out.my_port),
//!             &mut read::defaulted("rpc_port", &mut out.rpc_port, 0),
//!         ])?;
//!         Ok(out)
//!     }
//! }
//!
//! impl WriteBytes for Handshake {
//!     fn write_bytes(&self, dest: &mut Writer) -> Result<(), EncodeError> {
//!         write::object(dest, &[
//!             &write::field("network_id", &self.network_id),
//!             &write::field("my_port", &self.my_port),
//!             &write::defaulted("rpc_port", &self.rpc_port, 0),
//!         ])
//!     }
//! }
//!
//! let value = Handshake { network_id: [7; 16], my_port: 18080, rpc_port: 0 };
//! let bytes = psb::to_bytes(&value).unwrap();
//! assert_eq!(psb::from_bytes::<Handshake>(bytes).unwrap(), value);
//! ```

pub mod read;
pub mod write;

use crate::buffer::{ByteSlice, ByteStream};
use crate::error::{DecodeError, EncodeError};
use crate::limits::MAX_PRE_RESERVE_BYTES;
use crate::reader::Reader;
use crate::tag::Tag;
use crate::writer::Writer;

/// A value that can be decoded from the wire.
pub trait ReadBytes: Sized {
    /// Lower bound on this type's wire footprint, used as the default
    /// per-element constraint when it appears inside an array. One
    /// byte is always safe.
    const MIN_WIRE_SIZE: usize = 1;

    fn read_bytes(source: &mut Reader) -> Result<Self, DecodeError>;
}

/// A value that can be encoded to the wire.
pub trait WriteBytes {
    fn write_bytes(&self, dest: &mut Writer) -> Result<(), EncodeError>;
}

/// Marker for types that may be elements of a tagged array.
///
/// `u8`/`i8` are deliberately excluded: byte sequences travel as
/// strings ([`ByteSlice`] or [`array_as_blob`](read::array_as_blob)),
/// never as per-element tagged arrays. Aggregate types get the object
/// tag by default.
pub trait ArrayElement {
    /// Tag emitted for an empty array of this element type.
    const WIRE_TAG: Tag = Tag::Object;
}

/// Read-side constraint on a schema array field.
///
/// Every array field must carry one: either a hard cap on the element
/// count, or a floor on the average wire bytes per element, which
/// bounds the expansion ratio an adversarial count can achieve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrayConstraint {
    MaxElementCount(usize),
    MinElementSize(usize),
}

impl ArrayConstraint {
    pub(crate) fn min_element_size(self) -> usize {
        match self {
            ArrayConstraint::MinElementSize(bytes) => bytes,
            ArrayConstraint::MaxElementCount(_) => 0,
        }
    }

    pub(crate) fn max_element_count(self) -> usize {
        match self {
            ArrayConstraint::MaxElementCount(count) => count,
            ArrayConstraint::MinElementSize(_) => usize::MAX,
        }
    }
}

/// Constrains an array field to at most `count` decoded elements.
pub fn max_element_count(count: usize) -> ArrayConstraint {
    ArrayConstraint::MaxElementCount(count)
}

/// Constrains an array field to an average of at least `bytes` wire
/// bytes per decoded element.
pub fn min_element_size(bytes: usize) -> ArrayConstraint {
    ArrayConstraint::MinElementSize(bytes)
}

/// Fixed-width POD element of an `array_as_blob` field. The whole
/// sequence is encoded as one string of little-endian element images,
/// so the representation is identical on big- and little-endian hosts.
pub trait BlobElement: Copy {
    /// Wire width of one element in bytes.
    const WIDTH: usize;

    fn write_le(&self, dest: &mut ByteStream);

    /// Decodes one element from exactly [`BlobElement::WIDTH`] bytes.
    fn read_le(bytes: &[u8]) -> Self;
}

/// One alternative of a closed sum type serialized as a variant field
/// group: each alternative owns a distinct field name, and exactly one
/// of them appears on the wire.
pub trait VariantSchema: Sized {
    /// Field name of each alternative, in declaration order.
    const OPTIONS: &'static [&'static str];

    /// Decodes the alternative at `index` within [`Self::OPTIONS`].
    fn read_option(index: usize, source: &mut Reader) -> Result<Self, DecodeError>;

    /// Index of the active alternative within [`Self::OPTIONS`].
    fn option_index(&self) -> usize;

    /// Encodes the active alternative's payload.
    fn write_option(&self, dest: &mut Writer) -> Result<(), EncodeError>;
}

// =============================================================================
// SCALAR IMPLEMENTATIONS
// =============================================================================

macro_rules! impl_wire_unsigned {
    ($t:ty, $size:expr, $push:ident) => {
        impl ReadBytes for $t {
            const MIN_WIRE_SIZE: usize = $size;

            fn read_bytes(source: &mut Reader) -> Result<Self, DecodeError> {
                let value = source.unsigned_integer()?;
                <$t>::try_from(value).map_err(|_| DecodeError::IntegerOutOfRange {
                    value: value as i128,
                    min: 0,
                    max: <$t>::MAX as i128,
                })
            }
        }

        impl WriteBytes for $t {
            fn write_bytes(&self, dest: &mut Writer) -> Result<(), EncodeError> {
                dest.$push(*self)
            }
        }
    };
}

macro_rules! impl_wire_signed {
    ($t:ty, $size:expr, $push:ident) => {
        impl ReadBytes for $t {
            const MIN_WIRE_SIZE: usize = $size;

            fn read_bytes(source: &mut Reader) -> Result<Self, DecodeError> {
                let value = source.integer()?;
                <$t>::try_from(value).map_err(|_| DecodeError::IntegerOutOfRange {
                    value: value as i128,
                    min: <$t>::MIN as i128,
                    max: <$t>::MAX as i128,
                })
            }
        }

        impl WriteBytes for $t {
            fn write_bytes(&self, dest: &mut Writer) -> Result<(), EncodeError> {
                dest.$push(*self)
            }
        }
    };
}

impl_wire_unsigned!(u8, 1, uint8);
impl_wire_unsigned!(u16, 2, uint16);
impl_wire_unsigned!(u32, 4, uint32);
impl_wire_unsigned!(u64, 8, uint64);
impl_wire_signed!(i8, 1, int8);
impl_wire_signed!(i16, 2, int16);
impl_wire_signed!(i32, 4, int32);
impl_wire_signed!(i64, 8, int64);

impl ReadBytes for bool {
    const MIN_WIRE_SIZE: usize = 1;

    fn read_bytes(source: &mut Reader) -> Result<Self, DecodeError> {
        source.boolean()
    }
}

impl WriteBytes for bool {
    fn write_bytes(&self, dest: &mut Writer) -> Result<(), EncodeError> {
        dest.boolean(*self)
    }
}

impl ReadBytes for f64 {
    const MIN_WIRE_SIZE: usize = 8;

    fn read_bytes(source: &mut Reader) -> Result<Self, DecodeError> {
        source.real()
    }
}

impl WriteBytes for f64 {
    fn write_bytes(&self, dest: &mut Writer) -> Result<(), EncodeError> {
        dest.float64(*self)
    }
}

impl ReadBytes for String {
    const MIN_WIRE_SIZE: usize = 2;

    fn read_bytes(source: &mut Reader) -> Result<Self, DecodeError> {
        source.string()
    }
}

impl WriteBytes for String {
    fn write_bytes(&self, dest: &mut Writer) -> Result<(), EncodeError> {
        dest.string(self)
    }
}

impl ReadBytes for ByteSlice {
    const MIN_WIRE_SIZE: usize = 2;

    fn read_bytes(source: &mut Reader) -> Result<Self, DecodeError> {
        source.binary()
    }
}

impl WriteBytes for ByteSlice {
    fn write_bytes(&self, dest: &mut Writer) -> Result<(), EncodeError> {
        dest.binary(self.as_slice())
    }
}

/// Fixed binary: read and written as a string of exactly `N` bytes.
impl<const N: usize> ReadBytes for [u8; N] {
    const MIN_WIRE_SIZE: usize = 2;

    fn read_bytes(source: &mut Reader) -> Result<Self, DecodeError> {
        let mut out = [0u8; N];
        source.binary_into(&mut out)?;
        Ok(out)
    }
}

impl<const N: usize> WriteBytes for [u8; N] {
    fn write_bytes(&self, dest: &mut Writer) -> Result<(), EncodeError> {
        dest.binary(self)
    }
}

/// Nested arrays: an inner vector read with its element type's default
/// size floor and no count cap beyond the reader's space guard.
impl<T: ReadBytes + ArrayElement> ReadBytes for Vec<T> {
    const MIN_WIRE_SIZE: usize = Tag::Array.min_wire_size();

    fn read_bytes(source: &mut Reader) -> Result<Self, DecodeError> {
        let mut out = Vec::new();
        read_array_into(source, &mut out, T::MIN_WIRE_SIZE, usize::MAX)?;
        Ok(out)
    }
}

impl<T: WriteBytes + ArrayElement> WriteBytes for Vec<T> {
    fn write_bytes(&self, dest: &mut Writer) -> Result<(), EncodeError> {
        write_array(dest, self)
    }
}

impl ArrayElement for bool {
    const WIRE_TAG: Tag = Tag::Bool;
}
impl ArrayElement for i16 {
    const WIRE_TAG: Tag = Tag::Int16;
}
impl ArrayElement for i32 {
    const WIRE_TAG: Tag = Tag::Int32;
}
impl ArrayElement for i64 {
    const WIRE_TAG: Tag = Tag::Int64;
}
impl ArrayElement for u16 {
    const WIRE_TAG: Tag = Tag::Uint16;
}
impl ArrayElement for u32 {
    const WIRE_TAG: Tag = Tag::Uint32;
}
impl ArrayElement for u64 {
    const WIRE_TAG: Tag = Tag::Uint64;
}
impl ArrayElement for f64 {
    const WIRE_TAG: Tag = Tag::Double;
}
impl ArrayElement for String {
    const WIRE_TAG: Tag = Tag::String;
}
impl ArrayElement for ByteSlice {
    const WIRE_TAG: Tag = Tag::String;
}
impl<const N: usize> ArrayElement for [u8; N] {
    const WIRE_TAG: Tag = Tag::String;
}
impl<T: ArrayElement> ArrayElement for Vec<T> {
    const WIRE_TAG: Tag = Tag::Array;
}

// =============================================================================
// BLOB ELEMENTS
// =============================================================================

macro_rules! impl_blob_element {
    ($t:ty) => {
        impl BlobElement for $t {
            const WIDTH: usize = std::mem::size_of::<$t>();

            fn write_le(&self, dest: &mut ByteStream) {
                dest.write(&self.to_le_bytes());
            }

            fn read_le(bytes: &[u8]) -> Self {
                let mut buf = [0u8; std::mem::size_of::<$t>()];
                buf.copy_from_slice(bytes);
                <$t>::from_le_bytes(buf)
            }
        }
    };
}

impl_blob_element!(u8);
impl_blob_element!(u16);
impl_blob_element!(u32);
impl_blob_element!(u64);
impl_blob_element!(i8);
impl_blob_element!(i16);
impl_blob_element!(i32);
impl_blob_element!(i64);

impl<const N: usize> BlobElement for [u8; N] {
    const WIDTH: usize = N;

    fn write_le(&self, dest: &mut ByteStream) {
        dest.write(self);
    }

    fn read_le(bytes: &[u8]) -> Self {
        let mut buf = [0u8; N];
        buf.copy_from_slice(bytes);
        buf
    }
}

// =============================================================================
// ARRAY AND BLOB HELPERS
// =============================================================================

/// Capacity to pre-reserve for `count` claimed elements, capped so a
/// lying count cannot trigger a large allocation up front.
fn bounded_capacity<T>(count: usize) -> usize {
    count.min(MAX_PRE_RESERVE_BYTES / std::mem::size_of::<T>().max(1))
}

/// Decodes a tagged array into `dest`, enforcing the element floor via
/// the reader's space guard and a running average, and the count cap
/// before any element is read.
pub(crate) fn read_array_into<T: ReadBytes>(
    source: &mut Reader,
    dest: &mut Vec<T>,
    min_element_size: usize,
    max_element_count: usize,
) -> Result<(), DecodeError> {
    let count = source.start_array(min_element_size)?;
    if count > max_element_count {
        return Err(DecodeError::ArrayConstraint {
            reason: "element count above maximum",
        });
    }

    dest.clear();
    dest.reserve(bounded_capacity::<T>(count));

    let start_bytes = source.remaining().len();
    let mut left = count;
    while !source.is_array_end(left) {
        dest.push(T::read_bytes(source)?);
        left -= 1;

        if min_element_size != 0
            && (start_bytes - source.remaining().len()) / dest.len() < min_element_size
        {
            return Err(DecodeError::ArrayConstraint {
                reason: "average element size below minimum",
            });
        }
    }
    source.end_array();
    Ok(())
}

/// Encodes `items` as a tagged array, emitting the element tag even
/// when the sequence is empty.
pub(crate) fn write_array<T: WriteBytes + ArrayElement>(
    dest: &mut Writer,
    items: &[T],
) -> Result<(), EncodeError> {
    dest.start_array(items.len())?;
    if items.is_empty() {
        dest.write_empty_array(T::WIRE_TAG)?;
    } else {
        for item in items {
            item.write_bytes(dest)?;
        }
    }
    dest.end_array();
    Ok(())
}

/// Decodes a blob-encoded sequence: one string whose length must be a
/// multiple of the element width.
pub(crate) fn read_blob_into<T: BlobElement>(
    source: &mut Reader,
    dest: &mut Vec<T>,
) -> Result<(), DecodeError> {
    let bytes = source.binary()?;
    if T::WIDTH == 0 || bytes.len() % T::WIDTH != 0 {
        return Err(DecodeError::FixedBinary {
            expected: T::WIDTH,
            actual: bytes.len(),
        });
    }
    dest.clear();
    dest.reserve(bytes.len() / T::WIDTH);
    for chunk in bytes.as_slice().chunks_exact(T::WIDTH) {
        dest.push(T::read_le(chunk));
    }
    Ok(())
}

/// Encodes a sequence as one string of concatenated little-endian
/// element images.
pub(crate) fn write_blob<T: BlobElement>(
    dest: &mut Writer,
    items: &[T],
) -> Result<(), EncodeError> {
    let mut bytes = ByteStream::with_capacity(items.len() * T::WIDTH);
    for item in items {
        item.write_le(&mut bytes);
    }
    dest.binary(bytes.as_slice())
}
