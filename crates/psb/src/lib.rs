//! PSB: portable storage binary serialization for p2p node messages.
//!
//! This crate implements the length-prefixed, tagged binary format a
//! peer-to-peer cryptocurrency node speaks on the wire and over RPC,
//! as a pair of symmetric, DOM-less engines: a [`Reader`] that pulls
//! typed values while advancing a cursor, and a [`Writer`] that pushes
//! them into an output buffer. Schema-driven traversal in [`schema`]
//! connects the engines to user aggregates through declared object
//! maps.
//!
//! # Quick Start
//!
//! ```
//! use psb::schema::{read, write, max_element_count, ReadBytes, WriteBytes};
//! use psb::{DecodeError, EncodeError, Reader, Writer};
//!
//! #[derive(Default, Debug, PartialEq)]
//! struct PeerEntry {
//!     id: u64,
//!     last_seen: u64,
//!     ports: Vec<u16>,
//! }
//!
//! impl ReadBytes for PeerEntry {
//!     fn read_bytes(source: &mut Reader) -> Result<Self, DecodeError> {
//!         let mut out = PeerEntry::default();
//!         read::object(source, &mut [
//!             &mut read::field("id", &mut out.id),
//!             &mut read::defaulted("last_seen", &mut out.last_seen, 0),
//!             &mut read::array("ports", &mut out.ports, max_element_count(8)),
//!         ])?;
//!         Ok(out)
//!     }
//! }
//!
//! impl WriteBytes for PeerEntry {
//!     fn write_bytes(&self, dest: &mut Writer) -> Result<(), EncodeError> {
//!         write::object(dest, &[
//!             &write::field("id", &self.id),
//!             &write::defaulted("last_seen", &self.last_seen, 0),
//!             &write::array("ports", &self.ports),
//!         ])
//!     }
//! }
//!
//! let entry = PeerEntry { id: 44, last_seen: 0, ports: vec![18080] };
//! let bytes = psb::to_bytes(&entry).unwrap();
//! let decoded: PeerEntry = psb::from_bytes(bytes).unwrap();
//! assert_eq!(decoded, entry);
//! ```
//!
//! # Security
//!
//! The decoder is built for untrusted peers:
//! - every container count is checked against the bytes actually
//!   remaining before anything is allocated, and accepted counts debit
//!   a shared budget so sibling arrays cannot collectively over-claim
//!   the buffer;
//! - recursion of objects and arrays is capped at 100 levels, for
//!   normal parsing and for skipping unknown fields alike (skip is
//!   iterative and costs heap, not stack);
//! - up-front reservations are capped, so total allocation stays
//!   linear in the input length regardless of claimed counts.
//!
//! # Wire Format
//!
//! A storage block is a 9-byte header (two four-byte signatures and a
//! version octet) followed by an untagged root object. Objects are a
//! varint field count then `[len][name][tag][value]` entries in
//! producer-chosen order; a tag byte's low bits give the type, bit 7
//! marks an array of that type with a varint element count. Varints
//! carry their width in the low two bits of the first byte. All
//! arithmetic is little-endian on the wire regardless of host order.
//!
//! # Modules
//!
//! - [`buffer`]: refcounted input slices and the growable output
//!   buffer
//! - [`tag`]: tag bytes and per-type minimum wire sizes
//! - [`reader`] / [`writer`]: the streaming engines
//! - [`schema`]: object maps, field wrappers, and traversal
//! - [`limits`]: format constants and security limits
//! - [`error`]: error taxonomy

pub mod buffer;
pub mod error;
pub mod limits;
pub mod reader;
pub mod schema;
pub mod tag;
pub mod writer;

pub use buffer::{ByteSlice, ByteStream};
pub use error::{DecodeError, EncodeError, ErrorKind};
pub use reader::Reader;
pub use schema::{ReadBytes, WriteBytes};
pub use tag::Tag;
pub use writer::Writer;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Decodes one storage block into `T`, verifying the header and that
/// the traversal consumed a complete object tree.
pub fn from_bytes<T: ReadBytes>(source: impl Into<ByteSlice>) -> Result<T, DecodeError> {
    fn inner<T: ReadBytes>(source: ByteSlice) -> Result<T, DecodeError> {
        let mut reader = Reader::new(source)?;
        let value = T::read_bytes(&mut reader)?;
        reader.check_complete()?;
        Ok(value)
    }
    inner(source.into()).map_err(|err| {
        tracing::debug!(%err, code = err.kind().code(), "storage decode failed");
        err
    })
}

/// Encodes `value` as one storage block and returns the bytes.
pub fn to_bytes<T: WriteBytes + ?Sized>(value: &T) -> Result<ByteSlice, EncodeError> {
    let mut writer = Writer::new();
    match value.write_bytes(&mut writer) {
        Ok(()) => Ok(writer.take_bytes()),
        Err(err) => {
            tracing::debug!(%err, code = err.kind().code(), "storage encode failed");
            Err(err)
        }
    }
}
