//! Error types for portable storage decoding and encoding.

use thiserror::Error;

/// Stable error taxonomy shared by decode and encode failures.
///
/// Schema kinds mean the bytes were structurally sound but did not
/// match the declared object map; format kinds mean the byte stream
/// itself was malformed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Boolean,
    Integer,
    Number,
    String,
    Binary,
    FixedBinary,
    Array,
    Object,
    MissingKey,
    InvalidKey,
    IntegerOutOfRange,
    MaxDepth,
    Signature,
    Version,
    VarintSize,
    InvalidTag,
    KeySize,
    NotEnoughBytes,
    Incomplete,
}

impl ErrorKind {
    /// Protocol error-code string for this kind.
    pub fn code(self) -> &'static str {
        match self {
            ErrorKind::Boolean => "schema:boolean",
            ErrorKind::Integer => "schema:integer",
            ErrorKind::Number => "schema:number",
            ErrorKind::String => "schema:string",
            ErrorKind::Binary => "schema:binary",
            ErrorKind::FixedBinary => "schema:fixed_binary",
            ErrorKind::Array => "schema:array",
            ErrorKind::Object => "schema:object",
            ErrorKind::MissingKey => "schema:missing_key",
            ErrorKind::InvalidKey => "schema:invalid_key",
            ErrorKind::IntegerOutOfRange => "schema:integer_out_of_range",
            ErrorKind::MaxDepth => "schema:max_depth",
            ErrorKind::Signature => "format:signature",
            ErrorKind::Version => "format:version",
            ErrorKind::VarintSize => "format:varint_size",
            ErrorKind::InvalidTag => "format:invalid_tag",
            ErrorKind::KeySize => "format:key_size",
            ErrorKind::NotEnoughBytes => "format:not_enough_bytes",
            ErrorKind::Incomplete => "logic:incomplete",
        }
    }
}

/// Error produced while decoding a storage block.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecodeError {
    #[error("invalid storage signature")]
    Signature,

    #[error("unsupported storage format version: {version}")]
    Version { version: u8 },

    #[error("unexpected end of input while reading {context}")]
    NotEnoughBytes { context: &'static str },

    #[error("invalid type tag {tag:#04x}")]
    InvalidTag { tag: u8 },

    #[error("expected a boolean, found {found}")]
    Boolean { found: &'static str },

    #[error("expected a signed integer, found {found}")]
    Integer { found: &'static str },

    #[error("expected an unsigned integer, found {found}")]
    UnsignedInteger { found: &'static str },

    #[error("expected a number, found {found}")]
    Number { found: &'static str },

    #[error("expected a string, found {found}")]
    String { found: &'static str },

    #[error("expected binary bytes, found {found}")]
    Binary { found: &'static str },

    #[error("fixed binary size mismatch: expected {expected} bytes, found {actual}")]
    FixedBinary { expected: usize, actual: usize },

    #[error("invalid UTF-8 in string value")]
    InvalidUtf8,

    #[error("expected an array, found {found}")]
    Array { found: &'static str },

    #[error("array constraint violated: {reason}")]
    ArrayConstraint { reason: &'static str },

    #[error("expected an object, found {found}")]
    Object { found: &'static str },

    #[error("missing required object fields: {fields:?}")]
    MissingKey { fields: Vec<&'static str> },

    #[error("invalid key for field {field}: {reason}")]
    InvalidKey {
        field: &'static str,
        reason: &'static str,
    },

    #[error("integer {value} out of range [{min}, {max}]")]
    IntegerOutOfRange { value: i128, min: i128, max: i128 },

    #[error("maximum object and array depth exceeded")]
    MaxDepth,

    #[error("object tree traversal incomplete")]
    Incomplete,

    #[error("field {name}: {source}")]
    Field {
        name: &'static str,
        #[source]
        source: Box<DecodeError>,
    },
}

impl DecodeError {
    /// Taxonomy kind of this error, looking through field wrapping.
    pub fn kind(&self) -> ErrorKind {
        match self {
            DecodeError::Signature => ErrorKind::Signature,
            DecodeError::Version { .. } => ErrorKind::Version,
            DecodeError::NotEnoughBytes { .. } => ErrorKind::NotEnoughBytes,
            DecodeError::InvalidTag { .. } => ErrorKind::InvalidTag,
            DecodeError::Boolean { .. } => ErrorKind::Boolean,
            DecodeError::Integer { .. } | DecodeError::UnsignedInteger { .. } => ErrorKind::Integer,
            DecodeError::Number { .. } => ErrorKind::Number,
            DecodeError::String { .. } | DecodeError::InvalidUtf8 => ErrorKind::String,
            DecodeError::Binary { .. } => ErrorKind::Binary,
            DecodeError::FixedBinary { .. } => ErrorKind::FixedBinary,
            DecodeError::Array { .. } | DecodeError::ArrayConstraint { .. } => ErrorKind::Array,
            DecodeError::Object { .. } => ErrorKind::Object,
            DecodeError::MissingKey { .. } => ErrorKind::MissingKey,
            DecodeError::InvalidKey { .. } => ErrorKind::InvalidKey,
            DecodeError::IntegerOutOfRange { .. } => ErrorKind::IntegerOutOfRange,
            DecodeError::MaxDepth => ErrorKind::MaxDepth,
            DecodeError::Incomplete => ErrorKind::Incomplete,
            DecodeError::Field { source, .. } => source.kind(),
        }
    }

    /// Wraps this error with the name of the field being read, building
    /// a field path for diagnostics as traversal unwinds.
    pub(crate) fn for_field(self, name: &'static str) -> Self {
        DecodeError::Field {
            name,
            source: Box::new(self),
        }
    }
}

/// Error produced while encoding a storage block.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EncodeError {
    #[error("varint value {value} exceeds the 62-bit limit")]
    VarintSize { value: u64 },

    #[error("object key of {len} bytes exceeds the 255-byte limit")]
    KeySize { len: usize },

    #[error("field {name}: {source}")]
    Field {
        name: &'static str,
        #[source]
        source: Box<EncodeError>,
    },
}

impl EncodeError {
    /// Taxonomy kind of this error, looking through field wrapping.
    pub fn kind(&self) -> ErrorKind {
        match self {
            EncodeError::VarintSize { .. } => ErrorKind::VarintSize,
            EncodeError::KeySize { .. } => ErrorKind::KeySize,
            EncodeError::Field { source, .. } => source.kind(),
        }
    }

    pub(crate) fn for_field(self, name: &'static str) -> Self {
        EncodeError::Field {
            name,
            source: Box::new(self),
        }
    }
}
