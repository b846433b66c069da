//! NSPI codec error types

use thiserror::Error;

/// Wire-format errors raised while encoding or decoding NSPI structures.
///
/// Every variant names the field that failed so a caller can point at the
/// offending part of a server response.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A fixed-size primitive ran past the end of the buffer
    #[error("buffer too small for {field}: need {needed} bytes, got {got}")]
    BufferTooSmall {
        /// Field being read
        field: &'static str,
        /// Needed size
        needed: usize,
        /// Actual size
        got: usize,
    },

    /// A counted structure declares more elements than are present
    #[error("shape mismatch in {field}: declared {declared} elements, {available} present")]
    ShapeMismatch {
        /// Field being read
        field: &'static str,
        /// Element count carried on the wire
        declared: usize,
        /// Elements actually available
        available: usize,
    },

    /// A count or byte length exceeds the protocol maximum
    #[error("{field} exceeds protocol bound: {count} (max {max})")]
    BoundsExceeded {
        /// Field being checked
        field: &'static str,
        /// Offending count or length
        count: usize,
        /// Protocol maximum
        max: usize,
    },

    /// A NUL-terminated string has no terminator
    #[error("unterminated string in {field}")]
    Unterminated {
        /// Field being read
        field: &'static str,
    },

    /// The low 16 bits of a property tag name no known property type
    #[error("unsupported property type {property_type:#06x} in tag {tag:#010x}")]
    UnsupportedType {
        /// Full property tag
        tag: u32,
        /// Type discriminant
        property_type: u16,
    },

    /// A reserved field carries a value other than the mandated constant
    #[error("reserved field {field} must be {expected:#x}, got {found:#x}")]
    ReservedField {
        /// Reserved field name
        field: &'static str,
        /// Mandated value
        expected: u32,
        /// Value on the wire
        found: u32,
    },

    /// Entry ID discriminant byte is neither ephemeral nor permanent
    #[error("invalid entry id type byte: {found:#04x}")]
    InvalidEntryIdType {
        /// Leading byte found
        found: u8,
    },

    /// Display type outside the enumerated set
    #[error("invalid display type: {found:#x}")]
    InvalidDisplayType {
        /// Display type found
        found: u32,
    },

    /// Permanent entry ID issued by a provider other than NSPI
    #[error("permanent entry id has foreign provider {found:?}")]
    ForeignProvider {
        /// Provider identifier found
        found: [u8; 16],
    },

    /// Boolean payload outside {0, 1}
    #[error("invalid boolean value in {field}: {found}")]
    InvalidBoolean {
        /// Field being read
        field: &'static str,
        /// Value found
        found: u16,
    },

    /// Unicode string is not valid UTF-16
    #[error("invalid UTF-16 in {field}")]
    InvalidUtf16 {
        /// Field being read
        field: &'static str,
    },

    /// A string handed to the encoder contains an embedded NUL
    #[error("embedded NUL in {field}")]
    InteriorNul {
        /// Field being written
        field: &'static str,
    },

    /// Payload shape does not match the type carried by its tag
    #[error("tag {tag:#010x} carries type {tag_type:#06x} but payload is {payload_type:#06x}")]
    TagMismatch {
        /// Property tag
        tag: u32,
        /// Type from the tag
        tag_type: u16,
        /// Type of the payload
        payload_type: u16,
    },

    /// A length-framed payload was not fully consumed
    #[error("{remaining} trailing bytes after {field}")]
    TrailingBytes {
        /// Field being read
        field: &'static str,
        /// Unconsumed bytes
        remaining: usize,
    },

    /// A one-byte flag holds a value outside its enumerated set
    #[error("invalid flag in {field}: {found:#04x}")]
    InvalidFlag {
        /// Field being read
        field: &'static str,
        /// Value found
        found: u8,
    },

    /// Restriction type byte or relational operator out of range
    #[error("invalid restriction {field}: {found:#x}")]
    InvalidRestriction {
        /// Field being read
        field: &'static str,
        /// Value found
        found: u32,
    },
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
