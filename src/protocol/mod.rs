//! NSPI wire vocabulary and codec
//!
//! This module provides the property value codec: primitives, counted
//! arrays, tagged values, rows and restrictions, plus the status codes and
//! operation vocabulary shared by both transports.

mod arrays;
mod codec;
mod constants;
mod entry_id;
mod error;
mod operation;
mod primitives;
mod restriction;
mod row;
mod status;
mod types;
mod value;

pub use arrays::{BinaryArray, PropertyTagArray, StringArray, WStringArray};
pub use codec::{WireDecode, WireEncode, WireReader, WireWriter, decode, encode};
pub use constants::*;
pub use entry_id::{
    EPHEMERAL_ID_TYPE, EntryId, EphemeralEntryId, PERMANENT_ID_TYPE, PermanentEntryId,
};
pub use error::{Error, Result};
pub use operation::Operation;
pub use primitives::{FlatUid, Stat};
pub use restriction::{
    BitmaskOp, FuzzyLevel, FuzzyMode, MAX_RESTRICTION_DEPTH, PropertyName, RelOp, Restriction,
};
pub use row::{PropertyRow, PropertyRowSet};
pub use status::ErrorCode;
pub use types::{DisplayType, PropertyTag, PropertyType};
pub use value::{PropertyValue, TypedValue};

/// Maximum element count of any counted array (tags, values, rows, strings)
pub const MAX_ARRAY_COUNT: usize = 100_000;

/// Maximum size of a single binary blob (2 MiB)
pub const MAX_BINARY_SIZE: usize = 2 * 1024 * 1024;

/// Size of the position block in bytes
pub const STAT_SIZE: usize = 36;

/// Size of an ephemeral entry ID in bytes
pub const EPHEMERAL_ENTRY_ID_SIZE: usize = 32;
