//! Tagged property values
//!
//! A [`PropertyValue`] pairs a [`PropertyTag`] with a [`TypedValue`] whose
//! variant always matches the type half of the tag. The payload codec is
//! driven by that type half: `decode(tag, bytes)` picks the payload shape
//! from the tag and rejects discriminants it does not know.

use bytes::Bytes;

use super::arrays::{put_binary, put_list, read_binary, read_list};
use super::codec::{WireDecode, WireEncode, WireReader, WireWriter};
use super::{Error, FlatUid, PropertyTag, PropertyType, Result};

/// Payload of a property value, one variant per supported property type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypedValue {
    /// `PtypNull`
    Null,
    /// `PtypInteger16`
    Integer16(i16),
    /// `PtypInteger32`
    Integer32(i32),
    /// `PtypErrorCode`
    ErrorCode(u32),
    /// `PtypBoolean`
    Boolean(bool),
    /// `PtypEmbeddedTable`
    EmbeddedTable,
    /// `PtypString8`, without terminator
    String8(Vec<u8>),
    /// `PtypString`
    Unicode(String),
    /// `PtypTime` as a FILETIME
    Time(u64),
    /// `PtypGuid`
    Guid(FlatUid),
    /// `PtypBinary`
    Binary(Vec<u8>),
    /// `PtypMultipleInteger16`
    MultipleInteger16(Vec<i16>),
    /// `PtypMultipleInteger32`
    MultipleInteger32(Vec<i32>),
    /// `PtypMultipleString8`
    MultipleString8(Vec<Vec<u8>>),
    /// `PtypMultipleString`
    MultipleUnicode(Vec<String>),
    /// `PtypMultipleTime`
    MultipleTime(Vec<u64>),
    /// `PtypMultipleGuid`
    MultipleGuid(Vec<FlatUid>),
    /// `PtypMultipleBinary`
    MultipleBinary(Vec<Vec<u8>>),
}

impl TypedValue {
    /// Property type this payload encodes as
    #[must_use]
    pub const fn property_type(&self) -> PropertyType {
        match self {
            Self::Null => PropertyType::Null,
            Self::Integer16(_) => PropertyType::Integer16,
            Self::Integer32(_) => PropertyType::Integer32,
            Self::ErrorCode(_) => PropertyType::ErrorCode,
            Self::Boolean(_) => PropertyType::Boolean,
            Self::EmbeddedTable => PropertyType::EmbeddedTable,
            Self::String8(_) => PropertyType::String8,
            Self::Unicode(_) => PropertyType::Unicode,
            Self::Time(_) => PropertyType::Time,
            Self::Guid(_) => PropertyType::Guid,
            Self::Binary(_) => PropertyType::Binary,
            Self::MultipleInteger16(_) => PropertyType::MultipleInteger16,
            Self::MultipleInteger32(_) => PropertyType::MultipleInteger32,
            Self::MultipleString8(_) => PropertyType::MultipleString8,
            Self::MultipleUnicode(_) => PropertyType::MultipleUnicode,
            Self::MultipleTime(_) => PropertyType::MultipleTime,
            Self::MultipleGuid(_) => PropertyType::MultipleGuid,
            Self::MultipleBinary(_) => PropertyType::MultipleBinary,
        }
    }

    pub(crate) fn encode_payload(&self, writer: &mut WireWriter) -> Result<()> {
        match self {
            Self::Null | Self::EmbeddedTable => writer.put_u32(0),
            Self::Integer16(v) => writer.put_i16(*v),
            Self::Integer32(v) => writer.put_i32(*v),
            Self::ErrorCode(v) => writer.put_u32(*v),
            Self::Boolean(v) => writer.put_u16(u16::from(*v)),
            Self::String8(v) => writer.put_cstr8(v, "value.string8")?,
            Self::Unicode(v) => writer.put_cstr16(v, "value.unicode")?,
            Self::Time(v) => writer.put_u64(*v),
            Self::Guid(v) => v.encode_into(writer)?,
            Self::Binary(v) => put_binary(writer, v, "value.binary")?,
            Self::MultipleInteger16(v) => put_list(writer, v, "value.mv_i16", |w, x| {
                w.put_i16(*x);
                Ok(())
            })?,
            Self::MultipleInteger32(v) => put_list(writer, v, "value.mv_i32", |w, x| {
                w.put_i32(*x);
                Ok(())
            })?,
            Self::MultipleString8(v) => put_list(writer, v, "value.mv_string8", |w, s| {
                w.put_cstr8(s, "value.mv_string8.value")
            })?,
            Self::MultipleUnicode(v) => put_list(writer, v, "value.mv_unicode", |w, s| {
                w.put_cstr16(s, "value.mv_unicode.value")
            })?,
            Self::MultipleTime(v) => put_list(writer, v, "value.mv_time", |w, x| {
                w.put_u64(*x);
                Ok(())
            })?,
            Self::MultipleGuid(v) => put_list(writer, v, "value.mv_guid", |w, g| g.encode_into(w))?,
            Self::MultipleBinary(v) => put_list(writer, v, "value.mv_binary", |w, b| {
                put_binary(w, b, "value.mv_binary.value")
            })?,
        }
        Ok(())
    }

    pub(crate) fn decode_payload(
        property_type: PropertyType,
        reader: &mut WireReader<'_>,
    ) -> Result<Self> {
        let value = match property_type {
            PropertyType::Null => {
                read_reserved(reader)?;
                Self::Null
            }
            PropertyType::EmbeddedTable => {
                read_reserved(reader)?;
                Self::EmbeddedTable
            }
            PropertyType::Integer16 => Self::Integer16(reader.read_i16("value.i16")?),
            PropertyType::Integer32 => Self::Integer32(reader.read_i32("value.i32")?),
            PropertyType::ErrorCode => Self::ErrorCode(reader.read_u32("value.error_code")?),
            PropertyType::Boolean => match reader.read_u16("value.boolean")? {
                0 => Self::Boolean(false),
                1 => Self::Boolean(true),
                found => {
                    return Err(Error::InvalidBoolean {
                        field: "value.boolean",
                        found,
                    });
                }
            },
            PropertyType::String8 => Self::String8(reader.read_cstr8("value.string8")?.to_vec()),
            PropertyType::Unicode => Self::Unicode(reader.read_cstr16("value.unicode")?),
            PropertyType::Time => Self::Time(reader.read_u64("value.time")?),
            PropertyType::Guid => Self::Guid(FlatUid::decode_from(reader)?),
            PropertyType::Binary => Self::Binary(read_binary(reader, "value.binary")?),
            PropertyType::MultipleInteger16 => Self::MultipleInteger16(read_list(
                reader,
                "value.mv_i16",
                2,
                |r| r.read_i16("value.mv_i16.value"),
            )?),
            PropertyType::MultipleInteger32 => Self::MultipleInteger32(read_list(
                reader,
                "value.mv_i32",
                4,
                |r| r.read_i32("value.mv_i32.value"),
            )?),
            PropertyType::MultipleString8 => {
                Self::MultipleString8(read_list(reader, "value.mv_string8", 1, |r| {
                    Ok(r.read_cstr8("value.mv_string8.value")?.to_vec())
                })?)
            }
            PropertyType::MultipleUnicode => {
                Self::MultipleUnicode(read_list(reader, "value.mv_unicode", 2, |r| {
                    r.read_cstr16("value.mv_unicode.value")
                })?)
            }
            PropertyType::MultipleTime => Self::MultipleTime(read_list(
                reader,
                "value.mv_time",
                8,
                |r| r.read_u64("value.mv_time.value"),
            )?),
            PropertyType::MultipleGuid => Self::MultipleGuid(read_list(
                reader,
                "value.mv_guid",
                FlatUid::SIZE,
                FlatUid::decode_from,
            )?),
            PropertyType::MultipleBinary => {
                Self::MultipleBinary(read_list(reader, "value.mv_binary", 4, |r| {
                    read_binary(r, "value.mv_binary.value")
                })?)
            }
        };
        Ok(value)
    }
}

fn read_reserved(reader: &mut WireReader<'_>) -> Result<()> {
    let found = reader.read_u32("value.reserved")?;
    if found != 0 {
        return Err(Error::ReservedField {
            field: "value.reserved",
            expected: 0,
            found,
        });
    }
    Ok(())
}

/// A property tag together with a payload of the matching type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PropertyValue {
    tag: PropertyTag,
    value: TypedValue,
}

impl PropertyValue {
    /// Pair a tag with a payload
    ///
    /// Fails with [`Error::TagMismatch`] when the payload type differs from
    /// the type half of the tag.
    pub fn new(tag: PropertyTag, value: TypedValue) -> Result<Self> {
        let payload_type = value.property_type().as_u16();
        if tag.type_code() != payload_type {
            return Err(Error::TagMismatch {
                tag: tag.as_u32(),
                tag_type: tag.type_code(),
                payload_type,
            });
        }
        Ok(Self { tag, value })
    }

    /// Build a value whose tag type is taken from the payload
    #[must_use]
    pub fn with_id(id: u16, value: TypedValue) -> Self {
        Self {
            tag: PropertyTag::new(id, value.property_type()),
            value,
        }
    }

    /// `PtypErrorCode` placeholder for a column the server could not supply
    #[must_use]
    pub fn error(tag: PropertyTag, code: u32) -> Self {
        Self {
            tag: tag.with_type(PropertyType::ErrorCode),
            value: TypedValue::ErrorCode(code),
        }
    }

    /// Property tag
    #[must_use]
    pub const fn tag(&self) -> PropertyTag {
        self.tag
    }

    /// Payload
    #[must_use]
    pub const fn value(&self) -> &TypedValue {
        &self.value
    }

    /// Split into tag and payload
    #[must_use]
    pub fn into_parts(self) -> (PropertyTag, TypedValue) {
        (self.tag, self.value)
    }

    /// Integer payload, if this is `PtypInteger32`
    #[must_use]
    pub fn as_i32(&self) -> Option<i32> {
        match self.value {
            TypedValue::Integer32(v) => Some(v),
            _ => None,
        }
    }

    /// Text payload, if this is `PtypString`
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match &self.value {
            TypedValue::Unicode(v) => Some(v),
            _ => None,
        }
    }

    /// Blob payload, if this is `PtypBinary`
    #[must_use]
    pub fn as_binary(&self) -> Option<&[u8]> {
        match &self.value {
            TypedValue::Binary(v) => Some(v),
            _ => None,
        }
    }

    /// Error code payload, if this is `PtypErrorCode`
    #[must_use]
    pub fn as_error_code(&self) -> Option<u32> {
        match self.value {
            TypedValue::ErrorCode(v) => Some(v),
            _ => None,
        }
    }

    /// Encode the payload alone (no tag, no length)
    pub fn encode(&self) -> Result<Bytes> {
        let mut writer = WireWriter::new();
        self.value.encode_payload(&mut writer)?;
        Ok(writer.finish())
    }

    /// Decode a payload selected by `tag`, consuming all of `bytes`
    pub fn decode(tag: PropertyTag, bytes: &[u8]) -> Result<Self> {
        let mut reader = WireReader::new(bytes);
        let value = Self::decode_payload(tag, &mut reader)?;
        reader.finish("value")?;
        Ok(value)
    }

    /// Decode a payload selected by `tag` from `reader`
    pub fn decode_payload(tag: PropertyTag, reader: &mut WireReader<'_>) -> Result<Self> {
        let property_type = tag.property_type().ok_or(Error::UnsupportedType {
            tag: tag.as_u32(),
            property_type: tag.type_code(),
        })?;
        let value = TypedValue::decode_payload(property_type, reader)?;
        Ok(Self { tag, value })
    }
}

/// Tagged form: `tag u32, length u32, payload`
impl WireEncode for PropertyValue {
    fn encode_into(&self, writer: &mut WireWriter) -> Result<()> {
        writer.put_u32(self.tag.as_u32());
        writer.put_frame(|w| self.value.encode_payload(w))
    }
}

impl WireDecode for PropertyValue {
    fn decode_from(reader: &mut WireReader<'_>) -> Result<Self> {
        let tag = PropertyTag::from_u32(reader.read_u32("value.tag")?);
        let mut frame = reader.read_frame("value.length")?;
        let value = Self::decode_payload(tag, &mut frame)?;
        frame.finish("value")?;
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{MAX_ARRAY_COUNT, MAX_BINARY_SIZE};

    fn roundtrip(value: TypedValue) {
        let original = PropertyValue::with_id(0x6000, value);
        let bytes = original.encode().unwrap();
        let decoded = PropertyValue::decode(original.tag(), &bytes).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn test_scalar_payload_sizes() {
        let cases = [
            (TypedValue::Integer16(-2), 2),
            (TypedValue::Integer32(7), 4),
            (TypedValue::Boolean(true), 2),
            (TypedValue::Time(0x01D0_0000_0000_0000), 8),
            (TypedValue::Guid(FlatUid::from_bytes([3; 16])), 16),
            (TypedValue::Null, 4),
            (TypedValue::EmbeddedTable, 4),
            (TypedValue::Unicode("A".into()), 4),
            (TypedValue::String8(b"ab".to_vec()), 3),
        ];

        for (value, size) in cases {
            let bytes = PropertyValue::with_id(0x3001, value.clone()).encode().unwrap();
            assert_eq!(bytes.len(), size, "{value:?}");
            roundtrip(value);
        }
    }

    #[test]
    fn test_unsupported_discriminants() {
        for code in [0x0000u16, 0x0005, 0x00FB, 0x1001] {
            let tag = PropertyTag::from_u32(0x3001_0000 | u32::from(code));
            assert_eq!(
                PropertyValue::decode(tag, &[0u8; 8]).unwrap_err(),
                Error::UnsupportedType {
                    tag: tag.as_u32(),
                    property_type: code
                }
            );
        }
    }

    #[test]
    fn test_boolean_restricted() {
        let tag = PropertyTag::new(0x3609, PropertyType::Boolean);
        assert_eq!(
            PropertyValue::decode(tag, &2u16.to_le_bytes()).unwrap_err(),
            Error::InvalidBoolean {
                field: "value.boolean",
                found: 2
            }
        );
    }

    #[test]
    fn test_null_reserved_must_be_zero() {
        let tag = PropertyTag::new(0x3001, PropertyType::Null);
        assert!(matches!(
            PropertyValue::decode(tag, &1u32.to_le_bytes()),
            Err(Error::ReservedField {
                field: "value.reserved",
                ..
            })
        ));
    }

    #[test]
    fn test_tag_mismatch_rejected() {
        let tag = PropertyTag::new(0x3001, PropertyType::Unicode);
        assert_eq!(
            PropertyValue::new(tag, TypedValue::Integer32(1)).unwrap_err(),
            Error::TagMismatch {
                tag: 0x3001_001F,
                tag_type: 0x001F,
                payload_type: 0x0003
            }
        );
    }

    #[test]
    fn test_multi_valued_boundaries() {
        roundtrip(TypedValue::MultipleInteger32(Vec::new()));
        roundtrip(TypedValue::MultipleInteger32(vec![5; MAX_ARRAY_COUNT]));

        let over = PropertyValue::with_id(0x6000, TypedValue::MultipleInteger32(vec![5; MAX_ARRAY_COUNT + 1]));
        assert!(matches!(
            over.encode(),
            Err(Error::BoundsExceeded { field: "value.mv_i32", .. })
        ));

        let mut bytes = (MAX_ARRAY_COUNT as u32 + 1).to_le_bytes().to_vec();
        bytes.resize(4 + 4 * (MAX_ARRAY_COUNT + 1), 0);
        let tag = PropertyTag::new(0x6000, PropertyType::MultipleInteger32);
        assert!(matches!(
            PropertyValue::decode(tag, &bytes),
            Err(Error::BoundsExceeded { .. })
        ));
    }

    #[test]
    fn test_short_and_string_list_boundaries() {
        roundtrip(TypedValue::MultipleInteger16(vec![-1; MAX_ARRAY_COUNT]));
        roundtrip(TypedValue::MultipleString8(vec![Vec::new(); MAX_ARRAY_COUNT]));
        roundtrip(TypedValue::MultipleUnicode(vec![String::new(); MAX_ARRAY_COUNT]));

        let over = [
            (TypedValue::MultipleInteger16(vec![-1; MAX_ARRAY_COUNT + 1]), "value.mv_i16"),
            (
                TypedValue::MultipleString8(vec![Vec::new(); MAX_ARRAY_COUNT + 1]),
                "value.mv_string8",
            ),
            (
                TypedValue::MultipleUnicode(vec![String::new(); MAX_ARRAY_COUNT + 1]),
                "value.mv_unicode",
            ),
        ];
        for (value, field) in over {
            assert_eq!(
                PropertyValue::with_id(0x6000, value).encode().unwrap_err(),
                Error::BoundsExceeded {
                    field,
                    count: MAX_ARRAY_COUNT + 1,
                    max: MAX_ARRAY_COUNT
                }
            );
        }

        for (property_type, width) in [
            (PropertyType::MultipleInteger16, 2),
            (PropertyType::MultipleString8, 1),
            (PropertyType::MultipleUnicode, 2),
        ] {
            let mut bytes = (MAX_ARRAY_COUNT as u32 + 1).to_le_bytes().to_vec();
            bytes.resize(4 + width * (MAX_ARRAY_COUNT + 1), 0);
            let tag = PropertyTag::new(0x6000, property_type);
            assert!(
                matches!(
                    PropertyValue::decode(tag, &bytes),
                    Err(Error::BoundsExceeded { .. })
                ),
                "{property_type:?}"
            );
        }
    }

    #[test]
    fn test_binary_boundaries() {
        roundtrip(TypedValue::Binary(Vec::new()));
        roundtrip(TypedValue::Binary(vec![0x5A; MAX_BINARY_SIZE]));

        let over = PropertyValue::with_id(0x0FFF, TypedValue::Binary(vec![0; MAX_BINARY_SIZE + 1]));
        assert!(matches!(
            over.encode(),
            Err(Error::BoundsExceeded { field: "value.binary", .. })
        ));

        let mut bytes = (MAX_BINARY_SIZE as u32 + 1).to_le_bytes().to_vec();
        bytes.resize(4 + MAX_BINARY_SIZE + 1, 0);
        let tag = PropertyTag::new(0x0FFF, PropertyType::Binary);
        assert!(matches!(
            PropertyValue::decode(tag, &bytes),
            Err(Error::BoundsExceeded { .. })
        ));
    }

    #[test]
    fn test_multi_value_shape_mismatch() {
        let mut bytes = 3u32.to_le_bytes().to_vec();
        bytes.extend_from_slice(&[0u8; 16]);
        let tag = PropertyTag::new(0x6000, PropertyType::MultipleTime);
        assert_eq!(
            PropertyValue::decode(tag, &bytes).unwrap_err(),
            Error::ShapeMismatch {
                field: "value.mv_time",
                declared: 3,
                available: 2
            }
        );
    }

    #[test]
    fn test_tagged_form_frames_payload() {
        let value = PropertyValue::with_id(0x3001, TypedValue::Integer32(7));
        let bytes = crate::protocol::encode(&value).unwrap();
        assert_eq!(&bytes[0..4], &0x3001_0003u32.to_le_bytes());
        assert_eq!(&bytes[4..8], &4u32.to_le_bytes());
        assert_eq!(&bytes[8..12], &7i32.to_le_bytes());
        assert_eq!(crate::protocol::decode::<PropertyValue>(&bytes).unwrap(), value);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        fn cstr8() -> impl Strategy<Value = Vec<u8>> {
            prop::collection::vec(1u8..=255, 0..32)
        }

        fn text() -> impl Strategy<Value = String> {
            "[^\\x00]{0,24}"
        }

        fn uid() -> impl Strategy<Value = FlatUid> {
            any::<[u8; 16]>().prop_map(FlatUid::from_bytes)
        }

        fn typed_value() -> impl Strategy<Value = TypedValue> {
            prop_oneof![
                Just(TypedValue::Null),
                Just(TypedValue::EmbeddedTable),
                any::<i16>().prop_map(TypedValue::Integer16),
                any::<i32>().prop_map(TypedValue::Integer32),
                any::<u32>().prop_map(TypedValue::ErrorCode),
                any::<bool>().prop_map(TypedValue::Boolean),
                cstr8().prop_map(TypedValue::String8),
                text().prop_map(TypedValue::Unicode),
                any::<u64>().prop_map(TypedValue::Time),
                uid().prop_map(TypedValue::Guid),
                prop::collection::vec(any::<u8>(), 0..256).prop_map(TypedValue::Binary),
                prop::collection::vec(any::<i16>(), 0..16).prop_map(TypedValue::MultipleInteger16),
                prop::collection::vec(any::<i32>(), 0..16).prop_map(TypedValue::MultipleInteger32),
                prop::collection::vec(cstr8(), 0..8).prop_map(TypedValue::MultipleString8),
                prop::collection::vec(text(), 0..8).prop_map(TypedValue::MultipleUnicode),
                prop::collection::vec(any::<u64>(), 0..16).prop_map(TypedValue::MultipleTime),
                prop::collection::vec(uid(), 0..8).prop_map(TypedValue::MultipleGuid),
                prop::collection::vec(prop::collection::vec(any::<u8>(), 0..64), 0..8)
                    .prop_map(TypedValue::MultipleBinary),
            ]
        }

        proptest! {
            #[test]
            fn prop_payload_roundtrip(id in any::<u16>(), value in typed_value()) {
                let original = PropertyValue::with_id(id, value);
                let bytes = original.encode().unwrap();
                let decoded = PropertyValue::decode(original.tag(), &bytes).unwrap();
                prop_assert_eq!(decoded, original);
            }

            #[test]
            fn prop_tagged_roundtrip(id in any::<u16>(), value in typed_value()) {
                let original = PropertyValue::with_id(id, value);
                let bytes = crate::protocol::encode(&original).unwrap();
                let decoded = crate::protocol::decode::<PropertyValue>(&bytes).unwrap();
                prop_assert_eq!(decoded, original);
            }

            #[test]
            fn prop_decode_never_panics(tag in any::<u32>(), bytes in prop::collection::vec(any::<u8>(), 0..64)) {
                let _ = PropertyValue::decode(PropertyTag::from_u32(tag), &bytes);
            }
        }
    }
}
