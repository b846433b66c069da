//! NSPI property types, property tags and display types

use std::fmt;

/// Property type discriminants (low 16 bits of a property tag)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum PropertyType {
    /// No value; reserved trailer only
    Null = 0x0001,
    /// 16-bit signed integer
    Integer16 = 0x0002,
    /// 32-bit signed integer
    Integer32 = 0x0003,
    /// 32-bit error code
    ErrorCode = 0x000A,
    /// Boolean restricted to 0 or 1
    Boolean = 0x000B,
    /// Embedded table reference; reserved trailer only
    EmbeddedTable = 0x000D,
    /// NUL-terminated 8-bit string
    String8 = 0x001E,
    /// NUL-terminated Unicode string
    Unicode = 0x001F,
    /// 64-bit FILETIME
    Time = 0x0040,
    /// 16-byte flat identifier
    Guid = 0x0048,
    /// Counted byte blob
    Binary = 0x0102,

    /// Multi-valued 16-bit integers
    MultipleInteger16 = 0x1002,
    /// Multi-valued 32-bit integers
    MultipleInteger32 = 0x1003,
    /// Multi-valued 8-bit strings
    MultipleString8 = 0x101E,
    /// Multi-valued Unicode strings
    MultipleUnicode = 0x101F,
    /// Multi-valued FILETIMEs
    MultipleTime = 0x1040,
    /// Multi-valued flat identifiers
    MultipleGuid = 0x1048,
    /// Multi-valued byte blobs
    MultipleBinary = 0x1102,
}

impl PropertyType {
    /// Bit marking a multi-valued type
    pub const MULTI_VALUED: u16 = 0x1000;

    /// Convert from the wire discriminant
    #[must_use]
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            0x0001 => Some(Self::Null),
            0x0002 => Some(Self::Integer16),
            0x0003 => Some(Self::Integer32),
            0x000A => Some(Self::ErrorCode),
            0x000B => Some(Self::Boolean),
            0x000D => Some(Self::EmbeddedTable),
            0x001E => Some(Self::String8),
            0x001F => Some(Self::Unicode),
            0x0040 => Some(Self::Time),
            0x0048 => Some(Self::Guid),
            0x0102 => Some(Self::Binary),
            0x1002 => Some(Self::MultipleInteger16),
            0x1003 => Some(Self::MultipleInteger32),
            0x101E => Some(Self::MultipleString8),
            0x101F => Some(Self::MultipleUnicode),
            0x1040 => Some(Self::MultipleTime),
            0x1048 => Some(Self::MultipleGuid),
            0x1102 => Some(Self::MultipleBinary),
            _ => None,
        }
    }

    /// Convert to the wire discriminant
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self as u16
    }

    /// Check if this is a multi-valued type
    #[must_use]
    pub const fn is_multi_valued(self) -> bool {
        (self as u16) & Self::MULTI_VALUED != 0
    }

    /// Size of the payload when it is fixed, `None` for variable-length types
    #[must_use]
    pub const fn fixed_size(self) -> Option<usize> {
        match self {
            Self::Integer16 | Self::Boolean => Some(2),
            Self::Integer32 | Self::ErrorCode | Self::Null | Self::EmbeddedTable => Some(4),
            Self::Time => Some(8),
            Self::Guid => Some(16),
            _ => None,
        }
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Null => "PtypNull",
            Self::Integer16 => "PtypInteger16",
            Self::Integer32 => "PtypInteger32",
            Self::ErrorCode => "PtypErrorCode",
            Self::Boolean => "PtypBoolean",
            Self::EmbeddedTable => "PtypEmbeddedTable",
            Self::String8 => "PtypString8",
            Self::Unicode => "PtypString",
            Self::Time => "PtypTime",
            Self::Guid => "PtypGuid",
            Self::Binary => "PtypBinary",
            Self::MultipleInteger16 => "PtypMultipleInteger16",
            Self::MultipleInteger32 => "PtypMultipleInteger32",
            Self::MultipleString8 => "PtypMultipleString8",
            Self::MultipleUnicode => "PtypMultipleString",
            Self::MultipleTime => "PtypMultipleTime",
            Self::MultipleGuid => "PtypMultipleGuid",
            Self::MultipleBinary => "PtypMultipleBinary",
        };
        write!(f, "{name}")
    }
}

/// 32-bit property tag: identifier in the high half, type in the low half.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PropertyTag(u32);

impl PropertyTag {
    /// Build a tag from an identifier and a type
    #[must_use]
    pub const fn new(id: u16, property_type: PropertyType) -> Self {
        Self(((id as u32) << 16) | property_type as u32)
    }

    /// Wrap a raw tag value
    #[must_use]
    pub const fn from_u32(raw: u32) -> Self {
        Self(raw)
    }

    /// Raw tag value
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }

    /// Property identifier (high 16 bits)
    #[must_use]
    pub const fn id(self) -> u16 {
        (self.0 >> 16) as u16
    }

    /// Raw type discriminant (low 16 bits)
    #[must_use]
    pub const fn type_code(self) -> u16 {
        (self.0 & 0xFFFF) as u16
    }

    /// Decoded property type, `None` when the discriminant is unknown
    #[must_use]
    pub fn property_type(self) -> Option<PropertyType> {
        PropertyType::from_u16(self.type_code())
    }

    /// Same identifier with a different type
    #[must_use]
    pub const fn with_type(self, property_type: PropertyType) -> Self {
        Self((self.0 & 0xFFFF_0000) | property_type as u32)
    }
}

impl From<u32> for PropertyTag {
    fn from(raw: u32) -> Self {
        Self(raw)
    }
}

impl From<PropertyTag> for u32 {
    fn from(tag: PropertyTag) -> Self {
        tag.0
    }
}

impl fmt::Display for PropertyTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

/// Display type codes embedded in entry IDs and `PidTagDisplayType`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum DisplayType {
    /// Messaging user
    MailUser = 0x0000_0000,
    /// Distribution list
    DistList = 0x0000_0001,
    /// Forum (public folder)
    Forum = 0x0000_0002,
    /// Automated agent
    Agent = 0x0000_0003,
    /// Organization-wide alias
    Organization = 0x0000_0004,
    /// Private distribution list
    PrivateDistList = 0x0000_0005,
    /// Remote messaging user
    RemoteMailUser = 0x0000_0006,
    /// Address book container
    Container = 0x0000_0100,
    /// Display template
    Template = 0x0000_0101,
    /// Address creation template
    AddressTemplate = 0x0000_0102,
    /// Search template
    Search = 0x0000_0200,
}

impl DisplayType {
    /// Convert from the wire value
    #[must_use]
    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            0x0000_0000 => Some(Self::MailUser),
            0x0000_0001 => Some(Self::DistList),
            0x0000_0002 => Some(Self::Forum),
            0x0000_0003 => Some(Self::Agent),
            0x0000_0004 => Some(Self::Organization),
            0x0000_0005 => Some(Self::PrivateDistList),
            0x0000_0006 => Some(Self::RemoteMailUser),
            0x0000_0100 => Some(Self::Container),
            0x0000_0101 => Some(Self::Template),
            0x0000_0102 => Some(Self::AddressTemplate),
            0x0000_0200 => Some(Self::Search),
            _ => None,
        }
    }

    /// Convert to the wire value
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self as u32
    }

    /// Whether a server may return this display type for an address book object.
    ///
    /// Templates, search templates and organizations never appear in
    /// address book object entry IDs.
    #[must_use]
    pub const fn is_returnable(self) -> bool {
        !matches!(self, Self::Template | Self::Search | Self::Organization)
    }
}

impl fmt::Display for DisplayType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::MailUser => "DT_MAILUSER",
            Self::DistList => "DT_DISTLIST",
            Self::Forum => "DT_FORUM",
            Self::Agent => "DT_AGENT",
            Self::Organization => "DT_ORGANIZATION",
            Self::PrivateDistList => "DT_PRIVATE_DISTLIST",
            Self::RemoteMailUser => "DT_REMOTE_MAILUSER",
            Self::Container => "DT_CONTAINER",
            Self::Template => "DT_TEMPLATE",
            Self::AddressTemplate => "DT_ADDRESS_TEMPLATE",
            Self::Search => "DT_SEARCH",
        };
        write!(f, "{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_property_type_roundtrip() {
        let types = [
            PropertyType::Integer32,
            PropertyType::Unicode,
            PropertyType::MultipleBinary,
            PropertyType::Null,
        ];

        for property_type in types {
            let code = property_type.as_u16();
            assert_eq!(PropertyType::from_u16(code), Some(property_type));
        }
        assert_eq!(PropertyType::from_u16(0x0000), None);
        assert_eq!(PropertyType::from_u16(0x0005), None);
    }

    #[test]
    fn test_tag_packing() {
        let tag = PropertyTag::new(0x3001, PropertyType::Integer32);
        assert_eq!(tag.as_u32(), 0x3001_0003);
        assert_eq!(tag.id(), 0x3001);
        assert_eq!(tag.type_code(), 0x0003);
        assert_eq!(tag.property_type(), Some(PropertyType::Integer32));
        assert_eq!(
            tag.with_type(PropertyType::ErrorCode).as_u32(),
            0x3001_000A
        );
    }

    #[test]
    fn test_multi_valued_flag() {
        assert!(PropertyType::MultipleString8.is_multi_valued());
        assert!(!PropertyType::String8.is_multi_valued());
    }

    #[test]
    fn test_display_type_legality() {
        assert_eq!(DisplayType::from_u32(0x100), Some(DisplayType::Container));
        assert_eq!(DisplayType::from_u32(0x7), None);
        assert!(DisplayType::MailUser.is_returnable());
        assert!(!DisplayType::Template.is_returnable());
        assert!(!DisplayType::Search.is_returnable());
        assert!(!DisplayType::Organization.is_returnable());
    }
}
