//! Well-known NSPI constants: minimal IDs, flags, code pages and property tags

use super::{FlatUid, PropertyTag};

/// Position before the first row of a table
pub const MID_BEGINNING_OF_TABLE: u32 = 0x0000_0000;
/// The current row
pub const MID_CURRENT: u32 = 0x0000_0001;
/// Position after the last row of a table
pub const MID_END_OF_TABLE: u32 = 0x0000_0002;
/// Smallest minimal ID a server assigns to a real object
pub const MID_FIRST_OBJECT: u32 = 0x0000_0010;

/// Name did not resolve
pub const MID_UNRESOLVED: u32 = 0x0000_0000;
/// Name resolved to several objects
pub const MID_AMBIGUOUS: u32 = 0x0000_0001;
/// Name resolved to one object
pub const MID_RESOLVED: u32 = 0x0000_0002;

/// Sort by display name
pub const SORT_TYPE_DISPLAY_NAME: u32 = 0x0000_0000;
/// Sort by phonetic display name
pub const SORT_TYPE_PHONETIC_DISPLAY_NAME: u32 = 0x0000_0003;
/// Sort by display name, read-only
pub const SORT_TYPE_DISPLAY_NAME_RO: u32 = 0x0000_03E8;
/// Sort by display name, Unicode
pub const SORT_TYPE_DISPLAY_NAME_W: u32 = 0x0000_03E9;

/// Teletex code page
pub const CP_TELETEX: u32 = 0x0000_4F25;
/// Unicode code page
pub const CP_WINUNICODE: u32 = 0x0000_04B0;
/// Default locale (en-US)
pub const DEFAULT_LOCALE: u32 = 0x0000_0409;

/// Bind without credentials
pub const BIND_ANONYMOUS_LOGIN: u32 = 0x0000_0020;

/// Return minimal IDs only, no rows
pub const RETRIEVE_SKIP_OBJECTS: u32 = 0x0000_0001;
/// Return ephemeral entry IDs
pub const RETRIEVE_EPHEMERAL_ID: u32 = 0x0000_0002;

/// Return address creation templates instead of the hierarchy table
pub const SPECIAL_TABLE_ADDRESS_CREATION_TEMPLATES: u32 = 0x0000_0002;
/// Return Unicode strings in the hierarchy table
pub const SPECIAL_TABLE_UNICODE_STRINGS: u32 = 0x0000_0004;

/// Report string columns as `PtypString`
pub const QUERY_COLUMNS_UNICODE_PROPTYPES: u32 = 0x8000_0000;

/// Return the template
pub const TI_TEMPLATE: u32 = 0x0000_0001;
/// Return the template script
pub const TI_SCRIPT: u32 = 0x0000_0004;
/// Return the e-mail type
pub const TI_EMT: u32 = 0x0000_0010;
/// Return the help file name
pub const TI_HELPFILE_NAME: u32 = 0x0000_0020;
/// Return the help file contents
pub const TI_HELPFILE_CONTENTS: u32 = 0x0000_0040;

/// Remove the listed values instead of adding them
pub const MOD_LINK_ATT_DELETE: u32 = 0x0000_0001;

/// Code the server returns from a successful unbind
pub const UNBIND_SUCCESS: u32 = 0x0000_0001;

/// Provider identifier carried by permanent entry IDs
/// (`C840A7DC-42C0-1A10-B4B9-08002B2FE182`)
pub const NSPI_PROVIDER_UID: FlatUid = FlatUid::from_bytes([
    0xDC, 0xA7, 0x40, 0xC8, 0xC0, 0x42, 0x10, 0x1A, 0xB4, 0xB9, 0x08, 0x00, 0x2B, 0x2F, 0xE1, 0x82,
]);

/// `PidTagEntryId`
pub const PID_TAG_ENTRY_ID: PropertyTag = PropertyTag::from_u32(0x0FFF_0102);
/// `PidTagObjectType`
pub const PID_TAG_OBJECT_TYPE: PropertyTag = PropertyTag::from_u32(0x0FFE_0003);
/// `PidTagInstanceKey`
pub const PID_TAG_INSTANCE_KEY: PropertyTag = PropertyTag::from_u32(0x0FF6_0102);
/// `PidTagDisplayName` (8-bit)
pub const PID_TAG_DISPLAY_NAME: PropertyTag = PropertyTag::from_u32(0x3001_001E);
/// `PidTagAddressType`
pub const PID_TAG_ADDRESS_TYPE: PropertyTag = PropertyTag::from_u32(0x3002_001E);
/// `PidTagEmailAddress`
pub const PID_TAG_EMAIL_ADDRESS: PropertyTag = PropertyTag::from_u32(0x3003_001F);
/// `PidTagDepth`
pub const PID_TAG_DEPTH: PropertyTag = PropertyTag::from_u32(0x3005_0003);
/// `PidTagContainerFlags`
pub const PID_TAG_CONTAINER_FLAGS: PropertyTag = PropertyTag::from_u32(0x3600_0003);
/// `PidTagSelectable`
pub const PID_TAG_SELECTABLE: PropertyTag = PropertyTag::from_u32(0x3609_000B);
/// `PidTagDisplayType`
pub const PID_TAG_DISPLAY_TYPE: PropertyTag = PropertyTag::from_u32(0x3900_0003);
/// `PidTagAddressBookDisplayNamePrintable`
pub const PID_TAG_ADDRESS_BOOK_DISPLAY_NAME_PRINTABLE: PropertyTag =
    PropertyTag::from_u32(0x39FE_001F);
/// `PidTagTitle`
pub const PID_TAG_TITLE: PropertyTag = PropertyTag::from_u32(0x3A17_001F);
/// `PidTagAddressBookMember`
pub const PID_TAG_ADDRESS_BOOK_MEMBER: PropertyTag = PropertyTag::from_u32(0x8009_101E);
/// `PidTagAddressBookObjectDistinguishedName`
pub const PID_TAG_ADDRESS_BOOK_OBJECT_DISTINGUISHED_NAME: PropertyTag =
    PropertyTag::from_u32(0x803C_001F);
/// `PidTagAddressBookIsMaster`
pub const PID_TAG_ADDRESS_BOOK_IS_MASTER: PropertyTag = PropertyTag::from_u32(0xFFFB_000B);
/// `PidTagAddressBookParentEntryId`
pub const PID_TAG_ADDRESS_BOOK_PARENT_ENTRY_ID: PropertyTag = PropertyTag::from_u32(0xFFFC_0102);
/// `PidTagAddressBookContainerId`
pub const PID_TAG_ADDRESS_BOOK_CONTAINER_ID: PropertyTag = PropertyTag::from_u32(0xFFFD_0003);

/// Whether `mid` is a legal position or container identifier
///
/// Legal values are the beginning and end sentinels and anything from
/// [`MID_FIRST_OBJECT`] up.
#[must_use]
pub const fn is_valid_position_mid(mid: u32) -> bool {
    mid == MID_BEGINNING_OF_TABLE || mid == MID_END_OF_TABLE || mid >= MID_FIRST_OBJECT
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_provider_uid_matches_guid() {
        let uuid = Uuid::parse_str("C840A7DC-42C0-1A10-B4B9-08002B2FE182").unwrap();
        assert_eq!(NSPI_PROVIDER_UID, FlatUid::from(uuid));
    }

    #[test]
    fn test_position_mid_validity() {
        assert!(is_valid_position_mid(0));
        assert!(is_valid_position_mid(2));
        assert!(is_valid_position_mid(0x10));
        assert!(!is_valid_position_mid(1));
        assert!(!is_valid_position_mid(0x0F));
    }
}
