//! Fixed-size NSPI primitives: flat identifiers and the position block

use std::fmt;

use uuid::Uuid;

use super::codec::{WireDecode, WireEncode, WireReader, WireWriter};
use super::{CP_TELETEX, DEFAULT_LOCALE, Error, Result, STAT_SIZE};

/// 16-byte opaque identifier (`FlatUID_r`).
///
/// The bytes are kept exactly as they travel on the wire. Conversions to
/// and from [`Uuid`] use the little-endian GUID layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct FlatUid(pub [u8; 16]);

impl FlatUid {
    /// Size on the wire
    pub const SIZE: usize = 16;

    /// Wrap raw wire bytes
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// Raw wire bytes
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    /// Build from a GUID
    #[must_use]
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid.to_bytes_le())
    }

    /// Interpret as a GUID
    #[must_use]
    pub fn to_uuid(self) -> Uuid {
        Uuid::from_bytes_le(self.0)
    }

    /// Whether every byte is zero
    #[must_use]
    pub fn is_nil(&self) -> bool {
        self.0 == [0u8; 16]
    }
}

impl From<Uuid> for FlatUid {
    fn from(uuid: Uuid) -> Self {
        Self::from_uuid(uuid)
    }
}

impl fmt::Display for FlatUid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_uuid())
    }
}

impl WireEncode for FlatUid {
    fn encode_into(&self, writer: &mut WireWriter) -> Result<()> {
        writer.put_bytes(&self.0);
        Ok(())
    }
}

impl WireDecode for FlatUid {
    fn decode_from(reader: &mut WireReader<'_>) -> Result<Self> {
        Ok(Self(reader.read_array::<16>("flat_uid")?))
    }
}

/// Position block (`STAT`) threaded through table operations.
///
/// # Wire Format
///
/// ```text
/// 0                   1                   2                   3
/// 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                          SortType                             |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                         ContainerID                           |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                          CurrentRec                           |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                        Delta (signed)                         |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                           NumPos                              |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                          TotalRecs                            |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                          CodePage                             |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                       TemplateLocale                          |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                         SortLocale                            |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Stat {
    /// Sort order of the table
    pub sort_type: u32,
    /// Minimal ID of the container (0 for the GAL)
    pub container_id: u32,
    /// Minimal ID of the current row
    pub current_rec: u32,
    /// Requested movement relative to `current_rec`
    pub delta: i32,
    /// Approximate numeric position
    pub num_pos: u32,
    /// Rows in the table
    pub total_recs: u32,
    /// Code page for 8-bit strings
    pub code_page: u32,
    /// Locale for templates
    pub template_locale: u32,
    /// Locale for sorting
    pub sort_locale: u32,
}

impl Stat {
    /// Stat positioned at the start of the GAL, teletex code page, default locale
    #[must_use]
    pub const fn new() -> Self {
        Self::with_code_page(CP_TELETEX)
    }

    /// Same as [`Stat::new`] with a chosen code page
    #[must_use]
    pub const fn with_code_page(code_page: u32) -> Self {
        Self {
            sort_type: 0,
            container_id: 0,
            current_rec: 0,
            delta: 0,
            num_pos: 0,
            total_recs: 0,
            code_page,
            template_locale: DEFAULT_LOCALE,
            sort_locale: DEFAULT_LOCALE,
        }
    }

    /// Convert to bytes (little-endian)
    #[must_use]
    pub fn to_bytes(&self) -> [u8; STAT_SIZE] {
        let mut bytes = [0u8; STAT_SIZE];

        bytes[0..4].copy_from_slice(&self.sort_type.to_le_bytes());
        bytes[4..8].copy_from_slice(&self.container_id.to_le_bytes());
        bytes[8..12].copy_from_slice(&self.current_rec.to_le_bytes());
        bytes[12..16].copy_from_slice(&self.delta.to_le_bytes());
        bytes[16..20].copy_from_slice(&self.num_pos.to_le_bytes());
        bytes[20..24].copy_from_slice(&self.total_recs.to_le_bytes());
        bytes[24..28].copy_from_slice(&self.code_page.to_le_bytes());
        bytes[28..32].copy_from_slice(&self.template_locale.to_le_bytes());
        bytes[32..36].copy_from_slice(&self.sort_locale.to_le_bytes());

        bytes
    }

    /// Parse from bytes (little-endian), ignoring anything past the block
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < STAT_SIZE {
            return Err(Error::BufferTooSmall {
                field: "stat",
                needed: STAT_SIZE,
                got: bytes.len(),
            });
        }
        Self::decode_from(&mut WireReader::new(&bytes[..STAT_SIZE]))
    }
}

impl WireEncode for Stat {
    fn encode_into(&self, writer: &mut WireWriter) -> Result<()> {
        writer.put_bytes(&self.to_bytes());
        Ok(())
    }
}

impl WireDecode for Stat {
    fn decode_from(reader: &mut WireReader<'_>) -> Result<Self> {
        Ok(Self {
            sort_type: reader.read_u32("stat.sort_type")?,
            container_id: reader.read_u32("stat.container_id")?,
            current_rec: reader.read_u32("stat.current_rec")?,
            delta: reader.read_i32("stat.delta")?,
            num_pos: reader.read_u32("stat.num_pos")?,
            total_recs: reader.read_u32("stat.total_recs")?,
            code_page: reader.read_u32("stat.code_page")?,
            template_locale: reader.read_u32("stat.template_locale")?,
            sort_locale: reader.read_u32("stat.sort_locale")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{decode, encode};

    #[test]
    fn test_stat_layout() {
        let stat = Stat {
            sort_type: 0x3E8,
            container_id: 0x10,
            current_rec: 2,
            delta: -1,
            num_pos: 4,
            total_recs: 5,
            code_page: 0x4F25,
            template_locale: 0x409,
            sort_locale: 0x409,
        };

        let bytes = stat.to_bytes();
        assert_eq!(bytes.len(), 36);
        assert_eq!(&bytes[0..4], &0x3E8u32.to_le_bytes());
        assert_eq!(&bytes[12..16], &[0xFF; 4]);
        assert_eq!(Stat::from_bytes(&bytes).unwrap(), stat);
        assert_eq!(decode::<Stat>(&encode(&stat).unwrap()).unwrap(), stat);
    }

    #[test]
    fn test_stat_too_short() {
        let err = Stat::from_bytes(&[0u8; 35]).unwrap_err();
        assert_eq!(
            err,
            Error::BufferTooSmall {
                field: "stat",
                needed: 36,
                got: 35
            }
        );
    }

    #[test]
    fn test_stat_defaults() {
        let stat = Stat::new();
        assert_eq!(stat.code_page, CP_TELETEX);
        assert_eq!(stat.template_locale, DEFAULT_LOCALE);
        assert_eq!(stat.current_rec, 0);
    }

    #[test]
    fn test_flat_uid_guid_layout() {
        let uuid = Uuid::parse_str("C840A7DC-42C0-1A10-B4B9-08002B2FE182").unwrap();
        let uid = FlatUid::from(uuid);
        assert_eq!(
            uid.as_bytes(),
            &[
                0xDC, 0xA7, 0x40, 0xC8, 0xC0, 0x42, 0x10, 0x1A, 0xB4, 0xB9, 0x08, 0x00, 0x2B, 0x2F,
                0xE1, 0x82
            ]
        );
        assert_eq!(uid.to_uuid(), uuid);
        assert!(!uid.is_nil());
        assert!(FlatUid::default().is_nil());
    }
}
