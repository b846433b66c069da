//! Ephemeral and permanent address book entry IDs

use bytes::Bytes;

use super::codec::{WireDecode, WireEncode, WireReader, WireWriter};
use super::{
    DisplayType, EPHEMERAL_ENTRY_ID_SIZE, Error, FlatUid, NSPI_PROVIDER_UID, Result,
};

/// Leading byte of an ephemeral entry ID
pub const EPHEMERAL_ID_TYPE: u8 = 0x87;

/// Leading byte of a permanent entry ID
pub const PERMANENT_ID_TYPE: u8 = 0x00;

const ENTRY_ID_VERSION: u32 = 1;

/// Session-scoped object reference carrying the server's identity and a
/// minimal entry ID.
///
/// # Wire Format
///
/// ```text
/// +------+----------+---------------+---------+-------------+-----+
/// | 0x87 | R1 R2 R3 | ProviderUID   | R4 (=1) | DisplayType | MId |
/// | 1    | 3 (zero) | 16            | 4       | 4           | 4   |
/// +------+----------+---------------+---------+-------------+-----+
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EphemeralEntryId {
    /// Server instance identifier
    pub provider_uid: FlatUid,
    /// Display type of the object
    pub display_type: DisplayType,
    /// Minimal entry ID of the object
    pub mid: u32,
}

/// Cross-session object reference carrying the NSPI provider identifier and
/// the object's distinguished name.
///
/// # Wire Format
///
/// ```text
/// +------+----------+---------------+---------+-------------+-----------+
/// | 0x00 | R1 R2 R3 | ProviderUID   | R4 (=1) | DisplayType | DN + NUL  |
/// | 1    | 3 (zero) | 16            | 4       | 4           | variable  |
/// +------+----------+---------------+---------+-------------+-----------+
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PermanentEntryId {
    /// Provider identifier, normally [`NSPI_PROVIDER_UID`]
    pub provider_uid: FlatUid,
    /// Display type of the object
    pub display_type: DisplayType,
    /// 8-bit distinguished name, without terminator
    pub distinguished_name: Vec<u8>,
}

impl EphemeralEntryId {
    /// Create an ephemeral entry ID
    #[must_use]
    pub const fn new(provider_uid: FlatUid, display_type: DisplayType, mid: u32) -> Self {
        Self {
            provider_uid,
            display_type,
            mid,
        }
    }

    /// Convert to the fixed 32-byte wire form
    #[must_use]
    pub fn to_bytes(&self) -> [u8; EPHEMERAL_ENTRY_ID_SIZE] {
        let mut bytes = [0u8; EPHEMERAL_ENTRY_ID_SIZE];
        bytes[0] = EPHEMERAL_ID_TYPE;
        bytes[4..20].copy_from_slice(self.provider_uid.as_bytes());
        bytes[20..24].copy_from_slice(&ENTRY_ID_VERSION.to_le_bytes());
        bytes[24..28].copy_from_slice(&self.display_type.as_u32().to_le_bytes());
        bytes[28..32].copy_from_slice(&self.mid.to_le_bytes());
        bytes
    }
}

impl PermanentEntryId {
    /// Create a permanent entry ID under the NSPI provider
    #[must_use]
    pub fn new(display_type: DisplayType, distinguished_name: impl Into<Vec<u8>>) -> Self {
        Self {
            provider_uid: NSPI_PROVIDER_UID,
            display_type,
            distinguished_name: distinguished_name.into(),
        }
    }

    /// Whether the provider identifier is the NSPI provider GUID
    #[must_use]
    pub fn has_nspi_provider(&self) -> bool {
        self.provider_uid == NSPI_PROVIDER_UID
    }

    /// Distinguished name as text, replacing invalid bytes
    #[must_use]
    pub fn dn_lossy(&self) -> String {
        String::from_utf8_lossy(&self.distinguished_name).into_owned()
    }
}

/// Either kind of entry ID, discriminated by the leading byte.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EntryId {
    /// `0x87`
    Ephemeral(EphemeralEntryId),
    /// `0x00`
    Permanent(PermanentEntryId),
}

impl EntryId {
    /// Decode an entry ID from a binary property payload
    ///
    /// The blob must hold exactly one entry ID.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut reader = WireReader::new(bytes);
        let id = Self::decode_from(&mut reader)?;
        reader.finish("entry_id")?;
        Ok(id)
    }

    /// Encode to the binary form carried by `PidTagEntryId`
    pub fn to_bytes(&self) -> Result<Bytes> {
        super::encode(self)
    }

    /// Display type embedded in either form
    #[must_use]
    pub fn display_type(&self) -> DisplayType {
        match self {
            Self::Ephemeral(id) => id.display_type,
            Self::Permanent(id) => id.display_type,
        }
    }

    /// Provider identifier embedded in either form
    #[must_use]
    pub fn provider_uid(&self) -> FlatUid {
        match self {
            Self::Ephemeral(id) => id.provider_uid,
            Self::Permanent(id) => id.provider_uid,
        }
    }

    /// Check if this is an ephemeral entry ID
    #[must_use]
    pub const fn is_ephemeral(&self) -> bool {
        matches!(self, Self::Ephemeral(_))
    }
}

impl From<EphemeralEntryId> for EntryId {
    fn from(id: EphemeralEntryId) -> Self {
        Self::Ephemeral(id)
    }
}

impl From<PermanentEntryId> for EntryId {
    fn from(id: PermanentEntryId) -> Self {
        Self::Permanent(id)
    }
}

/// Common prefix shared by both layouts, after the type byte
fn read_prefix(reader: &mut WireReader<'_>) -> Result<(FlatUid, DisplayType)> {
    for field in ["entry_id.r1", "entry_id.r2", "entry_id.r3"] {
        let found = reader.read_u8(field)?;
        if found != 0 {
            return Err(Error::ReservedField {
                field,
                expected: 0,
                found: u32::from(found),
            });
        }
    }

    let provider_uid = FlatUid::decode_from(reader)?;

    let version = reader.read_u32("entry_id.r4")?;
    if version != ENTRY_ID_VERSION {
        return Err(Error::ReservedField {
            field: "entry_id.r4",
            expected: ENTRY_ID_VERSION,
            found: version,
        });
    }

    let raw = reader.read_u32("entry_id.display_type")?;
    let display_type = DisplayType::from_u32(raw).ok_or(Error::InvalidDisplayType { found: raw })?;

    Ok((provider_uid, display_type))
}

fn write_prefix(
    writer: &mut WireWriter,
    id_type: u8,
    provider_uid: &FlatUid,
    display_type: DisplayType,
) {
    writer.put_u8(id_type);
    writer.put_bytes(&[0, 0, 0]);
    writer.put_bytes(provider_uid.as_bytes());
    writer.put_u32(ENTRY_ID_VERSION);
    writer.put_u32(display_type.as_u32());
}

impl WireEncode for EphemeralEntryId {
    fn encode_into(&self, writer: &mut WireWriter) -> Result<()> {
        writer.put_bytes(&self.to_bytes());
        Ok(())
    }
}

impl WireDecode for EphemeralEntryId {
    fn decode_from(reader: &mut WireReader<'_>) -> Result<Self> {
        let found = reader.read_u8("entry_id.type")?;
        if found != EPHEMERAL_ID_TYPE {
            return Err(Error::InvalidEntryIdType { found });
        }
        let (provider_uid, display_type) = read_prefix(reader)?;
        let mid = reader.read_u32("entry_id.mid")?;
        Ok(Self {
            provider_uid,
            display_type,
            mid,
        })
    }
}

impl WireEncode for PermanentEntryId {
    fn encode_into(&self, writer: &mut WireWriter) -> Result<()> {
        write_prefix(
            writer,
            PERMANENT_ID_TYPE,
            &self.provider_uid,
            self.display_type,
        );
        writer.put_cstr8(&self.distinguished_name, "entry_id.dn")
    }
}

impl WireDecode for PermanentEntryId {
    fn decode_from(reader: &mut WireReader<'_>) -> Result<Self> {
        let found = reader.read_u8("entry_id.type")?;
        if found != PERMANENT_ID_TYPE {
            return Err(Error::InvalidEntryIdType { found });
        }
        let (provider_uid, display_type) = read_prefix(reader)?;
        if provider_uid != NSPI_PROVIDER_UID {
            return Err(Error::ForeignProvider {
                found: provider_uid.0,
            });
        }
        if !display_type.is_returnable() {
            return Err(Error::InvalidDisplayType {
                found: display_type.as_u32(),
            });
        }
        let distinguished_name = reader.read_cstr8("entry_id.dn")?.to_vec();
        Ok(Self {
            provider_uid,
            display_type,
            distinguished_name,
        })
    }
}

impl WireEncode for EntryId {
    fn encode_into(&self, writer: &mut WireWriter) -> Result<()> {
        match self {
            Self::Ephemeral(id) => id.encode_into(writer),
            Self::Permanent(id) => id.encode_into(writer),
        }
    }
}

impl WireDecode for EntryId {
    fn decode_from(reader: &mut WireReader<'_>) -> Result<Self> {
        match reader.peek().first().copied() {
            Some(EPHEMERAL_ID_TYPE) => Ok(Self::Ephemeral(EphemeralEntryId::decode_from(reader)?)),
            Some(PERMANENT_ID_TYPE) => Ok(Self::Permanent(PermanentEntryId::decode_from(reader)?)),
            Some(found) => Err(Error::InvalidEntryIdType { found }),
            None => Err(Error::BufferTooSmall {
                field: "entry_id.type",
                needed: 1,
                got: 0,
            }),
        }
    }
}
