//! Property rows and row sets

use tracing::warn;

use super::codec::{WireDecode, WireEncode, WireReader, WireWriter};
use super::value::PropertyValue;
use super::{EntryId, Error, MAX_ARRAY_COUNT, PID_TAG_ENTRY_ID, PropertyTag, Result};

/// Smallest wire size of one row value: tag and length
const MIN_VALUE_SIZE: usize = 8;

/// Smallest wire size of one row: reserved field and count
const MIN_ROW_SIZE: usize = 8;

/// Ordered set of property values describing one object (`PropertyRow_r`).
///
/// Values whose type discriminant is unknown are skipped during decode and
/// their tags kept in [`PropertyRow::skipped`]. When the row carries
/// `PidTagEntryId`, the nested entry ID is decoded as well.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PropertyRow {
    reserved: u32,
    values: Vec<PropertyValue>,
    skipped: Vec<PropertyTag>,
    entry_id: Option<EntryId>,
}

impl PropertyRow {
    /// Create a row from values
    ///
    /// Fails if a `PidTagEntryId` value does not hold a valid entry ID.
    pub fn new(values: Vec<PropertyValue>) -> Result<Self> {
        Self::from_parts(values, Vec::new())
    }

    /// Reserved field; zero for every row that decoded
    #[must_use]
    pub const fn reserved(&self) -> u32 {
        self.reserved
    }

    /// Number of decoded values
    #[must_use]
    pub fn count(&self) -> usize {
        self.values.len()
    }

    /// Whether the row carries no values
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Values in wire order
    #[must_use]
    pub fn values(&self) -> &[PropertyValue] {
        &self.values
    }

    /// Take the values
    #[must_use]
    pub fn into_values(self) -> Vec<PropertyValue> {
        self.values
    }

    /// Value with exactly this tag
    #[must_use]
    pub fn get(&self, tag: PropertyTag) -> Option<&PropertyValue> {
        self.values.iter().find(|v| v.tag() == tag)
    }

    /// Value with this property identifier, whatever its type
    ///
    /// Useful when the server answers a column with `PtypErrorCode`.
    #[must_use]
    pub fn get_by_id(&self, id: u16) -> Option<&PropertyValue> {
        self.values.iter().find(|v| v.tag().id() == id)
    }

    /// Tags of values skipped because their type was not recognized
    #[must_use]
    pub fn skipped(&self) -> &[PropertyTag] {
        &self.skipped
    }

    /// Entry ID decoded from `PidTagEntryId`, when present
    #[must_use]
    pub fn entry_id(&self) -> Option<&EntryId> {
        self.entry_id.as_ref()
    }

    /// Build a row from decoded values and the tags skipped while decoding
    pub(crate) fn from_parts(values: Vec<PropertyValue>, skipped: Vec<PropertyTag>) -> Result<Self> {
        let entry_id = find_entry_id(&values)?;
        Ok(Self {
            reserved: 0,
            values,
            skipped,
            entry_id,
        })
    }

    /// Write the value list alone: count, then tagged values
    pub(crate) fn encode_values(&self, writer: &mut WireWriter) -> Result<()> {
        writer.put_count(self.values.len(), MAX_ARRAY_COUNT, "row.count")?;
        for value in &self.values {
            value.encode_into(writer)?;
        }
        Ok(())
    }

    /// Read a value list written by [`PropertyRow::encode_values`]
    pub(crate) fn decode_values(reader: &mut WireReader<'_>) -> Result<Self> {
        let count = reader.read_count("row.count", MAX_ARRAY_COUNT)?;
        reader.ensure_elements(count, MIN_VALUE_SIZE, "row.count")?;

        let mut values = Vec::with_capacity(count);
        let mut skipped = Vec::new();
        for _ in 0..count {
            let tag = PropertyTag::from_u32(reader.read_u32("row.tag")?);
            let mut frame = reader.read_frame("row.length")?;

            if tag.property_type().is_none() {
                warn!(
                    tag = %tag,
                    len = frame.remaining(),
                    "skipping property with unsupported type"
                );
                skipped.push(tag);
                continue;
            }

            let value = PropertyValue::decode_payload(tag, &mut frame)?;
            frame.finish("row.value")?;
            values.push(value);
        }

        Self::from_parts(values, skipped)
    }
}

fn find_entry_id(values: &[PropertyValue]) -> Result<Option<EntryId>> {
    values
        .iter()
        .find(|v| v.tag() == PID_TAG_ENTRY_ID)
        .and_then(PropertyValue::as_binary)
        .map(EntryId::from_bytes)
        .transpose()
}

impl WireEncode for PropertyRow {
    fn encode_into(&self, writer: &mut WireWriter) -> Result<()> {
        writer.put_u32(self.reserved);
        self.encode_values(writer)
    }
}

impl WireDecode for PropertyRow {
    fn decode_from(reader: &mut WireReader<'_>) -> Result<Self> {
        let reserved = reader.read_u32("row.reserved")?;
        if reserved != 0 {
            return Err(Error::ReservedField {
                field: "row.reserved",
                expected: 0,
                found: reserved,
            });
        }
        Self::decode_values(reader)
    }
}

/// Ordered set of rows (`PropertyRowSet_r`)
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PropertyRowSet {
    rows: Vec<PropertyRow>,
}

impl PropertyRowSet {
    /// Create from rows
    #[must_use]
    pub fn new(rows: Vec<PropertyRow>) -> Self {
        Self { rows }
    }

    /// Rows in order; rows with no values are kept as empty rows
    #[must_use]
    pub fn rows(&self) -> &[PropertyRow] {
        &self.rows
    }

    /// Take the rows
    #[must_use]
    pub fn into_rows(self) -> Vec<PropertyRow> {
        self.rows
    }

    /// Number of rows
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the set is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Iterate the rows
    pub fn iter(&self) -> std::slice::Iter<'_, PropertyRow> {
        self.rows.iter()
    }
}

impl From<Vec<PropertyRow>> for PropertyRowSet {
    fn from(rows: Vec<PropertyRow>) -> Self {
        Self::new(rows)
    }
}

impl<'a> IntoIterator for &'a PropertyRowSet {
    type Item = &'a PropertyRow;
    type IntoIter = std::slice::Iter<'a, PropertyRow>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

impl WireEncode for PropertyRowSet {
    fn encode_into(&self, writer: &mut WireWriter) -> Result<()> {
        writer.put_count(self.rows.len(), MAX_ARRAY_COUNT, "row_set.count")?;
        for row in &self.rows {
            row.encode_into(writer)?;
        }
        Ok(())
    }
}

impl WireDecode for PropertyRowSet {
    fn decode_from(reader: &mut WireReader<'_>) -> Result<Self> {
        let count = reader.read_count("row_set.count", MAX_ARRAY_COUNT)?;
        reader.ensure_elements(count, MIN_ROW_SIZE, "row_set.count")?;
        let mut rows = Vec::with_capacity(count);
        for _ in 0..count {
            rows.push(PropertyRow::decode_from(reader)?);
        }
        Ok(Self { rows })
    }
}
