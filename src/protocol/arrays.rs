//! Counted array codecs
//!
//! Every array is a u32 element count followed by the elements. Counts are
//! checked against [`MAX_ARRAY_COUNT`] and single blobs against
//! [`MAX_BINARY_SIZE`] on both sides of the wire. A count larger than the
//! bytes that follow is a shape mismatch, never a silent truncation.

use super::codec::{WireDecode, WireEncode, WireReader, WireWriter};
use super::{MAX_ARRAY_COUNT, MAX_BINARY_SIZE, PropertyTag, Result};

/// Write a counted list using `put` for each element
pub(crate) fn put_list<T, F>(
    writer: &mut WireWriter,
    items: &[T],
    field: &'static str,
    mut put: F,
) -> Result<()>
where
    F: FnMut(&mut WireWriter, &T) -> Result<()>,
{
    writer.put_count(items.len(), MAX_ARRAY_COUNT, field)?;
    for item in items {
        put(writer, item)?;
    }
    Ok(())
}

/// Read a counted list; `min_size` is the smallest wire size of one element
pub(crate) fn read_list<'a, T, F>(
    reader: &mut WireReader<'a>,
    field: &'static str,
    min_size: usize,
    mut read: F,
) -> Result<Vec<T>>
where
    F: FnMut(&mut WireReader<'a>) -> Result<T>,
{
    let count = reader.read_count(field, MAX_ARRAY_COUNT)?;
    reader.ensure_elements(count, min_size, field)?;
    let mut items = Vec::with_capacity(count);
    for _ in 0..count {
        items.push(read(reader)?);
    }
    Ok(items)
}

/// Write a length-prefixed blob
pub(crate) fn put_binary(writer: &mut WireWriter, blob: &[u8], field: &'static str) -> Result<()> {
    writer.put_count(blob.len(), MAX_BINARY_SIZE, field)?;
    writer.put_bytes(blob);
    Ok(())
}

/// Read a length-prefixed blob
pub(crate) fn read_binary(reader: &mut WireReader<'_>, field: &'static str) -> Result<Vec<u8>> {
    let len = reader.read_count(field, MAX_BINARY_SIZE)?;
    Ok(reader.read_bytes(len, field)?.to_vec())
}

/// Counted list of property tags (`PropertyTagArray_r`).
///
/// Several operations reuse the same shape as a list of minimal entry IDs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct PropertyTagArray {
    tags: Vec<PropertyTag>,
}

impl PropertyTagArray {
    /// Create from a list of tags
    #[must_use]
    pub fn new(tags: Vec<PropertyTag>) -> Self {
        Self { tags }
    }

    /// Create from a list of minimal entry IDs
    #[must_use]
    pub fn from_mids(mids: &[u32]) -> Self {
        Self {
            tags: mids.iter().copied().map(PropertyTag::from_u32).collect(),
        }
    }

    /// Interpret the entries as minimal entry IDs
    #[must_use]
    pub fn as_mids(&self) -> Vec<u32> {
        self.tags.iter().map(|tag| tag.as_u32()).collect()
    }

    /// Tags in order
    #[must_use]
    pub fn tags(&self) -> &[PropertyTag] {
        &self.tags
    }

    /// Number of entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.tags.len()
    }

    /// Whether the array is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// Whether `tag` appears in the array
    #[must_use]
    pub fn contains(&self, tag: PropertyTag) -> bool {
        self.tags.contains(&tag)
    }

    /// Iterate the tags
    pub fn iter(&self) -> impl Iterator<Item = PropertyTag> + '_ {
        self.tags.iter().copied()
    }
}

impl From<Vec<PropertyTag>> for PropertyTagArray {
    fn from(tags: Vec<PropertyTag>) -> Self {
        Self::new(tags)
    }
}

impl FromIterator<PropertyTag> for PropertyTagArray {
    fn from_iter<I: IntoIterator<Item = PropertyTag>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl WireEncode for PropertyTagArray {
    fn encode_into(&self, writer: &mut WireWriter) -> Result<()> {
        put_list(writer, &self.tags, "tag_array", |w, tag| {
            w.put_u32(tag.as_u32());
            Ok(())
        })
    }
}

impl WireDecode for PropertyTagArray {
    fn decode_from(reader: &mut WireReader<'_>) -> Result<Self> {
        let tags = read_list(reader, "tag_array", 4, |r| {
            Ok(PropertyTag::from_u32(r.read_u32("tag_array.tag")?))
        })?;
        Ok(Self { tags })
    }
}

/// Counted list of NUL-terminated 8-bit strings (`StringArray_r`)
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StringArray(pub Vec<Vec<u8>>);

impl WireEncode for StringArray {
    fn encode_into(&self, writer: &mut WireWriter) -> Result<()> {
        put_list(writer, &self.0, "string_array", |w, s| {
            w.put_cstr8(s, "string_array.value")
        })
    }
}

impl WireDecode for StringArray {
    fn decode_from(reader: &mut WireReader<'_>) -> Result<Self> {
        let values = read_list(reader, "string_array", 1, |r| {
            Ok(r.read_cstr8("string_array.value")?.to_vec())
        })?;
        Ok(Self(values))
    }
}

/// Counted list of NUL-terminated Unicode strings (`WStringArray_r`)
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WStringArray(pub Vec<String>);

impl WireEncode for WStringArray {
    fn encode_into(&self, writer: &mut WireWriter) -> Result<()> {
        put_list(writer, &self.0, "wstring_array", |w, s| {
            w.put_cstr16(s, "wstring_array.value")
        })
    }
}

impl WireDecode for WStringArray {
    fn decode_from(reader: &mut WireReader<'_>) -> Result<Self> {
        let values = read_list(reader, "wstring_array", 2, |r| {
            r.read_cstr16("wstring_array.value")
        })?;
        Ok(Self(values))
    }
}

/// Counted list of length-prefixed blobs (`BinaryArray_r`)
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BinaryArray(pub Vec<Vec<u8>>);

impl WireEncode for BinaryArray {
    fn encode_into(&self, writer: &mut WireWriter) -> Result<()> {
        put_list(writer, &self.0, "binary_array", |w, blob| {
            put_binary(w, blob, "binary_array.value")
        })
    }
}

impl WireDecode for BinaryArray {
    fn decode_from(reader: &mut WireReader<'_>) -> Result<Self> {
        let values = read_list(reader, "binary_array", 4, |r| {
            read_binary(r, "binary_array.value")
        })?;
        Ok(Self(values))
    }
}
