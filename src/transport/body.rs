//! MAPI/HTTP request and response bodies.
//!
//! Request bodies carry the operation's fields in order, optional fields
//! behind a one-byte `Has*` flag, and end with an empty auxiliary buffer:
//!
//! ```text
//! +----------------------+--------------------+------------------+
//! | operation fields     | aux size (u32 = 0) | aux bytes (none) |
//! +----------------------+--------------------+------------------+
//! ```
//!
//! Response bodies start with the service `StatusCode` and the operation's
//! `ErrorCode`:
//!
//! ```text
//! +-----------------+----------------+------------------+-----+-----+
//! | StatusCode u32  | ErrorCode u32  | operation fields | aux size+bytes |
//! +-----------------+----------------+------------------+-----+-----+
//! ```

use bytes::Bytes;

use crate::protocol::{
    self, BinaryArray, ErrorCode, FlatUid, MAX_ARRAY_COUNT, Operation, PropertyRow,
    PropertyRowSet, PropertyTag, PropertyTagArray, PropertyValue, Stat, StringArray,
    WStringArray, WireDecode, WireEncode, WireReader, WireWriter,
};

use super::backend::GetMatchesRequest;
use super::error::TransportError;

/// Row flag: every column carries a length-framed payload.
pub const ROW_STANDARD: u8 = 0x00;
/// Row flag: every column is preceded by a cell flag.
pub const ROW_FLAGGED: u8 = 0x01;
/// Cell flag: value present.
pub const CELL_PRESENT: u8 = 0x00;
/// Cell flag: property not found on the object.
pub const CELL_NOT_FOUND: u8 = 0x01;
/// Cell flag: property failed with the error code that follows.
pub const CELL_ERROR: u8 = 0x0A;

fn put_has<T: WireEncode + ?Sized>(writer: &mut WireWriter, value: Option<&T>) -> protocol::Result<()> {
    writer.put_presence(value.is_some());
    match value {
        Some(value) => value.encode_into(writer),
        None => Ok(()),
    }
}

fn read_has<T: WireDecode>(reader: &mut WireReader<'_>, field: &'static str) -> protocol::Result<Option<T>> {
    if reader.read_presence(field)? {
        T::decode_from(reader).map(Some)
    } else {
        Ok(None)
    }
}

/// Request body of one operation, borrowing the caller's arguments.
#[derive(Debug, Clone, Copy)]
#[allow(missing_docs)]
pub enum RequestBody<'a> {
    Bind {
        flags: u32,
        stat: &'a Stat,
    },
    Unbind,
    GetSpecialTable {
        flags: u32,
        stat: &'a Stat,
        version: u32,
    },
    UpdateStat {
        stat: &'a Stat,
        delta_requested: bool,
    },
    QueryColumns {
        flags: u32,
    },
    GetPropList {
        flags: u32,
        mid: u32,
        code_page: u32,
    },
    GetProps {
        flags: u32,
        stat: &'a Stat,
        tags: Option<&'a PropertyTagArray>,
    },
    QueryRows {
        flags: u32,
        stat: &'a Stat,
        table: &'a [u32],
        count: u32,
        columns: Option<&'a PropertyTagArray>,
    },
    SeekEntries {
        stat: &'a Stat,
        target: &'a PropertyValue,
        table: Option<&'a PropertyTagArray>,
        columns: Option<&'a PropertyTagArray>,
    },
    GetMatches {
        stat: &'a Stat,
        request: &'a GetMatchesRequest,
    },
    ResortRestriction {
        stat: &'a Stat,
        mids: &'a PropertyTagArray,
    },
    CompareMids {
        stat: &'a Stat,
        mid1: u32,
        mid2: u32,
    },
    DnToMid {
        names: &'a StringArray,
    },
    ModProps {
        stat: &'a Stat,
        remove: Option<&'a PropertyTagArray>,
        row: &'a PropertyRow,
    },
    ModLinkAtt {
        flags: u32,
        tag: PropertyTag,
        mid: u32,
        entry_ids: &'a BinaryArray,
    },
    ResolveNames {
        stat: &'a Stat,
        tags: Option<&'a PropertyTagArray>,
        names: &'a WStringArray,
    },
    GetTemplateInfo {
        flags: u32,
        display_type: u32,
        template_dn: Option<&'a str>,
        code_page: u32,
        locale: u32,
    },
}

impl RequestBody<'_> {
    /// Operation this body belongs to.
    #[must_use]
    pub const fn operation(&self) -> Operation {
        match self {
            Self::Bind { .. } => Operation::Bind,
            Self::Unbind => Operation::Unbind,
            Self::GetSpecialTable { .. } => Operation::GetSpecialTable,
            Self::UpdateStat { .. } => Operation::UpdateStat,
            Self::QueryColumns { .. } => Operation::QueryColumns,
            Self::GetPropList { .. } => Operation::GetPropList,
            Self::GetProps { .. } => Operation::GetProps,
            Self::QueryRows { .. } => Operation::QueryRows,
            Self::SeekEntries { .. } => Operation::SeekEntries,
            Self::GetMatches { .. } => Operation::GetMatches,
            Self::ResortRestriction { .. } => Operation::ResortRestriction,
            Self::CompareMids { .. } => Operation::CompareMids,
            Self::DnToMid { .. } => Operation::DnToMid,
            Self::ModProps { .. } => Operation::ModProps,
            Self::ModLinkAtt { .. } => Operation::ModLinkAtt,
            Self::ResolveNames { .. } => Operation::ResolveNamesW,
            Self::GetTemplateInfo { .. } => Operation::GetTemplateInfo,
        }
    }

    /// Serialize the body followed by an empty auxiliary buffer.
    pub fn to_bytes(&self) -> Result<Bytes, TransportError> {
        let mut writer = WireWriter::new();
        self.encode_into(&mut writer)?;
        writer.put_u32(0);
        Ok(writer.finish())
    }
}

impl WireEncode for RequestBody<'_> {
    fn encode_into(&self, w: &mut WireWriter) -> protocol::Result<()> {
        match *self {
            Self::Bind { flags, stat } => {
                w.put_u32(flags);
                put_has(w, Some(stat))
            }
            Self::Unbind => {
                w.put_u32(0);
                Ok(())
            }
            Self::GetSpecialTable {
                flags,
                stat,
                version,
            } => {
                w.put_u32(flags);
                put_has(w, Some(stat))?;
                w.put_presence(true);
                w.put_u32(version);
                Ok(())
            }
            Self::UpdateStat {
                stat,
                delta_requested,
            } => {
                w.put_u32(0);
                put_has(w, Some(stat))?;
                w.put_presence(delta_requested);
                Ok(())
            }
            Self::QueryColumns { flags } => {
                w.put_u32(0);
                w.put_u32(flags);
                Ok(())
            }
            Self::GetPropList {
                flags,
                mid,
                code_page,
            } => {
                w.put_u32(flags);
                w.put_u32(mid);
                w.put_u32(code_page);
                Ok(())
            }
            Self::GetProps { flags, stat, tags } => {
                w.put_u32(flags);
                put_has(w, Some(stat))?;
                put_has(w, tags)
            }
            Self::QueryRows {
                flags,
                stat,
                table,
                count,
                columns,
            } => {
                w.put_u32(flags);
                put_has(w, Some(stat))?;
                PropertyTagArray::from_mids(table).encode_into(w)?;
                w.put_u32(count);
                put_has(w, columns)
            }
            Self::SeekEntries {
                stat,
                target,
                table,
                columns,
            } => {
                w.put_u32(0);
                put_has(w, Some(stat))?;
                put_has(w, Some(target))?;
                put_has(w, table)?;
                put_has(w, columns)
            }
            Self::GetMatches { stat, request } => {
                w.put_u32(0);
                put_has(w, Some(stat))?;
                put_has(w, request.mids.as_ref())?;
                w.put_u32(request.interface_options);
                put_has(w, request.filter.as_ref())?;
                put_has(w, request.property_name.as_ref())?;
                w.put_u32(request.requested);
                put_has(w, request.columns.as_ref())
            }
            Self::ResortRestriction { stat, mids } => {
                w.put_u32(0);
                put_has(w, Some(stat))?;
                put_has(w, Some(mids))
            }
            Self::CompareMids { stat, mid1, mid2 } => {
                w.put_u32(0);
                put_has(w, Some(stat))?;
                w.put_u32(mid1);
                w.put_u32(mid2);
                Ok(())
            }
            Self::DnToMid { names } => {
                w.put_u32(0);
                put_has(w, Some(names))
            }
            Self::ModProps { stat, remove, row } => {
                w.put_u32(0);
                put_has(w, Some(stat))?;
                put_has(w, remove)?;
                w.put_presence(true);
                row.encode_values(w)
            }
            Self::ModLinkAtt {
                flags,
                tag,
                mid,
                entry_ids,
            } => {
                w.put_u32(flags);
                w.put_u32(tag.as_u32());
                w.put_u32(mid);
                put_has(w, Some(entry_ids))
            }
            Self::ResolveNames { stat, tags, names } => {
                w.put_u32(0);
                put_has(w, Some(stat))?;
                put_has(w, tags)?;
                put_has(w, Some(names))
            }
            Self::GetTemplateInfo {
                flags,
                display_type,
                template_dn,
                code_page,
                locale,
            } => {
                w.put_u32(flags);
                w.put_u32(display_type);
                w.put_presence(template_dn.is_some());
                if let Some(dn) = template_dn {
                    w.put_cstr8(dn.as_bytes(), "template_info.dn")?;
                }
                w.put_u32(code_page);
                w.put_u32(locale);
                Ok(())
            }
        }
    }
}

/// Parse a response body: service status, operation fields, auxiliary buffer.
///
/// A non-zero `StatusCode` means the service itself failed and is reported
/// as [`TransportError::ServiceStatus`] without reading further.
pub fn decode_response<T: WireDecode>(raw: &[u8]) -> Result<T, TransportError> {
    let mut reader = WireReader::new(raw);
    let status = reader.read_u32("response.status_code")?;
    if status != 0 {
        return Err(TransportError::ServiceStatus { code: status });
    }
    let body = T::decode_from(&mut reader)?;
    let aux_len = reader.read_u32("response.aux_size")? as usize;
    reader.read_bytes(aux_len, "response.aux")?;
    reader.finish("response")?;
    Ok(body)
}

/// Serialize a successful response body with an empty auxiliary buffer.
pub fn encode_response<T: WireEncode>(body: &T) -> Result<Bytes, TransportError> {
    let mut writer = WireWriter::new();
    writer.put_u32(0);
    body.encode_into(&mut writer)?;
    writer.put_u32(0);
    Ok(writer.finish())
}

/// Serialize a response body reporting a service failure.
#[must_use]
pub fn encode_service_failure(status_code: u32) -> Bytes {
    let mut writer = WireWriter::new();
    writer.put_u32(status_code);
    writer.put_u32(0);
    writer.finish()
}

/// Column-driven row data: the column list, then each row's cells in
/// column order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ColumnRows {
    /// Columns every row is laid out against.
    pub columns: PropertyTagArray,
    /// Rows; missing and failed columns appear as `PtypErrorCode` values.
    pub rows: PropertyRowSet,
}

enum Cell<'a> {
    Present(&'a PropertyValue),
    NotFound,
    Error(u32),
}

fn cells<'a>(columns: &PropertyTagArray, row: &'a PropertyRow) -> protocol::Result<Vec<Cell<'a>>> {
    columns
        .iter()
        .map(|column| match row.get_by_id(column.id()) {
            None => Ok(Cell::NotFound),
            Some(value) if value.tag() == column => Ok(Cell::Present(value)),
            Some(value) => match value.as_error_code() {
                Some(code) if code == ErrorCode::NotFound.as_u32() => Ok(Cell::NotFound),
                Some(code) => Ok(Cell::Error(code)),
                None => Err(protocol::Error::TagMismatch {
                    tag: column.as_u32(),
                    tag_type: column.type_code(),
                    payload_type: value.tag().type_code(),
                }),
            },
        })
        .collect()
}

// Each cell is the RPC value payload inside a u32 length frame. This is not
// the AddressBookPropertyValue layout, which is unframed, carries booleans in
// one byte and puts a HasValue byte before strings.
fn put_cell_payload(writer: &mut WireWriter, value: &PropertyValue) -> protocol::Result<()> {
    writer.put_frame(|w| value.value().encode_payload(w))
}

impl WireEncode for ColumnRows {
    fn encode_into(&self, writer: &mut WireWriter) -> protocol::Result<()> {
        self.columns.encode_into(writer)?;
        writer.put_count(self.rows.len(), MAX_ARRAY_COUNT, "row_data.count")?;
        for row in &self.rows {
            let cells = cells(&self.columns, row)?;
            if cells.iter().all(|c| matches!(c, Cell::Present(_))) {
                writer.put_u8(ROW_STANDARD);
                for cell in &cells {
                    if let Cell::Present(value) = cell {
                        put_cell_payload(writer, value)?;
                    }
                }
            } else {
                writer.put_u8(ROW_FLAGGED);
                for cell in &cells {
                    match cell {
                        Cell::Present(value) => {
                            writer.put_u8(CELL_PRESENT);
                            put_cell_payload(writer, value)?;
                        }
                        Cell::NotFound => writer.put_u8(CELL_NOT_FOUND),
                        Cell::Error(code) => {
                            writer.put_u8(CELL_ERROR);
                            writer.put_u32(*code);
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

fn read_cell_payload(
    reader: &mut WireReader<'_>,
    column: PropertyTag,
    values: &mut Vec<PropertyValue>,
    skipped: &mut Vec<PropertyTag>,
) -> protocol::Result<()> {
    let mut frame = reader.read_frame("row_data.cell")?;
    if column.property_type().is_none() {
        tracing::warn!(tag = %column, "skipping column with unsupported type");
        skipped.push(column);
        return Ok(());
    }
    values.push(PropertyValue::decode_payload(column, &mut frame)?);
    frame.finish("row_data.cell")
}

impl WireDecode for ColumnRows {
    fn decode_from(reader: &mut WireReader<'_>) -> protocol::Result<Self> {
        let columns = PropertyTagArray::decode_from(reader)?;
        let count = reader.read_count("row_data.count", MAX_ARRAY_COUNT)?;
        reader.ensure_elements(count, 1, "row_data.count")?;

        let mut rows = Vec::with_capacity(count);
        for _ in 0..count {
            let flag = reader.read_u8("row_data.flag")?;
            let mut values = Vec::with_capacity(columns.len());
            let mut skipped = Vec::new();
            for column in columns.iter() {
                match flag {
                    ROW_STANDARD => read_cell_payload(reader, column, &mut values, &mut skipped)?,
                    ROW_FLAGGED => match reader.read_u8("row_data.cell_flag")? {
                        CELL_PRESENT => {
                            read_cell_payload(reader, column, &mut values, &mut skipped)?;
                        }
                        CELL_NOT_FOUND => values
                            .push(PropertyValue::error(column, ErrorCode::NotFound.as_u32())),
                        CELL_ERROR => {
                            let code = reader.read_u32("row_data.error")?;
                            values.push(PropertyValue::error(column, code));
                        }
                        found => {
                            return Err(protocol::Error::InvalidFlag {
                                field: "row_data.cell_flag",
                                found,
                            });
                        }
                    },
                    found => {
                        return Err(protocol::Error::InvalidFlag {
                            field: "row_data.flag",
                            found,
                        });
                    }
                }
            }
            rows.push(PropertyRow::from_parts(values, skipped)?);
        }

        Ok(Self {
            columns,
            rows: PropertyRowSet::new(rows),
        })
    }
}

/// Response carrying nothing but the error code (unbind, mod-props,
/// mod-link-att).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatusResponse {
    /// Operation status.
    pub error_code: u32,
}

impl WireEncode for StatusResponse {
    fn encode_into(&self, w: &mut WireWriter) -> protocol::Result<()> {
        w.put_u32(self.error_code);
        Ok(())
    }
}

impl WireDecode for StatusResponse {
    fn decode_from(r: &mut WireReader<'_>) -> protocol::Result<Self> {
        Ok(Self {
            error_code: r.read_u32("response.error_code")?,
        })
    }
}

/// Bind response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BindResponse {
    /// Operation status.
    pub error_code: u32,
    /// Server identifier.
    pub server_guid: FlatUid,
}

impl WireEncode for BindResponse {
    fn encode_into(&self, w: &mut WireWriter) -> protocol::Result<()> {
        w.put_u32(self.error_code);
        self.server_guid.encode_into(w)
    }
}

impl WireDecode for BindResponse {
    fn decode_from(r: &mut WireReader<'_>) -> protocol::Result<Self> {
        Ok(Self {
            error_code: r.read_u32("response.error_code")?,
            server_guid: FlatUid::decode_from(r)?,
        })
    }
}

/// Response carrying an optional tag or minimal-ID list (query-columns,
/// get-prop-list, dn-to-mid).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TagsResponse {
    /// Operation status.
    pub error_code: u32,
    /// Returned list.
    pub tags: Option<PropertyTagArray>,
}

impl WireEncode for TagsResponse {
    fn encode_into(&self, w: &mut WireWriter) -> protocol::Result<()> {
        w.put_u32(self.error_code);
        put_has(w, self.tags.as_ref())
    }
}

impl WireDecode for TagsResponse {
    fn decode_from(r: &mut WireReader<'_>) -> protocol::Result<Self> {
        Ok(Self {
            error_code: r.read_u32("response.error_code")?,
            tags: read_has(r, "response.has_tags")?,
        })
    }
}

/// Compare-mids response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CompareMidsResponse {
    /// Operation status.
    pub error_code: u32,
    /// Negative, zero or positive.
    pub result: i32,
}

impl WireEncode for CompareMidsResponse {
    fn encode_into(&self, w: &mut WireWriter) -> protocol::Result<()> {
        w.put_u32(self.error_code);
        w.put_i32(self.result);
        Ok(())
    }
}

impl WireDecode for CompareMidsResponse {
    fn decode_from(r: &mut WireReader<'_>) -> protocol::Result<Self> {
        Ok(Self {
            error_code: r.read_u32("response.error_code")?,
            result: r.read_i32("compare_mids.result")?,
        })
    }
}

/// Response carrying one optional row (get-props, get-template-info).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RowResponse {
    /// Operation status.
    pub error_code: u32,
    /// Code page of string values.
    pub code_page: u32,
    /// Returned row.
    pub row: Option<PropertyRow>,
}

impl WireEncode for RowResponse {
    fn encode_into(&self, w: &mut WireWriter) -> protocol::Result<()> {
        w.put_u32(self.error_code);
        w.put_u32(self.code_page);
        w.put_presence(self.row.is_some());
        match &self.row {
            Some(row) => row.encode_values(w),
            None => Ok(()),
        }
    }
}

impl WireDecode for RowResponse {
    fn decode_from(r: &mut WireReader<'_>) -> protocol::Result<Self> {
        let error_code = r.read_u32("response.error_code")?;
        let code_page = r.read_u32("response.code_page")?;
        let row = if r.read_presence("response.has_row")? {
            Some(PropertyRow::decode_values(r)?)
        } else {
            None
        };
        Ok(Self {
            error_code,
            code_page,
            row,
        })
    }
}

/// Get-special-table response.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SpecialTableResponse {
    /// Operation status.
    pub error_code: u32,
    /// Code page of string values.
    pub code_page: u32,
    /// Hierarchy table version.
    pub version: Option<u32>,
    /// Table rows.
    pub rows: Option<PropertyRowSet>,
}

impl WireEncode for SpecialTableResponse {
    fn encode_into(&self, w: &mut WireWriter) -> protocol::Result<()> {
        w.put_u32(self.error_code);
        w.put_u32(self.code_page);
        w.put_presence(self.version.is_some());
        if let Some(version) = self.version {
            w.put_u32(version);
        }
        w.put_presence(self.rows.is_some());
        if let Some(rows) = &self.rows {
            w.put_count(rows.len(), MAX_ARRAY_COUNT, "special_table.count")?;
            for row in rows {
                row.encode_values(w)?;
            }
        }
        Ok(())
    }
}

impl WireDecode for SpecialTableResponse {
    fn decode_from(r: &mut WireReader<'_>) -> protocol::Result<Self> {
        let error_code = r.read_u32("response.error_code")?;
        let code_page = r.read_u32("response.code_page")?;
        let version = if r.read_presence("special_table.has_version")? {
            Some(r.read_u32("special_table.version")?)
        } else {
            None
        };
        let rows = if r.read_presence("special_table.has_rows")? {
            let count = r.read_count("special_table.count", MAX_ARRAY_COUNT)?;
            r.ensure_elements(count, 4, "special_table.count")?;
            let mut rows = Vec::with_capacity(count);
            for _ in 0..count {
                rows.push(PropertyRow::decode_values(r)?);
            }
            Some(PropertyRowSet::new(rows))
        } else {
            None
        };
        Ok(Self {
            error_code,
            code_page,
            version,
            rows,
        })
    }
}

/// Response carrying a position block and column-driven rows (query-rows,
/// seek-entries).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TableResponse {
    /// Operation status.
    pub error_code: u32,
    /// Updated position block.
    pub stat: Option<Stat>,
    /// Returned rows.
    pub rows: Option<ColumnRows>,
}

impl WireEncode for TableResponse {
    fn encode_into(&self, w: &mut WireWriter) -> protocol::Result<()> {
        w.put_u32(self.error_code);
        put_has(w, self.stat.as_ref())?;
        put_has(w, self.rows.as_ref())
    }
}

impl WireDecode for TableResponse {
    fn decode_from(r: &mut WireReader<'_>) -> protocol::Result<Self> {
        Ok(Self {
            error_code: r.read_u32("response.error_code")?,
            stat: read_has(r, "response.has_state")?,
            rows: read_has(r, "response.has_rows")?,
        })
    }
}

/// Get-matches response.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MatchesResponse {
    /// Operation status.
    pub error_code: u32,
    /// Updated position block.
    pub stat: Option<Stat>,
    /// Minimal IDs of the matches.
    pub mids: Option<PropertyTagArray>,
    /// Requested columns of the matches.
    pub rows: Option<ColumnRows>,
}

impl WireEncode for MatchesResponse {
    fn encode_into(&self, w: &mut WireWriter) -> protocol::Result<()> {
        w.put_u32(self.error_code);
        put_has(w, self.stat.as_ref())?;
        put_has(w, self.mids.as_ref())?;
        put_has(w, self.rows.as_ref())
    }
}

impl WireDecode for MatchesResponse {
    fn decode_from(r: &mut WireReader<'_>) -> protocol::Result<Self> {
        Ok(Self {
            error_code: r.read_u32("response.error_code")?,
            stat: read_has(r, "response.has_state")?,
            mids: read_has(r, "response.has_mids")?,
            rows: read_has(r, "response.has_rows")?,
        })
    }
}

/// Resort-restriction response.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResortResponse {
    /// Operation status.
    pub error_code: u32,
    /// Updated position block.
    pub stat: Option<Stat>,
    /// Sorted minimal IDs.
    pub mids: Option<PropertyTagArray>,
}

impl WireEncode for ResortResponse {
    fn encode_into(&self, w: &mut WireWriter) -> protocol::Result<()> {
        w.put_u32(self.error_code);
        put_has(w, self.stat.as_ref())?;
        put_has(w, self.mids.as_ref())
    }
}

impl WireDecode for ResortResponse {
    fn decode_from(r: &mut WireReader<'_>) -> protocol::Result<Self> {
        Ok(Self {
            error_code: r.read_u32("response.error_code")?,
            stat: read_has(r, "response.has_state")?,
            mids: read_has(r, "response.has_mids")?,
        })
    }
}

/// Resolve-names response.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResolveNamesResponse {
    /// Operation status.
    pub error_code: u32,
    /// Code page of string values.
    pub code_page: u32,
    /// One resolution result per input name.
    pub mids: Option<PropertyTagArray>,
    /// Rows of the resolved objects.
    pub rows: Option<ColumnRows>,
}

impl WireEncode for ResolveNamesResponse {
    fn encode_into(&self, w: &mut WireWriter) -> protocol::Result<()> {
        w.put_u32(self.error_code);
        w.put_u32(self.code_page);
        put_has(w, self.mids.as_ref())?;
        put_has(w, self.rows.as_ref())
    }
}

impl WireDecode for ResolveNamesResponse {
    fn decode_from(r: &mut WireReader<'_>) -> protocol::Result<Self> {
        Ok(Self {
            error_code: r.read_u32("response.error_code")?,
            code_page: r.read_u32("response.code_page")?,
            mids: read_has(r, "response.has_mids")?,
            rows: read_has(r, "response.has_rows")?,
        })
    }
}

/// Update-stat response.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UpdateStatResponse {
    /// Operation status.
    pub error_code: u32,
    /// Updated position block.
    pub stat: Option<Stat>,
    /// Rows moved, when requested.
    pub delta: Option<i32>,
}

impl WireEncode for UpdateStatResponse {
    fn encode_into(&self, w: &mut WireWriter) -> protocol::Result<()> {
        w.put_u32(self.error_code);
        put_has(w, self.stat.as_ref())?;
        w.put_presence(self.delta.is_some());
        if let Some(delta) = self.delta {
            w.put_i32(delta);
        }
        Ok(())
    }
}

impl WireDecode for UpdateStatResponse {
    fn decode_from(r: &mut WireReader<'_>) -> protocol::Result<Self> {
        let error_code = r.read_u32("response.error_code")?;
        let stat = read_has(r, "response.has_state")?;
        let delta = if r.read_presence("update_stat.has_delta")? {
            Some(r.read_i32("update_stat.delta")?)
        } else {
            None
        };
        Ok(Self {
            error_code,
            stat,
            delta,
        })
    }
}
