//! RPC backend: marshals each operation into a request stub, hands it to an
//! [`RpcChannel`] and unmarshals the response stub.
//!
//! Stub layout:
//!
//! ```text
//! request:  +----------------+------------------------------+
//!           | context handle | in-parameters in IDL order   |
//!           |   (20 bytes)   | unique ptr = u32 referent +  |
//!           |  (not on bind) | pointee when non-zero        |
//!           +----------------+------------------------------+
//! response: +------------------------------+---------------+
//!           | out-parameters in IDL order  | return (u32)  |
//!           +------------------------------+---------------+
//! ```

use bytes::Bytes;
use tracing::{debug, instrument, trace};
use uuid::Uuid;

use crate::protocol::{
    self, BinaryArray, FlatUid, Operation, PropertyRow, PropertyRowSet, PropertyTag,
    PropertyTagArray, PropertyValue, Stat, StringArray, WStringArray, WireDecode, WireEncode,
    WireReader, WireWriter,
};

use super::backend::{
    BackendKind, GetMatchesRequest, MatchSet, NspiBackend, Positioned, Reply, SpecialTable,
};
use super::error::TransportError;

/// Size of a context handle on the wire.
pub const CONTEXT_HANDLE_SIZE: usize = 20;

/// Native RPC runtime binding for the NSPI interface.
///
/// `invoke` sends one marshalled request stub for `opnum` and returns the
/// response stub. An exception raised by the runtime or the server is
/// reported as [`TransportError::Fault`] with its code.
pub trait RpcChannel {
    /// Perform one call.
    fn invoke(&mut self, opnum: u16, request: Bytes) -> Result<Bytes, TransportError>;
}

impl<C: RpcChannel + ?Sized> RpcChannel for Box<C> {
    fn invoke(&mut self, opnum: u16, request: Bytes) -> Result<Bytes, TransportError> {
        (**self).invoke(opnum, request)
    }
}

/// Server-issued session handle (`NSPI_HANDLE`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ContextHandle {
    attributes: u32,
    uuid: Uuid,
}

impl ContextHandle {
    /// Create a handle from its parts.
    #[must_use]
    pub const fn new(attributes: u32, uuid: Uuid) -> Self {
        Self { attributes, uuid }
    }

    /// Handle attributes.
    #[must_use]
    pub const fn attributes(&self) -> u32 {
        self.attributes
    }

    /// Handle identifier.
    #[must_use]
    pub const fn uuid(&self) -> Uuid {
        self.uuid
    }

    /// A nil handle means the server did not open a session.
    #[must_use]
    pub fn is_nil(&self) -> bool {
        self.attributes == 0 && self.uuid.is_nil()
    }
}

impl WireEncode for ContextHandle {
    fn encode_into(&self, writer: &mut WireWriter) -> protocol::Result<()> {
        writer.put_u32(self.attributes);
        writer.put_bytes(&self.uuid.to_bytes_le());
        Ok(())
    }
}

impl WireDecode for ContextHandle {
    fn decode_from(reader: &mut WireReader<'_>) -> protocol::Result<Self> {
        let attributes = reader.read_u32("context_handle.attributes")?;
        let uuid = Uuid::from_bytes_le(reader.read_array::<16>("context_handle.uuid")?);
        Ok(Self { attributes, uuid })
    }
}

fn put_unique<T: WireEncode>(writer: &mut WireWriter, value: Option<&T>) -> protocol::Result<()> {
    writer.put_pointer(value.is_some());
    match value {
        Some(value) => value.encode_into(writer),
        None => Ok(()),
    }
}

fn read_unique<T: WireDecode>(
    reader: &mut WireReader<'_>,
    field: &'static str,
) -> protocol::Result<Option<T>> {
    if reader.read_pointer(field)? {
        T::decode_from(reader).map(Some)
    } else {
        Ok(None)
    }
}

/// Backend speaking NSPI over a native RPC channel.
#[derive(Debug)]
pub struct RpcBackend<C> {
    channel: C,
    handle: Option<ContextHandle>,
}

impl<C: RpcChannel> RpcBackend<C> {
    /// Create an unbound backend over `channel`.
    pub fn new(channel: C) -> Self {
        Self {
            channel,
            handle: None,
        }
    }

    /// Session handle currently held.
    #[must_use]
    pub fn handle(&self) -> Option<&ContextHandle> {
        self.handle.as_ref()
    }

    /// Underlying channel.
    pub fn channel(&self) -> &C {
        &self.channel
    }

    /// Underlying channel, mutably.
    pub fn channel_mut(&mut self) -> &mut C {
        &mut self.channel
    }

    /// Marshal a session-scoped request: handle first, then `body`.
    fn stub<F>(&self, body: F) -> Result<Bytes, TransportError>
    where
        F: FnOnce(&mut WireWriter) -> protocol::Result<()>,
    {
        let handle = self.handle.ok_or(TransportError::NoSession)?;
        let mut writer = WireWriter::new();
        handle.encode_into(&mut writer)?;
        body(&mut writer)?;
        Ok(writer.finish())
    }

    #[instrument(level = "debug", skip(self, request), fields(opnum = operation.opnum(), len = request.len()))]
    fn invoke(&mut self, operation: Operation, request: Bytes) -> Result<Bytes, TransportError> {
        let response = self.channel.invoke(operation.opnum(), request)?;
        trace!(len = response.len(), "rpc response stub");
        Ok(response)
    }

    /// Run one session-scoped call and unmarshal the out-parameters.
    fn call<B, R, T>(&mut self, operation: Operation, body: B, read: R) -> Result<Reply<T>, TransportError>
    where
        B: FnOnce(&mut WireWriter) -> protocol::Result<()>,
        R: FnOnce(&mut WireReader<'_>) -> protocol::Result<T>,
    {
        let request = self.stub(body)?;
        let response = self.invoke(operation, request)?;
        parse_response(&response, read)
    }
}

fn parse_response<T, R>(response: &[u8], read: R) -> Result<Reply<T>, TransportError>
where
    R: FnOnce(&mut WireReader<'_>) -> protocol::Result<T>,
{
    let mut reader = WireReader::new(response);
    let payload = read(&mut reader)?;
    let status = reader.read_u32("rpc.return")?;
    reader.finish("rpc.response")?;
    Ok(Reply::new(status, payload))
}

impl<C: RpcChannel> NspiBackend for RpcBackend<C> {
    fn kind(&self) -> BackendKind {
        BackendKind::Rpc
    }

    fn has_session(&self) -> bool {
        self.handle.is_some()
    }

    fn bind(
        &mut self,
        flags: u32,
        stat: &Stat,
        server_guid: Option<FlatUid>,
    ) -> Result<Reply<Option<FlatUid>>, TransportError> {
        let mut writer = WireWriter::new();
        writer.put_u32(flags);
        stat.encode_into(&mut writer)?;
        put_unique(&mut writer, server_guid.as_ref())?;

        let response = self.invoke(Operation::Bind, writer.finish())?;
        let reply = parse_response(&response, |r| {
            let guid = read_unique::<FlatUid>(r, "bind.server_guid")?;
            let handle = ContextHandle::decode_from(r)?;
            Ok((guid, handle))
        })?;

        let (guid, handle) = reply.payload;
        if reply.status != 0 {
            return Ok(Reply::new(reply.status, None));
        }
        if handle.is_nil() {
            // A successful bind without a handle leaves nothing to call with.
            return Err(TransportError::NoSession);
        }
        debug!(handle = %handle.uuid(), "rpc session opened");
        self.handle = Some(handle);
        Ok(Reply::new(reply.status, guid))
    }

    fn unbind(&mut self) -> Result<u32, TransportError> {
        let request = self.stub(|w| {
            w.put_u32(0);
            Ok(())
        })?;
        // The handle is gone locally whatever the server says.
        self.handle = None;

        let response = self.invoke(Operation::Unbind, request)?;
        let reply = parse_response(&response, ContextHandle::decode_from)?;
        debug!(code = reply.status, "rpc session closed");
        Ok(reply.status)
    }

    fn get_special_table(
        &mut self,
        flags: u32,
        stat: &Stat,
        version: u32,
    ) -> Result<Reply<SpecialTable>, TransportError> {
        self.call(
            Operation::GetSpecialTable,
            |w| {
                w.put_u32(flags);
                stat.encode_into(w)?;
                w.put_u32(version);
                Ok(())
            },
            |r| {
                let version = r.read_u32("special_table.version")?;
                let rows = read_unique::<PropertyRowSet>(r, "special_table.rows")?;
                Ok(SpecialTable {
                    version: Some(version),
                    rows,
                })
            },
        )
    }

    fn update_stat(
        &mut self,
        stat: &Stat,
        delta_requested: bool,
    ) -> Result<Reply<Positioned<Option<i32>>>, TransportError> {
        self.call(
            Operation::UpdateStat,
            |w| {
                w.put_u32(0);
                stat.encode_into(w)?;
                w.put_pointer(delta_requested);
                if delta_requested {
                    w.put_i32(0);
                }
                Ok(())
            },
            |r| {
                let stat = Stat::decode_from(r)?;
                let delta = if r.read_pointer("update_stat.delta")? {
                    Some(r.read_i32("update_stat.delta")?)
                } else {
                    None
                };
                Ok(Positioned::new(Some(stat), delta))
            },
        )
    }

    fn query_columns(&mut self, flags: u32) -> Result<Reply<Option<PropertyTagArray>>, TransportError> {
        self.call(
            Operation::QueryColumns,
            |w| {
                w.put_u32(0);
                w.put_u32(flags);
                Ok(())
            },
            |r| read_unique(r, "query_columns.columns"),
        )
    }

    fn get_prop_list(
        &mut self,
        flags: u32,
        mid: u32,
        code_page: u32,
    ) -> Result<Reply<Option<PropertyTagArray>>, TransportError> {
        self.call(
            Operation::GetPropList,
            |w| {
                w.put_u32(flags);
                w.put_u32(mid);
                w.put_u32(code_page);
                Ok(())
            },
            |r| read_unique(r, "get_prop_list.tags"),
        )
    }

    fn get_props(
        &mut self,
        flags: u32,
        stat: &Stat,
        tags: Option<&PropertyTagArray>,
    ) -> Result<Reply<Option<PropertyRow>>, TransportError> {
        self.call(
            Operation::GetProps,
            |w| {
                w.put_u32(flags);
                stat.encode_into(w)?;
                put_unique(w, tags)
            },
            |r| read_unique(r, "get_props.row"),
        )
    }

    fn query_rows(
        &mut self,
        flags: u32,
        stat: &Stat,
        table: &[u32],
        count: u32,
        columns: Option<&PropertyTagArray>,
    ) -> Result<Reply<Positioned<Option<PropertyRowSet>>>, TransportError> {
        let explicit = (!table.is_empty()).then(|| PropertyTagArray::from_mids(table));
        self.call(
            Operation::QueryRows,
            |w| {
                w.put_u32(flags);
                stat.encode_into(w)?;
                w.put_count(table.len(), protocol::MAX_ARRAY_COUNT, "query_rows.table")?;
                put_unique(w, explicit.as_ref())?;
                w.put_u32(count);
                put_unique(w, columns)
            },
            |r| {
                let stat = Stat::decode_from(r)?;
                let rows = read_unique::<PropertyRowSet>(r, "query_rows.rows")?;
                Ok(Positioned::new(Some(stat), rows))
            },
        )
    }

    fn seek_entries(
        &mut self,
        stat: &Stat,
        target: &PropertyValue,
        table: Option<&PropertyTagArray>,
        columns: Option<&PropertyTagArray>,
    ) -> Result<Reply<Positioned<Option<PropertyRowSet>>>, TransportError> {
        self.call(
            Operation::SeekEntries,
            |w| {
                w.put_u32(0);
                stat.encode_into(w)?;
                target.encode_into(w)?;
                put_unique(w, table)?;
                put_unique(w, columns)
            },
            |r| {
                let stat = Stat::decode_from(r)?;
                let rows = read_unique::<PropertyRowSet>(r, "seek_entries.rows")?;
                Ok(Positioned::new(Some(stat), rows))
            },
        )
    }

    fn get_matches(
        &mut self,
        stat: &Stat,
        request: &GetMatchesRequest,
    ) -> Result<Reply<Positioned<MatchSet>>, TransportError> {
        self.call(
            Operation::GetMatches,
            |w| {
                w.put_u32(0);
                stat.encode_into(w)?;
                put_unique(w, request.mids.as_ref())?;
                w.put_u32(request.interface_options);
                put_unique(w, request.filter.as_ref())?;
                put_unique(w, request.property_name.as_ref())?;
                w.put_u32(request.requested);
                put_unique(w, request.columns.as_ref())
            },
            |r| {
                let stat = Stat::decode_from(r)?;
                let mids = read_unique(r, "get_matches.mids")?;
                let rows = read_unique(r, "get_matches.rows")?;
                Ok(Positioned::new(Some(stat), MatchSet { mids, rows }))
            },
        )
    }

    fn resort_restriction(
        &mut self,
        stat: &Stat,
        mids: &PropertyTagArray,
    ) -> Result<Reply<Positioned<Option<PropertyTagArray>>>, TransportError> {
        self.call(
            Operation::ResortRestriction,
            |w| {
                w.put_u32(0);
                stat.encode_into(w)?;
                mids.encode_into(w)?;
                w.put_pointer(false);
                Ok(())
            },
            |r| {
                let stat = Stat::decode_from(r)?;
                let mids = read_unique(r, "resort_restriction.mids")?;
                Ok(Positioned::new(Some(stat), mids))
            },
        )
    }

    fn compare_mids(&mut self, stat: &Stat, mid1: u32, mid2: u32) -> Result<Reply<i32>, TransportError> {
        self.call(
            Operation::CompareMids,
            |w| {
                w.put_u32(0);
                stat.encode_into(w)?;
                w.put_u32(mid1);
                w.put_u32(mid2);
                Ok(())
            },
            |r| r.read_i32("compare_mids.result"),
        )
    }

    fn dn_to_mid(&mut self, names: &StringArray) -> Result<Reply<Option<PropertyTagArray>>, TransportError> {
        self.call(
            Operation::DnToMid,
            |w| {
                w.put_u32(0);
                names.encode_into(w)
            },
            |r| read_unique(r, "dn_to_mid.mids"),
        )
    }

    fn mod_props(
        &mut self,
        stat: &Stat,
        remove: Option<&PropertyTagArray>,
        row: &PropertyRow,
    ) -> Result<Reply<()>, TransportError> {
        self.call(
            Operation::ModProps,
            |w| {
                w.put_u32(0);
                stat.encode_into(w)?;
                put_unique(w, remove)?;
                row.encode_into(w)
            },
            |_| Ok(()),
        )
    }

    fn mod_link_att(
        &mut self,
        flags: u32,
        tag: PropertyTag,
        mid: u32,
        entry_ids: &BinaryArray,
    ) -> Result<Reply<()>, TransportError> {
        self.call(
            Operation::ModLinkAtt,
            |w| {
                w.put_u32(flags);
                w.put_u32(tag.as_u32());
                w.put_u32(mid);
                entry_ids.encode_into(w)
            },
            |_| Ok(()),
        )
    }

    fn resolve_names(
        &mut self,
        stat: &Stat,
        tags: Option<&PropertyTagArray>,
        names: &StringArray,
    ) -> Result<Reply<MatchSet>, TransportError> {
        self.call(
            Operation::ResolveNames,
            |w| {
                w.put_u32(0);
                stat.encode_into(w)?;
                put_unique(w, tags)?;
                names.encode_into(w)
            },
            read_match_set,
        )
    }

    fn resolve_names_w(
        &mut self,
        stat: &Stat,
        tags: Option<&PropertyTagArray>,
        names: &WStringArray,
    ) -> Result<Reply<MatchSet>, TransportError> {
        self.call(
            Operation::ResolveNamesW,
            |w| {
                w.put_u32(0);
                stat.encode_into(w)?;
                put_unique(w, tags)?;
                names.encode_into(w)
            },
            read_match_set,
        )
    }

    fn get_template_info(
        &mut self,
        flags: u32,
        display_type: u32,
        template_dn: Option<&str>,
        code_page: u32,
        locale: u32,
    ) -> Result<Reply<Option<PropertyRow>>, TransportError> {
        self.call(
            Operation::GetTemplateInfo,
            |w| {
                w.put_u32(flags);
                w.put_u32(display_type);
                w.put_pointer(template_dn.is_some());
                if let Some(dn) = template_dn {
                    w.put_cstr8(dn.as_bytes(), "get_template_info.dn")?;
                }
                w.put_u32(code_page);
                w.put_u32(locale);
                Ok(())
            },
            |r| read_unique(r, "get_template_info.row"),
        )
    }
}

fn read_match_set(reader: &mut WireReader<'_>) -> protocol::Result<MatchSet> {
    let mids = read_unique(reader, "resolve_names.mids")?;
    let rows = read_unique(reader, "resolve_names.rows")?;
    Ok(MatchSet { mids, rows })
}
