//! Backend contract shared by the RPC and HTTP transports.

use core::fmt;

use crate::protocol::{
    BinaryArray, FlatUid, PropertyName, PropertyRow, PropertyRowSet, PropertyTag,
    PropertyTagArray, PropertyValue, Restriction, Stat, StringArray, WStringArray,
};

use super::error::TransportError;

/// Which family of transport a backend speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    /// Native RPC channel (`ncacn_ip_tcp` / `ncacn_http`).
    Rpc,
    /// MAPI over HTTP.
    Http,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rpc => write!(f, "rpc"),
            Self::Http => write!(f, "mapi/http"),
        }
    }
}

/// Raw answer of one backend call: the server's status code and whatever
/// the call produced.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Reply<T> {
    /// Status code as returned by the server.
    pub status: u32,
    /// Decoded out-parameters.
    pub payload: T,
}

impl<T> Reply<T> {
    /// Wrap a payload with its status.
    pub fn new(status: u32, payload: T) -> Self {
        Self { status, payload }
    }
}

/// Out-parameters of operations that also return an updated position block.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Positioned<T> {
    /// Position block returned by the server; absent when the server sent none.
    pub stat: Option<Stat>,
    /// The operation's other out-parameters.
    pub value: T,
}

impl<T> Positioned<T> {
    /// Wrap a value with the returned position block.
    pub fn new(stat: Option<Stat>, value: T) -> Self {
        Self { stat, value }
    }
}

/// Minimal IDs plus rows, as returned by get-matches and resolve-names.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MatchSet {
    /// Minimal IDs of the matched (or resolved) objects.
    pub mids: Option<PropertyTagArray>,
    /// Requested columns of those objects.
    pub rows: Option<PropertyRowSet>,
}

/// Hierarchy table returned by get-special-table.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SpecialTable {
    /// Hierarchy table version reported by the server, when any.
    pub version: Option<u32>,
    /// The table rows.
    pub rows: Option<PropertyRowSet>,
}

/// In-parameters of get-matches beyond the position block.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GetMatchesRequest {
    /// Minimal IDs to restrict the search to.
    pub mids: Option<PropertyTagArray>,
    /// Interface option flags, passed through unchanged.
    pub interface_options: u32,
    /// Filter applied to the container.
    pub filter: Option<Restriction>,
    /// Named property to search instead of the container contents.
    pub property_name: Option<PropertyName>,
    /// Maximum number of matches to return.
    pub requested: u32,
    /// Columns to return for every match.
    pub columns: Option<PropertyTagArray>,
}

impl GetMatchesRequest {
    /// Search the current container with a filter.
    #[must_use]
    pub fn with_filter(filter: Restriction, requested: u32) -> Self {
        Self {
            filter: Some(filter),
            requested,
            ..Self::default()
        }
    }

    /// Columns to return.
    #[must_use]
    pub fn columns(mut self, columns: PropertyTagArray) -> Self {
        self.columns = Some(columns);
        self
    }
}

/// Transport-specific half of an NSPI client.
///
/// Each method performs exactly one wire exchange and hands back the raw
/// status code. Faults raised instead of a status (RPC exceptions, HTTP
/// envelope failures) are reported as [`TransportError`]. Retry, status
/// classification and position checks are left to the caller.
pub trait NspiBackend {
    /// Transport family.
    fn kind(&self) -> BackendKind;

    /// Whether a session handle or cookie context is currently held.
    fn has_session(&self) -> bool;

    /// Open a session.
    fn bind(
        &mut self,
        flags: u32,
        stat: &Stat,
        server_guid: Option<FlatUid>,
    ) -> Result<Reply<Option<FlatUid>>, TransportError>;

    /// Close the session. Returns the raw unbind code; the session is
    /// released locally whatever the outcome.
    fn unbind(&mut self) -> Result<u32, TransportError>;

    /// Fetch the hierarchy table or address creation templates.
    fn get_special_table(
        &mut self,
        flags: u32,
        stat: &Stat,
        version: u32,
    ) -> Result<Reply<SpecialTable>, TransportError>;

    /// Recompute the position block, optionally reporting the delta.
    fn update_stat(
        &mut self,
        stat: &Stat,
        delta_requested: bool,
    ) -> Result<Reply<Positioned<Option<i32>>>, TransportError>;

    /// List the columns the server supports.
    fn query_columns(&mut self, flags: u32) -> Result<Reply<Option<PropertyTagArray>>, TransportError>;

    /// List the properties present on one object.
    fn get_prop_list(
        &mut self,
        flags: u32,
        mid: u32,
        code_page: u32,
    ) -> Result<Reply<Option<PropertyTagArray>>, TransportError>;

    /// Read properties of the object at the current position.
    fn get_props(
        &mut self,
        flags: u32,
        stat: &Stat,
        tags: Option<&PropertyTagArray>,
    ) -> Result<Reply<Option<PropertyRow>>, TransportError>;

    /// Read rows from the current container or an explicit table.
    fn query_rows(
        &mut self,
        flags: u32,
        stat: &Stat,
        table: &[u32],
        count: u32,
        columns: Option<&PropertyTagArray>,
    ) -> Result<Reply<Positioned<Option<PropertyRowSet>>>, TransportError>;

    /// Move the position to the first row at or after a target value.
    fn seek_entries(
        &mut self,
        stat: &Stat,
        target: &PropertyValue,
        table: Option<&PropertyTagArray>,
        columns: Option<&PropertyTagArray>,
    ) -> Result<Reply<Positioned<Option<PropertyRowSet>>>, TransportError>;

    /// Search a container with a restriction.
    fn get_matches(
        &mut self,
        stat: &Stat,
        request: &GetMatchesRequest,
    ) -> Result<Reply<Positioned<MatchSet>>, TransportError>;

    /// Sort a list of minimal IDs by the position block's sort order.
    fn resort_restriction(
        &mut self,
        stat: &Stat,
        mids: &PropertyTagArray,
    ) -> Result<Reply<Positioned<Option<PropertyTagArray>>>, TransportError>;

    /// Compare the positions of two objects.
    fn compare_mids(&mut self, stat: &Stat, mid1: u32, mid2: u32) -> Result<Reply<i32>, TransportError>;

    /// Map distinguished names to minimal IDs.
    fn dn_to_mid(&mut self, names: &StringArray) -> Result<Reply<Option<PropertyTagArray>>, TransportError>;

    /// Modify properties of the object at the current position.
    fn mod_props(
        &mut self,
        stat: &Stat,
        remove: Option<&PropertyTagArray>,
        row: &PropertyRow,
    ) -> Result<Reply<()>, TransportError>;

    /// Add or remove values of a link attribute.
    fn mod_link_att(
        &mut self,
        flags: u32,
        tag: PropertyTag,
        mid: u32,
        entry_ids: &BinaryArray,
    ) -> Result<Reply<()>, TransportError>;

    /// Ambiguous name resolution over 8-bit names.
    fn resolve_names(
        &mut self,
        stat: &Stat,
        tags: Option<&PropertyTagArray>,
        names: &StringArray,
    ) -> Result<Reply<MatchSet>, TransportError>;

    /// Ambiguous name resolution over Unicode names.
    fn resolve_names_w(
        &mut self,
        stat: &Stat,
        tags: Option<&PropertyTagArray>,
        names: &WStringArray,
    ) -> Result<Reply<MatchSet>, TransportError>;

    /// Fetch a display or address template.
    fn get_template_info(
        &mut self,
        flags: u32,
        display_type: u32,
        template_dn: Option<&str>,
        code_page: u32,
        locale: u32,
    ) -> Result<Reply<Option<PropertyRow>>, TransportError>;
}

impl<B: NspiBackend + ?Sized> NspiBackend for Box<B> {
    fn kind(&self) -> BackendKind {
        (**self).kind()
    }

    fn has_session(&self) -> bool {
        (**self).has_session()
    }

    fn bind(
        &mut self,
        flags: u32,
        stat: &Stat,
        server_guid: Option<FlatUid>,
    ) -> Result<Reply<Option<FlatUid>>, TransportError> {
        (**self).bind(flags, stat, server_guid)
    }

    fn unbind(&mut self) -> Result<u32, TransportError> {
        (**self).unbind()
    }

    fn get_special_table(
        &mut self,
        flags: u32,
        stat: &Stat,
        version: u32,
    ) -> Result<Reply<SpecialTable>, TransportError> {
        (**self).get_special_table(flags, stat, version)
    }

    fn update_stat(
        &mut self,
        stat: &Stat,
        delta_requested: bool,
    ) -> Result<Reply<Positioned<Option<i32>>>, TransportError> {
        (**self).update_stat(stat, delta_requested)
    }

    fn query_columns(&mut self, flags: u32) -> Result<Reply<Option<PropertyTagArray>>, TransportError> {
        (**self).query_columns(flags)
    }

    fn get_prop_list(
        &mut self,
        flags: u32,
        mid: u32,
        code_page: u32,
    ) -> Result<Reply<Option<PropertyTagArray>>, TransportError> {
        (**self).get_prop_list(flags, mid, code_page)
    }

    fn get_props(
        &mut self,
        flags: u32,
        stat: &Stat,
        tags: Option<&PropertyTagArray>,
    ) -> Result<Reply<Option<PropertyRow>>, TransportError> {
        (**self).get_props(flags, stat, tags)
    }

    fn query_rows(
        &mut self,
        flags: u32,
        stat: &Stat,
        table: &[u32],
        count: u32,
        columns: Option<&PropertyTagArray>,
    ) -> Result<Reply<Positioned<Option<PropertyRowSet>>>, TransportError> {
        (**self).query_rows(flags, stat, table, count, columns)
    }

    fn seek_entries(
        &mut self,
        stat: &Stat,
        target: &PropertyValue,
        table: Option<&PropertyTagArray>,
        columns: Option<&PropertyTagArray>,
    ) -> Result<Reply<Positioned<Option<PropertyRowSet>>>, TransportError> {
        (**self).seek_entries(stat, target, table, columns)
    }

    fn get_matches(
        &mut self,
        stat: &Stat,
        request: &GetMatchesRequest,
    ) -> Result<Reply<Positioned<MatchSet>>, TransportError> {
        (**self).get_matches(stat, request)
    }

    fn resort_restriction(
        &mut self,
        stat: &Stat,
        mids: &PropertyTagArray,
    ) -> Result<Reply<Positioned<Option<PropertyTagArray>>>, TransportError> {
        (**self).resort_restriction(stat, mids)
    }

    fn compare_mids(&mut self, stat: &Stat, mid1: u32, mid2: u32) -> Result<Reply<i32>, TransportError> {
        (**self).compare_mids(stat, mid1, mid2)
    }

    fn dn_to_mid(&mut self, names: &StringArray) -> Result<Reply<Option<PropertyTagArray>>, TransportError> {
        (**self).dn_to_mid(names)
    }

    fn mod_props(
        &mut self,
        stat: &Stat,
        remove: Option<&PropertyTagArray>,
        row: &PropertyRow,
    ) -> Result<Reply<()>, TransportError> {
        (**self).mod_props(stat, remove, row)
    }

    fn mod_link_att(
        &mut self,
        flags: u32,
        tag: PropertyTag,
        mid: u32,
        entry_ids: &BinaryArray,
    ) -> Result<Reply<()>, TransportError> {
        (**self).mod_link_att(flags, tag, mid, entry_ids)
    }

    fn resolve_names(
        &mut self,
        stat: &Stat,
        tags: Option<&PropertyTagArray>,
        names: &StringArray,
    ) -> Result<Reply<MatchSet>, TransportError> {
        (**self).resolve_names(stat, tags, names)
    }

    fn resolve_names_w(
        &mut self,
        stat: &Stat,
        tags: Option<&PropertyTagArray>,
        names: &WStringArray,
    ) -> Result<Reply<MatchSet>, TransportError> {
        (**self).resolve_names_w(stat, tags, names)
    }

    fn get_template_info(
        &mut self,
        flags: u32,
        display_type: u32,
        template_dn: Option<&str>,
        code_page: u32,
        locale: u32,
    ) -> Result<Reply<Option<PropertyRow>>, TransportError> {
        (**self).get_template_info(flags, display_type, template_dn, code_page, locale)
    }
}
