//! NSPI operation vocabulary shared by both transports

use std::fmt;

/// Logical NSPI operations.
///
/// Each operation maps to one RPC procedure number and one MAPI/HTTP
/// `X-RequestType` label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Open a session
    Bind,
    /// Close a session
    Unbind,
    /// Move the position block
    UpdateStat,
    /// Read rows from the current table
    QueryRows,
    /// Position on the first row at or after a value
    SeekEntries,
    /// Build an explicit table from a restriction
    GetMatches,
    /// Sort an explicit table
    ResortRestriction,
    /// Map distinguished names to minimal IDs
    DnToMid,
    /// List properties present on an object
    GetPropList,
    /// Read properties of one object
    GetProps,
    /// Compare the positions of two objects
    CompareMids,
    /// Modify properties of one object
    ModProps,
    /// Read the hierarchy or address-creation table
    GetSpecialTable,
    /// Read a display or creation template
    GetTemplateInfo,
    /// Modify a link-valued attribute
    ModLinkAtt,
    /// List columns the server can return
    QueryColumns,
    /// Resolve 8-bit ambiguous names
    ResolveNames,
    /// Resolve Unicode ambiguous names
    ResolveNamesW,
}

impl Operation {
    /// RPC procedure number
    #[must_use]
    pub const fn opnum(self) -> u16 {
        match self {
            Self::Bind => 0,
            Self::Unbind => 1,
            Self::UpdateStat => 2,
            Self::QueryRows => 3,
            Self::SeekEntries => 4,
            Self::GetMatches => 5,
            Self::ResortRestriction => 6,
            Self::DnToMid => 7,
            Self::GetPropList => 8,
            Self::GetProps => 9,
            Self::CompareMids => 10,
            Self::ModProps => 11,
            Self::GetSpecialTable => 12,
            Self::GetTemplateInfo => 13,
            Self::ModLinkAtt => 14,
            Self::QueryColumns => 16,
            Self::ResolveNames => 19,
            Self::ResolveNamesW => 20,
        }
    }

    /// Convert from an RPC procedure number
    #[must_use]
    pub fn from_opnum(opnum: u16) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.opnum() == opnum)
    }

    /// MAPI/HTTP request type label, `None` for RPC-only operations
    #[must_use]
    pub const fn request_type(self) -> Option<&'static str> {
        match self {
            Self::Bind => Some("Bind"),
            Self::Unbind => Some("Unbind"),
            Self::UpdateStat => Some("UpdateStat"),
            Self::QueryRows => Some("QueryRows"),
            Self::SeekEntries => Some("SeekEntries"),
            Self::GetMatches => Some("GetMatches"),
            Self::ResortRestriction => Some("ResortRestriction"),
            Self::DnToMid => Some("DNToMId"),
            Self::GetPropList => Some("GetPropList"),
            Self::GetProps => Some("GetProps"),
            Self::CompareMids => Some("CompareMIds"),
            Self::ModProps => Some("ModProps"),
            Self::GetSpecialTable => Some("GetSpecialTable"),
            Self::GetTemplateInfo => Some("GetTemplateInfo"),
            Self::ModLinkAtt => Some("ModLinkAtt"),
            Self::QueryColumns => Some("QueryColumns"),
            Self::ResolveNames => None,
            Self::ResolveNamesW => Some("ResolveNames"),
        }
    }

    /// Every operation, in opnum order
    pub const ALL: [Self; 18] = [
        Self::Bind,
        Self::Unbind,
        Self::UpdateStat,
        Self::QueryRows,
        Self::SeekEntries,
        Self::GetMatches,
        Self::ResortRestriction,
        Self::DnToMid,
        Self::GetPropList,
        Self::GetProps,
        Self::CompareMids,
        Self::ModProps,
        Self::GetSpecialTable,
        Self::GetTemplateInfo,
        Self::ModLinkAtt,
        Self::QueryColumns,
        Self::ResolveNames,
        Self::ResolveNamesW,
    ];
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Bind => "NspiBind",
            Self::Unbind => "NspiUnbind",
            Self::UpdateStat => "NspiUpdateStat",
            Self::QueryRows => "NspiQueryRows",
            Self::SeekEntries => "NspiSeekEntries",
            Self::GetMatches => "NspiGetMatches",
            Self::ResortRestriction => "NspiResortRestriction",
            Self::DnToMid => "NspiDNToMId",
            Self::GetPropList => "NspiGetPropList",
            Self::GetProps => "NspiGetProps",
            Self::CompareMids => "NspiCompareMIds",
            Self::ModProps => "NspiModProps",
            Self::GetSpecialTable => "NspiGetSpecialTable",
            Self::GetTemplateInfo => "NspiGetTemplateInfo",
            Self::ModLinkAtt => "NspiModLinkAtt",
            Self::QueryColumns => "NspiQueryColumns",
            Self::ResolveNames => "NspiResolveNames",
            Self::ResolveNamesW => "NspiResolveNamesW",
        };
        write!(f, "{name}")
    }
}
