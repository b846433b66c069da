//! NSPI status codes returned by the server

use std::fmt;

/// Protocol status codes recognized at the operation boundary.
///
/// Any other numeric value is an unknown status and is fatal to the call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum ErrorCode {
    /// The call succeeded
    Success = 0x0000_0000,
    /// Partial success: some names could not be resolved
    ErrorsReturned = 0x0004_0380,
    /// Transient server failure; the only retryable code
    GeneralFailure = 0x8000_4005,
    /// Operation not supported
    NotSupported = 0x8004_0102,
    /// Object is not valid
    InvalidObject = 0x8004_0108,
    /// Server ran out of resources
    OutOfResources = 0x8004_010E,
    /// Object or property not found
    NotFound = 0x8004_010F,
    /// Logon failed
    LogonFailed = 0x8004_0111,
    /// Restriction too complex
    TooComplex = 0x8004_0117,
    /// Code page not supported
    InvalidCodepage = 0x8004_011E,
    /// Locale not supported
    InvalidLocale = 0x8004_011F,
    /// Table too big to return
    TableTooBig = 0x8004_0403,
    /// Bookmark is not valid
    InvalidBookmark = 0x8004_0405,
    /// Name resolves to more than one recipient
    AmbiguousRecipient = 0x8004_0700,
    /// Access denied
    AccessDenied = 0x8007_0005,
    /// Not enough memory
    NotEnoughMemory = 0x8007_000E,
    /// Invalid parameter
    InvalidParameter = 0x8007_0057,
}

impl ErrorCode {
    /// Convert from the wire value
    #[must_use]
    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            0x0000_0000 => Some(Self::Success),
            0x0004_0380 => Some(Self::ErrorsReturned),
            0x8000_4005 => Some(Self::GeneralFailure),
            0x8004_0102 => Some(Self::NotSupported),
            0x8004_0108 => Some(Self::InvalidObject),
            0x8004_010E => Some(Self::OutOfResources),
            0x8004_010F => Some(Self::NotFound),
            0x8004_0111 => Some(Self::LogonFailed),
            0x8004_0117 => Some(Self::TooComplex),
            0x8004_011E => Some(Self::InvalidCodepage),
            0x8004_011F => Some(Self::InvalidLocale),
            0x8004_0403 => Some(Self::TableTooBig),
            0x8004_0405 => Some(Self::InvalidBookmark),
            0x8004_0700 => Some(Self::AmbiguousRecipient),
            0x8007_0005 => Some(Self::AccessDenied),
            0x8007_000E => Some(Self::NotEnoughMemory),
            0x8007_0057 => Some(Self::InvalidParameter),
            _ => None,
        }
    }

    /// Convert to the wire value
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self as u32
    }

    /// Check if this code is the transient failure the dispatcher retries
    #[must_use]
    pub const fn is_retryable(self) -> bool {
        matches!(self, Self::GeneralFailure)
    }

    /// Check if this code reports success
    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Success => "Success",
            Self::ErrorsReturned => "ErrorsReturned",
            Self::GeneralFailure => "GeneralFailure",
            Self::NotSupported => "NotSupported",
            Self::InvalidObject => "InvalidObject",
            Self::OutOfResources => "OutOfResources",
            Self::NotFound => "NotFound",
            Self::LogonFailed => "LogonFailed",
            Self::TooComplex => "TooComplex",
            Self::InvalidCodepage => "InvalidCodepage",
            Self::InvalidLocale => "InvalidLocale",
            Self::TableTooBig => "TableTooBig",
            Self::InvalidBookmark => "InvalidBookmark",
            Self::AmbiguousRecipient => "AmbiguousRecipient",
            Self::AccessDenied => "AccessDenied",
            Self::NotEnoughMemory => "NotEnoughMemory",
            Self::InvalidParameter => "InvalidParameter",
        };
        write!(f, "{name} ({:#010x})", self.as_u32())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_roundtrip() {
        for code in [
            ErrorCode::Success,
            ErrorCode::GeneralFailure,
            ErrorCode::ErrorsReturned,
            ErrorCode::InvalidParameter,
        ] {
            assert_eq!(ErrorCode::from_u32(code.as_u32()), Some(code));
        }
    }

    #[test]
    fn test_unknown_codes() {
        assert_eq!(ErrorCode::from_u32(0x0000_0001), None);
        assert_eq!(ErrorCode::from_u32(0xDEAD_BEEF), None);
    }

    #[test]
    fn test_only_general_failure_retries() {
        assert!(ErrorCode::GeneralFailure.is_retryable());
        assert!(!ErrorCode::NotFound.is_retryable());
        assert!(!ErrorCode::Success.is_retryable());
    }
}
