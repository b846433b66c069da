//! Transport-level error types covering RPC faults, HTTP failures and
//! malformed envelopes.

use core::fmt;

use crate::protocol::{self, ErrorCode, Operation};

/// Unified error type for NSPI backend calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The RPC runtime raised an exception instead of returning.
    Fault {
        /// Exception code reported by the runtime.
        code: u32,
    },
    /// The backend has no wire mapping for the operation.
    Unsupported {
        /// Operation that was requested.
        operation: Operation,
    },
    /// A session-scoped call was made without a session handle or cookie context.
    NoSession,
    /// The HTTP server answered with a non-success status line.
    HttpStatus {
        /// HTTP status code.
        status: u16,
    },
    /// `X-ResponseCode` was missing, unparsable or non-zero.
    ResponseCode {
        /// Raw header value, when present.
        value: Option<String>,
    },
    /// The response body reported a non-zero `StatusCode`.
    ServiceStatus {
        /// Value of the `StatusCode` field.
        code: u32,
    },
    /// The chunked envelope could not be parsed.
    MalformedEnvelope {
        /// What was wrong with it.
        reason: &'static str,
    },
    /// Network failure reported by the exchanger.
    Io(String),
    /// Request or response payload failed to encode or decode.
    Codec(protocol::Error),
}

impl TransportError {
    /// Status code this fault stands for, when it maps onto the taxonomy.
    ///
    /// RPC exception codes that are protocol status codes become that
    /// status; an operation the backend cannot carry becomes
    /// [`ErrorCode::NotSupported`].
    #[must_use]
    pub fn status_hint(&self) -> Option<ErrorCode> {
        match self {
            Self::Fault { code } => ErrorCode::from_u32(*code),
            Self::Unsupported { .. } => Some(ErrorCode::NotSupported),
            _ => None,
        }
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fault { code } => write!(f, "rpc fault {code:#010x}"),
            Self::Unsupported { operation } => {
                write!(f, "{operation} is not available on this transport")
            }
            Self::NoSession => write!(f, "no session handle; bind first"),
            Self::HttpStatus { status } => write!(f, "http status {status}"),
            Self::ResponseCode { value: Some(value) } => {
                write!(f, "X-ResponseCode {value}")
            }
            Self::ResponseCode { value: None } => write!(f, "missing X-ResponseCode header"),
            Self::ServiceStatus { code } => write!(f, "service status {code:#010x}"),
            Self::MalformedEnvelope { reason } => write!(f, "malformed envelope: {reason}"),
            Self::Io(err) => write!(f, "io error: {err}"),
            Self::Codec(err) => write!(f, "codec error: {err}"),
        }
    }
}

impl std::error::Error for TransportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Codec(err) => Some(err),
            _ => None,
        }
    }
}

impl From<protocol::Error> for TransportError {
    fn from(err: protocol::Error) -> Self {
        Self::Codec(err)
    }
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
