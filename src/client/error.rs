//! Dispatcher error types

use thiserror::Error;

use crate::protocol::{self, Operation};
use crate::transport::{BackendKind, TransportError};

use super::config::TransportKind;

/// Errors raised by [`NspiClient`](super::NspiClient) operations.
///
/// Protocol status codes in the known taxonomy are never errors; they come
/// back inside an [`Outcome`](super::Outcome).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// A session-scoped operation was called before bind
    #[error("not bound")]
    NotBound,

    /// Bind was called on a bound client
    #[error("already bound")]
    AlreadyBound,

    /// The server returned a status outside the known taxonomy
    #[error("{operation} returned unknown status {code:#010x}")]
    UnknownStatus {
        /// Raw status
        code: u32,
        /// Operation that returned it
        operation: Operation,
    },

    /// The configured transport is not carried by the supplied backend
    #[error("transport {configured} cannot run over a {backend} backend")]
    TransportMismatch {
        /// Transport named in the configuration
        configured: TransportKind,
        /// Backend handed to the client
        backend: BackendKind,
    },

    /// A transport name did not parse
    #[error("unknown transport: {0}")]
    UnknownTransport(String),

    /// A request could not be encoded, or a response could not be decoded
    #[error(transparent)]
    Codec(#[from] protocol::Error),

    /// Transport fault with no status equivalent
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl ClientError {
    /// Lift a backend failure, surfacing codec failures as [`Self::Codec`].
    #[must_use]
    pub fn from_transport(err: TransportError) -> Self {
        match err {
            TransportError::Codec(err) => Self::Codec(err),
            other => Self::Transport(other),
        }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_transport_lifts_codec_failures() {
        let err = TransportError::Codec(protocol::Error::Unterminated { field: "x" });
        assert_eq!(
            ClientError::from_transport(err),
            ClientError::Codec(protocol::Error::Unterminated { field: "x" })
        );
        assert_eq!(
            ClientError::from_transport(TransportError::NoSession),
            ClientError::Transport(TransportError::NoSession)
        );
    }
}
