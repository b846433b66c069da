//! NSPI (Name Service Provider Interface) client
//!
//! This library talks to an address-book server over either of its two
//! transports: native RPC (`ncacn_ip_tcp`, `ncacn_http`) and MAPI over
//! HTTP. It includes the property value codec both transports share, the
//! per-transport request marshalling, and a dispatcher that retries
//! transient failures and checks the position block the server hands back.
//!
//! # Quick Start
//!
//! ```rust
//! use nspi::protocol::{PID_TAG_EMAIL_ADDRESS, PropertyValue, TypedValue};
//!
//! // Encode a property value payload
//! let value = PropertyValue::new(PID_TAG_EMAIL_ADDRESS, TypedValue::Unicode("Alice".into()))?;
//! let bytes = value.encode()?;
//!
//! // Decode it back against the same tag
//! let decoded = PropertyValue::decode(PID_TAG_EMAIL_ADDRESS, &bytes)?;
//! assert_eq!(decoded.as_str(), Some("Alice"));
//! # Ok::<(), nspi::Error>(())
//! ```
//!
//! Operations run through [`NspiClient`]:
//!
//! ```rust,no_run
//! # #[cfg(feature = "http-client")]
//! # fn main() -> Result<(), nspi::client::ClientError> {
//! use nspi::client::{ClientConfig, NspiClient, TransportKind};
//! use nspi::protocol::Stat;
//! use nspi::transport::HttpConfig;
//!
//! let config = ClientConfig::new(TransportKind::MapiHttp)
//!     .with_http(HttpConfig::default().with_url("https://mail.example.com/mapi/nspi/"));
//! let mut client = NspiClient::connect_http(config)?;
//!
//! let mut stat = Stat::new();
//! client.bind(0, &stat, None)?;
//! let rows = client.query_rows(0, &mut stat, &[], 50, None)?;
//! println!("{} rows, status {}", rows.value.map_or(0, |r| r.len()), rows.status);
//! client.unbind()?;
//! # Ok(())
//! # }
//! # #[cfg(not(feature = "http-client"))]
//! # fn main() {}
//! ```
//!
//! # Features
//!
//! - **`serde`** - serialization for configuration types
//! - **`http-client`** - blocking MAPI/HTTP exchanger backed by `ureq`

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::module_name_repetitions)]

pub mod client;
pub mod protocol;
pub mod transport;

pub use client::{ClientConfig, ClientError, NspiClient, Outcome, TransportKind};
pub use protocol::{
    ErrorCode, Error, Operation, PropertyRow, PropertyRowSet, PropertyTag, PropertyType,
    PropertyValue, Result, Stat, TypedValue,
};
pub use transport::{BackendKind, NspiBackend, TransportError};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
