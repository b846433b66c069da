//! Client configuration.

use core::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::transport::{BackendKind, HttpConfig};

use super::error::ClientError;

/// Wire transport selected for a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum TransportKind {
    /// MAPI over HTTP.
    MapiHttp,
    /// RPC over HTTP.
    NcacnHttp,
    /// RPC over TCP.
    #[default]
    NcacnIpTcp,
}

impl TransportKind {
    /// Backend family this transport is carried by.
    #[must_use]
    pub const fn backend(self) -> BackendKind {
        match self {
            Self::MapiHttp => BackendKind::Http,
            Self::NcacnHttp | Self::NcacnIpTcp => BackendKind::Rpc,
        }
    }

    /// Configuration spelling.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MapiHttp => "mapi_http",
            Self::NcacnHttp => "ncacn_http",
            Self::NcacnIpTcp => "ncacn_ip_tcp",
        }
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransportKind {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        [Self::MapiHttp, Self::NcacnHttp, Self::NcacnIpTcp]
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ClientError::UnknownTransport(s.to_owned()))
    }
}

/// Retry behavior for transient failures.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retry_count: u32,
    /// Pause between attempts.
    pub wait_time: Duration,
    /// When off, every operation is attempted exactly once.
    pub enabled: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retry_count: 3,
            wait_time: Duration::from_secs(1),
            enabled: true,
        }
    }
}

impl RetryPolicy {
    /// Never retry.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Most attempts one operation may take.
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        if self.enabled {
            self.max_retry_count.saturating_add(1)
        } else {
            1
        }
    }
}

/// Client configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ClientConfig {
    /// Wire transport.
    pub transport: TransportKind,
    /// Retry behavior.
    pub retry: RetryPolicy,
    /// Endpoint settings for the HTTP transport.
    pub http: HttpConfig,
}

impl ClientConfig {
    /// Configuration for a transport with default settings.
    #[must_use]
    pub fn new(transport: TransportKind) -> Self {
        Self {
            transport,
            ..Self::default()
        }
    }

    /// Replace the retry policy.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Set the retry count.
    #[must_use]
    pub fn with_max_retry_count(mut self, count: u32) -> Self {
        self.retry.max_retry_count = count;
        self
    }

    /// Set the pause between attempts.
    #[must_use]
    pub fn with_wait_time(mut self, wait: Duration) -> Self {
        self.retry.wait_time = wait;
        self
    }

    /// Turn retry on or off.
    #[must_use]
    pub fn with_retry_enabled(mut self, enabled: bool) -> Self {
        self.retry.enabled = enabled;
        self
    }

    /// Replace the HTTP settings.
    #[must_use]
    pub fn with_http(mut self, http: HttpConfig) -> Self {
        self.http = http;
        self
    }
}
