//! Operation dispatcher
//!
//! [`NspiClient`] exposes one method per NSPI operation and runs it over
//! whichever backend the configuration selects. Every call goes through the
//! same loop:
//!
//! 1. send the request through the backend
//! 2. classify the returned status; a fault that stands for a status
//!    (an RPC exception code, an operation the transport cannot carry) is
//!    classified the same way
//! 3. on `GeneralFailure` with retry enabled, sleep and go back to 1, at
//!    most `max_retry_count` more times
//! 4. reconcile the returned position block against the one sent
//!
//! Unknown statuses fail the call on the first attempt.

mod config;
mod error;
mod metrics;
mod policy;

use std::thread;
use std::time::Instant;

use tracing::{debug, instrument, warn};

use crate::protocol::{
    BinaryArray, ErrorCode, FlatUid, Operation, PropertyRow, PropertyRowSet, PropertyTag,
    PropertyTagArray, PropertyValue, Stat, StringArray, WStringArray,
};
use crate::transport::{
    BackendKind, GetMatchesRequest, HttpBackend, HttpExchange, MatchSet, NspiBackend, Positioned,
    Reply, RpcBackend, RpcChannel, TransportError,
};

pub use config::{ClientConfig, RetryPolicy, TransportKind};
pub use error::{ClientError, Result};
pub use metrics::{CallMetrics, MetricsSnapshot};
pub use policy::{PositionField, PositionPolicy, PositionViolation, reconcile};

/// Result of one dispatched operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome<T> {
    /// Final status, after retries.
    pub status: ErrorCode,
    /// Decoded out-parameters; empty when the call failed.
    pub value: T,
    /// Backend exchanges made, retries included.
    pub attempts: u32,
    /// Position block invariants the server broke.
    pub violations: Vec<PositionViolation>,
}

impl<T> Outcome<T> {
    /// Whether the final status is `Success`.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Take the value.
    pub fn into_value(self) -> T {
        self.value
    }

    /// Transform the value, keeping the rest.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        Outcome {
            status: self.status,
            value: f(self.value),
            attempts: self.attempts,
            violations: self.violations,
        }
    }
}

/// Result of unbind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnbindOutcome {
    /// Raw code the server returned; 1 on success.
    pub code: u32,
    /// Whether the session handle or cookie context was released.
    pub handle_cleared: bool,
}

/// Wire channel handed to [`NspiClient::new`].
pub enum Channel {
    /// Native RPC channel, for `ncacn_ip_tcp` and `ncacn_http`.
    Rpc(Box<dyn RpcChannel>),
    /// HTTP exchanger, for `mapi_http`.
    Http(Box<dyn HttpExchange>),
}

impl Channel {
    /// Backend family the channel feeds.
    #[must_use]
    pub const fn kind(&self) -> BackendKind {
        match self {
            Self::Rpc(_) => BackendKind::Rpc,
            Self::Http(_) => BackendKind::Http,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionState {
    Unbound,
    Bound { server_guid: Option<FlatUid> },
}

/// NSPI client: one operation surface over either transport.
pub struct NspiClient {
    config: ClientConfig,
    backend: Box<dyn NspiBackend>,
    state: SessionState,
    metrics: CallMetrics,
}

impl NspiClient {
    /// Create a client over `channel`.
    ///
    /// Fails with [`ClientError::TransportMismatch`] when the channel does
    /// not carry the configured transport.
    pub fn new(config: ClientConfig, channel: Channel) -> Result<Self> {
        let backend: Box<dyn NspiBackend> = match (config.transport.backend(), channel) {
            (BackendKind::Rpc, Channel::Rpc(channel)) => Box::new(RpcBackend::new(channel)),
            (BackendKind::Http, Channel::Http(exchange)) => {
                Box::new(HttpBackend::new(exchange, config.http.clone()))
            }
            (_, channel) => {
                return Err(ClientError::TransportMismatch {
                    configured: config.transport,
                    backend: channel.kind(),
                });
            }
        };
        Ok(Self::with_backend(config, backend))
    }

    /// Create a client over an existing backend.
    pub fn from_backend(config: ClientConfig, backend: impl NspiBackend + 'static) -> Result<Self> {
        if backend.kind() != config.transport.backend() {
            return Err(ClientError::TransportMismatch {
                configured: config.transport,
                backend: backend.kind(),
            });
        }
        Ok(Self::with_backend(config, Box::new(backend)))
    }

    /// Create a MAPI/HTTP client using the blocking `ureq` exchanger.
    #[cfg(feature = "http-client")]
    pub fn connect_http(config: ClientConfig) -> Result<Self> {
        let exchange = crate::transport::UreqExchange::default();
        Self::new(config, Channel::Http(Box::new(exchange)))
    }

    fn with_backend(config: ClientConfig, backend: Box<dyn NspiBackend>) -> Self {
        debug!(transport = %config.transport, backend = %backend.kind(), "nspi client created");
        Self {
            config,
            backend,
            state: SessionState::Unbound,
            metrics: CallMetrics::new(),
        }
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Backend family in use.
    #[must_use]
    pub fn backend_kind(&self) -> BackendKind {
        self.backend.kind()
    }

    /// Whether bind has succeeded and unbind has not been called.
    #[must_use]
    pub fn is_bound(&self) -> bool {
        matches!(self.state, SessionState::Bound { .. })
    }

    /// Server identifier returned by bind.
    #[must_use]
    pub fn server_guid(&self) -> Option<FlatUid> {
        match self.state {
            SessionState::Bound { server_guid } => server_guid,
            SessionState::Unbound => None,
        }
    }

    /// Counter snapshot.
    #[must_use]
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    fn require_bound(&self) -> Result<()> {
        if self.is_bound() {
            Ok(())
        } else {
            Err(ClientError::NotBound)
        }
    }

    /// Run one operation through the retry loop.
    fn dispatch<T, F>(&mut self, operation: Operation, mut call: F) -> Result<(ErrorCode, T, u32)>
    where
        T: Default,
        F: FnMut(&mut dyn NspiBackend) -> std::result::Result<Reply<T>, TransportError>,
    {
        let started = Instant::now();
        let max_attempts = self.config.retry.max_attempts();
        let mut attempt = 0;

        let result = loop {
            attempt += 1;
            self.metrics.record_attempt();
            debug!(%operation, attempt, "dispatching");

            let reply = match call(self.backend.as_mut()) {
                Ok(reply) => reply,
                Err(err) => match err.status_hint() {
                    Some(status) => {
                        debug!(%operation, %err, %status, "transport fault mapped to status");
                        Reply::new(status.as_u32(), T::default())
                    }
                    None => {
                        self.metrics.record_transport_fault();
                        warn!(%operation, %err, "transport fault");
                        break Err(ClientError::from_transport(err));
                    }
                },
            };

            let Some(status) = ErrorCode::from_u32(reply.status) else {
                self.metrics.record_unknown_status();
                warn!(%operation, code = reply.status, "unknown status");
                break Err(ClientError::UnknownStatus {
                    code: reply.status,
                    operation,
                });
            };

            if status.is_retryable() {
                self.metrics.record_transient_failure();
                if attempt < max_attempts {
                    warn!(%operation, attempt, max_attempts, "transient failure, retrying");
                    thread::sleep(self.config.retry.wait_time);
                    self.metrics.record_retry();
                    continue;
                }
            }

            break Ok((status, reply.payload, attempt));
        };

        self.metrics.record_call(started.elapsed());
        result
    }

    /// Run a session-scoped operation whose position block is input only.
    fn run<T, F>(&mut self, operation: Operation, call: F) -> Result<Outcome<T>>
    where
        T: Default,
        F: FnMut(&mut dyn NspiBackend) -> std::result::Result<Reply<T>, TransportError>,
    {
        self.require_bound()?;
        let (status, value, attempts) = self.dispatch(operation, call)?;
        Ok(Outcome {
            status,
            value,
            attempts,
            violations: Vec::new(),
        })
    }

    /// Run a session-scoped operation that returns an updated position
    /// block, reconcile it and write it back to `stat`.
    fn run_positioned<T, F>(&mut self, operation: Operation, stat: &mut Stat, mut call: F) -> Result<Outcome<T>>
    where
        T: Default,
        F: FnMut(&mut dyn NspiBackend, &Stat) -> std::result::Result<Reply<Positioned<T>>, TransportError>,
    {
        self.require_bound()?;
        let before = *stat;
        let (status, payload, attempts) =
            self.dispatch(operation, |backend| call(backend, &before))?;

        let mut violations = Vec::new();
        if let Some(after) = payload.stat {
            violations = reconcile(
                PositionPolicy::for_operation(operation),
                &before,
                &after,
                status.is_success(),
            );
            for violation in &violations {
                warn!(%operation, %violation, "position block invariant broken");
            }
            self.metrics.record_position_violations(violations.len());
            *stat = after;
        }

        Ok(Outcome {
            status,
            value: payload.value,
            attempts,
            violations,
        })
    }

    /// Open a session.
    #[instrument(level = "debug", skip(self, stat))]
    pub fn bind(
        &mut self,
        flags: u32,
        stat: &Stat,
        server_guid: Option<FlatUid>,
    ) -> Result<Outcome<Option<FlatUid>>> {
        if self.is_bound() {
            return Err(ClientError::AlreadyBound);
        }
        let (status, guid, attempts) =
            self.dispatch(Operation::Bind, |b| b.bind(flags, stat, server_guid))?;
        if status.is_success() {
            if !self.backend.has_session() {
                return Err(ClientError::Transport(TransportError::NoSession));
            }
            debug!(server = ?guid, "bound");
            self.state = SessionState::Bound { server_guid: guid };
        }
        Ok(Outcome {
            status,
            value: guid,
            attempts,
            violations: Vec::new(),
        })
    }

    /// Close the session.
    ///
    /// Never retried; the raw code is reported as is.
    #[instrument(level = "debug", skip(self))]
    pub fn unbind(&mut self) -> Result<UnbindOutcome> {
        self.require_bound()?;
        self.state = SessionState::Unbound;
        self.metrics.record_attempt();

        let started = Instant::now();
        let result = self.backend.unbind();
        self.metrics.record_call(started.elapsed());
        let handle_cleared = !self.backend.has_session();

        match result {
            Ok(code) => {
                debug!(code, handle_cleared, "unbound");
                Ok(UnbindOutcome {
                    code,
                    handle_cleared,
                })
            }
            Err(err) => {
                self.metrics.record_transport_fault();
                Err(ClientError::from_transport(err))
            }
        }
    }

    /// Fetch the address book hierarchy table or the address creation
    /// templates. `version` is sent and, on success, replaced by the
    /// server's version.
    #[instrument(level = "debug", skip(self, stat, version))]
    pub fn get_special_table(
        &mut self,
        flags: u32,
        stat: &Stat,
        version: &mut u32,
    ) -> Result<Outcome<Option<PropertyRowSet>>> {
        let sent = *version;
        let outcome = self.run(Operation::GetSpecialTable, |b| {
            b.get_special_table(flags, stat, sent)
        })?;
        if outcome.is_success() {
            if let Some(returned) = outcome.value.version {
                *version = returned;
            }
        }
        Ok(outcome.map(|table| table.rows))
    }

    /// Recompute the position block. With `delta_requested`, the server
    /// also reports how many rows it moved.
    #[instrument(level = "debug", skip(self, stat))]
    pub fn update_stat(&mut self, stat: &mut Stat, delta_requested: bool) -> Result<Outcome<Option<i32>>> {
        self.run_positioned(Operation::UpdateStat, stat, |b, s| {
            b.update_stat(s, delta_requested)
        })
    }

    /// List the columns the server supports.
    #[instrument(level = "debug", skip(self))]
    pub fn query_columns(&mut self, flags: u32) -> Result<Outcome<Option<PropertyTagArray>>> {
        self.run(Operation::QueryColumns, |b| b.query_columns(flags))
    }

    /// List the properties present on the object `mid`.
    #[instrument(level = "debug", skip(self))]
    pub fn get_prop_list(
        &mut self,
        flags: u32,
        mid: u32,
        code_page: u32,
    ) -> Result<Outcome<Option<PropertyTagArray>>> {
        self.run(Operation::GetPropList, |b| b.get_prop_list(flags, mid, code_page))
    }

    /// Read properties of the object at the current position.
    #[instrument(level = "debug", skip(self, stat, tags))]
    pub fn get_props(
        &mut self,
        flags: u32,
        stat: &Stat,
        tags: Option<&PropertyTagArray>,
    ) -> Result<Outcome<Option<PropertyRow>>> {
        self.run(Operation::GetProps, |b| b.get_props(flags, stat, tags))
    }

    /// Read up to `count` rows from the current container, or from the
    /// explicit table `table` when it is not empty.
    #[instrument(level = "debug", skip(self, stat, table, columns))]
    pub fn query_rows(
        &mut self,
        flags: u32,
        stat: &mut Stat,
        table: &[u32],
        count: u32,
        columns: Option<&PropertyTagArray>,
    ) -> Result<Outcome<Option<PropertyRowSet>>> {
        self.run_positioned(Operation::QueryRows, stat, |b, s| {
            b.query_rows(flags, s, table, count, columns)
        })
    }

    /// Move to the first row whose sort key is at or after `target`.
    #[instrument(level = "debug", skip_all)]
    pub fn seek_entries(
        &mut self,
        stat: &mut Stat,
        target: &PropertyValue,
        table: Option<&PropertyTagArray>,
        columns: Option<&PropertyTagArray>,
    ) -> Result<Outcome<Option<PropertyRowSet>>> {
        self.run_positioned(Operation::SeekEntries, stat, |b, s| {
            b.seek_entries(s, target, table, columns)
        })
    }

    /// Search a container. The only operation allowed to move the position
    /// block to another container.
    #[instrument(level = "debug", skip_all, fields(requested = request.requested))]
    pub fn get_matches(&mut self, stat: &mut Stat, request: &GetMatchesRequest) -> Result<Outcome<MatchSet>> {
        self.run_positioned(Operation::GetMatches, stat, |b, s| b.get_matches(s, request))
    }

    /// Sort `mids` by the position block's sort order.
    #[instrument(level = "debug", skip_all, fields(count = mids.len()))]
    pub fn resort_restriction(
        &mut self,
        stat: &mut Stat,
        mids: &PropertyTagArray,
    ) -> Result<Outcome<Option<PropertyTagArray>>> {
        self.run_positioned(Operation::ResortRestriction, stat, |b, s| {
            b.resort_restriction(s, mids)
        })
    }

    /// Compare the positions of two objects in the current sort order.
    #[instrument(level = "debug", skip(self, stat))]
    pub fn compare_mids(&mut self, stat: &Stat, mid1: u32, mid2: u32) -> Result<Outcome<i32>> {
        self.run(Operation::CompareMids, |b| b.compare_mids(stat, mid1, mid2))
    }

    /// Map distinguished names to minimal IDs; unknown names map to 0.
    #[instrument(level = "debug", skip_all, fields(count = names.0.len()))]
    pub fn dn_to_mid(&mut self, names: &StringArray) -> Result<Outcome<Option<PropertyTagArray>>> {
        self.run(Operation::DnToMid, |b| b.dn_to_mid(names))
    }

    /// Modify the object at the current position: remove the `remove`
    /// properties, then write `row`.
    #[instrument(level = "debug", skip_all)]
    pub fn mod_props(
        &mut self,
        stat: &Stat,
        remove: Option<&PropertyTagArray>,
        row: &PropertyRow,
    ) -> Result<Outcome<()>> {
        self.run(Operation::ModProps, |b| b.mod_props(stat, remove, row))
    }

    /// Add, or with `MOD_LINK_ATT_DELETE` remove, values of a link
    /// attribute on object `mid`.
    #[instrument(level = "debug", skip(self, entry_ids))]
    pub fn mod_link_att(
        &mut self,
        flags: u32,
        tag: PropertyTag,
        mid: u32,
        entry_ids: &BinaryArray,
    ) -> Result<Outcome<()>> {
        self.run(Operation::ModLinkAtt, |b| b.mod_link_att(flags, tag, mid, entry_ids))
    }

    /// Ambiguous name resolution over 8-bit names.
    ///
    /// MAPI/HTTP has no 8-bit variant; over that transport the call
    /// completes with `NotSupported` without a round trip.
    #[instrument(level = "debug", skip_all, fields(count = names.0.len()))]
    pub fn resolve_names(
        &mut self,
        stat: &Stat,
        tags: Option<&PropertyTagArray>,
        names: &StringArray,
    ) -> Result<Outcome<MatchSet>> {
        self.run(Operation::ResolveNames, |b| b.resolve_names(stat, tags, names))
    }

    /// Ambiguous name resolution over Unicode names.
    #[instrument(level = "debug", skip_all, fields(count = names.0.len()))]
    pub fn resolve_names_w(
        &mut self,
        stat: &Stat,
        tags: Option<&PropertyTagArray>,
        names: &WStringArray,
    ) -> Result<Outcome<MatchSet>> {
        self.run(Operation::ResolveNamesW, |b| b.resolve_names_w(stat, tags, names))
    }

    /// Fetch a display or addressing template.
    #[instrument(level = "debug", skip(self))]
    pub fn get_template_info(
        &mut self,
        flags: u32,
        display_type: u32,
        template_dn: Option<&str>,
        code_page: u32,
        locale: u32,
    ) -> Result<Outcome<Option<PropertyRow>>> {
        self.run(Operation::GetTemplateInfo, |b| {
            b.get_template_info(flags, display_type, template_dn, code_page, locale)
        })
    }
}

impl Drop for NspiClient {
    fn drop(&mut self) {
        if !self.is_bound() {
            return;
        }
        match self.unbind() {
            Ok(outcome) => debug!(code = outcome.code, "session released on drop"),
            Err(err) => debug!(%err, "unbind on drop failed"),
        }
    }
}

impl core::fmt::Debug for NspiClient {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("NspiClient")
            .field("transport", &self.config.transport)
            .field("backend", &self.backend.kind())
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}
