use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

const NANOSECONDS_PER_MICROSECOND: u128 = 1_000;

/// Per-client call counters.
#[derive(Debug, Default)]
pub struct CallMetrics {
    calls: AtomicU64,
    attempts: AtomicU64,
    retries: AtomicU64,
    transient_failures: AtomicU64,
    unknown_statuses: AtomicU64,
    position_violations: AtomicU64,
    transport_faults: AtomicU64,
    latency_total_ns: AtomicU64,
    latency_max_ns: AtomicU64,
}

impl CallMetrics {
    /// Fresh counters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub(crate) fn record_call(&self, duration: Duration) {
        self.calls.fetch_add(1, Ordering::Relaxed);
        let nanos = duration
            .as_nanos()
            .min(u128::from(u64::MAX))
            .try_into()
            .unwrap_or(u64::MAX);
        self.latency_total_ns.fetch_add(nanos, Ordering::Relaxed);
        update_max(&self.latency_max_ns, nanos);
    }

    #[inline]
    pub(crate) fn record_attempt(&self) {
        self.attempts.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_retry(&self) {
        self.retries.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_transient_failure(&self) {
        self.transient_failures.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_unknown_status(&self) {
        self.unknown_statuses.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_position_violations(&self, count: usize) {
        self.position_violations
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_transport_fault(&self) {
        self.transport_faults.fetch_add(1, Ordering::Relaxed);
    }

    /// Copy the current counter values.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            calls: self.calls.load(Ordering::Relaxed),
            attempts: self.attempts.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
            transient_failures: self.transient_failures.load(Ordering::Relaxed),
            unknown_statuses: self.unknown_statuses.load(Ordering::Relaxed),
            position_violations: self.position_violations.load(Ordering::Relaxed),
            transport_faults: self.transport_faults.load(Ordering::Relaxed),
            latency_total_ns: self.latency_total_ns.load(Ordering::Relaxed),
            latency_max_ns: self.latency_max_ns.load(Ordering::Relaxed),
        }
    }
}

fn update_max(target: &AtomicU64, candidate: u64) {
    let mut current = target.load(Ordering::Relaxed);
    while candidate > current {
        match target.compare_exchange_weak(
            current,
            candidate,
            Ordering::Relaxed,
            Ordering::Relaxed,
        ) {
            Ok(_) => return,
            Err(old) => current = old,
        }
    }
}

/// Point-in-time copy of [`CallMetrics`].
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Operations dispatched, retries included once.
    pub calls: u64,
    /// Backend exchanges attempted.
    pub attempts: u64,
    /// Attempts made after a transient failure.
    pub retries: u64,
    /// GeneralFailure answers seen.
    pub transient_failures: u64,
    /// Answers with a status outside the known taxonomy.
    pub unknown_statuses: u64,
    /// Position block invariants the server broke.
    pub position_violations: u64,
    /// Transport faults returned as errors.
    pub transport_faults: u64,
    /// Summed call latency.
    pub latency_total_ns: u64,
    /// Slowest call.
    pub latency_max_ns: u64,
}

impl MetricsSnapshot {
    /// Average call latency in microseconds.
    #[must_use]
    pub fn avg_call_latency_us(&self) -> Option<u64> {
        if self.calls == 0 {
            return None;
        }
        let total = u128::from(self.latency_total_ns);
        Some((total / (u128::from(self.calls) * NANOSECONDS_PER_MICROSECOND)) as u64)
    }
}
