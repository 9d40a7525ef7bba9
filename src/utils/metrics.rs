//! Observability and Metrics
//!
//! Counters for lifecycle requests and packet verdicts, one set per
//! interceptor. Uses atomic counters for thread-safe metrics collection.

use crate::core::verdict::{Direction, LifecycleKind, LifecycleOutcome};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::{debug, info};

#[derive(Debug, Default)]
struct LifecycleCounters {
    attempted: AtomicU64,
    applied: AtomicU64,
    cancelled: AtomicU64,
    failed: AtomicU64,
}

impl LifecycleCounters {
    fn record(&self, outcome: &LifecycleOutcome) {
        self.attempted.fetch_add(1, Ordering::Relaxed);
        let counter = match outcome {
            LifecycleOutcome::Applied => &self.applied,
            LifecycleOutcome::Cancelled => &self.cancelled,
            LifecycleOutcome::Failed(_) => &self.failed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Metrics collector for one interceptor
#[derive(Debug)]
pub struct Metrics {
    injections: LifecycleCounters,
    ejections: LifecycleCounters,
    /// Outbound packets seen by the worker
    pub packets_sent: AtomicU64,
    /// Inbound packets seen by the worker
    pub packets_received: AtomicU64,
    /// Packets answered with the drop sentinel
    pub packets_dropped: AtomicU64,
    /// Packets passed back to the transport
    pub packets_forwarded: AtomicU64,
    /// Listener errors and panics on any event
    pub listener_faults: AtomicU64,
    /// Transport threads that gave up waiting for a verdict
    pub verdict_timeouts: AtomicU64,
    /// Start time for uptime calculation
    start_time: Instant,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            injections: LifecycleCounters::default(),
            ejections: LifecycleCounters::default(),
            packets_sent: AtomicU64::new(0),
            packets_received: AtomicU64::new(0),
            packets_dropped: AtomicU64::new(0),
            packets_forwarded: AtomicU64::new(0),
            listener_faults: AtomicU64::new(0),
            verdict_timeouts: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    /// Record the outcome of an inject or eject request
    pub fn lifecycle(&self, kind: LifecycleKind, outcome: &LifecycleOutcome) {
        match kind {
            LifecycleKind::Inject => self.injections.record(outcome),
            LifecycleKind::Eject => self.ejections.record(outcome),
        }
        if outcome.error().is_some_and(|e| e.is_listener_fault()) {
            self.listener_fault();
        }
    }

    /// Record a packet entering the worker
    pub fn packet(&self, direction: Direction) {
        let counter = match direction {
            Direction::Outbound => &self.packets_sent,
            Direction::Inbound => &self.packets_received,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Record the verdict handed back to the transport
    pub fn verdict(&self, forwarded: bool) {
        if forwarded {
            self.packets_forwarded.fetch_add(1, Ordering::Relaxed);
        } else {
            self.packets_dropped.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn listener_fault(&self) {
        self.listener_faults.fetch_add(1, Ordering::Relaxed);
    }

    pub fn verdict_timeout(&self) {
        self.verdict_timeouts.fetch_add(1, Ordering::Relaxed);
    }

    /// Get current metrics snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            injections_total: self.injections.attempted.load(Ordering::Relaxed),
            injections_applied: self.injections.applied.load(Ordering::Relaxed),
            injections_cancelled: self.injections.cancelled.load(Ordering::Relaxed),
            injections_failed: self.injections.failed.load(Ordering::Relaxed),
            ejections_total: self.ejections.attempted.load(Ordering::Relaxed),
            ejections_applied: self.ejections.applied.load(Ordering::Relaxed),
            ejections_cancelled: self.ejections.cancelled.load(Ordering::Relaxed),
            ejections_failed: self.ejections.failed.load(Ordering::Relaxed),
            packets_sent: self.packets_sent.load(Ordering::Relaxed),
            packets_received: self.packets_received.load(Ordering::Relaxed),
            packets_dropped: self.packets_dropped.load(Ordering::Relaxed),
            packets_forwarded: self.packets_forwarded.load(Ordering::Relaxed),
            listener_faults: self.listener_faults.load(Ordering::Relaxed),
            verdict_timeouts: self.verdict_timeouts.load(Ordering::Relaxed),
            uptime_seconds: self.start_time.elapsed().as_secs(),
        }
    }

    /// Log current metrics
    pub fn log_metrics(&self) {
        let snapshot = self.snapshot();
        info!(
            injections_total = snapshot.injections_total,
            injections_applied = snapshot.injections_applied,
            injections_cancelled = snapshot.injections_cancelled,
            injections_failed = snapshot.injections_failed,
            ejections_total = snapshot.ejections_total,
            ejections_applied = snapshot.ejections_applied,
            ejections_cancelled = snapshot.ejections_cancelled,
            ejections_failed = snapshot.ejections_failed,
            packets_sent = snapshot.packets_sent,
            packets_received = snapshot.packets_received,
            packets_dropped = snapshot.packets_dropped,
            packets_forwarded = snapshot.packets_forwarded,
            listener_faults = snapshot.listener_faults,
            verdict_timeouts = snapshot.verdict_timeouts,
            uptime_seconds = snapshot.uptime_seconds,
            "Interception metrics snapshot"
        );
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of metrics at a point in time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub injections_total: u64,
    pub injections_applied: u64,
    pub injections_cancelled: u64,
    pub injections_failed: u64,
    pub ejections_total: u64,
    pub ejections_applied: u64,
    pub ejections_cancelled: u64,
    pub ejections_failed: u64,
    pub packets_sent: u64,
    pub packets_received: u64,
    pub packets_dropped: u64,
    pub packets_forwarded: u64,
    pub listener_faults: u64,
    pub verdict_timeouts: u64,
    pub uptime_seconds: u64,
}

/// Timer for measuring operation duration
pub struct Timer {
    start: Instant,
    operation: &'static str,
}

impl Timer {
    /// Start timing an operation
    pub fn start(operation: &'static str) -> Self {
        Self {
            start: Instant::now(),
            operation,
        }
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        let duration = self.start.elapsed();
        debug!(
            operation = self.operation,
            duration_us = duration.as_micros() as u64,
            "Operation completed"
        );
    }
}
