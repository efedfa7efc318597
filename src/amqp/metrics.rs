//! Per-hook publish counters

use super::error::FailureKind;
use std::sync::atomic::{AtomicU64, Ordering};

/// Outcome counters for one AMQP hook
///
/// # Example
///
/// ```
/// use rust_logger_amqp::amqp::{FailureKind, HookMetrics};
///
/// let metrics = HookMetrics::new();
/// metrics.record_fire();
/// metrics.record_failure(FailureKind::Connection);
///
/// assert_eq!(metrics.fired(), 1);
/// assert_eq!(metrics.failures(FailureKind::Connection), 1);
/// assert_eq!(metrics.published(), 0);
/// ```
#[derive(Debug, Default)]
pub struct HookMetrics {
    fired: AtomicU64,
    published: AtomicU64,
    failures: [AtomicU64; 5],
}

impl HookMetrics {
    /// Create counters starting at zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the number of entries handed to the hook
    #[inline]
    pub fn fired(&self) -> u64 {
        self.fired.load(Ordering::Relaxed)
    }

    /// Get the number of entries the broker accepted
    #[inline]
    pub fn published(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }

    /// Get the number of failed publishes of one kind
    #[inline]
    pub fn failures(&self, kind: FailureKind) -> u64 {
        self.failures[Self::slot(kind)].load(Ordering::Relaxed)
    }

    /// Get the number of failed publishes of any kind
    pub fn total_failures(&self) -> u64 {
        FailureKind::ALL.iter().map(|kind| self.failures(*kind)).sum()
    }

    /// Record one entry handed to the hook, returning the previous count
    #[inline]
    pub fn record_fire(&self) -> u64 {
        self.fired.fetch_add(1, Ordering::Relaxed)
    }

    /// Record one accepted publish
    #[inline]
    pub fn record_published(&self) -> u64 {
        self.published.fetch_add(1, Ordering::Relaxed)
    }

    /// Record one failed publish of `kind`
    #[inline]
    pub fn record_failure(&self, kind: FailureKind) -> u64 {
        self.failures[Self::slot(kind)].fetch_add(1, Ordering::Relaxed)
    }

    fn slot(kind: FailureKind) -> usize {
        match kind {
            FailureKind::Connection => 0,
            FailureKind::Channel => 1,
            FailureKind::QueueDeclaration => 2,
            FailureKind::Serialization => 3,
            FailureKind::Publish => 4,
        }
    }
}
