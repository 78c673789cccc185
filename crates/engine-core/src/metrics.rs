use serde::Serialize;
use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

#[derive(Debug, Default)]
struct InnerMetrics {
    rows_read: AtomicU64,
    rows_late: AtomicU64,
    rows_quarantined: AtomicU64,
    rows_written: AtomicU64,
    unrecognized_ops: AtomicU64,
    tombstones: AtomicU64,
}

/// Counters for one curation run. Cloning shares the counters.
#[derive(Debug, Clone)]
pub struct CurationMetrics {
    inner: Arc<InnerMetrics>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub rows_read: u64,
    pub rows_late: u64,
    pub rows_quarantined: u64,
    pub rows_written: u64,
    pub unrecognized_ops: u64,
    pub tombstones: u64,
}

impl CurationMetrics {
    pub fn new() -> Self {
        CurationMetrics {
            inner: Arc::new(InnerMetrics::default()),
        }
    }

    pub fn increment_read(&self, count: u64) {
        self.inner.rows_read.fetch_add(count, Ordering::Relaxed);
    }

    pub fn increment_late(&self, count: u64) {
        self.inner.rows_late.fetch_add(count, Ordering::Relaxed);
    }

    pub fn increment_quarantined(&self, count: u64) {
        self.inner
            .rows_quarantined
            .fetch_add(count, Ordering::Relaxed);
    }

    pub fn increment_written(&self, count: u64) {
        self.inner.rows_written.fetch_add(count, Ordering::Relaxed);
    }

    pub fn increment_unrecognized(&self, count: u64) {
        self.inner
            .unrecognized_ops
            .fetch_add(count, Ordering::Relaxed);
    }

    pub fn increment_tombstones(&self, count: u64) {
        self.inner.tombstones.fetch_add(count, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            rows_read: self.inner.rows_read.load(Ordering::Relaxed),
            rows_late: self.inner.rows_late.load(Ordering::Relaxed),
            rows_quarantined: self.inner.rows_quarantined.load(Ordering::Relaxed),
            rows_written: self.inner.rows_written.load(Ordering::Relaxed),
            unrecognized_ops: self.inner.unrecognized_ops.load(Ordering::Relaxed),
            tombstones: self.inner.tombstones.load(Ordering::Relaxed),
        }
    }
}

impl Default for CurationMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_counters() {
        let metrics = CurationMetrics::new();
        let other = metrics.clone();
        metrics.increment_read(3);
        other.increment_read(2);
        other.increment_tombstones(1);

        let snap = metrics.snapshot();
        assert_eq!(snap.rows_read, 5);
        assert_eq!(snap.tombstones, 1);
        assert_eq!(snap.rows_written, 0);
    }
}
