use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Atomic counters tracking capability and file-serving outcomes.
///
/// All counters use relaxed ordering. For a consistent point-in-time view,
/// call [`snapshot`](Self::snapshot).
#[derive(Debug, Default)]
pub struct MediaMetrics {
    /// Capabilities issued by the URL generator.
    pub issued: AtomicU64,
    /// Full (200) responses started.
    pub served: AtomicU64,
    /// Conditional requests answered with 304.
    pub not_modified: AtomicU64,
    /// Capabilities rejected by the validator.
    pub rejected: AtomicU64,
    /// Records whose blob was missing from storage.
    pub missing_on_disk: AtomicU64,
    /// Read failures after streaming began.
    pub stream_errors: AtomicU64,
    /// Files uploaded.
    pub uploads: AtomicU64,
    /// Records deleted along with their blob.
    pub deletes: AtomicU64,
}

impl MediaMetrics {
    pub fn increment_issued(&self) {
        self.issued.fetch_add(1, Ordering::Relaxed);
    }

    /// Add `n` issued capabilities at once (batch generation).
    pub fn add_issued(&self, n: u64) {
        self.issued.fetch_add(n, Ordering::Relaxed);
    }

    pub fn increment_served(&self) {
        self.served.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_not_modified(&self) {
        self.not_modified.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_missing_on_disk(&self) {
        self.missing_on_disk.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_stream_errors(&self) {
        self.stream_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_uploads(&self) {
        self.uploads.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_deletes(&self) {
        self.deletes.fetch_add(1, Ordering::Relaxed);
    }

    /// Take a consistent point-in-time snapshot of all counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            issued: self.issued.load(Ordering::Relaxed),
            served: self.served.load(Ordering::Relaxed),
            not_modified: self.not_modified.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            missing_on_disk: self.missing_on_disk.load(Ordering::Relaxed),
            stream_errors: self.stream_errors.load(Ordering::Relaxed),
            uploads: self.uploads.load(Ordering::Relaxed),
            deletes: self.deletes.load(Ordering::Relaxed),
        }
    }
}

/// A plain data snapshot of [`MediaMetrics`] at a point in time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub issued: u64,
    pub served: u64,
    pub not_modified: u64,
    pub rejected: u64,
    pub missing_on_disk: u64,
    pub stream_errors: u64,
    pub uploads: u64,
    pub deletes: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_metrics_are_zero() {
        let m = MediaMetrics::default();
        assert_eq!(m.snapshot(), MetricsSnapshot::default());
    }

    #[test]
    fn increment_and_snapshot() {
        let m = MediaMetrics::default();
        m.increment_issued();
        m.add_issued(3);
        m.increment_served();
        m.increment_served();
        m.increment_not_modified();
        m.increment_rejected();
        m.increment_missing_on_disk();
        m.increment_stream_errors();
        m.increment_uploads();
        m.increment_deletes();

        let snap = m.snapshot();
        assert_eq!(snap.issued, 4);
        assert_eq!(snap.served, 2);
        assert_eq!(snap.not_modified, 1);
        assert_eq!(snap.rejected, 1);
        assert_eq!(snap.missing_on_disk, 1);
        assert_eq!(snap.stream_errors, 1);
        assert_eq!(snap.uploads, 1);
        assert_eq!(snap.deletes, 1);
    }

    #[test]
    fn snapshot_serializes_flat() {
        let m = MediaMetrics::default();
        m.increment_uploads();
        let json = serde_json::to_value(m.snapshot()).unwrap();
        assert_eq!(json["uploads"], 1);
        assert_eq!(json["served"], 0);
    }
}
