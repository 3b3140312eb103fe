use std::sync::atomic::{AtomicU64, Ordering};
use serde::Serialize;

/// Outcome of an interner lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InternOutcome {
    /// Served from the set
    Hit,
    /// Created and cached
    Miss,
    /// Created but not cached because the set is full
    Bypassed,
}

/// Forces the wrapped counters onto their own cache line.
#[repr(align(64))]
#[derive(Debug, Default)]
pub struct CacheAligned<T>(pub T);

/// Result cache counters (updated per finalized line)
#[derive(Debug, Default)]
pub struct ResultCacheMetrics {
    pub hits: AtomicU64,
    pub misses: AtomicU64,
    pub unchanged: AtomicU64,
}

/// Grouping counters
#[derive(Debug, Default)]
pub struct GroupingMetrics {
    pub grouped: AtomicU64,
    pub base_group: AtomicU64,
    pub error_bypass: AtomicU64,
}

/// String interner counters
#[derive(Debug, Default)]
pub struct InternMetrics {
    pub hits: AtomicU64,
    pub misses: AtomicU64,
    pub bypassed: AtomicU64,
}

/// Counters for the labels builder.
///
/// A builder is single-threaded, but several builders (one per shard) can
/// share one `Arc<LabelsMetrics>`, so counters are relaxed atomics kept on
/// separate cache lines.
#[derive(Debug, Default)]
pub struct LabelsMetrics {
    pub results: CacheAligned<ResultCacheMetrics>,
    pub grouping: CacheAligned<GroupingMetrics>,
    pub interning: CacheAligned<InternMetrics>,
}

impl LabelsMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn record_cache_hit(&self) {
        self.results.0.hits.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_cache_miss(&self) {
        self.results.0.misses.fetch_add(1, Ordering::Relaxed);
    }

    /// A line finalized without any modification.
    #[inline]
    pub fn record_unchanged(&self) {
        self.results.0.unchanged.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_grouped(&self) {
        self.grouping.0.grouped.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_base_group(&self) {
        self.grouping.0.base_group.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_error_bypass(&self) {
        self.grouping.0.error_bypass.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_intern(&self, outcome: InternOutcome) {
        match outcome {
            InternOutcome::Hit => self.interning.0.hits.fetch_add(1, Ordering::Relaxed),
            InternOutcome::Miss => self.interning.0.misses.fetch_add(1, Ordering::Relaxed),
            InternOutcome::Bypassed => self.interning.0.bypassed.fetch_add(1, Ordering::Relaxed),
        };
    }

    /// Point-in-time copy of the counters. Reads are not transactional.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let cache_hits = self.results.0.hits.load(Ordering::Relaxed);
        let cache_misses = self.results.0.misses.load(Ordering::Relaxed);
        let lookups = cache_hits + cache_misses;

        MetricsSnapshot {
            cache_hits,
            cache_misses,
            unchanged_lines: self.results.0.unchanged.load(Ordering::Relaxed),
            cache_hit_rate: if lookups > 0 {
                cache_hits as f64 / lookups as f64
            } else {
                0.0
            },

            grouped_results: self.grouping.0.grouped.load(Ordering::Relaxed),
            base_group_results: self.grouping.0.base_group.load(Ordering::Relaxed),
            error_bypasses: self.grouping.0.error_bypass.load(Ordering::Relaxed),

            intern_hits: self.interning.0.hits.load(Ordering::Relaxed),
            intern_misses: self.interning.0.misses.load(Ordering::Relaxed),
            intern_bypassed: self.interning.0.bypassed.load(Ordering::Relaxed),
        }
    }
}

/// Read-only copy of [`LabelsMetrics`], cheap to clone and serializable.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    // Result cache
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub unchanged_lines: u64,
    pub cache_hit_rate: f64,

    // Grouping
    pub grouped_results: u64,
    pub base_group_results: u64,
    pub error_bypasses: u64,

    // Interning
    pub intern_hits: u64,
    pub intern_misses: u64,
    pub intern_bypassed: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_metrics_are_empty() {
        let snap = LabelsMetrics::new().snapshot();
        assert_eq!(snap.cache_hits, 0);
        assert_eq!(snap.cache_misses, 0);
        assert_eq!(snap.cache_hit_rate, 0.0);
    }

    #[test]
    fn test_hit_rate() {
        let metrics = LabelsMetrics::new();
        metrics.record_cache_hit();
        metrics.record_cache_hit();
        metrics.record_cache_hit();
        metrics.record_cache_miss();

        let snap = metrics.snapshot();
        assert_eq!(snap.cache_hits, 3);
        assert_eq!(snap.cache_misses, 1);
        assert_eq!(snap.cache_hit_rate, 0.75);
    }

    #[test]
    fn test_intern_outcomes() {
        let metrics = LabelsMetrics::new();
        metrics.record_intern(InternOutcome::Hit);
        metrics.record_intern(InternOutcome::Miss);
        metrics.record_intern(InternOutcome::Bypassed);
        metrics.record_intern(InternOutcome::Bypassed);

        let snap = metrics.snapshot();
        assert_eq!(snap.intern_hits, 1);
        assert_eq!(snap.intern_misses, 1);
        assert_eq!(snap.intern_bypassed, 2);
    }

    #[test]
    fn test_snapshot_serializes() {
        let metrics = LabelsMetrics::new();
        metrics.record_grouped();
        let json = serde_json::to_value(metrics.snapshot()).unwrap();
        assert_eq!(json["grouped_results"], 1);
    }
}
