//! Bounded string interning for extracted values.
//!
//! Parsers see the same byte spans over and over (field names, enum-like
//! values). The set maps raw bytes to the string built for them the first
//! time; a hit hands out the stored `Arc<str>`. It is a hard cap, not a
//! cache with eviction: once `limit` entries are stored, every further miss
//! calls the constructor and nothing new is kept. Stored entries never move
//! or disappear.

use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

use crate::metrics::{InternOutcome, LabelsMetrics};

pub const MAX_INTERNED_STRINGS: usize = 1024;

#[derive(Debug)]
pub struct InternedStringSet {
    entries: HashMap<Vec<u8>, (Arc<str>, bool)>,
    limit: usize,
    metrics: Option<Arc<LabelsMetrics>>,
}

impl InternedStringSet {
    pub fn new() -> Self {
        Self::with_limit(MAX_INTERNED_STRINGS)
    }

    pub fn with_limit(limit: usize) -> Self {
        Self {
            entries: HashMap::new(),
            limit,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<LabelsMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Return the string stored for `data`, or build it with `create`.
    ///
    /// The boolean travels with the string and reports whether `create`
    /// succeeded when the entry was first made.
    pub fn get<F>(&mut self, data: &[u8], create: F) -> (Arc<str>, bool)
    where
        F: FnOnce() -> (String, bool),
    {
        if let Some((s, ok)) = self.entries.get(data) {
            self.record(InternOutcome::Hit);
            return (Arc::clone(s), *ok);
        }

        let (s, ok) = create();
        let s: Arc<str> = Arc::from(s);
        if self.entries.len() >= self.limit {
            self.record(InternOutcome::Bypassed);
            return (s, ok);
        }

        self.entries.insert(data.to_vec(), (Arc::clone(&s), ok));
        self.record(InternOutcome::Miss);
        if self.entries.len() == self.limit {
            warn!(limit = self.limit, "interned string set is full, further values bypass it");
        }
        (s, ok)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.entries.len() >= self.limit
    }

    #[inline]
    fn record(&self, outcome: InternOutcome) {
        if let Some(metrics) = &self.metrics {
            metrics.record_intern(outcome);
        }
    }
}

impl Default for InternedStringSet {
    fn default() -> Self {
        Self::new()
    }
}
