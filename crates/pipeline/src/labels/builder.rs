//! Labels builder — per-line label mutation with category precedence, and
//! the per-query result cache.
//!
//! One [`BaseLabelsBuilder`] exists per query execution. It owns the
//! configuration fixed for the query (grouping, no-labels), the result
//! cache, and the scratch lists reused across lines. For every line the
//! pipeline calls [`BaseLabelsBuilder::for_labels`] to get a
//! [`LabelsBuilder`] bound to that line's stream labels, lets stages mutate
//! it, finalizes it, and calls [`LabelsBuilder::reset`] before the next line.

use std::borrow::Cow;
use std::cell::Cell;
use std::collections::HashMap;
use std::ops::Deref;
use std::sync::Arc;
use tracing::{debug, trace};

use crate::conf::LabelsConfig;
use crate::hints::{KeyHints, NoParserHints, ParserHint};
use crate::intern::InternedStringSet;
use crate::metrics::LabelsMetrics;
use crate::pool::{self, PooledMap};
use super::category::{categories_contain, LabelCategory, NUM_VALID_CATEGORIES};
use super::hash::Hasher;
use super::model::{labels_contain, labels_to_string, sort_by_name, Label, Labels};
use super::result::LabelsResult;

/// Synthetic label carrying a per-line evaluation error.
pub const ERROR_LABEL: &str = "__error__";
/// Synthetic label carrying details for [`ERROR_LABEL`].
pub const ERROR_DETAILS_LABEL: &str = "__error_details__";
/// Appended to added names that collide with a stream label.
pub const DUPLICATE_SUFFIX: &str = "_extracted";

const LABELS_CAPACITY: usize = 16;
const CACHE_GROWTH_LOG_FLOOR: usize = 1024;

/// Query-scoped state shared by every per-line builder.
///
/// `Send` but not `Sync`: each parallel unit of a query owns its own
/// instance and may move it to the thread that runs it.
pub struct BaseLabelsBuilder {
    // Per-line scratch, cleared by `reset`.
    pub(super) del: Vec<String>,
    pub(super) add: [Vec<Label>; NUM_VALID_CATEGORIES],
    pub(super) err: String,
    pub(super) err_details: String,
    parser_key_hints: Box<dyn ParserHint>,

    // Fixed for the query.
    pub(super) groups: Vec<String>,
    pub(super) without: bool,
    pub(super) no_labels: bool,

    // Query lifetime.
    pub(super) referenced_structured_metadata: Cell<bool>,
    json_paths: HashMap<String, Vec<String>>,
    result_cache: HashMap<u64, Arc<LabelsResult>>,
    pub(super) hasher: Hasher,
    interned: InternedStringSet,
    pub(super) metrics: Arc<LabelsMetrics>,
}

impl BaseLabelsBuilder {
    /// No grouping, no parser hints.
    pub fn new() -> Self {
        Self::with_grouping(Vec::new(), None, false, false)
    }

    /// `groups` keep the caller's order; grouped output is sorted when finalized.
    pub fn with_grouping(
        groups: Vec<String>,
        parser_key_hints: Option<Box<dyn ParserHint>>,
        without: bool,
        no_labels: bool,
    ) -> Self {
        debug!(?groups, without, no_labels, "labels builder created");

        let metrics = Arc::new(LabelsMetrics::new());
        Self {
            del: Vec::with_capacity(5),
            add: [
                Vec::with_capacity(LABELS_CAPACITY),
                Vec::with_capacity(LABELS_CAPACITY),
                Vec::with_capacity(LABELS_CAPACITY),
            ],
            err: String::new(),
            err_details: String::new(),
            parser_key_hints: parser_key_hints.unwrap_or_else(|| Box::new(NoParserHints)),
            groups,
            without,
            no_labels,
            referenced_structured_metadata: Cell::new(false),
            json_paths: HashMap::new(),
            result_cache: HashMap::new(),
            hasher: Hasher::new(),
            interned: InternedStringSet::new().with_metrics(Arc::clone(&metrics)),
            metrics,
        }
    }

    /// Build from query configuration. `required_labels` turns on [`KeyHints`].
    pub fn from_config(config: &LabelsConfig) -> Self {
        let hints = config
            .required_labels
            .clone()
            .map(|required| Box::new(KeyHints::new(required)) as Box<dyn ParserHint>);
        let mut builder = Self::with_grouping(config.groups.clone(), hints, config.without, config.no_labels);
        builder.interned = InternedStringSet::with_limit(config.max_interned_strings)
            .with_metrics(Arc::clone(&builder.metrics));
        builder
    }

    /// Report into shared counters instead of private ones.
    pub fn with_metrics(mut self, metrics: Arc<LabelsMetrics>) -> Self {
        self.interned = std::mem::take(&mut self.interned).with_metrics(Arc::clone(&metrics));
        self.metrics = metrics;
        self
    }

    /// Bind a per-line builder to `base`, hashing it with the shared hasher.
    pub fn for_labels(&mut self, base: Labels) -> LabelsBuilder<'_> {
        let hash = self.hasher.hash(base.as_slice());
        self.for_labels_with_hash(base, hash)
    }

    /// Bind a per-line builder to `base` whose hash the caller already knows.
    pub fn for_labels_with_hash(&mut self, base: Labels, hash: u64) -> LabelsBuilder<'_> {
        let current_result = match self.cached_result(hash) {
            Some(cached) => cached,
            None => {
                let result = LabelsResult::new(
                    base.to_string(),
                    hash,
                    base.clone(),
                    Labels::empty(),
                    Labels::empty(),
                );
                self.cache_result(hash, result)
            }
        };

        LabelsBuilder {
            base,
            buf: Vec::new(),
            current_result,
            grouped_result: None,
            base_map: None,
            shared: self,
        }
    }

    /// Clear per-line state. Configuration, JSON paths and the result
    /// cache are kept.
    pub fn reset(&mut self) {
        self.del.clear();
        for lbls in self.add.iter_mut() {
            lbls.clear();
        }
        self.err.clear();
        self.err_details.clear();
        self.parser_key_hints.reset();
    }

    /// Which labels parser stages should still extract on this line.
    pub fn parser_label_hints(&self) -> &dyn ParserHint {
        self.parser_key_hints.as_ref()
    }

    pub fn parser_label_hints_mut(&mut self) -> &mut dyn ParserHint {
        self.parser_key_hints.as_mut()
    }

    pub fn groups(&self) -> &[String] {
        &self.groups
    }

    pub fn without(&self) -> bool {
        self.without
    }

    pub fn no_labels(&self) -> bool {
        self.no_labels
    }

    /// Whether a structured metadata label was read by a lookup or grouping.
    pub fn referenced_structured_metadata(&self) -> bool {
        self.referenced_structured_metadata.get()
    }

    pub fn cache_len(&self) -> usize {
        self.result_cache.len()
    }

    pub fn metrics(&self) -> &Arc<LabelsMetrics> {
        &self.metrics
    }

    /// Look up or create an interned string for an extracted byte span.
    pub fn intern<F>(&mut self, data: &[u8], create: F) -> (Arc<str>, bool)
    where
        F: FnOnce() -> (String, bool),
    {
        self.interned.get(data, create)
    }

    pub(super) fn has_del(&self) -> bool {
        !self.del.is_empty()
    }

    pub(super) fn has_add(&self) -> bool {
        self.add.iter().any(|lbls| !lbls.is_empty())
    }

    pub(super) fn size_add(&self) -> usize {
        self.add.iter().map(Vec::len).sum()
    }

    pub(super) fn cached_result(&self, hash: u64) -> Option<Arc<LabelsResult>> {
        let cached = self.result_cache.get(&hash).cloned();
        if cached.is_some() {
            trace!(hash, "labels result cache hit");
            self.metrics.record_cache_hit();
        } else {
            self.metrics.record_cache_miss();
        }
        cached
    }

    pub(super) fn cache_result(&mut self, hash: u64, result: LabelsResult) -> Arc<LabelsResult> {
        let result = Arc::new(result);
        self.result_cache.insert(hash, Arc::clone(&result));

        let len = self.result_cache.len();
        if len >= CACHE_GROWTH_LOG_FLOOR && len.is_power_of_two() {
            debug!(entries = len, "labels result cache grew");
        }
        result
    }

    fn delete_with_category(&mut self, category: LabelCategory, name: &str) {
        self.add[category.index()].retain(|l| l.name != name);
    }
}

impl Default for BaseLabelsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Labels for one line: its stream labels plus the staged changes held in
/// the shared builder.
pub struct LabelsBuilder<'a> {
    pub(super) base: Labels,
    pub(super) buf: Vec<Label>,
    pub(super) current_result: Arc<LabelsResult>,
    pub(super) grouped_result: Option<Arc<LabelsResult>>,
    base_map: Option<HashMap<String, String>>,
    pub(super) shared: &'a mut BaseLabelsBuilder,
}

impl<'a> LabelsBuilder<'a> {
    /// Clear per-line state in the shared builder.
    pub fn reset(&mut self) {
        self.shared.reset();
    }

    pub fn parser_label_hints(&self) -> &dyn ParserHint {
        self.shared.parser_label_hints()
    }

    pub fn parser_label_hints_mut(&mut self) -> &mut dyn ParserHint {
        self.shared.parser_label_hints_mut()
    }

    pub fn referenced_structured_metadata(&self) -> bool {
        self.shared.referenced_structured_metadata()
    }

    // --- Errors ---

    pub fn set_err(&mut self, err: impl Into<String>) -> &mut Self {
        self.shared.err = err.into();
        self
    }

    pub fn err(&self) -> &str {
        &self.shared.err
    }

    pub fn has_err(&self) -> bool {
        !self.shared.err.is_empty()
    }

    pub fn reset_error(&mut self) -> &mut Self {
        self.shared.err.clear();
        self
    }

    pub fn set_error_details(&mut self, details: impl Into<String>) -> &mut Self {
        self.shared.err_details = details.into();
        self
    }

    pub fn error_details(&self) -> &str {
        &self.shared.err_details
    }

    pub fn has_error_details(&self) -> bool {
        !self.shared.err_details.is_empty()
    }

    pub fn reset_error_details(&mut self) -> &mut Self {
        self.shared.err_details.clear();
        self
    }

    // --- Lookups ---

    pub fn base(&self) -> &Labels {
        &self.base
    }

    pub fn base_has(&self, name: &str) -> bool {
        self.base.has(name)
    }

    /// Current value and category of `name`.
    ///
    /// Reading a structured metadata label marks it as referenced.
    pub fn get_with_category(&self, name: &str) -> Option<(&str, LabelCategory)> {
        let found = self.resolve(name);
        if let Some((_, LabelCategory::StructuredMetadata)) = found {
            self.shared.referenced_structured_metadata.set(true);
        }
        found
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.get_with_category(name).map(|(v, _)| v)
    }

    /// Category `name` currently resolves to, `Invalid` when absent.
    pub fn category_of(&self, name: &str) -> LabelCategory {
        self.get_with_category(name)
            .map(|(_, c)| c)
            .unwrap_or(LabelCategory::Invalid)
    }

    fn resolve(&self, name: &str) -> Option<(&str, LabelCategory)> {
        // Staged additions are checked before deletions: a name set again
        // after `del` on the same line is visible.
        for category in LabelCategory::ALL.iter().rev() {
            if let Some(l) = self.shared.add[category.index()].iter().find(|l| l.name == name) {
                return Some((l.value.as_str(), *category));
            }
        }
        if self.shared.del.iter().any(|d| d == name) {
            return None;
        }
        self.base.get(name).map(|v| (v, LabelCategory::Stream))
    }

    // --- Mutations ---

    /// Delete labels from every category and from the stream labels.
    pub fn del<I, S>(&mut self, names: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for name in names {
            let name = name.as_ref();
            for category in LabelCategory::ALL {
                self.shared.delete_with_category(category, name);
            }
            self.shared.del.push(name.to_string());
        }
        self
    }

    /// Stage `name=value` in `category`.
    ///
    /// Nothing happens when a higher precedence category already holds
    /// `name`. Setting a higher category evicts `name` from the lower ones.
    pub fn set(&mut self, category: LabelCategory, name: &str, value: impl Into<String>) -> &mut Self {
        match category {
            LabelCategory::Parsed => {
                self.shared.delete_with_category(LabelCategory::StructuredMetadata, name);
                self.shared.delete_with_category(LabelCategory::Stream, name);
            }
            LabelCategory::StructuredMetadata => {
                self.shared.delete_with_category(LabelCategory::Stream, name);
                if labels_contain(&self.shared.add[LabelCategory::Parsed.index()], name) {
                    return self;
                }
            }
            LabelCategory::Stream => {
                if labels_contain(&self.shared.add[LabelCategory::StructuredMetadata.index()], name)
                    || labels_contain(&self.shared.add[LabelCategory::Parsed.index()], name)
                {
                    return self;
                }
            }
            LabelCategory::Invalid => return self,
        }

        let staged = &mut self.shared.add[category.index()];
        if let Some(existing) = staged.iter_mut().find(|l| l.name == name) {
            existing.value = value.into();
            return self;
        }
        staged.push(Label::new(name, value));

        if category == LabelCategory::Parsed {
            // Parsed labels always win, so later parser stages can skip them.
            self.shared.parser_key_hints.record_extracted(name);
        }
        self
    }

    /// Merge externally produced labels into `category`.
    ///
    /// Names colliding with a stream label get [`DUPLICATE_SUFFIX`]. The
    /// error and error-details names fill the error fields instead.
    pub fn add(&mut self, category: LabelCategory, labels: &[Label]) -> &mut Self {
        for l in labels {
            let name: Cow<'_, str> = if self.base_has(&l.name) {
                Cow::Owned(format!("{}{}", l.name, DUPLICATE_SUFFIX))
            } else {
                Cow::Borrowed(&l.name)
            };

            if name == ERROR_LABEL {
                self.shared.err = l.value.clone();
                continue;
            }
            if name == ERROR_DETAILS_LABEL {
                self.shared.err_details = l.value.clone();
                continue;
            }
            self.set(category, &name, l.value.as_str());
        }
        self
    }

    /// Remember the JSON path a label was extracted from. Kept across lines.
    pub fn set_json_path(&mut self, name: impl Into<String>, path: Vec<String>) -> &mut Self {
        self.shared.json_paths.insert(name.into(), path);
        self
    }

    pub fn json_path(&self, name: &str) -> Option<&[String]> {
        self.shared.json_paths.get(name).map(Vec::as_slice)
    }

    // --- Finalization ---

    /// No deletions and no staged additions on this line.
    pub(super) fn is_unchanged(&self) -> bool {
        !self.shared.has_del() && !self.shared.has_add()
    }

    fn append_errors(&self, buf: &mut Vec<Label>) {
        if !self.shared.err.is_empty() {
            buf.push(Label::new(ERROR_LABEL, self.shared.err.as_str()));
        }
        if !self.shared.err_details.is_empty() {
            buf.push(Label::new(ERROR_DETAILS_LABEL, self.shared.err_details.as_str()));
        }
    }

    /// Fill `buf` with the line's labels for `categories` (empty = all), in
    /// no particular order. Error labels come last when `Parsed` is asked for.
    pub fn unsorted_labels(&self, buf: &mut Vec<Label>, categories: &[LabelCategory]) {
        buf.clear();
        let with_parsed = categories_contain(categories, LabelCategory::Parsed);

        if self.is_unchanged() && categories_contain(categories, LabelCategory::Stream) {
            buf.reserve(self.base.len() + 1);
            buf.extend(self.base.iter().cloned());
            if with_parsed {
                self.append_errors(buf);
            }
            return;
        }

        let shared = &*self.shared;
        let stream_add = &shared.add[LabelCategory::Stream.index()];
        let meta_add = &shared.add[LabelCategory::StructuredMetadata.index()];
        let parsed_add = &shared.add[LabelCategory::Parsed.index()];
        buf.reserve(self.base.len() + shared.size_add() + 1);

        if categories_contain(categories, LabelCategory::Stream) {
            for l in self.base.iter() {
                if shared.del.iter().any(|d| *d == l.name) {
                    continue;
                }
                if labels_contain(meta_add, &l.name) || labels_contain(parsed_add, &l.name) {
                    continue;
                }
                match stream_add.iter().find(|a| a.name == l.name) {
                    Some(replacement) => buf.push(replacement.clone()),
                    None => buf.push(l.clone()),
                }
            }
        }

        if categories_contain(categories, LabelCategory::StructuredMetadata) {
            buf.extend(
                meta_add
                    .iter()
                    .filter(|l| !labels_contain(parsed_add, &l.name))
                    .cloned(),
            );
        }

        if with_parsed {
            buf.extend(parsed_add.iter().cloned());
            self.append_errors(buf);
        }
    }

    /// The line's labels for `categories` (empty = all), sorted by name.
    pub fn labels(&mut self, categories: &[LabelCategory]) -> &[Label] {
        let mut buf = std::mem::take(&mut self.buf);
        self.unsorted_labels(&mut buf, categories);
        sort_by_name(&mut buf);
        self.buf = buf;
        &self.buf
    }

    /// Finalize the line without grouping.
    ///
    /// Every distinct label set gets exactly one `LabelsResult` for the
    /// query; equal sets share the same `Arc`.
    pub fn labels_result(&mut self) -> Arc<LabelsResult> {
        if self.is_unchanged() && !self.has_err() {
            self.shared.metrics.record_unchanged();
            return Arc::clone(&self.current_result);
        }

        let mut buf = std::mem::take(&mut self.buf);
        self.unsorted_labels(&mut buf, &[]);
        sort_by_name(&mut buf);
        let hash = self.shared.hasher.hash(&buf);

        let result = match self.shared.cached_result(hash) {
            Some(cached) => cached,
            None => {
                let result = self.categorize(&buf, hash);
                self.shared.cache_result(hash, result)
            }
        };
        self.buf = buf;
        result
    }

    /// Split a sorted, finalized sequence back into its categories.
    fn categorize(&self, sorted: &[Label], hash: u64) -> LabelsResult {
        let meta_add = &self.shared.add[LabelCategory::StructuredMetadata.index()];
        let parsed_add = &self.shared.add[LabelCategory::Parsed.index()];

        let mut stream = Vec::new();
        let mut meta = Vec::new();
        let mut parsed = Vec::new();
        for l in sorted {
            if l.name == ERROR_LABEL || l.name == ERROR_DETAILS_LABEL || labels_contain(parsed_add, &l.name) {
                parsed.push(l.clone());
            } else if labels_contain(meta_add, &l.name) {
                meta.push(l.clone());
            } else {
                stream.push(l.clone());
            }
        }

        LabelsResult::new(
            labels_to_string(sorted),
            hash,
            Labels::from_sorted(stream),
            Labels::from_sorted(meta),
            Labels::from_sorted(parsed),
        )
    }

    /// `name -> value` view of the line.
    ///
    /// Unchanged lines share one map built from the stream labels; modified
    /// lines get a map on loan from the global pool.
    pub fn map(&mut self) -> LabelsMap<'_> {
        if self.is_unchanged() && !self.has_err() {
            let base = &self.base;
            return LabelsMap::Base(self.base_map.get_or_insert_with(|| base.to_map()));
        }

        let mut buf = std::mem::take(&mut self.buf);
        self.unsorted_labels(&mut buf, &[]);
        let mut map = pool::global().get_pooled();
        map.extend(buf.iter().map(|l| (l.name.clone(), l.value.clone())));
        self.buf = buf;
        LabelsMap::Pooled(map)
    }

    /// Insert the line's labels into `dest`. Existing entries are not cleared.
    pub fn into_map(&mut self, dest: &mut HashMap<String, String>) {
        if self.is_unchanged() && !self.has_err() {
            let base = &self.base;
            let base_map = self.base_map.get_or_insert_with(|| base.to_map());
            dest.extend(base_map.iter().map(|(k, v)| (k.clone(), v.clone())));
            return;
        }

        let mut buf = std::mem::take(&mut self.buf);
        self.unsorted_labels(&mut buf, &[]);
        dest.extend(buf.iter().map(|l| (l.name.clone(), l.value.clone())));
        self.buf = buf;
    }
}

/// Map view returned by [`LabelsBuilder::map`].
#[derive(Debug)]
pub enum LabelsMap<'a> {
    /// Cached view of the unchanged stream labels
    Base(&'a HashMap<String, String>),
    /// Built for a modified line; goes back to the pool on drop
    Pooled(PooledMap<'static>),
}

impl LabelsMap<'_> {
    pub fn is_pooled(&self) -> bool {
        matches!(self, LabelsMap::Pooled(_))
    }
}

impl Deref for LabelsMap<'_> {
    type Target = HashMap<String, String>;

    fn deref(&self) -> &Self::Target {
        match self {
            LabelsMap::Base(m) => m,
            LabelsMap::Pooled(m) => m,
        }
    }
}
