//! Grouping — projects a line's labels onto the query's `by`/`without` list.

use std::sync::Arc;

use super::builder::{BaseLabelsBuilder, LabelsBuilder};
use super::category::LabelCategory;
use super::model::{labels_contain, sort_by_name, Label, Labels};
use super::result::{empty_labels_result, LabelsResult};

impl BaseLabelsBuilder {
    /// Cache a projected, sorted label sequence without splitting it into
    /// categories. Grouped output is reported entirely as stream labels.
    pub(super) fn to_uncategorized_result(&mut self, sorted: &[Label]) -> Arc<LabelsResult> {
        let hash = self.hasher.hash(sorted);
        if let Some(cached) = self.cached_result(hash) {
            return cached;
        }
        let labels = Labels::from_sorted(sorted.to_vec());
        let result = LabelsResult::new(labels.to_string(), hash, labels, Labels::empty(), Labels::empty());
        self.cache_result(hash, result)
    }
}

impl LabelsBuilder<'_> {
    /// Finalize the line with the query's grouping applied.
    ///
    /// A line carrying an error is never grouped, so the error label always
    /// reaches the caller.
    pub fn grouped_labels(&mut self) -> Arc<LabelsResult> {
        if self.has_err() {
            self.shared.metrics.record_error_bypass();
            return self.labels_result();
        }
        if self.shared.no_labels {
            return empty_labels_result();
        }

        let no_groups = self.shared.groups.is_empty();
        if self.is_unchanged() {
            if no_groups {
                return Arc::clone(&self.current_result);
            }
            return self.base_group();
        }
        if no_groups {
            return self.labels_result();
        }

        self.shared.metrics.record_grouped();
        if self.shared.without {
            self.without_result()
        } else {
            self.with_result()
        }
    }

    /// Grouping of the untouched stream labels, computed once per line builder.
    fn base_group(&mut self) -> Arc<LabelsResult> {
        if let Some(grouped) = &self.grouped_result {
            return Arc::clone(grouped);
        }

        let projected = if self.shared.without {
            self.base.without(&self.shared.groups)
        } else {
            self.base.keep(&self.shared.groups)
        };
        let result = self.shared.to_uncategorized_result(projected.as_slice());
        self.shared.metrics.record_base_group();
        self.grouped_result = Some(Arc::clone(&result));
        result
    }

    /// `by (...)`: only the group names, resolved in the configured order.
    /// Names found nowhere are left out.
    fn with_result(&mut self) -> Arc<LabelsResult> {
        let mut buf = std::mem::take(&mut self.buf);
        buf.clear();

        let shared = &*self.shared;
        'groups: for g in &shared.groups {
            if shared.del.iter().any(|d| d == g) {
                continue;
            }
            for category in LabelCategory::ALL.iter().rev() {
                if let Some(l) = shared.add[category.index()].iter().find(|l| l.name == *g) {
                    if *category == LabelCategory::StructuredMetadata {
                        shared.referenced_structured_metadata.set(true);
                    }
                    buf.push(l.clone());
                    continue 'groups;
                }
            }
            if let Some(value) = self.base.get(g) {
                buf.push(Label::new(g.as_str(), value));
            }
        }
        sort_by_name(&mut buf);
        buf.dedup_by(|a, b| a.name == b.name);

        let result = self.shared.to_uncategorized_result(&buf);
        self.buf = buf;
        result
    }

    /// `without (...)`: everything except the group names.
    fn without_result(&mut self) -> Arc<LabelsResult> {
        let mut buf = std::mem::take(&mut self.buf);
        buf.clear();

        let shared = &*self.shared;
        for l in self.base.iter() {
            if shared.del.iter().any(|d| *d == l.name)
                || shared.add.iter().any(|staged| labels_contain(staged, &l.name))
                || shared.groups.contains(&l.name)
            {
                continue;
            }
            buf.push(l.clone());
        }

        for category in LabelCategory::ALL {
            for l in &shared.add[category.index()] {
                if shared.groups.contains(&l.name) {
                    // The `without` list reads this metadata name.
                    if category == LabelCategory::StructuredMetadata {
                        shared.referenced_structured_metadata.set(true);
                    }
                    continue;
                }
                buf.push(l.clone());
            }
        }
        sort_by_name(&mut buf);

        let result = self.shared.to_uncategorized_result(&buf);
        self.buf = buf;
        result
    }
}
