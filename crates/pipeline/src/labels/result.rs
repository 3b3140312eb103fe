use std::fmt;
use std::sync::{Arc, LazyLock};
use serde::Serialize;
use serde::ser::{SerializeStruct, Serializer};

use super::Labels;
use super::model::sort_by_name;

static EMPTY_LABELS_RESULT: LazyLock<Arc<LabelsResult>> = LazyLock::new(|| {
    let empty = Labels::empty();
    Arc::new(LabelsResult::new(
        empty.to_string(),
        empty.stable_hash(),
        Labels::empty(),
        Labels::empty(),
        Labels::empty(),
    ))
});

/// The single shared result handed out when a query asks for no labels.
pub fn empty_labels_result() -> Arc<LabelsResult> {
    Arc::clone(&EMPTY_LABELS_RESULT)
}

/// A finalized label set with its canonical string and hash.
///
/// Instances live in the builder's result cache and are shared as
/// `Arc<LabelsResult>`. The labels are kept split by category so formatters
/// can tell stream labels apart from structured metadata and parsed values.
#[derive(Debug)]
pub struct LabelsResult {
    repr: String,
    hash: u64,
    stream: Labels,
    structured_metadata: Labels,
    parsed: Labels,
}

impl LabelsResult {
    pub fn new(
        repr: String,
        hash: u64,
        stream: Labels,
        structured_metadata: Labels,
        parsed: Labels,
    ) -> Self {
        Self {
            repr,
            hash,
            stream,
            structured_metadata,
            parsed,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.repr
    }

    pub fn hash(&self) -> u64 {
        self.hash
    }

    /// All categories flattened and sorted by name.
    pub fn labels(&self) -> Labels {
        let mut all = Vec::with_capacity(
            self.stream.len() + self.structured_metadata.len() + self.parsed.len(),
        );
        all.extend(self.stream.iter().cloned());
        all.extend(self.structured_metadata.iter().cloned());
        all.extend(self.parsed.iter().cloned());
        sort_by_name(&mut all);
        Labels::from_sorted(all)
    }

    pub fn stream(&self) -> Option<&Labels> {
        non_empty(&self.stream)
    }

    pub fn structured_metadata(&self) -> Option<&Labels> {
        non_empty(&self.structured_metadata)
    }

    pub fn parsed(&self) -> Option<&Labels> {
        non_empty(&self.parsed)
    }
}

fn non_empty(labels: &Labels) -> Option<&Labels> {
    if labels.is_empty() {
        None
    } else {
        Some(labels)
    }
}

impl fmt::Display for LabelsResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.repr)
    }
}

impl Serialize for LabelsResult {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut state = serializer.serialize_struct("LabelsResult", 5)?;
        state.serialize_field("labels", &self.labels())?;
        state.serialize_field("hash", &self.hash)?;
        state.serialize_field("stream", &self.stream)?;
        state.serialize_field("structured_metadata", &self.structured_metadata)?;
        state.serialize_field("parsed", &self.parsed)?;
        state.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> LabelsResult {
        let stream = Labels::from_pairs(&[("env", "prod")]);
        let meta = Labels::from_pairs(&[("app", "y")]);
        let parsed = Labels::from_pairs(&[("level", "error")]);
        let all = Labels::from_pairs(&[("app", "y"), ("env", "prod"), ("level", "error")]);
        LabelsResult::new(all.to_string(), all.stable_hash(), stream, meta, parsed)
    }

    #[test]
    fn test_labels_is_sorted_flatten() {
        let res = sample();
        assert_eq!(
            res.labels(),
            Labels::from_pairs(&[("app", "y"), ("env", "prod"), ("level", "error")])
        );
        assert_eq!(res.labels().stable_hash(), res.hash());
        assert_eq!(res.as_str(), r#"{app="y", env="prod", level="error"}"#);
    }

    #[test]
    fn test_empty_categories_are_none() {
        let lbs = Labels::from_pairs(&[("env", "prod")]);
        let res = LabelsResult::new(lbs.to_string(), lbs.stable_hash(), lbs, Labels::empty(), Labels::empty());
        assert!(res.stream().is_some());
        assert!(res.structured_metadata().is_none());
        assert!(res.parsed().is_none());
    }

    #[test]
    fn test_empty_result_is_shared() {
        let a = empty_labels_result();
        let b = empty_labels_result();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.as_str(), "{}");
        assert!(a.labels().is_empty());
    }

    #[test]
    fn test_serialize_categories() {
        let json: serde_json::Value = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["labels"]["level"], "error");
        assert_eq!(json["stream"]["env"], "prod");
        assert_eq!(json["structured_metadata"]["app"], "y");
        assert_eq!(json["parsed"]["level"], "error");
    }
}
