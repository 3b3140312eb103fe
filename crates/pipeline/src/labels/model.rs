use std::collections::HashMap;
use std::fmt;
use serde::{Serialize, Deserialize};

use crate::serde_utils::{serialize_labels_as_map, deserialize_labels_from_map};
use super::hash::hash_labels;

/// A single name/value pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Label {
    pub name: String,
    pub value: String,
}

impl Label {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// A label set ordered by name.
///
/// Serializes as an object of `name -> value`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Labels(
    #[serde(
        serialize_with = "serialize_labels_as_map",
        deserialize_with = "deserialize_labels_from_map"
    )]
    Vec<Label>,
);

impl Labels {
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    /// Build a label set, sorting by name.
    pub fn new<I>(labels: I) -> Self
    where
        I: IntoIterator<Item = Label>,
    {
        let mut labels: Vec<Label> = labels.into_iter().collect();
        sort_by_name(&mut labels);
        Self(labels)
    }

    pub fn from_pairs(pairs: &[(&str, &str)]) -> Self {
        Self::new(pairs.iter().map(|(n, v)| Label::new(*n, *v)))
    }

    /// Wrap a sequence the caller has already sorted.
    pub(crate) fn from_sorted(labels: Vec<Label>) -> Self {
        debug_assert!(labels.windows(2).all(|w| w[0].name <= w[1].name));
        Self(labels)
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.iter().find(|l| l.name == name).map(|l| l.value.as_str())
    }

    pub fn has(&self, name: &str) -> bool {
        self.0.iter().any(|l| l.name == name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Label> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[Label] {
        &self.0
    }

    pub fn to_map(&self) -> HashMap<String, String> {
        self.0
            .iter()
            .map(|l| (l.name.clone(), l.value.clone()))
            .collect()
    }

    /// Only the labels whose name is listed.
    pub fn keep(&self, names: &[String]) -> Labels {
        Self(
            self.0
                .iter()
                .filter(|l| names.iter().any(|n| *n == l.name))
                .cloned()
                .collect(),
        )
    }

    /// Every label except the listed names.
    pub fn without(&self, names: &[String]) -> Labels {
        Self(
            self.0
                .iter()
                .filter(|l| !names.iter().any(|n| *n == l.name))
                .cloned()
                .collect(),
        )
    }

    /// Hash with the same function the result cache uses.
    pub fn stable_hash(&self) -> u64 {
        hash_labels(&self.0)
    }
}

impl<'a> IntoIterator for &'a Labels {
    type Item = &'a Label;
    type IntoIter = std::slice::Iter<'a, Label>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl fmt::Display for Labels {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_labels(f, &self.0)
    }
}

pub(crate) fn sort_by_name(labels: &mut [Label]) {
    labels.sort_by(|a, b| a.name.cmp(&b.name));
}

pub(crate) fn labels_contain(labels: &[Label], name: &str) -> bool {
    labels.iter().any(|l| l.name == name)
}

/// Canonical form: `{a="1", b="2"}`.
pub(crate) fn labels_to_string(labels: &[Label]) -> String {
    DisplayLabels(labels).to_string()
}

struct DisplayLabels<'a>(&'a [Label]);

impl fmt::Display for DisplayLabels<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_labels(f, self.0)
    }
}

fn write_labels(f: &mut fmt::Formatter<'_>, labels: &[Label]) -> fmt::Result {
    f.write_str("{")?;
    for (i, l) in labels.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{}={:?}", l.name, l.value)?;
    }
    f.write_str("}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_sorts_by_name() {
        let lbs = Labels::from_pairs(&[("zone", "a"), ("app", "api"), ("env", "prod")]);
        let names: Vec<&str> = lbs.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, vec!["app", "env", "zone"]);
    }

    #[test]
    fn test_display_canonical_form() {
        let lbs = Labels::from_pairs(&[("env", "prod"), ("app", "x")]);
        assert_eq!(lbs.to_string(), r#"{app="x", env="prod"}"#);
        assert_eq!(Labels::empty().to_string(), "{}");
    }

    #[test]
    fn test_display_escapes_quotes() {
        let lbs = Labels::from_pairs(&[("msg", "say \"hi\"")]);
        assert_eq!(lbs.to_string(), r#"{msg="say \"hi\""}"#);
    }

    #[test]
    fn test_get_and_has() {
        let lbs = Labels::from_pairs(&[("app", "x")]);
        assert_eq!(lbs.get("app"), Some("x"));
        assert_eq!(lbs.get("env"), None);
        assert!(lbs.has("app"));
        assert!(!lbs.has("env"));
    }

    #[test]
    fn test_keep_and_without() {
        let lbs = Labels::from_pairs(&[("a", "1"), ("b", "2"), ("c", "3")]);
        let names = vec!["a".to_string(), "c".to_string(), "missing".to_string()];

        assert_eq!(lbs.keep(&names), Labels::from_pairs(&[("a", "1"), ("c", "3")]));
        assert_eq!(lbs.without(&names), Labels::from_pairs(&[("b", "2")]));
    }

    #[test]
    fn test_hash_ignores_construction_order() {
        let a = Labels::from_pairs(&[("a", "1"), ("b", "2")]);
        let b = Labels::from_pairs(&[("b", "2"), ("a", "1")]);
        assert_eq!(a.stable_hash(), b.stable_hash());
    }

    #[test]
    fn test_json_object_form() {
        let lbs = Labels::from_pairs(&[("env", "prod"), ("app", "x")]);
        let json = serde_json::to_string(&lbs).unwrap();
        assert_eq!(json, r#"{"app":"x","env":"prod"}"#);

        let back: Labels = serde_json::from_str(r#"{"env":"prod","app":"x"}"#).unwrap();
        assert_eq!(back, lbs);
    }
}
