use std::fmt;
use serde::{Serializer, Deserializer};
use serde::ser::SerializeMap;
use serde::de::Visitor;

use crate::labels::Label;

/// Serialize a label sequence as a JSON object (`name -> value`).
pub fn serialize_labels_as_map<S>(labels: &[Label], serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let mut map = serializer.serialize_map(Some(labels.len()))?;
    for l in labels {
        map.serialize_entry(&l.name, &l.value)?;
    }
    map.end()
}

/// Deserialize a label sequence from an object, sorted by name.
pub fn deserialize_labels_from_map<'de, D>(deserializer: D) -> Result<Vec<Label>, D::Error>
where
    D: Deserializer<'de>,
{
    struct MapVisitor;

    impl<'de> Visitor<'de> for MapVisitor {
        type Value = Vec<Label>;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("an object of label names to values")
        }

        fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
        where
            A: serde::de::MapAccess<'de>,
        {
            let mut labels = Vec::with_capacity(map.size_hint().unwrap_or(0));
            while let Some((name, value)) = map.next_entry::<String, String>()? {
                labels.push(Label { name, value });
            }
            labels.sort_by(|a, b| a.name.cmp(&b.name));
            Ok(labels)
        }
    }

    deserializer.deserialize_map(MapVisitor)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn serialize_labels(labels: &[Label]) -> String {
        use serde::Serialize;

        #[derive(Serialize)]
        struct Wrapper<'a> {
            #[serde(serialize_with = "serialize_labels_as_map")]
            labels: &'a [Label],
        }

        serde_json::to_string(&Wrapper { labels }).unwrap()
    }

    fn deserialize_labels(json: &str) -> Vec<Label> {
        use serde::Deserialize;

        #[derive(Deserialize)]
        struct Wrapper {
            #[serde(deserialize_with = "deserialize_labels_from_map")]
            labels: Vec<Label>,
        }

        let w: Wrapper = serde_json::from_str(json).unwrap();
        w.labels
    }

    #[test]
    fn test_serialize_empty_labels() {
        assert_eq!(serialize_labels(&[]), r#"{"labels":{}}"#);
    }

    #[test]
    fn test_serialize_keeps_sequence_order() {
        let labels = vec![Label::new("app", "api"), Label::new("env", "prod")];
        assert_eq!(serialize_labels(&labels), r#"{"labels":{"app":"api","env":"prod"}}"#);
    }

    #[test]
    fn test_deserialize_sorts_by_name() {
        let labels = deserialize_labels(r#"{"labels":{"zone":"b","app":"api","env":"prod"}}"#);
        let names: Vec<&str> = labels.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, vec!["app", "env", "zone"]);
    }

    #[test]
    fn test_special_characters_stay_valid_json() {
        let labels = vec![Label::new("msg", "line with \"quotes\" and \\backslashes")];
        let json = serialize_labels(&labels);
        let _: serde_json::Value = serde_json::from_str(&json).unwrap();
    }
}
