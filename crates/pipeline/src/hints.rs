//! Parser hints — tells extraction stages which label names are still worth
//! extracting for the current line.
//!
//! Metric queries usually only need a handful of labels (the grouping labels
//! and whatever the filters reference). Passing that list down lets parsers
//! skip everything else, and skip names a previous stage already extracted.

/// Capability handed to parser stages through the labels builder.
///
/// `Send` so a builder can be created on one thread and handed to the
/// worker that evaluates the query.
pub trait ParserHint: Send {
    /// Whether `name` should be extracted on this line.
    fn should_extract(&self, name: &str) -> bool;

    /// Whether any name starting with `prefix` should be extracted.
    fn should_extract_prefix(&self, prefix: &str) -> bool;

    /// True when the query needs no labels at all.
    fn no_labels(&self) -> bool;

    /// Called by the builder for every parsed label it stages.
    fn record_extracted(&mut self, name: &str);

    /// True once every required name has been extracted on this line.
    fn all_required_extracted(&self) -> bool;

    /// The names the query needs. `None` means unrestricted.
    fn required_labels(&self) -> Option<&[String]>;

    /// Forget per-line state.
    fn reset(&mut self);
}

/// Hints for queries that cannot narrow extraction. Everything is extracted.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoParserHints;

impl ParserHint for NoParserHints {
    fn should_extract(&self, _name: &str) -> bool {
        true
    }

    fn should_extract_prefix(&self, _prefix: &str) -> bool {
        true
    }

    fn no_labels(&self) -> bool {
        false
    }

    fn record_extracted(&mut self, _name: &str) {}

    fn all_required_extracted(&self) -> bool {
        false
    }

    fn required_labels(&self) -> Option<&[String]> {
        None
    }

    fn reset(&mut self) {}
}

/// Restricts extraction to a fixed list of required names.
///
/// An empty list means the query uses no labels, so nothing is extracted.
#[derive(Debug, Clone, Default)]
pub struct KeyHints {
    required: Vec<String>,
    extracted: Vec<String>,
}

impl KeyHints {
    pub fn new(mut required: Vec<String>) -> Self {
        required.sort();
        required.dedup();
        Self {
            extracted: Vec::with_capacity(required.len()),
            required,
        }
    }

    fn is_required(&self, name: &str) -> bool {
        self.required.iter().any(|r| r == name)
    }

    fn is_extracted(&self, name: &str) -> bool {
        self.extracted.iter().any(|e| e == name)
    }
}

impl ParserHint for KeyHints {
    fn should_extract(&self, name: &str) -> bool {
        self.is_required(name) && !self.is_extracted(name)
    }

    fn should_extract_prefix(&self, prefix: &str) -> bool {
        self.required
            .iter()
            .any(|r| r.starts_with(prefix) && !self.is_extracted(r))
    }

    fn no_labels(&self) -> bool {
        self.required.is_empty()
    }

    fn record_extracted(&mut self, name: &str) {
        if self.is_required(name) && !self.is_extracted(name) {
            self.extracted.push(name.to_string());
        }
    }

    fn all_required_extracted(&self) -> bool {
        self.extracted.len() == self.required.len()
    }

    fn required_labels(&self) -> Option<&[String]> {
        Some(&self.required)
    }

    fn reset(&mut self) {
        self.extracted.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_hints_extracts_everything() {
        let mut hints = NoParserHints;
        hints.record_extracted("level");
        assert!(hints.should_extract("level"));
        assert!(hints.should_extract_prefix("anything"));
        assert!(!hints.no_labels());
        assert!(hints.required_labels().is_none());
    }

    #[test]
    fn test_key_hints_only_required() {
        let hints = KeyHints::new(vec!["status".into(), "level".into()]);
        assert!(hints.should_extract("level"));
        assert!(!hints.should_extract("msg"));
        assert_eq!(
            hints.required_labels(),
            Some(&["level".to_string(), "status".to_string()][..])
        );
    }

    #[test]
    fn test_key_hints_skip_already_extracted() {
        let mut hints = KeyHints::new(vec!["level".into(), "status".into()]);
        hints.record_extracted("level");
        assert!(!hints.should_extract("level"));
        assert!(!hints.all_required_extracted());

        hints.record_extracted("msg"); // not required, ignored
        hints.record_extracted("status");
        assert!(hints.all_required_extracted());

        hints.reset();
        assert!(hints.should_extract("level"));
        assert!(!hints.all_required_extracted());
    }

    #[test]
    fn test_key_hints_prefix() {
        let mut hints = KeyHints::new(vec!["request_method".into()]);
        assert!(hints.should_extract_prefix("request_"));
        assert!(!hints.should_extract_prefix("response_"));
        hints.record_extracted("request_method");
        assert!(!hints.should_extract_prefix("request_"));
    }

    #[test]
    fn test_empty_key_hints_mean_no_labels() {
        let hints = KeyHints::new(Vec::new());
        assert!(hints.no_labels());
        assert!(!hints.should_extract("level"));
    }
}
