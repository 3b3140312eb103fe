//! Model — LabelsConfig, fixed for the lifetime of one query.

use serde::{Deserialize, Serialize};

use crate::intern::MAX_INTERNED_STRINGS;
use super::error::{ConfigError, ConfigResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelsConfig {
    /// Label names the query groups by (`by (...)` / `without (...)`)
    pub groups: Vec<String>,
    /// Exclude `groups` from the output instead of keeping only them
    pub without: bool,
    /// Every finalized result is the empty label set
    pub no_labels: bool,
    /// Names parser stages need to extract. `None` means unrestricted.
    pub required_labels: Option<Vec<String>>,
    /// Hard cap for the interned string set
    pub max_interned_strings: usize,
}

impl Default for LabelsConfig {
    fn default() -> Self {
        Self {
            groups: Vec::new(),
            without: false,
            no_labels: false,
            required_labels: None,
            max_interned_strings: MAX_INTERNED_STRINGS,
        }
    }
}

impl LabelsConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        for (i, g) in self.groups.iter().enumerate() {
            if g.is_empty() {
                return Err(ConfigError::Invalid("group label names must not be empty".to_string()));
            }
            if self.groups[..i].contains(g) {
                return Err(ConfigError::Invalid(format!("duplicate group label: {}", g)));
            }
        }
        if let Some(required) = &self.required_labels {
            if required.iter().any(|r| r.is_empty()) {
                return Err(ConfigError::Invalid("required label names must not be empty".to_string()));
            }
        }
        if self.max_interned_strings == 0 {
            return Err(ConfigError::Invalid("max_interned_strings must be > 0".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = LabelsConfig::default();
        assert!(cfg.groups.is_empty());
        assert!(!cfg.without);
        assert!(!cfg.no_labels);
        assert!(cfg.required_labels.is_none());
        assert_eq!(cfg.max_interned_strings, 1024);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_duplicate_groups() {
        let cfg = LabelsConfig {
            groups: vec!["app".into(), "env".into(), "app".into()],
            ..Default::default()
        };
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("duplicate group label: app"));
    }

    #[test]
    fn test_validate_rejects_empty_names() {
        let cfg = LabelsConfig {
            groups: vec!["".into()],
            ..Default::default()
        };
        assert!(cfg.validate().is_err());

        let cfg = LabelsConfig {
            required_labels: Some(vec!["".into()]),
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_interner_limit() {
        let cfg = LabelsConfig {
            max_interned_strings: 0,
            ..Default::default()
        };
        assert!(matches!(cfg.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let cfg: LabelsConfig = toml::from_str(r#"groups = ["app", "env"]"#).unwrap();
        assert_eq!(cfg.groups, vec!["app", "env"]);
        assert!(!cfg.without);
        assert_eq!(cfg.max_interned_strings, 1024);
    }
}
