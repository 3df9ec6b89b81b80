use serde::{Deserialize, Serialize};

pub const DEFAULT_OVERRIDE_ARCHIVE: &str = "cmaps.mas";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CheckConfig {
    /// Rewrite scene files when a repaired search path is an improvement.
    pub fix: bool,
    /// Archive that a mod may ship its own copy of; when found under the
    /// mod directory it replaces the shared one in the archive list.
    pub override_archive: Option<String>,
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            fix: false,
            override_archive: Some(DEFAULT_OVERRIDE_ARCHIVE.to_string()),
        }
    }
}

impl CheckConfig {
    pub fn with_fix(mut self, fix: bool) -> Self {
        self.fix = fix;
        self
    }

    pub fn with_override_archive(mut self, name: Option<String>) -> Self {
        self.override_archive = name;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::CheckConfig;

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let config: CheckConfig = serde_json::from_str(r#"{"fix": true}"#).expect("valid config");
        assert!(config.fix);
        assert_eq!(config.override_archive.as_deref(), Some("cmaps.mas"));
    }

    #[test]
    fn override_can_be_disabled() {
        let config: CheckConfig =
            serde_json::from_str(r#"{"override_archive": null}"#).expect("valid config");
        assert_eq!(config, CheckConfig::default().with_override_archive(None));
        assert!(serde_json::from_str::<CheckConfig>(r#"{"bogus": 1}"#).is_err());
    }
}
