//! CLI configuration from environment.

use std::env;

use soar_core::ClassificationMethod;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    /// Detector used when `--method` is not given
    pub classification_method: ClassificationMethod,
    /// Log and skip competitors whose analysis fails instead of aborting the day
    pub skip_failed: bool,
    pub json_logs: bool,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            classification_method: lookup("SOAR_CLASSIFICATION_METHOD")
                .and_then(|s| s.parse().ok())
                .unwrap_or_default(),
            skip_failed: lookup("SOAR_SKIP_FAILED").is_some_and(|s| is_truthy(&s)),
            json_logs: lookup("SOAR_LOG_FORMAT").is_some_and(|s| s.eq_ignore_ascii_case("json")),
        }
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
