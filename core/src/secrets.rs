//! Named API keys and their precedence rules.
//!
//! Environment-sourced values are session defaults; a key supplied with a
//! request always wins for that turn. Blank request values count as absent.

use std::collections::HashMap;
use std::fmt;

pub const GROQ_API_KEY: &str = "GROQ_API_KEY";
pub const GOOGLE_API_KEY: &str = "GOOGLE_API_KEY";
pub const MISTRAL_API_KEY: &str = "MISTRAL_API_KEY";
pub const SERPER_API_KEY: &str = "SERPER_API_KEY";

/// Every key name read from the environment
pub const KNOWN_KEYS: &[&str] = &[
    GROQ_API_KEY,
    GOOGLE_API_KEY,
    MISTRAL_API_KEY,
    SERPER_API_KEY,
];

#[derive(Clone, Default, PartialEq, Eq)]
pub struct Secrets {
    values: HashMap<String, String>,
}

impl Secrets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect the known keys from the process environment
    pub fn from_env() -> Self {
        let values = KNOWN_KEYS
            .iter()
            .filter_map(|name| {
                std::env::var(name)
                    .ok()
                    .map(|v| v.trim().to_string())
                    .filter(|v| !v.is_empty())
                    .map(|v| (name.to_string(), v))
            })
            .collect();
        Self { values }
    }

    pub fn from_map(map: HashMap<String, String>) -> Self {
        let mut s = Self::new();
        for (k, v) in map {
            s.insert(k, v);
        }
        s
    }

    /// Insert a key; blank values are ignored
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let value = value.into().trim().to_string();
        if !value.is_empty() {
            self.values.insert(name.into(), value);
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Layer request-supplied keys over these defaults
    pub fn merged(&self, request_keys: &HashMap<String, String>) -> Secrets {
        let mut out = self.clone();
        for (k, v) in request_keys {
            out.insert(k.clone(), v.clone());
        }
        out
    }
}

impl fmt::Debug for Secrets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.values.keys().collect();
        names.sort();
        f.debug_struct("Secrets").field("present", &names).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_key_overrides_default() {
        let mut defaults = Secrets::new();
        defaults.insert(GROQ_API_KEY, "env-key");
        defaults.insert(SERPER_API_KEY, "env-serper");

        let mut req = HashMap::new();
        req.insert(GROQ_API_KEY.to_string(), "request-key".to_string());

        let merged = defaults.merged(&req);
        assert_eq!(merged.get(GROQ_API_KEY), Some("request-key"));
        assert_eq!(merged.get(SERPER_API_KEY), Some("env-serper"));
        // defaults untouched
        assert_eq!(defaults.get(GROQ_API_KEY), Some("env-key"));
    }

    #[test]
    fn blank_request_key_does_not_clobber_default() {
        let mut defaults = Secrets::new();
        defaults.insert(MISTRAL_API_KEY, "env-key");
        let mut req = HashMap::new();
        req.insert(MISTRAL_API_KEY.to_string(), "   ".to_string());
        assert_eq!(defaults.merged(&req).get(MISTRAL_API_KEY), Some("env-key"));
    }

    #[test]
    fn debug_output_hides_values() {
        let mut s = Secrets::new();
        s.insert(GOOGLE_API_KEY, "super-secret");
        let rendered = format!("{:?}", s);
        assert!(rendered.contains(GOOGLE_API_KEY));
        assert!(!rendered.contains("super-secret"));
    }

    #[test]
    fn env_snapshot_covers_only_consumed_keys() {
        assert_eq!(
            KNOWN_KEYS,
            &[GROQ_API_KEY, GOOGLE_API_KEY, MISTRAL_API_KEY, SERPER_API_KEY]
        );
        for kind in crate::llm::ProviderKind::ALL {
            assert!(KNOWN_KEYS.contains(&kind.key_name()));
        }
    }
}
