//! Opaque render options threaded through every handler.

use std::collections::BTreeMap;

/// String key/value options passed unchanged to every handler.
///
/// The renderer defines no keys of its own; each backend documents the keys
/// it reads.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RenderOptions {
    values: BTreeMap<String, String>,
}

impl RenderOptions {
    /// Create empty options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an option.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    /// Raw value of an option.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Boolean option: `true`, `yes`, `on` and `1` are truthy, anything else
    /// (including absence) is false.
    pub fn flag(&self, key: &str) -> bool {
        self.get(key)
            .is_some_and(|v| matches!(v, "true" | "yes" | "on" | "1"))
    }
}
