//! Lookup table from manual page references to URLs.

use std::collections::HashMap;

/// Immutable mapping from `name(section)` references to URLs.
///
/// Supplied when a backend is constructed and only read by link and role
/// handlers.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ManpageUrls {
    urls: HashMap<String, String>,
}

impl ManpageUrls {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a JSON object of the form `{"ls(1)": "https://..."}`.
    #[cfg(feature = "serde")]
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let urls: HashMap<String, String> = serde_json::from_str(json)?;
        Ok(Self { urls })
    }

    /// URL for a full reference such as `ls(1)`.
    pub fn get(&self, reference: &str) -> Option<&str> {
        self.urls.get(reference).map(String::as_str)
    }

    /// URL for a page name and section.
    pub fn lookup(&self, name: &str, section: &str) -> Option<&str> {
        self.get(&format!("{name}({section})"))
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.urls.len()
    }

    /// Whether the table has no entries.
    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ManpageUrls {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            urls: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Split a reference like `systemd.unit(5)` into `("systemd.unit", "5")`.
///
/// Returns `None` when the reference has no parenthesised section.
pub fn parse_reference(reference: &str) -> Option<(&str, &str)> {
    let reference = reference.trim();
    let body = reference.strip_suffix(')')?;
    let open = body.rfind('(')?;
    let (name, section) = (&body[..open], &body[open + 1..]);
    if name.is_empty() || section.is_empty() {
        return None;
    }
    Some((name, section))
}
