//! Domain filter
//!
//! Restricts which zones the engine may touch. An empty filter matches
//! every zone so that zero-config usage keeps working.

use crate::model::normalize_name;
use serde::{Deserialize, Serialize};

/// Whether `name` equals `suffix` or ends with it on a label boundary
///
/// `record.foo.com` ends with `foo.com`; `xfoo.com` does not.
pub(crate) fn is_label_suffix(name: &str, suffix: &str) -> bool {
    if suffix.is_empty() {
        return false;
    }
    match name.strip_suffix(suffix) {
        Some("") => true,
        Some(prefix) => prefix.ends_with('.'),
        None => false,
    }
}

/// Set of zone name suffixes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct DomainFilter {
    suffixes: Vec<String>,
}

impl DomainFilter {
    /// Build a filter; entries are normalized and empty entries dropped
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut suffixes: Vec<String> = entries
            .into_iter()
            .map(|entry| normalize_name(entry.as_ref()))
            .filter(|entry| !entry.is_empty())
            .collect();
        suffixes.sort();
        suffixes.dedup();
        Self { suffixes }
    }

    /// A filter that matches everything
    pub fn any() -> Self {
        Self::default()
    }

    /// Whether the zone is in scope
    pub fn matches(&self, zone_name: &str) -> bool {
        if self.suffixes.is_empty() {
            return true;
        }
        let zone_name = normalize_name(zone_name);
        self.suffixes
            .iter()
            .any(|suffix| is_label_suffix(&zone_name, suffix))
    }

    /// Whether no restriction applies
    pub fn is_empty(&self) -> bool {
        self.suffixes.is_empty()
    }

    /// The normalized suffixes
    pub fn suffixes(&self) -> &[String] {
        &self.suffixes
    }
}

impl From<Vec<String>> for DomainFilter {
    fn from(entries: Vec<String>) -> Self {
        Self::new(entries)
    }
}

impl From<DomainFilter> for Vec<String> {
    fn from(filter: DomainFilter) -> Self {
        filter.suffixes
    }
}
