//! Source-column to canonical-field mapping.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Correspondence from a CSV header (exactly as it appears in the file) to a
/// canonical field key. A column without an entry is skipped on import.
///
/// A target key appearing at most once is a presentation-level rule; this
/// type does not enforce it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColumnMapping(BTreeMap<String, String>);

impl ColumnMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map `source` to `target`, or remove the entry when `target` is `None`.
    ///
    /// Setting a key overwrites any previous target for the same column.
    pub fn update(&mut self, source: &str, target: Option<&str>) {
        match target {
            Some(key) => {
                self.0.insert(source.to_string(), key.to_string());
            }
            None => {
                self.0.remove(source);
            }
        }
    }

    pub fn get(&self, source: &str) -> Option<&str> {
        self.0.get(source).map(String::as_str)
    }

    pub fn contains_source(&self, source: &str) -> bool {
        self.0.contains_key(source)
    }

    /// Whether any column currently maps to `key`.
    pub fn is_target_used(&self, key: &str) -> bool {
        self.0.values().any(|v| v == key)
    }

    /// Source column currently mapped to `key`, if any.
    pub fn source_for_target(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(_, v)| v.as_str() == key)
            .map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// JSON object string, as sent to the start-import endpoint.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.0)
    }
}

impl FromIterator<(String, String)> for ColumnMapping {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_with_none_removes_entry() {
        let mut mapping = ColumnMapping::new();
        mapping.update("Mail", Some("email"));
        assert_eq!(mapping.get("Mail"), Some("email"));

        mapping.update("Mail", None);
        assert!(!mapping.contains_source("Mail"));
        assert!(mapping.is_empty());
    }

    #[test]
    fn update_overwrites_previous_target() {
        let mut mapping = ColumnMapping::new();
        mapping.update("Naam", Some("first_name"));
        mapping.update("Naam", Some("last_name"));
        assert_eq!(mapping.len(), 1);
        assert_eq!(mapping.get("Naam"), Some("last_name"));
    }

    #[test]
    fn empty_string_target_is_kept_as_entry() {
        let mut mapping = ColumnMapping::new();
        mapping.update("Extra", Some(""));
        assert_eq!(mapping.get("Extra"), Some(""));
    }

    #[test]
    fn duplicate_targets_are_allowed() {
        let mut mapping = ColumnMapping::new();
        mapping.update("A", Some("email"));
        mapping.update("B", Some("email"));
        assert_eq!(mapping.len(), 2);
        assert!(mapping.is_target_used("email"));
    }

    #[test]
    fn serializes_as_plain_object() {
        let mapping: ColumnMapping = [("Voornaam".to_string(), "first_name".to_string())]
            .into_iter()
            .collect();
        assert_eq!(mapping.to_json().unwrap(), r#"{"Voornaam":"first_name"}"#);
    }
}
