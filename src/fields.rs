//! Structured field extraction from raw page text.
//!
//! Page text follows a line-oriented `label: value` grammar: a line with a
//! colon starts a new field, a line without one continues the value of the
//! most recent field. The resulting [`FieldMapping`] keeps fields in
//! first-seen order; re-using a label overwrites its value in place.

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Insertion-ordered mapping from field label to field value.
///
/// Labels are an open vocabulary; whatever labels occur in the text become
/// keys. The template document's own key set defines the expected schema for
/// a validation run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldMapping {
    entries: Vec<(String, String)>,
}

impl FieldMapping {
    /// Create an empty mapping.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite a field. Overwriting keeps the key's original
    /// position.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.position(&key) {
            Some(index) => self.entries[index].1 = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Get a field's value.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.position(key).map(|i| self.entries[i].1.as_str())
    }

    /// Whether the mapping contains a field.
    pub fn contains_key(&self, key: &str) -> bool {
        self.position(key).is_some()
    }

    /// Iterate keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    /// Iterate `(key, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the mapping has no fields.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.entries.iter().position(|(k, _)| k == key)
    }

    /// Append a continuation fragment to an existing field's value,
    /// separated by a single space.
    fn append_continuation(&mut self, key: &str, fragment: &str) {
        if let Some(index) = self.position(key) {
            let value = &mut self.entries[index].1;
            value.push(' ');
            value.push_str(fragment);
        }
    }
}

impl FromIterator<(String, String)> for FieldMapping {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        let mut mapping = FieldMapping::new();
        for (key, value) in iter {
            mapping.insert(key, value);
        }
        mapping
    }
}

impl<'a> FromIterator<(&'a str, &'a str)> for FieldMapping {
    fn from_iter<I: IntoIterator<Item = (&'a str, &'a str)>>(iter: I) -> Self {
        iter.into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }
}

impl Serialize for FieldMapping {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for FieldMapping {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct FieldMappingVisitor;

        impl<'de> Visitor<'de> for FieldMappingVisitor {
            type Value = FieldMapping;

            fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str("a map of field labels to values")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut mapping = FieldMapping::new();
                while let Some((key, value)) = access.next_entry::<String, String>()? {
                    mapping.insert(key, value);
                }
                Ok(mapping)
            }
        }

        deserializer.deserialize_map(FieldMappingVisitor)
    }
}

/// Parse one page's raw text into a [`FieldMapping`].
///
/// A line containing a colon splits at the first colon; the trimmed label
/// becomes the current key and the trimmed remainder its value. A line
/// without a colon while a key is active is appended to that key's value,
/// separated by a single space. Lines before the first labeled line are
/// discarded. Empty input yields an empty mapping, never an error.
pub fn parse_fields(text: &str) -> FieldMapping {
    let mut fields = FieldMapping::new();
    let mut current_key: Option<String> = None;

    for line in text.lines() {
        match line.split_once(':') {
            Some((label, value)) => {
                let key = label.trim().to_string();
                fields.insert(key.clone(), value.trim().to_string());
                current_key = Some(key);
            }
            None => {
                if let Some(key) = &current_key {
                    fields.append_continuation(key, line.trim());
                }
            }
        }
    }

    fields
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_basic_fields() {
        let fields = parse_fields("PN: ABC-123\nSN: 123456");
        assert_eq!(fields.get("PN"), Some("ABC-123"));
        assert_eq!(fields.get("SN"), Some("123456"));
        assert_eq!(fields.len(), 2);
    }

    #[test]
    fn test_round_trip_of_generated_lines() {
        let source: FieldMapping = vec![("A", "1"), ("B", "two"), ("C", "3 x")]
            .into_iter()
            .collect();
        let text: String = source
            .iter()
            .map(|(k, v)| format!("{k}: {v}"))
            .collect::<Vec<_>>()
            .join("\n");
        assert_eq!(parse_fields(&text), source);
    }

    #[test]
    fn test_continuation_line_appends_with_space() {
        let fields = parse_fields("A: x\ny");
        assert_eq!(fields.get("A"), Some("x y"));
    }

    #[test]
    fn test_repeated_key_overwrites_in_place() {
        let fields = parse_fields("A: 1\nB: middle\nA: 2");
        assert_eq!(fields.get("A"), Some("2"));
        // Overwrite keeps the original position.
        assert_eq!(fields.keys().collect::<Vec<_>>(), vec!["A", "B"]);
    }

    #[test]
    fn test_lines_before_first_key_discarded() {
        let fields = parse_fields("orphan line\nPN: X");
        assert_eq!(fields.len(), 1);
        assert_eq!(fields.get("PN"), Some("X"));
    }

    #[test]
    fn test_empty_input() {
        assert!(parse_fields("").is_empty());
    }

    #[test]
    fn test_value_with_extra_colons_splits_at_first() {
        let fields = parse_fields("NOTES: see 10:30 entry");
        assert_eq!(fields.get("NOTES"), Some("see 10:30 entry"));
    }

    #[test]
    fn test_whitespace_trimmed_around_label_and_value() {
        let fields = parse_fields("  PN  :   ABC  ");
        assert_eq!(fields.get("PN"), Some("ABC"));
    }

    #[test]
    fn test_serde_preserves_order() {
        let fields = parse_fields("B: 2\nA: 1");
        let json = serde_json::to_string(&fields).unwrap();
        assert_eq!(json, r#"{"B":"2","A":"1"}"#);

        let back: FieldMapping = serde_json::from_str(&json).unwrap();
        assert_eq!(back, fields);
    }
}
