//! Canonical documents.
//!
//! A [`Document`] is the typed, order-independent form of a JSON text. Maps
//! are kept in key order so that two documents built from texts with
//! different key orders are structurally identical, and numbers keep enough
//! information to compare by numeric value rather than by spelling.
//!
//! # Example
//!
//! ```
//! use kibana_provider::document::{normalize, Exclusions};
//!
//! let exclusions = Exclusions::from_iter(["updated_at"]);
//! let doc = normalize(r#"{"b": 1, "a": 2, "updated_at": "now"}"#, &exclusions).unwrap();
//!
//! assert!(doc.get("updated_at").is_none());
//! assert_eq!(doc.keys(), vec!["a", "b"]);
//! ```

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::DiffError;

/// Fields Kibana rewrites on every saved-object import or export.
pub const SAVED_OBJECT_VOLATILE_FIELDS: [&str; 6] = [
    "version",
    "updated_at",
    "coreMigrationVersion",
    "migrationVersion",
    "references",
    "sort",
];

/// A JSON number that compares by value.
#[derive(Debug, Clone, Copy)]
pub enum Number {
    /// An integer that fits in `i64` or `u64`.
    Int(i128),
    /// Any other number.
    Float(f64),
}

impl PartialEq for Number {
    fn eq(&self, other: &Self) -> bool {
        match (*self, *other) {
            (Number::Int(a), Number::Int(b)) => a == b,
            (Number::Float(a), Number::Float(b)) => a == b,
            (Number::Int(i), Number::Float(f)) | (Number::Float(f), Number::Int(i)) => {
                int_equals_float(i, f)
            },
        }
    }
}

// Converting the float to an integer (not the other way round) keeps
// integers above 2^53 from collapsing onto their float neighbours.
fn int_equals_float(i: i128, f: f64) -> bool {
    f.is_finite() && f.fract() == 0.0 && f >= i128::MIN as f64 && f < i128::MAX as f64 && f as i128 == i
}

impl From<&serde_json::Number> for Number {
    fn from(n: &serde_json::Number) -> Self {
        if let Some(i) = n.as_i64() {
            Number::Int(i128::from(i))
        } else if let Some(u) = n.as_u64() {
            Number::Int(i128::from(u))
        } else {
            Number::Float(n.as_f64().unwrap_or(f64::NAN))
        }
    }
}

/// A parsed JSON value with order-independent maps.
#[derive(Debug, Clone)]
pub enum Document {
    /// JSON `null`.
    Null,
    /// JSON `true` / `false`.
    Bool(bool),
    /// A JSON number.
    Number(Number),
    /// A JSON string.
    String(String),
    /// A JSON array; order is significant.
    Sequence(Vec<Document>),
    /// A JSON object; key order is not.
    Map(BTreeMap<String, Document>),
}

impl Document {
    /// The empty map `{}`.
    pub fn empty_map() -> Self {
        Document::Map(BTreeMap::new())
    }

    /// Human-readable name of the variant.
    pub fn kind(&self) -> &'static str {
        match self {
            Document::Null => "null",
            Document::Bool(_) => "bool",
            Document::Number(_) => "number",
            Document::String(_) => "string",
            Document::Sequence(_) => "array",
            Document::Map(_) => "object",
        }
    }

    /// Whether this document is a map.
    pub fn is_map(&self) -> bool {
        matches!(self, Document::Map(_))
    }

    /// Look up a key if this document is a map.
    pub fn get(&self, key: &str) -> Option<&Document> {
        match self {
            Document::Map(map) => map.get(key),
            _ => None,
        }
    }

    /// The string value, if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Document::String(s) => Some(s),
            _ => None,
        }
    }

    /// Keys of a map in canonical order; empty for other variants.
    pub fn keys(&self) -> Vec<&str> {
        match self {
            Document::Map(map) => map.keys().map(String::as_str).collect(),
            _ => Vec::new(),
        }
    }

    /// Remove every excluded field.
    ///
    /// Plain names are removed from this document's root map only, so a
    /// nested field that shares a name with a server-managed one (a saved
    /// search's `attributes.sort`) is still compared. Dotted names are
    /// removed at that exact path from the root.
    pub fn strip(&mut self, exclusions: &Exclusions) {
        if let Document::Map(map) = self {
            for name in exclusions.names() {
                map.remove(name);
            }
        }
        for path in exclusions.paths() {
            self.strip_path(&path);
        }
    }

    fn strip_path(&mut self, path: &[&str]) {
        let Document::Map(map) = self else {
            return;
        };
        match path {
            [] => {},
            [last] => {
                map.remove(*last);
            },
            [head, rest @ ..] => {
                if let Some(child) = map.get_mut(*head) {
                    child.strip_path(rest);
                }
            },
        }
    }
}

impl From<Value> for Document {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Document::Null,
            Value::Bool(b) => Document::Bool(b),
            Value::Number(n) => Document::Number(Number::from(&n)),
            Value::String(s) => Document::String(s),
            Value::Array(items) => Document::Sequence(items.into_iter().map(Document::from).collect()),
            Value::Object(map) => {
                Document::Map(map.into_iter().map(|(k, v)| (k, Document::from(v))).collect())
            },
        }
    }
}

impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        crate::compare::equal(self, other)
    }
}

/// Field names removed from both sides before comparison.
///
/// A name without a dot matches that key at the document root. A dotted
/// name such as `attributes.version` matches one exact nested path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Exclusions {
    fields: BTreeSet<String>,
}

impl Exclusions {
    /// An empty exclusion set.
    pub fn new() -> Self {
        Self::default()
    }

    /// The fields Kibana mutates on every saved-object write or export.
    pub fn saved_objects() -> Self {
        Self::from_iter(SAVED_OBJECT_VOLATILE_FIELDS)
    }

    /// Add a field.
    pub fn with(mut self, field: impl Into<String>) -> Self {
        self.insert(field);
        self
    }

    /// Add a field in place.
    pub fn insert(&mut self, field: impl Into<String>) {
        self.fields.insert(field.into());
    }

    /// Whether the exact entry is in the set.
    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains(field)
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// All entries in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(String::as_str)
    }

    fn names(&self) -> impl Iterator<Item = &str> {
        self.iter().filter(|f| !f.contains('.'))
    }

    fn paths(&self) -> impl Iterator<Item = Vec<&str>> {
        self.iter()
            .filter(|f| f.contains('.'))
            .map(|f| f.split('.').collect())
    }
}

impl<S: Into<String>> FromIterator<S> for Exclusions {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().map(Into::into).collect(),
        }
    }
}

/// Parse a JSON text and strip excluded fields.
///
/// Empty or whitespace-only text is the empty map, so an unset attribute
/// compares equal to `{}`.
pub fn normalize(raw: &str, exclusions: &Exclusions) -> Result<Document, DiffError> {
    let trimmed = raw.trim();
    let mut doc = if trimmed.is_empty() {
        Document::empty_map()
    } else {
        Document::from(serde_json::from_str::<Value>(trimmed)?)
    };
    doc.strip(exclusions);
    Ok(doc)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_text_is_empty_map() {
        let doc = normalize("", &Exclusions::new()).unwrap();
        assert!(doc.is_map());
        assert!(doc.keys().is_empty());

        let doc = normalize("  \n", &Exclusions::new()).unwrap();
        assert!(doc.is_map());
    }

    #[test]
    fn test_invalid_json_is_parse_error() {
        let err = normalize("{\"a\":", &Exclusions::new()).unwrap_err();
        assert!(matches!(err, DiffError::Parse(_)));

        let err = normalize("not json", &Exclusions::new()).unwrap_err();
        assert!(matches!(err, DiffError::Parse(_)));
    }

    #[test]
    fn test_scalars_parse() {
        let doc = normalize("\"text\"", &Exclusions::new()).unwrap();
        assert_eq!(doc.as_str(), Some("text"));
        assert_eq!(normalize("null", &Exclusions::new()).unwrap().kind(), "null");
        assert_eq!(normalize("[1, 2]", &Exclusions::new()).unwrap().kind(), "array");
    }

    #[test]
    fn test_keys_are_canonically_ordered() {
        let doc = normalize(r#"{"z": 1, "a": 2, "m": 3}"#, &Exclusions::new()).unwrap();
        assert_eq!(doc.keys(), vec!["a", "m", "z"]);
    }

    #[test]
    fn test_plain_exclusions_apply_at_root_only() {
        let exclusions = Exclusions::from_iter(["version"]);
        let doc = normalize(
            r#"{"version": 1, "attributes": {"version": 2, "title": "t"}, "list": [{"version": 3}]}"#,
            &exclusions,
        )
        .unwrap();

        assert!(doc.get("version").is_none());
        let attributes = doc.get("attributes").unwrap();
        assert!(attributes.get("version").is_some());
        assert_eq!(attributes.get("title").and_then(Document::as_str), Some("t"));
        match doc.get("list") {
            Some(Document::Sequence(items)) => assert!(items[0].get("version").is_some()),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_saved_object_exclusions_keep_nested_content() {
        let doc = normalize(
            r#"{"id": "s1", "sort": [1], "attributes": {"sort": [["@timestamp", "desc"]], "version": 1}}"#,
            &Exclusions::saved_objects(),
        )
        .unwrap();

        assert_eq!(doc.keys(), vec!["attributes", "id"]);
        assert_eq!(doc.get("attributes").unwrap().keys(), vec!["sort", "version"]);
    }

    #[test]
    fn test_dotted_exclusions_apply_at_exact_path() {
        let exclusions = Exclusions::from_iter(["attributes.version"]);
        let doc = normalize(
            r#"{"version": 1, "attributes": {"version": 2}}"#,
            &exclusions,
        )
        .unwrap();

        assert!(doc.get("version").is_some());
        assert!(doc.get("attributes").unwrap().get("version").is_none());
    }

    #[test]
    fn test_stripping_is_idempotent() {
        let exclusions = Exclusions::saved_objects();
        let mut doc = normalize(r#"{"id": "a", "sort": [1], "updated_at": "x"}"#, &exclusions).unwrap();
        let once = doc.clone();
        doc.strip(&exclusions);
        assert_eq!(doc, once);
        assert_eq!(doc.keys(), vec!["id"]);
    }

    #[test]
    fn test_missing_path_is_noop() {
        let exclusions = Exclusions::from_iter(["a.b.c"]);
        let doc = normalize(r#"{"a": 1}"#, &exclusions).unwrap();
        assert_eq!(doc.keys(), vec!["a"]);
    }

    #[test]
    fn test_saved_object_exclusions() {
        let exclusions = Exclusions::saved_objects();
        assert_eq!(exclusions.len(), 6);
        for field in SAVED_OBJECT_VOLATILE_FIELDS {
            assert!(exclusions.contains(field));
        }
    }

    #[test]
    fn test_exclusions_serde() {
        let exclusions = Exclusions::new().with("version").with("sort");
        let json = serde_json::to_value(&exclusions).unwrap();
        assert_eq!(json, serde_json::json!(["sort", "version"]));

        let back: Exclusions = serde_json::from_value(json).unwrap();
        assert_eq!(back, exclusions);
    }

    #[test]
    fn test_number_equality() {
        assert_eq!(Number::Int(1), Number::Float(1.0));
        assert_ne!(Number::Int(1), Number::Float(1.5));
        assert_ne!(
            Number::Int(9_007_199_254_740_993),
            Number::Float(9_007_199_254_740_992.0)
        );
        assert_eq!(Number::Int(u64::MAX as i128), Number::Int(u64::MAX as i128));
    }
}
