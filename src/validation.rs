//! Configuration validation against a [`Schema`].
//!
//! Checks required attributes, value types and nested block counts. String
//! attributes that carry a [`DiffSuppress`] rule must also hold parseable
//! JSON or NDJSON, and every NDJSON record must be an object.
//!
//! ```
//! use kibana_provider::schema::{Attribute, DiffSuppress, Schema};
//! use kibana_provider::validation::validate;
//! use serde_json::json;
//!
//! let schema = Schema::v0()
//!     .with_attribute("name", Attribute::required_string())
//!     .with_attribute(
//!         "metadata",
//!         Attribute::optional_string().with_diff_suppress(DiffSuppress::json()),
//!     );
//!
//! assert!(validate(&schema, &json!({"name": "reader", "metadata": "{\"team\": 1}"})).is_empty());
//!
//! let diagnostics = validate(&schema, &json!({"name": "reader", "metadata": "{team}"}));
//! assert_eq!(diagnostics.len(), 1);
//! assert_eq!(diagnostics[0].attribute, Some("metadata".to_string()));
//! ```

use serde_json::Value;

use crate::document::{normalize, Exclusions};
use crate::ndjson::split_records;
use crate::schema::{Attribute, AttributeType, Block, BlockNestingMode, Diagnostic, DiffSuppress, NestedBlock, Schema};
use crate::suppress::DiffMode;

/// Validate configuration against a schema.
///
/// An empty result means the configuration is valid. Computed-only
/// attributes are never checked, and a required attribute with a default
/// may be left out.
pub fn validate(schema: &Schema, value: &Value) -> Vec<Diagnostic> {
    let mut checker = Checker::default();
    checker.block(&schema.block, value, "");
    checker.diagnostics
}

/// Like [`validate`], as a `Result`.
pub fn validate_result(schema: &Schema, value: &Value) -> Result<(), Vec<Diagnostic>> {
    match validate(schema, value) {
        diagnostics if diagnostics.is_empty() => Ok(()),
        diagnostics => Err(diagnostics),
    }
}

/// Whether configuration passes [`validate`] without diagnostics.
pub fn is_valid(schema: &Schema, value: &Value) -> bool {
    validate(schema, value).is_empty()
}

#[derive(Default)]
struct Checker {
    diagnostics: Vec<Diagnostic>,
}

impl Checker {
    fn error(&mut self, path: &str, summary: String, detail: impl Into<String>) {
        let diagnostic = Diagnostic::error(summary).with_detail(detail);
        self.diagnostics.push(if path.is_empty() {
            diagnostic
        } else {
            diagnostic.with_attribute(path)
        });
    }

    fn block(&mut self, block: &Block, value: &Value, path: &str) {
        let fields = match value {
            Value::Null => return,
            Value::Object(fields) => fields,
            other => {
                self.error(path, "Expected object".to_string(), format!("Got {}", kind(other)));
                return;
            },
        };

        for (name, attr) in &block.attributes {
            self.attribute(attr, fields.get(name), &child(path, name));
        }
        for (name, nested) in &block.blocks {
            self.nested(nested, fields.get(name), &child(path, name));
        }
    }

    fn attribute(&mut self, attr: &Attribute, value: Option<&Value>, path: &str) {
        if attr.flags.is_computed_only() {
            return;
        }
        let Some(value) = value.filter(|v| !v.is_null()) else {
            if attr.flags.required && attr.default.is_none() {
                self.error(
                    path,
                    format!("Missing required attribute '{}'", path),
                    "This attribute is required and must be provided",
                );
            }
            return;
        };

        let before = self.diagnostics.len();
        self.value_type(&attr.attr_type, value, path);
        if self.diagnostics.len() > before {
            return;
        }
        if let (Some(rule), Some(text)) = (&attr.diff_suppress, value.as_str()) {
            self.payload(rule, text, path);
        }
    }

    fn value_type(&mut self, attr_type: &AttributeType, value: &Value, path: &str) {
        let expected = match attr_type {
            AttributeType::String if value.is_string() => return,
            AttributeType::Bool if value.is_boolean() => return,
            AttributeType::Int64 if is_int64(value) => return,
            AttributeType::Set(element) => {
                if let Value::Array(items) = value {
                    for (i, item) in items.iter().enumerate() {
                        self.value_type(element, item, &format!("{}.{}", path, i));
                    }
                    return;
                }
                "set"
            },
            AttributeType::String => "string",
            AttributeType::Bool => "bool",
            AttributeType::Int64 => "int64",
        };
        self.error(
            path,
            format!("Invalid type for attribute '{}'", path),
            format!("Expected {}, got {}", expected, kind(value)),
        );
    }

    fn payload(&mut self, rule: &DiffSuppress, text: &str, path: &str) {
        let none = Exclusions::new();
        if rule.mode == DiffMode::Json {
            if let Err(err) = normalize(text, &none) {
                self.error(path, format!("Invalid JSON in attribute '{}'", path), err.to_string());
            }
            return;
        }

        for (line, record) in split_records(text).into_iter().enumerate() {
            let detail = match normalize(record, &none) {
                Ok(doc) if doc.is_map() => continue,
                Ok(doc) => format!("Record {} is {}, expected object", line, doc.kind()),
                Err(err) => format!("Record {}: {}", line, err),
            };
            self.error(path, format!("Invalid NDJSON record in attribute '{}'", path), detail);
        }
    }

    fn nested(&mut self, nested: &NestedBlock, value: Option<&Value>, path: &str) {
        let value = value.filter(|v| !v.is_null());

        if nested.nesting_mode == BlockNestingMode::Single {
            match value {
                Some(value) => self.block(&nested.block, value, path),
                None if nested.min_items > 0 => self.error(
                    path,
                    format!("Missing required block '{}'", path),
                    "At least one block is required",
                ),
                None => {},
            }
            return;
        }

        let items = match value {
            None => &[][..],
            Some(Value::Array(items)) => items.as_slice(),
            Some(other) => {
                self.error(path, format!("Expected list for block '{}'", path), format!("Got {}", kind(other)));
                return;
            },
        };

        let count = items.len() as u32;
        if count < nested.min_items {
            self.error(
                path,
                format!("Block '{}' requires at least {} item(s), got {}", path, nested.min_items, count),
                format!("Add {} more", nested.min_items - count),
            );
        }
        if nested.max_items > 0 && count > nested.max_items {
            self.error(
                path,
                format!("Block '{}' allows at most {} item(s), got {}", path, nested.max_items, count),
                format!("Remove {}", count - nested.max_items),
            );
        }
        for (i, item) in items.iter().enumerate() {
            self.block(&nested.block, item, &format!("{}.{}", path, i));
        }
    }
}

fn child(base: &str, name: &str) -> String {
    if base.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", base, name)
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// Whole numbers written as floats (`6.0`) count as integers.
fn is_int64(value: &Value) -> bool {
    let Value::Number(n) = value else {
        return false;
    };
    n.is_i64()
        || n.as_f64()
            .is_some_and(|f| f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64)
}
