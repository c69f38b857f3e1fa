//! Plan computation.
//!
//! Turns prior and proposed resource state into the list of attribute
//! changes the user sees. Attributes carrying a [`DiffSuppress`] rule are
//! compared with the suppression engine: when the two payloads are
//! equivalent, the change is hidden and the prior text is kept in the
//! planned state so the next refresh does not flap.
//!
//! [`DiffSuppress`]: crate::schema::DiffSuppress

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::schema::{Attribute, AttributeType, Block, BlockNestingMode, NestedBlock, Schema};
use crate::suppress::TracingReporter;

/// A change to a single attribute during a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeChange {
    /// The path to the attribute that changed.
    pub path: String,
    /// The value before the change (None if creating).
    pub before: Option<Value>,
    /// The value after the change (None if removing).
    pub after: Option<Value>,
}

impl AttributeChange {
    /// Create a new attribute change.
    pub fn new(path: impl Into<String>, before: Option<Value>, after: Option<Value>) -> Self {
        Self {
            path: path.into(),
            before,
            after,
        }
    }

    /// Create a change for a new attribute.
    pub fn added(path: impl Into<String>, value: Value) -> Self {
        Self::new(path, None, Some(value))
    }

    /// Create a change for a removed attribute.
    pub fn removed(path: impl Into<String>, value: Value) -> Self {
        Self::new(path, Some(value), None)
    }

    /// Create a change for a modified attribute.
    pub fn modified(path: impl Into<String>, before: Value, after: Value) -> Self {
        Self::new(path, Some(before), Some(after))
    }
}

/// The result of a plan operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanResult {
    /// The planned state after the operation.
    pub planned_state: Value,
    /// The list of attribute changes.
    pub changes: Vec<AttributeChange>,
    /// Whether the resource requires replacement.
    pub requires_replace: bool,
}

impl PlanResult {
    /// Create a plan result with no changes.
    pub fn no_change(state: Value) -> Self {
        Self {
            planned_state: state,
            changes: Vec::new(),
            requires_replace: false,
        }
    }

    /// Create a plan result with changes.
    pub fn with_changes(
        planned_state: Value,
        changes: Vec<AttributeChange>,
        requires_replace: bool,
    ) -> Self {
        Self {
            planned_state,
            changes,
            requires_replace,
        }
    }

    /// Whether the plan changes anything.
    pub fn has_changes(&self) -> bool {
        !self.changes.is_empty()
    }
}

/// Plan the transition from `prior` to `proposed` state.
///
/// With no prior state every attribute present in `proposed` (after
/// defaults) is reported as added. Otherwise each top-level attribute and
/// nested block is compared; suppressed payload differences keep the prior
/// value, computed-only attributes absent from `proposed` keep the prior
/// value, and a change to a force-new attribute requires replacement. Inside
/// nested blocks only the force-new attributes decide replacement: the
/// block is compared again with everything else dropped.
/// Undeclared prior keys such as `id` are carried over.
pub fn plan(schema: &Schema, prior: Option<&Value>, proposed: &Value) -> PlanResult {
    let mut planned = as_object(proposed);
    apply_defaults(&schema.block, &mut planned);

    let Some(prior) = prior.map(as_object) else {
        let changes = schema
            .block
            .attribute_names()
            .into_iter()
            .chain(schema.block.block_names())
            .filter_map(|name| {
                present(planned.get(name)).map(|value| AttributeChange::added(name, value.clone()))
            })
            .collect();
        return PlanResult::with_changes(Value::Object(planned), changes, false);
    };

    let mut changes = Vec::new();
    let mut requires_replace = false;

    for name in schema.block.attribute_names() {
        let attr = &schema.block.attributes[name];
        let before = present(prior.get(name));
        let after = present(planned.get(name));

        if attr.flags.is_computed_only() && after.is_none() {
            if let Some(value) = before {
                planned.insert(name.to_string(), value.clone());
            }
            continue;
        }

        if attribute_changed(attr, before, after, name) {
            if attr.force_new {
                requires_replace = true;
            }
            changes.push(change(name, before, after));
        } else if before != after {
            debug!(attribute = name, "Keeping prior value of equivalent attribute");
            keep_prior(&mut planned, name, before);
        }
    }

    for name in schema.block.block_names() {
        let nested = &schema.block.blocks[name];
        let before = present(prior.get(name));
        let after = present(planned.get(name));

        if nested_block_changed(nested, before, after) {
            if let Some(key) = force_new_only(&nested.block) {
                let key = NestedBlock::new(nested.nesting_mode, key);
                if nested_block_changed(&key, before, after) {
                    requires_replace = true;
                }
            }
            changes.push(change(name, before, after));
        } else if before != after {
            keep_prior(&mut planned, name, before);
        }
    }

    for (key, value) in &prior {
        if !schema.block.attributes.contains_key(key)
            && !schema.block.blocks.contains_key(key)
            && present(planned.get(key)).is_none()
        {
            planned.insert(key.clone(), value.clone());
        }
    }

    PlanResult::with_changes(Value::Object(planned), changes, requires_replace)
}

fn as_object(value: &Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map.clone(),
        _ => Map::new(),
    }
}

fn apply_defaults(block: &Block, state: &mut Map<String, Value>) {
    for (name, attr) in &block.attributes {
        if let Some(default) = &attr.default {
            if present(state.get(name)).is_none() {
                state.insert(name.clone(), default.clone());
            }
        }
    }
}

fn present(value: Option<&Value>) -> Option<&Value> {
    value.filter(|v| !v.is_null())
}

fn change(name: &str, before: Option<&Value>, after: Option<&Value>) -> AttributeChange {
    AttributeChange::new(name, before.cloned(), after.cloned())
}

fn keep_prior(planned: &mut Map<String, Value>, name: &str, before: Option<&Value>) {
    match before {
        Some(value) => {
            planned.insert(name.to_string(), value.clone());
        },
        None => {
            planned.remove(name);
        },
    }
}

fn attribute_changed(attr: &Attribute, before: Option<&Value>, after: Option<&Value>, path: &str) -> bool {
    if let Some(rule) = &attr.diff_suppress {
        let old = before.and_then(Value::as_str);
        let new = after.and_then(Value::as_str);
        // An unset payload compares as the empty text.
        if (before.is_none() || old.is_some()) && (after.is_none() || new.is_some()) {
            return !rule.suppressor().suppress_with(
                old.unwrap_or(""),
                new.unwrap_or(""),
                &TracingReporter::for_attribute(path),
            );
        }
    }

    match (&attr.attr_type, before, after) {
        (AttributeType::Set(_), Some(Value::Array(a)), Some(Value::Array(b))) => {
            !same_elements(a, b, |x, y| x == y)
        },
        _ => before != after,
    }
}

fn nested_block_changed(nested: &NestedBlock, before: Option<&Value>, after: Option<&Value>) -> bool {
    let items = |value: Option<&Value>| -> Vec<Value> {
        match value {
            None => Vec::new(),
            Some(Value::Array(items)) => items.clone(),
            Some(other) => vec![other.clone()],
        }
    };
    let (a, b) = (items(before), items(after));
    let same_block = |x: &Value, y: &Value| !block_changed(&nested.block, x, y);

    match nested.nesting_mode {
        BlockNestingMode::Single | BlockNestingMode::List => {
            a.len() != b.len() || a.iter().zip(&b).any(|(x, y)| !same_block(x, y))
        },
        BlockNestingMode::Set => !same_elements(&a, &b, same_block),
    }
}

fn block_changed(block: &Block, before: &Value, after: &Value) -> bool {
    let (before, after) = (as_object(before), as_object(after));
    block.attribute_names().into_iter().any(|name| {
        attribute_changed(
            &block.attributes[name],
            present(before.get(name)),
            present(after.get(name)),
            name,
        )
    }) || block.block_names().into_iter().any(|name| {
        nested_block_changed(
            &block.blocks[name],
            present(before.get(name)),
            present(after.get(name)),
        )
    })
}

// The part of a block that forces replacement, or None if nothing does.
fn force_new_only(block: &Block) -> Option<Block> {
    let mut key = Block::new();
    for (name, attr) in &block.attributes {
        if attr.force_new {
            key = key.with_attribute(name.clone(), attr.clone());
        }
    }
    for (name, nested) in &block.blocks {
        if let Some(inner) = force_new_only(&nested.block) {
            key = key.with_block(name.clone(), NestedBlock::new(nested.nesting_mode, inner));
        }
    }
    (!key.attributes.is_empty() || !key.blocks.is_empty()).then_some(key)
}

// Multiset equality under `same`: every element of `a` consumes one
// distinct matching element of `b`.
fn same_elements<F>(a: &[Value], b: &[Value], same: F) -> bool
where
    F: Fn(&Value, &Value) -> bool,
{
    if a.len() != b.len() {
        return false;
    }
    let mut used = vec![false; b.len()];
    a.iter().all(|x| {
        match (0..b.len()).find(|&j| !used[j] && same(x, &b[j])) {
            Some(j) => {
                used[j] = true;
                true
            },
            None => false,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Attribute, DiffSuppress};
    use crate::testing::{
        assert_plan_changes_attribute, assert_plan_does_not_change_attribute,
        assert_plan_has_changes, assert_plan_no_changes, assert_plan_replaces,
        assert_plan_updates_in_place,
    };
    use serde_json::json;

    fn object_schema() -> Schema {
        Schema::v0()
            .with_attribute("name", Attribute::required_string().with_force_new())
            .with_attribute(
                "space",
                Attribute::optional_string()
                    .with_force_new()
                    .with_default(json!("default")),
            )
            .with_attribute(
                "data",
                Attribute::required_string().with_diff_suppress(DiffSuppress::saved_objects()),
            )
            .with_attribute("export_types", Attribute::optional_string_set())
    }

    fn role_schema() -> Schema {
        Schema::v0()
            .with_attribute("name", Attribute::required_string().with_force_new())
            .with_attribute(
                "metadata",
                Attribute::optional_string().with_diff_suppress(DiffSuppress::json()),
            )
            .with_block(
                "elasticsearch",
                NestedBlock::set(
                    Block::new()
                        .with_attribute("cluster", Attribute::optional_string_set())
                        .with_block(
                            "indices",
                            NestedBlock::set(
                                Block::new()
                                    .with_attribute("names", Attribute::required_string_set())
                                    .with_attribute(
                                        "query",
                                        Attribute::optional_string()
                                            .with_diff_suppress(DiffSuppress::json()),
                                    ),
                            ),
                        ),
                )
                .with_max_items(1),
            )
            .with_attribute("username", Attribute::computed_string())
    }

    #[test]
    fn test_attribute_change_constructors() {
        let added = AttributeChange::added("name", json!("test"));
        assert!(added.before.is_none());
        assert_eq!(added.after, Some(json!("test")));

        let removed = AttributeChange::removed("name", json!("old"));
        assert_eq!(removed.before, Some(json!("old")));
        assert!(removed.after.is_none());

        let modified = AttributeChange::modified("retry", json!(1), json!(2));
        assert_eq!(modified.before, Some(json!(1)));
        assert_eq!(modified.after, Some(json!(2)));
    }

    #[test]
    fn test_plan_create_applies_defaults() {
        let plan = plan(
            &object_schema(),
            None,
            &json!({"name": "dashboards", "data": "{\"id\":\"a\"}"}),
        );

        assert_plan_has_changes(&plan);
        assert_plan_updates_in_place(&plan);
        assert_eq!(plan.planned_state["space"], "default");
        assert_plan_changes_attribute(&plan, "space");
        assert_plan_does_not_change_attribute(&plan, "export_types");
    }

    #[test]
    fn test_plan_suppresses_volatile_export_fields() {
        let prior = json!({
            "id": "dashboards",
            "name": "dashboards",
            "space": "default",
            "data": "{\"id\":\"a\",\"type\":\"index-pattern\",\"version\":\"WzEsMV0=\"}\n",
        });
        let proposed = json!({
            "name": "dashboards",
            "data": "{\"type\":\"index-pattern\",\"id\":\"a\"}",
        });

        let plan = plan(&object_schema(), Some(&prior), &proposed);
        assert_plan_no_changes(&plan);
        assert_eq!(plan.planned_state["data"], prior["data"]);
        assert_eq!(plan.planned_state["id"], "dashboards");
    }

    #[test]
    fn test_plan_reports_real_payload_change() {
        let prior = json!({"name": "d", "space": "default", "data": "{\"id\":\"a\",\"v\":1}"});
        let proposed = json!({"name": "d", "data": "{\"id\":\"a\",\"v\":2}"});

        let plan = plan(&object_schema(), Some(&prior), &proposed);
        assert_plan_changes_attribute(&plan, "data");
        assert_plan_updates_in_place(&plan);
        assert_eq!(plan.planned_state["data"], proposed["data"]);
    }

    #[test]
    fn test_plan_unparseable_payload_is_a_change() {
        let prior = json!({"name": "d", "space": "default", "data": "{\"id\":\"a\"}"});
        let proposed = json!({"name": "d", "data": "{\"id\":"});

        let plan = plan(&object_schema(), Some(&prior), &proposed);
        assert_plan_changes_attribute(&plan, "data");
    }

    #[test]
    fn test_plan_force_new_requires_replace() {
        let prior = json!({"name": "d", "space": "default", "data": ""});
        let proposed = json!({"name": "d", "space": "ops", "data": ""});

        let plan = plan(&object_schema(), Some(&prior), &proposed);
        assert_plan_changes_attribute(&plan, "space");
        assert_plan_replaces(&plan);
    }

    #[test]
    fn test_plan_string_sets_are_unordered() {
        let prior = json!({"name": "d", "space": "default", "data": "", "export_types": ["a", "b"]});
        let proposed = json!({"name": "d", "data": "", "export_types": ["b", "a"]});
        assert_plan_no_changes(&plan(&object_schema(), Some(&prior), &proposed));

        let proposed = json!({"name": "d", "data": "", "export_types": ["b", "b"]});
        assert_plan_changes_attribute(&plan(&object_schema(), Some(&prior), &proposed), "export_types");
    }

    #[test]
    fn test_plan_json_metadata() {
        let prior = json!({"name": "reader", "metadata": "{\"team\":\"ops\",\"level\":1}"});
        let proposed = json!({"name": "reader", "metadata": "{\"level\": 1.0, \"team\": \"ops\"}"});
        assert_plan_no_changes(&plan(&role_schema(), Some(&prior), &proposed));

        // Unset metadata and an empty document are the same.
        let prior = json!({"name": "reader", "metadata": "{}"});
        let proposed = json!({"name": "reader"});
        let result = plan(&role_schema(), Some(&prior), &proposed);
        assert_plan_no_changes(&result);
        assert_eq!(result.planned_state["metadata"], "{}");
    }

    #[test]
    fn test_plan_nested_query_suppression() {
        let prior = json!({
            "name": "reader",
            "elasticsearch": [{
                "cluster": ["monitor", "all"],
                "indices": [
                    {"names": ["logs-*"], "query": "{\"match\":{\"team\":\"ops\"}}"},
                    {"names": ["metrics-*"]}
                ]
            }]
        });
        let proposed = json!({
            "name": "reader",
            "elasticsearch": [{
                "cluster": ["all", "monitor"],
                "indices": [
                    {"names": ["metrics-*"]},
                    {"names": ["logs-*"], "query": "{ \"match\": { \"team\": \"ops\" } }"}
                ]
            }]
        });

        let result = plan(&role_schema(), Some(&prior), &proposed);
        assert_plan_no_changes(&result);
        assert_eq!(result.planned_state["elasticsearch"], prior["elasticsearch"]);

        let changed = json!({
            "name": "reader",
            "elasticsearch": [{
                "cluster": ["all", "monitor"],
                "indices": [
                    {"names": ["metrics-*"]},
                    {"names": ["logs-*"], "query": "{\"match\":{\"team\":\"dev\"}}"}
                ]
            }]
        });
        let result = plan(&role_schema(), Some(&prior), &changed);
        assert_plan_changes_attribute(&result, "elasticsearch");
        assert_plan_updates_in_place(&result);
    }

    #[test]
    fn test_plan_nested_force_new_requires_replace() {
        let schema = Schema::v0()
            .with_attribute("name", Attribute::required_string())
            .with_block(
                "features",
                NestedBlock::set(
                    Block::new()
                        .with_attribute("name", Attribute::required_string().with_force_new())
                        .with_attribute("permissions", Attribute::required_string_set()),
                ),
            );
        let prior = json!({"name": "r", "features": [{"name": "discover", "permissions": ["read"]}]});

        let proposed = json!({"name": "r", "features": [{"name": "discover", "permissions": ["all"]}]});
        let result = plan(&schema, Some(&prior), &proposed);
        assert_plan_changes_attribute(&result, "features");
        assert_plan_updates_in_place(&result);

        let proposed = json!({"name": "r", "features": [{"name": "dashboard", "permissions": ["read"]}]});
        let result = plan(&schema, Some(&prior), &proposed);
        assert_plan_changes_attribute(&result, "features");
        assert_plan_replaces(&result);
    }

    #[test]
    fn test_force_new_only() {
        let block = Block::new()
            .with_attribute("a", Attribute::optional_string())
            .with_block(
                "inner",
                NestedBlock::set(Block::new().with_attribute("b", Attribute::optional_string().with_force_new())),
            );
        let key = force_new_only(&block).unwrap();
        assert!(key.attributes.is_empty());
        assert_eq!(key.blocks["inner"].block.attribute_names(), vec!["b"]);

        assert!(force_new_only(&Block::new().with_attribute("a", Attribute::optional_string())).is_none());
    }

    #[test]
    fn test_plan_keeps_computed_attribute() {
        let prior = json!({"name": "reader", "username": "elastic"});
        let proposed = json!({"name": "reader"});

        let result = plan(&role_schema(), Some(&prior), &proposed);
        assert_plan_no_changes(&result);
        assert_eq!(result.planned_state["username"], "elastic");
    }

    #[test]
    fn test_plan_result_constructors() {
        let no_change = PlanResult::no_change(json!({"id": "123"}));
        assert!(!no_change.has_changes());
        assert!(!no_change.requires_replace);

        let with_changes = PlanResult::with_changes(
            json!({"id": "123", "name": "new"}),
            vec![AttributeChange::modified("name", json!("old"), json!("new"))],
            false,
        );
        assert!(with_changes.has_changes());
    }

    #[test]
    fn test_same_elements_is_multiset_equality() {
        let eq = |x: &Value, y: &Value| x == y;
        assert!(same_elements(&[json!(1), json!(2)], &[json!(2), json!(1)], eq));
        assert!(!same_elements(&[json!(1), json!(1)], &[json!(1), json!(2)], eq));
        assert!(!same_elements(&[json!(1)], &[json!(1), json!(1)], eq));
        assert!(same_elements(&[], &[], eq));
    }
}
