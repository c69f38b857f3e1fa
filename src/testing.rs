//! Testing utilities for provider code.
//!
//! - [`MemoryStore`]: an in-memory [`SavedObjectStore`] that behaves like
//!   Kibana's import/export API, including the fields Kibana stamps onto
//!   every object it stores.
//! - Plan and diagnostic assertion helpers.
//!
//! # Example
//!
//! ```ignore
//! use kibana_provider::object::ObjectResource;
//! use kibana_provider::testing::MemoryStore;
//! use serde_json::json;
//!
//! #[tokio::test]
//! async fn test_import() {
//!     let resource = ObjectResource::new(MemoryStore::new());
//!     let state = resource
//!         .create(json!({"name": "x", "data": "{\"id\":\"a\",\"type\":\"tag\"}", "export_types": ["tag"]}))
//!         .await
//!         .unwrap();
//!     assert_eq!(state["id"], "x");
//! }
//! ```

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use tokio::sync::RwLock;

use crate::error::ProviderError;
use crate::ndjson::split_records;
use crate::object::{ExportRequest, SavedObjectStore};
use crate::plan::PlanResult;
use crate::schema::{Diagnostic, DiagnosticSeverity};

/// The Kibana version stamped into stored objects.
const STACK_VERSION: &str = "8.8.0";

type ObjectKey = (String, String, String);

/// In-memory saved objects keyed by space, type and id.
#[derive(Debug, Default)]
pub struct MemoryStore {
    objects: RwLock<BTreeMap<ObjectKey, Map<String, Value>>>,
    writes: AtomicU64,
    unavailable: bool,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose every call fails as if Kibana were down.
    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::default()
        }
    }

    /// Number of stored objects across all spaces.
    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    /// Whether the store holds no objects.
    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }

    /// Delete an object behind the provider's back.
    pub async fn remove(&self, space: &str, object_type: &str, id: &str) -> bool {
        let key = (space.to_string(), object_type.to_string(), id.to_string());
        self.objects.write().await.remove(&key).is_some()
    }

    fn check_available(&self) -> Result<(), ProviderError> {
        if self.unavailable {
            Err(ProviderError::Unavailable("Kibana is not reachable".to_string()))
        } else {
            Ok(())
        }
    }

    fn stamp(&self, object: &mut Map<String, Value>) {
        let write = self.writes.fetch_add(1, Ordering::SeqCst) + 1;
        object.insert("version".to_string(), json!(format!("Wz{},1]", write)));
        object.insert(
            "updated_at".to_string(),
            json!(format!("2024-01-01T00:00:{:02}.000Z", write % 60)),
        );
        object.insert("coreMigrationVersion".to_string(), json!(STACK_VERSION));
        object
            .entry("references".to_string())
            .or_insert_with(|| json!([]));
    }
}

fn required_field(object: &Map<String, Value>, field: &str, line: usize) -> Result<String, ProviderError> {
    object
        .get(field)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| ProviderError::InvalidRequest(format!("object {} has no '{}'", line, field)))
}

#[async_trait]
impl SavedObjectStore for MemoryStore {
    async fn export(&self, request: &ExportRequest) -> Result<String, ProviderError> {
        self.check_available()?;
        let objects = self.objects.read().await;

        let mut lines = Vec::new();
        for ((space, object_type, id), object) in objects.iter() {
            if space != &request.space {
                continue;
            }
            let selected = request.types.iter().any(|t| t == object_type)
                || request
                    .objects
                    .iter()
                    .any(|o| &o.object_type == object_type && &o.id == id);
            if selected {
                lines.push(serde_json::to_string(object)?);
            }
        }

        if lines.is_empty() {
            return Ok(String::new());
        }
        Ok(lines.join("\n") + "\n")
    }

    async fn import(&self, space: &str, data: &str, overwrite: bool) -> Result<(), ProviderError> {
        self.check_available()?;

        let mut parsed = Vec::new();
        for (line, record) in split_records(data).into_iter().enumerate() {
            let object = match serde_json::from_str::<Value>(record)? {
                Value::Object(map) => map,
                _ => {
                    return Err(ProviderError::InvalidRequest(format!(
                        "object {} is not a JSON object",
                        line
                    )))
                },
            };
            let key = (
                space.to_string(),
                required_field(&object, "type", line)?,
                required_field(&object, "id", line)?,
            );
            parsed.push((key, object));
        }

        let mut objects = self.objects.write().await;
        for (key, mut object) in parsed {
            if !overwrite && objects.contains_key(&key) {
                return Err(ProviderError::InvalidRequest(format!(
                    "object {}/{} already exists",
                    key.1, key.2
                )));
            }
            self.stamp(&mut object);
            objects.insert(key, object);
        }
        Ok(())
    }
}

fn changed_paths(plan: &PlanResult) -> Vec<&str> {
    plan.changes.iter().map(|c| c.path.as_str()).collect()
}

fn error_summaries(diagnostics: &[Diagnostic]) -> Vec<&str> {
    diagnostics
        .iter()
        .filter(|d| d.severity == DiagnosticSeverity::Error)
        .map(|d| d.summary.as_str())
        .collect()
}

/// Panics unless the plan is empty.
pub fn assert_plan_no_changes(plan: &PlanResult) {
    let paths = changed_paths(plan);
    assert!(paths.is_empty(), "Expected no changes, got {:?}", paths);
}

/// Panics if the plan is empty.
pub fn assert_plan_has_changes(plan: &PlanResult) {
    assert!(plan.has_changes(), "Expected changes, got an empty plan");
}

/// Panics unless the plan replaces the resource.
pub fn assert_plan_replaces(plan: &PlanResult) {
    assert!(
        plan.requires_replace,
        "Expected replacement, changes {:?} update in place",
        changed_paths(plan)
    );
}

/// Panics if the plan replaces the resource.
pub fn assert_plan_updates_in_place(plan: &PlanResult) {
    assert!(
        !plan.requires_replace,
        "Expected an in-place update, changes {:?} force replacement",
        changed_paths(plan)
    );
}

/// Panics unless `path` is among the plan's changes.
pub fn assert_plan_changes_attribute(plan: &PlanResult, path: &str) {
    let paths = changed_paths(plan);
    assert!(paths.contains(&path), "Expected '{}' to change, changed: {:?}", path, paths);
}

/// Panics if `path` is among the plan's changes.
pub fn assert_plan_does_not_change_attribute(plan: &PlanResult, path: &str) {
    let paths = changed_paths(plan);
    assert!(!paths.contains(&path), "Expected '{}' to stay unchanged, changed: {:?}", path, paths);
}

/// Panics if any diagnostic is an error. Warnings are ignored.
pub fn assert_no_errors(diagnostics: &[Diagnostic]) {
    let errors = error_summaries(diagnostics);
    assert!(errors.is_empty(), "Expected no errors, got {:?}", errors);
}

/// Panics unless some error's summary contains `substring`.
pub fn assert_error_contains(diagnostics: &[Diagnostic], substring: &str) {
    let errors = error_summaries(diagnostics);
    assert!(
        errors.iter().any(|summary| summary.contains(substring)),
        "Expected an error containing '{}', got {:?}",
        substring,
        errors
    );
}
