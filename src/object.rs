//! The `kibana_object` resource: saved objects imported from NDJSON.
//!
//! Kibana has no update-in-place for saved objects, only import (with
//! overwrite) and export. Reading the resource exports the selected objects
//! and compares the export with the stored `data` through the saved-object
//! suppressor; when they are equivalent the stored text is kept, so the
//! fields Kibana rewrites on every export (version, timestamps, migration
//! versions, references, sort keys) never show up as drift.
//!
//! The store behind the resource is a trait so that the HTTP client lives
//! outside this crate.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::error::ProviderError;
use crate::ndjson::split_records;
use crate::suppress::{Suppressor, TracingReporter};

/// The space used when none is configured.
pub const DEFAULT_SPACE: &str = "default";

/// A saved object addressed by type and id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectRef {
    /// The saved object id.
    pub id: String,
    /// The saved object type (`index-pattern`, `dashboard`, ...).
    #[serde(rename = "type")]
    pub object_type: String,
}

impl ObjectRef {
    /// Create a reference.
    pub fn new(object_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            object_type: object_type.into(),
        }
    }
}

/// What to export from a space.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportRequest {
    /// Export every object of these types.
    pub types: Vec<String>,
    /// Export these objects.
    pub objects: Vec<ObjectRef>,
    /// Also export the objects referenced by the selection.
    pub deep_reference: bool,
    /// The space to export from.
    pub space: String,
}

/// The remote saved-object API.
#[async_trait]
pub trait SavedObjectStore: Send + Sync {
    /// Export the selected objects as NDJSON. An empty string means nothing
    /// matched.
    async fn export(&self, request: &ExportRequest) -> Result<String, ProviderError>;

    /// Import NDJSON objects into a space.
    async fn import(&self, space: &str, data: &str, overwrite: bool) -> Result<(), ProviderError>;
}

/// State of a `kibana_object` resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectState {
    /// Resource id; equal to `name` once created.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Resource name.
    pub name: String,
    /// Target space.
    #[serde(default = "default_space")]
    pub space: String,
    /// Saved objects as NDJSON.
    #[serde(default)]
    pub data: String,
    /// Types to export when reading.
    #[serde(default)]
    pub export_types: Vec<String>,
    /// Objects to export when reading.
    #[serde(default)]
    pub export_objects: Vec<ObjectRef>,
    /// Whether reading follows references.
    #[serde(default = "default_deep_reference")]
    pub deep_reference: bool,
}

fn default_space() -> String {
    DEFAULT_SPACE.to_string()
}

fn default_deep_reference() -> bool {
    true
}

impl ObjectState {
    /// Parse resource state.
    pub fn from_value(value: Value) -> Result<Self, ProviderError> {
        Ok(serde_json::from_value(value)?)
    }

    /// Serialize resource state.
    pub fn to_value(&self) -> Result<Value, ProviderError> {
        Ok(serde_json::to_value(self)?)
    }

    /// The export selecting this resource's objects.
    pub fn export_request(&self) -> ExportRequest {
        ExportRequest {
            types: self.export_types.clone(),
            objects: self.export_objects.clone(),
            deep_reference: self.deep_reference,
            space: self.space.clone(),
        }
    }
}

/// CRUD for `kibana_object` over a [`SavedObjectStore`].
pub struct ObjectResource<S> {
    store: S,
    suppressor: Suppressor,
}

impl<S: SavedObjectStore> ObjectResource<S> {
    /// Create the resource with the saved-object suppressor.
    pub fn new(store: S) -> Self {
        Self {
            store,
            suppressor: Suppressor::saved_objects(),
        }
    }

    /// Replace the suppressor used to compare exports with state.
    pub fn with_suppressor(mut self, suppressor: Suppressor) -> Self {
        self.suppressor = suppressor;
        self
    }

    /// The underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Import the planned objects and read them back.
    #[instrument(skip_all, name = "kibana_object.create")]
    pub async fn create(&self, planned_state: Value) -> Result<Value, ProviderError> {
        let mut state = ObjectState::from_value(planned_state)?;
        self.import(&state).await?;
        state.id = Some(state.name.clone());
        info!(name = %state.name, "Imported objects");

        let name = state.name.clone();
        self.read_state(state)
            .await?
            .ok_or(ProviderError::NotFound(name))
    }

    /// Export the objects and reconcile them with the stored state.
    ///
    /// Returns `None` when the export is empty: the objects are gone and the
    /// resource should be dropped from state.
    #[instrument(skip_all, name = "kibana_object.read")]
    pub async fn read(&self, current_state: Value) -> Result<Option<Value>, ProviderError> {
        let state = ObjectState::from_value(current_state)?;
        self.read_state(state).await
    }

    /// Re-import the planned objects and read them back.
    #[instrument(skip_all, name = "kibana_object.update")]
    pub async fn update(&self, prior_state: Value, planned_state: Value) -> Result<Value, ProviderError> {
        let prior = ObjectState::from_value(prior_state)?;
        let mut state = ObjectState::from_value(planned_state)?;
        self.import(&state).await?;
        state.id = prior.id.or_else(|| Some(state.name.clone()));
        info!(name = %state.name, "Updated objects");

        let name = state.name.clone();
        self.read_state(state)
            .await?
            .ok_or(ProviderError::NotFound(name))
    }

    /// Forget the resource. Saved objects are left in Kibana.
    #[instrument(skip_all, name = "kibana_object.delete")]
    pub async fn delete(&self, current_state: Value) -> Result<(), ProviderError> {
        let state = ObjectState::from_value(current_state)?;
        info!(name = %state.name, "Deleting saved objects is not supported, removing from state only");
        Ok(())
    }

    async fn import(&self, state: &ObjectState) -> Result<(), ProviderError> {
        debug!(space = %state.space, records = split_records(&state.data).len(), "Importing objects");
        self.store.import(&state.space, &state.data, true).await
    }

    async fn read_state(&self, mut state: ObjectState) -> Result<Option<Value>, ProviderError> {
        let request = state.export_request();
        debug!(?request, "Exporting objects");
        let exported = self.store.export(&request).await?;

        if split_records(&exported).is_empty() {
            warn!(name = %state.name, "Exported objects not found, removing from state");
            return Ok(None);
        }

        let reporter = TracingReporter::for_attribute("data");
        if !self.suppressor.suppress_with(&state.data, &exported, &reporter) {
            state.data = exported;
        }
        if state.id.is_none() {
            state.id = Some(state.name.clone());
        }
        state.to_value().map(Some)
    }
}
