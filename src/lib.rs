//! Kibana Provider
//!
//! Core of a Kibana infrastructure provider: the semantic diff suppression
//! applied to JSON and NDJSON payload attributes, the resource schemas that
//! carry it, and reconciliation of saved objects against Kibana exports.
//!
//! # Overview
//!
//! - **Diff suppression**: [`should_suppress_diff`] and [`Suppressor`] decide
//!   whether two payload strings are semantically equal
//! - **Documents**: [`normalize`] parses text into a [`Document`] with
//!   [`Exclusions`] removed
//! - **Schemas**: [`resources::provider_schema`] declares the provider
//!   block, resources and data sources
//! - **Planning**: [`plan`] computes changes, consulting each attribute's
//!   diff suppression rule
//! - **Saved objects**: [`object::ObjectResource`] over a
//!   [`object::SavedObjectStore`]
//! - **Logging**: `tracing` setup writing to stderr
//!
//! # Quick Start
//!
//! ```
//! use kibana_provider::{should_suppress_diff, DiffMode, Exclusions};
//!
//! let old = r#"{"id":"a","type":"index-pattern","version":"WzEsMV0="}"#;
//! let new = r#"{"type":"index-pattern","id":"a","version":"WzIsMV0="}"#;
//!
//! assert!(should_suppress_diff(old, new, DiffMode::Ndjson, &Exclusions::saved_objects()));
//! assert!(!should_suppress_diff(old, new, DiffMode::Ndjson, &Exclusions::new()));
//! ```
//!
//! Any parse failure, record count mismatch or identity problem makes the
//! values count as different.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod compare;
pub mod config;
pub mod document;
pub mod error;
pub mod logging;
pub mod ndjson;
pub mod object;
pub mod plan;
pub mod resources;
pub mod schema;
pub mod suppress;
pub mod testing;
pub mod validation;

// Re-export main types at crate root
pub use config::ProviderConfig;
pub use document::{normalize, Document, Exclusions, Number, SAVED_OBJECT_VOLATILE_FIELDS};
pub use error::{DiffError, ProviderError};
pub use logging::{init_logging, init_logging_with_default, try_init_logging};
pub use ndjson::{match_records, parse_records, split_records, DEFAULT_IDENTITY_KEY};
pub use object::{ObjectResource, SavedObjectStore};
pub use plan::{plan, AttributeChange, PlanResult};
pub use schema::{DiffSuppress, ProviderSchema};
pub use suppress::{
    should_suppress_diff, DiffMode, DiffReporter, Difference, NoopReporter, Suppressor,
    TracingReporter, Verdict,
};
pub use validation::{is_valid, validate, validate_result};

// Re-export async_trait for store implementations
pub use async_trait::async_trait;

// Re-export commonly used external types
pub use serde_json;
pub use tracing;
