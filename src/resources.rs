//! Schemas of the Kibana provider.
//!
//! Declares the provider block, the five managed resources and the
//! `kibana_host` data source. Payload attributes (saved-object exports, role
//! metadata, index queries, field security) carry the diff-suppression rule
//! used when planning.

use serde_json::{json, Value};

use crate::error::ProviderError;
use crate::plan::{plan, PlanResult};
use crate::schema::{
    Attribute, AttributeFlags, AttributeType, Block, Diagnostic, DiffSuppress, NestedBlock,
    ProviderSchema, Schema,
};
use crate::validation::validate;

/// Saved objects imported from NDJSON.
pub const KIBANA_OBJECT: &str = "kibana_object";
/// A Kibana role.
pub const KIBANA_ROLE: &str = "kibana_role";
/// A Kibana space.
pub const KIBANA_USER_SPACE: &str = "kibana_user_space";
/// A centrally managed Logstash pipeline.
pub const KIBANA_LOGSTASH_PIPELINE: &str = "kibana_logstash_pipeline";
/// Saved objects copied from one space to others.
pub const KIBANA_COPY_OBJECT: &str = "kibana_copy_object";
/// Connection settings of the configured Kibana.
pub const KIBANA_HOST: &str = "kibana_host";

/// The complete provider schema.
pub fn provider_schema() -> ProviderSchema {
    ProviderSchema::new()
        .with_provider_config(provider_config_schema())
        .with_resource(KIBANA_OBJECT, object_schema())
        .with_resource(KIBANA_ROLE, role_schema())
        .with_resource(KIBANA_USER_SPACE, user_space_schema())
        .with_resource(KIBANA_LOGSTASH_PIPELINE, logstash_pipeline_schema())
        .with_resource(KIBANA_COPY_OBJECT, copy_object_schema())
        .with_data_source(KIBANA_HOST, host_schema())
}

/// Plan a change of a resource of the given type.
pub fn plan_resource(
    schema: &ProviderSchema,
    resource_type: &str,
    prior: Option<&Value>,
    proposed: &Value,
) -> Result<PlanResult, ProviderError> {
    let resource = schema
        .resource(resource_type)
        .ok_or_else(|| ProviderError::UnknownResource(resource_type.to_string()))?;
    Ok(plan(resource, prior, proposed))
}

/// Validate the configuration of a resource of the given type.
pub fn validate_resource(
    schema: &ProviderSchema,
    resource_type: &str,
    config: &Value,
) -> Result<Vec<Diagnostic>, ProviderError> {
    let resource = schema
        .resource(resource_type)
        .ok_or_else(|| ProviderError::UnknownResource(resource_type.to_string()))?;
    Ok(validate(resource, config))
}

fn provider_config_schema() -> Schema {
    Schema::v0()
        .with_attribute(
            "url",
            Attribute::required_string().with_description("Kibana URL (or KIBANA_URL)"),
        )
        .with_attribute(
            "username",
            Attribute::optional_string()
                .with_description("Username for basic auth (or KIBANA_USERNAME)"),
        )
        .with_attribute(
            "password",
            Attribute::optional_string()
                .sensitive()
                .with_description("Password for basic auth (or KIBANA_PASSWORD)"),
        )
        .with_attribute(
            "cacert_files",
            Attribute::optional_string_set().with_description("Custom CA certificate paths"),
        )
        .with_attribute(
            "insecure",
            Attribute::optional_bool()
                .with_default(json!(false))
                .with_description("Disable TLS verification of API calls"),
        )
        .with_attribute(
            "retry",
            Attribute::optional_int64()
                .with_default(json!(6))
                .with_description("Number of status checks before giving up"),
        )
        .with_attribute(
            "wait_before_retry",
            Attribute::optional_int64()
                .with_default(json!(10))
                .with_description("Seconds to wait between status checks"),
        )
        .with_attribute(
            "debug",
            Attribute::optional_bool()
                .with_default(json!(false))
                .with_description("Log at debug level"),
        )
}

fn object_ref_block() -> Block {
    Block::new()
        .with_attribute("id", Attribute::required_string())
        .with_attribute("type", Attribute::required_string())
}

fn object_schema() -> Schema {
    Schema::v0()
        .with_description("Saved objects imported into a space")
        .with_attribute("name", Attribute::required_string().with_force_new())
        .with_attribute(
            "space",
            Attribute::optional_string()
                .with_force_new()
                .with_default(json!("default")),
        )
        .with_attribute(
            "data",
            Attribute::required_string()
                .with_diff_suppress(DiffSuppress::saved_objects())
                .with_description("Saved objects as NDJSON"),
        )
        .with_attribute("export_types", Attribute::optional_string_set())
        .with_block("export_objects", NestedBlock::set(object_ref_block()))
        .with_attribute(
            "deep_reference",
            Attribute::optional_bool().with_default(json!(true)),
        )
}

fn role_schema() -> Schema {
    let indices = Block::new()
        .with_attribute("names", Attribute::required_string_set())
        .with_attribute("privileges", Attribute::required_string_set())
        .with_attribute(
            "query",
            Attribute::optional_string().with_diff_suppress(DiffSuppress::json()),
        )
        .with_attribute(
            "field_security",
            Attribute::optional_string().with_diff_suppress(DiffSuppress::json()),
        );

    let elasticsearch = Block::new()
        .with_block("indices", NestedBlock::set(indices))
        .with_attribute("cluster", Attribute::optional_string_set())
        .with_attribute("run_as", Attribute::optional_string_set());

    let features = Block::new()
        .with_attribute("name", Attribute::required_string())
        .with_attribute("permissions", Attribute::required_string_set());

    let kibana = Block::new()
        .with_attribute("base", Attribute::optional_string_set())
        .with_attribute("spaces", Attribute::required_string_set())
        .with_block("features", NestedBlock::set(features));

    Schema::v0()
        .with_description("A Kibana role")
        .with_attribute("name", Attribute::required_string().with_force_new())
        .with_block(
            "elasticsearch",
            NestedBlock::set(elasticsearch).with_max_items(1),
        )
        .with_block("kibana", NestedBlock::set(kibana))
        .with_attribute(
            "metadata",
            Attribute::optional_string().with_diff_suppress(DiffSuppress::json()),
        )
}

fn user_space_schema() -> Schema {
    Schema::v0()
        .with_description("A Kibana space")
        .with_attribute("uid", Attribute::required_string().with_force_new())
        .with_attribute("name", Attribute::required_string())
        .with_attribute("description", Attribute::optional_string())
        .with_attribute("disabled_features", Attribute::optional_string_set())
        .with_attribute("initials", Attribute::optional_string())
        .with_attribute("color", Attribute::optional_string())
}

fn logstash_pipeline_schema() -> Schema {
    let settings = Block::new()
        .with_attribute("pipeline_workers", Attribute::optional_int64())
        .with_attribute("pipeline_batch_size", Attribute::optional_int64())
        .with_attribute("pipeline_batch_delay", Attribute::optional_int64())
        .with_attribute("pipeline_ecs_compatibility", Attribute::optional_string())
        .with_attribute("pipeline_ordered", Attribute::optional_string())
        .with_attribute("queue_type", Attribute::optional_string())
        .with_attribute("queue_max_bytes", Attribute::optional_string())
        .with_attribute("queue_checkpoint_writes", Attribute::optional_int64());

    Schema::v0()
        .with_description("A centrally managed Logstash pipeline")
        .with_attribute("name", Attribute::required_string().with_force_new())
        .with_attribute("description", Attribute::optional_string())
        .with_attribute("pipeline", Attribute::required_string())
        .with_attribute("username", Attribute::computed_string())
        .with_block("settings", NestedBlock::set(settings))
}

fn copy_object_schema() -> Schema {
    Schema::v0()
        .with_description("Saved objects copied from one space to others")
        .with_attribute("name", Attribute::required_string().with_force_new())
        .with_attribute(
            "source_space",
            Attribute::optional_string().with_default(json!("default")),
        )
        .with_attribute("target_spaces", Attribute::required_string_set())
        .with_block(
            "object",
            NestedBlock::set(object_ref_block()).with_min_items(1),
        )
        .with_attribute(
            "include_reference",
            Attribute::optional_bool().with_default(json!(true)),
        )
        .with_attribute(
            "overwrite",
            Attribute::optional_bool().with_default(json!(false)),
        )
        .with_attribute(
            "create_new_copies",
            Attribute::optional_bool().with_default(json!(true)),
        )
        .with_attribute(
            "force_update",
            Attribute::new(AttributeType::Bool, AttributeFlags::optional_computed()),
        )
}

fn host_schema() -> Schema {
    Schema::v0()
        .with_description("Connection settings of the configured Kibana")
        .with_attribute("url", Attribute::computed_string())
        .with_attribute("username", Attribute::computed_string())
        .with_attribute("password", Attribute::computed_string().sensitive())
}
