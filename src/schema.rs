//! Attribute schemas for the provider and its resources.
//!
//! Schemas describe the shape of provider configuration, resources and data
//! sources. Besides the usual required/optional/computed/force-new flags an
//! attribute can carry a [`DiffSuppress`] rule: string attributes holding
//! JSON or NDJSON payloads are then compared semantically when planning,
//! instead of byte for byte.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::document::Exclusions;
use crate::suppress::{DiffMode, Suppressor};

/// Value type of an attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeType {
    /// Text, including JSON and NDJSON payloads.
    String,
    /// A whole number.
    Int64,
    /// `true` or `false`.
    Bool,
    /// Unordered values of one element type, carried as a JSON array.
    Set(Box<AttributeType>),
}

impl AttributeType {
    /// A set of `element_type`.
    pub fn set(element_type: AttributeType) -> Self {
        Self::Set(Box::new(element_type))
    }
}

/// Who may set an attribute, and whether it is secret.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct AttributeFlags {
    /// Configuration must set it.
    pub required: bool,
    /// Configuration may set it.
    pub optional: bool,
    /// The provider may set it.
    pub computed: bool,
    /// Hidden from plan output and logs.
    pub sensitive: bool,
}

impl AttributeFlags {
    /// Set by configuration, always.
    pub fn required() -> Self {
        Self {
            required: true,
            ..Self::default()
        }
    }

    /// Set by configuration, sometimes.
    pub fn optional() -> Self {
        Self {
            optional: true,
            ..Self::default()
        }
    }

    /// Set by the provider only.
    pub fn computed() -> Self {
        Self {
            computed: true,
            ..Self::default()
        }
    }

    /// Set by configuration, or by the provider when configuration doesn't.
    pub fn optional_computed() -> Self {
        Self {
            computed: true,
            ..Self::optional()
        }
    }

    /// Whether only the provider sets this attribute.
    pub fn is_computed_only(&self) -> bool {
        self.computed && !self.optional && !self.required
    }
}

/// Semantic comparison rule for a string attribute holding JSON or NDJSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffSuppress {
    /// How the string is interpreted.
    pub mode: DiffMode,
    /// Fields ignored on both sides.
    #[serde(default, skip_serializing_if = "Exclusions::is_empty")]
    pub exclusions: Exclusions,
}

impl DiffSuppress {
    /// Compare as one JSON document.
    pub fn json() -> Self {
        Self {
            mode: DiffMode::Json,
            exclusions: Exclusions::new(),
        }
    }

    /// Compare as NDJSON records matched by `id`.
    pub fn ndjson() -> Self {
        Self {
            mode: DiffMode::Ndjson,
            exclusions: Exclusions::new(),
        }
    }

    /// Compare as a saved-object export, ignoring volatile fields.
    pub fn saved_objects() -> Self {
        Self {
            mode: DiffMode::Ndjson,
            exclusions: Exclusions::saved_objects(),
        }
    }

    /// Replace the exclusion set.
    pub fn with_exclusions(mut self, exclusions: Exclusions) -> Self {
        self.exclusions = exclusions;
        self
    }

    /// Build the suppressor for this rule.
    pub fn suppressor(&self) -> Suppressor {
        Suppressor::new(self.mode).with_exclusions(self.exclusions.clone())
    }
}

/// One attribute of a block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    /// Value type.
    #[serde(rename = "type")]
    pub attr_type: AttributeType,
    /// Required/optional/computed/sensitive.
    #[serde(flatten)]
    pub flags: AttributeFlags,
    /// Human-readable description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// A change replaces the resource instead of updating it.
    #[serde(default)]
    pub force_new: bool,
    /// Value used when configuration leaves the attribute unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
    /// Semantic comparison of a JSON or NDJSON string value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diff_suppress: Option<DiffSuppress>,
}

impl Attribute {
    /// An attribute with no description, default or suppression rule.
    pub fn new(attr_type: AttributeType, flags: AttributeFlags) -> Self {
        Self {
            attr_type,
            flags,
            description: None,
            force_new: false,
            default: None,
            diff_suppress: None,
        }
    }

    /// `String`, required.
    pub fn required_string() -> Self {
        Self::new(AttributeType::String, AttributeFlags::required())
    }

    /// `String`, optional.
    pub fn optional_string() -> Self {
        Self::new(AttributeType::String, AttributeFlags::optional())
    }

    /// `String`, set by the provider.
    pub fn computed_string() -> Self {
        Self::new(AttributeType::String, AttributeFlags::computed())
    }

    /// `Int64`, optional.
    pub fn optional_int64() -> Self {
        Self::new(AttributeType::Int64, AttributeFlags::optional())
    }

    /// `Bool`, optional.
    pub fn optional_bool() -> Self {
        Self::new(AttributeType::Bool, AttributeFlags::optional())
    }

    /// Set of strings, required.
    pub fn required_string_set() -> Self {
        Self::new(AttributeType::set(AttributeType::String), AttributeFlags::required())
    }

    /// Set of strings, optional.
    pub fn optional_string_set() -> Self {
        Self::new(AttributeType::set(AttributeType::String), AttributeFlags::optional())
    }

    /// Describe the attribute.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Replace the resource when this attribute changes.
    pub fn with_force_new(mut self) -> Self {
        self.force_new = true;
        self
    }

    /// Use `default` when configuration leaves the attribute unset.
    pub fn with_default(mut self, default: serde_json::Value) -> Self {
        self.default = Some(default);
        self
    }

    /// Compare this attribute's string value semantically.
    pub fn with_diff_suppress(mut self, rule: DiffSuppress) -> Self {
        self.diff_suppress = Some(rule);
        self
    }

    /// Hide the value from plan output and logs.
    pub fn sensitive(mut self) -> Self {
        self.flags.sensitive = true;
        self
    }
}

/// How repeated occurrences of a nested block are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BlockNestingMode {
    /// At most one occurrence, given as an object.
    #[default]
    Single,
    /// Ordered occurrences.
    List,
    /// Unordered occurrences, compared as a multiset when planning.
    Set,
}

/// Attributes and nested blocks, keyed by name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Block {
    /// Attributes by name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, Attribute>,
    /// Nested blocks by name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub blocks: BTreeMap<String, NestedBlock>,
    /// Human-readable description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Block {
    /// An empty block.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an attribute.
    pub fn with_attribute(mut self, name: impl Into<String>, attr: Attribute) -> Self {
        self.attributes.insert(name.into(), attr);
        self
    }

    /// Add a nested block.
    pub fn with_block(mut self, name: impl Into<String>, block: NestedBlock) -> Self {
        self.blocks.insert(name.into(), block);
        self
    }

    /// Attribute names in sorted order.
    pub fn attribute_names(&self) -> Vec<&str> {
        self.attributes.keys().map(String::as_str).collect()
    }

    /// Nested block names in sorted order.
    pub fn block_names(&self) -> Vec<&str> {
        self.blocks.keys().map(String::as_str).collect()
    }
}

/// A block nested inside another, with its occurrence limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NestedBlock {
    /// The nested block's contents.
    #[serde(flatten)]
    pub block: Block,
    /// How occurrences are interpreted.
    #[serde(default)]
    pub nesting_mode: BlockNestingMode,
    /// Fewest occurrences allowed.
    #[serde(default)]
    pub min_items: u32,
    /// Most occurrences allowed; 0 means no limit.
    #[serde(default)]
    pub max_items: u32,
}

impl NestedBlock {
    /// A nested block with no occurrence limits, except that a single block
    /// occurs at most once.
    pub fn new(nesting_mode: BlockNestingMode, block: Block) -> Self {
        let max_items = match nesting_mode {
            BlockNestingMode::Single => 1,
            BlockNestingMode::List | BlockNestingMode::Set => 0,
        };
        Self {
            block,
            nesting_mode,
            min_items: 0,
            max_items,
        }
    }

    /// An unordered nested block, the shape Kibana roles and pipelines use.
    pub fn set(block: Block) -> Self {
        Self::new(BlockNestingMode::Set, block)
    }

    /// Require at least `min` occurrences.
    pub fn with_min_items(mut self, min: u32) -> Self {
        self.min_items = min;
        self
    }

    /// Allow at most `max` occurrences.
    pub fn with_max_items(mut self, max: u32) -> Self {
        self.max_items = max;
        self
    }
}

/// Schema of the provider block, a resource or a data source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    /// State version, bumped when stored state changes shape.
    #[serde(default)]
    pub version: u64,
    /// Top-level attributes and blocks.
    #[serde(flatten)]
    pub block: Block,
}

impl Schema {
    /// An empty schema at version 0.
    pub fn v0() -> Self {
        Self::default()
    }

    /// Set the state version.
    pub fn with_version(mut self, version: u64) -> Self {
        self.version = version;
        self
    }

    /// Add a top-level attribute.
    pub fn with_attribute(mut self, name: impl Into<String>, attr: Attribute) -> Self {
        self.block = self.block.with_attribute(name, attr);
        self
    }

    /// Add a top-level nested block.
    pub fn with_block(mut self, name: impl Into<String>, block: NestedBlock) -> Self {
        self.block = self.block.with_block(name, block);
        self
    }

    /// Describe the schema.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.block.description = Some(description.into());
        self
    }
}

/// Every schema the provider declares.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ProviderSchema {
    /// The provider block.
    #[serde(default)]
    pub provider: Schema,
    /// Resources by type name.
    #[serde(default)]
    pub resources: BTreeMap<String, Schema>,
    /// Data sources by type name.
    #[serde(default)]
    pub data_sources: BTreeMap<String, Schema>,
}

impl ProviderSchema {
    /// An empty provider schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the provider block schema.
    pub fn with_provider_config(mut self, schema: Schema) -> Self {
        self.provider = schema;
        self
    }

    /// Declare a resource.
    pub fn with_resource(mut self, name: impl Into<String>, schema: Schema) -> Self {
        self.resources.insert(name.into(), schema);
        self
    }

    /// Declare a data source.
    pub fn with_data_source(mut self, name: impl Into<String>, schema: Schema) -> Self {
        self.data_sources.insert(name.into(), schema);
        self
    }

    /// Look up a resource schema by type name.
    pub fn resource(&self, resource_type: &str) -> Option<&Schema> {
        self.resources.get(resource_type)
    }
}

/// Severity of a [`Diagnostic`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticSeverity {
    /// Blocks the operation.
    Error,
    /// Reported, but the operation goes ahead.
    Warning,
}

/// A problem found in configuration, tied to an attribute path when known.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Severity.
    pub severity: DiagnosticSeverity,
    /// One-line summary.
    pub summary: String,
    /// Longer explanation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// Dotted path of the offending attribute.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,
}

impl Diagnostic {
    fn with_severity(severity: DiagnosticSeverity, summary: impl Into<String>) -> Self {
        Self {
            severity,
            summary: summary.into(),
            detail: None,
            attribute: None,
        }
    }

    /// An error.
    pub fn error(summary: impl Into<String>) -> Self {
        Self::with_severity(DiagnosticSeverity::Error, summary)
    }

    /// A warning.
    pub fn warning(summary: impl Into<String>) -> Self {
        Self::with_severity(DiagnosticSeverity::Warning, summary)
    }

    /// Attach a longer explanation.
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Attach the attribute path.
    pub fn with_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.attribute = Some(attribute.into());
        self
    }
}
