//! Typed schema document produced by the loader.
//!
//! These types mirror the JSONC input one to one. They are not validated
//! beyond their shape; the pool, resolver and validator stages enforce the
//! semantic rules.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
/// Root of a telemetry definitions document.
pub struct SchemaDocument {
    /// Reusable metadata field definitions (the pool).
    #[serde(default, alias = "metadataTypes")]
    pub metadata: Vec<MetadataSpec>,
    /// Metric definitions in file order.
    #[serde(default)]
    pub metrics: Vec<MetricSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
/// A metadata field definition, either in the pool or inline in a metric.
pub struct MetadataSpec {
    /// Field name; also the key sent to the telemetry sink.
    pub name: String,
    /// Declared primitive kind (`string`, `int`, `double`, `boolean`).
    #[serde(default, alias = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Closed set of allowed literal values.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_values: Option<Vec<String>>,
    /// Whether callers must always supply this field.
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
/// A metric definition as written in the schema.
pub struct MetricSpec {
    /// snake_case event name.
    pub name: String,
    /// Unit name from the supported vocabulary.
    #[serde(alias = "type")]
    pub unit: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Inline definitions and sigil-prefixed pool references, in order.
    #[serde(default)]
    pub metadata: Vec<MetadataRefSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
/// One element of a metric's `metadata` list.
pub enum MetadataRefSpec {
    /// A reference token such as `$result`.
    Reference(String),
    /// A definition written directly in the metric.
    Inline(MetadataSpec),
}
