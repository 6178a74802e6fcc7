//! Schema document loading: JSONC text to [`SchemaDocument`].

use std::fs;
use std::path::Path;

use serde_json::{Map as JsonMap, Value as JsonValue};

use crate::ast::{MetadataRefSpec, MetadataSpec, MetricSpec, SchemaDocument};
use crate::error::TelemetryGenError;
use crate::jsonc;

const METADATA_KEYS: [&str; 2] = ["metadata", "metadataTypes"];
const METRICS_KEY: &str = "metrics";

/// Reads and parses the schema document at `path`.
pub fn load(path: impl AsRef<Path>) -> Result<SchemaDocument, TelemetryGenError> {
    let path = path.as_ref();
    let input = fs::read_to_string(path).map_err(|source| TelemetryGenError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    log::debug!("loaded schema '{}' ({} bytes)", path.display(), input.len());
    load_str(&input)
}

/// Parses schema document text.
///
/// Syntax defects are reported all at once; a document with any defect is
/// never converted. Shape errors name the pool entry or metric they occur in.
pub fn load_str(input: &str) -> Result<SchemaDocument, TelemetryGenError> {
    let value = jsonc::parse(input).map_err(TelemetryGenError::SchemaParseError)?;

    let JsonValue::Object(mut root) = value else {
        return Err(schema_error(
            "schema document must be a JSON object with 'metadata' and 'metrics'",
        ));
    };

    let metadata = take_metadata_section(&mut root)?;
    let metrics = take_array(&mut root, METRICS_KEY, METRICS_KEY)?;
    if let Some(unknown) = root.keys().next() {
        return Err(schema_error(format!(
            "unknown top-level field '{unknown}'; expected 'metadata' or 'metrics'"
        )));
    }

    let metadata = metadata
        .into_iter()
        .enumerate()
        .map(|(idx, entry)| {
            let context = entry_context("metadata", &entry, &format!("metadata[{idx}]"));
            convert_metadata(entry, &context)
        })
        .collect::<Result<Vec<_>, _>>()?;

    let metrics = metrics
        .into_iter()
        .enumerate()
        .map(|(idx, entry)| convert_metric(entry, idx))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(SchemaDocument { metadata, metrics })
}

fn take_metadata_section(
    root: &mut JsonMap<String, JsonValue>,
) -> Result<Vec<JsonValue>, TelemetryGenError> {
    let present: Vec<&str> = METADATA_KEYS
        .into_iter()
        .filter(|key| root.contains_key(*key))
        .collect();
    match present.as_slice() {
        [] => Ok(Vec::new()),
        [key] => take_array(root, key, key),
        _ => Err(schema_error(
            "'metadata' and 'metadataTypes' are the same section; use only 'metadata'",
        )),
    }
}

fn take_array(
    object: &mut JsonMap<String, JsonValue>,
    key: &str,
    context: &str,
) -> Result<Vec<JsonValue>, TelemetryGenError> {
    match object.remove(key) {
        None => Ok(Vec::new()),
        Some(JsonValue::Array(items)) => Ok(items),
        Some(other) => Err(schema_error(format!(
            "{context}: expected an array, found {}",
            json_kind(&other)
        ))),
    }
}

fn convert_metadata(entry: JsonValue, context: &str) -> Result<MetadataSpec, TelemetryGenError> {
    if !entry.is_object() {
        return Err(schema_error(format!(
            "{context}: expected a metadata definition object, found {}",
            json_kind(&entry)
        )));
    }
    serde_json::from_value(entry).map_err(|e| schema_error(format!("{context}: {e}")))
}

fn convert_metric(entry: JsonValue, idx: usize) -> Result<MetricSpec, TelemetryGenError> {
    let context = entry_context("metric", &entry, &format!("metrics[{idx}]"));
    let mut object = match entry {
        JsonValue::Object(object) => object,
        other => {
            return Err(schema_error(format!(
                "{context}: expected a metric object, found {}",
                json_kind(&other)
            )))
        }
    };

    let raw_metadata = take_array(&mut object, "metadata", &format!("{context} metadata"))?;
    let mut metric: MetricSpec = serde_json::from_value(JsonValue::Object(object))
        .map_err(|e| schema_error(format!("{context}: {e}")))?;

    metric.metadata = raw_metadata
        .into_iter()
        .enumerate()
        .map(|(pos, item)| {
            let item_context = format!("{context} metadata[{pos}]");
            match item {
                JsonValue::String(token) => Ok(MetadataRefSpec::Reference(token)),
                other => convert_metadata(other, &item_context).map(MetadataRefSpec::Inline),
            }
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(metric)
}

/// `metric 'lambda_delete' (metrics[0])`, or just the path when the entry
/// has no usable name.
fn entry_context(what: &str, entry: &JsonValue, path: &str) -> String {
    match entry.get("name").and_then(JsonValue::as_str) {
        Some(name) => format!("{what} '{name}' ({path})"),
        None => path.to_string(),
    }
}

fn json_kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "a boolean",
        JsonValue::Number(_) => "a number",
        JsonValue::String(_) => "a string",
        JsonValue::Array(_) => "an array",
        JsonValue::Object(_) => "an object",
    }
}

fn schema_error(message: impl Into<String>) -> TelemetryGenError {
    TelemetryGenError::SchemaError(message.into())
}
