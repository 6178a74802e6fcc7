//! Validated in-memory model built from a [`SchemaDocument`](crate::ast::SchemaDocument).

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

use crate::ast::{MetadataRefSpec, MetadataSpec, MetricSpec};
use crate::error::TelemetryGenError;
use crate::types::MetadataKind;

/// Marks a metric metadata entry as a reference into the metadata pool.
pub const REFERENCE_SIGIL: char = '$';

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// Units understood by the telemetry sink.
pub enum Unit {
    None,
    Count,
    Milliseconds,
    Bytes,
    Percent,
}

impl Unit {
    pub const ALL: [Unit; 5] = [
        Unit::None,
        Unit::Count,
        Unit::Milliseconds,
        Unit::Bytes,
        Unit::Percent,
    ];

    /// Parses the schema spelling (`none`, `count`, ...). Case-insensitive.
    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|unit| unit.schema_name().eq_ignore_ascii_case(raw.trim()))
    }

    pub fn schema_name(self) -> &'static str {
        match self {
            Unit::None => "none",
            Unit::Count => "count",
            Unit::Milliseconds => "milliseconds",
            Unit::Bytes => "bytes",
            Unit::Percent => "percent",
        }
    }

    /// Spelling expected by the sink.
    pub fn sink_name(self) -> &'static str {
        match self {
            Unit::None => "None",
            Unit::Count => "Count",
            Unit::Milliseconds => "Milliseconds",
            Unit::Bytes => "Bytes",
            Unit::Percent => "Percent",
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.schema_name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// A metadata field definition with its kind parsed and allowed values
/// normalized (duplicates dropped, an empty list treated as absent).
pub struct MetadataDefinition {
    pub name: String,
    pub kind: MetadataKind,
    /// Allowed literal values in file order; empty means unconstrained.
    pub allowed_values: Vec<String>,
    pub required: bool,
    pub description: Option<String>,
}

impl MetadataDefinition {
    pub fn from_spec(spec: &MetadataSpec) -> Result<Self, TelemetryGenError> {
        let name = spec.name.trim();
        if name.is_empty() {
            return Err(TelemetryGenError::SchemaError(
                "metadata definitions must have a non-empty name".to_string(),
            ));
        }

        let kind = MetadataKind::parse(name, spec.kind.as_deref())?;

        let mut allowed_values: Vec<String> = Vec::new();
        for value in spec.allowed_values.iter().flatten() {
            if !allowed_values.contains(value) {
                allowed_values.push(value.clone());
            }
        }

        Ok(Self {
            name: name.to_string(),
            kind,
            allowed_values,
            required: spec.required,
            description: spec
                .description
                .as_deref()
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(str::to_string),
        })
    }

    /// Whether the field is restricted to a closed set of literals.
    pub fn is_constrained(&self) -> bool {
        !self.allowed_values.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// One unresolved element of a metric's metadata list.
pub enum MetadataRef {
    Inline(MetadataDefinition),
    /// Raw token as written, sigil included when present.
    Reference(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// A metric whose metadata list still holds pool references.
pub struct MetricDefinition {
    pub name: String,
    pub unit: Unit,
    pub description: Option<String>,
    pub metadata: Vec<MetadataRef>,
}

impl MetricDefinition {
    pub fn from_spec(spec: &MetricSpec) -> Result<Self, TelemetryGenError> {
        if !is_snake_case(&spec.name) {
            return Err(TelemetryGenError::InvalidMetricName {
                name: spec.name.clone(),
            });
        }

        let unit = Unit::parse(&spec.unit).ok_or_else(|| TelemetryGenError::UnsupportedUnit {
            metric: spec.name.clone(),
            unit: spec.unit.clone(),
        })?;

        let metadata = spec
            .metadata
            .iter()
            .map(|entry| match entry {
                MetadataRefSpec::Reference(token) => Ok(MetadataRef::Reference(token.clone())),
                MetadataRefSpec::Inline(inline) => {
                    MetadataDefinition::from_spec(inline).map(MetadataRef::Inline)
                }
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            name: spec.name.clone(),
            unit,
            description: spec
                .description
                .as_deref()
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(str::to_string),
            metadata,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// A metric with every metadata reference replaced by its definition.
pub struct ResolvedMetric {
    pub name: String,
    pub unit: Unit,
    pub description: Option<String>,
    /// Resolved metadata in declaration order.
    pub metadata: Vec<MetadataDefinition>,
}

fn is_snake_case(name: &str) -> bool {
    static SNAKE_CASE: OnceLock<Regex> = OnceLock::new();
    SNAKE_CASE
        .get_or_init(|| Regex::new(r"^[a-z][a-z0-9]*(_[a-z0-9]+)*$").expect("valid regex"))
        .is_match(name)
}
