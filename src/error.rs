//! Error definitions for all `telemetry_gen` generation stages.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
/// Top-level error type returned by public APIs.
///
/// Every variant is fatal to a generation run: no artifact is written when
/// any of them is returned.
pub enum TelemetryGenError {
    /// The schema document is not valid JSON-with-comments.
    #[error("schema parse error: {}", ParseDiagnostics(.0))]
    SchemaParseError(Vec<ParseDiagnostic>),
    /// The document parsed but does not have the expected shape.
    #[error("schema error: {0}")]
    SchemaError(String),
    /// Two pool entries share a name.
    #[error("duplicate metadata name '{name}' in metadata pool")]
    DuplicateMetadataName { name: String },
    /// A metadata reference token does not start with the reference sigil.
    #[error(
        "malformed metadata reference '{token}' in metric '{metric}': references must start with '{sigil}'"
    )]
    MalformedReference {
        metric: String,
        token: String,
        sigil: char,
    },
    /// A metadata reference names no pool entry.
    #[error("metric '{metric}' references unknown metadata '{reference}'")]
    UnknownMetadataReference { metric: String, reference: String },
    /// A metadata definition declares a kind the generator cannot type.
    #[error("metadata '{metadata}' has unsupported kind '{kind}'")]
    UnsupportedMetadataKind { metadata: String, kind: String },
    /// A metric declares a unit outside the supported vocabulary.
    #[error("metric '{metric}' has unsupported unit '{unit}'")]
    UnsupportedUnit { metric: String, unit: String },
    /// A metric name is not snake_case.
    #[error("metric name '{name}' is not snake_case")]
    InvalidMetricName { name: String },
    /// Two schema entries map onto the same generated identifier.
    #[error("generated identifier '{identifier}' is produced by both '{first}' and '{second}'")]
    DuplicateGeneratedIdentifier {
        identifier: String,
        first: String,
        second: String,
    },
    /// Metrics are not in strictly ascending order by name.
    #[error("metrics are not in alphabetical order: '{previous}' must come after '{next}'")]
    OrderingViolation { previous: String, next: String },
    /// The schema file could not be read.
    #[error("failed to read '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The artifact could not be written.
    #[error("failed to write '{}': {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The artifact on disk differs from what the schema generates.
    #[error("'{}' is out of date; regenerate it from the schema", path.display())]
    OutOfDate { path: PathBuf },
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// A single syntax defect found while parsing a schema document.
pub struct ParseDiagnostic {
    /// 1-based line of the defect.
    pub line: usize,
    /// 1-based column of the defect.
    pub column: usize,
    /// Human-readable description.
    pub message: String,
}

impl fmt::Display for ParseDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: {}", self.line, self.column, self.message)
    }
}

struct ParseDiagnostics<'a>(&'a [ParseDiagnostic]);

impl fmt::Display for ParseDiagnostics<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} defect(s)", self.0.len())?;
        for diagnostic in self.0 {
            write!(f, "\n  {diagnostic}")?;
        }
        Ok(())
    }
}
