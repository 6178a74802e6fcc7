pub mod ast;
pub mod error;
pub mod jsonc;
pub mod loader;
pub mod model;
pub mod naming;
pub mod output;
pub mod plan;
pub mod pool;
pub mod resolve;
pub mod rust_codegen;
pub mod types;
pub mod typescript_codegen;
pub mod validate;

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use ast::SchemaDocument;
pub use error::{ParseDiagnostic, TelemetryGenError};
use model::MetricDefinition;
pub use output::WriteOutcome;
use plan::{build_plan, GenerationPlan};
use pool::MetadataPool;
use resolve::resolve_all;
pub use rust_codegen::render_rust;
pub use typescript_codegen::render_typescript;
use validate::validate_document;

/// Import line emitted for the default TypeScript sink.
pub const DEFAULT_SINK_IMPORT: &str = "import { ext } from '../extensionGlobals'";
/// Call expression the default TypeScript recording functions forward to.
pub const DEFAULT_SINK: &str = "ext.telemetry.record";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
/// Language of the generated artifact.
pub enum Target {
    #[default]
    TypeScript,
    Rust,
}

impl Target {
    pub fn as_str(self) -> &'static str {
        match self {
            Target::TypeScript => "typescript",
            Target::Rust => "rust",
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Target {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "typescript" | "ts" => Ok(Target::TypeScript),
            "rust" | "rs" => Ok(Target::Rust),
            other => Err(format!(
                "unknown target '{other}'; expected 'typescript' or 'rust'"
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Options of one generation run.
pub struct GeneratorConfig {
    pub target: Target,
    /// Call expression the TypeScript recording functions forward to.
    pub sink: String,
    /// Import line placed at the top of TypeScript output, if any.
    pub sink_import: Option<String>,
    /// Enforce strictly ascending metric names.
    pub require_sorted_metrics: bool,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            target: Target::default(),
            sink: DEFAULT_SINK.to_string(),
            sink_import: Some(DEFAULT_SINK_IMPORT.to_string()),
            require_sorted_metrics: false,
        }
    }
}

/// Generates the artifact text for a schema document given as JSONC text.
pub fn generate(input: &str, config: &GeneratorConfig) -> Result<String, TelemetryGenError> {
    let document = loader::load_str(input)?;
    generate_document(&document, config)
}

/// Generates the artifact text for the schema document at `schema`.
pub fn generate_from_path(
    schema: impl AsRef<Path>,
    config: &GeneratorConfig,
) -> Result<String, TelemetryGenError> {
    let document = loader::load(schema)?;
    generate_document(&document, config)
}

/// Generates the artifact text for an already loaded document.
pub fn generate_document(
    document: &SchemaDocument,
    config: &GeneratorConfig,
) -> Result<String, TelemetryGenError> {
    let plan = plan_document(document, config)?;
    let rendered = match config.target {
        Target::TypeScript => render_typescript(&plan, config)?,
        Target::Rust => render_rust(&plan)?,
    };
    log::debug!(
        "rendered {} target ({} bytes)",
        config.target,
        rendered.len()
    );
    Ok(rendered)
}

/// Runs every check and resolution stage, stopping before rendering.
pub fn plan_document(
    document: &SchemaDocument,
    config: &GeneratorConfig,
) -> Result<GenerationPlan, TelemetryGenError> {
    validate_document(document, config.require_sorted_metrics)?;

    let pool = MetadataPool::build(&document.metadata)?;
    let metrics = document
        .metrics
        .iter()
        .map(MetricDefinition::from_spec)
        .collect::<Result<Vec<_>, _>>()?;
    log::debug!(
        "loaded {} metric(s) against {} pooled metadata definition(s)",
        metrics.len(),
        document.metadata.len()
    );

    let resolved = resolve_all(&metrics, &pool)?;
    build_plan(&resolved)
}

/// Generates from `schema` and writes the artifact to `output`.
///
/// Nothing is written unless the whole run succeeds, and an artifact that
/// already holds the generated text is left untouched.
pub fn generate_to_file(
    schema: impl AsRef<Path>,
    output: impl AsRef<Path>,
    config: &GeneratorConfig,
) -> Result<WriteOutcome, TelemetryGenError> {
    let output = output.as_ref();
    let rendered = generate_from_path(schema, config)?;
    let outcome = output::write_if_changed(output, &rendered)?;
    match outcome {
        WriteOutcome::Written => log::info!("wrote '{}'", output.display()),
        WriteOutcome::Unchanged => log::info!("'{}' is up to date", output.display()),
    }
    Ok(outcome)
}

/// Fails with [`TelemetryGenError::OutOfDate`] unless `output` holds exactly
/// what `schema` generates.
pub fn check_up_to_date(
    schema: impl AsRef<Path>,
    output: impl AsRef<Path>,
    config: &GeneratorConfig,
) -> Result<(), TelemetryGenError> {
    let output = output.as_ref();
    let rendered = generate_from_path(schema, config)?;
    if output::read_existing(output)?.as_deref() != Some(rendered.as_str()) {
        return Err(TelemetryGenError::OutOfDate {
            path: output.to_path_buf(),
        });
    }
    Ok(())
}

/// Loads and checks the schema at `schema` without rendering anything.
pub fn validate_from_path(
    schema: impl AsRef<Path>,
    config: &GeneratorConfig,
) -> Result<GenerationPlan, TelemetryGenError> {
    let document = loader::load(schema)?;
    plan_document(&document, config)
}
