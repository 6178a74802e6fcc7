//! Rust rendering of a [`GenerationPlan`].
//!
//! The generated module is self-contained: it declares the datum records and
//! the `TelemetrySink` trait its recording functions forward to.

use crate::error::TelemetryGenError;
use crate::model::Unit;
use crate::naming::{sanitize_enum_member, to_type_name, IdentifierScope};
use crate::plan::{ArgumentField, FieldType, GenerationPlan, ImplicitField, PlannedMetric};
use crate::types::Primitive;

const RUST_KEYWORDS: &[&str] = &[
    "as", "break", "const", "continue", "crate", "else", "enum", "extern", "false", "fn", "for",
    "if", "impl", "in", "let", "loop", "match", "mod", "move", "mut", "pub", "ref", "return",
    "self", "Self", "static", "struct", "super", "trait", "true", "type", "unsafe", "use", "where",
    "while", "async", "await", "dyn", "abstract", "become", "box", "do", "final", "macro",
    "override", "priv", "try", "typeof", "unsized", "virtual", "yield",
];

/// Prelude and std names the generated module refers to unqualified.
const RESERVED_TYPE_NAMES: &[&str] = &[
    "Option", "Some", "None", "String", "Vec", "Default", "ToString", "SystemTime", "fmt",
];

/// Support items declared by every generated module.
const SUPPORT_TYPES: &[&str] = &[
    "TelemetryType",
    "Unit",
    "MetadataEntry",
    "MetricDatum",
    "TelemetrySink",
];

const INDENT: &str = "    ";

struct RustNames {
    metric_types: Vec<String>,
    constrained_types: Vec<String>,
    /// Variant names per constrained type, parallel to its values.
    variants: Vec<Vec<String>>,
    /// Field names per metric, parallel to its fields.
    fields: Vec<Vec<String>>,
}

/// Renders the plan as a Rust module.
pub fn render_rust(plan: &GenerationPlan) -> Result<String, TelemetryGenError> {
    let names = claim_names(plan)?;

    let mut out = String::new();
    out.push_str("// Generated by telemetry-gen from the telemetry definitions schema.\n");
    out.push_str("// WARNING: This file is generated. Do not edit manually.\n");
    out.push('\n');
    out.push_str("use std::fmt;\n");
    out.push_str("use std::time::SystemTime;\n");
    out.push('\n');
    out.push_str(&render_support_types());
    out.push('\n');
    out.push_str(&render_event_enum(plan, &names));

    for (idx, constrained) in plan.constrained_types.iter().enumerate() {
        out.push('\n');
        out.push_str(&render_value_enum(
            &names.constrained_types[idx],
            &constrained.source,
            &constrained.values,
            &names.variants[idx],
        ));
    }

    for (idx, metric) in plan.metrics.iter().enumerate() {
        out.push('\n');
        out.push_str(&render_args_struct(metric, idx, &names));
        out.push('\n');
        out.push_str(&render_record_function(metric, idx, &names));
    }

    Ok(out)
}

fn claim_names(plan: &GenerationPlan) -> Result<RustNames, TelemetryGenError> {
    let mut types = IdentifierScope::new();
    for support in SUPPORT_TYPES {
        types.claim(support, "generated support type")?;
    }

    let mut metric_types = Vec::with_capacity(plan.metrics.len());
    let mut fields = Vec::with_capacity(plan.metrics.len());
    for metric in &plan.metrics {
        let name = sanitize_type_name(&metric.type_name);
        types.claim(&name, &format!("metric '{}'", metric.name))?;
        metric_types.push(name);

        let mut scope = IdentifierScope::new();
        let mut metric_fields = Vec::with_capacity(metric.fields.len());
        for field in &metric.fields {
            let name = sanitize_field_name(&field.ident);
            scope.claim(&name, &field.key)?;
            metric_fields.push(name);
        }
        fields.push(metric_fields);
    }

    let mut constrained_types = Vec::with_capacity(plan.constrained_types.len());
    let mut variants = Vec::with_capacity(plan.constrained_types.len());
    for constrained in &plan.constrained_types {
        let name = sanitize_type_name(&to_type_name(&constrained.ident));
        types.claim(&name, &format!("metadata '{}'", constrained.source))?;
        constrained_types.push(name);

        let mut scope = IdentifierScope::new();
        let mut enum_variants = Vec::with_capacity(constrained.values.len());
        for value in &constrained.values {
            let variant = sanitize_variant_name(value);
            scope.claim(&variant, value)?;
            enum_variants.push(variant);
        }
        variants.push(enum_variants);
    }

    Ok(RustNames {
        metric_types,
        constrained_types,
        variants,
        fields,
    })
}

fn render_support_types() -> String {
    let mut out = String::new();

    out.push_str("/// Units understood by the telemetry sink.\n");
    out.push_str("#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]\n");
    out.push_str("pub enum Unit {\n");
    for unit in Unit::ALL {
        out.push_str(&format!("{INDENT}{},\n", unit.sink_name()));
    }
    out.push_str("}\n\n");
    out.push_str("impl Unit {\n");
    out.push_str(&format!("{INDENT}pub fn as_str(self) -> &'static str {{\n"));
    out.push_str(&format!("{INDENT}{INDENT}match self {{\n"));
    for unit in Unit::ALL {
        out.push_str(&format!(
            "{INDENT}{INDENT}{INDENT}Unit::{0} => \"{0}\",\n",
            unit.sink_name()
        ));
    }
    out.push_str(&format!("{INDENT}{INDENT}}}\n{INDENT}}}\n}}\n\n"));

    out.push_str("/// One metadata key/value pair attached to a datum.\n");
    out.push_str("#[derive(Debug, Clone, PartialEq, Eq)]\n");
    out.push_str("pub struct MetadataEntry {\n");
    out.push_str(&format!("{INDENT}pub key: &'static str,\n"));
    out.push_str(&format!("{INDENT}pub value: String,\n"));
    out.push_str("}\n\n");

    out.push_str("/// A single recorded metric event.\n");
    out.push_str("#[derive(Debug, Clone, PartialEq)]\n");
    out.push_str("pub struct MetricDatum {\n");
    out.push_str(&format!("{INDENT}pub create_time: SystemTime,\n"));
    out.push_str(&format!("{INDENT}pub metric_name: TelemetryType,\n"));
    out.push_str(&format!("{INDENT}pub value: f64,\n"));
    out.push_str(&format!("{INDENT}pub unit: Unit,\n"));
    out.push_str(&format!("{INDENT}pub metadata: Vec<MetadataEntry>,\n"));
    out.push_str("}\n\n");

    out.push_str("/// Destination of recorded metric events.\n");
    out.push_str("pub trait TelemetrySink {\n");
    out.push_str(&format!("{INDENT}fn record(&self, datum: MetricDatum);\n"));
    out.push_str("}\n");
    out
}

fn render_event_enum(plan: &GenerationPlan, names: &RustNames) -> String {
    let pairs: Vec<(String, String)> = plan
        .metrics
        .iter()
        .zip(&names.metric_types)
        .map(|(metric, variant)| (variant.clone(), metric.name.clone()))
        .collect();

    let mut out = String::from("/// Names of every metric in the schema.\n");
    out.push_str(&render_str_enum("TelemetryType", &pairs));
    out
}

fn render_value_enum(name: &str, source: &str, values: &[String], variants: &[String]) -> String {
    let pairs: Vec<(String, String)> = variants
        .iter()
        .cloned()
        .zip(values.iter().cloned())
        .collect();

    let mut out = format!(
        "/// Allowed values of the `{}` metadata field.\n",
        comment_text(source)
    );
    out.push_str(&render_str_enum(name, &pairs));
    out
}

fn render_str_enum(name: &str, pairs: &[(String, String)]) -> String {
    let mut out = String::new();
    out.push_str("#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]\n");
    out.push_str(&format!("pub enum {name} {{\n"));
    for (variant, _) in pairs {
        out.push_str(&format!("{INDENT}{variant},\n"));
    }
    out.push_str("}\n\n");

    out.push_str(&format!("impl {name} {{\n"));
    out.push_str(&format!("{INDENT}pub fn as_str(self) -> &'static str {{\n"));
    out.push_str(&format!("{INDENT}{INDENT}match self {{\n"));
    for (variant, literal) in pairs {
        out.push_str(&format!(
            "{INDENT}{INDENT}{INDENT}{name}::{variant} => \"{}\",\n",
            escape_string(literal)
        ));
    }
    out.push_str(&format!("{INDENT}{INDENT}}}\n{INDENT}}}\n}}\n\n"));

    out.push_str(&format!("impl fmt::Display for {name} {{\n"));
    out.push_str(&format!(
        "{INDENT}fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {{\n"
    ));
    out.push_str(&format!("{INDENT}{INDENT}f.write_str(self.as_str())\n"));
    out.push_str(&format!("{INDENT}}}\n}}\n"));
    out
}

fn render_args_struct(metric: &PlannedMetric, idx: usize, names: &RustNames) -> String {
    let mut out = format!("/// Arguments for [`{}`].\n", function_name(metric));
    if metric.args_optional() {
        out.push_str("#[derive(Debug, Clone, Default, PartialEq)]\n");
    } else {
        out.push_str("#[derive(Debug, Clone, PartialEq)]\n");
    }
    out.push_str(&format!("pub struct {} {{\n", names.metric_types[idx]));

    for (field, field_name) in metric.fields.iter().zip(&names.fields[idx]) {
        if let Some(description) = &field.description {
            for line in description.lines() {
                out.push_str(&format!("{INDENT}/// {}\n", comment_text(line.trim_end())));
            }
        }
        let base = rust_type(field, names);
        let ty = if field.required {
            base
        } else {
            format!("Option<{base}>")
        };
        out.push_str(&format!("{INDENT}pub {field_name}: {ty},\n"));
    }

    out.push_str("}\n");
    out
}

fn render_record_function(metric: &PlannedMetric, idx: usize, names: &RustNames) -> String {
    let type_name = &names.metric_types[idx];
    let fields = &names.fields[idx];

    let mut out = String::new();
    match &metric.description {
        Some(description) => {
            for line in description.lines() {
                out.push_str(&format!("/// {}\n", comment_text(line.trim_end())));
            }
        }
        None => out.push_str(&format!("/// Records the `{}` metric.\n", metric.name)),
    }

    if metric.args_optional() {
        out.push_str(&format!(
            "pub fn {}(sink: &dyn TelemetrySink, args: Option<{type_name}>) {{\n",
            function_name(metric)
        ));
        out.push_str(&format!("{INDENT}let args = args.unwrap_or_default();\n"));
    } else {
        out.push_str(&format!(
            "pub fn {}(sink: &dyn TelemetrySink, args: {type_name}) {{\n",
            function_name(metric)
        ));
    }

    let body = format!("{INDENT}{INDENT}");
    out.push_str(&format!("{INDENT}sink.record(MetricDatum {{\n"));
    out.push_str(&format!(
        "{body}create_time: args.{}.unwrap_or_else(SystemTime::now),\n",
        implicit_field_name(metric, fields, ImplicitField::CreateTime)
    ));
    out.push_str(&format!("{body}metric_name: TelemetryType::{type_name},\n"));
    out.push_str(&format!(
        "{body}value: args.{}.unwrap_or(1.0),\n",
        implicit_field_name(metric, fields, ImplicitField::Value)
    ));
    out.push_str(&format!("{body}unit: Unit::{},\n", metric.unit.sink_name()));

    let entries: Vec<String> = metric
        .fields
        .iter()
        .zip(fields)
        .filter(|(field, _)| field.implicit.is_none())
        .map(|(field, name)| {
            let value = if field.required {
                format!("args.{name}.to_string()")
            } else {
                format!("args.{name}.as_ref().map(ToString::to_string).unwrap_or_default()")
            };
            format!(
                "MetadataEntry {{ key: \"{}\", value: {value} }}",
                escape_string(&field.key)
            )
        })
        .collect();

    if entries.is_empty() {
        out.push_str(&format!("{body}metadata: Vec::new(),\n"));
    } else {
        out.push_str(&format!("{body}metadata: vec![\n"));
        for entry in entries {
            out.push_str(&format!("{body}{INDENT}{entry},\n"));
        }
        out.push_str(&format!("{body}],\n"));
    }

    out.push_str(&format!("{INDENT}}});\n"));
    out.push_str("}\n");
    out
}

fn implicit_field_name<'a>(
    metric: &PlannedMetric,
    fields: &'a [String],
    implicit: ImplicitField,
) -> &'a str {
    metric
        .fields
        .iter()
        .position(|f| f.implicit == Some(implicit))
        .map(|pos| fields[pos].as_str())
        .unwrap_or_else(|| implicit.ident())
}

fn rust_type(field: &ArgumentField, names: &RustNames) -> String {
    match field.ty {
        FieldType::Constrained(idx) => names.constrained_types[idx].clone(),
        FieldType::Primitive(Primitive::String) => "String".to_string(),
        FieldType::Primitive(Primitive::Integer) => "i64".to_string(),
        FieldType::Primitive(Primitive::Double) => "f64".to_string(),
        FieldType::Primitive(Primitive::Boolean) => "bool".to_string(),
        FieldType::Timestamp => "SystemTime".to_string(),
    }
}

fn function_name(metric: &PlannedMetric) -> String {
    format!("record_{}", metric.name)
}

fn sanitize_type_name(raw: &str) -> String {
    let mut out = raw.to_string();
    if out.is_empty() {
        out = "Type".to_string();
    }

    if !starts_with_ident_char(&out) {
        out = format!("Type{out}");
    }

    if is_rust_keyword(&out) || RESERVED_TYPE_NAMES.contains(&out.as_str()) {
        out.push_str("Type");
    }

    out
}

fn sanitize_variant_name(raw: &str) -> String {
    let mut out = to_type_name(&sanitize_enum_member(raw));
    if out.is_empty() {
        out = "Variant".to_string();
    }

    if !starts_with_ident_char(&out) {
        out = format!("V{out}");
    }

    if is_rust_keyword(&out) {
        out.push_str("Value");
    }

    out
}

fn sanitize_field_name(raw: &str) -> String {
    let tokens = identifier_tokens(raw);
    let mut out = if tokens.is_empty() {
        "field".to_string()
    } else {
        tokens.join("_")
    };

    if out
        .chars()
        .next()
        .map(|c| c.is_ascii_digit())
        .unwrap_or(false)
    {
        out = format!("field_{out}");
    }

    if is_rust_keyword(&out) {
        out.push('_');
    }

    out
}

fn identifier_tokens(raw: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    for chunk in raw.split(|c: char| !c.is_ascii_alphanumeric()) {
        if chunk.is_empty() {
            continue;
        }
        tokens.extend(split_camel_tokens(chunk));
    }
    tokens
}

fn split_camel_tokens(chunk: &str) -> Vec<String> {
    let chars: Vec<char> = chunk.chars().collect();
    if chars.is_empty() {
        return Vec::new();
    }

    let mut tokens = Vec::new();
    let mut start = 0usize;

    for i in 1..chars.len() {
        let prev = chars[i - 1];
        let curr = chars[i];
        let next = chars.get(i + 1).copied();

        let boundary = (prev.is_ascii_lowercase() && curr.is_ascii_uppercase())
            || (prev.is_ascii_uppercase()
                && curr.is_ascii_uppercase()
                && next.map(|n| n.is_ascii_lowercase()).unwrap_or(false));

        if boundary {
            let token: String = chars[start..i].iter().collect();
            tokens.push(token.to_ascii_lowercase());
            start = i;
        }
    }

    let token: String = chars[start..].iter().collect();
    tokens.push(token.to_ascii_lowercase());

    tokens
}

fn starts_with_ident_char(text: &str) -> bool {
    text.chars()
        .next()
        .map(|c| c == '_' || c.is_ascii_alphabetic())
        .unwrap_or(false)
}

fn is_rust_keyword(text: &str) -> bool {
    RUST_KEYWORDS.iter().any(|kw| kw == &text)
}

/// Escapes text for a double-quoted string literal. Control and line
/// separator characters become `\n`-style or `\u{..}` escapes.
fn escape_string(raw: &str) -> String {
    raw.escape_debug().to_string()
}

/// Text that is safe inside a `//` comment line.
fn comment_text(raw: &str) -> String {
    raw.chars()
        .map(|c| {
            if c.is_control() || matches!(c, '\u{2028}' | '\u{2029}') {
                ' '
            } else {
                c
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{render_rust, sanitize_field_name, sanitize_variant_name};
    use crate::error::TelemetryGenError;
    use crate::model::{MetadataDefinition, ResolvedMetric, Unit};
    use crate::plan::build_plan;
    use crate::types::MetadataKind;

    fn def(name: &str, kind: MetadataKind, allowed: &[&str], required: bool) -> MetadataDefinition {
        MetadataDefinition {
            name: name.to_string(),
            kind,
            allowed_values: allowed.iter().map(|v| v.to_string()).collect(),
            required,
            description: None,
        }
    }

    fn render(metrics: Vec<ResolvedMetric>) -> Result<String, TelemetryGenError> {
        render_rust(&build_plan(&metrics)?)
    }

    #[test]
    fn renders_enums_structs_and_record_functions() {
        let rendered = render(vec![ResolvedMetric {
            name: "lambda_create".to_string(),
            unit: Unit::Count,
            description: Some("called when creating lambdas remotely".to_string()),
            metadata: vec![
                def("runtime", MetadataKind::Unspecified, &["nodejs12.x", "go1.x"], true),
                def("duration", MetadataKind::Double, &[], false),
            ],
        }])
        .unwrap();

        assert!(rendered.contains("pub enum TelemetryType {\n    LambdaCreate,\n}"));
        assert!(rendered.contains("TelemetryType::LambdaCreate => \"lambda_create\","));
        assert!(rendered.contains("pub enum Runtime {\n    Nodejs12x,\n    Go1x,\n}"));
        assert!(rendered.contains("Runtime::Nodejs12x => \"nodejs12.x\","));
        assert!(rendered.contains("pub struct LambdaCreate {\n    pub runtime: Runtime,\n    pub duration: Option<f64>,\n"));
        assert!(rendered.contains("    pub create_time: Option<SystemTime>,\n"));
        assert!(rendered.contains("    pub value: Option<f64>,\n"));
        assert!(rendered.contains("/// called when creating lambdas remotely\npub fn record_lambda_create(sink: &dyn TelemetrySink, args: LambdaCreate) {"));
        assert!(rendered.contains("create_time: args.create_time.unwrap_or_else(SystemTime::now),"));
        assert!(rendered.contains("value: args.value.unwrap_or(1.0),"));
        assert!(rendered.contains("unit: Unit::Count,"));
        assert!(rendered.contains("MetadataEntry { key: \"runtime\", value: args.runtime.to_string() },"));
        assert!(rendered.contains(
            "MetadataEntry { key: \"duration\", value: args.duration.as_ref().map(ToString::to_string).unwrap_or_default() },"
        ));
    }

    #[test]
    fn optional_arguments_use_default() {
        let rendered = render(vec![ResolvedMetric {
            name: "ping".to_string(),
            unit: Unit::None,
            description: None,
            metadata: Vec::new(),
        }])
        .unwrap();

        assert!(rendered.contains("#[derive(Debug, Clone, Default, PartialEq)]\npub struct Ping {"));
        assert!(rendered.contains("pub fn record_ping(sink: &dyn TelemetrySink, args: Option<Ping>) {"));
        assert!(rendered.contains("let args = args.unwrap_or_default();"));
        assert!(rendered.contains("metadata: Vec::new(),"));
    }

    #[test]
    fn reserved_names_are_suffixed() {
        let rendered = render(vec![ResolvedMetric {
            name: "option".to_string(),
            unit: Unit::None,
            description: None,
            metadata: vec![def("type", MetadataKind::Unspecified, &["self"], true)],
        }])
        .unwrap();

        assert!(rendered.contains("pub struct OptionType {"));
        assert!(rendered.contains("pub enum Type {\n    SelfValue,\n}"));
        assert!(rendered.contains("pub type_: Type,"));
    }

    #[test]
    fn variant_collisions_are_rejected() {
        let err = render(vec![ResolvedMetric {
            name: "lambda_create".to_string(),
            unit: Unit::None,
            description: None,
            metadata: vec![def(
                "runtime",
                MetadataKind::Unspecified,
                &["python3.8", "python38"],
                true,
            )],
        }])
        .unwrap_err();
        assert!(matches!(
            err,
            TelemetryGenError::DuplicateGeneratedIdentifier { ref identifier, .. } if identifier == "Python38"
        ));
    }

    #[test]
    fn support_type_names_cannot_be_reused() {
        let err = render(vec![ResolvedMetric {
            name: "unit".to_string(),
            unit: Unit::None,
            description: None,
            metadata: Vec::new(),
        }])
        .unwrap_err();
        assert!(matches!(err, TelemetryGenError::DuplicateGeneratedIdentifier { .. }));
    }

    #[test]
    fn control_characters_are_escaped_in_literals_and_comments() {
        let mut runtime = def("run\ntime", MetadataKind::Unspecified, &["a\nb", "c\rd", "e\u{2028}f"], true);
        runtime.description = Some("first\rsecond".to_string());
        let rendered = render(vec![ResolvedMetric {
            name: "lambda_create".to_string(),
            unit: Unit::None,
            description: None,
            metadata: vec![runtime],
        }])
        .unwrap();

        assert!(rendered.contains("Runtime::Ab => \"a\\nb\","));
        assert!(rendered.contains("Runtime::Cd => \"c\\rd\","));
        assert!(rendered.contains("Runtime::Ef => \"e\\u{2028}f\","));
        assert!(rendered.contains("MetadataEntry { key: \"run\\ntime\", value: args.runtime.to_string() },"));
        assert!(rendered.contains("/// Allowed values of the `run time` metadata field.\n"));
        assert!(rendered.contains("    /// first second\n"));
        assert!(!rendered.contains('\r'));
        assert!(!rendered.contains('\u{2028}'));
    }

    #[test]
    fn derives_field_and_variant_names() {
        assert_eq!(sanitize_field_name("createTime"), "create_time");
        assert_eq!(sanitize_field_name("lambdaruntime"), "lambdaruntime");
        assert_eq!(sanitize_field_name("awsregion"), "awsregion");
        assert_eq!(sanitize_variant_name("dotnetcore2.1"), "Dotnetcore21");
        assert_eq!(sanitize_variant_name("0"), "V0");
    }
}
