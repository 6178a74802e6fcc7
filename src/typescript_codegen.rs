//! TypeScript rendering of a [`GenerationPlan`].

use crate::error::TelemetryGenError;
use crate::naming::IdentifierScope;
use crate::plan::{ArgumentField, FieldType, GenerationPlan, ImplicitField, PlannedMetric};
use crate::types::Primitive;
use crate::GeneratorConfig;

const TYPESCRIPT_KEYWORDS: &[&str] = &[
    "break",
    "case",
    "catch",
    "class",
    "const",
    "continue",
    "debugger",
    "default",
    "delete",
    "do",
    "else",
    "enum",
    "export",
    "extends",
    "false",
    "finally",
    "for",
    "function",
    "if",
    "import",
    "in",
    "instanceof",
    "new",
    "null",
    "return",
    "super",
    "switch",
    "this",
    "throw",
    "true",
    "try",
    "typeof",
    "var",
    "void",
    "while",
    "with",
    "as",
    "implements",
    "interface",
    "let",
    "package",
    "private",
    "protected",
    "public",
    "static",
    "yield",
    "any",
    "boolean",
    "constructor",
    "declare",
    "get",
    "module",
    "require",
    "number",
    "set",
    "string",
    "symbol",
    "type",
    "from",
    "of",
    "readonly",
    "keyof",
    "namespace",
    "abstract",
    "never",
    "object",
    "unknown",
    "bigint",
    "override",
];

/// Global types a generated declaration must not shadow.
const RESERVED_TYPE_NAMES: &[&str] = &[
    "Array", "Boolean", "Date", "Error", "Function", "Map", "Number", "Object", "Partial",
    "Promise", "Record", "RegExp", "Set", "String", "Symbol",
];

const EVENT_ENUM: &str = "TelemetryType";
const INDENT: &str = "    ";

/// Renders the plan as a TypeScript module.
pub fn render_typescript(
    plan: &GenerationPlan,
    config: &GeneratorConfig,
) -> Result<String, TelemetryGenError> {
    let names = claim_type_names(plan)?;

    let mut out = String::new();
    out.push_str("/*!\n");
    out.push_str(" * Generated by telemetry-gen from the telemetry definitions schema.\n");
    out.push_str(" * WARNING: This file is generated. Do not edit manually.\n");
    out.push_str(" */\n");

    if let Some(import) = config.sink_import.as_deref() {
        out.push('\n');
        out.push_str(import.trim_end());
        out.push('\n');
    }

    out.push('\n');
    out.push_str(&render_event_enum(plan));

    for (constrained, ts_name) in plan.constrained_types.iter().zip(&names.constrained_types) {
        let members: Vec<String> = constrained
            .values
            .iter()
            .map(|v| format!("'{}'", escape_string(v)))
            .collect();
        out.push('\n');
        out.push_str(&format!("export type {ts_name} = {}\n", members.join(" | ")));
    }

    for (metric, interface) in plan.metrics.iter().zip(&names.interfaces) {
        out.push('\n');
        out.push_str(&render_interface(metric, interface, &names.constrained_types));
        out.push('\n');
        out.push_str(&render_record_function(metric, interface, config));
    }

    Ok(out)
}

struct TypeNames {
    /// Interface name per metric.
    interfaces: Vec<String>,
    /// Union type name per constrained type.
    constrained_types: Vec<String>,
}

fn claim_type_names(plan: &GenerationPlan) -> Result<TypeNames, TelemetryGenError> {
    let mut scope = IdentifierScope::new();
    scope.claim(EVENT_ENUM, "event-name enumeration")?;

    let mut interfaces = Vec::with_capacity(plan.metrics.len());
    for metric in &plan.metrics {
        let name = sanitize_type_name(&metric.type_name);
        scope.claim(&name, &format!("metric '{}'", metric.name))?;
        interfaces.push(name);
    }

    let mut constrained_types = Vec::with_capacity(plan.constrained_types.len());
    for constrained in &plan.constrained_types {
        let name = sanitize_type_name(&constrained.ident);
        scope.claim(&name, &format!("metadata '{}'", constrained.source))?;
        constrained_types.push(name);
    }

    Ok(TypeNames {
        interfaces,
        constrained_types,
    })
}

fn sanitize_type_name(raw: &str) -> String {
    let mut name = raw.to_string();
    if is_typescript_keyword(&name) || RESERVED_TYPE_NAMES.contains(&name.as_str()) {
        name.push_str("Type");
    }
    name
}

fn render_event_enum(plan: &GenerationPlan) -> String {
    let mut out = format!("export enum {EVENT_ENUM} {{\n");
    for metric in &plan.metrics {
        out.push_str(&format!(
            "{INDENT}{} = '{}',\n",
            metric.constant_name,
            escape_string(&metric.name)
        ));
    }
    out.push_str("}\n");
    out
}

fn render_interface(metric: &PlannedMetric, interface: &str, type_names: &[String]) -> String {
    let mut out = format!("export interface {interface} {{\n");
    for field in &metric.fields {
        if let Some(description) = &field.description {
            for line in description.lines() {
                out.push_str(&format!("{INDENT}// {}\n", escape_comment(line.trim_end())));
            }
        }
        let optional = if field.required { "" } else { "?" };
        out.push_str(&format!(
            "{INDENT}{}{optional}: {}\n",
            field.ident,
            ts_type(field, type_names)
        ));
    }
    out.push_str("}\n");
    out
}

fn ts_type(field: &ArgumentField, type_names: &[String]) -> String {
    match field.ty {
        FieldType::Constrained(idx) => type_names[idx].clone(),
        FieldType::Primitive(Primitive::String) => "string".to_string(),
        FieldType::Primitive(Primitive::Integer | Primitive::Double) => "number".to_string(),
        FieldType::Primitive(Primitive::Boolean) => "boolean".to_string(),
        FieldType::Timestamp => "Date".to_string(),
    }
}

fn render_record_function(
    metric: &PlannedMetric,
    interface: &str,
    config: &GeneratorConfig,
) -> String {
    let create_time = ImplicitField::CreateTime.ident();
    let value = ImplicitField::Value.ident();
    let args = if metric.args_optional() { "args?" } else { "args" };

    let mut out = String::from("/**\n");
    match &metric.description {
        Some(description) => {
            for line in description.lines() {
                out.push_str(&format!(" * {}\n", escape_comment(line.trim_end())));
            }
        }
        None => out.push_str(&format!(" * Records the '{}' metric\n", metric.name)),
    }
    out.push_str(&format!(" * @param args See the {interface} interface\n"));
    out.push_str(" * @returns Nothing\n");
    out.push_str(" */\n");

    out.push_str(&format!(
        "export function {}({args}: {interface}) {{\n",
        metric.function_name
    ));
    out.push_str(&format!("{INDENT}{}({{\n", config.sink));
    out.push_str(&format!(
        "{INDENT}{INDENT}{create_time}: args?.{create_time} ?? new Date(),\n"
    ));
    out.push_str(&format!("{INDENT}{INDENT}data: [\n"));
    out.push_str(&format!("{INDENT}{INDENT}{INDENT}{{\n"));

    let body = format!("{INDENT}{INDENT}{INDENT}{INDENT}");
    out.push_str(&format!(
        "{body}MetricName: {EVENT_ENUM}.{},\n",
        metric.constant_name
    ));
    out.push_str(&format!("{body}Value: args?.{value} ?? 1,\n"));
    out.push_str(&format!("{body}Unit: '{}',\n", metric.unit.sink_name()));

    let entries: Vec<String> = metric
        .metadata_fields()
        .map(|field| {
            format!(
                "{{ Key: '{}', Value: args?.{}?.toString() ?? '' }}",
                escape_string(&field.key),
                field.ident
            )
        })
        .collect();
    if entries.is_empty() {
        out.push_str(&format!("{body}Metadata: [],\n"));
    } else {
        out.push_str(&format!("{body}Metadata: [\n"));
        for entry in entries {
            out.push_str(&format!("{body}{INDENT}{entry},\n"));
        }
        out.push_str(&format!("{body}],\n"));
    }

    out.push_str(&format!("{INDENT}{INDENT}{INDENT}}},\n"));
    out.push_str(&format!("{INDENT}{INDENT}],\n"));
    out.push_str(&format!("{INDENT}}})\n"));
    out.push_str("}\n");
    out
}

fn is_typescript_keyword(text: &str) -> bool {
    TYPESCRIPT_KEYWORDS.iter().any(|kw| kw == &text)
}

/// Escapes text for a single-quoted string literal. Control and line
/// separator characters become `\n`-style or `\uXXXX` escapes.
fn escape_string(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if is_line_breaking(c) => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out
}

/// Text that is safe inside a `//` or `/** */` comment line.
fn escape_comment(raw: &str) -> String {
    raw.chars()
        .map(|c| if is_line_breaking(c) { ' ' } else { c })
        .collect::<String>()
        .replace("*/", "*\\/")
}

fn is_line_breaking(c: char) -> bool {
    c.is_control() || matches!(c, '\u{2028}' | '\u{2029}')
}

#[cfg(test)]
mod tests {
    use super::render_typescript;
    use crate::model::{MetadataDefinition, ResolvedMetric, Unit};
    use crate::plan::build_plan;
    use crate::types::MetadataKind;
    use crate::GeneratorConfig;

    fn def(name: &str, kind: MetadataKind, allowed: &[&str], required: bool) -> MetadataDefinition {
        MetadataDefinition {
            name: name.to_string(),
            kind,
            allowed_values: allowed.iter().map(|v| v.to_string()).collect(),
            required,
            description: None,
        }
    }

    fn render(metrics: Vec<ResolvedMetric>) -> String {
        let plan = build_plan(&metrics).unwrap();
        render_typescript(&plan, &GeneratorConfig::default()).unwrap()
    }

    #[test]
    fn renders_union_interface_and_record_function() {
        let rendered = render(vec![ResolvedMetric {
            name: "lambda_delete".to_string(),
            unit: Unit::None,
            description: Some("called when deleting lambdas remotely".to_string()),
            metadata: vec![def(
                "result",
                MetadataKind::Unspecified,
                &["succeeded", "failed", "cancelled"],
                true,
            )],
        }]);

        assert!(rendered.contains("import { ext } from '../extensionGlobals'\n"));
        assert!(rendered.contains("export enum TelemetryType {\n    LAMBDA_DELETE = 'lambda_delete',\n}"));
        assert!(rendered.contains("export type result = 'succeeded' | 'failed' | 'cancelled'\n"));
        assert!(rendered.contains("export interface LambdaDelete {\n    result: result\n"));
        assert!(rendered.contains("    createTime?: Date\n"));
        assert!(rendered.contains("    value?: number\n"));
        assert!(rendered.contains(" * called when deleting lambdas remotely\n"));
        assert!(rendered.contains("export function recordLambdaDelete(args: LambdaDelete) {"));
        assert!(rendered.contains("ext.telemetry.record({"));
        assert!(rendered.contains("createTime: args?.createTime ?? new Date(),"));
        assert!(rendered.contains("MetricName: TelemetryType.LAMBDA_DELETE,"));
        assert!(rendered.contains("Value: args?.value ?? 1,"));
        assert!(rendered.contains("Unit: 'None',"));
        assert!(rendered.contains("{ Key: 'result', Value: args?.result?.toString() ?? '' },"));
    }

    #[test]
    fn optional_only_metrics_take_optional_arguments() {
        let rendered = render(vec![ResolvedMetric {
            name: "session_start".to_string(),
            unit: Unit::Count,
            description: None,
            metadata: vec![def("retried", MetadataKind::Boolean, &[], false)],
        }]);

        assert!(rendered.contains("export function recordSessionStart(args?: SessionStart) {"));
        assert!(rendered.contains("    retried?: boolean\n"));
        assert!(rendered.contains(" * Records the 'session_start' metric\n"));
        assert!(rendered.contains("Unit: 'Count',"));
    }

    #[test]
    fn keyword_type_names_are_suffixed_and_sink_is_configurable() {
        let metrics = vec![ResolvedMetric {
            name: "a_metric".to_string(),
            unit: Unit::None,
            description: None,
            metadata: vec![def("string", MetadataKind::Unspecified, &["x"], true)],
        }];
        let plan = build_plan(&metrics).unwrap();
        let config = GeneratorConfig {
            sink: "telemetry.emit".to_string(),
            sink_import: None,
            ..GeneratorConfig::default()
        };
        let rendered = render_typescript(&plan, &config).unwrap();

        assert!(rendered.contains("export type stringType = 'x'\n"));
        assert!(rendered.contains("    string: stringType\n"));
        assert!(rendered.contains("    telemetry.emit({\n"));
        assert!(!rendered.contains("import "));
        assert!(rendered.contains("Metadata: [\n"));
    }

    #[test]
    fn metrics_without_metadata_emit_empty_metadata_list() {
        let rendered = render(vec![ResolvedMetric {
            name: "ping".to_string(),
            unit: Unit::None,
            description: None,
            metadata: Vec::new(),
        }]);
        assert!(rendered.contains("Metadata: [],"));
        assert!(rendered.contains("export function recordPing(args?: Ping) {"));
    }

    #[test]
    fn control_characters_are_escaped_in_literals_and_comments() {
        let mut result = def("re\nsult", MetadataKind::Unspecified, &["a\nb", "c\rd", "e\u{2028}f"], true);
        result.description = Some("first\rsecond */ end".to_string());
        let rendered = render(vec![ResolvedMetric {
            name: "lambda_delete".to_string(),
            unit: Unit::None,
            description: Some("deletes\u{2029}remotely".to_string()),
            metadata: vec![result],
        }]);

        assert!(rendered.contains("export type result = 'a\\nb' | 'c\\rd' | 'e\\u2028f'\n"));
        assert!(rendered.contains("{ Key: 're\\nsult', Value: args?.result?.toString() ?? '' },"));
        assert!(rendered.contains("    // first second *\\/ end\n"));
        assert!(rendered.contains(" * deletes remotely\n"));
        assert!(!rendered.contains('\r'));
        assert!(!rendered.contains('\u{2028}'));
        assert!(!rendered.contains('\u{2029}'));
    }

    #[test]
    fn global_type_names_are_not_shadowed() {
        let rendered = render(vec![ResolvedMetric {
            name: "date".to_string(),
            unit: Unit::None,
            description: None,
            metadata: vec![def("Map", MetadataKind::Unspecified, &["x"], true)],
        }]);

        assert!(rendered.contains("export type MapType = 'x'\n"));
        assert!(rendered.contains("export interface DateType {\n    Map: MapType\n"));
        assert!(rendered.contains("export function recordDate(args: DateType) {"));
        assert!(rendered.contains(" * @param args See the DateType interface\n"));
        assert!(rendered.contains("    createTime?: Date\n"));
        assert!(!rendered.contains("export type Date "));
    }

    #[test]
    fn escapes_quotes_in_literals() {
        let rendered = render(vec![ResolvedMetric {
            name: "a_metric".to_string(),
            unit: Unit::None,
            description: None,
            metadata: vec![def("quote", MetadataKind::Unspecified, &["it's"], true)],
        }]);
        assert!(rendered.contains("export type quote = 'it\\'s'\n"));
    }
}
