//! Target-neutral emission plan.
//!
//! The plan fixes everything the output targets share: emission order,
//! derived identifiers, the deduplicated list of constrained types and each
//! metric's argument fields (metadata fields followed by the implicit
//! timestamp and value overrides). Targets only decide spelling.

use std::collections::HashMap;

use crate::error::TelemetryGenError;
use crate::model::{MetadataDefinition, ResolvedMetric, Unit};
use crate::naming::{
    sanitize_enum_member, to_constant_name, to_function_name, to_type_name, IdentifierScope,
};
use crate::types::{derive_type, Primitive, TypeExpr};

#[derive(Debug, Clone, PartialEq, Eq)]
/// Everything a target needs to render one artifact.
pub struct GenerationPlan {
    /// Metrics in input order.
    pub metrics: Vec<PlannedMetric>,
    /// Constrained metadata types in first-encounter order, each once.
    pub constrained_types: Vec<ConstrainedType>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// A closed literal set shared by every field that uses it.
pub struct ConstrainedType {
    /// Metadata name the type was derived from.
    pub source: String,
    /// Sanitized identifier of the metadata name.
    pub ident: String,
    /// Allowed literals in file order.
    pub values: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedMetric {
    /// Wire event name.
    pub name: String,
    /// PascalCase identifier (`LambdaDelete`).
    pub type_name: String,
    /// Recording function name (`recordLambdaDelete`).
    pub function_name: String,
    /// Event-name enumeration member (`LAMBDA_DELETE`).
    pub constant_name: String,
    pub unit: Unit,
    pub description: Option<String>,
    /// Metadata fields in declaration order, then the implicit fields.
    pub fields: Vec<ArgumentField>,
}

impl PlannedMetric {
    /// Fields that are forwarded to the sink as metadata pairs.
    pub fn metadata_fields(&self) -> impl Iterator<Item = &ArgumentField> {
        self.fields.iter().filter(|f| f.implicit.is_none())
    }

    /// Whether callers may omit the argument object entirely.
    pub fn args_optional(&self) -> bool {
        self.metadata_fields().all(|f| !f.required)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    /// Index into [`GenerationPlan::constrained_types`].
    Constrained(usize),
    Primitive(Primitive),
    Timestamp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Fields every argument shape gains on top of its metadata.
pub enum ImplicitField {
    /// Explicit event time; defaults to the time of the call.
    CreateTime,
    /// Metric value; defaults to 1.
    Value,
}

/// Implicit fields, appended to every metric in this order.
pub const IMPLICIT_FIELDS: [ImplicitField; 2] = [ImplicitField::CreateTime, ImplicitField::Value];

impl ImplicitField {
    pub fn ident(self) -> &'static str {
        match self {
            ImplicitField::CreateTime => "createTime",
            ImplicitField::Value => "value",
        }
    }

    fn field(self) -> ArgumentField {
        let (ty, description) = match self {
            ImplicitField::CreateTime => (FieldType::Timestamp, "The time that the event took place"),
            ImplicitField::Value => (
                FieldType::Primitive(Primitive::Double),
                "Value based on unit and call type",
            ),
        };
        ArgumentField {
            key: self.ident().to_string(),
            ident: self.ident().to_string(),
            ty,
            required: false,
            description: Some(description.to_string()),
            implicit: Some(self),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// One field of a generated argument shape.
pub struct ArgumentField {
    /// Metadata key sent to the sink (the name as written in the schema).
    pub key: String,
    /// Sanitized identifier.
    pub ident: String,
    pub ty: FieldType,
    pub required: bool,
    pub description: Option<String>,
    pub implicit: Option<ImplicitField>,
}

/// Builds the emission plan, rejecting any identifier collision.
pub fn build_plan(metrics: &[ResolvedMetric]) -> Result<GenerationPlan, TelemetryGenError> {
    let mut metric_names = IdentifierScope::case_insensitive();
    let mut field_idents = IdentifierScope::new();
    let mut constrained_types: Vec<ConstrainedType> = Vec::new();
    let mut constrained_index: HashMap<String, usize> = HashMap::new();
    let mut planned = Vec::with_capacity(metrics.len());

    for metric in metrics {
        let type_name = to_type_name(&metric.name);
        if planned.iter().any(|m: &PlannedMetric| m.name == metric.name) {
            return Err(TelemetryGenError::DuplicateGeneratedIdentifier {
                identifier: type_name,
                first: metric.name.clone(),
                second: format!("{} (defined twice)", metric.name),
            });
        }
        metric_names.claim(&type_name, &metric.name)?;

        let mut local = IdentifierScope::new();
        for implicit in IMPLICIT_FIELDS {
            local.claim(implicit.ident(), &format!("implicit field '{}'", implicit.ident()))?;
        }

        let mut fields = Vec::with_capacity(metric.metadata.len() + IMPLICIT_FIELDS.len());
        for def in &metric.metadata {
            let ident = sanitize_enum_member(&def.name);
            field_idents.claim(&ident, &def.name)?;
            local.claim(&ident, &def.name)?;
            if fields.iter().any(|f: &ArgumentField| f.ident == ident) {
                return Err(TelemetryGenError::DuplicateGeneratedIdentifier {
                    identifier: ident,
                    first: def.name.clone(),
                    second: format!("{} (repeated in metric '{}')", def.name, metric.name),
                });
            }

            let ty = match derive_type(def) {
                TypeExpr::Primitive(p) => FieldType::Primitive(p),
                TypeExpr::LiteralUnion(values) => FieldType::Constrained(intern_constrained(
                    &mut constrained_types,
                    &mut constrained_index,
                    &metric.name,
                    def,
                    &ident,
                    values,
                )?),
            };

            fields.push(ArgumentField {
                key: def.name.clone(),
                ident,
                ty,
                required: def.required,
                description: def.description.clone(),
                implicit: None,
            });
        }
        fields.extend(IMPLICIT_FIELDS.into_iter().map(ImplicitField::field));

        planned.push(PlannedMetric {
            name: metric.name.clone(),
            function_name: to_function_name(&metric.name),
            constant_name: to_constant_name(&metric.name),
            type_name,
            unit: metric.unit,
            description: metric.description.clone(),
            fields,
        });
    }

    log::debug!(
        "planned {} metric(s) and {} constrained type(s)",
        planned.len(),
        constrained_types.len()
    );

    Ok(GenerationPlan {
        metrics: planned,
        constrained_types,
    })
}

fn intern_constrained(
    types: &mut Vec<ConstrainedType>,
    index: &mut HashMap<String, usize>,
    metric: &str,
    def: &MetadataDefinition,
    ident: &str,
    values: Vec<String>,
) -> Result<usize, TelemetryGenError> {
    if let Some(&idx) = index.get(ident) {
        let existing = &types[idx];
        if existing.values != values {
            return Err(TelemetryGenError::DuplicateGeneratedIdentifier {
                identifier: ident.to_string(),
                first: existing.source.clone(),
                second: format!("{} (redefined in metric '{metric}')", def.name),
            });
        }
        return Ok(idx);
    }

    index.insert(ident.to_string(), types.len());
    types.push(ConstrainedType {
        source: def.name.clone(),
        ident: ident.to_string(),
        values,
    });
    Ok(types.len() - 1)
}
