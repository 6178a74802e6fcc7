//! Type derivation for metadata fields.

use crate::error::TelemetryGenError;
use crate::model::MetadataDefinition;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// Declared primitive kind of a metadata field.
pub enum MetadataKind {
    /// No kind given; typed as a string.
    Unspecified,
    String,
    Integer,
    Double,
    Boolean,
}

impl MetadataKind {
    /// Parses a schema kind name for the metadata field `metadata`.
    ///
    /// Unknown names are an error rather than a silent string fallback.
    pub fn parse(metadata: &str, raw: Option<&str>) -> Result<Self, TelemetryGenError> {
        let Some(raw) = raw else {
            return Ok(MetadataKind::Unspecified);
        };

        match raw.trim().to_ascii_lowercase().as_str() {
            "string" => Ok(MetadataKind::String),
            "int" | "integer" => Ok(MetadataKind::Integer),
            "double" | "number" => Ok(MetadataKind::Double),
            "bool" | "boolean" => Ok(MetadataKind::Boolean),
            _ => Err(TelemetryGenError::UnsupportedMetadataKind {
                metadata: metadata.to_string(),
                kind: raw.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// Target-neutral primitive types.
pub enum Primitive {
    String,
    Integer,
    Double,
    Boolean,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Type expression derived for one metadata field.
pub enum TypeExpr {
    /// Closed set of string literals, in file order, without duplicates.
    LiteralUnion(Vec<String>),
    Primitive(Primitive),
}

/// Derives the generated type of a metadata field.
///
/// A non-empty allowed-values set always wins over the declared kind.
pub fn derive_type(def: &MetadataDefinition) -> TypeExpr {
    if def.is_constrained() {
        return TypeExpr::LiteralUnion(def.allowed_values.clone());
    }

    TypeExpr::Primitive(match def.kind {
        MetadataKind::Unspecified | MetadataKind::String => Primitive::String,
        MetadataKind::Integer => Primitive::Integer,
        MetadataKind::Double => Primitive::Double,
        MetadataKind::Boolean => Primitive::Boolean,
    })
}

#[cfg(test)]
mod tests {
    use super::{derive_type, MetadataKind, Primitive, TypeExpr};
    use crate::error::TelemetryGenError;
    use crate::model::MetadataDefinition;

    fn def(kind: MetadataKind, allowed: &[&str]) -> MetadataDefinition {
        MetadataDefinition {
            name: "field".to_string(),
            kind,
            allowed_values: allowed.iter().map(|v| v.to_string()).collect(),
            required: false,
            description: None,
        }
    }

    #[test]
    fn maps_kinds_to_primitives() {
        assert_eq!(
            derive_type(&def(MetadataKind::Unspecified, &[])),
            TypeExpr::Primitive(Primitive::String)
        );
        assert_eq!(
            derive_type(&def(MetadataKind::Integer, &[])),
            TypeExpr::Primitive(Primitive::Integer)
        );
        assert_eq!(
            derive_type(&def(MetadataKind::Double, &[])),
            TypeExpr::Primitive(Primitive::Double)
        );
        assert_eq!(
            derive_type(&def(MetadataKind::Boolean, &[])),
            TypeExpr::Primitive(Primitive::Boolean)
        );
    }

    #[test]
    fn allowed_values_win_over_kind() {
        assert_eq!(
            derive_type(&def(MetadataKind::Integer, &["a", "b"])),
            TypeExpr::LiteralUnion(vec!["a".to_string(), "b".to_string()])
        );
    }

    #[test]
    fn parses_kind_aliases_and_rejects_unknown_kinds() {
        assert_eq!(MetadataKind::parse("m", None).unwrap(), MetadataKind::Unspecified);
        assert_eq!(MetadataKind::parse("m", Some("int")).unwrap(), MetadataKind::Integer);
        assert_eq!(MetadataKind::parse("m", Some("number")).unwrap(), MetadataKind::Double);
        assert_eq!(MetadataKind::parse("m", Some("Boolean")).unwrap(), MetadataKind::Boolean);

        let err = MetadataKind::parse("duration", Some("strnig")).unwrap_err();
        assert!(matches!(
            err,
            TelemetryGenError::UnsupportedMetadataKind { ref metadata, ref kind }
                if metadata == "duration" && kind == "strnig"
        ));
    }
}
