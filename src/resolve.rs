//! Resolution of metric metadata references against the pool.

use crate::error::TelemetryGenError;
use crate::model::{MetadataRef, MetricDefinition, ResolvedMetric, REFERENCE_SIGIL};
use crate::pool::MetadataPool;

/// Resolves one metric's metadata list, preserving declaration order.
pub fn resolve_metric(
    metric: &MetricDefinition,
    pool: &MetadataPool,
) -> Result<ResolvedMetric, TelemetryGenError> {
    let mut metadata = Vec::with_capacity(metric.metadata.len());

    for entry in &metric.metadata {
        let def = match entry {
            MetadataRef::Inline(def) => def.clone(),
            MetadataRef::Reference(token) => {
                let key = token.strip_prefix(REFERENCE_SIGIL).ok_or_else(|| {
                    TelemetryGenError::MalformedReference {
                        metric: metric.name.clone(),
                        token: token.clone(),
                        sigil: REFERENCE_SIGIL,
                    }
                })?;
                pool.get(key)
                    .cloned()
                    .ok_or_else(|| TelemetryGenError::UnknownMetadataReference {
                        metric: metric.name.clone(),
                        reference: key.to_string(),
                    })?
            }
        };
        metadata.push(def);
    }

    Ok(ResolvedMetric {
        name: metric.name.clone(),
        unit: metric.unit,
        description: metric.description.clone(),
        metadata,
    })
}

/// Resolves every metric; the first failure aborts the whole run.
pub fn resolve_all(
    metrics: &[MetricDefinition],
    pool: &MetadataPool,
) -> Result<Vec<ResolvedMetric>, TelemetryGenError> {
    metrics
        .iter()
        .map(|metric| resolve_metric(metric, pool))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{resolve_all, resolve_metric};
    use crate::ast::MetadataSpec;
    use crate::error::TelemetryGenError;
    use crate::model::{MetadataDefinition, MetadataRef, MetricDefinition, Unit};
    use crate::pool::MetadataPool;
    use crate::types::MetadataKind;

    fn pool() -> MetadataPool {
        MetadataPool::build(&[MetadataSpec {
            name: "result".to_string(),
            kind: None,
            allowed_values: Some(vec!["succeeded".to_string(), "failed".to_string()]),
            required: true,
            description: None,
        }])
        .unwrap()
    }

    fn metric(name: &str, metadata: Vec<MetadataRef>) -> MetricDefinition {
        MetricDefinition {
            name: name.to_string(),
            unit: Unit::None,
            description: None,
            metadata,
        }
    }

    fn inline(name: &str) -> MetadataRef {
        MetadataRef::Inline(MetadataDefinition {
            name: name.to_string(),
            kind: MetadataKind::Boolean,
            allowed_values: Vec::new(),
            required: false,
            description: None,
        })
    }

    #[test]
    fn resolves_references_and_inline_definitions_in_order() {
        let m = metric(
            "lambda_delete",
            vec![
                inline("retried"),
                MetadataRef::Reference("$result".to_string()),
            ],
        );
        let resolved = resolve_metric(&m, &pool()).unwrap();
        let names: Vec<&str> = resolved.metadata.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["retried", "result"]);
        assert!(resolved.metadata[1].required);
    }

    #[test]
    fn missing_sigil_is_malformed() {
        let m = metric(
            "lambda_delete",
            vec![MetadataRef::Reference("result".to_string())],
        );
        let err = resolve_metric(&m, &pool()).unwrap_err();
        assert!(matches!(
            err,
            TelemetryGenError::MalformedReference { ref metric, ref token, .. }
                if metric == "lambda_delete" && token == "result"
        ));
    }

    #[test]
    fn dangling_reference_names_metric_and_key() {
        let m = metric("foo", vec![MetadataRef::Reference("$bar".to_string())]);
        let err = resolve_metric(&m, &pool()).unwrap_err();
        assert!(matches!(
            err,
            TelemetryGenError::UnknownMetadataReference { ref metric, ref reference }
                if metric == "foo" && reference == "bar"
        ));
    }

    #[test]
    fn first_failure_aborts_resolution() {
        let metrics = vec![
            metric("a_ok", vec![MetadataRef::Reference("$result".to_string())]),
            metric("b_bad", vec![MetadataRef::Reference("$nope".to_string())]),
            metric("c_bad", vec![MetadataRef::Reference("also_bad".to_string())]),
        ];
        let err = resolve_all(&metrics, &pool()).unwrap_err();
        assert!(matches!(
            err,
            TelemetryGenError::UnknownMetadataReference { ref metric, .. } if metric == "b_bad"
        ));
    }
}
