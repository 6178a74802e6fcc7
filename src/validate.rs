//! Schema authoring conventions checked before any resolution happens.

use crate::ast::{MetadataRefSpec, SchemaDocument};
use crate::error::TelemetryGenError;
use crate::model::REFERENCE_SIGIL;

/// Runs every convention check against a loaded document.
///
/// `require_sorted_metrics` enables the alphabetical-ordering rule of the
/// sorted schema dialect.
pub fn validate_document(
    document: &SchemaDocument,
    require_sorted_metrics: bool,
) -> Result<(), TelemetryGenError> {
    validate_reference_sigils(document)?;
    if require_sorted_metrics {
        validate_metric_order(document)?;
    }
    Ok(())
}

/// Every string metadata entry must be a sigil-prefixed reference.
pub fn validate_reference_sigils(document: &SchemaDocument) -> Result<(), TelemetryGenError> {
    for metric in &document.metrics {
        for entry in &metric.metadata {
            if let MetadataRefSpec::Reference(token) = entry {
                if !token.starts_with(REFERENCE_SIGIL) {
                    return Err(TelemetryGenError::MalformedReference {
                        metric: metric.name.clone(),
                        token: token.clone(),
                        sigil: REFERENCE_SIGIL,
                    });
                }
            }
        }
    }
    Ok(())
}

/// Metrics must appear in strictly ascending order by name.
pub fn validate_metric_order(document: &SchemaDocument) -> Result<(), TelemetryGenError> {
    for pair in document.metrics.windows(2) {
        if pair[0].name >= pair[1].name {
            return Err(TelemetryGenError::OrderingViolation {
                previous: pair[0].name.clone(),
                next: pair[1].name.clone(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::validate_document;
    use crate::ast::{MetadataRefSpec, MetricSpec, SchemaDocument};
    use crate::error::TelemetryGenError;

    fn document(names: &[&str], refs: &[&str]) -> SchemaDocument {
        SchemaDocument {
            metadata: Vec::new(),
            metrics: names
                .iter()
                .map(|name| MetricSpec {
                    name: name.to_string(),
                    unit: "none".to_string(),
                    description: None,
                    metadata: refs
                        .iter()
                        .map(|r| MetadataRefSpec::Reference(r.to_string()))
                        .collect(),
                })
                .collect(),
        }
    }

    #[test]
    fn out_of_order_metrics_report_the_adjacent_pair() {
        let doc = document(&["apple", "zebra", "mango"], &[]);
        let err = validate_document(&doc, true).unwrap_err();
        assert!(matches!(
            err,
            TelemetryGenError::OrderingViolation { ref previous, ref next }
                if previous == "zebra" && next == "mango"
        ));
    }

    #[test]
    fn ordering_is_only_checked_when_required() {
        let doc = document(&["zebra", "apple"], &[]);
        validate_document(&doc, false).unwrap();
        assert!(validate_document(&doc, true).is_err());
    }

    #[test]
    fn duplicate_names_violate_strict_ordering() {
        let doc = document(&["apple", "apple"], &[]);
        assert!(matches!(
            validate_document(&doc, true).unwrap_err(),
            TelemetryGenError::OrderingViolation { .. }
        ));
    }

    #[test]
    fn references_without_sigil_are_rejected() {
        let doc = document(&["apple"], &["$result", "runtime"]);
        let err = validate_document(&doc, false).unwrap_err();
        assert!(matches!(
            err,
            TelemetryGenError::MalformedReference { ref metric, ref token, .. }
                if metric == "apple" && token == "runtime"
        ));
    }
}
