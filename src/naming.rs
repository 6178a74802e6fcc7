//! Identifier derivation shared by all output targets.

use std::collections::HashMap;

use crate::error::TelemetryGenError;

/// Converts a snake_case metric name into its PascalCase type name.
///
/// `lambda_remoteinvoke` becomes `LambdaRemoteinvoke`: every segment gets
/// an upper-cased first character and keeps the rest as written.
pub fn to_type_name(metric_name: &str) -> String {
    let mut out = String::with_capacity(metric_name.len());
    for segment in metric_name.split('_') {
        let mut chars = segment.chars();
        if let Some(first) = chars.next() {
            out.extend(first.to_uppercase());
            out.push_str(chars.as_str());
        }
    }
    out
}

/// Name of the recording function generated for a metric.
pub fn to_function_name(metric_name: &str) -> String {
    format!("record{}", to_type_name(metric_name))
}

/// Name of the event-name enumeration member for a metric.
pub fn to_constant_name(metric_name: &str) -> String {
    metric_name.to_ascii_uppercase()
}

/// Strips characters that cannot appear in a generated identifier.
///
/// Keeps ASCII letters, digits and `_`; prefixes `_` when the result would
/// start with a digit or be empty. `nodejs12.x` becomes `nodejs12x`.
pub fn sanitize_enum_member(literal: &str) -> String {
    let mut out: String = literal
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect();
    if out.is_empty() || out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    out
}

#[derive(Debug, Default)]
/// Tracks generated identifiers in one namespace and rejects collisions.
pub struct IdentifierScope {
    claimed: HashMap<String, (String, String)>,
    fold_case: bool,
}

impl IdentifierScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// A scope where identifiers that differ only in ASCII case collide.
    pub fn case_insensitive() -> Self {
        Self {
            claimed: HashMap::new(),
            fold_case: true,
        }
    }

    /// Claims `identifier` on behalf of the schema entry `source`.
    ///
    /// Claiming the same identifier again for the same source is a no-op.
    pub fn claim(&mut self, identifier: &str, source: &str) -> Result<(), TelemetryGenError> {
        let key = if self.fold_case {
            identifier.to_ascii_lowercase()
        } else {
            identifier.to_string()
        };

        match self.claimed.get(&key) {
            Some((_, first)) if first == source => Ok(()),
            Some((existing, first)) => Err(TelemetryGenError::DuplicateGeneratedIdentifier {
                identifier: existing.clone(),
                first: first.clone(),
                second: source.to_string(),
            }),
            None => {
                self.claimed
                    .insert(key, (identifier.to_string(), source.to_string()));
                Ok(())
            }
        }
    }
}
