//! The metadata pool: named, reusable metadata definitions.

use std::collections::HashMap;

use crate::ast::MetadataSpec;
use crate::error::TelemetryGenError;
use crate::model::MetadataDefinition;

#[derive(Debug, Clone, Default)]
/// Arena of pool definitions indexed by name. Immutable once built.
pub struct MetadataPool {
    entries: Vec<MetadataDefinition>,
    index: HashMap<String, usize>,
}

impl MetadataPool {
    /// Builds the pool from the document's metadata section.
    ///
    /// Fails on the first duplicated name or unsupported kind.
    pub fn build(specs: &[MetadataSpec]) -> Result<Self, TelemetryGenError> {
        let mut pool = MetadataPool::default();

        for spec in specs {
            let def = MetadataDefinition::from_spec(spec)?;
            if pool.index.contains_key(&def.name) {
                return Err(TelemetryGenError::DuplicateMetadataName { name: def.name });
            }
            pool.index.insert(def.name.clone(), pool.entries.len());
            pool.entries.push(def);
        }

        log::debug!("built metadata pool with {} entries", pool.entries.len());
        Ok(pool)
    }

    pub fn get(&self, name: &str) -> Option<&MetadataDefinition> {
        self.index.get(name).map(|&idx| &self.entries[idx])
    }
}
