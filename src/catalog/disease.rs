//! Disease Reference Table
//!
//! Static cause/cure text per class, read from a JSON array of
//! `{"name", "cause", "cure"}` records.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::labels::LabelCatalog;
use crate::utils::error::{DiagnosisError, Result};

/// Reference entry for one class
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiseaseRecord {
    /// Class name, matched exactly against the label catalog
    pub name: String,
    pub cause: String,
    pub cure: String,
}

/// Lookup table of disease records keyed by class name
#[derive(Debug, Clone, Default)]
pub struct DiseaseTable {
    records: Vec<DiseaseRecord>,
    by_name: HashMap<String, usize>,
}

impl DiseaseTable {
    /// Build a table; the first record for a repeated name wins
    pub fn new(records: Vec<DiseaseRecord>) -> Self {
        let mut by_name = HashMap::with_capacity(records.len());
        for (i, record) in records.iter().enumerate() {
            if by_name.contains_key(&record.name) {
                tracing::warn!(
                    "Duplicate disease record '{}' ignored (first entry kept)",
                    record.name
                );
                continue;
            }
            by_name.insert(record.name.clone(), i);
        }
        Self { records, by_name }
    }

    /// Load a disease-info JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            DiagnosisError::catalog(path, format!("cannot read file: {}", e))
        })?;
        let records: Vec<DiseaseRecord> = serde_json::from_str(&content).map_err(|e| {
            DiagnosisError::catalog(
                path,
                format!("expected a JSON array of {{name, cause, cure}}: {}", e),
            )
        })?;

        let table = Self::new(records);
        tracing::info!("Loaded {} disease records from {:?}", table.len(), path);
        Ok(table)
    }

    /// Exact-match lookup by class name
    pub fn lookup(&self, name: &str) -> Option<&DiseaseRecord> {
        self.by_name.get(name).map(|&i| &self.records[i])
    }

    /// Number of distinct names in the table
    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    /// Records whose name matches no catalog class
    pub fn unmatched<'a>(&'a self, catalog: &LabelCatalog) -> Vec<&'a str> {
        let mut names: Vec<&str> = self
            .by_name
            .keys()
            .map(String::as_str)
            .filter(|name| !catalog.contains(name))
            .collect();
        names.sort_unstable();
        names
    }

    /// Catalog classes without a record
    pub fn missing<'a>(&self, catalog: &'a LabelCatalog) -> Vec<&'a str> {
        let known: HashSet<&str> = self.by_name.keys().map(String::as_str).collect();
        catalog
            .names()
            .iter()
            .map(String::as_str)
            .filter(|name| !known.contains(name))
            .collect()
    }

    /// Log names that do not line up with the catalog. Mismatches are
    /// tolerated; predictions for uncovered classes fall back to placeholders.
    pub fn report_coverage(&self, catalog: &LabelCatalog) {
        for name in self.unmatched(catalog) {
            tracing::warn!("Disease record '{}' matches no class in the label catalog", name);
        }
        let missing = self.missing(catalog);
        if !missing.is_empty() {
            tracing::warn!(
                "{} of {} classes have no disease record: {}",
                missing.len(),
                catalog.len(),
                missing.join(", ")
            );
        }
    }
}
