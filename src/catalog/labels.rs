//! Label Catalog
//!
//! Maps class names to the positions of the classifier's output vector.
//! The catalog is read from a JSON object `{"<class name>": <index>, ...}`
//! as written at training time. Names are ordered by index value, never by
//! key order, and the indices must cover `0..N-1` exactly once.

use std::collections::HashMap;
use std::path::Path;

use serde::Serialize;

use crate::utils::error::{DiagnosisError, Result};

/// Ordered, index-addressable list of class names
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabelCatalog {
    names: Vec<String>,
}

impl LabelCatalog {
    /// Build a catalog from names already in output order
    pub fn from_names<I, S>(names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        if names.is_empty() {
            return Err(DiagnosisError::Config(
                "label catalog must contain at least one class".to_string(),
            ));
        }
        Ok(Self { names })
    }

    /// Build a catalog from a name → index mapping, validating that the
    /// indices form a contiguous permutation of `0..N-1`
    pub fn from_indices(indices: &HashMap<String, i64>, source: &Path) -> Result<Self> {
        if indices.is_empty() {
            return Err(DiagnosisError::catalog(source, "no classes defined"));
        }

        let n = indices.len();
        let mut slots: Vec<Option<&str>> = vec![None; n];

        for (name, &index) in indices {
            if index < 0 || index as usize >= n {
                return Err(DiagnosisError::catalog(
                    source,
                    format!(
                        "class '{}' has index {} outside 0..{}",
                        name,
                        index,
                        n - 1
                    ),
                ));
            }
            let slot = &mut slots[index as usize];
            if let Some(existing) = slot {
                return Err(DiagnosisError::catalog(
                    source,
                    format!(
                        "classes '{}' and '{}' share index {}",
                        existing, name, index
                    ),
                ));
            }
            *slot = Some(name.as_str());
        }

        // n distinct in-range indices over n slots fill every slot
        let names = slots
            .into_iter()
            .map(|s| s.unwrap_or_default().to_string())
            .collect();

        Ok(Self { names })
    }

    /// Load a class-index JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            DiagnosisError::catalog(path, format!("cannot read file: {}", e))
        })?;
        let indices: HashMap<String, i64> = serde_json::from_str(&content).map_err(|e| {
            DiagnosisError::catalog(path, format!("expected a JSON object of class → index: {}", e))
        })?;

        let catalog = Self::from_indices(&indices, path)?;
        tracing::info!("Loaded {} classes from {:?}", catalog.len(), path);
        Ok(catalog)
    }

    /// Number of classes
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Always false for a constructed catalog; kept for API symmetry
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Class name at a given output index
    pub fn name(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    /// Output index of a class name
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    /// Whether a class name exists in the catalog
    pub fn contains(&self, name: &str) -> bool {
        self.index_of(name).is_some()
    }

    /// Class names in output order
    pub fn names(&self) -> &[String] {
        &self.names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn indices(pairs: &[(&str, i64)]) -> HashMap<String, i64> {
        pairs.iter().map(|(n, i)| (n.to_string(), *i)).collect()
    }

    #[test]
    fn test_orders_by_index_not_key_order() {
        let map = indices(&[
            ("Tomato___healthy", 2),
            ("Apple___Apple_scab", 0),
            ("Potato___Late_blight", 1),
        ]);
        let catalog = LabelCatalog::from_indices(&map, Path::new("mem")).unwrap();

        assert_eq!(catalog.len(), 3);
        assert_eq!(catalog.name(0), Some("Apple___Apple_scab"));
        assert_eq!(catalog.name(1), Some("Potato___Late_blight"));
        assert_eq!(catalog.name(2), Some("Tomato___healthy"));
        assert_eq!(catalog.name(3), None);
        assert_eq!(catalog.index_of("Tomato___healthy"), Some(2));
    }

    #[test]
    fn test_rejects_gap_in_indices() {
        let map = indices(&[("a", 0), ("b", 2)]);
        let err = LabelCatalog::from_indices(&map, Path::new("mem")).unwrap_err();
        assert!(err.to_string().contains("outside"));
    }

    #[test]
    fn test_rejects_duplicate_index() {
        let map = indices(&[("a", 0), ("b", 0)]);
        let err = LabelCatalog::from_indices(&map, Path::new("mem")).unwrap_err();
        assert!(err.to_string().contains("share index 0"));
    }

    #[test]
    fn test_rejects_negative_index() {
        let map = indices(&[("a", -1)]);
        assert!(LabelCatalog::from_indices(&map, Path::new("mem")).is_err());
    }

    #[test]
    fn test_rejects_empty() {
        assert!(LabelCatalog::from_indices(&HashMap::new(), Path::new("mem")).is_err());
        assert!(LabelCatalog::from_names(Vec::<String>::new()).is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"Apple___Black_rot": 1, "Apple___Apple_scab": 0, "Apple___healthy": 2}}"#
        )
        .unwrap();

        let catalog = LabelCatalog::load(file.path()).unwrap();
        assert_eq!(
            catalog.names(),
            &["Apple___Apple_scab", "Apple___Black_rot", "Apple___healthy"]
        );
    }

    #[test]
    fn test_load_rejects_array() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"["a", "b"]"#).unwrap();

        let err = LabelCatalog::load(file.path()).unwrap_err();
        assert!(matches!(err, DiagnosisError::Catalog { .. }));
    }

    #[test]
    fn test_load_missing_file() {
        let err = LabelCatalog::load(Path::new("/nonexistent/class_indices.json")).unwrap_err();
        assert!(matches!(err, DiagnosisError::Catalog { .. }));
    }
}
