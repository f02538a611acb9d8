//! Diagnosis Context
//!
//! Everything a request needs that outlives it: the label catalog, the
//! disease table and the loaded classifier. Built once at startup, validated,
//! then shared read-only behind an `Arc`.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::assembler::PredictionAssembler;
use super::classifier::{load_classifier, Classifier, ModelFormat};
use crate::catalog::{DiseaseTable, LabelCatalog};
use crate::utils::error::{DiagnosisError, Result};

/// Locations of the startup artifacts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextConfig {
    /// Model artifact (`.onnx` or Burn `.mpk`)
    pub model_path: PathBuf,

    /// Explicit model format; inferred from the extension when absent
    pub model_format: Option<ModelFormat>,

    /// Class-index JSON object
    pub labels_path: PathBuf,

    /// Disease-info JSON array
    pub diseases_path: PathBuf,
}

impl Default for ContextConfig {
    fn default() -> Self {
        let model_dir = PathBuf::from("model");
        Self {
            model_path: model_dir.join("plant_disease_model.onnx"),
            model_format: None,
            labels_path: model_dir.join("class_indices.json"),
            diseases_path: model_dir.join("plant_disease.json"),
        }
    }
}

/// Immutable per-process state shared by all requests
pub struct DiagnosisContext {
    catalog: LabelCatalog,
    diseases: DiseaseTable,
    classifier: Box<dyn Classifier>,
}

impl std::fmt::Debug for DiagnosisContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiagnosisContext")
            .field("classes", &self.catalog.len())
            .field("disease_records", &self.diseases.len())
            .field("runtime", &self.classifier.runtime())
            .finish()
    }
}

impl DiagnosisContext {
    /// Load every artifact and check they agree. Any failure here must stop
    /// the process; there is no partially initialized service.
    pub fn load(config: &ContextConfig) -> Result<Self> {
        let format = ModelFormat::resolve(config.model_format, &config.model_path)?;

        let catalog = LabelCatalog::load(&config.labels_path)?;
        let diseases = DiseaseTable::load(&config.diseases_path)?;
        let classifier = load_classifier(&config.model_path, format, catalog.len())?;

        Self::new(catalog, diseases, classifier)
    }

    /// Assemble a context from parts, running the same consistency checks as [`load`](Self::load)
    pub fn new(
        catalog: LabelCatalog,
        diseases: DiseaseTable,
        classifier: Box<dyn Classifier>,
    ) -> Result<Self> {
        if let Some(declared) = classifier.num_classes() {
            if declared != catalog.len() {
                return Err(DiagnosisError::CardinalityMismatch {
                    expected: catalog.len(),
                    actual: declared,
                });
            }
        } else {
            tracing::warn!(
                "{} model does not declare its output width; class count is checked per request",
                classifier.runtime()
            );
        }

        diseases.report_coverage(&catalog);

        Ok(Self {
            catalog,
            diseases,
            classifier,
        })
    }

    pub fn catalog(&self) -> &LabelCatalog {
        &self.catalog
    }

    pub fn diseases(&self) -> &DiseaseTable {
        &self.diseases
    }

    pub fn classifier(&self) -> &dyn Classifier {
        self.classifier.as_ref()
    }

    pub fn assembler(&self) -> PredictionAssembler<'_> {
        PredictionAssembler::new(&self.catalog, &self.diseases)
    }
}
