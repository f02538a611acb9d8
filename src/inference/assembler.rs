//! Prediction Assembler
//!
//! Turns the classifier's probability vector into the response record:
//! arg-max class, confidence as a percentage, and the cause/cure text joined
//! from the disease table.

use serde::{Deserialize, Serialize};

use crate::catalog::{DiseaseTable, LabelCatalog};
use crate::utils::error::{DiagnosisError, Result};

/// Cause reported when the predicted class has no disease record
pub const UNKNOWN_CAUSE: &str = "Unknown";
/// Cure reported when the predicted class has no disease record
pub const UNKNOWN_CURE: &str = "No cure info found";

/// Diagnosis returned to the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    /// Winning class name from the label catalog
    pub predicted_class: String,

    /// `100 × probability` of the winning class, rounded to 2 decimals, in [0, 100]
    pub confidence: f64,

    pub cause: String,
    pub cure: String,
}

/// One entry of a top-k ranking
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedClass {
    pub index: usize,
    pub name: String,
    pub probability: f32,
}

/// Index and value of the largest probability; the lowest index wins ties
pub fn argmax(probabilities: &[f32]) -> Option<(usize, f32)> {
    let mut best: Option<(usize, f32)> = None;
    for (i, &p) in probabilities.iter().enumerate() {
        match best {
            Some((_, best_p)) if p <= best_p => {}
            _ => best = Some((i, p)),
        }
    }
    best
}

/// Probability → percentage rounded to 2 decimal places (exact halves to even),
/// clamped into [0, 100]
pub fn confidence_percent(probability: f32) -> f64 {
    let percent = (probability as f64 * 100.0 * 100.0).round_ties_even() / 100.0;
    percent.clamp(0.0, 100.0)
}

/// Joins classifier output with the read-only reference data
#[derive(Debug, Clone, Copy)]
pub struct PredictionAssembler<'a> {
    catalog: &'a LabelCatalog,
    diseases: &'a DiseaseTable,
}

impl<'a> PredictionAssembler<'a> {
    pub fn new(catalog: &'a LabelCatalog, diseases: &'a DiseaseTable) -> Self {
        Self { catalog, diseases }
    }

    /// Check the vector against the catalog before any indexing
    fn validate(&self, probabilities: &[f32]) -> Result<()> {
        if probabilities.len() != self.catalog.len() {
            return Err(DiagnosisError::CardinalityMismatch {
                expected: self.catalog.len(),
                actual: probabilities.len(),
            });
        }
        if let Some(i) = probabilities.iter().position(|p| !p.is_finite()) {
            return Err(DiagnosisError::Inference(format!(
                "classifier returned a non-finite probability at index {}",
                i
            )));
        }
        Ok(())
    }

    /// Build the response record for one probability vector
    pub fn assemble(&self, probabilities: &[f32]) -> Result<PredictionResult> {
        self.validate(probabilities)?;

        // validate() guarantees a non-empty vector matching the catalog
        let (index, probability) = argmax(probabilities).ok_or(DiagnosisError::CardinalityMismatch {
            expected: self.catalog.len(),
            actual: 0,
        })?;
        let predicted_class = self
            .catalog
            .name(index)
            .ok_or(DiagnosisError::CardinalityMismatch {
                expected: self.catalog.len(),
                actual: probabilities.len(),
            })?
            .to_string();

        let (cause, cure) = match self.diseases.lookup(&predicted_class) {
            Some(record) => (record.cause.clone(), record.cure.clone()),
            None => {
                tracing::debug!("No disease record for '{}', using placeholders", predicted_class);
                (UNKNOWN_CAUSE.to_string(), UNKNOWN_CURE.to_string())
            }
        };

        Ok(PredictionResult {
            predicted_class,
            confidence: confidence_percent(probability),
            cause,
            cure,
        })
    }

    /// The `k` most probable classes, highest first; ties keep index order
    pub fn ranked(&self, probabilities: &[f32], k: usize) -> Result<Vec<RankedClass>> {
        self.validate(probabilities)?;

        let mut indexed: Vec<(usize, f32)> = probabilities.iter().copied().enumerate().collect();
        indexed.sort_by(|a, b| b.1.total_cmp(&a.1));

        Ok(indexed
            .into_iter()
            .take(k)
            .map(|(index, probability)| RankedClass {
                index,
                name: self.catalog.name(index).unwrap_or_default().to_string(),
                probability,
            })
            .collect())
    }
}
