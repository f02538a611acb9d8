//! Request pipeline
//!
//! Drives one upload through `Received → Decoded → Normalized → Classified →
//! Assembled`. Every stage is a blocking CPU call; any failure is terminal
//! for the request and nothing is retried. Requests share only the read-only
//! [`DiagnosisContext`].

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use thiserror::Error;

use super::assembler::PredictionResult;
use super::context::DiagnosisContext;
use super::normalizer::ImageNormalizer;
use crate::utils::error::{DiagnosisError, Result};

/// Progress of a single request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineStage {
    Received,
    Decoded,
    Normalized,
    Classified,
    Assembled,
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PipelineStage::Received => "received",
            PipelineStage::Decoded => "decoded",
            PipelineStage::Normalized => "normalized",
            PipelineStage::Classified => "classified",
            PipelineStage::Assembled => "assembled",
        };
        f.write_str(name)
    }
}

/// Wall time spent per stage of one request
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct StageTimings {
    pub decode: Duration,
    pub normalize: Duration,
    pub classify: Duration,
    pub assemble: Duration,
}

impl StageTimings {
    pub fn total(&self) -> Duration {
        self.decode + self.normalize + self.classify + self.assemble
    }
}

/// Everything one successful run produced
#[derive(Debug, Clone)]
pub struct Diagnosis {
    pub result: PredictionResult,
    /// Raw classifier output the result was assembled from
    pub probabilities: Vec<f32>,
    pub timings: StageTimings,
}

/// A failed request: the error and the last stage that completed
#[derive(Debug, Error)]
#[error("{error} (after stage '{stage}')")]
pub struct StageFailure {
    pub stage: PipelineStage,
    #[source]
    pub error: DiagnosisError,
}

impl From<StageFailure> for DiagnosisError {
    fn from(failure: StageFailure) -> Self {
        failure.error
    }
}

/// Stateless driver over a shared context; cheap to clone per request
#[derive(Debug, Clone)]
pub struct DiagnosisPipeline {
    context: Arc<DiagnosisContext>,
    normalizer: ImageNormalizer,
}

impl DiagnosisPipeline {
    pub fn new(context: Arc<DiagnosisContext>) -> Self {
        Self {
            context,
            normalizer: ImageNormalizer::default(),
        }
    }

    pub fn context(&self) -> &DiagnosisContext {
        &self.context
    }

    /// Diagnose one uploaded image
    pub fn diagnose(&self, bytes: &[u8]) -> Result<PredictionResult> {
        Ok(self.diagnose_detailed(bytes)?.result)
    }

    /// Diagnose one uploaded image, keeping the probabilities and per-stage timings
    pub fn diagnose_detailed(&self, bytes: &[u8]) -> std::result::Result<Diagnosis, StageFailure> {
        let mut stage = PipelineStage::Received;
        let mut timings = StageTimings::default();

        match self.run(bytes, &mut stage, &mut timings) {
            Ok((result, probabilities)) => {
                tracing::debug!(
                    "Diagnosed '{}' ({:.2}%) in {:.1} ms",
                    result.predicted_class,
                    result.confidence,
                    timings.total().as_secs_f64() * 1000.0
                );
                Ok(Diagnosis {
                    result,
                    probabilities,
                    timings,
                })
            }
            Err(error) => {
                let failure = StageFailure { stage, error };
                if failure.error.is_user_error() {
                    tracing::debug!("Request rejected: {}", failure);
                } else {
                    tracing::error!("Request failed: {}", failure);
                }
                Err(failure)
            }
        }
    }

    fn run(
        &self,
        bytes: &[u8],
        stage: &mut PipelineStage,
        timings: &mut StageTimings,
    ) -> Result<(PredictionResult, Vec<f32>)> {
        tracing::trace!("Received {} bytes", bytes.len());

        let start = Instant::now();
        let image = self.normalizer.decode(bytes)?;
        timings.decode = start.elapsed();
        *stage = PipelineStage::Decoded;
        tracing::trace!("Decoded {}x{} image", image.width(), image.height());

        let start = Instant::now();
        let tensor = self.normalizer.normalize(&image);
        drop(image);
        timings.normalize = start.elapsed();
        *stage = PipelineStage::Normalized;

        let start = Instant::now();
        let probabilities = self.context.classifier().classify(&tensor)?;
        timings.classify = start.elapsed();
        *stage = PipelineStage::Classified;

        let start = Instant::now();
        let result = self.context.assembler().assemble(&probabilities)?;
        timings.assemble = start.elapsed();
        *stage = PipelineStage::Assembled;

        Ok((result, probabilities))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{DiseaseRecord, DiseaseTable, LabelCatalog};
    use crate::inference::stub::StubClassifier;
    use image::{DynamicImage, ImageBuffer, ImageFormat, Rgb};
    use std::io::Cursor;

    fn leaf_png() -> Vec<u8> {
        let img = ImageBuffer::from_fn(200, 150, |x, y| Rgb([(x % 200) as u8, 120, (y % 150) as u8]));
        let mut buf = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img)
            .write_to(&mut buf, ImageFormat::Png)
            .unwrap();
        buf.into_inner()
    }

    fn pipeline(classifier: StubClassifier) -> DiagnosisPipeline {
        let catalog =
            LabelCatalog::from_names(["Potato___Early_blight", "Potato___healthy"]).unwrap();
        let diseases = DiseaseTable::new(vec![DiseaseRecord {
            name: "Potato___healthy".to_string(),
            cause: "None".to_string(),
            cure: "Keep monitoring".to_string(),
        }]);
        let context = DiagnosisContext::new(catalog, diseases, Box::new(classifier)).unwrap();
        DiagnosisPipeline::new(Arc::new(context))
    }

    #[test]
    fn test_end_to_end_with_record() {
        let pipeline = pipeline(StubClassifier::returning(vec![0.03, 0.97]));
        let result = pipeline.diagnose(&leaf_png()).unwrap();

        assert_eq!(
            result,
            PredictionResult {
                predicted_class: "Potato___healthy".to_string(),
                confidence: 97.0,
                cause: "None".to_string(),
                cure: "Keep monitoring".to_string(),
            }
        );
    }

    #[test]
    fn test_end_to_end_lookup_miss() {
        let pipeline = pipeline(StubClassifier::returning(vec![0.8, 0.2]));
        let result = pipeline.diagnose(&leaf_png()).unwrap();

        assert_eq!(result.predicted_class, "Potato___Early_blight");
        assert_eq!(result.cause, "Unknown");
        assert_eq!(result.cure, "No cure info found");
    }

    #[test]
    fn test_decode_failure_skips_classifier() {
        let classifier = Arc::new(StubClassifier::returning(vec![0.5, 0.5]));
        let catalog = LabelCatalog::from_names(["x", "y"]).unwrap();
        let context = DiagnosisContext::new(
            catalog,
            DiseaseTable::default(),
            Box::new(Arc::clone(&classifier)),
        )
        .unwrap();
        let pipeline = DiagnosisPipeline::new(Arc::new(context));

        let err = pipeline.diagnose(b"%PDF-1.4 not an image").unwrap_err();
        assert!(matches!(err, DiagnosisError::Decode(_)));
        assert!(err.is_user_error());
        assert_eq!(classifier.calls(), 0);
    }

    #[test]
    fn test_wrong_width_at_runtime_is_cardinality_mismatch() {
        // Undeclared width slips past startup validation; the assembler still guards it
        let pipeline = pipeline(StubClassifier::returning(vec![0.2, 0.3, 0.5]).declaring(None));

        let err = pipeline.diagnose(&leaf_png()).unwrap_err();
        assert!(matches!(
            err,
            DiagnosisError::CardinalityMismatch {
                expected: 2,
                actual: 3
            }
        ));
        assert!(!err.is_user_error());
    }

    #[test]
    fn test_classifier_error_propagates() {
        let pipeline = pipeline(StubClassifier::failing("runtime exploded").declaring(Some(2)));
        let err = pipeline.diagnose(&leaf_png()).unwrap_err();
        assert!(matches!(err, DiagnosisError::Inference(_)));
    }

    #[test]
    fn test_failure_does_not_affect_next_request() {
        let pipeline = pipeline(StubClassifier::returning(vec![0.1, 0.9]));

        assert!(pipeline.diagnose(b"garbage").is_err());
        assert!(pipeline.diagnose(&leaf_png()).is_ok());
    }

    #[test]
    fn test_detailed_keeps_probabilities_and_timings() {
        let pipeline = pipeline(StubClassifier::returning(vec![0.1, 0.9]));
        let diagnosis = pipeline.diagnose_detailed(&leaf_png()).unwrap();

        assert_eq!(diagnosis.probabilities, vec![0.1, 0.9]);
        assert_eq!(diagnosis.result.predicted_class, "Potato___healthy");
        assert!(diagnosis.timings.total() >= diagnosis.timings.classify);
    }

    #[test]
    fn test_failure_reports_last_completed_stage() {
        let pipeline = pipeline(StubClassifier::returning(vec![0.1, 0.9]));
        let failure = pipeline.diagnose_detailed(b"garbage").unwrap_err();
        assert_eq!(failure.stage, PipelineStage::Received);
        assert!(matches!(failure.error, DiagnosisError::Decode(_)));
        assert!(failure.to_string().contains("after stage 'received'"));

        let pipeline = pipeline_failing();
        let failure = pipeline.diagnose_detailed(&leaf_png()).unwrap_err();
        assert_eq!(failure.stage, PipelineStage::Normalized);

        let pipeline = pipeline_with_width(3);
        let failure = pipeline.diagnose_detailed(&leaf_png()).unwrap_err();
        assert_eq!(failure.stage, PipelineStage::Classified);
    }

    fn pipeline_failing() -> DiagnosisPipeline {
        pipeline(StubClassifier::failing("runtime exploded").declaring(Some(2)))
    }

    fn pipeline_with_width(width: usize) -> DiagnosisPipeline {
        pipeline(StubClassifier::returning(vec![1.0 / width as f32; width]).declaring(None))
    }

    #[test]
    fn test_stage_display() {
        assert_eq!(PipelineStage::Normalized.to_string(), "normalized");
        assert_eq!(PipelineStage::Assembled.to_string(), "assembled");
    }
}
