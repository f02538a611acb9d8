//! Classifier interface
//!
//! The pretrained model is a black box behind [`Classifier`]: a normalized
//! image goes in, a probability vector indexed like the label catalog comes
//! out. Runtimes are chosen by [`ModelFormat`].

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::normalizer::NormalizedImage;
use crate::utils::error::{DiagnosisError, Result};

/// A loaded model that maps one image to class probabilities
///
/// Implementations are shared by every in-flight request and must be safe to
/// call concurrently, serializing internally if the runtime requires it.
pub trait Classifier: Send + Sync {
    /// Softmax probabilities, one per catalog class
    fn classify(&self, image: &NormalizedImage) -> Result<Vec<f32>>;

    /// Output width declared by the artifact, if the runtime can tell
    fn num_classes(&self) -> Option<usize>;

    /// Short runtime name for logs and health output
    fn runtime(&self) -> &'static str;
}

impl<C: Classifier + ?Sized> Classifier for std::sync::Arc<C> {
    fn classify(&self, image: &NormalizedImage) -> Result<Vec<f32>> {
        (**self).classify(image)
    }

    fn num_classes(&self) -> Option<usize> {
        (**self).num_classes()
    }

    fn runtime(&self) -> &'static str {
        (**self).runtime()
    }
}

/// On-disk model artifact format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ModelFormat {
    /// ONNX graph run with tract
    Onnx,
    /// Burn `CompactRecorder` record of the in-house CNN
    Burn,
}

impl ModelFormat {
    /// Infer the format from a file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        match ext.as_str() {
            "onnx" => Some(ModelFormat::Onnx),
            "mpk" => Some(ModelFormat::Burn),
            _ => None,
        }
    }

    /// Explicit format if given, otherwise inferred from the path
    pub fn resolve(explicit: Option<Self>, path: &Path) -> Result<Self> {
        explicit.or_else(|| Self::from_path(path)).ok_or_else(|| {
            DiagnosisError::Config(format!(
                "cannot infer model format from {:?}; expected a .onnx or .mpk file or an explicit format",
                path
            ))
        })
    }
}

impl std::fmt::Display for ModelFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelFormat::Onnx => write!(f, "onnx"),
            ModelFormat::Burn => write!(f, "burn"),
        }
    }
}

/// Load a model artifact with the runtime matching `format`
///
/// `num_classes` sizes the output head for runtimes whose artifacts do not
/// carry the architecture (Burn records).
pub fn load_classifier(
    path: &Path,
    format: ModelFormat,
    num_classes: usize,
) -> Result<Box<dyn Classifier>> {
    if !path.exists() {
        return Err(DiagnosisError::ModelLoad(
            path.to_path_buf(),
            "file not found".to_string(),
        ));
    }

    tracing::info!("Loading {} model from {:?}", format, path);
    let classifier: Box<dyn Classifier> = match format {
        ModelFormat::Onnx => Box::new(super::onnx::OnnxClassifier::load(path)?),
        ModelFormat::Burn => Box::new(super::burn_runtime::BurnClassifier::load(path, num_classes)?),
    };
    tracing::info!("Model loaded ({} runtime)", classifier.runtime());

    Ok(classifier)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_format_from_extension() {
        assert_eq!(
            ModelFormat::from_path(Path::new("model/plant.onnx")),
            Some(ModelFormat::Onnx)
        );
        assert_eq!(
            ModelFormat::from_path(Path::new("best_model.MPK")),
            Some(ModelFormat::Burn)
        );
        assert_eq!(ModelFormat::from_path(Path::new("plant_disease_model_final.h5")), None);
        assert_eq!(ModelFormat::from_path(Path::new("model")), None);
    }

    #[test]
    fn test_explicit_format_wins() {
        let path = PathBuf::from("weights.bin");
        assert!(ModelFormat::resolve(None, &path).is_err());
        assert_eq!(
            ModelFormat::resolve(Some(ModelFormat::Burn), &path).unwrap(),
            ModelFormat::Burn
        );
    }

    #[test]
    fn test_missing_artifact_is_model_load_error() {
        let err = load_classifier(Path::new("/nonexistent/model.onnx"), ModelFormat::Onnx, 3)
            .err()
            .unwrap();
        assert!(matches!(err, DiagnosisError::ModelLoad(_, _)));
    }
}
