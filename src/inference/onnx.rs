//! ONNX classifier runtime (tract)
//!
//! Runs the Keras-trained model exported to ONNX. The graph takes an NHWC
//! float tensor `[1, 128, 128, 3]` in [0, 1] and ends in a softmax.

use std::path::Path;

use tract_onnx::prelude::*;

use super::classifier::Classifier;
use super::normalizer::NormalizedImage;
use crate::utils::error::{DiagnosisError, Result};
use crate::{CHANNELS, IMAGE_SIZE};

type Plan = TypedRunnableModel<TypedModel>;

/// Optimized tract plan for the exported model
pub struct OnnxClassifier {
    plan: Plan,
    num_classes: Option<usize>,
}

impl OnnxClassifier {
    /// Load and optimize an ONNX file, pinning the input to the normalizer's shape
    pub fn load(path: &Path) -> Result<Self> {
        let model_err = |e: TractError| DiagnosisError::ModelLoad(path.to_path_buf(), format!("{:#}", e));

        let plan = tract_onnx::onnx()
            .model_for_path(path)
            .map_err(model_err)?
            .with_input_fact(
                0,
                InferenceFact::dt_shape(
                    f32::datum_type(),
                    tvec!(1, IMAGE_SIZE, IMAGE_SIZE, CHANNELS),
                ),
            )
            .map_err(model_err)?
            .into_optimized()
            .map_err(model_err)?
            .into_runnable()
            .map_err(model_err)?;

        let num_classes = plan
            .model()
            .output_fact(0)
            .ok()
            .and_then(|fact| fact.shape.as_concrete().map(|dims| dims.to_vec()))
            .and_then(|dims| dims.last().copied());

        match num_classes {
            Some(n) => tracing::debug!("ONNX model declares {} output classes", n),
            None => tracing::debug!("ONNX model output width is symbolic"),
        }

        Ok(Self { plan, num_classes })
    }
}

impl Classifier for OnnxClassifier {
    fn classify(&self, image: &NormalizedImage) -> Result<Vec<f32>> {
        let shape = image.shape();
        let input = tract_ndarray::Array4::from_shape_vec(
            (shape[0], shape[1], shape[2], shape[3]),
            image.as_slice().to_vec(),
        )
        .map_err(|e| DiagnosisError::Inference(e.to_string()))?;

        let outputs = self
            .plan
            .run(tvec!(input.into_tensor().into()))
            .map_err(|e| DiagnosisError::Inference(format!("{:#}", e)))?;

        let output = outputs
            .first()
            .ok_or_else(|| DiagnosisError::Inference("model produced no outputs".to_string()))?;
        let view = output
            .to_array_view::<f32>()
            .map_err(|e| DiagnosisError::Inference(format!("{:#}", e)))?;

        // [1, num_classes] → the single batch row
        Ok(view.iter().copied().collect())
    }

    fn num_classes(&self) -> Option<usize> {
        self.num_classes
    }

    fn runtime(&self) -> &'static str {
        "onnx"
    }
}
