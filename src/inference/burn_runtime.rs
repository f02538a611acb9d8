//! Burn classifier runtime
//!
//! Serves a `PlantClassifier` record saved with `CompactRecorder`. The network
//! was trained on ImageNet-standardized NCHW input, so the [0, 1] NHWC tensor
//! from the normalizer is permuted and standardized here before the forward
//! pass.

use std::path::Path;
use std::sync::Mutex;

use burn::{
    module::Module,
    record::CompactRecorder,
    tensor::{Tensor, TensorData},
};

use super::classifier::Classifier;
use super::normalizer::NormalizedImage;
use crate::backend::{backend_name, default_device, DefaultBackend, DefaultDevice};
use crate::model::cnn::{PlantClassifier, PlantClassifierConfig};
use crate::utils::error::{DiagnosisError, Result};

/// ImageNet normalization mean values (RGB)
const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
/// ImageNet normalization std values (RGB)
const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Burn CNN loaded on the default backend
pub struct BurnClassifier {
    // Module parameters are lazily initialized and not Sync; one forward pass at a time
    model: Mutex<PlantClassifier<DefaultBackend>>,
    device: DefaultDevice,
    num_classes: usize,
}

impl BurnClassifier {
    /// Load a record whose head has `num_classes` outputs
    pub fn load(path: &Path, num_classes: usize) -> Result<Self> {
        let device = default_device();
        let config = PlantClassifierConfig::new().with_num_classes(num_classes);
        let recorder = CompactRecorder::new();

        let model = PlantClassifier::<DefaultBackend>::new(&config, &device)
            .load_file(path, &recorder, &device)
            .map_err(|e| DiagnosisError::ModelLoad(path.to_path_buf(), format!("{:?}", e)))?;

        tracing::debug!("Burn model ready on {}", backend_name());
        Ok(Self::from_model(model, device))
    }

    /// Wrap an already constructed model
    pub fn from_model(model: PlantClassifier<DefaultBackend>, device: DefaultDevice) -> Self {
        let num_classes = model.num_classes();
        Self {
            model: Mutex::new(model),
            device,
            num_classes,
        }
    }

    /// NHWC [0, 1] → ImageNet-standardized NCHW
    fn to_input(&self, image: &NormalizedImage) -> Tensor<DefaultBackend, 4> {
        let [n, h, w, c] = image.shape();
        let nhwc = Tensor::<DefaultBackend, 4>::from_data(
            TensorData::new(image.as_slice().to_vec(), [n, h, w, c]),
            &self.device,
        );
        let nchw = nhwc.permute([0, 3, 1, 2]);

        let mean = Tensor::<DefaultBackend, 4>::from_data(
            TensorData::new(IMAGENET_MEAN.to_vec(), [1, 3, 1, 1]),
            &self.device,
        );
        let std = Tensor::<DefaultBackend, 4>::from_data(
            TensorData::new(IMAGENET_STD.to_vec(), [1, 3, 1, 1]),
            &self.device,
        );

        (nchw - mean) / std
    }
}

impl Classifier for BurnClassifier {
    fn classify(&self, image: &NormalizedImage) -> Result<Vec<f32>> {
        let input = self.to_input(image);

        let model = self
            .model
            .lock()
            .map_err(|_| DiagnosisError::Inference("model lock poisoned".to_string()))?;
        let probs = model.forward_softmax(input);
        drop(model);

        probs
            .into_data()
            .to_vec::<f32>()
            .map_err(|e| DiagnosisError::Inference(format!("{:?}", e)))
    }

    fn num_classes(&self) -> Option<usize> {
        Some(self.num_classes)
    }

    fn runtime(&self) -> &'static str {
        "burn"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::normalizer::ImageNormalizer;
    use image::{DynamicImage, ImageBuffer, Rgb};

    fn small_classifier(num_classes: usize) -> BurnClassifier {
        let device = default_device();
        let model = PlantClassifierConfig::new()
            .with_num_classes(num_classes)
            .with_base_filters(4)
            .init::<DefaultBackend>(&device);
        BurnClassifier::from_model(model, device)
    }

    #[test]
    fn test_classify_returns_distribution() {
        let classifier = small_classifier(4);
        let img = ImageBuffer::from_pixel(128, 128, Rgb([90u8, 140, 60]));
        let tensor = ImageNormalizer::new().normalize(&DynamicImage::ImageRgb8(img));

        let probs = classifier.classify(&tensor).unwrap();

        assert_eq!(probs.len(), 4);
        assert!(probs.iter().all(|&p| p >= 0.0));
        let sum: f32 = probs.iter().sum();
        assert!((sum - 1.0).abs() < 1e-4);
        assert_eq!(classifier.num_classes(), Some(4));
    }

    #[test]
    fn test_missing_record_fails_to_load() {
        let err = BurnClassifier::load(Path::new("/nonexistent/model.mpk"), 3)
            .err()
            .unwrap();
        assert!(matches!(err, DiagnosisError::ModelLoad(_, _)));
    }
}
