//! Deterministic classifier for tests and dry runs without a model artifact

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use super::classifier::Classifier;
use super::normalizer::NormalizedImage;
use crate::utils::error::{DiagnosisError, Result};

/// Returns a fixed probability vector (or a fixed error) for every image
#[derive(Debug)]
pub struct StubClassifier {
    outcome: std::result::Result<Vec<f32>, String>,
    declared_classes: Option<usize>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl StubClassifier {
    /// Always answer with `probabilities`, declaring their length as the output width
    pub fn returning(probabilities: Vec<f32>) -> Self {
        let declared_classes = Some(probabilities.len());
        Self {
            outcome: Ok(probabilities),
            declared_classes,
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Always fail with an inference error
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            outcome: Err(message.into()),
            declared_classes: None,
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Override the declared output width
    pub fn declaring(mut self, num_classes: Option<usize>) -> Self {
        self.declared_classes = num_classes;
        self
    }

    /// Sleep before answering
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of `classify` calls so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Classifier for StubClassifier {
    fn classify(&self, _image: &NormalizedImage) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        self.outcome
            .clone()
            .map_err(DiagnosisError::Inference)
    }

    fn num_classes(&self) -> Option<usize> {
        self.declared_classes
    }

    fn runtime(&self) -> &'static str {
        "stub"
    }
}
