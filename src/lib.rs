//! # Plant Diagnosis
//!
//! A Rust library for diagnosing plant leaf diseases from a single photo.
//! An uploaded image is normalized into the tensor shape the pretrained model
//! expects, classified, and the winning label is joined against a static table
//! of causes and cures.
//!
//! ## Modules
//!
//! - `catalog`: Label catalog (class name ↔ model output index) and disease reference table
//! - `inference`: Image normalization, classifier runtimes, prediction assembly and the request pipeline
//! - `model`: CNN architecture built with Burn, used by the Burn classifier runtime
//! - `utils`: Logging and error types
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use plant_diagnosis::{ContextConfig, DiagnosisContext, DiagnosisPipeline};
//!
//! let context = DiagnosisContext::load(&ContextConfig::default())?;
//! let pipeline = DiagnosisPipeline::new(std::sync::Arc::new(context));
//! let result = pipeline.diagnose(&std::fs::read("leaf.jpg")?)?;
//! println!("{} ({:.2}%)", result.predicted_class, result.confidence);
//! ```

pub mod backend;
pub mod catalog;
pub mod inference;
pub mod model;
pub mod utils;

// Re-export commonly used items for convenience
pub use catalog::{DiseaseRecord, DiseaseTable, LabelCatalog};
pub use inference::assembler::{PredictionAssembler, PredictionResult};
pub use inference::classifier::{Classifier, ModelFormat};
pub use inference::context::{ContextConfig, DiagnosisContext};
pub use inference::normalizer::{ImageNormalizer, NormalizedImage};
pub use inference::pipeline::{DiagnosisPipeline, PipelineStage};
pub use utils::error::{DiagnosisError, Result};

/// Side length of the square image the classifier consumes
pub const IMAGE_SIZE: usize = 128;

/// Number of color channels (RGB)
pub const CHANNELS: usize = 3;

/// Version of the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
