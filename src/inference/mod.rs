//! Inference pipeline: normalization, classification and prediction assembly
//!
//! This module provides:
//! - `normalizer`: bytes → fixed-shape `[1, 128, 128, 3]` tensor
//! - `classifier`: the `Classifier` trait and runtime selection
//! - `onnx` / `burn_runtime`: tract and Burn classifier runtimes
//! - `assembler`: arg-max, confidence and disease lookup
//! - `context`: startup artifacts shared by every request
//! - `pipeline`: per-request orchestration
//! - `benchmark`: latency measurement of the whole pipeline

pub mod assembler;
pub mod benchmark;
pub mod burn_runtime;
pub mod classifier;
pub mod context;
pub mod normalizer;
pub mod onnx;
pub mod pipeline;
pub mod stub;

// Re-export main types for convenience
pub use assembler::{PredictionAssembler, PredictionResult, RankedClass};
pub use benchmark::{run_benchmark, BenchmarkConfig, BenchmarkResult, LatencyStats};
pub use classifier::{load_classifier, Classifier, ModelFormat};
pub use context::{ContextConfig, DiagnosisContext};
pub use normalizer::{ImageNormalizer, NormalizedImage};
pub use pipeline::{Diagnosis, DiagnosisPipeline, PipelineStage, StageFailure, StageTimings};
pub use stub::StubClassifier;

/// Default number of classes reported in the top-k listing
pub const TOP_K: usize = 5;
