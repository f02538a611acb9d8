//! Utilities: structured logging and error types

pub mod error;
pub mod logging;

// Re-export main types for convenience
pub use error::{DiagnosisError, Result};
pub use logging::{init_logging, LogConfig};
