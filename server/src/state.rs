//! Application state for the diagnosis server
//!
//! Holds the loaded pipeline and the server settings. Everything here is
//! read-only after startup.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use plant_diagnosis::DiagnosisPipeline;

/// Server configuration
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Directory served as the router fallback (index.html at `/`)
    pub frontend_dir: Option<PathBuf>,
    /// Upper bound on one prediction, measured from upload receipt
    pub inference_timeout: Duration,
    /// Request body limit for `/predict`
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            frontend_dir: None,
            inference_timeout: Duration::from_secs(30),
            max_upload_bytes: 16 * 1024 * 1024,
        }
    }
}

/// Shared application state
pub struct AppState {
    pub pipeline: DiagnosisPipeline,
    pub config: ServerConfig,
    /// Server start time
    pub started_at: Instant,
}

impl AppState {
    pub fn new(pipeline: DiagnosisPipeline, config: ServerConfig) -> Self {
        Self {
            pipeline,
            config,
            started_at: Instant::now(),
        }
    }

    /// Get uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}

pub type SharedState = Arc<AppState>;
