//! Plant Diagnosis Server
//!
//! HTTP API in front of the diagnosis pipeline. `POST /predict` takes a leaf
//! photo as multipart form data and returns the predicted class with its cause
//! and cure; `GET /health` reports liveness and the loaded model.

mod app;
mod error;
mod routes;
mod state;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info};

use plant_diagnosis::utils::logging::{init_logging, LogConfig};
use plant_diagnosis::{ContextConfig, DiagnosisContext, DiagnosisPipeline, ModelFormat};

use crate::state::{AppState, ServerConfig};

/// Plant Diagnosis Server
#[derive(Parser, Debug)]
#[command(name = "plant-diagnosis-server")]
#[command(version)]
#[command(about = "HTTP API server for plant leaf disease diagnosis")]
struct Cli {
    /// Port to listen on
    #[arg(short, long, env = "PLANT_DIAGNOSIS_PORT", default_value = "5000")]
    port: u16,

    /// Host to bind to
    #[arg(long, env = "PLANT_DIAGNOSIS_HOST", default_value = "0.0.0.0")]
    host: String,

    /// Model artifact (.onnx or Burn .mpk)
    #[arg(long, env = "PLANT_DIAGNOSIS_MODEL", default_value = "model/plant_disease_model.onnx")]
    model: PathBuf,

    /// Model format; inferred from the extension when omitted
    #[arg(long, env = "PLANT_DIAGNOSIS_MODEL_FORMAT", value_enum)]
    model_format: Option<ModelFormat>,

    /// Class-index JSON
    #[arg(long, env = "PLANT_DIAGNOSIS_LABELS", default_value = "model/class_indices.json")]
    labels: PathBuf,

    /// Disease-info JSON
    #[arg(long, env = "PLANT_DIAGNOSIS_DISEASES", default_value = "model/plant_disease.json")]
    diseases: PathBuf,

    /// Directory with a static frontend to serve at `/`
    #[arg(long, env = "PLANT_DIAGNOSIS_FRONTEND_DIR")]
    frontend_dir: Option<PathBuf>,

    /// Seconds before a prediction is abandoned
    #[arg(long, env = "PLANT_DIAGNOSIS_INFERENCE_TIMEOUT_SECS", default_value = "30")]
    inference_timeout_secs: u64,

    /// Maximum request body size for uploads
    #[arg(long, env = "PLANT_DIAGNOSIS_MAX_UPLOAD_BYTES", default_value = "16777216")]
    max_upload_bytes: usize,

    /// Enable verbose logging
    #[arg(short, long, default_value = "false")]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_config = if cli.verbose {
        LogConfig::verbose()
    } else {
        LogConfig::production()
    };
    init_logging(&log_config).map_err(anyhow::Error::msg)?;

    info!("Plant Diagnosis Server v{}", env!("CARGO_PKG_VERSION"));

    let context_config = ContextConfig {
        model_path: cli.model,
        model_format: cli.model_format,
        labels_path: cli.labels,
        diseases_path: cli.diseases,
    };
    info!("Configuration:");
    info!("  Model:    {:?}", context_config.model_path);
    info!("  Labels:   {:?}", context_config.labels_path);
    info!("  Diseases: {:?}", context_config.diseases_path);

    // No partially initialized service: any artifact problem ends the process
    let context = match DiagnosisContext::load(&context_config) {
        Ok(context) => context,
        Err(e) => {
            error!("Startup failed: {}", e);
            return Err(e.into());
        }
    };
    info!(
        "Loaded {} classes, {} disease records ({} runtime)",
        context.catalog().len(),
        context.diseases().len(),
        context.classifier().runtime()
    );

    let config = ServerConfig {
        frontend_dir: cli.frontend_dir,
        inference_timeout: Duration::from_secs(cli.inference_timeout_secs),
        max_upload_bytes: cli.max_upload_bytes,
    };
    if let Some(dir) = &config.frontend_dir {
        if !dir.is_dir() {
            tracing::warn!("Frontend directory {:?} does not exist", dir);
        }
        info!("  Frontend: {:?}", dir);
    }

    let pipeline = DiagnosisPipeline::new(Arc::new(context));
    let state = Arc::new(AppState::new(pipeline, config));
    let app = app::build_router(state);

    let addr: SocketAddr = format!("{}:{}", cli.host, cli.port).parse()?;
    info!("Starting server on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
