//! Prediction endpoint
//!
//! `POST /predict` takes a multipart form with the leaf photo in the `file`
//! field and answers with the diagnosis record.

use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    Json,
};
use tracing::{debug, error, info};

use plant_diagnosis::{DiagnosisError, PredictionResult};

use crate::error::{ApiError, EMPTY_FILENAME, INVALID_MULTIPART, NO_FILE};
use crate::state::SharedState;

/// Multipart field carrying the image
pub const UPLOAD_FIELD: &str = "file";

/// A received image, held in memory for the lifetime of the request
#[derive(Debug)]
pub struct Upload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Pull the first `file` part that carries a filename out of the form
///
/// Parts named `file` without a filename are plain form values, not uploads.
pub async fn read_upload(mut multipart: Multipart) -> Result<Upload, ApiError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let Some(file_name) = field.file_name().map(str::to_owned) else {
            continue;
        };
        if file_name.is_empty() {
            return Err(DiagnosisError::MissingInput(EMPTY_FILENAME.to_string()).into());
        }

        let bytes = field.bytes().await?.to_vec();
        return Ok(Upload { file_name, bytes });
    }

    Err(DiagnosisError::MissingInput(NO_FILE.to_string()).into())
}

/// POST /predict - Diagnose an uploaded leaf image
pub async fn predict(
    State(state): State<SharedState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<PredictionResult>, ApiError> {
    let multipart = multipart.map_err(|e| {
        debug!("Rejected /predict request: {}", e);
        ApiError::bad_request(INVALID_MULTIPART)
    })?;

    let upload = read_upload(multipart).await?;
    info!("Received '{}' ({} bytes)", upload.file_name, upload.bytes.len());

    let pipeline = state.pipeline.clone();
    let limit = state.config.inference_timeout;
    let task = tokio::task::spawn_blocking(move || pipeline.diagnose(&upload.bytes));

    let result = match tokio::time::timeout(limit, task).await {
        Ok(Ok(outcome)) => outcome?,
        Ok(Err(join_error)) => {
            error!("Prediction task aborted: {}", join_error);
            return Err(ApiError::internal());
        }
        Err(_) => return Err(DiagnosisError::Timeout(limit).into()),
    };

    info!(
        "Predicted '{}' ({:.2}%)",
        result.predicted_class, result.confidence
    );
    Ok(Json(result))
}
