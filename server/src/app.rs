//! Router assembly

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::routes;
use crate::state::SharedState;

pub fn build_router(state: SharedState) -> Router {
    let mut app = Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/predict", post(routes::predict::predict))
        .layer(DefaultBodyLimit::max(state.config.max_upload_bytes));

    if let Some(dir) = &state.config.frontend_dir {
        app = app.fallback_service(ServeDir::new(dir));
    }

    app.with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::sync::Arc;
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use image::{DynamicImage, ImageBuffer, ImageFormat, Rgb};
    use serde_json::Value;
    use tower::ServiceExt;

    use plant_diagnosis::inference::StubClassifier;
    use plant_diagnosis::{
        DiagnosisContext, DiagnosisPipeline, DiseaseRecord, DiseaseTable, LabelCatalog,
    };

    use crate::state::{AppState, ServerConfig};

    const BOUNDARY: &str = "leafboundary7MA4YWxkTrZu0gW";

    fn state_with(classifier: StubClassifier, config: ServerConfig) -> SharedState {
        let catalog =
            LabelCatalog::from_names(["Potato___Early_blight", "Potato___healthy"]).unwrap();
        let diseases = DiseaseTable::new(vec![DiseaseRecord {
            name: "Potato___Early_blight".to_string(),
            cause: "Fungus Alternaria solani".to_string(),
            cure: "Apply chlorothalonil and rotate crops".to_string(),
        }]);
        let context = DiagnosisContext::new(catalog, diseases, Box::new(classifier)).unwrap();
        let pipeline = DiagnosisPipeline::new(Arc::new(context));
        Arc::new(AppState::new(pipeline, config))
    }

    fn app(classifier: StubClassifier) -> Router {
        build_router(state_with(classifier, ServerConfig::default()))
    }

    fn leaf_jpeg() -> Vec<u8> {
        let img = ImageBuffer::from_fn(64, 48, |x, y| Rgb([(x * 3) as u8, 160, (y * 5) as u8]));
        let mut buf = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img)
            .write_to(&mut buf, ImageFormat::Jpeg)
            .unwrap();
        buf.into_inner()
    }

    /// Build a multipart body from `(field name, filename, content)` parts
    fn multipart(parts: &[(&str, Option<&str>, &[u8])]) -> Request<Body> {
        let mut body = Vec::new();
        for (name, file_name, content) in parts {
            body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
            let disposition = match file_name {
                Some(f) => format!("Content-Disposition: form-data; name=\"{name}\"; filename=\"{f}\"\r\n"),
                None => format!("Content-Disposition: form-data; name=\"{name}\"\r\n"),
            };
            body.extend_from_slice(disposition.as_bytes());
            body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
            body.extend_from_slice(content);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

        Request::builder()
            .method("POST")
            .uri("/predict")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    #[tokio::test]
    async fn test_predict_success() {
        let image = leaf_jpeg();
        let (status, body) = send(
            app(StubClassifier::returning(vec![0.9512, 0.0488])),
            multipart(&[("file", Some("leaf.jpg"), image.as_slice())]),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["predicted_class"], "Potato___Early_blight");
        assert_eq!(body["confidence"], 95.12);
        assert_eq!(body["cause"], "Fungus Alternaria solani");
        assert_eq!(body["cure"], "Apply chlorothalonil and rotate crops");
    }

    #[tokio::test]
    async fn test_predict_lookup_miss() {
        let image = leaf_jpeg();
        let (status, body) = send(
            app(StubClassifier::returning(vec![0.1, 0.9])),
            multipart(&[("file", Some("leaf.jpg"), image.as_slice())]),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["predicted_class"], "Potato___healthy");
        assert_eq!(body["cause"], "Unknown");
        assert_eq!(body["cure"], "No cure info found");
    }

    #[tokio::test]
    async fn test_missing_file_field() {
        let (status, body) = send(
            app(StubClassifier::returning(vec![0.5, 0.5])),
            multipart(&[("photo", Some("leaf.jpg"), b"bytes".as_slice())]),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "No file uploaded");
    }

    #[tokio::test]
    async fn test_file_field_without_filename_is_not_an_upload() {
        let (status, body) = send(
            app(StubClassifier::returning(vec![0.5, 0.5])),
            multipart(&[("file", None, b"just text".as_slice())]),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "No file uploaded");
    }

    #[tokio::test]
    async fn test_empty_filename() {
        let (status, body) = send(
            app(StubClassifier::returning(vec![0.5, 0.5])),
            multipart(&[("file", Some(""), b"".as_slice())]),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Empty filename");
    }

    #[tokio::test]
    async fn test_not_multipart() {
        let request = Request::builder()
            .method("POST")
            .uri("/predict")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{}"))
            .unwrap();
        let (status, body) = send(app(StubClassifier::returning(vec![0.5, 0.5])), request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid multipart request");
    }

    #[tokio::test]
    async fn test_non_image_then_valid_request() {
        let router = app(StubClassifier::returning(vec![0.2, 0.8]));

        let (status, body) = send(
            router.clone(),
            multipart(&[("file", Some("notes.txt"), b"definitely not pixels".as_slice())]),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().starts_with("Invalid image"));

        let image = leaf_jpeg();
        let (status, body) = send(router, multipart(&[("file", Some("leaf.jpg"), image.as_slice())])).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["predicted_class"], "Potato___healthy");
    }

    #[tokio::test]
    async fn test_classifier_failure_is_opaque() {
        let image = leaf_jpeg();
        let classifier = StubClassifier::failing("CUDA_ERROR_OUT_OF_MEMORY").declaring(Some(2));
        let (status, body) = send(
            app(classifier),
            multipart(&[("file", Some("leaf.jpg"), image.as_slice())]),
        )
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Internal server error");
    }

    #[tokio::test]
    async fn test_prediction_timeout() {
        let config = ServerConfig {
            inference_timeout: Duration::from_millis(20),
            ..ServerConfig::default()
        };
        let classifier =
            StubClassifier::returning(vec![0.5, 0.5]).with_delay(Duration::from_millis(300));
        let router = build_router(state_with(classifier, config));

        let image = leaf_jpeg();
        let (status, body) = send(router, multipart(&[("file", Some("leaf.jpg"), image.as_slice())])).await;

        assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(body["error"], "Prediction timed out");
    }

    #[tokio::test]
    async fn test_upload_over_limit() {
        let config = ServerConfig {
            max_upload_bytes: 256,
            ..ServerConfig::default()
        };
        let router = build_router(state_with(StubClassifier::returning(vec![0.5, 0.5]), config));

        let oversized = vec![0u8; 4096];
        let (status, body) = send(router, multipart(&[("file", Some("leaf.jpg"), oversized.as_slice())])).await;

        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(body["error"], "Upload too large");
    }

    #[tokio::test]
    async fn test_health() {
        let request = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(app(StubClassifier::returning(vec![0.5, 0.5])), request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["num_classes"], 2);
        assert_eq!(body["model_format"], "stub");
    }

    #[tokio::test]
    async fn test_frontend_fallback() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "<h1>Leaf doctor</h1>").unwrap();

        let config = ServerConfig {
            frontend_dir: Some(dir.path().to_path_buf()),
            ..ServerConfig::default()
        };
        let router = build_router(state_with(StubClassifier::returning(vec![0.5, 0.5]), config));

        let request = Request::builder().uri("/").body(Body::empty()).unwrap();
        let response = router.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
