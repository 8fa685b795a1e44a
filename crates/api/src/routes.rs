use crate::{error::ApiError, state::AppState};
use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, State, multipart::MultipartRejection},
    http::Method,
    routing::{get, post},
};
use classifier::{ClassificationResult, InferenceBackend};
use std::time::Instant;
use tower_http::cors::{Any, CorsLayer};

pub const PING_MESSAGE: &str = "Hello, i'm alive";
const UPLOAD_FIELD: &str = "file";

pub fn router<B: InferenceBackend + 'static>(state: AppState<B>, max_upload_bytes: usize) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    Router::new()
        .route("/ping", get(ping))
        .route("/predict", post(predict::<B>))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(cors)
        .with_state(state)
}

async fn ping() -> Json<&'static str> {
    Json(PING_MESSAGE)
}

async fn predict<B: InferenceBackend + 'static>(
    State(state): State<AppState<B>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<ClassificationResult>, ApiError> {
    let start = Instant::now();
    let result = match multipart {
        Ok(multipart) => classify_upload(&state, multipart).await,
        Err(rejection) => Err(rejection.into()),
    };

    match &result {
        Ok(_) => state
            .metrics
            .record("ok", Some(start.elapsed().as_secs_f64())),
        Err(e) => state.metrics.record(e.outcome(), None),
    }

    result.map(Json)
}

async fn classify_upload<B: InferenceBackend + 'static>(
    state: &AppState<B>,
    mut multipart: Multipart,
) -> Result<ClassificationResult, ApiError> {
    let bytes = loop {
        let Some(field) = multipart.next_field().await? else {
            return Err(ApiError::MissingFile);
        };
        if field.name() == Some(UPLOAD_FIELD) {
            break field.bytes().await?;
        }
    };

    tracing::debug!(bytes = bytes.len(), "Received upload");

    let classifier = state.classifier.clone();
    let result = tokio::task::spawn_blocking(move || classifier.classify_image(&bytes))
        .await
        .map_err(|e| ApiError::Task(e.to_string()))??;

    tracing::info!(
        label = %result.label,
        confidence = result.confidence,
        "Prediction served"
    );

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode, header},
    };
    use classifier::{Classifier, ClassifierOptions, InputBatch, ModelSignature, Vocabulary};
    use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
    use ndarray::{Array2, Axis};
    use serde_json::Value;
    use std::io::Cursor;
    use tower::ServiceExt;

    const BOUNDARY: &str = "soil-test-boundary";

    /// Fixed-size RGB model scoring each class by its channel mean (in 0..1).
    struct StubBackend {
        signature: ModelSignature,
        fixed: Option<Vec<f32>>,
    }

    impl InferenceBackend for StubBackend {
        fn signature(&self) -> &ModelSignature {
            &self.signature
        }

        fn infer(&self, batch: &InputBatch) -> classifier::Result<Array2<f32>> {
            if let Some(fixed) = &self.fixed {
                return Ok(Array2::from_shape_vec((1, fixed.len()), fixed.clone()).unwrap());
            }
            let mut scores = vec![0.0f32; 4];
            for (c, lane) in batch.image().axis_iter(Axis(2)).enumerate() {
                scores[c] = lane.mean().unwrap_or(0.0) / 255.0;
            }
            Ok(Array2::from_shape_vec((1, 4), scores).unwrap())
        }
    }

    fn app() -> Router {
        app_with(StubBackend {
            signature: ModelSignature::dynamic("input", "output")
                .with_channels(3)
                .with_num_classes(4),
            fixed: None,
        })
    }

    fn app_with(backend: StubBackend) -> Router {
        let classifier =
            Classifier::new(backend, Vocabulary::soil_types(), ClassifierOptions::default())
                .unwrap();
        router(AppState::new(classifier), 1024 * 1024)
    }

    fn png(rgb: [u8; 3]) -> Vec<u8> {
        let mut bytes = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(RgbImage::from_pixel(8, 8, Rgb(rgb)))
            .write_to(&mut bytes, ImageFormat::Png)
            .unwrap();
        bytes.into_inner()
    }

    fn multipart_request(field: &str, content: &[u8]) -> Request<Body> {
        let mut body = Vec::new();
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{field}\"; filename=\"soil.png\"\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
        body.extend_from_slice(content);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

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

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_ping() {
        let response = app()
            .oneshot(Request::get("/ping").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, Value::from(PING_MESSAGE));
    }

    #[tokio::test]
    async fn test_predict_returns_class_and_confidence() {
        let response = app()
            .oneshot(multipart_request("file", &png([0, 0, 255])))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        let object = body.as_object().unwrap();
        assert_eq!(object.len(), 2, "exactly class and confidence: {body}");
        assert_eq!(body["class"], "Clay Soil");
        assert!((body["confidence"].as_f64().unwrap() - 1.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_predict_without_file_field_is_bad_request() {
        let response = app()
            .oneshot(multipart_request("image", &png([1, 2, 3])))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert!(body["error"].as_str().unwrap().contains("file"));
    }

    #[tokio::test]
    async fn test_predict_with_garbage_is_bad_request() {
        let response = app()
            .oneshot(multipart_request("file", b"not an image at all"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert!(body["error"].as_str().unwrap().starts_with("invalid image"));
    }

    #[tokio::test]
    async fn test_predict_with_wrong_channel_count_is_unprocessable() {
        let mut bytes = Cursor::new(Vec::new());
        DynamicImage::ImageLuma8(image::GrayImage::from_pixel(4, 4, image::Luma([9])))
            .write_to(&mut bytes, ImageFormat::Png)
            .unwrap();

        let response = app()
            .oneshot(multipart_request("file", &bytes.into_inner()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_predict_requires_multipart_content_type() {
        let request = Request::post("/predict")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{}"))
            .unwrap();

        let response = app().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert!(
            body["error"].as_str().unwrap().contains("boundary"),
            "unexpected error body: {body}"
        );
    }

    #[tokio::test]
    async fn test_predict_without_content_type_returns_json_error() {
        let request = Request::post("/predict").body(Body::from("raw bytes")).unwrap();

        let response = app().oneshot(request).await.unwrap();

        assert!(response.status().is_client_error());
        let body = json_body(response).await;
        assert!(body["error"].is_string(), "unexpected error body: {body}");
    }

    #[tokio::test]
    async fn test_non_finite_score_is_internal_error() {
        let app = app_with(StubBackend {
            signature: ModelSignature::dynamic("input", "output")
                .with_channels(3)
                .with_num_classes(4),
            fixed: Some(vec![0.1, f32::NAN, 0.2, 0.3]),
        });

        let response = app
            .oneshot(multipart_request("file", &png([1, 2, 3])))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = json_body(response).await;
        assert!(body.get("confidence").is_none());
        assert!(body["error"].as_str().unwrap().contains("non-finite"));
    }

    #[tokio::test]
    async fn test_cors_allows_any_origin() {
        let request = Request::builder()
            .method("OPTIONS")
            .uri("/predict")
            .header(header::ORIGIN, "http://localhost:3000")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .body(Body::empty())
            .unwrap();

        let response = app().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "*"
        );
    }
}
