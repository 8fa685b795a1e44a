use axum::{
    Json,
    extract::multipart::{MultipartError, MultipartRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use classifier::ClassifierError;
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("multipart field `file` is required")]
    MissingFile,

    #[error("malformed multipart body: {0}")]
    Multipart(#[from] MultipartError),

    #[error("{}", .0.body_text())]
    NotMultipart(#[from] MultipartRejection),

    #[error(transparent)]
    Classifier(#[from] ClassifierError),

    #[error("inference task failed: {0}")]
    Task(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingFile => StatusCode::BAD_REQUEST,
            ApiError::Multipart(e) => e.status(),
            ApiError::NotMultipart(rejection) => rejection.status(),
            ApiError::Classifier(ClassifierError::InvalidImage(_)) => StatusCode::BAD_REQUEST,
            ApiError::Classifier(ClassifierError::ShapeMismatch { .. }) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            ApiError::Classifier(_) | ApiError::Task(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short label for the `outcome` metric attribute.
    pub fn outcome(&self) -> &'static str {
        match self {
            ApiError::MissingFile | ApiError::Multipart(_) | ApiError::NotMultipart(_) => {
                "bad_request"
            }
            ApiError::Classifier(ClassifierError::InvalidImage(_)) => "invalid_image",
            ApiError::Classifier(ClassifierError::ShapeMismatch { .. }) => "shape_mismatch",
            ApiError::Classifier(_) | ApiError::Task(_) => "internal_error",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "Prediction failed");
        } else {
            tracing::warn!(error = %self, "Rejected prediction request");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
