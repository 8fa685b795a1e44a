use thiserror::Error;

pub type Result<T, E = ClassifierError> = std::result::Result<T, E>;

#[derive(Error, Debug)]
pub enum ClassifierError {
    #[error("invalid image: {0}")]
    InvalidImage(String),

    #[error("shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch { expected: String, actual: String },

    #[error("vocabulary has {labels} labels but the model produces {outputs} scores")]
    VocabularyMismatch { labels: usize, outputs: usize },

    #[error("vocabulary must contain at least one non-blank label")]
    EmptyVocabulary,

    #[error("model runtime error: {0}")]
    Backend(#[source] anyhow::Error),
}

impl ClassifierError {
    pub fn shape_mismatch(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::ShapeMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    pub fn backend(err: impl Into<anyhow::Error>) -> Self {
        Self::Backend(err.into())
    }

    /// Failures caused by the uploaded content rather than the deployment.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidImage(_) | Self::ShapeMismatch { .. })
    }
}

impl From<image::ImageError> for ClassifierError {
    fn from(err: image::ImageError) -> Self {
        Self::InvalidImage(err.to_string())
    }
}
