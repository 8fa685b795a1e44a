pub mod backend;
pub mod decode;
pub mod engine;
pub mod error;
pub mod pipeline;
pub mod postprocessing;
pub mod preprocessing;
pub mod tensor;
pub mod vocabulary;

// Re-export commonly used types for convenience
pub use backend::{InferenceBackend, ModelSignature};
pub use decode::ImageDecoder;
pub use engine::InferenceEngine;
pub use error::{ClassifierError, Result};
pub use pipeline::{Classifier, ClassifierOptions};
pub use postprocessing::{ClassificationResult, ResultInterpreter};
pub use preprocessing::{PixelScale, TensorPreprocessor};
pub use tensor::{ClassScores, DecodedImage, InputBatch};
pub use vocabulary::Vocabulary;
