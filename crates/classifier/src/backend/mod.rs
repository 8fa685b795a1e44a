use crate::{error::Result, tensor::InputBatch};
use ndarray::Array2;

#[cfg(feature = "ort-backend")]
pub mod ort;

/// A loaded classification model.
///
/// Implementations are shared read-only between concurrent requests; any
/// interior locking a runtime needs lives inside the implementation.
pub trait InferenceBackend: Send + Sync {
    /// Input/output layout declared by the model.
    fn signature(&self) -> &ModelSignature;

    /// Run the model on one batch, returning scores shaped (rows, classes).
    fn infer(&self, batch: &InputBatch) -> Result<Array2<f32>>;
}

/// Tensor layout a model declares. `None` marks a dimension resolved at
/// inference time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSignature {
    pub input_name: String,
    pub output_name: String,
    pub height: Option<usize>,
    pub width: Option<usize>,
    pub channels: Option<usize>,
    pub num_classes: Option<usize>,
}

impl ModelSignature {
    /// Signature with every dimension dynamic.
    pub fn dynamic(input_name: impl Into<String>, output_name: impl Into<String>) -> Self {
        Self {
            input_name: input_name.into(),
            output_name: output_name.into(),
            height: None,
            width: None,
            channels: None,
            num_classes: None,
        }
    }

    pub fn with_channels(mut self, channels: usize) -> Self {
        self.channels = Some(channels);
        self
    }

    pub fn with_spatial(mut self, height: usize, width: usize) -> Self {
        self.height = Some(height);
        self.width = Some(width);
        self
    }

    pub fn with_num_classes(mut self, num_classes: usize) -> Self {
        self.num_classes = Some(num_classes);
        self
    }

    /// Expected input shape, (batch, height, width, channels).
    pub fn input_shape(&self) -> [Option<usize>; 4] {
        [
            Some(InputBatch::BATCH_SIZE),
            self.height,
            self.width,
            self.channels,
        ]
    }
}
