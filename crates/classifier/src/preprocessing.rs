use crate::tensor::{DecodedImage, InputBatch};
use common::span;
use serde::Deserialize;
use std::str::FromStr;

const U8_MAX: f32 = 255.0;

/// Value range the model was trained on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PixelScale {
    /// Decoder output passed through untouched.
    #[default]
    Raw,
    /// Every sample divided by 255. Assumes 8-bit sources: 16-bit images
    /// land in roughly 0..=257 and float images are scaled down as well.
    Unit,
}

impl PixelScale {
    pub fn as_str(&self) -> &'static str {
        match self {
            PixelScale::Raw => "raw",
            PixelScale::Unit => "unit",
        }
    }
}

impl FromStr for PixelScale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "raw" => Ok(Self::Raw),
            "unit" => Ok(Self::Unit),
            other => Err(format!(
                "{} is not a supported pixel scale. Use either `raw` or `unit`.",
                other
            )),
        }
    }
}

/// Turns a decoded image into the batch-of-one tensor the model consumes.
///
/// No resizing, cropping or channel reordering ever happens here; spatial
/// and channel compatibility is checked against the model signature by
/// [`crate::InferenceEngine`].
#[derive(Debug, Clone, Copy, Default)]
pub struct TensorPreprocessor {
    pub scale: PixelScale,
}

impl TensorPreprocessor {
    pub fn new(scale: PixelScale) -> Self {
        Self { scale }
    }

    pub fn to_batch(&self, image: DecodedImage) -> InputBatch {
        let _s = span!("to_batch");

        let mut batch = InputBatch::from_image(image);
        if self.scale == PixelScale::Unit {
            batch.map_inplace(|v| *v /= U8_MAX);
        }
        batch
    }
}
