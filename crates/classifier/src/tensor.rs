//! Rank-checked tensors passed between pipeline stages.
//!
//! Every stage boundary has its own type so a height/width/channel array can
//! never be handed to the model without its batch dimension, and a batch can
//! only ever hold a single image.

use crate::error::{ClassifierError, Result};
use ndarray::{Array3, Array4, ArrayView3, ArrayView4, Axis};
use std::fmt;

/// Pixel intensities laid out as (height, width, channels).
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedImage {
    pixels: Array3<f32>,
}

impl DecodedImage {
    pub fn new(pixels: Array3<f32>) -> Result<Self> {
        let (height, width, channels) = pixels.dim();
        if height == 0 || width == 0 || channels == 0 {
            return Err(ClassifierError::InvalidImage(format!(
                "image has a zero dimension ({height}x{width}x{channels})"
            )));
        }
        Ok(Self { pixels })
    }

    /// Build from interleaved samples, row-major, `channels` values per pixel.
    pub fn from_samples(
        height: usize,
        width: usize,
        channels: usize,
        samples: Vec<f32>,
    ) -> Result<Self> {
        let pixels = Array3::from_shape_vec((height, width, channels), samples).map_err(|e| {
            ClassifierError::InvalidImage(format!(
                "sample buffer does not match {height}x{width}x{channels}: {e}"
            ))
        })?;
        Self::new(pixels)
    }

    pub fn height(&self) -> usize {
        self.pixels.dim().0
    }

    pub fn width(&self) -> usize {
        self.pixels.dim().1
    }

    pub fn channels(&self) -> usize {
        self.pixels.dim().2
    }

    pub fn view(&self) -> ArrayView3<'_, f32> {
        self.pixels.view()
    }

    pub fn into_inner(self) -> Array3<f32> {
        self.pixels
    }
}

/// A batch of exactly one image, laid out as (1, height, width, channels).
#[derive(Debug, Clone, PartialEq)]
pub struct InputBatch {
    tensor: Array4<f32>,
}

impl InputBatch {
    pub const BATCH_SIZE: usize = 1;

    pub fn from_image(image: DecodedImage) -> Self {
        let tensor = image.into_inner().insert_axis(Axis(0));
        Self { tensor }
    }

    pub fn height(&self) -> usize {
        self.tensor.dim().1
    }

    pub fn width(&self) -> usize {
        self.tensor.dim().2
    }

    pub fn channels(&self) -> usize {
        self.tensor.dim().3
    }

    pub fn shape(&self) -> [usize; 4] {
        let (n, h, w, c) = self.tensor.dim();
        [n, h, w, c]
    }

    /// The single image in the batch.
    pub fn image(&self) -> ArrayView3<'_, f32> {
        self.tensor.index_axis(Axis(0), 0)
    }

    pub fn view(&self) -> ArrayView4<'_, f32> {
        self.tensor.view()
    }

    pub(crate) fn map_inplace(&mut self, f: impl FnMut(&mut f32)) {
        self.tensor.map_inplace(f);
    }
}

/// Raw model output for one image, one value per category.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassScores(Vec<f32>);

impl ClassScores {
    pub fn new(scores: Vec<f32>) -> Self {
        Self(scores)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    /// Index and value of the largest score.
    ///
    /// Ties go to the lowest index. A NaN wins over every number and the
    /// first NaN wins over later ones, the same ordering numpy's `argmax`
    /// uses.
    pub fn argmax(&self) -> Option<(usize, f32)> {
        let mut iter = self.0.iter().copied().enumerate();
        let mut best = iter.next()?;
        if best.1.is_nan() {
            return Some(best);
        }
        for (index, score) in iter {
            if score.is_nan() {
                return Some((index, score));
            }
            if score > best.1 {
                best = (index, score);
            }
        }
        Some(best)
    }
}

impl From<Vec<f32>> for ClassScores {
    fn from(scores: Vec<f32>) -> Self {
        Self::new(scores)
    }
}

/// Renders a shape with dynamic dimensions as `?`, e.g. `[1, ?, ?, 3]`.
pub(crate) struct ShapeDisplay<'a>(pub &'a [Option<usize>]);

impl fmt::Display for ShapeDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, dim) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            match dim {
                Some(d) => write!(f, "{d}")?,
                None => write!(f, "?")?,
            }
        }
        write!(f, "]")
    }
}
