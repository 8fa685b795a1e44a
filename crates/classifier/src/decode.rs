use crate::{
    error::{ClassifierError, Result},
    tensor::DecodedImage,
};
use common::span;
use image::DynamicImage;

/// Decodes uploaded image files into [`DecodedImage`] arrays.
///
/// The codec is sniffed from the bytes. Channel layout and sample range are
/// the file's own: an 8-bit RGB PNG yields three channels in 0..=255, a
/// 16-bit grayscale PNG one channel in 0..=65535.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageDecoder;

impl ImageDecoder {
    pub fn new() -> Self {
        Self
    }

    pub fn decode(&self, bytes: &[u8]) -> Result<DecodedImage> {
        let _s = span!("decode_image", bytes = bytes.len());

        if bytes.is_empty() {
            return Err(ClassifierError::InvalidImage("upload is empty".to_string()));
        }

        let image = image::load_from_memory(bytes)?;
        let (width, height) = (image.width() as usize, image.height() as usize);

        let (channels, samples) = native_samples(image);

        tracing::trace!(height, width, channels, "Decoded image");

        DecodedImage::from_samples(height, width, channels, samples)
    }
}

fn widen<T: Copy + Into<f32>>(raw: Vec<T>) -> Vec<f32> {
    raw.into_iter().map(Into::into).collect()
}

fn native_samples(image: DynamicImage) -> (usize, Vec<f32>) {
    match image {
        DynamicImage::ImageLuma8(buf) => (1, widen(buf.into_raw())),
        DynamicImage::ImageLumaA8(buf) => (2, widen(buf.into_raw())),
        DynamicImage::ImageRgb8(buf) => (3, widen(buf.into_raw())),
        DynamicImage::ImageRgba8(buf) => (4, widen(buf.into_raw())),
        DynamicImage::ImageLuma16(buf) => (1, widen(buf.into_raw())),
        DynamicImage::ImageLumaA16(buf) => (2, widen(buf.into_raw())),
        DynamicImage::ImageRgb16(buf) => (3, widen(buf.into_raw())),
        DynamicImage::ImageRgba16(buf) => (4, widen(buf.into_raw())),
        DynamicImage::ImageRgb32F(buf) => (3, buf.into_raw()),
        DynamicImage::ImageRgba32F(buf) => (4, buf.into_raw()),
        other => (3, widen(other.to_rgb8().into_raw())),
    }
}
