//! Image Normalizer
//!
//! Turns raw upload bytes into the fixed tensor the classifier consumes:
//! decode, force RGB, resize to 128×128, scale to [0, 1], add a batch axis.
//!
//! The resize filter is Catmull-Rom (bicubic). Confidence scores are sensitive
//! to the interpolation method, so it must not change without re-validating
//! the model.

use std::io::Cursor;

use image::{imageops::FilterType, DynamicImage, ImageReader, RgbImage};

use crate::utils::error::{DiagnosisError, Result};
use crate::{CHANNELS, IMAGE_SIZE};

/// Interpolation used when resizing to the model input size
pub const RESIZE_FILTER: FilterType = FilterType::CatmullRom;

/// A single-image batch in NHWC layout: `[1, height, width, 3]`, values in [0, 1]
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedImage {
    data: Vec<f32>,
    height: usize,
    width: usize,
}

impl NormalizedImage {
    /// Tensor shape `[batch, height, width, channels]`
    pub fn shape(&self) -> [usize; 4] {
        [1, self.height, self.width, CHANNELS]
    }

    /// Flat NHWC values
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Consume into the flat NHWC buffer
    pub fn into_vec(self) -> Vec<f32> {
        self.data
    }

    /// Value at (y, x, channel) of the single batch entry
    pub fn pixel(&self, y: usize, x: usize, channel: usize) -> f32 {
        self.data[(y * self.width + x) * CHANNELS + channel]
    }

    /// Build directly from an RGB buffer already at the target size
    fn from_rgb(rgb: &RgbImage) -> Self {
        let (width, height) = rgb.dimensions();
        let data = rgb
            .as_raw()
            .iter()
            .map(|&v| v as f32 / 255.0)
            .collect();

        Self {
            data,
            height: height as usize,
            width: width as usize,
        }
    }
}

/// Deterministic bytes → tensor transform
#[derive(Debug, Clone)]
pub struct ImageNormalizer {
    /// Target side length (square)
    pub image_size: u32,
}

impl Default for ImageNormalizer {
    fn default() -> Self {
        Self {
            image_size: IMAGE_SIZE as u32,
        }
    }
}

impl ImageNormalizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode bytes of any supported still-image format
    pub fn decode(&self, bytes: &[u8]) -> Result<DynamicImage> {
        if bytes.is_empty() {
            return Err(DiagnosisError::Decode("file is empty".to_string()));
        }

        let reader = ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| DiagnosisError::Decode(e.to_string()))?;

        if reader.format().is_none() {
            return Err(DiagnosisError::Decode(
                "unrecognized image format".to_string(),
            ));
        }

        Ok(reader.decode()?)
    }

    /// Resize and scale an already decoded image
    pub fn normalize(&self, image: &DynamicImage) -> NormalizedImage {
        // Convert first so alpha/grayscale/16-bit inputs all resize as 8-bit RGB
        let rgb = DynamicImage::ImageRgb8(image.to_rgb8());
        let resized = rgb
            .resize_exact(self.image_size, self.image_size, RESIZE_FILTER)
            .to_rgb8();

        NormalizedImage::from_rgb(&resized)
    }

    /// Full transform from raw bytes
    pub fn process(&self, bytes: &[u8]) -> Result<NormalizedImage> {
        let image = self.decode(bytes)?;
        Ok(self.normalize(&image))
    }
}
