//! Fit an image into a JPEG byte budget before it is sent to the oracle.
//!
//! The normalizer first lowers JPEG quality step by step. Once quality hits
//! the floor it shrinks the pixel dimensions (resampling from the original
//! pixels) and starts again from the initial quality. The loop is bounded by
//! an iteration cap and a minimum dimension; when either is hit the result
//! is [`NormalizeError::SizeUnreachable`].

use std::io::Cursor;
use std::path::Path;

use base64::Engine as _;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageReader, RgbImage};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Default byte budget for a normalized image (500 KiB).
pub const DEFAULT_TARGET_BYTES: u64 = 500 * 1024;

/// JPEG quality used for the first encoding attempt.
pub const DEFAULT_INITIAL_QUALITY: u8 = 95;

/// Amount quality drops between attempts.
pub const DEFAULT_QUALITY_STEP: u8 = 5;

/// Quality below which the normalizer shrinks instead.
pub const DEFAULT_MIN_QUALITY: u8 = 30;

/// Factor applied to both dimensions on each shrink.
pub const DEFAULT_SHRINK_RATIO: f64 = 0.9;

/// An encoding fits when `len <= target * tolerance`.
pub const DEFAULT_SIZE_TOLERANCE: f64 = 1.1;

/// Maximum number of encoding attempts per image.
pub const DEFAULT_MAX_ITERATIONS: u32 = 400;

/// Smallest width or height the normalizer will shrink to.
pub const DEFAULT_MIN_DIMENSION: u32 = 16;

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

/// Tunable parameters for [`normalize_image`].
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizeConfig {
    pub initial_quality: u8,
    pub quality_step: u8,
    pub min_quality: u8,
    pub shrink_ratio: f64,
    pub size_tolerance: f64,
    pub max_iterations: u32,
    pub min_dimension: u32,
}

impl Default for NormalizeConfig {
    fn default() -> Self {
        Self {
            initial_quality: DEFAULT_INITIAL_QUALITY,
            quality_step: DEFAULT_QUALITY_STEP,
            min_quality: DEFAULT_MIN_QUALITY,
            shrink_ratio: DEFAULT_SHRINK_RATIO,
            size_tolerance: DEFAULT_SIZE_TOLERANCE,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            min_dimension: DEFAULT_MIN_DIMENSION,
        }
    }
}

impl NormalizeConfig {
    /// Check that the parameters describe a loop that makes progress.
    pub fn validate(&self) -> Result<(), CoreError> {
        if !(1..=100).contains(&self.initial_quality) {
            return Err(CoreError::Validation(format!(
                "initial quality must be between 1 and 100, got {}",
                self.initial_quality
            )));
        }
        if self.min_quality == 0 || self.min_quality > self.initial_quality {
            return Err(CoreError::Validation(format!(
                "minimum quality must be between 1 and {}, got {}",
                self.initial_quality, self.min_quality
            )));
        }
        if self.quality_step == 0 {
            return Err(CoreError::Validation(
                "quality step must be positive".to_string(),
            ));
        }
        if !(self.shrink_ratio > 0.0 && self.shrink_ratio < 1.0) {
            return Err(CoreError::Validation(format!(
                "shrink ratio must be in (0, 1), got {}",
                self.shrink_ratio
            )));
        }
        if !self.size_tolerance.is_finite() || self.size_tolerance < 1.0 {
            return Err(CoreError::Validation(format!(
                "size tolerance must be a finite number >= 1, got {}",
                self.size_tolerance
            )));
        }
        if self.max_iterations == 0 {
            return Err(CoreError::Validation(
                "max iterations must be positive".to_string(),
            ));
        }
        if self.min_dimension == 0 {
            return Err(CoreError::Validation(
                "minimum dimension must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Result / error
// ---------------------------------------------------------------------------

/// A JPEG encoding that satisfies the byte budget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedImage {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub quality: u8,
    /// Number of encodings performed, including the accepted one.
    pub iterations: u32,
}

#[derive(Debug, thiserror::Error)]
pub enum NormalizeError {
    #[error("Failed to read image: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to decode image: {0}")]
    Decode(#[source] image::ImageError),

    #[error("Failed to encode JPEG: {0}")]
    Encode(#[source] image::ImageError),

    #[error(transparent)]
    InvalidConfig(#[from] CoreError),

    #[error(
        "Cannot fit image into {target} bytes after {iterations} attempts \
         (last: {width}x{height} at {last_size} bytes)"
    )]
    SizeUnreachable {
        target: u64,
        iterations: u32,
        width: u32,
        height: u32,
        last_size: u64,
    },
}

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

/// Decode the image at `path` and normalize it.
///
/// The format is detected from the file contents, not the extension.
pub fn normalize_file(
    path: &Path,
    target: u64,
    config: &NormalizeConfig,
) -> Result<NormalizedImage, NormalizeError> {
    let image = ImageReader::open(path)?
        .with_guessed_format()?
        .decode()
        .map_err(NormalizeError::Decode)?;
    normalize_image(&image, target, config)
}

/// Encode `image` as JPEG so that the output is at most `target * tolerance`
/// bytes.
pub fn normalize_image(
    image: &DynamicImage,
    target: u64,
    config: &NormalizeConfig,
) -> Result<NormalizedImage, NormalizeError> {
    config.validate()?;
    if target == 0 {
        return Err(CoreError::Validation("target size must be positive".to_string()).into());
    }

    let budget = target as f64 * config.size_tolerance;
    let source = image.to_rgb8();
    let (mut width, mut height) = source.dimensions();
    let mut resized: Option<RgbImage> = None;
    let mut quality = config.initial_quality;
    let mut last_size = 0u64;

    for iteration in 1..=config.max_iterations {
        let current = resized.as_ref().unwrap_or(&source);
        let bytes = encode_jpeg(current, quality)?;
        last_size = bytes.len() as u64;

        if last_size as f64 <= budget {
            tracing::debug!(
                width,
                height,
                quality,
                iteration,
                size = last_size,
                "Image normalized",
            );
            return Ok(NormalizedImage {
                bytes,
                width,
                height,
                quality,
                iterations: iteration,
            });
        }

        if quality > config.min_quality {
            quality = quality
                .saturating_sub(config.quality_step)
                .max(config.min_quality);
            continue;
        }

        let next_width = (width as f64 * config.shrink_ratio) as u32;
        let next_height = (height as f64 * config.shrink_ratio) as u32;
        if next_width < config.min_dimension || next_height < config.min_dimension {
            return Err(NormalizeError::SizeUnreachable {
                target,
                iterations: iteration,
                width,
                height,
                last_size,
            });
        }

        width = next_width;
        height = next_height;
        resized = Some(image::imageops::resize(
            &source,
            width,
            height,
            FilterType::Lanczos3,
        ));
        quality = config.initial_quality;
    }

    Err(NormalizeError::SizeUnreachable {
        target,
        iterations: config.max_iterations,
        width,
        height,
        last_size,
    })
}

fn encode_jpeg(image: &RgbImage, quality: u8) -> Result<Vec<u8>, NormalizeError> {
    let mut buf = Cursor::new(Vec::new());
    JpegEncoder::new_with_quality(&mut buf, quality)
        .encode_image(image)
        .map_err(NormalizeError::Encode)?;
    Ok(buf.into_inner())
}

// ---------------------------------------------------------------------------
// Encoding helpers
// ---------------------------------------------------------------------------

/// Standard base64 (with padding) of `bytes`.
pub fn encode_base64(bytes: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

/// Inline `data:` URI for a base64-encoded JPEG.
pub fn jpeg_data_uri(image_b64: &str) -> String {
    format!("data:image/jpeg;base64,{image_b64}")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
