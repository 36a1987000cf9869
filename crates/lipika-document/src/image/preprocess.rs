// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image preprocessor — bounds the pixel size of a page image and re-encodes it
// as JPEG before it is sent to the recognition service. Operates on in-memory
// images using the `image` crate.

use image::{DynamicImage, ImageFormat};
use lipika_core::config::PreprocessConfig;
use lipika_core::error::LipikaError;
use lipika_core::types::{ImageEncoding, PageImage};
use tracing::{debug, info, instrument};

/// Default bound on the larger image dimension, in pixels.
pub const DEFAULT_MAX_DIMENSION: u32 = 1600;

/// Default re-encoding quality factor.
pub const DEFAULT_QUALITY: f32 = 0.85;

/// Size-reduction step applied to every page before transmission.
///
/// Deterministic: identical input and parameters always produce identical
/// bytes.
///
/// ```ignore
/// let page = ImagePreprocessor::default().prepare(&raw_page)?;
/// assert!(page.encoding == ImageEncoding::Jpeg);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImagePreprocessor {
    max_dimension: u32,
    quality: f32,
}

impl Default for ImagePreprocessor {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DIMENSION, DEFAULT_QUALITY)
    }
}

impl ImagePreprocessor {
    pub fn new(max_dimension: u32, quality: f32) -> Self {
        Self {
            max_dimension: max_dimension.max(1),
            quality,
        }
    }

    pub fn from_config(config: &PreprocessConfig) -> Self {
        Self::new(config.max_dimension, config.quality)
    }

    pub fn max_dimension(&self) -> u32 {
        self.max_dimension
    }

    /// JPEG quality in 1..=100 derived from the quality factor.
    pub fn jpeg_quality(&self) -> u8 {
        (self.quality * 100.0).round().clamp(1.0, 100.0) as u8
    }

    /// Bound and re-encode one page image.
    ///
    /// JPEG input already within bounds is returned untouched; everything
    /// else is decoded, downscaled if either side exceeds the maximum, and
    /// encoded as JPEG.
    #[instrument(skip_all, fields(bytes_len = page.data.len(), max = self.max_dimension))]
    pub fn prepare(&self, page: &PageImage) -> Result<PageImage, LipikaError> {
        let format = image::guess_format(&page.data)
            .map_err(|err| LipikaError::Image(format!("unrecognised image data: {err}")))?;
        let img = image::load_from_memory_with_format(&page.data, format)
            .map_err(|err| LipikaError::Image(format!("failed to decode image: {err}")))?;

        let (width, height) = (img.width(), img.height());
        let within_bounds = width <= self.max_dimension && height <= self.max_dimension;

        if within_bounds && format == ImageFormat::Jpeg {
            debug!(width, height, "Page within bounds, passing through");
            return Ok(PageImage::new(ImageEncoding::Jpeg, page.data.clone()));
        }

        let img = if within_bounds {
            img
        } else {
            let (new_w, new_h) = fit_within(width, height, self.max_dimension);
            info!(from_w = width, from_h = height, new_w, new_h, "Downscaling page");
            img.resize_exact(new_w, new_h, image::imageops::FilterType::Lanczos3)
        };

        let data = encode_jpeg(&img, self.jpeg_quality())?;
        debug!(output_bytes = data.len(), "Page re-encoded");
        Ok(PageImage::new(ImageEncoding::Jpeg, data))
    }
}

/// Scale `(width, height)` so the larger side equals `max`, preserving the
/// aspect ratio. Dimensions already within `max` are returned unchanged.
pub fn fit_within(width: u32, height: u32, max: u32) -> (u32, u32) {
    if width <= max && height <= max {
        return (width, height);
    }
    let scale = |side: u32, larger: u32| -> u32 {
        ((side as f64 * max as f64 / larger as f64).round() as u32).max(1)
    };
    if width >= height {
        (max, scale(height, width))
    } else {
        (scale(width, height), max)
    }
}

/// Encode as baseline JPEG with the given quality (1-100).
pub(crate) fn encode_jpeg(image: &DynamicImage, quality: u8) -> Result<Vec<u8>, LipikaError> {
    let mut buffer = Vec::new();
    let rgb = image.to_rgb8();
    let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buffer, quality);
    rgb.write_with_encoder(encoder)
        .map_err(|err| LipikaError::Image(format!("JPEG encoding failed: {err}")))?;
    Ok(buffer)
}

/// Encode losslessly as PNG.
pub(crate) fn encode_png(image: &DynamicImage) -> Result<Vec<u8>, LipikaError> {
    let mut buffer = Vec::new();
    let mut cursor = std::io::Cursor::new(&mut buffer);
    image
        .write_to(&mut cursor, ImageFormat::Png)
        .map_err(|err| LipikaError::Image(format!("PNG encoding failed: {err}")))?;
    Ok(buffer)
}
