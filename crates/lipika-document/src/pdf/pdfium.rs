// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Full-page rendering through the system pdfium library. Handles vector and
// mixed-content PDFs the embedded-image rasterizer cannot.

use image::DynamicImage;
use lipika_core::error::{LipikaError, Result};
use lipika_core::types::{ImageEncoding, PageImage};
use pdfium_render::prelude::*;
use tracing::{debug, info, instrument};

use super::rasterize::{Rasterizer, ensure_one_image_per_page};
use crate::image::preprocess::encode_png;

/// Render scale relative to the page's natural size in points.
pub const DEFAULT_RENDER_SCALE: f32 = 2.0;

/// Renders every page with pdfium at a fixed scale and encodes it as PNG.
#[derive(Debug, Clone, Copy)]
pub struct PdfiumRasterizer {
    scale: f32,
}

impl Default for PdfiumRasterizer {
    fn default() -> Self {
        Self {
            scale: DEFAULT_RENDER_SCALE,
        }
    }
}

impl PdfiumRasterizer {
    pub fn with_scale(scale: f32) -> Self {
        Self {
            scale: if scale > 0.0 { scale } else { DEFAULT_RENDER_SCALE },
        }
    }

    fn bind() -> Result<Pdfium> {
        let bindings = Pdfium::bind_to_system_library()
            .map_err(|e| LipikaError::Rasterization(format!("pdfium unavailable: {e}")))?;
        Ok(Pdfium::new(bindings))
    }
}

impl Rasterizer for PdfiumRasterizer {
    #[instrument(skip_all, fields(bytes_len = pdf.len(), scale = self.scale))]
    fn rasterize(&self, pdf: &[u8]) -> Result<Vec<PageImage>> {
        let pdfium = Self::bind()?;
        let document = pdfium
            .load_pdf_from_byte_slice(pdf, None)
            .map_err(|e| LipikaError::Rasterization(format!("failed to load PDF: {e}")))?;

        let pages = document.pages();
        let expected = pages.len() as usize;
        info!(pages = expected, "Rendering PDF pages");

        let config = PdfRenderConfig::new().scale_page_by_factor(self.scale);
        let mut images = Vec::with_capacity(expected);
        for (index, page) in pages.iter().enumerate() {
            let bitmap = page.render_with_config(&config).map_err(|e| {
                LipikaError::Rasterization(format!("page {}: {e}", index + 1))
            })?;
            let rgb = DynamicImage::ImageRgb8(bitmap.as_image().into_rgb8());
            let data = encode_png(&rgb)?;
            debug!(page = index + 1, bytes = data.len(), "Page rendered");
            images.push(PageImage::new(ImageEncoding::Png, data));
        }

        ensure_one_image_per_page(expected, &images)?;
        Ok(images)
    }
}
