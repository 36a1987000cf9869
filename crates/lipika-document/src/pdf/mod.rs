// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF module — turning PDF pages into page images.

pub mod rasterize;

#[cfg(feature = "pdfium")]
pub mod pdfium;

pub use rasterize::{EmbeddedImageRasterizer, Rasterizer};

#[cfg(feature = "pdfium")]
pub use pdfium::PdfiumRasterizer;
