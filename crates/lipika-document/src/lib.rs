// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// lipika-document — Everything Lipika does to documents on either side of
// text recognition.
//
// Before recognition: PDF rasterization into page images and page image
// preprocessing. After recognition: structuring the text into tables,
// headers and paragraphs, DOCX export, and ZIP bundling of many documents.

pub mod export;
pub mod image;
pub mod pdf;
pub mod structure;

// Re-export the primary structs so callers can use `lipika_document::DocumentExporter` etc.
pub use export::archive::{ArchiveBundler, ArchiveEntry};
pub use export::docx::{DocumentExporter, ExportStyle, output_name};
pub use image::preprocess::ImagePreprocessor;
pub use pdf::rasterize::{EmbeddedImageRasterizer, Rasterizer};
pub use structure::parser::{DocumentStructurer, ParsedElement};

#[cfg(feature = "pdfium")]
pub use pdf::pdfium::PdfiumRasterizer;
