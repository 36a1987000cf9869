// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Export module — DOCX documents and the ZIP bundle that carries many of them.

pub mod archive;
pub mod docx;

pub use archive::{ArchiveBundler, ArchiveEntry, archive_name_at, default_archive_name};
pub use docx::{DocumentExporter, DocumentLayout, ExportStyle, LayoutBlock, output_name};
