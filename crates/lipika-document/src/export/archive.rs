// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// ZIP bundling of exported documents.

use std::collections::HashSet;
use std::io::{Cursor, Write};

use chrono::{DateTime, Local};
use lipika_core::error::{LipikaError, Result};
use tracing::{debug, info, instrument};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::docx::{DOCUMENT_EXTENSION, output_name};

/// One document to place in the archive.
#[derive(Debug, Clone)]
pub struct ArchiveEntry {
    /// Display name of the source the document came from.
    pub source_name: String,
    pub document: Vec<u8>,
}

impl ArchiveEntry {
    pub fn new(source_name: impl Into<String>, document: Vec<u8>) -> Self {
        Self {
            source_name: source_name.into(),
            document,
        }
    }
}

/// Packs exported documents into a single deflated ZIP archive.
#[derive(Debug, Default, Clone, Copy)]
pub struct ArchiveBundler;

impl ArchiveBundler {
    pub fn new() -> Self {
        Self
    }

    /// Bundle `entries` in order. Each entry is stored under its output name;
    /// repeated names get ` (2)`, ` (3)`, … before the extension.
    #[instrument(skip_all, fields(entries = entries.len()))]
    pub fn bundle(&self, entries: &[ArchiveEntry]) -> Result<Vec<u8>> {
        let mut cursor = Cursor::new(Vec::new());
        let mut zip = ZipWriter::new(&mut cursor);
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        for (name, entry) in unique_names(entries).into_iter().zip(entries) {
            zip.start_file(name.as_str(), options)
                .map_err(|e| LipikaError::Archive(format!("{name}: {e}")))?;
            zip.write_all(&entry.document)
                .map_err(|e| LipikaError::Archive(format!("{name}: {e}")))?;
            debug!(name = %name, bytes = entry.document.len(), "Entry added");
        }

        zip.finish()
            .map_err(|e| LipikaError::Archive(format!("failed to finish archive: {e}")))?;
        let bytes = cursor.into_inner();
        info!(bytes = bytes.len(), "Archive assembled");
        Ok(bytes)
    }
}

fn unique_names(entries: &[ArchiveEntry]) -> Vec<String> {
    let mut taken = HashSet::new();
    entries
        .iter()
        .map(|entry| {
            let base = output_name(&entry.source_name);
            let stem = base
                .strip_suffix(&format!(".{DOCUMENT_EXTENSION}"))
                .unwrap_or(&base)
                .to_string();
            let mut candidate = base;
            let mut n = 2;
            while !taken.insert(candidate.clone()) {
                candidate = format!("{stem} ({n}).{DOCUMENT_EXTENSION}");
                n += 1;
            }
            candidate
        })
        .collect()
}

/// `lipika-batch-<YYYYMMDD-HHMMSS>.zip` for the given moment.
pub fn archive_name_at(at: DateTime<Local>) -> String {
    format!("lipika-batch-{}.zip", at.format("%Y%m%d-%H%M%S"))
}

/// Archive name stamped with the current local time.
pub fn default_archive_name() -> String {
    archive_name_at(Local::now())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::docx::DocumentExporter;
    use crate::export::docx::tests::document_xml;
    use chrono::TimeZone;
    use std::io::Read;

    fn entry_names(archive: &[u8]) -> Vec<String> {
        let mut zip = zip::ZipArchive::new(Cursor::new(archive)).expect("valid zip");
        (0..zip.len())
            .map(|i| zip.by_index(i).expect("entry").name().to_string())
            .collect()
    }

    #[test]
    fn three_documents_become_three_valid_entries() {
        let exporter = DocumentExporter::default();
        let entries: Vec<ArchiveEntry> = ["a.pdf", "b.png", "c.jpg"]
            .iter()
            .map(|name| {
                let doc = exporter.export_text(&format!("text of {name}")).expect("export");
                ArchiveEntry::new(*name, doc)
            })
            .collect();

        let archive = ArchiveBundler::new().bundle(&entries).expect("bundle");
        assert_eq!(entry_names(&archive), vec!["a.docx", "b.docx", "c.docx"]);

        let mut zip = zip::ZipArchive::new(Cursor::new(&archive)).expect("valid zip");
        for i in 0..zip.len() {
            let mut inner = Vec::new();
            zip.by_index(i).expect("entry").read_to_end(&mut inner).expect("read");
            assert!(document_xml(&inner).contains("text of"));
        }
    }

    #[test]
    fn colliding_names_get_numbered() {
        let entries = vec![
            ArchiveEntry::new("scan.pdf", vec![1]),
            ArchiveEntry::new("scan.png", vec![2]),
            ArchiveEntry::new("scan.jpg", vec![3]),
            ArchiveEntry::new("other.pdf", vec![4]),
        ];
        let archive = ArchiveBundler::new().bundle(&entries).expect("bundle");
        assert_eq!(
            entry_names(&archive),
            vec!["scan.docx", "scan (2).docx", "scan (3).docx", "other.docx"]
        );
    }

    #[test]
    fn empty_bundle_is_still_a_valid_archive() {
        let archive = ArchiveBundler::new().bundle(&[]).expect("bundle");
        assert!(entry_names(&archive).is_empty());
    }

    #[test]
    fn archive_name_is_timestamped() {
        let at = Local
            .with_ymd_and_hms(2026, 3, 7, 9, 5, 1)
            .single()
            .expect("valid time");
        assert_eq!(archive_name_at(at), "lipika-batch-20260307-090501.zip");
        assert!(default_archive_name().starts_with("lipika-batch-"));
    }
}
