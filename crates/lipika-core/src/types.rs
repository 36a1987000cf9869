// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Lipika OCR pipeline.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{LipikaError, Result};

/// Separator placed between the texts of consecutive pages of one item.
pub const PAGE_BREAK: &str = "\n\n--- Page Break ---\n\n";

/// The bare marker line that [`PAGE_BREAK`] leaves in the aggregated text.
pub const PAGE_BREAK_MARKER: &str = "--- Page Break ---";

/// Aggregate text used when not a single page of an item was recognised.
pub const NO_TEXT_FOUND: &str = "No text found";

/// Placeholder recorded in place of a page that could not be recognised.
pub fn failed_page_placeholder(page_index: u32) -> String {
    format!("[Page {page_index} failed to process]")
}

/// Unique identifier for a queued item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemId(pub Uuid);

impl ItemId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ItemId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Declared media kind of a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediaKind {
    /// A single raster image (JPEG, PNG, WebP, ...). Always one page.
    Image,
    /// A PDF document, expanded into one image per page.
    Pdf,
}

impl MediaKind {
    /// Accepts `image/*` and `application/pdf`, nothing else.
    pub fn from_mime(mime: &str) -> Option<Self> {
        let mime = mime.trim().to_ascii_lowercase();
        if mime == "application/pdf" {
            Some(Self::Pdf)
        } else if mime.starts_with("image/") {
            Some(Self::Image)
        } else {
            None
        }
    }

    /// Infer the media kind from a file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Some(Self::Pdf),
            "jpg" | "jpeg" | "png" | "webp" | "gif" | "bmp" | "tif" | "tiff" => Some(Self::Image),
            _ => None,
        }
    }
}

/// Encoding of an in-memory page image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageEncoding {
    Jpeg,
    Png,
    /// Anything else the `image` crate can sniff from the bytes.
    Other,
}

impl ImageEncoding {
    /// MIME type used when the image is sent to the recognition service.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Other => "application/octet-stream",
        }
    }

    /// Identify JPEG and PNG payloads by their magic bytes.
    pub fn sniff(data: &[u8]) -> Self {
        if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            Self::Jpeg
        } else if data.starts_with(b"\x89PNG\r\n\x1a\n") {
            Self::Png
        } else {
            Self::Other
        }
    }
}

/// One page ready to be sent to (or already sent to) the recognizer.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageImage {
    pub encoding: ImageEncoding,
    pub data: Vec<u8>,
}

impl PageImage {
    pub fn new(encoding: ImageEncoding, data: Vec<u8>) -> Self {
        Self { encoding, data }
    }
}

impl std::fmt::Debug for PageImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageImage")
            .field("encoding", &self.encoding)
            .field("bytes", &self.data.len())
            .finish()
    }
}

/// A user-supplied file. Immutable once enqueued; cloning shares the payload.
#[derive(Clone, Serialize)]
pub struct SourceFile {
    pub name: String,
    pub kind: MediaKind,
    #[serde(skip_serializing)]
    bytes: Arc<[u8]>,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, kind: MediaKind, bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            name: name.into(),
            kind,
            bytes: bytes.into(),
        }
    }

    /// Build a source file from a declared MIME type, rejecting anything that
    /// is neither an image nor a PDF.
    pub fn from_mime(
        name: impl Into<String>,
        mime: &str,
        bytes: impl Into<Arc<[u8]>>,
    ) -> Result<Self> {
        let kind = MediaKind::from_mime(mime)
            .ok_or_else(|| LipikaError::UnsupportedSource(format!("media type {mime}")))?;
        Ok(Self::new(name, kind, bytes))
    }

    /// Build a source file, inferring the media kind from the name's extension.
    pub fn from_name(name: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Result<Self> {
        let name = name.into();
        let kind = std::path::Path::new(&name)
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(MediaKind::from_extension)
            .ok_or_else(|| LipikaError::UnsupportedSource(name.clone()))?;
        Ok(Self::new(name, kind, bytes))
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl std::fmt::Debug for SourceFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceFile")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("bytes", &self.bytes.len())
            .finish()
    }
}

/// Lifecycle states of a queued item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemStatus {
    /// Queued, not reached yet.
    Pending,
    /// Pages are being recognised.
    Processing,
    /// All pages were attempted and the text aggregated.
    Completed,
    /// Aborted or cancelled — see the item's error message.
    Failed,
}

impl ItemStatus {
    /// Transitions are monotonic: Pending → Processing → (Completed | Failed).
    pub fn can_transition_to(self, next: ItemStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Processing)
                | (Self::Processing, Self::Completed)
                | (Self::Processing, Self::Failed)
        )
    }
}

/// A source file in the batch queue together with its processing state.
#[derive(Debug, Clone, Serialize)]
pub struct QueuedItem {
    pub id: ItemId,
    pub source: SourceFile,
    status: ItemStatus,
    pub progress_note: Option<String>,
    pub aggregated_text: Option<String>,
    pub error_message: Option<String>,
}

impl QueuedItem {
    pub fn new(source: SourceFile) -> Self {
        Self {
            id: ItemId::new(),
            source,
            status: ItemStatus::Pending,
            progress_note: None,
            aggregated_text: None,
            error_message: None,
        }
    }

    pub fn status(&self) -> ItemStatus {
        self.status
    }

    /// Move the item to `next`, refusing any non-monotonic transition.
    pub fn transition(&mut self, next: ItemStatus) -> Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(LipikaError::InvalidTransition {
                item: self.id.to_string(),
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }
}

/// Outcome of one page. `page_index` is 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageResult {
    pub page_index: u32,
    pub text: String,
    pub failed: bool,
}

impl PageResult {
    pub fn recognised(page_index: u32, text: String) -> Self {
        Self {
            page_index,
            text,
            failed: false,
        }
    }

    pub fn failed(page_index: u32) -> Self {
        Self {
            page_index,
            text: failed_page_placeholder(page_index),
            failed: true,
        }
    }
}

/// Join page results into the aggregate text of one item.
///
/// Pages keep their order; if every page failed (or there were none) the
/// aggregate is [`NO_TEXT_FOUND`].
pub fn aggregate_pages(pages: &[PageResult]) -> String {
    if pages.iter().all(|page| page.failed) {
        return NO_TEXT_FOUND.to_string();
    }
    pages
        .iter()
        .map(|page| page.text.as_str())
        .collect::<Vec<_>>()
        .join(PAGE_BREAK)
}

/// One processed page kept for inspection.
#[derive(Debug, Clone, Serialize)]
pub struct PreviewEntry {
    pub id: String,
    pub source_name: String,
    /// Present only when the source had more than one page.
    pub page_number: Option<u32>,
    pub image: PageImage,
    pub extracted_text: String,
}

/// Status counts over the whole queue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct QueueSummary {
    pub pending: usize,
    pub processing: usize,
    pub completed: usize,
    pub failed: usize,
    pub total: usize,
}

impl QueueSummary {
    pub fn from_items<'a>(items: impl IntoIterator<Item = &'a QueuedItem>) -> Self {
        let mut summary = Self::default();
        for item in items {
            summary.total += 1;
            match item.status() {
                ItemStatus::Pending => summary.pending += 1,
                ItemStatus::Processing => summary.processing += 1,
                ItemStatus::Completed => summary.completed += 1,
                ItemStatus::Failed => summary.failed += 1,
            }
        }
        summary
    }
}

impl std::fmt::Display for QueueSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} completed · {} failed · {} total",
            self.completed, self.failed, self.total
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png_source() -> SourceFile {
        SourceFile::new("scan.png", MediaKind::Image, vec![1u8, 2, 3])
    }

    #[test]
    fn mime_acceptance_matches_upload_filter() {
        assert_eq!(MediaKind::from_mime("image/webp"), Some(MediaKind::Image));
        assert_eq!(MediaKind::from_mime("application/pdf"), Some(MediaKind::Pdf));
        assert_eq!(MediaKind::from_mime("application/msword"), None);
    }

    #[test]
    fn from_name_rejects_unknown_extensions() {
        let err = SourceFile::from_name("notes.docx", vec![0u8]).unwrap_err();
        assert!(matches!(err, LipikaError::UnsupportedSource(_)));
        let ok = SourceFile::from_name("Scan.PDF", vec![0u8]).expect("pdf accepted");
        assert_eq!(ok.kind, MediaKind::Pdf);
    }

    #[test]
    fn encoding_is_sniffed_from_magic_bytes() {
        assert_eq!(ImageEncoding::sniff(&[0xFF, 0xD8, 0xFF, 0xE0]), ImageEncoding::Jpeg);
        assert_eq!(ImageEncoding::sniff(b"\x89PNG\r\n\x1a\n...."), ImageEncoding::Png);
        assert_eq!(ImageEncoding::sniff(b"RIFF....WEBP"), ImageEncoding::Other);
    }

    #[test]
    fn status_transitions_are_monotonic() {
        let mut item = QueuedItem::new(png_source());
        assert!(item.transition(ItemStatus::Completed).is_err());
        item.transition(ItemStatus::Processing).expect("pending -> processing");
        item.transition(ItemStatus::Failed).expect("processing -> failed");
        assert!(item.transition(ItemStatus::Processing).is_err());
        assert!(item.transition(ItemStatus::Pending).is_err());
        assert_eq!(item.status(), ItemStatus::Failed);
    }

    #[test]
    fn aggregate_inserts_separators_between_pages() {
        let pages = vec![
            PageResult::recognised(1, "one".into()),
            PageResult::failed(2),
            PageResult::recognised(3, "three".into()),
        ];
        let text = aggregate_pages(&pages);
        assert_eq!(text.matches(PAGE_BREAK).count(), 2);
        assert_eq!(
            text,
            format!("one{PAGE_BREAK}[Page 2 failed to process]{PAGE_BREAK}three")
        );
    }

    #[test]
    fn aggregate_of_all_failed_pages_reads_no_text_found() {
        let pages = vec![PageResult::failed(1), PageResult::failed(2)];
        assert_eq!(aggregate_pages(&pages), NO_TEXT_FOUND);
    }

    #[test]
    fn summary_counts_statuses() {
        let mut done = QueuedItem::new(png_source());
        done.transition(ItemStatus::Processing).expect("processing");
        done.transition(ItemStatus::Completed).expect("completed");
        let pending = QueuedItem::new(png_source());

        let summary = QueueSummary::from_items([&done, &pending]);
        assert_eq!(summary.completed, 1);
        assert_eq!(summary.pending, 1);
        assert_eq!(summary.to_string(), "1 completed · 0 failed · 2 total");
    }
}
