// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Batch orchestrator — drives queued source files page by page through
// rasterization, preprocessing, and recognition.
//
// One worker, strictly sequential. The orchestrator owns the queue and the
// preview list; `run` borrows it mutably, so nothing else can change the
// queue while a run is in flight. A cloned `RunControl` is the only way to
// influence a run from outside (cancel, skip).

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use lipika_core::config::AppConfig;
use lipika_core::error::{FailureKind, LipikaError, Result};
use lipika_core::human_errors::humanize_error;
use lipika_core::types::{
    ImageEncoding, ItemId, ItemStatus, MediaKind, PageImage, PageResult, PreviewEntry, QueueSummary,
    QueuedItem, SourceFile, aggregate_pages,
};
use lipika_document::{
    ArchiveBundler, ArchiveEntry, DocumentExporter, EmbeddedImageRasterizer, ImagePreprocessor,
    Rasterizer,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::gateway::Recognizer;
use crate::notify::{Notice, NoticeOutcome, Notifier};
use crate::throttle::Throttle;

/// Error message of an item that was in flight when the run was cancelled.
pub const CANCELLED_MESSAGE: &str = "Processing cancelled";

/// How far a rate-limit or credit-exhaustion failure reaches.
///
/// Every other failure only ever costs the page it happened on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AbortScope {
    /// Record a placeholder for the page and carry on with the next one.
    Page,
    /// Abandon the rest of the item and mark it failed.
    Item,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunPolicy {
    pub abort_scope: AbortScope,
}

impl RunPolicy {
    /// One file at a time: service limits degrade pages, never the file.
    pub const fn single_item() -> Self {
        Self {
            abort_scope: AbortScope::Page,
        }
    }

    /// Queue processing: service limits give up on the current item.
    pub const fn batch() -> Self {
        Self {
            abort_scope: AbortScope::Item,
        }
    }
}

/// Handle for steering a run from another task.
///
/// Cancellation is observed before each item and before each page call.
#[derive(Debug, Clone, Default)]
pub struct RunControl {
    inner: Arc<ControlState>,
}

#[derive(Debug, Default)]
struct ControlState {
    cancelled: AtomicBool,
    skipped: Mutex<HashSet<ItemId>>,
}

impl RunControl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stop at the next checkpoint. The item in flight is marked failed;
    /// items not yet reached stay pending.
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Drop a pending item from the queue when the run reaches it.
    pub fn skip(&self, id: ItemId) {
        if let Ok(mut skipped) = self.inner.skipped.lock() {
            skipped.insert(id);
        }
    }

    fn take_skip(&self, id: ItemId) -> bool {
        self.inner
            .skipped
            .lock()
            .map(|mut skipped| skipped.remove(&id))
            .unwrap_or(false)
    }

    /// Clear a previous cancellation so a new run can start.
    fn rearm(&self) {
        self.inner.cancelled.store(false, Ordering::SeqCst);
    }

    fn reset(&self) {
        self.rearm();
        if let Ok(mut skipped) = self.inner.skipped.lock() {
            skipped.clear();
        }
    }
}

/// Outcome of recognising one source file.
#[derive(Debug, Clone, Serialize)]
pub struct ItemReport {
    pub source_name: String,
    /// Aggregated text, page texts joined by page-break separators.
    pub text: String,
    /// Results of the pages that were processed, in page order.
    pub pages: Vec<PageResult>,
    /// Page count of the source.
    pub total_pages: u32,
    /// Set when a service limit abandoned the remaining pages.
    pub aborted: Option<FailureKind>,
    pub cancelled: bool,
}

impl ItemReport {
    pub fn failed_pages(&self) -> Vec<u32> {
        self.pages
            .iter()
            .filter(|page| page.failed)
            .map(|page| page.page_index)
            .collect()
    }

    pub fn failed_page_count(&self) -> usize {
        self.pages.iter().filter(|page| page.failed).count()
    }
}

/// Counts for one batch run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub items_total: usize,
    pub items_completed: usize,
    pub items_failed: usize,
    pub items_skipped: usize,
    pub pages_total: usize,
    pub pages_failed: usize,
    pub cancelled: bool,
}

/// Drives sources through rasterization, preprocessing, and recognition.
pub struct BatchOrchestrator<R: Recognizer> {
    recognizer: R,
    rasterizer: Box<dyn Rasterizer>,
    preprocessor: ImagePreprocessor,
    throttle: Throttle,
    notifier: Option<Box<dyn Notifier>>,
    single_policy: RunPolicy,
    batch_policy: RunPolicy,
    control: RunControl,
    items: Vec<QueuedItem>,
    previews: Vec<PreviewEntry>,
}

impl<R: Recognizer> BatchOrchestrator<R> {
    /// Orchestrator with default preprocessing, the embedded-image rasterizer
    /// and the fixed 2 s page delay.
    pub fn new(recognizer: R) -> Self {
        Self {
            recognizer,
            rasterizer: Box::new(EmbeddedImageRasterizer),
            preprocessor: ImagePreprocessor::default(),
            throttle: Throttle::default(),
            notifier: None,
            single_policy: RunPolicy::single_item(),
            batch_policy: RunPolicy::batch(),
            control: RunControl::new(),
            items: Vec::new(),
            previews: Vec::new(),
        }
    }

    pub fn from_config(recognizer: R, config: &AppConfig) -> Self {
        Self::new(recognizer)
            .with_preprocessor(ImagePreprocessor::from_config(&config.preprocess))
            .with_throttle(Throttle::from_config(&config.throttle))
    }

    pub fn with_rasterizer(mut self, rasterizer: impl Rasterizer + 'static) -> Self {
        self.rasterizer = Box::new(rasterizer);
        self
    }

    pub fn with_preprocessor(mut self, preprocessor: ImagePreprocessor) -> Self {
        self.preprocessor = preprocessor;
        self
    }

    pub fn with_throttle(mut self, throttle: Throttle) -> Self {
        self.throttle = throttle;
        self
    }

    pub fn with_notifier(mut self, notifier: impl Notifier + 'static) -> Self {
        self.notifier = Some(Box::new(notifier));
        self
    }

    pub fn with_single_policy(mut self, policy: RunPolicy) -> Self {
        self.single_policy = policy;
        self
    }

    pub fn with_batch_policy(mut self, policy: RunPolicy) -> Self {
        self.batch_policy = policy;
        self
    }

    pub fn with_control(mut self, control: RunControl) -> Self {
        self.control = control;
        self
    }

    /// A handle that can cancel or skip while `run` is in progress.
    pub fn control(&self) -> RunControl {
        self.control.clone()
    }

    // -- Queue -----------------------------------------------------------

    pub fn enqueue(&mut self, source: SourceFile) -> ItemId {
        let item = QueuedItem::new(source);
        let id = item.id;
        debug!(item_id = %id, source = %item.source.name, "Item queued");
        self.items.push(item);
        id
    }

    pub fn enqueue_all(&mut self, sources: impl IntoIterator<Item = SourceFile>) -> Vec<ItemId> {
        sources.into_iter().map(|source| self.enqueue(source)).collect()
    }

    pub fn remove(&mut self, id: ItemId) -> Result<QueuedItem> {
        let index = self
            .items
            .iter()
            .position(|item| item.id == id)
            .ok_or_else(|| LipikaError::UnknownItem(id.to_string()))?;
        Ok(self.items.remove(index))
    }

    /// Drop every item and preview.
    pub fn clear(&mut self) {
        self.items.clear();
        self.previews.clear();
    }

    /// Discard the current batch, including pending skips and cancellation.
    pub fn start_new_batch(&mut self) {
        self.clear();
        self.control.reset();
        info!("New batch started");
    }

    pub fn items(&self) -> &[QueuedItem] {
        &self.items
    }

    pub fn item(&self, id: ItemId) -> Option<&QueuedItem> {
        self.items.iter().find(|item| item.id == id)
    }

    pub fn previews(&self) -> &[PreviewEntry] {
        &self.previews
    }

    /// Owned copy of the queue.
    pub fn snapshot(&self) -> Vec<QueuedItem> {
        self.items.clone()
    }

    pub fn summary(&self) -> QueueSummary {
        QueueSummary::from_items(&self.items)
    }

    // -- Single-item mode -------------------------------------------------

    /// Recognise one source outside the queue.
    ///
    /// Pages are processed in order and, under the default policy, every
    /// page is attempted whatever happens to the others. Only a source that
    /// cannot be rasterized is an error.
    #[instrument(skip_all, fields(source = %source.name))]
    pub async fn recognize_single(&mut self, source: &SourceFile) -> Result<ItemReport> {
        self.control.rearm();
        let images = match page_images(self.rasterizer.as_ref(), source) {
            Ok(images) => images,
            Err(err) => {
                warn!(error = %err, "Source could not be split into pages");
                self.notify(Notice::new(&source.name, None, NoticeOutcome::SourceFailed, &err));
                return Err(err);
            }
        };
        let total_pages = images.len() as u32;
        info!(pages = total_pages, "Recognising single source");

        let ctx = PageContext {
            recognizer: &self.recognizer,
            preprocessor: &self.preprocessor,
            throttle: &mut self.throttle,
            notifier: self.notifier.as_deref(),
            control: &self.control,
            scope: self.single_policy.abort_scope,
        };
        let outcome = run_pages(ctx, &source.name, &images, &mut |event: PageEvent<'_>| {
            if let PageEvent::Started { page, total } = event {
                debug!(page, pages = total, "Processing page");
            }
        })
        .await;

        let (aborted, cancelled) = match &outcome.stop {
            Some(Stop::Aborted(err)) => (Some(err.failure_kind()), false),
            Some(Stop::Cancelled) => (None, true),
            None => (None, false),
        };
        let report = ItemReport {
            source_name: source.name.clone(),
            text: aggregate_pages(&outcome.pages),
            pages: outcome.pages,
            total_pages,
            aborted,
            cancelled,
        };
        info!(
            pages = report.total_pages,
            failed = report.failed_page_count(),
            "Single source finished"
        );
        Ok(report)
    }

    // -- Batch mode -------------------------------------------------------

    /// Process every pending item in enqueue order.
    ///
    /// Items already completed or failed are left alone, so calling `run`
    /// again after a cancellation picks up where the last run stopped.
    #[instrument(skip_all, fields(items = self.items.len()))]
    pub async fn run(&mut self) -> RunReport {
        self.control.rearm();
        let mut report = RunReport::default();
        let mut index = 0;

        while index < self.items.len() {
            if self.control.is_cancelled() {
                report.cancelled = true;
                break;
            }
            let item = &self.items[index];
            if item.status() != ItemStatus::Pending {
                index += 1;
                continue;
            }
            if self.control.take_skip(item.id) {
                info!(item_id = %item.id, "Item skipped");
                self.items.remove(index);
                report.items_skipped += 1;
                continue;
            }

            report.items_total += 1;
            self.process_item(index, &mut report).await;
            index += 1;
        }

        info!(
            completed = report.items_completed,
            failed = report.items_failed,
            skipped = report.items_skipped,
            pages = report.pages_total,
            pages_failed = report.pages_failed,
            cancelled = report.cancelled,
            "Batch run finished"
        );
        report
    }

    async fn process_item(&mut self, index: usize, report: &mut RunReport) {
        let item = &mut self.items[index];
        if let Err(err) = item.transition(ItemStatus::Processing) {
            warn!(error = %err, "Item not startable");
            return;
        }
        let id = item.id;
        let source = item.source.clone();
        info!(item_id = %id, source = %source.name, "Processing item");

        let images = match page_images(self.rasterizer.as_ref(), &source) {
            Ok(images) => images,
            Err(err) => {
                warn!(item_id = %id, error = %err, "Source could not be split into pages");
                self.notify(Notice::new(&source.name, None, NoticeOutcome::SourceFailed, &err));
                fail_item(&mut self.items[index], humanize_error(&err).message);
                report.items_failed += 1;
                return;
            }
        };
        let multi_page = images.len() > 1;

        let items = &mut self.items;
        let previews = &mut self.previews;
        let mut on_event = |event: PageEvent<'_>| match event {
            PageEvent::Started { page, total } => {
                items[index].progress_note = Some(progress_note(page, total));
            }
            PageEvent::Finished { page, image, result } => previews.push(PreviewEntry {
                id: format!("{id}-{page}"),
                source_name: source.name.clone(),
                page_number: multi_page.then_some(page),
                image: image.clone(),
                extracted_text: result.text.clone(),
            }),
        };
        let ctx = PageContext {
            recognizer: &self.recognizer,
            preprocessor: &self.preprocessor,
            throttle: &mut self.throttle,
            notifier: self.notifier.as_deref(),
            control: &self.control,
            scope: self.batch_policy.abort_scope,
        };
        let outcome = run_pages(ctx, &source.name, &images, &mut on_event).await;

        report.pages_total += outcome.attempted;
        report.pages_failed += outcome.failed;

        let item = &mut self.items[index];
        item.progress_note = None;
        match outcome.stop {
            None => {
                item.aggregated_text = Some(aggregate_pages(&outcome.pages));
                if let Err(err) = item.transition(ItemStatus::Completed) {
                    warn!(error = %err, "Item not completable");
                }
                report.items_completed += 1;
                info!(item_id = %id, pages = outcome.pages.len(), "Item completed");
            }
            Some(Stop::Aborted(err)) => {
                fail_item(item, humanize_error(&err).message);
                report.items_failed += 1;
                warn!(item_id = %id, error = %err, "Item aborted");
            }
            Some(Stop::Cancelled) => {
                fail_item(item, CANCELLED_MESSAGE.to_string());
                report.items_failed += 1;
                report.cancelled = true;
                info!(item_id = %id, "Item cancelled");
            }
        }
    }

    /// Export every completed item and bundle the documents into one ZIP.
    #[instrument(skip_all)]
    pub fn export_archive(&self, exporter: &DocumentExporter) -> Result<Vec<u8>> {
        let entries = self
            .items
            .iter()
            .filter(|item| item.status() == ItemStatus::Completed)
            .map(|item| {
                let text = item.aggregated_text.as_deref().unwrap_or_default();
                Ok(ArchiveEntry::new(item.source.name.clone(), exporter.export_text(text)?))
            })
            .collect::<Result<Vec<_>>>()?;
        info!(documents = entries.len(), "Bundling completed items");
        ArchiveBundler::new().bundle(&entries)
    }

    fn notify(&self, notice: Notice) {
        if let Some(notifier) = &self.notifier {
            notifier.notify(notice);
        }
    }
}

fn fail_item(item: &mut QueuedItem, message: String) {
    item.progress_note = None;
    item.error_message = Some(message);
    if let Err(err) = item.transition(ItemStatus::Failed) {
        warn!(error = %err, "Item not failable");
    }
}

/// `Processing page k of N...`
pub fn progress_note(page: u32, total: u32) -> String {
    format!("Processing page {page} of {total}...")
}

/// Expand a source into its page images.
fn page_images(rasterizer: &dyn Rasterizer, source: &SourceFile) -> Result<Vec<PageImage>> {
    match source.kind {
        MediaKind::Image => Ok(vec![PageImage::new(
            ImageEncoding::sniff(source.bytes()),
            source.bytes().to_vec(),
        )]),
        MediaKind::Pdf => {
            let images = rasterizer.rasterize(source.bytes())?;
            if images.is_empty() {
                return Err(LipikaError::Rasterization("document has no pages".into()));
            }
            Ok(images)
        }
    }
}

// ---------------------------------------------------------------------------
// Page loop shared by both modes
// ---------------------------------------------------------------------------

struct PageContext<'a, R> {
    recognizer: &'a R,
    preprocessor: &'a ImagePreprocessor,
    throttle: &'a mut Throttle,
    notifier: Option<&'a dyn Notifier>,
    control: &'a RunControl,
    scope: AbortScope,
}

enum PageEvent<'a> {
    Started {
        page: u32,
        total: u32,
    },
    Finished {
        page: u32,
        image: &'a PageImage,
        result: &'a PageResult,
    },
}

enum Stop {
    Aborted(LipikaError),
    Cancelled,
}

struct PageOutcome {
    pages: Vec<PageResult>,
    /// Recognition calls made, including the one that aborted the item.
    attempted: usize,
    failed: usize,
    stop: Option<Stop>,
}

async fn run_pages<R: Recognizer>(
    ctx: PageContext<'_, R>,
    source_name: &str,
    images: &[PageImage],
    on_event: &mut (dyn for<'e> FnMut(PageEvent<'e>) + Send),
) -> PageOutcome {
    let PageContext {
        recognizer,
        preprocessor,
        throttle,
        notifier,
        control,
        scope,
    } = ctx;
    let total = images.len() as u32;
    let mut outcome = PageOutcome {
        pages: Vec::with_capacity(images.len()),
        attempted: 0,
        failed: 0,
        stop: None,
    };
    let notify = |notice: Notice| {
        if let Some(notifier) = notifier {
            notifier.notify(notice);
        }
    };

    for (offset, image) in images.iter().enumerate() {
        let page = offset as u32 + 1;
        if control.is_cancelled() {
            outcome.stop = Some(Stop::Cancelled);
            break;
        }
        on_event(PageEvent::Started { page, total });
        throttle.wait_turn(offset == 0).await;
        if control.is_cancelled() {
            outcome.stop = Some(Stop::Cancelled);
            break;
        }

        outcome.attempted += 1;
        let result = match recognize_page(recognizer, preprocessor, image).await {
            Ok(text) => PageResult::recognised(page, text),
            Err(err) => {
                outcome.failed += 1;
                let kind = err.failure_kind();
                if kind.is_service_limit() && scope == AbortScope::Item {
                    warn!(source = source_name, page, ?kind, error = %err, "Service limit, abandoning item");
                    notify(Notice::new(source_name, Some(page), NoticeOutcome::ItemAborted, &err));
                    outcome.stop = Some(Stop::Aborted(err));
                    break;
                }
                warn!(source = source_name, page, ?kind, error = %err, "Page failed");
                notify(Notice::new(source_name, Some(page), NoticeOutcome::PageSkipped, &err));
                PageResult::failed(page)
            }
        };
        on_event(PageEvent::Finished {
            page,
            image,
            result: &result,
        });
        outcome.pages.push(result);
    }

    outcome
}

async fn recognize_page<R: Recognizer>(
    recognizer: &R,
    preprocessor: &ImagePreprocessor,
    image: &PageImage,
) -> Result<String> {
    let prepared = preprocessor.prepare(image)?;
    recognizer.recognize(&prepared).await
}
