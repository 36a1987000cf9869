// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Failure notices raised while pages are processed.

use lipika_core::error::{FailureKind, LipikaError};
use lipika_core::human_errors::{HumanError, humanize_error};
use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;

/// What a failure did to the work in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NoticeOutcome {
    /// The page got a placeholder; processing continued.
    PageSkipped,
    /// The remaining pages of the item were abandoned.
    ItemAborted,
    /// The source could not be turned into pages at all.
    SourceFailed,
}

/// One failure event. Emitted once per occurrence, never deduplicated.
#[derive(Debug, Clone, Serialize)]
pub struct Notice {
    pub source_name: String,
    /// 1-based page the failure happened on, if any.
    pub page: Option<u32>,
    pub kind: FailureKind,
    pub outcome: NoticeOutcome,
    #[serde(skip)]
    pub human: HumanError,
    /// The underlying error message.
    pub detail: String,
}

impl Notice {
    pub fn new(
        source_name: impl Into<String>,
        page: Option<u32>,
        outcome: NoticeOutcome,
        error: &LipikaError,
    ) -> Self {
        Self {
            source_name: source_name.into(),
            page,
            kind: error.failure_kind(),
            outcome,
            human: humanize_error(error),
            detail: error.to_string(),
        }
    }
}

/// Receives notices as they happen.
pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);
}

impl<F> Notifier for F
where
    F: Fn(Notice) + Send + Sync,
{
    fn notify(&self, notice: Notice) {
        self(notice)
    }
}

impl Notifier for UnboundedSender<Notice> {
    fn notify(&self, notice: Notice) {
        // A dropped receiver means nobody is listening any more.
        let _ = self.send(notice);
    }
}
