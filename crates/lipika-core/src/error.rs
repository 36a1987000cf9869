// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Lipika.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::ItemStatus;

/// Top-level error type for all Lipika operations.
#[derive(Debug, Error)]
pub enum LipikaError {
    // -- Recognition errors --
    #[error("recognition service rate limit reached: {0}")]
    RateLimited(String),

    #[error("recognition service credits exhausted: {0}")]
    QuotaExceeded(String),

    #[error("recognition failed: {0}")]
    Recognition(String),

    // -- Document errors --
    #[error("unsupported source file: {0}")]
    UnsupportedSource(String),

    #[error("PDF rasterization failed: {0}")]
    Rasterization(String),

    #[error("image processing failed: {0}")]
    Image(String),

    #[error("document export failed: {0}")]
    Export(String),

    #[error("archive assembly failed: {0}")]
    Archive(String),

    // -- Queue --
    #[error("item {item} cannot move from {from:?} to {to:?}")]
    InvalidTransition {
        item: String,
        from: ItemStatus,
        to: ItemStatus,
    },

    #[error("item {0} is not in the queue")]
    UnknownItem(String),

    // -- Configuration / persistence --
    #[error("configuration error: {0}")]
    Config(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// The three outcomes a failed recognition call is classified into.
///
/// Only `RateLimited` and `QuotaExceeded` take part in abort decisions; every
/// other failure degrades a single page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FailureKind {
    RateLimited,
    QuotaExceeded,
    Other,
}

impl FailureKind {
    /// Whether this failure signals that the recognition service refuses
    /// further work for now.
    pub fn is_service_limit(self) -> bool {
        matches!(self, Self::RateLimited | Self::QuotaExceeded)
    }
}

impl LipikaError {
    /// Classify this error for the orchestrator's abort policy.
    ///
    /// Anything that is not an explicit rate-limit or credit signal counts as
    /// `Other`, including image decode errors raised while preparing a page.
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            Self::RateLimited(_) => FailureKind::RateLimited,
            Self::QuotaExceeded(_) => FailureKind::QuotaExceeded,
            _ => FailureKind::Other,
        }
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, LipikaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_limits_are_classified() {
        assert_eq!(
            LipikaError::RateLimited("429".into()).failure_kind(),
            FailureKind::RateLimited
        );
        assert_eq!(
            LipikaError::QuotaExceeded("402".into()).failure_kind(),
            FailureKind::QuotaExceeded
        );
        assert!(FailureKind::QuotaExceeded.is_service_limit());
    }

    #[test]
    fn other_errors_are_not_service_limits() {
        let kind = LipikaError::Image("bad jpeg".into()).failure_kind();
        assert_eq!(kind, FailureKind::Other);
        assert!(!kind.is_service_limit());
    }
}
