// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Recognition gateway — the seam between the orchestrator and whatever turns
// a page image into text, plus the classification of its failures.

use std::sync::Arc;

use async_trait::async_trait;
use lipika_core::config::RecognitionConfig;
use lipika_core::error::{FailureKind, LipikaError, Result};
use lipika_core::types::PageImage;

/// Extracts the text of one page image.
///
/// One invocation makes exactly one attempt; implementations never retry.
/// Failures are reported as `LipikaError::RateLimited`,
/// `LipikaError::QuotaExceeded`, or any other variant for everything else.
#[async_trait]
pub trait Recognizer: Send + Sync {
    async fn recognize(&self, page: &PageImage) -> Result<String>;
}

#[async_trait]
impl<R: Recognizer + ?Sized> Recognizer for Arc<R> {
    async fn recognize(&self, page: &PageImage) -> Result<String> {
        (**self).recognize(page).await
    }
}

#[async_trait]
impl<R: Recognizer + ?Sized> Recognizer for Box<R> {
    async fn recognize(&self, page: &PageImage) -> Result<String> {
        (**self).recognize(page).await
    }
}

/// Sorts a failed call into rate limiting, exhausted credits, or anything else.
///
/// HTTP 429 and 402 are decisive. Otherwise the message is searched for the
/// configured markers (case-sensitive), rate-limit markers first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureClassifier {
    rate_limit_markers: Vec<String>,
    quota_markers: Vec<String>,
}

impl Default for FailureClassifier {
    fn default() -> Self {
        Self::from_config(&RecognitionConfig::default())
    }
}

impl FailureClassifier {
    pub fn new(rate_limit_markers: Vec<String>, quota_markers: Vec<String>) -> Self {
        Self {
            rate_limit_markers,
            quota_markers,
        }
    }

    pub fn from_config(config: &RecognitionConfig) -> Self {
        Self::new(config.rate_limit_markers.clone(), config.quota_markers.clone())
    }

    pub fn classify(&self, status: Option<u16>, message: &str) -> FailureKind {
        match status {
            Some(429) => return FailureKind::RateLimited,
            Some(402) => return FailureKind::QuotaExceeded,
            _ => {}
        }
        let contains_any = |markers: &[String]| {
            markers
                .iter()
                .any(|marker| !marker.is_empty() && message.contains(marker.as_str()))
        };
        if contains_any(&self.rate_limit_markers) {
            FailureKind::RateLimited
        } else if contains_any(&self.quota_markers) {
            FailureKind::QuotaExceeded
        } else {
            FailureKind::Other
        }
    }

    /// Classify and wrap a failure in the matching error variant.
    pub fn to_error(&self, status: Option<u16>, message: impl Into<String>) -> LipikaError {
        let message = message.into();
        match self.classify(status, &message) {
            FailureKind::RateLimited => LipikaError::RateLimited(message),
            FailureKind::QuotaExceeded => LipikaError::QuotaExceeded(message),
            FailureKind::Other => LipikaError::Recognition(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_win_over_message() {
        let classifier = FailureClassifier::default();
        assert_eq!(classifier.classify(Some(429), "whatever"), FailureKind::RateLimited);
        assert_eq!(classifier.classify(Some(402), "Rate limit"), FailureKind::QuotaExceeded);
    }

    #[test]
    fn markers_are_case_sensitive_substrings() {
        let classifier = FailureClassifier::default();
        assert_eq!(
            classifier.classify(None, "upstream said: Rate limit reached"),
            FailureKind::RateLimited
        );
        assert_eq!(
            classifier.classify(Some(500), "not enough credits left"),
            FailureKind::QuotaExceeded
        );
        assert_eq!(classifier.classify(None, "RATE LIMIT"), FailureKind::Other);
        assert_eq!(classifier.classify(Some(500), "bad gateway"), FailureKind::Other);
    }

    #[test]
    fn custom_markers_replace_defaults() {
        let classifier = FailureClassifier::new(vec!["slow down".into()], vec!["pay up".into()]);
        assert_eq!(classifier.classify(None, "please slow down"), FailureKind::RateLimited);
        assert_eq!(classifier.classify(None, "pay up now"), FailureKind::QuotaExceeded);
        assert_eq!(classifier.classify(None, "Rate limit"), FailureKind::Other);
    }

    #[test]
    fn errors_carry_the_message() {
        let err = FailureClassifier::default().to_error(None, "Too Many Requests");
        match err {
            LipikaError::RateLimited(msg) => assert_eq!(msg, "Too Many Requests"),
            other => panic!("unexpected: {other}"),
        }
        assert!(matches!(
            FailureClassifier::default().to_error(Some(503), "down"),
            LipikaError::Recognition(_)
        ));
    }
}
