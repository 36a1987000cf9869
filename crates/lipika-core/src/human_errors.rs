// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable error messages for people feeding scans into Lipika.
//
// Every technical error is mapped to plain English with a clear suggestion.
// The severity drives how loudly a host surfaces the message.

use crate::error::LipikaError;

/// Severity of an error from the user's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Will likely succeed if tried again later.
    Transient,
    /// The user must do something (top up credits, pick another file).
    ActionRequired,
    /// Retrying the same input will not help.
    Permanent,
}

/// A human-readable error with plain English message and actionable suggestion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HumanError {
    /// Plain English summary (shown as a heading).
    pub message: String,
    /// What the user should try (shown as body text).
    pub suggestion: String,
    /// Whether trying again later is worthwhile.
    pub retriable: bool,
    pub severity: Severity,
}

/// Convert a `LipikaError` into a `HumanError`.
pub fn humanize_error(err: &LipikaError) -> HumanError {
    match err {
        // -- Recognition --
        LipikaError::RateLimited(_) => HumanError {
            message: "Rate limit exceeded.".into(),
            suggestion: "The text recognition service is busy. Wait a minute, then process the remaining files again.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        LipikaError::QuotaExceeded(_) => HumanError {
            message: "Recognition credits exhausted.".into(),
            suggestion: "Add credits to the recognition service account, then process the remaining files again.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        LipikaError::Recognition(detail) => HumanError {
            message: "Text recognition failed for this page.".into(),
            suggestion: format!("The page was skipped. Check that the scan is sharp and readable. ({detail})"),
            retriable: true,
            severity: Severity::Transient,
        },

        // -- Documents --
        LipikaError::UnsupportedSource(detail) => HumanError {
            message: "Invalid file type.".into(),
            suggestion: format!("Please upload an image or PDF file. ({detail})"),
            retriable: false,
            severity: Severity::Permanent,
        },

        LipikaError::Rasterization(_) => HumanError {
            message: "This PDF couldn't be opened.".into(),
            suggestion: "The file may be damaged or contain pages we can't turn into images. Try exporting the pages as images instead.".into(),
            retriable: false,
            severity: Severity::Permanent,
        },

        LipikaError::Image(_) => HumanError {
            message: "There's a problem with this image.".into(),
            suggestion: "The image may be damaged or in an unusual format. Try saving it as a JPEG or PNG first.".into(),
            retriable: false,
            severity: Severity::Permanent,
        },

        LipikaError::Export(_) => HumanError {
            message: "The document couldn't be created.".into(),
            suggestion: "The extracted text is still available. Try downloading it again.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        LipikaError::Archive(_) => HumanError {
            message: "The download bundle couldn't be created.".into(),
            suggestion: "Try downloading the documents again, or download them one at a time.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        // -- Queue --
        LipikaError::InvalidTransition { .. } | LipikaError::UnknownItem(_) => HumanError {
            message: "That file is no longer in the queue.".into(),
            suggestion: "Refresh the queue and try again.".into(),
            retriable: false,
            severity: Severity::Permanent,
        },

        // -- Configuration / storage --
        LipikaError::Config(detail) => HumanError {
            message: "The settings file has a problem.".into(),
            suggestion: format!("Fix or delete the settings file to go back to defaults. ({detail})"),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        LipikaError::Io(io_err) => {
            if io_err.kind() == std::io::ErrorKind::NotFound {
                HumanError {
                    message: "The file couldn't be found.".into(),
                    suggestion: "It may have been moved or deleted. Try choosing the file again.".into(),
                    retriable: false,
                    severity: Severity::ActionRequired,
                }
            } else if io_err.kind() == std::io::ErrorKind::PermissionDenied {
                HumanError {
                    message: "Lipika doesn't have permission to use that file.".into(),
                    suggestion: "Check the file permissions, or copy the file to a different location first.".into(),
                    retriable: false,
                    severity: Severity::ActionRequired,
                }
            } else {
                HumanError {
                    message: "There was a problem reading or writing a file.".into(),
                    suggestion: "Try again. If this keeps happening, your disk may be full.".into(),
                    retriable: true,
                    severity: Severity::Transient,
                }
            }
        }

        LipikaError::Serialization(_) => HumanError {
            message: "Lipika had an internal data problem.".into(),
            suggestion: "Try again. If this keeps happening, please report it.".into(),
            retriable: true,
            severity: Severity::Transient,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn the_three_recognition_kinds_read_differently() {
        let rate = humanize_error(&LipikaError::RateLimited("429".into()));
        let quota = humanize_error(&LipikaError::QuotaExceeded("402".into()));
        let other = humanize_error(&LipikaError::Recognition("bad gateway".into()));

        assert_ne!(rate.message, quota.message);
        assert_ne!(rate.message, other.message);
        assert_ne!(quota.message, other.message);
        assert_eq!(quota.severity, Severity::ActionRequired);
        assert!(other.suggestion.contains("bad gateway"));
    }

    #[test]
    fn rasterization_is_permanent() {
        let human = humanize_error(&LipikaError::Rasterization("xref broken".into()));
        assert_eq!(human.severity, Severity::Permanent);
        assert!(!human.retriable);
    }

    #[test]
    fn export_and_archive_failures_are_distinct_from_recognition() {
        let export = humanize_error(&LipikaError::Export("zip".into()));
        let archive = humanize_error(&LipikaError::Archive("zip".into()));
        let recognition = humanize_error(&LipikaError::Recognition("zip".into()));
        assert_ne!(export.message, archive.message);
        assert_ne!(export.message, recognition.message);
    }

    #[test]
    fn missing_file_needs_action() {
        let err = LipikaError::Io(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
        assert_eq!(humanize_error(&err).severity, Severity::ActionRequired);
    }
}
