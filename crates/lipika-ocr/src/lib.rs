// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// lipika-ocr — Driving scanned pages through an external text recognition
// service. Provides the recognizer seam and its HTTP client, call pacing,
// failure notices, and the batch orchestrator that ties the document crate's
// rasterizer and preprocessor to the recognizer.

pub mod gateway;
pub mod http_client;
pub mod notify;
pub mod orchestrator;
pub mod throttle;

pub use gateway::{FailureClassifier, Recognizer};
pub use http_client::HttpRecognizer;
pub use notify::{Notice, NoticeOutcome, Notifier};
pub use orchestrator::{AbortScope, BatchOrchestrator, ItemReport, RunControl, RunPolicy, RunReport};
pub use throttle::Throttle;
