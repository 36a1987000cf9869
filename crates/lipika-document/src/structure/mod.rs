// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Structure module — recovering tables, headers, and paragraphs from
// recognised text.

pub mod parser;

pub use parser::{DocumentStructurer, ParsedElement};
