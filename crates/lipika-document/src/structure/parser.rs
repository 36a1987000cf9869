// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Line-oriented parser for recognised text.
//
// The recogniser emits lightweight markdown: pipe tables, `##` headers, and
// plain lines. Parsing is a single forward pass with one line of lookahead
// (to confirm a table header row) and no backtracking.

use lipika_core::types::PAGE_BREAK_MARKER;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

/// One structural element of a recognised document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ParsedElement {
    /// Rows of trimmed cells. Rows may differ in cell count.
    Table { rows: Vec<Vec<String>> },
    /// A header of level 2 or deeper.
    Header { level: usize, text: String },
    /// A single source line, verbatim.
    Paragraph { text: String },
}

/// Parser turning aggregated text into [`ParsedElement`]s.
#[derive(Debug, Default, Clone, Copy)]
pub struct DocumentStructurer;

impl DocumentStructurer {
    pub fn new() -> Self {
        Self
    }

    /// Parse `text` into elements in reading order.
    ///
    /// Returns an empty list when the text holds nothing but blank lines and
    /// page-break markers.
    #[instrument(skip_all, fields(text_len = text.len()))]
    pub fn parse(&self, text: &str) -> Vec<ParsedElement> {
        let lines: Vec<&str> = text.lines().collect();
        let mut elements = Vec::new();
        let mut i = 0;

        while i < lines.len() {
            let line = lines[i];

            if line.contains('|') && lines.get(i + 1).is_some_and(|next| is_separator(next)) {
                let mut rows = Vec::new();
                while i < lines.len() && lines[i].contains('|') {
                    if !is_separator(lines[i]) {
                        rows.push(split_row(lines[i]));
                    }
                    i += 1;
                }
                elements.push(ParsedElement::Table { rows });
                continue;
            }

            let trimmed = line.trim();
            if let Some((level, text)) = header(trimmed) {
                elements.push(ParsedElement::Header {
                    level,
                    text: text.to_string(),
                });
            } else if !trimmed.is_empty() && !line.contains(PAGE_BREAK_MARKER) {
                elements.push(ParsedElement::Paragraph {
                    text: line.to_string(),
                });
            }
            i += 1;
        }

        debug!(elements = elements.len(), "Text structured");
        elements
    }
}

/// `## Title` → `(2, "Title")`. A lone `#` is not a header.
fn header(trimmed: &str) -> Option<(usize, &str)> {
    let level = trimmed.chars().take_while(|&c| c == '#').count();
    if level < 2 {
        return None;
    }
    Some((level, trimmed[level..].trim()))
}

/// Markdown table separator such as `|---|:--:|` or `--- | ---`.
fn is_separator(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.contains("---")
        && trimmed
            .chars()
            .all(|c| matches!(c, '-' | ':' | '|' | ' ' | '\t'))
}

/// Split a row on `|`, trimming cells and dropping the empty fragments
/// produced by leading and trailing pipes. Interior empty cells are kept.
fn split_row(line: &str) -> Vec<String> {
    let mut cells: Vec<&str> = line.split('|').map(str::trim).collect();
    if cells.first().is_some_and(|c| c.is_empty()) {
        cells.remove(0);
    }
    if cells.last().is_some_and(|c| c.is_empty()) {
        cells.pop();
    }
    cells.into_iter().map(String::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use lipika_core::types::PAGE_BREAK;

    fn parse(text: &str) -> Vec<ParsedElement> {
        DocumentStructurer::new().parse(text)
    }

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn minimal_pipe_table() {
        assert_eq!(
            parse("a|b\n|---|---|\n1|2"),
            vec![ParsedElement::Table {
                rows: vec![row(&["a", "b"]), row(&["1", "2"])],
            }]
        );
    }

    #[test]
    fn headers_take_level_from_hash_count() {
        assert_eq!(
            parse("## Title\n### Sub"),
            vec![
                ParsedElement::Header { level: 2, text: "Title".into() },
                ParsedElement::Header { level: 3, text: "Sub".into() },
            ]
        );
    }

    #[test]
    fn single_hash_is_a_paragraph() {
        assert_eq!(
            parse("# not a header"),
            vec![ParsedElement::Paragraph { text: "# not a header".into() }]
        );
    }

    #[test]
    fn paragraphs_keep_the_line_verbatim() {
        assert_eq!(
            parse("  indented line  "),
            vec![ParsedElement::Paragraph { text: "  indented line  ".into() }]
        );
    }

    #[test]
    fn blank_lines_and_page_breaks_are_dropped() {
        let text = format!("first{PAGE_BREAK}second\n\n\n");
        assert_eq!(
            parse(&text),
            vec![
                ParsedElement::Paragraph { text: "first".into() },
                ParsedElement::Paragraph { text: "second".into() },
            ]
        );
    }

    #[test]
    fn pipe_line_without_separator_is_a_paragraph() {
        assert_eq!(
            parse("a | b\nplain"),
            vec![
                ParsedElement::Paragraph { text: "a | b".into() },
                ParsedElement::Paragraph { text: "plain".into() },
            ]
        );
    }

    #[test]
    fn table_stops_at_first_line_without_pipe() {
        let text = "| Name | Age |\n|:---|---:|\n| Rahim | 30 |\n| Karim |\nafter";
        assert_eq!(
            parse(text),
            vec![
                ParsedElement::Table {
                    rows: vec![row(&["Name", "Age"]), row(&["Rahim", "30"]), row(&["Karim"])],
                },
                ParsedElement::Paragraph { text: "after".into() },
            ]
        );
    }

    #[test]
    fn interior_empty_cells_survive() {
        assert_eq!(
            parse("| a | | c |\n|---|---|---|"),
            vec![ParsedElement::Table { rows: vec![row(&["a", "", "c"])] }]
        );
    }

    #[test]
    fn mixed_document_in_order() {
        let text = "## রিপোর্ট\nইনট্রো লাইন\n\nক|খ\n|---|---|\n১|২\n### শেষ";
        let elements = parse(text);
        assert_eq!(elements.len(), 4);
        assert!(matches!(elements[0], ParsedElement::Header { level: 2, .. }));
        assert!(matches!(elements[1], ParsedElement::Paragraph { .. }));
        assert!(matches!(elements[2], ParsedElement::Table { .. }));
        assert_eq!(
            elements[3],
            ParsedElement::Header { level: 3, text: "শেষ".into() }
        );
    }

    #[test]
    fn whitespace_only_text_yields_nothing() {
        assert!(parse("  \n\n--- Page Break ---\n").is_empty());
    }
}
