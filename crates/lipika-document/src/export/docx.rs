// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// DOCX export.
//
// Export runs in two steps. `layout` resolves every element into a block with
// explicit sizes, widths, and spacing; it is pure and the thing to compare
// when checking that two exports agree. `export` then encodes the layout with
// `docx-rs`.

use std::io::Cursor;
use std::path::Path;

use docx_rs::{
    BorderType, Docx, LineSpacing, Paragraph, Run, RunFonts, Table, TableBorder,
    TableBorderPosition, TableBorders, TableCell, TableRow, WidthType,
};
use lipika_core::error::{LipikaError, Result};
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::structure::{DocumentStructurer, ParsedElement};

pub use lipika_core::config::ExportConfig as ExportStyle;

/// File extension of exported documents.
pub const DOCUMENT_EXTENSION: &str = "docx";

/// Border width in eighths of a point.
const BORDER_SIZE: usize = 4;

/// A fully resolved document, ready to encode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentLayout {
    pub font: String,
    pub blocks: Vec<LayoutBlock>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LayoutBlock {
    Paragraph(StyledParagraph),
    Table(StyledTable),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StyledParagraph {
    pub text: String,
    /// Half-points.
    pub size: usize,
    pub bold: bool,
    /// Twips.
    pub spacing_before: u32,
    pub spacing_after: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StyledTable {
    pub rows: Vec<StyledRow>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StyledRow {
    pub cells: Vec<String>,
    /// Width of every cell in this row, in twips.
    pub cell_width: usize,
    pub size: usize,
    pub bold: bool,
}

/// Serializes parsed elements into DOCX documents.
#[derive(Debug, Clone, Default)]
pub struct DocumentExporter {
    style: ExportStyle,
}

impl DocumentExporter {
    pub fn new(style: ExportStyle) -> Self {
        Self { style }
    }

    pub fn style(&self) -> &ExportStyle {
        &self.style
    }

    /// Resolve `elements` into blocks.
    ///
    /// With no elements the raw text is laid out one paragraph per line,
    /// blank lines becoming single-space paragraphs.
    pub fn layout(&self, elements: &[ParsedElement], raw_text: &str) -> DocumentLayout {
        let style = &self.style;
        let blocks = if elements.is_empty() {
            raw_text
                .split('\n')
                .map(|line| LayoutBlock::Paragraph(self.body_paragraph(line)))
                .collect()
        } else {
            let top_level = elements
                .iter()
                .filter_map(|element| match element {
                    ParsedElement::Header { level, .. } => Some(*level),
                    _ => None,
                })
                .min();

            elements
                .iter()
                .filter_map(|element| match element {
                    ParsedElement::Table { rows } => self.table(rows).map(LayoutBlock::Table),
                    ParsedElement::Header { level, text } => {
                        let size = if Some(*level) == top_level {
                            style.header_size
                        } else {
                            style.subheader_size
                        };
                        Some(LayoutBlock::Paragraph(StyledParagraph {
                            text: text.clone(),
                            size,
                            bold: true,
                            spacing_before: style.header_spacing_before,
                            spacing_after: style.header_spacing_after,
                        }))
                    }
                    ParsedElement::Paragraph { text } => {
                        Some(LayoutBlock::Paragraph(self.body_paragraph(text)))
                    }
                })
                .collect()
        };

        DocumentLayout {
            font: style.font.clone(),
            blocks,
        }
    }

    fn body_paragraph(&self, text: &str) -> StyledParagraph {
        StyledParagraph {
            text: if text.is_empty() { " ".into() } else { text.to_string() },
            size: self.style.body_size,
            bold: false,
            spacing_before: 0,
            spacing_after: self.style.paragraph_spacing_after,
        }
    }

    /// Rows without cells are dropped; a table left with no rows is omitted.
    fn table(&self, rows: &[Vec<String>]) -> Option<StyledTable> {
        let rows: Vec<StyledRow> = rows
            .iter()
            .filter(|cells| !cells.is_empty())
            .enumerate()
            .map(|(index, cells)| {
                let header = index == 0;
                StyledRow {
                    cells: cells.clone(),
                    cell_width: self.style.content_width / cells.len(),
                    size: if header {
                        self.style.table_header_size
                    } else {
                        self.style.table_body_size
                    },
                    bold: header,
                }
            })
            .collect();
        (!rows.is_empty()).then_some(StyledTable { rows })
    }

    /// Encode `elements` (or the raw-text fallback) as a DOCX file in memory.
    #[instrument(skip_all, fields(elements = elements.len()))]
    pub fn export(&self, elements: &[ParsedElement], raw_text: &str) -> Result<Vec<u8>> {
        let layout = self.layout(elements, raw_text);
        self.encode(&layout)
    }

    /// Structure `text` and export the result.
    pub fn export_text(&self, text: &str) -> Result<Vec<u8>> {
        let elements = DocumentStructurer::new().parse(text);
        self.export(&elements, text)
    }

    /// Export straight to `path`.
    pub fn export_to_file(
        &self,
        elements: &[ParsedElement],
        raw_text: &str,
        path: impl AsRef<Path>,
    ) -> Result<()> {
        let path = path.as_ref();
        let bytes = self.export(elements, raw_text)?;
        std::fs::write(path, &bytes)?;
        info!(path = %path.display(), bytes = bytes.len(), "Document written");
        Ok(())
    }

    /// Encode an already resolved layout.
    pub fn encode(&self, layout: &DocumentLayout) -> Result<Vec<u8>> {
        let fonts = || {
            RunFonts::new()
                .ascii(&layout.font)
                .hi_ansi(&layout.font)
                .east_asia(&layout.font)
                .cs(&layout.font)
        };
        let run = |text: &str, size: usize, bold: bool| {
            let run = Run::new().add_text(text).size(size).fonts(fonts());
            if bold { run.bold() } else { run }
        };

        let mut docx = Docx::new();
        for block in &layout.blocks {
            match block {
                LayoutBlock::Paragraph(p) => {
                    docx = docx.add_paragraph(
                        Paragraph::new()
                            .add_run(run(&p.text, p.size, p.bold))
                            .line_spacing(
                                LineSpacing::new()
                                    .before(p.spacing_before)
                                    .after(p.spacing_after),
                            ),
                    );
                }
                LayoutBlock::Table(t) => {
                    let rows = t
                        .rows
                        .iter()
                        .map(|row| {
                            TableRow::new(
                                row.cells
                                    .iter()
                                    .map(|cell| {
                                        TableCell::new()
                                            .add_paragraph(
                                                Paragraph::new().add_run(run(cell, row.size, row.bold)),
                                            )
                                            .width(row.cell_width, WidthType::Dxa)
                                    })
                                    .collect(),
                            )
                        })
                        .collect();
                    docx = docx.add_table(Table::new(rows).set_borders(single_borders()));
                }
            }
        }

        let mut buffer = Cursor::new(Vec::new());
        docx.build()
            .pack(&mut buffer)
            .map_err(|e| LipikaError::Export(format!("failed to pack document: {e}")))?;
        let bytes = buffer.into_inner();
        debug!(blocks = layout.blocks.len(), bytes = bytes.len(), "Document encoded");
        Ok(bytes)
    }
}

fn single_borders() -> TableBorders {
    [
        TableBorderPosition::Top,
        TableBorderPosition::Left,
        TableBorderPosition::Bottom,
        TableBorderPosition::Right,
        TableBorderPosition::InsideH,
        TableBorderPosition::InsideV,
    ]
    .into_iter()
    .fold(TableBorders::new(), |borders, position| {
        borders.set(
            TableBorder::new(position)
                .border_type(BorderType::Single)
                .size(BORDER_SIZE),
        )
    })
}

/// Document name for a source: extension stripped, `.docx` appended.
pub fn output_name(source_name: &str) -> String {
    let stem = match source_name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => source_name,
    };
    format!("{stem}.{DOCUMENT_EXTENSION}")
}
