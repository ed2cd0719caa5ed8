//! Document walker.
//!
//! Turns the block structure read from a package into two ordered views that
//! share one position numbering (one position per top-level body child):
//!
//! - the **content items** fed to the chunk assembler: non-empty paragraph
//!   text, flattened table text, header text at [`HEADER_POSITION`] in front
//!   and footer text at [`FOOTER_POSITION`] at the end. Each header paragraph
//!   is pushed to the front as it is met, so headers come out last-seen first;
//! - the **paragraph flow** used for image anchoring and caption lookup:
//!   every body paragraph that has text or images, plus table-cell paragraphs
//!   that carry images.

use crate::models::{ContentItem, ContentKind, FOOTER_POSITION, HEADER_POSITION};
use crate::ooxml::{Block, Paragraph, Table};

/// Separator between the non-empty cells of one table row.
pub const CELL_SEPARATOR: &str = " | ";

/// A paragraph as seen by the image extractor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowParagraph {
    /// Trimmed paragraph text.
    pub text: String,
    /// Relationship ids of images embedded in the paragraph's runs.
    pub image_rels: Vec<String>,
    pub position: i64,
    /// Table-cell paragraphs contribute images but never caption text.
    pub in_table: bool,
}

#[derive(Debug, Clone, Default)]
pub struct Walk {
    pub content: Vec<ContentItem>,
    pub flow: Vec<FlowParagraph>,
}

/// Walk body blocks plus header and footer paragraphs.
pub fn walk(blocks: &[Block], headers: &[Paragraph], footers: &[Paragraph]) -> Walk {
    let mut walk = Walk::default();

    for p in headers.iter().rev() {
        let text = p.text.trim();
        if !text.is_empty() {
            walk.content
                .push(ContentItem::new(ContentKind::Header, text, HEADER_POSITION));
        }
    }

    for (position, block) in (0_i64..).zip(blocks) {
        match block {
            Block::Paragraph(p) => {
                let text = p.text.trim();
                if !text.is_empty() {
                    walk.content
                        .push(ContentItem::new(ContentKind::Paragraph, text, position));
                }
                if !text.is_empty() || !p.image_rels.is_empty() {
                    walk.flow.push(flow_paragraph(p, position, false));
                }
            }
            Block::Table(table) => {
                let text = table_text(table);
                if !text.is_empty() {
                    walk.content
                        .push(ContentItem::new(ContentKind::Table, text, position));
                }
                let image_paragraphs = table
                    .rows
                    .iter()
                    .flatten()
                    .flat_map(|cell| cell.paragraphs.iter())
                    .filter(|p| !p.image_rels.is_empty());
                for p in image_paragraphs {
                    walk.flow.push(flow_paragraph(p, position, true));
                }
            }
            Block::Other => {}
        }
    }

    for p in footers {
        let text = p.text.trim();
        if !text.is_empty() {
            walk.content
                .push(ContentItem::new(ContentKind::Footer, text, FOOTER_POSITION));
        }
    }

    walk
}

fn flow_paragraph(p: &Paragraph, position: i64, in_table: bool) -> FlowParagraph {
    FlowParagraph {
        text: p.text.trim().to_string(),
        image_rels: p.image_rels.clone(),
        position,
        in_table,
    }
}

/// Flatten a table: cells joined with [`CELL_SEPARATOR`], rows with newlines.
/// Rows whose cells are all empty are dropped.
pub fn table_text(table: &Table) -> String {
    table
        .rows
        .iter()
        .filter_map(|row| {
            let cells: Vec<String> = row
                .iter()
                .map(|cell| {
                    cell.paragraphs
                        .iter()
                        .map(|p| p.text.trim())
                        .filter(|t| !t.is_empty())
                        .collect::<Vec<_>>()
                        .join(" ")
                })
                .filter(|t| !t.is_empty())
                .collect();
            (!cells.is_empty()).then(|| cells.join(CELL_SEPARATOR))
        })
        .collect::<Vec<_>>()
        .join("\n")
}
