//! Typography-driven outline extraction for PDF documents.
//!
//! Derives a document title and an H1/H2/H3 heading hierarchy from visual
//! cues alone (font size, boldness, position), never from the PDF's own
//! bookmark metadata. The pipeline has two stages:
//!
//! 1. [`parser`] turns PDF bytes into a [`Document`] of pages, blocks,
//!    lines, and spans with font and size attributes.
//! 2. [`stats`] + [`builder`] infer the body-text size, rank heading sizes,
//!    and walk the document in reading order committing headings.
//!
//! ```no_run
//! let bytes = std::fs::read("report.pdf")?;
//! let result = outline::extract_outline(&bytes)?;
//! println!("{}: {} headings", result.title, result.outline.len());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use thiserror::Error;

pub mod builder;
pub mod model;
pub mod parser;
pub mod stats;

pub use model::*;
pub use stats::{FontStatistics, HeadingLevelMap};

#[derive(Debug, Error)]
pub enum OutlineError {
    #[error("PDF parsing error: {0}")]
    Parse(String),
    #[error("Document is encrypted")]
    Encrypted,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Extract the title and outline from in-memory PDF bytes.
///
/// Fails with [`OutlineError::Parse`] on malformed input; a well-formed PDF
/// with zero pages is not an error and yields an empty result.
pub fn extract_outline(bytes: &[u8]) -> Result<DocumentOutline, OutlineError> {
    let backend = parser::backend::LopdfBackend::load_bytes(bytes)?;
    let document = parser::layout::build_document(&backend)?;
    Ok(extract_outline_from_document(&document))
}

/// Run the outline core on an already-extracted [`Document`].
///
/// Pure and stateless: safe to call concurrently on independent documents.
/// A document with zero pages short-circuits to an empty result before any
/// statistics are collected.
pub fn extract_outline_from_document(doc: &Document) -> DocumentOutline {
    if doc.pages.is_empty() {
        return DocumentOutline::default();
    }

    let font_stats = stats::collect_font_statistics(doc);
    let (body_size, heading_levels) = stats::classify_heading_sizes(&font_stats);
    builder::build_outline(doc, body_size, &heading_levels)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_pages_short_circuits() {
        let result = extract_outline_from_document(&Document::default());
        assert_eq!(result.title, "");
        assert!(result.outline.is_empty());
    }

    #[test]
    fn extraction_is_deterministic() {
        let doc = Document {
            pages: vec![Page {
                blocks: vec![Block {
                    kind: BlockKind::Text,
                    lines: vec![
                        Line {
                            spans: vec![Span {
                                text: "2.1 Setup".to_string(),
                                font: "Times-Bold".to_string(),
                                size: 16.0,
                            }],
                        },
                        Line {
                            spans: vec![Span {
                                text: "body text one".to_string(),
                                font: "Times".to_string(),
                                size: 12.0,
                            }],
                        },
                        Line {
                            spans: vec![Span {
                                text: "body text two".to_string(),
                                font: "Times".to_string(),
                                size: 12.0,
                            }],
                        },
                    ],
                }],
            }],
        };

        let first = extract_outline_from_document(&doc);
        let second = extract_outline_from_document(&doc);
        assert_eq!(first, second);
        assert_eq!(first.outline.len(), 1);
        assert_eq!(first.outline[0].text, "Setup");
    }

    #[test]
    fn malformed_bytes_fail_with_parse_error() {
        assert!(matches!(
            extract_outline(b"definitely not a pdf"),
            Err(OutlineError::Parse(_))
        ));
    }
}
