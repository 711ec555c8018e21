use std::fmt;

use serde::{Deserialize, Serialize};

/// Heading rank assigned to an outline entry.
///
/// Only the three largest font sizes above the body size ever map to a
/// level, so the hierarchy is capped at `H3`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HeadingLevel {
    H1,
    H2,
    H3,
}

impl fmt::Display for HeadingLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeadingLevel::H1 => write!(f, "H1"),
            HeadingLevel::H2 => write!(f, "H2"),
            HeadingLevel::H3 => write!(f, "H3"),
        }
    }
}

/// A committed heading: immutable once appended to the outline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlineEntry {
    pub level: HeadingLevel,
    pub text: String,
    /// 0-based page index where the heading started.
    pub page: usize,
}

/// The extraction result: a title plus headings in reading order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentOutline {
    pub title: String,
    pub outline: Vec<OutlineEntry>,
}

// ---------------------------------------------------------------------------
// Document model
// ---------------------------------------------------------------------------

/// The smallest text unit with uniform font and size within a line.
#[derive(Debug, Clone, PartialEq)]
pub struct Span {
    pub text: String,
    /// Base font name, e.g. `"Helvetica-Bold"`.
    pub font: String,
    /// Point size as rendered (text matrix scale applied).
    pub size: f32,
}

impl Span {
    /// Point size rounded to the nearest integer, the unit of all
    /// size-based grouping and comparison.
    pub fn rounded_size(&self) -> i32 {
        self.size.round() as i32
    }
}

/// One visually contiguous run of text at a single vertical position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Line {
    pub spans: Vec<Span>,
}

/// Block content classification. Only text blocks feed the outline core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Text,
    Image,
}

/// A vertical group of consecutive lines.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub kind: BlockKind,
    pub lines: Vec<Line>,
}

/// A single page: blocks in document order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub blocks: Vec<Block>,
}

/// The extracted text model of one PDF document, pages in reading order.
///
/// Immutable input to the outline core; borrowed read-only for the duration
/// of one extraction call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    pub pages: Vec<Page>,
}

impl Document {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heading_level_display() {
        assert_eq!(format!("{}", HeadingLevel::H1), "H1");
        assert_eq!(format!("{}", HeadingLevel::H3), "H3");
    }

    #[test]
    fn heading_level_serializes_as_string() {
        let json = serde_json::to_string(&HeadingLevel::H2).unwrap();
        assert_eq!(json, "\"H2\"");
    }

    #[test]
    fn outline_entry_json_shape() {
        let entry = OutlineEntry {
            level: HeadingLevel::H1,
            text: "Introduction".to_string(),
            page: 0,
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["level"], "H1");
        assert_eq!(json["text"], "Introduction");
        assert_eq!(json["page"], 0);
    }

    #[test]
    fn rounded_size_nearest_integer() {
        let span = |size| Span {
            text: String::new(),
            font: String::new(),
            size,
        };
        assert_eq!(span(11.4).rounded_size(), 11);
        assert_eq!(span(11.5).rounded_size(), 12);
        assert_eq!(span(12.0).rounded_size(), 12);
    }

    #[test]
    fn empty_document() {
        let doc = Document::default();
        assert_eq!(doc.page_count(), 0);
    }
}
