//! Document-wide font statistics and heading-size classification.
//!
//! Two pure passes: [`collect_font_statistics`] builds frequency maps over
//! every span in the document, and [`classify_heading_sizes`] derives the
//! body-text size plus a ranked map of heading sizes from them.

use std::collections::HashMap;

use crate::model::{BlockKind, Document, HeadingLevel};

/// Body size used when a document contains no spans at all.
pub const DEFAULT_BODY_SIZE: i32 = 12;

/// Rounded font size -> heading rank. At most three entries; every key is
/// strictly greater than the body size.
pub type HeadingLevelMap = HashMap<i32, HeadingLevel>;

/// Frequency maps accumulated over all spans in a document.
///
/// Every span contributes exactly one count to each map, including
/// whitespace-only and single-character spans.
#[derive(Debug, Clone, Default)]
pub struct FontStatistics {
    pub font_counts: HashMap<String, u64>,
    pub size_counts: HashMap<i32, u64>,
}

impl FontStatistics {
    /// Total number of spans observed (both maps conserve this sum).
    pub fn span_count(&self) -> u64 {
        self.size_counts.values().sum()
    }
}

/// Visit every span of every line of every text block and count its font
/// name and rounded size. Image blocks are skipped.
pub fn collect_font_statistics(doc: &Document) -> FontStatistics {
    let mut stats = FontStatistics::default();

    for page in &doc.pages {
        for block in &page.blocks {
            if block.kind != BlockKind::Text {
                continue;
            }
            for line in &block.lines {
                for span in &line.spans {
                    *stats.font_counts.entry(span.font.clone()).or_insert(0) += 1;
                    *stats.size_counts.entry(span.rounded_size()).or_insert(0) += 1;
                }
            }
        }
    }

    stats
}

/// Derive `(body_size, heading_level_map)` from collected statistics.
///
/// The body size is the mode of the size histogram. When several sizes tie
/// for the maximum count, the smallest one wins: a smaller size is the
/// likelier running text, which leaves the larger tied size available as a
/// heading candidate. Sizes strictly greater than the body size are ranked
/// descending and the top three become H1, H2, and H3.
pub fn classify_heading_sizes(stats: &FontStatistics) -> (i32, HeadingLevelMap) {
    let body_size = stats
        .size_counts
        .iter()
        .max_by(|(size_a, count_a), (size_b, count_b)| {
            count_a.cmp(count_b).then_with(|| size_b.cmp(size_a))
        })
        .map(|(&size, _)| size)
        .unwrap_or(DEFAULT_BODY_SIZE);

    let mut candidates: Vec<i32> = stats
        .size_counts
        .keys()
        .copied()
        .filter(|&size| size > body_size)
        .collect();
    candidates.sort_unstable_by(|a, b| b.cmp(a));

    let levels = [HeadingLevel::H1, HeadingLevel::H2, HeadingLevel::H3];
    let heading_levels: HeadingLevelMap =
        candidates.into_iter().zip(levels).collect();

    (body_size, heading_levels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Block, Line, Page, Span};

    fn span(text: &str, font: &str, size: f32) -> Span {
        Span {
            text: text.to_string(),
            font: font.to_string(),
            size,
        }
    }

    fn text_page(spans_by_line: Vec<Vec<Span>>) -> Page {
        Page {
            blocks: vec![Block {
                kind: BlockKind::Text,
                lines: spans_by_line
                    .into_iter()
                    .map(|spans| Line { spans })
                    .collect(),
            }],
        }
    }

    #[test]
    fn empty_document_yields_empty_maps() {
        let stats = collect_font_statistics(&Document::default());
        assert!(stats.font_counts.is_empty());
        assert!(stats.size_counts.is_empty());
        assert_eq!(stats.span_count(), 0);
    }

    #[test]
    fn every_span_counts_once() {
        let doc = Document {
            pages: vec![text_page(vec![
                vec![span("Title", "Serif-Bold", 20.0), span(" ", "Serif", 12.0)],
                vec![span("body", "Serif", 12.0)],
            ])],
        };
        let stats = collect_font_statistics(&doc);

        // Conservation: both maps sum to the total span count.
        assert_eq!(stats.span_count(), 3);
        assert_eq!(stats.font_counts.values().sum::<u64>(), 3);
        assert_eq!(stats.size_counts[&12], 2);
        assert_eq!(stats.size_counts[&20], 1);
        assert_eq!(stats.font_counts["Serif"], 2);
        assert_eq!(stats.font_counts["Serif-Bold"], 1);
    }

    #[test]
    fn image_blocks_are_skipped() {
        let doc = Document {
            pages: vec![Page {
                blocks: vec![
                    Block {
                        kind: BlockKind::Image,
                        lines: vec![Line {
                            spans: vec![span("caption", "Serif", 10.0)],
                        }],
                    },
                    Block {
                        kind: BlockKind::Text,
                        lines: vec![Line {
                            spans: vec![span("body", "Serif", 12.0)],
                        }],
                    },
                ],
            }],
        };
        let stats = collect_font_statistics(&doc);
        assert_eq!(stats.span_count(), 1);
        assert!(!stats.size_counts.contains_key(&10));
    }

    #[test]
    fn body_size_is_the_mode() {
        let mut stats = FontStatistics::default();
        stats.size_counts.insert(12, 80);
        stats.size_counts.insert(18, 5);
        stats.size_counts.insert(24, 1);

        let (body_size, _) = classify_heading_sizes(&stats);
        assert_eq!(body_size, 12);
    }

    #[test]
    fn body_size_defaults_to_12_when_empty() {
        let (body_size, levels) = classify_heading_sizes(&FontStatistics::default());
        assert_eq!(body_size, DEFAULT_BODY_SIZE);
        assert!(levels.is_empty());
    }

    #[test]
    fn tie_break_prefers_smaller_size() {
        let mut stats = FontStatistics::default();
        stats.size_counts.insert(14, 10);
        stats.size_counts.insert(10, 10);
        stats.size_counts.insert(11, 3);

        let (body_size, levels) = classify_heading_sizes(&stats);
        assert_eq!(body_size, 10);
        // The tied 14 stays available as a heading candidate.
        assert_eq!(levels[&14], HeadingLevel::H1);
    }

    #[test]
    fn top_three_sizes_map_to_levels_descending() {
        let mut stats = FontStatistics::default();
        stats.size_counts.insert(12, 100);
        stats.size_counts.insert(14, 4);
        stats.size_counts.insert(18, 3);
        stats.size_counts.insert(24, 2);
        stats.size_counts.insert(30, 1);

        let (body_size, levels) = classify_heading_sizes(&stats);
        assert_eq!(body_size, 12);
        assert_eq!(levels.len(), 3);
        assert_eq!(levels[&30], HeadingLevel::H1);
        assert_eq!(levels[&24], HeadingLevel::H2);
        assert_eq!(levels[&18], HeadingLevel::H3);
        // The fourth-largest size is never a heading.
        assert!(!levels.contains_key(&14));
        // Every key is strictly greater than the body size.
        assert!(levels.keys().all(|&size| size > body_size));
    }

    #[test]
    fn fewer_candidates_yield_fewer_entries() {
        let mut stats = FontStatistics::default();
        stats.size_counts.insert(12, 50);
        stats.size_counts.insert(16, 2);

        let (_, levels) = classify_heading_sizes(&stats);
        assert_eq!(levels.len(), 1);
        assert_eq!(levels[&16], HeadingLevel::H1);
    }

    #[test]
    fn no_sizes_above_body_yield_empty_map() {
        let mut stats = FontStatistics::default();
        stats.size_counts.insert(12, 50);
        stats.size_counts.insert(9, 10);

        let (body_size, levels) = classify_heading_sizes(&stats);
        assert_eq!(body_size, 12);
        assert!(levels.is_empty());
    }
}
