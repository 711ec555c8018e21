//! The outline walk: a single pass over the document that classifies each
//! qualifying line as title candidate, new heading, heading continuation, or
//! body text, and commits finished headings to the outline.

use std::sync::OnceLock;

use regex::Regex;

use crate::model::{BlockKind, Document, DocumentOutline, HeadingLevel, OutlineEntry};
use crate::stats::HeadingLevelMap;

/// Lines whose first span has fewer trimmed characters than this are skipped.
const MIN_LINE_CHARS: usize = 3;

/// A non-bold line still restarts a heading when its rounded size exceeds
/// the body size by more than this delta.
const SIZE_DELTA_RESTART: i32 = 2;

/// A font name is treated as bold when its lowercased form contains any of
/// these substrings.
const BOLD_MARKERS: [&str; 3] = ["bold", "black", "heavy"];

/// Boldness test on a base font name (e.g. `"Helvetica-Bold"`).
pub fn is_bold_font(font: &str) -> bool {
    let lower = font.to_lowercase();
    BOLD_MARKERS.iter().any(|marker| lower.contains(marker))
}

/// Strip a leading numeric outline prefix such as `"3.2.1 "` or `"10 "`.
///
/// The pattern requires digits at the very start, so `"Chapter 10"` is left
/// unchanged.
fn strip_numeric_prefix(text: &str) -> String {
    static NUMERIC_PREFIX: OnceLock<Regex> = OnceLock::new();
    let re = NUMERIC_PREFIX.get_or_init(|| Regex::new(r"^\d+(\.\d+)*\s*").unwrap());
    re.replace(text, "").trim().to_string()
}

// ---------------------------------------------------------------------------
// Open-heading state machine
// ---------------------------------------------------------------------------

/// The heading currently being accumulated, not yet committed.
///
/// Transitions:
/// - `start` closes any open heading and begins accumulating a new one;
/// - `append` extends the open heading with a continuation line;
/// - `commit` finalizes the open heading into the outline and returns to
///   `Idle` (a no-op when already idle).
#[derive(Debug, Clone, PartialEq)]
enum OpenHeading {
    Idle,
    Accumulating {
        level: HeadingLevel,
        text: String,
        page: usize,
    },
}

impl OpenHeading {
    fn level(&self) -> Option<HeadingLevel> {
        match self {
            OpenHeading::Idle => None,
            OpenHeading::Accumulating { level, .. } => Some(*level),
        }
    }

    fn start(
        &mut self,
        outline: &mut Vec<OutlineEntry>,
        level: HeadingLevel,
        text: &str,
        page: usize,
    ) {
        self.commit(outline);
        *self = OpenHeading::Accumulating {
            level,
            text: text.to_string(),
            page,
        };
    }

    /// Space-joined continuation. Only callable while accumulating; the walk
    /// guards on a matching open level first.
    fn append(&mut self, continuation: &str) {
        if let OpenHeading::Accumulating { text, .. } = self {
            text.push(' ');
            text.push_str(continuation);
        }
    }

    /// Sole mutator of the outline: finalize the accumulated heading into an
    /// immutable entry and reset to `Idle`.
    fn commit(&mut self, outline: &mut Vec<OutlineEntry>) {
        if let OpenHeading::Accumulating { level, text, page } = self {
            if !text.is_empty() {
                outline.push(OutlineEntry {
                    level: *level,
                    text: strip_numeric_prefix(text),
                    page: *page,
                });
            }
        }
        *self = OpenHeading::Idle;
    }
}

// ---------------------------------------------------------------------------
// The walk
// ---------------------------------------------------------------------------

/// Walk the document in reading order and produce the title and outline.
///
/// Classification inspects only the **first span** of each line: headings
/// are assumed to start a line with uniform styling. Lines with no spans or
/// fewer than [`MIN_LINE_CHARS`] trimmed characters never affect the title
/// or the outline, but they do close any open heading.
pub fn build_outline(
    doc: &Document,
    body_size: i32,
    heading_levels: &HeadingLevelMap,
) -> DocumentOutline {
    let mut outline: Vec<OutlineEntry> = Vec::new();
    let mut open = OpenHeading::Idle;
    let mut title = String::new();
    let mut max_title_size = 0;

    for (page_idx, page) in doc.pages.iter().enumerate() {
        for block in &page.blocks {
            if block.kind != BlockKind::Text {
                continue;
            }
            for line in &block.lines {
                let Some(first) = line.spans.first() else {
                    open.commit(&mut outline);
                    continue;
                };
                let text = first.text.trim();
                if text.chars().count() < MIN_LINE_CHARS {
                    open.commit(&mut outline);
                    continue;
                }

                let size = first.rounded_size();

                // Title tracking: largest-sized qualifying line on the first
                // two pages. Strict `>` so ties never overwrite.
                if page_idx <= 1 && size > max_title_size {
                    max_title_size = size;
                    title = text.to_string();
                }

                match heading_levels.get(&size).copied() {
                    Some(level)
                        if is_bold_font(&first.font) || size > body_size + SIZE_DELTA_RESTART =>
                    {
                        open.start(&mut outline, level, text, page_idx);
                    }
                    Some(level) if open.level() == Some(level) => {
                        open.append(text);
                    }
                    _ => {
                        open.commit(&mut outline);
                    }
                }
            }
        }
    }

    open.commit(&mut outline);

    DocumentOutline { title, outline }
}
