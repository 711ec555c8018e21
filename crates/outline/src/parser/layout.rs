//! Text extraction and layout grouping.
//!
//! Transforms raw PDF content-stream operators into the [`Document`] model
//! consumed by the outline core. Every function here is a pure
//! transformation; I/O lives behind the [`PdfBackend`] trait.
//!
//! ```text
//! content ops -> PositionedSpan[] -> Line[] -> Block[] -> Page -> Document
//! ```

use super::backend::{number, ContentOp, FontInfo, PageId, PdfBackend, PdfValue};
use crate::model::{Block, BlockKind, Document, Line, Page, Span};
use crate::OutlineError;

/// Two spans whose Y coordinates differ by less than this share a line.
const Y_TOLERANCE: f32 = 1.0;

/// Approximate character width as a fraction of font size, used to advance
/// the text position when glyph metrics are unavailable.
const APPROX_CHAR_WIDTH_RATIO: f32 = 0.5;

/// A vertical gap larger than this multiple of the previous line's font size
/// starts a new block.
const BLOCK_GAP_FACTOR: f32 = 1.4;

/// A text run with its page position, before line/block grouping.
#[derive(Debug, Clone)]
struct PositionedSpan {
    text: String,
    font: String,
    size: f32,
    x: f32,
    y: f32,
}

// ---------------------------------------------------------------------------
// PDF text-state machine
// ---------------------------------------------------------------------------

const IDENTITY_MATRIX: [f32; 6] = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];

/// Mutable state tracked while walking a page's content stream.
#[derive(Debug, Clone)]
struct TextState {
    /// Current font resource key (the `/F1`-style name).
    font_key: Vec<u8>,
    /// Resolved base-font name for the current font.
    font_name: String,
    /// Font size in text-space units.
    font_size: f32,
    /// Elements [a, b, c, d, tx, ty] of the current text matrix.
    text_matrix: [f32; 6],
    /// Text line matrix, set by BT and updated by Td/TD/T*/Tm.
    line_matrix: [f32; 6],
    /// Horizontal scaling factor (percent / 100).
    horiz_scale: f32,
    char_spacing: f32,
    word_spacing: f32,
    text_rise: f32,
    leading: f32,
}

impl Default for TextState {
    fn default() -> Self {
        Self {
            font_key: Vec::new(),
            font_name: String::new(),
            font_size: 0.0,
            text_matrix: IDENTITY_MATRIX,
            line_matrix: IDENTITY_MATRIX,
            horiz_scale: 1.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            text_rise: 0.0,
            leading: 0.0,
        }
    }
}

impl TextState {
    fn x(&self) -> f32 {
        self.text_matrix[4]
    }

    fn y(&self) -> f32 {
        self.text_matrix[5]
    }

    /// Rendered font size: `font_size * sqrt(b^2 + d^2)` of the text matrix.
    fn effective_font_size(&self) -> f32 {
        let scale = (self.text_matrix[1].powi(2) + self.text_matrix[3].powi(2)).sqrt();
        (self.font_size * scale).abs()
    }

    fn advance_x(&mut self, dx: f32) {
        self.text_matrix[4] += dx * self.text_matrix[0];
        self.text_matrix[5] += dx * self.text_matrix[1];
    }

    /// Translate the line matrix (Td / TD / T*).
    fn translate_line(&mut self, tx: f32, ty: f32) {
        let new_tx = self.line_matrix[0] * tx + self.line_matrix[2] * ty + self.line_matrix[4];
        let new_ty = self.line_matrix[1] * tx + self.line_matrix[3] * ty + self.line_matrix[5];
        self.line_matrix[4] = new_tx;
        self.line_matrix[5] = new_ty;
        self.text_matrix = self.line_matrix;
    }

    fn set_font(&mut self, key: Vec<u8>, base_font: &str, size: f32) {
        self.font_key = key;
        self.font_name = base_font.to_string();
        self.font_size = size;
    }

    /// Advance the text position past `text` using the approximate width.
    fn advance_after_show(&mut self, text: &str) {
        let mut dx: f32 = 0.0;
        for ch in text.chars() {
            dx += self.font_size * APPROX_CHAR_WIDTH_RATIO * self.horiz_scale + self.char_spacing;
            if ch == ' ' {
                dx += self.word_spacing;
            }
        }
        self.advance_x(dx);
    }
}

fn resolve_font<'a>(key: &[u8], fonts: &'a [FontInfo]) -> Option<&'a FontInfo> {
    fonts.iter().find(|info| info.key == key)
}

fn decode_operand(
    val: &PdfValue,
    backend: &dyn PdfBackend,
    page_id: PageId,
    font_key: &[u8],
) -> String {
    match val {
        PdfValue::Str(bytes) => backend.decode_text(page_id, font_key, bytes),
        _ => String::new(),
    }
}

/// Walk one page's content stream and collect positioned text spans.
///
/// Implements a simplified text-rendering state machine covering the text
/// object (BT/ET), font (Tf), positioning (Tm/Td/TD/T*/TL), spacing
/// (Tc/Tw/Tz/Ts), and show operators (Tj/TJ/'/\").
fn extract_page_spans(
    backend: &dyn PdfBackend,
    page_id: PageId,
) -> Result<Vec<PositionedSpan>, OutlineError> {
    let raw_content = backend.page_content(page_id)?;
    let ops = backend.decode_content(&raw_content)?;
    let fonts = backend.page_fonts(page_id).unwrap_or_default();

    let mut state = TextState::default();
    let mut spans: Vec<PositionedSpan> = Vec::new();

    for op in &ops {
        match op.operator.as_str() {
            "BT" => {
                state.text_matrix = IDENTITY_MATRIX;
                state.line_matrix = IDENTITY_MATRIX;
            }
            // Font state is kept across text objects: some PDFs rely on a
            // font set in an earlier object.
            "ET" => {}

            "Tf" => {
                if op.operands.len() >= 2 {
                    let key = match &op.operands[0] {
                        PdfValue::Name(n) => n.clone(),
                        PdfValue::Str(s) => s.clone(),
                        _ => continue,
                    };
                    let size = number(&op.operands[1]).unwrap_or(0.0);
                    if let Some(info) = resolve_font(&key, &fonts) {
                        let base = info.base_font.clone().unwrap_or_default();
                        state.set_font(key, &base, size);
                    } else {
                        let name = String::from_utf8_lossy(&key).to_string();
                        state.set_font(key, &name, size);
                    }
                }
            }

            "Tm" => {
                let vals: Vec<f32> = op.operands.iter().take(6).filter_map(number).collect();
                if vals.len() == 6 {
                    state.text_matrix = [vals[0], vals[1], vals[2], vals[3], vals[4], vals[5]];
                    state.line_matrix = state.text_matrix;
                }
            }
            "Td" => {
                if op.operands.len() >= 2 {
                    let tx = number(&op.operands[0]).unwrap_or(0.0);
                    let ty = number(&op.operands[1]).unwrap_or(0.0);
                    state.translate_line(tx, ty);
                }
            }
            "TD" => {
                // Equivalent to: -ty TL ; tx ty Td
                if op.operands.len() >= 2 {
                    let tx = number(&op.operands[0]).unwrap_or(0.0);
                    let ty = number(&op.operands[1]).unwrap_or(0.0);
                    state.leading = -ty;
                    state.translate_line(tx, ty);
                }
            }
            "T*" => {
                state.translate_line(0.0, -state.leading);
            }
            "TL" => {
                if let Some(v) = op.operands.first().and_then(number) {
                    state.leading = v;
                }
            }

            "Tc" => {
                if let Some(v) = op.operands.first().and_then(number) {
                    state.char_spacing = v;
                }
            }
            "Tw" => {
                if let Some(v) = op.operands.first().and_then(number) {
                    state.word_spacing = v;
                }
            }
            "Tz" => {
                if let Some(v) = op.operands.first().and_then(number) {
                    state.horiz_scale = v / 100.0;
                }
            }
            "Ts" => {
                if let Some(v) = op.operands.first().and_then(number) {
                    state.text_rise = v;
                }
            }

            "Tj" => {
                if let Some(first) = op.operands.first() {
                    show_string(first, backend, page_id, &mut state, &mut spans);
                }
            }
            "TJ" => {
                if let Some(PdfValue::Array(arr)) = op.operands.first() {
                    show_adjusted_array(arr, backend, page_id, &mut state, &mut spans);
                }
            }
            "'" => {
                state.translate_line(0.0, -state.leading);
                if let Some(first) = op.operands.first() {
                    show_string(first, backend, page_id, &mut state, &mut spans);
                }
            }
            "\"" => {
                // aw ac string: set Tw and Tc, move to the next line, show.
                if op.operands.len() >= 3 {
                    if let Some(aw) = number(&op.operands[0]) {
                        state.word_spacing = aw;
                    }
                    if let Some(ac) = number(&op.operands[1]) {
                        state.char_spacing = ac;
                    }
                    state.translate_line(0.0, -state.leading);
                    show_string(&op.operands[2], backend, page_id, &mut state, &mut spans);
                }
            }

            _ => {}
        }
    }

    Ok(spans)
}

/// Emit one span for a shown string and advance the text position. Shared by
/// `Tj`, `'`, and `"`.
fn show_string(
    operand: &PdfValue,
    backend: &dyn PdfBackend,
    page_id: PageId,
    state: &mut TextState,
    spans: &mut Vec<PositionedSpan>,
) {
    let text = decode_operand(operand, backend, page_id, &state.font_key);
    if text.is_empty() {
        return;
    }
    spans.push(PositionedSpan {
        text: text.clone(),
        font: state.font_name.clone(),
        size: state.effective_font_size(),
        x: state.x(),
        y: state.y() + state.text_rise,
    });
    state.advance_after_show(&text);
}

/// Process a `TJ` array: strings interleaved with kerning adjustments (in
/// thousandths of a text-space unit). Contiguous fragments accumulate into a
/// single span; a large rightward adjustment inserts a word space.
fn show_adjusted_array(
    arr: &[PdfValue],
    backend: &dyn PdfBackend,
    page_id: PageId,
    state: &mut TextState,
    spans: &mut Vec<PositionedSpan>,
) {
    let mut buf = String::new();
    let mut span_x = state.x();
    let span_y = state.y() + state.text_rise;

    for elem in arr {
        match elem {
            PdfValue::Str(_) => {
                let fragment = decode_operand(elem, backend, page_id, &state.font_key);
                if buf.is_empty() {
                    span_x = state.x();
                }
                buf.push_str(&fragment);
                state.advance_after_show(&fragment);
            }
            val => {
                if let Some(adj) = number(val) {
                    // Negative adjustment moves right.
                    let dx = -adj / 1000.0 * state.font_size * state.horiz_scale;
                    let gap_threshold =
                        state.font_size * APPROX_CHAR_WIDTH_RATIO * state.horiz_scale * 0.3;
                    if dx > gap_threshold && !buf.is_empty() {
                        buf.push(' ');
                    }
                    state.advance_x(dx);
                }
            }
        }
    }

    let trimmed = buf.trim_end();
    if !trimmed.is_empty() {
        spans.push(PositionedSpan {
            text: trimmed.to_string(),
            font: state.font_name.clone(),
            size: state.effective_font_size(),
            x: span_x,
            y: span_y,
        });
    }
}

// ---------------------------------------------------------------------------
// Grouping
// ---------------------------------------------------------------------------

/// Intermediate line carrying position data needed for block grouping.
#[derive(Debug, Clone)]
struct PositionedLine {
    y: f32,
    size: f32,
    spans: Vec<Span>,
}

/// Group positioned spans into lines: spans within [`Y_TOLERANCE`] of each
/// other share a line, ordered left to right.
fn group_into_lines(mut spans: Vec<PositionedSpan>) -> Vec<PositionedLine> {
    if spans.is_empty() {
        return Vec::new();
    }

    // Top of page first, then left to right.
    spans.sort_by(|a, b| {
        b.y.partial_cmp(&a.y)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.x.partial_cmp(&b.x).unwrap_or(std::cmp::Ordering::Equal))
    });

    let mut lines: Vec<PositionedLine> = Vec::new();
    let mut current: Vec<PositionedSpan> = vec![spans.remove(0)];
    let mut current_y = current[0].y;

    for span in spans {
        if (span.y - current_y).abs() <= Y_TOLERANCE {
            current.push(span);
        } else {
            lines.push(assemble_line(std::mem::take(&mut current)));
            current_y = span.y;
            current.push(span);
        }
    }
    if !current.is_empty() {
        lines.push(assemble_line(current));
    }

    lines
}

fn assemble_line(mut spans: Vec<PositionedSpan>) -> PositionedLine {
    spans.sort_by(|a, b| a.x.partial_cmp(&b.x).unwrap_or(std::cmp::Ordering::Equal));
    let y = spans.first().map(|s| s.y).unwrap_or(0.0);
    // Line size follows the first span, matching how the outline walk
    // classifies lines.
    let size = spans.first().map(|s| s.size).unwrap_or(0.0);
    PositionedLine {
        y,
        size,
        spans: spans
            .into_iter()
            .map(|s| Span {
                text: s.text,
                font: s.font,
                size: s.size,
            })
            .collect(),
    }
}

/// Group consecutive lines into text blocks: a vertical gap larger than
/// [`BLOCK_GAP_FACTOR`] times the previous line's font size starts a new
/// block.
fn group_into_blocks(lines: Vec<PositionedLine>) -> Vec<Block> {
    let mut blocks: Vec<Block> = Vec::new();
    let mut current: Vec<Line> = Vec::new();
    let mut prev: Option<(f32, f32)> = None; // (y, size)

    for line in lines {
        if let Some((prev_y, prev_size)) = prev {
            let gap = (prev_y - line.y).abs();
            if gap > prev_size.max(1.0) * BLOCK_GAP_FACTOR && !current.is_empty() {
                blocks.push(Block {
                    kind: BlockKind::Text,
                    lines: std::mem::take(&mut current),
                });
            }
        }
        prev = Some((line.y, line.size));
        current.push(Line { spans: line.spans });
    }
    if !current.is_empty() {
        blocks.push(Block {
            kind: BlockKind::Text,
            lines: current,
        });
    }

    blocks
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Build the [`Document`] model for every page of the backend's document,
/// in page order. Image XObjects referenced by a page contribute one
/// non-text block each, after the page's text blocks.
pub fn build_document(backend: &dyn PdfBackend) -> Result<Document, OutlineError> {
    let page_map = backend.pages();
    let mut pages = Vec::with_capacity(page_map.len());

    for (_page_num, &page_id) in &page_map {
        let spans = extract_page_spans(backend, page_id)?;
        let lines = group_into_lines(spans);
        let mut blocks = group_into_blocks(lines);
        for _ in 0..backend.page_image_count(page_id) {
            blocks.push(Block {
                kind: BlockKind::Image,
                lines: Vec::new(),
            });
        }
        pages.push(Page { blocks });
    }

    Ok(Document { pages })
}
