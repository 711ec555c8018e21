//! PDF container access behind a small trait so the layout pipeline can be
//! tested without real lopdf fixtures.

use std::collections::BTreeMap;

use lopdf::{self, content::Content};

use crate::OutlineError;

/// A page identifier mirroring `lopdf::ObjectId`: (object number, generation number).
pub type PageId = (u32, u16);

/// Font information extracted from a page's resource dictionary.
#[derive(Debug, Clone)]
pub struct FontInfo {
    /// The resource key as it appears in the content stream (e.g. `b"F1"`).
    pub key: Vec<u8>,
    /// Base font name from the font dictionary, if present.
    pub base_font: Option<String>,
}

/// A simplified, lopdf-independent representation of a PDF value, so the
/// layout state machine works with pure data.
#[derive(Debug, Clone, PartialEq)]
pub enum PdfValue {
    Null,
    Bool(bool),
    Integer(i64),
    Real(f32),
    Name(Vec<u8>),
    Str(Vec<u8>),
    Array(Vec<PdfValue>),
    Dict(Vec<(Vec<u8>, PdfValue)>),
    Reference(PageId),
}

/// A single content-stream operation (operator + operands).
#[derive(Debug, Clone)]
pub struct ContentOp {
    pub operator: String,
    pub operands: Vec<PdfValue>,
}

/// Extract an `f32` from a [`PdfValue`], accepting both `Integer` and `Real`.
pub fn number(val: &PdfValue) -> Option<f32> {
    match val {
        PdfValue::Integer(i) => Some(*i as f32),
        PdfValue::Real(f) => Some(*f),
        _ => None,
    }
}

fn convert_object(obj: &lopdf::Object) -> PdfValue {
    match obj {
        lopdf::Object::Null => PdfValue::Null,
        lopdf::Object::Boolean(b) => PdfValue::Bool(*b),
        lopdf::Object::Integer(i) => PdfValue::Integer(*i),
        lopdf::Object::Real(f) => PdfValue::Real(*f),
        lopdf::Object::Name(n) => PdfValue::Name(n.clone()),
        lopdf::Object::String(s, _) => PdfValue::Str(s.clone()),
        lopdf::Object::Array(arr) => PdfValue::Array(arr.iter().map(convert_object).collect()),
        lopdf::Object::Dictionary(dict) => PdfValue::Dict(
            dict.iter()
                .map(|(k, v)| (k.clone(), convert_object(v)))
                .collect(),
        ),
        // Stream bytes are only reachable through `page_content`.
        lopdf::Object::Stream(stream) => PdfValue::Dict(
            stream
                .dict
                .iter()
                .map(|(k, v)| (k.clone(), convert_object(v)))
                .collect(),
        ),
        lopdf::Object::Reference(id) => PdfValue::Reference(*id),
    }
}

/// Best-effort decoding of raw PDF string bytes into a Rust `String`.
///
/// Tries UTF-16BE with BOM, then UTF-8, then falls back to Latin-1.
pub fn decode_text_simple(bytes: &[u8]) -> String {
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        let code_units: Vec<u16> = bytes[2..]
            .chunks(2)
            .filter(|chunk| chunk.len() == 2)
            .map(|chunk| u16::from_be_bytes([chunk[0], chunk[1]]))
            .collect();
        return String::from_utf16_lossy(&code_units);
    }

    if let Ok(s) = std::str::from_utf8(bytes) {
        return s.to_string();
    }

    bytes.iter().map(|&b| b as char).collect()
}

// ---------------------------------------------------------------------------
// PdfBackend trait
// ---------------------------------------------------------------------------

/// Abstraction over the PDF container parser (currently backed by `lopdf`).
pub trait PdfBackend {
    /// Mapping from 1-based page number to [`PageId`], in page order.
    fn pages(&self) -> BTreeMap<u32, PageId>;

    /// Font information for every font referenced by the given page.
    fn page_fonts(&self, page: PageId) -> Result<Vec<FontInfo>, OutlineError>;

    /// Raw (possibly compressed) content stream bytes for a page.
    fn page_content(&self, page: PageId) -> Result<Vec<u8>, OutlineError>;

    /// Decode raw content-stream bytes into a sequence of [`ContentOp`]s.
    fn decode_content(&self, data: &[u8]) -> Result<Vec<ContentOp>, OutlineError>;

    /// Decode string bytes from a text-showing operator, using any
    /// font-specific encoding hints available for the page.
    fn decode_text(&self, page: PageId, font_key: &[u8], bytes: &[u8]) -> String;

    /// Number of image XObjects referenced by the page's resources.
    fn page_image_count(&self, page: PageId) -> usize;
}

// ---------------------------------------------------------------------------
// LopdfBackend
// ---------------------------------------------------------------------------

/// Concrete [`PdfBackend`] backed by [`lopdf::Document`].
pub struct LopdfBackend {
    doc: lopdf::Document,
}

impl LopdfBackend {
    /// Parse a PDF from an in-memory byte slice.
    pub fn load_bytes(data: &[u8]) -> Result<Self, OutlineError> {
        let doc =
            lopdf::Document::load_mem(data).map_err(|e| OutlineError::Parse(e.to_string()))?;

        if doc.is_encrypted() {
            return Err(OutlineError::Encrypted);
        }

        Ok(Self { doc })
    }

    /// Look up the encoding name declared for a font on a page, if any.
    fn font_encoding_name(&self, page: PageId, font_key: &[u8]) -> Option<String> {
        let fonts = self.doc.get_page_fonts(page).ok()?;
        let font_dict = fonts.get(font_key)?;
        match font_dict.get(b"Encoding").ok()? {
            lopdf::Object::Name(name) => Some(String::from_utf8_lossy(name).into_owned()),
            _ => None,
        }
    }

    /// Resolve an object to a dictionary, following one level of indirection.
    fn resolve_dict<'a>(&'a self, obj: &'a lopdf::Object) -> Option<&'a lopdf::Dictionary> {
        match obj {
            lopdf::Object::Dictionary(d) => Some(d),
            lopdf::Object::Reference(id) => match self.doc.get_object(*id).ok()? {
                lopdf::Object::Dictionary(d) => Some(d),
                _ => None,
            },
            _ => None,
        }
    }

    /// Walk up the page tree to find the Resources dictionary.
    fn find_resources<'a>(&'a self, dict: &'a lopdf::Dictionary) -> Option<&'a lopdf::Dictionary> {
        if let Ok(obj) = dict.get(b"Resources") {
            if let Some(resources) = self.resolve_dict(obj) {
                return Some(resources);
            }
        }

        let parent_id = dict.get(b"Parent").ok()?.as_reference().ok()?;
        let parent = self.doc.get_object(parent_id).ok()?.as_dict().ok()?;
        self.find_resources(parent)
    }
}

impl PdfBackend for LopdfBackend {
    fn pages(&self) -> BTreeMap<u32, PageId> {
        self.doc.get_pages()
    }

    fn page_fonts(&self, page: PageId) -> Result<Vec<FontInfo>, OutlineError> {
        let fonts_map = self
            .doc
            .get_page_fonts(page)
            .map_err(|e| OutlineError::Parse(format!("cannot get page fonts: {e}")))?;

        let mut result = Vec::with_capacity(fonts_map.len());
        for (key, dict) in &fonts_map {
            let base_font = dict
                .get(b"BaseFont")
                .ok()
                .and_then(|o| o.as_name().ok())
                .map(|n| String::from_utf8_lossy(n).into_owned());
            result.push(FontInfo {
                key: key.clone(),
                base_font,
            });
        }

        Ok(result)
    }

    fn page_content(&self, page: PageId) -> Result<Vec<u8>, OutlineError> {
        self.doc
            .get_page_content(page)
            .map_err(|e| OutlineError::Parse(format!("cannot get page content: {e}")))
    }

    fn decode_content(&self, data: &[u8]) -> Result<Vec<ContentOp>, OutlineError> {
        let content = Content::decode(data)
            .map_err(|e| OutlineError::Parse(format!("content stream decode error: {e}")))?;

        Ok(content
            .operations
            .into_iter()
            .map(|op| ContentOp {
                operator: op.operator,
                operands: op.operands.iter().map(convert_object).collect(),
            })
            .collect())
    }

    fn decode_text(&self, page: PageId, font_key: &[u8], bytes: &[u8]) -> String {
        // Identity-encoded fonts typically use 2-byte CID codes; try UTF-16BE.
        if let Some(enc_name) = self.font_encoding_name(page, font_key) {
            if enc_name.contains("Identity") && bytes.len() >= 2 && bytes.len() % 2 == 0 {
                let code_units: Vec<u16> = bytes
                    .chunks(2)
                    .map(|c| u16::from_be_bytes([c[0], c[1]]))
                    .collect();
                let decoded = String::from_utf16_lossy(&code_units);
                if !decoded.is_empty() && !decoded.chars().all(|c| c == '\u{FFFD}' || c == '\0') {
                    return decoded;
                }
            }
        }

        decode_text_simple(bytes)
    }

    fn page_image_count(&self, page: PageId) -> usize {
        let Ok(page_obj) = self.doc.get_object(page) else {
            return 0;
        };
        let Ok(page_dict) = page_obj.as_dict() else {
            return 0;
        };
        let Some(resources) = self.find_resources(page_dict) else {
            return 0;
        };
        let Some(xobjects) = resources
            .get(b"XObject")
            .ok()
            .and_then(|o| self.resolve_dict(o))
        else {
            return 0;
        };

        let mut count = 0;
        for (_name, obj) in xobjects.iter() {
            let stream = match obj {
                lopdf::Object::Stream(s) => Some(s),
                lopdf::Object::Reference(id) => match self.doc.get_object(*id) {
                    Ok(lopdf::Object::Stream(s)) => Some(s),
                    _ => None,
                },
                _ => None,
            };
            let is_image = stream.is_some_and(|s| {
                s.dict
                    .get(b"Subtype")
                    .ok()
                    .and_then(|o| o.as_name().ok())
                    .is_some_and(|n| n == b"Image")
            });
            if is_image {
                count += 1;
            }
        }
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_utf8_passthrough() {
        assert_eq!(decode_text_simple(b"Hello, world!"), "Hello, world!");
    }

    #[test]
    fn decode_utf8_multibyte() {
        let input = "caf\u{00E9}";
        assert_eq!(decode_text_simple(input.as_bytes()), "caf\u{00E9}");
    }

    #[test]
    fn decode_latin1_fallback() {
        // 0xE9 is U+00E9 in Latin-1 but not valid standalone UTF-8.
        let input: &[u8] = &[0x63, 0x61, 0x66, 0xE9];
        assert_eq!(decode_text_simple(input), "caf\u{00E9}");
    }

    #[test]
    fn decode_utf16be_with_bom() {
        let input: &[u8] = &[0xFE, 0xFF, 0x00, 0x41, 0x00, 0x42];
        assert_eq!(decode_text_simple(input), "AB");
    }

    #[test]
    fn decode_utf16be_odd_trailing_byte() {
        let input: &[u8] = &[0xFE, 0xFF, 0x00, 0x41, 0x00];
        assert_eq!(decode_text_simple(input), "A");
    }

    #[test]
    fn decode_empty_input() {
        assert_eq!(decode_text_simple(&[]), "");
    }

    #[test]
    fn number_accepts_integers_and_reals() {
        assert_eq!(number(&PdfValue::Integer(42)), Some(42.0));
        assert_eq!(number(&PdfValue::Real(2.5)), Some(2.5));
        assert_eq!(number(&PdfValue::Integer(-10)), Some(-10.0));
    }

    #[test]
    fn number_rejects_non_numeric() {
        assert_eq!(number(&PdfValue::Null), None);
        assert_eq!(number(&PdfValue::Str(b"12".to_vec())), None);
        assert_eq!(number(&PdfValue::Name(b"F1".to_vec())), None);
    }

    #[test]
    fn convert_nested_values() {
        let mut dict = lopdf::Dictionary::new();
        dict.set(
            "Box",
            lopdf::Object::Array(vec![
                lopdf::Object::Integer(0),
                lopdf::Object::Real(612.0),
            ]),
        );
        match convert_object(&lopdf::Object::Dictionary(dict)) {
            PdfValue::Dict(entries) => {
                assert_eq!(entries.len(), 1);
                assert_eq!(
                    entries[0].1,
                    PdfValue::Array(vec![PdfValue::Integer(0), PdfValue::Real(612.0)])
                );
            }
            other => panic!("expected Dict, got {other:?}"),
        }
    }

    #[test]
    fn load_rejects_garbage_bytes() {
        assert!(matches!(
            LopdfBackend::load_bytes(b"not a pdf"),
            Err(OutlineError::Parse(_))
        ));
    }
}
