// Font metrics and character-code decoding for text extraction
use lopdf::{Dictionary, Document, Object};
use std::collections::HashMap;
use tracing::debug;

use super::objects::{as_dict, dict_get, number, stream_bytes};

/// Glyph width used when a font carries no width table, in 1/1000 em
const FALLBACK_WIDTH: f64 = 500.0;
const MAX_RANGE_LEN: u32 = 0x1_0000;

/// One decoded character code
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedGlyph {
    pub code: u32,
    pub text: String,
    /// Advance width in 1/1000 em
    pub width: f64,
    /// Single-byte code 32, the only one word spacing applies to
    pub is_space: bool,
}

#[derive(Debug, Clone, Default)]
pub struct PdfFont {
    widths: HashMap<u32, f64>,
    default_width: f64,
    two_byte: bool,
    to_unicode: Option<ToUnicodeMap>,
    /// Descent below the baseline in 1/1000 em, usually negative
    descent: f64,
}

impl PdfFont {
    /// Font used when a text operator names no known font
    pub fn fallback() -> Self {
        Self {
            default_width: FALLBACK_WIDTH,
            ..Default::default()
        }
    }

    pub fn load(doc: &Document, font: &Dictionary) -> Self {
        let subtype = dict_get(doc, font, b"Subtype")
            .and_then(|o| match o {
                Object::Name(n) => Some(n.clone()),
                _ => None,
            })
            .unwrap_or_default();

        let to_unicode = dict_get(doc, font, b"ToUnicode").and_then(|o| match o {
            Object::Stream(stream) => Some(ToUnicodeMap::parse(&stream_bytes(stream))),
            _ => None,
        });

        if subtype == b"Type0" {
            return Self::load_composite(doc, font, to_unicode);
        }

        let mut widths = HashMap::new();
        let first_char = dict_get(doc, font, b"FirstChar").and_then(number).unwrap_or(0.0) as u32;
        let has_widths = match dict_get(doc, font, b"Widths") {
            Some(Object::Array(list)) => {
                for (i, w) in list.iter().enumerate() {
                    if let Some(w) = super::objects::resolve(doc, w).and_then(number) {
                        widths.insert(first_char + i as u32, w);
                    }
                }
                true
            }
            _ => false,
        };

        let descriptor = dict_get(doc, font, b"FontDescriptor").and_then(|o| as_dict(doc, o));
        let base_font: &[u8] = match dict_get(doc, font, b"BaseFont") {
            Some(Object::Name(n)) => n.as_slice(),
            _ => &[],
        };
        let missing_width = descriptor
            .and_then(|d| dict_get(doc, d, b"MissingWidth"))
            .and_then(number)
            .unwrap_or(0.0);

        Self {
            widths,
            default_width: if has_widths { missing_width } else { FALLBACK_WIDTH },
            two_byte: false,
            to_unicode,
            descent: descent(doc, descriptor)
                .or_else(|| standard_descent(base_font))
                .unwrap_or(0.0),
        }
    }

    fn load_composite(doc: &Document, font: &Dictionary, to_unicode: Option<ToUnicodeMap>) -> Self {
        let descendant = match dict_get(doc, font, b"DescendantFonts") {
            Some(Object::Array(list)) => list.first().and_then(|o| as_dict(doc, o)),
            _ => None,
        };

        let mut widths = HashMap::new();
        let mut default_width = 1000.0;
        let mut descriptor = None;
        if let Some(cid_font) = descendant {
            default_width = dict_get(doc, cid_font, b"DW").and_then(number).unwrap_or(1000.0);
            if let Some(Object::Array(w)) = dict_get(doc, cid_font, b"W") {
                parse_cid_widths(doc, w, &mut widths);
            }
            descriptor = dict_get(doc, cid_font, b"FontDescriptor").and_then(|o| as_dict(doc, o));
        } else {
            debug!("Type0 font without descendant font");
        }

        Self {
            widths,
            default_width,
            two_byte: true,
            to_unicode,
            descent: descent(doc, descriptor).unwrap_or(0.0),
        }
    }

    pub fn descent(&self) -> f64 {
        self.descent
    }

    pub fn is_two_byte(&self) -> bool {
        self.two_byte
    }

    /// Split a string operand into character codes with their text and widths
    pub fn decode(&self, bytes: &[u8]) -> Vec<DecodedGlyph> {
        let step = if self.two_byte { 2 } else { 1 };
        bytes
            .chunks(step)
            .map(|chunk| {
                let code = chunk.iter().fold(0u32, |acc, b| (acc << 8) | *b as u32);
                let text = match self.to_unicode.as_ref().and_then(|m| m.get(code)) {
                    Some(mapped) => mapped.to_string(),
                    None if self.two_byte => char::from_u32(code).map(String::from).unwrap_or_default(),
                    // Latin-1 when no ToUnicode map is available
                    None => char::from(code as u8).to_string(),
                };
                DecodedGlyph {
                    code,
                    text,
                    width: self.widths.get(&code).copied().unwrap_or(self.default_width),
                    is_space: !self.two_byte && code == 32,
                }
            })
            .collect()
    }
}

fn descent(doc: &Document, descriptor: Option<&Dictionary>) -> Option<f64> {
    descriptor
        .and_then(|d| dict_get(doc, d, b"Descent"))
        .and_then(number)
}

/// AFM descent of the standard 14 fonts, which may be used without a
/// FontDescriptor. Symbol and ZapfDingbats publish none.
fn standard_descent(base_font: &[u8]) -> Option<f64> {
    // Subset tag, e.g. `ABCDEF+Helvetica`
    let name = match base_font.iter().position(|b| *b == b'+') {
        Some(plus) => &base_font[plus + 1..],
        None => base_font,
    };
    if name.starts_with(b"Helvetica") {
        Some(-207.0)
    } else if name.starts_with(b"Times-") {
        Some(-217.0)
    } else if name.starts_with(b"Courier") {
        Some(-194.0)
    } else {
        None
    }
}

/// `/W` entries come as `c [w1 w2 ...]` or `c_first c_last w`
fn parse_cid_widths(doc: &Document, list: &[Object], widths: &mut HashMap<u32, f64>) {
    let mut i = 0;
    while i < list.len() {
        let Some(first) = number(&list[i]) else {
            i += 1;
            continue;
        };
        match list.get(i + 1).and_then(|o| super::objects::resolve(doc, o)) {
            Some(Object::Array(ws)) => {
                for (offset, w) in ws.iter().enumerate() {
                    if let Some(w) = number(w) {
                        widths.insert(first as u32 + offset as u32, w);
                    }
                }
                i += 2;
            }
            Some(last) => {
                if let (Some(last), Some(w)) = (number(last), list.get(i + 2).and_then(number)) {
                    let (first, last) = (first as u32, last as u32);
                    for code in first..=last.min(first.saturating_add(MAX_RANGE_LEN)) {
                        widths.insert(code, w);
                    }
                }
                i += 3;
            }
            None => break,
        }
    }
}

/// Character code to Unicode text, from a ToUnicode CMap
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToUnicodeMap {
    map: HashMap<u32, String>,
}

#[derive(Debug, Clone, PartialEq)]
enum CMapToken {
    Hex(Vec<u8>),
    ArrayStart,
    ArrayEnd,
    Word(String),
}

impl ToUnicodeMap {
    pub fn get(&self, code: u32) -> Option<&str> {
        self.map.get(&code).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Parse the `bfchar` and `bfrange` sections of a CMap program
    pub fn parse(data: &[u8]) -> Self {
        let tokens = tokenize(data);
        let mut map = HashMap::new();
        let mut i = 0;
        let mut mode = "";

        while i < tokens.len() {
            match &tokens[i] {
                CMapToken::Word(w) if w == "beginbfchar" || w == "beginbfrange" => {
                    mode = if w == "beginbfchar" { "char" } else { "range" };
                    i += 1;
                }
                CMapToken::Word(w) if w == "endbfchar" || w == "endbfrange" => {
                    mode = "";
                    i += 1;
                }
                CMapToken::Hex(src) if mode == "char" => {
                    if let Some(CMapToken::Hex(dst)) = tokens.get(i + 1) {
                        map.insert(code_of(src), utf16_text(dst));
                    }
                    i += 2;
                }
                CMapToken::Hex(lo) if mode == "range" => {
                    let Some(CMapToken::Hex(hi)) = tokens.get(i + 1) else {
                        i += 1;
                        continue;
                    };
                    let (lo, hi) = (code_of(lo), code_of(hi));
                    let hi = hi.min(lo.saturating_add(MAX_RANGE_LEN));
                    match tokens.get(i + 2) {
                        Some(CMapToken::Hex(dst)) => {
                            for (offset, code) in (lo..=hi).enumerate() {
                                map.insert(code, incremented_text(dst, offset as u32));
                            }
                            i += 3;
                        }
                        Some(CMapToken::ArrayStart) => {
                            let mut j = i + 3;
                            let mut code = lo;
                            while let Some(CMapToken::Hex(dst)) = tokens.get(j) {
                                if code <= hi {
                                    map.insert(code, utf16_text(dst));
                                }
                                code += 1;
                                j += 1;
                            }
                            // Skip the closing bracket
                            i = j + 1;
                        }
                        _ => i += 2,
                    }
                }
                _ => i += 1,
            }
        }

        Self { map }
    }
}

fn code_of(bytes: &[u8]) -> u32 {
    bytes.iter().take(4).fold(0u32, |acc, b| (acc << 8) | *b as u32)
}

fn utf16_text(bytes: &[u8]) -> String {
    if bytes.len() % 2 != 0 {
        return bytes.iter().map(|b| char::from(*b)).collect();
    }
    let units: Vec<u16> = bytes.chunks(2).map(|p| u16::from_be_bytes([p[0], p[1]])).collect();
    String::from_utf16_lossy(&units)
}

/// Destination text for the `offset`-th code of a bfrange
fn incremented_text(dst: &[u8], offset: u32) -> String {
    if dst.len() < 2 || dst.len() % 2 != 0 {
        return utf16_text(dst);
    }
    let mut units: Vec<u16> = dst.chunks(2).map(|p| u16::from_be_bytes([p[0], p[1]])).collect();
    if let Some(last) = units.last_mut() {
        *last = last.wrapping_add(offset as u16);
    }
    String::from_utf16_lossy(&units)
}

fn tokenize(data: &[u8]) -> Vec<CMapToken> {
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < data.len() {
        let b = data[i];
        match b {
            b'%' => {
                while i < data.len() && data[i] != b'\n' && data[i] != b'\r' {
                    i += 1;
                }
            }
            b'<' if data.get(i + 1) == Some(&b'<') => i += 2,
            b'>' => i += 1,
            b'<' => {
                let mut hex = Vec::new();
                i += 1;
                while i < data.len() && data[i] != b'>' {
                    if data[i].is_ascii_hexdigit() {
                        hex.push(data[i]);
                    }
                    i += 1;
                }
                i += 1;
                if hex.len() % 2 != 0 {
                    hex.push(b'0');
                }
                let bytes = hex
                    .chunks(2)
                    .filter_map(|p| std::str::from_utf8(p).ok().and_then(|s| u8::from_str_radix(s, 16).ok()))
                    .collect();
                tokens.push(CMapToken::Hex(bytes));
            }
            b'[' => {
                tokens.push(CMapToken::ArrayStart);
                i += 1;
            }
            b']' => {
                tokens.push(CMapToken::ArrayEnd);
                i += 1;
            }
            b'(' => {
                let mut depth = 0;
                while i < data.len() {
                    match data[i] {
                        b'\\' => i += 1,
                        b'(' => depth += 1,
                        b')' => {
                            depth -= 1;
                            if depth == 0 {
                                break;
                            }
                        }
                        _ => {}
                    }
                    i += 1;
                }
                i += 1;
            }
            _ if b.is_ascii_whitespace() => i += 1,
            _ => {
                let start = i;
                while i < data.len() && !data[i].is_ascii_whitespace() && !b"<>[]()%".contains(&data[i]) {
                    i += 1;
                }
                if i == start {
                    i += 1;
                    continue;
                }
                tokens.push(CMapToken::Word(String::from_utf8_lossy(&data[start..i]).into_owned()));
            }
        }
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::dictionary;

    const CMAP: &[u8] = b"/CIDInit /ProcSet findresource begin
12 dict begin
begincmap
1 begincodespacerange
<0000> <FFFF>
endcodespacerange
2 beginbfchar
<0003> <0020>
<0024> <0041>
endbfchar
2 beginbfrange
<0025> <0027> <0042>
<0030> <0031> [<004D> <004E>]
endbfrange
endcmap";

    #[test]
    fn test_tounicode_bfchar_and_bfrange() {
        let map = ToUnicodeMap::parse(CMAP);
        assert_eq!(map.get(0x0003), Some(" "));
        assert_eq!(map.get(0x0024), Some("A"));
        assert_eq!(map.get(0x0025), Some("B"));
        assert_eq!(map.get(0x0027), Some("D"));
        assert_eq!(map.get(0x0030), Some("M"));
        assert_eq!(map.get(0x0031), Some("N"));
        assert_eq!(map.get(0x0028), None);
        assert_eq!(map.len(), 7);
    }

    #[test]
    fn test_two_byte_decoding_through_tounicode() {
        let font = PdfFont {
            two_byte: true,
            default_width: 1000.0,
            to_unicode: Some(ToUnicodeMap::parse(CMAP)),
            ..Default::default()
        };
        let glyphs = font.decode(&[0x00, 0x24, 0x00, 0x03, 0x00, 0x26]);
        let text: String = glyphs.iter().map(|g| g.text.as_str()).collect();
        assert_eq!(text, "A C");
        assert!(glyphs.iter().all(|g| !g.is_space));
    }

    #[test]
    fn test_simple_font_falls_back_to_latin1() {
        let font = PdfFont::fallback();
        let glyphs = font.decode(b"Caf\xe9 ");
        let text: String = glyphs.iter().map(|g| g.text.as_str()).collect();
        assert_eq!(text, "Café ");
        assert_eq!(glyphs[0].width, FALLBACK_WIDTH);
        assert!(glyphs[4].is_space);
    }

    #[test]
    fn test_standard_font_descent_without_descriptor() {
        let mut doc = Document::with_version("1.5");
        let helvetica = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica-Bold",
        });
        let described = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Times-Roman",
            "FontDescriptor" => dictionary! { "Descent" => -250 },
        });
        let symbol = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Symbol",
        });
        let load = |id| PdfFont::load(&doc, doc.get_object(id).unwrap().as_dict().unwrap());

        assert_eq!(load(helvetica).descent(), -207.0);
        assert_eq!(load(described).descent(), -250.0);
        assert_eq!(load(symbol).descent(), 0.0);
        assert_eq!(standard_descent(b"ABCDEF+Courier"), Some(-194.0));
    }

    #[test]
    fn test_simple_font_width_table() {
        let mut doc = Document::with_version("1.5");
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "TrueType",
            "FirstChar" => 65,
            "Widths" => vec![600.into(), 700.into()],
        });
        let font = PdfFont::load(&doc, doc.get_object(font_id).unwrap().as_dict().unwrap());
        let glyphs = font.decode(b"ABC");
        assert_eq!(glyphs[0].width, 600.0);
        assert_eq!(glyphs[1].width, 700.0);
        assert_eq!(glyphs[2].width, 0.0);
    }

    #[test]
    fn test_cid_width_array_forms() {
        let doc = Document::with_version("1.5");
        let list = vec![
            Object::Integer(1),
            Object::Array(vec![Object::Integer(250), Object::Integer(300)]),
            Object::Integer(10),
            Object::Integer(12),
            Object::Integer(800),
        ];
        let mut widths = HashMap::new();
        parse_cid_widths(&doc, &list, &mut widths);
        assert_eq!(widths.get(&1), Some(&250.0));
        assert_eq!(widths.get(&2), Some(&300.0));
        assert_eq!(widths.get(&11), Some(&800.0));
        assert_eq!(widths.len(), 5);
    }
}
