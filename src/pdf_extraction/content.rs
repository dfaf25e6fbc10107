// Content-stream interpreter feeding glyphs, paths and images to a sink
//
// Coordinates handed to the sink are in default user space (points, origin
// bottom-left); the current transformation matrix is already applied.
use lopdf::content::Content;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use std::collections::HashMap;
use std::rc::Rc;
use tracing::{debug, warn};

use super::fonts::PdfFont;
use super::objects::{as_dict, dict_get, matrix, name, number, resolve, stream_bytes};

pub type Matrix = [f64; 6];

pub const IDENTITY: Matrix = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];

const MAX_FORM_DEPTH: usize = 8;

/// `m` followed by `n`
pub fn concat(m: &Matrix, n: &Matrix) -> Matrix {
    [
        m[0] * n[0] + m[1] * n[2],
        m[0] * n[1] + m[1] * n[3],
        m[2] * n[0] + m[3] * n[2],
        m[2] * n[1] + m[3] * n[3],
        m[4] * n[0] + m[5] * n[2] + n[4],
        m[4] * n[1] + m[5] * n[3] + n[5],
    ]
}

pub fn apply(m: &Matrix, x: f64, y: f64) -> (f64, f64) {
    (x * m[0] + y * m[2] + m[4], x * m[1] + y * m[3] + m[5])
}

fn translation(tx: f64, ty: f64) -> Matrix {
    [1.0, 0.0, 0.0, 1.0, tx, ty]
}

/// One shown character with its bounding box
#[derive(Debug, Clone, PartialEq)]
pub struct Glyph {
    pub text: String,
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
    pub size: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PathSegment {
    MoveTo(f64, f64),
    LineTo(f64, f64),
    CurveTo(f64, f64, f64, f64, f64, f64),
    Close,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PaintStyle {
    pub stroke: bool,
    pub fill: bool,
    pub even_odd: bool,
    pub line_width: f64,
    pub stroke_color: [f32; 3],
    pub fill_color: [f32; 3],
}

/// Receiver of everything a content stream paints
pub trait ContentSink {
    fn glyph(&mut self, _glyph: Glyph) {}
    fn path(&mut self, _segments: &[PathSegment], _style: &PaintStyle) {}
    fn image(&mut self, _image: &Stream, _ctm: &Matrix) {}
}

#[derive(Debug, Clone)]
struct TextState {
    font: Option<Rc<PdfFont>>,
    size: f64,
    char_spacing: f64,
    word_spacing: f64,
    horizontal_scale: f64,
    leading: f64,
    rise: f64,
}

impl Default for TextState {
    fn default() -> Self {
        Self {
            font: None,
            size: 0.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            horizontal_scale: 1.0,
            leading: 0.0,
            rise: 0.0,
        }
    }
}

#[derive(Debug, Clone)]
struct GraphicsState {
    ctm: Matrix,
    line_width: f64,
    stroke_color: [f32; 3],
    fill_color: [f32; 3],
    text: TextState,
}

impl GraphicsState {
    fn new(ctm: Matrix) -> Self {
        Self {
            ctm,
            line_width: 1.0,
            stroke_color: [0.0; 3],
            fill_color: [0.0; 3],
            text: TextState::default(),
        }
    }
}

fn color(operands: &[Object]) -> Option<[f32; 3]> {
    let values: Vec<f32> = operands.iter().filter_map(number).map(|v| v as f32).collect();
    match values.as_slice() {
        [gray] => Some([*gray; 3]),
        [r, g, b] => Some([*r, *g, *b]),
        [c, m, y, k] => Some([(1.0 - c) * (1.0 - k), (1.0 - m) * (1.0 - k), (1.0 - y) * (1.0 - k)]),
        _ => None,
    }
}

pub struct ContentInterpreter<'a> {
    doc: &'a Document,
    fonts: HashMap<ObjectId, Rc<PdfFont>>,
}

impl<'a> ContentInterpreter<'a> {
    pub fn new(doc: &'a Document) -> Self {
        Self {
            doc,
            fonts: HashMap::new(),
        }
    }

    /// Interpret `content` with `resources`, starting from `ctm`
    pub fn run(&mut self, content: &[u8], resources: Option<&'a Dictionary>, ctm: Matrix, sink: &mut dyn ContentSink) {
        let mut state = GraphicsState::new(ctm);
        self.run_with_state(content, resources, &mut state, sink, 0);
    }

    fn run_with_state(
        &mut self,
        content: &[u8],
        resources: Option<&'a Dictionary>,
        state: &mut GraphicsState,
        sink: &mut dyn ContentSink,
        depth: usize,
    ) {
        let operations = match Content::decode(content) {
            Ok(content) => content.operations,
            Err(e) => {
                warn!("Skipping undecodable content stream: {}", e);
                return;
            }
        };

        let mut stack: Vec<GraphicsState> = Vec::new();
        let mut path: Vec<PathSegment> = Vec::new();
        let mut current = (0.0, 0.0);
        let mut text_matrix = IDENTITY;
        let mut line_matrix = IDENTITY;

        for op in &operations {
            let args = op.operands.as_slice();
            let num = |i: usize| args.get(i).and_then(number).unwrap_or(0.0);

            match op.operator.as_str() {
                "q" => stack.push(state.clone()),
                "Q" => {
                    if let Some(saved) = stack.pop() {
                        *state = saved;
                    }
                }
                "cm" => {
                    if let Some(m) = matrix(args) {
                        state.ctm = concat(&m, &state.ctm);
                    }
                }
                "w" => state.line_width = num(0),
                "g" | "rg" | "k" | "sc" | "scn" => {
                    if let Some(c) = color(args) {
                        state.fill_color = c;
                    }
                }
                "G" | "RG" | "K" | "SC" | "SCN" => {
                    if let Some(c) = color(args) {
                        state.stroke_color = c;
                    }
                }

                // Path construction
                "m" => {
                    let (x, y) = apply(&state.ctm, num(0), num(1));
                    path.push(PathSegment::MoveTo(x, y));
                    current = (x, y);
                }
                "l" => {
                    let (x, y) = apply(&state.ctm, num(0), num(1));
                    path.push(PathSegment::LineTo(x, y));
                    current = (x, y);
                }
                "c" | "v" | "y" => {
                    let pts: Vec<(f64, f64)> = (0..args.len() / 2)
                        .map(|i| apply(&state.ctm, num(2 * i), num(2 * i + 1)))
                        .collect();
                    let (c1, c2, end) = match (op.operator.as_str(), pts.as_slice()) {
                        ("c", [c1, c2, end]) => (*c1, *c2, *end),
                        ("v", [c2, end]) => (current, *c2, *end),
                        ("y", [c1, end]) => (*c1, *end, *end),
                        _ => continue,
                    };
                    path.push(PathSegment::CurveTo(c1.0, c1.1, c2.0, c2.1, end.0, end.1));
                    current = end;
                }
                "re" => {
                    let (x, y, w, h) = (num(0), num(1), num(2), num(3));
                    let corners = [(x, y), (x + w, y), (x + w, y + h), (x, y + h)];
                    for (i, (cx, cy)) in corners.iter().enumerate() {
                        let (px, py) = apply(&state.ctm, *cx, *cy);
                        path.push(if i == 0 {
                            PathSegment::MoveTo(px, py)
                        } else {
                            PathSegment::LineTo(px, py)
                        });
                    }
                    path.push(PathSegment::Close);
                    current = apply(&state.ctm, x, y);
                }
                "h" => path.push(PathSegment::Close),

                // Path painting
                "S" | "s" | "f" | "F" | "f*" | "B" | "B*" | "b" | "b*" | "n" => {
                    let operator = op.operator.as_str();
                    if matches!(operator, "s" | "b" | "b*") {
                        path.push(PathSegment::Close);
                    }
                    if operator != "n" && !path.is_empty() {
                        let style = PaintStyle {
                            stroke: matches!(operator, "S" | "s" | "B" | "B*" | "b" | "b*"),
                            fill: !matches!(operator, "S" | "s"),
                            even_odd: operator.ends_with('*'),
                            line_width: state.line_width * scale_factor(&state.ctm),
                            stroke_color: state.stroke_color,
                            fill_color: state.fill_color,
                        };
                        sink.path(&path, &style);
                    }
                    path.clear();
                }

                // Text objects and state
                "BT" => {
                    text_matrix = IDENTITY;
                    line_matrix = IDENTITY;
                }
                "ET" => {}
                "Tf" => {
                    state.text.font = args
                        .first()
                        .and_then(name)
                        .and_then(|font_name| self.font(resources, font_name));
                    state.text.size = num(1);
                }
                "Tc" => state.text.char_spacing = num(0),
                "Tw" => state.text.word_spacing = num(0),
                "Tz" => state.text.horizontal_scale = num(0) / 100.0,
                "TL" => state.text.leading = num(0),
                "Ts" => state.text.rise = num(0),
                "Td" => {
                    line_matrix = concat(&translation(num(0), num(1)), &line_matrix);
                    text_matrix = line_matrix;
                }
                "TD" => {
                    state.text.leading = -num(1);
                    line_matrix = concat(&translation(num(0), num(1)), &line_matrix);
                    text_matrix = line_matrix;
                }
                "Tm" => {
                    if let Some(m) = matrix(args) {
                        line_matrix = m;
                        text_matrix = m;
                    }
                }
                "T*" => {
                    line_matrix = concat(&translation(0.0, -state.text.leading), &line_matrix);
                    text_matrix = line_matrix;
                }

                // Text showing
                "Tj" | "'" | "\"" => {
                    if op.operator == "\"" {
                        state.text.word_spacing = num(0);
                        state.text.char_spacing = num(1);
                    }
                    if op.operator != "Tj" {
                        line_matrix = concat(&translation(0.0, -state.text.leading), &line_matrix);
                        text_matrix = line_matrix;
                    }
                    if let Some(Object::String(bytes, _)) = args.last() {
                        self.show(bytes, state, &mut text_matrix, sink);
                    }
                }
                "TJ" => {
                    if let Some(Object::Array(items)) = args.first() {
                        for item in items {
                            match item {
                                Object::String(bytes, _) => self.show(bytes, state, &mut text_matrix, sink),
                                other => {
                                    if let Some(adjust) = number(other) {
                                        let tx = -adjust / 1000.0 * state.text.size * state.text.horizontal_scale;
                                        text_matrix = concat(&translation(tx, 0.0), &text_matrix);
                                    }
                                }
                            }
                        }
                    }
                }

                "Do" => {
                    if let Some(xobject_name) = args.first().and_then(name) {
                        self.draw_xobject(xobject_name, resources, state, sink, depth);
                    }
                }
                _ => {}
            }
        }
    }

    fn show(&mut self, bytes: &[u8], state: &GraphicsState, text_matrix: &mut Matrix, sink: &mut dyn ContentSink) {
        let font = state.text.font.clone().unwrap_or_else(|| Rc::new(PdfFont::fallback()));
        let ts = &state.text;
        let descent = font.descent() / 1000.0 * ts.size + ts.rise;

        for decoded in font.decode(bytes) {
            let advance = decoded.width / 1000.0 * ts.size * ts.horizontal_scale;
            let to_page = concat(text_matrix, &state.ctm);
            let corners = [
                apply(&to_page, 0.0, descent),
                apply(&to_page, advance, descent),
                apply(&to_page, 0.0, descent + ts.size),
                apply(&to_page, advance, descent + ts.size),
            ];
            if !decoded.text.is_empty() {
                let xs = corners.iter().map(|c| c.0);
                let ys = corners.iter().map(|c| c.1);
                sink.glyph(Glyph {
                    text: decoded.text.clone(),
                    x0: xs.clone().fold(f64::INFINITY, f64::min),
                    x1: xs.fold(f64::NEG_INFINITY, f64::max),
                    y0: ys.clone().fold(f64::INFINITY, f64::min),
                    y1: ys.fold(f64::NEG_INFINITY, f64::max),
                    size: ts.size.abs() * scale_factor(&to_page),
                });
            }

            let spacing = ts.char_spacing + if decoded.is_space { ts.word_spacing } else { 0.0 };
            let tx = advance + spacing * ts.horizontal_scale;
            *text_matrix = concat(&translation(tx, 0.0), text_matrix);
        }
    }

    fn font(&mut self, resources: Option<&'a Dictionary>, font_name: &[u8]) -> Option<Rc<PdfFont>> {
        let doc = self.doc;
        let fonts = resources.and_then(|r| dict_get(doc, r, b"Font")).and_then(|f| as_dict(doc, f))?;
        let entry = fonts.get(font_name).ok()?;
        if let Object::Reference(id) = entry {
            if let Some(font) = self.fonts.get(id) {
                return Some(Rc::clone(font));
            }
            let font = Rc::new(PdfFont::load(doc, as_dict(doc, entry)?));
            self.fonts.insert(*id, Rc::clone(&font));
            return Some(font);
        }
        Some(Rc::new(PdfFont::load(doc, as_dict(doc, entry)?)))
    }

    fn draw_xobject(
        &mut self,
        xobject_name: &[u8],
        resources: Option<&'a Dictionary>,
        state: &GraphicsState,
        sink: &mut dyn ContentSink,
        depth: usize,
    ) {
        let doc = self.doc;
        let Some(stream) = resources
            .and_then(|r| dict_get(doc, r, b"XObject"))
            .and_then(|x| as_dict(doc, x))
            .and_then(|x| dict_get(doc, x, xobject_name))
            .and_then(|o| match o {
                Object::Stream(s) => Some(s),
                _ => None,
            })
        else {
            debug!("XObject /{} not found", String::from_utf8_lossy(xobject_name));
            return;
        };

        match dict_get(doc, &stream.dict, b"Subtype").and_then(name) {
            Some(b"Image") => sink.image(stream, &state.ctm),
            Some(b"Form") if depth < MAX_FORM_DEPTH => {
                let form_matrix = match dict_get(doc, &stream.dict, b"Matrix") {
                    Some(Object::Array(values)) => matrix(values).unwrap_or(IDENTITY),
                    _ => IDENTITY,
                };
                let form_resources = dict_get(doc, &stream.dict, b"Resources")
                    .and_then(|r| as_dict(doc, r))
                    .or(resources);
                let mut form_state = state.clone();
                form_state.ctm = concat(&form_matrix, &state.ctm);
                let content = stream_bytes(stream);
                self.run_with_state(&content, form_resources, &mut form_state, sink, depth + 1);
            }
            _ => {}
        }
    }
}

/// Average linear scale of a matrix, used for line widths and font sizes
fn scale_factor(m: &Matrix) -> f64 {
    (m[0] * m[3] - m[1] * m[2]).abs().sqrt()
}

/// Resolve a page's resource dictionary
pub fn resources<'a>(doc: &'a Document, obj: Option<&'a Object>) -> Option<&'a Dictionary> {
    obj.and_then(|o| resolve(doc, o)).and_then(|o| as_dict(doc, o))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        glyphs: Vec<Glyph>,
        paths: Vec<(Vec<PathSegment>, PaintStyle)>,
    }

    impl ContentSink for Recorder {
        fn glyph(&mut self, glyph: Glyph) {
            self.glyphs.push(glyph);
        }

        fn path(&mut self, segments: &[PathSegment], style: &PaintStyle) {
            self.paths.push((segments.to_vec(), *style));
        }
    }

    fn run(content: &[u8]) -> Recorder {
        let doc = Document::with_version("1.5");
        let mut recorder = Recorder::default();
        ContentInterpreter::new(&doc).run(content, None, IDENTITY, &mut recorder);
        recorder
    }

    #[test]
    fn test_concat_applies_left_matrix_first() {
        let scale = [2.0, 0.0, 0.0, 2.0, 0.0, 0.0];
        let shift = translation(10.0, 5.0);
        assert_eq!(apply(&concat(&scale, &shift), 1.0, 1.0), (12.0, 7.0));
        assert_eq!(apply(&concat(&shift, &scale), 1.0, 1.0), (22.0, 12.0));
    }

    #[test]
    fn test_text_positions_with_fallback_widths() {
        let recorder = run(b"BT /F1 10 Tf 100 700 Td (AB) Tj ET");
        assert_eq!(recorder.glyphs.len(), 2);
        let a = &recorder.glyphs[0];
        let b = &recorder.glyphs[1];
        assert_eq!(a.text, "A");
        assert_eq!((a.x0, a.x1, a.y0, a.y1), (100.0, 105.0, 700.0, 710.0));
        assert_eq!((b.x0, b.x1), (105.0, 110.0));
    }

    #[test]
    fn test_tj_adjustment_and_next_line() {
        let recorder = run(b"BT /F1 10 Tf 12 TL 50 500 Td [(A) -1000 (B)] TJ T* (C) Tj ET");
        let xs: Vec<f64> = recorder.glyphs.iter().map(|g| g.x0).collect();
        assert_eq!(xs, vec![50.0, 65.0, 50.0]);
        assert_eq!(recorder.glyphs[2].y0, 488.0);
    }

    #[test]
    fn test_cm_and_state_restore() {
        let recorder = run(b"q 1 0 0 1 100 0 cm 0 0 m 50 0 l S Q 0 0 m 0 50 l S");
        assert_eq!(recorder.paths.len(), 2);
        assert_eq!(recorder.paths[0].0[1], PathSegment::LineTo(150.0, 0.0));
        assert_eq!(recorder.paths[1].0[1], PathSegment::LineTo(0.0, 50.0));
        assert!(recorder.paths[0].1.stroke && !recorder.paths[0].1.fill);
    }

    #[test]
    fn test_rectangle_fill() {
        let recorder = run(b"0.5 g 10 20 30 40 re f 10 10 m 20 20 l n");
        assert_eq!(recorder.paths.len(), 1);
        let (segments, style) = &recorder.paths[0];
        assert_eq!(segments.len(), 5);
        assert_eq!(segments[2], PathSegment::LineTo(40.0, 60.0));
        assert!(style.fill && !style.stroke);
        assert_eq!(style.fill_color, [0.5, 0.5, 0.5]);
    }
}
