// PDF document wrapper: page access, layout extraction and interpretation
use std::path::{Path, PathBuf};

use lopdf::{Dictionary, Document, Object, ObjectId};
use tracing::debug;

use super::content::{resources, ContentInterpreter, ContentSink, Glyph, PaintStyle, PathSegment, IDENTITY};
use super::objects::{inherited, number};
use super::tables::{Edge, TableFinder};
use super::words::{group_words, PdfChar};
use crate::extraction::{PageLayout, WordIndex};
use crate::types::{ExtractError, Result};

/// US Letter, used when no page in the tree declares a MediaBox
const DEFAULT_MEDIA_BOX: [f64; 4] = [0.0, 0.0, 612.0, 792.0];

pub struct PdfDocument {
    path: PathBuf,
    doc: Document,
    pages: Vec<ObjectId>,
}

impl PdfDocument {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let doc = Document::load(&path).map_err(|e| ExtractError::DocumentOpen {
            path: path.clone(),
            message: e.to_string(),
        })?;
        Self::from_document(path, doc)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let path = PathBuf::from("<memory>");
        let doc = Document::load_mem(bytes).map_err(|e| ExtractError::DocumentOpen {
            path: path.clone(),
            message: e.to_string(),
        })?;
        Self::from_document(path, doc)
    }

    fn from_document(path: PathBuf, doc: Document) -> Result<Self> {
        let pages: Vec<ObjectId> = doc.get_pages().into_values().collect();
        if pages.is_empty() {
            return Err(ExtractError::NoPages { path });
        }
        debug!("Opened {} with {} page(s)", path.display(), pages.len());
        Ok(Self { path, doc, pages })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    fn page(&self, index: usize) -> Result<(ObjectId, &Dictionary)> {
        let id = *self
            .pages
            .get(index)
            .ok_or_else(|| ExtractError::Pdf(format!("page {} out of range", index + 1)))?;
        let dict = self.doc.get_dictionary(id)?;
        Ok((id, dict))
    }

    /// `[x0, y0, x1, y1]` of the page in user space, normalized so x0 < x1 and y0 < y1
    pub fn media_box(&self, index: usize) -> Result<[f64; 4]> {
        let (_, page) = self.page(index)?;
        let values: Vec<f64> = match inherited(&self.doc, page, b"MediaBox") {
            Some(Object::Array(items)) => items.iter().filter_map(number).collect(),
            _ => Vec::new(),
        };
        match values.as_slice() {
            [a, b, c, d] => Ok([a.min(*c), b.min(*d), a.max(*c), b.max(*d)]),
            _ => Ok(DEFAULT_MEDIA_BOX),
        }
    }

    /// Run the page's content stream through `sink`
    pub fn interpret(&self, index: usize, sink: &mut dyn ContentSink) -> Result<()> {
        let (id, page) = self.page(index)?;
        let content = self.doc.get_page_content(id)?;
        let page_resources = resources(&self.doc, inherited(&self.doc, page, b"Resources"));
        ContentInterpreter::new(&self.doc).run(&content, page_resources, IDENTITY, sink);
        Ok(())
    }

    /// Words and ruled tables of one page in top-left coordinates
    pub fn page_layout(&self, index: usize) -> Result<PageLayout> {
        let media_box = self.media_box(index)?;
        let mut sink = LayoutSink::new(media_box);
        self.interpret(index, &mut sink)?;

        let words = group_words(sink.chars);
        let tables = TableFinder::default().extract_tables(&sink.edges, &words);
        debug!(
            "Page {}: {} words, {} edges, {} tables",
            index + 1,
            words.len(),
            sink.edges.len(),
            tables.len()
        );

        let width = media_box[2] - media_box[0];
        let height = media_box[3] - media_box[1];
        Ok(PageLayout::new(width, height, WordIndex::new(words)).with_tables(tables))
    }
}

/// Collects characters and ruling edges, flipping to top-left coordinates
struct LayoutSink {
    origin_x: f64,
    top_y: f64,
    chars: Vec<PdfChar>,
    edges: Vec<Edge>,
}

impl LayoutSink {
    fn new(media_box: [f64; 4]) -> Self {
        Self {
            origin_x: media_box[0],
            top_y: media_box[3],
            chars: Vec::new(),
            edges: Vec::new(),
        }
    }

    fn flip(&self, x: f64, y: f64) -> (f64, f64) {
        (x - self.origin_x, self.top_y - y)
    }

    fn push_segment(&mut self, from: (f64, f64), to: (f64, f64)) {
        if let Some(edge) = Edge::from_segment(self.flip(from.0, from.1), self.flip(to.0, to.1)) {
            self.edges.push(edge);
        }
    }
}

impl ContentSink for LayoutSink {
    fn glyph(&mut self, glyph: Glyph) {
        let (x0, top) = self.flip(glyph.x0, glyph.y1);
        let (x1, bottom) = self.flip(glyph.x1, glyph.y0);
        self.chars.push(PdfChar::new(glyph.text, x0, top, x1, bottom));
    }

    fn path(&mut self, segments: &[PathSegment], _style: &PaintStyle) {
        let mut start = (0.0, 0.0);
        let mut current = (0.0, 0.0);
        for segment in segments {
            match *segment {
                PathSegment::MoveTo(x, y) => {
                    start = (x, y);
                    current = start;
                }
                PathSegment::LineTo(x, y) => {
                    self.push_segment(current, (x, y));
                    current = (x, y);
                }
                PathSegment::CurveTo(_, _, _, _, x, y) => current = (x, y),
                PathSegment::Close => {
                    self.push_segment(current, start);
                    current = start;
                }
            }
        }
    }
}
