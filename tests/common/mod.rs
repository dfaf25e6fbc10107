// Shared helpers: synthetic STR forms written with lopdf
#![allow(dead_code)]

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use std::path::{Path, PathBuf};

pub const PAGE_WIDTH: f64 = 595.0;
pub const PAGE_HEIGHT: f64 = 842.0;
pub const FONT_SIZE: f64 = 10.0;
pub const BORDER_INSET: f64 = 28.34;

fn real(v: f64) -> Object {
    Object::Real(v as f32)
}

/// Builds a multi-page form. Positions are given top-left like the
/// templates; `shift` moves everything for the bordered revision.
pub struct FormBuilder {
    pages: Vec<Vec<Operation>>,
    shift: f64,
}

impl FormBuilder {
    pub fn new(page_count: usize) -> Self {
        Self {
            pages: vec![Vec::new(); page_count],
            shift: 0.0,
        }
    }

    /// Bordered revision: a stroked frame on page 1 and all content shifted
    pub fn bordered(mut self) -> Self {
        self.shift = BORDER_INSET;
        let inset = BORDER_INSET;
        self.pages[0].extend([
            Operation::new("w", vec![real(1.5)]),
            Operation::new(
                "re",
                vec![
                    real(inset),
                    real(inset),
                    real(PAGE_WIDTH - 2.0 * inset),
                    real(PAGE_HEIGHT - 2.0 * inset),
                ],
            ),
            Operation::new("S", vec![]),
        ]);
        self
    }

    /// Text whose first glyph's top-left corner lands at (x, top)
    pub fn text(&mut self, page: usize, x: f64, top: f64, text: &str) -> &mut Self {
        let baseline = PAGE_HEIGHT - (top + self.shift) - FONT_SIZE;
        self.pages[page].extend([
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), real(FONT_SIZE)]),
            Operation::new("Td", vec![real(x + self.shift), real(baseline)]),
            Operation::new("Tj", vec![Object::string_literal(text)]),
            Operation::new("ET", vec![]),
        ]);
        self
    }

    /// Several lines of `(x, top, text)`
    pub fn lines(&mut self, page: usize, lines: &[(f64, f64, &str)]) -> &mut Self {
        for (x, top, text) in lines {
            self.text(page, *x, *top, text);
        }
        self
    }

    fn line(&mut self, page: usize, from: (f64, f64), to: (f64, f64)) {
        let flip = |(x, top): (f64, f64)| (x + self.shift, PAGE_HEIGHT - (top + self.shift));
        let (a, b) = (flip(from), flip(to));
        self.pages[page].extend([
            Operation::new("m", vec![real(a.0), real(a.1)]),
            Operation::new("l", vec![real(b.0), real(b.1)]),
            Operation::new("S", vec![]),
        ]);
    }

    /// Ruled table with its top-left corner at (x, top)
    pub fn table(&mut self, page: usize, x: f64, top: f64, widths: &[f64], rows: &[Vec<&str>]) -> &mut Self {
        const ROW_HEIGHT: f64 = 16.0;
        let total_width: f64 = widths.iter().sum();
        let bottom = top + ROW_HEIGHT * rows.len() as f64;

        for r in 0..=rows.len() {
            let y = top + ROW_HEIGHT * r as f64;
            self.line(page, (x, y), (x + total_width, y));
        }
        let mut col_x = x;
        for c in 0..=widths.len() {
            self.line(page, (col_x, top), (col_x, bottom));
            if let Some(w) = widths.get(c) {
                col_x += w;
            }
        }

        for (r, row) in rows.iter().enumerate() {
            let mut cell_x = x;
            for (c, cell) in row.iter().enumerate() {
                if !cell.is_empty() {
                    self.text(page, cell_x + 3.0, top + ROW_HEIGHT * r as f64 + 3.0, cell);
                }
                cell_x += widths.get(c).copied().unwrap_or(0.0);
            }
        }
        self
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let mut kids: Vec<Object> = Vec::new();
        for ops in &self.pages {
            let content = Content { operations: ops.clone() };
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(page_id.into());
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
                "Resources" => resources_id,
                "MediaBox" => vec![0.into(), 0.into(), real(PAGE_WIDTH), real(PAGE_HEIGHT)],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut buf = Vec::new();
        doc.save_to(&mut buf).unwrap();
        buf
    }

    pub fn write_to(&self, dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, self.to_bytes()).unwrap();
        path
    }
}

/// Applicant block of page 1, one unit inside each template box
pub fn applicant(status: &str) -> Vec<(f64, f64, &str)> {
    vec![
        (431.0, 72.0, "24/03/2024"),
        (40.0, 110.0, "MAKLUMAT PEMOHON"),
        (191.0, 130.0, "AHMAD BIN ALI"),
        (191.0, 144.0, "740307015359"),
        (401.0, 144.0, "50"),
        (191.0, 158.0, "LELAKI"),
        (191.0, 172.0, status),
        (191.0, 186.0, "NO 12 JALAN MAWAR"),
        (191.0, 214.0, "43000"),
        (301.0, 214.0, "KAJANG"),
        (191.0, 228.0, "SELANGOR"),
        (191.0, 242.0, "0123456789"),
        (191.0, 256.0, "AHMAD@MAIL.COM"),
        (191.0, 270.0, "GURU"),
        (191.0, 298.0, "MAYBANK"),
        (401.0, 298.0, "1234567890"),
    ]
}

/// Spouse block as printed in the spouse-inclusive layout
pub fn spouse() -> Vec<(f64, f64, &'static str)> {
    vec![
        (40.0, 330.0, "MAKLUMAT PASANGAN"),
        (191.0, 350.0, "SITI BINTI ABU"),
        (191.0, 364.0, "750101015678"),
        (401.0, 364.0, "012-9876543"),
        (191.0, 378.0, "PEREMPUAN"),
    ]
}

/// Next-of-kin block with its header at `top`
pub fn next_of_kin(top: f64) -> Vec<(f64, f64, &'static str)> {
    vec![
        (40.0, top, "MAKLUMAT WARIS"),
        (191.0, top + 20.0, "IBU"),
        (191.0, top + 34.0, "500101-01-5000"),
        (191.0, top + 48.0, "MINAH BINTI SAAD"),
        (191.0, top + 62.0, "013-2222222"),
    ]
}

pub const CHILD_COLUMNS: [f64; 4] = [160.0, 120.0, 60.0, 100.0];

pub fn children_rows() -> Vec<Vec<&'static str>> {
    vec![
        vec!["NAMA", "NO. MYKAD/MYKID", "UMUR", "STATUS"],
        vec!["NUR BINTI AHMAD", "100101011234", "14", "BELAJAR"],
        vec!["", "", "", ""],
        vec!["AMIR BIN AHMAD", "120202025678", "12", "BELAJAR"],
    ]
}
