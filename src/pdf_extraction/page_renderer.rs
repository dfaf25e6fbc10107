// Raster rendering of page vector content with tiny-skia
//
// Only paths and images are drawn. Text is left out: the border check looks
// at ruling geometry, and glyph outlines would need a font engine.
use image::{DynamicImage, RgbaImage};
use lopdf::{Object, Stream};
use tiny_skia::{
    Color, FillRule, IntSize, Paint, PathBuilder, Pixmap, PixmapPaint, Stroke, Transform,
};
use tracing::debug;

use super::content::{ContentSink, Matrix, PaintStyle, PathSegment};
use super::document::PdfDocument;
use super::objects::{name, number, stream_bytes};
use crate::types::{ExtractError, Result};

pub struct PageRenderer {
    dpi: f32,
}

impl PageRenderer {
    pub fn new(dpi: f32) -> Self {
        Self { dpi }
    }

    pub fn dpi(&self) -> f32 {
        self.dpi
    }

    /// Render page `index` (0-based) on a white background
    pub fn render_page(&self, doc: &PdfDocument, index: usize) -> Result<DynamicImage> {
        let [x0, y0, x1, y1] = doc.media_box(index)?;
        let scale = self.dpi / 72.0;
        let width = ((x1 - x0) as f32 * scale).ceil().max(1.0) as u32;
        let height = ((y1 - y0) as f32 * scale).ceil().max(1.0) as u32;

        let mut pixmap = Pixmap::new(width, height)
            .ok_or_else(|| ExtractError::Render(format!("cannot allocate {}x{} canvas", width, height)))?;
        pixmap.fill(Color::WHITE);

        // User space (y up) to device pixels (y down)
        let page = Transform::from_row(scale, 0.0, 0.0, -scale, -scale * x0 as f32, scale * y1 as f32);
        let mut sink = RasterSink {
            pixmap: &mut pixmap,
            page,
        };
        doc.interpret(index, &mut sink)?;
        debug!("Rendered page {} at {} dpi: {}x{}", index + 1, self.dpi, width, height);

        Ok(DynamicImage::ImageRgba8(pixmap_to_image(&pixmap)))
    }
}

struct RasterSink<'p> {
    pixmap: &'p mut Pixmap,
    page: Transform,
}

fn paint_for(color: [f32; 3]) -> Paint<'static> {
    let mut paint = Paint::default();
    let channel = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
    paint.set_color_rgba8(channel(color[0]), channel(color[1]), channel(color[2]), 255);
    paint.anti_alias = true;
    paint
}

impl ContentSink for RasterSink<'_> {
    fn path(&mut self, segments: &[PathSegment], style: &PaintStyle) {
        let mut builder = PathBuilder::new();
        for segment in segments {
            match *segment {
                PathSegment::MoveTo(x, y) => builder.move_to(x as f32, y as f32),
                PathSegment::LineTo(x, y) => builder.line_to(x as f32, y as f32),
                PathSegment::CurveTo(x1, y1, x2, y2, x, y) => {
                    builder.cubic_to(x1 as f32, y1 as f32, x2 as f32, y2 as f32, x as f32, y as f32)
                }
                PathSegment::Close => builder.close(),
            }
        }
        let Some(path) = builder.finish() else {
            return;
        };

        if style.fill {
            let rule = if style.even_odd { FillRule::EvenOdd } else { FillRule::Winding };
            self.pixmap
                .fill_path(&path, &paint_for(style.fill_color), rule, self.page, None);
        }
        if style.stroke {
            let stroke = Stroke {
                width: style.line_width as f32,
                ..Stroke::default()
            };
            self.pixmap
                .stroke_path(&path, &paint_for(style.stroke_color), &stroke, self.page, None);
        }
    }

    fn image(&mut self, image: &Stream, ctm: &Matrix) {
        let Some(source) = decode_image(image) else {
            debug!("Skipping image with unsupported encoding");
            return;
        };
        let (w, h) = source.dimensions();
        let Some(size) = IntSize::from_wh(w, h) else {
            return;
        };
        let Some(image_pixmap) = Pixmap::from_vec(source.into_raw(), size) else {
            return;
        };

        // Image space is the unit square with rows running top to bottom
        let placement = self
            .page
            .pre_concat(Transform::from_row(
                ctm[0] as f32,
                ctm[1] as f32,
                ctm[2] as f32,
                ctm[3] as f32,
                ctm[4] as f32,
                ctm[5] as f32,
            ))
            .pre_concat(Transform::from_row(1.0 / w as f32, 0.0, 0.0, -1.0 / h as f32, 0.0, 1.0));
        self.pixmap
            .draw_pixmap(0, 0, image_pixmap.as_ref(), &PixmapPaint::default(), placement, None);
    }
}

fn has_filter(image: &Stream, filter: &[u8]) -> bool {
    match image.dict.get(b"Filter") {
        Ok(Object::Name(n)) => n.as_slice() == filter,
        Ok(Object::Array(items)) => items.iter().any(|item| name(item) == Some(filter)),
        _ => false,
    }
}

/// Opaque RGBA pixels of a JPEG or raw 8-bit image XObject
fn decode_image(image: &Stream) -> Option<RgbaImage> {
    if has_filter(image, b"DCTDecode") {
        return image::load_from_memory(&image.content).ok().map(|img| img.to_rgba8());
    }

    let dict = &image.dict;
    let width = dict.get(b"Width").ok().and_then(number)? as u32;
    let height = dict.get(b"Height").ok().and_then(number)? as u32;
    let bits = dict.get(b"BitsPerComponent").ok().and_then(number).unwrap_or(8.0);
    if bits != 8.0 {
        return None;
    }
    let channels = match dict.get(b"ColorSpace").ok().and_then(name) {
        Some(b"DeviceGray") => 1,
        Some(b"DeviceRGB") => 3,
        Some(b"DeviceCMYK") => 4,
        _ => return None,
    };

    let data = stream_bytes(image);
    let expected = width as usize * height as usize * channels;
    if data.len() < expected {
        return None;
    }
    let mut rgba = Vec::with_capacity(width as usize * height as usize * 4);
    for px in data[..expected].chunks_exact(channels) {
        let [r, g, b] = match px {
            &[gray] => [gray; 3],
            &[r, g, b] => [r, g, b],
            &[c, m, y, k] => {
                let inv = |v: u8| (255 - v) as u16;
                [c, m, y].map(|v| (inv(v) * inv(k) / 255) as u8)
            }
            _ => return None,
        };
        rgba.extend_from_slice(&[r, g, b, 255]);
    }
    RgbaImage::from_raw(width, height, rgba)
}

/// tiny-skia stores premultiplied RGBA
fn pixmap_to_image(pixmap: &Pixmap) -> RgbaImage {
    let mut image = RgbaImage::new(pixmap.width(), pixmap.height());
    for (pixel, source) in image.pixels_mut().zip(pixmap.pixels()) {
        let color = source.demultiply();
        *pixel = image::Rgba([color.red(), color.green(), color.blue(), color.alpha()]);
    }
    image
}
