// Detection of the printed page border that marks the v2 form revision
use image::DynamicImage;
use imageproc::contours::{find_contours, BorderType, Contour};
use imageproc::contrast::{threshold, ThresholdType};
use imageproc::geometry::{approximate_polygon_dp, arc_length, contour_area};
use imageproc::point::Point;
use tracing::{debug, warn};

use crate::config::BorderConfig;
use crate::pdf_extraction::PdfDocument;
use crate::pdf_extraction::page_renderer::PageRenderer;
use crate::template::BorderShift;

/// Bounding rectangle of a contour in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

#[derive(Debug, Clone)]
pub struct BorderDetector {
    config: BorderConfig,
}

impl Default for BorderDetector {
    fn default() -> Self {
        Self::new(BorderConfig::default())
    }
}

impl BorderDetector {
    pub fn new(config: BorderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BorderConfig {
        &self.config
    }

    /// Box shift to apply when a border was found
    pub fn shift_for(&self, bordered: bool) -> BorderShift {
        if bordered {
            BorderShift::new(self.config.offset_x, self.config.offset_y)
        } else {
            BorderShift::NONE
        }
    }

    /// Render the first page and look for the border. Any failure on the way
    /// counts as "no border".
    pub fn detect_document(&self, doc: &PdfDocument) -> bool {
        if doc.page_count() == 0 {
            return false;
        }
        let renderer = PageRenderer::new(self.config.render_dpi);
        match renderer.render_page(doc, 0) {
            Ok(image) => self.detect(&image),
            Err(e) => {
                warn!("Border detection skipped, page 1 could not be rendered: {}", e);
                false
            }
        }
    }

    /// True when the page carries a genuine printed border
    pub fn detect(&self, image: &DynamicImage) -> bool {
        // Inverted so dark ink becomes foreground
        let binary = threshold(&image.to_luma8(), self.config.threshold, ThresholdType::BinaryInverted);
        let (width, height) = binary.dimensions();
        if width == 0 || height == 0 {
            return false;
        }

        let contours: Vec<Contour<i32>> = find_contours(&binary);
        let Some(largest) = contours
            .iter()
            .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none() && !c.points.is_empty())
            .max_by(|a, b| {
                contour_area(&a.points)
                    .partial_cmp(&contour_area(&b.points))
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
        else {
            debug!("No outer contour on page 1");
            return false;
        };

        let rect = bounding_rect(&largest.points);
        let page_area = width as u64 * height as u64;
        let area_ratio = rect.area() as f64 / page_area as f64;
        debug!(
            "Largest contour: x={} y={} w={} h={} area_ratio={:.3}",
            rect.x, rect.y, rect.width, rect.height, area_ratio
        );

        if area_ratio < self.config.min_area_ratio {
            return false;
        }
        // A rectangle touching the page edge is the page itself
        if rect.x < self.config.min_offset_px || rect.y < self.config.min_offset_px {
            return false;
        }
        if rect.x as f64 > width as f64 * self.config.max_margin_ratio
            || rect.y as f64 > height as f64 * self.config.max_margin_ratio
        {
            return false;
        }

        let perimeter = arc_length(&largest.points, true);
        let epsilon = self.config.epsilon_ratio * perimeter;
        if epsilon.is_nan() || epsilon <= 0.0 {
            warn!("Border polygon approximation skipped, epsilon {} is not positive", epsilon);
            return false;
        }
        let approx = approximate_polygon_dp(&largest.points, epsilon, true);
        let vertices = approx.len();
        debug!("Border polygon has {} vertices", vertices);
        (self.config.min_vertices..=self.config.max_vertices).contains(&vertices)
    }
}

fn bounding_rect(points: &[Point<i32>]) -> PixelRect {
    let min_x = points.iter().map(|p| p.x).min().unwrap_or(0);
    let max_x = points.iter().map(|p| p.x).max().unwrap_or(0);
    let min_y = points.iter().map(|p| p.y).min().unwrap_or(0);
    let max_y = points.iter().map(|p| p.y).max().unwrap_or(0);
    PixelRect {
        x: min_x.max(0) as u32,
        y: min_y.max(0) as u32,
        width: (max_x - min_x + 1).max(0) as u32,
        height: (max_y - min_y + 1).max(0) as u32,
    }
}
