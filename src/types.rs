// Core types and error definitions for the STR extractor
use std::path::PathBuf;

// Error types
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("failed to open PDF {path}: {message}")]
    DocumentOpen { path: PathBuf, message: String },

    #[error("PDF {path} has no pages")]
    NoPages { path: PathBuf },

    #[error("PDF error: {0}")]
    Pdf(String),

    #[error("template file not found: {0}")]
    TemplateNotFound(PathBuf),

    #[error("invalid template {name}: {message}")]
    TemplateParse { name: String, message: String },

    #[error("config error: {0}")]
    Config(String),

    #[error("render error: {0}")]
    Render(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<lopdf::Error> for ExtractError {
    fn from(err: lopdf::Error) -> Self {
        ExtractError::Pdf(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ExtractError>;

/// Axis-aligned rectangle in top-left page coordinates
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Rect {
    pub x0: f64,
    pub top: f64,
    pub x1: f64,
    pub bottom: f64,
}

impl Rect {
    pub const fn new(x0: f64, top: f64, x1: f64, bottom: f64) -> Self {
        Self { x0, top, x1, bottom }
    }

    pub fn width(&self) -> f64 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f64 {
        self.bottom - self.top
    }

    pub fn center(&self) -> (f64, f64) {
        ((self.x0 + self.x1) / 2.0, (self.top + self.bottom) / 2.0)
    }

    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        x >= self.x0 && x <= self.x1 && y >= self.top && y <= self.bottom
    }
}
