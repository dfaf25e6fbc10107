// Positioned-word lookup for one page
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// One word on a page. `x0`/`x1` run left to right, `top`/`bottom` top to
/// bottom, both in page units measured from the top-left corner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionedWord {
    pub text: String,
    pub x0: f64,
    pub x1: f64,
    pub top: f64,
    pub bottom: f64,
}

impl PositionedWord {
    pub fn new(text: impl Into<String>, x0: f64, top: f64, x1: f64, bottom: f64) -> Self {
        Self {
            text: text.into(),
            x0,
            x1,
            top,
            bottom,
        }
    }
}

/// Reading order: top to bottom, then left to right
pub fn reading_order(a: &PositionedWord, b: &PositionedWord) -> Ordering {
    a.top
        .partial_cmp(&b.top)
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.x0.partial_cmp(&b.x0).unwrap_or(Ordering::Equal))
}

#[derive(Debug, Clone, Default)]
pub struct WordIndex {
    words: Vec<PositionedWord>,
}

impl WordIndex {
    pub fn new(words: Vec<PositionedWord>) -> Self {
        Self { words }
    }

    pub fn words(&self) -> &[PositionedWord] {
        &self.words
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Words whose left edge lies in `[x_min, x_max]` and whose top lies in
    /// `[y_min, y_max]`, in page order.
    pub fn within(&self, x_min: f64, x_max: f64, y_min: f64, y_max: f64) -> Vec<&PositionedWord> {
        self.words
            .iter()
            .filter(|w| w.x0 >= x_min && w.x0 <= x_max && w.top >= y_min && w.top <= y_max)
            .collect()
    }
}

impl From<Vec<PositionedWord>> for WordIndex {
    fn from(words: Vec<PositionedWord>) -> Self {
        Self::new(words)
    }
}
