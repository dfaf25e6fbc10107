// Grouping of positioned characters into words
use std::cmp::Ordering;

use crate::extraction::PositionedWord;

pub const X_TOLERANCE: f64 = 3.0;
pub const Y_TOLERANCE: f64 = 3.0;

/// A character in top-left page coordinates
#[derive(Debug, Clone, PartialEq)]
pub struct PdfChar {
    pub text: String,
    pub x0: f64,
    pub x1: f64,
    pub top: f64,
    pub bottom: f64,
}

impl PdfChar {
    pub fn new(text: impl Into<String>, x0: f64, top: f64, x1: f64, bottom: f64) -> Self {
        Self {
            text: text.into(),
            x0,
            x1,
            top,
            bottom,
        }
    }

    fn is_blank(&self) -> bool {
        self.text.chars().all(char::is_whitespace)
    }
}

fn by_f64(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

/// Cluster characters into text lines: sorted by top, a new line starts
/// whenever the gap to the previous top exceeds `y_tolerance`.
fn lines(mut chars: Vec<PdfChar>, y_tolerance: f64) -> Vec<Vec<PdfChar>> {
    chars.sort_by(|a, b| by_f64(a.top, b.top));
    let mut lines: Vec<Vec<PdfChar>> = Vec::new();
    let mut last_top = f64::NEG_INFINITY;
    for ch in chars {
        if lines.is_empty() || ch.top - last_top > y_tolerance {
            lines.push(Vec::new());
        }
        last_top = ch.top;
        if let Some(line) = lines.last_mut() {
            line.push(ch);
        }
    }
    for line in &mut lines {
        line.sort_by(|a, b| by_f64(a.x0, b.x0));
    }
    lines
}

struct WordBuilder {
    text: String,
    x0: f64,
    x1: f64,
    top: f64,
    bottom: f64,
}

impl WordBuilder {
    fn start(ch: &PdfChar) -> Self {
        Self {
            text: ch.text.clone(),
            x0: ch.x0,
            x1: ch.x1,
            top: ch.top,
            bottom: ch.bottom,
        }
    }

    fn continues_with(&self, ch: &PdfChar, x_tolerance: f64, y_tolerance: f64) -> bool {
        ch.x0 <= self.x1 + x_tolerance && (ch.top - self.top).abs() <= y_tolerance
    }

    fn push(&mut self, ch: &PdfChar) {
        self.text.push_str(&ch.text);
        self.x0 = self.x0.min(ch.x0);
        self.x1 = self.x1.max(ch.x1);
        self.top = self.top.min(ch.top);
        self.bottom = self.bottom.max(ch.bottom);
    }

    fn finish(self) -> PositionedWord {
        PositionedWord::new(self.text, self.x0, self.top, self.x1, self.bottom)
    }
}

/// Words with the default tolerances
pub fn group_words(chars: Vec<PdfChar>) -> Vec<PositionedWord> {
    group_words_with(chars, X_TOLERANCE, Y_TOLERANCE)
}

/// Whitespace always ends a word; otherwise a character joins the current
/// word when it starts within `x_tolerance` of its right edge on the same line.
pub fn group_words_with(chars: Vec<PdfChar>, x_tolerance: f64, y_tolerance: f64) -> Vec<PositionedWord> {
    let mut words = Vec::new();
    for line in lines(chars, y_tolerance) {
        let mut current: Option<WordBuilder> = None;
        for ch in &line {
            if ch.is_blank() {
                if let Some(word) = current.take() {
                    words.push(word.finish());
                }
                continue;
            }
            let joins = current
                .as_ref()
                .is_some_and(|word| word.continues_with(ch, x_tolerance, y_tolerance));
            if joins {
                if let Some(word) = current.as_mut() {
                    word.push(ch);
                }
            } else if let Some(word) = current.replace(WordBuilder::start(ch)) {
                words.push(word.finish());
            }
        }
        if let Some(word) = current {
            words.push(word.finish());
        }
    }
    words
}
