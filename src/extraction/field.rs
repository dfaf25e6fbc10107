// Text recovery from a single template box
use super::word_index::{reading_order, WordIndex};
use crate::template::FieldBox;

/// Trailing characters dropped from every field value
const TRAILING_PUNCTUATION: &[char] = &[':', ';', ',', '.'];

#[derive(Debug, Clone, Copy)]
pub struct FieldExtractor {
    pub default_tolerance: f64,
}

impl Default for FieldExtractor {
    fn default() -> Self {
        Self {
            default_tolerance: 5.0,
        }
    }
}

impl FieldExtractor {
    pub fn new(default_tolerance: f64) -> Self {
        Self { default_tolerance }
    }

    /// Text inside `field` after moving it down by `offset`, with the default tolerance.
    pub fn extract(&self, words: &WordIndex, field: &FieldBox, offset: f64) -> String {
        self.extract_with_tolerance(words, field, offset, self.default_tolerance)
    }

    /// Horizontal membership is exact; vertical membership widens the box by
    /// `tolerance` on both sides. A miss is an empty string, never an error.
    pub fn extract_with_tolerance(
        &self,
        words: &WordIndex,
        field: &FieldBox,
        offset: f64,
        tolerance: f64,
    ) -> String {
        if field.is_degenerate() || !offset.is_finite() || !tolerance.is_finite() || words.is_empty() {
            return String::new();
        }

        let y_adjusted = field.y + offset;
        let mut matches = words.within(
            field.x,
            field.x + field.width,
            y_adjusted - tolerance,
            y_adjusted + field.height + tolerance,
        );
        if matches.is_empty() {
            return String::new();
        }

        matches.sort_by(|a, b| reading_order(a, b));
        let joined = matches
            .iter()
            .map(|w| w.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");

        let collapsed = joined.split_whitespace().collect::<Vec<_>>().join(" ");
        collapsed
            .trim_end_matches(TRAILING_PUNCTUATION)
            .trim_end()
            .to_string()
    }
}
