// Everything the extraction core needs to know about one page
use super::word_index::WordIndex;

/// A detected table as rows of cells; `None` marks a grid position no cell covers.
pub type TableRows = Vec<Vec<Option<String>>>;

#[derive(Debug, Clone, Default)]
pub struct PageLayout {
    pub width: f64,
    pub height: f64,
    pub words: WordIndex,
    pub tables: Vec<TableRows>,
}

impl PageLayout {
    pub fn new(width: f64, height: f64, words: WordIndex) -> Self {
        Self {
            width,
            height,
            words,
            tables: Vec::new(),
        }
    }

    pub fn with_tables(mut self, tables: Vec<TableRows>) -> Self {
        self.tables = tables;
        self
    }
}
