// PDF extraction module
pub mod content;
pub mod document;
pub mod fonts;
pub mod objects;
pub mod page_renderer;
pub mod tables;
pub mod words;

pub use document::PdfDocument;
pub use page_renderer::PageRenderer;
pub use tables::{Edge, TableFinder};
pub use words::{group_words, PdfChar};
