// STR aid-application PDF extraction library
pub mod batch;
pub mod config;
pub mod export;
pub mod extraction;
pub mod pdf_extraction;
pub mod template;
pub mod types;

pub use config::ExtractionConfig;
pub use extraction::{project_everything, project_minimal, ExtractedRecord, Row, StrExtractor};
pub use template::{TemplateKind, TemplateRegistry};
pub use types::{ExtractError, Result};
