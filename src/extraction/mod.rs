// Template-driven STR form extraction
pub mod address;
pub mod border;
pub mod children;
pub mod extractor;
pub mod field;
pub mod normalize;
pub mod page;
pub mod projection;
pub mod record;
pub mod section_offset;
pub mod template_selector;
pub mod word_index;

pub use address::AddressMerger;
pub use border::BorderDetector;
pub use children::{ChildRecord, ChildTableExtractor};
pub use extractor::StrExtractor;
pub use field::FieldExtractor;
pub use page::{PageLayout, TableRows};
pub use projection::{project_everything, project_minimal, Row, RowProjector};
pub use record::{ExtractedRecord, RawFields, RecordBuilder};
pub use section_offset::{Section, SectionOffset, SectionOffsetCalculator, SectionOffsets};
pub use template_selector::{TemplateSelection, TemplateSelector};
pub use word_index::{PositionedWord, WordIndex};
