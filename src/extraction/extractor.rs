// Document-level extraction pipeline
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::address::AddressMerger;
use super::border::BorderDetector;
use super::children::ChildTableExtractor;
use super::field::FieldExtractor;
use super::page::PageLayout;
use super::record::{ExtractedRecord, RawFields, RecordBuilder};
use super::section_offset::{Section, SectionOffsetCalculator};
use super::template_selector::TemplateSelector;
use crate::config::ExtractionConfig;
use crate::pdf_extraction::PdfDocument;
use crate::template::TemplateRegistry;
use crate::types::Result;

/// Pages that can carry form content: the main page and the overflow page
/// holding the next-of-kin section.
const MAX_PAGES: usize = 2;

/// Template-driven extractor for STR application forms.
///
/// Holds only immutable configuration and a shared template registry, so one
/// instance can serve many documents from many threads.
pub struct StrExtractor {
    registry: Arc<TemplateRegistry>,
    config: ExtractionConfig,
    border: BorderDetector,
    selector: TemplateSelector,
    sections: SectionOffsetCalculator,
    fields: FieldExtractor,
    children: ChildTableExtractor,
    builder: RecordBuilder,
}

impl StrExtractor {
    pub fn new(registry: Arc<TemplateRegistry>, config: ExtractionConfig) -> Self {
        let fields = FieldExtractor::new(config.fields.tolerance_default);
        Self {
            border: BorderDetector::new(config.border.clone()),
            selector: TemplateSelector::new(config.married_token.clone(), fields),
            sections: SectionOffsetCalculator::new(config.sections.clone(), config.border.offset_y),
            fields,
            children: ChildTableExtractor::new(),
            builder: RecordBuilder::new(AddressMerger::new(config.address.clone())),
            registry,
            config,
        }
    }

    /// Extractor with its own registry over the configured template directory
    pub fn from_config(config: ExtractionConfig) -> Self {
        let registry = Arc::new(TemplateRegistry::new(config.template_dir.clone()));
        Self::new(registry, config)
    }

    pub fn registry(&self) -> &Arc<TemplateRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    pub fn extract(&self, path: &Path) -> Result<ExtractedRecord> {
        info!("Extracting {}", path.display());
        let doc = PdfDocument::open(path)?;
        self.extract_document(&doc)
    }

    pub fn extract_document(&self, doc: &PdfDocument) -> Result<ExtractedRecord> {
        let bordered = self.border.detect_document(doc);
        let pages: Vec<PageLayout> = (0..doc.page_count().min(MAX_PAGES))
            .map(|index| {
                doc.page_layout(index).unwrap_or_else(|e| {
                    warn!("Page {} of {} unreadable, treating as empty: {}", index + 1, doc.path().display(), e);
                    PageLayout::default()
                })
            })
            .collect();
        self.extract_layouts(&pages, bordered)
    }

    /// Run the pipeline on page layouts that are already extracted.
    /// `bordered` is the outcome of border detection on page 1.
    pub fn extract_layouts(&self, pages: &[PageLayout], bordered: bool) -> Result<ExtractedRecord> {
        let first = pages.first().cloned().unwrap_or_default();
        let shift = self.border.shift_for(bordered);
        debug!("v2 format: {}, box shift {:?}", bordered, shift);

        let selection = self.selector.select(&self.registry, &first.words, shift)?;
        let template = selection.template;
        let offsets = self.sections.calculate(pages, &template, bordered);

        let mut raw = RawFields::default();
        for (name, field) in template.iter() {
            if name.ends_with("_header") {
                continue;
            }
            let section = Section::for_field(name);
            let target = match section {
                Section::Pemohon => &mut raw.pemohon,
                Section::Pasangan => &mut raw.pasangan,
                Section::Waris if offsets.waris_exists() => &mut raw.waris,
                Section::Waris => continue,
                // Children come from the table, not from boxes
                Section::Anak => continue,
            };
            let Some(page) = pages.get(offsets.page_for(section)) else {
                continue;
            };

            let value = self.fields.extract_with_tolerance(
                &page.words,
                &shift.apply(field),
                offsets.offset_for(section) as f64,
                self.config.tolerance_for(name),
            );
            let key = section
                .field_prefix()
                .and_then(|prefix| name.strip_prefix(prefix))
                .unwrap_or(name);
            target.insert(key.to_string(), value);
        }

        let children = self.children.extract(&first);
        debug!(
            "Template {}: {} applicant, {} spouse, {} next-of-kin fields, {} children",
            selection.kind,
            raw.pemohon.len(),
            raw.pasangan.len(),
            raw.waris.len(),
            children.len()
        );

        Ok(self.builder.build(&raw, children, bordered))
    }
}

impl Default for StrExtractor {
    fn default() -> Self {
        Self::from_config(ExtractionConfig::default())
    }
}
