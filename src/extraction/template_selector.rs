// Marital-status driven choice between the spouse and spouse-free templates
use std::sync::Arc;
use tracing::debug;

use super::field::FieldExtractor;
use super::word_index::WordIndex;
use crate::template::{BorderShift, Template, TemplateKind, TemplateRegistry};
use crate::types::Result;

const STATUS_FIELD: &str = "status_perkahwinan";

#[derive(Debug, Clone)]
pub struct TemplateSelection {
    pub kind: TemplateKind,
    pub template: Arc<Template>,
    /// Raw marital-status text the decision was based on
    pub status: String,
}

#[derive(Debug, Clone)]
pub struct TemplateSelector {
    married_token: String,
    extractor: FieldExtractor,
}

impl TemplateSelector {
    pub fn new(married_token: impl Into<String>, extractor: FieldExtractor) -> Self {
        Self {
            married_token: married_token.into().to_uppercase(),
            extractor,
        }
    }

    /// Pure decision on the status text
    pub fn kind_for_status(&self, status: &str) -> TemplateKind {
        if !self.married_token.is_empty() && status.to_uppercase().contains(&self.married_token) {
            TemplateKind::WithSpouse
        } else {
            TemplateKind::WithoutSpouse
        }
    }

    /// Read the status box of the base template from page 1 and pick the
    /// template that governs the rest of the document.
    pub fn select(
        &self,
        registry: &TemplateRegistry,
        words: &WordIndex,
        shift: BorderShift,
    ) -> Result<TemplateSelection> {
        let base = registry.get(TemplateKind::Base)?;
        let status = base
            .get(STATUS_FIELD)
            .map(|field| self.extractor.extract(words, &shift.apply(field), 0.0))
            .unwrap_or_default();

        let kind = self.kind_for_status(&status);
        debug!("Marital status {:?} selects template {}", status, kind);
        Ok(TemplateSelection {
            kind,
            template: registry.get(kind)?,
            status,
        })
    }
}

impl Default for TemplateSelector {
    fn default() -> Self {
        Self::new("KAHWIN", FieldExtractor::default())
    }
}
