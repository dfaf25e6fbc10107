// Bounding-box templates and the shared template registry
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use tracing::{debug, info};

use crate::types::{ExtractError, Result};

const BASE_TEMPLATE: &str = include_str!("../templates/template.json");
const WITH_SPOUSE_TEMPLATE: &str = include_str!("../templates/template_with_pasangan.json");
const WITHOUT_SPOUSE_TEMPLATE: &str = include_str!("../templates/template_without_pasangan.json");

/// A field's printed position in page units, origin at the top-left corner.
#[derive(Debug, Copy, Clone, PartialEq, Deserialize, Serialize)]
pub struct FieldBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl FieldBox {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    pub fn is_degenerate(&self) -> bool {
        !(self.x.is_finite() && self.y.is_finite() && self.width.is_finite() && self.height.is_finite())
            || self.width < 0.0
            || self.height < 0.0
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Deserialize, Serialize)]
pub struct PdfDimensions {
    pub width: f64,
    pub height: f64,
}

/// Uniform shift applied to every box of a template, used for the bordered
/// document revision. Boxes are shifted when looked up, never in storage.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct BorderShift {
    pub dx: f64,
    pub dy: f64,
}

impl BorderShift {
    pub const NONE: BorderShift = BorderShift { dx: 0.0, dy: 0.0 };

    pub const fn new(dx: f64, dy: f64) -> Self {
        Self { dx, dy }
    }

    pub fn apply(&self, field: &FieldBox) -> FieldBox {
        FieldBox {
            x: field.x + self.dx,
            y: field.y + self.dy,
            ..*field
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum TemplateKind {
    Base,
    WithSpouse,
    WithoutSpouse,
}

impl TemplateKind {
    pub const ALL: [TemplateKind; 3] = [
        TemplateKind::Base,
        TemplateKind::WithSpouse,
        TemplateKind::WithoutSpouse,
    ];

    pub fn file_name(&self) -> &'static str {
        match self {
            TemplateKind::Base => "template.json",
            TemplateKind::WithSpouse => "template_with_pasangan.json",
            TemplateKind::WithoutSpouse => "template_without_pasangan.json",
        }
    }

    fn builtin_source(&self) -> &'static str {
        match self {
            TemplateKind::Base => BASE_TEMPLATE,
            TemplateKind::WithSpouse => WITH_SPOUSE_TEMPLATE,
            TemplateKind::WithoutSpouse => WITHOUT_SPOUSE_TEMPLATE,
        }
    }
}

impl fmt::Display for TemplateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_name())
    }
}

/// Field name → box mapping for one form revision.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Template {
    pub fields: BTreeMap<String, FieldBox>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pdf_dimensions: Option<PdfDimensions>,
}

impl Template {
    pub fn from_json(name: &str, json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| ExtractError::TemplateParse {
            name: name.to_string(),
            message: e.to_string(),
        })
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ExtractError::TemplateNotFound(path.to_path_buf()));
        }
        let json = fs::read_to_string(path)?;
        Self::from_json(&path.display().to_string(), &json)
    }

    pub fn get(&self, name: &str) -> Option<&FieldBox> {
        self.fields.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldBox)> {
        self.fields.iter().map(|(name, field)| (name.as_str(), field))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Process-wide template cache.
///
/// Each slot holds an `Arc` to an immutable template. Readers clone the handle
/// and keep using it even if the slot is reloaded underneath them; a reload
/// parses the new template first and only then swaps the handle.
pub struct TemplateRegistry {
    dir: Option<PathBuf>,
    slots: RwLock<HashMap<TemplateKind, Arc<Template>>>,
}

impl TemplateRegistry {
    /// Registry reading templates from `dir`.
    pub fn from_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: Some(dir.into()),
            slots: RwLock::new(HashMap::new()),
        }
    }

    /// Registry backed by the templates compiled into the binary.
    pub fn builtin() -> Self {
        Self {
            dir: None,
            slots: RwLock::new(HashMap::new()),
        }
    }

    pub fn new(dir: Option<PathBuf>) -> Self {
        match dir {
            Some(dir) => Self::from_dir(dir),
            None => Self::builtin(),
        }
    }

    pub fn template_path(&self, kind: TemplateKind) -> Option<PathBuf> {
        self.dir.as_ref().map(|dir| dir.join(kind.file_name()))
    }

    /// Get the current handle for `kind`, loading it on first use.
    pub fn get(&self, kind: TemplateKind) -> Result<Arc<Template>> {
        {
            let slots = self.slots.read().unwrap_or_else(|e| e.into_inner());
            if let Some(template) = slots.get(&kind) {
                return Ok(Arc::clone(template));
            }
        }

        let loaded = Arc::new(self.load(kind)?);
        let mut slots = self.slots.write().unwrap_or_else(|e| e.into_inner());
        // Another thread may have won the race; keep whichever landed first.
        let entry = slots.entry(kind).or_insert(loaded);
        Ok(Arc::clone(entry))
    }

    /// Re-read `kind` from its source and swap it in.
    pub fn reload(&self, kind: TemplateKind) -> Result<Arc<Template>> {
        let loaded = Arc::new(self.load(kind)?);
        let mut slots = self.slots.write().unwrap_or_else(|e| e.into_inner());
        slots.insert(kind, Arc::clone(&loaded));
        info!("Reloaded template {}", kind);
        Ok(loaded)
    }

    /// Load all three templates up front so a missing file fails early.
    pub fn preload(&self) -> Result<()> {
        for kind in TemplateKind::ALL {
            self.get(kind)?;
        }
        Ok(())
    }

    fn load(&self, kind: TemplateKind) -> Result<Template> {
        match self.template_path(kind) {
            Some(path) => {
                debug!("Loading template {} from {}", kind, path.display());
                Template::load(&path)
            }
            None => Template::from_json(kind.file_name(), kind.builtin_source()),
        }
    }
}

impl Default for TemplateRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_templates_share_prefix_conventions() {
        let registry = TemplateRegistry::builtin();
        let with_spouse = registry.get(TemplateKind::WithSpouse).unwrap();
        let without_spouse = registry.get(TemplateKind::WithoutSpouse).unwrap();
        let base = registry.get(TemplateKind::Base).unwrap();

        assert!(base.get("status_perkahwinan").is_some());
        assert!(with_spouse.get("maklumat_pasangan_header").is_some());
        assert!(with_spouse.iter().any(|(name, _)| name.starts_with("pasangan_")));
        assert!(!without_spouse.iter().any(|(name, _)| name.starts_with("pasangan_")));
        for template in [&with_spouse, &without_spouse] {
            assert!(template.get("maklumat_waris_header").is_some());
            assert!(template.get("waris_nama").is_some());
        }
        // Applicant boxes sit at the same place in every revision
        assert_eq!(
            base.get("status_perkahwinan"),
            with_spouse.get("status_perkahwinan")
        );
    }

    #[test]
    fn test_get_returns_shared_handle() {
        let registry = TemplateRegistry::builtin();
        let first = registry.get(TemplateKind::Base).unwrap();
        let second = registry.get(TemplateKind::Base).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_reload_swaps_without_touching_old_handle() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(TemplateKind::Base.file_name());
        fs::write(
            &path,
            r#"{"fields": {"nama": {"x": 10, "y": 20, "width": 30, "height": 5}}}"#,
        )
        .unwrap();

        let registry = TemplateRegistry::from_dir(dir.path());
        let old = registry.get(TemplateKind::Base).unwrap();

        fs::write(
            &path,
            r#"{"fields": {"nama": {"x": 99, "y": 20, "width": 30, "height": 5}}}"#,
        )
        .unwrap();

        let new = registry.reload(TemplateKind::Base).unwrap();
        assert_eq!(old.get("nama").unwrap().x, 10.0);
        assert_eq!(new.get("nama").unwrap().x, 99.0);
        assert_eq!(registry.get(TemplateKind::Base).unwrap().get("nama").unwrap().x, 99.0);
    }

    #[test]
    fn test_missing_template_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let registry = TemplateRegistry::from_dir(dir.path());
        let err = registry.get(TemplateKind::WithSpouse).unwrap_err();
        assert!(matches!(err, ExtractError::TemplateNotFound(_)));
    }

    #[test]
    fn test_border_shift_does_not_mutate_template() {
        let registry = TemplateRegistry::builtin();
        let template = registry.get(TemplateKind::Base).unwrap();
        let original = *template.get("nama").unwrap();
        let shifted = BorderShift::new(28.34, 28.34).apply(&original);

        assert!((shifted.x - original.x - 28.34).abs() < 1e-9);
        assert!((shifted.y - original.y - 28.34).abs() < 1e-9);
        assert_eq!(shifted.width, original.width);
        assert_eq!(*template.get("nama").unwrap(), original);
    }

    #[test]
    fn test_degenerate_boxes() {
        assert!(FieldBox::new(0.0, 0.0, -1.0, 5.0).is_degenerate());
        assert!(FieldBox::new(f64::NAN, 0.0, 1.0, 5.0).is_degenerate());
        assert!(!FieldBox::new(0.0, 0.0, 0.0, 0.0).is_degenerate());
    }
}
