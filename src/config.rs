// Configuration for the STR extractor
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::types::{ExtractError, Result};

// Document info
pub const DOCUMENT_TYPE: &str = "Sumbangan Tunai Rahmah (STR)";
pub const EXTRACTION_VERSION: &str = "v3.0-template-based";

// Export
pub const MAX_CHILDREN: usize = 10;

// Environment overrides
pub const CONFIG_ENV: &str = "STR_EXTRACT_CONFIG";
pub const TEMPLATE_DIR_ENV: &str = "STR_TEMPLATE_DIR";

/// Tunables for every stage of the extraction pipeline.
///
/// All values default to the constants the form was calibrated against; a
/// TOML file only needs to name the ones it overrides.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Directory holding the three template JSON files. `None` uses the
    /// templates compiled into the binary.
    pub template_dir: Option<PathBuf>,
    pub border: BorderConfig,
    pub fields: FieldConfig,
    pub sections: SectionConfig,
    pub address: AddressConfig,
    /// Upper-cased token in the marital-status box that selects the spouse template.
    pub married_token: String,
    pub max_children: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BorderConfig {
    pub render_dpi: f32,
    pub threshold: u8,
    pub min_area_ratio: f64,
    pub min_offset_px: u32,
    pub max_margin_ratio: f64,
    pub min_vertices: usize,
    pub max_vertices: usize,
    pub epsilon_ratio: f64,
    pub offset_x: f64,
    pub offset_y: f64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FieldConfig {
    pub tolerance_default: f64,
    pub tolerance_tight: f64,
    pub tight_fields: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SectionConfig {
    pub header_x_margin: f64,
    pub search_range_default: f64,
    pub search_range_waris: f64,
    pub same_line_threshold: f64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AddressConfig {
    pub district_overlap: f64,
    pub state_overlap: f64,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            template_dir: None,
            border: BorderConfig::default(),
            fields: FieldConfig::default(),
            sections: SectionConfig::default(),
            address: AddressConfig::default(),
            married_token: "KAHWIN".to_string(),
            max_children: MAX_CHILDREN,
        }
    }
}

impl Default for BorderConfig {
    fn default() -> Self {
        Self {
            render_dpi: 150.0,
            threshold: 50,
            min_area_ratio: 0.8,
            min_offset_px: 30,
            max_margin_ratio: 0.10,
            min_vertices: 4,
            max_vertices: 6,
            epsilon_ratio: 0.02,
            offset_x: 28.34,
            offset_y: 28.34,
        }
    }
}

impl Default for FieldConfig {
    fn default() -> Self {
        Self {
            tolerance_default: 5.0,
            tolerance_tight: 3.0,
            tight_fields: vec!["jantina".to_string()],
        }
    }
}

impl Default for SectionConfig {
    fn default() -> Self {
        Self {
            header_x_margin: 20.0,
            search_range_default: 50.0,
            search_range_waris: 200.0,
            same_line_threshold: 5.0,
        }
    }
}

impl Default for AddressConfig {
    fn default() -> Self {
        Self {
            district_overlap: 0.5,
            state_overlap: 0.5,
        }
    }
}

impl ExtractionConfig {
    /// Load from a TOML file; missing keys keep their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| ExtractError::Config(e.to_string()))
    }

    /// Resolve configuration from the environment: `STR_EXTRACT_CONFIG` names a
    /// TOML file, `STR_TEMPLATE_DIR` overrides the template directory.
    pub fn from_env() -> Result<Self> {
        let mut config = match env::var(CONFIG_ENV) {
            Ok(path) => Self::load(Path::new(&path))?,
            Err(_) => Self::default(),
        };
        if let Ok(dir) = env::var(TEMPLATE_DIR_ENV) {
            config.template_dir = Some(PathBuf::from(dir));
        }
        Ok(config)
    }

    pub fn tolerance_for(&self, field_name: &str) -> f64 {
        if self.fields.tight_fields.iter().any(|f| f == field_name) {
            self.fields.tolerance_tight
        } else {
            self.fields.tolerance_default
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = ExtractionConfig::from_toml(
            r#"
            married_token = "NIKAH"

            [sections]
            search_range_waris = 250.0
            "#,
        )
        .unwrap();

        assert_eq!(config.married_token, "NIKAH");
        assert_eq!(config.sections.search_range_waris, 250.0);
        assert_eq!(config.sections.search_range_default, 50.0);
        assert_eq!(config.border.threshold, 50);
        assert_eq!(config.max_children, MAX_CHILDREN);
    }

    #[test]
    fn test_tight_tolerance_only_for_gender() {
        let config = ExtractionConfig::default();
        assert_eq!(config.tolerance_for("jantina"), 3.0);
        assert_eq!(config.tolerance_for("pasangan_jantina"), 5.0);
        assert_eq!(config.tolerance_for("nama"), 5.0);
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = ExtractionConfig::from_toml("max_children = \"ten\"").unwrap_err();
        assert!(matches!(err, ExtractError::Config(_)));
    }
}
