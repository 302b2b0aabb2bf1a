use crate::error::Result;
use crate::settings::FieldSettings;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Field configuration for export/import
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldConfig {
    /// Version field for future compatibility
    pub version: u32,
    /// All field settings
    pub settings: FieldSettings,
    /// Fixed RNG seed, for reproducible fields
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl FieldConfig {
    /// Export config to a JSON file
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Import config from a JSON file; out-of-range settings are clamped
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: FieldConfig = serde_json::from_str(&content)?;
        Ok(Self {
            settings: config.settings.clamped(),
            ..config
        })
    }
}

impl Default for FieldConfig {
    fn default() -> Self {
        Self {
            version: 1,
            settings: FieldSettings::default(),
            seed: None,
        }
    }
}
