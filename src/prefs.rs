use crate::color::Theme;
use crate::error::{FieldError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

/// What survives between runs: theme choice and collapsed sidebar sections
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    pub theme: Option<Theme>,
    /// Keyed `app-<name>-collapsed`
    pub collapsed: BTreeMap<String, bool>,
}

fn collapsed_key(section: &str) -> String {
    format!("app-{}-collapsed", section.trim())
}

/// Preferences bound to a file; `None` path keeps them in memory only
#[derive(Debug)]
pub struct PreferenceStore {
    path: Option<PathBuf>,
    prefs: Preferences,
}

impl PreferenceStore {
    /// `<config_dir>/particle-field/preferences.json`
    pub fn default_path() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|p| p.join("particle-field").join("preferences.json"))
            .ok_or(FieldError::NoDirectory("config"))
    }

    /// Open the store at the default location, falling back to memory-only
    pub fn open_default() -> Self {
        match Self::default_path() {
            Ok(path) => Self::open(path),
            Err(e) => {
                warn!("preferences disabled: {}", e);
                Self::in_memory()
            }
        }
    }

    /// Load from `path`; a missing or unreadable file yields defaults
    pub fn open(path: PathBuf) -> Self {
        let prefs = match Self::load(&path) {
            Ok(prefs) => prefs,
            Err(FieldError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => Preferences::default(),
            Err(e) => {
                warn!(path = %path.display(), "could not read preferences: {}", e);
                Preferences::default()
            }
        };
        Self {
            path: Some(path),
            prefs,
        }
    }

    pub fn in_memory() -> Self {
        Self {
            path: None,
            prefs: Preferences::default(),
        }
    }

    fn load(path: &Path) -> Result<Preferences> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    fn save(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        fs::write(path, serde_json::to_string_pretty(&self.prefs)?)?;
        Ok(())
    }

    pub fn theme(&self) -> Option<Theme> {
        self.prefs.theme
    }

    pub fn set_theme(&mut self, theme: Theme) -> Result<()> {
        self.prefs.theme = Some(theme);
        self.save()
    }

    pub fn is_collapsed(&self, section: &str) -> bool {
        self.prefs
            .collapsed
            .get(&collapsed_key(section))
            .copied()
            .unwrap_or(false)
    }

    /// Flip a section and persist; returns the new collapsed state
    pub fn toggle_collapsed(&mut self, section: &str) -> Result<bool> {
        let collapsed = !self.is_collapsed(section);
        self.prefs.collapsed.insert(collapsed_key(section), collapsed);
        self.save()?;
        Ok(collapsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_theme_and_sections_persist() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("preferences.json");

        let mut store = PreferenceStore::open(path.clone());
        assert_eq!(store.theme(), None);
        store.set_theme(Theme::Light).unwrap();
        assert!(store.toggle_collapsed("Controls").unwrap());

        let reopened = PreferenceStore::open(path.clone());
        assert_eq!(reopened.theme(), Some(Theme::Light));
        assert!(reopened.is_collapsed("Controls"));
        assert!(!reopened.is_collapsed("Status"));

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"theme\": \"light\""));
        assert!(raw.contains("\"app-Controls-collapsed\": true"));
    }

    #[test]
    fn test_toggle_twice_expands_again() {
        let mut store = PreferenceStore::in_memory();
        assert!(store.toggle_collapsed("Field").unwrap());
        assert!(!store.toggle_collapsed("Field").unwrap());
        assert!(!store.is_collapsed("Field"));
    }

    #[test]
    fn test_corrupt_file_falls_back_to_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("preferences.json");
        std::fs::write(&path, "{ nope").unwrap();
        let store = PreferenceStore::open(path);
        assert_eq!(store.theme(), None);
        assert!(!store.is_collapsed("Status"));
    }
}
