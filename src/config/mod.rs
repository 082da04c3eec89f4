//! Configuration and settings management.
//!
//! This module provides application settings types and persistence.
//! Settings are stored in the user's config directory as JSON.

mod settings;

pub use settings::{
    CrmSettings, DatabaseSettings, DnsSettings, MailSettings, PersonalizationSettings,
    SchedulerSettings, SendingSettings, Settings,
};

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// Returns the default settings file path inside the user config dir.
pub fn default_settings_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("com", "panbanda", "cadence")
        .map(|dirs| dirs.config_dir().join("settings.json"))
}

/// Returns the default database path inside the user data dir.
pub fn default_database_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("com", "panbanda", "cadence")
        .map(|dirs| dirs.data_dir().join("cadence.db"))
}

impl Settings {
    /// Loads settings from the default location, falling back to defaults
    /// when no settings file exists yet.
    pub fn load() -> Result<Self> {
        match default_settings_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Loads settings from an explicit path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read settings from {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse settings at {}", path.display()))
    }

    /// Persists settings to an explicit path, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)
            .with_context(|| format!("failed to write settings to {}", path.display()))
    }
}
