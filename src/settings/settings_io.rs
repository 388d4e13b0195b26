use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::settings::AppSettings;

const APP_DIR: &str = "branching_tales";
const SETTINGS_FILE: &str = "settings.json";

pub fn settings_path() -> PathBuf {
    let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push(APP_DIR);
    path.push(SETTINGS_FILE);
    path
}

/// Missing or unreadable settings fall back to defaults.
pub fn load_settings() -> AppSettings {
    load_settings_from(&settings_path())
}

pub fn load_settings_from(path: &Path) -> AppSettings {
    match fs::read_to_string(path) {
        Ok(text) => match serde_json::from_str(&text) {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "ignoring corrupt settings file");
                AppSettings::default()
            }
        },
        Err(_) => AppSettings::default(),
    }
}

pub fn save_settings(settings: &AppSettings) -> Result<()> {
    save_settings_to(&settings_path(), settings)
}

pub fn save_settings_to(path: &Path, settings: &AppSettings) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)
            .with_context(|| format!("creating settings directory {}", dir.display()))?;
    }
    let json = serde_json::to_string_pretty(settings).context("serializing settings")?;
    fs::write(path, json).with_context(|| format!("writing settings to {}", path.display()))
}
