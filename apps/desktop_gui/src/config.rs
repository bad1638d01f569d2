//! Persisted preferences: the API key and the save location URL.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use shared::domain::Credentials;

pub const API_KEY_ENV_VAR: &str = "WORKFLOWY_INBOX_API_KEY";
pub const SAVE_LOCATION_ENV_VAR: &str = "WORKFLOWY_INBOX_SAVE_LOCATION_URL";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub save_location_url: String,
}

impl Settings {
    pub fn credentials(&self) -> Credentials {
        Credentials::new(self.api_key.clone(), self.save_location_url.clone())
    }
}

/// Default settings path under the user config directory.
pub fn default_settings_path() -> Option<PathBuf> {
    dirs::config_dir().map(|base| base.join("workflowy-inbox").join("settings.toml"))
}

/// Defaults, then the settings file, then environment overrides.
///
/// Never fails hard: a missing or malformed file degrades to empty settings,
/// which fail credential validation downstream instead of blocking startup.
pub fn load_settings(path: Option<&Path>) -> Settings {
    let mut settings = Settings::default();

    let path = path.map(Path::to_path_buf).or_else(default_settings_path);
    if let Some(path) = path.as_deref() {
        match fs::read_to_string(path) {
            Ok(raw) => match toml::from_str::<Settings>(&raw) {
                Ok(file_settings) => settings = file_settings,
                Err(err) => tracing::warn!(
                    "ignoring malformed settings file {}: {err}",
                    path.display()
                ),
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("no settings file at {}", path.display());
            }
            Err(err) => tracing::warn!("could not read settings file {}: {err}", path.display()),
        }
    }

    if let Ok(value) = std::env::var(API_KEY_ENV_VAR) {
        settings.api_key = value;
    }
    if let Ok(value) = std::env::var(SAVE_LOCATION_ENV_VAR) {
        settings.save_location_url = value;
    }

    settings
}

/// Persists the settings, creating the parent directory when needed.
pub fn save_settings(path: &Path, settings: &Settings) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating settings directory {}", parent.display()))?;
    }
    let raw = toml::to_string_pretty(settings).context("serializing settings")?;
    fs::write(path, raw).with_context(|| format!("writing settings file {}", path.display()))?;
    Ok(())
}
