//! JSON persistence for connection profiles and settings.
//!
//! Profiles live in `connections.json` and settings in `settings.json`
//! under the platform config directory. Missing files are not an error;
//! they yield an empty profile list or default settings.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::Result;

use super::types::{ConnectionProfile, Settings};

const PROFILES_FILE: &str = "connections.json";
const SETTINGS_FILE: &str = "settings.json";

/// Platform config directory for this application.
#[must_use]
pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("sftp-courier")
}

/// Load the profile list from `connections.json` under `dir`.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_profiles(dir: &Path) -> Result<Vec<ConnectionProfile>> {
    let path = dir.join(PROFILES_FILE);
    if !path.exists() {
        debug!(path = %path.display(), "No profile file, starting empty");
        return Ok(Vec::new());
    }

    let content = fs::read_to_string(&path)?;
    let profiles: Vec<ConnectionProfile> = serde_json::from_str(&content)?;
    debug!(path = %path.display(), count = profiles.len(), "Loaded profiles");
    Ok(profiles)
}

/// Save the profile list to `connections.json` under `dir`, creating the
/// directory if needed.
///
/// # Errors
///
/// Returns an error if the directory cannot be created or the file
/// cannot be written.
pub fn save_profiles(dir: &Path, profiles: &[ConnectionProfile]) -> Result<()> {
    fs::create_dir_all(dir)?;
    let path = dir.join(PROFILES_FILE);
    let content = serde_json::to_string_pretty(profiles)?;
    fs::write(&path, content)?;
    debug!(path = %path.display(), count = profiles.len(), "Saved profiles");
    Ok(())
}

/// Load settings from `settings.json` under `dir`.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_settings(dir: &Path) -> Result<Settings> {
    let path = dir.join(SETTINGS_FILE);
    if !path.exists() {
        return Ok(Settings::default());
    }

    let content = fs::read_to_string(&path)?;
    let settings = serde_json::from_str(&content)?;
    Ok(settings)
}

/// Save settings to `settings.json` under `dir`.
///
/// # Errors
///
/// Returns an error if the directory cannot be created or the file
/// cannot be written.
pub fn save_settings(dir: &Path, settings: &Settings) -> Result<()> {
    fs::create_dir_all(dir)?;
    let path = dir.join(SETTINGS_FILE);
    let content = serde_json::to_string_pretty(settings)?;
    fs::write(&path, content)?;
    Ok(())
}
