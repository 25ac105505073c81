//! Persisted user preferences.
//!
//! A flat JSON document holding conversion defaults. Loading never fails:
//! a missing file yields defaults, and a corrupted file is renamed aside as
//! a backup and replaced with defaults on the next save.

use std::path::{Path, PathBuf};

use figment::providers::{Env, Format, Json};
use figment::Figment;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::format::TargetFormat;

/// Input selection mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputMode {
    /// Scan a folder.
    Folder,
    /// Explicit file list.
    Files,
}

/// Flat persisted settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Input selection mode.
    #[serde(default = "default_mode")]
    pub mode: InputMode,

    /// Target format.
    #[serde(default = "default_format")]
    pub format: TargetFormat,

    /// Whether folder mode descends into subdirectories.
    #[serde(default)]
    pub include_sub: bool,

    /// Place outputs next to their inputs.
    #[serde(default = "default_true")]
    pub same_location: bool,

    /// Overwrite existing outputs instead of renaming.
    #[serde(default)]
    pub overwrite: bool,

    /// Last folder scanned.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_folder: Option<PathBuf>,

    /// Last output folder chosen.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_output: Option<PathBuf>,

    /// UI theme name; opaque to the engine, persisted for the shell.
    #[serde(default = "default_theme")]
    pub theme: String,
}

fn default_mode() -> InputMode {
    InputMode::Folder
}

fn default_format() -> TargetFormat {
    TargetFormat::Pdf
}

fn default_true() -> bool {
    true
}

fn default_theme() -> String {
    "dark".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            mode: default_mode(),
            format: default_format(),
            include_sub: false,
            same_location: default_true(),
            overwrite: false,
            last_folder: None,
            last_output: None,
            theme: default_theme(),
        }
    }
}

/// Loads settings from `path`.
///
/// Never returns an error: a missing file yields defaults; an unreadable or
/// corrupted file is renamed to `<name>.bak` (best effort) and defaults are
/// returned. Environment variables prefixed `HANCONV_` override individual
/// keys.
pub fn load_settings(path: &Path) -> Settings {
    if !path.exists() {
        debug!(path = %path.display(), "No settings file, using defaults");
        return from_env(Settings::default());
    }

    // Parse once up front so corruption can be detected and backed up;
    // figment alone would silently mix a broken file with defaults.
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to read settings, using defaults");
            return from_env(Settings::default());
        }
    };

    if serde_json::from_str::<Settings>(&raw).is_err() {
        back_up_corrupted(path);
        return from_env(Settings::default());
    }

    let extracted: Result<Settings, _> = Figment::new()
        .merge(Json::file(path))
        .merge(Env::prefixed("HANCONV_"))
        .extract();

    match extracted {
        Ok(settings) => settings,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Settings extraction failed, using defaults");
            from_env(Settings::default())
        }
    }
}

/// Saves settings as pretty JSON, creating parent directories.
pub fn save_settings(path: &Path, settings: &Settings) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(settings)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    std::fs::write(path, json)
}

fn from_env(defaults: Settings) -> Settings {
    Figment::from(figment::providers::Serialized::defaults(defaults.clone()))
        .merge(Env::prefixed("HANCONV_"))
        .extract()
        .unwrap_or(defaults)
}

fn back_up_corrupted(path: &Path) {
    let mut backup = path.as_os_str().to_owned();
    backup.push(".bak");
    let backup = PathBuf::from(backup);
    match std::fs::rename(path, &backup) {
        Ok(()) => warn!(
            path = %path.display(),
            backup = %backup.display(),
            "Settings file corrupted, renamed aside"
        ),
        Err(e) => warn!(
            path = %path.display(),
            error = %e,
            "Settings file corrupted and could not be renamed aside"
        ),
    }
}
