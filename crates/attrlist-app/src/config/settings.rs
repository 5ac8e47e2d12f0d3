//! Settings parser for .attrlist/config.toml

use std::path::Path;

use attrlist_core::prelude::*;

use super::types::Settings;

pub const CONFIG_DIR: &str = ".attrlist";
const CONFIG_FILENAME: &str = "config.toml";

/// Load settings from `<base>/.attrlist/config.toml`
///
/// Returns default settings if the file doesn't exist or can't be parsed.
pub fn load_settings(base_path: &Path) -> Settings {
    load_settings_file(&base_path.join(CONFIG_DIR).join(CONFIG_FILENAME))
}

/// Load settings from an explicit file path, falling back to defaults
pub fn load_settings_file(config_path: &Path) -> Settings {
    if !config_path.exists() {
        debug!("No config file at {:?}, using defaults", config_path);
        return Settings::default();
    }

    match std::fs::read_to_string(config_path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(settings) => {
                debug!("Loaded settings from {:?}", config_path);
                settings
            }
            Err(e) => {
                warn!("Failed to parse {:?}: {}", config_path, e);
                Settings::default()
            }
        },
        Err(e) => {
            warn!("Failed to read {:?}: {}", config_path, e);
            Settings::default()
        }
    }
}

/// Save settings to `<base>/.attrlist/config.toml`
///
/// Writes to a temporary file first, then renames it into place.
pub fn save_settings(base_path: &Path, settings: &Settings) -> Result<()> {
    let dir = base_path.join(CONFIG_DIR);
    std::fs::create_dir_all(&dir)?;

    let temp_path = dir.join(".config.toml.tmp");
    let content = toml::to_string_pretty(settings)
        .map_err(|e| Error::config(format!("Failed to serialize settings: {}", e)))?;

    std::fs::write(&temp_path, content)?;
    std::fs::rename(&temp_path, dir.join(CONFIG_FILENAME))?;
    debug!("Saved settings to {:?}", dir.join(CONFIG_FILENAME));
    Ok(())
}
