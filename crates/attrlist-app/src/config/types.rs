//! Configuration types for the attribute list engine
//!
//! Defines `Settings` and its sections. Every field has a default so a
//! partial `config.toml` is valid.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Smallest and largest page size a dataset may use
pub const PAGE_SIZE_RANGE: std::ops::RangeInclusive<u32> = 10..=100;

/// Engine settings (.attrlist/config.toml)
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Settings {
    #[serde(default)]
    pub data: DataSettings,

    #[serde(default)]
    pub debounce: DebounceSettings,

    #[serde(default)]
    pub cache: CacheSettings,

    #[serde(default)]
    pub export: ExportSettings,
}

/// Dataset defaults
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct DataSettings {
    /// Rows per page for new datasets (clamped to 10..=100)
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

impl Default for DataSettings {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
        }
    }
}

impl DataSettings {
    pub fn effective_page_size(&self) -> u32 {
        self.page_size
            .clamp(*PAGE_SIZE_RANGE.start(), *PAGE_SIZE_RANGE.end())
    }
}

fn default_page_size() -> u32 {
    10
}

/// Debounce windows for inputs that trigger loads
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct DebounceSettings {
    /// Delay before a filter change reloads tabs
    #[serde(default = "default_filter_ms")]
    pub filter_ms: u64,

    /// Delay before a visible-layer change reconciles tabs (0 = immediate)
    #[serde(default)]
    pub layers_ms: u64,
}

impl Default for DebounceSettings {
    fn default() -> Self {
        Self {
            filter_ms: default_filter_ms(),
            layers_ms: 0,
        }
    }
}

fn default_filter_ms() -> u64 {
    250
}

/// Limits for session caches. 0 means unbounded.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CacheSettings {
    /// Max `(application, layer)` entries in the export capability cache
    #[serde(default = "default_cache_entries")]
    pub max_export_capabilities: usize,

    /// Max `(application, layer)` keys in the feature detail cache
    #[serde(default = "default_cache_entries")]
    pub max_feature_detail_keys: usize,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            max_export_capabilities: default_cache_entries(),
            max_feature_detail_keys: default_cache_entries(),
        }
    }
}

fn default_cache_entries() -> usize {
    256
}

/// Export settings
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ExportSettings {
    /// Directory exported files are saved to. Defaults to the user's
    /// download directory.
    #[serde(default)]
    pub directory: Option<PathBuf>,
}

impl ExportSettings {
    pub fn resolved_directory(&self) -> PathBuf {
        self.directory
            .clone()
            .or_else(dirs::download_dir)
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.data.page_size, 10);
        assert_eq!(settings.debounce.filter_ms, 250);
        assert_eq!(settings.debounce.layers_ms, 0);
        assert_eq!(settings.cache.max_export_capabilities, 256);
        assert!(settings.export.directory.is_none());
    }

    #[test]
    fn test_page_size_is_clamped() {
        let small = DataSettings { page_size: 1 };
        let large = DataSettings { page_size: 5000 };
        assert_eq!(small.effective_page_size(), 10);
        assert_eq!(large.effective_page_size(), 100);
    }

    #[test]
    fn test_partial_toml() {
        let settings: Settings = toml::from_str(
            r#"
[data]
page_size = 50

[export]
directory = "/tmp/exports"
"#,
        )
        .unwrap();

        assert_eq!(settings.data.page_size, 50);
        assert_eq!(settings.debounce.filter_ms, 250);
        assert_eq!(
            settings.export.resolved_directory(),
            PathBuf::from("/tmp/exports")
        );
    }
}
