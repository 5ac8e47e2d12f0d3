//! Configuration file parsing for the attribute list engine
//!
//! Supports:
//! - `.attrlist/config.toml` - Engine settings
//! - an explicit settings file passed by the host

pub mod settings;
pub mod types;

pub use settings::{load_settings, load_settings_file, save_settings, CONFIG_DIR};
pub use types::*;
