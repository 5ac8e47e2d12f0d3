//! Transient user notifications (export results, save failures)

use serde::Serialize;

pub const EXPORT_FORMAT_UNAVAILABLE: &str = "The selected export format is not available for this layer";
pub const EXPORT_FAILED: &str = "Export failed";
pub const EXPORT_EMPTY: &str = "Export produced no file";
pub const EXPORT_SAVED: &str = "Export saved";
pub const FILE_SAVE_FAILED: &str = "Could not save exported file";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    Info,
    Error,
}

/// A snackbar-style message for the host to display
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
}

impl Notification {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Info,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Error,
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.level == NotificationLevel::Error
    }
}
