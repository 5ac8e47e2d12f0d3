//! Engine error types with rich context

use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Default user-facing message for a failed attribute list load
pub const DEFAULT_LOAD_ERROR: &str = "Failed to load attribute list data";

/// Engine error types organized by layer/domain
#[derive(Debug, Error)]
pub enum Error {
    // ─────────────────────────────────────────────────────────────
    // Common/Infrastructure Errors
    // ─────────────────────────────────────────────────────────────
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    // ─────────────────────────────────────────────────────────────
    // Source/Transport Errors
    // ─────────────────────────────────────────────────────────────
    /// The injected transport rejected a request. `message` is shown to the
    /// user as-is when present.
    #[error("Transport error: {message}")]
    Transport { message: String },

    #[error("Source already registered: {source_id}")]
    SourceExists { source_id: String },

    #[error("Export error: {message}")]
    Export { message: String },

    // ─────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },
}

// ─────────────────────────────────────────────────────────────────
// Convenience Constructors
// ─────────────────────────────────────────────────────────────────

impl Error {
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    pub fn export(message: impl Into<String>) -> Self {
        Self::Export {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Message suitable for the attribute list panel.
    ///
    /// Transport errors carry the loader's own message; everything else falls
    /// back to [`DEFAULT_LOAD_ERROR`].
    pub fn user_message(&self) -> String {
        match self {
            Error::Transport { message } if !message.trim().is_empty() => message.clone(),
            _ => DEFAULT_LOAD_ERROR.to_string(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Error Context Extensions
// ─────────────────────────────────────────────────────────────────

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context with a closure (lazy evaluation)
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| {
            let err = e.into();
            tracing::error!("{}: {:?}", f(), err);
            err
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_messages() {
        let err = Error::transport("503 Service Unavailable");
        assert_eq!(err.to_string(), "Transport error: 503 Service Unavailable");

        let err = Error::SourceExists {
            source_id: "wfs".to_string(),
        };
        assert!(err.to_string().contains("wfs"));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_user_message_prefers_transport_message() {
        let err = Error::transport("Layer is not queryable");
        assert_eq!(err.user_message(), "Layer is not queryable");
    }

    #[test]
    fn test_user_message_defaults() {
        assert_eq!(Error::transport("  ").user_message(), DEFAULT_LOAD_ERROR);
        assert_eq!(Error::export("disk full").user_message(), DEFAULT_LOAD_ERROR);
        assert_eq!(Error::config("bad").user_message(), DEFAULT_LOAD_ERROR);
    }
}
