//! File logging for the engine and its hosts
//!
//! `ATTRLIST_LOG` takes an `EnvFilter` directive and `ATTRLIST_LOG_DIR`
//! moves the log directory, which otherwise lives under the platform data
//! dir (`~/.local/share/attrlist/logs/` on Linux):
//!
//! ```bash
//! ATTRLIST_LOG=debug attrlist --fixture layers.json
//! ATTRLIST_LOG=attrlist_app=trace,warn attrlist --fixture layers.json
//! ATTRLIST_LOG_DIR=/tmp/attrlist attrlist --fixture layers.json
//! ```

use std::path::PathBuf;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::error::Result;

/// Environment variable holding the log filter directive
pub const LOG_ENV_VAR: &str = "ATTRLIST_LOG";

/// Environment variable overriding the log directory
pub const LOG_DIR_ENV_VAR: &str = "ATTRLIST_LOG_DIR";

/// Filter used when [`LOG_ENV_VAR`] is unset or invalid: the workspace
/// crates at info, dependencies at warn
pub const DEFAULT_FILTER: &str =
    "attribute_list=info,attrlist_core=info,attrlist_sources=info,attrlist_app=info,warn";

const LOG_FILE_PREFIX: &str = "attrlist.log";

/// Install the global subscriber writing to a daily rolling file
pub fn init() -> Result<()> {
    let log_dir = log_directory(std::env::var_os(LOG_DIR_ENV_VAR).map(PathBuf::from));
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = RollingFileAppender::new(Rotation::DAILY, &log_dir, LOG_FILE_PREFIX);

    tracing_subscriber::registry()
        .with(env_filter(std::env::var(LOG_ENV_VAR).ok().as_deref()))
        .with(
            fmt::layer()
                .with_writer(file_appender)
                .with_ansi(false)
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .with_timer(fmt::time::ChronoLocal::new(
                    "%Y-%m-%d %H:%M:%S%.3f".to_string(),
                )),
        )
        .init();

    tracing::info!(
        "Logging to {} (filter: {})",
        log_dir.display(),
        std::env::var(LOG_ENV_VAR).unwrap_or_else(|_| DEFAULT_FILTER.to_string())
    );
    Ok(())
}

/// Parse a filter directive, falling back to [`DEFAULT_FILTER`]
fn env_filter(directive: Option<&str>) -> EnvFilter {
    directive
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_FILTER))
}

fn log_directory(override_dir: Option<PathBuf>) -> PathBuf {
    override_dir.unwrap_or_else(|| {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("attrlist")
            .join("logs")
    })
}
