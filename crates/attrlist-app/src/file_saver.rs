//! File-save side effect for exports

use std::fmt;
use std::path::{Path, PathBuf};

use attrlist_core::prelude::*;

/// Persists an exported file on behalf of the engine
pub trait FileSaver: Send + Sync + fmt::Debug {
    /// Save `content` under `file_name`, returning where it was written
    fn save(&self, file_name: &str, content: &[u8]) -> Result<PathBuf>;
}

/// Writes exports into one directory
#[derive(Debug, Clone)]
pub struct DirectoryFileSaver {
    directory: PathBuf,
}

impl DirectoryFileSaver {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }
}

impl FileSaver for DirectoryFileSaver {
    fn save(&self, file_name: &str, content: &[u8]) -> Result<PathBuf> {
        // Only the final component: backend names must not escape the directory
        let name = Path::new(file_name)
            .file_name()
            .ok_or_else(|| Error::export(format!("Invalid export file name '{}'", file_name)))?;

        std::fs::create_dir_all(&self.directory)?;
        let path = self.directory.join(name);
        std::fs::write(&path, content)
            .with_context(|| format!("Failed to write export to {}", path.display()))?;
        debug!("Wrote {} bytes to {}", content.len(), path.display());
        Ok(path)
    }
}
