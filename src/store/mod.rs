// src/store/mod.rs

use std::path::PathBuf;

use glob::glob;
use tokio::fs;
use tracing::warn;

use crate::error::{Error, Result};

/// Raw copies of downloaded files, one directory per dataset under `base`.
#[derive(Debug, Clone)]
pub struct RawStore {
    base: PathBuf,
}

impl RawStore {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    pub fn dir(&self, directory: &str) -> PathBuf {
        self.base.join(directory)
    }

    /// Write `content` to `<base>/<directory>/<filename>`, replacing any previous copy.
    pub async fn save_bytes(&self, content: &[u8], directory: &str, filename: &str) -> Result<PathBuf> {
        let dest = self.dir(directory).join(filename);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&dest, content).await?;
        Ok(dest)
    }

    /// Files in `directory` matching `pattern`, sorted by path. A missing
    /// directory yields an empty list.
    pub fn glob(&self, directory: &str, pattern: &str) -> Result<Vec<PathBuf>> {
        let dir = self.dir(directory);
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let full = format!("{}/{}", glob::Pattern::escape(&dir.to_string_lossy()), pattern);
        let entries = glob(&full).map_err(|e| {
            Error::Io(std::io::Error::new(std::io::ErrorKind::InvalidInput, e))
        })?;

        let mut paths = Vec::new();
        for entry in entries {
            match entry {
                Ok(path) if path.is_file() => paths.push(path),
                Ok(_) => {}
                Err(e) => warn!("skipping unreadable entry: {}", e),
            }
        }
        paths.sort();
        Ok(paths)
    }
}
