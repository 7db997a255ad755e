//! Runtime configuration.
//!
//! Everything has a default, so a config file is optional. When given, it is a
//! small YAML document:
//!
//! ```yaml
//! data_dir: /srv/pjf/data
//! database: /srv/pjf/data/execucao_orcamentaria.duckdb
//! base_url: https://www.pjf.mg.gov.br/transparencia
//! staging_schema: stg
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const DEFAULT_BASE_URL: &str = "https://www.pjf.mg.gov.br/transparencia";
const DEFAULT_DATA_DIR: &str = "data";
const DEFAULT_SCHEMA: &str = "stg";
const DATABASE_FILE: &str = "execucao_orcamentaria.duckdb";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Root of the raw store and the history log.
    pub data_dir: PathBuf,
    /// DuckDB file; defaults to `<data_dir>/execucao_orcamentaria.duckdb`.
    pub database: Option<PathBuf>,
    pub base_url: String,
    pub staging_schema: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            database: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            staging_schema: DEFAULT_SCHEMA.to_string(),
        }
    }
}

impl Config {
    /// Load from `path`, or fall back to defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = fs::read_to_string(path)?;
        Self::from_yaml(&text)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn from_yaml(text: &str) -> std::result::Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(text)
    }

    pub fn with_data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.data_dir = data_dir.into();
        self
    }

    pub fn database_path(&self) -> PathBuf {
        self.database
            .clone()
            .unwrap_or_else(|| self.data_dir.join(DATABASE_FILE))
    }

    pub fn history_dir(&self) -> PathBuf {
        self.data_dir.join("history")
    }
}
