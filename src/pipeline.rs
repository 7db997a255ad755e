//! Stage orchestration. The partition stage downloads one file per partition
//! into the raw store; the aggregate stage appends everything on disk to the
//! variant's staging table.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use reqwest::Client;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::dataset::Variant;
use crate::duck;
use crate::fetch::{fetch_xls, file_name, partition_url};
use crate::history::History;
use crate::normalize::{normalize_file, Table};
use crate::partition::PartitionKey;
use crate::store::RawStore;

pub const RAW_PATTERN: &str = "*.xls";

/// Shared handles for one invocation.
pub struct Pipeline {
    pub config: Config,
    pub client: Client,
    pub store: RawStore,
    pub history: History,
}

/// Outcome of fetching every due partition of one variant.
#[derive(Debug, Default)]
pub struct FetchReport {
    pub fetched: Vec<PartitionKey>,
    pub skipped: usize,
    pub failed: Vec<(PartitionKey, String)>,
}

impl FetchReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

impl Pipeline {
    pub fn new(config: Config) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("pjfscraper/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("building http client")?;
        let store = RawStore::new(&config.data_dir);
        let history = History::new(config.history_dir())?;
        Ok(Self {
            config,
            client,
            store,
            history,
        })
    }

    /// Fetch one partition into the raw store and log it.
    #[tracing::instrument(skip(self, key), fields(key = %key))]
    pub async fn materialize(&self, variant: Variant, key: &PartitionKey) -> Result<PathBuf> {
        if !variant.partitions().accepts(key) {
            return Err(anyhow!("partition `{}` does not belong to {}", key, variant));
        }
        let url = partition_url(&self.config.base_url, variant, key)?;
        let name = file_name(&url)
            .ok_or_else(|| anyhow!("no file name in {}", url))?
            .to_string();

        let bytes = fetch_xls(&self.client, &url)
            .await
            .with_context(|| format!("fetching {}", url))?;
        let path = self
            .store
            .save_bytes(&bytes, variant.directory(), &name)
            .await
            .with_context(|| format!("saving {}", name))?;
        self.history
            .record(variant, key, url.as_str(), bytes.len() as u64)?;

        info!(file = %path.display(), size = bytes.len(), "materialized");
        Ok(path)
    }

    /// Partitions due as of `today` that have not been fetched yet (all of
    /// them with `force`). A schedule that issues the running window keeps it
    /// due until the window closes, so its file is refreshed on every run.
    pub fn due_partitions(
        &self,
        variant: Variant,
        today: NaiveDate,
        force: bool,
    ) -> Result<Vec<PartitionKey>> {
        let schedule = variant.partitions();
        let keys = schedule.keys_as_of(today);
        if force {
            return Ok(keys);
        }
        let running = if schedule.end_offset > 0 {
            keys.last().cloned()
        } else {
            None
        };
        let done = self.history.materialized(variant)?;
        Ok(keys
            .into_iter()
            .filter(|k| running.as_ref() == Some(k) || !done.contains(k.as_str()))
            .collect())
    }

    /// Materialize every due partition, one at a time. A failed partition is
    /// logged and recorded in the report; the rest still run.
    #[tracing::instrument(skip(self))]
    pub async fn fetch_due(&self, variant: Variant, today: NaiveDate, force: bool) -> Result<FetchReport> {
        let all = variant.partitions().keys_as_of(today).len();
        let due = self.due_partitions(variant, today, force)?;
        let mut report = FetchReport {
            skipped: all - due.len(),
            ..Default::default()
        };
        info!(due = due.len(), skipped = report.skipped, "fetching partitions");

        for key in due {
            match self.materialize(variant, &key).await {
                Ok(_) => report.fetched.push(key),
                Err(e) => {
                    error!(%key, "partition failed: {:#}", e);
                    report.failed.push((key, format!("{:#}", e)));
                }
            }
        }
        Ok(report)
    }

    /// Aggregate stage for `variant`. Returns the number of rows written.
    pub fn stage(&self, variant: Variant) -> Result<usize> {
        stage(&self.config, &self.store, variant)
    }
}

/// Normalize every raw file of `variant` and append the result to the
/// staging table. Nothing is written unless every file normalizes and all of
/// them agree on their columns.
#[tracing::instrument(skip(config, store))]
pub fn stage(config: &Config, store: &RawStore, variant: Variant) -> Result<usize> {
    let files = store.glob(variant.directory(), RAW_PATTERN)?;
    if files.is_empty() {
        info!(dir = %store.dir(variant.directory()).display(), "no raw files; nothing to stage");
        return Ok(0);
    }
    info!(files = files.len(), "staging");

    let table = normalize_all(config, variant, &files)?;

    let db = config.database_path();
    if let Some(parent) = db.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    let conn = duck::open_disk_db(&db).with_context(|| format!("opening {}", db.display()))?;
    write(&conn, config, variant, &table)?;
    Ok(table.len())
}

fn normalize_all(config: &Config, variant: Variant, files: &[PathBuf]) -> Result<Table> {
    let target = qualified_table(config, variant);
    let mut combined: Option<Table> = None;
    for path in files {
        let table = normalize_file(variant, path)
            .with_context(|| format!("normalizing {}", path.display()))?;
        match combined.as_mut() {
            None => combined = Some(table),
            Some(acc) => acc
                .append(table, &target)
                .with_context(|| format!("concatenating {}", display_name(path)))?,
        }
    }
    combined.ok_or_else(|| anyhow!("no tables to concatenate for {}", target))
}

fn write(conn: &duckdb::Connection, config: &Config, variant: Variant, table: &Table) -> Result<()> {
    if table.is_empty() {
        warn!(table = variant.table(), "normalized files hold no rows");
    }
    duck::write_table(conn, table, &config.staging_schema, variant.table())
        .with_context(|| format!("writing {}", qualified_table(config, variant)))?;
    Ok(())
}

fn qualified_table(config: &Config, variant: Variant) -> String {
    format!("{}.{}", config.staging_schema, variant.table())
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
