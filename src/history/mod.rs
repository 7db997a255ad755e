// src/history/mod.rs

use anyhow::{Context, Result};
use arrow::array::{Array, ArrayRef, StringArray, TimestampMicrosecondArray, UInt64Array};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use chrono::{DateTime, SecondsFormat, Utc};
use glob::glob;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use std::{
    collections::BTreeSet,
    fmt, fs,
    fs::File,
    path::{Path, PathBuf},
    sync::Arc,
};

use crate::dataset::Variant;
use crate::partition::PartitionKey;

/// One fetched partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Materialization {
    pub variant: String,
    pub partition: String,
    pub url: String,
    pub size_bytes: u64,
    pub materialized_at: DateTime<Utc>,
}

impl fmt::Display for Materialization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\t{}\t{}\t{}",
            self.partition,
            self.materialized_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            self.size_bytes,
            self.url
        )
    }
}

/// Log of materialized partitions backed by single-row Parquet files, laid out as
/// `<history_dir>/<variant>/<partition>_<ts>.parquet`.
pub struct History {
    history_dir: PathBuf,
}

impl History {
    /// Construct a new History store at `history_dir`, creating the directory if needed.
    pub fn new(history_dir: impl Into<PathBuf>) -> Result<Self> {
        let history_dir = history_dir.into();
        fs::create_dir_all(&history_dir)
            .with_context(|| format!("creating history directory {:?}", &history_dir))?;
        Ok(Self { history_dir })
    }

    fn schema() -> Schema {
        Schema::new(vec![
            Field::new("variant", DataType::Utf8, false),
            Field::new("partition", DataType::Utf8, false),
            Field::new("url", DataType::Utf8, false),
            Field::new("size_bytes", DataType::UInt64, false),
            Field::new(
                "materialized_at",
                DataType::Timestamp(TimeUnit::Microsecond, None),
                false,
            ),
        ])
    }

    /// Record that `key` of `variant` was fetched from `url`.
    pub fn record(
        &self,
        variant: Variant,
        key: &PartitionKey,
        url: &str,
        size_bytes: u64,
    ) -> Result<PathBuf> {
        let ts = Utc::now().timestamp_micros();
        let dir = self.history_dir.join(variant.name());
        fs::create_dir_all(&dir).with_context(|| format!("creating {:?}", &dir))?;
        let path = dir.join(format!("{}_{}.parquet", key, ts));

        let schema = Arc::new(Self::schema());
        let columns: Vec<ArrayRef> = vec![
            Arc::new(StringArray::from(vec![variant.name()])),
            Arc::new(StringArray::from(vec![key.as_str()])),
            Arc::new(StringArray::from(vec![url])),
            Arc::new(UInt64Array::from(vec![size_bytes])),
            Arc::new(TimestampMicrosecondArray::from(vec![ts])),
        ];
        let batch = RecordBatch::try_new(schema.clone(), columns)
            .context("building history record batch")?;

        let file =
            File::create(&path).with_context(|| format!("creating history file {:?}", &path))?;
        let props = WriterProperties::builder()
            .set_compression(Compression::SNAPPY)
            .build();
        let mut writer = ArrowWriter::try_new(file, schema, Some(props))
            .context("creating Arrow writer for history")?;
        writer.write(&batch).context("writing history batch")?;
        writer.close().context("closing history writer")?;
        Ok(path)
    }

    /// Distinct partition keys recorded for `variant`, from file names alone.
    pub fn materialized(&self, variant: Variant) -> Result<BTreeSet<String>> {
        let mut set = BTreeSet::new();
        let pattern = format!(
            "{}/{}/*_*.parquet",
            glob::Pattern::escape(&self.history_dir.to_string_lossy()),
            variant.name()
        );
        for path in glob(&pattern)?.flatten() {
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                // stem = "<partition>_<ts>"
                if let Some((key, _)) = stem.split_once('_') {
                    set.insert(key.to_string());
                }
            }
        }
        Ok(set)
    }

    /// Full records for `variant`, oldest first.
    pub fn records(&self, variant: Variant) -> Result<Vec<Materialization>> {
        let dir = self.history_dir.join(variant.name());
        let pattern = format!("{}/*.parquet", glob::Pattern::escape(&dir.to_string_lossy()));
        let mut out = Vec::new();
        for path in glob(&pattern)?.flatten() {
            out.extend(read_file(&path)?);
        }
        out.sort_by_key(|m| m.materialized_at);
        Ok(out)
    }
}

fn read_file(path: &Path) -> Result<Vec<Materialization>> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)?.build()?;
    let mut out = Vec::new();
    for batch in reader {
        let batch = batch.with_context(|| format!("reading {}", path.display()))?;
        let variants = utf8_column(&batch, 0)?;
        let partitions = utf8_column(&batch, 1)?;
        let urls = utf8_column(&batch, 2)?;
        let sizes = batch
            .column(3)
            .as_any()
            .downcast_ref::<UInt64Array>()
            .context("size_bytes is not u64")?;
        let times = batch
            .column(4)
            .as_any()
            .downcast_ref::<TimestampMicrosecondArray>()
            .context("materialized_at is not a timestamp")?;

        for row in 0..batch.num_rows() {
            let materialized_at = DateTime::from_timestamp_micros(times.value(row))
                .context("timestamp out of range")?;
            out.push(Materialization {
                variant: variants.value(row).to_string(),
                partition: partitions.value(row).to_string(),
                url: urls.value(row).to_string(),
                size_bytes: sizes.value(row),
                materialized_at,
            });
        }
    }
    Ok(out)
}

fn utf8_column(batch: &RecordBatch, i: usize) -> Result<&StringArray> {
    batch
        .column(i)
        .as_any()
        .downcast_ref::<StringArray>()
        .with_context(|| format!("history column {} is not utf8", i))
}
