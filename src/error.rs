//! Error types for the ingestion pipeline.
//!
//! Every failure is fatal for the partition (or aggregate run) that raised it;
//! nothing here is retried.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Remote returned a non-success status.
    #[error("fetch failed: HTTP {status} for {url}")]
    Fetch { status: u16, url: String },

    /// The sentinel label never appeared in column 0.
    #[error("header row not found in {}: no row starts with `{sentinel}`", file.display())]
    HeaderNotFound { file: PathBuf, sentinel: String },

    /// Normalized columns disagree with the destination (or with the other files
    /// being concatenated into it).
    #[error("schema mismatch for {table}: expected {expected:?}, found {found:?}")]
    SchemaMismatch {
        table: String,
        expected: Vec<String>,
        found: Vec<String>,
    },

    /// A fixed-layout file does not have the number of columns its layout names.
    #[error("{} has {found} columns, layout expects {expected}", file.display())]
    ColumnCountMismatch {
        file: PathBuf,
        expected: usize,
        found: usize,
    },

    /// A column a merge or layout relies on is absent.
    #[error("column `{column}` not found among {found:?}")]
    MissingColumn { column: String, found: Vec<String> },

    #[error("invalid partition key `{0}`")]
    InvalidPartitionKey(String),

    #[error("unknown dataset variant `{0}`")]
    UnknownVariant(String),

    #[error("sheet {} is empty or has no header at row {offset}", file.display())]
    EmptySheet { file: PathBuf, offset: usize },

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("spreadsheet error: {0}")]
    Spreadsheet(#[from] calamine::Error),

    #[error("database error: {0}")]
    Database(#[from] duckdb::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
