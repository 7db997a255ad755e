//! Staging tables in DuckDB.
//!
//! Every column is VARCHAR. A table is created from the first batch written to
//! it; later batches must carry the same columns in the same order and are
//! appended.

use std::path::Path;

use duckdb::{appender_params_from_iter, params, Connection};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::normalize::Table;

/// Open a DuckDB database on disk at `path`, creating the file if it doesn't exist.
pub fn open_disk_db(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path)?;
    Ok(conn)
}

/// Open a DuckDB in-memory database
pub fn open_mem_db() -> Result<Connection> {
    let conn = Connection::open_in_memory()?;
    Ok(conn)
}

/// Double-quoted SQL identifier.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn qualified(schema: &str, table: &str) -> String {
    format!("{}.{}", quote_ident(schema), quote_ident(table))
}

/// Columns of `schema.table` in declaration order; `None` if the table does not exist.
pub fn table_columns(conn: &Connection, schema: &str, table: &str) -> Result<Option<Vec<String>>> {
    let mut stmt = conn.prepare(
        "SELECT column_name FROM information_schema.columns
         WHERE table_schema = ? AND table_name = ?
         ORDER BY ordinal_position",
    )?;
    let columns = stmt
        .query_map(params![schema, table], |r| r.get::<_, String>(0))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(if columns.is_empty() { None } else { Some(columns) })
}

fn create_table(conn: &Connection, schema: &str, table: &str, columns: &[String]) -> Result<()> {
    let defs = columns
        .iter()
        .map(|c| format!("{} VARCHAR", quote_ident(c)))
        .collect::<Vec<_>>()
        .join(", ");
    conn.execute_batch(&format!(
        "CREATE TABLE {} ({});",
        qualified(schema, table),
        defs
    ))?;
    info!(schema, table, columns = columns.len(), "created table");
    Ok(())
}

/// Write `data` into `schema.table`, creating the schema and the table as needed.
///
/// Rows are appended; writing the same batch twice stores it twice.
pub fn write_table(conn: &Connection, data: &Table, schema: &str, table: &str) -> Result<()> {
    conn.execute_batch(&format!(
        "CREATE SCHEMA IF NOT EXISTS {};",
        quote_ident(schema)
    ))?;

    match table_columns(conn, schema, table)? {
        Some(existing) if existing != data.columns => {
            return Err(Error::SchemaMismatch {
                table: format!("{}.{}", schema, table),
                expected: existing,
                found: data.columns.clone(),
            });
        }
        Some(_) => debug!(schema, table, "appending to existing table"),
        None => create_table(conn, schema, table, &data.columns)?,
    }

    let mut appender = conn.appender_to_db(table, schema)?;
    appender.append_rows(data.rows.iter().map(appender_params_from_iter))?;
    appender.flush()?;

    info!(schema, table, rows = data.len(), "wrote rows");
    Ok(())
}

/// Read `schema.table` back in insertion order. NULLs come back as empty strings.
pub fn read_table(conn: &Connection, schema: &str, table: &str) -> Result<Table> {
    let columns = table_columns(conn, schema, table)?.ok_or_else(|| Error::MissingColumn {
        column: format!("{}.{}", schema, table),
        found: Vec::new(),
    })?;
    let select = columns
        .iter()
        .map(|c| quote_ident(c))
        .collect::<Vec<_>>()
        .join(", ");
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM {} ORDER BY rowid",
        select,
        qualified(schema, table)
    ))?;
    let width = columns.len();
    let rows = stmt
        .query_map([], |r| {
            (0..width)
                .map(|i| r.get::<_, Option<String>>(i).map(Option::unwrap_or_default))
                .collect::<std::result::Result<Vec<_>, _>>()
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(Table::new(columns, rows))
}

/// Number of rows in `schema.table`.
pub fn count_rows(conn: &Connection, schema: &str, table: &str) -> Result<i64> {
    let n = conn.query_row(
        &format!("SELECT COUNT(*) FROM {}", qualified(schema, table)),
        [],
        |r| r.get(0),
    )?;
    Ok(n)
}
