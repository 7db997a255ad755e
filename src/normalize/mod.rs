//! Turns human-edited budget spreadsheets into tables with one stable column
//! vocabulary per dataset variant.

pub mod era;
pub mod header;
pub mod layouts;
pub mod merge;
pub mod rename;

use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use tracing::info;

use crate::dataset::Variant;
use crate::error::{Error, Result};
use crate::sheet::RawSheet;

pub use era::{FormatEra, ERA_CUTOFF};
pub use header::{header_offset, locate_header, HeaderRule};
pub use layouts::{layout_for, Layout};
pub use merge::{merge_descriptive_columns, ColumnRef, MergeSpec};
pub use rename::{normalize_label, rename_columns, ColumnRule, Renamed};

/// Provenance: base name of the raw file a row came from.
pub const SOURCE_FILENAME: &str = "nm_arquivo";
/// Provenance: when the row was normalized (not when the file was fetched).
pub const INGESTED_AT: &str = "dt_atualizacao";

/// Column names plus string rows. Every row has one cell per column.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { columns, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Cell at `row` in the column named `column`.
    pub fn get(&self, row: usize, column: &str) -> Option<&str> {
        let col = self.column_index(column)?;
        self.rows.get(row)?.get(col).map(String::as_str)
    }

    /// Append `other`'s rows; its columns must match exactly, order included.
    pub fn append(&mut self, other: Table, table_name: &str) -> Result<()> {
        if other.columns != self.columns {
            return Err(Error::SchemaMismatch {
                table: table_name.to_string(),
                expected: self.columns.clone(),
                found: other.columns,
            });
        }
        self.rows.extend(other.rows);
        Ok(())
    }

    /// Add the two provenance columns to every row.
    pub fn stamp(&mut self, file_name: &str, ingested_at: DateTime<Utc>) {
        let ts = ingested_at.to_rfc3339_opts(SecondsFormat::Micros, true);
        self.columns.push(SOURCE_FILENAME.to_string());
        self.columns.push(INGESTED_AT.to_string());
        for row in &mut self.rows {
            row.push(file_name.to_string());
            row.push(ts.clone());
        }
    }
}

/// Normalize an in-memory sheet of `variant`, stamping `ingested_at`.
pub fn normalize_sheet(
    variant: Variant,
    sheet: &RawSheet,
    ingested_at: DateTime<Utc>,
) -> Result<Table> {
    let layout = layout_for(variant, sheet.path())?;
    let mut table = layout.apply(sheet)?;
    table.stamp(&sheet.file_name(), ingested_at);
    Ok(table)
}

/// Read and normalize one raw file, stamped with the current time.
#[tracing::instrument(level = "debug", skip(path), fields(path = %path.display()))]
pub fn normalize_file(variant: Variant, path: &Path) -> Result<Table> {
    let sheet = RawSheet::open(path)?;
    let table = normalize_sheet(variant, &sheet, Utc::now())?;
    info!(file = %path.display(), rows = table.len(), "normalized");
    Ok(table)
}

/// Concatenate normalized tables bound for `table_name`. `None` when there is
/// nothing to concatenate.
pub fn concat<I>(tables: I, table_name: &str) -> Result<Option<Table>>
where
    I: IntoIterator<Item = Table>,
{
    let mut tables = tables.into_iter();
    let Some(mut out) = tables.next() else {
        return Ok(None);
    };
    for t in tables {
        out.append(t, table_name)?;
    }
    Ok(Some(out))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn grid(rows: &[&[&str]]) -> Vec<Vec<String>> {
        rows.iter()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect()
    }

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 2, 12, 30, 0).unwrap()
    }

    #[test]
    fn pre_cutoff_comparative_end_to_end() {
        let sheet = RawSheet::from_rows(
            "/data/pjf_receita_mensal_comparativa/2504.xls",
            grid(&[
                &["PREFEITURA DE JUIZ DE FORA"],
                &["RECEITA TOTAL", "", "PREVISÃO INICIAL"],
                &["3.1.1", "Imposto", "100.00"],
            ]),
        );
        let t = normalize_sheet(Variant::ReceitaMensalComparativa, &sheet, at()).unwrap();

        assert_eq!(
            t.columns,
            ["Natureza", "Previsão Inicial", SOURCE_FILENAME, INGESTED_AT]
        );
        assert_eq!(t.len(), 1);
        assert_eq!(t.get(0, "Natureza"), Some("3.1.1 - Imposto"));
        assert_eq!(t.get(0, "Previsão Inicial"), Some("100.00"));
        assert_eq!(t.get(0, SOURCE_FILENAME), Some("2504.xls"));
        assert_eq!(t.get(0, INGESTED_AT), Some("2025-06-02T12:30:00.000000Z"));
        assert!(t.column_index("RECEITA TOTAL").is_none());
        assert!(t.column_index("Unnamed: 1").is_none());
    }

    #[test]
    fn post_cutoff_comparative_uses_fixed_offset_and_literal_columns() {
        let mut rows = grid(&[
            &["PREFEITURA DE JUIZ DE FORA"],
            &["Comparativo da Receita"],
            &["Maio/2025"],
            &[""],
            &["Valores em R$"],
        ]);
        rows.extend(grid(&[
            &["Cód.", "Especificação", "Prev. Ini.", "Prev. Atu.", "Mês", "Acum.", "Dif."],
            &["3.1.1", "Imposto", "100", "110", "9", "40", "70"],
        ]));
        let sheet = RawSheet::from_rows("2505.xls", rows);
        let t = normalize_sheet(Variant::ReceitaMensalComparativa, &sheet, at()).unwrap();
        assert_eq!(
            t.columns,
            [
                "Natureza",
                "Previsão Inicial",
                "Previsão Atualizada",
                "Arrecadado no Mês",
                "Arrecadado até o Mês",
                "Diferença",
                SOURCE_FILENAME,
                INGESTED_AT
            ]
        );
        assert_eq!(t.get(0, "Natureza"), Some("3.1.1 - Imposto"));
        assert_eq!(t.get(0, "Diferença"), Some("70"));
    }

    #[test]
    fn expenditure_without_sentinel_is_header_not_found() {
        let sheet = RawSheet::from_rows("2501.xls", grid(&[&["Órgão", "Valor"], &["SMS", "1"]]));
        assert!(matches!(
            normalize_sheet(Variant::DespesaMensalConsolidada, &sheet, at()),
            Err(Error::HeaderNotFound { .. })
        ));
    }

    #[test]
    fn expenditure_with_sentinel() {
        let sheet = RawSheet::from_rows(
            "2501.xls",
            grid(&[
                &["DESPESA MENSAL CONSOLIDADA"],
                &["Unidade Administrativa", "Valor\nEmpenhado", "Valor Pago"],
                &["SMS", "10", "8"],
            ]),
        );
        let t = normalize_sheet(Variant::DespesaMensalConsolidada, &sheet, at()).unwrap();
        assert_eq!(
            t.columns,
            ["Unidade Administrativa", "Empenhado", "Pago", SOURCE_FILENAME, INGESTED_AT]
        );
        assert_eq!(t.rows[0][..3], ["SMS", "10", "8"]);
    }

    #[test]
    fn concat_requires_identical_columns() {
        let a = Table::new(vec!["x".into()], vec![vec!["1".into()]]);
        let b = Table::new(vec!["x".into()], vec![vec!["2".into()]]);
        let c = Table::new(vec!["y".into()], vec![vec!["3".into()]]);

        let ab = concat([a.clone(), b], "t").unwrap().unwrap();
        assert_eq!(ab.rows, [["1"], ["2"]]);

        match concat([a, c], "stg.t") {
            Err(Error::SchemaMismatch { table, expected, found }) => {
                assert_eq!(table, "stg.t");
                assert_eq!(expected, ["x"]);
                assert_eq!(found, ["y"]);
            }
            other => panic!("unexpected {:?}", other),
        }

        assert!(concat(Vec::<Table>::new(), "t").unwrap().is_none());
    }

    #[test]
    fn each_normalization_gets_its_own_timestamp() {
        let rows = grid(&[&["t"], &["RECEITA", "", "PREVISÃO INICIAL"], &["1", "a", "2"]]);
        let sheet = RawSheet::from_rows("2401.xls", rows);
        let later = at() + chrono::Duration::seconds(5);
        let first = normalize_sheet(Variant::ReceitaMensalComparativa, &sheet, at()).unwrap();
        let second = normalize_sheet(Variant::ReceitaMensalComparativa, &sheet, later).unwrap();
        assert_ne!(first.get(0, INGESTED_AT), second.get(0, INGESTED_AT));
        assert_eq!(first.get(0, "Natureza"), second.get(0, "Natureza"));
    }
}
