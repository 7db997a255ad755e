use crate::error::{Error, Result};
use crate::normalize::Table;

/// How a merge finds one of its source columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnRef {
    /// Position in the parsed header (used where the label is a title or blank).
    Index(usize),
    Name(&'static str),
}

impl ColumnRef {
    fn resolve(&self, table: &Table) -> Result<usize> {
        let found = match self {
            ColumnRef::Index(i) if *i < table.columns.len() && !is_blank_filler(table, *i) => {
                Some(*i)
            }
            ColumnRef::Index(_) => None,
            ColumnRef::Name(name) => table.column_index(name),
        };
        found.ok_or_else(|| Error::MissingColumn {
            column: match self {
                ColumnRef::Index(i) => format!("#{}", i),
                ColumnRef::Name(name) => name.to_string(),
            },
            found: table.columns.clone(),
        })
    }
}

/// An unlabeled column with no values, typically a sheet indented by an empty
/// leading column.
fn is_blank_filler(table: &Table, i: usize) -> bool {
    table.columns[i].starts_with("Unnamed: ")
        && !table.rows.is_empty()
        && table
            .rows
            .iter()
            .all(|row| row.get(i).map_or(true, |c| c.trim().is_empty()))
}

/// Folds a code column and a description column into one `"<code> - <description>"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeSpec {
    pub code: ColumnRef,
    pub description: ColumnRef,
    pub into: &'static str,
}

/// Replace the code column with the merged column and drop the description.
pub fn merge_descriptive_columns(table: Table, spec: &MergeSpec) -> Result<Table> {
    let code = spec.code.resolve(&table)?;
    let desc = spec.description.resolve(&table)?;
    if code == desc {
        return Err(Error::MissingColumn {
            column: spec.into.to_string(),
            found: table.columns,
        });
    }

    let Table { columns, rows } = table;
    let keep = |i: usize| i != desc;

    let columns = columns
        .into_iter()
        .enumerate()
        .filter(|(i, _)| keep(*i))
        .map(|(i, c)| if i == code { spec.into.to_string() } else { c })
        .collect();

    let rows = rows
        .into_iter()
        .map(|row| {
            let cell = |i: usize| row.get(i).map(|c| c.trim()).unwrap_or("");
            let merged = format!("{} - {}", cell(code), cell(desc));
            row.into_iter()
                .enumerate()
                .filter(|(i, _)| keep(*i))
                .map(|(i, c)| if i == code { merged.clone() } else { c })
                .collect()
        })
        .collect();

    Ok(Table::new(columns, rows))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(columns: &[&str], rows: &[&[&str]]) -> Table {
        Table::new(
            columns.iter().map(|c| c.to_string()).collect(),
            rows.iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
        )
    }

    #[test]
    fn merges_by_position() {
        let t = table(
            &["RECEITA TOTAL", "Unnamed: 1", "PREVISÃO INICIAL"],
            &[&["3.1.1", "Imposto", "100.00"]],
        );
        let spec = MergeSpec {
            code: ColumnRef::Index(0),
            description: ColumnRef::Index(1),
            into: "Natureza",
        };
        let out = merge_descriptive_columns(t, &spec).unwrap();
        assert_eq!(out.columns, ["Natureza", "PREVISÃO INICIAL"]);
        assert_eq!(out.rows, [["3.1.1 - Imposto", "100.00"]]);
    }

    #[test]
    fn merges_by_name_wherever_the_columns_are() {
        let t = table(
            &["Valor", "Descrição", "Código"],
            &[&["10", " Taxas ", "1.1"]],
        );
        let spec = MergeSpec {
            code: ColumnRef::Name("Código"),
            description: ColumnRef::Name("Descrição"),
            into: "Natureza",
        };
        let out = merge_descriptive_columns(t, &spec).unwrap();
        assert_eq!(out.columns, ["Valor", "Natureza"]);
        assert_eq!(out.rows, [["10", "1.1 - Taxas"]]);
        assert!(out.column_index("Código").is_none());
        assert!(out.column_index("Descrição").is_none());
    }

    #[test]
    fn empty_leading_column_is_not_a_code_column() {
        let t = table(
            &["Unnamed: 0", "RECEITA TOTAL", "Unnamed: 2", "PREVISÃO INICIAL"],
            &[&["", "3.1.1", "Imposto", "100"]],
        );
        let spec = MergeSpec {
            code: ColumnRef::Index(0),
            description: ColumnRef::Index(1),
            into: "Natureza",
        };
        assert!(matches!(
            merge_descriptive_columns(t, &spec),
            Err(Error::MissingColumn { column, .. }) if column == "#0"
        ));
    }

    #[test]
    fn unlabeled_description_column_with_values_still_merges() {
        let t = table(
            &["RECEITA TOTAL", "Unnamed: 1"],
            &[&["3.1.1", "Imposto"], &["3.1.2", ""]],
        );
        let spec = MergeSpec {
            code: ColumnRef::Index(0),
            description: ColumnRef::Index(1),
            into: "Natureza",
        };
        let out = merge_descriptive_columns(t, &spec).unwrap();
        assert_eq!(out.rows, [["3.1.1 - Imposto"], ["3.1.2 - "]]);
    }

    #[test]
    fn missing_source_column() {
        let t = table(&["Código"], &[]);
        let spec = MergeSpec {
            code: ColumnRef::Name("Código"),
            description: ColumnRef::Name("Descrição"),
            into: "Natureza",
        };
        assert!(matches!(
            merge_descriptive_columns(t, &spec),
            Err(Error::MissingColumn { column, .. }) if column == "Descrição"
        ));
    }
}
