//! Spreadsheet files as plain string grids.
//!
//! Everything is read as text so that files from different years never infer
//! different types for the same column.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use calamine::{open_workbook_auto, Data, Reader};
use tracing::debug;

use crate::error::{Error, Result};
use crate::normalize::Table;

/// The first worksheet of a file, addressed from A1.
#[derive(Debug, Clone)]
pub struct RawSheet {
    path: PathBuf,
    rows: Vec<Vec<String>>,
}

impl RawSheet {
    /// Read the first worksheet of `path` (xls, xlsx, ods, ...).
    pub fn open(path: &Path) -> Result<Self> {
        let mut workbook = open_workbook_auto(path)?;
        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| Error::EmptySheet {
                file: path.to_path_buf(),
                offset: 0,
            })??;

        // calamine ranges start at the first used cell; pad back to A1 so that
        // fixed header offsets count from the top of the sheet
        let (row0, col0) = range
            .start()
            .map(|(r, c)| (r as usize, c as usize))
            .unwrap_or((0, 0));
        let mut rows = vec![Vec::new(); row0];
        for row in range.rows() {
            let mut cells = vec![String::new(); col0];
            cells.extend(row.iter().map(cell_to_string));
            rows.push(cells);
        }
        debug!(file = %path.display(), rows = rows.len(), "read sheet");

        Ok(Self {
            path: path.to_path_buf(),
            rows,
        })
    }

    /// A sheet built from already-extracted cells.
    pub fn from_rows(path: impl Into<PathBuf>, rows: Vec<Vec<String>>) -> Self {
        Self {
            path: path.into(),
            rows,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Base name of the source file, stamped on every normalized row.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Header at row `offset`, every non-blank row below it as data.
    ///
    /// Blank header cells become `Unnamed: <i>`, repeated labels get `.1`, `.2`
    /// suffixes and every row is padded to the widest row.
    pub fn parse_rows(&self, offset: usize) -> Result<Table> {
        let header = self.rows.get(offset).ok_or_else(|| Error::EmptySheet {
            file: self.path.clone(),
            offset,
        })?;

        let body: Vec<&Vec<String>> = self.rows[offset + 1..]
            .iter()
            .filter(|r| r.iter().any(|c| !c.trim().is_empty()))
            .collect();

        let width = body
            .iter()
            .map(|r| r.len())
            .chain(std::iter::once(header.len()))
            .max()
            .unwrap_or(0);

        let columns = header_labels(header, width);
        let rows = body
            .into_iter()
            .map(|r| {
                let mut cells = r.clone();
                cells.resize(width, String::new());
                cells
            })
            .collect();

        Ok(Table::new(columns, rows))
    }
}

fn header_labels(header: &[String], width: usize) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    (0..width)
        .map(|i| {
            let raw = header.get(i).map(|s| s.trim()).unwrap_or("");
            let label = if raw.is_empty() {
                format!("Unnamed: {}", i)
            } else {
                raw.to_string()
            };
            let n = seen.entry(label.clone()).or_insert(0);
            let out = if *n == 0 {
                label
            } else {
                format!("{}.{}", label, n)
            };
            *n += 1;
            out
        })
        .collect()
}

/// Text rendering of one cell. Empty cells are empty strings; numbers use their
/// shortest round-trip form (`100`, `12.5`).
pub fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Float(f) => f.to_string(),
        Data::Int(i) => i.to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::FileOptions;
    use zip::CompressionMethod;

    fn grid(rows: &[&[&str]]) -> Vec<Vec<String>> {
        rows.iter()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect()
    }

    #[test]
    fn header_and_body_below_offset() {
        let sheet = RawSheet::from_rows(
            "2501.xls",
            grid(&[
                &["PREFEITURA DE JUIZ DE FORA"],
                &["A", "B"],
                &["1", "2"],
                &["3", "4"],
            ]),
        );
        let t = sheet.parse_rows(1).unwrap();
        assert_eq!(t.columns, ["A", "B"]);
        assert_eq!(t.rows, grid(&[&["1", "2"], &["3", "4"]]));
    }

    #[test]
    fn blank_and_repeated_labels() {
        let sheet = RawSheet::from_rows("x.xls", grid(&[&["Total", "", "Total", " "]]));
        let t = sheet.parse_rows(0).unwrap();
        assert_eq!(t.columns, ["Total", "Unnamed: 1", "Total.1", "Unnamed: 3"]);
        assert!(t.rows.is_empty());
    }

    #[test]
    fn ragged_rows_are_padded_and_blank_rows_dropped() {
        let sheet = RawSheet::from_rows(
            "x.xls",
            grid(&[&["A"], &["1", "2", "3"], &["", "  "], &["4"]]),
        );
        let t = sheet.parse_rows(0).unwrap();
        assert_eq!(t.columns, ["A", "Unnamed: 1", "Unnamed: 2"]);
        assert_eq!(t.rows, grid(&[&["1", "2", "3"], &["4", "", ""]]));
    }

    #[test]
    fn offset_past_end_is_an_error() {
        let sheet = RawSheet::from_rows("x.xls", grid(&[&["A"]]));
        assert!(matches!(
            sheet.parse_rows(5),
            Err(Error::EmptySheet { offset: 5, .. })
        ));
    }

    #[test]
    fn cell_rendering() {
        assert_eq!(cell_to_string(&Data::Float(100.0)), "100");
        assert_eq!(cell_to_string(&Data::Float(12.5)), "12.5");
        assert_eq!(cell_to_string(&Data::Int(7)), "7");
        assert_eq!(cell_to_string(&Data::Empty), "");
        assert_eq!(cell_to_string(&Data::String("3.1.1".into())), "3.1.1");
    }

    /// Minimal xlsx package holding one worksheet with `sheet_data` as its
    /// `<sheetData>` body.
    fn write_xlsx(path: &Path, sheet_data: &str) -> anyhow::Result<()> {
        let parts = [
            (
                "[Content_Types].xml",
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
<Default Extension="xml" ContentType="application/xml"/>
<Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>
<Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>
</Types>"#
                    .to_string(),
            ),
            (
                "_rels/.rels",
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/>
</Relationships>"#
                    .to_string(),
            ),
            (
                "xl/workbook.xml",
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
<sheets><sheet name="Plan1" sheetId="1" r:id="rId1"/></sheets>
</workbook>"#
                    .to_string(),
            ),
            (
                "xl/_rels/workbook.xml.rels",
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/>
</Relationships>"#
                    .to_string(),
            ),
            (
                "xl/worksheets/sheet1.xml",
                format!(
                    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>{}</sheetData></worksheet>"#,
                    sheet_data
                ),
            ),
        ];

        let mut zip = zip::ZipWriter::new(std::fs::File::create(path)?);
        for (name, body) in parts {
            let options: FileOptions<'_, ()> =
                FileOptions::default().compression_method(CompressionMethod::Stored);
            zip.start_file(name, options)?;
            zip.write_all(body.as_bytes())?;
        }
        zip.finish()?;
        Ok(())
    }

    fn text(cell: &str, value: &str) -> String {
        format!(r#"<c r="{}" t="inlineStr"><is><t>{}</t></is></c>"#, cell, value)
    }

    #[test]
    fn open_pads_back_to_a1() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("2504.xlsx");
        // used range starts at B2
        let sheet_data = format!(
            r#"<row r="2">{}{}</row><row r="3">{}{}<c r="D3"><v>100</v></c></row>"#,
            text("B2", "RECEITA TOTAL"),
            text("D2", "PREVISÃO INICIAL"),
            text("B3", "3.1.1"),
            text("C3", "Imposto"),
        );
        write_xlsx(&path, &sheet_data)?;

        let sheet = RawSheet::open(&path)?;
        assert_eq!(sheet.file_name(), "2504.xlsx");
        assert_eq!(
            sheet.rows(),
            grid(&[
                &[],
                &["", "RECEITA TOTAL", "", "PREVISÃO INICIAL"],
                &["", "3.1.1", "Imposto", "100"],
            ])
        );

        let t = sheet.parse_rows(1)?;
        assert_eq!(
            t.columns,
            ["Unnamed: 0", "RECEITA TOTAL", "Unnamed: 2", "PREVISÃO INICIAL"]
        );
        assert_eq!(t.rows, grid(&[&["", "3.1.1", "Imposto", "100"]]));
        Ok(())
    }

    #[test]
    fn garbage_file_is_a_spreadsheet_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("2501.xls");
        std::fs::write(&path, b"<html>not found</html>").unwrap();
        assert!(RawSheet::open(&path).is_err());
    }
}
