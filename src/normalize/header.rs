use crate::error::{Error, Result};
use crate::sheet::RawSheet;

/// Where a layout's header row sits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderRule {
    /// First row whose column 0 equals this label (after trimming).
    Sentinel(&'static str),
    /// A fixed number of rows skipped from the top of the sheet.
    Fixed(usize),
}

/// Row index of the header, or `None` when a sentinel never appears.
pub fn locate_header(sheet: &RawSheet, rule: HeaderRule) -> Option<usize> {
    match rule {
        HeaderRule::Fixed(offset) => Some(offset),
        HeaderRule::Sentinel(label) => sheet
            .rows()
            .iter()
            .position(|row| row.first().map(|c| c.trim()) == Some(label)),
    }
}

/// Like [`locate_header`], with a missing sentinel reported as
/// [`Error::HeaderNotFound`].
pub fn header_offset(sheet: &RawSheet, rule: HeaderRule) -> Result<usize> {
    locate_header(sheet, rule).ok_or_else(|| Error::HeaderNotFound {
        file: sheet.path().to_path_buf(),
        sentinel: match rule {
            HeaderRule::Sentinel(label) => label.to_string(),
            HeaderRule::Fixed(_) => String::new(),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sheet(first_cells: &[&str]) -> RawSheet {
        RawSheet::from_rows(
            "2501.xls",
            first_cells
                .iter()
                .map(|c| vec![c.to_string(), "x".to_string()])
                .collect(),
        )
    }

    #[test]
    fn finds_sentinel_row() {
        let s = sheet(&["Despesa Mensal", "", " Unidade Administrativa ", "SMS"]);
        let rule = HeaderRule::Sentinel("Unidade Administrativa");
        assert_eq!(locate_header(&s, rule), Some(2));
        assert_eq!(header_offset(&s, rule).unwrap(), 2);
    }

    #[test]
    fn sentinel_must_be_the_whole_first_cell() {
        let s = sheet(&["Unidade Administrativa (total)", "Unidade"]);
        assert_eq!(
            locate_header(&s, HeaderRule::Sentinel("Unidade Administrativa")),
            None
        );
    }

    #[test]
    fn missing_sentinel_is_an_error_not_row_zero() {
        let s = sheet(&["a", "b"]);
        match header_offset(&s, HeaderRule::Sentinel("Unidade Administrativa")) {
            Err(Error::HeaderNotFound { sentinel, file }) => {
                assert_eq!(sentinel, "Unidade Administrativa");
                assert!(file.ends_with("2501.xls"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn fixed_offsets_need_no_scan() {
        let s = sheet(&[]);
        assert_eq!(locate_header(&s, HeaderRule::Fixed(5)), Some(5));
    }
}
