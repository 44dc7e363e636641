use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use calamine::{open_workbook_auto, Data, Reader, Sheets};
use rust_xlsxwriter::{utility::column_number_to_name, Workbook};

use crate::error::SheetError;
use super::types::{RawGrid, SheetContents};
use super::utils::is_blank;

/// Sheet name used for regenerated and newly created workbooks.
pub const DEFAULT_SHEET: &str = "Sheet1";

/// Column count of the blank workbook written during recovery.
pub const BLANK_WORKBOOK_COLUMNS: u16 = 10;

/// An opened workbook. Only cached cell values are read; formulas are never evaluated.
pub struct WorkbookLoader {
    path: PathBuf,
    workbook: Sheets<BufReader<File>>,
    sheet_names: Vec<String>,
}

impl WorkbookLoader {
    pub fn open(path: &Path) -> Result<Self, SheetError> {
        let workbook_start = std::time::Instant::now();
        let workbook: Sheets<_> = open_workbook_auto(path).map_err(|e| {
            tracing::error!("Failed to open workbook {}: {}", path.display(), e);
            SheetError::corrupt(path, e)
        })?;

        let sheet_names = workbook.sheet_names().to_vec();
        if sheet_names.is_empty() {
            return Err(SheetError::corrupt(path, "workbook contains no sheets"));
        }
        tracing::info!(
            "Opened {} in {:?}, {} sheets: {:?}",
            path.display(),
            workbook_start.elapsed(),
            sheet_names.len(),
            sheet_names
        );

        Ok(Self {
            path: path.to_path_buf(),
            workbook,
            sheet_names,
        })
    }

    pub fn sheet_names(&self) -> &[String] {
        &self.sheet_names
    }

    pub fn check_sheet(&self, requested: &str) -> Result<(), SheetError> {
        if self.sheet_names.iter().any(|name| name == requested) {
            Ok(())
        } else {
            Err(SheetError::UnsupportedSheetSelection {
                requested: requested.to_string(),
                available: self.sheet_names.clone(),
            })
        }
    }

    /// The requested sheet when present, otherwise the first sheet.
    pub fn resolve_sheet(&self, requested: Option<&str>) -> String {
        let first = self.sheet_names[0].clone();
        match requested.filter(|name| !name.is_empty()) {
            None => first,
            Some(name) => match self.check_sheet(name) {
                Ok(()) => name.to_string(),
                Err(e) => {
                    tracing::warn!("{}; falling back to '{}'", e, first);
                    first
                }
            },
        }
    }

    /// Rows of `sheet`, with every row that has no non-blank cell removed.
    pub fn raw_grid(&mut self, sheet: &str) -> Result<RawGrid, SheetError> {
        self.check_sheet(sheet)?;
        let range = self.workbook.worksheet_range(sheet).map_err(|e| {
            tracing::error!("Failed to read worksheet {}: {}", sheet, e);
            SheetError::corrupt(&self.path, e)
        })?;

        let rows: Vec<Vec<Data>> = range
            .rows()
            .filter(|row| row.iter().any(|cell| !is_blank(cell)))
            .map(|row| row.to_vec())
            .collect();
        tracing::debug!("Sheet {} has {} non-blank rows", sheet, rows.len());

        Ok(RawGrid::new(sheet, rows))
    }

    /// Cached values and formulas of `sheet` at their absolute positions.
    /// Used when the workbook is rewritten, so blank rows are kept in place.
    pub fn sheet_contents(&mut self, sheet: &str) -> Result<SheetContents, SheetError> {
        self.check_sheet(sheet)?;
        let range = self.workbook.worksheet_range(sheet).map_err(|e| {
            tracing::error!("Failed to read worksheet {}: {}", sheet, e);
            SheetError::corrupt(&self.path, e)
        })?;
        let (top, left) = range.start().unwrap_or((0, 0));
        let values = range
            .used_cells()
            .map(|(row, col, cell)| (top + row as u32, left + col as u32, cell.clone()))
            .collect();

        let formulas = match self.workbook.worksheet_formula(sheet) {
            Ok(range) => {
                let (top, left) = range.start().unwrap_or((0, 0));
                range
                    .used_cells()
                    .filter(|(_, _, formula)| !formula.is_empty())
                    .map(|(row, col, formula)| (top + row as u32, left + col as u32, formula.clone()))
                    .collect()
            }
            Err(e) => {
                tracing::warn!("Formulas of {} unavailable, keeping cached values: {}", sheet, e);
                Vec::new()
            }
        };

        Ok(SheetContents {
            name: sheet.to_string(),
            values,
            formulas,
        })
    }
}

/// Writes a single-sheet workbook whose first row holds the column letters
/// `A..` and whose first column numbers the following `rows` rows.
pub fn write_blank_workbook(path: &Path, rows: u32, cols: u16) -> Result<(), SheetError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(DEFAULT_SHEET)?;

    for col in 0..cols {
        worksheet.write_string(0, col, column_number_to_name(col))?;
    }
    for row in 1..=rows {
        worksheet.write_number(row, 0, f64::from(row))?;
    }

    workbook.save(path)?;
    tracing::info!("Wrote blank {}x{} workbook to {}", rows, cols, path.display());
    Ok(())
}

pub fn blank_column_names(cols: u16) -> Vec<String> {
    (0..cols).map(column_number_to_name).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_rows_are_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gaps.xlsx");

        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.set_name("Stock").unwrap();
        sheet.write_string(0, 0, "Item").unwrap();
        sheet.write_string(0, 1, "Qty").unwrap();
        sheet.write_string(2, 0, "   ").unwrap();
        sheet.write_string(4, 0, "Desk").unwrap();
        sheet.write_number(4, 1, 3).unwrap();
        workbook.save(&path).unwrap();

        let mut loader = WorkbookLoader::open(&path).unwrap();
        assert_eq!(loader.sheet_names().to_vec(), vec!["Stock".to_string()]);
        let grid = loader.raw_grid("Stock").unwrap();
        assert_eq!(grid.rows.len(), 2);
        assert_eq!(grid.rows[1][0], Data::String("Desk".to_string()));
        assert_eq!(grid.rows[1][1], Data::Float(3.0));
    }

    #[test]
    fn test_corrupt_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.xlsx");
        std::fs::write(&path, b"definitely not a zip archive").unwrap();

        let err = WorkbookLoader::open(&path).err().unwrap();
        assert!(matches!(err, SheetError::CorruptWorkbook { .. }));
    }

    #[test]
    fn test_sheet_selection_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blank.xlsx");
        write_blank_workbook(&path, 0, BLANK_WORKBOOK_COLUMNS).unwrap();

        let mut loader = WorkbookLoader::open(&path).unwrap();
        assert_eq!(loader.resolve_sheet(Some("Missing")), DEFAULT_SHEET);
        assert_eq!(loader.resolve_sheet(None), DEFAULT_SHEET);
        assert!(matches!(
            loader.check_sheet("Missing"),
            Err(SheetError::UnsupportedSheetSelection { .. })
        ));

        let grid = loader.raw_grid(DEFAULT_SHEET).unwrap();
        assert_eq!(grid.rows.len(), 1);
        assert_eq!(grid.width(), 10);
        assert_eq!(grid.rows[0][9], Data::String("J".to_string()));
    }

    #[test]
    fn test_sheet_contents_keep_positions_and_formulas() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sums.xlsx");

        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.write_string(1, 1, "Qty").unwrap();
        sheet.write_number(2, 1, 4).unwrap();
        sheet.write_number(3, 1, 6).unwrap();
        sheet.write_formula(4, 1, "=SUM(B3:B4)").unwrap();
        workbook.save(&path).unwrap();

        let mut loader = WorkbookLoader::open(&path).unwrap();
        let contents = loader.sheet_contents(DEFAULT_SHEET).unwrap();
        assert_eq!(contents.name, DEFAULT_SHEET);
        assert!(contents
            .values
            .contains(&(1, 1, Data::String("Qty".to_string()))));
        assert!(contents.values.contains(&(3, 1, Data::Float(6.0))));
        assert_eq!(contents.formulas.len(), 1);
        assert_eq!(contents.formulas[0].0, 4);
        assert_eq!(contents.formulas[0].1, 1);
        assert!(contents.formulas[0].2.contains("SUM(B3:B4)"));
    }

    #[test]
    fn test_blank_workbook_with_numbered_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("new.xlsx");
        write_blank_workbook(&path, 3, 4).unwrap();

        let mut loader = WorkbookLoader::open(&path).unwrap();
        let grid = loader.raw_grid(DEFAULT_SHEET).unwrap();
        assert_eq!(grid.rows.len(), 4);
        assert_eq!(grid.rows[3][0], Data::Float(3.0));
        assert_eq!(blank_column_names(4), vec!["A", "B", "C", "D"]);
    }
}
