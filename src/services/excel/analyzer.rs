use std::path::Path;

use crate::error::SheetError;
use super::cleaner::clean;
use super::header::detect_header_row;
use super::inference::infer_columns;
use super::loader::WorkbookLoader;
use super::normalize::{cell_to_string, normalize_columns};
use super::types::{CleanedTable, RawGrid, SheetAnalysis};

/// Runs header detection, cleaning, naming and normalization over one sheet.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExcelAnalyzer {
    /// Caps the number of data rows read below the header; `None` reads all.
    row_limit: Option<usize>,
}

impl ExcelAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_row_limit(row_limit: usize) -> Self {
        Self {
            row_limit: Some(row_limit),
        }
    }

    /// Returns the detected header row and the cleaned table.
    pub fn analyze_grid(&self, grid: &RawGrid) -> Result<(usize, CleanedTable), SheetError> {
        let (header_row, rule) = detect_header_row(&grid.rows);
        tracing::info!("Sheet {}: header row {} ({:?})", grid.sheet, header_row, rule);

        let headers: Vec<String> = grid
            .rows
            .get(header_row)
            .map(|row| row.iter().map(|cell| cell_to_string(cell).trim().to_string()).collect())
            .unwrap_or_default();

        let data = grid
            .rows
            .iter()
            .skip(header_row + 1)
            .take(self.row_limit.unwrap_or(usize::MAX))
            .cloned()
            .collect();

        let cleaned = clean(&grid.sheet, headers, data)?;
        let columns = infer_columns(&cleaned);
        let (dtypes, rows) = normalize_columns(&cleaned);

        Ok((header_row, CleanedTable { columns, dtypes, rows }))
    }

    /// Opens the workbook at `path` and analyses the requested (or first) sheet.
    pub fn analyze_file(&self, path: &Path, sheet: Option<&str>) -> Result<SheetAnalysis, SheetError> {
        let mut loader = WorkbookLoader::open(path)?;
        self.analyze_sheet(&mut loader, sheet)
    }

    pub fn analyze_sheet(
        &self,
        loader: &mut WorkbookLoader,
        sheet: Option<&str>,
    ) -> Result<SheetAnalysis, SheetError> {
        let start = std::time::Instant::now();
        let sheet = loader.resolve_sheet(sheet);
        let grid = loader.raw_grid(&sheet)?;

        let (header_row, table) = self.analyze_grid(&grid)?;
        tracing::info!(
            "Analysis of sheet {} completed in {:?}: {} rows, {} columns",
            sheet,
            start.elapsed(),
            table.rows.len(),
            table.columns.len()
        );

        Ok(SheetAnalysis {
            sheet_names: loader.sheet_names().to_vec(),
            sheet,
            header_row,
            table,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use calamine::Data;

    fn s(v: &str) -> Data {
        Data::String(v.to_string())
    }

    fn n(v: f64) -> Data {
        Data::Float(v)
    }

    #[test]
    fn test_repeated_label_banner_is_skipped() {
        let grid = RawGrid::new(
            "Inventory",
            vec![
                vec![s("Form"), s("Form"), s("Form"), s("Form"), s("Form"), s("Form")],
                vec![s("S/N"), s("Description"), s("Qty"), s("Price")],
                vec![n(1.0), s("Laptop"), n(2.0), n(1500.0)],
                vec![n(2.0), s("Mouse"), n(5.0), n(20.0)],
            ],
        );
        let (header_row, table) = ExcelAnalyzer::new().analyze_grid(&grid).unwrap();
        assert_eq!(header_row, 1);
        assert_eq!(table.column_names(), vec!["S/N", "Description", "Qty", "Price"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0], vec!["1", "Laptop", "2", "1500"]);
        assert_eq!(table.dtypes, vec!["numeric", "string", "numeric", "numeric"]);
    }

    #[test]
    fn test_placeholder_header_inferred_from_content() {
        let brands = ["HP", "Dell", "Lenovo", "Dell", "Asus"];
        let mut rows = vec![vec![s("Item"), s("Qty"), s("Unnamed: 2")]];
        rows.extend(brands.iter().map(|b| vec![s("Chair"), n(1.0), s(b)]));

        let (header_row, table) = ExcelAnalyzer::new()
            .analyze_grid(&RawGrid::new("Assets", rows))
            .unwrap();
        assert_eq!(header_row, 0);
        assert_eq!(table.column_names(), vec!["Item", "Qty", "Manufacturer"]);
        assert_eq!(table.columns[2].raw_header, "Unnamed: 2");
        assert_eq!(table.columns[2].samples.len(), 5);
    }

    #[test]
    fn test_row_limit_caps_data_rows() {
        let mut rows = vec![vec![s("Item"), s("Qty"), s("Price")]];
        rows.extend((0..50).map(|i| vec![s("Desk"), n(i as f64), n(10.0)]));
        let grid = RawGrid::new("Big", rows);

        let (_, table) = ExcelAnalyzer::with_row_limit(20).analyze_grid(&grid).unwrap();
        assert_eq!(table.rows.len(), 20);
        let (_, table) = ExcelAnalyzer::new().analyze_grid(&grid).unwrap();
        assert_eq!(table.rows.len(), 50);
    }

    #[test]
    fn test_header_only_sheet_is_empty() {
        let grid = RawGrid::new("Head", vec![vec![s("Item"), s("Qty"), s("Price")]]);
        let err = ExcelAnalyzer::new().analyze_grid(&grid).unwrap_err();
        assert!(matches!(err, SheetError::EmptySheet { .. }));
    }

    #[test]
    fn test_large_sheet_is_processed_in_full() {
        let mut rows = vec![vec![s("Device"), s("Serial"), s("Location"), s("Value")]];
        rows.extend((0..20_000).map(|i| {
            vec![s("Laptop"), s(&format!("SN-{:05}", i)), s("Office 4"), n(i as f64 * 1.5)]
        }));
        let (_, table) = ExcelAnalyzer::new()
            .analyze_grid(&RawGrid::new("Large", rows))
            .unwrap();
        assert_eq!(table.rows.len(), 20_000);
        assert_eq!(table.rows[19_999][1], "SN-19999");
    }

    #[test]
    fn test_no_empty_rows_or_columns() {
        let grid = RawGrid::new(
            "Messy",
            vec![
                vec![s("Inventory list"), Data::Empty, Data::Empty, Data::Empty],
                vec![s("Item"), s("Code"), Data::Empty, s("Price")],
                vec![s("Desk"), s("nan"), Data::Empty, n(10.0)],
                vec![Data::Empty, Data::Empty, Data::Empty, Data::Empty],
                vec![s("Lamp"), s("L-1"), Data::Empty, s("NULL")],
            ],
        );
        let (header_row, table) = ExcelAnalyzer::new().analyze_grid(&grid).unwrap();
        assert_eq!(header_row, 1);
        for row in &table.rows {
            assert!(row.iter().any(|v| !v.is_empty()));
        }
        for col in 0..table.columns.len() {
            assert!(table.rows.iter().any(|row| !row[col].is_empty()));
        }
    }
}
