//! Orchestration boundary between the HTTP layer and the workbook pipeline.
//!
//! Upload-time analysis never fails outward: any pipeline error becomes a
//! degraded descriptor. Viewing gets one recovery attempt for unreadable
//! files. Searching reports failures as errors, never as partial results.
//! Saving rewrites the workbook with the edited cells and re-analyses it.

use std::path::{Path, PathBuf};

use crate::error::{AppError, SheetError};
use crate::models::{SearchResponse, TableDescriptor, ViewResponse};
use crate::services::excel::header::detect_header_row;
use crate::services::excel::loader::{write_blank_workbook, BLANK_WORKBOOK_COLUMNS};
use crate::services::excel::render::render_table;
use crate::services::excel::search::search_table;
use crate::services::excel::types::{CleanedTable, RawGrid};
use crate::services::excel::writer::{write_workbook, CellEdit, SheetCells};
use crate::services::excel::{ExcelAnalyzer, WorkbookLoader};

const SUPPORTED_EXTENSIONS: [&str; 2] = ["xlsx", "xls"];

pub const MAX_CREATE_ROWS: u32 = 1000;
pub const MAX_CREATE_COLUMNS: u16 = 100;

/// Maps a stored file name onto a path inside `upload_dir`.
pub fn resolve_upload_path(upload_dir: &Path, file: &str) -> Result<PathBuf, AppError> {
    let file = file.trim();
    if file.is_empty() {
        return Err(AppError::InvalidInput("No file provided".to_string()));
    }
    if file.contains('/') || file.contains('\\') || file.contains("..") {
        return Err(AppError::InvalidInput(format!("Invalid file name: {}", file)));
    }

    let extension = Path::new(file)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase())
        .unwrap_or_default();
    if !SUPPORTED_EXTENSIONS.contains(&extension.as_str()) {
        tracing::error!("Unsupported file type: {}", file);
        return Err(AppError::InvalidInput(
            "Only .xlsx and .xls files are supported".to_string(),
        ));
    }

    Ok(upload_dir.join(file))
}

/// Checks the file exists and is not larger than `max_file_size` bytes.
pub fn check_file(path: &Path, max_file_size: u64) -> Result<(), AppError> {
    let metadata = std::fs::metadata(path).map_err(|_| {
        AppError::NotFound(format!(
            "Spreadsheet file {} not found. The file may have been moved or deleted.",
            path.display()
        ))
    })?;
    if metadata.len() > max_file_size {
        return Err(AppError::InvalidInput(format!(
            "File is {}KB, the limit is {}KB",
            metadata.len() / 1024,
            max_file_size / 1024
        )));
    }
    Ok(())
}

/// Ingestion-time analysis of the first sheet, capped at `row_limit` data rows.
pub fn analyze_workbook(path: &Path, row_limit: usize) -> TableDescriptor {
    let start = std::time::Instant::now();
    match ExcelAnalyzer::with_row_limit(row_limit).analyze_file(path, None) {
        Ok(analysis) => {
            let descriptor = TableDescriptor::from_analysis(&analysis);
            tracing::info!(
                "Analyzed {} in {:?}: header row {}, {} rows, {} columns",
                path.display(),
                start.elapsed(),
                descriptor.header_row,
                descriptor.total_rows,
                descriptor.columns.len()
            );
            descriptor
        }
        Err(e) => {
            tracing::error!("Error analyzing {}: {}", path.display(), e);
            TableDescriptor::degraded()
        }
    }
}

/// Opens the workbook and reads the requested (or first) sheet.
fn read_sheet(path: &Path, sheet: Option<&str>) -> Result<(Vec<String>, RawGrid), SheetError> {
    let mut loader = WorkbookLoader::open(path)?;
    let current_sheet = loader.resolve_sheet(sheet);
    let grid = loader.raw_grid(&current_sheet)?;
    Ok((loader.sheet_names().to_vec(), grid))
}

/// Reads the sheet; a workbook that fails to open or to yield the sheet is
/// replaced by a blank workbook and read once more. The flag reports whether
/// that happened.
fn read_sheet_with_recovery(
    path: &Path,
    sheet: Option<&str>,
) -> Result<(Vec<String>, RawGrid, bool), SheetError> {
    match read_sheet(path, sheet) {
        Ok((sheet_names, grid)) => Ok((sheet_names, grid, false)),
        Err(SheetError::CorruptWorkbook { reason, .. }) => {
            tracing::warn!(
                "Workbook {} appears to be corrupted ({}), attempting to recreate",
                path.display(),
                reason
            );
            write_blank_workbook(path, 0, BLANK_WORKBOOK_COLUMNS)?;
            let (sheet_names, grid) = read_sheet(path, sheet)?;
            tracing::info!("Workbook {} recreated", path.display());
            Ok((sheet_names, grid, true))
        }
        Err(e) => Err(e),
    }
}

/// Bounded render of one sheet, re-derived from the file on every call.
pub fn view_workbook(path: &Path, sheet: Option<&str>) -> Result<ViewResponse, SheetError> {
    let (available_sheets, grid, recovered) = read_sheet_with_recovery(path, sheet)?;

    let (header_row, table) = match ExcelAnalyzer::new().analyze_grid(&grid) {
        Ok(result) => result,
        Err(SheetError::EmptySheet { sheet }) => {
            tracing::info!("Sheet {} has no data to display", sheet);
            (detect_header_row(&grid.rows).0, CleanedTable::default())
        }
        Err(e) => return Err(e),
    };

    let rendered = render_table(&table);
    tracing::debug!(
        "Rendering {} of {} rows, {} of {} columns",
        rendered.displayed_rows,
        rendered.total_rows,
        rendered.displayed_columns,
        rendered.total_columns
    );

    Ok(ViewResponse {
        table: rendered,
        available_sheets,
        current_sheet: grid.sheet,
        header_row,
        recovered,
    })
}

/// Substring search over the cleaned table. An empty query returns an empty
/// result without opening the file.
pub fn search_workbook(
    path: &Path,
    query: &str,
    column: Option<&str>,
    sheet: Option<&str>,
) -> Result<SearchResponse, SheetError> {
    if query.is_empty() {
        return Ok(SearchResponse::empty());
    }

    let start = std::time::Instant::now();
    let (_, grid) = read_sheet(path, sheet)?;

    let table = match ExcelAnalyzer::new().analyze_grid(&grid) {
        Ok((_, table)) => table,
        Err(SheetError::EmptySheet { .. }) => CleanedTable::default(),
        Err(e) => return Err(e),
    };

    let hits = search_table(&table, query, column);
    tracing::info!(
        "Search for '{}' in {} [{}] matched {} rows in {:?}",
        query,
        path.display(),
        grid.sheet,
        hits.total,
        start.elapsed()
    );

    Ok(SearchResponse {
        data: hits.rows,
        total: hits.total,
        query: Some(query.to_string()),
        column: column.unwrap_or_default().to_string(),
        sheet: Some(grid.sheet),
    })
}

/// Overwrites the workbook with the minimal blank one and returns its descriptor.
pub fn recreate_workbook(path: &Path) -> Result<TableDescriptor, SheetError> {
    write_blank_workbook(path, 0, BLANK_WORKBOOK_COLUMNS)?;
    Ok(TableDescriptor::blank(BLANK_WORKBOOK_COLUMNS))
}

/// Writes a new blank workbook with numbered rows and analyses it.
pub fn create_workbook(
    path: &Path,
    rows: u32,
    cols: u16,
    row_limit: usize,
) -> Result<TableDescriptor, SheetError> {
    let rows = rows.min(MAX_CREATE_ROWS);
    let cols = cols.clamp(1, MAX_CREATE_COLUMNS);
    write_blank_workbook(path, rows, cols)?;

    if rows == 0 {
        return Ok(TableDescriptor::blank(cols));
    }
    Ok(analyze_workbook(path, row_limit))
}

/// Writes edited cell values into one sheet (the first unless named), keeps
/// the other sheets' values, and re-analyses the result. With `clear` the
/// edited sheet starts empty.
pub fn save_workbook(
    path: &Path,
    sheet: Option<&str>,
    edits: &[Vec<CellEdit>],
    clear: bool,
    row_limit: usize,
) -> Result<TableDescriptor, SheetError> {
    let sheets = {
        let mut loader = WorkbookLoader::open(path)?;
        let target = loader.resolve_sheet(sheet);
        let names = loader.sheet_names().to_vec();
        let mut sheets = Vec::with_capacity(names.len());
        for name in &names {
            let mut cells = SheetCells::from_contents(loader.sheet_contents(name)?);
            if *name == target {
                cells.apply_edits(edits, clear)?;
            }
            sheets.push(cells);
        }
        sheets
    };

    write_workbook(path, &sheets)?;
    tracing::info!(
        "Saved {} edited rows to {} (cleared: {})",
        edits.len(),
        path.display(),
        clear
    );
    Ok(analyze_workbook(path, row_limit))
}
