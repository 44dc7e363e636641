//! Structural cleaning of the rows below the header.

use calamine::Data;

use crate::error::SheetError;
use super::types::CleanGrid;
use super::utils::{contains_any, distinct_count, fill_ratio, is_blank, row_text, row_values};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PruneThresholds {
    pub min_row_fill: f64,
    pub min_column_fill: f64,
}

pub const STRICT_THRESHOLDS: PruneThresholds = PruneThresholds {
    min_row_fill: 0.2,
    min_column_fill: 0.1,
};

pub const RELAXED_THRESHOLDS: PruneThresholds = PruneThresholds {
    min_row_fill: 0.1,
    min_column_fill: 0.05,
};

const QUESTION_PHRASES: &[&str] = &[
    "does the", "is the", "has the", "how many", "what is", "when", "where", "who",
];

/// Replaces null tokens and whitespace-only text with empty cells, then cuts
/// or pads every row (and the header) to the last column that carries either a
/// header label or a value.
pub fn normalize_nulls(headers: &mut Vec<String>, rows: &mut [Vec<Data>]) {
    for row in rows.iter_mut() {
        for cell in row.iter_mut() {
            if is_blank(cell) {
                *cell = Data::Empty;
            }
        }
    }

    let header_width = headers
        .iter()
        .rposition(|label| !label.trim().is_empty())
        .map_or(0, |idx| idx + 1);
    let width = rows
        .iter()
        .filter_map(|row| row.iter().rposition(|cell| !matches!(cell, Data::Empty)))
        .map(|idx| idx + 1)
        .fold(header_width, usize::max);

    headers.resize(width, String::new());
    for row in rows.iter_mut() {
        row.resize(width, Data::Empty);
    }
}

/// Propagates values into empty cells, first left to right along each row,
/// then top to bottom down each column.
pub fn forward_fill(rows: &mut [Vec<Data>]) {
    for row in rows.iter_mut() {
        let mut last: Option<Data> = None;
        for cell in row.iter_mut() {
            if matches!(cell, Data::Empty) {
                if let Some(value) = &last {
                    *cell = value.clone();
                }
            } else {
                last = Some(cell.clone());
            }
        }
    }

    let width = rows.iter().map(Vec::len).max().unwrap_or(0);
    for col in 0..width {
        let mut last: Option<Data> = None;
        for row in rows.iter_mut() {
            let Some(cell) = row.get_mut(col) else { continue };
            if matches!(cell, Data::Empty) {
                if let Some(value) = &last {
                    *cell = value.clone();
                }
            } else {
                last = Some(cell.clone());
            }
        }
    }
}

fn filled_in_row(row: &[Data]) -> usize {
    row.iter().filter(|c| !matches!(c, Data::Empty)).count()
}

fn filled_in_column(rows: &[Vec<Data>], col: usize) -> usize {
    rows.iter()
        .filter(|row| row.get(col).map_or(false, |c| !matches!(c, Data::Empty)))
        .count()
}

fn retain_columns(grid: &mut CleanGrid, keep: impl Fn(usize) -> bool) {
    let kept: Vec<usize> = (0..grid.width()).filter(|&col| keep(col)).collect();
    grid.headers = kept.iter().map(|&col| grid.headers[col].clone()).collect();
    for row in grid.rows.iter_mut() {
        *row = kept
            .iter()
            .map(|&col| row.get(col).cloned().unwrap_or(Data::Empty))
            .collect();
    }
}

/// Drops rows, then columns, that hold no value at all.
pub fn drop_empty(grid: &mut CleanGrid) {
    grid.rows.retain(|row| filled_in_row(row) > 0);
    let rows = &grid.rows;
    let counts: Vec<usize> = (0..grid.width()).map(|col| filled_in_column(rows, col)).collect();
    retain_columns(grid, |col| counts[col] > 0);
}

/// Removes empty rows/columns, then sparse rows and sparse columns.
pub fn prune(mut grid: CleanGrid, thresholds: PruneThresholds) -> CleanGrid {
    drop_empty(&mut grid);

    let width = grid.width();
    grid.rows
        .retain(|row| fill_ratio(filled_in_row(row), width) >= thresholds.min_row_fill);

    let height = grid.rows.len();
    let rows = &grid.rows;
    let counts: Vec<usize> = (0..grid.width()).map(|col| filled_in_column(rows, col)).collect();
    retain_columns(&mut grid, |col| fill_ratio(counts[col], height) >= thresholds.min_column_fill);

    // Column pruning can leave a row whose only values sat in dropped columns.
    drop_empty(&mut grid);
    grid
}

/// Skips a leading row that repeats one label across merged cells.
fn repeated_label_anchor(rows: &[Vec<Data>]) -> Option<usize> {
    let first = row_values(rows.first()?);
    if first.len() <= 5 || distinct_count(&first) > 3 {
        return None;
    }
    (1..rows.len().min(5)).find(|&i| {
        let values = row_values(&rows[i]);
        let distinct = distinct_count(&values);
        distinct > 3 && distinct as f64 >= values.len() as f64 * 0.3
    })
}

/// Skips assessment banner rows down to the first row that reads like a question.
/// `banner_text` is the text of the first row as it stood before any re-anchoring.
fn assessment_anchor(banner_text: &str, rows: &[Vec<Data>]) -> Option<usize> {
    if !banner_text.contains("assessment criteria") && !banner_text.contains("annexure") {
        return None;
    }
    (1..rows.len().min(10))
        .find(|&i| contains_any(&row_text(&row_values(&rows[i])), QUESTION_PHRASES))
}

/// Both checks read the first row of the grid as it was on entry.
pub fn reanchor(grid: &mut CleanGrid) {
    let banner_text = grid
        .rows
        .first()
        .map(|row| row_text(&row_values(row)))
        .unwrap_or_default();

    if let Some(start) = repeated_label_anchor(&grid.rows) {
        tracing::debug!("Re-anchoring past repeated-label row, data now starts at row {}", start);
        grid.rows.drain(..start);
    }
    if let Some(start) = assessment_anchor(&banner_text, &grid.rows) {
        tracing::debug!("Re-anchoring to first assessment question at row {}", start);
        grid.rows.drain(..start);
    }
    drop_empty(grid);
}

/// Full cleaning pass over the rows that follow the header row.
pub fn clean(sheet: &str, mut headers: Vec<String>, mut rows: Vec<Vec<Data>>) -> Result<CleanGrid, SheetError> {
    normalize_nulls(&mut headers, &mut rows);
    let unfilled = CleanGrid { headers: headers.clone(), rows: rows.clone() };
    forward_fill(&mut rows);

    let mut grid = prune(CleanGrid { headers, rows }, STRICT_THRESHOLDS);
    if grid.rows.is_empty() {
        tracing::warn!("Sheet {} is empty under strict pruning, retrying with relaxed thresholds", sheet);
        grid = prune(unfilled, RELAXED_THRESHOLDS);
    }
    if grid.rows.is_empty() || grid.headers.is_empty() {
        return Err(SheetError::EmptySheet { sheet: sheet.to_string() });
    }

    reanchor(&mut grid);
    tracing::debug!(
        "Cleaned sheet {}: {} rows x {} columns",
        sheet,
        grid.rows.len(),
        grid.width()
    );
    Ok(grid)
}
