//! Value-level write-back of edited cells.
//!
//! rust_xlsxwriter cannot patch an existing file, so the whole workbook is
//! rebuilt from what calamine reads: cached values and formulas survive,
//! styles and other workbook features do not.

use std::collections::BTreeMap;
use std::path::Path;

use calamine::Data;
use rust_xlsxwriter::{Format, Workbook};
use serde::Deserialize;
use serde_json::Value;

use crate::error::SheetError;
use super::types::SheetContents;

const DATETIME_NUM_FORMAT: &str = "yyyy-mm-dd hh:mm:ss";

/// Largest row and column indices a worksheet accepts.
const MAX_ROW: usize = 1_048_575;
const MAX_COL: usize = 16_383;

/// One edited cell as sent by the grid editor.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CellEdit {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub value: Value,
    #[serde(default)]
    pub formula: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Number(f64),
    Bool(bool),
    DateTime(f64),
    Formula(String),
}

impl CellValue {
    fn from_data(cell: &Data) -> Option<Self> {
        match cell {
            Data::Empty => None,
            Data::String(s) => Some(CellValue::Text(s.clone())),
            Data::Int(i) => Some(CellValue::Number(*i as f64)),
            Data::Float(f) => Some(CellValue::Number(*f)),
            Data::Bool(b) => Some(CellValue::Bool(*b)),
            Data::DateTime(dt) => Some(CellValue::DateTime(dt.as_f64())),
            Data::DateTimeIso(s) | Data::DurationIso(s) => Some(CellValue::Text(s.clone())),
            Data::Error(e) => Some(CellValue::Text(e.to_string())),
        }
    }

    /// `None` clears the cell.
    fn from_edit(edit: &CellEdit) -> Option<Self> {
        if edit.kind == "formula" {
            return (!edit.formula.is_empty()).then(|| CellValue::Formula(edit.formula.clone()));
        }
        match &edit.value {
            Value::Null => None,
            Value::String(s) if s.is_empty() => None,
            Value::String(s) => Some(CellValue::Text(s.clone())),
            Value::Bool(b) => Some(CellValue::Bool(*b)),
            Value::Number(n) => n.as_f64().map(CellValue::Number),
            other => Some(CellValue::Text(other.to_string())),
        }
    }
}

/// Cells of one sheet keyed by (row, column).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SheetCells {
    pub name: String,
    pub cells: BTreeMap<(u32, u16), CellValue>,
}

impl SheetCells {
    /// Formulas replace the cached value read for the same cell.
    pub fn from_contents(contents: SheetContents) -> Self {
        let mut cells = BTreeMap::new();
        for (row, col, data) in &contents.values {
            if let (Some(value), Ok(col)) = (CellValue::from_data(data), u16::try_from(*col)) {
                cells.insert((*row, col), value);
            }
        }
        for (row, col, formula) in contents.formulas {
            if let Ok(col) = u16::try_from(col) {
                cells.insert((row, col), CellValue::Formula(formula));
            }
        }
        Self {
            name: contents.name,
            cells,
        }
    }

    /// Writes `edits` from the top-left cell. With `clear` the sheet is emptied first.
    pub fn apply_edits(&mut self, edits: &[Vec<CellEdit>], clear: bool) -> Result<(), SheetError> {
        if clear {
            self.cells.clear();
        }
        for (row_idx, row) in edits.iter().enumerate() {
            for (col_idx, edit) in row.iter().enumerate() {
                if row_idx > MAX_ROW || col_idx > MAX_COL {
                    return Err(SheetError::EditOutOfRange {
                        row: row_idx,
                        col: col_idx,
                    });
                }
                let key = (row_idx as u32, col_idx as u16);
                match CellValue::from_edit(edit) {
                    Some(value) => {
                        self.cells.insert(key, value);
                    }
                    None => {
                        self.cells.remove(&key);
                    }
                }
            }
        }
        Ok(())
    }
}

pub fn write_workbook(path: &Path, sheets: &[SheetCells]) -> Result<(), SheetError> {
    let datetime_format = Format::new().set_num_format(DATETIME_NUM_FORMAT);
    let mut workbook = Workbook::new();

    for sheet in sheets {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(&sheet.name)?;
        for (&(row, col), value) in &sheet.cells {
            match value {
                CellValue::Text(s) => worksheet.write_string(row, col, s)?,
                CellValue::Number(n) => worksheet.write_number(row, col, *n)?,
                CellValue::Bool(b) => worksheet.write_boolean(row, col, *b)?,
                CellValue::DateTime(serial) => {
                    worksheet.write_number_with_format(row, col, *serial, &datetime_format)?
                }
                CellValue::Formula(f) => worksheet.write_formula(row, col, f.as_str())?,
            };
        }
    }

    workbook.save(path)?;
    tracing::info!("Wrote {} sheets to {}", sheets.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn edit(value: Value) -> CellEdit {
        CellEdit {
            value,
            ..CellEdit::default()
        }
    }

    #[test]
    fn test_edit_values() {
        assert_eq!(CellValue::from_edit(&edit(json!("Desk"))), Some(CellValue::Text("Desk".into())));
        assert_eq!(CellValue::from_edit(&edit(json!(4))), Some(CellValue::Number(4.0)));
        assert_eq!(CellValue::from_edit(&edit(json!(true))), Some(CellValue::Bool(true)));
        assert_eq!(CellValue::from_edit(&edit(json!(""))), None);
        assert_eq!(CellValue::from_edit(&edit(Value::Null)), None);

        let formula: CellEdit = serde_json::from_value(json!({"type": "formula", "formula": "=A1*2"})).unwrap();
        assert_eq!(CellValue::from_edit(&formula), Some(CellValue::Formula("=A1*2".into())));
    }

    #[test]
    fn test_apply_edits_overlays_or_clears() {
        let mut sheet = SheetCells {
            name: "Sheet1".into(),
            cells: BTreeMap::from([
                ((0, 0), CellValue::Text("Item".into())),
                ((5, 3), CellValue::Number(9.0)),
            ]),
        };

        sheet
            .apply_edits(&[vec![edit(json!("Name")), edit(json!(2))]], false)
            .unwrap();
        assert_eq!(sheet.cells[&(0, 0)], CellValue::Text("Name".into()));
        assert_eq!(sheet.cells[&(0, 1)], CellValue::Number(2.0));
        assert!(sheet.cells.contains_key(&(5, 3)));

        sheet.apply_edits(&[vec![edit(json!(""))]], true).unwrap();
        assert!(sheet.cells.is_empty());
    }

    #[test]
    fn test_formulas_override_cached_values() {
        let contents = SheetContents {
            name: "Totals".into(),
            values: vec![(0, 0, Data::Float(10.0)), (1, 0, Data::Float(10.0))],
            formulas: vec![(1, 0, "SUM(A1)".into())],
        };
        let sheet = SheetCells::from_contents(contents);
        assert_eq!(sheet.cells[&(0, 0)], CellValue::Number(10.0));
        assert_eq!(sheet.cells[&(1, 0)], CellValue::Formula("SUM(A1)".into()));
    }
}
