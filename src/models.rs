use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::services::excel::loader::{blank_column_names, DEFAULT_SHEET};
use crate::services::excel::render::RenderedTable;
use crate::services::excel::types::SheetAnalysis;

/// Rows copied into a descriptor as a preview.
pub const SAMPLE_ROWS: usize = 10;

pub const ERROR_COLUMN: &str = "Error reading file";

/// Ingestion-time summary of a workbook. Stored as an opaque blob and replayed
/// unchanged until the file is explicitly re-analysed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableDescriptor {
    pub columns: Vec<String>,
    pub dtypes: BTreeMap<String, String>,
    pub sample_data: Vec<Map<String, Value>>,
    pub total_rows: usize,
    pub sheets: Vec<String>,
    pub header_row: usize,
}

impl TableDescriptor {
    pub fn from_analysis(analysis: &SheetAnalysis) -> Self {
        let table = &analysis.table;
        Self {
            columns: table.column_names(),
            dtypes: table
                .columns
                .iter()
                .zip(&table.dtypes)
                .map(|(col, dtype)| (col.name.clone(), dtype.to_string()))
                .collect(),
            sample_data: table.rows.iter().take(SAMPLE_ROWS).map(|row| table.record(row)).collect(),
            total_rows: table.rows.len(),
            sheets: analysis.sheet_names.clone(),
            header_row: analysis.header_row,
        }
    }

    /// Placeholder stored when a workbook could not be analysed.
    pub fn degraded() -> Self {
        Self {
            columns: vec![ERROR_COLUMN.to_string()],
            dtypes: BTreeMap::new(),
            sample_data: Vec::new(),
            total_rows: 0,
            sheets: Vec::new(),
            header_row: 0,
        }
    }

    /// Descriptor of a freshly written blank workbook.
    pub fn blank(cols: u16) -> Self {
        Self {
            columns: blank_column_names(cols),
            dtypes: BTreeMap::new(),
            sample_data: Vec::new(),
            total_rows: 0,
            sheets: vec![DEFAULT_SHEET.to_string()],
            header_row: 0,
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.total_rows == 0 && self.columns.len() == 1 && self.columns[0] == ERROR_COLUMN
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResponse {
    pub data: Vec<Map<String, Value>>,
    pub total: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    /// Column filter as requested; empty when every column was searched.
    pub column: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sheet: Option<String>,
}

impl SearchResponse {
    pub fn empty() -> Self {
        Self {
            data: Vec::new(),
            total: 0,
            query: None,
            column: String::new(),
            sheet: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SaveResponse {
    pub success: bool,
    pub message: String,
    pub descriptor: TableDescriptor,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewResponse {
    #[serde(flatten)]
    pub table: RenderedTable,
    pub available_sheets: Vec<String>,
    pub current_sheet: String,
    pub header_row: usize,
    /// Set when the workbook was unreadable and has been regenerated blank.
    pub recovered: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_search_response_always_carries_column() {
        let response = SearchResponse {
            data: Vec::new(),
            total: 0,
            query: Some("lap".to_string()),
            column: String::new(),
            sheet: Some("Devices".to_string()),
        };
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({"data": [], "total": 0, "query": "lap", "column": "", "sheet": "Devices"})
        );

        let empty = serde_json::to_value(SearchResponse::empty()).unwrap();
        assert_eq!(empty, json!({"data": [], "total": 0, "column": ""}));
    }

    #[test]
    fn test_degraded_and_blank_descriptors() {
        assert!(TableDescriptor::degraded().is_degraded());
        assert!(!TableDescriptor::blank(2).is_degraded());
        assert_eq!(TableDescriptor::blank(2).sheets, vec!["Sheet1"]);
    }
}
