use calamine::Data;
use smallvec::SmallVec;

/// Number of non-empty values sampled per column for name inference.
pub const SAMPLE_SIZE: usize = 5;

/// Rows of one sheet as read from the workbook, fully blank rows removed.
#[derive(Debug, Clone, PartialEq)]
pub struct RawGrid {
    pub sheet: String,
    pub rows: Vec<Vec<Data>>,
}

impl RawGrid {
    pub fn new(sheet: impl Into<String>, rows: Vec<Vec<Data>>) -> Self {
        Self {
            sheet: sheet.into(),
            rows,
        }
    }

    pub fn width(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }
}

/// Signals gathered for one row while looking for the header.
#[derive(Debug, Clone, PartialEq)]
pub struct HeaderCandidate {
    pub index: usize,
    pub non_empty: usize,
    pub distinct: usize,
    pub keyword_match: bool,
}

/// Output of the cleaner: header labels aligned with the surviving columns.
#[derive(Debug, Clone, PartialEq)]
pub struct CleanGrid {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Data>>,
}

impl CleanGrid {
    pub fn width(&self) -> usize {
        self.headers.len()
    }

    pub fn column(&self, idx: usize) -> impl Iterator<Item = &Data> {
        self.rows.iter().filter_map(move |row| row.get(idx))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDescriptor {
    pub position: usize,
    pub raw_header: String,
    pub name: String,
    pub samples: SmallVec<[String; SAMPLE_SIZE]>,
}

/// Cleaned, named and stringified table. Row cells line up with `columns`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CleanedTable {
    pub columns: Vec<ColumnDescriptor>,
    pub dtypes: Vec<&'static str>,
    pub rows: Vec<Vec<String>>,
}

impl CleanedTable {
    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty() || self.columns.is_empty()
    }

    pub fn record(&self, row: &[String]) -> serde_json::Map<String, serde_json::Value> {
        self.columns
            .iter()
            .zip(row)
            .map(|(col, value)| (col.name.clone(), serde_json::Value::String(value.clone())))
            .collect()
    }
}

/// A cleaned table together with where its header was found.
#[derive(Debug, Clone, PartialEq)]
pub struct SheetAnalysis {
    pub sheet_names: Vec<String>,
    pub sheet: String,
    pub header_row: usize,
    pub table: CleanedTable,
}

/// Every populated cell of one sheet, positioned absolutely (0-based).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SheetContents {
    pub name: String,
    pub values: Vec<(u32, u32, Data)>,
    pub formulas: Vec<(u32, u32, String)>,
}
