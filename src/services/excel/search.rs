use serde_json::{Map, Value};

use super::types::CleanedTable;

/// Most rows returned for one search; the total still counts every match.
pub const MAX_SEARCH_RESULTS: usize = 100;

#[derive(Debug, Clone, PartialEq)]
pub struct SearchHits {
    pub rows: Vec<Map<String, Value>>,
    pub total: usize,
}

/// Case-insensitive substring search. With a known `column` only that column
/// is matched, otherwise a row matches when any of its cells does.
pub fn search_table(table: &CleanedTable, query: &str, column: Option<&str>) -> SearchHits {
    let needle = query.to_lowercase();
    let column_idx = column.and_then(|name| table.column_index(name));

    let matches = |row: &&Vec<String>| match column_idx {
        Some(idx) => row.get(idx).map_or(false, |v| v.to_lowercase().contains(&needle)),
        None => row.iter().any(|v| v.to_lowercase().contains(&needle)),
    };

    let mut total = 0;
    let mut rows = Vec::new();
    for row in table.rows.iter().filter(matches) {
        total += 1;
        if rows.len() < MAX_SEARCH_RESULTS {
            rows.push(table.record(row));
        }
    }

    SearchHits { rows, total }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::excel::types::ColumnDescriptor;
    use smallvec::SmallVec;

    fn table(names: &[&str], rows: Vec<Vec<&str>>) -> CleanedTable {
        CleanedTable {
            columns: names
                .iter()
                .enumerate()
                .map(|(i, n)| ColumnDescriptor {
                    position: i,
                    raw_header: n.to_string(),
                    name: n.to_string(),
                    samples: SmallVec::new(),
                })
                .collect(),
            dtypes: vec!["string"; names.len()],
            rows: rows
                .into_iter()
                .map(|r| r.into_iter().map(String::from).collect())
                .collect(),
        }
    }

    fn devices() -> CleanedTable {
        table(
            &["Device_Type", "Location"],
            vec![vec!["Laptop", "Office 2"], vec!["Desktop", "Lab"], vec!["Printer", "Laptop bay"]],
        )
    }

    #[test]
    fn test_substring_is_case_insensitive() {
        let hits = search_table(&devices(), "lap", None);
        assert_eq!(hits.total, 2);
        assert_eq!(hits.rows[0]["Device_Type"], "Laptop");

        let upper = search_table(&devices(), "LAP", None);
        assert_eq!(upper, hits);
    }

    #[test]
    fn test_column_filter() {
        let hits = search_table(&devices(), "lap", Some("Device_Type"));
        assert_eq!(hits.total, 1);
        assert_eq!(hits.rows[0]["Location"], "Office 2");

        // An unknown column searches every column.
        let hits = search_table(&devices(), "lap", Some("Nope"));
        assert_eq!(hits.total, 2);
    }

    #[test]
    fn test_results_are_capped_but_total_is_not() {
        let rows = (0..250).map(|_| vec!["Laptop"]).collect();
        let hits = search_table(&table(&["Device_Type"], rows), "laptop", None);
        assert_eq!(hits.total, 250);
        assert_eq!(hits.rows.len(), MAX_SEARCH_RESULTS);
    }

    #[test]
    fn test_records_keep_column_order() {
        let hits = search_table(&devices(), "lab", None);
        let keys: Vec<&String> = hits.rows[0].keys().collect();
        assert_eq!(keys, vec!["Device_Type", "Location"]);
    }
}
