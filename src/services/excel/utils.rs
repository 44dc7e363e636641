use std::collections::HashSet;

use calamine::Data;
use once_cell::sync::Lazy;
use regex::Regex;

use super::normalize::cell_to_string;

/// Literal tokens spreadsheets and exports use for a missing value.
pub const NULL_TOKENS: [&str; 7] = ["nan", "NaN", "None", "NULL", "null", "N/A", "n/a"];

static DATE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"^\d{4}-\d{2}-\d{2}$",
        r"^\d{2}/\d{2}/\d{4}$",
        r"^\d{4}/\d{2}/\d{2}$",
        r"^\d{2}-\d{2}-\d{4}$",
        r"^\d{4}-\d{2}-\d{2}[ T]\d{2}:\d{2}(:\d{2})?$",
    ]
    .iter()
    .filter_map(|pattern| Regex::new(pattern).ok())
    .collect()
});

pub fn is_null_token(s: &str) -> bool {
    NULL_TOKENS.contains(&s)
}

/// A cell counts as empty when it holds nothing, only whitespace, or a null token.
pub fn is_blank(cell: &Data) -> bool {
    match cell {
        Data::Empty => true,
        Data::String(s) => {
            let trimmed = s.trim();
            trimmed.is_empty() || is_null_token(trimmed)
        }
        _ => false,
    }
}

/// Trimmed text of every non-empty cell in the row.
pub fn row_values(row: &[Data]) -> Vec<String> {
    row.iter()
        .filter(|cell| !is_blank(cell))
        .map(|cell| cell_to_string(cell).trim().to_string())
        .collect()
}

pub fn row_text(values: &[String]) -> String {
    values.join(" ").to_lowercase()
}

pub fn distinct_count(values: &[String]) -> usize {
    values.iter().collect::<HashSet<_>>().len()
}

pub fn contains_any(text: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|keyword| text.contains(keyword))
}

pub fn fill_ratio(filled: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        filled as f64 / total as f64
    }
}

/// Returns `name`, or `name_2`, `name_3`, ... when it is already taken.
pub fn unique_column_name(name: &str, existing_names: &mut HashSet<String>) -> String {
    let mut cleaned = name.to_string();

    // If the name already exists, add a numeric suffix
    let mut counter = 2;
    while !existing_names.insert(cleaned.clone()) {
        cleaned = format!("{}_{}", name, counter);
        counter += 1;
    }

    cleaned
}

pub fn is_date_string(s: &str) -> bool {
    let s = s.trim();
    DATE_PATTERNS.iter().any(|re| re.is_match(s))
}

pub fn is_numeric_text(s: &str) -> bool {
    let s = s.trim();
    !s.is_empty() && s.parse::<f64>().map_or(false, |v| v.is_finite())
}

/// Coarse type tag for a column: `numeric`, `date`, `boolean`, `string` or `empty`.
pub fn detect_column_type<'a>(values: impl IntoIterator<Item = &'a Data>) -> &'static str {
    let mut numeric_count = 0;
    let mut date_count = 0;
    let mut bool_count = 0;
    let mut total_count = 0;

    for value in values.into_iter().filter(|v| !is_blank(v)) {
        total_count += 1;
        match value {
            Data::Float(_) | Data::Int(_) => numeric_count += 1,
            Data::DateTime(_) | Data::DateTimeIso(_) => date_count += 1,
            Data::String(s) if is_date_string(s) => date_count += 1,
            Data::Bool(_) => bool_count += 1,
            _ => {}
        }
    }

    if total_count == 0 {
        return "empty";
    }

    let threshold = total_count as f64 * 0.8;
    match () {
        _ if numeric_count as f64 >= threshold => "numeric",
        _ if date_count as f64 >= threshold => "date",
        _ if bool_count as f64 >= threshold => "boolean",
        _ => "string",
    }
}
