//! Semantic names for columns whose header is missing or a placeholder.

use std::collections::HashSet;

use smallvec::SmallVec;

use super::normalize::cell_to_string;
use super::types::{CleanGrid, ColumnDescriptor, SAMPLE_SIZE};
use super::utils::{contains_any, is_blank, is_null_token, is_numeric_text, row_text, row_values, unique_column_name};

const RESPONSE_LABEL: &str = "Response";

/// Ordered content categories, first match wins.
pub const COLUMN_CATEGORIES: &[(&str, &[&str])] = &[
    ("Device_Type", &["laptop", "computer", "device", "pc", "desktop"]),
    ("Manufacturer", &["hp", "dell", "lenovo", "apple", "asus", "acer", "toshiba", "samsung"]),
    ("Serial_Number", &["serial", "sn", "tag", "asset", "inventory"]),
    ("Price", &["price", "cost", "amount", "value", "total"]),
    ("Date", &["date", "purchase", "delivery", "received", "issued"]),
    ("Quantity", &["quantity", "qty", "count", "number"]),
    ("Location", &["location", "place", "office", "department", "building"]),
    ("Condition", &["condition", "status", "state", "working", "broken"]),
    ("Description", &["description", "details", "notes", "remarks"]),
    ("Name", &["name", "title", "item", "product"]),
    ("ID", &["id", "code", "reference", "ref"]),
    ("Assessment_Criteria", &["criteria", "assessment", "evaluation", "requirement"]),
    ("Score", &["score", "points", "rating", "grade"]),
    (RESPONSE_LABEL, &["yes", "no", "y/n", "true", "false"]),
    ("Document_Section", &["annexure", "annex", "appendix"]),
    ("Business_Info", &["sme", "business", "enterprise", "company"]),
    ("Email", &["email", "e-mail", "mail"]),
    ("Phone", &["phone", "mobile", "contact"]),
    ("Address", &["address", "street", "city", "zip"]),
    ("Customer", &["customer", "client", "user", "person"]),
    ("Employee", &["employee", "staff", "worker"]),
    ("Category", &["category", "type", "group"]),
    ("Model", &["model", "version", "brand"]),
];

/// Words in the first data row that mark a scored assessment form.
pub const ASSESSMENT_KEYWORDS: &[&str] =
    &["assessment criteria", "annexure", "score", "yes", "no", "points"];

const BOOLEAN_TOKENS: &[&str] = &["yes", "no", "y", "n", "1", "0"];

/// Share of sampled values that must be numeric for `Numeric_Column_N`.
const NUMERIC_SAMPLE_RATIO: f64 = 0.7;

/// Numeric, blank, "Unnamed: 3"-style or null-token headers carry no meaning.
pub fn is_degenerate_header(label: &str) -> bool {
    let label = label.trim();
    label.is_empty()
        || is_numeric_text(label)
        || label.to_lowercase().contains("unnamed")
        || is_null_token(label)
}

pub fn is_assessment_sheet(grid: &CleanGrid) -> bool {
    grid.rows
        .first()
        .map(|row| contains_any(&row_text(&row_values(row)), ASSESSMENT_KEYWORDS))
        .unwrap_or(false)
}

pub fn column_samples(grid: &CleanGrid, idx: usize) -> SmallVec<[String; SAMPLE_SIZE]> {
    grid.column(idx)
        .filter(|cell| !is_blank(cell))
        .take(SAMPLE_SIZE)
        .map(|cell| cell_to_string(cell).trim().to_string())
        .collect()
}

/// First category whose keywords occur in the lowercased sample text.
pub fn classify_samples(samples: &[String], skip_response: bool) -> Option<&'static str> {
    if samples.is_empty() {
        return None;
    }
    let text = samples.join(" ").to_lowercase();
    COLUMN_CATEGORIES
        .iter()
        .filter(|(label, _)| !(skip_response && *label == RESPONSE_LABEL))
        .find(|(_, keywords)| contains_any(&text, keywords))
        .map(|(label, _)| *label)
}

fn looks_boolean(samples: &[String]) -> bool {
    samples
        .iter()
        .any(|s| BOOLEAN_TOKENS.contains(&s.to_lowercase().as_str()))
}

fn assessment_name(position: usize, samples: &[String]) -> String {
    match position {
        0 => "Assessment_Criteria".to_string(),
        1 => "Description".to_string(),
        2 => "Score_Yes_No".to_string(),
        n if looks_boolean(samples) => format!("Response_{}", n - 2),
        n => format!("Additional_Info_{}", n - 2),
    }
}

fn fallback_name(samples: &[String], ordinal: usize) -> String {
    let numeric = samples.iter().filter(|s| is_numeric_text(s)).count();
    if !samples.is_empty() && numeric as f64 >= samples.len() as f64 * NUMERIC_SAMPLE_RATIO {
        format!("Numeric_Column_{}", ordinal)
    } else {
        format!("Column_{}", ordinal)
    }
}

/// One descriptor per column of the cleaned grid, with unique names.
pub fn infer_columns(grid: &CleanGrid) -> Vec<ColumnDescriptor> {
    let assessment = is_assessment_sheet(grid);
    if assessment {
        tracing::debug!("Sheet looks like an assessment form, using positional names");
    }

    let mut existing_names = HashSet::new();
    let mut unresolved = 0;

    grid.headers
        .iter()
        .enumerate()
        .map(|(position, raw_header)| {
            let samples = column_samples(grid, position);
            let base = if !is_degenerate_header(raw_header) {
                raw_header.trim().to_string()
            } else if let Some(label) = classify_samples(&samples, assessment) {
                label.to_string()
            } else if assessment {
                assessment_name(position, &samples)
            } else {
                unresolved += 1;
                fallback_name(&samples, unresolved)
            };

            let name = unique_column_name(&base, &mut existing_names);
            tracing::debug!("Column {} '{}' named '{}'", position, raw_header, name);
            ColumnDescriptor {
                position,
                raw_header: raw_header.clone(),
                name,
                samples,
            }
        })
        .collect()
}
