use serde::Serialize;

use super::types::CleanedTable;

pub const MAX_DISPLAY_ROWS: usize = 50;
pub const MAX_DISPLAY_COLUMNS: usize = 20;
pub const MAX_LABEL_CHARS: usize = 30;
pub const MAX_CELL_CHARS: usize = 50;

pub const NO_DATA_HTML: &str =
    r#"<div class="text-center py-8 text-gray-500"><p>No data found in this sheet.</p></div>"#;

/// A display string plus, when it was shortened, the full value for a tooltip.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayCell {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl DisplayCell {
    pub fn truncated(value: &str, max_chars: usize) -> Self {
        if value.chars().count() > max_chars {
            let head: String = value.chars().take(max_chars).collect();
            Self {
                text: format!("{}...", head),
                title: Some(value.to_string()),
            }
        } else {
            Self {
                text: value.to_string(),
                title: None,
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedTable {
    pub table_html: String,
    pub headers: Vec<DisplayCell>,
    pub rows: Vec<Vec<DisplayCell>>,
    pub total_rows: usize,
    pub displayed_rows: usize,
    pub columns_truncated: bool,
    pub total_columns: usize,
    pub displayed_columns: usize,
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn table_html(headers: &[DisplayCell], rows: &[Vec<DisplayCell>]) -> String {
    let mut html = String::from(r#"<table class="min-w-full divide-y divide-gray-200 table-fixed">"#);

    html.push_str(r#"<thead class="bg-gray-50"><tr>"#);
    for header in headers {
        // Headers always carry their full label as the title.
        let title = header.title.as_deref().unwrap_or(&header.text);
        html.push_str(&format!(
            r#"<th class="px-3 py-3 text-left text-xs font-medium text-gray-500 uppercase tracking-wider truncate" title="{}">{}</th>"#,
            escape_html(title),
            escape_html(&header.text)
        ));
    }
    html.push_str("</tr></thead>");

    html.push_str(r#"<tbody class="bg-white divide-y divide-gray-200">"#);
    for row in rows {
        html.push_str(r#"<tr class="hover:bg-gray-50">"#);
        for cell in row {
            html.push_str(&format!(
                r#"<td class="px-3 py-4 text-sm text-gray-900 truncate" title="{}">{}</td>"#,
                escape_html(cell.title.as_deref().unwrap_or("")),
                escape_html(&cell.text)
            ));
        }
        html.push_str("</tr>");
    }
    html.push_str("</tbody></table>");
    html
}

/// Bounded view of a cleaned table: first 50 rows, first 20 columns.
pub fn render_table(table: &CleanedTable) -> RenderedTable {
    if table.is_empty() {
        return RenderedTable {
            table_html: NO_DATA_HTML.to_string(),
            headers: Vec::new(),
            rows: Vec::new(),
            total_rows: 0,
            displayed_rows: 0,
            columns_truncated: false,
            total_columns: 0,
            displayed_columns: 0,
        };
    }

    let total_columns = table.columns.len();
    let displayed_columns = total_columns.min(MAX_DISPLAY_COLUMNS);

    let headers: Vec<DisplayCell> = table
        .columns
        .iter()
        .take(displayed_columns)
        .map(|col| DisplayCell::truncated(&col.name, MAX_LABEL_CHARS))
        .collect();

    let rows: Vec<Vec<DisplayCell>> = table
        .rows
        .iter()
        .take(MAX_DISPLAY_ROWS)
        .map(|row| {
            row.iter()
                .take(displayed_columns)
                .map(|value| DisplayCell::truncated(value, MAX_CELL_CHARS))
                .collect()
        })
        .collect();

    RenderedTable {
        table_html: table_html(&headers, &rows),
        displayed_rows: rows.len(),
        headers,
        rows,
        total_rows: table.rows.len(),
        columns_truncated: total_columns > MAX_DISPLAY_COLUMNS,
        total_columns,
        displayed_columns,
    }
}
