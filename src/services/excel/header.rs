//! Header row detection.
//!
//! Candidate rows are classified by an ordered rule chain. Each rule scans the
//! whole window before the next one is tried, so a later keyword row beats an
//! earlier row that only looks varied.

use calamine::Data;

use super::types::HeaderCandidate;
use super::utils::{contains_any, distinct_count, row_text, row_values};

/// Number of leading rows considered when looking for the header.
pub const HEADER_SCAN_ROWS: usize = 10;

/// Vocabulary that shows up in real column headers.
pub const HEADER_KEYWORDS: &[&str] = &[
    "s/n", "serial", "description", "quantity", "date", "price", "cost", "name", "id", "code",
    "number", "amount", "total", "item", "product", "customer", "client", "address", "phone",
    "email", "annexure", "table", "list", "inventory", "asset", "criteria", "assessment",
    "score", "yes", "no", "points",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderRule {
    Keyword,
    Variety,
    FirstNonEmpty,
    Fallback,
}

type RulePredicate = fn(&HeaderCandidate) -> bool;

fn keyword_rule(c: &HeaderCandidate) -> bool {
    c.non_empty > 2 && c.keyword_match && c.distinct > 2
}

fn variety_rule(c: &HeaderCandidate) -> bool {
    c.non_empty >= 3 && c.distinct as f64 >= c.non_empty as f64 * 0.5
}

fn first_non_empty_rule(c: &HeaderCandidate) -> bool {
    c.non_empty > 0
}

const HEADER_RULES: &[(HeaderRule, RulePredicate)] = &[
    (HeaderRule::Keyword, keyword_rule),
    (HeaderRule::Variety, variety_rule),
    (HeaderRule::FirstNonEmpty, first_non_empty_rule),
];

pub fn header_candidate(index: usize, row: &[Data]) -> HeaderCandidate {
    let values = row_values(row);
    HeaderCandidate {
        index,
        non_empty: values.len(),
        distinct: distinct_count(&values),
        keyword_match: contains_any(&row_text(&values), HEADER_KEYWORDS),
    }
}

/// Index of the header row and the rule that selected it.
pub fn detect_header_row(rows: &[Vec<Data>]) -> (usize, HeaderRule) {
    let candidates: Vec<HeaderCandidate> = rows
        .iter()
        .take(HEADER_SCAN_ROWS)
        .enumerate()
        .map(|(idx, row)| header_candidate(idx, row))
        .collect();

    for (rule, predicate) in HEADER_RULES {
        if let Some(candidate) = candidates.iter().find(|c| predicate(c)) {
            tracing::debug!("Header row {} selected by {:?} rule", candidate.index, rule);
            return (candidate.index, *rule);
        }
    }

    tracing::debug!("No header candidate matched, falling back to row 0");
    (0, HeaderRule::Fallback)
}
