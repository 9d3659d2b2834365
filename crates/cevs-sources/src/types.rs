use std::time::Duration;

use serde_json::Value;

use cevs_core::country;

/// A loosely-typed upstream row. Every source payload shape (JSON array,
/// CSV export, wrapped object) is reduced to a sequence of these.
pub type RawRecord = serde_json::Map<String, Value>;

/// Filters for one fetch. Applied server-side where the upstream supports
/// it, and always re-applied client-side as a post-filter.
#[derive(Debug, Clone, Default)]
pub struct FetchQuery {
    pub country: Option<String>,
    pub state: Option<String>,
    pub year: Option<i32>,
    /// Pollutant, indicator, or certificate name depending on the source.
    pub subject: Option<String>,
    pub limit: Option<usize>,
    /// Per-request timeout override; the scoring path uses a shorter budget
    /// than the provider's configured default.
    pub timeout: Option<Duration>,
}

impl FetchQuery {
    pub fn for_country(country: Option<&str>) -> Self {
        Self {
            country: country.map(str::to_string),
            ..Self::default()
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

pub(crate) fn row_str<'a>(row: &'a RawRecord, key: &str) -> Option<&'a str> {
    row.iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(key))
        .and_then(|(_, v)| v.as_str())
}

pub(crate) fn row_year(row: &RawRecord) -> Option<i32> {
    row.iter()
        .find(|(k, _)| k.eq_ignore_ascii_case("year"))
        .and_then(|(_, v)| match v {
            Value::Number(n) => n.as_f64().map(|f| f as i32),
            Value::String(s) => s.trim().parse::<i32>().ok(),
            _ => None,
        })
}

const SUBJECT_KEYS: &[&str] = &["pollutant", "indicator", "certificate", "standard"];

fn matches_filters(row: &RawRecord, query: &FetchQuery) -> bool {
    if let Some(country) = &query.country {
        let matched = row_str(row, "country")
            .is_some_and(|value| country::same_country(value, country));
        if !matched {
            return false;
        }
    }
    if let Some(state) = &query.state {
        let matched = row_str(row, "state").is_some_and(|value| value.eq_ignore_ascii_case(state));
        if !matched {
            return false;
        }
    }
    if let Some(year) = query.year {
        if row_year(row) != Some(year) {
            return false;
        }
    }
    if let Some(subject) = &query.subject {
        let matched = SUBJECT_KEYS.iter().any(|key| {
            row_str(row, key).is_some_and(|value| value.eq_ignore_ascii_case(subject))
        });
        if !matched {
            return false;
        }
    }
    true
}

/// Client-side post-filter: drop rows the upstream should have filtered but
/// may not have, then truncate to the row limit.
pub fn apply_filters(rows: Vec<RawRecord>, query: &FetchQuery) -> Vec<RawRecord> {
    let mut out: Vec<RawRecord> = rows
        .into_iter()
        .filter(|row| matches_filters(row, query))
        .collect();
    if let Some(limit) = query.limit {
        out.truncate(limit);
    }
    out
}

/// Build sample rows from a `json!` array literal; non-object entries are
/// dropped.
pub(crate) fn sample_rows(value: Value) -> Vec<RawRecord> {
    match value {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::Object(map) => Some(map),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rows() -> Vec<RawRecord> {
        sample_rows(json!([
            {"country": "SE", "year": 2023, "indicator": "GHG"},
            {"country": "Sweden", "year": 2022, "indicator": "GHG"},
            {"country": "DE", "year": 2023, "indicator": "GHG"},
            {"state": "TX", "facility_name": "Plant A"},
        ]))
    }

    #[test]
    fn country_filter_joins_on_canonical_identity() {
        let query = FetchQuery::for_country(Some("Sweden"));
        let filtered = apply_filters(rows(), &query);
        assert_eq!(filtered.len(), 2);
    }

    #[test]
    fn year_filter_and_limit_apply() {
        let query = FetchQuery {
            year: Some(2023),
            limit: Some(1),
            ..FetchQuery::default()
        };
        let filtered = apply_filters(rows(), &query);
        assert_eq!(filtered.len(), 1);
        assert_eq!(row_str(&filtered[0], "country"), Some("SE"));
    }

    #[test]
    fn state_filter_is_case_insensitive() {
        let query = FetchQuery {
            state: Some("tx".to_string()),
            ..FetchQuery::default()
        };
        let filtered = apply_filters(rows(), &query);
        assert_eq!(filtered.len(), 1);
    }

    #[test]
    fn rows_without_country_drop_under_country_filter() {
        let query = FetchQuery::for_country(Some("US"));
        let filtered = apply_filters(rows(), &query);
        assert!(filtered.is_empty());
    }
}
