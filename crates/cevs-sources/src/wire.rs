//! Wire-level helpers shared by the providers: HTTP GET with per-request
//! timeout override, and payload decoding for the three shapes upstreams
//! actually return (JSON array, `{"data": [...]}` wrapper, CSV text).

use std::time::Duration;

use reqwest::Client;
use serde_json::Value;
use tracing::debug;

use crate::error::ProviderError;
use crate::types::RawRecord;

const USER_AGENT: &str = "cevs/0.1 (+https://github.com/openprx/cevs)";

pub(crate) fn build_client(timeout: Duration) -> Result<Client, ProviderError> {
    Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
        .map_err(ProviderError::from)
}

pub(crate) async fn get_text(
    client: &Client,
    url: &str,
    params: &[(String, String)],
    timeout: Option<Duration>,
) -> Result<String, ProviderError> {
    let mut request = client.get(url);
    if !params.is_empty() {
        request = request.query(params);
    }
    if let Some(timeout) = timeout {
        request = request.timeout(timeout);
    }
    let response = request.send().await?;
    if !response.status().is_success() {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        return Err(ProviderError::Api { status, body });
    }
    Ok(response.text().await?)
}

pub(crate) async fn get_rows(
    client: &Client,
    url: &str,
    params: &[(String, String)],
    timeout: Option<Duration>,
) -> Result<Vec<RawRecord>, ProviderError> {
    let text = get_text(client, url, params, timeout).await?;
    rows_from_text(&text)
}

/// Decode rows from a response body, sniffing JSON versus CSV by the first
/// non-whitespace byte.
pub(crate) fn rows_from_text(text: &str) -> Result<Vec<RawRecord>, ProviderError> {
    let trimmed = text.trim_start();
    if trimmed.starts_with('[') || trimmed.starts_with('{') {
        rows_from_json(serde_json::from_str(text)?)
    } else {
        rows_from_csv(text)
    }
}

/// Accept a bare JSON array or a `{"data": [...]}` wrapper. Entries that are
/// not mappings are skipped, never fatal.
pub(crate) fn rows_from_json(value: Value) -> Result<Vec<RawRecord>, ProviderError> {
    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("data") {
            Some(Value::Array(items)) => items,
            _ => {
                return Err(ProviderError::InvalidResponse(
                    "expected a JSON array or an object with a data array".to_string(),
                ))
            }
        },
        _ => {
            return Err(ProviderError::InvalidResponse(
                "expected a JSON array payload".to_string(),
            ))
        }
    };

    let total = items.len();
    let rows: Vec<RawRecord> = items
        .into_iter()
        .filter_map(|item| match item {
            Value::Object(map) => Some(map),
            _ => None,
        })
        .collect();
    if rows.len() < total {
        debug!(skipped = total - rows.len(), "skipped malformed rows in JSON payload");
    }
    Ok(rows)
}

/// Parse CSV text into raw records. Headers are folded to lowercase with
/// underscores so the normalizer's candidate keys match dataset exports.
pub(crate) fn rows_from_csv(text: &str) -> Result<Vec<RawRecord>, ProviderError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(text.as_bytes());
    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(normalize_header)
        .collect();

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result?;
        if record.iter().all(|field| field.trim().is_empty()) {
            continue;
        }
        let mut row = RawRecord::new();
        for (header, field) in headers.iter().zip(record.iter()) {
            row.insert(header.clone(), Value::String(field.to_string()));
        }
        rows.push(row);
    }
    Ok(rows)
}

fn normalize_header(header: &str) -> String {
    header.trim().to_lowercase().replace(' ', "_")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_array_and_data_wrapper_both_decode() {
        let rows = rows_from_json(json!([{"a": 1}, {"b": 2}])).expect("array");
        assert_eq!(rows.len(), 2);

        let rows = rows_from_json(json!({"data": [{"a": 1}]})).expect("wrapper");
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn malformed_entries_are_skipped_not_fatal() {
        let rows = rows_from_json(json!([{"a": 1}, "junk", 42, {"b": 2}])).expect("mixed");
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn scalar_payload_is_invalid() {
        assert!(rows_from_json(json!("nope")).is_err());
        assert!(rows_from_json(json!({"other": []})).is_err());
    }

    #[test]
    fn csv_headers_fold_to_candidate_keys() {
        let text = "Company,Country,Certificate\nGreen Energy Co,US,ISO 14001\n,,\n";
        let rows = rows_from_csv(text).expect("csv");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("company"), Some(&json!("Green Energy Co")));
        assert_eq!(rows[0].get("certificate"), Some(&json!("ISO 14001")));
    }

    #[test]
    fn text_sniffing_picks_decoder() {
        let json_rows = rows_from_text("  [{\"a\": 1}]").expect("json");
        assert_eq!(json_rows.len(), 1);
        let csv_rows = rows_from_text("a,b\n1,2\n").expect("csv");
        assert_eq!(csv_rows.len(), 1);
    }
}
