use reqwest::Client;
use serde_json::json;
use tracing::debug;

use cevs_core::SourceKind;

use crate::config::PolicyConfig;
use crate::error::ProviderError;
use crate::traits::SourceProvider;
use crate::types::{apply_filters, sample_rows, FetchQuery, RawRecord};
use crate::wire::{build_client, get_rows};

/// Best-practice policy table adapter: country-keyed incentive entries
/// (typology, voluntary scheme addressed, level of application) published
/// as a spreadsheet export.
pub struct PolicyProvider {
    config: PolicyConfig,
    client: Client,
}

impl PolicyProvider {
    pub fn new(config: PolicyConfig) -> Result<Self, ProviderError> {
        let client = build_client(config.timeout)?;
        Ok(Self { config, client })
    }

    pub fn from_env() -> Result<Self, ProviderError> {
        Self::new(PolicyConfig::from_env())
    }
}

#[async_trait::async_trait]
impl SourceProvider for PolicyProvider {
    fn name(&self) -> &'static str {
        "policy"
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Policy
    }

    async fn fetch_records(&self, query: &FetchQuery) -> Result<Vec<RawRecord>, ProviderError> {
        let rows = match &self.config.data_url {
            Some(url) => get_rows(&self.client, url, &[], query.timeout).await?,
            None => {
                debug!("policy dataset not configured, serving sample data");
                self.sample_records()
            }
        };
        Ok(apply_filters(rows, query))
    }

    fn sample_records(&self) -> Vec<RawRecord> {
        sample_rows(json!([
            {
                "id": "BP-001",
                "country": "Sweden",
                "typology": "Fast-track permitting",
                "scheme": "ISO 14001 / EMAS",
                "level": "National",
                "sample": true
            },
            {
                "id": "BP-002",
                "country": "Sweden",
                "typology": "Reduced inspection frequency",
                "scheme": "ISO 14001",
                "level": "Regional",
                "sample": true
            },
            {
                "id": "BP-003",
                "country": "Germany",
                "typology": "Reduced reporting and monitoring obligations",
                "scheme": "ISO 14001 / EMAS",
                "level": "National",
                "sample": true
            },
            {
                "id": "BP-004",
                "country": "Italy",
                "typology": "Fast-track permitting",
                "scheme": "ISO 14001",
                "level": "Regional",
                "sample": true
            },
            {
                "id": "BP-005",
                "country": "Germany",
                "typology": "Tax reduction",
                "scheme": "ISO 14001",
                "level": "National",
                "sample": true
            },
            {
                "id": "BP-006",
                "country": "Austria",
                "typology": "Reduced inspection frequency",
                "scheme": "EMAS",
                "level": "National",
                "sample": true
            }
        ]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cevs_core::{parse_policy_row, policy_match_count};
    use serde_json::Value;

    #[tokio::test]
    async fn sample_mode_filters_by_country() {
        let provider = PolicyProvider::new(PolicyConfig::default()).expect("provider");
        let rows = provider
            .fetch_records(&FetchQuery::for_country(Some("Germany")))
            .await
            .expect("rows");
        assert_eq!(rows.len(), 2);
    }

    #[tokio::test]
    async fn sample_entries_feed_the_policy_matcher() {
        let provider = PolicyProvider::new(PolicyConfig::default()).expect("provider");
        let rows = provider
            .fetch_records(&FetchQuery::default())
            .await
            .expect("rows");
        let parsed: Vec<_> = rows
            .iter()
            .filter_map(|row| parse_policy_row(&Value::Object(row.clone())))
            .collect();
        assert_eq!(parsed.len(), 6);
        // Sweden has two qualifying entries; the German tax entry and the
        // Austrian EMAS-only entry do not qualify.
        assert_eq!(policy_match_count(&parsed, "Sweden"), 2);
        assert_eq!(policy_match_count(&parsed, "Germany"), 1);
        assert_eq!(policy_match_count(&parsed, "Austria"), 0);
    }
}
