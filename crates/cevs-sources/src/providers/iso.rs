use reqwest::Client;
use serde_json::json;
use tracing::debug;

use cevs_core::SourceKind;

use crate::config::IsoConfig;
use crate::error::ProviderError;
use crate::traits::SourceProvider;
use crate::types::{apply_filters, sample_rows, FetchQuery, RawRecord};
use crate::wire::{build_client, get_rows};

/// ISO 14001 certification registry adapter. Real registries publish either
/// a REST endpoint or a periodic CSV/JSON export; a configured export URL
/// takes precedence over the API base.
pub struct IsoProvider {
    config: IsoConfig,
    client: Client,
}

impl IsoProvider {
    pub fn new(config: IsoConfig) -> Result<Self, ProviderError> {
        let client = build_client(config.timeout)?;
        Ok(Self { config, client })
    }

    pub fn from_env() -> Result<Self, ProviderError> {
        Self::new(IsoConfig::from_env())
    }
}

#[async_trait::async_trait]
impl SourceProvider for IsoProvider {
    fn name(&self) -> &'static str {
        "iso"
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Iso
    }

    async fn fetch_records(&self, query: &FetchQuery) -> Result<Vec<RawRecord>, ProviderError> {
        let rows = if let Some(url) = &self.config.csv_url {
            get_rows(&self.client, url, &[], query.timeout).await?
        } else if let Some(base) = &self.config.api_base {
            let url = format!("{}/certifications", base.trim_end_matches('/'));
            let mut params = Vec::new();
            if let Some(country) = &query.country {
                params.push(("country".to_string(), country.clone()));
            }
            get_rows(&self.client, &url, &params, query.timeout).await?
        } else {
            debug!("ISO endpoint not configured, serving sample data");
            self.sample_records()
        };
        Ok(apply_filters(rows, query))
    }

    fn sample_records(&self) -> Vec<RawRecord> {
        sample_rows(json!([
            {
                "company": "Green Energy Co",
                "country": "US",
                "certificate": "ISO 14001",
                "valid_until": "2026-12-31",
                "sample": true
            },
            {
                "company": "Eco Manufacturing GmbH",
                "country": "DE",
                "certificate": "ISO 14001",
                "valid_until": "2025-08-01",
                "sample": true
            },
            {
                "company": "Sustain PT",
                "country": "ID",
                "certificate": "ISO 14001",
                "valid_until": "2027-01-15",
                "sample": true
            },
            {
                "company": "Swedish Wind Power AB",
                "country": "SE",
                "certificate": "ISO 14001",
                "valid_until": "2026-06-30",
                "sample": true
            },
            {
                "company": "Nordic Paper AS",
                "country": "NO",
                "certificate": "ISO 9001",
                "valid_until": "2025-11-20",
                "sample": true
            }
        ]))
    }
}
