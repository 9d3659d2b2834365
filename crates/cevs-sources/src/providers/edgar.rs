use reqwest::Client;
use serde_json::{json, Value};
use tracing::debug;

use cevs_core::{country, parse_year_value, SourceKind};

use crate::config::EdgarConfig;
use crate::error::ProviderError;
use crate::fetch_cache::FetchCache;
use crate::traits::SourceProvider;
use crate::types::{apply_filters, row_str, sample_rows, FetchQuery, RawRecord};
use crate::wire::{build_client, get_rows};

/// EDGAR UCDB country-emissions adapter. The upstream dataset is one large
/// export of country/pollutant/year totals; the full fetch is cached at
/// process level keyed by the resolved endpoint so repeated trend queries
/// do not refetch it.
pub struct EdgarProvider {
    config: EdgarConfig,
    client: Client,
    cache: FetchCache,
}

impl EdgarProvider {
    pub fn new(config: EdgarConfig) -> Result<Self, ProviderError> {
        let client = build_client(config.timeout)?;
        let cache = FetchCache::new(config.cache_ttl);
        Ok(Self {
            config,
            client,
            cache,
        })
    }

    pub fn from_env() -> Result<Self, ProviderError> {
        Self::new(EdgarConfig::from_env())
    }

    /// False when no endpoint is configured and every fetch serves samples.
    pub fn is_configured(&self) -> bool {
        self.config.data_url.is_some()
    }

    async fn all_rows(&self, timeout: Option<std::time::Duration>) -> Result<Vec<RawRecord>, ProviderError> {
        let Some(url) = &self.config.data_url else {
            debug!("EDGAR endpoint not configured, serving sample data");
            return Ok(self.sample_records());
        };

        if let Some(rows) = self.cache.get(url) {
            return Ok(rows);
        }
        let rows = get_rows(&self.client, url, &[], timeout).await?;
        self.cache.put(url, rows.clone());
        Ok(rows)
    }

    /// Year-sorted `(year, value)` series for one country and pollutant.
    pub async fn country_series(
        &self,
        country_name: &str,
        pollutant: &str,
        timeout: Option<std::time::Duration>,
    ) -> Result<Vec<(i32, f64)>, ProviderError> {
        let rows = self.all_rows(timeout).await?;
        Ok(series_from_rows(&rows, country_name, pollutant))
    }

    /// Series built from the fallback sample set, for callers recovering
    /// from a failed fetch.
    pub fn sample_series(&self, country_name: &str, pollutant: &str) -> Vec<(i32, f64)> {
        series_from_rows(&self.sample_records(), country_name, pollutant)
    }
}

fn series_from_rows(rows: &[RawRecord], country_name: &str, pollutant: &str) -> Vec<(i32, f64)> {
    let mut series: Vec<(i32, f64)> = rows
        .iter()
        .filter(|row| {
            row_str(row, "country").is_some_and(|value| country::same_country(value, country_name))
        })
        .filter(|row| {
            row_str(row, "pollutant").is_some_and(|value| value.eq_ignore_ascii_case(pollutant))
        })
        .filter_map(|row| parse_year_value(&Value::Object((*row).clone())))
        .collect();
    series.sort_by_key(|(year, _)| *year);
    series
}

#[async_trait::async_trait]
impl SourceProvider for EdgarProvider {
    fn name(&self) -> &'static str {
        "edgar"
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Edgar
    }

    async fn fetch_records(&self, query: &FetchQuery) -> Result<Vec<RawRecord>, ProviderError> {
        let rows = self.all_rows(query.timeout).await?;
        Ok(apply_filters(rows, query))
    }

    fn sample_records(&self) -> Vec<RawRecord> {
        sample_rows(json!([
            {"country": "United States", "pollutant": "PM2.5", "year": 2015, "value": 310.2, "unit": "kt/year", "sample": true},
            {"country": "United States", "pollutant": "PM2.5", "year": 2018, "value": 284.9, "unit": "kt/year", "sample": true},
            {"country": "United States", "pollutant": "PM2.5", "year": 2020, "value": 265.3, "unit": "kt/year", "sample": true},
            {"country": "United States", "pollutant": "PM2.5", "year": 2022, "value": 258.8, "unit": "kt/year", "sample": true},
            {"country": "United States", "pollutant": "NOx", "year": 2015, "value": 512.4, "unit": "kt/year", "sample": true},
            {"country": "United States", "pollutant": "NOx", "year": 2018, "value": 468.0, "unit": "kt/year", "sample": true},
            {"country": "United States", "pollutant": "NOx", "year": 2020, "value": 430.7, "unit": "kt/year", "sample": true},
            {"country": "United States", "pollutant": "NOx", "year": 2022, "value": 421.5, "unit": "kt/year", "sample": true},
            {"country": "India", "pollutant": "PM2.5", "year": 2015, "value": 890.1, "unit": "kt/year", "sample": true},
            {"country": "India", "pollutant": "PM2.5", "year": 2018, "value": 965.4, "unit": "kt/year", "sample": true},
            {"country": "India", "pollutant": "PM2.5", "year": 2020, "value": 1010.2, "unit": "kt/year", "sample": true},
            {"country": "India", "pollutant": "PM2.5", "year": 2022, "value": 1056.8, "unit": "kt/year", "sample": true},
            {"country": "India", "pollutant": "NOx", "year": 2015, "value": 602.3, "unit": "kt/year", "sample": true},
            {"country": "India", "pollutant": "NOx", "year": 2018, "value": 640.9, "unit": "kt/year", "sample": true},
            {"country": "India", "pollutant": "NOx", "year": 2020, "value": 668.4, "unit": "kt/year", "sample": true},
            {"country": "India", "pollutant": "NOx", "year": 2022, "value": 701.0, "unit": "kt/year", "sample": true},
            {"country": "Indonesia", "pollutant": "PM2.5", "year": 2015, "value": 401.2, "unit": "kt/year", "sample": true},
            {"country": "Indonesia", "pollutant": "PM2.5", "year": 2018, "value": 420.6, "unit": "kt/year", "sample": true},
            {"country": "Indonesia", "pollutant": "PM2.5", "year": 2020, "value": 415.9, "unit": "kt/year", "sample": true},
            {"country": "Indonesia", "pollutant": "PM2.5", "year": 2022, "value": 438.2, "unit": "kt/year", "sample": true}
        ]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn country_series_is_sorted_and_joined_canonically() {
        let provider = EdgarProvider::new(EdgarConfig::default()).expect("provider");
        let series = provider
            .country_series("USA", "pm2.5", None)
            .await
            .expect("series");
        assert_eq!(series.len(), 4);
        assert_eq!(series.first(), Some(&(2015, 310.2)));
        assert_eq!(series.last(), Some(&(2022, 258.8)));
    }

    #[tokio::test]
    async fn unknown_country_yields_empty_series() {
        let provider = EdgarProvider::new(EdgarConfig::default()).expect("provider");
        let series = provider
            .country_series("Wakanda", "PM2.5", None)
            .await
            .expect("series");
        assert!(series.is_empty());
    }

    #[tokio::test]
    async fn listing_filters_by_country_and_pollutant() {
        let provider = EdgarProvider::new(EdgarConfig::default()).expect("provider");
        let query = FetchQuery {
            country: Some("India".to_string()),
            subject: Some("NOx".to_string()),
            ..FetchQuery::default()
        };
        let rows = provider.fetch_records(&query).await.expect("rows");
        assert_eq!(rows.len(), 4);
    }
}
