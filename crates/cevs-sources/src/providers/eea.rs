use reqwest::Client;
use serde_json::json;
use tracing::debug;

use cevs_core::SourceKind;

use crate::config::EeaConfig;
use crate::error::ProviderError;
use crate::traits::SourceProvider;
use crate::types::{apply_filters, sample_rows, FetchQuery, RawRecord};
use crate::wire::{build_client, get_rows};

/// EEA environmental datasets adapter. Serves three dataset families:
/// generic indicators (the trait contract), the country renewables-share
/// snapshot, and the industrial-pollution time series.
pub struct EeaProvider {
    config: EeaConfig,
    client: Client,
}

impl EeaProvider {
    pub fn new(config: EeaConfig) -> Result<Self, ProviderError> {
        let client = build_client(config.timeout)?;
        Ok(Self { config, client })
    }

    pub fn from_env() -> Result<Self, ProviderError> {
        Self::new(EeaConfig::from_env())
    }

    /// Country renewables-share rows (share, prior-year proxy, target),
    /// including the EU-aggregate row used as scoring baseline.
    pub async fn renewables_rows(
        &self,
        timeout: Option<std::time::Duration>,
    ) -> Result<Vec<RawRecord>, ProviderError> {
        match &self.config.renewables_url {
            Some(url) => get_rows(&self.client, url, &[], timeout).await,
            None => {
                debug!("EEA renewables dataset not configured, serving sample data");
                Ok(renewables_sample())
            }
        }
    }

    /// Industrial pollutant-release time series, one row per year.
    pub async fn pollution_rows(
        &self,
        timeout: Option<std::time::Duration>,
    ) -> Result<Vec<RawRecord>, ProviderError> {
        match &self.config.pollution_url {
            Some(url) => get_rows(&self.client, url, &[], timeout).await,
            None => {
                debug!("EEA pollution dataset not configured, serving sample data");
                Ok(pollution_sample())
            }
        }
    }

    /// Fallback renewables rows, for callers recovering from a failed fetch.
    pub fn renewables_fallback() -> Vec<RawRecord> {
        renewables_sample()
    }

    /// Fallback pollution rows, for callers recovering from a failed fetch.
    pub fn pollution_fallback() -> Vec<RawRecord> {
        pollution_sample()
    }
}

#[async_trait::async_trait]
impl SourceProvider for EeaProvider {
    fn name(&self) -> &'static str {
        "eea"
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Eea
    }

    async fn fetch_records(&self, query: &FetchQuery) -> Result<Vec<RawRecord>, ProviderError> {
        let Some(base) = &self.config.api_base else {
            debug!("EEA endpoint not configured, serving sample data");
            return Ok(apply_filters(self.sample_records(), query));
        };

        let indicator = query.subject.as_deref().unwrap_or("GHG");
        let url = format!("{}/indicator/{}", base.trim_end_matches('/'), indicator);
        let mut params = Vec::new();
        if let Some(country) = &query.country {
            params.push(("country".to_string(), country.clone()));
        }
        if let Some(year) = query.year {
            params.push(("year".to_string(), year.to_string()));
        }

        let rows = get_rows(&self.client, &url, &params, query.timeout).await?;
        Ok(apply_filters(rows, query))
    }

    fn sample_records(&self) -> Vec<RawRecord> {
        sample_rows(json!([
            {"country": "SE", "indicator": "GHG", "year": 2023, "value": 123.4, "unit": "MtCO2e", "sample": true},
            {"country": "DE", "indicator": "GHG", "year": 2023, "value": 456.7, "unit": "MtCO2e", "sample": true},
            {"country": "PL", "indicator": "GHG", "year": 2023, "value": 210.2, "unit": "MtCO2e", "sample": true}
        ]))
    }
}

fn renewables_sample() -> Vec<RawRecord> {
    sample_rows(json!([
        {
            "country": "Sweden",
            "renewable_energy_share_2020": 60.1,
            "renewable_energy_share_2021_proxy": 62.6,
            "target_2020": 49.0,
            "sample": true
        },
        {
            "country": "Finland",
            "renewable_energy_share_2020": 43.8,
            "renewable_energy_share_2021_proxy": 43.1,
            "target_2020": 38.0,
            "sample": true
        },
        {
            "country": "Germany",
            "renewable_energy_share_2020": 19.3,
            "renewable_energy_share_2021_proxy": 19.2,
            "target_2020": 18.0,
            "sample": true
        },
        {
            "country": "Netherlands",
            "renewable_energy_share_2020": 14.0,
            "renewable_energy_share_2021_proxy": 12.5,
            "target_2020": 14.0,
            "sample": true
        },
        {
            "country": "Poland",
            "renewable_energy_share_2020": 16.1,
            "renewable_energy_share_2021_proxy": 15.6,
            "target_2020": 15.0,
            "sample": true
        },
        {
            "country": "European Union",
            "renewable_energy_share_2020": 22.1,
            "renewable_energy_share_2021_proxy": 21.8,
            "target_2020": 20.0,
            "sample": true
        }
    ]))
}

fn pollution_sample() -> Vec<RawRecord> {
    sample_rows(json!([
        {"year": 2017, "cd_hg_ni_pb": 54.2, "total_n": 38.9, "total_p": 5.6, "toc": 130.4, "gva": 100.0, "sample": true},
        {"year": 2018, "cd_hg_ni_pb": 51.9, "total_n": 37.1, "total_p": 5.4, "toc": 127.8, "gva": 102.3, "sample": true},
        {"year": 2019, "cd_hg_ni_pb": 49.5, "total_n": 36.0, "total_p": 5.1, "toc": 124.2, "gva": 104.9, "sample": true},
        {"year": 2020, "cd_hg_ni_pb": 44.8, "total_n": 33.2, "total_p": 4.7, "toc": 118.9, "gva": 98.6, "sample": true},
        {"year": 2021, "cd_hg_ni_pb": 45.6, "total_n": 33.8, "total_p": 4.8, "toc": 120.3, "gva": 103.8, "sample": true},
        {"year": 2022, "cd_hg_ni_pb": 46.1, "total_n": 34.5, "total_p": 4.9, "toc": 121.7, "gva": 106.1, "sample": true}
    ]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use cevs_core::{parse_pollution_point, parse_renewables_row};
    use serde_json::Value;

    #[tokio::test]
    async fn indicator_sample_filters_by_country() {
        let provider = EeaProvider::new(EeaConfig::default()).expect("provider");
        let rows = provider
            .fetch_records(&FetchQuery::for_country(Some("SE")))
            .await
            .expect("rows");
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn renewables_sample_parses_and_carries_eu_row() {
        let provider = EeaProvider::new(EeaConfig::default()).expect("provider");
        let rows = provider.renewables_rows(None).await.expect("rows");
        let parsed: Vec<_> = rows
            .iter()
            .filter_map(|row| parse_renewables_row(&Value::Object(row.clone())))
            .collect();
        assert_eq!(parsed.len(), 6);
        assert!(parsed
            .iter()
            .any(|row| cevs_core::country::canonicalize(&row.country) == "european_union"));
        let sweden = parsed
            .iter()
            .find(|row| row.country == "Sweden")
            .expect("sweden row");
        assert_eq!(sweden.share_value, Some(62.6));
        assert_eq!(sweden.target_value, Some(49.0));
    }

    #[tokio::test]
    async fn pollution_sample_is_year_ordered_series() {
        let provider = EeaProvider::new(EeaConfig::default()).expect("provider");
        let rows = provider.pollution_rows(None).await.expect("rows");
        let points: Vec<_> = rows
            .iter()
            .filter_map(|row| parse_pollution_point(&Value::Object(row.clone())))
            .collect();
        assert_eq!(points.len(), 6);
        assert!(points.windows(2).all(|pair| pair[0].year < pair[1].year));
    }
}
