//! Score orchestration: concurrent source fetches, normalization, component
//! math, and assembly of the final result. Upstream failures never fail a
//! score request; the failing source is swapped for its fallback sample set
//! and reported in the diagnostics block.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::{json, Value};
use tracing::warn;

use cevs_core::{
    company_matches, country, eea_pollution_penalty, eea_presence_bonus, edgar_pollution_penalty,
    epa_penalty, find_eu_row, find_renewables_row, iso_bonus, normalize_all, parse_policy_row,
    parse_pollution_point, parse_renewables_row, policy_bonus, policy_match_count, round2,
    CanonicalRecord, CevsResult, EdgarPollutantSeries, PollutionSeriesPoint, ScoreComponents,
    SourceKind, EDGAR_POLLUTANT_WEIGHTS,
};
use cevs_sources::{
    apply_filters, build_source_provider, EdgarProvider, EeaProvider, FetchQuery, ProviderError,
    RawRecord, SourceProvider, SourceProviderConfig,
};

use crate::cache::ResultCache;
use crate::config::{EngineConfig, PollutionSource, SourceConfigs};
use crate::error::EngineError;

/// Cap on per-source record lists embedded in a score result.
const DETAIL_LIMIT: usize = 20;

/// Filters for a normalized-listing request, as received from an outer
/// surface. Numeric fields arrive as strings and are validated here.
#[derive(Debug, Clone, Default)]
pub struct ListFilters {
    pub country: Option<String>,
    pub state: Option<String>,
    pub year: Option<String>,
    pub subject: Option<String>,
    pub limit: Option<String>,
}

impl ListFilters {
    fn is_unfiltered(&self) -> bool {
        self.country.is_none()
            && self.state.is_none()
            && self.year.is_none()
            && self.subject.is_none()
            && self.limit.is_none()
    }

    fn to_query(&self) -> Result<FetchQuery, EngineError> {
        let year = match &self.year {
            Some(raw) => Some(raw.trim().parse::<i32>().map_err(|_| {
                EngineError::InvalidRequest(format!("year must be an integer, got {raw:?}"))
            })?),
            None => None,
        };
        let limit = match &self.limit {
            Some(raw) => Some(raw.trim().parse::<usize>().map_err(|_| {
                EngineError::InvalidRequest(format!("limit must be a non-negative integer, got {raw:?}"))
            })?),
            None => None,
        };
        Ok(FetchQuery {
            country: self.country.clone(),
            state: self.state.clone(),
            year,
            subject: self.subject.clone(),
            limit,
            timeout: None,
        })
    }
}

/// The EEA and EDGAR providers are held concretely because the engine uses
/// their dataset-specific methods (renewables/pollution series); the rest go
/// through the provider factory and the trait object surface.
pub struct CevsAggregator {
    config: EngineConfig,
    epa: Arc<dyn SourceProvider>,
    iso: Arc<dyn SourceProvider>,
    eea: Arc<EeaProvider>,
    edgar: Arc<EdgarProvider>,
    policy: Arc<dyn SourceProvider>,
    listing_cache: ResultCache,
}

impl CevsAggregator {
    pub fn new(config: EngineConfig, sources: SourceConfigs) -> Result<Self, EngineError> {
        let listing_cache = ResultCache::new(config.cache_ttl);
        Ok(Self {
            config,
            epa: build_source_provider(SourceProviderConfig::Epa(sources.epa))?,
            iso: build_source_provider(SourceProviderConfig::Iso(sources.iso))?,
            eea: Arc::new(EeaProvider::new(sources.eea)?),
            edgar: Arc::new(EdgarProvider::new(sources.edgar)?),
            policy: build_source_provider(SourceProviderConfig::Policy(sources.policy))?,
            listing_cache,
        })
    }

    pub fn from_env() -> Result<Self, EngineError> {
        Self::new(EngineConfig::from_env(), SourceConfigs::from_env())
    }

    /// Compute the verification score for one company. `country` scopes the
    /// country-level components (EEA presence, renewables, pollution trend,
    /// policy); without it those components stay zero.
    pub async fn compute_score(
        &self,
        company: &str,
        country: Option<&str>,
    ) -> Result<CevsResult, EngineError> {
        let company = company.trim();
        if company.is_empty() {
            return Err(EngineError::InvalidRequest(
                "company must not be empty".to_string(),
            ));
        }

        let now = now_ms();
        let timeout = self.config.scoring_timeout;
        let iso_query = FetchQuery::for_country(country)
            .with_limit(self.config.iso_limit)
            .with_timeout(timeout);
        let epa_query = FetchQuery::default()
            .with_limit(self.config.epa_scan_limit)
            .with_timeout(timeout);
        let eea_query = FetchQuery::for_country(country)
            .with_limit(self.config.eea_indicator_limit)
            .with_timeout(timeout);
        let policy_query = FetchQuery::default().with_timeout(timeout);

        let mut degraded: Vec<&'static str> = Vec::new();

        let (iso_res, epa_res, eea_res, renewables_res, pollution_res, policy_res) = tokio::join!(
            self.iso.fetch_records(&iso_query),
            self.epa.fetch_records(&epa_query),
            self.eea.fetch_records(&eea_query),
            self.eea.renewables_rows(Some(timeout)),
            async {
                // The pollution trend is a country-level component; without
                // a country the series is never charged, so skip the fetch.
                if country.is_some() {
                    self.eea.pollution_rows(Some(timeout)).await
                } else {
                    Ok(Vec::new())
                }
            },
            self.policy.fetch_records(&policy_query),
        );

        let iso_rows = recover(
            "iso",
            iso_res,
            || apply_filters(self.iso.sample_records(), &iso_query),
            &mut degraded,
        );
        let epa_rows = recover(
            "epa",
            epa_res,
            || apply_filters(self.epa.sample_records(), &epa_query),
            &mut degraded,
        );
        let eea_rows = recover(
            "eea",
            eea_res,
            || apply_filters(self.eea.sample_records(), &eea_query),
            &mut degraded,
        );
        let renewables_rows = recover(
            "eea_renewables",
            renewables_res,
            EeaProvider::renewables_fallback,
            &mut degraded,
        );
        let pollution_rows = recover(
            "eea_pollution",
            pollution_res,
            EeaProvider::pollution_fallback,
            &mut degraded,
        );
        let policy_rows = recover(
            "policy",
            policy_res,
            || apply_filters(self.policy.sample_records(), &policy_query),
            &mut degraded,
        );

        let iso_records = normalize_all(&to_values(&iso_rows), SourceKind::Iso, now);
        let epa_records = normalize_all(&to_values(&epa_rows), SourceKind::Epa, now);
        let eea_records = normalize_all(&to_values(&eea_rows), SourceKind::Eea, now);
        let policy_records = normalize_all(&to_values(&policy_rows), SourceKind::Policy, now);

        let iso_matches: Vec<&CanonicalRecord> = iso_records
            .iter()
            .filter(|record| is_certified_match(record, company))
            .collect();
        let epa_matches: Vec<&CanonicalRecord> = epa_records
            .iter()
            .filter(|record| company_matches(record, company))
            .collect();

        let mut components = ScoreComponents::default();
        components.iso_bonus = iso_bonus(!iso_matches.is_empty());
        components.epa_penalty = -epa_penalty(epa_matches.len());
        components.eea_bonus = eea_presence_bonus(!eea_records.is_empty());

        let parsed_renewables: Vec<_> = to_values(&renewables_rows)
            .iter()
            .filter_map(parse_renewables_row)
            .collect();
        let mut renewables_detail = json!(null);
        if let Some(country) = country {
            if let Some(row) = find_renewables_row(&parsed_renewables, country) {
                if let Some(share) = row.share_value.or(row.prior_share_value) {
                    let eu_share =
                        find_eu_row(&parsed_renewables).and_then(|eu| eu.share_value.or(eu.prior_share_value));
                    components.renewables_bonus =
                        cevs_core::renewables_bonus(share, row.target_value, eu_share);
                    renewables_detail = json!({
                        "country": row.country,
                        "share": share,
                        "target": row.target_value,
                        "eu_share": eu_share,
                    });
                }
            }
        }

        let eea_points: Vec<PollutionSeriesPoint> = to_values(&pollution_rows)
            .iter()
            .filter_map(parse_pollution_point)
            .collect();
        let use_eea_trend = match self.config.pollution_source {
            PollutionSource::Eea => true,
            PollutionSource::Edgar => false,
            PollutionSource::Auto => !eea_points.is_empty(),
        };
        let mut edgar_source = None;
        let (pollution_magnitude, trend_source) = match country {
            // Country-level component: never charged without a country.
            None => (0.0, "none"),
            Some(_) if use_eea_trend => (eea_pollution_penalty(&eea_points), "eea"),
            Some(country) => {
                let series = self.edgar_series(country, &mut degraded).await;
                edgar_source = Some(if self.edgar.is_configured() && !degraded.contains(&"edgar") {
                    "live"
                } else {
                    "sample"
                });
                (edgar_pollution_penalty(&series), "edgar")
            }
        };
        components.pollution_penalty = -pollution_magnitude;

        if components.iso_bonus > 0.0 {
            if let Some(country) = country {
                let parsed_policy: Vec<_> = to_values(&policy_rows)
                    .iter()
                    .filter_map(parse_policy_row)
                    .collect();
                components.policy_bonus =
                    policy_bonus(policy_match_count(&parsed_policy, country));
            }
        }

        round_components(&mut components);
        let score = round2(components.total());

        degraded.sort_unstable();
        degraded.dedup();

        let mut sources = std::collections::BTreeMap::new();
        sources.insert(
            "iso".to_string(),
            source_block(SourceKind::Iso, &iso_records, Some(iso_matches.len())),
        );
        sources.insert(
            "epa".to_string(),
            source_block(SourceKind::Epa, &epa_records, Some(epa_matches.len())),
        );
        sources.insert(
            "eea".to_string(),
            source_block(SourceKind::Eea, &eea_records, None),
        );
        sources.insert(
            "policy".to_string(),
            source_block(SourceKind::Policy, &policy_records, None),
        );
        sources.insert("renewables".to_string(), renewables_detail);
        let renewables_source = if parsed_renewables.is_empty() {
            "none"
        } else if renewables_rows.iter().any(row_is_sample) {
            "sample"
        } else {
            "live"
        };
        sources.insert("renewables_source".to_string(), json!(renewables_source));
        sources.insert("pollution_trend_source".to_string(), json!(trend_source));
        if let Some(edgar_source) = edgar_source {
            sources.insert("edgar_source".to_string(), json!(edgar_source));
        }
        sources.insert("degraded_sources".to_string(), json!(degraded));

        let mut details = std::collections::BTreeMap::new();
        details.insert("iso".to_string(), clone_capped(&iso_matches));
        details.insert("epa".to_string(), clone_capped(&epa_matches));
        details.insert(
            "eea".to_string(),
            eea_records.iter().take(DETAIL_LIMIT).cloned().collect(),
        );
        details.insert(
            "policy".to_string(),
            policy_records
                .iter()
                .filter(|record| match country {
                    Some(country) => record
                        .location
                        .as_deref()
                        .is_some_and(|location| country::same_country(location, country)),
                    None => true,
                })
                .take(DETAIL_LIMIT)
                .cloned()
                .collect(),
        );

        Ok(CevsResult {
            company: company.to_string(),
            country: country.map(str::to_string),
            score,
            components,
            sources,
            details,
        })
    }

    /// Normalized listing of one source's records. Unfiltered listings are
    /// served from the TTL cache.
    pub async fn list_normalized_records(
        &self,
        kind: SourceKind,
        filters: &ListFilters,
    ) -> Result<Vec<CanonicalRecord>, EngineError> {
        let query = filters.to_query()?;
        if filters.is_unfiltered() {
            if let Some(records) = self.listing_cache.get(kind) {
                return Ok(records);
            }
        }
        let rows = self.fetch_for(kind, &query).await?;
        let records = normalize_all(&to_values(&rows), kind, now_ms());
        if filters.is_unfiltered() {
            self.listing_cache.put(kind, records.clone());
        }
        Ok(records)
    }

    /// Case-insensitive company-name search across the entity-bearing
    /// sources (ISO certifications and EPA facilities).
    pub async fn search_companies(
        &self,
        needle: &str,
        limit: usize,
    ) -> Result<Vec<CanonicalRecord>, EngineError> {
        let needle = needle.trim();
        if needle.is_empty() {
            return Err(EngineError::InvalidRequest(
                "search query must not be empty".to_string(),
            ));
        }

        let now = now_ms();
        let query = FetchQuery::default().with_limit(self.config.epa_scan_limit);
        let (iso_res, epa_res) = tokio::join!(
            self.iso.fetch_records(&query),
            self.epa.fetch_records(&query),
        );
        let iso_records = normalize_all(&to_values(&iso_res?), SourceKind::Iso, now);
        let epa_records = normalize_all(&to_values(&epa_res?), SourceKind::Epa, now);

        let mut seen = std::collections::BTreeSet::new();
        let matches = iso_records
            .into_iter()
            .chain(epa_records)
            .filter(|record| company_matches(record, needle))
            .filter(|record| match &record.entity_name {
                Some(name) => seen.insert(name.to_lowercase()),
                None => false,
            })
            .take(limit)
            .collect();
        Ok(matches)
    }

    pub fn invalidate_cache(&self) {
        self.listing_cache.invalidate();
    }

    async fn fetch_for(
        &self,
        kind: SourceKind,
        query: &FetchQuery,
    ) -> Result<Vec<RawRecord>, ProviderError> {
        match kind {
            SourceKind::Epa => self.epa.fetch_records(query).await,
            SourceKind::Iso => self.iso.fetch_records(query).await,
            SourceKind::Eea => self.eea.fetch_records(query).await,
            SourceKind::Edgar => self.edgar.fetch_records(query).await,
            SourceKind::Policy => self.policy.fetch_records(query).await,
        }
    }

    async fn edgar_series(
        &self,
        country: &str,
        degraded: &mut Vec<&'static str>,
    ) -> Vec<EdgarPollutantSeries> {
        let mut out = Vec::with_capacity(EDGAR_POLLUTANT_WEIGHTS.len());
        for (pollutant, weight) in EDGAR_POLLUTANT_WEIGHTS {
            let series = match self
                .edgar
                .country_series(country, pollutant, Some(self.config.scoring_timeout))
                .await
            {
                Ok(series) => series,
                Err(err) => {
                    warn!(source = "edgar", pollutant, error = %err, "fetch failed, substituting sample data");
                    if !degraded.contains(&"edgar") {
                        degraded.push("edgar");
                    }
                    self.edgar.sample_series(country, pollutant)
                }
            };
            out.push(EdgarPollutantSeries {
                pollutant: (*pollutant).to_string(),
                weight: *weight,
                series,
            });
        }
        out
    }
}

fn recover(
    name: &'static str,
    result: Result<Vec<RawRecord>, ProviderError>,
    fallback: impl FnOnce() -> Vec<RawRecord>,
    degraded: &mut Vec<&'static str>,
) -> Vec<RawRecord> {
    match result {
        Ok(rows) => rows,
        Err(err) => {
            warn!(source = name, error = %err, "fetch failed, substituting sample data");
            degraded.push(name);
            fallback()
        }
    }
}

fn to_values(rows: &[RawRecord]) -> Vec<Value> {
    rows.iter().cloned().map(Value::Object).collect()
}

/// Certification match: the holder name contains the company and any named
/// standard must be ISO 14001. Registry rows that omit the standard column
/// are taken at face value.
fn is_certified_match(record: &CanonicalRecord, company: &str) -> bool {
    company_matches(record, company)
        && record
            .subject
            .as_deref()
            .is_none_or(|subject| subject.contains("14001"))
}

fn row_is_sample(row: &RawRecord) -> bool {
    row.get("sample").and_then(Value::as_bool).unwrap_or(false)
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or(0)
}

fn round_components(components: &mut ScoreComponents) {
    components.base = round2(components.base);
    components.iso_bonus = round2(components.iso_bonus);
    components.epa_penalty = round2(components.epa_penalty);
    components.eea_bonus = round2(components.eea_bonus);
    components.renewables_bonus = round2(components.renewables_bonus);
    components.pollution_penalty = round2(components.pollution_penalty);
    components.policy_bonus = round2(components.policy_bonus);
}

fn source_block(kind: SourceKind, records: &[CanonicalRecord], matches: Option<usize>) -> Value {
    let mut block = json!({
        "name": kind.source_name(),
        "category": kind.category(),
        "records": records.len(),
        "sample": records.iter().any(CanonicalRecord::is_sample),
    });
    if let (Some(count), Some(object)) = (matches, block.as_object_mut()) {
        object.insert("matches".to_string(), json!(count));
    }
    block
}

fn clone_capped(records: &[&CanonicalRecord]) -> Vec<CanonicalRecord> {
    records
        .iter()
        .take(DETAIL_LIMIT)
        .map(|record| (*record).clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn aggregator() -> CevsAggregator {
        CevsAggregator::new(EngineConfig::default(), SourceConfigs::default())
            .expect("aggregator")
    }

    #[tokio::test]
    async fn empty_company_is_rejected() {
        let result = aggregator().compute_score("   ", None).await;
        assert!(matches!(result, Err(EngineError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn list_filters_validate_numeric_fields() {
        let filters = ListFilters {
            year: Some("twenty".to_string()),
            ..ListFilters::default()
        };
        let result = aggregator().list_normalized_records(SourceKind::Eea, &filters).await;
        assert!(matches!(result, Err(EngineError::InvalidRequest(_))));

        let filters = ListFilters {
            limit: Some("-3".to_string()),
            ..ListFilters::default()
        };
        let result = aggregator().list_normalized_records(SourceKind::Eea, &filters).await;
        assert!(matches!(result, Err(EngineError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn certified_company_with_country_gets_iso_and_policy_components() {
        let result = aggregator()
            .compute_score("Swedish Wind Power", Some("Sweden"))
            .await
            .expect("result");
        assert_eq!(result.components.iso_bonus, 30.0);
        assert_eq!(result.components.policy_bonus, 2.0);
        assert_eq!(result.components.eea_bonus, 5.0);
        // Sweden sample: share 62.6, target 49, EU share 21.8.
        assert!((result.components.renewables_bonus - 14.96).abs() < 0.01);
        assert!(result.score >= 0.0 && result.score <= 100.0);
    }

    #[tokio::test]
    async fn unknown_company_without_country_keeps_indicator_bonus() {
        let result = aggregator()
            .compute_score("PT. Semen Indonesia", None)
            .await
            .expect("result");
        assert_eq!(result.components.iso_bonus, 0.0);
        assert_eq!(result.components.epa_penalty, 0.0);
        // Indicator presence is source-level, not country-level.
        assert_eq!(result.components.eea_bonus, 5.0);
        assert_eq!(result.components.renewables_bonus, 0.0);
        assert_eq!(result.components.pollution_penalty, 0.0);
        assert_eq!(result.components.policy_bonus, 0.0);
        assert_eq!(result.score, 55.0);
        assert_eq!(
            result.sources.get("pollution_trend_source"),
            Some(&json!("none"))
        );
    }

    #[test]
    fn certification_match_tolerates_missing_standard_column() {
        let mut record = CanonicalRecord::empty(SourceKind::Iso, 0);
        record.entity_name = Some("Swedish Wind Power AB".to_string());
        assert!(is_certified_match(&record, "Swedish Wind Power"));

        record.subject = Some("ISO 14001:2015".to_string());
        assert!(is_certified_match(&record, "Swedish Wind Power"));

        record.subject = Some("ISO 9001:2015".to_string());
        assert!(!is_certified_match(&record, "Swedish Wind Power"));

        record.subject = None;
        assert!(!is_certified_match(&record, "Baltic Steel"));
    }

    #[tokio::test]
    async fn company_search_dedupes_and_caps() {
        let records = aggregator()
            .search_companies("sample", 2)
            .await
            .expect("records");
        assert_eq!(records.len(), 2);
        let records = aggregator()
            .search_companies("   ", 10)
            .await;
        assert!(matches!(records, Err(EngineError::InvalidRequest(_))));
    }
}
