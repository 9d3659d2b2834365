//! Engine-level configuration. Provider endpoints live in `cevs-sources`;
//! this layer owns scoring-path budgets, the listing cache TTL, and the
//! pollution trend source selection.

use std::time::Duration;

use cevs_sources::{EdgarConfig, EeaConfig, EpaConfig, IsoConfig, PolicyConfig};
use tracing::warn;

pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(3600);

/// Per-fetch budget on the scoring path. One slow upstream must not hold
/// the whole score computation hostage.
pub const DEFAULT_SCORING_TIMEOUT: Duration = Duration::from_secs(5);

const DEFAULT_EPA_SCAN_LIMIT: usize = 200;
const DEFAULT_ISO_LIMIT: usize = 100;
const DEFAULT_EEA_INDICATOR_LIMIT: usize = 50;

/// Which dataset family feeds the pollution-trend penalty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PollutionSource {
    /// EEA series when it yields data points, EDGAR otherwise.
    #[default]
    Auto,
    Eea,
    Edgar,
}

impl PollutionSource {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "auto" => Some(Self::Auto),
            "eea" => Some(Self::Eea),
            "edgar" => Some(Self::Edgar),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub pollution_source: PollutionSource,
    /// TTL of the normalized-listing cache.
    pub cache_ttl: Duration,
    /// Per-fetch timeout override applied on the scoring path.
    pub scoring_timeout: Duration,
    pub epa_scan_limit: usize,
    pub iso_limit: usize,
    pub eea_indicator_limit: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            pollution_source: PollutionSource::Auto,
            cache_ttl: DEFAULT_CACHE_TTL,
            scoring_timeout: DEFAULT_SCORING_TIMEOUT,
            epa_scan_limit: DEFAULT_EPA_SCAN_LIMIT,
            iso_limit: DEFAULT_ISO_LIMIT,
            eea_indicator_limit: DEFAULT_EEA_INDICATOR_LIMIT,
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Self {
        let pollution_source = match env_string("CEVS_POLLUTION_SOURCE") {
            Some(raw) => PollutionSource::parse(&raw).unwrap_or_else(|| {
                warn!(value = %raw, "unrecognized CEVS_POLLUTION_SOURCE, using auto");
                PollutionSource::Auto
            }),
            None => PollutionSource::Auto,
        };
        Self {
            pollution_source,
            cache_ttl: env_secs("CEVS_CACHE_TTL_SECS").unwrap_or(DEFAULT_CACHE_TTL),
            scoring_timeout: env_secs("CEVS_SCORING_TIMEOUT_SECS")
                .unwrap_or(DEFAULT_SCORING_TIMEOUT),
            ..Self::default()
        }
    }
}

/// Endpoint configuration for all five providers. Defaults leave every
/// endpoint unset, which runs the whole engine on fallback sample data.
#[derive(Debug, Clone, Default)]
pub struct SourceConfigs {
    pub epa: EpaConfig,
    pub iso: IsoConfig,
    pub eea: EeaConfig,
    pub edgar: EdgarConfig,
    pub policy: PolicyConfig,
}

impl SourceConfigs {
    pub fn from_env() -> Self {
        Self {
            epa: EpaConfig::from_env(),
            iso: IsoConfig::from_env(),
            eea: EeaConfig::from_env(),
            edgar: EdgarConfig::from_env(),
            policy: PolicyConfig::from_env(),
        }
    }
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_secs(name: &str) -> Option<Duration> {
    env_string(name)?.parse::<u64>().ok().map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pollution_source_parses_known_values() {
        assert_eq!(PollutionSource::parse("auto"), Some(PollutionSource::Auto));
        assert_eq!(PollutionSource::parse(" EEA "), Some(PollutionSource::Eea));
        assert_eq!(PollutionSource::parse("Edgar"), Some(PollutionSource::Edgar));
        assert_eq!(PollutionSource::parse("both"), None);
    }

    #[test]
    fn defaults_are_sensible() {
        let config = EngineConfig::default();
        assert_eq!(config.pollution_source, PollutionSource::Auto);
        assert_eq!(config.cache_ttl, DEFAULT_CACHE_TTL);
        assert!(config.scoring_timeout < config.cache_ttl);
    }
}
