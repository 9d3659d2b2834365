//! Per-provider configuration. Every endpoint is optional: a provider with
//! no endpoint configured serves its fallback sample set directly, which
//! keeps the whole pipeline runnable offline.

use std::time::Duration;

/// Default timeout for bulk-listing fetches. The scoring path overrides
/// this per request with a much shorter budget.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

const DEFAULT_EPA_BASE: &str = "https://enviro.epa.gov/enviro/efservice";
const DEFAULT_EPA_RESOURCE: &str = "egrid/PLANT/JSON";

fn env_string(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_secs(name: &str) -> Option<Duration> {
    env_string(name)?.parse::<u64>().ok().map(Duration::from_secs)
}

#[derive(Debug, Clone)]
pub struct EpaConfig {
    pub base_url: Option<String>,
    pub resource: String,
    pub timeout: Duration,
}

impl Default for EpaConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            resource: DEFAULT_EPA_RESOURCE.to_string(),
            timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }
}

impl EpaConfig {
    /// Envirofacts is the one upstream with a stable public endpoint, so
    /// env-driven construction defaults to live mode.
    pub fn from_env() -> Self {
        Self {
            base_url: Some(env_string("EPA_ENV_BASE").unwrap_or_else(|| DEFAULT_EPA_BASE.to_string())),
            resource: env_string("EPA_ENV_RESOURCE").unwrap_or_else(|| DEFAULT_EPA_RESOURCE.to_string()),
            timeout: env_secs("EPA_TIMEOUT_SECS").unwrap_or(DEFAULT_FETCH_TIMEOUT),
        }
    }
}

#[derive(Debug, Clone)]
pub struct IsoConfig {
    pub api_base: Option<String>,
    /// Direct CSV/JSON dataset export URL; takes precedence over `api_base`.
    pub csv_url: Option<String>,
    pub timeout: Duration,
}

impl Default for IsoConfig {
    fn default() -> Self {
        Self {
            api_base: None,
            csv_url: None,
            timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }
}

impl IsoConfig {
    pub fn from_env() -> Self {
        Self {
            api_base: env_string("ISO_API_BASE"),
            csv_url: env_string("ISO_CSV_URL"),
            timeout: env_secs("ISO_TIMEOUT_SECS").unwrap_or(DEFAULT_FETCH_TIMEOUT),
        }
    }
}

#[derive(Debug, Clone)]
pub struct EeaConfig {
    pub api_base: Option<String>,
    pub renewables_url: Option<String>,
    pub pollution_url: Option<String>,
    pub timeout: Duration,
}

impl Default for EeaConfig {
    fn default() -> Self {
        Self {
            api_base: None,
            renewables_url: None,
            pollution_url: None,
            timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }
}

impl EeaConfig {
    pub fn from_env() -> Self {
        Self {
            api_base: env_string("EEA_API_BASE"),
            renewables_url: env_string("EEA_RENEWABLES_URL"),
            pollution_url: env_string("EEA_POLLUTION_URL"),
            timeout: env_secs("EEA_TIMEOUT_SECS").unwrap_or(DEFAULT_FETCH_TIMEOUT),
        }
    }
}

#[derive(Debug, Clone)]
pub struct EdgarConfig {
    pub data_url: Option<String>,
    pub timeout: Duration,
    /// TTL of the process-level fetch cache for the full country/pollutant
    /// dataset; the upstream workbook is expensive to refetch.
    pub cache_ttl: Duration,
}

impl Default for EdgarConfig {
    fn default() -> Self {
        Self {
            data_url: None,
            timeout: DEFAULT_FETCH_TIMEOUT,
            cache_ttl: Duration::from_secs(3600),
        }
    }
}

impl EdgarConfig {
    pub fn from_env() -> Self {
        Self {
            data_url: env_string("EDGAR_DATA_URL"),
            timeout: env_secs("EDGAR_TIMEOUT_SECS").unwrap_or(DEFAULT_FETCH_TIMEOUT),
            cache_ttl: env_secs("EDGAR_CACHE_TTL_SECS").unwrap_or(Duration::from_secs(3600)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PolicyConfig {
    pub data_url: Option<String>,
    pub timeout: Duration,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            data_url: None,
            timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }
}

impl PolicyConfig {
    pub fn from_env() -> Self {
        Self {
            data_url: env_string("POLICY_DATA_URL"),
            timeout: env_secs("POLICY_TIMEOUT_SECS").unwrap_or(DEFAULT_FETCH_TIMEOUT),
        }
    }
}

#[derive(Debug, Clone)]
pub enum SourceProviderConfig {
    Epa(EpaConfig),
    Iso(IsoConfig),
    Eea(EeaConfig),
    Edgar(EdgarConfig),
    Policy(PolicyConfig),
}
