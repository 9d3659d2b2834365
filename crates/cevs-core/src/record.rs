use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Identity of an upstream data source. Every canonical record carries the
/// provenance tag of exactly one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Epa,
    Iso,
    Eea,
    Edgar,
    Policy,
}

impl SourceKind {
    pub fn source_name(self) -> &'static str {
        match self {
            Self::Epa => "EPA Envirofacts",
            Self::Iso => "ISO",
            Self::Eea => "EEA",
            Self::Edgar => "EDGAR UCDB",
            Self::Policy => "EMAS Best Practices",
        }
    }

    pub fn category(self) -> &'static str {
        match self {
            Self::Epa => "EPA Emission Data",
            Self::Iso => "ISO Certification",
            Self::Eea => "EEA Indicator",
            Self::Edgar => "EDGAR Country Emissions",
            Self::Policy => "Policy Best Practice",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "epa" => Some(Self::Epa),
            "iso" => Some(Self::Iso),
            "eea" => Some(Self::Eea),
            "edgar" => Some(Self::Edgar),
            "policy" => Some(Self::Policy),
            _ => None,
        }
    }
}

/// The normalized super-shape all source rows map into. Missing fields are
/// `None`, never omitted, so downstream access is uniform across sources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalRecord {
    pub entity_name: Option<String>,
    pub location: Option<String>,
    pub category: String,
    pub reference_id: Option<String>,
    pub effective_period: Option<String>,
    pub subject: Option<String>,
    pub status: Option<String>,
    pub source_name: String,
    pub retrieved_at_ms: u64,
    #[serde(default)]
    pub extras: BTreeMap<String, serde_json::Value>,
}

impl CanonicalRecord {
    pub fn empty(kind: SourceKind, retrieved_at_ms: u64) -> Self {
        Self {
            entity_name: None,
            location: None,
            category: kind.category().to_string(),
            reference_id: None,
            effective_period: None,
            subject: None,
            status: None,
            source_name: kind.source_name().to_string(),
            retrieved_at_ms,
            extras: BTreeMap::new(),
        }
    }

    /// True when the row came from a fallback sample set rather than live
    /// upstream data. The marker travels in `extras` so the external shape
    /// stays identical to real data.
    pub fn is_sample(&self) -> bool {
        self.extras
            .get("sample")
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(false)
    }
}

/// One country's renewable-energy share row from the EEA dataset snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountryRenewablesRow {
    pub country: String,
    pub share_value: Option<f64>,
    pub prior_share_value: Option<f64>,
    pub target_value: Option<f64>,
}

/// One year of the EEA industrial-pollution time series. Metric keys are the
/// pollutant proxies (`cd_hg_ni_pb`, `total_n`, `total_p`, `toc`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollutionSeriesPoint {
    pub year: i32,
    pub metric_values: BTreeMap<String, Option<f64>>,
}

/// A country-specific best-practice policy entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyRow {
    pub country: String,
    pub typology: String,
    pub scheme: String,
}

/// The final artifact returned to callers. Structurally complete even when
/// several components are zero due to upstream unavailability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CevsResult {
    pub company: String,
    pub country: Option<String>,
    pub score: f64,
    pub components: ScoreComponents,
    pub sources: BTreeMap<String, serde_json::Value>,
    pub details: BTreeMap<String, Vec<CanonicalRecord>>,
}

/// Named score components. Penalties are stored negative so the clamped sum
/// of all fields reproduces the final score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreComponents {
    pub base: f64,
    pub iso_bonus: f64,
    pub epa_penalty: f64,
    pub eea_bonus: f64,
    pub renewables_bonus: f64,
    pub pollution_penalty: f64,
    pub policy_bonus: f64,
}

impl Default for ScoreComponents {
    fn default() -> Self {
        Self {
            base: crate::score::BASE_SCORE,
            iso_bonus: 0.0,
            epa_penalty: 0.0,
            eea_bonus: 0.0,
            renewables_bonus: 0.0,
            pollution_penalty: 0.0,
            policy_bonus: 0.0,
        }
    }
}

impl ScoreComponents {
    /// Clamped total across all components.
    pub fn total(&self) -> f64 {
        let sum = self.base
            + self.iso_bonus
            + self.epa_penalty
            + self.eea_bonus
            + self.renewables_bonus
            + self.pollution_penalty
            + self.policy_bonus;
        sum.clamp(0.0, 100.0)
    }
}
