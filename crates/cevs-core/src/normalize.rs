//! Schema normalization: maps each source's raw row shape into
//! [`CanonicalRecord`] via ordered candidate-key tables. First
//! present-and-non-empty candidate wins, which absorbs inconsistent
//! upstream naming without per-source special cases.

use serde_json::Value;

use crate::record::{
    CanonicalRecord, CountryRenewablesRow, PollutionSeriesPoint, PolicyRow, SourceKind,
};

/// Ordered candidate keys per canonical field for one source kind.
struct KeyTable {
    entity_name: &'static [&'static str],
    location: &'static [&'static str],
    reference_id: &'static [&'static str],
    effective_period: &'static [&'static str],
    subject: &'static [&'static str],
    status: &'static [&'static str],
}

const EPA_KEYS: KeyTable = KeyTable {
    entity_name: &["facility_name", "plant_name", "facility", "company_name"],
    location: &["state", "county", "address", "location"],
    reference_id: &["plant_id", "registry_id", "permit_number"],
    effective_period: &["year", "reporting_year"],
    subject: &["pollutant", "pollutant_name"],
    status: &["status", "compliance_status"],
};

const ISO_KEYS: KeyTable = KeyTable {
    entity_name: &["company", "organization", "organization_name", "company_name"],
    location: &["country", "address", "region"],
    reference_id: &["certificate_id", "cert_number", "registration_number"],
    effective_period: &["valid_until", "expiry_date", "issued"],
    subject: &["certificate", "standard", "scheme"],
    status: &["status"],
};

const EEA_KEYS: KeyTable = KeyTable {
    entity_name: &["entity", "facility_name"],
    location: &["country", "geo", "member_state"],
    reference_id: &["dataset_id", "series_id"],
    effective_period: &["year", "reference_year"],
    subject: &["indicator", "indicator_name", "metric"],
    status: &["status"],
};

const EDGAR_KEYS: KeyTable = KeyTable {
    entity_name: &["urban_centre", "uc_name"],
    location: &["country", "uc_country"],
    reference_id: &["uc_id"],
    effective_period: &["year"],
    subject: &["pollutant", "substance"],
    status: &[],
};

const POLICY_KEYS: KeyTable = KeyTable {
    entity_name: &[],
    location: &["country"],
    reference_id: &["id"],
    effective_period: &[],
    subject: &["scheme", "voluntary_scheme"],
    status: &["level", "level_of_application"],
};

fn key_table(kind: SourceKind) -> &'static KeyTable {
    match kind {
        SourceKind::Epa => &EPA_KEYS,
        SourceKind::Iso => &ISO_KEYS,
        SourceKind::Eea => &EEA_KEYS,
        SourceKind::Edgar => &EDGAR_KEYS,
        SourceKind::Policy => &POLICY_KEYS,
    }
}

/// Stringify a scalar JSON value; `None` for null, arrays, and objects.
fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Numeric coercion accepting both JSON numbers and numeric strings.
fn value_to_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn value_to_year(value: &Value) -> Option<i32> {
    value_to_f64(value).map(|f| f as i32)
}

/// Case-insensitive key lookup; exact match wins over folded match.
fn lookup_ci<'a>(map: &'a serde_json::Map<String, Value>, key: &str) -> Option<&'a Value> {
    if let Some(v) = map.get(key) {
        return Some(v);
    }
    map.iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(key))
        .map(|(_, v)| v)
}

fn pick(map: &serde_json::Map<String, Value>, candidates: &[&str]) -> Option<String> {
    candidates
        .iter()
        .filter_map(|key| lookup_ci(map, key))
        .find_map(value_to_string)
}

fn pick_f64(map: &serde_json::Map<String, Value>, candidates: &[&str]) -> Option<f64> {
    candidates
        .iter()
        .filter_map(|key| lookup_ci(map, key))
        .find_map(value_to_f64)
}

/// Map one raw row into a canonical record. Input that is not a well-formed
/// mapping yields an all-`None` record with only provenance fields set;
/// this function never fails.
pub fn normalize(raw: &Value, kind: SourceKind, retrieved_at_ms: u64) -> CanonicalRecord {
    let Some(map) = raw.as_object() else {
        return CanonicalRecord::empty(kind, retrieved_at_ms);
    };

    let table = key_table(kind);
    let mut record = CanonicalRecord::empty(kind, retrieved_at_ms);
    record.entity_name = pick(map, table.entity_name);
    record.location = pick(map, table.location);
    record.reference_id = pick(map, table.reference_id);
    record.effective_period = pick(map, table.effective_period);
    record.subject = pick(map, table.subject);
    record.status = pick(map, table.status);

    let consumed: Vec<&&str> = table
        .entity_name
        .iter()
        .chain(table.location)
        .chain(table.reference_id)
        .chain(table.effective_period)
        .chain(table.subject)
        .chain(table.status)
        .collect();
    for (key, value) in map {
        let mapped = consumed.iter().any(|c| c.eq_ignore_ascii_case(key));
        if !mapped {
            record.extras.insert(key.clone(), value.clone());
        }
    }

    record
}

/// Batch variant: normalizes every row, preserving order.
pub fn normalize_all(rows: &[Value], kind: SourceKind, retrieved_at_ms: u64) -> Vec<CanonicalRecord> {
    rows.iter()
        .map(|raw| normalize(raw, kind, retrieved_at_ms))
        .collect()
}

const RENEWABLES_COUNTRY_KEYS: &[&str] = &["country", "geo", "member_state"];
const RENEWABLES_SHARE_KEYS: &[&str] = &[
    "share_value",
    "renewable_share",
    "renewable_energy_share_2021_proxy",
    "renewable_energy_share_2021",
];
const RENEWABLES_PRIOR_KEYS: &[&str] = &[
    "prior_share_value",
    "renewable_energy_share_2020",
];
const RENEWABLES_TARGET_KEYS: &[&str] = &["target_value", "target_2020", "target"];

/// Parse a loose renewables row; `None` when no country key is present.
pub fn parse_renewables_row(raw: &Value) -> Option<CountryRenewablesRow> {
    let map = raw.as_object()?;
    let country = pick(map, RENEWABLES_COUNTRY_KEYS)?;
    Some(CountryRenewablesRow {
        country,
        share_value: pick_f64(map, RENEWABLES_SHARE_KEYS),
        prior_share_value: pick_f64(map, RENEWABLES_PRIOR_KEYS),
        target_value: pick_f64(map, RENEWABLES_TARGET_KEYS),
    })
}

/// Pollutant-proxy metric keys of the EEA industrial-pollution series, with
/// the alternate spellings seen in dataset exports.
pub const POLLUTION_METRIC_KEYS: &[(&str, &[&str])] = &[
    ("cd_hg_ni_pb", &["cd_hg_ni_pb", "cd, hg, ni, pb", "heavy_metals"]),
    ("total_n", &["total_n", "total n", "nitrogen"]),
    ("total_p", &["total_p", "total p", "phosphorus"]),
    ("toc", &["toc", "total_organic_carbon"]),
];

/// Parse one year of the industrial-pollution series. Every canonical
/// metric key is present in the output, `None` when the source lacks it.
pub fn parse_pollution_point(raw: &Value) -> Option<PollutionSeriesPoint> {
    let map = raw.as_object()?;
    let year = lookup_ci(map, "year").and_then(value_to_year)?;
    let mut metric_values = std::collections::BTreeMap::new();
    for (canonical, candidates) in POLLUTION_METRIC_KEYS {
        let value = candidates
            .iter()
            .filter_map(|key| lookup_ci(map, key))
            .find_map(value_to_f64);
        metric_values.insert((*canonical).to_string(), value);
    }
    Some(PollutionSeriesPoint { year, metric_values })
}

/// Parse a best-practice policy entry; requires country, typology, and
/// scheme fields in some spelling.
pub fn parse_policy_row(raw: &Value) -> Option<PolicyRow> {
    let map = raw.as_object()?;
    let country = pick(map, &["country"])?;
    let typology = pick(map, &["typology", "incentive_type"])?;
    let scheme = pick(map, &["scheme", "voluntary_scheme", "voluntary_scheme_addressed"])?;
    Some(PolicyRow {
        country,
        typology,
        scheme,
    })
}

/// Parse an EDGAR series row into a `(year, value)` pair.
pub fn parse_year_value(raw: &Value) -> Option<(i32, f64)> {
    let map = raw.as_object()?;
    let year = lookup_ci(map, "year").and_then(value_to_year)?;
    let value = lookup_ci(map, "value").and_then(value_to_f64)?;
    Some((year, value))
}
