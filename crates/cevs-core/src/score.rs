//! Deterministic CEVS component math: fixed weights, caps, and clamps.
//! All functions here are pure; fetching and degradation policy live in the
//! engine crate.

use crate::record::{CanonicalRecord, CountryRenewablesRow, PollutionSeriesPoint, PolicyRow};
use crate::trend::{compute_trend, metric_series};
use crate::country;

pub const BASE_SCORE: f64 = 50.0;
pub const ISO_CERT_BONUS: f64 = 30.0;
pub const EPA_PENALTY_PER_MATCH: f64 = 2.5;
pub const EPA_PENALTY_CAP: f64 = 30.0;
pub const EEA_PRESENCE_BONUS: f64 = 5.0;
pub const RENEWABLES_BONUS_CAP: f64 = 20.0;
pub const POLLUTION_PENALTY_CAP: f64 = 15.0;
pub const POLICY_BONUS_CAP: f64 = 3.0;

/// Trailing window length for all pollution trend computations.
pub const TREND_WINDOW: usize = 3;

/// Weighted pollutant-proxy metrics of the EEA industrial-pollution path.
pub const EEA_METRIC_WEIGHTS: &[(&str, f64)] = &[
    ("cd_hg_ni_pb", 6.0),
    ("total_n", 4.0),
    ("total_p", 4.0),
    ("toc", 3.0),
];

/// Weighted pollutants of the EDGAR country-series path.
pub const EDGAR_POLLUTANT_WEIGHTS: &[(&str, f64)] = &[("PM2.5", 8.0), ("NOx", 7.0)];

/// Typologies of policy incentives that qualify for the policy bonus.
/// Matching is case-insensitive containment against the entry's typology.
pub const POLICY_TYPOLOGY_ALLOW: &[&str] = &[
    "fast-track permitting",
    "fast track permitting",
    "reduced inspection",
    "reduced reporting",
    "reduced monitoring",
];

const POLICY_SCHEME_MARKER: &str = "iso 14001";

/// Case-insensitive substring match of a company name against a record's
/// normalized entity name.
pub fn company_matches(record: &CanonicalRecord, company: &str) -> bool {
    let needle = company.trim().to_lowercase();
    if needle.is_empty() {
        return false;
    }
    record
        .entity_name
        .as_deref()
        .is_some_and(|name| name.to_lowercase().contains(&needle))
}

pub fn iso_bonus(has_certification: bool) -> f64 {
    if has_certification {
        ISO_CERT_BONUS
    } else {
        0.0
    }
}

/// Positive penalty magnitude for EPA emission-record matches, capped.
pub fn epa_penalty(match_count: usize) -> f64 {
    (match_count as f64 * EPA_PENALTY_PER_MATCH).min(EPA_PENALTY_CAP)
}

/// Coarse presence signal: flat bonus when any indicator rows exist.
pub fn eea_presence_bonus(has_rows: bool) -> f64 {
    if has_rows {
        EEA_PRESENCE_BONUS
    } else {
        0.0
    }
}

/// Renewables bonus from a country's share versus its target and versus the
/// EU aggregate. Both sub-terms are zero-floored independently before
/// weighting; underperformance on one axis never offsets the other.
pub fn renewables_bonus(share: f64, target: Option<f64>, eu_share: Option<f64>) -> f64 {
    let target = target.unwrap_or(0.0);
    let eu_share = eu_share.unwrap_or(0.0);
    let vs_target = (share - target).max(0.0) * 0.5;
    let vs_eu = (share - eu_share).max(0.0) * 0.2;
    (vs_target + vs_eu).min(RENEWABLES_BONUS_CAP)
}

/// Pollution penalty from the EEA industrial-pollution series: for each
/// weighted metric with an increasing trailing-window trend, add
/// `weight * min(max(slope / 10, 0), 1)`. Capped.
pub fn eea_pollution_penalty(points: &[PollutionSeriesPoint]) -> f64 {
    let mut accumulator = 0.0;
    for (metric, weight) in EEA_METRIC_WEIGHTS {
        let series = metric_series(points, metric);
        let trend = compute_trend(metric, &series, TREND_WINDOW);
        if trend.increasing {
            accumulator += weight * (trend.slope / 10.0).clamp(0.0, 1.0);
        }
    }
    accumulator.min(POLLUTION_PENALTY_CAP)
}

/// One pollutant's country series on the EDGAR path.
#[derive(Debug, Clone)]
pub struct EdgarPollutantSeries {
    pub pollutant: String,
    pub weight: f64,
    pub series: Vec<(i32, f64)>,
}

/// Pollution penalty from EDGAR country series: for each pollutant with an
/// increasing trend, relative intensity is the slope scaled by the window's
/// end value, clamped to [0, 1]. Capped.
pub fn edgar_pollution_penalty(series: &[EdgarPollutantSeries]) -> f64 {
    let mut accumulator = 0.0;
    for entry in series {
        let trend = compute_trend(&entry.pollutant, &entry.series, TREND_WINDOW);
        if !trend.increasing {
            continue;
        }
        let end_value = entry.series.last().map_or(0.0, |(_, value)| *value);
        let intensity = (trend.slope / end_value.abs().max(1.0)).clamp(0.0, 1.0);
        accumulator += entry.weight * intensity;
    }
    accumulator.min(POLLUTION_PENALTY_CAP)
}

/// Count best-practice entries that qualify a country for the policy bonus:
/// same country, scheme referencing ISO 14001, typology in the allow-list.
pub fn policy_match_count(rows: &[PolicyRow], country: &str) -> usize {
    rows.iter()
        .filter(|row| country::same_country(&row.country, country))
        .filter(|row| row.scheme.to_lowercase().contains(POLICY_SCHEME_MARKER))
        .filter(|row| {
            let typology = row.typology.to_lowercase();
            POLICY_TYPOLOGY_ALLOW
                .iter()
                .any(|allowed| typology.contains(allowed))
        })
        .count()
}

pub fn policy_bonus(match_count: usize) -> f64 {
    (match_count as f64).min(POLICY_BONUS_CAP)
}

/// Find a country's renewables row by canonical country identity.
pub fn find_renewables_row<'a>(
    rows: &'a [CountryRenewablesRow],
    country: &str,
) -> Option<&'a CountryRenewablesRow> {
    rows.iter()
        .find(|row| country::same_country(&row.country, country))
}

/// Find the EU-aggregate renewables row, if the snapshot carries one.
pub fn find_eu_row(rows: &[CountryRenewablesRow]) -> Option<&CountryRenewablesRow> {
    rows.iter()
        .find(|row| country::canonicalize(&row.country) == "european_union")
}

/// Round to two decimals for presentation; component math stays full
/// precision until this final step.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{ScoreComponents, SourceKind};
    use std::collections::BTreeMap;

    fn named_record(name: &str) -> CanonicalRecord {
        let mut record = CanonicalRecord::empty(SourceKind::Epa, 0);
        record.entity_name = Some(name.to_string());
        record
    }

    #[test]
    fn company_match_is_case_insensitive_substring() {
        let record = named_record("PT. Semen Indonesia (Persero) Tbk");
        assert!(company_matches(&record, "semen indonesia"));
        assert!(company_matches(&record, "PT. Semen"));
        assert!(!company_matches(&record, "Cement Corp"));
        assert!(!company_matches(&record, "   "));
    }

    #[test]
    fn epa_penalty_caps_at_thirty() {
        assert_eq!(epa_penalty(0), 0.0);
        assert_eq!(epa_penalty(4), 10.0);
        assert_eq!(epa_penalty(12), 30.0);
        assert_eq!(epa_penalty(500), 30.0);
    }

    #[test]
    fn renewables_bonus_matches_sweden_scenario() {
        // share 60, target 49, EU average 38 -> min(20, 5.5 + 4.4) = 9.9
        let bonus = renewables_bonus(60.0, Some(49.0), Some(38.0));
        assert!((bonus - 9.9).abs() < 1e-9);
    }

    #[test]
    fn renewables_subterms_are_independently_floored() {
        // Below target but above EU average: only the EU term contributes.
        let bonus = renewables_bonus(40.0, Some(49.0), Some(30.0));
        assert!((bonus - 2.0).abs() < 1e-9);
        // Below both: zero, never negative.
        assert_eq!(renewables_bonus(10.0, Some(49.0), Some(38.0)), 0.0);
    }

    #[test]
    fn renewables_bonus_caps_at_twenty() {
        let bonus = renewables_bonus(90.0, Some(10.0), Some(10.0));
        assert_eq!(bonus, RENEWABLES_BONUS_CAP);
    }

    #[test]
    fn missing_target_and_eu_default_to_zero() {
        let bonus = renewables_bonus(20.0, None, None);
        // 20*0.5 + 20*0.2 = 14
        assert!((bonus - 14.0).abs() < 1e-9);
    }

    fn pollution_point(year: i32, metric: &str, value: f64) -> PollutionSeriesPoint {
        let mut metric_values = BTreeMap::new();
        metric_values.insert(metric.to_string(), Some(value));
        PollutionSeriesPoint { year, metric_values }
    }

    #[test]
    fn eea_penalty_counts_only_increasing_metrics() {
        let points = vec![
            pollution_point(2019, "total_n", 1.0),
            pollution_point(2020, "total_n", 3.0),
            pollution_point(2021, "total_n", 6.0),
        ];
        // slope 5 over window -> 4.0 * min(5/10, 1) = 2.0
        let penalty = eea_pollution_penalty(&points);
        assert!((penalty - 2.0).abs() < 1e-9);
    }

    #[test]
    fn eea_penalty_is_capped() {
        let mut points = Vec::new();
        for (offset, year) in (2019..=2021).enumerate() {
            let mut metric_values = BTreeMap::new();
            for (metric, _) in EEA_METRIC_WEIGHTS {
                metric_values.insert((*metric).to_string(), Some(offset as f64 * 100.0));
            }
            points.push(PollutionSeriesPoint { year, metric_values });
        }
        // Every metric saturates its unit intensity: 6+4+4+3 = 17, capped.
        assert_eq!(eea_pollution_penalty(&points), POLLUTION_PENALTY_CAP);
    }

    #[test]
    fn edgar_intensity_scales_by_end_value() {
        let series = vec![EdgarPollutantSeries {
            pollutant: "PM2.5".to_string(),
            weight: 8.0,
            series: vec![(2018, 45.0), (2019, 47.0), (2020, 50.0)],
        }];
        // slope 5, end 50 -> intensity 0.1 -> contribution 0.8
        let penalty = edgar_pollution_penalty(&series);
        assert!((penalty - 0.8).abs() < 1e-9);
    }

    #[test]
    fn edgar_decreasing_series_contributes_nothing() {
        let series = vec![EdgarPollutantSeries {
            pollutant: "NOx".to_string(),
            weight: 7.0,
            series: vec![(2018, 50.0), (2019, 40.0), (2020, 30.0)],
        }];
        assert_eq!(edgar_pollution_penalty(&series), 0.0);
    }

    fn policy_row(country: &str, typology: &str, scheme: &str) -> PolicyRow {
        PolicyRow {
            country: country.to_string(),
            typology: typology.to_string(),
            scheme: scheme.to_string(),
        }
    }

    #[test]
    fn policy_matching_requires_scheme_and_typology() {
        let rows = vec![
            policy_row("Sweden", "Fast-track permitting", "ISO 14001 / EMAS"),
            policy_row("Sweden", "Reduced inspection frequency", "ISO 14001"),
            policy_row("Sweden", "Tax deduction", "ISO 14001"),
            policy_row("Germany", "Fast-track permitting", "ISO 14001"),
            policy_row("Sweden", "Fast-track permitting", "EMAS only"),
        ];
        assert_eq!(policy_match_count(&rows, "Sweden"), 2);
        assert_eq!(policy_match_count(&rows, "SE"), 2);
        assert_eq!(policy_match_count(&rows, "Norway"), 0);
    }

    #[test]
    fn policy_bonus_caps_at_three() {
        assert_eq!(policy_bonus(0), 0.0);
        assert_eq!(policy_bonus(2), 2.0);
        assert_eq!(policy_bonus(7), 3.0);
    }

    #[test]
    fn components_total_is_clamped_sum() {
        let components = ScoreComponents {
            base: BASE_SCORE,
            iso_bonus: 30.0,
            epa_penalty: -5.0,
            eea_bonus: 5.0,
            renewables_bonus: 9.9,
            pollution_penalty: -0.8,
            policy_bonus: 2.0,
        };
        let expected = 50.0 + 30.0 - 5.0 + 5.0 + 9.9 - 0.8 + 2.0;
        assert!((components.total() - expected).abs() < 0.01);

        let floor = ScoreComponents {
            base: BASE_SCORE,
            iso_bonus: 0.0,
            epa_penalty: -30.0,
            eea_bonus: 0.0,
            renewables_bonus: 0.0,
            pollution_penalty: -15.0,
            policy_bonus: 0.0,
        };
        assert_eq!(floor.total(), 5.0);
    }

    #[test]
    fn component_bounds_hold_at_extremes() {
        assert!(iso_bonus(true) <= 30.0);
        assert!(epa_penalty(usize::MAX / 4) <= EPA_PENALTY_CAP);
        assert!(renewables_bonus(f64::MAX / 4.0, None, None) <= RENEWABLES_BONUS_CAP);
        assert!(policy_bonus(usize::MAX / 4) <= POLICY_BONUS_CAP);
    }
}
