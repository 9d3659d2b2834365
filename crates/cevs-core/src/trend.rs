//! Slope-based trend over a bounded trailing window of time-series points.
//!
//! The slope is a two-point delta between the first and last value of the
//! trailing window, not a regression. Upstream consumers and fixtures are
//! built against this exact semantics, so it must not be "improved".

use serde::{Deserialize, Serialize};

use crate::record::PollutionSeriesPoint;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendResult {
    pub subject: String,
    pub slope: f64,
    pub increasing: bool,
    pub window_years: Vec<i32>,
}

impl TrendResult {
    fn flat(subject: &str) -> Self {
        Self {
            subject: subject.to_string(),
            slope: 0.0,
            increasing: false,
            window_years: Vec::new(),
        }
    }
}

/// Compute the trailing-window trend for one subject.
///
/// Fewer than two points yields slope 0, not increasing, empty window.
/// Otherwise the trailing `window` points are selected (all points when the
/// series is shorter) and the slope is `last - first` within that window.
pub fn compute_trend(subject: &str, series: &[(i32, f64)], window: usize) -> TrendResult {
    if series.len() < 2 {
        return TrendResult::flat(subject);
    }

    let start = series.len().saturating_sub(window);
    let selected = &series[start..];
    let (slope, increasing) = match (selected.first(), selected.last()) {
        (Some((_, first)), Some((_, last))) => {
            let slope = last - first;
            (slope, slope > 0.0)
        }
        _ => (0.0, false),
    };

    TrendResult {
        subject: subject.to_string(),
        slope,
        increasing,
        window_years: selected.iter().map(|(year, _)| *year).collect(),
    }
}

/// Extract one metric's `(year, value)` series from pollution points,
/// skipping years where the metric is absent. Points are expected in year
/// order; the order is preserved.
pub fn metric_series(points: &[PollutionSeriesPoint], metric: &str) -> Vec<(i32, f64)> {
    points
        .iter()
        .filter_map(|point| {
            point
                .metric_values
                .get(metric)
                .copied()
                .flatten()
                .map(|value| (point.year, value))
        })
        .collect()
}
