// Copyright (c) 2026 Trusted Revenue Systems
// SPDX-License-Identifier: AGPL-3.0
//! # TRS Revenue Score
//!
//! Weighted 0–100 health score over eight business metrics, the band it falls
//! in and the per-metric drivers behind it. Used by the `revenue-clarity`
//! agent to prioritise levers.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MetricKey {
    Margin,
    Nrr,
    Churn,
    Cac,
    Payback,
    ForecastMape,
    Velocity,
    Incidents,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    HigherIsBetter,
    LowerIsBetter,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricConfig {
    pub key: MetricKey,
    pub label: &'static str,
    pub weight: f64,
    pub direction: Direction,
    pub min: f64,
    pub max: f64,
}

pub const METRIC_CONFIG: [MetricConfig; 8] = [
    MetricConfig { key: MetricKey::Margin, label: "Gross Margin", weight: 25.0, direction: Direction::HigherIsBetter, min: 0.0, max: 80.0 },
    MetricConfig { key: MetricKey::Nrr, label: "Net Revenue Retention", weight: 20.0, direction: Direction::HigherIsBetter, min: 90.0, max: 130.0 },
    MetricConfig { key: MetricKey::Churn, label: "Gross Churn", weight: 20.0, direction: Direction::LowerIsBetter, min: 0.0, max: 12.0 },
    MetricConfig { key: MetricKey::Cac, label: "CAC Efficiency", weight: 15.0, direction: Direction::LowerIsBetter, min: 2.0, max: 6.0 },
    MetricConfig { key: MetricKey::Payback, label: "Payback Period", weight: 10.0, direction: Direction::LowerIsBetter, min: 6.0, max: 18.0 },
    MetricConfig { key: MetricKey::ForecastMape, label: "Forecast Accuracy", weight: 10.0, direction: Direction::LowerIsBetter, min: 5.0, max: 25.0 },
    MetricConfig { key: MetricKey::Velocity, label: "Sales Velocity", weight: 0.0, direction: Direction::HigherIsBetter, min: 0.5, max: 2.5 },
    MetricConfig { key: MetricKey::Incidents, label: "Operational Incidents", weight: 0.0, direction: Direction::LowerIsBetter, min: 0.0, max: 6.0 },
];

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrsScoreInputs {
    pub cac: f64,
    pub nrr: f64,
    pub churn: f64,
    pub payback: f64,
    pub margin: f64,
    pub forecast_mape: f64,
    pub velocity: f64,
    pub incidents: f64,
}

impl TrsScoreInputs {
    pub fn value(&self, key: MetricKey) -> f64 {
        match key {
            MetricKey::Margin => self.margin,
            MetricKey::Nrr => self.nrr,
            MetricKey::Churn => self.churn,
            MetricKey::Cac => self.cac,
            MetricKey::Payback => self.payback,
            MetricKey::ForecastMape => self.forecast_mape,
            MetricKey::Velocity => self.velocity,
            MetricKey::Incidents => self.incidents,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TrsScoreBand {
    Red,
    Yellow,
    Green,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrsScoreDriver {
    pub name: String,
    pub delta: f64,
    #[serde(skip)]
    pub key: Option<MetricKey>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrsScoreResult {
    pub score: f64,
    pub band: TrsScoreBand,
    pub drivers: Vec<TrsScoreDriver>,
}

fn clamp(value: f64, min: f64, max: f64) -> f64 {
    if min == max {
        return min;
    }
    value.max(min).min(max)
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Maps a raw metric into 0–100 where 100 is best.
pub fn normalize_value(value: f64, config: &MetricConfig) -> f64 {
    if config.min == config.max {
        return 50.0;
    }
    let clamped = clamp(value, config.min, config.max);
    let ratio = (clamped - config.min) / (config.max - config.min);
    let normalized = match config.direction {
        Direction::HigherIsBetter => ratio * 100.0,
        Direction::LowerIsBetter => (1.0 - ratio) * 100.0,
    };
    clamp(round_to(normalized, 2), 0.0, 100.0)
}

pub fn determine_band(score: f64) -> TrsScoreBand {
    if score >= 70.0 {
        TrsScoreBand::Green
    } else if score >= 60.0 {
        TrsScoreBand::Yellow
    } else {
        TrsScoreBand::Red
    }
}

pub fn metric_config(key: MetricKey) -> &'static MetricConfig {
    METRIC_CONFIG
        .iter()
        .find(|config| config.key == key)
        .unwrap_or(&METRIC_CONFIG[0])
}

pub fn compute_trs_score(inputs: &TrsScoreInputs) -> TrsScoreResult {
    let total_weight: f64 = METRIC_CONFIG.iter().map(|c| c.weight).sum();

    let normalized: Vec<(&MetricConfig, f64)> = METRIC_CONFIG
        .iter()
        .map(|config| (config, normalize_value(inputs.value(config.key), config)))
        .collect();

    let weighted_sum: f64 = normalized
        .iter()
        .filter(|(config, _)| config.weight != 0.0)
        .map(|(config, value)| value * config.weight)
        .sum();

    let score = if total_weight > 0.0 {
        round_to(weighted_sum / total_weight, 1)
    } else {
        0.0
    };

    let mut drivers: Vec<TrsScoreDriver> = normalized
        .iter()
        .map(|(config, value)| TrsScoreDriver {
            name: config.label.to_string(),
            delta: round_to(value - 50.0, 1),
            key: Some(config.key),
        })
        .collect();

    drivers.sort_by(|a, b| {
        b.delta
            .abs()
            .total_cmp(&a.delta.abs())
            .then_with(|| a.name.cmp(&b.name))
    });

    TrsScoreResult {
        score,
        band: determine_band(score),
        drivers,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn healthy() -> TrsScoreInputs {
        TrsScoreInputs {
            cac: 2.0,
            nrr: 130.0,
            churn: 0.0,
            payback: 6.0,
            margin: 80.0,
            forecast_mape: 5.0,
            velocity: 2.5,
            incidents: 0.0,
        }
    }

    #[test]
    fn test_best_case_scores_100_green() {
        let result = compute_trs_score(&healthy());
        assert_eq!(result.score, 100.0);
        assert_eq!(result.band, TrsScoreBand::Green);
    }

    #[test]
    fn test_worst_case_scores_zero_red() {
        let inputs = TrsScoreInputs {
            cac: 6.0,
            nrr: 90.0,
            churn: 12.0,
            payback: 18.0,
            margin: 0.0,
            forecast_mape: 25.0,
            velocity: 0.5,
            incidents: 6.0,
        };
        let result = compute_trs_score(&inputs);
        assert_eq!(result.score, 0.0);
        assert_eq!(result.band, TrsScoreBand::Red);
    }

    #[test]
    fn test_values_outside_bounds_are_clamped() {
        let margin = metric_config(MetricKey::Margin);
        assert_eq!(normalize_value(120.0, margin), 100.0);
        assert_eq!(normalize_value(-5.0, margin), 0.0);

        let churn = metric_config(MetricKey::Churn);
        assert_eq!(normalize_value(3.0, churn), 75.0);
    }

    #[test]
    fn test_band_thresholds() {
        assert_eq!(determine_band(70.0), TrsScoreBand::Green);
        assert_eq!(determine_band(69.9), TrsScoreBand::Yellow);
        assert_eq!(determine_band(60.0), TrsScoreBand::Yellow);
        assert_eq!(determine_band(59.9), TrsScoreBand::Red);
    }

    #[test]
    fn test_drivers_sorted_by_magnitude_then_name() {
        let mut inputs = healthy();
        // margin 40 -> normalized 50 -> delta 0
        inputs.margin = 40.0;
        // churn 9 -> normalized 25 -> delta -25
        inputs.churn = 9.0;
        let result = compute_trs_score(&inputs);

        assert_eq!(result.drivers.len(), 8);
        assert_eq!(result.drivers.last().unwrap().name, "Gross Margin");
        // every remaining metric sits at +/-50, ties broken by name
        assert_eq!(result.drivers[0].name, "CAC Efficiency");
        assert_eq!(result.drivers[0].delta, 50.0);
        let churn = result.drivers.iter().find(|d| d.name == "Gross Churn").unwrap();
        assert_eq!(churn.delta, -25.0);
    }
}
