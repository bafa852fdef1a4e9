//! Landslide probability model and risk bucketing.
//!
//! A logistic regression of landslide occurrence on 3-hour cumulative
//! rainfall. Everything here is pure: no clock, no I/O, no failure modes.

use serde::Deserialize;

use crate::model::{ExtendedWindows, RainfallWindow, RiskLevel};

// ---------------------------------------------------------------------------
// Model constants
// ---------------------------------------------------------------------------

pub const DEFAULT_INTERCEPT: f64 = -13.7821;
pub const DEFAULT_COEFFICIENT: f64 = 0.4294;

/// Probability at or below which risk is low.
pub const LOW_RISK_MAX_PROBABILITY: f64 = 0.01;

/// Probability at or below which risk is moderate; anything above is high.
pub const MODERATE_RISK_MAX_PROBABILITY: f64 = 0.7;

/// Multipliers applied to the 3-hour baseline for the 24-hour, 2-day and
/// 3-day windows until real longer-window rainfall is fetched.
pub const DAY_WINDOW_FACTOR: f64 = 8.0;
pub const TWO_DAY_WINDOW_FACTOR: f64 = 16.0;
pub const THREE_DAY_WINDOW_FACTOR: f64 = 24.0;

// ---------------------------------------------------------------------------
// Logistic model
// ---------------------------------------------------------------------------

/// Calibration of the logistic model `1 / (1 + exp(-(a + b·x)))`.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct LogisticModel {
    pub intercept: f64,
    pub coefficient: f64,
}

impl Default for LogisticModel {
    fn default() -> Self {
        Self {
            intercept: DEFAULT_INTERCEPT,
            coefficient: DEFAULT_COEFFICIENT,
        }
    }
}

impl LogisticModel {
    /// Landslide probability for `rainfall_mm` of rain in the last 3 hours.
    pub fn probability(&self, rainfall_mm: f64) -> f64 {
        let z = self.intercept + self.coefficient * rainfall_mm;
        1.0 / (1.0 + (-z).exp())
    }

    pub fn risk_level_for_rainfall(&self, rainfall_mm: f64) -> RiskLevel {
        risk_level(self.probability(rainfall_mm))
    }

    /// Extrapolates the longer trailing windows from the 3-hour baseline.
    pub fn extended_windows(&self, rainfall_3h_mm: f64) -> ExtendedWindows {
        let window = |factor: f64| {
            let rainfall_mm = rainfall_3h_mm * factor;
            RainfallWindow {
                rainfall_mm,
                risk_level: self.risk_level_for_rainfall(rainfall_mm),
            }
        };
        ExtendedWindows {
            day: window(DAY_WINDOW_FACTOR),
            two_days: window(TWO_DAY_WINDOW_FACTOR),
            three_days: window(THREE_DAY_WINDOW_FACTOR),
        }
    }
}

/// Probability under the default calibration.
pub fn probability(rainfall_mm: f64) -> f64 {
    LogisticModel::default().probability(rainfall_mm)
}

/// Buckets a probability:
///   p <= 0.01        → Low
///   0.01 < p <= 0.7  → Moderate
///   p > 0.7          → High
pub fn risk_level(probability: f64) -> RiskLevel {
    if probability <= LOW_RISK_MAX_PROBABILITY {
        RiskLevel::Low
    } else if probability <= MODERATE_RISK_MAX_PROBABILITY {
        RiskLevel::Moderate
    } else {
        RiskLevel::High
    }
}

/// Risk bucket under the default calibration.
pub fn risk_level_for_rainfall(rainfall_mm: f64) -> RiskLevel {
    LogisticModel::default().risk_level_for_rainfall(rainfall_mm)
}

/// `true` only when a previous probability exists and the current one is
/// strictly greater.
pub fn elevated(previous_probability: Option<f64>, current_probability: f64) -> bool {
    previous_probability.is_some_and(|previous| current_probability > previous)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // --- probability --------------------------------------------------------

    #[test]
    fn test_probability_is_strictly_inside_unit_interval() {
        for mm in [0.0, 0.5, 1.5, 10.0, 32.1, 40.0, 60.0] {
            let p = probability(mm);
            assert!(p > 0.0 && p < 1.0, "probability({}) = {} escaped (0,1)", mm, p);
        }
    }

    #[test]
    fn test_probability_strictly_increases_with_rainfall() {
        let mut previous = probability(0.0);
        for step in 1..=120 {
            let mm = step as f64 * 0.5;
            let current = probability(mm);
            assert!(current > previous, "not increasing at {} mm", mm);
            previous = current;
        }
    }

    #[test]
    fn test_probability_is_one_half_near_midpoint() {
        let p = probability(32.1);
        assert!((p - 0.5).abs() < 0.01, "probability(32.1) = {}", p);

        // The fitted midpoint is -intercept / coefficient.
        let midpoint = -DEFAULT_INTERCEPT / DEFAULT_COEFFICIENT;
        assert!((probability(midpoint) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_probability_of_stub_rainfall_is_tiny() {
        // z = -13.7821 + 0.4294 * 1.5 = -13.1380
        let p = probability(1.5);
        assert!((p - 1.97e-6).abs() < 1e-7, "probability(1.5) = {}", p);
    }

    #[test]
    fn test_custom_calibration_shifts_midpoint() {
        let model = LogisticModel { intercept: -5.0, coefficient: 0.5 };
        assert!((model.probability(10.0) - 0.5).abs() < 1e-12);
        assert!(model.probability(10.0) > LogisticModel::default().probability(10.0));
    }

    // --- risk_level ---------------------------------------------------------

    #[test]
    fn test_risk_level_boundaries_are_inclusive_upper() {
        assert_eq!(risk_level(0.0), RiskLevel::Low);
        assert_eq!(risk_level(0.01), RiskLevel::Low);
        assert_eq!(risk_level(0.010_001), RiskLevel::Moderate);
        assert_eq!(risk_level(0.7), RiskLevel::Moderate);
        assert_eq!(risk_level(0.700_001), RiskLevel::High);
        assert_eq!(risk_level(1.0), RiskLevel::High);
    }

    #[test]
    fn test_risk_level_for_rainfall_agrees_with_probability_buckets() {
        for step in 0..=160 {
            let mm = step as f64 * 0.5;
            let p = probability(mm);
            let expected = if p <= 0.01 {
                RiskLevel::Low
            } else if p > 0.7 {
                RiskLevel::High
            } else {
                RiskLevel::Moderate
            };
            assert_eq!(risk_level_for_rainfall(mm), expected, "mismatch at {} mm", mm);
        }
    }

    #[test]
    fn test_rainfall_bands() {
        // Low below roughly 21.4 mm, high above roughly 34.1 mm.
        assert_eq!(risk_level_for_rainfall(1.5), RiskLevel::Low);
        assert_eq!(risk_level_for_rainfall(21.0), RiskLevel::Low);
        assert_eq!(risk_level_for_rainfall(25.0), RiskLevel::Moderate);
        assert_eq!(risk_level_for_rainfall(34.0), RiskLevel::Moderate);
        assert_eq!(risk_level_for_rainfall(36.0), RiskLevel::High);
    }

    // --- elevated -----------------------------------------------------------

    #[test]
    fn test_no_previous_record_is_never_elevated() {
        assert!(!elevated(None, 0.0));
        assert!(!elevated(None, 0.99));
    }

    #[test]
    fn test_elevated_requires_strict_increase() {
        assert!(elevated(Some(0.2), 0.3));
        assert!(!elevated(Some(0.2), 0.1));
        assert!(!elevated(Some(0.2), 0.2));
    }

    // --- extended windows ---------------------------------------------------

    #[test]
    fn test_extended_windows_scale_baseline() {
        let windows = LogisticModel::default().extended_windows(1.5);
        assert_eq!(windows.day.rainfall_mm, 12.0);
        assert_eq!(windows.two_days.rainfall_mm, 24.0);
        assert_eq!(windows.three_days.rainfall_mm, 36.0);
        assert_eq!(windows.day.risk_level, RiskLevel::Low);
        assert_eq!(windows.two_days.risk_level, RiskLevel::Moderate);
        assert_eq!(windows.three_days.risk_level, RiskLevel::High);
    }
}
