//! The rainfall collaborator seam.

use chrono::{DateTime, Utc};

use crate::model::RainfallError;

/// Baseline 3-hour rainfall reported by the stub source, in millimetres.
pub const STUB_RAINFALL_MM: f64 = 1.5;

/// Supplies cumulative rainfall over the last 3 hours for a place.
///
/// `now` is the run's clock reading; the window ends there. Implementations
/// must return `RainfallError` rather than a made-up value when the upstream
/// is unreachable or its data is unusable.
pub trait RainfallSource {
    fn rainfall_last_3h(&self, place_name: &str, now: DateTime<Utc>) -> Result<f64, RainfallError>;
}

/// Reports the same depth for every place.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedRainfall {
    pub rainfall_mm: f64,
}

impl Default for FixedRainfall {
    fn default() -> Self {
        Self { rainfall_mm: STUB_RAINFALL_MM }
    }
}

impl RainfallSource for FixedRainfall {
    fn rainfall_last_3h(&self, place_name: &str, _now: DateTime<Utc>) -> Result<f64, RainfallError> {
        validate_depth(place_name, self.rainfall_mm)
    }
}

/// Rejects depths no rain gauge can report.
pub fn validate_depth(place_name: &str, rainfall_mm: f64) -> Result<f64, RainfallError> {
    if !rainfall_mm.is_finite() || rainfall_mm < 0.0 {
        return Err(RainfallError::InvalidData {
            place: place_name.to_string(),
            reason: format!("depth {} mm is not a non-negative number", rainfall_mm),
        });
    }
    Ok(rainfall_mm)
}
