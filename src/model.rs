//! Core data types for the landslide risk service.
//!
//! This module defines the shared domain model imported by all other modules:
//! the persisted observation row, the risk bucket, and the error enums each
//! collaborator (rainfall source, store, configuration) reports through.
//! It contains no logic beyond conversions, and no I/O.

use chrono::{DateTime, FixedOffset};
use serde::Serialize;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Unit conversion
// ---------------------------------------------------------------------------

/// Millimetres per inch, used for the `precip_inches` column.
pub const MM_PER_INCH: f64 = 25.4;

/// Converts a rainfall depth in millimetres to inches.
pub fn mm_to_inches(rainfall_mm: f64) -> f64 {
    rainfall_mm / MM_PER_INCH
}

// ---------------------------------------------------------------------------
// Risk types
// ---------------------------------------------------------------------------

/// Discretized landslide risk, in ascending order of severity.
///
/// Stored as a small integer: 0 = low, 1 = moderate, 2 = high.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
}

impl RiskLevel {
    /// Integer code written to the `risk_level` family of columns.
    pub fn as_i16(self) -> i16 {
        match self {
            RiskLevel::Low => 0,
            RiskLevel::Moderate => 1,
            RiskLevel::High => 2,
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RiskLevel::Low => write!(f, "low"),
            RiskLevel::Moderate => write!(f, "moderate"),
            RiskLevel::High => write!(f, "high"),
        }
    }
}

/// Extrapolated rainfall for a longer trailing window, with its risk bucket.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RainfallWindow {
    pub rainfall_mm: f64,
    pub risk_level: RiskLevel,
}

/// The 24-hour, 2-day and 3-day windows derived from the 3-hour baseline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ExtendedWindows {
    pub day: RainfallWindow,
    pub two_days: RainfallWindow,
    pub three_days: RainfallWindow,
}

// ---------------------------------------------------------------------------
// Observation
// ---------------------------------------------------------------------------

/// One computed risk record for one place, built once per invocation and
/// persisted as an append-only row of `precip_risk`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaceObservation {
    pub place_name: String,
    /// Registry identifier; `None` for places not in the registry.
    pub place_id: Option<String>,
    pub timestamp: DateTime<FixedOffset>,
    /// 12-hour clock label of `timestamp`, e.g. "02PM".
    pub hour: String,
    pub rainfall_mm: f64,
    pub rainfall_inches: f64,
    pub probability: f64,
    pub risk_level: RiskLevel,
    pub risk_elevated: bool,
    pub extended: ExtendedWindows,
    pub expires_at: DateTime<FixedOffset>,
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Failures of the upstream rainfall source.
#[derive(Debug, Error, PartialEq)]
pub enum RainfallError {
    /// The source could not be reached at all (DNS, connect, timeout).
    #[error("Rainfall source unreachable: {0}")]
    Unreachable(String),
    /// Non-2xx HTTP response from the source.
    #[error("HTTP error: {0}")]
    HttpStatus(u16),
    /// The response was received but could not be turned into a depth.
    #[error("Invalid rainfall data for {place}: {reason}")]
    InvalidData { place: String, reason: String },
    /// No observing station is configured for the place.
    #[error("No rainfall station configured for place: {0}")]
    NoStation(String),
}

/// Failures of the observation store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database connection failed: {0}")]
    Connect(#[source] postgres::Error),
    #[error("Database query failed: {0}")]
    Query(#[from] postgres::Error),
    #[error("Required table `{0}` is missing; apply sql/001_precip_risk.sql")]
    SchemaMissing(String),
    /// A non-database store refused a write.
    #[error("Store rejected write for {place}: {reason}")]
    Rejected { place: String, reason: String },
}

/// Failures while assembling configuration at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Required environment variable {0} is not set")]
    MissingVar(&'static str),
    #[error("Environment variable {name} has invalid value {value:?}")]
    InvalidVar { name: &'static str, value: String },
    #[error("Could not read settings file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Could not parse settings file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    #[error("Unknown rainfall source {0:?} (expected \"fixed\" or \"iem\")")]
    UnknownRainfallSource(String),
    #[error("Invalid setting {key}: {reason}")]
    InvalidSetting { key: &'static str, reason: String },
}

/// Anything that aborts an evaluation run.
#[derive(Debug, Error)]
pub enum EvalError {
    #[error(transparent)]
    Rainfall(#[from] RainfallError),
    #[error(transparent)]
    Store(#[from] StoreError),
    /// The run's expiry cannot be represented after its timestamp.
    #[error("Expiry of {0} hours is out of range")]
    ExpiryOutOfRange(i64),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
