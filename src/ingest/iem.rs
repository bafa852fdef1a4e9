//! IEM (Iowa Environmental Mesonet) rainfall client
//!
//! Retrieves ASOS (Automated Surface Observing System) precipitation
//! reports from the Iowa State University Mesonet and sums them into a
//! trailing-window rainfall depth for a place. Each place is served by the
//! ASOS station configured for it in the place registry, or by the default
//! station when it has none.
//!
//! API Documentation: https://mesonet.agron.iastate.edu/request/download.phtml

use chrono::{DateTime, Duration, NaiveDateTime, Timelike, Utc};
use std::collections::BTreeMap;

use crate::ingest::rainfall::{validate_depth, RainfallSource};
use crate::logging::{self, DataSource};
use crate::model::{RainfallError, MM_PER_INCH};
use crate::places::PlaceRegistry;

pub const IEM_BASE_URL: &str = "https://mesonet.agron.iastate.edu";

/// Trailing window the landslide model was fitted on.
pub const WINDOW_HOURS: i64 = 3;

// ============================================================================
// Observation records
// ============================================================================

/// One precipitation report from the ASOS CSV endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct PrecipReport {
    pub station_id: String,
    pub timestamp: DateTime<Utc>,
    /// Precipitation since the top of the hour (inches); `None` when missing
    /// or trace.
    pub precip_1hr_in: Option<f64>,
}

// ============================================================================
// Request construction and parsing
// ============================================================================

/// Builds the ASOS download URL for `station_id` between `begin` and `end`.
pub fn build_asos_url(base_url: &str, station_id: &str, begin: DateTime<Utc>, end: DateTime<Utc>) -> String {
    format!(
        "{}/cgi-bin/request/asos.py?station={}&data=p01i&year1={}&month1={}&day1={}&hour1={}&minute1={}&year2={}&month2={}&day2={}&hour2={}&minute2={}&tz=Etc/UTC&format=onlycomma&latlon=no&elev=no&missing=null&trace=null&direct=no",
        base_url,
        station_id,
        begin.format("%Y"),
        begin.format("%m"),
        begin.format("%d"),
        begin.format("%H"),
        begin.format("%M"),
        end.format("%Y"),
        end.format("%m"),
        end.format("%d"),
        end.format("%H"),
        end.format("%M"),
    )
}

/// Parses the `station,valid,p01i` CSV body.
///
/// The header row and blank lines are skipped. A row with fewer than three
/// fields or an unparseable timestamp is an error: the endpoint never
/// produces those unless the format changed.
pub fn parse_precip_csv(csv: &str) -> Result<Vec<PrecipReport>, String> {
    let mut reports = Vec::new();

    for (i, line) in csv.lines().enumerate() {
        if i == 0 || line.trim().is_empty() {
            continue;
        }

        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        if fields.len() < 3 {
            return Err(format!("line {}: expected 3 fields, got {}", i + 1, fields.len()));
        }

        // Format: "2026-02-21 19:54"
        let timestamp = NaiveDateTime::parse_from_str(fields[1], "%Y-%m-%d %H:%M")
            .map(|dt| DateTime::from_naive_utc_and_offset(dt, Utc))
            .map_err(|e| format!("line {}: bad timestamp {:?}: {}", i + 1, fields[1], e))?;

        let precip_1hr_in = match fields[2] {
            "null" | "" | "M" | "T" => None,
            value => Some(
                value
                    .parse::<f64>()
                    .map_err(|e| format!("line {}: bad p01i {:?}: {}", i + 1, value, e))?,
            ),
        };

        reports.push(PrecipReport {
            station_id: fields[0].to_string(),
            timestamp,
            precip_1hr_in,
        });
    }

    Ok(reports)
}

// ============================================================================
// Precipitation analysis
// ============================================================================

fn top_of_hour(instant: DateTime<Utc>) -> Option<DateTime<Utc>> {
    instant
        .with_minute(0)
        .and_then(|t| t.with_second(0))
        .and_then(|t| t.with_nanosecond(0))
}

/// Per-hour precipitation totals (inches), keyed by the start of the hour.
///
/// `p01i` accumulates from the top of the hour, so the largest report in an
/// hour is that hour's total. Hours with only missing reports count as zero.
pub fn hourly_totals(reports: &[PrecipReport]) -> BTreeMap<DateTime<Utc>, f64> {
    let mut totals: BTreeMap<DateTime<Utc>, f64> = BTreeMap::new();
    for report in reports {
        let Some(hour) = top_of_hour(report.timestamp) else {
            continue;
        };
        let entry = totals.entry(hour).or_insert(0.0);
        if let Some(inches) = report.precip_1hr_in {
            *entry = entry.max(inches);
        }
    }
    totals
}

/// Precipitation that fell between `begin` and `end`, in millimetres.
///
/// Reports are expected from the top of `begin`'s hour. Whatever had already
/// accumulated in that hour by `begin` is not part of the window and is
/// taken off the first hour's total.
pub fn window_precip_mm(reports: &[PrecipReport], begin: DateTime<Utc>, end: DateTime<Utc>) -> f64 {
    let Some(first_hour) = top_of_hour(begin) else {
        return 0.0;
    };

    let in_window: Vec<PrecipReport> = reports
        .iter()
        .filter(|r| r.timestamp >= first_hour && r.timestamp <= end)
        .cloned()
        .collect();
    let mut totals = hourly_totals(&in_window);

    let before_begin: Vec<PrecipReport> = in_window
        .iter()
        .filter(|r| r.timestamp <= begin)
        .cloned()
        .collect();
    let already = hourly_totals(&before_begin).get(&first_hour).copied().unwrap_or(0.0);
    if let Some(total) = totals.get_mut(&first_hour) {
        *total = (*total - already).max(0.0);
    }

    totals.values().sum::<f64>() * MM_PER_INCH
}

// ============================================================================
// Rainfall source
// ============================================================================

/// Rainfall source backed by the IEM ASOS archive.
pub struct IemRainfall {
    client: reqwest::blocking::Client,
    registry: PlaceRegistry,
    default_station: Option<String>,
    base_url: String,
}

impl IemRainfall {
    pub fn new(client: reqwest::blocking::Client, registry: PlaceRegistry) -> Self {
        Self::with_base_url(client, registry, IEM_BASE_URL)
    }

    pub fn with_base_url(client: reqwest::blocking::Client, registry: PlaceRegistry, base_url: &str) -> Self {
        Self {
            client,
            registry,
            default_station: None,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Station used for places the registry gives no station of their own.
    pub fn with_default_station(mut self, station_id: Option<String>) -> Self {
        self.default_station = station_id;
        self
    }

    /// The station that stands in for `place_name`.
    pub fn station_for(&self, place_name: &str) -> Option<&str> {
        self.registry
            .asos_station(place_name)
            .or(self.default_station.as_deref())
    }

    /// Fetches raw reports for a station from the top of `begin`'s hour to `end`.
    pub fn fetch_precip(
        &self,
        station_id: &str,
        begin: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<PrecipReport>, RainfallError> {
        let from = top_of_hour(begin).unwrap_or(begin);
        let url = build_asos_url(&self.base_url, station_id, from, end);

        logging::debug(DataSource::Iem, Some(station_id), &format!("GET {}", url));

        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|e| RainfallError::Unreachable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(RainfallError::HttpStatus(response.status().as_u16()));
        }

        let text = response
            .text()
            .map_err(|e| RainfallError::Unreachable(e.to_string()))?;

        parse_precip_csv(&text).map_err(|reason| RainfallError::InvalidData {
            place: station_id.to_string(),
            reason,
        })
    }
}

impl RainfallSource for IemRainfall {
    fn rainfall_last_3h(&self, place_name: &str, now: DateTime<Utc>) -> Result<f64, RainfallError> {
        let station_id = self
            .station_for(place_name)
            .ok_or_else(|| RainfallError::NoStation(place_name.to_string()))?;
        if self.registry.asos_station(place_name).is_none() {
            logging::debug(
                DataSource::Iem,
                Some(place_name),
                &format!("No station registered; using default {}", station_id),
            );
        }

        let begin = now - Duration::hours(WINDOW_HOURS);
        let reports = self.fetch_precip(station_id, begin, now)?;
        if reports.is_empty() {
            return Err(RainfallError::InvalidData {
                place: place_name.to_string(),
                reason: format!("station {} reported nothing in the last {}h", station_id, WINDOW_HOURS),
            });
        }

        validate_depth(place_name, window_precip_mm(&reports, begin, now))
    }
}

// ============================================================================
// Tests
// ============================================================================
