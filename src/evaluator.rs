//! Per-invocation risk evaluation.
//!
//! `RiskEvaluator` turns a list of place names into stored observations:
//! fetch rainfall, score it, compare against the place's previous record,
//! and write one row per place.
//!
//! All history reads happen before any write, so places evaluated in the
//! same run only ever compare against rows written by earlier runs. The
//! rows are then written as one batch that either lands completely or not
//! at all.

use chrono::{DateTime, FixedOffset};
use serde_json::Value;

use crate::clock::{Clock, RunTimes, SystemClock};
use crate::config::Settings;
use crate::db::RiskStore;
use crate::event::{InvocationEvent, InvocationResponse};
use crate::ingest::RainfallSource;
use crate::logging::{self, DataSource};
use crate::model::{mm_to_inches, EvalError, PlaceObservation};
use crate::places::PlaceRegistry;
use crate::risk::{elevated, risk_level, LogisticModel};

/// Outcome of one successful run.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationRun {
    pub places_processed: Vec<String>,
    pub timestamp: DateTime<FixedOffset>,
    pub observations: Vec<PlaceObservation>,
}

pub struct RiskEvaluator {
    model: LogisticModel,
    registry: PlaceRegistry,
    expiry_hours: i64,
    rainfall: Box<dyn RainfallSource>,
    clock: Box<dyn Clock>,
}

impl RiskEvaluator {
    pub fn new(settings: &Settings, rainfall: Box<dyn RainfallSource>) -> Self {
        Self::with_clock(settings, rainfall, Box::new(SystemClock))
    }

    pub fn with_clock(
        settings: &Settings,
        rainfall: Box<dyn RainfallSource>,
        clock: Box<dyn Clock>,
    ) -> Self {
        Self {
            model: settings.model,
            registry: settings.registry(),
            expiry_hours: settings.run.expiry_hours,
            rainfall,
            clock,
        }
    }

    /// Builds the observation for one place at `times`.
    pub fn observe(
        &self,
        place_name: &str,
        times: &RunTimes,
        store: &mut dyn RiskStore,
    ) -> Result<PlaceObservation, EvalError> {
        let rainfall_mm = self.rainfall.rainfall_last_3h(place_name, times.now_utc()).inspect_err(|e| {
            logging::error(DataSource::Rainfall, Some(place_name), &e.to_string());
        })?;

        let probability = self.model.probability(rainfall_mm);
        let previous = store.latest_probability(place_name)?;

        let place_id = self.registry.place_id(place_name).map(String::from);
        if place_id.is_none() {
            logging::warn(DataSource::System, Some(place_name), "Place not in registry; place_id left empty");
        }

        let observation = PlaceObservation {
            place_name: place_name.to_string(),
            place_id,
            timestamp: times.now,
            hour: times.hour.clone(),
            rainfall_mm,
            rainfall_inches: mm_to_inches(rainfall_mm),
            probability,
            risk_level: risk_level(probability),
            risk_elevated: elevated(previous, probability),
            extended: self.model.extended_windows(rainfall_mm),
            expires_at: times.expires_at,
        };

        logging::debug(
            DataSource::Rainfall,
            Some(place_name),
            &format!(
                "{:.2} mm, p={:.6}, risk {}, elevated {}",
                rainfall_mm, probability, observation.risk_level, observation.risk_elevated
            ),
        );

        Ok(observation)
    }

    /// Evaluates every place and records one row for each.
    ///
    /// Any rainfall or store failure aborts the run; nothing is written
    /// unless every place was evaluated and the whole batch committed. The
    /// run summary is logged either way.
    pub fn evaluate_and_record(
        &self,
        places: &[String],
        store: &mut dyn RiskStore,
    ) -> Result<EvaluationRun, EvalError> {
        let outcome = RunTimes::at(self.clock.as_ref(), self.expiry_hours)
            .ok_or(EvalError::ExpiryOutOfRange(self.expiry_hours))
            .and_then(|times| {
                let observations = self.record(places, &times, store)?;
                Ok((times, observations))
            });

        let inserted = outcome.as_ref().map_or(0, |(_, observations)| observations.len());
        logging::log_run_summary(places.len(), inserted);

        let (times, observations) = outcome?;
        Ok(EvaluationRun {
            places_processed: places.to_vec(),
            timestamp: times.now,
            observations,
        })
    }

    fn record(
        &self,
        places: &[String],
        times: &RunTimes,
        store: &mut dyn RiskStore,
    ) -> Result<Vec<PlaceObservation>, EvalError> {
        let observations = places
            .iter()
            .map(|place| self.observe(place, times, store))
            .collect::<Result<Vec<_>, _>>()?;

        if !observations.is_empty() {
            store.insert_all(&observations).inspect_err(|e| {
                logging::error(DataSource::Database, None, &format!("Batch insert rolled back: {}", e));
            })?;
        }
        Ok(observations)
    }

    /// Handles one classified invocation event end to end.
    pub fn handle(
        &self,
        event: InvocationEvent,
        store: &mut dyn RiskStore,
    ) -> Result<InvocationResponse, EvalError> {
        let run = self.evaluate_and_record(&event.into_places(), store)?;
        Ok(InvocationResponse::ok(run.places_processed, run.timestamp.to_rfc3339()))
    }

    /// Handles one JSON invocation event end to end.
    pub fn handle_event(
        &self,
        event: &Value,
        store: &mut dyn RiskStore,
    ) -> Result<InvocationResponse, EvalError> {
        self.handle(InvocationEvent::from_json(event), store)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
