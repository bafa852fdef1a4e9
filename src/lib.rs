//! Landslide risk scoring from recent rainfall.
//!
//! For each requested place: fetch 3-hour rainfall, score it with a
//! logistic model, bucket the probability into a risk level, compare with
//! the place's previous record, and append the result to `precip_risk`.

pub mod clock;
pub mod config;
pub mod db;
pub mod evaluator;
pub mod event;
pub mod ingest;
pub mod logging;
pub mod model;
pub mod places;
pub mod risk;

pub use evaluator::{EvaluationRun, RiskEvaluator};
pub use model::{PlaceObservation, RiskLevel};
