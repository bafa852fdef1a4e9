//! End-to-end tests for the evaluation pipeline without external services
//!
//! These tests verify:
//! 1. Event parsing → evaluation → storage → response
//! 2. Risk levels written agree with the probability formula
//! 3. Elevated-risk flags across consecutive runs
//! 4. All-or-nothing writes when the store refuses a row
//!
//! Rainfall comes from the fixed stub and rows go to `MemoryRiskStore`, so
//! no network or database is needed.

use chrono::{TimeZone, Utc};
use serde_json::json;

use landslide_risk::clock::FixedClock;
use landslide_risk::config::Settings;
use landslide_risk::db::{MemoryRiskStore, RiskStore};
use landslide_risk::ingest::FixedRainfall;
use landslide_risk::model::EvalError;
use landslide_risk::risk::{probability, risk_level_for_rainfall};
use landslide_risk::{RiskEvaluator, RiskLevel};

// ---------------------------------------------------------------------------
// Test Helpers
// ---------------------------------------------------------------------------

fn evaluator_at(rainfall_mm: f64, hour_utc: u32) -> RiskEvaluator {
    let clock = FixedClock(Utc.with_ymd_and_hms(2024, 1, 15, hour_utc, 0, 0).unwrap());
    RiskEvaluator::with_clock(
        &Settings::default(),
        Box::new(FixedRainfall { rainfall_mm }),
        Box::new(clock),
    )
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

#[test]
fn test_two_places_insert_exactly_two_rows() {
    let evaluator = evaluator_at(1.5, 23);
    let mut store = MemoryRiskStore::new();

    let response = evaluator
        .handle_event(&json!({"places": ["Kasaan", "Craig"]}), &mut store)
        .expect("pipeline should succeed");

    assert_eq!(response.status, "ok");
    assert_eq!(response.places_processed, vec!["Kasaan", "Craig"]);
    assert_eq!(response.timestamp, "2024-01-15T14:00:00-09:00");
    assert_eq!(store.rows().len(), 2, "exactly one row per place");

    for row in store.rows() {
        assert_eq!(row.rainfall_mm, 1.5);
        assert!((row.probability - probability(1.5)).abs() < 1e-15);
        assert_eq!(row.risk_level, risk_level_for_rainfall(1.5));
        assert_eq!(row.risk_level, RiskLevel::Low);
        assert_eq!(row.hour, "02PM");
        assert!((row.rainfall_inches - 1.5 / 25.4).abs() < 1e-12);
    }
}

#[test]
fn test_event_shapes_control_place_count() {
    let evaluator = evaluator_at(1.5, 23);

    let cases = [
        (json!({"place_name": "Craig"}), 1),
        (json!({"places": ["A", "B"]}), 2),
        (json!({}), 0),
        (json!({"places": null}), 0),
        (json!("Craig"), 0),
    ];

    for (event, expected) in cases {
        let mut store = MemoryRiskStore::new();
        let response = evaluator
            .handle_event(&event, &mut store)
            .expect("malformed events are not errors");
        assert_eq!(response.places_processed.len(), expected, "event {}", event);
        assert_eq!(store.rows().len(), expected, "event {}", event);
    }
}

#[test]
fn test_consecutive_runs_flag_rising_probability() {
    let mut store = MemoryRiskStore::new();

    evaluator_at(20.0, 10)
        .handle_event(&json!({"place_name": "Craig"}), &mut store)
        .unwrap();
    evaluator_at(28.0, 13)
        .handle_event(&json!({"places": ["Craig", "Kasaan"]}), &mut store)
        .unwrap();

    let latest: Vec<_> = store.rows().iter().skip(1).collect();
    let craig = latest.iter().find(|r| r.place_name == "Craig").unwrap();
    let kasaan = latest.iter().find(|r| r.place_name == "Kasaan").unwrap();
    assert!(craig.risk_elevated, "Craig rose from 20 mm to 28 mm");
    assert!(!kasaan.risk_elevated, "Kasaan has no earlier record");
    assert_eq!(craig.risk_level, RiskLevel::Moderate);

    let newest = store.latest_probability("Craig").unwrap();
    assert_eq!(newest, Some(probability(28.0)));
}

#[test]
fn test_refused_write_aborts_whole_run() {
    let evaluator = evaluator_at(1.5, 23);
    let mut store = MemoryRiskStore::new().rejecting("Anchorage");

    let result = evaluator.handle_event(
        &json!({"places": ["Kasaan", "Craig", "Anchorage"]}),
        &mut store,
    );

    assert!(matches!(result, Err(EvalError::Store(_))), "got {:?}", result);
    assert!(store.rows().is_empty(), "no partial batch may remain");
}
