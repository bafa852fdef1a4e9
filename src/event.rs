//! Invocation boundary: the incoming event and the outgoing response.
//!
//! Events arrive as loosely shaped JSON. They are parsed once, here, into
//! [`InvocationEvent`]; nothing past this module looks at raw JSON.
//! Malformed input is not an error, it simply names no places.

use serde::Serialize;
use serde_json::Value;

/// The places an invocation asks to evaluate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvocationEvent {
    /// `{"place_name": "Craig"}`
    SinglePlace(String),
    /// `{"places": ["Kasaan", "Craig"]}`
    Places(Vec<String>),
    /// Anything else.
    Empty,
}

impl InvocationEvent {
    /// Classifies a JSON event.
    ///
    /// A non-empty string `place_name` takes precedence over `places`.
    /// Non-string members of `places` are dropped.
    pub fn from_json(event: &Value) -> Self {
        let Some(object) = event.as_object() else {
            return InvocationEvent::Empty;
        };

        if let Some(name) = object.get("place_name").and_then(Value::as_str) {
            if !name.is_empty() {
                return InvocationEvent::SinglePlace(name.to_string());
            }
        }

        match object.get("places").and_then(Value::as_array) {
            Some(places) => InvocationEvent::Places(
                places
                    .iter()
                    .filter_map(Value::as_str)
                    .map(String::from)
                    .collect(),
            ),
            None => InvocationEvent::Empty,
        }
    }

    /// Parses raw event text. Text that is not JSON yields `Empty`.
    pub fn parse(raw: &str) -> Self {
        serde_json::from_str::<Value>(raw)
            .map(|value| Self::from_json(&value))
            .unwrap_or(InvocationEvent::Empty)
    }

    /// The place names in request order.
    pub fn into_places(self) -> Vec<String> {
        match self {
            InvocationEvent::SinglePlace(name) => vec![name],
            InvocationEvent::Places(names) => names,
            InvocationEvent::Empty => Vec::new(),
        }
    }
}

/// Response returned to the invoking runtime.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InvocationResponse {
    pub status: &'static str,
    pub places_processed: Vec<String>,
    /// RFC 3339 timestamp of the run, in the reporting time zone.
    pub timestamp: String,
}

impl InvocationResponse {
    pub fn ok(places_processed: Vec<String>, timestamp: String) -> Self {
        Self {
            status: "ok",
            places_processed,
            timestamp,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
