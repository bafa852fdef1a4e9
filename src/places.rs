//! Place registry for the landslide risk service.
//!
//! Maps the place names accepted in invocation events to their external
//! identifiers, and optionally to the ASOS station whose rain gauge stands
//! in for the place when rainfall is fetched from IEM. Places that are not
//! registered are still evaluated; they simply carry no identifier.

use serde::Deserialize;

// ---------------------------------------------------------------------------
// Place metadata
// ---------------------------------------------------------------------------

/// Metadata for a single monitored place.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Place {
    /// Name as it appears in events and in the `place_name` column.
    pub name: String,
    /// External identifier written to the `place_id` column.
    pub place_id: Option<String>,
    /// IEM/ASOS station id used as the rainfall proxy, if any.
    #[serde(default)]
    pub asos_station: Option<String>,
}

/// Built-in places: (name, identifier).
pub static DEFAULT_PLACES: &[(&str, &str)] = &[("Craig", "AK91"), ("Kasaan", "AK182")];

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Read-only lookup table built once at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaceRegistry {
    places: Vec<Place>,
}

impl Default for PlaceRegistry {
    fn default() -> Self {
        let places = DEFAULT_PLACES
            .iter()
            .map(|(name, id)| Place {
                name: name.to_string(),
                place_id: Some(id.to_string()),
                asos_station: None,
            })
            .collect();
        Self { places }
    }
}

impl PlaceRegistry {
    /// The built-in registry with `overrides` applied: an override with the
    /// same name replaces the built-in entry, any other is appended.
    pub fn with_overrides(overrides: Vec<Place>) -> Self {
        let mut registry = Self::default();
        for place in overrides {
            match registry.places.iter_mut().find(|p| p.name == place.name) {
                Some(existing) => *existing = place,
                None => registry.places.push(place),
            }
        }
        registry
    }

    /// Looks up a place by name. Matching is exact, as in the database.
    pub fn find_place(&self, place_name: &str) -> Option<&Place> {
        self.places.iter().find(|p| p.name == place_name)
    }

    pub fn place_id(&self, place_name: &str) -> Option<&str> {
        self.find_place(place_name)
            .and_then(|p| p.place_id.as_deref())
    }

    pub fn asos_station(&self, place_name: &str) -> Option<&str> {
        self.find_place(place_name)
            .and_then(|p| p.asos_station.as_deref())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_identifiers() {
        let registry = PlaceRegistry::default();
        assert_eq!(registry.place_id("Craig"), Some("AK91"));
        assert_eq!(registry.place_id("Kasaan"), Some("AK182"));
    }

    #[test]
    fn test_unknown_place_has_no_identifier() {
        assert_eq!(PlaceRegistry::default().place_id("Anchorage"), None);
        assert_eq!(PlaceRegistry::default().asos_station("Anchorage"), None);
    }

    #[test]
    fn test_lookup_is_case_sensitive() {
        assert_eq!(PlaceRegistry::default().place_id("craig"), None);
    }

    #[test]
    fn test_registry_identifiers_follow_state_prefix_format() {
        // Identifiers are "AK" followed by digits; anything else would not
        // join against the downstream place tables.
        for (name, id) in DEFAULT_PLACES {
            assert!(id.starts_with("AK"), "{} has identifier {}", name, id);
            assert!(
                id[2..].chars().all(|c| c.is_ascii_digit()),
                "{} has non-numeric identifier suffix {}",
                name,
                id
            );
        }
    }

    #[test]
    fn test_override_replaces_builtin_and_appends_new() {
        let registry = PlaceRegistry::with_overrides(vec![
            Place {
                name: "Craig".to_string(),
                place_id: Some("AK91".to_string()),
                asos_station: Some("PACG".to_string()),
            },
            Place {
                name: "Hollis".to_string(),
                place_id: None,
                asos_station: None,
            },
        ]);
        assert_eq!(registry.asos_station("Craig"), Some("PACG"));
        assert_eq!(registry.place_id("Kasaan"), Some("AK182"));
        assert!(registry.find_place("Hollis").is_some());
        assert_eq!(registry.place_id("Hollis"), None);
        assert_eq!(registry.find_place("Craig").map(|p| p.place_id.as_deref()), Some(Some("AK91")));
    }
}
