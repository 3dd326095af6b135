//! Built-in station catalog.
//!
//! Each station is a symbolic name tied to one pure tone. The orchestrator
//! owns which station is current; the engine only ever sees the frequency.

use serde::Serialize;

/// A selectable tone.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Station {
    pub id: &'static str,
    pub name: &'static str,
    pub frequency_hz: f64,
}

const fn station(id: &'static str, name: &'static str, frequency_hz: f64) -> Station {
    Station {
        id,
        name,
        frequency_hz,
    }
}

static CATALOG: [Station; 10] = [
    station("foundation", "Foundation", 174.0),
    station("renewal", "Renewal", 285.0),
    station("release", "Release", 396.0),
    station("change", "Change", 417.0),
    station("harmony", "Harmony", 432.0),
    station("heart", "Heart", 528.0),
    station("connection", "Connection", 639.0),
    station("expression", "Expression", 741.0),
    station("intuition", "Intuition", 852.0),
    station("unity", "Unity", 963.0),
];

/// All stations, ordered by frequency.
pub fn catalog() -> &'static [Station] {
    &CATALOG
}

/// Look a station up by id.
pub fn find(id: &str) -> Option<&'static Station> {
    CATALOG.iter().find(|s| s.id == id)
}

/// Station following `id` in the catalog, wrapping around.
pub fn next_after(id: &str) -> Option<&'static Station> {
    let idx = CATALOG.iter().position(|s| s.id == id)?;
    CATALOG.get((idx + 1) % CATALOG.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::validate_frequency;

    #[test]
    fn catalog_is_sorted_and_unique() {
        let stations = catalog();
        for pair in stations.windows(2) {
            assert!(pair[0].frequency_hz < pair[1].frequency_hz);
            assert_ne!(pair[0].id, pair[1].id);
        }
    }

    #[test]
    fn every_station_is_playable() {
        for s in catalog() {
            assert!(validate_frequency(s.frequency_hz, 20_000.0).is_ok(), "{}", s.id);
        }
    }

    #[test]
    fn lookup_and_wraparound() {
        assert_eq!(find("heart").map(|s| s.frequency_hz), Some(528.0));
        assert!(find("nope").is_none());
        assert_eq!(next_after("unity").map(|s| s.id), Some("foundation"));
        assert_eq!(next_after("harmony").map(|s| s.id), Some("heart"));
    }

    #[test]
    fn serializes_camel_case() {
        let json = serde_json::to_value(find("harmony").expect("harmony")).expect("json");
        assert_eq!(json["frequencyHz"], 432.0);
        assert_eq!(json["name"], "Harmony");
    }
}
