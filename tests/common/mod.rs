#![allow(dead_code)]

use aztro_patterns::{
    AspectEngine, CelestialBody, EventCategory, EventRecord, ImpactLevel, Location, Snapshot,
};
use chrono::{DateTime, Duration, TimeZone, Utc};

/// Sun, Moon, Mars, Mercury, Jupiter, Venus, Saturn, Rahu, Ketu, each in its own sign:
/// Aries, Pisces, Gemini, Cancer, Leo, Virgo, Sagittarius, Scorpio, Taurus.
pub const SPREAD: [f64; 9] = [5.0, 345.0, 75.0, 100.0, 135.0, 160.0, 250.0, 225.0, 45.0];

pub fn with_body(mut longitudes: [f64; 9], body: CelestialBody, longitude: f64) -> [f64; 9] {
    longitudes[body.index()] = longitude;
    longitudes
}

pub fn snapshot(ascendant: f64, longitudes: [f64; 9]) -> Snapshot {
    Snapshot::from_longitudes(ascendant, longitudes).unwrap()
}

pub fn delhi() -> Location {
    Location::new(28.6139, 77.2090)
}

pub fn day(offset: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2000, 1, 1, 0, 0, 0).unwrap() + Duration::days(offset)
}

pub fn make_event(
    id: &str,
    offset: i64,
    category: EventCategory,
    impact: ImpactLevel,
    longitudes: [f64; 9],
) -> EventRecord {
    let snapshot = snapshot(0.0, longitudes);
    let aspects = AspectEngine::default().compute_snapshot(&snapshot);
    EventRecord {
        id: id.to_string(),
        date: day(offset),
        category,
        impact,
        snapshot: Some(snapshot),
        aspects,
    }
}

pub fn make_bare_event(id: &str, offset: i64, category: EventCategory, impact: ImpactLevel) -> EventRecord {
    EventRecord {
        id: id.to_string(),
        date: day(offset),
        category,
        impact,
        snapshot: None,
        aspects: Vec::new(),
    }
}

/// `count` identical events in one category.
pub fn repeated(count: usize, category: EventCategory, impact: ImpactLevel, longitudes: [f64; 9]) -> Vec<EventRecord> {
    (0..count)
        .map(|i| make_event(&format!("{}-{}", category, i), i as i64, category, impact, longitudes))
        .collect()
}
