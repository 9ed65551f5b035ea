use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::*;

// ---------------------------
// ## Provider Readings
// ---------------------------

/// Raw output of the upstream ephemeris for one body: sidereal longitude and daily speed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BodyReading {
    pub body: CelestialBody,
    pub longitude: f64,
    pub speed: f64,
    pub retrograde: bool,
}

impl BodyReading {
    pub fn new(body: CelestialBody, longitude: f64, speed: f64) -> Self {
        BodyReading {
            body,
            longitude,
            speed,
            retrograde: speed < 0.0,
        }
    }

    /// Ketu sits exactly opposite Rahu and moves with it.
    pub fn ketu_from_rahu(rahu: &BodyReading) -> Self {
        BodyReading {
            body: CelestialBody::Ketu,
            longitude: (rahu.longitude + 180.0).rem_euclid(360.0),
            speed: rahu.speed,
            retrograde: rahu.retrograde,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderReading {
    pub bodies: Vec<BodyReading>,
    pub ascendant: f64,
}

impl ProviderReading {
    /// Fill in Ketu from Rahu when the provider only reports the ascending node.
    pub fn with_derived_ketu(mut self) -> Self {
        let has_ketu = self.bodies.iter().any(|b| b.body == CelestialBody::Ketu);
        if !has_ketu {
            if let Some(rahu) = self.bodies.iter().find(|b| b.body == CelestialBody::Rahu) {
                let ketu = BodyReading::ketu_from_rahu(rahu);
                self.bodies.push(ketu);
            }
        }
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

impl Location {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Location { latitude, longitude }
    }
}

/// Source of sidereal positions for an instant and place. Implemented outside this crate.
pub trait PositionProvider {
    fn positions(&self, instant: DateTime<Utc>, location: &Location) -> AstrologyResult<ProviderReading>;
}

// ---------------------------
// ## Moment Chart
// ---------------------------

/// Positions plus the full aspect graph for one moment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MomentChart {
    pub instant: DateTime<Utc>,
    pub location: Location,
    pub snapshot: Snapshot,
    pub aspects: Vec<AspectEdge>,
}

impl MomentChart {
    pub fn compute<P: PositionProvider + ?Sized>(
        provider: &P,
        engine: &AspectEngine,
        instant: DateTime<Utc>,
        location: Location,
    ) -> AstrologyResult<Self> {
        let reading = provider.positions(instant, &location)?.with_derived_ketu();
        Self::from_reading(engine, instant, location, &reading)
    }

    pub fn from_reading(
        engine: &AspectEngine,
        instant: DateTime<Utc>,
        location: Location,
        reading: &ProviderReading,
    ) -> AstrologyResult<Self> {
        let snapshot = Snapshot::from_readings(reading.ascendant, &reading.bodies)?;
        let aspects = engine.compute_snapshot(&snapshot);
        debug!(
            %instant,
            ascendant = %snapshot.ascendant.sign,
            aspects = aspects.len(),
            "computed moment chart"
        );
        Ok(MomentChart {
            instant,
            location,
            snapshot,
            aspects,
        })
    }
}
