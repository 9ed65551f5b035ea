//! Longitude normalisation: sign, degree-in-sign, whole-sign house, nakshatra and pada.

use approx::abs_diff_eq;
use serde::{Deserialize, Serialize};

use crate::ephemeris::BodyReading;
use crate::{
    AstrologyError, AstrologyResult, CelestialBody, House, Nakshatra, ZodiacSign, NAKSHATRA_SPAN,
    PADA_SPAN,
};

/// Ascendant (lagna) of a moment. House 1 is the sign it falls in.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ascendant {
    pub longitude: f64,
    pub sign: ZodiacSign,
    pub degree: f64,
}

impl Ascendant {
    pub fn new(longitude: f64) -> AstrologyResult<Self> {
        if !longitude.is_finite() {
            return Err(AstrologyError::InvalidInput(format!(
                "ascendant longitude is not finite: {}",
                longitude
            )));
        }
        if !(0.0..360.0).contains(&longitude) {
            return Err(AstrologyError::InvalidInput(format!(
                "ascendant longitude {} is outside [0, 360)",
                longitude
            )));
        }
        Ok(Ascendant {
            longitude,
            sign: ZodiacSign::from_longitude(longitude),
            degree: longitude % 30.0,
        })
    }

    pub fn house_of(&self, sign: ZodiacSign) -> House {
        House::from_signs(sign, self.sign)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NakshatraInfo {
    pub nakshatra: Nakshatra,
    pub pada: u8,
    pub lord: CelestialBody,
    pub degree: f64,
}

impl NakshatraInfo {
    pub fn from_longitude(longitude: f64) -> NakshatraInfo {
        let normalized_longitude = longitude.rem_euclid(360.0);
        let nakshatra = Nakshatra::from_longitude(normalized_longitude);
        let pada = ((normalized_longitude % NAKSHATRA_SPAN) / PADA_SPAN).floor() as u8 + 1;
        NakshatraInfo {
            nakshatra,
            pada: pada.clamp(1, 4),
            lord: nakshatra.lord(),
            degree: normalized_longitude,
        }
    }
}

/// One tracked body at one moment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BodyPosition {
    pub body: CelestialBody,
    pub longitude: f64,
    pub sign: ZodiacSign,
    pub degree_in_sign: f64,
    pub nakshatra: Nakshatra,
    pub pada: u8,
    pub retrograde: bool,
    pub house: House,
}

impl BodyPosition {
    /// Normalise a sidereal longitude against an ascendant.
    ///
    /// Longitudes outside [0, 360) are reduced first, so any finite value normalises.
    pub fn normalize(
        body: CelestialBody,
        longitude: f64,
        ascendant: &Ascendant,
        retrograde: bool,
    ) -> BodyPosition {
        let longitude = longitude.rem_euclid(360.0);
        let sign = ZodiacSign::from_longitude(longitude);
        let nakshatra = NakshatraInfo::from_longitude(longitude);
        BodyPosition {
            body,
            longitude,
            sign,
            degree_in_sign: longitude % 30.0,
            nakshatra: nakshatra.nakshatra,
            pada: nakshatra.pada,
            retrograde,
            house: ascendant.house_of(sign),
        }
    }

    /// Degree bucket used by degree-specific patterns.
    pub fn rounded_degree(&self) -> u8 {
        self.degree_in_sign.round() as u8
    }

    pub fn nakshatra_info(&self) -> NakshatraInfo {
        NakshatraInfo::from_longitude(self.longitude)
    }
}

/// Positions of all nine bodies at one moment, indexed by [`CelestialBody::index`].
///
/// Deserialisation rebuilds every position from its longitude, so stored labels that
/// disagree with the longitude or the ascendant are rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SnapshotWire")]
pub struct Snapshot {
    pub ascendant: Ascendant,
    positions: [BodyPosition; 9],
}

impl Snapshot {
    /// Build a snapshot from provider readings. Every body must be present exactly once.
    pub fn from_readings(ascendant_longitude: f64, readings: &[BodyReading]) -> AstrologyResult<Self> {
        let ascendant = Ascendant::new(ascendant_longitude)?;
        let mut slots: [Option<BodyPosition>; 9] = [None; 9];

        for reading in readings {
            if !reading.longitude.is_finite() {
                return Err(AstrologyError::InvalidInput(format!(
                    "{} longitude is not finite",
                    reading.body
                )));
            }
            let slot = &mut slots[reading.body.index()];
            if slot.is_some() {
                return Err(AstrologyError::InvalidInput(format!(
                    "{} appears more than once",
                    reading.body
                )));
            }
            *slot = Some(BodyPosition::normalize(
                reading.body,
                reading.longitude,
                &ascendant,
                reading.retrograde,
            ));
        }

        let mut positions = Vec::with_capacity(9);
        for (body, slot) in CelestialBody::iter().zip(slots) {
            match slot {
                Some(position) => positions.push(position),
                None => {
                    return Err(AstrologyError::InvalidInput(format!("{} is missing", body)));
                }
            }
        }
        let positions: [BodyPosition; 9] = positions
            .try_into()
            .map_err(|_| AstrologyError::InvalidInput("expected nine bodies".to_string()))?;

        Ok(Snapshot { ascendant, positions })
    }

    /// Build a snapshot from bare longitudes in canonical body order, all direct.
    pub fn from_longitudes(ascendant_longitude: f64, longitudes: [f64; 9]) -> AstrologyResult<Self> {
        let readings: Vec<BodyReading> = CelestialBody::iter()
            .zip(longitudes)
            .map(|(body, longitude)| BodyReading::new(body, longitude, 1.0))
            .collect();
        Self::from_readings(ascendant_longitude, &readings)
    }

    pub fn position(&self, body: CelestialBody) -> &BodyPosition {
        &self.positions[body.index()]
    }

    pub fn positions(&self) -> &[BodyPosition; 9] {
        &self.positions
    }

    pub fn iter(&self) -> impl Iterator<Item = &BodyPosition> {
        self.positions.iter()
    }

    /// Bodies sitting in `house`, in canonical order.
    pub fn occupants(&self, house: House) -> impl Iterator<Item = &BodyPosition> {
        self.positions.iter().filter(move |p| p.house == house)
    }
}

/// Serialised shape of a [`Snapshot`], taken on no trust.
#[derive(Deserialize)]
struct SnapshotWire {
    ascendant: Ascendant,
    positions: Vec<BodyPosition>,
}

impl TryFrom<SnapshotWire> for Snapshot {
    type Error = AstrologyError;

    fn try_from(wire: SnapshotWire) -> AstrologyResult<Self> {
        let readings: Vec<BodyReading> = wire
            .positions
            .iter()
            .map(|p| BodyReading {
                body: p.body,
                longitude: p.longitude,
                speed: 0.0,
                retrograde: p.retrograde,
            })
            .collect();
        let snapshot = Snapshot::from_readings(wire.ascendant.longitude, &readings)?;

        if snapshot.ascendant.sign != wire.ascendant.sign {
            return Err(AstrologyError::InvalidInput(format!(
                "ascendant sign {} does not match longitude {}",
                wire.ascendant.sign, wire.ascendant.longitude
            )));
        }
        for stored in &wire.positions {
            let rebuilt = snapshot.position(stored.body);
            let consistent = rebuilt.sign == stored.sign
                && rebuilt.house == stored.house
                && rebuilt.nakshatra == stored.nakshatra
                && rebuilt.pada == stored.pada
                && abs_diff_eq!(rebuilt.degree_in_sign, stored.degree_in_sign, epsilon = 1e-6);
            if !consistent {
                return Err(AstrologyError::InvalidInput(format!(
                    "{} placement does not match longitude {}",
                    stored.body, stored.longitude
                )));
            }
        }
        Ok(snapshot)
    }
}
