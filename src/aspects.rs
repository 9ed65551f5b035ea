use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::*;

/// Every body aspects the 7th house counted inclusively from its own.
pub const UNIVERSAL_ASPECT: usize = 7;

/// House-count aspects have no orb, so they always carry full strength.
pub const HOUSE_ASPECT_STRENGTH: f64 = 10.0;

// ---------------------------
// ## Aspect Vocabulary
// ---------------------------

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AspectType {
    Conjunction,
    Drishti,
    Opposition,
    Trine,
    Square,
    Sextile,
}

impl AspectType {
    pub fn as_str(self) -> &'static str {
        match self {
            AspectType::Conjunction => "conjunction",
            AspectType::Drishti => "drishti",
            AspectType::Opposition => "opposition",
            AspectType::Trine => "trine",
            AspectType::Square => "square",
            AspectType::Sextile => "sextile",
        }
    }
}

impl fmt::Display for AspectType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AspectStrength {
    Strong,
    Moderate,
    Weak,
}

impl AspectStrength {
    /// Conjunction tiers: strong under 3°, moderate under 6°, weak otherwise.
    pub fn from_orb(orb: f64) -> Self {
        if orb < 3.0 {
            AspectStrength::Strong
        } else if orb < 6.0 {
            AspectStrength::Moderate
        } else {
            AspectStrength::Weak
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AspectNature {
    Benefic,
    Malefic,
    Neutral,
}

impl AspectNature {
    pub fn of_body(body: CelestialBody) -> Self {
        if body.is_natural_benefic() {
            AspectNature::Benefic
        } else {
            AspectNature::Malefic
        }
    }

    pub fn for_aspect(body: CelestialBody, aspect_type: AspectType) -> Self {
        match aspect_type {
            AspectType::Trine | AspectType::Sextile => AspectNature::Benefic,
            AspectType::Square | AspectType::Opposition => {
                if body.is_natural_benefic() {
                    AspectNature::Neutral
                } else {
                    AspectNature::Malefic
                }
            }
            AspectType::Conjunction | AspectType::Drishti => Self::of_body(body),
        }
    }

    pub fn for_pair(a: CelestialBody, b: CelestialBody) -> Self {
        match (a.is_natural_benefic(), b.is_natural_benefic()) {
            (true, true) => AspectNature::Benefic,
            (false, false) => AspectNature::Malefic,
            _ => AspectNature::Neutral,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AspectEndpoint {
    Body(CelestialBody),
    House(House),
}

impl AspectEndpoint {
    pub fn body(self) -> Option<CelestialBody> {
        match self {
            AspectEndpoint::Body(body) => Some(body),
            AspectEndpoint::House(_) => None,
        }
    }
}

/// One directed aspect: a body casting onto a house, or onto another body.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AspectEdge {
    pub from: AspectEndpoint,
    pub to: AspectEndpoint,
    pub aspect_type: AspectType,
    pub strength: AspectStrength,
    /// 0-10 scale.
    pub strength_score: f64,
    pub orb: Option<f64>,
    pub nature: AspectNature,
    pub is_special_aspect: bool,
    /// "Nth house" count of a house aspect, e.g. 7 for the universal aspect.
    pub house_count: Option<u8>,
}

impl AspectEdge {
    /// Both bodies of a body-to-body edge, in canonical order.
    pub fn body_pair(&self) -> Option<(CelestialBody, CelestialBody)> {
        let a = self.from.body()?;
        let b = self.to.body()?;
        Some(if a <= b { (a, b) } else { (b, a) })
    }

    /// `"Mars-Saturn:drishti"`, independent of direction.
    pub fn pair_key(&self) -> Option<String> {
        self.body_pair()
            .map(|(a, b)| format!("{}-{}:{}", a, b, self.aspect_type))
    }
}

// ---------------------------
// ## Aspect Engine
// ---------------------------

/// Drishti graph builder under whole-sign house counting.
#[derive(Debug, Clone, Default)]
pub struct AspectEngine {
    config: AspectConfig,
}

impl AspectEngine {
    pub fn new(config: AspectConfig) -> Self {
        AspectEngine { config }
    }

    pub fn config(&self) -> &AspectConfig {
        &self.config
    }

    /// Extra inclusive house counts a body casts beyond the universal 7th.
    pub fn special_counts(&self, body: CelestialBody) -> &'static [usize] {
        match body {
            CelestialBody::Mars => &[4, 8],
            CelestialBody::Jupiter => &[5, 9],
            CelestialBody::Saturn => &[3, 10],
            CelestialBody::Rahu | CelestialBody::Ketu if self.config.node_special_aspects => &[5, 9],
            _ => &[],
        }
    }

    /// Full aspect graph for a set of positions under the given ascendant.
    ///
    /// Houses are re-derived from the ascendant, so stale house numbers on the input are ignored.
    /// Any unusable longitude fails the whole call before an edge is built.
    pub fn compute(
        &self,
        positions: &[BodyPosition],
        ascendant_longitude: f64,
    ) -> AstrologyResult<Vec<AspectEdge>> {
        let ascendant = Ascendant::new(ascendant_longitude)?;
        for position in positions {
            if !(0.0..360.0).contains(&position.longitude) {
                return Err(AstrologyError::InvalidInput(format!(
                    "{} longitude {} is outside [0, 360)",
                    position.body, position.longitude
                )));
            }
            if !(0.0..30.0).contains(&position.degree_in_sign) {
                return Err(AstrologyError::InvalidInput(format!(
                    "{} degree {} is outside [0, 30)",
                    position.body, position.degree_in_sign
                )));
            }
        }
        let positions: Vec<BodyPosition> = positions
            .iter()
            .map(|p| BodyPosition {
                house: ascendant.house_of(p.sign),
                ..*p
            })
            .collect();
        Ok(self.build(&positions))
    }

    pub fn compute_snapshot(&self, snapshot: &Snapshot) -> Vec<AspectEdge> {
        self.build(snapshot.positions())
    }

    fn build(&self, positions: &[BodyPosition]) -> Vec<AspectEdge> {
        let mut edges = Vec::new();

        for position in positions {
            let counts = std::iter::once(UNIVERSAL_ASPECT).chain(self.special_counts(position.body).iter().copied());
            for count in counts {
                let Some(target) = aspected_house(position.house, count) else {
                    trace!(body = %position.body, count, "dropping self-aspect");
                    continue;
                };
                let is_special = count != UNIVERSAL_ASPECT;

                edges.push(AspectEdge {
                    from: AspectEndpoint::Body(position.body),
                    to: AspectEndpoint::House(target),
                    aspect_type: AspectType::Drishti,
                    strength: AspectStrength::Strong,
                    strength_score: HOUSE_ASPECT_STRENGTH,
                    orb: None,
                    nature: AspectNature::for_aspect(position.body, AspectType::Drishti),
                    is_special_aspect: is_special,
                    house_count: Some(count as u8),
                });

                for occupant in positions.iter().filter(|p| p.house == target && p.body != position.body) {
                    edges.push(AspectEdge {
                        from: AspectEndpoint::Body(position.body),
                        to: AspectEndpoint::Body(occupant.body),
                        aspect_type: AspectType::Drishti,
                        strength: AspectStrength::Strong,
                        strength_score: HOUSE_ASPECT_STRENGTH,
                        orb: Some(drishti_orb(position.longitude, occupant.longitude, count)),
                        nature: AspectNature::for_aspect(position.body, AspectType::Drishti),
                        is_special_aspect: is_special,
                        house_count: Some(count as u8),
                    });
                }
            }
        }

        for (i, a) in positions.iter().enumerate() {
            for b in positions.iter().skip(i + 1) {
                if a.sign != b.sign {
                    continue;
                }
                let orb = (a.degree_in_sign - b.degree_in_sign).abs();
                edges.push(AspectEdge {
                    from: AspectEndpoint::Body(a.body),
                    to: AspectEndpoint::Body(b.body),
                    aspect_type: AspectType::Conjunction,
                    strength: AspectStrength::from_orb(orb),
                    strength_score: (10.0 - orb).max(0.0),
                    orb: Some(orb),
                    nature: AspectNature::for_pair(a.body, b.body),
                    is_special_aspect: false,
                    house_count: None,
                });
            }
        }

        debug!(bodies = positions.len(), edges = edges.len(), "built aspect graph");
        edges
    }
}

/// House hit by an inclusive "count-th house" aspect, or `None` for a self-aspect.
fn aspected_house(from: House, count: usize) -> Option<House> {
    let target = from.nth_from(count);
    if target == from {
        None
    } else {
        Some(target)
    }
}

/// Deviation of the actual forward separation from the exact house-count angle.
fn drishti_orb(from_longitude: f64, to_longitude: f64, count: usize) -> f64 {
    let separation = (to_longitude - from_longitude).rem_euclid(360.0);
    let exact = (count.saturating_sub(1) % 12) as f64 * 30.0;
    let diff = (separation - exact).abs();
    diff.min(360.0 - diff)
}
