//! Pattern extraction over a corpus of historical events.
//!
//! Five families are mined in one pass: degree-specific, aspect-pair, nakshatra, sign and
//! combined signatures. Each event is tallied independently (optionally on the rayon pool),
//! then the tallies are folded in input order so repeated runs are byte-identical.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::ExtractionConfig;
use crate::events::{EventCategory, EventRecord};
use crate::significance;
use crate::{AspectEdge, AspectType, AstrologyError, AstrologyResult, CelestialBody, Nakshatra, Snapshot, ZodiacSign};

/// Bodies whose signs make up a combined signature, in signature order.
pub const SIGNATURE_BODIES: [CelestialBody; 5] = [
    CelestialBody::Mars,
    CelestialBody::Saturn,
    CelestialBody::Jupiter,
    CelestialBody::Sun,
    CelestialBody::Moon,
];

/// Aspect pairs kept in a combined signature.
pub const SIGNATURE_ASPECTS: usize = 3;

// ---------------------------
// ## Pattern Records
// ---------------------------

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternKind {
    Degree,
    Aspect,
    Nakshatra,
    Sign,
    Combined,
}

impl PatternKind {
    pub fn as_str(self) -> &'static str {
        match self {
            PatternKind::Degree => "degree",
            PatternKind::Aspect => "aspect",
            PatternKind::Nakshatra => "nakshatra",
            PatternKind::Sign => "sign",
            PatternKind::Combined => "combined",
        }
    }

    /// Families keyed on where a body sits rather than how bodies relate.
    pub fn is_positional(self) -> bool {
        matches!(self, PatternKind::Degree | PatternKind::Nakshatra | PatternKind::Sign)
    }
}

impl fmt::Display for PatternKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An unordered body pair joined by one aspect type.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AspectPair {
    pub aspect_type: AspectType,
    /// Canonical body order.
    pub bodies: [CelestialBody; 2],
}

impl AspectPair {
    pub fn new(aspect_type: AspectType, a: CelestialBody, b: CelestialBody) -> Self {
        let bodies = if a <= b { [a, b] } else { [b, a] };
        AspectPair { aspect_type, bodies }
    }

    /// `None` for house edges.
    pub fn from_edge(edge: &AspectEdge) -> Option<Self> {
        let (a, b) = edge.body_pair()?;
        Some(AspectPair::new(edge.aspect_type, a, b))
    }

}

impl fmt::Display for AspectPair {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}-{}:{}", self.bodies[0], self.bodies[1], self.aspect_type)
    }
}

/// Multi-factor fingerprint of one moment: five sign placements plus up to three aspect pairs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CombinedSignature {
    pub mars: ZodiacSign,
    pub saturn: ZodiacSign,
    pub jupiter: ZodiacSign,
    pub sun: ZodiacSign,
    pub moon: ZodiacSign,
    /// Distinct pairs, sorted by their `"A-B:type"` label.
    pub aspects: Vec<AspectPair>,
}

impl CombinedSignature {
    /// `None` when the moment has no body-to-body aspects.
    pub fn from_moment<'a, I>(snapshot: &Snapshot, aspects: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a AspectEdge>,
    {
        let labelled: BTreeMap<String, AspectPair> = aspects
            .into_iter()
            .filter_map(AspectPair::from_edge)
            .map(|pair| (pair.to_string(), pair))
            .collect();
        if labelled.is_empty() {
            return None;
        }

        let sign = |body| snapshot.position(body).sign;
        Some(CombinedSignature {
            mars: sign(CelestialBody::Mars),
            saturn: sign(CelestialBody::Saturn),
            jupiter: sign(CelestialBody::Jupiter),
            sun: sign(CelestialBody::Sun),
            moon: sign(CelestialBody::Moon),
            aspects: labelled.into_values().take(SIGNATURE_ASPECTS).collect(),
        })
    }

    pub fn placements(&self) -> [(CelestialBody, ZodiacSign); 5] {
        [
            (CelestialBody::Mars, self.mars),
            (CelestialBody::Saturn, self.saturn),
            (CelestialBody::Jupiter, self.jupiter),
            (CelestialBody::Sun, self.sun),
            (CelestialBody::Moon, self.moon),
        ]
    }

    pub fn label(&self) -> String {
        let signs: Vec<String> = self
            .placements()
            .iter()
            .map(|(body, sign)| format!("{}={}", body, sign))
            .collect();
        let aspects: Vec<String> = self.aspects.iter().map(|pair| pair.to_string()).collect();
        format!("{}|{}", signs.join(","), aspects.join(","))
    }
}

/// The exact rule a pattern matches on; enough to re-test a new moment without the corpus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PatternConditions {
    Degree {
        body: CelestialBody,
        sign: ZodiacSign,
        degree: u8,
        critical: bool,
    },
    Aspect {
        aspect_type: AspectType,
        bodies: [CelestialBody; 2],
    },
    Nakshatra {
        body: CelestialBody,
        nakshatra: Nakshatra,
        category: EventCategory,
    },
    Sign {
        body: CelestialBody,
        sign: ZodiacSign,
    },
    Combined(CombinedSignature),
}

impl PatternConditions {
    pub fn kind(&self) -> PatternKind {
        match self {
            PatternConditions::Degree { .. } => PatternKind::Degree,
            PatternConditions::Aspect { .. } => PatternKind::Aspect,
            PatternConditions::Nakshatra { .. } => PatternKind::Nakshatra,
            PatternConditions::Sign { .. } => PatternKind::Sign,
            PatternConditions::Combined(_) => PatternKind::Combined,
        }
    }

    /// Unique, deterministic pattern name. Doubles as the storage key.
    pub fn name(&self) -> String {
        match self {
            PatternConditions::Degree { body, sign, degree, .. } => {
                format!("degree:{}:{}:{}", body, sign, degree)
            }
            PatternConditions::Aspect { aspect_type, bodies } => {
                format!("aspect:{}:{}-{}", aspect_type, bodies[0], bodies[1])
            }
            PatternConditions::Nakshatra { body, nakshatra, category } => {
                format!("nakshatra:{}:{}:{}", category, body, nakshatra)
            }
            PatternConditions::Sign { body, sign } => format!("sign:{}:{}", body, sign),
            PatternConditions::Combined(signature) => format!("combined:{}", signature.label()),
        }
    }

    pub fn bodies(&self) -> BTreeSet<CelestialBody> {
        match self {
            PatternConditions::Degree { body, .. }
            | PatternConditions::Nakshatra { body, .. }
            | PatternConditions::Sign { body, .. } => BTreeSet::from([*body]),
            PatternConditions::Aspect { bodies, .. } => bodies.iter().copied().collect(),
            PatternConditions::Combined(signature) => signature
                .placements()
                .iter()
                .map(|(body, _)| *body)
                .chain(signature.aspects.iter().flat_map(|pair| pair.bodies))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternMetrics {
    /// Aspect patterns only.
    pub mean_orb: Option<f64>,
    /// Aspect patterns only, 0-10 scale.
    pub mean_strength: Option<f64>,
    /// Sign patterns only: `total_events / 12`.
    pub expected_occurrences: Option<f64>,
    /// Sign patterns only: observed minus expected.
    pub deviation: Option<f64>,
    pub high_impact_ratio: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pattern {
    pub kind: PatternKind,
    pub name: String,
    pub conditions: PatternConditions,
    pub total_occurrences: u32,
    pub high_impact_occurrences: u32,
    /// Comparative score on a rough 0-100 scale. Unbounded above; not a probability.
    pub ranking_score: f64,
    /// Occurrences per event category.
    pub categories: BTreeMap<EventCategory, u32>,
    pub metrics: PatternMetrics,
}

impl Pattern {
    pub fn involves(&self, body: CelestialBody) -> bool {
        self.conditions.bodies().contains(&body)
    }

    /// Feature vector handed to downstream pattern classifiers:
    /// `[score, occurrences, ln(occurrences + 1), is_aspect, is_positional, name_len, score / 100,
    /// has_mars, has_jupiter, has_saturn, has_rahu, has_ketu, has_sun, has_moon]`.
    pub fn feature_profile(&self) -> [f64; 14] {
        let flag = |value: bool| if value { 1.0 } else { 0.0 };
        let bodies = self.conditions.bodies();
        let has = |body| flag(bodies.contains(&body));
        let occurrences = self.total_occurrences as f64;
        [
            self.ranking_score,
            occurrences,
            (occurrences + 1.0).ln(),
            flag(self.kind == PatternKind::Aspect),
            flag(self.kind.is_positional()),
            self.name.chars().count() as f64,
            self.ranking_score / 100.0,
            has(CelestialBody::Mars),
            has(CelestialBody::Jupiter),
            has(CelestialBody::Saturn),
            has(CelestialBody::Rahu),
            has(CelestialBody::Ketu),
            has(CelestialBody::Sun),
            has(CelestialBody::Moon),
        ]
    }
}

/// Score descending, then occurrences descending, then name ascending.
pub fn rank_order(a: &Pattern, b: &Pattern) -> Ordering {
    b.ranking_score
        .total_cmp(&a.ranking_score)
        .then_with(|| b.total_occurrences.cmp(&a.total_occurrences))
        .then_with(|| a.name.cmp(&b.name))
}

/// One extraction run, each family ranked independently.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatternSet {
    pub total_events: usize,
    pub degree: Vec<Pattern>,
    pub aspect: Vec<Pattern>,
    pub nakshatra: Vec<Pattern>,
    pub sign: Vec<Pattern>,
    pub combined: Vec<Pattern>,
}

impl PatternSet {
    pub fn family(&self, kind: PatternKind) -> &[Pattern] {
        match kind {
            PatternKind::Degree => &self.degree,
            PatternKind::Aspect => &self.aspect,
            PatternKind::Nakshatra => &self.nakshatra,
            PatternKind::Sign => &self.sign,
            PatternKind::Combined => &self.combined,
        }
    }

    /// Every pattern, family by family.
    pub fn all(&self) -> impl Iterator<Item = &Pattern> {
        self.degree
            .iter()
            .chain(&self.aspect)
            .chain(&self.nakshatra)
            .chain(&self.sign)
            .chain(&self.combined)
    }

    /// Every pattern across families, best first.
    pub fn ranked(&self) -> Vec<&Pattern> {
        let mut patterns: Vec<&Pattern> = self.all().collect();
        patterns.sort_by(|a, b| rank_order(a, b));
        patterns
    }

    pub fn len(&self) -> usize {
        self.all().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn into_patterns(self) -> Vec<Pattern> {
        let mut patterns = self.degree;
        patterns.extend(self.aspect);
        patterns.extend(self.nakshatra);
        patterns.extend(self.sign);
        patterns.extend(self.combined);
        patterns
    }
}

/// Outcome of an extraction run. Too small a corpus is reported, never silently empty.
#[derive(Debug, Clone, PartialEq)]
pub enum Extraction {
    Patterns(PatternSet),
    InsufficientData { qualifying: usize, required: usize },
}

impl Extraction {
    pub fn into_result(self) -> AstrologyResult<PatternSet> {
        match self {
            Extraction::Patterns(set) => Ok(set),
            Extraction::InsufficientData { qualifying, required } => {
                Err(AstrologyError::InsufficientData { qualifying, required })
            }
        }
    }

    pub fn patterns(&self) -> Option<&PatternSet> {
        match self {
            Extraction::Patterns(set) => Some(set),
            Extraction::InsufficientData { .. } => None,
        }
    }
}

// ---------------------------
// ## Tallies
// ---------------------------

/// Running counters for one candidate group.
#[derive(Debug, Clone, Default)]
struct Tally {
    occurrences: u32,
    high_impact: u32,
    categories: BTreeMap<EventCategory, u32>,
    orb_sum: f64,
    orb_count: u32,
    strength_sum: f64,
    strength_count: u32,
}

impl Tally {
    fn record(&mut self, category: EventCategory, high_impact: bool) {
        self.occurrences += 1;
        if high_impact {
            self.high_impact += 1;
        }
        *self.categories.entry(category).or_insert(0) += 1;
    }

    fn high_impact_ratio(&self) -> f64 {
        if self.occurrences == 0 {
            0.0
        } else {
            self.high_impact as f64 / self.occurrences as f64
        }
    }

    fn mean_orb(&self) -> Option<f64> {
        (self.orb_count > 0).then(|| self.orb_sum / self.orb_count as f64)
    }

    fn mean_strength(&self) -> Option<f64> {
        (self.strength_count > 0).then(|| self.strength_sum / self.strength_count as f64)
    }

    fn into_pattern(self, conditions: PatternConditions, ranking_score: f64, mut metrics: PatternMetrics) -> Pattern {
        metrics.high_impact_ratio = self.high_impact_ratio();
        Pattern {
            kind: conditions.kind(),
            name: conditions.name(),
            conditions,
            total_occurrences: self.occurrences,
            high_impact_occurrences: self.high_impact,
            ranking_score,
            categories: self.categories,
            metrics,
        }
    }
}

#[derive(Debug, Clone, Default)]
struct EdgeStats {
    orb_sum: f64,
    orb_count: u32,
    strength_sum: f64,
    strength_count: u32,
}

/// Everything one event contributes, computed independently of every other event.
#[derive(Debug, Clone)]
struct EventContribution {
    category: EventCategory,
    high_impact: bool,
    degrees: Vec<(CelestialBody, ZodiacSign, u8)>,
    signs: Vec<(CelestialBody, ZodiacSign)>,
    nakshatras: Vec<(CelestialBody, Nakshatra)>,
    aspects: BTreeMap<AspectPair, EdgeStats>,
    combined: Option<CombinedSignature>,
}

impl EventContribution {
    fn from_event(event: &EventRecord, snapshot: &Snapshot) -> Self {
        let mut aspects: BTreeMap<AspectPair, EdgeStats> = BTreeMap::new();
        for edge in event.body_aspects() {
            let Some(pair) = AspectPair::from_edge(edge) else {
                continue;
            };
            let stats = aspects.entry(pair).or_default();
            if let Some(orb) = edge.orb {
                stats.orb_sum += orb;
                stats.orb_count += 1;
            }
            stats.strength_sum += edge.strength_score;
            stats.strength_count += 1;
        }

        EventContribution {
            category: event.category,
            high_impact: event.impact.is_high(),
            degrees: snapshot
                .iter()
                .map(|p| (p.body, p.sign, p.rounded_degree()))
                .collect(),
            signs: snapshot.iter().map(|p| (p.body, p.sign)).collect(),
            nakshatras: snapshot.iter().map(|p| (p.body, p.nakshatra)).collect(),
            aspects,
            combined: CombinedSignature::from_moment(snapshot, event.body_aspects()),
        }
    }
}

/// Folded tallies of the whole corpus.
#[derive(Debug, Default)]
struct CorpusTally {
    total_events: usize,
    category_events: BTreeMap<EventCategory, usize>,
    degrees: BTreeMap<(CelestialBody, ZodiacSign, u8), Tally>,
    aspects: BTreeMap<AspectPair, Tally>,
    nakshatras: BTreeMap<(EventCategory, CelestialBody, Nakshatra), Tally>,
    signs: BTreeMap<(CelestialBody, ZodiacSign), Tally>,
    combined: BTreeMap<CombinedSignature, Tally>,
}

impl CorpusTally {
    fn absorb(&mut self, contribution: EventContribution) {
        let EventContribution {
            category,
            high_impact,
            degrees,
            signs,
            nakshatras,
            aspects,
            combined,
        } = contribution;

        self.total_events += 1;
        *self.category_events.entry(category).or_insert(0) += 1;

        for key in degrees {
            self.degrees.entry(key).or_default().record(category, high_impact);
        }
        for key in signs {
            self.signs.entry(key).or_default().record(category, high_impact);
        }
        for (body, nakshatra) in nakshatras {
            self.nakshatras
                .entry((category, body, nakshatra))
                .or_default()
                .record(category, high_impact);
        }
        for (pair, stats) in aspects {
            let tally = self.aspects.entry(pair).or_default();
            tally.record(category, high_impact);
            tally.orb_sum += stats.orb_sum;
            tally.orb_count += stats.orb_count;
            tally.strength_sum += stats.strength_sum;
            tally.strength_count += stats.strength_count;
        }
        if let Some(signature) = combined {
            self.combined.entry(signature).or_default().record(category, high_impact);
        }
    }
}

// ---------------------------
// ## Pattern Extractor
// ---------------------------

#[derive(Debug, Clone, Default)]
pub struct PatternExtractor {
    config: ExtractionConfig,
}

impl PatternExtractor {
    pub fn new(config: ExtractionConfig) -> Self {
        PatternExtractor { config }
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    /// Mine all five pattern families from `events`.
    ///
    /// Events without a snapshot do not qualify and are ignored.
    pub fn extract(&self, events: &[EventRecord]) -> Extraction {
        let qualifying: Vec<(&EventRecord, &Snapshot)> = events
            .iter()
            .filter_map(|event| event.qualifying_snapshot().map(|snapshot| (event, snapshot)))
            .collect();

        if qualifying.len() < self.config.min_events {
            warn!(
                qualifying = qualifying.len(),
                required = self.config.min_events,
                "insufficient events for pattern extraction"
            );
            return Extraction::InsufficientData {
                qualifying: qualifying.len(),
                required: self.config.min_events,
            };
        }

        // Map: one contribution per event, order preserved.
        let contributions: Vec<EventContribution> = if self.config.parallel {
            qualifying
                .par_iter()
                .map(|(event, snapshot)| EventContribution::from_event(event, snapshot))
                .collect()
        } else {
            qualifying
                .iter()
                .map(|(event, snapshot)| EventContribution::from_event(event, snapshot))
                .collect()
        };

        // Reduce: sequential, in input order.
        let mut corpus = CorpusTally::default();
        for contribution in contributions {
            corpus.absorb(contribution);
        }

        let set = PatternSet {
            total_events: corpus.total_events,
            degree: self.finish(self.degree_patterns(&mut corpus)),
            aspect: self.finish(self.aspect_patterns(&mut corpus)),
            nakshatra: self.finish(self.nakshatra_patterns(&mut corpus)),
            sign: self.finish(self.sign_patterns(&mut corpus)),
            combined: self.finish(self.combined_patterns(&mut corpus)),
        };

        info!(
            events = events.len(),
            qualifying = set.total_events,
            degree = set.degree.len(),
            aspect = set.aspect.len(),
            nakshatra = set.nakshatra.len(),
            sign = set.sign.len(),
            combined = set.combined.len(),
            "extracted patterns"
        );
        Extraction::Patterns(set)
    }

    fn finish(&self, mut patterns: Vec<Pattern>) -> Vec<Pattern> {
        patterns.sort_by(rank_order);
        if let Some(max) = self.config.max_patterns_per_family {
            patterns.truncate(max);
        }
        patterns
    }

    fn degree_patterns(&self, corpus: &mut CorpusTally) -> Vec<Pattern> {
        let total = corpus.total_events;
        let min = self.config.degree_min_occurrences;
        std::mem::take(&mut corpus.degrees)
            .into_iter()
            .filter(|(_, tally)| tally.occurrences >= min)
            .map(|((body, sign, degree), tally)| {
                let critical = significance::is_critical_degree(sign, degree);
                let score = significance::degree_significance(tally.occurrences, total, critical);
                let conditions = PatternConditions::Degree { body, sign, degree, critical };
                tally.into_pattern(conditions, score, PatternMetrics::default())
            })
            .collect()
    }

    fn aspect_patterns(&self, corpus: &mut CorpusTally) -> Vec<Pattern> {
        let total = corpus.total_events;
        let min = self.config.aspect_min_occurrences;
        std::mem::take(&mut corpus.aspects)
            .into_iter()
            .filter(|(_, tally)| tally.occurrences >= min)
            .map(|(pair, tally)| {
                let mean_orb = tally.mean_orb();
                let mean_strength = tally.mean_strength();
                let score = significance::aspect_significance(
                    tally.occurrences,
                    total,
                    // Without an orb the tight-orb bonus cannot apply.
                    mean_orb.unwrap_or(f64::INFINITY),
                    mean_strength.unwrap_or(0.0),
                );
                let conditions = PatternConditions::Aspect {
                    aspect_type: pair.aspect_type,
                    bodies: pair.bodies,
                };
                let metrics = PatternMetrics {
                    mean_orb,
                    mean_strength,
                    ..PatternMetrics::default()
                };
                tally.into_pattern(conditions, score, metrics)
            })
            .collect()
    }

    fn nakshatra_patterns(&self, corpus: &mut CorpusTally) -> Vec<Pattern> {
        let min = self.config.nakshatra_min_occurrences;
        let category_events = &corpus.category_events;
        std::mem::take(&mut corpus.nakshatras)
            .into_iter()
            .filter(|(_, tally)| tally.occurrences >= min)
            .map(|((category, body, nakshatra), tally)| {
                let in_category = category_events.get(&category).copied().unwrap_or(tally.occurrences as usize);
                let traditional = significance::is_traditionally_significant(category, nakshatra);
                let score = significance::nakshatra_significance(tally.occurrences, in_category, traditional);
                let conditions = PatternConditions::Nakshatra { body, nakshatra, category };
                tally.into_pattern(conditions, score, PatternMetrics::default())
            })
            .collect()
    }

    fn sign_patterns(&self, corpus: &mut CorpusTally) -> Vec<Pattern> {
        let total = corpus.total_events;
        let expected = significance::expected_sign_occurrences(total);
        let min_deviation = self.config.sign_min_deviation;
        std::mem::take(&mut corpus.signs)
            .into_iter()
            .filter_map(|((body, sign), tally)| {
                let deviation = tally.occurrences as f64 - expected;
                if deviation.abs() <= min_deviation {
                    debug!(%body, %sign, deviation, "sign group within uniform expectation");
                    return None;
                }
                let score = significance::sign_significance(tally.occurrences, total);
                let metrics = PatternMetrics {
                    expected_occurrences: Some(expected),
                    deviation: Some(deviation),
                    ..PatternMetrics::default()
                };
                Some(tally.into_pattern(PatternConditions::Sign { body, sign }, score, metrics))
            })
            .collect()
    }

    fn combined_patterns(&self, corpus: &mut CorpusTally) -> Vec<Pattern> {
        let total = corpus.total_events;
        let min = self.config.combined_min_occurrences;
        std::mem::take(&mut corpus.combined)
            .into_iter()
            .filter(|(_, tally)| tally.occurrences >= min)
            .map(|(signature, tally)| {
                let score = significance::frequency_percent(tally.occurrences, total);
                tally.into_pattern(PatternConditions::Combined(signature), score, PatternMetrics::default())
            })
            .collect()
    }
}
