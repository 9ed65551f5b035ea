mod common;

use approx::assert_relative_eq;
use aztro_patterns::{
    AstrologyError, CelestialBody, EventCategory, EventRecord, Extraction, ExtractionConfig,
    ImpactLevel, PatternConditions, PatternExtractor, PatternKind, ZodiacSign,
};

use common::{make_bare_event, make_event, repeated, with_body, SPREAD};

fn extract(events: &[EventRecord]) -> aztro_patterns::PatternSet {
    PatternExtractor::default().extract(events).into_result().unwrap()
}

// ── Insufficient data ─────────────────────────────────────────────────────

#[test]
fn one_event_short_of_minimum_is_insufficient() {
    let events = repeated(2, EventCategory::War, ImpactLevel::High, SPREAD);
    let extraction = PatternExtractor::default().extract(&events);
    assert_eq!(extraction, Extraction::InsufficientData { qualifying: 2, required: 3 });
    assert!(matches!(
        extraction.into_result(),
        Err(AstrologyError::InsufficientData { qualifying: 2, required: 3 })
    ));
}

#[test]
fn exactly_minimum_events_yields_patterns() {
    let events = repeated(3, EventCategory::War, ImpactLevel::High, SPREAD);
    let set = extract(&events);
    assert_eq!(set.total_events, 3);
    assert!(!set.is_empty());
}

#[test]
fn events_without_snapshot_do_not_qualify() {
    let mut events = repeated(2, EventCategory::War, ImpactLevel::High, SPREAD);
    events.push(make_bare_event("bare-1", 10, EventCategory::War, ImpactLevel::High));
    events.push(make_bare_event("bare-2", 11, EventCategory::War, ImpactLevel::High));
    assert!(matches!(
        PatternExtractor::default().extract(&events),
        Extraction::InsufficientData { qualifying: 2, .. }
    ));
}

#[test]
fn empty_pattern_set_is_not_an_error() {
    // Every event differs, so nothing reaches the occurrence thresholds.
    let events: Vec<EventRecord> = (0..3)
        .map(|i| {
            let shift = i as f64 * 31.0;
            let longitudes = SPREAD.map(|lon| lon + shift);
            make_event(&format!("e{}", i), i, EventCategory::Political, ImpactLevel::Low, longitudes)
        })
        .collect();
    let config = ExtractionConfig {
        sign_min_deviation: 5.0,
        ..ExtractionConfig::default()
    };
    let extraction = PatternExtractor::new(config).extract(&events);
    let set = extraction.patterns().unwrap();
    assert!(set.degree.is_empty());
    assert!(set.sign.is_empty());
    assert!(set.combined.is_empty());
}

// ── Degree patterns ───────────────────────────────────────────────────────

#[test]
fn degree_pattern_on_critical_degree_gets_bonus() {
    let longitudes = with_body(SPREAD, CelestialBody::Mars, 73.2);
    let events = repeated(4, EventCategory::War, ImpactLevel::Extreme, longitudes);
    let set = extract(&events);

    let mars = set
        .degree
        .iter()
        .find(|p| p.name == "degree:Mars:Gemini:13")
        .unwrap();
    assert_eq!(mars.total_occurrences, 4);
    assert_eq!(mars.high_impact_occurrences, 4);
    assert_relative_eq!(mars.ranking_score, 100.0, epsilon = 1e-9);
    assert!(matches!(mars.conditions, PatternConditions::Degree { critical: false, .. }));

    let longitudes = with_body(SPREAD, CelestialBody::Mars, 64.4);
    let set = extract(&repeated(4, EventCategory::War, ImpactLevel::Low, longitudes));
    let critical = set.degree.iter().find(|p| p.name == "degree:Mars:Gemini:4").unwrap();
    assert!(matches!(critical.conditions, PatternConditions::Degree { critical: true, .. }));
    assert_relative_eq!(critical.ranking_score, 150.0, epsilon = 1e-9);
    assert_eq!(critical.high_impact_occurrences, 0);
}

#[test]
fn degree_groups_below_threshold_are_dropped() {
    let mut events = repeated(2, EventCategory::War, ImpactLevel::High, with_body(SPREAD, CelestialBody::Sun, 20.0));
    events.extend(repeated(2, EventCategory::Financial, ImpactLevel::High, SPREAD));
    let set = extract(&events);
    assert!(set.degree.iter().all(|p| !p.involves(CelestialBody::Sun)));
    assert!(set.degree.iter().any(|p| p.name == "degree:Mars:Gemini:15"));
}

// ── Aspect patterns ───────────────────────────────────────────────────────

#[test]
fn aspect_pattern_counts_events_not_edges() {
    let events = repeated(5, EventCategory::War, ImpactLevel::High, SPREAD);
    let set = extract(&events);

    let pattern = set
        .aspect
        .iter()
        .find(|p| p.name == "aspect:drishti:Mars-Saturn")
        .unwrap();
    // Mars and Saturn aspect each other, two edges per event.
    assert_eq!(pattern.total_occurrences, 5);
    assert_relative_eq!(pattern.metrics.mean_orb.unwrap(), 5.0, epsilon = 1e-9);
    assert_relative_eq!(pattern.metrics.mean_strength.unwrap(), 10.0);
    assert_relative_eq!(pattern.ranking_score, 120.0, epsilon = 1e-9);
}

#[test]
fn tight_orb_aspect_gets_orb_bonus() {
    let longitudes = with_body(SPREAD, CelestialBody::Saturn, 256.0);
    let set = extract(&repeated(3, EventCategory::War, ImpactLevel::High, longitudes));
    let pattern = set
        .aspect
        .iter()
        .find(|p| p.name == "aspect:drishti:Mars-Saturn")
        .unwrap();
    assert_relative_eq!(pattern.metrics.mean_orb.unwrap(), 1.0, epsilon = 1e-9);
    assert_relative_eq!(pattern.ranking_score, 100.0 * 1.3 * 1.2, epsilon = 1e-9);
}

// ── Nakshatra patterns ────────────────────────────────────────────────────

#[test]
fn nakshatra_patterns_are_per_category() {
    let mut events = repeated(2, EventCategory::War, ImpactLevel::High, SPREAD);
    events.extend(repeated(4, EventCategory::Financial, ImpactLevel::Low, SPREAD));
    let set = extract(&events);

    let war = set
        .nakshatra
        .iter()
        .find(|p| p.name == "nakshatra:war:Mars:Ardra")
        .unwrap();
    assert_eq!(war.total_occurrences, 2);
    assert_relative_eq!(war.ranking_score, 140.0, epsilon = 1e-9);
    assert_eq!(war.categories.get(&EventCategory::War), Some(&2));
    assert_eq!(war.categories.get(&EventCategory::Financial), None);

    let financial = set
        .nakshatra
        .iter()
        .find(|p| p.name == "nakshatra:financial:Mars:Ardra")
        .unwrap();
    assert_eq!(financial.total_occurrences, 4);
    assert_relative_eq!(financial.ranking_score, 100.0, epsilon = 1e-9);
}

// ── Sign patterns ─────────────────────────────────────────────────────────

#[test]
fn uniform_sign_distribution_yields_no_sign_pattern() {
    let events: Vec<EventRecord> = (0..120)
        .map(|i| {
            let sun = (i % 12) as f64 * 30.0 + 10.0;
            make_event(
                &format!("u{:03}", i),
                i as i64,
                EventCategory::NaturalDisaster,
                ImpactLevel::Medium,
                with_body(SPREAD, CelestialBody::Sun, sun),
            )
        })
        .collect();
    let set = extract(&events);
    assert_eq!(set.total_events, 120);
    assert!(set.sign.iter().all(|p| !p.involves(CelestialBody::Sun)));
    // Bodies fixed in one sign are far above a uniform split.
    assert!(set.sign.iter().any(|p| p.name == "sign:Saturn:Sagittarius"));
}

#[test]
fn sign_pattern_records_expected_and_deviation() {
    let mut events = repeated(3, EventCategory::Pandemic, ImpactLevel::Extreme, SPREAD);
    events.extend(repeated(1, EventCategory::Terrorism, ImpactLevel::Low, SPREAD));
    let set = extract(&events);

    let saturn = set.sign.iter().find(|p| p.name == "sign:Saturn:Sagittarius").unwrap();
    assert_eq!(saturn.total_occurrences, 4);
    assert_relative_eq!(saturn.metrics.expected_occurrences.unwrap(), 4.0 / 12.0, epsilon = 1e-12);
    assert_relative_eq!(saturn.metrics.deviation.unwrap(), 4.0 - 4.0 / 12.0, epsilon = 1e-12);
    assert_relative_eq!(saturn.metrics.high_impact_ratio, 0.75, epsilon = 1e-12);
    assert_relative_eq!(saturn.ranking_score, 1100.0, epsilon = 1e-9);
    assert!(matches!(
        saturn.conditions,
        PatternConditions::Sign { body: CelestialBody::Saturn, sign: ZodiacSign::Sagittarius }
    ));
}

// ── Combined patterns ─────────────────────────────────────────────────────

#[test]
fn identical_moments_share_one_combined_signature() {
    let events = repeated(3, EventCategory::War, ImpactLevel::High, SPREAD);
    let set = extract(&events);
    assert_eq!(set.combined.len(), 1);

    let combined = &set.combined[0];
    assert_eq!(combined.total_occurrences, 3);
    assert_relative_eq!(combined.ranking_score, 100.0, epsilon = 1e-9);
    assert!(combined
        .name
        .starts_with("combined:Mars=Gemini,Saturn=Sagittarius,Jupiter=Leo,Sun=Aries,Moon=Pisces|"));
    match &combined.conditions {
        PatternConditions::Combined(signature) => {
            let labels: Vec<String> = signature.aspects.iter().map(|a| a.to_string()).collect();
            assert_eq!(
                labels,
                vec!["Jupiter-Saturn:drishti", "Mars-Saturn:drishti", "Mars-Venus:drishti"]
            );
        }
        other => panic!("unexpected conditions {:?}", other),
    }
}

// ── Ranking & determinism ─────────────────────────────────────────────────

#[test]
fn families_are_ranked_score_then_occurrences_then_name() {
    let mut events = repeated(6, EventCategory::War, ImpactLevel::High, SPREAD);
    events.extend(repeated(3, EventCategory::Political, ImpactLevel::Low, with_body(SPREAD, CelestialBody::Sun, 20.0)));
    let set = extract(&events);

    for kind in [PatternKind::Degree, PatternKind::Aspect, PatternKind::Nakshatra, PatternKind::Sign] {
        let family = set.family(kind);
        for pair in family.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            assert!(
                a.ranking_score > b.ranking_score
                    || (a.ranking_score == b.ranking_score && a.total_occurrences > b.total_occurrences)
                    || (a.ranking_score == b.ranking_score
                        && a.total_occurrences == b.total_occurrences
                        && a.name < b.name),
                "{} before {}",
                a.name,
                b.name
            );
        }
    }
    let ranked = set.ranked();
    assert_eq!(ranked.len(), set.len());
}

#[test]
fn family_cap_truncates_after_ranking() {
    let events = repeated(3, EventCategory::War, ImpactLevel::High, SPREAD);
    let config = ExtractionConfig {
        max_patterns_per_family: Some(2),
        ..ExtractionConfig::default()
    };
    let capped = PatternExtractor::new(config).extract(&events).into_result().unwrap();
    let full = extract(&events);
    assert_eq!(capped.degree.len(), 2);
    assert_eq!(capped.degree[..], full.degree[..2]);
}

#[test]
fn extraction_is_idempotent_and_order_stable() {
    let mut events = repeated(4, EventCategory::War, ImpactLevel::High, SPREAD);
    events.extend(repeated(5, EventCategory::Financial, ImpactLevel::Medium, with_body(SPREAD, CelestialBody::Moon, 333.3)));
    events.extend(repeated(3, EventCategory::Pandemic, ImpactLevel::Extreme, with_body(SPREAD, CelestialBody::Saturn, 253.7)));

    let first = extract(&events);
    let second = extract(&events);
    assert_eq!(first, second);

    let sequential = PatternExtractor::new(ExtractionConfig {
        parallel: false,
        ..ExtractionConfig::default()
    })
    .extract(&events)
    .into_result()
    .unwrap();
    assert_eq!(first, sequential);

    let names: Vec<&str> = first.all().map(|p| p.name.as_str()).collect();
    let mut unique = names.clone();
    unique.sort();
    unique.dedup();
    assert_eq!(unique.len(), names.len());
}

#[test]
fn feature_profile_flags_bodies_and_family() {
    let set = extract(&repeated(3, EventCategory::War, ImpactLevel::High, SPREAD));
    let aspect = set.aspect.iter().find(|p| p.name == "aspect:drishti:Mars-Saturn").unwrap();
    let profile = aspect.feature_profile();

    assert_relative_eq!(profile[0], aspect.ranking_score);
    assert_relative_eq!(profile[1], 3.0);
    assert_relative_eq!(profile[2], 4.0_f64.ln());
    assert_eq!(profile[3], 1.0);
    assert_eq!(profile[4], 0.0);
    assert_eq!(profile[5], aspect.name.len() as f64);
    assert_eq!(&profile[7..], &[1.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0]);
}
