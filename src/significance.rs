//! Ranking-score formulas shared by the simple pattern families.
//!
//! Every score is a comparative ranking number on a rough 0-100 scale. None of them is bounded
//! above and none is a probability: a placement present in every event scores far above its
//! baseline. Callers guarantee a non-zero event count.

use crate::events::EventCategory;
use crate::{Modality, Nakshatra, ZodiacSign};

pub const CRITICAL_DEGREE_BONUS: f64 = 1.5;
pub const TIGHT_ORB_BONUS: f64 = 1.3;
pub const TIGHT_ORB_LIMIT: f64 = 2.0;
pub const HIGH_STRENGTH_BONUS: f64 = 1.2;
pub const HIGH_STRENGTH_LIMIT: f64 = 7.0;
pub const TRADITIONAL_NAKSHATRA_BONUS: f64 = 1.4;

/// Share of events, as a percentage.
pub fn frequency_percent(occurrences: u32, total_events: usize) -> f64 {
    occurrences as f64 / total_events as f64 * 100.0
}

pub fn degree_significance(occurrences: u32, total_events: usize, is_critical: bool) -> f64 {
    let bonus = if is_critical { CRITICAL_DEGREE_BONUS } else { 1.0 };
    frequency_percent(occurrences, total_events) * bonus
}

/// `mean_strength` is on the 0-10 edge strength scale.
pub fn aspect_significance(occurrences: u32, total_events: usize, mean_orb: f64, mean_strength: f64) -> f64 {
    let orb_bonus = if mean_orb < TIGHT_ORB_LIMIT { TIGHT_ORB_BONUS } else { 1.0 };
    let strength_bonus = if mean_strength > HIGH_STRENGTH_LIMIT { HIGH_STRENGTH_BONUS } else { 1.0 };
    frequency_percent(occurrences, total_events) * orb_bonus * strength_bonus
}

/// Relative to the events of one category, not the whole corpus.
pub fn nakshatra_significance(occurrences: u32, category_events: usize, is_traditionally_significant: bool) -> f64 {
    let bonus = if is_traditionally_significant { TRADITIONAL_NAKSHATRA_BONUS } else { 1.0 };
    frequency_percent(occurrences, category_events) * bonus
}

/// Relative deviation from a uniform 12-way split, as a percentage.
pub fn sign_significance(occurrences: u32, total_events: usize) -> f64 {
    let expected = expected_sign_occurrences(total_events);
    (occurrences as f64 - expected).abs() / expected * 100.0
}

pub fn expected_sign_occurrences(total_events: usize) -> f64 {
    total_events as f64 / 12.0
}

/// Critical degrees: 0/13/26 in cardinal signs, 9/21 in fixed signs, 4/17 in mutable signs,
/// and 29 everywhere.
pub fn is_critical_degree(sign: ZodiacSign, degree: u8) -> bool {
    if degree == 29 {
        return true;
    }
    match sign.modality() {
        Modality::Cardinal => matches!(degree, 0 | 13 | 26),
        Modality::Fixed => matches!(degree, 9 | 21),
        Modality::Mutable => matches!(degree, 4 | 17),
    }
}

pub fn traditional_nakshatras(category: EventCategory) -> &'static [Nakshatra] {
    use Nakshatra::*;
    match category {
        EventCategory::Financial => &[Rohini, Pushya, Hasta, Shravana, Dhanishta, Revati],
        EventCategory::Political => &[Krittika, Magha, UttaraPhalguni, Jyeshtha, UttaraAshadha],
        EventCategory::NaturalDisaster => &[Bharani, Ardra, Ashlesha, Moola, Shatabhisha],
        EventCategory::War => &[Bharani, Krittika, Ardra, Jyeshtha, Moola],
        EventCategory::Pandemic => &[Ardra, Ashlesha, Moola, Shatabhisha, PurvaBhadrapada],
        EventCategory::Terrorism => &[Bharani, Ardra, Ashlesha, Jyeshtha, Moola],
    }
}

pub fn is_traditionally_significant(category: EventCategory, nakshatra: Nakshatra) -> bool {
    traditional_nakshatras(category).contains(&nakshatra)
}
