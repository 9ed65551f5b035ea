use approx::assert_relative_eq;
use aztro_patterns::significance::{
    aspect_significance, degree_significance, frequency_percent, is_critical_degree,
    is_traditionally_significant, nakshatra_significance, sign_significance, traditional_nakshatras,
};
use aztro_patterns::{EventCategory, Nakshatra, ZodiacSign};

#[test]
fn frequency_is_a_percentage() {
    assert_relative_eq!(frequency_percent(3, 12), 25.0, epsilon = 1e-9);
    assert_relative_eq!(frequency_percent(0, 7), 0.0, epsilon = 1e-9);
}

#[test]
fn degree_score_applies_critical_bonus() {
    assert_relative_eq!(degree_significance(3, 10, false), 30.0, epsilon = 1e-9);
    assert_relative_eq!(degree_significance(3, 10, true), 45.0, epsilon = 1e-9);
}

#[test]
fn aspect_score_stacks_orb_and_strength_bonuses() {
    assert_relative_eq!(aspect_significance(5, 10, 4.0, 5.0), 50.0, epsilon = 1e-9);
    assert_relative_eq!(aspect_significance(5, 10, 1.5, 5.0), 65.0, epsilon = 1e-9);
    assert_relative_eq!(aspect_significance(5, 10, 4.0, 8.0), 60.0, epsilon = 1e-9);
    assert_relative_eq!(aspect_significance(5, 10, 1.5, 8.0), 78.0, epsilon = 1e-9);
}

#[test]
fn aspect_bonus_thresholds_are_strict() {
    assert_relative_eq!(aspect_significance(1, 1, 2.0, 7.0), 100.0, epsilon = 1e-9);
}

#[test]
fn nakshatra_score_is_category_relative() {
    assert_relative_eq!(nakshatra_significance(2, 4, false), 50.0, epsilon = 1e-9);
    assert_relative_eq!(nakshatra_significance(2, 4, true), 70.0, epsilon = 1e-9);
}

#[test]
fn sign_score_is_relative_deviation() {
    assert_relative_eq!(sign_significance(10, 120), 0.0, epsilon = 1e-9);
    assert_relative_eq!(sign_significance(20, 120), 100.0, epsilon = 1e-9);
    assert_relative_eq!(sign_significance(0, 120), 100.0, epsilon = 1e-9);
    assert_relative_eq!(sign_significance(3, 3), 1100.0, epsilon = 1e-9);
}

#[test]
fn scores_are_monotonic_in_occurrences() {
    let mut previous = (0.0, 0.0, 0.0);
    for occurrences in 1..=20 {
        let current = (
            degree_significance(occurrences, 20, true),
            aspect_significance(occurrences, 20, 1.0, 9.0),
            nakshatra_significance(occurrences, 20, true),
        );
        assert!(current.0 > previous.0);
        assert!(current.1 > previous.1);
        assert!(current.2 > previous.2);
        previous = current;
    }
}

#[test]
fn critical_degrees_depend_on_modality() {
    assert!(is_critical_degree(ZodiacSign::Aries, 0));
    assert!(is_critical_degree(ZodiacSign::Cancer, 13));
    assert!(is_critical_degree(ZodiacSign::Capricorn, 26));
    assert!(is_critical_degree(ZodiacSign::Taurus, 9));
    assert!(is_critical_degree(ZodiacSign::Aquarius, 21));
    assert!(is_critical_degree(ZodiacSign::Gemini, 4));
    assert!(is_critical_degree(ZodiacSign::Pisces, 17));

    assert!(!is_critical_degree(ZodiacSign::Aries, 9));
    assert!(!is_critical_degree(ZodiacSign::Leo, 13));
    assert!(!is_critical_degree(ZodiacSign::Virgo, 21));
    assert!(!is_critical_degree(ZodiacSign::Libra, 15));
}

#[test]
fn twenty_nine_is_critical_everywhere() {
    for sign in ZodiacSign::ALL {
        assert!(is_critical_degree(sign, 29), "{}", sign);
    }
}

#[test]
fn traditional_lists_cover_every_category() {
    for category in EventCategory::ALL {
        assert!(!traditional_nakshatras(category).is_empty(), "{}", category);
    }
    assert!(is_traditionally_significant(EventCategory::War, Nakshatra::Ardra));
    assert!(is_traditionally_significant(EventCategory::Financial, Nakshatra::Pushya));
    assert!(!is_traditionally_significant(EventCategory::Financial, Nakshatra::Ardra));
}
