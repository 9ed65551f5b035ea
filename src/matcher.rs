//! Re-test stored pattern conditions against a new moment.

use std::collections::BTreeSet;

use crate::events::EventCategory;
use crate::patterns::{rank_order, AspectPair, Pattern, PatternConditions};
use crate::{AspectEdge, Snapshot};

/// Checks a moment (positions plus aspects) against pattern conditions.
///
/// Nakshatra patterns are mined per category; with [`PatternMatcher::for_category`] only the
/// ones for that category can match.
#[derive(Debug, Clone, Copy, Default)]
pub struct PatternMatcher {
    category: Option<EventCategory>,
}

impl PatternMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_category(category: EventCategory) -> Self {
        PatternMatcher { category: Some(category) }
    }

    pub fn matches(&self, pattern: &Pattern, snapshot: &Snapshot, aspects: &[AspectEdge]) -> bool {
        match &pattern.conditions {
            PatternConditions::Degree { body, sign, degree, .. } => {
                let position = snapshot.position(*body);
                position.sign == *sign && position.rounded_degree() == *degree
            }
            PatternConditions::Aspect { aspect_type, bodies } => {
                let wanted = AspectPair::new(*aspect_type, bodies[0], bodies[1]);
                aspects
                    .iter()
                    .filter_map(AspectPair::from_edge)
                    .any(|pair| pair == wanted)
            }
            PatternConditions::Nakshatra { body, nakshatra, category } => {
                if self.category.is_some_and(|wanted| wanted != *category) {
                    return false;
                }
                snapshot.position(*body).nakshatra == *nakshatra
            }
            PatternConditions::Sign { body, sign } => snapshot.position(*body).sign == *sign,
            // All five placements must agree and every signature pair must be present.
            PatternConditions::Combined(signature) => {
                let placed = signature
                    .placements()
                    .iter()
                    .all(|(body, sign)| snapshot.position(*body).sign == *sign);
                if !placed {
                    return false;
                }
                let present: BTreeSet<AspectPair> = aspects.iter().filter_map(AspectPair::from_edge).collect();
                signature.aspects.iter().all(|pair| present.contains(pair))
            }
        }
    }

    /// Patterns that hold for the moment, best first.
    pub fn matching<'a, I>(&self, patterns: I, snapshot: &Snapshot, aspects: &[AspectEdge]) -> Vec<&'a Pattern>
    where
        I: IntoIterator<Item = &'a Pattern>,
    {
        let mut matched: Vec<&Pattern> = patterns
            .into_iter()
            .filter(|pattern| self.matches(pattern, snapshot, aspects))
            .collect();
        matched.sort_by(|a, b| rank_order(a, b));
        matched
    }
}
