//! Pattern persistence keyed by pattern name.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::patterns::{rank_order, Pattern, PatternKind};
use crate::AstrologyResult;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpsertSummary {
    pub inserted: usize,
    pub updated: usize,
}

/// Storage for extracted patterns. Upserts are keyed by name, so re-extraction only
/// refreshes existing records.
pub trait PatternStore {
    fn upsert(&mut self, patterns: &[Pattern]) -> AstrologyResult<UpsertSummary>;

    fn get(&self, name: &str) -> AstrologyResult<Option<Pattern>>;

    /// Every stored pattern, best first.
    fn ranked(&self) -> AstrologyResult<Vec<Pattern>>;

    fn by_kind(&self, kind: PatternKind) -> AstrologyResult<Vec<Pattern>> {
        Ok(self.ranked()?.into_iter().filter(|p| p.kind == kind).collect())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InMemoryPatternStore {
    patterns: BTreeMap<String, Pattern>,
}

impl InMemoryPatternStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Pattern> {
        self.patterns.values()
    }

    /// Stored patterns as a JSON array in name order.
    pub fn to_json(&self) -> AstrologyResult<String> {
        let patterns: Vec<&Pattern> = self.patterns.values().collect();
        Ok(serde_json::to_string_pretty(&patterns)?)
    }

    /// Load a JSON array written by [`InMemoryPatternStore::to_json`]. Later duplicates win.
    pub fn from_json(json: &str) -> AstrologyResult<Self> {
        let patterns: Vec<Pattern> = serde_json::from_str(json)?;
        let mut store = Self::new();
        store.upsert(&patterns)?;
        Ok(store)
    }
}

impl PatternStore for InMemoryPatternStore {
    fn upsert(&mut self, patterns: &[Pattern]) -> AstrologyResult<UpsertSummary> {
        let mut summary = UpsertSummary::default();
        for pattern in patterns {
            match self.patterns.insert(pattern.name.clone(), pattern.clone()) {
                Some(_) => summary.updated += 1,
                None => summary.inserted += 1,
            }
        }
        debug!(
            inserted = summary.inserted,
            updated = summary.updated,
            stored = self.patterns.len(),
            "upserted patterns"
        );
        Ok(summary)
    }

    fn get(&self, name: &str) -> AstrologyResult<Option<Pattern>> {
        Ok(self.patterns.get(name).cloned())
    }

    fn ranked(&self) -> AstrologyResult<Vec<Pattern>> {
        let mut patterns: Vec<Pattern> = self.patterns.values().cloned().collect();
        patterns.sort_by(rank_order);
        Ok(patterns)
    }
}
