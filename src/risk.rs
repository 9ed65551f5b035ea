//! Per-category impact models and the blended risk assessment built on them.
//!
//! Models are plain weight vectors fitted feature by feature. They are retrained wholesale and
//! published through [`ModelStore`], which swaps the whole map at once.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use approx::abs_diff_eq;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::RiskConfig;
use crate::events::{EventCategory, EventRecord};
use crate::matcher::PatternMatcher;
use crate::patterns::{Pattern, PatternConditions};
use crate::{AspectEdge, BodyPosition, CelestialBody, Snapshot, ZodiacSign};

pub const FEATURE_DIMENSIONS: usize = 4;

/// Risk and confidence reported for a category with no trained model.
pub const UNTRAINED_RISK: f64 = 0.5;
pub const UNTRAINED_CONFIDENCE: f64 = 0.1;

/// A prediction within this many impact levels of the label counts as accurate.
pub const ACCURACY_TOLERANCE: f64 = 0.5;

pub const MAX_CONTRIBUTING_FACTORS: usize = 5;

const MIN_LEVEL: f64 = 1.0;
const MAX_LEVEL: f64 = 4.0;

// ---------------------------
// ## Features
// ---------------------------

/// `[body index, sign index, corpus frequency of (body, sign), sign pattern score]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector(pub [f64; FEATURE_DIMENSIONS]);

impl FeatureVector {
    pub fn new(body: CelestialBody, sign: ZodiacSign, frequency: f64, pattern_score: f64) -> Self {
        FeatureVector([body.index() as f64, sign.index() as f64, frequency, pattern_score])
    }

    pub fn values(&self) -> &[f64; FEATURE_DIMENSIONS] {
        &self.0
    }
}

/// Corpus statistics needed to turn a body placement into a [`FeatureVector`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureContext {
    /// Share of qualifying events with the body in the sign, indexed `[body][sign]`.
    frequencies: [[f64; 12]; 9],
    /// Ranking score of the matching sign pattern, 0 when none was kept.
    sign_scores: [[f64; 12]; 9],
}

impl FeatureContext {
    pub fn from_corpus(events: &[EventRecord], patterns: &[Pattern]) -> Self {
        let mut context = FeatureContext::default();

        let snapshots: Vec<&Snapshot> = events.iter().filter_map(EventRecord::qualifying_snapshot).collect();
        if !snapshots.is_empty() {
            let share = 1.0 / snapshots.len() as f64;
            for snapshot in &snapshots {
                for position in snapshot.iter() {
                    context.frequencies[position.body.index()][position.sign.index()] += share;
                }
            }
        }

        for pattern in patterns {
            if let PatternConditions::Sign { body, sign } = pattern.conditions {
                context.sign_scores[body.index()][sign.index()] = pattern.ranking_score;
            }
        }
        context
    }

    pub fn frequency(&self, body: CelestialBody, sign: ZodiacSign) -> f64 {
        self.frequencies[body.index()][sign.index()]
    }

    pub fn sign_score(&self, body: CelestialBody, sign: ZodiacSign) -> f64 {
        self.sign_scores[body.index()][sign.index()]
    }

    pub fn features(&self, position: &BodyPosition) -> FeatureVector {
        FeatureVector::new(
            position.body,
            position.sign,
            self.frequency(position.body, position.sign),
            self.sign_score(position.body, position.sign),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrainingRow {
    pub category: EventCategory,
    pub features: FeatureVector,
    /// Impact level, 1 (low) to 4 (extreme).
    pub label: f64,
}

/// One row per body per qualifying event.
pub fn training_rows(events: &[EventRecord], context: &FeatureContext) -> Vec<TrainingRow> {
    events
        .iter()
        .filter_map(|event| event.qualifying_snapshot().map(|snapshot| (event, snapshot)))
        .flat_map(|(event, snapshot)| {
            snapshot.iter().map(move |position| TrainingRow {
                category: event.category,
                features: context.features(position),
                label: event.impact.level() as f64,
            })
        })
        .collect()
}

// ---------------------------
// ## Models
// ---------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryModel {
    pub weights: [f64; FEATURE_DIMENSIONS],
    pub bias: f64,
    /// Share of training rows predicted within half a level of their label.
    pub accuracy: f64,
    pub training_size: usize,
}

impl CategoryModel {
    /// Predicted impact level, clamped to 1..=4.
    pub fn predict(&self, features: &FeatureVector) -> f64 {
        let raw: f64 = self
            .weights
            .iter()
            .zip(features.values())
            .map(|(w, x)| w * x)
            .sum::<f64>()
            + self.bias;
        raw.clamp(MIN_LEVEL, MAX_LEVEL)
    }

    /// Mean predicted level over the features, mapped onto 0..=1.
    pub fn risk(&self, features: &[FeatureVector]) -> f64 {
        if features.is_empty() {
            return UNTRAINED_RISK;
        }
        let mean = features.iter().map(|f| self.predict(f)).sum::<f64>() / features.len() as f64;
        (mean - MIN_LEVEL) / (MAX_LEVEL - MIN_LEVEL)
    }
}

/// Fits a [`CategoryModel`] to labelled rows. `None` when there is nothing to fit.
pub trait Regressor {
    fn fit(&self, rows: &[TrainingRow]) -> Option<CategoryModel>;
}

/// Independent univariate least-squares fits, averaged.
///
/// Each feature gets `slope = cov(x, y) / var(x)` (0 for a constant feature); the weight is that
/// slope divided by the number of features, and the bias recentres the projection on mean(y).
#[derive(Debug, Clone, Copy, Default)]
pub struct PerFeatureRegression;

impl Regressor for PerFeatureRegression {
    fn fit(&self, rows: &[TrainingRow]) -> Option<CategoryModel> {
        if rows.is_empty() {
            return None;
        }
        let n = rows.len() as f64;
        let mean_y = rows.iter().map(|r| r.label).sum::<f64>() / n;

        let mut means = [0.0; FEATURE_DIMENSIONS];
        for row in rows {
            for (mean, x) in means.iter_mut().zip(row.features.values()) {
                *mean += x / n;
            }
        }

        let mut weights = [0.0; FEATURE_DIMENSIONS];
        for (j, weight) in weights.iter_mut().enumerate() {
            let (mut covariance, mut variance) = (0.0, 0.0);
            for row in rows {
                let dx = row.features.0[j] - means[j];
                covariance += dx * (row.label - mean_y);
                variance += dx * dx;
            }
            let slope = if abs_diff_eq!(variance, 0.0, epsilon = 1e-12) {
                0.0
            } else {
                covariance / variance
            };
            *weight = slope / FEATURE_DIMENSIONS as f64;
        }

        let bias = mean_y - weights.iter().zip(&means).map(|(w, m)| w * m).sum::<f64>();
        let mut model = CategoryModel {
            weights,
            bias,
            accuracy: 0.0,
            training_size: rows.len(),
        };

        let accurate = rows
            .iter()
            .filter(|row| (model.predict(&row.features) - row.label).abs() <= ACCURACY_TOLERANCE)
            .count();
        model.accuracy = accurate as f64 / n;
        Some(model)
    }
}

/// Everything one training run produced. Immutable once built.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelSnapshot {
    pub models: BTreeMap<EventCategory, CategoryModel>,
    pub context: FeatureContext,
}

impl ModelSnapshot {
    pub fn model(&self, category: EventCategory) -> Option<&CategoryModel> {
        self.models.get(&category)
    }

    pub fn is_trained(&self, category: EventCategory) -> bool {
        self.models.contains_key(&category)
    }
}

/// Copy-on-write holder of the current [`ModelSnapshot`].
///
/// Readers take an `Arc` and keep a consistent view for as long as they hold it, even across a
/// concurrent [`ModelStore::replace`].
#[derive(Debug, Default)]
pub struct ModelStore {
    current: RwLock<Arc<ModelSnapshot>>,
}

impl ModelStore {
    pub fn new(snapshot: ModelSnapshot) -> Self {
        ModelStore {
            current: RwLock::new(Arc::new(snapshot)),
        }
    }

    pub fn snapshot(&self) -> Arc<ModelSnapshot> {
        self.current.read().clone()
    }

    /// Publish a new snapshot, returning the one it supersedes.
    pub fn replace(&self, snapshot: ModelSnapshot) -> Arc<ModelSnapshot> {
        let next = Arc::new(snapshot);
        let previous = std::mem::replace(&mut *self.current.write(), next);
        debug!(categories = previous.models.len(), "replaced model snapshot");
        previous
    }
}

// ---------------------------
// ## Assessment
// ---------------------------

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Extreme,
}

impl RiskLevel {
    /// Low below 0.35, medium below 0.55, high below 0.75, extreme above.
    pub fn from_score(score: f64) -> Self {
        if score < 0.35 {
            RiskLevel::Low
        } else if score < 0.55 {
            RiskLevel::Medium
        } else if score < 0.75 {
            RiskLevel::High
        } else {
            RiskLevel::Extreme
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Extreme => "extreme",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryRisk {
    pub category: EventCategory,
    /// 0..=1.
    pub risk: f64,
    pub confidence: f64,
    pub trained: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub score: f64,
    pub level: RiskLevel,
    pub breakdown: Vec<CategoryRisk>,
    /// Names of the strongest patterns present in the moment.
    pub contributing_factors: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct RiskEstimator<R = PerFeatureRegression> {
    config: RiskConfig,
    regressor: R,
}

impl RiskEstimator<PerFeatureRegression> {
    pub fn new(config: RiskConfig) -> Self {
        Self::with_regressor(config, PerFeatureRegression)
    }
}

impl Default for RiskEstimator<PerFeatureRegression> {
    fn default() -> Self {
        Self::new(RiskConfig::default())
    }
}

impl<R: Regressor> RiskEstimator<R> {
    pub fn with_regressor(config: RiskConfig, regressor: R) -> Self {
        RiskEstimator { config, regressor }
    }

    /// Fit one model per category from the corpus and the patterns extracted from it.
    ///
    /// Categories with fewer than `min_training_rows` rows are left untrained.
    pub fn train(&self, events: &[EventRecord], patterns: &[Pattern]) -> ModelSnapshot {
        let context = FeatureContext::from_corpus(events, patterns);

        let mut by_category: BTreeMap<EventCategory, Vec<TrainingRow>> = BTreeMap::new();
        for row in training_rows(events, &context) {
            by_category.entry(row.category).or_default().push(row);
        }

        let mut models = BTreeMap::new();
        for (category, rows) in by_category {
            if rows.len() < self.config.min_training_rows {
                debug!(
                    %category,
                    rows = rows.len(),
                    required = self.config.min_training_rows,
                    "too few rows, category stays untrained"
                );
                continue;
            }
            if let Some(model) = self.regressor.fit(&rows) {
                info!(
                    %category,
                    rows = model.training_size,
                    accuracy = model.accuracy,
                    "trained category model"
                );
                models.insert(category, model);
            }
        }

        ModelSnapshot { models, context }
    }

    /// Blend every category's risk for one moment, weighted by model confidence.
    pub fn assess(
        &self,
        models: &ModelSnapshot,
        snapshot: &Snapshot,
        aspects: &[AspectEdge],
        patterns: &[Pattern],
    ) -> RiskAssessment {
        let features: Vec<FeatureVector> = snapshot.iter().map(|p| models.context.features(p)).collect();

        let breakdown: Vec<CategoryRisk> = EventCategory::ALL
            .iter()
            .map(|&category| match models.model(category) {
                Some(model) => CategoryRisk {
                    category,
                    risk: model.risk(&features),
                    confidence: model.accuracy,
                    trained: true,
                },
                None => CategoryRisk {
                    category,
                    risk: UNTRAINED_RISK,
                    confidence: UNTRAINED_CONFIDENCE,
                    trained: false,
                },
            })
            .collect();

        let total_confidence: f64 = breakdown.iter().map(|c| c.confidence).sum();
        let score = if total_confidence > 0.0 {
            breakdown.iter().map(|c| c.risk * c.confidence).sum::<f64>() / total_confidence
        } else {
            UNTRAINED_RISK
        };

        let contributing_factors = PatternMatcher::new()
            .matching(patterns, snapshot, aspects)
            .into_iter()
            .take(MAX_CONTRIBUTING_FACTORS)
            .map(|pattern| pattern.name.clone())
            .collect();

        RiskAssessment {
            score,
            level: RiskLevel::from_score(score),
            breakdown,
            contributing_factors,
        }
    }
}
