use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::*;

// ---------------------------
// ## Event Vocabulary
// ---------------------------

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventCategory {
    Financial,
    Political,
    NaturalDisaster,
    War,
    Pandemic,
    Terrorism,
}

impl EventCategory {
    pub const ALL: [EventCategory; 6] = [
        EventCategory::Financial,
        EventCategory::Political,
        EventCategory::NaturalDisaster,
        EventCategory::War,
        EventCategory::Pandemic,
        EventCategory::Terrorism,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EventCategory::Financial => "financial",
            EventCategory::Political => "political",
            EventCategory::NaturalDisaster => "natural_disaster",
            EventCategory::War => "war",
            EventCategory::Pandemic => "pandemic",
            EventCategory::Terrorism => "terrorism",
        }
    }
}

impl fmt::Display for EventCategory {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImpactLevel {
    Low = 1,
    Medium,
    High,
    Extreme,
}

impl ImpactLevel {
    /// Numeric label used by the risk models: low = 1 through extreme = 4.
    pub fn level(self) -> u8 {
        self as u8
    }

    pub fn is_high(self) -> bool {
        matches!(self, ImpactLevel::High | ImpactLevel::Extreme)
    }
}

impl fmt::Display for ImpactLevel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let label = match self {
            ImpactLevel::Low => "low",
            ImpactLevel::Medium => "medium",
            ImpactLevel::High => "high",
            ImpactLevel::Extreme => "extreme",
        };
        write!(f, "{}", label)
    }
}

/// A historical event together with the sky at the moment it happened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub id: String,
    pub date: DateTime<Utc>,
    pub category: EventCategory,
    pub impact: ImpactLevel,
    #[serde(default)]
    pub snapshot: Option<Snapshot>,
    #[serde(default)]
    pub aspects: Vec<AspectEdge>,
}

impl EventRecord {
    /// Events without a snapshot are skipped by extraction and training.
    pub fn qualifying_snapshot(&self) -> Option<&Snapshot> {
        self.snapshot.as_ref()
    }

    /// Body-to-body edges only; house edges do not name a second body.
    pub fn body_aspects(&self) -> impl Iterator<Item = &AspectEdge> {
        self.aspects.iter().filter(|edge| edge.body_pair().is_some())
    }
}

// ---------------------------
// ## Event Store
// ---------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventFilter {
    /// Inclusive lower bound on the event date.
    pub from: Option<DateTime<Utc>>,
    /// Inclusive upper bound on the event date.
    pub to: Option<DateTime<Utc>>,
    pub category: Option<EventCategory>,
    pub min_impact: Option<ImpactLevel>,
    pub limit: Option<usize>,
}

impl EventFilter {
    pub fn accepts(&self, event: &EventRecord) -> bool {
        if self.from.is_some_and(|from| event.date < from) {
            return false;
        }
        if self.to.is_some_and(|to| event.date > to) {
            return false;
        }
        if self.category.is_some_and(|category| event.category != category) {
            return false;
        }
        if self.min_impact.is_some_and(|min| event.impact < min) {
            return false;
        }
        true
    }
}

/// Read-only source of historical events.
pub trait EventStore {
    /// Matching events ordered by date, then id.
    fn events(&self, filter: &EventFilter) -> AstrologyResult<Vec<EventRecord>>;
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryEventStore {
    events: Vec<EventRecord>,
}

impl InMemoryEventStore {
    pub fn new(mut events: Vec<EventRecord>) -> Self {
        events.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.id.cmp(&b.id)));
        InMemoryEventStore { events }
    }

    pub fn from_json(json: &str) -> AstrologyResult<Self> {
        let events: Vec<EventRecord> = serde_json::from_str(json)?;
        Ok(Self::new(events))
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl EventStore for InMemoryEventStore {
    fn events(&self, filter: &EventFilter) -> AstrologyResult<Vec<EventRecord>> {
        let limit = filter.limit.unwrap_or(usize::MAX);
        let selected: Vec<EventRecord> = self
            .events
            .iter()
            .filter(|event| filter.accepts(event))
            .take(limit)
            .cloned()
            .collect();
        debug!(matched = selected.len(), total = self.events.len(), "filtered events");
        Ok(selected)
    }
}
