//! Engine configuration.
//!
//! Resolution order (highest priority first):
//! 1. Environment variables (`AZTRO_*`)
//! 2. TOML file passed to [`EngineConfig::load`]
//! 3. Compiled defaults

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {message}")]
    Parse { path: String, message: String },

    #[error("invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct EngineConfig {
    pub aspects: AspectConfig,
    pub extraction: ExtractionConfig,
    pub risk: RiskConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AspectConfig {
    /// Give Rahu and Ketu the 5th/9th special aspects. Default: false.
    pub node_special_aspects: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Qualifying events needed before any pattern is reported. Default: 3.
    pub min_events: usize,
    /// Default: 3.
    pub degree_min_occurrences: u32,
    /// Default: 3.
    pub aspect_min_occurrences: u32,
    /// Nakshatras split the zodiac 27 ways, so the bar is lower. Default: 2.
    pub nakshatra_min_occurrences: u32,
    /// Default: 2.
    pub combined_min_occurrences: u32,
    /// Sign groups must deviate from the uniform expectation by more than this. Default: 1.0.
    pub sign_min_deviation: f64,
    /// Keep only the top-ranked patterns of each family. Default: unlimited.
    pub max_patterns_per_family: Option<usize>,
    /// Tally events on the rayon pool. Default: true.
    pub parallel: bool,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            min_events: 3,
            degree_min_occurrences: 3,
            aspect_min_occurrences: 3,
            nakshatra_min_occurrences: 2,
            combined_min_occurrences: 2,
            sign_min_deviation: 1.0,
            max_patterns_per_family: None,
            parallel: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    /// Categories with fewer training rows stay untrained. Default: 5.
    pub min_training_rows: usize,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self { min_training_rows: 5 }
    }
}

impl EngineConfig {
    /// Load from a TOML file, then apply environment overrides and validate.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let mut config = Self::parse(&content, &path.display().to_string())?;
        config.apply_env_overrides();
        config.validate()?;
        debug!(path = %path.display(), "loaded engine config");
        Ok(config)
    }

    /// Parse and validate a TOML string. No environment overrides are applied.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config = Self::parse(content, "<inline>")?;
        config.validate()?;
        Ok(config)
    }

    fn parse(content: &str, origin: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: origin.to_string(),
            message: e.to_string(),
        })
    }

    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply `AZTRO_*` overrides from an arbitrary lookup. Unparseable values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(flag) = lookup("AZTRO_NODE_SPECIAL_ASPECTS").and_then(|v| parse_bool(&v)) {
            self.aspects.node_special_aspects = flag;
        }
        if let Some(min) = lookup("AZTRO_MIN_EVENTS").and_then(|v| v.trim().parse().ok()) {
            self.extraction.min_events = min;
        }
        if let Some(flag) = lookup("AZTRO_PARALLEL").and_then(|v| parse_bool(&v)) {
            self.extraction.parallel = flag;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let extraction = &self.extraction;
        if extraction.min_events == 0 {
            return Err(invalid("extraction.min_events", "must be at least 1"));
        }
        let thresholds = [
            ("extraction.degree_min_occurrences", extraction.degree_min_occurrences),
            ("extraction.aspect_min_occurrences", extraction.aspect_min_occurrences),
            ("extraction.nakshatra_min_occurrences", extraction.nakshatra_min_occurrences),
            ("extraction.combined_min_occurrences", extraction.combined_min_occurrences),
        ];
        for (field, value) in thresholds {
            if value == 0 {
                return Err(invalid(field, "must be at least 1"));
            }
        }
        if !extraction.sign_min_deviation.is_finite() || extraction.sign_min_deviation < 0.0 {
            return Err(invalid("extraction.sign_min_deviation", "must be a finite, non-negative number"));
        }
        if self.risk.min_training_rows < 2 {
            return Err(invalid("risk.min_training_rows", "must be at least 2"));
        }
        Ok(())
    }
}

fn invalid(field: &str, message: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        message: message.to_string(),
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
