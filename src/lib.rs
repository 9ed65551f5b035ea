use serde::{Deserialize, Serialize};
use std::fmt;

pub mod aspects;
pub mod config;
pub mod ephemeris;
pub mod events;
pub mod matcher;
pub mod patterns;
pub mod position;
pub mod risk;
pub mod significance;
pub mod store;

pub use aspects::{AspectEdge, AspectEndpoint, AspectEngine, AspectNature, AspectStrength, AspectType};
pub use config::{AspectConfig, ConfigError, EngineConfig, ExtractionConfig, RiskConfig};
pub use ephemeris::{BodyReading, Location, MomentChart, PositionProvider, ProviderReading};
pub use events::{EventCategory, EventFilter, EventRecord, EventStore, ImpactLevel, InMemoryEventStore};
pub use matcher::PatternMatcher;
pub use patterns::{
    AspectPair, CombinedSignature, Extraction, Pattern, PatternConditions, PatternExtractor,
    PatternKind, PatternMetrics, PatternSet,
};
pub use position::{Ascendant, BodyPosition, NakshatraInfo, Snapshot};
pub use risk::{
    CategoryModel, CategoryRisk, FeatureContext, FeatureVector, ModelSnapshot, ModelStore, PerFeatureRegression,
    Regressor, RiskAssessment, RiskEstimator, RiskLevel, TrainingRow,
};
pub use store::{InMemoryPatternStore, PatternStore, UpsertSummary};

/// Width of one nakshatra (13°20').
pub const NAKSHATRA_SPAN: f64 = 360.0 / 27.0;
/// Width of one pada (3°20').
pub const PADA_SPAN: f64 = NAKSHATRA_SPAN / 4.0;

// ---------------------------
// ## Enumerations
// ---------------------------

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CelestialBody {
    Sun,
    Moon,
    Mars,
    Mercury,
    Jupiter,
    Venus,
    Saturn,
    Rahu,
    Ketu,
}

impl CelestialBody {
    pub const ALL: [CelestialBody; 9] = [
        CelestialBody::Sun,
        CelestialBody::Moon,
        CelestialBody::Mars,
        CelestialBody::Mercury,
        CelestialBody::Jupiter,
        CelestialBody::Venus,
        CelestialBody::Saturn,
        CelestialBody::Rahu,
        CelestialBody::Ketu,
    ];

    pub fn iter() -> impl Iterator<Item = CelestialBody> {
        Self::ALL.iter().copied()
    }

    /// Position in the canonical order; doubles as the planet-index feature.
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            CelestialBody::Sun => "Sun",
            CelestialBody::Moon => "Moon",
            CelestialBody::Mars => "Mars",
            CelestialBody::Mercury => "Mercury",
            CelestialBody::Jupiter => "Jupiter",
            CelestialBody::Venus => "Venus",
            CelestialBody::Saturn => "Saturn",
            CelestialBody::Rahu => "Rahu",
            CelestialBody::Ketu => "Ketu",
        }
    }

    /// Natural benefics: Moon, Mercury, Jupiter, Venus.
    pub fn is_natural_benefic(self) -> bool {
        match self {
            CelestialBody::Jupiter
            | CelestialBody::Venus
            | CelestialBody::Mercury
            | CelestialBody::Moon => true,
            CelestialBody::Sun
            | CelestialBody::Saturn
            | CelestialBody::Mars
            | CelestialBody::Rahu
            | CelestialBody::Ketu => false,
        }
    }
}

impl fmt::Display for CelestialBody {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum House {
    First = 1,
    Second,
    Third,
    Fourth,
    Fifth,
    Sixth,
    Seventh,
    Eighth,
    Ninth,
    Tenth,
    Eleventh,
    Twelfth,
}

impl House {
    pub fn from_index(index: usize) -> Option<House> {
        match index {
            1 => Some(House::First),
            2 => Some(House::Second),
            3 => Some(House::Third),
            4 => Some(House::Fourth),
            5 => Some(House::Fifth),
            6 => Some(House::Sixth),
            7 => Some(House::Seventh),
            8 => Some(House::Eighth),
            9 => Some(House::Ninth),
            10 => Some(House::Tenth),
            11 => Some(House::Eleventh),
            12 => Some(House::Twelfth),
            _ => None,
        }
    }

    pub fn number(self) -> u8 {
        self as u8
    }

    /// House reached by moving `offset` places forward on the wheel:
    /// `((house - 1 + offset) mod 12) + 1`.
    pub fn advance(self, offset: usize) -> House {
        let target = ((self.number() as usize - 1 + offset) % 12) + 1;
        // target is always in 1..=12
        House::from_index(target).unwrap_or(House::First)
    }

    /// The house counted `count`-th from this one, inclusively ("7th from" = advance 6).
    pub fn nth_from(self, count: usize) -> House {
        self.advance(count.saturating_sub(1))
    }

    /// Whole-sign house of `sign` for an ascendant in `ascendant_sign`.
    pub fn from_signs(sign: ZodiacSign, ascendant_sign: ZodiacSign) -> House {
        let offset = (sign.index() + 12 - ascendant_sign.index()) % 12;
        House::First.advance(offset)
    }
}

impl fmt::Display for House {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ZodiacSign {
    Aries = 0,
    Taurus,
    Gemini,
    Cancer,
    Leo,
    Virgo,
    Libra,
    Scorpio,
    Sagittarius,
    Capricorn,
    Aquarius,
    Pisces,
}

impl ZodiacSign {
    pub const ALL: [ZodiacSign; 12] = [
        ZodiacSign::Aries,
        ZodiacSign::Taurus,
        ZodiacSign::Gemini,
        ZodiacSign::Cancer,
        ZodiacSign::Leo,
        ZodiacSign::Virgo,
        ZodiacSign::Libra,
        ZodiacSign::Scorpio,
        ZodiacSign::Sagittarius,
        ZodiacSign::Capricorn,
        ZodiacSign::Aquarius,
        ZodiacSign::Pisces,
    ];

    pub fn from_longitude(longitude: f64) -> Self {
        let normalized_longitude = longitude.rem_euclid(360.0);
        let sign_index = (normalized_longitude / 30.0).floor() as usize;
        Self::from_index(sign_index % 12)
    }

    pub fn from_index(index: usize) -> Self {
        Self::ALL[index % 12]
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            ZodiacSign::Aries => "Aries",
            ZodiacSign::Taurus => "Taurus",
            ZodiacSign::Gemini => "Gemini",
            ZodiacSign::Cancer => "Cancer",
            ZodiacSign::Leo => "Leo",
            ZodiacSign::Virgo => "Virgo",
            ZodiacSign::Libra => "Libra",
            ZodiacSign::Scorpio => "Scorpio",
            ZodiacSign::Sagittarius => "Sagittarius",
            ZodiacSign::Capricorn => "Capricorn",
            ZodiacSign::Aquarius => "Aquarius",
            ZodiacSign::Pisces => "Pisces",
        }
    }

    pub fn modality(self) -> Modality {
        match self.index() % 3 {
            0 => Modality::Cardinal,
            1 => Modality::Fixed,
            _ => Modality::Mutable,
        }
    }
}

impl fmt::Display for ZodiacSign {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Modality {
    Cardinal,
    Fixed,
    Mutable,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Nakshatra {
    Ashwini,
    Bharani,
    Krittika,
    Rohini,
    Mrigashira,
    Ardra,
    Punarvasu,
    Pushya,
    Ashlesha,
    Magha,
    PurvaPhalguni,
    UttaraPhalguni,
    Hasta,
    Chitra,
    Swati,
    Vishakha,
    Anuradha,
    Jyeshtha,
    Moola,
    PurvaAshadha,
    UttaraAshadha,
    Shravana,
    Dhanishta,
    Shatabhisha,
    PurvaBhadrapada,
    UttaraBhadrapada,
    Revati,
}

impl Nakshatra {
    pub const ALL: [Nakshatra; 27] = [
        Nakshatra::Ashwini,
        Nakshatra::Bharani,
        Nakshatra::Krittika,
        Nakshatra::Rohini,
        Nakshatra::Mrigashira,
        Nakshatra::Ardra,
        Nakshatra::Punarvasu,
        Nakshatra::Pushya,
        Nakshatra::Ashlesha,
        Nakshatra::Magha,
        Nakshatra::PurvaPhalguni,
        Nakshatra::UttaraPhalguni,
        Nakshatra::Hasta,
        Nakshatra::Chitra,
        Nakshatra::Swati,
        Nakshatra::Vishakha,
        Nakshatra::Anuradha,
        Nakshatra::Jyeshtha,
        Nakshatra::Moola,
        Nakshatra::PurvaAshadha,
        Nakshatra::UttaraAshadha,
        Nakshatra::Shravana,
        Nakshatra::Dhanishta,
        Nakshatra::Shatabhisha,
        Nakshatra::PurvaBhadrapada,
        Nakshatra::UttaraBhadrapada,
        Nakshatra::Revati,
    ];

    pub fn from_longitude(longitude: f64) -> Nakshatra {
        let normalized_longitude = longitude.rem_euclid(360.0);
        let nakshatra_index = (normalized_longitude / NAKSHATRA_SPAN).floor() as usize;
        Self::ALL[nakshatra_index.min(26)]
    }

    pub fn index(self) -> usize {
        self as usize
    }

    /// Vimshottari lord: Ketu, Venus, Sun, Moon, Mars, Rahu, Jupiter, Saturn, Mercury, repeated.
    pub fn lord(self) -> CelestialBody {
        const LORDS: [CelestialBody; 9] = [
            CelestialBody::Ketu,
            CelestialBody::Venus,
            CelestialBody::Sun,
            CelestialBody::Moon,
            CelestialBody::Mars,
            CelestialBody::Rahu,
            CelestialBody::Jupiter,
            CelestialBody::Saturn,
            CelestialBody::Mercury,
        ];
        LORDS[self.index() % 9]
    }

    pub fn name(self) -> &'static str {
        match self {
            Nakshatra::Ashwini => "Ashwini",
            Nakshatra::Bharani => "Bharani",
            Nakshatra::Krittika => "Krittika",
            Nakshatra::Rohini => "Rohini",
            Nakshatra::Mrigashira => "Mrigashira",
            Nakshatra::Ardra => "Ardra",
            Nakshatra::Punarvasu => "Punarvasu",
            Nakshatra::Pushya => "Pushya",
            Nakshatra::Ashlesha => "Ashlesha",
            Nakshatra::Magha => "Magha",
            Nakshatra::PurvaPhalguni => "Purva Phalguni",
            Nakshatra::UttaraPhalguni => "Uttara Phalguni",
            Nakshatra::Hasta => "Hasta",
            Nakshatra::Chitra => "Chitra",
            Nakshatra::Swati => "Swati",
            Nakshatra::Vishakha => "Vishakha",
            Nakshatra::Anuradha => "Anuradha",
            Nakshatra::Jyeshtha => "Jyeshtha",
            Nakshatra::Moola => "Moola",
            Nakshatra::PurvaAshadha => "Purva Ashadha",
            Nakshatra::UttaraAshadha => "Uttara Ashadha",
            Nakshatra::Shravana => "Shravana",
            Nakshatra::Dhanishta => "Dhanishta",
            Nakshatra::Shatabhisha => "Shatabhisha",
            Nakshatra::PurvaBhadrapada => "Purva Bhadrapada",
            Nakshatra::UttaraBhadrapada => "Uttara Bhadrapada",
            Nakshatra::Revati => "Revati",
        }
    }
}

impl fmt::Display for Nakshatra {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

// ---------------------------
// ## Error Handling
// ---------------------------

#[derive(Debug, thiserror::Error)]
pub enum AstrologyError {
    #[error("Invalid Input: {0}")]
    InvalidInput(String),

    #[error("Insufficient Data: {qualifying} qualifying events, at least {required} required")]
    InsufficientData { qualifying: usize, required: usize },

    #[error("Position Provider Error: {0}")]
    Provider(String),

    #[error("Configuration Error: {0}")]
    Config(#[from] ConfigError),

    #[error("Serialization Error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type AstrologyResult<T> = Result<T, AstrologyError>;
