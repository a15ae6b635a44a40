//! Entity classification capability: label each sentence of a text with the
//! semantic categories of the entities it mentions.

/// Offline rule-based classifier.
pub mod lexicon;
/// Classifier backed by an external NER service.
pub mod remote;

use std::{fmt, str::FromStr, sync::Arc, time::Duration};

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use lexicon::LexiconEntityClassifier;
pub use remote::HttpEntityClassifier;

/// OntoNotes entity categories, as emitted by common NER models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityLabel {
    /// People, including fictional.
    Person,
    /// Nationalities, religious or political groups.
    Norp,
    /// Buildings, airports, highways, bridges.
    Fac,
    /// Companies, agencies, institutions.
    Org,
    /// Countries, cities, states.
    Gpe,
    /// Non-GPE locations: mountain ranges, bodies of water.
    Loc,
    /// Objects, vehicles, foods.
    Product,
    /// Named hurricanes, battles, wars, sports events.
    Event,
    /// Titles of books, songs, paintings.
    WorkOfArt,
    /// Named documents made into laws.
    Law,
    /// Named languages.
    Language,
    /// Absolute or relative dates or periods.
    Date,
    /// Times smaller than a day.
    Time,
    /// Percentages.
    Percent,
    /// Monetary values.
    Money,
    /// Measurements.
    Quantity,
    /// "first", "second".
    Ordinal,
    /// Numerals that do not fall under another type.
    Cardinal,
    /// Any label outside the known set.
    #[serde(other)]
    Other,
}

/// Labels that mark a sentence as geographically or culturally relevant.
pub const GEOCULTURAL_LABELS: [EntityLabel; 7] = [
    EntityLabel::Gpe,
    EntityLabel::Loc,
    EntityLabel::Fac,
    EntityLabel::Org,
    EntityLabel::Norp,
    EntityLabel::Event,
    EntityLabel::WorkOfArt,
];

impl EntityLabel {
    /// Canonical upper-case label name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Person => "PERSON",
            Self::Norp => "NORP",
            Self::Fac => "FAC",
            Self::Org => "ORG",
            Self::Gpe => "GPE",
            Self::Loc => "LOC",
            Self::Product => "PRODUCT",
            Self::Event => "EVENT",
            Self::WorkOfArt => "WORK_OF_ART",
            Self::Law => "LAW",
            Self::Language => "LANGUAGE",
            Self::Date => "DATE",
            Self::Time => "TIME",
            Self::Percent => "PERCENT",
            Self::Money => "MONEY",
            Self::Quantity => "QUANTITY",
            Self::Ordinal => "ORDINAL",
            Self::Cardinal => "CARDINAL",
            Self::Other => "OTHER",
        }
    }

    /// True for the place/culture categories the filter keeps.
    #[must_use]
    pub fn is_geocultural(self) -> bool {
        GEOCULTURAL_LABELS.contains(&self)
    }
}

impl fmt::Display for EntityLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityLabel {
    type Err = std::convert::Infallible;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let label = match raw.trim().to_ascii_uppercase().as_str() {
            "PERSON" => Self::Person,
            "NORP" => Self::Norp,
            "FAC" => Self::Fac,
            "ORG" => Self::Org,
            "GPE" => Self::Gpe,
            "LOC" => Self::Loc,
            "PRODUCT" => Self::Product,
            "EVENT" => Self::Event,
            "WORK_OF_ART" => Self::WorkOfArt,
            "LAW" => Self::Law,
            "LANGUAGE" => Self::Language,
            "DATE" => Self::Date,
            "TIME" => Self::Time,
            "PERCENT" => Self::Percent,
            "MONEY" => Self::Money,
            "QUANTITY" => Self::Quantity,
            "ORDINAL" => Self::Ordinal,
            "CARDINAL" => Self::Cardinal,
            _ => Self::Other,
        };
        Ok(label)
    }
}

/// One sentence span with the labels of the entities recognized inside it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifiedSentence {
    /// Sentence text as segmented by the classifier.
    pub text: String,
    /// Entity labels found in the sentence, possibly repeated.
    #[serde(default)]
    pub labels: Vec<EntityLabel>,
}

impl ClassifiedSentence {
    /// True when any label is geo-cultural.
    #[must_use]
    pub fn is_geocultural(&self) -> bool {
        self.labels.iter().any(|label| label.is_geocultural())
    }
}

/// Segments text into sentences and labels their entities.
///
/// Implementations are loaded once and shared read-only across requests.
#[async_trait]
pub trait EntityClassifier: Send + Sync {
    /// Classifies `text`, returning sentences in document order.
    async fn classify(&self, text: &str) -> Result<Vec<ClassifiedSentence>>;
}

/// Which classifier backs the filter.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ClassifierConfig {
    /// Built-in lexicon heuristics.
    Lexicon {
        /// Extra single-word place names always labelled as places.
        #[serde(default)]
        places: Vec<String>,
    },
    /// External NER service.
    Http(RemoteClassifierConfig),
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self::Lexicon { places: Vec::new() }
    }
}

/// Settings for [`HttpEntityClassifier`].
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteClassifierConfig {
    /// Endpoint accepting `{"text": ...}` and answering `{"sentences": [...]}`.
    pub url: String,
    /// Request timeout in milliseconds.
    #[serde(default = "default_classifier_timeout_ms")]
    pub timeout_ms: u64,
}

impl RemoteClassifierConfig {
    /// Request timeout as a duration.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

const fn default_classifier_timeout_ms() -> u64 {
    15_000
}

/// Instantiates the configured classifier.
pub fn build_classifier(
    config: &ClassifierConfig,
    client: reqwest::Client,
) -> Result<Arc<dyn EntityClassifier>> {
    Ok(match config {
        ClassifierConfig::Lexicon { places } => {
            Arc::new(LexiconEntityClassifier::new().with_places(places))
        }
        ClassifierConfig::Http(remote) => Arc::new(HttpEntityClassifier::new(client, remote)?),
    })
}
