use std::collections::HashSet;

use anyhow::Result;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;

use super::{ClassifiedSentence, EntityClassifier, EntityLabel};
use crate::sentences::split_sentences;

static WORD_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[\p{L}][\p{L}\p{M}'\x{2019}\-]*|\d+(?:[.,]\d+)*").expect("word pattern is valid")
});

static QUOTED_TITLE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new("[\"\u{201c}]\\p{Lu}[^\"\u{201d}]{2,}[\"\u{201d}]").expect("title pattern is valid")
});

const LOC_NOUNS: &[&str] = &[
    "River", "Lake", "Mountain", "Mountains", "Mount", "Hill", "Hills", "Valley", "Sea", "Ocean",
    "Bay", "Gulf", "Desert", "Island", "Islands", "Peninsula", "Coast", "Forest", "Plateau",
    "Delta", "Falls", "Beach", "Strait", "Glacier", "Canyon", "Range",
];

const FAC_NOUNS: &[&str] = &[
    "Temple", "Church", "Cathedral", "Mosque", "Synagogue", "Fort", "Fortress", "Palace",
    "Castle", "Museum", "Bridge", "Airport", "Station", "Tower", "Stadium", "Park", "Gate",
    "Monastery", "Basilica", "Shrine", "Dam", "Square", "Harbour", "Harbor", "Port", "Abbey",
    "Mausoleum", "Market", "Garden", "Gardens", "Library", "Theatre", "Theater", "Opera",
];

const ORG_NOUNS: &[&str] = &[
    "University", "College", "Institute", "Company", "Corporation", "Council", "Party",
    "Ministry", "Government", "Bank", "Society", "Academy", "Association", "School", "Club",
    "Railway", "Railways", "Authority", "Dynasty", "Parliament", "Assembly",
];

const EVENT_NOUNS: &[&str] = &[
    "War", "Battle", "Festival", "Revolution", "Olympics", "Games", "Expo", "Siege", "Rebellion",
    "Uprising", "Carnival", "Fair", "Mela", "Exhibition", "Crusade", "Massacre", "Earthquake",
];

const GPE_NOUNS: &[&str] = &[
    "City", "State", "Province", "County", "District", "Kingdom", "Republic", "Empire", "Region",
    "Prefecture", "Municipality", "Taluk", "Village", "Town", "Commonwealth", "Union",
];

const DEMONYMS: &[&str] = &[
    "French", "English", "British", "American", "Indian", "Chinese", "Japanese", "German",
    "Spanish", "Italian", "Portuguese", "Dutch", "Greek", "Roman", "Arab", "Persian", "Turkish",
    "Russian", "Tamil", "Hindu", "Muslim", "Islamic", "Christian", "Buddhist", "Jewish", "Sikh",
    "Jain", "Catholic", "Protestant", "Orthodox", "Mughal", "Ottoman", "Byzantine", "Celtic",
    "Norse", "Viking", "Maori", "Aboriginal", "Mexican", "Brazilian", "African", "European",
    "Asian", "Dravidian", "Bengali", "Punjabi", "Marathi", "Kannada", "Telugu", "Malayali",
];

const LOCATIVES: &[&str] = &[
    "in", "near", "at", "from", "to", "across", "outside", "within", "of", "between",
];

const NOT_PLACES: &[&str] = &[
    "January", "February", "March", "April", "May", "June", "July", "August", "September",
    "October", "November", "December", "Monday", "Tuesday", "Wednesday", "Thursday", "Friday",
    "Saturday", "Sunday", "I", "The", "A", "An", "His", "Her", "Their", "Its", "This", "That",
];

/// Deterministic rule-based classifier.
///
/// Labels are derived from each sentence alone (capitalized keyword nouns,
/// demonyms, capitalized words after a locative preposition, an optional
/// gazetteer of known place names), so classifying the classifier's own
/// output yields the same sentences and labels again.
#[derive(Debug, Clone, Default)]
pub struct LexiconEntityClassifier {
    places: HashSet<String>,
}

impl LexiconEntityClassifier {
    /// Classifier with the built-in lexicons only.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds known place names (matched case-insensitively, single words).
    #[must_use]
    pub fn with_places<I, S>(mut self, places: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.places
            .extend(places.into_iter().map(|p| p.as_ref().trim().to_lowercase()));
        self
    }

    /// Labels found in a single sentence, without duplicates.
    #[must_use]
    pub fn label_sentence(&self, sentence: &str) -> Vec<EntityLabel> {
        let tokens: Vec<&str> = WORD_RE.find_iter(sentence).map(|m| m.as_str()).collect();
        let mut labels = Vec::new();
        for (idx, token) in tokens.iter().enumerate() {
            let label = if token.chars().next().is_some_and(char::is_uppercase) {
                let previous = idx.checked_sub(1).map(|prev| tokens[prev]);
                self.label_capitalized(token, previous)
            } else {
                label_numeric(token)
            };
            if let Some(label) = label {
                if !labels.contains(&label) {
                    labels.push(label);
                }
            }
        }
        if QUOTED_TITLE_RE.is_match(sentence) && !labels.contains(&EntityLabel::WorkOfArt) {
            labels.push(EntityLabel::WorkOfArt);
        }
        labels
    }

    fn label_capitalized(&self, token: &str, previous: Option<&str>) -> Option<EntityLabel> {
        if LOC_NOUNS.contains(&token) {
            return Some(EntityLabel::Loc);
        }
        if FAC_NOUNS.contains(&token) {
            return Some(EntityLabel::Fac);
        }
        if ORG_NOUNS.contains(&token) {
            return Some(EntityLabel::Org);
        }
        if EVENT_NOUNS.contains(&token) {
            return Some(EntityLabel::Event);
        }
        if GPE_NOUNS.contains(&token) {
            return Some(EntityLabel::Gpe);
        }
        if is_demonym(token) {
            return Some(EntityLabel::Norp);
        }
        if NOT_PLACES.contains(&token) {
            return None;
        }
        let after_locative = previous
            .is_some_and(|prev| LOCATIVES.contains(&prev.to_lowercase().as_str()));
        if after_locative || self.places.contains(&token.to_lowercase()) {
            return Some(EntityLabel::Gpe);
        }
        None
    }
}

fn is_demonym(token: &str) -> bool {
    if DEMONYMS.contains(&token) {
        return true;
    }
    token.chars().count() >= 6 && (token.ends_with("ese") || token.ends_with("ian"))
}

fn label_numeric(token: &str) -> Option<EntityLabel> {
    if !token.starts_with(|c: char| c.is_ascii_digit()) {
        return None;
    }
    let is_year = token.len() == 4
        && token
            .parse::<u16>()
            .is_ok_and(|year| (1000..=2100).contains(&year));
    Some(if is_year {
        EntityLabel::Date
    } else {
        EntityLabel::Cardinal
    })
}

#[async_trait]
impl EntityClassifier for LexiconEntityClassifier {
    async fn classify(&self, text: &str) -> Result<Vec<ClassifiedSentence>> {
        Ok(split_sentences(text)
            .into_iter()
            .map(|sentence| {
                let labels = self.label_sentence(&sentence);
                ClassifiedSentence {
                    text: sentence,
                    labels,
                }
            })
            .collect())
    }
}
