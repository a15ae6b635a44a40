use std::fmt;

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::json;
use shared_logging::LogLevel;

use crate::{entities::EntityClassifier, telemetry::NlpTelemetry};

/// Default cap on kept sentences, bounding the summarizer payload.
pub const DEFAULT_MAX_SENTENCES: usize = 40;

/// Order-preserving subset of a document's sentences.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilteredText {
    sentences: Vec<String>,
}

impl FilteredText {
    /// Kept sentences in document order.
    #[must_use]
    pub fn sentences(&self) -> &[String] {
        &self.sentences
    }

    /// Number of kept sentences.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sentences.len()
    }

    /// True when nothing qualified.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sentences.is_empty()
    }

    /// Sentences joined with single spaces.
    #[must_use]
    pub fn joined(&self) -> String {
        self.sentences.join(" ")
    }

    /// Character length of [`Self::joined`].
    #[must_use]
    pub fn char_count(&self) -> usize {
        let spaces = self.sentences.len().saturating_sub(1);
        self.sentences
            .iter()
            .map(|s| s.chars().count())
            .sum::<usize>()
            + spaces
    }
}

impl fmt::Display for FilteredText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.joined())
    }
}

/// Keeps the sentences that mention geo-cultural entities.
#[derive(Debug, Clone)]
pub struct EntityTextFilter {
    max_sentences: usize,
    telemetry: Option<NlpTelemetry>,
}

impl Default for EntityTextFilter {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_SENTENCES)
    }
}

impl EntityTextFilter {
    /// Creates a filter keeping at most `max_sentences` (minimum 1).
    #[must_use]
    pub fn new(max_sentences: usize) -> Self {
        Self {
            max_sentences: max_sentences.max(1),
            telemetry: None,
        }
    }

    /// Attaches telemetry.
    #[must_use]
    pub fn with_telemetry(mut self, telemetry: Option<NlpTelemetry>) -> Self {
        self.telemetry = telemetry;
        self
    }

    /// Sentence cap.
    #[must_use]
    pub const fn max_sentences(&self) -> usize {
        self.max_sentences
    }

    /// Classifies `text` and keeps, in order, the first qualifying sentences.
    ///
    /// Sentence boundaries come from the classifier; the filter never
    /// re-segments.
    pub async fn filter(
        &self,
        text: &str,
        classifier: &dyn EntityClassifier,
    ) -> Result<FilteredText> {
        if text.trim().is_empty() {
            return Ok(FilteredText::default());
        }
        let classified = classifier
            .classify(text)
            .await
            .context("entity classification failed")?;
        let total = classified.len();
        let sentences: Vec<String> = classified
            .into_iter()
            .filter(|sentence| sentence.is_geocultural())
            .map(|sentence| sentence.text.trim().to_string())
            .filter(|sentence| !sentence.is_empty())
            .take(self.max_sentences)
            .collect();
        if let Some(tel) = &self.telemetry {
            let _ = tel.log(
                LogLevel::Debug,
                "nlp.filter.complete",
                json!({ "sentences": total, "kept": sentences.len() }),
            );
        }
        Ok(FilteredText { sentences })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{ClassifiedSentence, EntityLabel, LexiconEntityClassifier};
    use async_trait::async_trait;

    /// Splits on newlines; a line is tagged GPE when it contains "Place".
    struct LineClassifier;

    #[async_trait]
    impl EntityClassifier for LineClassifier {
        async fn classify(&self, text: &str) -> Result<Vec<ClassifiedSentence>> {
            Ok(text
                .lines()
                .map(|line| ClassifiedSentence {
                    text: line.to_string(),
                    labels: if line.contains("Place") {
                        vec![EntityLabel::Date, EntityLabel::Gpe]
                    } else {
                        vec![EntityLabel::Person]
                    },
                })
                .collect())
        }
    }

    struct FailingClassifier;

    #[async_trait]
    impl EntityClassifier for FailingClassifier {
        async fn classify(&self, _text: &str) -> Result<Vec<ClassifiedSentence>> {
            anyhow::bail!("model not loaded")
        }
    }

    #[tokio::test]
    async fn keeps_only_geocultural_sentences_in_order() {
        let filter = EntityTextFilter::default();
        let text = "Place one.\nA person.\nPlace two.";
        let filtered = filter.filter(text, &LineClassifier).await.unwrap();
        assert_eq!(filtered.sentences(), ["Place one.", "Place two."]);
        assert_eq!(filtered.joined(), "Place one. Place two.");
        assert_eq!(filtered.char_count(), filtered.joined().chars().count());
    }

    #[tokio::test]
    async fn caps_at_first_forty_qualifying_sentences() {
        let text = (0..100)
            .map(|i| format!("Place number {i}."))
            .collect::<Vec<_>>()
            .join("\n");
        let filtered = EntityTextFilter::default()
            .filter(&text, &LineClassifier)
            .await
            .unwrap();
        assert_eq!(filtered.len(), 40);
        assert_eq!(filtered.sentences()[0], "Place number 0.");
        assert_eq!(filtered.sentences()[39], "Place number 39.");
    }

    #[tokio::test]
    async fn refiltering_output_is_stable() {
        let classifier = LexiconEntityClassifier::new();
        let text = "Paris lies on the Seine River. It is lovely. The Louvre Museum holds art. \
                    Prices rose. Many Parisian artists lived in Montmartre.";
        let filter = EntityTextFilter::default();
        let first = filter.filter(text, &classifier).await.unwrap();
        let second = filter.filter(&first.joined(), &classifier).await.unwrap();
        assert_eq!(first.len(), 3);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn blank_text_skips_classifier() {
        let filtered = EntityTextFilter::default()
            .filter("  \n ", &FailingClassifier)
            .await
            .unwrap();
        assert!(filtered.is_empty());
        assert_eq!(filtered.char_count(), 0);
    }

    #[tokio::test]
    async fn classifier_failure_propagates() {
        let err = EntityTextFilter::default()
            .filter("Some text.", &FailingClassifier)
            .await
            .unwrap_err();
        assert!(format!("{err:#}").contains("model not loaded"));
    }
}
