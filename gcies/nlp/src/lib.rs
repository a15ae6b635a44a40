#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    rust_2018_idioms
)]

//! Text side of the place resolver: sentence segmentation, entity
//! classification, geo-cultural sentence filtering and insight summarization.

/// Telemetry helpers.
#[path = "../telemetry.rs"]
pub mod telemetry;

/// Sentence segmentation and whitespace helpers.
#[path = "../sentences.rs"]
pub mod sentences;

/// Entity classification capability and its implementations.
#[path = "../entities/main.rs"]
pub mod entities;

/// Entity-driven sentence filter.
#[path = "../filter.rs"]
pub mod filter;

/// Insight summarization capability.
#[path = "../summarizer.rs"]
pub mod summarizer;

pub use entities::{
    build_classifier, ClassifiedSentence, ClassifierConfig, EntityClassifier, EntityLabel,
    HttpEntityClassifier, LexiconEntityClassifier, RemoteClassifierConfig, GEOCULTURAL_LABELS,
};
pub use filter::{EntityTextFilter, FilteredText, DEFAULT_MAX_SENTENCES};
pub use sentences::{compact_whitespace, split_sentences};
pub use summarizer::{
    build_prompt, parse_insights, ChatSummarizer, InsightSet, Summarizer, SummarizerConfig,
};
pub use telemetry::{NlpTelemetry, NlpTelemetryBuilder};
