use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use gcies_nlp::{
    build_classifier, ChatSummarizer, EntityClassifier, EntityTextFilter, InsightSet,
    NlpTelemetry, Summarizer, DEFAULT_MAX_SENTENCES,
};
use reqwest::Client;
use serde::Serialize;
use serde_json::{json, Value};
use shared_logging::{JsonLogger, LogLevel};
use uuid::Uuid;

use crate::{
    candidate::{Candidate, RawDocument, SourceKind},
    config::GciesConfig,
    error::ResolveError,
    query::Query,
    sources::{CandidateSource, DirectorySource, WikipediaSource},
    telemetry::ResolverTelemetry,
    transport::ReqwestTransport,
};

/// User-facing reason attached to a failed summarization.
pub const INSIGHT_FAILURE_MESSAGE: &str = "Failed to generate insights.";

/// Below this many characters the filter is re-run on the short summary.
pub const DEFAULT_MIN_FILTERED_CHARS: usize = 100;

/// Outcome of a successful resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resolution {
    /// Canonical title of the resolved page.
    pub location_name: String,
    /// Main image, when one was found.
    pub image_url: Option<String>,
    /// Summarized insights or the failure marker.
    pub insights: InsightSet,
}

/// One autocomplete entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Suggestion {
    /// Page title.
    pub title: String,
    /// Short description, possibly empty.
    pub description: String,
    /// Producing source.
    pub source: SourceKind,
}

impl From<Candidate> for Suggestion {
    fn from(candidate: Candidate) -> Self {
        Self {
            title: candidate.title,
            description: candidate.short_description,
            source: candidate.source,
        }
    }
}

/// Collaborators shared by every request, built once at startup.
pub struct PipelineContext {
    config: GciesConfig,
    client: Client,
    classifier: Arc<dyn EntityClassifier>,
    summarizer: Arc<dyn Summarizer>,
    logger: Option<Arc<JsonLogger>>,
}

impl PipelineContext {
    /// Builds the HTTP client, classifier and summarizer from `config`.
    pub fn from_config(config: &GciesConfig, logger: Option<Arc<JsonLogger>>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.http.user_agent.as_str())
            .build()
            .context("building HTTP client")?;
        let classifier = build_classifier(&config.classifier, client.clone())
            .context("building entity classifier")?;
        let summarizer_telemetry = nlp_telemetry("nlp.summarizer", logger.as_ref())?;
        let summarizer: Arc<dyn Summarizer> = Arc::new(ChatSummarizer::new(
            client.clone(),
            config.summarizer.clone(),
            summarizer_telemetry,
        ));
        Ok(Self {
            config: config.clone(),
            client,
            classifier,
            summarizer,
            logger,
        })
    }

    /// Loaded configuration.
    #[must_use]
    pub const fn config(&self) -> &GciesConfig {
        &self.config
    }

    /// Shared entity classifier.
    #[must_use]
    pub fn classifier(&self) -> Arc<dyn EntityClassifier> {
        Arc::clone(&self.classifier)
    }

    /// Shared summarizer.
    #[must_use]
    pub fn summarizer(&self) -> Arc<dyn Summarizer> {
        Arc::clone(&self.summarizer)
    }

    /// Shared logger, if logging is enabled.
    #[must_use]
    pub fn logger(&self) -> Option<Arc<JsonLogger>> {
        self.logger.clone()
    }

    /// Telemetry for `module`, writing to the shared logger.
    pub fn resolver_telemetry(&self, module: &str) -> Result<Option<ResolverTelemetry>> {
        self.logger
            .as_ref()
            .map(|logger| {
                ResolverTelemetry::builder(module)
                    .logger(Arc::clone(logger))
                    .build()
            })
            .transpose()
    }

    /// NLP telemetry for `module`, writing to the shared logger.
    pub fn nlp_telemetry(&self, module: &str) -> Result<Option<NlpTelemetry>> {
        nlp_telemetry(module, self.logger.as_ref())
    }
}

fn nlp_telemetry(module: &str, logger: Option<&Arc<JsonLogger>>) -> Result<Option<NlpTelemetry>> {
    logger
        .map(|logger| NlpTelemetry::builder(module).logger(Arc::clone(logger)).build())
        .transpose()
}

/// Builder for [`ResolutionPipeline`].
pub struct ResolutionPipelineBuilder {
    wikipedia: Option<CandidateSource>,
    directory: Option<CandidateSource>,
    classifier: Option<Arc<dyn EntityClassifier>>,
    summarizer: Option<Arc<dyn Summarizer>>,
    telemetry: Option<ResolverTelemetry>,
    filter_telemetry: Option<NlpTelemetry>,
    max_sentences: usize,
    min_filtered_chars: usize,
}

impl Default for ResolutionPipelineBuilder {
    fn default() -> Self {
        Self {
            wikipedia: None,
            directory: None,
            classifier: None,
            summarizer: None,
            telemetry: None,
            filter_telemetry: None,
            max_sentences: DEFAULT_MAX_SENTENCES,
            min_filtered_chars: DEFAULT_MIN_FILTERED_CHARS,
        }
    }
}

impl ResolutionPipelineBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a source adapter, replacing any adapter of the same kind.
    #[must_use]
    pub fn source(mut self, source: impl Into<CandidateSource>) -> Self {
        let source = source.into();
        match source.kind() {
            SourceKind::Wikipedia => self.wikipedia = Some(source),
            SourceKind::RegionalDirectory => self.directory = Some(source),
        }
        self
    }

    /// Sets the entity classifier.
    #[must_use]
    pub fn classifier(mut self, classifier: Arc<dyn EntityClassifier>) -> Self {
        self.classifier = Some(classifier);
        self
    }

    /// Sets the summarizer.
    #[must_use]
    pub fn summarizer(mut self, summarizer: Arc<dyn Summarizer>) -> Self {
        self.summarizer = Some(summarizer);
        self
    }

    /// Attaches pipeline telemetry.
    #[must_use]
    pub fn telemetry(mut self, telemetry: Option<ResolverTelemetry>) -> Self {
        self.telemetry = telemetry;
        self
    }

    /// Attaches telemetry to the entity filter.
    #[must_use]
    pub fn filter_telemetry(mut self, telemetry: Option<NlpTelemetry>) -> Self {
        self.filter_telemetry = telemetry;
        self
    }

    /// Caps the sentences kept by the filter.
    #[must_use]
    pub const fn max_sentences(mut self, max_sentences: usize) -> Self {
        self.max_sentences = max_sentences;
        self
    }

    /// Sets the length below which the short summary is filtered instead.
    #[must_use]
    pub const fn min_filtered_chars(mut self, min_filtered_chars: usize) -> Self {
        self.min_filtered_chars = min_filtered_chars;
        self
    }

    /// Finalizes the pipeline.
    pub fn build(self) -> Result<ResolutionPipeline> {
        if self.wikipedia.is_none() && self.directory.is_none() {
            bail!("resolution pipeline needs at least one source");
        }
        let classifier = self
            .classifier
            .ok_or_else(|| anyhow!("resolution pipeline needs an entity classifier"))?;
        let summarizer = self
            .summarizer
            .ok_or_else(|| anyhow!("resolution pipeline needs a summarizer"))?;
        Ok(ResolutionPipeline {
            wikipedia: self.wikipedia,
            directory: self.directory,
            classifier,
            summarizer,
            filter: EntityTextFilter::new(self.max_sentences).with_telemetry(self.filter_telemetry),
            min_filtered_chars: self.min_filtered_chars,
            telemetry: self.telemetry,
        })
    }
}

/// Resolves a place name, filters its page and summarizes it.
pub struct ResolutionPipeline {
    wikipedia: Option<CandidateSource>,
    directory: Option<CandidateSource>,
    classifier: Arc<dyn EntityClassifier>,
    summarizer: Arc<dyn Summarizer>,
    filter: EntityTextFilter,
    min_filtered_chars: usize,
    telemetry: Option<ResolverTelemetry>,
}

impl ResolutionPipeline {
    /// Returns a builder.
    #[must_use]
    pub fn builder() -> ResolutionPipelineBuilder {
        ResolutionPipelineBuilder::new()
    }

    /// Wires every configured source over the context's shared client.
    pub fn from_context(ctx: &PipelineContext) -> Result<Self> {
        let config = ctx.config();
        let wikipedia = WikipediaSource::new(
            Arc::new(ReqwestTransport::new(ctx.client.clone(), config.wikipedia.timeout())),
            config.wikipedia.clone(),
        )
        .with_telemetry(ctx.resolver_telemetry("resolver.wikipedia")?);
        let mut builder = Self::builder()
            .source(wikipedia)
            .classifier(ctx.classifier())
            .summarizer(ctx.summarizer())
            .telemetry(ctx.resolver_telemetry("resolver.pipeline")?)
            .filter_telemetry(ctx.nlp_telemetry("nlp.filter")?)
            .max_sentences(config.filter.max_sentences)
            .min_filtered_chars(config.filter.min_filtered_chars);
        if config.directory.base_url.is_some() {
            let directory = DirectorySource::new(
                Arc::new(ReqwestTransport::new(ctx.client.clone(), config.directory.timeout())),
                config.directory.clone(),
            )?
            .with_telemetry(ctx.resolver_telemetry("resolver.directory")?);
            builder = builder.source(directory);
        }
        builder.build()
    }

    /// Resolves `location_name` through `source` and summarizes the page.
    ///
    /// With the regional directory and an explicit `path`, the page is fetched
    /// directly and no search happens.
    pub async fn resolve(
        &self,
        location_name: &str,
        source: SourceKind,
        path: Option<&str>,
    ) -> Result<Resolution, ResolveError> {
        let request_id = Uuid::new_v4();
        let adapter = self.adapter(source)?;
        self.log(
            LogLevel::Info,
            "resolver.resolve.start",
            request_id,
            json!({ "location": location_name, "source": source, "path": path }),
        );

        let direct_path = path
            .map(str::trim)
            .filter(|path| source == SourceKind::RegionalDirectory && !path.is_empty());
        let document = match direct_path {
            Some(path) => adapter.fetch_document(path).await?,
            None => {
                let query = Query::parse(location_name)?;
                let Some(candidate) = adapter.resolve_best(&query).await? else {
                    self.log(
                        LogLevel::Info,
                        "resolver.resolve.not_found",
                        request_id,
                        json!({ "query": query.to_string() }),
                    );
                    return Err(ResolveError::NotFound(location_name.to_string()));
                };
                self.log(
                    LogLevel::Info,
                    "resolver.rank.selected",
                    request_id,
                    json!({ "title": candidate.title, "id": candidate.document_id() }),
                );
                adapter.fetch_document(candidate.document_id()).await?
            }
        };

        let text = self.filtered_text(&document, request_id).await?;
        let insights = match self.summarizer.summarize(&text, &document.title).await {
            Ok(insights) => InsightSet::Ready(insights),
            Err(err) => {
                self.log(
                    LogLevel::Warn,
                    "resolver.summary.failed",
                    request_id,
                    json!({ "title": document.title, "error": format!("{err:#}") }),
                );
                InsightSet::failed(INSIGHT_FAILURE_MESSAGE, format!("{err:#}"))
            }
        };

        self.log(
            LogLevel::Info,
            "resolver.resolve.complete",
            request_id,
            json!({
                "title": document.title,
                "has_image": document.image_url.is_some(),
                "insights_failed": insights.is_failed(),
            }),
        );
        Ok(Resolution {
            location_name: document.title,
            image_url: document.image_url,
            insights,
        })
    }

    /// Autocomplete across every configured source, Wikipedia first.
    ///
    /// A failing source is logged and skipped; the call fails only when all
    /// of them failed.
    pub async fn suggest(&self, raw_query: &str) -> Result<Vec<Suggestion>, ResolveError> {
        if raw_query.trim().is_empty() {
            return Ok(Vec::new());
        }
        let request_id = Uuid::new_v4();
        let sources: Vec<&CandidateSource> =
            self.wikipedia.iter().chain(self.directory.iter()).collect();
        let mut suggestions = Vec::new();
        let mut failures = Vec::new();
        for source in &sources {
            match source.search_candidates(raw_query).await {
                Ok(candidates) => suggestions.extend(candidates.into_iter().map(Suggestion::from)),
                Err(err) => {
                    self.log(
                        LogLevel::Warn,
                        "resolver.suggest.source_failed",
                        request_id,
                        json!({ "source": source.kind(), "error": err.to_string() }),
                    );
                    failures.push(format!("{}: {err}", source.kind()));
                }
            }
        }
        if failures.len() == sources.len() {
            return Err(anyhow!("all sources failed: {}", failures.join("; ")).into());
        }
        Ok(suggestions)
    }

    /// Whether `kind` has a configured adapter.
    #[must_use]
    pub const fn supports(&self, kind: SourceKind) -> bool {
        match kind {
            SourceKind::Wikipedia => self.wikipedia.is_some(),
            SourceKind::RegionalDirectory => self.directory.is_some(),
        }
    }

    fn adapter(&self, kind: SourceKind) -> Result<&CandidateSource, ResolveError> {
        let adapter = match kind {
            SourceKind::Wikipedia => self.wikipedia.as_ref(),
            SourceKind::RegionalDirectory => self.directory.as_ref(),
        };
        adapter.ok_or_else(|| ResolveError::Internal(anyhow!("source {kind} is not configured")))
    }

    /// Filtered full text, or the filtered short summary when the former is
    /// too short or could not be classified.
    async fn filtered_text(
        &self,
        document: &RawDocument,
        request_id: Uuid,
    ) -> Result<String, ResolveError> {
        let classifier = self.classifier.as_ref();
        match self.filter.filter(&document.full_text, classifier).await {
            Ok(filtered) if filtered.char_count() >= self.min_filtered_chars => {
                return Ok(filtered.joined());
            }
            Ok(filtered) => self.log(
                LogLevel::Debug,
                "resolver.filter.fallback",
                request_id,
                json!({ "chars": filtered.char_count(), "min": self.min_filtered_chars }),
            ),
            Err(err) => self.log(
                LogLevel::Warn,
                "resolver.filter.failed",
                request_id,
                json!({ "error": format!("{err:#}") }),
            ),
        }
        let summary = self
            .filter
            .filter(&document.short_summary, classifier)
            .await
            .context("filtering short summary")?;
        Ok(summary.joined())
    }

    fn log(&self, level: LogLevel, message: &str, request_id: Uuid, mut fields: Value) {
        if let Some(tel) = &self.telemetry {
            if let Some(obj) = fields.as_object_mut() {
                obj.insert("request_id".to_string(), json!(request_id));
            }
            let _ = tel.log(level, message, fields);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use gcies_nlp::{split_sentences, ClassifiedSentence, EntityLabel, LexiconEntityClassifier};
    use indexmap::IndexMap;
    use tempfile::tempdir;

    use super::*;
    use crate::{
        config::{DirectoryConfig, WikipediaConfig},
        transport::testing::CannedTransport,
    };

    const API: &str = "https://en.wikipedia.org/w/api.php";
    const BASE: &str = "https://villages.example.org";

    /// Labels a sentence GPE when it mentions one of the known places.
    struct PlaceClassifier {
        places: Vec<&'static str>,
        fail_on: Option<&'static str>,
    }

    impl PlaceClassifier {
        fn new(places: &[&'static str]) -> Self {
            Self {
                places: places.to_vec(),
                fail_on: None,
            }
        }
    }

    #[async_trait]
    impl EntityClassifier for PlaceClassifier {
        async fn classify(&self, text: &str) -> anyhow::Result<Vec<ClassifiedSentence>> {
            if self.fail_on.is_some_and(|marker| text.contains(marker)) {
                bail!("classifier unavailable");
            }
            Ok(split_sentences(text)
                .into_iter()
                .map(|sentence| {
                    let labels = if self.places.iter().any(|place| sentence.contains(place)) {
                        vec![EntityLabel::Gpe]
                    } else {
                        Vec::new()
                    };
                    ClassifiedSentence {
                        text: sentence,
                        labels,
                    }
                })
                .collect())
        }
    }

    /// Records what it was asked to summarize.
    #[derive(Default)]
    struct RecordingSummarizer {
        seen: Mutex<Vec<(String, String)>>,
        fail: bool,
    }

    #[async_trait]
    impl Summarizer for RecordingSummarizer {
        async fn summarize(
            &self,
            text: &str,
            subject: &str,
        ) -> anyhow::Result<IndexMap<String, String>> {
            self.seen
                .lock()
                .unwrap()
                .push((text.to_string(), subject.to_string()));
            if self.fail {
                bail!("rate limited");
            }
            let mut insights = IndexMap::new();
            insights.insert("Landmark".to_string(), format!("Something famous in {subject}."));
            Ok(insights)
        }
    }

    fn search_body(pages: Value) -> Value {
        json!({ "query": { "pages": pages } })
    }

    fn document_body(title: &str, extract: &str) -> Value {
        json!({ "query": { "pages": [{ "title": title, "extract": extract }] } })
    }

    fn pipeline(
        transport: CannedTransport,
        classifier: Arc<dyn EntityClassifier>,
        summarizer: Arc<RecordingSummarizer>,
    ) -> ResolutionPipeline {
        let transport = Arc::new(transport);
        let directory = DirectorySource::new(
            transport.clone(),
            DirectoryConfig {
                base_url: Some(BASE.to_string()),
                ..DirectoryConfig::default()
            },
        )
        .unwrap();
        ResolutionPipeline::builder()
            .source(WikipediaSource::new(transport, WikipediaConfig::default()))
            .source(directory)
            .classifier(classifier)
            .summarizer(summarizer)
            .build()
            .unwrap()
    }

    fn long_paris_extract() -> String {
        [
            "Paris is the capital and largest city of France.",
            "The weather was mild that year.",
            "Paris hosts the Louvre, the most visited art museum in the world.",
            "Notre-Dame de Paris is a medieval Catholic cathedral on the Ile de la Cite.",
            "",
            "== History ==",
            "Nothing relevant here.",
        ]
        .join("\n")
    }

    #[tokio::test]
    async fn paris_resolves_end_to_end() {
        let transport = CannedTransport::new()
            .with_json(
                API,
                "Paris",
                search_body(json!([
                    { "title": "Paris (song)", "index": 1, "description": "Song by a band from the capital" },
                    { "title": "Paris", "index": 2, "description": "Capital of France",
                      "coordinates": [{ "lat": 48.85, "lon": 2.35 }] }
                ])),
            )
            .with_json(API, "extracts", document_body("Paris", &long_paris_extract()))
            .with_json(
                API,
                "pageimages",
                json!({ "query": { "pages": [{ "title": "Paris",
                    "thumbnail": { "source": "https://upload.wikimedia.org/paris.jpg" } }] } }),
            );
        let summarizer = Arc::new(RecordingSummarizer::default());
        let pipeline = pipeline(
            transport,
            Arc::new(PlaceClassifier::new(&["Paris"])),
            Arc::clone(&summarizer),
        );

        let resolution = pipeline
            .resolve("Paris, France", SourceKind::Wikipedia, None)
            .await
            .unwrap();
        assert_eq!(resolution.location_name, "Paris");
        assert_eq!(
            resolution.image_url.as_deref(),
            Some("https://upload.wikimedia.org/paris.jpg")
        );
        assert!(!resolution.insights.is_failed());

        let seen = summarizer.seen.lock().unwrap();
        let (text, subject) = &seen[0];
        assert_eq!(subject, "Paris");
        assert!(text.starts_with("Paris is the capital and largest city of France. Paris hosts"));
        assert!(!text.contains("weather"));
    }

    #[test]
    fn resolution_serializes_with_snake_case_keys() {
        let resolution = Resolution {
            location_name: "Paris".to_string(),
            image_url: None,
            insights: InsightSet::failed(INSIGHT_FAILURE_MESSAGE, "boom"),
        };
        assert_eq!(
            serde_json::to_value(&resolution).unwrap(),
            json!({
                "location_name": "Paris",
                "image_url": null,
                "insights": { "error": "Failed to generate insights.", "details": "boom" }
            })
        );
    }

    #[tokio::test]
    async fn zero_candidates_is_not_found() {
        let transport = CannedTransport::new().with_json(API, "Atlantis", json!({}));
        let pipeline = pipeline(
            transport,
            Arc::new(LexiconEntityClassifier::new()),
            Arc::new(RecordingSummarizer::default()),
        );
        let err = pipeline
            .resolve("Atlantis", SourceKind::Wikipedia, None)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn blank_primary_term_is_invalid() {
        let pipeline = pipeline(
            CannedTransport::new(),
            Arc::new(LexiconEntityClassifier::new()),
            Arc::new(RecordingSummarizer::default()),
        );
        let err = pipeline
            .resolve(" , France", SourceKind::Wikipedia, None)
            .await
            .unwrap_err();
        assert!(matches!(err, ResolveError::InvalidQuery(_)));
    }

    #[tokio::test]
    async fn missing_page_after_ranking_is_not_found() {
        let transport = CannedTransport::new()
            .with_json(
                API,
                "Ooty",
                search_body(json!([{ "title": "Ooty", "index": 1, "description": "Town in Tamil Nadu" }])),
            )
            .with_json(
                API,
                "extracts",
                json!({ "query": { "pages": [{ "title": "Ooty", "missing": true }] } }),
            );
        let pipeline = pipeline(
            transport,
            Arc::new(LexiconEntityClassifier::new()),
            Arc::new(RecordingSummarizer::default()),
        );
        let err = pipeline
            .resolve("Ooty", SourceKind::Wikipedia, None)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn short_filtered_text_falls_back_to_summary() {
        let extract = "Kodaikanal is a hill town.\nIt rains a lot.\n\n== Climate ==\nCold.";
        let transport = CannedTransport::new()
            .with_json(
                API,
                "Kodaikanal",
                search_body(json!([{ "title": "Kodaikanal", "index": 1, "description": "Town" }])),
            )
            .with_json(API, "extracts", document_body("Kodaikanal", extract));
        let summarizer = Arc::new(RecordingSummarizer::default());
        let pipeline = pipeline(
            transport,
            Arc::new(PlaceClassifier::new(&["Kodaikanal"])),
            Arc::clone(&summarizer),
        );
        let resolution = pipeline
            .resolve("Kodaikanal", SourceKind::Wikipedia, None)
            .await
            .unwrap();
        assert_eq!(resolution.location_name, "Kodaikanal");
        assert!(resolution.image_url.is_none());
        let seen = summarizer.seen.lock().unwrap();
        assert_eq!(seen[0].0, "Kodaikanal is a hill town.");
    }

    #[tokio::test]
    async fn classifier_failure_on_full_text_uses_summary_pass() {
        let extract = format!("{}\n\n== Details ==\nFAIL here.", "Madurai is a city in Tamil Nadu.");
        let transport = CannedTransport::new()
            .with_json(
                API,
                "Madurai",
                search_body(json!([{ "title": "Madurai", "index": 1, "description": "City in India" }])),
            )
            .with_json(API, "extracts", document_body("Madurai", &extract));
        let classifier = PlaceClassifier {
            places: vec!["Madurai"],
            fail_on: Some("FAIL"),
        };
        let summarizer = Arc::new(RecordingSummarizer::default());
        let pipeline = pipeline(transport, Arc::new(classifier), Arc::clone(&summarizer));
        pipeline
            .resolve("Madurai", SourceKind::Wikipedia, None)
            .await
            .unwrap();
        assert_eq!(summarizer.seen.lock().unwrap()[0].0, "Madurai is a city in Tamil Nadu.");
    }

    #[tokio::test]
    async fn classifier_failure_on_both_passes_is_internal() {
        let transport = CannedTransport::new()
            .with_json(
                API,
                "Salem",
                search_body(json!([{ "title": "Salem", "index": 1, "description": "City" }])),
            )
            .with_json(API, "extracts", document_body("Salem", "FAIL everywhere."));
        let classifier = PlaceClassifier {
            places: vec!["Salem"],
            fail_on: Some("FAIL"),
        };
        let pipeline = pipeline(
            transport,
            Arc::new(classifier),
            Arc::new(RecordingSummarizer::default()),
        );
        let err = pipeline
            .resolve("Salem", SourceKind::Wikipedia, None)
            .await
            .unwrap_err();
        assert!(matches!(err, ResolveError::Internal(_)));
    }

    #[tokio::test]
    async fn summarizer_failure_yields_failure_marker() {
        let transport = CannedTransport::new()
            .with_json(
                API,
                "Paris",
                search_body(json!([{ "title": "Paris", "index": 1, "description": "Capital of France" }])),
            )
            .with_json(API, "extracts", document_body("Paris", &long_paris_extract()));
        let summarizer = Arc::new(RecordingSummarizer {
            fail: true,
            ..RecordingSummarizer::default()
        });
        let pipeline = pipeline(transport, Arc::new(PlaceClassifier::new(&["Paris"])), summarizer);
        let resolution = pipeline
            .resolve("Paris", SourceKind::Wikipedia, None)
            .await
            .unwrap();
        match resolution.insights {
            InsightSet::Failed { error, details } => {
                assert_eq!(error, INSIGHT_FAILURE_MESSAGE);
                assert!(details.contains("rate limited"));
            }
            InsightSet::Ready(_) => panic!("expected failure marker"),
        }
    }

    #[tokio::test]
    async fn directory_path_skips_search() {
        let html = "<html><head><title>Thandampalayam</title></head><body>\
            <h1>Thandampalayam</h1>\
            <p>Thandampalayam is a village in Coimbatore district of Tamil Nadu, near the Noyyal river basin.</p>\
            <h2>HOW TO REACH Thandampalayam</h2><p>Thandampalayam bus stand.</p>\
            </body></html>";
        let transport = Arc::new(
            CannedTransport::new().with_text(&format!("{BASE}/tn/thandampalayam"), html),
        );
        let directory = DirectorySource::new(
            transport.clone(),
            DirectoryConfig {
                base_url: Some(BASE.to_string()),
                ..DirectoryConfig::default()
            },
        )
        .unwrap();
        let summarizer = Arc::new(RecordingSummarizer::default());
        let pipeline = ResolutionPipeline::builder()
            .source(directory)
            .classifier(Arc::new(PlaceClassifier::new(&["Thandampalayam"])))
            .summarizer(summarizer.clone())
            .build()
            .unwrap();

        let resolution = pipeline
            .resolve(
                "Thandampalayam",
                SourceKind::RegionalDirectory,
                Some("/tn/thandampalayam"),
            )
            .await
            .unwrap();
        assert_eq!(resolution.location_name, "Thandampalayam");
        assert_eq!(transport.calls(), [format!("{BASE}/tn/thandampalayam?")]);
        let seen = summarizer.seen.lock().unwrap();
        assert!(!seen[0].0.contains("bus stand"));
        assert!(seen[0].0.contains("Noyyal"));
    }

    #[tokio::test]
    async fn unconfigured_source_is_internal() {
        let pipeline = ResolutionPipeline::builder()
            .source(WikipediaSource::new(
                Arc::new(CannedTransport::new()),
                WikipediaConfig::default(),
            ))
            .classifier(Arc::new(LexiconEntityClassifier::new()))
            .summarizer(Arc::new(RecordingSummarizer::default()))
            .build()
            .unwrap();
        assert!(!pipeline.supports(SourceKind::RegionalDirectory));
        let err = pipeline
            .resolve("Ooty", SourceKind::RegionalDirectory, Some("/tn/ooty"))
            .await
            .unwrap_err();
        assert!(matches!(err, ResolveError::Internal(_)));
    }

    #[tokio::test]
    async fn suggest_skips_failing_source() {
        let transport = CannedTransport::new()
            .with_failure(API, "Ooty", 503)
            .with_json(
                &format!("{BASE}/search"),
                "Ooty",
                json!([{ "name": "Ooty", "description": "Hill station", "url": "/tn/ooty" }]),
            );
        let pipeline = pipeline(
            transport,
            Arc::new(LexiconEntityClassifier::new()),
            Arc::new(RecordingSummarizer::default()),
        );
        let suggestions = pipeline.suggest("Ooty").await.unwrap();
        assert_eq!(
            suggestions,
            [Suggestion {
                title: "Ooty".to_string(),
                description: "Hill station".to_string(),
                source: SourceKind::RegionalDirectory,
            }]
        );
        assert!(pipeline.suggest("  ").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn suggest_fails_when_every_source_fails() {
        let transport = CannedTransport::new()
            .with_failure(API, "Ooty", 503)
            .with_failure(&format!("{BASE}/search"), "Ooty", 500);
        let pipeline = pipeline(
            transport,
            Arc::new(LexiconEntityClassifier::new()),
            Arc::new(RecordingSummarizer::default()),
        );
        let err = pipeline.suggest("Ooty").await.unwrap_err();
        assert!(err.to_string().contains("all sources failed"));
    }

    #[tokio::test]
    async fn pipeline_records_carry_request_id() {
        let dir = tempdir().unwrap();
        let logger = Arc::new(JsonLogger::new(dir.path().join("gcies.log")).unwrap());
        let telemetry = ResolverTelemetry::builder("resolver.pipeline")
            .logger(Arc::clone(&logger))
            .build()
            .unwrap();
        let pipeline = ResolutionPipeline::builder()
            .source(WikipediaSource::new(
                Arc::new(CannedTransport::new().with_json(API, "Atlantis", json!({}))),
                WikipediaConfig::default(),
            ))
            .classifier(Arc::new(LexiconEntityClassifier::new()))
            .summarizer(Arc::new(RecordingSummarizer::default()))
            .telemetry(Some(telemetry))
            .build()
            .unwrap();
        let _ = pipeline.resolve("Atlantis", SourceKind::Wikipedia, None).await;

        let content = std::fs::read_to_string(dir.path().join("gcies.log")).unwrap();
        let records: Vec<Value> = content
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1]["message"], "resolver.resolve.not_found");
        assert_eq!(records[0]["metadata"]["request_id"], records[1]["metadata"]["request_id"]);
    }

    #[test]
    fn builder_requires_collaborators() {
        assert!(ResolutionPipeline::builder().build().is_err());
        let missing_summarizer = ResolutionPipeline::builder()
            .source(WikipediaSource::new(
                Arc::new(CannedTransport::new()),
                WikipediaConfig::default(),
            ))
            .classifier(Arc::new(LexiconEntityClassifier::new()))
            .build();
        assert!(missing_summarizer.is_err());
    }

    #[test]
    fn context_builds_from_default_config() {
        let ctx = PipelineContext::from_config(&GciesConfig::default(), None).unwrap();
        assert!(ctx.logger().is_none());
        let pipeline = ResolutionPipeline::from_context(&ctx).unwrap();
        assert!(pipeline.supports(SourceKind::Wikipedia));
        assert!(!pipeline.supports(SourceKind::RegionalDirectory));
    }
}
