use std::sync::Arc;

use serde_json::{json, Value};
use shared_logging::LogLevel;

use crate::{
    candidate::{Candidate, RawDocument, ScoredCandidate, SourceKind},
    config::WikipediaConfig,
    error::SourceError,
    query::Query,
    ranker::{self, ADMINISTRATIVE_KEYWORDS, SETTLEMENT_KEYWORDS},
    telemetry::ResolverTelemetry,
    transport::HttpTransport,
};

/// Extra description words that make a hit worth suggesting.
const REGION_KEYWORDS: [&str; 4] = ["region", "province", "county", "place"];

/// Wikipedia adapter.
pub struct WikipediaSource {
    transport: Arc<dyn HttpTransport>,
    config: WikipediaConfig,
    telemetry: Option<ResolverTelemetry>,
}

impl WikipediaSource {
    /// Creates an adapter over `transport`.
    #[must_use]
    pub fn new(transport: Arc<dyn HttpTransport>, config: WikipediaConfig) -> Self {
        Self {
            transport,
            config,
            telemetry: None,
        }
    }

    /// Attaches telemetry.
    #[must_use]
    pub fn with_telemetry(mut self, telemetry: Option<ResolverTelemetry>) -> Self {
        self.telemetry = telemetry;
        self
    }

    /// All search hits for `term`, in search-rank order.
    pub async fn search(&self, term: &str) -> Result<Vec<Candidate>, SourceError> {
        let limit = self.config.search_limit.to_string();
        let params = [
            ("action", "query"),
            ("format", "json"),
            ("formatversion", "2"),
            ("generator", "search"),
            ("gsrsearch", term),
            ("gsrlimit", limit.as_str()),
            ("gsrnamespace", "0"),
            ("prop", "description|coordinates|extracts"),
            ("exintro", "1"),
            ("explaintext", "1"),
            ("exsentences", "2"),
            ("exlimit", "max"),
            ("colimit", "max"),
        ];
        let body = self.transport.get_json(&self.config.api_url, &params).await?;
        parse_search_pages(&body)
    }

    /// Autocomplete: geographic-looking hits only, capped.
    pub async fn search_candidates(&self, raw_query: &str) -> Result<Vec<Candidate>, SourceError> {
        let term = raw_query.trim();
        if term.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self
            .search(term)
            .await?
            .into_iter()
            .filter(is_geographic)
            .take(self.config.suggest_limit)
            .collect())
    }

    /// Searches the primary term and ranks every hit against the full query.
    pub async fn resolve_scored(&self, query: &Query) -> Result<Option<ScoredCandidate>, SourceError> {
        let candidates = self.search(query.primary_term()).await?;
        let best = ranker::rank_scored(query, &candidates);
        if let Some(tel) = &self.telemetry {
            let _ = tel.log(
                LogLevel::Debug,
                "resolver.wikipedia.ranked",
                json!({
                    "query": query.to_string(),
                    "candidates": candidates.len(),
                    "selected": best.as_ref().map(|scored| scored.candidate.title.as_str()),
                    "score": best.as_ref().map(|scored| scored.score),
                }),
            );
        }
        Ok(best)
    }

    /// Plain-text page for `title`, following redirects.
    pub async fn fetch_document(&self, title: &str) -> Result<RawDocument, SourceError> {
        let params = [
            ("action", "query"),
            ("format", "json"),
            ("formatversion", "2"),
            ("prop", "extracts"),
            ("explaintext", "1"),
            ("redirects", "1"),
            ("titles", title),
        ];
        let body = self.transport.get_json(&self.config.api_url, &params).await?;
        check_api_error(&body)?;
        let page = body
            .pointer("/query/pages/0")
            .ok_or_else(|| SourceError::NotFound(title.to_string()))?;
        if flag(page, "missing") || flag(page, "invalid") {
            return Err(SourceError::NotFound(title.to_string()));
        }
        let canonical = page
            .get("title")
            .and_then(Value::as_str)
            .unwrap_or(title)
            .to_string();
        let full_text = page
            .get("extract")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .trim()
            .to_string();
        let short_summary = lead_section(&full_text);

        let image_url = match self.fetch_image(&canonical).await {
            Ok(url) => url,
            Err(err) => {
                if let Some(tel) = &self.telemetry {
                    let _ = tel.log(
                        LogLevel::Warn,
                        "resolver.wikipedia.image_failed",
                        json!({ "title": canonical, "error": err.to_string() }),
                    );
                }
                None
            }
        };

        Ok(RawDocument {
            title: canonical,
            full_text,
            short_summary,
            image_url,
        })
    }

    /// Thumbnail URL of the page's main image, if it has one.
    pub async fn fetch_image(&self, title: &str) -> Result<Option<String>, SourceError> {
        let size = self.config.thumbnail_size.to_string();
        let params = [
            ("action", "query"),
            ("format", "json"),
            ("formatversion", "2"),
            ("prop", "pageimages"),
            ("piprop", "thumbnail"),
            ("pithumbsize", size.as_str()),
            ("titles", title),
        ];
        let body = self.transport.get_json(&self.config.api_url, &params).await?;
        check_api_error(&body)?;
        Ok(body
            .pointer("/query/pages/0/thumbnail/source")
            .and_then(Value::as_str)
            .map(str::to_string))
    }
}

/// Candidates from a `generator=search` response, re-ordered by search rank.
///
/// A response without `query` means no hits.
pub fn parse_search_pages(body: &Value) -> Result<Vec<Candidate>, SourceError> {
    check_api_error(body)?;
    let Some(pages) = body.pointer("/query/pages") else {
        return Ok(Vec::new());
    };
    let pages = pages
        .as_array()
        .ok_or_else(|| SourceError::Decode("query.pages is not an array".to_string()))?;
    let mut ranked: Vec<(u64, Candidate)> = pages
        .iter()
        .filter_map(|page| {
            let title = page.get("title")?.as_str()?;
            let index = page.get("index").and_then(Value::as_u64).unwrap_or(u64::MAX);
            let has_coordinates = page
                .get("coordinates")
                .and_then(Value::as_array)
                .is_some_and(|coords| !coords.is_empty());
            let candidate = Candidate::new(title, SourceKind::Wikipedia)
                .with_description(str_field(page, "description"))
                .with_coordinates(has_coordinates)
                .with_snippet(str_field(page, "extract"));
            Some((index, candidate))
        })
        .collect();
    ranked.sort_by_key(|(index, _)| *index);
    Ok(ranked.into_iter().map(|(_, candidate)| candidate).collect())
}

/// Text before the first `==` section heading.
#[must_use]
pub fn lead_section(extract: &str) -> String {
    extract
        .lines()
        .take_while(|line| !line.trim_start().starts_with("=="))
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

fn is_geographic(candidate: &Candidate) -> bool {
    if candidate.has_coordinates {
        return true;
    }
    let description = candidate.short_description.to_lowercase();
    SETTLEMENT_KEYWORDS
        .iter()
        .chain(ADMINISTRATIVE_KEYWORDS.iter())
        .chain(REGION_KEYWORDS.iter())
        .any(|keyword| description.contains(keyword))
}

fn check_api_error(body: &Value) -> Result<(), SourceError> {
    match body.get("error") {
        Some(error) => Err(SourceError::Decode(format!(
            "api error {}: {}",
            str_field(error, "code"),
            str_field(error, "info")
        ))),
        None => Ok(()),
    }
}

fn flag(page: &Value, key: &str) -> bool {
    page.get(key).is_some_and(|value| value.as_bool().unwrap_or(true))
}

fn str_field<'a>(node: &'a Value, key: &str) -> &'a str {
    node.get(key).and_then(Value::as_str).unwrap_or_default()
}
