//! Candidate sources behind one closed set of adapters.

/// Scraped regional settlement directory.
pub mod directory;
/// English Wikipedia through the MediaWiki Action API.
pub mod wikipedia;

use serde_json::Value;

pub use directory::{parse_directory_page, BoilerplateMarkers, DirectorySource};
pub use wikipedia::{lead_section, parse_search_pages, WikipediaSource};

use crate::{
    candidate::{Candidate, RawDocument, SourceKind},
    error::SourceError,
    query::Query,
};

/// A configured source adapter.
pub enum CandidateSource {
    /// Wikipedia search with lexical ranking.
    Wikipedia(WikipediaSource),
    /// Regional directory, first hit wins.
    RegionalDirectory(DirectorySource),
}

impl CandidateSource {
    /// Which source this adapter talks to.
    #[must_use]
    pub const fn kind(&self) -> SourceKind {
        match self {
            Self::Wikipedia(_) => SourceKind::Wikipedia,
            Self::RegionalDirectory(_) => SourceKind::RegionalDirectory,
        }
    }

    /// Autocomplete candidates for free text. Blank input makes no request.
    pub async fn search_candidates(&self, raw_query: &str) -> Result<Vec<Candidate>, SourceError> {
        if raw_query.trim().is_empty() {
            return Ok(Vec::new());
        }
        match self {
            Self::Wikipedia(source) => source.search_candidates(raw_query).await,
            Self::RegionalDirectory(source) => source.search_candidates(raw_query).await,
        }
    }

    /// The single candidate this source would resolve `query` to.
    pub async fn resolve_best(&self, query: &Query) -> Result<Option<Candidate>, SourceError> {
        match self {
            Self::Wikipedia(source) => Ok(source
                .resolve_scored(query)
                .await?
                .map(|scored| scored.candidate)),
            Self::RegionalDirectory(source) => source.resolve_best(query).await,
        }
    }

    /// Full page content for a title or path.
    pub async fn fetch_document(&self, identifier: &str) -> Result<RawDocument, SourceError> {
        match self {
            Self::Wikipedia(source) => source.fetch_document(identifier).await,
            Self::RegionalDirectory(source) => source.fetch_document(identifier).await,
        }
    }
}

impl From<WikipediaSource> for CandidateSource {
    fn from(source: WikipediaSource) -> Self {
        Self::Wikipedia(source)
    }
}

impl From<DirectorySource> for CandidateSource {
    fn from(source: DirectorySource) -> Self {
        Self::RegionalDirectory(source)
    }
}

/// Walks a dot-separated path (`data.results`) through nested objects.
pub(crate) fn value_at_path<'a>(mut node: &'a Value, path: &str) -> Option<&'a Value> {
    for key in path.split('.') {
        if key.is_empty() {
            continue;
        }
        node = node.get(key)?;
    }
    Some(node)
}

/// Trimmed, non-empty string at `path`.
pub(crate) fn text_at(node: &Value, path: &str) -> Option<String> {
    value_at_path(node, path)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
}
