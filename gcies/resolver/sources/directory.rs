use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use gcies_nlp::compact_whitespace;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde_json::{json, Value};
use shared_logging::LogLevel;
use url::Url;

use super::{text_at, value_at_path};
use crate::{
    candidate::{Candidate, RawDocument, SourceKind},
    config::DirectoryConfig,
    error::SourceError,
    query::Query,
    telemetry::ResolverTelemetry,
    transport::HttpTransport,
};

static H1: Lazy<Selector> = Lazy::new(|| Selector::parse("h1").expect("h1 selector is valid"));
static TITLE: Lazy<Selector> =
    Lazy::new(|| Selector::parse("title").expect("title selector is valid"));
static OG_IMAGE: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"meta[property="og:image"]"#).expect("og:image selector is valid")
});
static META_DESCRIPTION: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"meta[name="description"]"#).expect("description selector is valid")
});

/// Elements whose text never counts as page content.
const SKIPPED_ELEMENTS: [&str; 6] = ["script", "style", "nav", "footer", "noscript", "template"];

/// Elements that start a new line of extracted text.
const BLOCK_ELEMENTS: [&str; 22] = [
    "address", "article", "aside", "blockquote", "body", "dd", "div", "dt", "figcaption", "h1",
    "h2", "h3", "h4", "h5", "h6", "header", "li", "main", "p", "section", "td", "th",
];

/// Case-sensitive phrases after which a directory page is boilerplate.
#[derive(Debug, Clone)]
pub struct BoilerplateMarkers {
    pattern: Option<Regex>,
}

impl BoilerplateMarkers {
    /// Compiles the markers into one alternation. Blank markers are ignored.
    pub fn new(markers: &[String]) -> Result<Self, regex::Error> {
        let alternatives: Vec<String> = markers
            .iter()
            .filter(|marker| !marker.trim().is_empty())
            .map(|marker| regex::escape(marker))
            .collect();
        if alternatives.is_empty() {
            return Ok(Self { pattern: None });
        }
        Ok(Self {
            pattern: Some(Regex::new(&alternatives.join("|"))?),
        })
    }

    /// `text` up to, not including, the earliest marker.
    #[must_use]
    pub fn truncate<'a>(&self, text: &'a str) -> &'a str {
        match self.pattern.as_ref().and_then(|re| re.find(text)) {
            Some(found) => text[..found.start()].trim_end(),
            None => text,
        }
    }
}

/// Regional directory adapter.
pub struct DirectorySource {
    transport: Arc<dyn HttpTransport>,
    config: DirectoryConfig,
    base: Url,
    content: Selector,
    markers: BoilerplateMarkers,
    telemetry: Option<ResolverTelemetry>,
}

impl DirectorySource {
    /// Creates an adapter; fails when `base_url` is unset or a pattern is invalid.
    pub fn new(transport: Arc<dyn HttpTransport>, config: DirectoryConfig) -> Result<Self> {
        let base = config
            .base_url
            .as_deref()
            .ok_or_else(|| anyhow!("directory.base_url is not configured"))?;
        let base = Url::parse(base).with_context(|| format!("parsing directory base url {base}"))?;
        let content = Selector::parse(&config.content_selector)
            .map_err(|err| anyhow!("invalid content selector '{}': {err}", config.content_selector))?;
        let markers = BoilerplateMarkers::new(&config.boilerplate_markers)
            .context("compiling boilerplate markers")?;
        Ok(Self {
            transport,
            config,
            base,
            content,
            markers,
            telemetry: None,
        })
    }

    /// Attaches telemetry.
    #[must_use]
    pub fn with_telemetry(mut self, telemetry: Option<ResolverTelemetry>) -> Self {
        self.telemetry = telemetry;
        self
    }

    /// Directory search hits, capped. Blank input makes no request.
    pub async fn search_candidates(&self, raw_query: &str) -> Result<Vec<Candidate>, SourceError> {
        let term = raw_query.trim();
        if term.is_empty() {
            return Ok(Vec::new());
        }
        let url = self.endpoint(&self.config.search_path)?;
        let body = self
            .transport
            .get_json(url.as_str(), &[(self.config.query_param.as_str(), term)])
            .await?;
        let candidates = parse_search_results(&body, &self.config)?;
        if let Some(tel) = &self.telemetry {
            let _ = tel.log(
                LogLevel::Debug,
                "resolver.directory.search",
                json!({ "term": term, "hits": candidates.len() }),
            );
        }
        Ok(candidates)
    }

    /// First search hit for the primary term; the directory has no ranking.
    pub async fn resolve_best(&self, query: &Query) -> Result<Option<Candidate>, SourceError> {
        Ok(self
            .search_candidates(query.primary_term())
            .await?
            .into_iter()
            .next())
    }

    /// Scrapes the page at a site-relative `path`.
    pub async fn fetch_document(&self, path: &str) -> Result<RawDocument, SourceError> {
        let url = self.endpoint(path)?;
        let html = self.transport.get_text(url.as_str(), &[]).await?;
        let document = parse_directory_page(&html, &self.content, &self.markers)?;
        if let Some(tel) = &self.telemetry {
            let _ = tel.log(
                LogLevel::Debug,
                "resolver.directory.page",
                json!({
                    "url": url.as_str(),
                    "title": document.title,
                    "chars": document.full_text.chars().count(),
                }),
            );
        }
        Ok(document)
    }

    /// Resolves `path` against the base URL; anything leaving the directory's
    /// origin is treated as a page that does not exist.
    fn endpoint(&self, path: &str) -> Result<Url, SourceError> {
        let url = self
            .base
            .join(path)
            .map_err(|err| SourceError::Decode(format!("bad directory path {path}: {err}")))?;
        if url.origin() != self.base.origin() {
            return Err(SourceError::NotFound(format!(
                "{path} is outside the directory at {}",
                self.base
            )));
        }
        Ok(url)
    }
}

fn parse_search_results(body: &Value, config: &DirectoryConfig) -> Result<Vec<Candidate>, SourceError> {
    let root = match config.array_root.as_deref() {
        Some(path) => value_at_path(body, path)
            .ok_or_else(|| SourceError::Decode(format!("search response has no '{path}'")))?,
        None => body,
    };
    let entries = root
        .as_array()
        .ok_or_else(|| SourceError::Decode("search response is not an array".to_string()))?;
    let mapping = &config.mapping;
    Ok(entries
        .iter()
        .filter_map(|entry| {
            let title = text_at(entry, &mapping.title)?;
            let path = text_at(entry, &mapping.path)?;
            let description = text_at(entry, &mapping.description).unwrap_or_default();
            Some(
                Candidate::new(title, SourceKind::RegionalDirectory)
                    .with_description(description)
                    .with_path(path),
            )
        })
        .take(config.result_cap)
        .collect())
}

/// Extracts a document from a directory page.
///
/// Text comes from the `content` region minus scripts, styles and navigation,
/// one line per block element, cut before the first boilerplate marker.
pub fn parse_directory_page(
    html: &str,
    content: &Selector,
    markers: &BoilerplateMarkers,
) -> Result<RawDocument, SourceError> {
    let page = Html::parse_document(html);
    let title = first_text(&page, &H1)
        .or_else(|| first_text(&page, &TITLE))
        .ok_or_else(|| SourceError::Decode("directory page has no title".to_string()))?;
    let image_url = meta_content(&page, &OG_IMAGE);

    let mut blocks = Vec::new();
    for region in page.select(content) {
        collect_blocks(region, &mut blocks);
    }
    let joined = blocks.join("\n");
    let full_text = markers.truncate(&joined).to_string();

    let short_summary = meta_content(&page, &META_DESCRIPTION)
        .or_else(|| {
            full_text
                .lines()
                .find(|line| *line != title)
                .or_else(|| full_text.lines().next())
                .map(str::to_string)
        })
        .unwrap_or_default();

    Ok(RawDocument {
        title,
        full_text,
        short_summary,
        image_url,
    })
}

fn collect_blocks(region: ElementRef<'_>, blocks: &mut Vec<String>) {
    let mut current_block = None;
    let mut line = String::new();
    for node in region.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let skipped = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .is_some_and(|element| SKIPPED_ELEMENTS.contains(&element.name()))
        });
        if skipped {
            continue;
        }
        let compacted = compact_whitespace(text);
        if compacted.is_empty() {
            continue;
        }
        let block = node.ancestors().find(|ancestor| {
            ancestor
                .value()
                .as_element()
                .is_some_and(|element| BLOCK_ELEMENTS.contains(&element.name()))
        });
        let block_id = block.map(|ancestor| ancestor.id());
        if block_id != current_block && !line.is_empty() {
            blocks.push(std::mem::take(&mut line));
        }
        current_block = block_id;
        if !line.is_empty() {
            line.push(' ');
        }
        line.push_str(&compacted);
    }
    if !line.is_empty() {
        blocks.push(line);
    }
}

fn first_text(page: &Html, selector: &Selector) -> Option<String> {
    page.select(selector)
        .map(|element| compact_whitespace(&element.text().collect::<String>()))
        .find(|text| !text.is_empty())
}

fn meta_content(page: &Html, selector: &Selector) -> Option<String> {
    page.select(selector)
        .filter_map(|element| element.value().attr("content"))
        .map(str::trim)
        .find(|content| !content.is_empty())
        .map(str::to_string)
}
