use std::{fs, path::Path, time::Duration};

use anyhow::{bail, Context, Result};
use gcies_nlp::{ClassifierConfig, SummarizerConfig, DEFAULT_MAX_SENTENCES};
use serde::Deserialize;

/// Whole-process configuration. Every section is optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GciesConfig {
    /// Shared HTTP client settings.
    #[serde(default)]
    pub http: HttpSettings,
    /// Wikipedia adapter.
    #[serde(default)]
    pub wikipedia: WikipediaConfig,
    /// Regional directory adapter.
    #[serde(default)]
    pub directory: DirectoryConfig,
    /// Entity classifier backing the filter.
    #[serde(default)]
    pub classifier: ClassifierConfig,
    /// Chat summarizer.
    #[serde(default)]
    pub summarizer: SummarizerConfig,
    /// Entity filter tuning.
    #[serde(default)]
    pub filter: FilterSettings,
}

impl GciesConfig {
    /// Loads and validates a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_toml_str(&raw).with_context(|| format!("parsing {}", path.display()))
    }

    /// Parses and validates TOML text.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects settings no component can work with.
    pub fn validate(&self) -> Result<()> {
        if self.wikipedia.api_url.trim().is_empty() {
            bail!("wikipedia.api_url must not be empty");
        }
        if self.wikipedia.search_limit == 0 || self.wikipedia.suggest_limit == 0 {
            bail!("wikipedia search and suggest limits must be positive");
        }
        if let Some(base) = &self.directory.base_url {
            url::Url::parse(base).with_context(|| format!("directory.base_url {base}"))?;
        }
        if self.wikipedia.timeout_ms == 0 {
            bail!("wikipedia.timeout_ms must be positive");
        }
        if self.directory.timeout_ms == 0 {
            bail!("directory.timeout_ms must be positive");
        }
        if self.directory.result_cap == 0 {
            bail!("directory.result_cap must be positive");
        }
        if self.directory.content_selector.trim().is_empty() {
            bail!("directory.content_selector must not be empty");
        }
        if let ClassifierConfig::Http(remote) = &self.classifier {
            if remote.url.trim().is_empty() {
                bail!("classifier.url must not be empty");
            }
            if remote.timeout_ms == 0 {
                bail!("classifier.timeout_ms must be positive");
            }
        }
        if self.summarizer.api_url.trim().is_empty() {
            bail!("summarizer.api_url must not be empty");
        }
        if self.summarizer.timeout_ms == 0 {
            bail!("summarizer.timeout_ms must be positive");
        }
        if !(0.0..=2.0).contains(&self.summarizer.temperature) {
            bail!(
                "summarizer.temperature {} outside 0.0..=2.0",
                self.summarizer.temperature
            );
        }
        if self.filter.max_sentences == 0 {
            bail!("filter.max_sentences must be positive");
        }
        Ok(())
    }
}

/// Settings for the shared `reqwest` client.
#[derive(Debug, Clone, Deserialize)]
pub struct HttpSettings {
    /// `User-Agent` sent with every request.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
        }
    }
}

/// Wikipedia adapter settings.
#[derive(Debug, Clone, Deserialize)]
pub struct WikipediaConfig {
    /// MediaWiki Action API endpoint.
    #[serde(default = "default_wikipedia_api")]
    pub api_url: String,
    /// Hits fetched per search (`gsrlimit`).
    #[serde(default = "default_search_limit")]
    pub search_limit: usize,
    /// Suggestions kept for autocomplete.
    #[serde(default = "default_suggest_limit")]
    pub suggest_limit: usize,
    /// Thumbnail width requested for the main image.
    #[serde(default = "default_thumbnail_size")]
    pub thumbnail_size: u32,
    /// Per-request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for WikipediaConfig {
    fn default() -> Self {
        Self {
            api_url: default_wikipedia_api(),
            search_limit: default_search_limit(),
            suggest_limit: default_suggest_limit(),
            thumbnail_size: default_thumbnail_size(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl WikipediaConfig {
    /// Request timeout as a duration.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Dot paths locating candidate fields inside a directory search entry.
#[derive(Debug, Clone, Deserialize)]
pub struct DirectoryMapping {
    /// Settlement name.
    #[serde(default = "default_title_field")]
    pub title: String,
    /// Short blurb.
    #[serde(default = "default_description_field")]
    pub description: String,
    /// Site-relative page path.
    #[serde(default = "default_path_field")]
    pub path: String,
}

impl Default for DirectoryMapping {
    fn default() -> Self {
        Self {
            title: default_title_field(),
            description: default_description_field(),
            path: default_path_field(),
        }
    }
}

/// Regional directory adapter settings.
#[derive(Debug, Clone, Deserialize)]
pub struct DirectoryConfig {
    /// Site root; the adapter is unavailable when unset.
    #[serde(default)]
    pub base_url: Option<String>,
    /// Path of the JSON search endpoint.
    #[serde(default = "default_search_path")]
    pub search_path: String,
    /// Query-string parameter carrying the search text.
    #[serde(default = "default_query_param")]
    pub query_param: String,
    /// Dot path to the result array; the body itself when unset.
    #[serde(default)]
    pub array_root: Option<String>,
    /// Field mapping for search entries.
    #[serde(default)]
    pub mapping: DirectoryMapping,
    /// Maximum candidates returned by a search.
    #[serde(default = "default_result_cap")]
    pub result_cap: usize,
    /// CSS selector of the page region holding the article text.
    #[serde(default = "default_content_selector")]
    pub content_selector: String,
    /// Case-sensitive phrases where the useful page text ends.
    #[serde(default = "default_boilerplate_markers")]
    pub boilerplate_markers: Vec<String>,
    /// Per-request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            search_path: default_search_path(),
            query_param: default_query_param(),
            array_root: None,
            mapping: DirectoryMapping::default(),
            result_cap: default_result_cap(),
            content_selector: default_content_selector(),
            boilerplate_markers: default_boilerplate_markers(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl DirectoryConfig {
    /// Request timeout as a duration.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Entity filter tuning.
#[derive(Debug, Clone, Deserialize)]
pub struct FilterSettings {
    /// Cap on kept sentences.
    #[serde(default = "default_max_sentences")]
    pub max_sentences: usize,
    /// Below this many characters the filter is re-run on the short summary.
    #[serde(default = "default_min_filtered_chars")]
    pub min_filtered_chars: usize,
}

impl Default for FilterSettings {
    fn default() -> Self {
        Self {
            max_sentences: default_max_sentences(),
            min_filtered_chars: default_min_filtered_chars(),
        }
    }
}

fn default_user_agent() -> String {
    format!("gcies/{} (place insight resolver)", env!("CARGO_PKG_VERSION"))
}

fn default_wikipedia_api() -> String {
    "https://en.wikipedia.org/w/api.php".to_string()
}

const fn default_search_limit() -> usize {
    10
}

const fn default_suggest_limit() -> usize {
    8
}

const fn default_thumbnail_size() -> u32 {
    1000
}

const fn default_timeout_ms() -> u64 {
    10_000
}

fn default_title_field() -> String {
    "name".to_string()
}

fn default_description_field() -> String {
    "description".to_string()
}

fn default_path_field() -> String {
    "url".to_string()
}

fn default_search_path() -> String {
    "/search".to_string()
}

fn default_query_param() -> String {
    "q".to_string()
}

const fn default_result_cap() -> usize {
    5
}

fn default_content_selector() -> String {
    "body".to_string()
}

fn default_boilerplate_markers() -> Vec<String> {
    ["HOW TO REACH", "Colleges near", "Schools near", "Hospitals near"]
        .into_iter()
        .map(str::to_string)
        .collect()
}

const fn default_max_sentences() -> usize {
    DEFAULT_MAX_SENTENCES
}

const fn default_min_filtered_chars() -> usize {
    100
}
