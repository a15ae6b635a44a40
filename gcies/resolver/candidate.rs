use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// The fixed set of candidate sources.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// English Wikipedia.
    #[default]
    Wikipedia,
    /// Scraped regional settlement directory.
    RegionalDirectory,
}

impl SourceKind {
    /// Stable lower-case name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Wikipedia => "wikipedia",
            Self::RegionalDirectory => "regional_directory",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceKind {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "wikipedia" | "wiki" => Ok(Self::Wikipedia),
            "regional_directory" | "directory" | "regional" => Ok(Self::RegionalDirectory),
            other => Err(format!("unknown source '{other}'")),
        }
    }
}

/// A place proposed by a source as a possible match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    /// Page title.
    pub title: String,
    /// Short description (Wikidata description, directory blurb).
    pub short_description: String,
    /// Whether the source attaches coordinates.
    pub has_coordinates: bool,
    /// Opening text of the page, if the source returns one.
    pub extract_snippet: String,
    /// Producing source.
    pub source: SourceKind,
    /// Source-relative page path, for sources addressed by path.
    pub source_path: Option<String>,
}

impl Candidate {
    /// Candidate with empty metadata.
    #[must_use]
    pub fn new(title: impl Into<String>, source: SourceKind) -> Self {
        Self {
            title: title.into(),
            short_description: String::new(),
            has_coordinates: false,
            extract_snippet: String::new(),
            source,
            source_path: None,
        }
    }

    /// Sets the short description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.short_description = description.into();
        self
    }

    /// Marks the candidate as carrying coordinates.
    #[must_use]
    pub const fn with_coordinates(mut self, has_coordinates: bool) -> Self {
        self.has_coordinates = has_coordinates;
        self
    }

    /// Sets the extract snippet.
    #[must_use]
    pub fn with_snippet(mut self, snippet: impl Into<String>) -> Self {
        self.extract_snippet = snippet.into();
        self
    }

    /// Sets the page path.
    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.source_path = Some(path.into());
        self
    }

    /// Identifier to pass to `fetch_document`: the path if any, else the title.
    #[must_use]
    pub fn document_id(&self) -> &str {
        self.source_path.as_deref().unwrap_or(&self.title)
    }
}

/// A candidate with its ranking score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScoredCandidate {
    /// The candidate.
    pub candidate: Candidate,
    /// Lexical score; only strictly positive scores are eligible.
    pub score: i64,
}

/// Full page content of a resolved candidate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RawDocument {
    /// Canonical page title.
    pub title: String,
    /// Plain text of the page; may be empty.
    pub full_text: String,
    /// Lead paragraph or meta description.
    pub short_summary: String,
    /// Main image, when one could be looked up.
    pub image_url: Option<String>,
}
