use std::{env, fmt, time::Duration};

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use indexmap::IndexMap;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use shared_logging::LogLevel;

use crate::telemetry::NlpTelemetry;

/// Labeled insights about a place, or an explicit failure marker.
///
/// Both forms serialize to a flat JSON object; the failed form is
/// `{"error": ..., "details": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum InsightSet {
    /// Label → explanation, in the order the model produced them.
    Ready(IndexMap<String, String>),
    /// Summarization did not succeed.
    Failed {
        /// Short user-facing reason.
        error: String,
        /// Underlying error chain.
        details: String,
    },
}

impl InsightSet {
    /// Builds a failure marker.
    #[must_use]
    pub fn failed(error: impl Into<String>, details: impl Into<String>) -> Self {
        Self::Failed {
            error: error.into(),
            details: details.into(),
        }
    }

    /// True for the failure marker.
    #[must_use]
    pub const fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// Turns filtered text about a subject into a small set of labeled insights.
#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Summarizes `text` about `subject`. Label names are model-chosen.
    async fn summarize(&self, text: &str, subject: &str) -> Result<IndexMap<String, String>>;
}

/// Settings for [`ChatSummarizer`].
#[derive(Clone, Deserialize)]
pub struct SummarizerConfig {
    /// Base URL of an OpenAI-compatible API.
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Chat model identifier.
    #[serde(default = "default_model")]
    pub model: String,
    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Completion token budget.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Request timeout in milliseconds.
    #[serde(default = "default_summarizer_timeout_ms")]
    pub timeout_ms: u64,
    /// Environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    /// Inline API key; takes precedence over `api_key_env`.
    #[serde(default)]
    pub api_key: Option<String>,
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_ms: default_summarizer_timeout_ms(),
            api_key_env: default_api_key_env(),
            api_key: None,
        }
    }
}

impl fmt::Debug for SummarizerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SummarizerConfig")
            .field("api_url", &self.api_url)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("timeout_ms", &self.timeout_ms)
            .field("api_key_env", &self.api_key_env)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl SummarizerConfig {
    /// Inline key, else the configured environment variable.
    #[must_use]
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| env::var(&self.api_key_env).ok())
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
    }
}

fn default_api_url() -> String {
    "https://api.groq.com/openai/v1".into()
}

fn default_model() -> String {
    "llama-3.3-70b-versatile".into()
}

const fn default_temperature() -> f32 {
    0.3
}

const fn default_max_tokens() -> u32 {
    700
}

const fn default_summarizer_timeout_ms() -> u64 {
    30_000
}

fn default_api_key_env() -> String {
    "GROQ_API_KEY".into()
}

/// Prompt asking for 6–7 labeled "famous things" about `subject`.
#[must_use]
pub fn build_prompt(text: &str, subject: &str) -> String {
    format!(
        "You are an expert geographer and historian. Below is filtered text about {subject}.\n\
         Identify the 6 to 7 things {subject} is most famous for: landmarks, culture and history.\n\
         Reply ONLY with a JSON object holding 6 to 7 string key-value pairs.\n\
         Keys are short descriptive labels (for example \"Historical Significance\" or \
         \"Famous Landmark\"); values are 1-2 sentences of rich, informative insight in a \
         premium tone.\n\
         Return raw JSON, without markdown code fences.\n\n\
         Text:\n{text}\n"
    )
}

/// Parses a model reply into ordered label → text pairs.
///
/// Markdown code fences are tolerated and non-string values are stringified.
/// Anything other than a non-empty JSON object is an error.
pub fn parse_insights(content: &str) -> Result<IndexMap<String, String>> {
    let body = strip_code_fence(content);
    let parsed: IndexMap<String, Value> =
        serde_json::from_str(body).context("summary is not a JSON object")?;
    if parsed.is_empty() {
        bail!("summary JSON object is empty");
    }
    Ok(parsed
        .into_iter()
        .map(|(label, value)| {
            let text = match value {
                Value::String(text) => text,
                other => other.to_string(),
            };
            (label, text)
        })
        .collect())
}

fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.split_once('\n').map_or("", |(_, body)| body);
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Summarizer backed by an OpenAI-compatible chat-completions endpoint.
pub struct ChatSummarizer {
    client: Client,
    config: SummarizerConfig,
    api_key: Option<String>,
    telemetry: Option<NlpTelemetry>,
}

impl fmt::Debug for ChatSummarizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatSummarizer")
            .field("config", &self.config)
            .field("has_api_key", &self.api_key.is_some())
            .finish_non_exhaustive()
    }
}

impl ChatSummarizer {
    /// Creates the client; a missing key is reported per call, not here.
    #[must_use]
    pub fn new(client: Client, config: SummarizerConfig, telemetry: Option<NlpTelemetry>) -> Self {
        let api_key = config.resolve_api_key();
        if api_key.is_none() {
            if let Some(tel) = &telemetry {
                let _ = tel.log(
                    LogLevel::Warn,
                    "nlp.summary.no_api_key",
                    json!({ "env": config.api_key_env }),
                );
            }
        }
        Self {
            client,
            config,
            api_key,
            telemetry,
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.api_url.trim_end_matches('/'))
    }

    fn request_body(&self, text: &str, subject: &str) -> Value {
        json!({
            "model": self.config.model,
            "messages": [{ "role": "user", "content": build_prompt(text, subject) }],
            "temperature": self.config.temperature,
            "max_completion_tokens": self.config.max_tokens,
            "response_format": { "type": "json_object" },
        })
    }
}

#[async_trait]
impl Summarizer for ChatSummarizer {
    async fn summarize(&self, text: &str, subject: &str) -> Result<IndexMap<String, String>> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            anyhow!(
                "no API key configured; set {} or summarizer.api_key",
                self.config.api_key_env
            )
        })?;
        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(api_key)
            .timeout(Duration::from_millis(self.config.timeout_ms))
            .json(&self.request_body(text, subject))
            .send()
            .await
            .context("summarizer request failed")?;
        let payload = response
            .error_for_status()
            .context("summarizer bad status")?
            .json::<ChatResponse>()
            .await
            .context("summarizer invalid json")?;
        let content = payload
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| anyhow!("summarizer returned no content"))?;
        let insights = parse_insights(&content)?;
        if let Some(tel) = &self.telemetry {
            let _ = tel.log(
                LogLevel::Info,
                "nlp.summary.generated",
                json!({ "subject": subject, "insights": insights.len() }),
            );
        }
        Ok(insights)
    }
}
