use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{ClassifiedSentence, EntityClassifier, RemoteClassifierConfig};

#[derive(Serialize)]
struct ClassifyRequest<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct ClassifyResponse {
    sentences: Vec<ClassifiedSentence>,
}

/// Classifier delegating to an external NER service over HTTP.
pub struct HttpEntityClassifier {
    client: Client,
    config: RemoteClassifierConfig,
}

impl std::fmt::Debug for HttpEntityClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpEntityClassifier")
            .field("url", &self.config.url)
            .finish_non_exhaustive()
    }
}

impl HttpEntityClassifier {
    /// Creates a classifier posting to `config.url`.
    pub fn new(client: Client, config: &RemoteClassifierConfig) -> Result<Self> {
        if config.url.trim().is_empty() {
            bail!("entity classifier url must not be empty");
        }
        Ok(Self {
            client,
            config: config.clone(),
        })
    }
}

#[async_trait]
impl EntityClassifier for HttpEntityClassifier {
    async fn classify(&self, text: &str) -> Result<Vec<ClassifiedSentence>> {
        let response = self
            .client
            .post(&self.config.url)
            .timeout(self.config.timeout())
            .json(&ClassifyRequest { text })
            .send()
            .await
            .with_context(|| format!("entity classifier {} request failed", self.config.url))?;
        let payload = response
            .error_for_status()
            .with_context(|| format!("entity classifier {} bad status", self.config.url))?
            .json::<ClassifyResponse>()
            .await
            .with_context(|| format!("entity classifier {} invalid json", self.config.url))?;
        Ok(payload.sentences)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::EntityLabel;

    #[test]
    fn rejects_empty_url() {
        let config = RemoteClassifierConfig {
            url: "  ".into(),
            timeout_ms: 1_000,
        };
        assert!(HttpEntityClassifier::new(Client::new(), &config).is_err());
    }

    #[test]
    fn response_shape_decodes() {
        let payload: ClassifyResponse = serde_json::from_str(
            r#"{"sentences":[{"text":"Paris is in France.","labels":["GPE","GPE"]},{"text":"Nice."}]}"#,
        )
        .unwrap();
        assert_eq!(payload.sentences.len(), 2);
        assert_eq!(payload.sentences[0].labels[0], EntityLabel::Gpe);
        assert!(payload.sentences[1].labels.is_empty());
    }
}
