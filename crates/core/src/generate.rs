use crate::traits::TextGenerator;
use crate::SearchError;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use url::Url;

/// Ollama text-completion client (`/api/generate`, non-streaming).
/// Shared by query expansion and answer composition.
pub struct OllamaGenerator {
    endpoint: String,
    model: String,
    client: Client,
}

impl OllamaGenerator {
    pub fn new(
        endpoint: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<Self, SearchError> {
        let endpoint = endpoint.into();
        Url::parse(&endpoint)?;

        Ok(Self {
            endpoint,
            model: model.into(),
            client: Client::new(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl TextGenerator for OllamaGenerator {
    async fn complete(&self, prompt: &str) -> Result<String, SearchError> {
        let response = self
            .client
            .post(format!("{}/api/generate", self.endpoint))
            .json(&json!({
                "model": self.model,
                "prompt": prompt,
                "stream": false,
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SearchError::BackendResponse {
                backend: "ollama".to_string(),
                details: response.status().to_string(),
            });
        }

        let parsed: Value = response.json().await?;
        parsed
            .pointer("/response")
            .and_then(Value::as_str)
            .map(|text| text.to_string())
            .ok_or_else(|| {
                SearchError::Generation("completion response carried no text".to_string())
            })
    }
}

#[cfg(test)]
mod tests {
    use super::OllamaGenerator;
    use crate::SearchError;

    #[test]
    fn invalid_endpoint_is_rejected() {
        let result = OllamaGenerator::new("::::", "llama3");
        assert!(matches!(result, Err(SearchError::Url(_))));
    }
}
