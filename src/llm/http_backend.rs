//! HTTP completion backend (OpenAI-compatible `/completions` shape)

use super::RefinementClient;
use crate::config::RefinementConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize)]
struct CompletionRequest {
    model: String,
    prompt: String,
    temperature: f32,
    max_tokens: u32,
}

/// Tolerates both completion-style and bare-text response bodies
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum CompletionResponse {
    Choices { choices: Vec<CompletionChoice> },
    Text { text: String },
    Response { response: String },
}

#[derive(Debug, Clone, Deserialize)]
struct CompletionChoice {
    text: String,
}

impl CompletionResponse {
    fn into_text(self) -> Result<String> {
        match self {
            CompletionResponse::Choices { choices } => choices
                .into_iter()
                .next()
                .map(|c| c.text)
                .ok_or_else(|| Error::Refinement("Completion response had no choices".into())),
            CompletionResponse::Text { text } => Ok(text),
            CompletionResponse::Response { response } => Ok(response),
        }
    }
}

/// Refinement client over an HTTP completion endpoint. The request is
/// timeout-bounded and never retried; the caller degrades to the heuristic
/// extraction on any failure.
pub struct HttpRefinementClient {
    client: Client,
    endpoint: String,
    model: String,
}

impl HttpRefinementClient {
    pub fn new(config: &RefinementConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
        })
    }
}

#[async_trait]
impl RefinementClient for HttpRefinementClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let request = CompletionRequest {
            model: self.model.clone(),
            prompt: prompt.to_string(),
            temperature: 0.0,
            max_tokens: 1024,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await?
            .error_for_status()
            .map_err(|e| Error::Refinement(e.to_string()))?;

        let parsed: CompletionResponse = response.json().await?;
        parsed.into_text()
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(endpoint: String) -> RefinementConfig {
        RefinementConfig {
            enabled: true,
            endpoint,
            model: "test-model".to_string(),
            timeout_secs: 5,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_completion_choices_shape() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"text": "{\"is_mutual\": true}"}]
            })))
            .mount(&server)
            .await;

        let client =
            HttpRefinementClient::new(&config(format!("{}/v1/completions", server.uri()))).unwrap();
        let text = client.complete("prompt").await.unwrap();
        assert_eq!(text, "{\"is_mutual\": true}");
    }

    #[tokio::test]
    async fn test_bare_response_shape() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"response": "hello"})),
            )
            .mount(&server)
            .await;

        let client = HttpRefinementClient::new(&config(server.uri())).unwrap();
        assert_eq!(client.complete("prompt").await.unwrap(), "hello");
    }

    #[tokio::test]
    async fn test_server_error_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = HttpRefinementClient::new(&config(server.uri())).unwrap();
        assert!(client.complete("prompt").await.is_err());
    }
}
