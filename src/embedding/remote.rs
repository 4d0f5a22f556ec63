//! OpenAI-compatible embedding client.

use super::Embedder;
use crate::config::EmbedderConfig;
use crate::error::{RagError, Result};
use crate::llm::ApiError;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

/// Embedder backed by a `/embeddings` HTTP endpoint.
#[derive(Clone)]
pub struct HttpEmbedder {
    client: Client,
    config: EmbedderConfig,
}

impl HttpEmbedder {
    pub fn new(config: EmbedderConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    fn endpoint(&self) -> String {
        let base = self.config.api_base.trim_end_matches('/');
        format!("{}/embeddings", base)
    }

    fn parse_response(body: &str) -> Result<Vec<f32>> {
        let parsed: EmbeddingResponse = serde_json::from_str(body)
            .map_err(|e| RagError::Embedding(format!("malformed embedding response: {}", e)))?;

        parsed
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| RagError::Embedding("no embedding in response".to_string()))
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let request = EmbeddingRequest {
            model: &self.config.model,
            input: text,
        };

        let mut builder = self.client.post(self.endpoint()).json(&request);
        if !self.config.api_key.is_empty() {
            builder = builder.bearer_auth(&self.config.api_key);
        }

        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let detail = serde_json::from_str::<ApiError>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(RagError::Embedding(format!(
                "{} ({}): {}",
                self.config.model, status, detail
            )));
        }

        Self::parse_response(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EmbedderBackend;

    #[test]
    fn test_endpoint_construction() {
        let embedder = HttpEmbedder::new(EmbedderConfig {
            backend: EmbedderBackend::Remote,
            api_base: "http://localhost:11434/v1/".to_string(),
            api_key: String::new(),
            model: "bge-m3".to_string(),
        });
        assert_eq!(embedder.endpoint(), "http://localhost:11434/v1/embeddings");
    }

    #[test]
    fn test_parse_response() {
        let body = r#"{"object": "list", "data": [{"index": 0, "embedding": [0.5, -0.25, 1.0]}]}"#;
        assert_eq!(HttpEmbedder::parse_response(body).unwrap(), vec![0.5, -0.25, 1.0]);
    }

    #[test]
    fn test_parse_empty_response() {
        let result = HttpEmbedder::parse_response(r#"{"data": []}"#);
        assert!(matches!(result, Err(RagError::Embedding(_))));
    }
}
