//! Chroma HTTP API client.
//!
//! Partitions are expressed as a `where: {"source": ...}` filter on a single
//! collection. The collection id is resolved from its name on first use.

use super::{Partition, PartitionHit, VectorIndex};
use crate::config::IndexConfig;
use crate::error::{RagError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::OnceCell;

#[derive(Debug, Deserialize)]
struct CollectionInfo {
    id: String,
}

/// Chroma returns one row per query embedding; we always send exactly one.
#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    documents: Option<Vec<Vec<Option<String>>>>,
    #[serde(default)]
    distances: Option<Vec<Vec<Option<f32>>>>,
}

pub struct ChromaIndex {
    client: Client,
    config: IndexConfig,
    collection_id: OnceCell<String>,
}

impl ChromaIndex {
    pub fn new(config: IndexConfig) -> Self {
        Self {
            client: Client::new(),
            config,
            collection_id: OnceCell::new(),
        }
    }

    fn base(&self) -> &str {
        self.config.url.trim_end_matches('/')
    }

    fn collection_endpoint(&self) -> String {
        format!("{}/api/v1/collections/{}", self.base(), self.config.collection)
    }

    fn query_endpoint(&self, collection_id: &str) -> String {
        format!("{}/api/v1/collections/{}/query", self.base(), collection_id)
    }

    async fn collection_id(&self) -> Result<&str> {
        let id = self
            .collection_id
            .get_or_try_init(|| async {
                let response = self.client.get(self.collection_endpoint()).send().await?;
                let status = response.status();
                let body = response.text().await?;
                if !status.is_success() {
                    return Err(RagError::Index(format!(
                        "collection '{}' lookup failed ({}): {}",
                        self.config.collection, status, body
                    )));
                }
                let info: CollectionInfo = serde_json::from_str(&body)
                    .map_err(|e| RagError::Index(format!("malformed collection info: {}", e)))?;
                tracing::debug!(collection = %self.config.collection, id = %info.id, "resolved collection");
                Ok::<String, RagError>(info.id)
            })
            .await?;
        Ok(id.as_str())
    }

    /// Flatten the first result row into hits, dropping entries without text.
    fn parse_query_response(body: &str) -> Result<Vec<PartitionHit>> {
        let parsed: QueryResponse = serde_json::from_str(body)
            .map_err(|e| RagError::Index(format!("malformed query response: {}", e)))?;

        let documents = parsed
            .documents
            .and_then(|rows| rows.into_iter().next())
            .unwrap_or_default();
        let distances = parsed
            .distances
            .and_then(|rows| rows.into_iter().next())
            .unwrap_or_default();

        let hits = documents
            .into_iter()
            .zip(distances)
            .filter_map(|(doc, distance)| Some(PartitionHit::new(doc?, distance?)))
            .collect();

        Ok(hits)
    }
}

#[async_trait]
impl VectorIndex for ChromaIndex {
    async fn query(
        &self,
        partition: Partition,
        query_vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<PartitionHit>> {
        let collection_id = self.collection_id().await?;

        let body = json!({
            "query_embeddings": [query_vector],
            "n_results": top_k,
            "where": { "source": partition.as_str() },
            "include": ["documents", "distances"],
        });

        let response = self
            .client
            .post(self.query_endpoint(collection_id))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(RagError::Index(format!(
                "{} partition query failed ({}): {}",
                partition, status, text
            )));
        }

        Self::parse_query_response(&text)
    }
}
