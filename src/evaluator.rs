//! Post-hoc answer scoring.
//!
//! Scores are cosine similarities in the evaluation embedding space, which
//! is separate from the space used to query the index:
//!
//! - groundedness: answer vs. the joined retrieved context
//! - relevance: query vs. the joined retrieved context
//!
//! Relevance therefore measures what retrieval surfaced, not how well the
//! answer addresses the query.

use crate::embedding::{Embedder, cosine_similarity};
use crate::retrieval::RankedContext;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Score reported when a text could not be encoded.
pub const SENTINEL_SCORE: f32 = 0.0;

/// The generated answer with its quality scores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub answer: String,
    /// In [-1, 1], rounded to 4 decimals.
    pub groundedness: f32,
    /// In [-1, 1], rounded to 4 decimals.
    pub relevance: f32,
}

/// Round to 4 decimal places.
pub fn round_score(score: f32) -> f32 {
    ((score as f64 * 10_000.0).round() / 10_000.0) as f32
}

/// Scores answers against their retrieved context.
#[derive(Clone)]
pub struct AnswerEvaluator {
    embedder: Arc<dyn Embedder>,
}

impl AnswerEvaluator {
    /// `embedder` must be the evaluation-space model, not the retrieval one.
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self { embedder }
    }

    /// Score `answer`. Never fails: an encoding error yields
    /// [`SENTINEL_SCORE`] for every score that needed the failed vector.
    pub async fn evaluate(
        &self,
        answer: &str,
        context: &RankedContext,
        query: &str,
    ) -> EvaluationResult {
        let context_blob = context.join(" ");

        let context_vec = self.encode("context", &context_blob).await;
        let answer_vec = self.encode("answer", answer).await;
        let query_vec = self.encode("query", query).await;

        let groundedness = Self::score(answer_vec.as_deref(), context_vec.as_deref());
        let relevance = Self::score(query_vec.as_deref(), context_vec.as_deref());

        tracing::info!(
            context_items = context.len(),
            "answer evaluated: groundedness {:.2}, relevance {:.2}",
            groundedness,
            relevance
        );

        EvaluationResult {
            answer: answer.to_string(),
            groundedness,
            relevance,
        }
    }

    async fn encode(&self, what: &'static str, text: &str) -> Option<Vec<f32>> {
        match self.embedder.embed(text).await {
            Ok(vector) => Some(vector),
            Err(e) => {
                tracing::warn!(
                    text = what,
                    error = %e,
                    "evaluation encoding failed, scoring with sentinel"
                );
                None
            }
        }
    }

    fn score(a: Option<&[f32]>, b: Option<&[f32]>) -> f32 {
        match (a, b) {
            (Some(a), Some(b)) => round_score(cosine_similarity(a, b)),
            _ => SENTINEL_SCORE,
        }
    }
}
