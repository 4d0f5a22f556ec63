//! Dual-partition retrieval.
//!
//! One query vector is sent to both partitions; the hits are tagged with
//! their partition, flattened, and ranked by distance alone.

use crate::error::{RagError, Result};
use crate::index::{Partition, PartitionHit, VectorIndex};
use serde::Serialize;
use std::sync::Arc;

/// A single retrieved document with its provenance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievedItem {
    pub text: String,
    /// Lower is more similar.
    pub distance: f32,
    pub partition: Partition,
}

/// Retrieved items sorted ascending by distance, irrespective of partition.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct RankedContext {
    items: Vec<RetrievedItem>,
}

impl RankedContext {
    pub fn items(&self) -> &[RetrievedItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Texts in ranked order.
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(|item| item.text.as_str())
    }

    /// All texts joined with `separator`, in ranked order.
    pub fn join(&self, separator: &str) -> String {
        self.texts().collect::<Vec<_>>().join(separator)
    }

    /// Number of items that came from `partition`.
    pub fn count(&self, partition: Partition) -> usize {
        self.items.iter().filter(|i| i.partition == partition).count()
    }
}

/// Merge per-partition hits into one ranking.
///
/// The sort is stable, so equal distances keep passage hits ahead of mcq
/// hits and each partition's own order. NaN distances sort last.
pub fn merge(passage: Vec<PartitionHit>, mcq: Vec<PartitionHit>) -> RankedContext {
    let tagged = |hits: Vec<PartitionHit>, partition: Partition| {
        hits.into_iter().map(move |hit| RetrievedItem {
            text: hit.text,
            distance: hit.distance,
            partition,
        })
    };

    let mut items: Vec<RetrievedItem> = tagged(passage, Partition::Passage)
        .chain(tagged(mcq, Partition::Mcq))
        .collect();

    items.sort_by(|a, b| nan_last(a.distance).total_cmp(&nan_last(b.distance)));

    RankedContext { items }
}

// total_cmp orders negative NaN first; map every NaN to +inf-side NaN.
fn nan_last(distance: f32) -> f32 {
    if distance.is_nan() { f32::NAN.abs() } else { distance }
}

/// Queries both partitions and merges the results.
#[derive(Clone)]
pub struct RetrievalMerger {
    index: Arc<dyn VectorIndex>,
}

impl RetrievalMerger {
    pub fn new(index: Arc<dyn VectorIndex>) -> Self {
        Self { index }
    }

    /// Retrieve up to `top_k` hits from each partition and rank them together.
    ///
    /// A failing partition contributes nothing. Only when both fail is the
    /// index reported as unavailable.
    pub async fn retrieve(&self, query_vector: &[f32], top_k: usize) -> Result<RankedContext> {
        let (passage, mcq) = tokio::join!(
            self.index.query(Partition::Passage, query_vector, top_k),
            self.index.query(Partition::Mcq, query_vector, top_k),
        );

        let (passage, mcq) = match (passage, mcq) {
            (Err(p), Err(m)) => {
                return Err(RagError::IndexUnavailable(format!(
                    "passage: {}; mcq: {}",
                    p, m
                )));
            }
            (passage, mcq) => (
                Self::or_empty(Partition::Passage, passage),
                Self::or_empty(Partition::Mcq, mcq),
            ),
        };

        let context = merge(passage, mcq);
        tracing::debug!(
            passage = context.count(Partition::Passage),
            mcq = context.count(Partition::Mcq),
            top_k,
            "retrieved context"
        );
        Ok(context)
    }

    fn or_empty(partition: Partition, hits: Result<Vec<PartitionHit>>) -> Vec<PartitionHit> {
        hits.unwrap_or_else(|e| {
            tracing::warn!(%partition, error = %e, "partition query failed, continuing without it");
            Vec::new()
        })
    }
}
