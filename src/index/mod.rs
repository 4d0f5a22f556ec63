//! Partitioned vector index.
//!
//! The knowledge base is one collection split by a `source` metadata field
//! into narrative passages and MCQ-derived facts. The core only queries it.

mod chroma;

pub use chroma::ChromaIndex;

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Logical partition of the knowledge base.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Partition {
    Passage,
    Mcq,
}

impl Partition {
    /// Value of the `source` metadata field.
    pub fn as_str(&self) -> &'static str {
        match self {
            Partition::Passage => "passage",
            Partition::Mcq => "mcq",
        }
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One nearest-neighbour hit inside a partition.
#[derive(Debug, Clone, PartialEq)]
pub struct PartitionHit {
    pub text: String,
    /// Lower is more similar.
    pub distance: f32,
}

impl PartitionHit {
    pub fn new(text: impl Into<String>, distance: f32) -> Self {
        Self {
            text: text.into(),
            distance,
        }
    }
}

/// Read-only access to the partitioned index.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Return up to `top_k` hits nearest to `query_vector` within `partition`.
    async fn query(
        &self,
        partition: Partition,
        query_vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<PartitionHit>>;
}
