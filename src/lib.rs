//! Bengali question answering over a dual-partition knowledge base.
//!
//! The knowledge base is one vector collection split into narrative
//! passages and MCQ-derived facts. Each question is embedded once, both
//! partitions are queried, and the hits are ranked together by distance.
//! The ranked context, a short window of the conversation and the question
//! form the prompt; the generated answer is then scored for groundedness
//! and relevance in a second, independent embedding space.
//!
//! # Quick Start
//!
//! ```no_run
//! use bengali_rag_qa::{Config, RagPipeline, Session};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load(None)?;
//!     let pipeline = RagPipeline::from_config(&config)?;
//!
//!     let session = Session::new();
//!     let result = pipeline
//!         .converse("অনুপমের ভাষায় সুপুরুষ কাকে বলা হয়েছে?", &session, config.retrieval.top_k)
//!         .await?;
//!
//!     println!("{} (groundedness {:.2})", result.answer, result.groundedness);
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - **Embedder**: text to vector, one instance per embedding space
//! - **VectorIndex**: partition-filtered nearest-neighbour queries
//! - **RetrievalMerger**: queries both partitions and ranks the union
//! - **Session**: short-term conversation memory
//! - **PromptAssembler**: deterministic prompt layout
//! - **Generator**: single-turn LLM completion
//! - **AnswerEvaluator**: post-hoc groundedness and relevance scores

pub mod cleaner;
pub mod config;
pub mod conversation;
pub mod embedding;
pub mod error;
pub mod evaluator;
pub mod index;
pub mod llm;
pub mod pipeline;
pub mod prompt;
pub mod retrieval;
pub mod server;

// Re-export commonly used types
pub use config::Config;
pub use conversation::{Session, Turn};
pub use embedding::Embedder;
pub use error::{RagError, Result};
pub use evaluator::{AnswerEvaluator, EvaluationResult};
pub use index::{Partition, PartitionHit, VectorIndex};
pub use llm::{Generator, LlmClient};
pub use pipeline::{AnswerReport, RagPipeline};
pub use prompt::{AnswerStyle, PromptAssembler};
pub use retrieval::{RankedContext, RetrievalMerger, RetrievedItem};
