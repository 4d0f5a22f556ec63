//! Embedding spaces.
//!
//! The pipeline holds two [`Embedder`] instances: one for the query vector
//! sent to the index, one for scoring answers. They share this trait but are
//! always built from separate configuration sections.

#[cfg(feature = "local-embeddings")]
mod local;
mod remote;

#[cfg(feature = "local-embeddings")]
pub use local::LocalEmbedder;
pub use remote::HttpEmbedder;

use crate::config::{EmbedderBackend, EmbedderConfig};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Converts text to a fixed-length vector.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

/// Build an embedder for one configuration section.
pub fn from_config(config: &EmbedderConfig) -> Result<Arc<dyn Embedder>> {
    match config.backend {
        EmbedderBackend::Remote => Ok(Arc::new(HttpEmbedder::new(config.clone()))),
        #[cfg(feature = "local-embeddings")]
        EmbedderBackend::Local => Ok(Arc::new(LocalEmbedder::load(&config.model)?)),
        #[cfg(not(feature = "local-embeddings"))]
        EmbedderBackend::Local => Err(crate::error::RagError::Config(format!(
            "model '{}' needs the local backend; rebuild with --features local-embeddings",
            config.model
        ))),
    }
}

/// Compute cosine similarity between two vectors.
///
/// Mismatched lengths and zero-norm vectors score 0.0. The result is clamped
/// to [-1, 1] so floating point drift never leaks out of range.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    let similarity = dot / (norm_a * norm_b);
    if similarity.is_nan() {
        0.0
    } else {
        similarity.clamp(-1.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    #[cfg(not(feature = "local-embeddings"))]
    use crate::error::RagError;

    #[test]
    fn test_cosine_similarity() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 1e-6);

        let c = vec![0.0, 1.0, 0.0];
        assert!(cosine_similarity(&a, &c).abs() < 1e-6);

        let d = vec![-2.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &d) + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_degenerate_inputs() {
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 2.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 2.0]), 0.0);
        assert_eq!(cosine_similarity(&[f32::NAN, 1.0], &[1.0, 1.0]), 0.0);
    }

    #[test]
    fn test_cosine_stays_in_range() {
        let a = [0.3_f32, 0.7, 1e-3, 42.0];
        let b = [0.3_f32, 0.7, 1e-3, 42.0];
        let s = cosine_similarity(&a, &b);
        assert!((-1.0..=1.0).contains(&s));
    }

    #[cfg(not(feature = "local-embeddings"))]
    #[test]
    fn test_local_backend_requires_feature() {
        let config = EmbedderConfig {
            backend: EmbedderBackend::Local,
            api_base: String::new(),
            api_key: String::new(),
            model: "some/model".to_string(),
        };
        assert!(matches!(from_config(&config), Err(RagError::Config(_))));
    }
}
