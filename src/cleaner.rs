//! LLM-assisted cleanup of OCR-extracted Bengali text before ingestion.
//!
//! MCQ blocks are rewritten as declarative facts that contain the correct
//! answer; passages are only tidied.

use crate::config::LlmConfig;
use crate::error::{RagError, Result};
use crate::llm::{Generator, LlmClient, Prompts};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Sampling temperature for cleanup.
pub const CLEANING_TEMPERATURE: f32 = 0.1;

/// Output file for cleaned passages.
pub const PASSAGE_OUTPUT: &str = "section1.txt";

/// Output file for MCQ-derived facts.
pub const MCQ_OUTPUT: &str = "section2.txt";

/// Paths written by [`TextCleaner::clean_files`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanedFiles {
    pub passage: PathBuf,
    pub mcq: PathBuf,
}

pub struct TextCleaner {
    generator: Arc<dyn Generator>,
}

impl TextCleaner {
    pub fn new(generator: Arc<dyn Generator>) -> Self {
        Self { generator }
    }

    /// Cleaner backed by the configured LLM at [`CLEANING_TEMPERATURE`].
    pub fn from_config(config: &LlmConfig) -> Self {
        let client = LlmClient::new(config.clone()).with_temperature(CLEANING_TEMPERATURE);
        Self::new(Arc::new(client))
    }

    /// Clean one block of raw text.
    pub async fn clean(&self, raw: &str) -> Result<String> {
        let prompt = Prompts::bangla_text_cleaner().replace("{text}", raw);
        let cleaned = self.generator.generate(&prompt).await?;
        tracing::debug!(
            input_chars = raw.chars().count(),
            output_chars = cleaned.chars().count(),
            "text cleaned"
        );
        Ok(cleaned)
    }

    /// Clean the passage and MCQ sources, writing them into `out_dir`.
    pub async fn clean_files(
        &self,
        passage_in: &Path,
        mcq_in: &Path,
        out_dir: &Path,
    ) -> Result<CleanedFiles> {
        let passage_raw =
            fs::read_to_string(passage_in).map_err(|e| RagError::io(passage_in, e))?;
        let mcq_raw = fs::read_to_string(mcq_in).map_err(|e| RagError::io(mcq_in, e))?;

        let passage = self.clean(&passage_raw).await?;
        let mcq = self.clean(&mcq_raw).await?;

        fs::create_dir_all(out_dir).map_err(|e| RagError::io(out_dir, e))?;

        let files = CleanedFiles {
            passage: out_dir.join(PASSAGE_OUTPUT),
            mcq: out_dir.join(MCQ_OUTPUT),
        };
        fs::write(&files.passage, passage).map_err(|e| RagError::io(&files.passage, e))?;
        fs::write(&files.mcq, mcq).map_err(|e| RagError::io(&files.mcq, e))?;

        tracing::info!(out_dir = %out_dir.display(), "cleaned text written");
        Ok(files)
    }
}
