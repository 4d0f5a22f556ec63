//! Configuration for the question answering service.
//!
//! Supports both environment variables and YAML config file.
//! Environment variables take precedence over config file values.

use crate::error::{RagError, Result};
use crate::prompt::AnswerStyle;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

/// Default retrieval-space model, tuned for matching Bengali questions to passages.
pub const DEFAULT_RETRIEVAL_MODEL: &str = "l3cube-pune/bengali-sentence-similarity-sbert";

/// Default evaluation-space model, a general multilingual similarity model.
pub const DEFAULT_EVAL_MODEL: &str = "sentence-transformers/paraphrase-multilingual-MiniLM-L12-v2";

/// LLM configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Base URL for an OpenAI-compatible API
    /// (e.g., "https://generativelanguage.googleapis.com/v1beta/openai")
    pub api_base: String,

    /// API key for authentication
    pub api_key: String,

    /// Model name (e.g., "gemini-2.5-flash")
    pub model: String,

    /// Maximum tokens for response (optional)
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Temperature for generation (optional)
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

fn default_max_tokens() -> u32 {
    4096
}

fn default_temperature() -> f32 {
    0.7
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_base: String::new(),
            api_key: String::new(),
            model: "gemini-2.5-flash".to_string(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
        }
    }
}

/// Where an embedder runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EmbedderBackend {
    /// OpenAI-compatible `/v1/embeddings` endpoint.
    #[default]
    Remote,
    /// In-process candle model (requires the `local-embeddings` feature).
    Local,
}

/// Settings for one embedding space.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbedderConfig {
    #[serde(default)]
    pub backend: EmbedderBackend,
    /// Base URL of the embedding API (remote backend only).
    #[serde(default)]
    pub api_base: String,
    /// API key, sent as a bearer token when non-empty.
    #[serde(default)]
    pub api_key: String,
    /// Model identifier (Hugging Face id for the local backend).
    pub model: String,
}

impl EmbedderConfig {
    fn with_model(model: &str) -> Self {
        Self {
            backend: EmbedderBackend::Remote,
            api_base: String::new(),
            api_key: String::new(),
            model: model.to_string(),
        }
    }
}

/// Chroma-compatible vector index location.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    pub url: String,
    pub collection: String,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8000".to_string(),
            collection: "qa_collection".to_string(),
        }
    }
}

/// Retrieval and prompt settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Neighbours requested from each partition.
    pub top_k: usize,
    /// Number of recent turns rendered into the prompt.
    pub window_turns: usize,
    pub answer_style: AnswerStyle,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 10,
            window_turns: crate::conversation::DEFAULT_WINDOW_TURNS,
            answer_style: AnswerStyle::default(),
        }
    }
}

/// HTTP server bind address.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

/// Full application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// LLM settings
    pub llm: LlmConfig,
    /// Embedder used for the query vector sent to the index
    pub retrieval_embedder: EmbedderConfig,
    /// Embedder used only for scoring answers
    pub eval_embedder: EmbedderConfig,
    pub index: IndexConfig,
    pub retrieval: RetrievalConfig,
    pub server: ServerConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            llm: LlmConfig::default(),
            retrieval_embedder: EmbedderConfig::with_model(DEFAULT_RETRIEVAL_MODEL),
            eval_embedder: EmbedderConfig::with_model(DEFAULT_EVAL_MODEL),
            index: IndexConfig::default(),
            retrieval: RetrievalConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

/// Configuration file structure (YAML format).
#[derive(Debug, Deserialize)]
struct ConfigFile {
    llm: Option<LlmFileSection>,
    retrieval_embedder: Option<EmbedderFileSection>,
    eval_embedder: Option<EmbedderFileSection>,
    index: Option<IndexFileSection>,
    retrieval: Option<RetrievalFileSection>,
    server: Option<ServerFileSection>,
}

#[derive(Debug, Deserialize)]
struct LlmFileSection {
    api_base: Option<String>,
    api_key: Option<String>,
    model: Option<String>,
    max_tokens: Option<u32>,
    temperature: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct EmbedderFileSection {
    backend: Option<EmbedderBackend>,
    api_base: Option<String>,
    api_key: Option<String>,
    model: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IndexFileSection {
    url: Option<String>,
    collection: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RetrievalFileSection {
    top_k: Option<usize>,
    window_turns: Option<usize>,
    answer_style: Option<AnswerStyle>,
}

#[derive(Debug, Deserialize)]
struct ServerFileSection {
    host: Option<String>,
    port: Option<u16>,
}

impl EmbedderFileSection {
    fn merge_into(self, target: &mut EmbedderConfig) {
        if let Some(backend) = self.backend {
            target.backend = backend;
        }
        if let Some(api_base) = self.api_base {
            target.api_base = api_base;
        }
        if let Some(api_key) = self.api_key {
            target.api_key = api_key;
        }
        if let Some(model) = self.model {
            target.model = model;
        }
    }
}

impl Config {
    /// Load configuration from environment variables and optional config file.
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables (LLM_API_BASE, LLM_API_KEY, CHROMA_URL, ...)
    /// 2. Config file (`path`, or ~/.config/bengali-rag-qa/config.yaml)
    /// 3. Default values
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(explicit) => Self::load_from_file(explicit)?,
            None => match Self::config_file_path() {
                Some(default_path) if default_path.exists() => {
                    Self::load_from_file(&default_path)?
                }
                _ => Config::default(),
            },
        };

        config.apply_overrides(|key| env::var(key).ok());

        Ok(config)
    }

    /// Apply overrides from a key lookup (the process environment in [`Config::load`]).
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(api_base) = lookup("LLM_API_BASE") {
            self.llm.api_base = api_base;
        }
        if let Some(api_key) = lookup("LLM_API_KEY") {
            self.llm.api_key = api_key;
        }
        if let Some(model) = lookup("LLM_MODEL") {
            self.llm.model = model;
        }
        if let Some(tokens) = lookup("LLM_MAX_TOKENS").and_then(|v| v.parse().ok()) {
            self.llm.max_tokens = tokens;
        }
        if let Some(temp) = lookup("LLM_TEMPERATURE").and_then(|v| v.parse().ok()) {
            self.llm.temperature = temp;
        }

        // One embedding endpoint usually serves both models.
        if let Some(api_base) = lookup("EMBED_API_BASE") {
            self.retrieval_embedder.api_base = api_base.clone();
            self.eval_embedder.api_base = api_base;
        }
        if let Some(api_key) = lookup("EMBED_API_KEY") {
            self.retrieval_embedder.api_key = api_key.clone();
            self.eval_embedder.api_key = api_key;
        }
        if let Some(model) = lookup("RETRIEVAL_EMBED_MODEL") {
            self.retrieval_embedder.model = model;
        }
        if let Some(model) = lookup("EVAL_EMBED_MODEL") {
            self.eval_embedder.model = model;
        }

        if let Some(url) = lookup("CHROMA_URL") {
            self.index.url = url;
        }
        if let Some(collection) = lookup("CHROMA_COLLECTION") {
            self.index.collection = collection;
        }

        if let Some(top_k) = lookup("RAG_TOP_K").and_then(|v| v.parse().ok()) {
            self.retrieval.top_k = top_k;
        }
        if let Some(style) = lookup("RAG_ANSWER_STYLE").and_then(|v| AnswerStyle::parse(&v)) {
            self.retrieval.answer_style = style;
        }

        if let Some(host) = lookup("RAG_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("RAG_PORT").and_then(|v| v.parse().ok()) {
            self.server.port = port;
        }
    }

    /// Load configuration from a specific file path.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| RagError::io(path, e))?;
        Self::from_yaml(&content)
    }

    /// Parse a YAML document on top of the defaults.
    pub fn from_yaml(content: &str) -> Result<Self> {
        let file_config: ConfigFile = serde_yaml::from_str(content)
            .map_err(|e| RagError::Config(format!("Failed to parse config file: {}", e)))?;

        let mut config = Config::default();

        if let Some(llm) = file_config.llm {
            if let Some(api_base) = llm.api_base {
                config.llm.api_base = api_base;
            }
            if let Some(api_key) = llm.api_key {
                config.llm.api_key = api_key;
            }
            if let Some(model) = llm.model {
                config.llm.model = model;
            }
            if let Some(max_tokens) = llm.max_tokens {
                config.llm.max_tokens = max_tokens;
            }
            if let Some(temperature) = llm.temperature {
                config.llm.temperature = temperature;
            }
        }

        if let Some(section) = file_config.retrieval_embedder {
            section.merge_into(&mut config.retrieval_embedder);
        }
        if let Some(section) = file_config.eval_embedder {
            section.merge_into(&mut config.eval_embedder);
        }

        if let Some(index) = file_config.index {
            if let Some(url) = index.url {
                config.index.url = url;
            }
            if let Some(collection) = index.collection {
                config.index.collection = collection;
            }
        }

        if let Some(retrieval) = file_config.retrieval {
            if let Some(top_k) = retrieval.top_k {
                config.retrieval.top_k = top_k;
            }
            if let Some(window_turns) = retrieval.window_turns {
                config.retrieval.window_turns = window_turns;
            }
            if let Some(style) = retrieval.answer_style {
                config.retrieval.answer_style = style;
            }
        }

        if let Some(server) = file_config.server {
            if let Some(host) = server.host {
                config.server.host = host;
            }
            if let Some(port) = server.port {
                config.server.port = port;
            }
        }

        Ok(config)
    }

    /// Get the default config file path.
    pub fn config_file_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "bengali-rag-qa")
            .map(|dirs| dirs.config_dir().join("config.yaml"))
    }

    /// Validate that required configuration is present.
    pub fn validate(&self) -> Result<()> {
        if self.llm.api_base.is_empty() {
            return Err(RagError::Config(
                "LLM API base URL is required. Set LLM_API_BASE environment variable or add to config file.".to_string()
            ));
        }

        if self.llm.api_key.is_empty() {
            return Err(RagError::Config(
                "LLM API key is required. Set LLM_API_KEY environment variable or add to config file.".to_string()
            ));
        }

        if self.llm.model.is_empty() {
            return Err(RagError::Config(
                "LLM model is required. Set LLM_MODEL environment variable or add to config file."
                    .to_string(),
            ));
        }

        Self::validate_embedder("retrieval_embedder", &self.retrieval_embedder)?;
        Self::validate_embedder("eval_embedder", &self.eval_embedder)?;

        if self.retrieval_embedder.model == self.eval_embedder.model {
            return Err(RagError::Config(format!(
                "Retrieval and evaluation embedders must use different models (both are '{}')",
                self.eval_embedder.model
            )));
        }

        if self.index.url.is_empty() || self.index.collection.is_empty() {
            return Err(RagError::Config(
                "Index URL and collection are required. Set CHROMA_URL / CHROMA_COLLECTION or add to config file.".to_string()
            ));
        }

        if self.retrieval.top_k == 0 {
            return Err(RagError::Config("retrieval.top_k must be at least 1".to_string()));
        }

        if self.retrieval.window_turns == 0 {
            return Err(RagError::Config(
                "retrieval.window_turns must be at least 1".to_string(),
            ));
        }

        Ok(())
    }

    fn validate_embedder(section: &str, embedder: &EmbedderConfig) -> Result<()> {
        if embedder.model.is_empty() {
            return Err(RagError::Config(format!("{section}.model is required")));
        }

        match embedder.backend {
            EmbedderBackend::Remote if embedder.api_base.is_empty() => Err(RagError::Config(
                format!(
                    "{section}.api_base is required for the remote backend. Set EMBED_API_BASE or add to config file."
                ),
            )),
            EmbedderBackend::Local if !cfg!(feature = "local-embeddings") => {
                Err(RagError::Config(format!(
                    "{section} uses the local backend, but this build lacks the 'local-embeddings' feature"
                )))
            }
            _ => Ok(()),
        }
    }

    /// Create a config from explicit values (useful for testing).
    pub fn with_llm(
        api_base: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            llm: LlmConfig {
                api_base: api_base.into(),
                api_key: api_key.into(),
                model: model.into(),
                ..Default::default()
            },
            ..Default::default()
        }
    }
}
