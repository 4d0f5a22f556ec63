//! The question answering pipeline.
//!
//! embed query → retrieve (both partitions) → render window → assemble
//! prompt → generate → evaluate.

use crate::config::Config;
use crate::conversation::{DEFAULT_WINDOW_TURNS, Session};
use crate::embedding::{self, Embedder};
use crate::error::{RagError, Result};
use crate::evaluator::{AnswerEvaluator, EvaluationResult};
use crate::index::{ChromaIndex, VectorIndex};
use crate::llm::{Generator, LlmClient};
use crate::prompt::{AnswerStyle, PromptAssembler};
use crate::retrieval::{RankedContext, RetrievalMerger};
use serde::Serialize;
use std::sync::Arc;

/// Neighbours requested per partition unless the caller says otherwise.
pub const DEFAULT_TOP_K: usize = 10;

/// Trim `query` and reject it when nothing is left.
pub fn validate_query(query: &str) -> Result<&str> {
    let trimmed = query.trim();
    if trimmed.is_empty() {
        Err(RagError::EmptyQuery)
    } else {
        Ok(trimmed)
    }
}

/// Reject a zero neighbour count, which would query nothing.
pub fn validate_top_k(top_k: usize) -> Result<usize> {
    if top_k == 0 {
        Err(RagError::Config("top_k must be at least 1".to_string()))
    } else {
        Ok(top_k)
    }
}

/// Everything one pipeline run produced.
#[derive(Debug, Clone, Serialize)]
pub struct AnswerReport {
    pub result: EvaluationResult,
    pub context: RankedContext,
    pub prompt: String,
}

/// Retrieval-augmented answering with post-hoc scoring.
#[derive(Clone)]
pub struct RagPipeline {
    query_embedder: Arc<dyn Embedder>,
    merger: RetrievalMerger,
    assembler: PromptAssembler,
    generator: Arc<dyn Generator>,
    evaluator: AnswerEvaluator,
    window_turns: usize,
}

impl RagPipeline {
    /// Wire the pipeline from its collaborators.
    ///
    /// `query_embedder` and `eval_embedder` are different embedding spaces
    /// and must not be the same model.
    pub fn new(
        query_embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
        generator: Arc<dyn Generator>,
        eval_embedder: Arc<dyn Embedder>,
    ) -> Self {
        Self {
            query_embedder,
            merger: RetrievalMerger::new(index),
            assembler: PromptAssembler::default(),
            generator,
            evaluator: AnswerEvaluator::new(eval_embedder),
            window_turns: DEFAULT_WINDOW_TURNS,
        }
    }

    /// Build every collaborator from validated configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;

        let query_embedder = embedding::from_config(&config.retrieval_embedder)?;
        let eval_embedder = embedding::from_config(&config.eval_embedder)?;
        let index: Arc<dyn VectorIndex> = Arc::new(ChromaIndex::new(config.index.clone()));
        let generator: Arc<dyn Generator> = Arc::new(LlmClient::new(config.llm.clone()));

        Ok(Self::new(query_embedder, index, generator, eval_embedder)
            .with_answer_style(config.retrieval.answer_style)
            .with_window_turns(config.retrieval.window_turns))
    }

    pub fn with_answer_style(mut self, style: AnswerStyle) -> Self {
        self.assembler = PromptAssembler::new(style);
        self
    }

    pub fn with_window_turns(mut self, window_turns: usize) -> Self {
        self.window_turns = window_turns;
        self
    }

    /// Answer `query` and score the answer. Reads `session` but never
    /// modifies it.
    pub async fn answer(
        &self,
        query: &str,
        session: &Session,
        top_k: usize,
    ) -> Result<EvaluationResult> {
        Ok(self.run(query, session, top_k).await?.result)
    }

    /// Like [`RagPipeline::answer`], also returning the context and prompt.
    pub async fn run(&self, query: &str, session: &Session, top_k: usize) -> Result<AnswerReport> {
        let query_vector = self.query_embedder.embed(query).await?;
        let context = self.merger.retrieve(&query_vector, top_k).await?;

        let window_text = session.window_text(self.window_turns).await;
        let prompt = self.assembler.assemble(&context, &window_text, query);
        tracing::debug!(
            context_items = context.len(),
            prompt_chars = prompt.chars().count(),
            "prompt assembled"
        );

        let answer = self.generator.generate(&prompt).await?;
        let result = self.evaluator.evaluate(&answer, &context, query).await;

        Ok(AnswerReport {
            result,
            context,
            prompt,
        })
    }

    /// One conversational exchange: validate, record the user turn, answer,
    /// record the assistant turn.
    ///
    /// Exchanges on one session run one at a time, so each user turn is
    /// directly followed by its own answer. On failure the user turn stays
    /// recorded and no assistant turn is added.
    pub async fn converse(
        &self,
        query: &str,
        session: &Session,
        top_k: usize,
    ) -> Result<EvaluationResult> {
        let query = validate_query(query)?;
        let _exchange = session.begin_exchange().await;
        session.push_user(query).await;
        let result = self.answer(query, session, top_k).await?;
        session.push_assistant(result.answer.clone()).await;
        Ok(result)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::conversation::{Role, Turn};
    use crate::index::{Partition, PartitionHit};
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Fixed-vector stub standing in for the retrieval model.
    pub(crate) struct FixedEmbedder(pub Vec<f32>);

    #[async_trait]
    impl Embedder for FixedEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Ok(self.0.clone())
        }
    }

    /// Vector depends only on whether the text contains "উত্তর"
    /// or the question word, so scores are predictable.
    pub(crate) struct KeywordEmbedder;

    #[async_trait]
    impl Embedder for KeywordEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            Ok(vec![
                if text.contains("উত্তর") { 1.0 } else { 0.0 },
                if text.contains("কে") { 1.0 } else { 0.0 },
                1.0,
            ])
        }
    }

    pub(crate) struct CannedIndex;

    #[async_trait]
    impl VectorIndex for CannedIndex {
        async fn query(
            &self,
            partition: Partition,
            _query_vector: &[f32],
            top_k: usize,
        ) -> Result<Vec<PartitionHit>> {
            let hits = match partition {
                Partition::Passage => vec![
                    PartitionHit::new("passage-0.10 ", 0.10),
                    PartitionHit::new("passage-0.25 ", 0.25),
                ],
                Partition::Mcq => vec![PartitionHit::new("mcq-0.15 উত্তর ", 0.15)],
            };
            Ok(hits.into_iter().take(top_k).collect())
        }
    }

    /// Records every prompt and answers with a fixed string.
    pub(crate) struct StubGenerator {
        pub answer: String,
        pub prompts: Mutex<Vec<String>>,
    }

    impl StubGenerator {
        pub(crate) fn new(answer: &str) -> Arc<Self> {
            Arc::new(Self {
                answer: answer.to_string(),
                prompts: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl Generator for StubGenerator {
        async fn generate(&self, prompt: &str) -> Result<String> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            Ok(self.answer.clone())
        }
    }

    /// Slow for question "A", fast for anything else, so unguarded
    /// exchanges would finish out of order.
    struct DelayingGenerator {
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Generator for DelayingGenerator {
        async fn generate(&self, prompt: &str) -> Result<String> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            if prompt.contains("❓ Question: A\n") {
                tokio::time::sleep(std::time::Duration::from_millis(50)).await;
                Ok("ansA".to_string())
            } else {
                tokio::time::sleep(std::time::Duration::from_millis(5)).await;
                Ok("ansB".to_string())
            }
        }
    }

    struct FailingGenerator;

    #[async_trait]
    impl Generator for FailingGenerator {
        async fn generate(&self, _prompt: &str) -> Result<String> {
            Err(RagError::LlmApi("quota exceeded".to_string()))
        }
    }

    struct DownIndex;

    #[async_trait]
    impl VectorIndex for DownIndex {
        async fn query(&self, _: Partition, _: &[f32], _: usize) -> Result<Vec<PartitionHit>> {
            Err(RagError::Index("connection refused".to_string()))
        }
    }

    pub(crate) fn pipeline(generator: Arc<dyn Generator>) -> RagPipeline {
        RagPipeline::new(
            Arc::new(FixedEmbedder(vec![0.1, 0.2])),
            Arc::new(CannedIndex),
            generator,
            Arc::new(KeywordEmbedder),
        )
    }

    #[test]
    fn test_validate_query() {
        assert_eq!(validate_query("  প্রশ্ন \n").unwrap(), "প্রশ্ন");
        assert!(matches!(validate_query("   "), Err(RagError::EmptyQuery)));
        assert!(matches!(validate_query(""), Err(RagError::EmptyQuery)));
    }

    #[tokio::test]
    async fn test_end_to_end_scenario() {
        let generator = StubGenerator::new("উত্তর");
        let pipeline = pipeline(generator.clone());
        let session = Session::new();

        let report = pipeline.run("কে?", &session, DEFAULT_TOP_K).await.unwrap();

        let order: Vec<(Partition, f32)> = report
            .context
            .items()
            .iter()
            .map(|i| (i.partition, i.distance))
            .collect();
        assert_eq!(
            order,
            vec![
                (Partition::Passage, 0.10),
                (Partition::Mcq, 0.15),
                (Partition::Passage, 0.25),
            ]
        );

        let prompt = &generator.prompts.lock().unwrap()[0];
        assert_eq!(prompt, &report.prompt);
        let joined = "passage-0.10 mcq-0.15 উত্তর passage-0.25 ";
        let ctx_at = prompt.find(joined).expect("contexts concatenated in ranked order");
        let question_at = prompt.find("❓ Question: কে?").unwrap();
        assert!(ctx_at < question_at);

        // answer [1,0,1], context [1,0,1], query [0,1,1]
        assert_eq!(report.result.answer, "উত্তর");
        assert_eq!(report.result.groundedness, 1.0);
        assert_eq!(report.result.relevance, 0.5);
    }

    #[tokio::test]
    async fn test_answer_does_not_touch_session() {
        let pipeline = pipeline(StubGenerator::new("উত্তর"));
        let session = Session::new();
        session.push_user("আগের প্রশ্ন").await;

        pipeline.answer("কে?", &session, 3).await.unwrap();

        assert_eq!(session.snapshot().await, vec![Turn::user("আগের প্রশ্ন")]);
    }

    #[tokio::test]
    async fn test_window_is_rendered_into_prompt() {
        let generator = StubGenerator::new("উত্তর");
        let pipeline = pipeline(generator.clone()).with_window_turns(2);
        let session = Session::new();
        for turn in ["এক", "দুই", "তিন"] {
            session.push_user(turn).await;
        }

        pipeline.answer("কে?", &session, 3).await.unwrap();

        let prompt = &generator.prompts.lock().unwrap()[0];
        assert!(prompt.contains("💬 Short-Term Chat History:\nUser: দুই\nUser: তিন\n"));
        assert!(!prompt.contains("User: এক"));
    }

    #[tokio::test]
    async fn test_converse_records_both_turns() {
        let pipeline = pipeline(StubGenerator::new("উত্তর"));
        let session = Session::new();

        let result = pipeline.converse("  কে?  ", &session, 10).await.unwrap();

        assert_eq!(result.answer, "উত্তর");
        let turns = session.snapshot().await;
        assert_eq!(turns, vec![Turn::user("কে?"), Turn::assistant("উত্তর")]);
    }

    #[tokio::test]
    async fn test_converse_includes_current_question_in_window() {
        let generator = StubGenerator::new("উত্তর");
        let pipeline = pipeline(generator.clone());
        let session = Session::new();

        pipeline.converse("কে?", &session, 10).await.unwrap();

        let prompt = &generator.prompts.lock().unwrap()[0];
        assert!(prompt.contains("User: কে?\n"));
    }

    #[tokio::test]
    async fn test_converse_rejects_empty_query() {
        let generator = StubGenerator::new("উত্তর");
        let pipeline = pipeline(generator.clone());
        let session = Session::new();

        let result = pipeline.converse("   ", &session, 10).await;

        assert!(matches!(result, Err(RagError::EmptyQuery)));
        assert!(session.is_empty().await);
        assert!(generator.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_exchanges_do_not_interleave() {
        let generator = Arc::new(DelayingGenerator {
            prompts: Mutex::new(Vec::new()),
        });
        let pipeline = pipeline(generator.clone());
        let session = Session::new();

        let (a, b) = tokio::join!(
            pipeline.converse("A", &session, 10),
            pipeline.converse("B", &session, 10),
        );
        assert_eq!(a.unwrap().answer, "ansA");
        assert_eq!(b.unwrap().answer, "ansB");

        assert_eq!(
            session.snapshot().await,
            vec![
                Turn::user("A"),
                Turn::assistant("ansA"),
                Turn::user("B"),
                Turn::assistant("ansB"),
            ]
        );

        let prompts = generator.prompts.lock().unwrap();
        assert!(!prompts[0].contains("User: B"));
        assert!(prompts[1].contains("User: A\nAssistant: ansA\nUser: B\n"));
    }

    #[test]
    fn test_validate_top_k() {
        assert_eq!(validate_top_k(3).unwrap(), 3);
        assert!(matches!(validate_top_k(0), Err(RagError::Config(_))));
    }

    #[tokio::test]
    async fn test_generation_failure_propagates() {
        let pipeline = pipeline(Arc::new(FailingGenerator));
        let session = Session::new();

        let result = pipeline.converse("কে?", &session, 10).await;

        assert!(matches!(result, Err(RagError::LlmApi(_))));
        let turns = session.snapshot().await;
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].role, Role::User);
    }

    #[tokio::test]
    async fn test_index_unavailable_propagates() {
        let pipeline = RagPipeline::new(
            Arc::new(FixedEmbedder(vec![1.0])),
            Arc::new(DownIndex),
            StubGenerator::new("উত্তর"),
            Arc::new(KeywordEmbedder),
        );
        let result = pipeline.answer("কে?", &Session::new(), 10).await;
        assert!(matches!(result, Err(RagError::IndexUnavailable(_))));
    }

    #[tokio::test]
    async fn test_brief_style_reaches_prompt() {
        let generator = StubGenerator::new("উত্তর");
        let pipeline = pipeline(generator.clone()).with_answer_style(AnswerStyle::Brief);

        pipeline.answer("কে?", &Session::new(), 10).await.unwrap();

        let prompt = &generator.prompts.lock().unwrap()[0];
        assert!(prompt.ends_with("Answer in one or two Bengali words:"));
    }

    #[test]
    fn test_from_config_requires_valid_config() {
        assert!(matches!(
            RagPipeline::from_config(&Config::default()),
            Err(RagError::Config(_))
        ));
    }
}
