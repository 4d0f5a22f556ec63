//! Answer prompt assembly.

use crate::llm::Prompts;
use crate::retrieval::RankedContext;
use serde::{Deserialize, Serialize};

/// How long the requested answer should be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AnswerStyle {
    /// Free-form Bengali answer.
    #[default]
    Full,
    /// One or two Bengali words, for quiz-style questions.
    Brief,
}

impl AnswerStyle {
    /// Parse a case-insensitive style name.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "full" => Some(AnswerStyle::Full),
            "brief" => Some(AnswerStyle::Brief),
            _ => None,
        }
    }

    fn instruction(&self) -> &'static str {
        match self {
            AnswerStyle::Full => Prompts::answer_full(),
            AnswerStyle::Brief => Prompts::answer_brief(),
        }
    }
}

/// Builds the generation prompt from context, history and question.
#[derive(Debug, Clone, Copy, Default)]
pub struct PromptAssembler {
    style: AnswerStyle,
}

impl PromptAssembler {
    pub fn new(style: AnswerStyle) -> Self {
        Self { style }
    }

    pub fn style(&self) -> AnswerStyle {
        self.style
    }

    /// Assemble the prompt.
    ///
    /// Context texts are concatenated as-is in ranked order; nothing is
    /// truncated, filtered or deduplicated.
    pub fn assemble(&self, context: &RankedContext, window_text: &str, query: &str) -> String {
        let mut prompt = String::new();
        prompt.push_str(Prompts::answer_preamble());
        prompt.push_str(Prompts::context_heading());
        for text in context.texts() {
            prompt.push_str(text);
        }
        prompt.push_str("\n\n");
        prompt.push_str(Prompts::history_heading());
        prompt.push_str(window_text);
        prompt.push_str(Prompts::question_label());
        prompt.push_str(query);
        prompt.push('\n');
        prompt.push_str(self.style.instruction());
        prompt
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::PartitionHit;
    use crate::retrieval::merge;

    fn context() -> RankedContext {
        merge(
            vec![PartitionHit::new("অনুচ্ছেদ এক। ", 0.1), PartitionHit::new("অনুচ্ছেদ দুই। ", 0.3)],
            vec![PartitionHit::new("কথকের নাম অনুপম। ", 0.2)],
        )
    }

    #[test]
    fn test_assemble_exact_layout() {
        let prompt = PromptAssembler::default().assemble(&context(), "User: আগে\n", "কথক কে?");
        let expected = "You are a helpful assistant. Use the following long-term context and chat history to answer the question.\n\n\
📚 Long-Term Context (MCQ + Passage):\n\
অনুচ্ছেদ এক। কথকের নাম অনুপম। অনুচ্ছেদ দুই। \n\n\
💬 Short-Term Chat History:\n\
User: আগে\n\
\n❓ Question: কথক কে?\n\
Answer in Bengali:";
        assert_eq!(prompt, expected);
    }

    #[test]
    fn test_assemble_is_deterministic() {
        let assembler = PromptAssembler::new(AnswerStyle::Brief);
        let ctx = context();
        let first = assembler.assemble(&ctx, "User: x\n", "প্রশ্ন");
        let second = assembler.assemble(&ctx, "User: x\n", "প্রশ্ন");
        assert_eq!(first.as_bytes(), second.as_bytes());
        assert!(first.ends_with("Answer in one or two Bengali words:"));
    }

    #[test]
    fn test_assemble_section_order() {
        let prompt = PromptAssembler::default().assemble(&context(), "User: ইতিহাস\n", "শেষ প্রশ্ন");
        let preamble = prompt.find("You are a helpful assistant").unwrap();
        let ctx = prompt.find("অনুচ্ছেদ এক").unwrap();
        let window = prompt.find("User: ইতিহাস").unwrap();
        let question = prompt.find("শেষ প্রশ্ন").unwrap();
        assert!(preamble < ctx && ctx < window && window < question);
    }

    #[test]
    fn test_assemble_keeps_placeholder_like_text() {
        let ctx = merge(vec![PartitionHit::new("{query} {window}", 0.1)], Vec::new());
        let prompt = PromptAssembler::default().assemble(&ctx, "", "আসল প্রশ্ন");
        assert!(prompt.contains("{query} {window}"));
        assert_eq!(prompt.matches("আসল প্রশ্ন").count(), 1);
    }

    #[test]
    fn test_assemble_keeps_duplicate_context() {
        let ctx = merge(
            vec![PartitionHit::new("একই", 0.1)],
            vec![PartitionHit::new("একই", 0.1)],
        );
        let prompt = PromptAssembler::default().assemble(&ctx, "", "q");
        assert!(prompt.contains("একইএকই"));
    }

    #[test]
    fn test_answer_style_parse() {
        assert_eq!(AnswerStyle::parse("BRIEF"), Some(AnswerStyle::Brief));
        assert_eq!(AnswerStyle::parse(" full "), Some(AnswerStyle::Full));
        assert_eq!(AnswerStyle::parse("long"), None);
    }
}
