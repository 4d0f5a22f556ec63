//! Fixed prompt texts.
//!
//! The answer template is split into pieces so the assembler can join them
//! in order without placeholder substitution: retrieved text that happens to
//! contain `{query}` must pass through untouched.

/// Collection of prompt texts used for answering and text cleaning.
pub struct Prompts;

impl Prompts {
    /// Opening instruction of the answer prompt.
    pub fn answer_preamble() -> &'static str {
        "You are a helpful assistant. Use the following long-term context and chat history to answer the question.\n\n"
    }

    /// Heading placed before the concatenated retrieved context.
    pub fn context_heading() -> &'static str {
        "📚 Long-Term Context (MCQ + Passage):\n"
    }

    /// Heading placed before the rendered conversation window.
    pub fn history_heading() -> &'static str {
        "💬 Short-Term Chat History:\n"
    }

    /// Label placed before the verbatim question.
    pub fn question_label() -> &'static str {
        "\n❓ Question: "
    }

    /// Closing instruction asking for a full Bengali answer.
    pub fn answer_full() -> &'static str {
        "Answer in Bengali:"
    }

    /// Closing instruction asking for a one or two word Bengali answer.
    pub fn answer_brief() -> &'static str {
        "Answer in one or two Bengali words:"
    }

    /// Prompt that turns OCR-extracted Bengali text into embedding-ready text.
    ///
    /// MCQ blocks become declarative sentences that contain the correct
    /// answer; passages are only tidied. `{text}` is replaced with the input.
    pub fn bangla_text_cleaner() -> &'static str {
        r#"You are a highly intelligent Bangla text processor. The following OCR-extracted content may contain:

1. Multiple-choice questions (MCQs) with options.
2. Descriptive or passage-based text.

Your goal is to:
- Detect and extract each MCQ block, where an MCQ block contains:
    • A question line
    • Four options (usually labeled ক, খ, গ, ঘ)
    • The correct answer either:
        (i) Inline using "সঠিক উত্তর: ক" or
        (ii) At the end of all questions in the format: "১. ক ২. গ ৩. খ..."

For each MCQ:
- Identify the correct answer based on the answer key or inline label.
- Convert the MCQ into a clean declarative Bangla sentence that **includes the correct answer naturally.**
- Do NOT include question numbers, option letters (ক, খ...), or the labels like "সঠিক উত্তর" in the final output.

- Example:
    Input:
    প্রশ্ন: 'অপরিচিতা' গল্পের কথকের নাম কী?
    (ক) অনুপম
    (খ) কল্যাণী
    (গ) শম্ভুনাথ
    (ঘ) হরিশ
    সঠিক উত্তর: ক
    Output:
    'অপরিচিতা' গল্পের কথকের নাম অনুপম।

For passages:
- Leave them mostly unchanged.
- Optionally fix OCR artifacts like unnecessary line breaks or noise.
- Format as clean, readable Bangla paragraph text suitable for vector embedding.

Important Rules:
- Maintain the original order of all content.
- Ignore any line that does not follow the MCQ pattern (e.g., short title, garbage text, etc.).
- Ensure that no formatting like numbering, bullets, or choice letters appear in the final MCQ output.

Now process the following text:

{text}"#
    }
}
