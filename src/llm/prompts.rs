//! Prompt templates, token budgets and default models.

use super::types::SummarizeResponse;

pub const OPENAI_CHAT_MODEL: &str = "gpt-4o-mini";
pub const OPENAI_EMBEDDING_MODEL: &str = "text-embedding-3-small";
pub const ANTHROPIC_MODEL: &str = "claude-haiku-4-5-20251001";

pub const SUMMARY_MAX_TOKENS: u32 = 300;
pub const STRUCTURE_MAX_TOKENS: u32 = 400;
pub const ANSWER_MAX_TOKENS: u32 = 512;

/// Texts with fewer words than this are not sent for summarization.
pub const MIN_SUMMARY_WORDS: usize = 50;
pub const SHORT_TEXT_NOTICE: &str = "Text is too short to summarize.";

pub const SUMMARY_SYSTEM_PROMPT: &str = "You summarize documents that were digitized with OCR. \
The text may contain recognition errors and irregular spacing. \
Write a concise summary of the important content in the document's own language.";

pub const STRUCTURE_SYSTEM_PROMPT: &str = r#"You extract structured data from OCR text of business documents.

<rules>
1. Extract the document type, company names, managers, representatives, phone numbers, dates, amounts and any other important data.
2. Output one item per line in the form "key : value".
3. Use the document's own language for keys and values.
4. Output ONLY the extracted lines. No headings, no commentary, no markdown.
</rules>"#;

pub const ANSWER_SYSTEM_PROMPT: &str = "You answer questions about a user's scanned documents. \
Use only the provided documents. If they do not contain the answer, say you don't know.";

pub fn build_summary_message(text: &str) -> String {
    format!(
        "Summarize the important content of the following text within {} tokens:\n\n{}",
        SUMMARY_MAX_TOKENS, text
    )
}

pub fn build_structure_message(text: &str) -> String {
    format!("<document>\n{}\n</document>", text)
}

pub fn build_answer_message(question: &str, context: &[String]) -> String {
    let mut message = String::new();
    for (index, document) in context.iter().enumerate() {
        message.push_str(&format!(
            "<document index=\"{}\">\n{}\n</document>\n\n",
            index + 1,
            document
        ));
    }
    message.push_str(&format!("Question: {}", question));
    message
}

/// The fixed notice for texts too short to summarize, or `None` when the
/// text should go to the model.
pub fn short_text_summary(text: &str) -> Option<SummarizeResponse> {
    if text.split_whitespace().count() < MIN_SUMMARY_WORDS {
        Some(SummarizeResponse {
            summary: SHORT_TEXT_NOTICE.to_string(),
        })
    } else {
        None
    }
}
