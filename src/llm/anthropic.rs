//! Anthropic adapter (messages API). Has no embedding endpoint.

use super::prompts::{self, ANSWER_MAX_TOKENS, STRUCTURE_MAX_TOKENS, SUMMARY_MAX_TOKENS};
use super::response::{parse_structured_fields, strip_code_fences};
use super::types::*;
use super::{send_json, Embedder, LanguageModel};
use crate::error::ProviderError;
use std::time::Duration;

const PROVIDER: &str = "anthropic";
const MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";

pub struct AnthropicClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

impl AnthropicClient {
    pub fn new(api_key: String, model: Option<String>, timeout: Duration) -> Result<Self, ProviderError> {
        if api_key.is_empty() {
            return Err(ProviderError::not_configured(
                PROVIDER,
                "ANTHROPIC_API_KEY is empty",
            ));
        }
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::from_reqwest(PROVIDER, e))?;
        Ok(Self {
            client,
            api_key,
            model: model.unwrap_or_else(|| prompts::ANTHROPIC_MODEL.to_string()),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn message(&self, system: &str, user: String, max_tokens: u32) -> Result<String, ProviderError> {
        log::info!("[LLM] Provider: anthropic, model: {}", self.model);
        let start = std::time::Instant::now();

        let builder = self
            .client
            .post(MESSAGES_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .header("content-type", "application/json")
            .json(&serde_json::json!({
                "model": self.model,
                "max_tokens": max_tokens,
                "system": system,
                "messages": [{"role": "user", "content": user}]
            }));
        let body = send_json(PROVIDER, builder).await?;

        let text = message_text(&body)
            .ok_or_else(|| ProviderError::invalid_response(PROVIDER, "no text block in content"))?;
        log::info!(
            "[LLM] anthropic responded in {}ms ({} in / {} out tokens)",
            start.elapsed().as_millis(),
            body["usage"]["input_tokens"].as_u64().unwrap_or(0),
            body["usage"]["output_tokens"].as_u64().unwrap_or(0)
        );
        Ok(text)
    }
}

/// Concatenated text blocks of a messages response.
fn message_text(body: &serde_json::Value) -> Option<String> {
    let blocks = body["content"].as_array()?;
    let text: String = blocks
        .iter()
        .filter(|block| block["type"] == "text")
        .filter_map(|block| block["text"].as_str())
        .collect();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

impl LanguageModel for AnthropicClient {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    async fn summarize(&self, request: &SummarizeRequest) -> Result<SummarizeResponse, ProviderError> {
        if let Some(notice) = prompts::short_text_summary(&request.text) {
            log::info!("[LLM] Text too short to summarize, skipping API call");
            return Ok(notice);
        }
        let summary = self
            .message(
                prompts::SUMMARY_SYSTEM_PROMPT,
                prompts::build_summary_message(&request.text),
                SUMMARY_MAX_TOKENS,
            )
            .await?;
        Ok(SummarizeResponse {
            summary: summary.trim().to_string(),
        })
    }

    async fn extract_structure(
        &self,
        request: &StructureRequest,
    ) -> Result<StructureResponse, ProviderError> {
        let raw = self
            .message(
                prompts::STRUCTURE_SYSTEM_PROMPT,
                prompts::build_structure_message(&request.text),
                STRUCTURE_MAX_TOKENS,
            )
            .await?;
        let raw = strip_code_fences(&raw);
        let fields = parse_structured_fields(&raw);
        Ok(StructureResponse { raw, fields })
    }

    async fn answer(&self, request: &AnswerRequest) -> Result<AnswerResponse, ProviderError> {
        let answer = self
            .message(
                prompts::ANSWER_SYSTEM_PROMPT,
                prompts::build_answer_message(&request.question, &request.context),
                ANSWER_MAX_TOKENS,
            )
            .await?;
        Ok(AnswerResponse {
            answer: answer.trim().to_string(),
        })
    }
}

impl Embedder for AnthropicClient {
    fn supports_embeddings(&self) -> bool {
        false
    }

    async fn embed(&self, _request: &EmbedRequest) -> Result<EmbedResponse, ProviderError> {
        Err(ProviderError::not_configured(
            PROVIDER,
            "embeddings are not available; set LLM_PROVIDER=openai for semantic search",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_text_blocks() {
        let body = serde_json::json!({
            "content": [
                {"type": "text", "text": "Company : "},
                {"type": "tool_use", "id": "x"},
                {"type": "text", "text": "Acme"}
            ]
        });
        assert_eq!(message_text(&body).as_deref(), Some("Company : Acme"));
        assert_eq!(message_text(&serde_json::json!({"content": []})), None);
    }

    #[tokio::test]
    async fn embedding_is_not_configured() {
        let client = AnthropicClient::new("sk-ant".into(), None, Duration::from_secs(5)).unwrap();
        assert_eq!(client.model(), prompts::ANTHROPIC_MODEL);
        let err = client
            .embed(&EmbedRequest {
                inputs: vec!["x".into()],
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::NotConfigured { .. }));
    }
}
