//! OpenAI adapter: chat completions for text tasks, embeddings for search.

use super::prompts::{self, ANSWER_MAX_TOKENS, STRUCTURE_MAX_TOKENS, SUMMARY_MAX_TOKENS};
use super::response::{parse_structured_fields, strip_code_fences};
use super::types::*;
use super::{send_json, Embedder, LanguageModel};
use crate::error::ProviderError;
use std::time::Duration;

const PROVIDER: &str = "openai";
const CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";
const EMBEDDINGS_URL: &str = "https://api.openai.com/v1/embeddings";

pub struct OpenAiClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
    embedding_model: String,
}

impl OpenAiClient {
    pub fn new(
        api_key: String,
        model: Option<String>,
        embedding_model: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        if api_key.is_empty() {
            return Err(ProviderError::not_configured(
                PROVIDER,
                "OPENAI_API_KEY is empty",
            ));
        }
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::from_reqwest(PROVIDER, e))?;
        Ok(Self {
            client,
            api_key,
            model: model.unwrap_or_else(|| prompts::OPENAI_CHAT_MODEL.to_string()),
            embedding_model: embedding_model
                .unwrap_or_else(|| prompts::OPENAI_EMBEDDING_MODEL.to_string()),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn chat(&self, system: &str, user: String, max_tokens: u32) -> Result<String, ProviderError> {
        log::info!("[LLM] Provider: openai, model: {}", self.model);
        let start = std::time::Instant::now();

        let builder = self
            .client
            .post(CHAT_URL)
            .bearer_auth(&self.api_key)
            .json(&serde_json::json!({
                "model": self.model,
                "max_tokens": max_tokens,
                "temperature": 0,
                "messages": [
                    {"role": "system", "content": system},
                    {"role": "user", "content": user},
                ]
            }));
        let body = send_json(PROVIDER, builder).await?;

        let text = chat_text(&body)
            .ok_or_else(|| ProviderError::invalid_response(PROVIDER, "no message content in choices"))?;
        log::info!(
            "[LLM] openai responded in {}ms ({} tokens)",
            start.elapsed().as_millis(),
            body["usage"]["total_tokens"].as_u64().unwrap_or(0)
        );
        Ok(text)
    }
}

/// `choices[0].message.content` of a chat completion.
fn chat_text(body: &serde_json::Value) -> Option<String> {
    body["choices"][0]["message"]["content"]
        .as_str()
        .map(|s| s.to_string())
}

/// `data[*].embedding`, reordered by each item's `index`.
fn embedding_vectors(body: &serde_json::Value) -> Option<Vec<Vec<f32>>> {
    let mut items: Vec<(u64, Vec<f32>)> = body["data"]
        .as_array()?
        .iter()
        .map(|item| {
            let index = item["index"].as_u64().unwrap_or(0);
            let vector = item["embedding"]
                .as_array()?
                .iter()
                .map(|v| v.as_f64().map(|f| f as f32))
                .collect::<Option<Vec<f32>>>()?;
            Some((index, vector))
        })
        .collect::<Option<_>>()?;
    items.sort_by_key(|(index, _)| *index);
    Some(items.into_iter().map(|(_, vector)| vector).collect())
}

impl LanguageModel for OpenAiClient {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    async fn summarize(&self, request: &SummarizeRequest) -> Result<SummarizeResponse, ProviderError> {
        if let Some(notice) = prompts::short_text_summary(&request.text) {
            log::info!("[LLM] Text too short to summarize, skipping API call");
            return Ok(notice);
        }
        let summary = self
            .chat(
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
            .chat(
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
            .chat(
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

impl Embedder for OpenAiClient {
    async fn embed(&self, request: &EmbedRequest) -> Result<EmbedResponse, ProviderError> {
        if request.inputs.is_empty() {
            return Ok(EmbedResponse { vectors: Vec::new() });
        }
        let start = std::time::Instant::now();
        let builder = self
            .client
            .post(EMBEDDINGS_URL)
            .bearer_auth(&self.api_key)
            .json(&serde_json::json!({
                "model": self.embedding_model,
                "input": request.inputs,
            }));
        let body = send_json(PROVIDER, builder).await?;

        let vectors = embedding_vectors(&body)
            .ok_or_else(|| ProviderError::invalid_response(PROVIDER, "malformed embedding data"))?;
        if vectors.len() != request.inputs.len() {
            return Err(ProviderError::invalid_response(
                PROVIDER,
                format!("expected {} embeddings, got {}", request.inputs.len(), vectors.len()),
            ));
        }
        log::info!(
            "[LLM] Embedded {} input(s) in {}ms",
            vectors.len(),
            start.elapsed().as_millis()
        );
        Ok(EmbedResponse { vectors })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_key() {
        let err = OpenAiClient::new(String::new(), None, None, Duration::from_secs(5))
            .err()
            .unwrap();
        assert!(matches!(err, ProviderError::NotConfigured { .. }));
    }

    #[test]
    fn default_models() {
        let client = OpenAiClient::new("sk-test".into(), None, None, Duration::from_secs(5)).unwrap();
        assert_eq!(client.model(), prompts::OPENAI_CHAT_MODEL);
        assert_eq!(client.embedding_model, prompts::OPENAI_EMBEDDING_MODEL);
    }

    #[test]
    fn extracts_chat_text() {
        let body = serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": "Hello"}}]
        });
        assert_eq!(chat_text(&body).as_deref(), Some("Hello"));
        assert_eq!(chat_text(&serde_json::json!({"choices": []})), None);
    }

    #[test]
    fn embeddings_follow_index_order() {
        let body = serde_json::json!({
            "data": [
                {"index": 1, "embedding": [0.5, 0.25]},
                {"index": 0, "embedding": [1.0, 0.0]}
            ]
        });
        assert_eq!(
            embedding_vectors(&body),
            Some(vec![vec![1.0, 0.0], vec![0.5, 0.25]])
        );
        let broken = serde_json::json!({"data": [{"index": 0, "embedding": ["x"]}]});
        assert_eq!(embedding_vectors(&broken), None);
    }

    #[tokio::test]
    async fn short_text_skips_the_api() {
        // Returns before any request is built.
        let client = OpenAiClient::new("sk-test".into(), None, None, Duration::from_millis(1)).unwrap();
        let response = client
            .summarize(&SummarizeRequest {
                text: "only a few words".into(),
            })
            .await
            .unwrap();
        assert_eq!(response.summary, prompts::SHORT_TEXT_NOTICE);
    }
}
