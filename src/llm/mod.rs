//! Language-model domain: summarization, structuring, answering, embedding.
//!
//! The pipeline depends on the `LanguageModel` and `Embedder` traits only.
//!
//! Providers:
//!   - OpenAI chat completions + embeddings (openai.rs)
//!   - Anthropic messages (anthropic.rs)
//!
//! Shared:
//!   - prompt templates and token budgets (prompts.rs)
//!   - code-fence stripping and "key : value" parsing (response.rs)
//!   - provider resolution and the dispatching client (provider.rs)

mod anthropic;
mod openai;
pub mod prompts;
pub mod provider;
pub mod response;
pub mod types;

pub use anthropic::AnthropicClient;
pub use openai::OpenAiClient;
pub use provider::{LlmClient, LlmProviderKind};
pub use types::*;

use crate::error::ProviderError;
use std::future::Future;

/// Text generation tasks run against scanned-document text.
pub trait LanguageModel: Send + Sync {
    fn name(&self) -> &'static str;

    fn summarize(
        &self,
        request: &SummarizeRequest,
    ) -> impl Future<Output = Result<SummarizeResponse, ProviderError>> + Send;

    fn extract_structure(
        &self,
        request: &StructureRequest,
    ) -> impl Future<Output = Result<StructureResponse, ProviderError>> + Send;

    fn answer(
        &self,
        request: &AnswerRequest,
    ) -> impl Future<Output = Result<AnswerResponse, ProviderError>> + Send;
}

/// Text embedding for semantic retrieval.
pub trait Embedder: Send + Sync {
    /// Whether this provider has an embeddings endpoint at all. A provider
    /// that does may still fail `embed` for a missing key.
    fn supports_embeddings(&self) -> bool {
        true
    }

    fn embed(
        &self,
        request: &EmbedRequest,
    ) -> impl Future<Output = Result<EmbedResponse, ProviderError>> + Send;
}

/// Send a JSON request and return the parsed body, mapping transport and
/// status failures to `ProviderError`.
pub(crate) async fn send_json(
    provider: &'static str,
    builder: reqwest::RequestBuilder,
) -> Result<serde_json::Value, ProviderError> {
    let resp = builder
        .send()
        .await
        .map_err(|e| ProviderError::from_reqwest(provider, e))?;

    let status = resp.status();
    let body = resp
        .text()
        .await
        .map_err(|e| ProviderError::from_reqwest(provider, e))?;

    if !status.is_success() {
        log::error!(
            "[LLM] {} returned {}: {}",
            provider,
            status,
            crate::error::truncate(&body, 200)
        );
        return Err(ProviderError::from_status(provider, status.as_u16(), &body));
    }

    serde_json::from_str(&body)
        .map_err(|e| ProviderError::invalid_response(provider, format!("malformed JSON: {}", e)))
}
