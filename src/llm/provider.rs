//! Provider selection and the concrete client the pipeline runs against.

use super::anthropic::AnthropicClient;
use super::openai::OpenAiClient;
use super::types::*;
use super::{Embedder, LanguageModel};
use crate::config::AppConfig;
use crate::error::ProviderError;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProviderKind {
    OpenAi,
    Anthropic,
}

impl LlmProviderKind {
    pub fn id(self) -> &'static str {
        match self {
            LlmProviderKind::OpenAi => "openai",
            LlmProviderKind::Anthropic => "anthropic",
        }
    }

    pub fn env_key(self) -> &'static str {
        match self {
            LlmProviderKind::OpenAi => "OPENAI_API_KEY",
            LlmProviderKind::Anthropic => "ANTHROPIC_API_KEY",
        }
    }

    pub fn supports_embeddings(self) -> bool {
        self == LlmProviderKind::OpenAi
    }

    /// Explicit choice first, then the first provider with a key, then OpenAI.
    pub fn resolve(hint: Option<&str>, has_openai_key: bool, has_anthropic_key: bool) -> Self {
        if let Some(hint) = hint {
            match hint.parse() {
                Ok(kind) => return kind,
                Err(e) => log::warn!("[CONFIG] {}; falling back to key detection", e),
            }
        }
        if has_openai_key {
            LlmProviderKind::OpenAi
        } else if has_anthropic_key {
            LlmProviderKind::Anthropic
        } else {
            LlmProviderKind::OpenAi
        }
    }
}

impl fmt::Display for LlmProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for LlmProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(LlmProviderKind::OpenAi),
            "anthropic" | "claude" => Ok(LlmProviderKind::Anthropic),
            other => Err(format!("unknown LLM provider '{}'", other)),
        }
    }
}

/// Provider metadata for `paperlens` diagnostics output.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderInfo {
    pub id: &'static str,
    pub env_key: &'static str,
    pub default_model: &'static str,
    pub supports_embeddings: bool,
    pub configured: bool,
}

/// All known providers and whether each has a key in `config`.
pub fn all_providers(config: &AppConfig) -> Vec<ProviderInfo> {
    [LlmProviderKind::OpenAi, LlmProviderKind::Anthropic]
        .into_iter()
        .map(|kind| ProviderInfo {
            id: kind.id(),
            env_key: kind.env_key(),
            default_model: match kind {
                LlmProviderKind::OpenAi => super::prompts::OPENAI_CHAT_MODEL,
                LlmProviderKind::Anthropic => super::prompts::ANTHROPIC_MODEL,
            },
            supports_embeddings: kind.supports_embeddings(),
            configured: config.llm.api_key(kind).is_some(),
        })
        .collect()
}

/// The configured language model, dispatched statically per provider.
pub enum LlmClient {
    OpenAi(OpenAiClient),
    Anthropic(AnthropicClient),
    /// No key for the selected provider; every call fails as not configured.
    Unconfigured(LlmProviderKind),
}

impl LlmClient {
    pub fn from_config(config: &AppConfig) -> Result<Self, ProviderError> {
        let kind = config.llm.provider;
        let Some(api_key) = config.llm.api_key(kind).map(str::to_string) else {
            log::warn!("[LLM] No {} set; language-model features are unavailable", kind.env_key());
            return Ok(LlmClient::Unconfigured(kind));
        };

        let client = match kind {
            LlmProviderKind::OpenAi => LlmClient::OpenAi(OpenAiClient::new(
                api_key,
                config.llm.model.clone(),
                config.llm.embedding_model.clone(),
                config.http_timeout,
            )?),
            LlmProviderKind::Anthropic => LlmClient::Anthropic(AnthropicClient::new(
                api_key,
                config.llm.model.clone(),
                config.http_timeout,
            )?),
        };
        log::info!("[LLM] Using provider {}", kind);
        Ok(client)
    }
}

impl LlmClient {
    fn unconfigured(kind: LlmProviderKind) -> ProviderError {
        ProviderError::not_configured(kind.id(), format!("{} is not set", kind.env_key()))
    }
}

impl LanguageModel for LlmClient {
    fn name(&self) -> &'static str {
        match self {
            LlmClient::OpenAi(c) => c.name(),
            LlmClient::Anthropic(c) => c.name(),
            LlmClient::Unconfigured(kind) => kind.id(),
        }
    }

    async fn summarize(&self, request: &SummarizeRequest) -> Result<SummarizeResponse, ProviderError> {
        match self {
            LlmClient::OpenAi(c) => c.summarize(request).await,
            LlmClient::Anthropic(c) => c.summarize(request).await,
            LlmClient::Unconfigured(kind) => Err(Self::unconfigured(*kind)),
        }
    }

    async fn extract_structure(
        &self,
        request: &StructureRequest,
    ) -> Result<StructureResponse, ProviderError> {
        match self {
            LlmClient::OpenAi(c) => c.extract_structure(request).await,
            LlmClient::Anthropic(c) => c.extract_structure(request).await,
            LlmClient::Unconfigured(kind) => Err(Self::unconfigured(*kind)),
        }
    }

    async fn answer(&self, request: &AnswerRequest) -> Result<AnswerResponse, ProviderError> {
        match self {
            LlmClient::OpenAi(c) => c.answer(request).await,
            LlmClient::Anthropic(c) => c.answer(request).await,
            LlmClient::Unconfigured(kind) => Err(Self::unconfigured(*kind)),
        }
    }
}

impl Embedder for LlmClient {
    fn supports_embeddings(&self) -> bool {
        match self {
            LlmClient::OpenAi(c) => c.supports_embeddings(),
            LlmClient::Anthropic(c) => c.supports_embeddings(),
            LlmClient::Unconfigured(kind) => kind.supports_embeddings(),
        }
    }

    async fn embed(&self, request: &EmbedRequest) -> Result<EmbedResponse, ProviderError> {
        match self {
            LlmClient::OpenAi(c) => c.embed(request).await,
            LlmClient::Anthropic(c) => c.embed(request).await,
            LlmClient::Unconfigured(kind) => Err(Self::unconfigured(*kind)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FileConfig;

    #[test]
    fn resolution_order() {
        assert_eq!(
            LlmProviderKind::resolve(Some("anthropic"), true, false),
            LlmProviderKind::Anthropic
        );
        assert_eq!(
            LlmProviderKind::resolve(None, false, true),
            LlmProviderKind::Anthropic
        );
        assert_eq!(
            LlmProviderKind::resolve(None, true, true),
            LlmProviderKind::OpenAi
        );
        assert_eq!(
            LlmProviderKind::resolve(None, false, false),
            LlmProviderKind::OpenAi
        );
        assert_eq!(
            LlmProviderKind::resolve(Some("gemini"), false, true),
            LlmProviderKind::Anthropic
        );
    }

    #[tokio::test]
    async fn client_without_key_fails_on_use() {
        let config = AppConfig::from_sources(|_| None, FileConfig::default());
        let client = LlmClient::from_config(&config).unwrap();
        assert_eq!(client.name(), "openai");
        let err = client
            .answer(&AnswerRequest {
                question: "q".into(),
                context: vec![],
            })
            .await
            .unwrap_err();
        assert!(err.to_string().contains("OPENAI_API_KEY"));
    }

    #[test]
    fn client_uses_key_of_selected_provider() {
        let config = AppConfig::from_sources(
            |key| (key == "ANTHROPIC_API_KEY").then(|| "sk-ant".to_string()),
            FileConfig::default(),
        );
        let client = LlmClient::from_config(&config).unwrap();
        assert_eq!(client.name(), "anthropic");
    }

    #[test]
    fn provider_listing_marks_configured_keys() {
        let config = AppConfig::from_sources(
            |key| (key == "OPENAI_API_KEY").then(|| "sk".to_string()),
            FileConfig::default(),
        );
        let providers = all_providers(&config);
        assert_eq!(providers.len(), 2);
        assert!(providers[0].configured && providers[0].supports_embeddings);
        assert!(!providers[1].configured);
    }

    #[test]
    fn embedding_support_follows_provider_not_key() {
        assert!(LlmClient::Unconfigured(LlmProviderKind::OpenAi).supports_embeddings());
        assert!(!LlmClient::Unconfigured(LlmProviderKind::Anthropic).supports_embeddings());

        let config = AppConfig::from_sources(
            |key| (key == "ANTHROPIC_API_KEY").then(|| "sk-ant".to_string()),
            FileConfig::default(),
        );
        assert!(!LlmClient::from_config(&config).unwrap().supports_embeddings());
    }
}
