//! Application configuration, built once at startup and passed down.
//!
//! Sources, highest precedence first:
//! 1. Process environment (after `.env.local` / `.env` are loaded)
//! 2. `~/.config/paperlens/config.json`
//! 3. Built-in defaults
//!
//! API keys that are still missing after that are looked up in the OS
//! keychain (service "paperlens").

use crate::layout::LayoutPolicy;
use crate::llm::provider::LlmProviderKind;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const KEYCHAIN_SERVICE: &str = "paperlens";

const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 60;
const DEFAULT_RETRY_ATTEMPTS: u32 = 3;
const DEFAULT_RETRY_BACKOFF_MS: u64 = 500;

/// OCR provider endpoint and credentials.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OcrSettings {
    pub api_url: Option<String>,
    pub secret_key: Option<String>,
    /// Language hint passed to the provider (e.g. "ko", "en").
    pub lang: Option<String>,
}

/// Language-model provider selection and credentials.
#[derive(Debug, Clone, PartialEq)]
pub struct LlmSettings {
    pub provider: LlmProviderKind,
    pub model: Option<String>,
    pub embedding_model: Option<String>,
    pub openai_api_key: Option<String>,
    pub anthropic_api_key: Option<String>,
}

impl LlmSettings {
    pub fn api_key(&self, provider: LlmProviderKind) -> Option<&str> {
        match provider {
            LlmProviderKind::OpenAi => self.openai_api_key.as_deref(),
            LlmProviderKind::Anthropic => self.anthropic_api_key.as_deref(),
        }
    }
}

/// Retry behaviour for transient provider failures.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts including the first one. Always at least 1.
    pub max_attempts: u32,
    /// Delay before attempt `n` is `backoff * n`.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_RETRY_ATTEMPTS,
            backoff: Duration::from_millis(DEFAULT_RETRY_BACKOFF_MS),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub ocr: OcrSettings,
    pub llm: LlmSettings,
    pub data_dir: PathBuf,
    pub layout_policy: LayoutPolicy,
    pub http_timeout: Duration,
    pub retry: RetryPolicy,
}

/// On-disk configuration file. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileConfig {
    pub ocr_api_url: Option<String>,
    pub ocr_lang: Option<String>,
    pub llm_provider: Option<String>,
    pub llm_model: Option<String>,
    pub embedding_model: Option<String>,
    pub data_dir: Option<PathBuf>,
    pub layout_policy: Option<String>,
    pub http_timeout_secs: Option<u64>,
    pub retry_max_attempts: Option<u32>,
    pub retry_backoff_ms: Option<u64>,
}

impl FileConfig {
    /// Load the config file. Missing or invalid files yield defaults.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(raw) => match serde_json::from_str(&raw) {
                Ok(config) => {
                    log::info!("[CONFIG] Loaded {}", path.display());
                    config
                }
                Err(e) => {
                    log::warn!("[CONFIG] Ignoring invalid {}: {}", path.display(), e);
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }
}

/// Directory holding `config.json`.
pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("paperlens")
}

/// Default location for uploads, derived records and images.
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("paperlens")
}

/// Load `.env.local`, falling back to `.env`, from the working directory.
/// Only the first file found is loaded; existing variables are not overridden.
pub fn load_env_files() {
    for env_file in [".env.local", ".env"] {
        let path = Path::new(env_file);
        if path.exists() {
            match dotenvy::from_path(path) {
                Ok(_) => log::info!("[CONFIG] Loaded {}", path.display()),
                Err(e) => log::warn!("[CONFIG] Failed to load {}: {}", path.display(), e),
            }
            break;
        }
    }
}

impl AppConfig {
    /// Full startup load: env files, config file, environment, keychain.
    pub fn load() -> Self {
        load_env_files();
        let file = FileConfig::load(&config_dir().join("config.json"));
        let provider_hint = std::env::var("LLM_PROVIDER")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .or_else(|| file.llm_provider.clone());
        let mut config = Self::from_sources(|key| std::env::var(key).ok(), file);

        if config.ocr.secret_key.is_none() {
            config.ocr.secret_key = keychain_secret("ocr");
        }
        if config.llm.openai_api_key.is_none() {
            config.llm.openai_api_key = keychain_secret("openai");
        }
        if config.llm.anthropic_api_key.is_none() {
            config.llm.anthropic_api_key = keychain_secret("anthropic");
        }
        if provider_hint.is_none() {
            // Keychain keys can change which provider is the first configured one.
            config.llm.provider = LlmProviderKind::resolve(
                None,
                config.llm.openai_api_key.is_some(),
                config.llm.anthropic_api_key.is_some(),
            );
        }
        config
    }

    /// Build a config from a variable lookup and a parsed config file.
    pub fn from_sources(env: impl Fn(&str) -> Option<String>, file: FileConfig) -> Self {
        let var = |key: &str| env(key).filter(|v| !v.trim().is_empty());

        let openai_api_key = var("OPENAI_API_KEY");
        let anthropic_api_key = var("ANTHROPIC_API_KEY");
        let provider_hint = var("LLM_PROVIDER").or(file.llm_provider);
        let provider = LlmProviderKind::resolve(
            provider_hint.as_deref(),
            openai_api_key.is_some(),
            anthropic_api_key.is_some(),
        );

        let layout_policy = match var("LAYOUT_POLICY").or(file.layout_policy) {
            Some(raw) => raw.parse().unwrap_or_else(|e| {
                log::warn!("[CONFIG] {}; using auto", e);
                LayoutPolicy::Auto
            }),
            None => LayoutPolicy::Auto,
        };

        let http_timeout_secs = parse_var(var("HTTP_TIMEOUT_SECS"), "HTTP_TIMEOUT_SECS")
            .or(file.http_timeout_secs)
            .unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS);
        let max_attempts = parse_var(var("RETRY_MAX_ATTEMPTS"), "RETRY_MAX_ATTEMPTS")
            .or(file.retry_max_attempts)
            .unwrap_or(DEFAULT_RETRY_ATTEMPTS)
            .max(1);
        let backoff_ms = parse_var(var("RETRY_BACKOFF_MS"), "RETRY_BACKOFF_MS")
            .or(file.retry_backoff_ms)
            .unwrap_or(DEFAULT_RETRY_BACKOFF_MS);

        Self {
            ocr: OcrSettings {
                api_url: var("OCR_API_URL").or(file.ocr_api_url),
                secret_key: var("OCR_SECRET_KEY"),
                lang: var("OCR_LANG").or(file.ocr_lang),
            },
            llm: LlmSettings {
                provider,
                model: var("LLM_MODEL").or(file.llm_model),
                embedding_model: var("EMBEDDING_MODEL").or(file.embedding_model),
                openai_api_key,
                anthropic_api_key,
            },
            data_dir: var("PAPERLENS_DATA_DIR")
                .map(PathBuf::from)
                .or(file.data_dir)
                .unwrap_or_else(default_data_dir),
            layout_policy,
            http_timeout: Duration::from_secs(http_timeout_secs),
            retry: RetryPolicy {
                max_attempts,
                backoff: Duration::from_millis(backoff_ms),
            },
        }
    }
}

fn parse_var<T: std::str::FromStr>(raw: Option<String>, key: &str) -> Option<T> {
    let raw = raw?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            log::warn!("[CONFIG] Ignoring non-numeric {}={}", key, raw);
            None
        }
    }
}

/// Look up a secret stored under `account` in the OS keychain.
pub fn keychain_secret(account: &str) -> Option<String> {
    let entry = keyring::Entry::new(KEYCHAIN_SERVICE, account).ok()?;
    match entry.get_password() {
        Ok(secret) if !secret.is_empty() => {
            log::info!("[CONFIG] Loaded {} key from OS keychain", account);
            Some(secret)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_without_any_source() {
        let config = AppConfig::from_sources(env_from(&[]), FileConfig::default());
        assert_eq!(config.layout_policy, LayoutPolicy::Auto);
        assert_eq!(config.http_timeout, Duration::from_secs(60));
        assert_eq!(config.retry, RetryPolicy::default());
        assert_eq!(config.llm.provider, LlmProviderKind::OpenAi);
        assert!(config.ocr.api_url.is_none());
        assert!(config.data_dir.ends_with("paperlens"));
    }

    #[test]
    fn environment_overrides_file() {
        let file = FileConfig {
            ocr_api_url: Some("https://file.example/ocr".into()),
            layout_policy: Some("ratio".into()),
            retry_max_attempts: Some(5),
            ..FileConfig::default()
        };
        let env = env_from(&[
            ("OCR_API_URL", "https://env.example/ocr"),
            ("OCR_SECRET_KEY", "s3cret"),
            ("PAPERLENS_DATA_DIR", "/tmp/paperlens-test"),
        ]);
        let config = AppConfig::from_sources(env, file);
        assert_eq!(config.ocr.api_url.as_deref(), Some("https://env.example/ocr"));
        assert_eq!(config.ocr.secret_key.as_deref(), Some("s3cret"));
        assert_eq!(config.layout_policy, LayoutPolicy::Ratio);
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.data_dir, PathBuf::from("/tmp/paperlens-test"));
    }

    #[test]
    fn provider_follows_configured_key() {
        let env = env_from(&[("ANTHROPIC_API_KEY", "sk-ant")]);
        let config = AppConfig::from_sources(env, FileConfig::default());
        assert_eq!(config.llm.provider, LlmProviderKind::Anthropic);
        assert_eq!(config.llm.api_key(LlmProviderKind::Anthropic), Some("sk-ant"));

        let env = env_from(&[
            ("ANTHROPIC_API_KEY", "sk-ant"),
            ("LLM_PROVIDER", "openai"),
        ]);
        let config = AppConfig::from_sources(env, FileConfig::default());
        assert_eq!(config.llm.provider, LlmProviderKind::OpenAi);
    }

    #[test]
    fn blank_and_invalid_values_are_ignored() {
        let env = env_from(&[
            ("OCR_API_URL", "   "),
            ("HTTP_TIMEOUT_SECS", "soon"),
            ("RETRY_MAX_ATTEMPTS", "0"),
            ("LAYOUT_POLICY", "columns"),
        ]);
        let config = AppConfig::from_sources(env, FileConfig::default());
        assert!(config.ocr.api_url.is_none());
        assert_eq!(config.http_timeout, Duration::from_secs(60));
        assert_eq!(config.retry.max_attempts, 1);
        assert_eq!(config.layout_policy, LayoutPolicy::Auto);
    }

    #[test]
    fn file_config_parses_camel_case() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"ocrApiUrl": "https://ocr.example", "layoutPolicy": "explicit", "httpTimeoutSecs": 5}"#,
        )
        .unwrap();
        let file = FileConfig::load(&path);
        assert_eq!(file.ocr_api_url.as_deref(), Some("https://ocr.example"));
        assert_eq!(file.layout_policy.as_deref(), Some("explicit"));
        assert_eq!(file.http_timeout_secs, Some(5));
    }

    #[test]
    fn missing_or_broken_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(
            FileConfig::load(&dir.path().join("nope.json")),
            FileConfig::default()
        );
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{not json").unwrap();
        assert_eq!(FileConfig::load(&path), FileConfig::default());
    }
}
