// Translation provider backends
//
// Each provider turns a fully assembled prompt into translated text:
// - OpenAI: chat completions with a bearer key
// - Azure: chat completions against a resource deployment with an api-key header
// - Gemini: generateContent with an x-goog-api-key header

pub mod azure;
pub mod common;
pub mod gemini;
pub mod openai;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub use common::*;
use crate::config::{Config, ProviderKind};
use crate::error::Result;

/// Translated text plus the provider's raw JSON response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationResult {
    pub text: String,
    pub raw_response: serde_json::Value,
}

/// Main trait for translation providers
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TranslationProvider: Send + Sync {
    /// Which backend this is
    fn kind(&self) -> ProviderKind;

    /// Model or deployment name recorded alongside results
    fn model(&self) -> String;

    /// Translate a complete prompt. Network failures, non-2xx responses and
    /// unexpected response shapes all come back as `Err`.
    async fn translate(&self, prompt: &str) -> Result<TranslationResult>;
}

/// Factory for creating provider instances
pub struct ProviderFactory;

impl ProviderFactory {
    /// Create the provider selected in the configuration
    pub fn create_provider(config: &Config) -> Result<Arc<dyn TranslationProvider>> {
        let provider: Arc<dyn TranslationProvider> = match config.translation.provider {
            ProviderKind::OpenAi => Arc::new(openai::OpenAiProvider::new(config)?),
            ProviderKind::Azure => Arc::new(azure::AzureProvider::new(config)?),
            ProviderKind::Gemini => Arc::new(gemini::GeminiProvider::new(config)?),
        };
        Ok(provider)
    }
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::Azure => "azure",
            ProviderKind::Gemini => "gemini",
        }
    }
}
