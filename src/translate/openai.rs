use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, error, info};

use crate::config::{Config, ProviderKind, require};
use crate::error::Result;
use crate::properties::OPENAI_API_KEY;
use super::{TranslationProvider, TranslationResult, common::{ChatCompletionRequest, build_client, parse_chat_completion, send_json}};

/// OpenAI chat completions
pub struct OpenAiProvider {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

impl OpenAiProvider {
    pub fn new(config: &Config) -> Result<Self> {
        let api_key = require(&config.providers.openai.api_key, OPENAI_API_KEY)?.to_string();

        Ok(Self {
            client: build_client(config.providers.request_timeout_secs)?,
            base_url: config.providers.openai.base_url.trim_end_matches('/').to_string(),
            api_key,
            model: config.translation.model.clone(),
            max_tokens: config.translation.max_tokens,
            temperature: config.translation.temperature,
        })
    }

    pub fn endpoint(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url)
    }

    async fn request(&self, prompt: &str) -> Result<TranslationResult> {
        let body = ChatCompletionRequest::single_user_message(
            Some(&self.model),
            prompt,
            self.max_tokens,
            self.temperature,
        );

        let url = self.endpoint();
        debug!("Sending translation request to: {}", url);

        let request = self.client.post(&url).bearer_auth(&self.api_key).json(&body);
        let raw_response = send_json(request, "OpenAI").await?;
        let text = parse_chat_completion(&raw_response)?;

        Ok(TranslationResult { text, raw_response })
    }
}

#[async_trait]
impl TranslationProvider for OpenAiProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::OpenAi
    }

    fn model(&self) -> String {
        self.model.clone()
    }

    async fn translate(&self, prompt: &str) -> Result<TranslationResult> {
        match self.request(prompt).await {
            Ok(result) => {
                info!("OpenAI translation received ({} chars)", result.text.len());
                Ok(result)
            }
            Err(e) => {
                error!("Error calling OpenAI API: {}", e);
                Err(e)
            }
        }
    }
}
