use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, error, info};

use crate::config::{Config, ProviderKind, require};
use crate::error::Result;
use crate::properties::{AZURE_OPENAI_API_KEY, AZURE_OPENAI_DEPLOYMENT, AZURE_OPENAI_ENDPOINT};
use super::{TranslationProvider, TranslationResult, common::{ChatCompletionRequest, build_client, parse_chat_completion, send_json}};

/// OpenAI model hosted in an Azure resource; the deployment selects the model
pub struct AzureProvider {
    client: Client,
    endpoint: String,
    deployment: String,
    api_version: String,
    api_key: String,
    max_tokens: u32,
    temperature: f32,
}

impl AzureProvider {
    pub fn new(config: &Config) -> Result<Self> {
        let azure = &config.providers.azure;

        Ok(Self {
            client: build_client(config.providers.request_timeout_secs)?,
            endpoint: require(&azure.endpoint, AZURE_OPENAI_ENDPOINT)?.trim_end_matches('/').to_string(),
            deployment: require(&azure.deployment, AZURE_OPENAI_DEPLOYMENT)?.to_string(),
            api_version: azure.api_version.clone(),
            api_key: require(&azure.api_key, AZURE_OPENAI_API_KEY)?.to_string(),
            max_tokens: config.translation.max_tokens,
            temperature: config.translation.temperature,
        })
    }

    pub fn url(&self) -> String {
        format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            self.endpoint, self.deployment, self.api_version
        )
    }

    async fn request(&self, prompt: &str) -> Result<TranslationResult> {
        let body = ChatCompletionRequest::single_user_message(None, prompt, self.max_tokens, self.temperature);

        let url = self.url();
        debug!("Sending translation request to: {}", url);

        let request = self.client.post(&url).header("api-key", &self.api_key).json(&body);
        let raw_response = send_json(request, "Azure OpenAI").await?;
        let text = parse_chat_completion(&raw_response)?;

        Ok(TranslationResult { text, raw_response })
    }
}

#[async_trait]
impl TranslationProvider for AzureProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Azure
    }

    fn model(&self) -> String {
        self.deployment.clone()
    }

    async fn translate(&self, prompt: &str) -> Result<TranslationResult> {
        match self.request(prompt).await {
            Ok(result) => {
                info!("Azure OpenAI translation received ({} chars)", result.text.len());
                Ok(result)
            }
            Err(e) => {
                error!("Error calling Azure OpenAI API: {}", e);
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransflowError;

    #[test]
    fn builds_deployment_url() {
        let mut config = Config::default();
        config.providers.azure.endpoint = Some("https://translate-prod.openai.azure.com/".to_string());
        config.providers.azure.deployment = Some("gpt-4o-mini".to_string());
        config.providers.azure.api_key = Some("key".to_string());

        let provider = AzureProvider::new(&config).unwrap();
        assert_eq!(
            provider.url(),
            "https://translate-prod.openai.azure.com/openai/deployments/gpt-4o-mini/chat/completions?api-version=2024-06-01"
        );
        assert_eq!(provider.model(), "gpt-4o-mini");
    }

    #[test]
    fn requires_endpoint() {
        let mut config = Config::default();
        config.providers.azure.api_key = Some("key".to_string());
        config.providers.azure.deployment = Some("d".to_string());

        let err = AzureProvider::new(&config).err().unwrap();
        assert!(matches!(err, TransflowError::MissingConfig(key) if key == AZURE_OPENAI_ENDPOINT));
    }

    #[tokio::test]
    async fn sends_api_key_header_to_deployment() {
        let body = r#"{"choices":[{"message":{"content":"Hola"}}],"usage":{"total_tokens":7}}"#;
        let (url, server) = crate::translate::common::test_server::respond_once("200 OK", body).await;

        let mut config = Config::default();
        config.providers.azure.endpoint = Some(url);
        config.providers.azure.deployment = Some("gpt-4o-mini".to_string());
        config.providers.azure.api_key = Some("az-key".to_string());
        config.providers.request_timeout_secs = 5;

        let result = AzureProvider::new(&config).unwrap().translate("Hello").await.unwrap();
        assert_eq!(result.text, "Hola");
        assert_eq!(result.raw_response["usage"]["total_tokens"], 7);

        let request = server.await.unwrap().to_lowercase();
        assert!(request.starts_with("post /openai/deployments/gpt-4o-mini/chat/completions?api-version=2024-06-01"));
        assert!(request.contains("api-key: az-key"));
        assert!(!request.contains(r#""model""#));
    }
}
