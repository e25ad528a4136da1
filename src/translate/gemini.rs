use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::config::{Config, ProviderKind, require};
use crate::error::{Result, TransflowError};
use crate::properties::GEMINI_API_KEY;
use super::{TranslationProvider, TranslationResult, common::{build_client, send_json}};

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

/// Pull `candidates[0].content.parts[0].text` out of a generateContent response
pub fn parse_generate_content(raw: &serde_json::Value) -> Result<String> {
    let response: GenerateContentResponse = serde_json::from_value(raw.clone())
        .map_err(|e| TransflowError::Provider(format!("Unexpected Gemini response: {}", e)))?;

    response
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .and_then(|content| content.parts.into_iter().next())
        .and_then(|part| part.text)
        .map(|text| text.trim().to_string())
        .ok_or_else(|| TransflowError::Provider(format!("Unexpected Gemini response: {}", raw)))
}

/// Google Gemini generateContent
pub struct GeminiProvider {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

impl GeminiProvider {
    pub fn new(config: &Config) -> Result<Self> {
        let api_key = require(&config.providers.gemini.api_key, GEMINI_API_KEY)?.to_string();

        Ok(Self {
            client: build_client(config.providers.request_timeout_secs)?,
            base_url: config.providers.gemini.base_url.trim_end_matches('/').to_string(),
            api_key,
            model: config.translation.model.clone(),
            max_tokens: config.translation.max_tokens,
            temperature: config.translation.temperature,
        })
    }

    pub fn url(&self) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.base_url, self.model)
    }

    fn request_body(&self, prompt: &str) -> GenerateContentRequest {
        GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part { text: Some(prompt.to_string()) }],
            }],
            generation_config: GenerationConfig {
                temperature: self.temperature,
                max_output_tokens: self.max_tokens,
            },
        }
    }

    async fn request(&self, prompt: &str) -> Result<TranslationResult> {
        let url = self.url();
        debug!("Sending translation request to: {}", url);

        let request = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&self.request_body(prompt));
        let raw_response = send_json(request, "Gemini").await?;
        let text = parse_generate_content(&raw_response)?;

        Ok(TranslationResult { text, raw_response })
    }
}

#[async_trait]
impl TranslationProvider for GeminiProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Gemini
    }

    fn model(&self) -> String {
        self.model.clone()
    }

    async fn translate(&self, prompt: &str) -> Result<TranslationResult> {
        match self.request(prompt).await {
            Ok(result) => {
                info!("Gemini translation received ({} chars)", result.text.len());
                Ok(result)
            }
            Err(e) => {
                error!("Error calling Gemini API: {}", e);
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translate::common::test_server::respond_once;
    use serde_json::json;

    fn provider_at(base_url: &str) -> GeminiProvider {
        let mut config = Config::default();
        config.translation.provider = ProviderKind::Gemini;
        config.translation.model = "gemini-2.5-flash".to_string();
        config.providers.gemini.api_key = Some("g-key".to_string());
        config.providers.gemini.base_url = base_url.to_string();
        config.providers.request_timeout_secs = 5;
        GeminiProvider::new(&config).unwrap()
    }

    fn provider() -> GeminiProvider {
        let mut config = Config::default();
        config.translation.provider = ProviderKind::Gemini;
        config.translation.model = "gemini-2.5-flash".to_string();
        config.providers.gemini.api_key = Some("g-key".to_string());
        GeminiProvider::new(&config).unwrap()
    }

    #[test]
    fn request_body_shape() {
        let body = serde_json::to_value(provider().request_body("Hello")).unwrap();
        assert_eq!(body["contents"][0]["parts"][0]["text"], "Hello");
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 2000);
        assert!(body["generationConfig"]["temperature"].is_number());
    }

    #[test]
    fn model_specific_url() {
        assert_eq!(
            provider().url(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash:generateContent"
        );
    }

    #[test]
    fn parses_first_candidate() {
        let raw = json!({
            "candidates": [{ "content": { "role": "model", "parts": [{ "text": "Hola\n" }] } }],
            "usageMetadata": { "totalTokenCount": 9 }
        });
        assert_eq!(parse_generate_content(&raw).unwrap(), "Hola");
    }

    #[test]
    fn missing_candidates_is_an_error() {
        assert!(parse_generate_content(&json!({ "promptFeedback": { "blockReason": "SAFETY" } })).is_err());
        assert!(parse_generate_content(&json!({ "candidates": [{ "finishReason": "SAFETY" }] })).is_err());
    }

    #[tokio::test]
    async fn generate_content_keeps_usage_and_sends_key_header() {
        let body = r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"Hola"}]}}],"usageMetadata":{"totalTokenCount":9}}"#;
        let (url, server) = respond_once("200 OK", body).await;

        let result = provider_at(&url).translate("Hello").await.unwrap();
        assert_eq!(result.text, "Hola");
        assert_eq!(result.raw_response["usageMetadata"]["totalTokenCount"], 9);

        let request = server.await.unwrap().to_lowercase();
        assert!(request.starts_with("post /v1beta/models/gemini-2.5-flash:generatecontent"));
        assert!(request.contains("x-goog-api-key: g-key"));
    }

    #[tokio::test]
    async fn quota_error_is_a_provider_error() {
        let (url, server) = respond_once("429 Too Many Requests", r#"{"error":{"status":"RESOURCE_EXHAUSTED"}}"#).await;

        let err = provider_at(&url).translate("Hello").await.unwrap_err();
        assert!(matches!(&err, TransflowError::Provider(msg) if msg.contains("429")));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn error_body_with_ok_status_is_an_error() {
        let (url, server) = respond_once("200 OK", r#"{"error":{"message":"bad request"}}"#).await;

        assert!(matches!(provider_at(&url).translate("Hello").await, Err(TransflowError::Provider(_))));
        server.await.unwrap();
    }
}
