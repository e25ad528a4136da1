use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::error::{Result, TransflowError};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

/// Chat-completion request body shared by OpenAI and Azure
#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletionRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl ChatCompletionRequest {
    pub fn single_user_message(model: Option<&str>, prompt: &str, max_tokens: u32, temperature: f32) -> Self {
        Self {
            model: model.map(str::to_string),
            messages: vec![ChatMessage { role: "user".to_string(), content: prompt.to_string() }],
            max_tokens,
            temperature,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: Option<ChatChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

/// Pull `choices[0].message.content` out of a chat-completion response
pub fn parse_chat_completion(raw: &serde_json::Value) -> Result<String> {
    let response: ChatCompletionResponse = serde_json::from_value(raw.clone())
        .map_err(|e| TransflowError::Provider(format!("Unexpected API response: {}", e)))?;

    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message)
        .and_then(|message| message.content)
        .map(|content| content.trim().to_string())
        .ok_or_else(|| TransflowError::Provider(format!("Unexpected API response: {}", raw)))
}

pub fn build_client(timeout_secs: u64) -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(TransflowError::Http)
}

/// Send a request and return the JSON body of a 2xx response
pub async fn send_json(request: RequestBuilder, provider: &str) -> Result<serde_json::Value> {
    let response = request
        .send()
        .await
        .map_err(|e| TransflowError::Provider(format!("{} request failed: {}", provider, e)))?;

    let status = response.status();
    if !status.is_success() {
        let error_text = response.text().await.unwrap_or_default();
        return Err(TransflowError::Provider(format!(
            "{} API error {}: {}",
            provider, status, error_text
        )));
    }

    let body = response
        .text()
        .await
        .map_err(|e| TransflowError::Provider(format!("Failed to read {} response: {}", provider, e)))?;
    debug!("Raw {} response: {}", provider, body);

    serde_json::from_str(&body)
        .map_err(|e| TransflowError::Provider(format!("Failed to parse {} response: {}", provider, e)))
}
