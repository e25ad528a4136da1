//! Form submission events.
//!
//! An event carries the form id, a submission id and the answered items.
//! Answers are mapped onto request fields by matching each item title
//! against the labels configured in [`FormConfig`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use tracing::{debug, info};

use crate::config::FormConfig;
use crate::error::{Result, TransflowError};
use crate::request::{RequestSource, TranslationRequest};

const UNTITLED_REQUEST: &str = "Untitled Request";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemResponse {
    pub title: String,
    pub response: Value,
}

impl ItemResponse {
    /// Answer as text; multi-select answers are joined with commas
    pub fn text(&self) -> String {
        match &self.response {
            Value::String(s) => s.clone(),
            Value::Array(items) => items
                .iter()
                .map(|item| match item {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect::<Vec<_>>()
                .join(", "),
            Value::Null => String::new(),
            other => other.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormSubmitEvent {
    pub form_id: String,
    pub submission_id: String,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub respondent_email: Option<String>,
    #[serde(default)]
    pub responses: Vec<ItemResponse>,
}

impl FormSubmitEvent {
    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content)
            .map_err(|e| TransflowError::Form(format!("Invalid form submission event: {}", e)))
    }

    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = tokio::fs::read_to_string(path.as_ref()).await?;
        Self::from_json(&content)
    }

    pub fn is_from(&self, form_id: &str) -> bool {
        self.form_id.trim() == form_id.trim()
    }

    /// Map labelled answers onto a translation request
    pub fn to_request(&self, labels: &FormConfig) -> Result<TranslationRequest> {
        let mut text = String::new();
        let mut request_name = String::new();
        let mut content_type = String::new();
        let mut email = String::new();

        for item in &self.responses {
            let title = item.title.trim();
            if title == labels.text_item_label {
                text = item.text();
                debug!("Text to translate: {}", text);
            } else if title == labels.request_name_item_label {
                request_name = item.text().trim().to_string();
                debug!("Request name: {}", request_name);
            } else if title == labels.content_type_item_label {
                content_type = item.text().trim().to_string();
            } else if title == labels.email_item_label {
                email = item.text().trim().to_string();
            }
        }

        if text.trim().is_empty() {
            return Err(TransflowError::Form(format!(
                "Submission {} has no answer for '{}'",
                self.submission_id, labels.text_item_label
            )));
        }
        if request_name.is_empty() {
            request_name = UNTITLED_REQUEST.to_string();
        }
        if email.is_empty() {
            email = self.respondent_email.clone().unwrap_or_default();
        }

        info!("Extracted request '{}' from submission {}", request_name, self.submission_id);

        Ok(TranslationRequest {
            submission_id: self.submission_id.clone(),
            source_text: text,
            request_name,
            content_type,
            submission_timestamp: self.timestamp,
            respondent_email: email,
            source: RequestSource::Form { form_id: self.form_id.clone() },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event(responses: Value) -> FormSubmitEvent {
        serde_json::from_value(json!({
            "formId": "form-123",
            "submissionId": "sub-1",
            "timestamp": "2026-03-02T15:04:05Z",
            "respondentEmail": "caseworker@example.org",
            "responses": responses
        }))
        .unwrap()
    }

    #[test]
    fn maps_answers_by_label() {
        let labels = FormConfig::default();
        let event = event(json!([
            { "title": "Translation Request Name", "response": "Test1" },
            { "title": "Please enter the text you want to translate", "response": "Hello" },
            { "title": "What is the type of content you want to translate?", "response": ["Letter", "Notice"] },
            { "title": "Unrelated question", "response": "ignored" }
        ]));

        let request = event.to_request(&labels).unwrap();
        assert_eq!(request.request_name, "Test1");
        assert_eq!(request.source_text, "Hello");
        assert_eq!(request.content_type, "Letter, Notice");
        assert_eq!(request.respondent_email, "caseworker@example.org");
        assert_eq!(request.submission_id, "sub-1");
        assert_eq!(request.submission_timestamp.to_rfc3339(), "2026-03-02T15:04:05+00:00");
        assert_eq!(request.source, RequestSource::Form { form_id: "form-123".into() });
    }

    #[test]
    fn labelled_email_wins_over_event_email() {
        let event = event(json!([
            { "title": "Please enter the text you want to translate", "response": "Hello" },
            { "title": "Email Address", "response": "requester@example.org" }
        ]));

        let request = event.to_request(&FormConfig::default()).unwrap();
        assert_eq!(request.respondent_email, "requester@example.org");
        assert_eq!(request.request_name, "Untitled Request");
    }

    #[test]
    fn missing_text_is_rejected() {
        let event = event(json!([{ "title": "Translation Request Name", "response": "Test1" }]));
        assert!(matches!(event.to_request(&FormConfig::default()), Err(TransflowError::Form(_))));
    }

    #[test]
    fn checks_form_origin() {
        let event = event(json!([]));
        assert!(event.is_from("form-123"));
        assert!(!event.is_from("other-form"));
        assert!(FormSubmitEvent::from_json("{ not json").is_err());
    }
}
