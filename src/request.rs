use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Where a request came from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RequestSource {
    Folder { file_id: String },
    Form { form_id: String },
}

/// One unit of work for the translation pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationRequest {
    pub submission_id: String,
    pub source_text: String,
    pub request_name: String,
    pub content_type: String,
    pub submission_timestamp: DateTime<Utc>,
    pub respondent_email: String,
    pub source: RequestSource,
}

impl TranslationRequest {
    pub fn new(request_name: &str, source_text: &str, source: RequestSource) -> Self {
        Self {
            submission_id: Uuid::new_v4().to_string(),
            source_text: source_text.to_string(),
            request_name: request_name.to_string(),
            content_type: String::new(),
            submission_timestamp: Utc::now(),
            respondent_email: String::new(),
            source,
        }
    }

    pub fn word_count(&self) -> usize {
        count_words(&self.source_text)
    }
}

pub fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}
