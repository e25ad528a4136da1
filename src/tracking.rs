use chrono::SecondsFormat;
use serde::Serialize;
use serde_json::Value;
use std::path::Path;
use tracing::{error, info};

use crate::config::TrackingColumn;
use crate::error::{Result, TransflowError};
use crate::request::{TranslationRequest, count_words};
use crate::sheet::Sheet;
use crate::translate::TranslationResult;

/// Values a tracking column can reference by dot path
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingBundle {
    pub submission_id: String,
    pub submission_timestamp: String,
    pub request_name: String,
    pub content_type: String,
    pub respondent_email: String,
    pub requested_word_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub translated_word_count: Option<usize>,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub provider: String,
    pub model: String,
    pub target_language: String,
    pub glossary_term_count: usize,
    pub definition_term_count: usize,
    pub document_name: String,
    pub document_id: String,
    pub full_response: Value,
}

impl TrackingBundle {
    pub fn new(request: &TranslationRequest, outcome: std::result::Result<&TranslationResult, &str>) -> Self {
        let (status, error, translated_word_count, full_response) = match outcome {
            Ok(result) => ("translated", None, Some(count_words(&result.text)), result.raw_response.clone()),
            Err(message) => ("failed", Some(message.to_string()), None, Value::Null),
        };

        Self {
            submission_id: request.submission_id.clone(),
            submission_timestamp: request.submission_timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
            request_name: request.request_name.clone(),
            content_type: request.content_type.clone(),
            respondent_email: request.respondent_email.clone(),
            requested_word_count: request.word_count(),
            translated_word_count,
            status: status.to_string(),
            error,
            provider: String::new(),
            model: String::new(),
            target_language: String::new(),
            glossary_term_count: 0,
            definition_term_count: 0,
            document_name: String::new(),
            document_id: String::new(),
            full_response,
        }
    }

    pub fn to_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }
}

/// Walk a dot path; any missing segment resolves to an empty string
pub fn resolve_path(bundle: &Value, path: &str) -> String {
    let mut current = bundle;
    for segment in path.split('.') {
        let next = match current {
            Value::Object(map) => map.get(segment),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        };
        match next {
            Some(value) => current = value,
            None => return String::new(),
        }
    }

    match current {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

/// One cell per configured column, in configured order
pub fn build_row(columns: &[TrackingColumn], bundle: &Value) -> Vec<String> {
    columns.iter().map(|column| resolve_path(bundle, &column.path)).collect()
}

/// Appends one row per request to the tracking sheet
pub struct TrackingLogger {
    sheet: Sheet,
    columns: Vec<TrackingColumn>,
}

impl TrackingLogger {
    pub fn new(root: &Path, sheet_id: &str, columns: Vec<TrackingColumn>) -> Result<Self> {
        let sheet = Sheet::open(root, sheet_id).map_err(|e| TransflowError::Tracking(e.to_string()))?;
        Ok(Self { sheet, columns })
    }

    pub fn append(&self, bundle: &TrackingBundle) -> Result<Vec<String>> {
        let row = build_row(&self.columns, &bundle.to_value()?);
        let header: Vec<String> = self.columns.iter().map(|c| c.header.clone()).collect();

        match self.sheet.append_row(&header, &row) {
            Ok(()) => {
                info!("Logged request {} to tracking sheet", bundle.request_name);
                Ok(row)
            }
            Err(e) => {
                error!("Failed to log to tracking sheet {}: {}", self.sheet.path().display(), e);
                Err(TransflowError::Tracking(e.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TrackingConfig;
    use crate::request::RequestSource;
    use serde_json::json;

    fn request() -> TranslationRequest {
        TranslationRequest::new("Test1", "Hello there", RequestSource::Form { form_id: "f".into() })
    }

    fn columns() -> Vec<TrackingColumn> {
        TrackingConfig::default().columns
    }

    #[test]
    fn resolves_nested_paths() {
        let bundle = json!({
            "requestName": "Test1",
            "requestedWordCount": 1,
            "fullResponse": { "usage": { "total_tokens": 42 }, "choices": [{ "index": 0 }] }
        });

        assert_eq!(resolve_path(&bundle, "requestName"), "Test1");
        assert_eq!(resolve_path(&bundle, "requestedWordCount"), "1");
        assert_eq!(resolve_path(&bundle, "fullResponse.usage.total_tokens"), "42");
        assert_eq!(resolve_path(&bundle, "fullResponse.choices.0.index"), "0");
        assert_eq!(resolve_path(&bundle, "fullResponse.usage.missing"), "");
        assert_eq!(resolve_path(&bundle, "requestName.length"), "");
        assert_eq!(resolve_path(&bundle, "fullResponse.usage"), r#"{"total_tokens":42}"#);
    }

    #[test]
    fn row_length_matches_columns_for_failed_request() {
        let bundle = TrackingBundle::new(&request(), Err("provider down")).to_value().unwrap();
        let row = build_row(&columns(), &bundle);

        assert_eq!(row.len(), columns().len());
        let total_tokens = columns().iter().position(|c| c.path == "fullResponse.usage.total_tokens").unwrap();
        assert_eq!(row[total_tokens], "");
    }

    #[test]
    fn row_length_matches_columns_for_successful_request() {
        let result = TranslationResult {
            text: "Hola".to_string(),
            raw_response: json!({ "usage": { "prompt_tokens": 30, "completion_tokens": 2, "total_tokens": 32 } }),
        };
        let mut bundle = TrackingBundle::new(&request(), Ok(&result));
        bundle.glossary_term_count = 3;
        let row = build_row(&columns(), &bundle.to_value().unwrap());

        assert_eq!(row.len(), columns().len());
        assert!(row.contains(&"32".to_string()));
        assert!(row.contains(&"translated".to_string()));
    }

    #[test]
    fn append_writes_header_and_row() {
        let dir = tempfile::tempdir().unwrap();
        let logger = TrackingLogger::new(dir.path(), "tracking.csv", columns()).unwrap();
        let bundle = TrackingBundle::new(&request(), Err("boom"));

        logger.append(&bundle).unwrap();
        logger.append(&bundle).unwrap();

        let rows = Sheet::open(dir.path(), "tracking.csv").unwrap().read_rows().unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0][0], "Timestamp");
        assert!(rows.iter().all(|row| row.len() == columns().len()));
    }

    #[test]
    fn unreachable_sheet_is_a_tracking_error() {
        let dir = tempfile::tempdir().unwrap();
        let logger = TrackingLogger::new(dir.path(), "gone/tracking.csv", columns()).unwrap();

        let err = logger.append(&TrackingBundle::new(&request(), Err("boom"))).unwrap_err();
        assert!(matches!(err, TransflowError::Tracking(_)));
    }

    #[test]
    fn sheet_outside_drive_root_is_a_tracking_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = TrackingLogger::new(dir.path(), "../tracking.csv", columns()).err().unwrap();
        assert!(matches!(err, TransflowError::Tracking(_)));
    }
}
