use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Result, TransflowError};
use crate::properties::{self, PropertyStore};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub translation: TranslationConfig,
    pub providers: ProvidersConfig,
    pub drive: DriveConfig,
    pub prompt: PromptConfig,
    pub form: FormConfig,
    pub tracking: TrackingConfig,
    pub archive: ArchiveConfig,
    pub processing: ProcessingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslationConfig {
    /// Language every request is translated into
    pub target_language: String,
    /// Which provider backend handles requests
    pub provider: ProviderKind,
    /// Model name sent to the provider (ignored by Azure, which routes by deployment)
    pub model: String,
    /// Maximum output tokens
    pub max_tokens: u32,
    /// Sampling temperature
    pub temperature: f32,
    /// Layout of the generated document
    pub document_layout: DocumentLayout,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// OpenAI chat completions
    OpenAi,
    /// Azure-hosted OpenAI deployment
    Azure,
    /// Google Gemini generateContent
    Gemini,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentLayout {
    /// Translated text only
    Flat,
    /// Headed sections: translated text, original text, model, prompt
    Structured,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvidersConfig {
    /// HTTP timeout for a single provider call, in seconds
    pub request_timeout_secs: u64,
    pub openai: OpenAiConfig,
    pub azure: AzureConfig,
    pub gemini: GeminiConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAiConfig {
    pub base_url: String,
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AzureConfig {
    /// Resource endpoint, e.g. https://my-resource.openai.azure.com
    pub endpoint: Option<String>,
    pub deployment: Option<String>,
    pub api_version: String,
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeminiConfig {
    pub base_url: String,
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DriveConfig {
    /// Directory every folder and sheet id is resolved against
    pub root: PathBuf,
    pub source_folder: Option<String>,
    pub output_folder: Option<String>,
    pub archive_folder: Option<String>,
    pub context_folder: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptConfig {
    /// Name of the template document in the context folder
    pub document_name: String,
    /// Optional `[TAB: name]` section of the template to use
    pub tab: Option<String>,
    /// Sheet with `term,translation` rows
    pub glossary_sheet: Option<String>,
    /// Sheet with `term,source definition,target definition` rows
    pub terms_sheet: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FormConfig {
    pub form_id: Option<String>,
    pub text_item_label: String,
    pub request_name_item_label: String,
    pub content_type_item_label: String,
    pub email_item_label: String,
    /// Folder watched for submission event files while serving
    pub inbox_folder: Option<String>,
    pub inbox_poll_seconds: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackingColumn {
    /// Header label written on the first row
    pub header: String,
    /// Dot path into the request/result bundle
    pub path: String,
}

impl TrackingColumn {
    pub fn new(header: &str, path: &str) -> Self {
        Self {
            header: header.to_string(),
            path: path.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    pub sheet: Option<String>,
    pub columns: Vec<TrackingColumn>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveConfig {
    pub days_before_archive: i64,
    /// Hours of the day (0-23) the archiver fires
    pub hours: Vec<u32>,
    /// IANA time zone the hours are interpreted in
    pub timezone: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    /// Substring appended to a file description once it has been handled
    pub processed_marker: String,
    pub poll_interval_minutes: u64,
    /// Where logs and the trigger registry are kept
    pub state_dir: PathBuf,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            target_language: "Spanish".to_string(),
            provider: ProviderKind::OpenAi,
            model: "gpt-4o".to_string(),
            max_tokens: 2000,
            temperature: 0.3,
            document_layout: DocumentLayout::Structured,
        }
    }
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 300,
            openai: OpenAiConfig::default(),
            azure: AzureConfig::default(),
            gemini: GeminiConfig::default(),
        }
    }
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com".to_string(),
            api_key: None,
        }
    }
}

impl Default for AzureConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            deployment: None,
            api_version: "2024-06-01".to_string(),
            api_key: None,
        }
    }
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            api_key: None,
        }
    }
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("drive"),
            source_folder: Some("Source".to_string()),
            output_folder: Some("Translated_Docs".to_string()),
            archive_folder: Some("Archive".to_string()),
            context_folder: Some("Translation_Context".to_string()),
        }
    }
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            document_name: "Translation Prompt".to_string(),
            tab: None,
            glossary_sheet: None,
            terms_sheet: None,
        }
    }
}

impl Default for FormConfig {
    fn default() -> Self {
        Self {
            form_id: None,
            text_item_label: "Please enter the text you want to translate".to_string(),
            request_name_item_label: "Translation Request Name".to_string(),
            content_type_item_label: "What is the type of content you want to translate?".to_string(),
            email_item_label: "Email Address".to_string(),
            inbox_folder: Some("Form_Inbox".to_string()),
            inbox_poll_seconds: 30,
        }
    }
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            sheet: None,
            columns: vec![
                TrackingColumn::new("Timestamp", "submissionTimestamp"),
                TrackingColumn::new("Request Name", "requestName"),
                TrackingColumn::new("Content Type", "contentType"),
                TrackingColumn::new("Respondent Email", "respondentEmail"),
                TrackingColumn::new("Requested Word Count", "requestedWordCount"),
                TrackingColumn::new("Translated Word Count", "translatedWordCount"),
                TrackingColumn::new("Status", "status"),
                TrackingColumn::new("Provider", "provider"),
                TrackingColumn::new("Model", "model"),
                TrackingColumn::new("Glossary Terms", "glossaryTermCount"),
                TrackingColumn::new("Document", "documentName"),
                TrackingColumn::new("Prompt Tokens", "fullResponse.usage.prompt_tokens"),
                TrackingColumn::new("Completion Tokens", "fullResponse.usage.completion_tokens"),
                TrackingColumn::new("Total Tokens", "fullResponse.usage.total_tokens"),
            ],
        }
    }
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            days_before_archive: 1,
            hours: vec![6, 18],
            timezone: "America/Phoenix".to_string(),
        }
    }
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            processed_marker: "TRANSLATED".to_string(),
            poll_interval_minutes: 5,
            state_dir: PathBuf::from(".transflow"),
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| TransflowError::Config(format!("Failed to read config file: {}", e)))?;

        toml::from_str(&content)
            .map_err(|e| TransflowError::Config(format!("Failed to parse config file: {}", e)))
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| TransflowError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| TransflowError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    /// Overlay resource ids and secrets from the property store
    pub fn apply_properties(&mut self, props: &PropertyStore) {
        let overlay = |target: &mut Option<String>, key: &str| {
            if let Some(value) = props.get(key) {
                *target = Some(value.to_string());
            }
        };

        overlay(&mut self.drive.source_folder, properties::SOURCE_FOLDER_ID);
        overlay(&mut self.drive.output_folder, properties::OUTPUT_FOLDER_ID);
        overlay(&mut self.drive.archive_folder, properties::ARCHIVE_FOLDER_ID);
        overlay(&mut self.drive.context_folder, properties::CONTEXT_FOLDER_ID);
        overlay(&mut self.form.form_id, properties::TRANSLATION_FORM_ID);
        overlay(&mut self.tracking.sheet, properties::TRACKING_SHEET_ID);
        overlay(&mut self.prompt.glossary_sheet, properties::GLOSSARY_SHEET_ID);
        overlay(&mut self.prompt.terms_sheet, properties::TERMS_SHEET_ID);
        overlay(&mut self.providers.openai.api_key, properties::OPENAI_API_KEY);
        overlay(&mut self.providers.azure.api_key, properties::AZURE_OPENAI_API_KEY);
        overlay(&mut self.providers.azure.endpoint, properties::AZURE_OPENAI_ENDPOINT);
        overlay(&mut self.providers.azure.deployment, properties::AZURE_OPENAI_DEPLOYMENT);
        overlay(&mut self.providers.gemini.api_key, properties::GEMINI_API_KEY);
    }

    /// Keys the translation workflow cannot run without, given the selected provider
    pub fn missing_properties(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();

        if is_blank(&self.drive.output_folder) {
            missing.push(properties::OUTPUT_FOLDER_ID);
        }
        if is_blank(&self.drive.context_folder) {
            missing.push(properties::CONTEXT_FOLDER_ID);
        }

        match self.translation.provider {
            ProviderKind::OpenAi => {
                if is_blank(&self.providers.openai.api_key) {
                    missing.push(properties::OPENAI_API_KEY);
                }
            }
            ProviderKind::Azure => {
                if is_blank(&self.providers.azure.api_key) {
                    missing.push(properties::AZURE_OPENAI_API_KEY);
                }
                if is_blank(&self.providers.azure.endpoint) {
                    missing.push(properties::AZURE_OPENAI_ENDPOINT);
                }
                if is_blank(&self.providers.azure.deployment) {
                    missing.push(properties::AZURE_OPENAI_DEPLOYMENT);
                }
            }
            ProviderKind::Gemini => {
                if is_blank(&self.providers.gemini.api_key) {
                    missing.push(properties::GEMINI_API_KEY);
                }
            }
        }

        missing
    }
}

/// Resolve a required setting or report which property is missing
pub fn require<'a>(value: &'a Option<String>, key: &str) -> Result<&'a str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| TransflowError::MissingConfig(key.to_string()))
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |v| v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
            [translation]
            provider = "gemini"
            model = "gemini-2.5-flash"

            [archive]
            days_before_archive = 3
            "#,
        )
        .unwrap();

        assert_eq!(config.translation.provider, ProviderKind::Gemini);
        assert_eq!(config.translation.target_language, "Spanish");
        assert_eq!(config.archive.days_before_archive, 3);
        assert_eq!(config.archive.hours, vec![6, 18]);
        assert_eq!(config.processing.processed_marker, "TRANSLATED");
    }

    #[test]
    fn properties_override_settings() {
        let mut config = Config::default();
        let props = PropertyStore::from_pairs([
            (properties::OUTPUT_FOLDER_ID, "Out"),
            (properties::OPENAI_API_KEY, "sk-123"),
        ]);

        config.apply_properties(&props);

        assert_eq!(config.drive.output_folder.as_deref(), Some("Out"));
        assert_eq!(config.providers.openai.api_key.as_deref(), Some("sk-123"));
        assert_eq!(config.drive.source_folder.as_deref(), Some("Source"));
    }

    #[test]
    fn missing_properties_follow_provider() {
        let mut config = Config::default();
        assert_eq!(config.missing_properties(), vec![properties::OPENAI_API_KEY]);

        config.translation.provider = ProviderKind::Azure;
        config.providers.azure.api_key = Some("key".to_string());
        assert_eq!(
            config.missing_properties(),
            vec![properties::AZURE_OPENAI_ENDPOINT, properties::AZURE_OPENAI_DEPLOYMENT]
        );

        config.drive.output_folder = Some(" ".to_string());
        assert!(config.missing_properties().contains(&properties::OUTPUT_FOLDER_ID));
    }

    #[test]
    fn require_reports_key() {
        let err = require(&None, properties::TRACKING_SHEET_ID).unwrap_err();
        assert!(matches!(err, TransflowError::MissingConfig(key) if key == "TRACKING_SHEET_ID"));
        assert_eq!(require(&Some("Log.csv".to_string()), "X").unwrap(), "Log.csv");
    }

    #[test]
    fn config_round_trips_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("transflow.toml");
        let mut config = Config::default();
        config.translation.document_layout = DocumentLayout::Flat;
        config.save_to_file(&path).unwrap();

        let loaded = Config::from_file(&path).unwrap();
        assert_eq!(loaded.translation.document_layout, DocumentLayout::Flat);
        assert_eq!(loaded.tracking.columns, config.tracking.columns);
    }
}
