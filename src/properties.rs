//! Key-value store for secrets and resource identifiers.
//!
//! Values come from the process environment, optionally seeded from a
//! `.env` file in the working directory. Static settings live in the TOML
//! [`Config`](crate::config::Config); anything read from here overrides them.

use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

use crate::error::{Result, TransflowError};

pub const SOURCE_FOLDER_ID: &str = "SOURCE_FOLDER_ID";
pub const OUTPUT_FOLDER_ID: &str = "OUTPUT_FOLDER_ID";
pub const ARCHIVE_FOLDER_ID: &str = "ARCHIVE_FOLDER_ID";
pub const CONTEXT_FOLDER_ID: &str = "CONTEXT_FOLDER_ID";
pub const TRANSLATION_FORM_ID: &str = "TRANSLATION_FORM_ID";
pub const TRACKING_SHEET_ID: &str = "TRACKING_SHEET_ID";
pub const GLOSSARY_SHEET_ID: &str = "GLOSSARY_SHEET_ID";
pub const TERMS_SHEET_ID: &str = "TERMS_SHEET_ID";
pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";
pub const AZURE_OPENAI_API_KEY: &str = "AZURE_OPENAI_API_KEY";
pub const AZURE_OPENAI_ENDPOINT: &str = "AZURE_OPENAI_ENDPOINT";
pub const AZURE_OPENAI_DEPLOYMENT: &str = "AZURE_OPENAI_DEPLOYMENT";
pub const GEMINI_API_KEY: &str = "GEMINI_API_KEY";

/// Every key the workflow reads from the store
pub const KNOWN_KEYS: &[&str] = &[
    SOURCE_FOLDER_ID,
    OUTPUT_FOLDER_ID,
    ARCHIVE_FOLDER_ID,
    CONTEXT_FOLDER_ID,
    TRANSLATION_FORM_ID,
    TRACKING_SHEET_ID,
    GLOSSARY_SHEET_ID,
    TERMS_SHEET_ID,
    OPENAI_API_KEY,
    AZURE_OPENAI_API_KEY,
    AZURE_OPENAI_ENDPOINT,
    AZURE_OPENAI_DEPLOYMENT,
    GEMINI_API_KEY,
];

#[derive(Debug, Clone, Default)]
pub struct PropertyStore {
    values: HashMap<String, String>,
}

impl PropertyStore {
    /// Load known keys from the environment after applying `.env`, if present
    pub fn from_env() -> Self {
        match dotenvy::dotenv() {
            Ok(path) => debug!("Loaded properties from {}", path.display()),
            Err(e) => debug!("No .env file loaded: {}", e),
        }

        let values = KNOWN_KEYS
            .iter()
            .filter_map(|key| std::env::var(key).ok().map(|value| (key.to_string(), value)))
            .collect();

        Self { values }
    }

    /// Load properties from a dotenv-formatted file without touching the environment
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let iter = dotenvy::from_path_iter(path).map_err(|e| {
            TransflowError::Config(format!("Failed to read properties file {}: {}", path.display(), e))
        })?;

        let mut values = HashMap::new();
        for item in iter {
            let (key, value) = item.map_err(|e| {
                TransflowError::Config(format!("Invalid line in {}: {}", path.display(), e))
            })?;
            values.insert(key, value);
        }

        Ok(Self { values })
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            values: pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }

    /// Returns the value for `key`, treating blank values as unset
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn is_set(&self, key: &str) -> bool {
        self.get(key).is_some()
    }
}
