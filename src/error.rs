use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransflowError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing configuration: {0}")]
    MissingConfig(String),

    #[error("Translation provider error: {0}")]
    Provider(String),

    #[error("Drive error: {0}")]
    Drive(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Document error: {0}")]
    Document(String),

    #[error("Tracking sheet error: {0}")]
    Tracking(String),

    #[error("Form submission error: {0}")]
    Form(String),

    #[error("Trigger error: {0}")]
    Trigger(String),
}

pub type Result<T> = std::result::Result<T, TransflowError>;
