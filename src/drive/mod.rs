// Storage abstraction for folders, documents and file metadata
//
// - Local: directories under a drive root, with per-file JSON sidecars that
//   carry the display name, description and creation timestamp

pub mod local;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub use local::*;

use crate::config::DriveConfig;
use crate::error::Result;

/// Extensions treated as translatable text documents
pub const TEXT_DOCUMENT_EXTENSIONS: &[&str] = &["txt", "md"];

/// A file stored in a drive folder
#[derive(Debug, Clone, PartialEq)]
pub struct DriveFile {
    /// Path relative to the drive root, `/`-separated
    pub id: String,
    /// Display name (document title)
    pub name: String,
    /// Id of the containing folder; empty for the root
    pub folder: String,
    pub path: PathBuf,
    pub created: DateTime<Utc>,
    pub description: String,
}

impl DriveFile {
    pub fn is_text_document(&self) -> bool {
        is_text_document(&self.path)
    }

    pub fn has_marker(&self, marker: &str) -> bool {
        !marker.is_empty() && self.description.contains(marker)
    }
}

/// A folder located by name
#[derive(Debug, Clone)]
pub struct FolderInfo {
    pub id: String,
    pub name: String,
    pub created: Option<DateTime<Utc>>,
}

pub fn is_text_document(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| TEXT_DOCUMENT_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Main trait for drive operations
#[async_trait]
pub trait Drive: Send + Sync {
    /// Check whether a folder id resolves to an existing folder
    async fn folder_exists(&self, folder_id: &str) -> bool;

    /// List the files directly inside a folder
    async fn list_files(&self, folder_id: &str) -> Result<Vec<DriveFile>>;

    /// Look up a single file by id
    async fn get_file(&self, file_id: &str) -> Result<DriveFile>;

    /// Read a file's text content
    async fn read_text(&self, file: &DriveFile) -> Result<String>;

    /// Replace a file's description
    async fn set_description(&self, file: &DriveFile, description: &str) -> Result<DriveFile>;

    /// Create a document in the drive root
    async fn create_document(&self, title: &str, content: &str) -> Result<DriveFile>;

    /// Move a file into another folder
    async fn move_to(&self, file: &DriveFile, folder_id: &str) -> Result<DriveFile>;

    /// Find every folder with the given name
    async fn find_folders_by_name(&self, name: &str) -> Result<Vec<FolderInfo>>;
}

/// Factory for creating drive instances
pub struct DriveFactory;

impl DriveFactory {
    pub fn create(config: &DriveConfig) -> Arc<dyn Drive> {
        Arc::new(LocalDrive::new(&config.root))
    }
}

/// Append the processed marker to a file description
pub async fn mark_as_processed(drive: &dyn Drive, file: &DriveFile, marker: &str) -> Result<DriveFile> {
    let description = format!("{} {}", file.description, marker);
    drive.set_description(file, &description).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_text_documents() {
        assert!(is_text_document(Path::new("Source/letter.txt")));
        assert!(is_text_document(Path::new("Source/Notice.MD")));
        assert!(!is_text_document(Path::new("Source/scan.pdf")));
        assert!(!is_text_document(Path::new("Source/README")));
    }
}
