use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tracing::debug;
use walkdir::WalkDir;

use crate::error::{Result, TransflowError};
use super::{Drive, DriveFile, FolderInfo};

/// Sidecar metadata stored next to each file as `.NAME.meta.json`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Join a drive id onto `root`; ids with `..`, a root or a prefix are rejected
pub fn resolve_id(root: &Path, id: &str) -> Result<PathBuf> {
    let relative = Path::new(id);
    let escapes = relative
        .components()
        .any(|c| matches!(c, Component::ParentDir | Component::RootDir | Component::Prefix(_)));
    if escapes {
        return Err(TransflowError::Drive(format!("Invalid drive id: {}", id)));
    }
    Ok(root.join(relative))
}

/// Drive backed by a local directory tree
pub struct LocalDrive {
    root: PathBuf,
}

impl LocalDrive {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve an id relative to the root, rejecting ids that escape it
    pub fn resolve(&self, id: &str) -> Result<PathBuf> {
        resolve_id(&self.root, id)
    }

    /// Overwrite the recorded creation timestamp of a file
    pub async fn set_created_at(&self, file: &DriveFile, created_at: DateTime<Utc>) -> Result<DriveFile> {
        let mut metadata = read_metadata(&file.path).await;
        metadata.created_at = Some(created_at);
        write_metadata(&file.path, &metadata).await?;
        self.load_file(&file.path).await
    }

    fn relative_id(&self, path: &Path) -> String {
        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("/")
    }

    async fn load_file(&self, path: &Path) -> Result<DriveFile> {
        let fs_metadata = fs::metadata(path)
            .await
            .map_err(|_| TransflowError::FileNotFound(path.display().to_string()))?;
        if !fs_metadata.is_file() {
            return Err(TransflowError::FileNotFound(path.display().to_string()));
        }

        let metadata = read_metadata(path).await;
        let created = match metadata.created_at {
            Some(created) => created,
            None => fs_metadata
                .created()
                .or_else(|_| fs_metadata.modified())
                .map(DateTime::<Utc>::from)
                .unwrap_or_else(|_| Utc::now()),
        };

        let name = metadata.name.unwrap_or_else(|| {
            path.file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_default()
        });

        let folder = path
            .parent()
            .map(|parent| self.relative_id(parent))
            .unwrap_or_default();

        Ok(DriveFile {
            id: self.relative_id(path),
            name,
            folder,
            path: path.to_path_buf(),
            created,
            description: metadata.description,
        })
    }
}

#[async_trait]
impl Drive for LocalDrive {
    async fn folder_exists(&self, folder_id: &str) -> bool {
        match self.resolve(folder_id) {
            Ok(path) => fs::metadata(&path).await.map(|m| m.is_dir()).unwrap_or(false),
            Err(_) => false,
        }
    }

    async fn list_files(&self, folder_id: &str) -> Result<Vec<DriveFile>> {
        let folder = self.resolve(folder_id)?;
        let mut entries = fs::read_dir(&folder)
            .await
            .map_err(|e| TransflowError::Drive(format!("Cannot open folder {}: {}", folder_id, e)))?;

        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let hidden = entry.file_name().to_string_lossy().starts_with('.');
            if hidden || !entry.file_type().await?.is_file() {
                continue;
            }
            files.push(self.load_file(&path).await?);
        }

        files.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(files)
    }

    async fn get_file(&self, file_id: &str) -> Result<DriveFile> {
        let path = self.resolve(file_id)?;
        self.load_file(&path).await
    }

    async fn read_text(&self, file: &DriveFile) -> Result<String> {
        fs::read_to_string(&file.path)
            .await
            .map_err(|e| TransflowError::Drive(format!("Failed to read {}: {}", file.id, e)))
    }

    async fn set_description(&self, file: &DriveFile, description: &str) -> Result<DriveFile> {
        let mut metadata = read_metadata(&file.path).await;
        metadata.description = description.to_string();
        write_metadata(&file.path, &metadata).await?;
        self.load_file(&file.path).await
    }

    async fn create_document(&self, title: &str, content: &str) -> Result<DriveFile> {
        fs::create_dir_all(&self.root).await?;

        let file_name = format!("{}.md", sanitize_filename::sanitize(title));
        let path = unique_path(&self.root, &file_name).await;

        fs::write(&path, content).await?;
        let metadata = FileMetadata {
            name: Some(title.to_string()),
            description: String::new(),
            created_at: Some(Utc::now()),
        };
        write_metadata(&path, &metadata).await?;

        debug!("Created document {} at {}", title, path.display());
        self.load_file(&path).await
    }

    async fn move_to(&self, file: &DriveFile, folder_id: &str) -> Result<DriveFile> {
        let folder = self.resolve(folder_id)?;
        if !fs::metadata(&folder).await.map(|m| m.is_dir()).unwrap_or(false) {
            return Err(TransflowError::Drive(format!("Folder not found: {}", folder_id)));
        }

        let file_name = file
            .path
            .file_name()
            .ok_or_else(|| TransflowError::Drive(format!("Invalid file path: {}", file.path.display())))?
            .to_string_lossy()
            .into_owned();
        let destination = unique_path(&folder, &file_name).await;

        fs::rename(&file.path, &destination).await.map_err(|e| {
            TransflowError::Drive(format!("Failed to move {} to {}: {}", file.id, folder_id, e))
        })?;

        let sidecar = sidecar_path(&file.path);
        if fs::metadata(&sidecar).await.is_ok() {
            fs::rename(&sidecar, sidecar_path(&destination)).await?;
        }

        self.load_file(&destination).await
    }

    async fn find_folders_by_name(&self, name: &str) -> Result<Vec<FolderInfo>> {
        let mut folders = Vec::new();

        for entry in WalkDir::new(&self.root).min_depth(1).into_iter().filter_map(|e| e.ok()) {
            if !entry.file_type().is_dir() || entry.file_name().to_string_lossy() != name {
                continue;
            }
            let created = entry
                .metadata()
                .ok()
                .and_then(|m| m.created().or_else(|_| m.modified()).ok())
                .map(DateTime::<Utc>::from);

            folders.push(FolderInfo {
                id: self.relative_id(entry.path()),
                name: name.to_string(),
                created,
            });
        }

        Ok(folders)
    }
}

fn sidecar_path(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{}.meta.json", file_name))
}

async fn read_metadata(path: &Path) -> FileMetadata {
    match fs::read_to_string(sidecar_path(path)).await {
        Ok(content) => serde_json::from_str(&content).unwrap_or_default(),
        Err(_) => FileMetadata::default(),
    }
}

async fn write_metadata(path: &Path, metadata: &FileMetadata) -> Result<()> {
    let content = serde_json::to_string_pretty(metadata)?;
    fs::write(sidecar_path(path), content).await?;
    Ok(())
}

/// Pick `name`, or `stem (n).ext` when the name is already taken
async fn unique_path(folder: &Path, file_name: &str) -> PathBuf {
    let candidate = folder.join(file_name);
    if fs::metadata(&candidate).await.is_err() {
        return candidate;
    }

    let original = Path::new(file_name);
    let stem = original
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let extension = original.extension().map(|e| e.to_string_lossy().into_owned());

    let mut counter = 2;
    loop {
        let numbered = match &extension {
            Some(ext) => format!("{} ({}).{}", stem, counter, ext),
            None => format!("{} ({})", stem, counter),
        };
        let candidate = folder.join(numbered);
        if fs::metadata(&candidate).await.is_err() {
            return candidate;
        }
        counter += 1;
    }
}
