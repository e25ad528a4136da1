use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::fs;
use tracing::{info, warn};

use crate::config::Config;
use crate::drive::{Drive, FolderInfo};
use crate::error::Result;
use crate::properties::{self, PropertyStore, KNOWN_KEYS};
use crate::triggers::{
    ARCHIVE_TRIGGER_HANDLER, FILE_TRIGGER_HANDLER, FORM_TRIGGER_HANDLER, TriggerRegistry,
};

/// Folder names looked up by [`SetupManager::find_folder_ids`]
pub const WELL_KNOWN_FOLDERS: &[&str] = &["Translated_Docs", "Translation_Context", "Archive", "Source"];

#[derive(Debug, Clone, Default)]
pub struct InitReport {
    pub created_folders: Vec<PathBuf>,
    pub config_written: bool,
}

#[derive(Debug, Clone)]
pub struct FolderCheck {
    pub key: &'static str,
    pub folder_id: Option<String>,
    pub accessible: bool,
}

#[derive(Debug, Clone)]
pub struct SystemStatus {
    /// Every known property key and whether the property store has it
    pub properties: Vec<(&'static str, bool)>,
    /// Settings the workflow cannot run without
    pub missing: Vec<&'static str>,
    pub trigger_counts: Vec<(&'static str, usize)>,
    pub folders: Vec<FolderCheck>,
    pub checked_at: DateTime<Utc>,
}

impl SystemStatus {
    pub fn is_ready(&self) -> bool {
        self.missing.is_empty() && self.folders.iter().all(|f| f.folder_id.is_none() || f.accessible)
    }
}

#[derive(Debug, Clone)]
pub struct FolderLookup {
    pub name: String,
    pub matches: Vec<FolderInfo>,
}

pub struct SetupManager {
    config: Config,
}

impl SetupManager {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Create the drive root folder layout, the state directory and a
    /// default config file. An existing config file is kept unless `force`.
    pub fn init_workspace(&self, config_path: &Path, force: bool) -> Result<InitReport> {
        info!("Initializing workspace under {}", self.config.drive.root.display());
        let mut report = InitReport::default();

        let drive = &self.config.drive;
        let folders = [
            drive.source_folder.as_deref(),
            drive.output_folder.as_deref(),
            drive.archive_folder.as_deref(),
            drive.context_folder.as_deref(),
            self.config.form.inbox_folder.as_deref(),
        ];

        for folder in folders.into_iter().flatten() {
            let path = drive.root.join(folder);
            if !path.is_dir() {
                fs::create_dir_all(&path)?;
                info!("Created folder {}", path.display());
                report.created_folders.push(path);
            }
        }
        fs::create_dir_all(self.config.processing.state_dir.join("log"))?;

        if config_path.exists() && !force {
            warn!("{} already exists, leaving it unchanged", config_path.display());
        } else {
            self.config.save_to_file(config_path)?;
            info!("Wrote {}", config_path.display());
            report.config_written = true;
        }

        Ok(report)
    }

    /// Report property presence, installed triggers and folder accessibility
    pub async fn system_status(&self, props: &PropertyStore, drive: &dyn Drive) -> Result<SystemStatus> {
        let registry = TriggerRegistry::load(&self.config.processing.state_dir)?;
        let trigger_counts = [FILE_TRIGGER_HANDLER, FORM_TRIGGER_HANDLER, ARCHIVE_TRIGGER_HANDLER]
            .into_iter()
            .map(|handler| (handler, registry.for_handler(handler).len()))
            .collect();

        let drive_config = &self.config.drive;
        let mut folders = Vec::new();
        for (key, folder_id) in [
            (properties::SOURCE_FOLDER_ID, &drive_config.source_folder),
            (properties::OUTPUT_FOLDER_ID, &drive_config.output_folder),
            (properties::ARCHIVE_FOLDER_ID, &drive_config.archive_folder),
            (properties::CONTEXT_FOLDER_ID, &drive_config.context_folder),
        ] {
            let accessible = match folder_id.as_deref() {
                Some(id) => drive.folder_exists(id).await,
                None => false,
            };
            folders.push(FolderCheck { key, folder_id: folder_id.clone(), accessible });
        }

        Ok(SystemStatus {
            properties: KNOWN_KEYS.iter().map(|key| (*key, props.is_set(key))).collect(),
            missing: self.config.missing_properties(),
            trigger_counts,
            folders,
            checked_at: Utc::now(),
        })
    }

    /// Look up each well-known folder name under the drive root
    pub async fn find_folder_ids(&self, drive: &dyn Drive) -> Result<Vec<FolderLookup>> {
        let mut lookups = Vec::new();
        for name in WELL_KNOWN_FOLDERS {
            let matches = drive.find_folders_by_name(name).await?;
            if matches.len() > 1 {
                warn!("Multiple folders named {} found", name);
            }
            lookups.push(FolderLookup { name: name.to_string(), matches });
        }
        Ok(lookups)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drive::LocalDrive;

    fn config(root: &Path) -> Config {
        let mut config = Config::default();
        config.drive.root = root.join("drive");
        config.processing.state_dir = root.join(".transflow");
        config
    }

    #[test]
    fn init_creates_layout_and_keeps_existing_config() {
        let dir = tempfile::tempdir().unwrap();
        let manager = SetupManager::new(config(dir.path()));
        let config_path = dir.path().join("transflow.toml");

        let first = manager.init_workspace(&config_path, false).unwrap();
        assert_eq!(first.created_folders.len(), 5);
        assert!(first.config_written);
        assert!(dir.path().join("drive/Translated_Docs").is_dir());
        assert!(dir.path().join(".transflow/log").is_dir());

        let second = manager.init_workspace(&config_path, false).unwrap();
        assert!(second.created_folders.is_empty());
        assert!(!second.config_written);

        let loaded = Config::from_file(&config_path).unwrap();
        assert_eq!(loaded.translation.target_language, "Spanish");
    }

    #[tokio::test]
    async fn status_reports_missing_keys_and_triggers() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        let manager = SetupManager::new(config.clone());
        manager.init_workspace(&dir.path().join("transflow.toml"), false).unwrap();

        let mut registry = TriggerRegistry::load(&config.processing.state_dir).unwrap();
        registry.setup_archive_triggers(&[6, 18]).unwrap();
        registry.save().unwrap();

        let props = PropertyStore::from_pairs([(properties::SOURCE_FOLDER_ID, "Source")]);
        let drive = LocalDrive::new(&config.drive.root);
        let status = manager.system_status(&props, &drive).await.unwrap();

        assert!(status.missing.contains(&properties::OPENAI_API_KEY));
        assert!(!status.is_ready());
        assert!(status.properties.contains(&(properties::SOURCE_FOLDER_ID, true)));
        assert!(status.properties.contains(&(properties::GEMINI_API_KEY, false)));
        assert!(status.trigger_counts.contains(&(ARCHIVE_TRIGGER_HANDLER, 2)));
        assert!(status.folders.iter().all(|f| f.accessible));
    }

    #[tokio::test]
    async fn finds_folders_by_name() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("Archive")).unwrap();
        std::fs::create_dir_all(dir.path().join("old/Archive")).unwrap();
        std::fs::create_dir_all(dir.path().join("Source")).unwrap();

        let manager = SetupManager::new(config(dir.path()));
        let lookups = manager.find_folder_ids(&LocalDrive::new(dir.path())).await.unwrap();

        let count = |name: &str| lookups.iter().find(|l| l.name == name).unwrap().matches.len();
        assert_eq!(count("Archive"), 2);
        assert_eq!(count("Source"), 1);
        assert_eq!(count("Translated_Docs"), 0);
    }
}
