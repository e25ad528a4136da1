use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tracing::{error, info};

use crate::config::{Config, require};
use crate::drive::Drive;
use crate::error::{Result, TransflowError};
use crate::properties::{ARCHIVE_FOLDER_ID, OUTPUT_FOLDER_ID};

/// Longest retention window accepted, about a century
pub const MAX_DAYS_BEFORE_ARCHIVE: i64 = 36_500;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArchiveReport {
    pub processed: usize,
    pub archived: usize,
    pub failed: usize,
}

/// Moves output documents older than the retention window into the archive folder
pub struct Archiver {
    drive: Arc<dyn Drive>,
    output_folder: String,
    archive_folder: String,
    days_before_archive: i64,
}

impl Archiver {
    pub fn new(config: &Config, drive: Arc<dyn Drive>) -> Result<Self> {
        let days = config.archive.days_before_archive;
        if !(0..=MAX_DAYS_BEFORE_ARCHIVE).contains(&days) {
            return Err(TransflowError::Config(format!(
                "archive.days_before_archive must be between 0 and {}, got {}",
                MAX_DAYS_BEFORE_ARCHIVE, days
            )));
        }

        Ok(Self {
            drive,
            output_folder: require(&config.drive.output_folder, OUTPUT_FOLDER_ID)?.to_string(),
            archive_folder: require(&config.drive.archive_folder, ARCHIVE_FOLDER_ID)?.to_string(),
            days_before_archive: days,
        })
    }

    pub fn threshold(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - Duration::days(self.days_before_archive)
    }

    /// Archive every output document created strictly before the threshold
    pub async fn archive_old_documents(&self, now: DateTime<Utc>) -> Result<ArchiveReport> {
        let cutoff = self.threshold(now);
        info!("Archiving documents created before {}", cutoff.to_rfc3339());

        let files = self.drive.list_files(&self.output_folder).await?;
        let mut report = ArchiveReport::default();

        for file in files {
            report.processed += 1;
            if file.created >= cutoff {
                continue;
            }

            match self.drive.move_to(&file, &self.archive_folder).await {
                Ok(moved) => {
                    report.archived += 1;
                    info!("Archived: {} -> {}", file.name, moved.id);
                }
                Err(e) => {
                    report.failed += 1;
                    error!("Error archiving {}: {}", file.name, e);
                }
            }
        }

        info!(
            "Archive complete. Processed {} files, archived {}, failed {}",
            report.processed, report.archived, report.failed
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drive::{DriveFile, FolderInfo, LocalDrive};
    use async_trait::async_trait;

    /// Local drive whose moves fail for one file id
    struct FlakyDrive {
        inner: LocalDrive,
        broken_id: String,
    }

    #[async_trait]
    impl Drive for FlakyDrive {
        async fn folder_exists(&self, folder_id: &str) -> bool {
            self.inner.folder_exists(folder_id).await
        }
        async fn list_files(&self, folder_id: &str) -> Result<Vec<DriveFile>> {
            self.inner.list_files(folder_id).await
        }
        async fn get_file(&self, file_id: &str) -> Result<DriveFile> {
            self.inner.get_file(file_id).await
        }
        async fn read_text(&self, file: &DriveFile) -> Result<String> {
            self.inner.read_text(file).await
        }
        async fn set_description(&self, file: &DriveFile, description: &str) -> Result<DriveFile> {
            self.inner.set_description(file, description).await
        }
        async fn create_document(&self, title: &str, content: &str) -> Result<DriveFile> {
            self.inner.create_document(title, content).await
        }
        async fn move_to(&self, file: &DriveFile, folder_id: &str) -> Result<DriveFile> {
            if file.id == self.broken_id {
                return Err(TransflowError::Drive("permission denied".to_string()));
            }
            self.inner.move_to(file, folder_id).await
        }
        async fn find_folders_by_name(&self, name: &str) -> Result<Vec<FolderInfo>> {
            self.inner.find_folders_by_name(name).await
        }
    }

    async fn seed(drive: &LocalDrive, title: &str, age: Duration, now: DateTime<Utc>) -> DriveFile {
        let created = drive.create_document(title, "body").await.unwrap();
        let moved = drive.move_to(&created, "Translated_Docs").await.unwrap();
        drive.set_created_at(&moved, now - age).await.unwrap()
    }

    fn workspace() -> (tempfile::TempDir, Config) {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("Translated_Docs")).unwrap();
        std::fs::create_dir_all(dir.path().join("Archive")).unwrap();
        let mut config = Config::default();
        config.drive.root = dir.path().to_path_buf();
        (dir, config)
    }

    #[tokio::test]
    async fn moves_only_documents_older_than_threshold() {
        let (dir, config) = workspace();
        let drive = Arc::new(LocalDrive::new(dir.path()));
        let now = Utc::now();
        seed(&drive, "Old letter - Translated to Spanish", Duration::hours(25), now).await;
        seed(&drive, "Fresh letter - Translated to Spanish", Duration::hours(1), now).await;

        let archiver = Archiver::new(&config, drive.clone()).unwrap();
        let report = archiver.archive_old_documents(now).await.unwrap();

        assert_eq!(report, ArchiveReport { processed: 2, archived: 1, failed: 0 });
        let archived = drive.list_files("Archive").await.unwrap();
        assert_eq!(archived.len(), 1);
        assert_eq!(archived[0].name, "Old letter - Translated to Spanish");
        let remaining = drive.list_files("Translated_Docs").await.unwrap();
        assert_eq!(remaining[0].name, "Fresh letter - Translated to Spanish");
    }

    #[tokio::test]
    async fn failed_move_does_not_stop_the_scan() {
        let (dir, config) = workspace();
        let local = LocalDrive::new(dir.path());
        let now = Utc::now();
        let broken = seed(&local, "A", Duration::days(3), now).await;
        seed(&local, "B", Duration::days(3), now).await;

        let drive = Arc::new(FlakyDrive { inner: local, broken_id: broken.id.clone() });
        let archiver = Archiver::new(&config, drive.clone()).unwrap();
        let report = archiver.archive_old_documents(now).await.unwrap();

        assert_eq!(report.archived, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(drive.list_files("Archive").await.unwrap()[0].name, "B");
    }

    #[test]
    fn requires_archive_folder() {
        let (dir, mut config) = workspace();
        config.drive.archive_folder = Some("  ".to_string());
        let drive = Arc::new(LocalDrive::new(dir.path()));

        let err = Archiver::new(&config, drive).err().unwrap();
        assert!(matches!(err, TransflowError::MissingConfig(key) if key == ARCHIVE_FOLDER_ID));
    }

    #[test]
    fn retention_window_must_be_in_range() {
        let (dir, mut config) = workspace();
        let drive: Arc<dyn Drive> = Arc::new(LocalDrive::new(dir.path()));

        for days in [-1, MAX_DAYS_BEFORE_ARCHIVE + 1, i64::MAX] {
            config.archive.days_before_archive = days;
            let err = Archiver::new(&config, drive.clone()).err().unwrap();
            assert!(matches!(err, TransflowError::Config(_)), "days = {}", days);
        }

        config.archive.days_before_archive = 0;
        let archiver = Archiver::new(&config, drive).unwrap();
        let now = Utc::now();
        assert_eq!(archiver.threshold(now), now);
    }

    #[test]
    fn threshold_uses_whole_days() {
        let (dir, mut config) = workspace();
        config.archive.days_before_archive = 7;
        let archiver = Archiver::new(&config, Arc::new(LocalDrive::new(dir.path()))).unwrap();

        let now = Utc::now();
        assert_eq!(now - archiver.threshold(now), Duration::days(7));
    }
}
