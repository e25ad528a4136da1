//! Installed triggers.
//!
//! A trigger binds a handler name to a schedule. Handler names are the
//! de-duplication key: installing a handler first removes every trigger
//! already registered under the same name. The registry is a JSON file in
//! the state directory and is executed by the `serve` scheduler.

use chrono::{DateTime, Duration, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{Result, TransflowError};

/// Polls the source folder for new documents
pub const FILE_TRIGGER_HANDLER: &str = "translateOnFileAdded";
/// Dispatches form submission events
pub const FORM_TRIGGER_HANDLER: &str = "translateOnFormSubmission";
/// Moves old output documents into the archive folder
pub const ARCHIVE_TRIGGER_HANDLER: &str = "archiveOldDocuments";

const REGISTRY_FILE: &str = "triggers.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TriggerSchedule {
    EveryMinutes { minutes: u64 },
    /// Once a day at the given hour in the configured time zone
    AtHour { hour: u32 },
    FormSubmit { form_id: String },
}

impl std::fmt::Display for TriggerSchedule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TriggerSchedule::EveryMinutes { minutes } => write!(f, "every {} minutes", minutes),
            TriggerSchedule::AtHour { hour } => write!(f, "daily at {:02}:00", hour),
            TriggerSchedule::FormSubmit { form_id } => write!(f, "on submit of form {}", form_id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trigger {
    pub id: Uuid,
    pub handler: String,
    pub schedule: TriggerSchedule,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct RegistryFile {
    triggers: Vec<Trigger>,
}

pub struct TriggerRegistry {
    path: PathBuf,
    triggers: Vec<Trigger>,
}

impl TriggerRegistry {
    /// Load the registry from `state_dir`; a missing file is an empty registry
    pub fn load(state_dir: &Path) -> Result<Self> {
        let path = state_dir.join(REGISTRY_FILE);
        let triggers = if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            let file: RegistryFile = serde_json::from_str(&content)
                .map_err(|e| TransflowError::Trigger(format!("Corrupt trigger registry {}: {}", path.display(), e)))?;
            file.triggers
        } else {
            Vec::new()
        };

        debug!("Loaded {} triggers from {}", triggers.len(), path.display());
        Ok(Self { path, triggers })
    }

    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = RegistryFile { triggers: self.triggers.clone() };
        std::fs::write(&self.path, serde_json::to_string_pretty(&file)?)?;
        Ok(())
    }

    pub fn triggers(&self) -> &[Trigger] {
        &self.triggers
    }

    pub fn for_handler(&self, handler: &str) -> Vec<&Trigger> {
        self.triggers.iter().filter(|t| t.handler == handler).collect()
    }

    pub fn install(&mut self, handler: &str, schedule: TriggerSchedule) -> &Trigger {
        info!("Installing trigger {} ({})", handler, schedule);
        self.triggers.push(Trigger {
            id: Uuid::new_v4(),
            handler: handler.to_string(),
            schedule,
            created_at: Utc::now(),
        });
        &self.triggers[self.triggers.len() - 1]
    }

    /// Remove every trigger registered for `handler`, returning how many went
    pub fn remove_handler(&mut self, handler: &str) -> usize {
        let before = self.triggers.len();
        self.triggers.retain(|t| t.handler != handler);
        let removed = before - self.triggers.len();
        if removed > 0 {
            info!("Removed {} existing {} trigger(s)", removed, handler);
        }
        removed
    }

    /// Replace the source folder poll with one that fires every `minutes`
    pub fn setup_file_trigger(&mut self, minutes: u64) -> Result<()> {
        if minutes == 0 {
            return Err(TransflowError::Trigger("Poll interval must be at least one minute".to_string()));
        }
        self.remove_handler(FILE_TRIGGER_HANDLER);
        self.install(FILE_TRIGGER_HANDLER, TriggerSchedule::EveryMinutes { minutes });
        Ok(())
    }

    /// Replace the archive triggers with one daily trigger per hour
    pub fn setup_archive_triggers(&mut self, hours: &[u32]) -> Result<()> {
        if let Some(hour) = hours.iter().find(|h| **h > 23) {
            return Err(TransflowError::Trigger(format!("Invalid archive hour: {}", hour)));
        }
        self.remove_handler(ARCHIVE_TRIGGER_HANDLER);
        for hour in hours {
            self.install(ARCHIVE_TRIGGER_HANDLER, TriggerSchedule::AtHour { hour: *hour });
        }
        Ok(())
    }

    pub fn setup_form_trigger(&mut self, form_id: &str) {
        self.remove_handler(FORM_TRIGGER_HANDLER);
        self.install(FORM_TRIGGER_HANDLER, TriggerSchedule::FormSubmit { form_id: form_id.to_string() });
    }
}

pub fn parse_timezone(name: &str) -> Result<Tz> {
    name.parse::<Tz>()
        .map_err(|e| TransflowError::Trigger(format!("Unknown time zone '{}': {}", name, e)))
}

/// Next instant strictly after `now` at `hour:00` local time in `tz`
pub fn next_daily_run(now: DateTime<Utc>, hour: u32, tz: Tz) -> Result<DateTime<Utc>> {
    let time = NaiveTime::from_hms_opt(hour, 0, 0)
        .ok_or_else(|| TransflowError::Trigger(format!("Invalid hour: {}", hour)))?;
    let today = now.with_timezone(&tz).date_naive();

    // Two days covers a run time skipped by a DST gap
    for offset in 0..=2 {
        let date = today + Duration::days(offset);
        if let Some(local) = tz.from_local_datetime(&date.and_time(time)).earliest() {
            let candidate = local.with_timezone(&Utc);
            if candidate > now {
                return Ok(candidate);
            }
        }
    }

    Err(TransflowError::Trigger(format!("No upcoming run at {:02}:00 in {}", hour, tz)))
}
