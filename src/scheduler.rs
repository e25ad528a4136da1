use chrono::Utc;
use chrono_tz::Tz;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::archive::Archiver;
use crate::error::Result;
use crate::form::FormSubmitEvent;
use crate::triggers::{
    ARCHIVE_TRIGGER_HANDLER, FILE_TRIGGER_HANDLER, FORM_TRIGGER_HANDLER, Trigger, TriggerRegistry,
    TriggerSchedule, next_daily_run, parse_timezone,
};
use crate::workflow::Workflow;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct InboxReport {
    pub dispatched: usize,
    pub rejected: usize,
}

/// Dispatch every `*.json` submission event waiting in `inbox`.
///
/// Dispatched events are deleted whether or not the pipeline succeeded.
/// Files that do not parse are renamed to `*.rejected` and left in place.
pub async fn process_inbox(workflow: &Workflow, inbox: &Path) -> Result<InboxReport> {
    let mut report = InboxReport::default();
    if !inbox.is_dir() {
        debug!("Form inbox {} does not exist yet", inbox.display());
        return Ok(report);
    }

    let mut events = Vec::new();
    let mut entries = tokio::fs::read_dir(inbox).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) == Some("json") {
            events.push(path);
        }
    }
    events.sort();

    for path in events {
        match FormSubmitEvent::from_file(&path).await {
            Ok(event) => {
                if let Err(e) = workflow.handle_form_submission(&event).await {
                    error!("Form submission {} failed: {}", event.submission_id, e);
                }
                tokio::fs::remove_file(&path).await?;
                report.dispatched += 1;
            }
            Err(e) => {
                warn!("Rejecting {}: {}", path.display(), e);
                let mut rejected = path.clone().into_os_string();
                rejected.push(".rejected");
                tokio::fs::rename(&path, PathBuf::from(rejected)).await?;
                report.rejected += 1;
            }
        }
    }

    Ok(report)
}

/// Runs installed triggers until interrupted
#[derive(Clone)]
pub struct Scheduler {
    workflow: Arc<Workflow>,
    archiver: Option<Arc<Archiver>>,
    inbox: Option<PathBuf>,
    inbox_poll: Duration,
    timezone: Tz,
}

impl Scheduler {
    pub fn new(workflow: Arc<Workflow>, archiver: Option<Arc<Archiver>>) -> Result<Self> {
        let config = workflow.config();
        let timezone = parse_timezone(&config.archive.timezone)?;
        let inbox = config
            .form
            .inbox_folder
            .as_deref()
            .map(|folder| config.drive.root.join(folder));
        let inbox_poll = Duration::from_secs(config.form.inbox_poll_seconds.max(1));

        Ok(Self { workflow, archiver, inbox, inbox_poll, timezone })
    }

    /// Run one firing of the trigger's handler
    pub async fn fire(&self, trigger: &Trigger) {
        match trigger.handler.as_str() {
            FILE_TRIGGER_HANDLER => {
                if let Err(e) = self.workflow.process_source_folder().await {
                    error!("Error in {}: {}", FILE_TRIGGER_HANDLER, e);
                }
            }
            ARCHIVE_TRIGGER_HANDLER => match &self.archiver {
                Some(archiver) => {
                    if let Err(e) = archiver.archive_old_documents(Utc::now()).await {
                        error!("Error in {}: {}", ARCHIVE_TRIGGER_HANDLER, e);
                    }
                }
                None => warn!("Archive trigger fired but archiving is not configured"),
            },
            FORM_TRIGGER_HANDLER => match &self.inbox {
                Some(inbox) => match process_inbox(&self.workflow, inbox).await {
                    Ok(report) if report.dispatched + report.rejected > 0 => {
                        info!("Form inbox: {} dispatched, {} rejected", report.dispatched, report.rejected)
                    }
                    Ok(_) => {}
                    Err(e) => error!("Error in {}: {}", FORM_TRIGGER_HANDLER, e),
                },
                None => warn!("Form trigger fired but no inbox folder is configured"),
            },
            other => warn!("No handler named {}", other),
        }
    }

    /// Start a background task for one trigger
    pub fn spawn(&self, trigger: Trigger) -> JoinHandle<()> {
        let scheduler = self.clone();
        tokio::spawn(async move {
            match trigger.schedule.clone() {
                TriggerSchedule::EveryMinutes { minutes } => {
                    let mut ticker = tokio::time::interval(every_minutes(minutes));
                    loop {
                        ticker.tick().await;
                        scheduler.fire(&trigger).await;
                    }
                }
                TriggerSchedule::FormSubmit { .. } => {
                    let mut ticker = tokio::time::interval(scheduler.inbox_poll);
                    loop {
                        ticker.tick().await;
                        scheduler.fire(&trigger).await;
                    }
                }
                TriggerSchedule::AtHour { hour } => loop {
                    let now = Utc::now();
                    let next = match next_daily_run(now, hour, scheduler.timezone) {
                        Ok(next) => next,
                        Err(e) => {
                            error!("Stopping trigger {}: {}", trigger.id, e);
                            return;
                        }
                    };
                    info!("{} scheduled for {}", trigger.handler, next.to_rfc3339());
                    let wait = (next - now).to_std().unwrap_or_default();
                    tokio::time::sleep(wait).await;
                    scheduler.fire(&trigger).await;
                },
            }
        })
    }

    /// Run every installed trigger until Ctrl-C
    pub async fn run(&self, registry: &TriggerRegistry) -> Result<()> {
        if registry.triggers().is_empty() {
            warn!("No triggers installed; run `transflow triggers setup` first");
            return Ok(());
        }

        let handles: Vec<JoinHandle<()>> = registry
            .triggers()
            .iter()
            .map(|trigger| {
                info!("Starting trigger {} ({})", trigger.handler, trigger.schedule);
                self.spawn(trigger.clone())
            })
            .collect();

        tokio::signal::ctrl_c().await?;
        info!("Shutting down {} trigger task(s)", handles.len());
        for handle in handles {
            handle.abort();
        }
        Ok(())
    }
}

/// Interval period for an every-N-minutes trigger, at least one minute
fn every_minutes(minutes: u64) -> Duration {
    Duration::from_secs(minutes.max(1).saturating_mul(60))
}
