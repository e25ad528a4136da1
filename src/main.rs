//! Transflow - folder- and form-driven document translation
//!
//! Entry point for the `transflow` binary: loads settings and properties,
//! sets up logging, and dispatches the selected subcommand.

use anyhow::{Result, bail};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use tracing::{Level, info, warn};
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use transflow::archive::Archiver;
use transflow::cli::{Args, Commands, TriggerAction};
use transflow::config::Config;
use transflow::drive::DriveFactory;
use transflow::form::FormSubmitEvent;
use transflow::properties::{PropertyStore, TRANSLATION_FORM_ID};
use transflow::scheduler::Scheduler;
use transflow::setup::SetupManager;
use transflow::translate::ProviderFactory;
use transflow::triggers::TriggerRegistry;
use transflow::workflow::{PipelineReport, TrackingStatus, Workflow, assemble_prompt};

const DEFAULT_CONFIG_FILE: &str = "transflow.toml";

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = args.config.clone().unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
    let mut config = if config_path.exists() {
        Config::from_file(&config_path)?
    } else {
        if args.config.is_some() {
            bail!("Config file not found: {}", config_path.display());
        }
        Config::default()
    };

    let props = PropertyStore::from_env();
    config.apply_properties(&props);

    setup_logging(&config.processing.state_dir, args.verbose)?;
    info!("Starting Transflow");
    if config_path.exists() {
        info!("Loaded settings from {}", config_path.display());
    }

    let drive = DriveFactory::create(&config.drive);

    match args.command {
        Commands::Init { force } => {
            let report = SetupManager::new(config.clone()).init_workspace(&config_path, force)?;
            println!("Created {} folder(s)", report.created_folders.len());
            for folder in &report.created_folders {
                println!("  {}", folder.display());
            }
            if report.config_written {
                println!("Wrote {}", config_path.display());
            }
        }
        Commands::Poll => {
            let workflow = build_workflow(&config, drive)?;
            let report = workflow.process_source_folder().await?;
            println!(
                "Scanned {} file(s): {} translated, {} skipped, {} failed",
                report.scanned, report.processed, report.skipped, report.failed
            );
            if report.failed > 0 {
                bail!("{} file(s) failed", report.failed);
            }
        }
        Commands::Submit { event } => {
            let event = read_event(&event).await?;
            let workflow = build_workflow(&config, drive)?;
            match workflow.handle_form_submission(&event).await? {
                Some(report) => print_report(&report)?,
                None => println!("Submission ignored: it came from a different form"),
            }
        }
        Commands::TranslateFile { path } => {
            let workflow = build_workflow(&config, drive)?;
            let report = workflow.translate_file_id(&path).await?;
            print_report(&report)?;
        }
        Commands::Archive => {
            let archiver = Archiver::new(&config, drive)?;
            let report = archiver.archive_old_documents(chrono::Utc::now()).await?;
            println!(
                "Processed {} file(s): {} archived, {} failed",
                report.processed, report.archived, report.failed
            );
        }
        Commands::Serve => {
            let registry = TriggerRegistry::load(&config.processing.state_dir)?;
            let archiver = match Archiver::new(&config, drive.clone()) {
                Ok(archiver) => Some(Arc::new(archiver)),
                Err(e) => {
                    warn!("Archiving disabled: {}", e);
                    None
                }
            };
            let workflow = Arc::new(build_workflow(&config, drive)?);
            let scheduler = Scheduler::new(workflow, archiver)?;
            info!("Serving {} trigger(s), press Ctrl-C to stop", registry.triggers().len());
            scheduler.run(&registry).await?;
        }
        Commands::Triggers { action } => manage_triggers(&config, action)?,
        Commands::Status => {
            let status = SetupManager::new(config.clone()).system_status(&props, drive.as_ref()).await?;

            println!("\nProperties:");
            for (key, set) in &status.properties {
                println!("  {:<26} {}", key, if *set { "set" } else { "unset" });
            }
            println!("\nFolders:");
            for folder in &status.folders {
                let state = match (&folder.folder_id, folder.accessible) {
                    (None, _) => "not configured".to_string(),
                    (Some(id), true) => format!("{} (ok)", id),
                    (Some(id), false) => format!("{} (NOT FOUND)", id),
                };
                println!("  {:<26} {}", folder.key, state);
            }
            println!("\nTriggers:");
            for (handler, count) in &status.trigger_counts {
                println!("  {:<26} {}", handler, count);
            }
            if status.missing.is_empty() {
                println!("\nConfiguration is complete");
            } else {
                println!("\nMissing: {}", status.missing.join(", "));
            }
            if !status.is_ready() {
                bail!("System is not ready");
            }
        }
        Commands::FolderIds => {
            let lookups = SetupManager::new(config.clone()).find_folder_ids(drive.as_ref()).await?;
            for lookup in lookups {
                match lookup.matches.as_slice() {
                    [] => println!("{}: not found", lookup.name),
                    [folder] => println!("{}: {}", lookup.name, folder.id),
                    many => {
                        println!("{}: {} folders found", lookup.name, many.len());
                        for folder in many {
                            let created = folder
                                .created
                                .map(|c| c.to_rfc3339())
                                .unwrap_or_else(|| "unknown".to_string());
                            println!("  {} (created {})", folder.id, created);
                        }
                    }
                }
            }
        }
        Commands::TestPrompt { text } => {
            let (prompt, context) = assemble_prompt(&config, drive.as_ref(), &text).await;
            println!(
                "Glossary entries: {}, term definitions: {}\n",
                context.glossary.len(),
                context.terms.len()
            );
            println!("{}", prompt);
        }
    }

    info!("Transflow completed");
    Ok(())
}

fn build_workflow(config: &Config, drive: Arc<dyn transflow::drive::Drive>) -> Result<Workflow> {
    let missing = config.missing_properties();
    if !missing.is_empty() {
        warn!("Missing configuration: {}", missing.join(", "));
    }
    let provider = ProviderFactory::create_provider(config)?;
    Ok(Workflow::new(config.clone(), drive, provider))
}

async fn read_event(source: &str) -> Result<FormSubmitEvent> {
    if source == "-" {
        let mut content = String::new();
        tokio::io::stdin().read_to_string(&mut content).await?;
        Ok(FormSubmitEvent::from_json(&content)?)
    } else {
        Ok(FormSubmitEvent::from_file(source).await?)
    }
}

fn print_report(report: &PipelineReport) -> Result<()> {
    println!("Document: {} ({})", report.document.name, report.document.id);
    match &report.tracking {
        TrackingStatus::Logged => println!("Tracking: logged"),
        TrackingStatus::Disabled => println!("Tracking: no sheet configured"),
        TrackingStatus::Failed(reason) => bail!("Tracking failed: {}", reason),
    }
    if !report.translated {
        bail!("Translation failed; see {}", report.document.name);
    }
    Ok(())
}

fn manage_triggers(config: &Config, action: TriggerAction) -> Result<()> {
    let mut registry = TriggerRegistry::load(&config.processing.state_dir)?;

    match action {
        TriggerAction::Setup => {
            registry.setup_file_trigger(config.processing.poll_interval_minutes)?;
        }
        TriggerAction::Remove => {
            registry.remove_handler(transflow::triggers::FILE_TRIGGER_HANDLER);
        }
        TriggerAction::SetupArchive => {
            registry.setup_archive_triggers(&config.archive.hours)?;
        }
        TriggerAction::RemoveArchive => {
            registry.remove_handler(transflow::triggers::ARCHIVE_TRIGGER_HANDLER);
        }
        TriggerAction::SetupForm => {
            let form_id = transflow::config::require(&config.form.form_id, TRANSLATION_FORM_ID)?;
            registry.setup_form_trigger(form_id);
        }
        TriggerAction::RemoveForm => {
            registry.remove_handler(transflow::triggers::FORM_TRIGGER_HANDLER);
        }
        TriggerAction::List => {}
    }

    registry.save()?;

    if registry.triggers().is_empty() {
        println!("No triggers installed");
    }
    for trigger in registry.triggers() {
        println!(
            "{:<28} {:<28} {}",
            trigger.handler,
            trigger.schedule.to_string(),
            trigger.created_at.to_rfc3339()
        );
    }
    Ok(())
}

fn setup_logging(state_dir: &Path, verbose: bool) -> Result<()> {
    let log_dir = state_dir.join("log");
    std::fs::create_dir_all(&log_dir)?;

    // Daily rotation; the guard lives for the whole process
    let file_appender = rolling::daily(&log_dir, "transflow.log");
    let (non_blocking_file, guard) = non_blocking(file_appender);
    std::mem::forget(guard);

    let log_level = if verbose { Level::DEBUG } else { Level::INFO };

    let console_layer = fmt::layer()
        .with_target(false)
        .with_file(verbose)
        .with_line_number(verbose);

    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}
