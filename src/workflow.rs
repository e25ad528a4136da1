use std::sync::Arc;
use tracing::{error, info, warn};

use crate::config::{Config, require};
use crate::document::{
    DocumentWriter, build_error_document, build_translation_document, translated_title,
};
use crate::drive::{Drive, DriveFile, mark_as_processed};
use crate::error::{Result, TransflowError};
use crate::form::FormSubmitEvent;
use crate::glossary::PromptContext;
use crate::prompt::{PromptBuilder, load_base_prompt};
use crate::properties::{OUTPUT_FOLDER_ID, SOURCE_FOLDER_ID, TRANSLATION_FORM_ID};
use crate::request::{RequestSource, TranslationRequest};
use crate::tracking::{TrackingBundle, TrackingLogger};
use crate::translate::TranslationProvider;

/// What happened to the bookkeeping step of a request
#[derive(Debug, Clone, PartialEq)]
pub enum TrackingStatus {
    Logged,
    /// No tracking sheet configured
    Disabled,
    Failed(String),
}

/// Assemble the prompt for `text`: template, glossary, terms, then the text
pub async fn assemble_prompt(config: &Config, drive: &dyn Drive, text: &str) -> (String, PromptContext) {
    let base = load_base_prompt(
        drive,
        config.drive.context_folder.as_deref(),
        &config.prompt,
        &config.translation.target_language,
    )
    .await;

    let context = PromptContext::load(
        &config.drive.root,
        config.prompt.glossary_sheet.as_deref(),
        config.prompt.terms_sheet.as_deref(),
    );

    let prompt = PromptBuilder::build(&base, &context.glossary, &context.terms, text);
    (prompt, context)
}

/// Outcome of one pass through the pipeline
#[derive(Debug, Clone)]
pub struct PipelineReport {
    /// Translated document, or the error document when translation failed
    pub document: DriveFile,
    pub translated: bool,
    pub prompt: String,
    pub tracking: TrackingStatus,
}

impl PipelineReport {
    pub fn is_success(&self) -> bool {
        self.translated && !matches!(self.tracking, TrackingStatus::Failed(_))
    }
}

/// Summary of a source folder scan
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanReport {
    pub scanned: usize,
    pub processed: usize,
    pub skipped: usize,
    pub failed: usize,
}

pub struct Workflow {
    config: Config,
    drive: Arc<dyn Drive>,
    provider: Arc<dyn TranslationProvider>,
}

impl Workflow {
    pub fn new(config: Config, drive: Arc<dyn Drive>, provider: Arc<dyn TranslationProvider>) -> Self {
        Self { config, drive, provider }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub async fn build_prompt(&self, request: &TranslationRequest) -> (String, PromptContext) {
        assemble_prompt(&self.config, self.drive.as_ref(), &request.source_text).await
    }

    /// Run one request: prompt, provider call, document, tracking row.
    ///
    /// A provider failure produces an error document instead of a translation.
    /// Failing to create either document is returned as `Err`; a tracking
    /// failure is reported in [`PipelineReport::tracking`] because the
    /// document already exists by then.
    pub async fn process_request(&self, request: &TranslationRequest) -> Result<PipelineReport> {
        let output_folder = require(&self.config.drive.output_folder, OUTPUT_FOLDER_ID)?;
        if !self.drive.folder_exists(output_folder).await {
            return Err(TransflowError::Drive(format!("Output folder not found: {}", output_folder)));
        }
        let marker = &self.config.processing.processed_marker;
        let target_language = &self.config.translation.target_language;
        let model = self.provider.model();

        info!("┌─ Translating request: {} ────────", request.request_name);
        let (prompt, context) = self.build_prompt(request).await;

        let outcome = self.provider.translate(&prompt).await;
        let writer = DocumentWriter::new(self.drive.as_ref(), output_folder, marker);

        let (document, mut bundle, translated) = match &outcome {
            Ok(result) => {
                info!("│ Translation received ({} chars)", result.text.len());
                let title = translated_title(&request.request_name, target_language);
                let doc = build_translation_document(
                    self.config.translation.document_layout,
                    &title,
                    request,
                    result,
                    &model,
                    &prompt,
                )?;
                let document = writer.persist(&doc).await?;
                (document, TrackingBundle::new(request, Ok(result)), true)
            }
            Err(e) => {
                let message = e.to_string();
                warn!("│ Translation unavailable: {}", message);
                let document = writer.persist(&build_error_document(request, &message)).await?;
                (document, TrackingBundle::new(request, Err(message.as_str())), false)
            }
        };

        bundle.provider = self.provider.kind().as_str().to_string();
        bundle.model = model;
        bundle.target_language = target_language.clone();
        bundle.glossary_term_count = context.glossary.len();
        bundle.definition_term_count = context.terms.len();
        bundle.document_name = document.name.clone();
        bundle.document_id = document.id.clone();

        let tracking = match self.config.tracking.sheet.as_deref() {
            Some(sheet) => {
                let columns = self.config.tracking.columns.clone();
                let appended = TrackingLogger::new(&self.config.drive.root, sheet, columns)
                    .and_then(|logger| logger.append(&bundle));
                match appended {
                    Ok(_) => TrackingStatus::Logged,
                    Err(e) => TrackingStatus::Failed(e.to_string()),
                }
            }
            None => TrackingStatus::Disabled,
        };

        info!("└─ Finished {} -> {}", request.request_name, document.id);
        Ok(PipelineReport { document, translated, prompt, tracking })
    }

    /// Translate a single drive file regardless of its processed marker
    pub async fn process_file(&self, file: &DriveFile) -> Result<PipelineReport> {
        let text = self.drive.read_text(file).await?;
        let mut request = TranslationRequest::new(
            &file.name,
            &text,
            RequestSource::Folder { file_id: file.id.clone() },
        );
        request.submission_timestamp = file.created;

        self.process_request(&request).await
    }

    /// Translate the file with the given id, for testing a setup end to end
    pub async fn translate_file_id(&self, file_id: &str) -> Result<PipelineReport> {
        let file = self
            .drive
            .get_file(file_id)
            .await
            .map_err(|_| TransflowError::FileNotFound(file_id.to_string()))?;
        self.process_file(&file).await
    }

    /// Translate every unprocessed text document in the source folder
    pub async fn process_source_folder(&self) -> Result<ScanReport> {
        let source_folder = require(&self.config.drive.source_folder, SOURCE_FOLDER_ID)?;
        let marker = &self.config.processing.processed_marker;
        let files = self.drive.list_files(source_folder).await?;

        let mut report = ScanReport { scanned: files.len(), ..ScanReport::default() };

        for file in files {
            if !file.is_text_document() || file.has_marker(marker) {
                report.skipped += 1;
                continue;
            }

            info!("Processing file: {}", file.name);
            match self.process_file(&file).await {
                Ok(pipeline) => {
                    if let TrackingStatus::Failed(reason) = &pipeline.tracking {
                        error!("Tracking failed for {}: {}", file.id, reason);
                    }
                    // The document exists at this point, so the source is done
                    match mark_as_processed(self.drive.as_ref(), &file, marker).await {
                        Ok(_) => report.processed += 1,
                        Err(e) => {
                            error!("Failed to mark {} as processed: {}", file.id, e);
                            report.failed += 1;
                        }
                    }
                }
                Err(e) => {
                    error!("Failed to process {}: {}", file.id, e);
                    report.failed += 1;
                }
            }
        }

        info!(
            "Source scan complete: {} scanned, {} processed, {} skipped, {} failed",
            report.scanned, report.processed, report.skipped, report.failed
        );
        Ok(report)
    }

    /// Handle one form submission; events from other forms are ignored
    pub async fn handle_form_submission(&self, event: &FormSubmitEvent) -> Result<Option<PipelineReport>> {
        let form_id = require(&self.config.form.form_id, TRANSLATION_FORM_ID)?;
        if !event.is_from(form_id) {
            warn!(
                "Ignoring submission {} from unexpected form {}",
                event.submission_id, event.form_id
            );
            return Ok(None);
        }

        let request = event.to_request(&self.config.form)?;
        match self.process_request(&request).await {
            Ok(report) => {
                info!("Successfully handled {} for submission id {}", request.request_name, event.submission_id);
                Ok(Some(report))
            }
            Err(e) => {
                error!(
                    "Error processing request {} for submission id {}: {}",
                    request.request_name, event.submission_id, e
                );
                Err(e)
            }
        }
    }
}
