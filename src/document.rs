use chrono::SecondsFormat;
use tracing::info;

use crate::config::DocumentLayout;
use crate::drive::{Drive, DriveFile, mark_as_processed};
use crate::error::{Result, TransflowError};
use crate::request::TranslationRequest;
use crate::translate::TranslationResult;

/// Headings of the structured layout, in insertion order
pub const SECTION_TITLES: [&str; 4] = ["Translated Text", "Original Text", "Model", "Prompt"];

/// Number of source characters quoted in an error document
pub const ERROR_EXCERPT_CHARS: usize = 1000;

const TROUBLESHOOTING_TIPS: &[&str] = &[
    "Check that the provider API key is set and has not expired.",
    "Confirm the provider account has remaining quota.",
    "Make sure the submitted text is not empty.",
    "Resubmit the request; failed calls are not retried automatically.",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParagraphStyle {
    Heading,
    Normal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Paragraph {
    pub style: ParagraphStyle,
    pub text: String,
}

impl Paragraph {
    pub fn heading(text: &str) -> Self {
        Self { style: ParagraphStyle::Heading, text: text.to_string() }
    }

    pub fn normal(text: &str) -> Self {
        Self { style: ParagraphStyle::Normal, text: text.to_string() }
    }
}

/// In-memory document body, rendered to Markdown when stored
#[derive(Debug, Clone, Default)]
pub struct Document {
    pub title: String,
    paragraphs: Vec<Paragraph>,
}

impl Document {
    pub fn new(title: &str) -> Self {
        Self { title: title.to_string(), paragraphs: Vec::new() }
    }

    /// Replace the whole body with a single paragraph
    pub fn set_text(&mut self, text: &str) {
        self.paragraphs = vec![Paragraph::normal(text)];
    }

    pub fn append_paragraph(&mut self, paragraph: Paragraph) {
        self.paragraphs.push(paragraph);
    }

    pub fn insert_paragraph(&mut self, index: usize, paragraph: Paragraph) -> Result<()> {
        if index > self.paragraphs.len() {
            return Err(TransflowError::Document(format!(
                "Paragraph index {} out of range for {} paragraphs",
                index,
                self.paragraphs.len()
            )));
        }
        self.paragraphs.insert(index, paragraph);
        Ok(())
    }

    pub fn paragraphs(&self) -> &[Paragraph] {
        &self.paragraphs
    }

    pub fn render(&self) -> String {
        let mut body = self
            .paragraphs
            .iter()
            .map(|p| match p.style {
                ParagraphStyle::Heading => format!("# {}", p.text),
                ParagraphStyle::Normal => p.text.clone(),
            })
            .collect::<Vec<_>>()
            .join("\n\n");
        body.push('\n');
        body
    }
}

pub fn translated_title(request_name: &str, target_language: &str) -> String {
    format!("{} - Translated to {}", request_name, target_language)
}

pub fn error_title(request_name: &str) -> String {
    format!("{} - Translation Error", request_name)
}

/// Build the translated document body for the configured layout
pub fn build_translation_document(
    layout: DocumentLayout,
    title: &str,
    request: &TranslationRequest,
    result: &TranslationResult,
    model: &str,
    prompt: &str,
) -> Result<Document> {
    let mut doc = Document::new(title);

    match layout {
        DocumentLayout::Flat => doc.set_text(&result.text),
        DocumentLayout::Structured => {
            let bodies = [result.text.as_str(), request.source_text.as_str(), model, prompt];
            for (index, (heading, body)) in SECTION_TITLES.iter().zip(bodies).enumerate() {
                doc.insert_paragraph(2 * index, Paragraph::heading(heading))?;
                doc.insert_paragraph(2 * index + 1, Paragraph::normal(body))?;
            }
        }
    }

    Ok(doc)
}

pub fn build_error_document(request: &TranslationRequest, error_message: &str) -> Document {
    let mut doc = Document::new(&error_title(&request.request_name));
    let excerpt: String = request.source_text.chars().take(ERROR_EXCERPT_CHARS).collect();

    doc.append_paragraph(Paragraph::heading("Translation Error"));
    doc.append_paragraph(Paragraph::normal(&format!("Error: {}", error_message)));
    doc.append_paragraph(Paragraph::normal(&format!("Request Name: {}", request.request_name)));
    doc.append_paragraph(Paragraph::normal(&format!(
        "Timestamp: {}",
        request.submission_timestamp.to_rfc3339_opts(SecondsFormat::Secs, true)
    )));
    doc.append_paragraph(Paragraph::heading(&format!(
        "Source Text (first {} characters)",
        ERROR_EXCERPT_CHARS
    )));
    doc.append_paragraph(Paragraph::normal(&excerpt));
    doc.append_paragraph(Paragraph::heading("Troubleshooting Tips"));
    let tips = TROUBLESHOOTING_TIPS
        .iter()
        .map(|tip| format!("- {}", tip))
        .collect::<Vec<_>>()
        .join("\n");
    doc.append_paragraph(Paragraph::normal(&tips));

    doc
}

/// Creates output documents and files them into the output folder
pub struct DocumentWriter<'a> {
    drive: &'a dyn Drive,
    output_folder: &'a str,
    processed_marker: &'a str,
}

impl<'a> DocumentWriter<'a> {
    pub fn new(drive: &'a dyn Drive, output_folder: &'a str, processed_marker: &'a str) -> Self {
        Self { drive, output_folder, processed_marker }
    }

    /// Create the document in the drive root, mark it, then move it to the output folder
    pub async fn persist(&self, doc: &Document) -> Result<DriveFile> {
        let created = self.drive.create_document(&doc.title, &doc.render()).await?;
        let marked = mark_as_processed(self.drive, &created, self.processed_marker).await?;
        let moved = self.drive.move_to(&marked, self.output_folder).await?;

        info!("Created document: {} ({})", moved.name, moved.id);
        Ok(moved)
    }
}
