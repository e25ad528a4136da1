use regex::Regex;
use tracing::{debug, info, warn};

use crate::config::PromptConfig;
use crate::drive::Drive;
use crate::glossary::{GlossaryEntry, TermDefinition};

pub const LEXICON_LABEL: &str = "Please use this lexicon of terms when translating:";
pub const TERMS_LABEL: &str = "Please reference these SNAP terms and their definitions:";
pub const TEXT_LABEL: &str = "Text to translate:";

/// Marks the start of a named section inside a template document
const TAB_MARKER_PATTERN: &str = r"^\s*\[TAB: ([^\]]+)\]\s*$";

pub fn default_prompt(target_language: &str) -> String {
    format!(
        "You are a professional translator. Please translate the following English text to {}. \
         Please provide only the translation, no explanations.",
        target_language
    )
}

/// Load the base prompt from the template document in the context folder.
///
/// Falls back to the full template body when the configured tab is missing,
/// and to [`default_prompt`] when the document cannot be found or read.
pub async fn load_base_prompt(
    drive: &dyn Drive,
    context_folder: Option<&str>,
    config: &PromptConfig,
    target_language: &str,
) -> String {
    match read_template(drive, context_folder, &config.document_name).await {
        Some(body) => {
            if let Some(tab) = config.tab.as_deref() {
                if let Some(section) = select_tab(&body, tab) {
                    info!("Using prompt tab '{}' from {}", tab, config.document_name);
                    return section;
                }
                warn!("Tab '{}' not found in {}, using the full document", tab, config.document_name);
            }
            info!("Found custom translation prompt");
            strip_tab_markers(&body)
        }
        None => {
            info!("{} document not found, using default prompt", config.document_name);
            default_prompt(target_language)
        }
    }
}

async fn read_template(drive: &dyn Drive, context_folder: Option<&str>, name: &str) -> Option<String> {
    let folder = context_folder?;
    let files = match drive.list_files(folder).await {
        Ok(files) => files,
        Err(e) => {
            warn!("Error getting translation prompt: {}", e);
            return None;
        }
    };

    let file = files.into_iter().find(|f| f.is_text_document() && f.name == name)?;
    match drive.read_text(&file).await {
        Ok(body) if !body.trim().is_empty() => Some(body),
        Ok(_) => {
            warn!("Prompt document {} is empty", file.id);
            None
        }
        Err(e) => {
            warn!("Error reading translation prompt: {}", e);
            None
        }
    }
}

/// Extract the body of a `[TAB: name]` section, up to the next marker
pub fn select_tab(body: &str, tab: &str) -> Option<String> {
    let marker = Regex::new(TAB_MARKER_PATTERN).ok()?;
    let mut section: Option<Vec<&str>> = None;

    for line in body.lines() {
        if let Some(captures) = marker.captures(line) {
            if section.is_some() {
                break;
            }
            if captures[1].trim() == tab.trim() {
                section = Some(Vec::new());
            }
            continue;
        }
        if let Some(lines) = section.as_mut() {
            lines.push(line);
        }
    }

    let text = section?.join("\n").trim().to_string();
    if text.is_empty() { None } else { Some(text) }
}

fn strip_tab_markers(body: &str) -> String {
    match Regex::new(TAB_MARKER_PATTERN) {
        Ok(marker) => body
            .lines()
            .filter(|line| !marker.is_match(line))
            .collect::<Vec<_>>()
            .join("\n")
            .trim()
            .to_string(),
        Err(_) => body.trim().to_string(),
    }
}

/// Assembles the final prompt from its sections
pub struct PromptBuilder;

impl PromptBuilder {
    /// Base prompt, then glossary and term blocks when non-empty, then the text
    pub fn build(
        base: &str,
        glossary: &[GlossaryEntry],
        terms: &[TermDefinition],
        text: &str,
    ) -> String {
        let mut sections = vec![base.trim().to_string()];

        if !glossary.is_empty() {
            let lines = glossary
                .iter()
                .map(|entry| format!("{}: {}", entry.term, entry.translation))
                .collect::<Vec<_>>()
                .join("\n");
            sections.push(format!("{}\n{}", LEXICON_LABEL, lines));
        }

        if !terms.is_empty() {
            let entries = terms
                .iter()
                .map(|t| {
                    format!(
                        "{}\n  English: {}\n  Translation: {}",
                        t.term, t.source_definition, t.target_definition
                    )
                })
                .collect::<Vec<_>>()
                .join("\n");
            sections.push(format!("{}\n{}", TERMS_LABEL, entries));
        }

        sections.push(format!("{}\n{}", TEXT_LABEL, text));

        let prompt = sections.join("\n\n");
        debug!("Built prompt with {} sections ({} chars)", sections.len(), prompt.len());
        prompt
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drive::LocalDrive;

    fn glossary() -> Vec<GlossaryEntry> {
        vec![GlossaryEntry { term: "benefits".into(), translation: "beneficios".into() }]
    }

    fn terms() -> Vec<TermDefinition> {
        vec![TermDefinition {
            term: "EBT".into(),
            source_definition: "Electronic Benefits Transfer".into(),
            target_definition: "Transferencia Electrónica de Beneficios".into(),
        }]
    }

    #[test]
    fn prompt_without_optional_blocks() {
        let prompt = PromptBuilder::build("Translate.", &[], &[], "Hello");
        assert_eq!(prompt, "Translate.\n\nText to translate:\nHello");
    }

    #[test]
    fn optional_blocks_appear_in_fixed_order() {
        let prompt = PromptBuilder::build("Translate.", &glossary(), &terms(), "Hello");

        let lexicon = prompt.find(LEXICON_LABEL).unwrap();
        let term_block = prompt.find(TERMS_LABEL).unwrap();
        let text = prompt.find(TEXT_LABEL).unwrap();
        assert!(prompt.starts_with("Translate."));
        assert!(lexicon < term_block && term_block < text);
        assert!(prompt.contains("benefits: beneficios"));
        assert!(prompt.ends_with("Text to translate:\nHello"));
    }

    #[test]
    fn terms_without_glossary() {
        let prompt = PromptBuilder::build("Translate.", &[], &terms(), "Hello");
        assert!(!prompt.contains(LEXICON_LABEL));
        assert!(prompt.contains(TERMS_LABEL));
    }

    #[test]
    fn selects_named_tab() {
        let body = "Intro\n[TAB: General]\nBe formal.\n[TAB: SNAP]\nUse plain language.\nKeep it short.\n";
        assert_eq!(select_tab(body, "SNAP").as_deref(), Some("Use plain language.\nKeep it short."));
        assert_eq!(select_tab(body, "General").as_deref(), Some("Be formal."));
        assert_eq!(select_tab(body, "Missing"), None);
    }

    fn prompt_config(tab: Option<&str>) -> PromptConfig {
        PromptConfig {
            document_name: "Translation Prompt".to_string(),
            tab: tab.map(str::to_string),
            ..PromptConfig::default()
        }
    }

    #[tokio::test]
    async fn falls_back_to_default_prompt() {
        let dir = tempfile::tempdir().unwrap();
        let drive = LocalDrive::new(dir.path());

        let base = load_base_prompt(&drive, Some("Context"), &prompt_config(None), "Spanish").await;
        assert_eq!(base, default_prompt("Spanish"));

        let base = load_base_prompt(&drive, None, &prompt_config(None), "French").await;
        assert!(base.contains("to French."));
    }

    #[tokio::test]
    async fn missing_tab_uses_full_document() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("Context")).unwrap();
        std::fs::write(
            dir.path().join("Context/Translation Prompt.md"),
            "Translate carefully.\n[TAB: SNAP]\nUse plain language.\n",
        )
        .unwrap();
        let drive = LocalDrive::new(dir.path());

        let tabbed = load_base_prompt(&drive, Some("Context"), &prompt_config(Some("SNAP")), "Spanish").await;
        assert_eq!(tabbed, "Use plain language.");

        let full = load_base_prompt(&drive, Some("Context"), &prompt_config(Some("Other")), "Spanish").await;
        assert_eq!(full, "Translate carefully.\nUse plain language.");
    }
}
