use std::path::Path;
use tracing::{debug, warn};

use crate::error::Result;
use crate::sheet::Sheet;

/// Preferred translation for a term
#[derive(Debug, Clone, PartialEq)]
pub struct GlossaryEntry {
    pub term: String,
    pub translation: String,
}

/// Program term with a definition in the source and target languages
#[derive(Debug, Clone, PartialEq)]
pub struct TermDefinition {
    pub term: String,
    pub source_definition: String,
    pub target_definition: String,
}

/// Read `term,translation` rows, skipping the header and incomplete rows
pub fn load_glossary(sheet: &Sheet) -> Result<Vec<GlossaryEntry>> {
    let entries = sheet
        .data_rows()?
        .into_iter()
        .filter_map(|row| {
            let term = row.first().filter(|t| !t.is_empty())?;
            let translation = row.get(1).filter(|t| !t.is_empty())?;
            Some(GlossaryEntry { term: term.clone(), translation: translation.clone() })
        })
        .collect();
    Ok(entries)
}

/// Read `term,source definition,target definition` rows
pub fn load_terms(sheet: &Sheet) -> Result<Vec<TermDefinition>> {
    let terms = sheet
        .data_rows()?
        .into_iter()
        .filter_map(|row| {
            let term = row.first().filter(|t| !t.is_empty())?;
            Some(TermDefinition {
                term: term.clone(),
                source_definition: row.get(1).cloned().unwrap_or_default(),
                target_definition: row.get(2).cloned().unwrap_or_default(),
            })
        })
        .filter(|t| !t.source_definition.is_empty() || !t.target_definition.is_empty())
        .collect();
    Ok(terms)
}

/// Glossary and term definitions folded into a prompt
#[derive(Debug, Clone, Default)]
pub struct PromptContext {
    pub glossary: Vec<GlossaryEntry>,
    pub terms: Vec<TermDefinition>,
}

impl PromptContext {
    /// Load whichever sheets are configured; unreadable sheets count as empty
    pub fn load(root: &Path, glossary_sheet: Option<&str>, terms_sheet: Option<&str>) -> Self {
        let glossary = match glossary_sheet {
            Some(id) => Sheet::open(root, id).and_then(|sheet| load_glossary(&sheet)).unwrap_or_else(|e| {
                warn!("Glossary sheet {} unavailable, continuing without it: {}", id, e);
                Vec::new()
            }),
            None => Vec::new(),
        };

        let terms = match terms_sheet {
            Some(id) => Sheet::open(root, id).and_then(|sheet| load_terms(&sheet)).unwrap_or_else(|e| {
                warn!("Terms sheet {} unavailable, continuing without it: {}", id, e);
                Vec::new()
            }),
            None => Vec::new(),
        };

        debug!("Loaded {} glossary entries and {} term definitions", glossary.len(), terms.len());
        Self { glossary, terms }
    }
}
