//! Transflow - folder- and form-driven document translation
//!
//! Text documents dropped into a source folder, or form submissions, are
//! translated by an LLM chat-completion provider. Results land as documents
//! in an output folder, each request is logged to a tracking sheet, and old
//! output is periodically archived.

pub mod archive;
pub mod cli;
pub mod config;
pub mod document;
pub mod drive;
pub mod error;
pub mod form;
pub mod glossary;
pub mod prompt;
pub mod properties;
pub mod request;
pub mod scheduler;
pub mod setup;
pub mod sheet;
pub mod tracking;
pub mod translate;
pub mod triggers;
pub mod workflow;
