//! Formfill - fill PDF form templates from a field mapping
//!
//! This crate provides:
//! - The output assembler: open a template, resolve (and if needed repair)
//!   its fields, inject a mapping and write the filled document
//! - Mapping ingestion from JSON
//! - The JSON request/response types of the fill service
//!
//! # Example
//!
//! ```ignore
//! use formfill::{parse_mapping, FormFiller};
//!
//! let mapping = parse_mapping(r#"{ "First": "Jane", "Last": "Doe" }"#)?;
//! let output = FormFiller::new().run("form.pdf", &mapping, "out/filled.pdf")?;
//! ```

mod filler;
pub mod mapping;
mod request;

pub use filler::{default_output_path, FillSummary, FormFiller};
pub use form_core::{FormError, Mapping};
pub use mapping::{load_mapping, mapping_from_value, parse_mapping, value_to_string};
pub use request::{ErrorResponse, FillOptions, FillOutcome, FillRequest};

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while filling a form
#[derive(Debug, Error)]
pub enum FillError {
    #[error(transparent)]
    Form(#[from] FormError),

    #[error("Form file not found: {}", .0.display())]
    TemplateNotFound(PathBuf),

    #[error("Input file not found: {}", .0.display())]
    InputNotFound(PathBuf),

    #[error("Invalid mapping: {0}")]
    InvalidMapping(String),

    #[error("Invalid fill request: {0}")]
    InvalidRequest(String),

    #[error("Failed to fill PDF: {0} fields could not be written")]
    InjectionFailed(usize),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl FillError {
    /// Stable machine-readable code for this error
    pub fn kind(&self) -> &'static str {
        match self {
            FillError::Form(FormError::Unreadable(_)) => "unreadable",
            FillError::Form(FormError::NoFieldsFound) => "no_fields_found",
            FillError::Form(FormError::WriteFailed(_)) => "write_failed",
            FillError::Form(_) => "malformed_document",
            FillError::TemplateNotFound(_) => "template_not_found",
            FillError::InputNotFound(_) => "input_not_found",
            FillError::InvalidMapping(_) | FillError::JsonError(_) => "invalid_mapping",
            FillError::InvalidRequest(_) => "invalid_request",
            FillError::InjectionFailed(_) => "injection_failed",
            FillError::IoError(_) => "io_error",
        }
    }
}

/// Result type for fill operations
pub type Result<T> = std::result::Result<T, FillError>;
