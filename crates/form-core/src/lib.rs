//! Form Core - AcroForm field discovery, repair and injection
//!
//! This crate provides functionality for:
//! - Opening and saving PDF documents (via lopdf)
//! - Resolving the fillable field names of a form
//! - Rebuilding a corrupted `/AcroForm /Fields` index from page annotations
//! - Writing a name -> value mapping into the form fields of every page
//!
//! # Example
//!
//! ```ignore
//! use form_core::{inject, resolve, Mapping, PdfDocument};
//!
//! let mut doc = PdfDocument::open("template.pdf")?;
//! let resolution = resolve(&mut doc);
//! println!("fields: {:?}", resolution.names());
//!
//! let mut mapping = Mapping::new();
//! mapping.insert("First".to_string(), "Jane".to_string());
//! let report = inject(&mut doc, &mapping);
//! assert!(report.success);
//! doc.save("filled.pdf")?;
//! ```

mod document;
mod field;
mod inject;
mod repair;
mod resolver;
mod text;

pub use document::{ArraySlot, PdfDocument};
pub use field::{FieldKind, MAX_FIELD_DEPTH};
pub use inject::{inject, set_need_appearances, InjectionReport};
pub use repair::{
    collect_field_widgets, rebuild_form_index, FieldWidget, RepairReport, WidgetScan,
};
pub use resolver::{resolve, resolve_with, IndexHealth, IndexState, Resolution, ResolvedField};
pub use text::{decode_text_string, encode_text_string};

use std::collections::BTreeMap;
use thiserror::Error;

/// Field name -> value associations applied by [`inject`]
pub type Mapping = BTreeMap<String, String>;

/// Errors that can occur during form operations
#[derive(Debug, Error)]
pub enum FormError {
    #[error("Failed to read PDF: {0}")]
    Unreadable(String),

    #[error("No fillable fields found in form")]
    NoFieldsFound,

    #[error("Failed to write PDF: {0}")]
    WriteFailed(String),

    #[error("Invalid page number: {0} (document has {1} pages)")]
    InvalidPage(usize, usize),

    #[error("Malformed document structure: {0}")]
    Structure(String),

    #[error("Lopdf error: {0}")]
    LopdfError(#[from] lopdf::Error),
}

/// Result type for form operations
pub type Result<T> = std::result::Result<T, FormError>;
