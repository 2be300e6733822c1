//! Fill request and response JSON types

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::{FillError, Mapping, Result};

/// Options controlling a fill run
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FillOptions {
    /// Set `/NeedAppearances true` so viewers regenerate field appearances
    #[serde(default)]
    pub need_appearances: bool,
    /// Rebuild the field index from page annotations even if it looks healthy
    #[serde(default)]
    pub force_repair: bool,
}

/// A fill job: which template to fill, with what, and where to write it
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FillRequest {
    /// Template form PDF
    pub form_file: PathBuf,

    /// Source documents the mapping was extracted from; only checked for existence
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub input_files: Vec<PathBuf>,

    /// Output path; defaults to `filled_<id>.pdf` next to the template
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_file: Option<PathBuf>,

    /// Inline field mapping (a JSON object)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mapping: Option<serde_json::Value>,

    /// Path to a JSON file holding the field mapping
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mapping_file: Option<PathBuf>,

    #[serde(default)]
    pub options: FillOptions,
}

impl FillRequest {
    /// Create a request for a template with no mapping
    pub fn new(form_file: impl Into<PathBuf>) -> Self {
        Self {
            form_file: form_file.into(),
            ..Default::default()
        }
    }

    /// Read a request from a JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        serde_json::from_str(&json)
            .map_err(|e| FillError::InvalidRequest(format!("{}: {e}", path.display())))
    }
}

/// Successful fill response
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FillOutcome {
    /// Always `"success"`
    pub status: String,
    pub output_file: PathBuf,
    /// The mapping that was applied
    pub metadata: Mapping,
    /// Field names resolved from the template
    pub fields: Vec<String>,
    /// Whether the field index had to be rebuilt
    pub repaired: bool,
    /// Number of widgets written
    pub updated: usize,
    /// Template fields the mapping gave no value
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unmapped: Vec<String>,
    /// Mapping keys that matched no field
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unknown: Vec<String>,
}

/// Error response, serialized as `{"error": ..., "code": ...}`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl From<&FillError> for ErrorResponse {
    fn from(err: &FillError) -> Self {
        Self {
            error: err.to_string(),
            code: err.kind().to_string(),
        }
    }
}
