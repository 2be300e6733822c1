//! Output assembler: template in, filled document out

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use form_core::{
    inject, rebuild_form_index, resolve_with, set_need_appearances, FormError, InjectionReport,
    Mapping, PdfDocument, RepairReport, Resolution,
};

use crate::{load_mapping, mapping_from_value, FillError, FillOptions, FillOutcome, FillRequest, Result};

/// Result of a successful fill
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FillSummary {
    /// Where the filled document was written
    pub output: PathBuf,
    /// Field names resolved from the template
    pub fields: Vec<String>,
    /// Whether the field index was rebuilt before injection
    pub repaired: bool,
    /// What the injection pass wrote, skipped and could not match
    pub injection: InjectionReport,
}

/// Fills form templates
///
/// Each run opens the template fresh, so the template on disk is never
/// modified and nothing is shared between runs.
#[derive(Debug, Clone, Default)]
pub struct FormFiller {
    options: FillOptions,
}

impl FormFiller {
    /// Create a filler with default options
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a filler with the given options
    pub fn with_options(options: FillOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> FillOptions {
        self.options
    }

    /// Resolve the field names of a template without writing anything
    pub fn list_fields<P: AsRef<Path>>(&self, template: P) -> Result<Resolution> {
        let mut doc = open_template(template.as_ref())?;
        Ok(resolve_with(&mut doc, self.options.force_repair))
    }

    /// Fill `template` with `mapping` and write the result to `output`
    ///
    /// Returns the output path. No file is written on failure.
    pub fn run<P, Q>(&self, template: P, mapping: &Mapping, output: Q) -> Result<PathBuf>
    where
        P: AsRef<Path>,
        Q: AsRef<Path>,
    {
        Ok(self.fill(template, mapping, output)?.output)
    }

    /// Like [`FormFiller::run`], but returns the full summary
    pub fn fill<P, Q>(&self, template: P, mapping: &Mapping, output: Q) -> Result<FillSummary>
    where
        P: AsRef<Path>,
        Q: AsRef<Path>,
    {
        let template = template.as_ref();
        let output = output.as_ref();

        let mut doc = open_template(template)?;
        let (resolution, injection) = self.fill_document(&mut doc, mapping)?;
        write_output(&mut doc, output)?;

        log::info!(
            "Filled {} ({} widgets) -> {}",
            template.display(),
            injection.updated,
            output.display()
        );

        Ok(FillSummary {
            output: output.to_path_buf(),
            fields: resolution.names(),
            repaired: resolution.repair().is_some(),
            injection,
        })
    }

    /// Resolve, inject and optionally flag appearances on an open document
    pub fn fill_document(
        &self,
        doc: &mut PdfDocument,
        mapping: &Mapping,
    ) -> Result<(Resolution, InjectionReport)> {
        let resolution = resolve_with(doc, self.options.force_repair);
        if resolution.is_empty() {
            return Err(FormError::NoFieldsFound.into());
        }

        let injection = inject(doc, mapping);
        if !injection.success {
            return Err(FillError::InjectionFailed(injection.failures));
        }
        if !injection.unknown.is_empty() {
            log::debug!("Mapped names with no widget: {:?}", injection.unknown);
        }

        if self.options.need_appearances {
            set_need_appearances(doc, true)?;
        }

        Ok((resolution, injection))
    }

    /// Rebuild the field index of `template` and write the result to `output`
    pub fn repair<P, Q>(&self, template: P, output: Q) -> Result<RepairReport>
    where
        P: AsRef<Path>,
        Q: AsRef<Path>,
    {
        let mut doc = open_template(template.as_ref())?;
        let report = rebuild_form_index(&mut doc);
        if report.entries().is_empty() {
            return Err(FormError::NoFieldsFound.into());
        }

        write_output(&mut doc, output.as_ref())?;
        log::info!(
            "Rebuilt field index: {} entries (was {})",
            report.entries().len(),
            report.previous_len
        );
        Ok(report)
    }

    /// Handle a complete fill request
    ///
    /// Request options are combined with this filler's options.
    pub fn process(&self, request: &FillRequest) -> Result<FillOutcome> {
        if !request.form_file.is_file() {
            return Err(FillError::TemplateNotFound(request.form_file.clone()));
        }
        if let Some(missing) = request.input_files.iter().find(|path| !path.is_file()) {
            return Err(FillError::InputNotFound(missing.clone()));
        }

        let mapping = match (&request.mapping, &request.mapping_file) {
            (Some(value), _) => mapping_from_value(value)?,
            (None, Some(path)) => load_mapping(path)?,
            (None, None) => {
                log::warn!("Request has no mapping, filling with an empty one");
                Mapping::new()
            }
        };

        let output = request
            .output_file
            .clone()
            .unwrap_or_else(|| default_output_path(&request.form_file));

        let filler = Self::with_options(FillOptions {
            need_appearances: self.options.need_appearances || request.options.need_appearances,
            force_repair: self.options.force_repair || request.options.force_repair,
        });
        let summary = filler.fill(&request.form_file, &mapping, &output)?;

        Ok(FillOutcome {
            status: "success".to_string(),
            output_file: summary.output,
            metadata: mapping,
            fields: summary.fields,
            repaired: summary.repaired,
            updated: summary.injection.updated,
            unmapped: summary.injection.unmapped,
            unknown: summary.injection.unknown,
        })
    }
}

/// `filled_<id>.pdf` in the template's directory
pub fn default_output_path(template: &Path) -> PathBuf {
    let name = format!("filled_{}.pdf", uuid::Uuid::new_v4().simple());
    match template.parent() {
        Some(dir) => dir.join(name),
        None => PathBuf::from(name),
    }
}

fn open_template(path: &Path) -> Result<PdfDocument> {
    if !path.is_file() {
        return Err(FillError::TemplateNotFound(path.to_path_buf()));
    }
    Ok(PdfDocument::open(path)?)
}

/// Serialize and write in one go; a partially written file is removed
fn write_output(doc: &mut PdfDocument, output: &Path) -> Result<()> {
    let bytes = doc.to_bytes()?;

    if let Some(dir) = output.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(dir).map_err(|err| write_failed(output, err))?;
    }

    let mut file = File::create(output).map_err(|err| write_failed(output, err))?;
    if let Err(err) = file.write_all(&bytes).and_then(|_| file.sync_all()) {
        drop(file);
        if let Err(cleanup) = fs::remove_file(output) {
            log::warn!("Could not remove partial output {}: {}", output.display(), cleanup);
        }
        return Err(write_failed(output, err));
    }
    Ok(())
}

fn write_failed(path: &Path, err: io::Error) -> FillError {
    FormError::WriteFailed(format!("{}: {}", path.display(), err)).into()
}
