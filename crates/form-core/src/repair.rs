//! Form index repair
//!
//! Rebuilds `/AcroForm /Fields` from the widget annotations attached to the
//! pages. The pages are the ground truth: the candidate list is computed by
//! [`collect_field_widgets`] without touching the document, and only then is
//! the index array repopulated in place.

use crate::field::is_field_widget;
use crate::{ArraySlot, PdfDocument};
use lopdf::{Object, ObjectId};
use std::collections::HashSet;

/// Where a field widget found on a page lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldWidget {
    /// An indirect object referenced from `/Annots`
    Indirect(ObjectId),
    /// A dictionary stored directly at this position of an `/Annots` array
    Inline(ArraySlot, usize),
}

/// Field widgets discovered by scanning page annotations
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WidgetScan {
    /// Field widgets in page order, then annotation order, first occurrence
    pub fields: Vec<FieldWidget>,
    /// Annotation entries that could not be dereferenced
    pub skipped: usize,
    /// Repeated references to an already collected field
    pub duplicates: usize,
    /// How many of `fields` are stored inline
    pub inline: usize,
}

impl WidgetScan {
    /// Object IDs of the indirect field widgets, in scan order
    pub fn object_ids(&self) -> Vec<ObjectId> {
        self.fields
            .iter()
            .filter_map(|widget| match widget {
                FieldWidget::Indirect(id) => Some(*id),
                FieldWidget::Inline(..) => None,
            })
            .collect()
    }
}

/// Outcome of rebuilding the form index
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepairReport {
    /// What the page scan found
    pub scan: WidgetScan,
    /// Object IDs written to the index, in scan order
    pub indexed: Vec<ObjectId>,
    /// Inline widgets moved into indirect objects so they could be indexed
    pub promoted: usize,
    /// Number of entries the index held before the rebuild
    pub previous_len: usize,
    /// Whether the index array had to be created
    pub created: bool,
    /// Whether the rebuilt entries were written to the document
    pub applied: bool,
}

impl RepairReport {
    /// Object IDs now enumerated by the index
    pub fn entries(&self) -> &[ObjectId] {
        &self.indexed
    }
}

/// Scan every page's annotations for terminal field widgets
///
/// Never modifies the document. Entries that fail to dereference are
/// skipped and counted rather than aborting the scan.
pub fn collect_field_widgets(doc: &PdfDocument) -> WidgetScan {
    let mut scan = WidgetScan::default();
    let mut seen: HashSet<ObjectId> = HashSet::new();

    for (page_index, page_id) in doc.get_page_ids().into_iter().enumerate() {
        for (position, entry) in doc.annotations(page_id).iter().enumerate() {
            let Some((id, dict)) = doc.resolve_dict(entry) else {
                log::warn!(
                    "Skipping unreadable annotation {:?} on page {}",
                    entry,
                    page_index + 1
                );
                scan.skipped += 1;
                continue;
            };

            if !is_field_widget(doc, dict) {
                continue;
            }

            match id {
                Some(id) if seen.insert(id) => scan.fields.push(FieldWidget::Indirect(id)),
                Some(_) => scan.duplicates += 1,
                None => match doc.annotations_slot(page_id) {
                    Some(slot) => {
                        scan.fields.push(FieldWidget::Inline(slot, position));
                        scan.inline += 1;
                    }
                    None => scan.skipped += 1,
                },
            }
        }
    }

    scan
}

/// Rebuild the form index from page annotations
///
/// The existing `/Fields` array is cleared and repopulated in place, so any
/// structure referencing the array keeps seeing it. Widgets stored inline in
/// `/Annots` are first moved into indirect objects, with the `/Annots` entry
/// replaced by a reference; their contents stay as they were. When no index
/// exists yet one is created, unless the scan found nothing to put in it.
pub fn rebuild_form_index(doc: &mut PdfDocument) -> RepairReport {
    let scan = collect_field_widgets(doc);
    let mut report = RepairReport::default();

    let existing = doc.form_index_slot();
    report.previous_len = existing
        .as_ref()
        .and_then(|slot| doc.array(slot))
        .map_or(0, Vec::len);

    if existing.is_none() && scan.fields.is_empty() {
        report.scan = scan;
        return report;
    }

    let slot = match existing {
        Some(slot) => slot,
        None => match doc.ensure_form_index() {
            Ok(slot) => {
                report.created = true;
                slot
            }
            Err(e) => {
                log::warn!("Cannot create form index: {e}");
                report.scan = scan;
                return report;
            }
        },
    };

    let mut seen: HashSet<ObjectId> = HashSet::new();
    for widget in &scan.fields {
        let id = match widget {
            FieldWidget::Indirect(id) => *id,
            FieldWidget::Inline(annots, position) => {
                match doc.promote_array_entry(annots, *position) {
                    Ok(id) => {
                        report.promoted += 1;
                        id
                    }
                    Err(e) => {
                        log::warn!("Cannot move inline widget into its own object: {e}");
                        continue;
                    }
                }
            }
        };
        // A shared /Annots array yields the same inline widget once per page
        if seen.insert(id) {
            report.indexed.push(id);
        }
    }

    match doc.array_mut(&slot) {
        Ok(fields) => {
            fields.clear();
            fields.extend(report.indexed.iter().copied().map(Object::Reference));
            report.applied = true;
        }
        Err(e) => log::warn!("Cannot rewrite form index: {e}"),
    }

    log::info!(
        "Rebuilt form index: {} -> {} entries ({} skipped, {} duplicates)",
        report.previous_len,
        report.indexed.len(),
        scan.skipped,
        scan.duplicates
    );
    if report.promoted > 0 {
        log::debug!(
            "Moved {} inline field widgets into indirect objects",
            report.promoted
        );
    }

    report.scan = scan;
    report
}
