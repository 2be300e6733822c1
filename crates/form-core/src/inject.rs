//! Value injection
//!
//! Writes a name -> value mapping into the field widgets of every page.
//! Fields are discovered directly from `/Annots`, so injection works the
//! same whether or not the form index was ever repaired.

use crate::field::{
    checkbox_on_state, field_kind, is_field_widget, is_widget, partial_name, qualified_name,
};
use crate::text::encode_text_string;
use crate::{ArraySlot, FieldKind, Mapping, PdfDocument, Result};
use lopdf::{Dictionary, Object, ObjectId};
use std::collections::HashSet;

/// Values considered "checked" for checkbox fields (compared case-insensitively)
const TRUTHY: [&str; 6] = ["true", "yes", "on", "1", "x", "checked"];

/// Outcome of an injection pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InjectionReport {
    /// False if any field could not be written
    pub success: bool,
    /// Distinct fields that received a value
    pub updated: usize,
    /// Field names present in the document but absent from the mapping
    pub unmapped: Vec<String>,
    /// Mapping keys that matched no field widget on any page
    pub unknown: Vec<String>,
    /// Fields whose kind cannot be filled (push buttons, radios, signatures)
    pub unsupported: Vec<String>,
    /// Number of writes that failed
    pub failures: usize,
}

impl Default for InjectionReport {
    fn default() -> Self {
        Self {
            success: true,
            updated: 0,
            unmapped: Vec::new(),
            unknown: Vec::new(),
            unsupported: Vec::new(),
            failures: 0,
        }
    }
}

/// Where a field dictionary lives
#[derive(Debug, Clone)]
enum Target {
    /// An indirect object
    Object(ObjectId),
    /// A dictionary stored directly in an annotations array
    Inline(ArraySlot, usize),
}

/// Pending writes for one widget
struct Update {
    name: String,
    /// False for further widgets of a field whose value was already planned
    counted: bool,
    writes: Vec<(Target, &'static str, Object)>,
}

/// Apply `mapping` to the fields of every page
///
/// Fields absent from the mapping keep their current value. Applying the
/// same mapping twice leaves the document as applying it once. Never fails;
/// a field that cannot be written clears `success` in the report.
pub fn inject(doc: &mut PdfDocument, mapping: &Mapping) -> InjectionReport {
    let mut report = InjectionReport::default();
    let updates = plan(doc, mapping, &mut report);

    for update in updates {
        match apply(doc, &update) {
            Ok(()) => {
                log::debug!("Set field '{}'", update.name);
                if update.counted {
                    report.updated += 1;
                }
            }
            Err(e) => {
                log::warn!("Failed to set field '{}': {e}", update.name);
                report.failures += 1;
                report.success = false;
            }
        }
    }

    log::info!(
        "Injected {} fields ({} unmapped, {} unsupported, {} unknown names)",
        report.updated,
        report.unmapped.len(),
        report.unsupported.len(),
        report.unknown.len()
    );
    report
}

/// Collect the writes for every mapped field widget, page by page
fn plan(doc: &PdfDocument, mapping: &Mapping, report: &mut InjectionReport) -> Vec<Update> {
    let mut updates = Vec::new();
    let mut seen: HashSet<ObjectId> = HashSet::new();
    let mut seen_fields: HashSet<ObjectId> = HashSet::new();
    let mut seen_names: HashSet<String> = HashSet::new();
    let mut matched: HashSet<String> = HashSet::new();

    for page_id in doc.get_page_ids() {
        let Some(slot) = doc.annotations_slot(page_id) else {
            continue;
        };
        for (index, entry) in doc.annotations(page_id).iter().enumerate() {
            let Some((id, dict)) = doc.resolve_dict(entry) else {
                continue;
            };

            // A widget without its own /T is a kid of the field holding the value
            let parent = if is_field_widget(doc, dict) {
                None
            } else if is_widget(dict) {
                match named_parent(doc, dict) {
                    Some(parent_id) => Some(parent_id),
                    None => continue,
                }
            } else {
                continue;
            };

            // Shared widgets appear on several pages; write each object once
            let widget = match id {
                Some(id) if !seen.insert(id) => continue,
                Some(id) => Target::Object(id),
                None => Target::Inline(slot.clone(), index),
            };

            let Some((name, value)) = lookup(doc, dict, mapping) else {
                let name = qualified_name(doc, dict).unwrap_or_default();
                if seen_names.insert(name.clone()) {
                    report.unmapped.push(name);
                }
                continue;
            };
            matched.insert(name.clone());

            let kind = field_kind(doc, dict);
            if !kind.is_fillable() {
                if seen_names.insert(name.clone()) {
                    report.unsupported.push(name);
                }
                continue;
            }

            let (field, counted) = match parent {
                Some(parent_id) => (Target::Object(parent_id), seen_fields.insert(parent_id)),
                None => (widget.clone(), true),
            };
            let writes = entries_for(doc, dict, kind, value)
                .into_iter()
                .map(|(key, value)| {
                    let target = if key == "V" { field.clone() } else { widget.clone() };
                    (target, key, value)
                })
                .collect();

            updates.push(Update {
                name,
                counted,
                writes,
            });
        }
    }

    report.unknown = mapping
        .keys()
        .filter(|key| !matched.contains(*key))
        .cloned()
        .collect();
    updates
}

/// The indirect `/Parent` of a widget, if that parent carries a field name
fn named_parent(doc: &PdfDocument, dict: &Dictionary) -> Option<ObjectId> {
    let entry = dict.get(b"Parent").ok()?;
    let (Some(parent_id), parent) = doc.resolve_dict(entry)? else {
        return None;
    };
    qualified_name(doc, parent).map(|_| parent_id)
}

/// Find the mapped value of a widget: qualified name first, then partial name
fn lookup<'m>(
    doc: &PdfDocument,
    dict: &Dictionary,
    mapping: &'m Mapping,
) -> Option<(String, &'m str)> {
    let candidates = [qualified_name(doc, dict), partial_name(doc, dict)];
    candidates
        .into_iter()
        .flatten()
        .find_map(|name| mapping.get(&name).map(|value| (name, value.as_str())))
}

/// Dictionary entries that represent `value` for a field of `kind`
fn entries_for(
    doc: &PdfDocument,
    dict: &Dictionary,
    kind: FieldKind,
    value: &str,
) -> Vec<(&'static str, Object)> {
    match kind {
        FieldKind::Checkbox => {
            let on_state = checkbox_on_state(doc, dict);
            let checked = TRUTHY.iter().any(|t| value.eq_ignore_ascii_case(t))
                || value.as_bytes() == on_state.as_slice();
            let state = if checked { on_state } else { b"Off".to_vec() };
            vec![
                ("V", Object::Name(state.clone())),
                ("AS", Object::Name(state)),
            ]
        }
        _ => vec![("V", encode_text_string(value))],
    }
}

fn apply(doc: &mut PdfDocument, update: &Update) -> Result<()> {
    for (target, key, value) in &update.writes {
        let dict = match target {
            Target::Object(id) => doc.dict_mut(*id)?,
            Target::Inline(slot, index) => doc.array_dict_mut(slot, *index)?,
        };
        dict.set(*key, value.clone());
    }
    Ok(())
}

/// Set `/AcroForm /NeedAppearances`, asking viewers to regenerate field
/// appearances from the values
pub fn set_need_appearances(doc: &mut PdfDocument, enabled: bool) -> Result<()> {
    doc.acroform_mut()?
        .set("NeedAppearances", Object::Boolean(enabled));
    Ok(())
}
