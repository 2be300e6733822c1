//! Field tree resolution
//!
//! Reads the form index, decides whether it can be trusted, triggers a
//! rebuild when it cannot, and then walks the field tree to produce the
//! fully-qualified names of every terminal field.

use crate::field::{
    field_kind, field_value, parent_name, partial_name, FieldKind, MAX_FIELD_DEPTH,
};
use crate::repair::{rebuild_form_index, RepairReport};
use crate::{ArraySlot, PdfDocument};
use lopdf::{Dictionary, Object, ObjectId};
use std::collections::HashSet;

/// Condition of the form index as found on load
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexHealth {
    /// Total number of entries
    pub entries: usize,
    /// `null` entries and references to missing or `null` objects
    pub placeholders: usize,
    /// Entries that resolve to something other than a dictionary
    pub invalid: usize,
    /// References to a field already listed earlier in the index
    pub duplicates: usize,
}

impl IndexHealth {
    /// Inspect the entries of an index array
    fn inspect(doc: &PdfDocument, entries: &[Object]) -> Self {
        let mut health = IndexHealth {
            entries: entries.len(),
            ..Default::default()
        };
        let mut seen: HashSet<ObjectId> = HashSet::new();

        for entry in entries {
            if doc.is_placeholder(entry) {
                health.placeholders += 1;
                continue;
            }
            match doc.resolve_dict(entry) {
                Some((Some(id), _)) if !seen.insert(id) => health.duplicates += 1,
                Some(_) => {}
                None => health.invalid += 1,
            }
        }

        health
    }

    /// Whether the index must be rebuilt before it can be read
    pub fn is_inconsistent(&self) -> bool {
        self.placeholders > 0 || self.invalid > 0
    }
}

/// How the field list was obtained
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexState {
    /// The document has no `/AcroForm` dictionary
    NotAForm,
    /// The index was read as found
    Consistent,
    /// The index was rebuilt from page annotations before being read
    Repaired(RepairReport),
}

/// A terminal field found in the field tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedField {
    /// Fully-qualified name (`parent.child`)
    pub name: String,
    /// Object ID of the field dictionary, when it is an indirect object
    pub id: Option<ObjectId>,
    /// Field type
    pub kind: FieldKind,
    /// Current value, if any
    pub value: Option<String>,
}

/// Result of resolving a document's fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Terminal fields in index order, one per distinct name
    pub fields: Vec<ResolvedField>,
    /// Whether the index was trusted or rebuilt
    pub state: IndexState,
    /// Condition of the index before any repair
    pub health: IndexHealth,
    /// Terminal entries that carry no name at all
    pub unnamed: usize,
}

impl Resolution {
    /// Names of all resolved fields
    pub fn names(&self) -> Vec<String> {
        self.fields.iter().map(|f| f.name.clone()).collect()
    }

    /// Whether no fillable field was found
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// The repair report, if the index was rebuilt
    pub fn repair(&self) -> Option<&RepairReport> {
        match &self.state {
            IndexState::Repaired(report) => Some(report),
            _ => None,
        }
    }
}

/// Resolve the fillable fields of a document
///
/// Never fails: problems reduce the result instead. If the index contains
/// placeholder entries it is rebuilt in place first (see
/// [`rebuild_form_index`]); otherwise the document is not modified.
pub fn resolve(doc: &mut PdfDocument) -> Resolution {
    resolve_with(doc, false)
}

/// Resolve fields, optionally rebuilding the index unconditionally
pub fn resolve_with(doc: &mut PdfDocument, force_repair: bool) -> Resolution {
    let (has_acroform, slot, health) = {
        let view: &PdfDocument = doc;
        let slot = view.form_index_slot();
        let health = slot
            .as_ref()
            .and_then(|slot| view.array(slot))
            .map(|entries| IndexHealth::inspect(view, entries))
            .unwrap_or_default();
        (view.acroform().is_some(), slot, health)
    };

    let missing_index = has_acroform && slot.is_none();
    let state = if force_repair || missing_index || health.is_inconsistent() {
        if health.is_inconsistent() {
            log::info!(
                "Form index is inconsistent ({} placeholder, {} invalid of {} entries); rebuilding from page annotations",
                health.placeholders,
                health.invalid,
                health.entries
            );
        } else if missing_index {
            log::info!("Form has no field index; rebuilding from page annotations");
        }
        IndexState::Repaired(rebuild_form_index(doc))
    } else if has_acroform {
        IndexState::Consistent
    } else {
        IndexState::NotAForm
    };

    let view: &PdfDocument = doc;
    let mut walker = FieldWalker::new(view);
    if let Some(slot) = view.form_index_slot() {
        walker.walk_index(&slot);
    }

    log::debug!("Resolved {} fields", walker.fields.len());
    Resolution {
        fields: walker.fields,
        state,
        health,
        unnamed: walker.unnamed,
    }
}

/// Depth-first walk over the field tree rooted at the index entries
struct FieldWalker<'a> {
    doc: &'a PdfDocument,
    fields: Vec<ResolvedField>,
    names: HashSet<String>,
    unnamed: usize,
}

impl<'a> FieldWalker<'a> {
    fn new(doc: &'a PdfDocument) -> Self {
        Self {
            doc,
            fields: Vec::new(),
            names: HashSet::new(),
            unnamed: 0,
        }
    }

    /// Walk every index entry
    ///
    /// A rebuilt index lists the terminal widgets themselves, so an entry
    /// may sit below a parent field; its name is qualified from there.
    fn walk_index(&mut self, slot: &ArraySlot) {
        let doc = self.doc;
        let Some(entries) = doc.array(slot) else {
            return;
        };
        for entry in entries {
            if let Some((id, dict)) = doc.resolve_dict(entry) {
                let parent = parent_name(doc, dict);
                self.walk(id, dict, parent.as_deref(), 0);
            }
        }
    }

    fn walk(
        &mut self,
        id: Option<ObjectId>,
        dict: &'a Dictionary,
        parent_name: Option<&str>,
        depth: usize,
    ) {
        if depth >= MAX_FIELD_DEPTH {
            return;
        }

        let partial = partial_name(self.doc, dict);
        let full_name = match (parent_name, partial) {
            (Some(parent), Some(name)) => format!("{parent}.{name}"),
            (Some(parent), None) => parent.to_string(),
            (None, Some(name)) => name,
            (None, None) => String::new(),
        };

        // Kids carrying a /T are child fields; kids without one are the
        // widgets of this (terminal) field.
        let children: Vec<(Option<ObjectId>, &'a Dictionary)> = self
            .kids(dict)
            .into_iter()
            .filter(|(_, kid)| partial_name(self.doc, kid).is_some())
            .collect();

        if !children.is_empty() {
            for (kid_id, kid) in children {
                self.walk(kid_id, kid, Some(&full_name), depth + 1);
            }
            return;
        }

        if full_name.is_empty() {
            self.unnamed += 1;
            return;
        }
        if !self.names.insert(full_name.clone()) {
            return;
        }

        self.fields.push(ResolvedField {
            name: full_name,
            id,
            kind: field_kind(self.doc, dict),
            value: field_value(self.doc, dict),
        });
    }

    fn kids(&self, dict: &'a Dictionary) -> Vec<(Option<ObjectId>, &'a Dictionary)> {
        let doc = self.doc;
        dict.get(b"Kids")
            .ok()
            .and_then(|kids| doc.resolve(kids))
            .and_then(|(_, kids)| kids.as_array().ok())
            .map(|kids| kids.iter().filter_map(|kid| doc.resolve_dict(kid)).collect())
            .unwrap_or_default()
    }
}
