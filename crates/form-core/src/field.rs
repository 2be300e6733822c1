//! Widget and field dictionary helpers

use crate::text::object_text;
use crate::PdfDocument;
use lopdf::{Dictionary, Object};

/// Maximum `/Parent` or `/Kids` depth followed before giving up
///
/// Guards against reference cycles in malformed field trees.
pub const MAX_FIELD_DEPTH: usize = 64;

/// Field flag bit for radio buttons (`/Ff`, bit position 16)
const FLAG_RADIO: i64 = 1 << 15;
/// Field flag bit for push buttons (`/Ff`, bit position 17)
const FLAG_PUSHBUTTON: i64 = 1 << 16;

/// Kind of a terminal form field, derived from `/FT` and `/Ff`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Choice,
    Checkbox,
    Radio,
    PushButton,
    Signature,
    /// No (or an unrecognised) field type
    Unknown,
}

impl FieldKind {
    /// Short lowercase name, e.g. `"text"` or `"checkbox"`
    pub fn as_str(self) -> &'static str {
        match self {
            FieldKind::Text => "text",
            FieldKind::Choice => "choice",
            FieldKind::Checkbox => "checkbox",
            FieldKind::Radio => "radio",
            FieldKind::PushButton => "pushbutton",
            FieldKind::Signature => "signature",
            FieldKind::Unknown => "unknown",
        }
    }

    /// Whether the injection engine knows how to write a value for this kind
    pub fn is_fillable(self) -> bool {
        matches!(
            self,
            FieldKind::Text | FieldKind::Choice | FieldKind::Checkbox | FieldKind::Unknown
        )
    }
}

/// Whether a dictionary carries `/Subtype /Widget`
pub(crate) fn is_widget(dict: &Dictionary) -> bool {
    matches!(dict.get(b"Subtype"), Ok(Object::Name(name)) if name == b"Widget")
}

/// The non-empty partial field name (`/T`) of a dictionary
pub(crate) fn partial_name(doc: &PdfDocument, dict: &Dictionary) -> Option<String> {
    let entry = dict.get(b"T").ok()?;
    let (_, obj) = doc.resolve(entry)?;
    object_text(obj).filter(|name| !name.is_empty())
}

/// A widget that carries a field name, i.e. a terminal fillable field
pub(crate) fn is_field_widget(doc: &PdfDocument, dict: &Dictionary) -> bool {
    is_widget(dict) && partial_name(doc, dict).is_some()
}

/// The parent field dictionary, if `/Parent` resolves to one
fn parent<'a>(doc: &'a PdfDocument, dict: &'a Dictionary) -> Option<&'a Dictionary> {
    let entry = dict.get(b"Parent").ok()?;
    doc.resolve_dict(entry).map(|(_, parent)| parent)
}

/// Look up a field attribute, following `/Parent` for inheritable keys
pub(crate) fn inherited<'a>(
    doc: &'a PdfDocument,
    dict: &'a Dictionary,
    key: &[u8],
) -> Option<&'a Object> {
    let mut current = dict;
    for _ in 0..MAX_FIELD_DEPTH {
        if let Ok(entry) = current.get(key) {
            return doc.resolve(entry).map(|(_, obj)| obj);
        }
        current = parent(doc, current)?;
    }
    None
}

/// Fully-qualified field name: partial names of all ancestors joined by `.`
pub(crate) fn qualified_name(doc: &PdfDocument, dict: &Dictionary) -> Option<String> {
    let mut parts = Vec::new();
    let mut current = Some(dict);
    let mut depth = 0;

    while let Some(node) = current {
        if depth >= MAX_FIELD_DEPTH {
            break;
        }
        if let Some(name) = partial_name(doc, node) {
            parts.push(name);
        }
        current = parent(doc, node);
        depth += 1;
    }

    if parts.is_empty() {
        return None;
    }
    parts.reverse();
    Some(parts.join("."))
}

/// Qualified name of the field a dictionary hangs under via `/Parent`
pub(crate) fn parent_name(doc: &PdfDocument, dict: &Dictionary) -> Option<String> {
    parent(doc, dict).and_then(|p| qualified_name(doc, p))
}

/// Determine the field kind from the (inherited) `/FT` and `/Ff` entries
pub(crate) fn field_kind(doc: &PdfDocument, dict: &Dictionary) -> FieldKind {
    let flags = match inherited(doc, dict, b"Ff") {
        Some(Object::Integer(n)) => *n,
        _ => 0,
    };

    match inherited(doc, dict, b"FT") {
        Some(Object::Name(name)) => match name.as_slice() {
            b"Tx" => FieldKind::Text,
            b"Ch" => FieldKind::Choice,
            b"Sig" => FieldKind::Signature,
            b"Btn" if flags & FLAG_PUSHBUTTON != 0 => FieldKind::PushButton,
            b"Btn" if flags & FLAG_RADIO != 0 => FieldKind::Radio,
            b"Btn" => FieldKind::Checkbox,
            _ => FieldKind::Unknown,
        },
        _ => FieldKind::Unknown,
    }
}

/// Name of the "on" appearance state of a checkbox widget
///
/// The first key of `/AP /N` other than `Off`, defaulting to `Yes`.
pub(crate) fn checkbox_on_state(doc: &PdfDocument, dict: &Dictionary) -> Vec<u8> {
    let normal = dict
        .get(b"AP")
        .ok()
        .and_then(|ap| doc.resolve_dict(ap))
        .and_then(|(_, ap)| ap.get(b"N").ok())
        .and_then(|n| doc.resolve_dict(n));

    normal
        .and_then(|(_, n)| {
            n.iter()
                .map(|(key, _)| key)
                .find(|key| key.as_slice() != b"Off")
                .cloned()
        })
        .unwrap_or_else(|| b"Yes".to_vec())
}

/// Current value (`/V`, inherited) of a field rendered as text
pub(crate) fn field_value(doc: &PdfDocument, dict: &Dictionary) -> Option<String> {
    match inherited(doc, dict, b"V")? {
        Object::Array(items) => {
            let values: Vec<String> = items.iter().filter_map(object_text).collect();
            (!values.is_empty()).then(|| values.join(", "))
        }
        other => object_text(other),
    }
}
