//! Integration tests for form-core
//!
//! These tests build real PDF bytes with lopdf, open them through
//! `PdfDocument` and check discovery, repair and injection end to end.

use form_core::{
    collect_field_widgets, decode_text_string, inject, rebuild_form_index, resolve, resolve_with,
    IndexState, Mapping, PdfDocument,
};
use lopdf::{dictionary, Document, Object, ObjectId, StringFormat};
use pretty_assertions::assert_eq;

/// Text widget names per page
///
/// A name that appears on several pages refers to the same widget object.
struct FormLayout<'a> {
    pages: Vec<Vec<&'a str>>,
    /// Builds the `/Fields` array from the widget IDs (in creation order)
    index: fn(&[ObjectId]) -> Vec<Object>,
}

/// Build a form PDF and return its bytes plus the widget IDs in creation order
fn create_form_pdf(layout: FormLayout) -> (Vec<u8>, Vec<(String, ObjectId)>) {
    let mut doc = Document::new();
    let pages_id = doc.new_object_id();
    let mut widgets: Vec<(String, ObjectId)> = Vec::new();
    let mut kids = Vec::new();

    for names in &layout.pages {
        let contents_id = doc.add_object(lopdf::Stream::new(
            dictionary! {},
            b"BT /F1 12 Tf 72 720 Td (Application) Tj ET".to_vec(),
        ));
        let mut annots = Vec::new();
        for name in names {
            let id = match widgets.iter().find(|(n, _)| n == name) {
                Some((_, id)) => *id,
                None => {
                    let id = doc.add_object(dictionary! {
                        "Type" => "Annot",
                        "Subtype" => "Widget",
                        "FT" => "Tx",
                        "T" => Object::string_literal(*name),
                        "Rect" => vec![100.into(), 700.into(), 300.into(), 720.into()],
                    });
                    widgets.push((name.to_string(), id));
                    id
                }
            };
            annots.push(Object::Reference(id));
        }
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.28.into(), 841.89.into()],
            "Resources" => dictionary! {},
            "Contents" => contents_id,
            "Annots" => annots,
        });
        kids.push(Object::Reference(page_id));
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Count" => count,
            "Kids" => kids,
        }),
    );

    let ids: Vec<ObjectId> = widgets.iter().map(|(_, id)| *id).collect();
    let fields_id = doc.add_object(Object::Array((layout.index)(&ids)));
    let acroform_id = doc.add_object(dictionary! { "Fields" => fields_id });
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
        "AcroForm" => acroform_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).unwrap();
    (buffer, widgets)
}

/// Attach one page with `annots` and a `/Fields` array, then save and reopen
fn single_page_form(mut doc: Document, annots: Vec<Object>, fields: Vec<Object>) -> PdfDocument {
    let pages_id = doc.new_object_id();
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![0.into(), 0.into(), 595.28.into(), 841.89.into()],
        "Annots" => annots,
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Count" => 1,
            "Kids" => vec![page_id.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
        "AcroForm" => dictionary! { "Fields" => fields },
    });
    doc.trailer.set("Root", catalog_id);

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).unwrap();
    PdfDocument::open_from_bytes(&buffer).unwrap()
}

fn id_of(widgets: &[(String, ObjectId)], name: &str) -> ObjectId {
    widgets.iter().find(|(n, _)| n == name).unwrap().1
}

fn form_index(doc: &PdfDocument) -> Vec<ObjectId> {
    let slot = doc.form_index_slot().expect("form index");
    doc.array(&slot)
        .unwrap()
        .iter()
        .map(|entry| entry.as_reference().expect("reference entry"))
        .collect()
}

fn field_value(doc: &PdfDocument, id: ObjectId) -> Option<String> {
    let dict = doc.inner().get_object(id).ok()?.as_dict().ok()?;
    match dict.get(b"V").ok()? {
        Object::String(bytes, _) => Some(decode_text_string(bytes)),
        _ => None,
    }
}

fn mapping(pairs: &[(&str, &str)]) -> Mapping {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[test]
fn test_repair_ordering_follows_pages() {
    let (pdf, widgets) = create_form_pdf(FormLayout {
        pages: vec![vec!["A", "B"], vec!["C"]],
        index: |ids| vec![ids[2].into(), Object::Null, ids[0].into()],
    });
    let mut doc = PdfDocument::open_from_bytes(&pdf).unwrap();

    let report = rebuild_form_index(&mut doc);

    let expected = vec![
        id_of(&widgets, "A"),
        id_of(&widgets, "B"),
        id_of(&widgets, "C"),
    ];
    assert_eq!(report.entries(), expected.as_slice());
    assert_eq!(form_index(&doc), expected);
}

#[test]
fn test_repair_keeps_index_array_identity() {
    let (pdf, _) = create_form_pdf(FormLayout {
        pages: vec![vec!["A"]],
        index: |_| vec![Object::Null],
    });
    let mut doc = PdfDocument::open_from_bytes(&pdf).unwrap();
    let before = doc.form_index_slot().unwrap();
    assert!(before.is_indirect());

    rebuild_form_index(&mut doc);
    assert_eq!(doc.form_index_slot().unwrap(), before);
}

#[test]
fn test_repair_deduplicates_shared_widgets() {
    let (pdf, widgets) = create_form_pdf(FormLayout {
        pages: vec![vec!["A", "Shared"], vec!["Shared", "B"]],
        index: |_| vec![Object::Null],
    });
    let mut doc = PdfDocument::open_from_bytes(&pdf).unwrap();

    let report = rebuild_form_index(&mut doc);

    assert_eq!(report.scan.duplicates, 1);
    assert_eq!(
        form_index(&doc),
        vec![
            id_of(&widgets, "A"),
            id_of(&widgets, "Shared"),
            id_of(&widgets, "B"),
        ]
    );
}

#[test]
fn test_repair_twice_is_same_as_once() {
    let (pdf, _) = create_form_pdf(FormLayout {
        pages: vec![vec!["A", "B"], vec!["C", "A"]],
        index: |_| vec![Object::Null, Object::Null],
    });
    let mut doc = PdfDocument::open_from_bytes(&pdf).unwrap();

    rebuild_form_index(&mut doc);
    let once = form_index(&doc);
    rebuild_form_index(&mut doc);
    assert_eq!(form_index(&doc), once);
}

#[test]
fn test_corrupted_index_triggers_full_repair() {
    // One placeholder plus two valid entries in an order that differs from
    // the page order; the valid entries' positions must not matter.
    let (pdf, widgets) = create_form_pdf(FormLayout {
        pages: vec![vec!["Name", "Date", "City"]],
        index: |ids| vec![ids[2].into(), Object::Null, ids[1].into()],
    });
    let mut doc = PdfDocument::open_from_bytes(&pdf).unwrap();

    let resolution = resolve(&mut doc);

    assert!(matches!(resolution.state, IndexState::Repaired(_)));
    assert_eq!(resolution.health.placeholders, 1);
    assert_eq!(
        resolution.names(),
        vec!["Name".to_string(), "Date".to_string(), "City".to_string()]
    );
    assert_eq!(
        form_index(&doc),
        collect_field_widgets(&doc).object_ids(),
        "index must equal the page scan"
    );
    assert_eq!(form_index(&doc)[0], id_of(&widgets, "Name"));
}

#[test]
fn test_no_fields_resolves_to_empty() {
    let (pdf, _) = create_form_pdf(FormLayout {
        pages: vec![vec![], vec![]],
        index: |_| vec![Object::Null],
    });
    let mut doc = PdfDocument::open_from_bytes(&pdf).unwrap();

    let resolution = resolve(&mut doc);
    assert!(resolution.is_empty());
    assert!(form_index(&doc).is_empty());
}

#[test]
fn test_unmapped_field_is_left_unchanged() {
    let (pdf, widgets) = create_form_pdf(FormLayout {
        pages: vec![vec!["Name", "Date"]],
        index: |ids| ids.iter().map(|id| (*id).into()).collect(),
    });
    let mut doc = PdfDocument::open_from_bytes(&pdf).unwrap();

    let report = inject(&mut doc, &mapping(&[("Name", "Hänsel"), ("Nickname", "Hans")]));

    assert!(report.success);
    assert_eq!(report.updated, 1);
    assert_eq!(report.unmapped, vec!["Date".to_string()]);
    assert_eq!(report.unknown, vec!["Nickname".to_string()]);
    assert_eq!(
        field_value(&doc, id_of(&widgets, "Name")).as_deref(),
        Some("Hänsel")
    );
    assert_eq!(field_value(&doc, id_of(&widgets, "Date")), None);
}

#[test]
fn test_repair_indexes_inline_widget() {
    let inline = dictionary! {
        "Type" => "Annot",
        "Subtype" => "Widget",
        "FT" => "Tx",
        "T" => Object::string_literal("Inline"),
    };
    let mut doc = single_page_form(
        Document::new(),
        vec![Object::Dictionary(inline)],
        vec![Object::Null],
    );

    let resolution = resolve(&mut doc);
    assert_eq!(resolution.names(), vec!["Inline".to_string()]);
    assert_eq!(resolution.repair().map(|r| r.promoted), Some(1));

    let page_id = doc.page_id(1).unwrap();
    let widget_id = doc.annotations(page_id)[0]
        .as_reference()
        .expect("annotation now refers to the widget object");
    assert_eq!(form_index(&doc), vec![widget_id]);
    let widget = doc.inner().get_object(widget_id).unwrap().as_dict().unwrap();
    assert_eq!(widget.get(b"T").unwrap().as_str().unwrap(), b"Inline");
    assert!(widget.get(b"V").is_err());

    // Discovery and injection agree on the field
    let report = inject(&mut doc, &mapping(&[("Inline", "here")]));
    assert_eq!(report.updated, 1);
    assert_eq!(field_value(&doc, widget_id).as_deref(), Some("here"));
}

#[test]
fn test_repair_keeps_hierarchical_names() {
    let mut inner = Document::new();
    let parent_id = inner.new_object_id();
    let street = inner.add_object(dictionary! {
        "Type" => "Annot",
        "Subtype" => "Widget",
        "FT" => "Tx",
        "T" => Object::string_literal("street"),
        "Parent" => parent_id,
    });
    let city = inner.add_object(dictionary! {
        "Type" => "Annot",
        "Subtype" => "Widget",
        "FT" => "Tx",
        "T" => Object::string_literal("city"),
        "Parent" => parent_id,
    });
    inner.objects.insert(
        parent_id,
        Object::Dictionary(dictionary! {
            "T" => Object::string_literal("address"),
            "Kids" => vec![street.into(), city.into()],
        }),
    );
    let mut doc = single_page_form(
        inner,
        vec![street.into(), city.into()],
        vec![parent_id.into()],
    );
    let expected = vec!["address.street".to_string(), "address.city".to_string()];

    assert_eq!(resolve(&mut doc).names(), expected);

    let rebuilt = resolve_with(&mut doc, true);
    assert!(rebuilt.repair().is_some());
    assert_eq!(form_index(&doc), vec![street, city]);
    assert_eq!(rebuilt.names(), expected);

    inject(&mut doc, &mapping(&[("address.street", "Main St")]));
    assert_eq!(field_value(&doc, street).as_deref(), Some("Main St"));
}

#[test]
fn test_pdfdoc_encoded_field_name() {
    let mut inner = Document::new();
    // "Start", EN DASH (0x85 in PDFDocEncoding), "End"
    let widget = inner.add_object(dictionary! {
        "Type" => "Annot",
        "Subtype" => "Widget",
        "FT" => "Tx",
        "T" => Object::String(b"Start\x85End".to_vec(), StringFormat::Literal),
    });
    let mut doc = single_page_form(inner, vec![widget.into()], vec![widget.into()]);

    let resolution = resolve(&mut doc);
    assert_eq!(resolution.names(), vec!["Start\u{2013}End".to_string()]);

    let report = inject(&mut doc, &mapping(&[("Start\u{2013}End", "2024")]));
    assert_eq!(report.updated, 1);
    assert!(report.unknown.is_empty());
    assert_eq!(field_value(&doc, widget).as_deref(), Some("2024"));
}

#[test]
fn test_injection_twice_equals_once() {
    let (pdf, _) = create_form_pdf(FormLayout {
        pages: vec![vec!["First", "Last"], vec!["Last"]],
        index: |ids| ids.iter().map(|id| (*id).into()).collect(),
    });
    let m = mapping(&[("First", "Jane"), ("Last", "Doe")]);

    let mut once = PdfDocument::open_from_bytes(&pdf).unwrap();
    inject(&mut once, &m);

    let mut twice = PdfDocument::open_from_bytes(&pdf).unwrap();
    inject(&mut twice, &m);
    inject(&mut twice, &m);

    assert_eq!(once.to_bytes().unwrap(), twice.to_bytes().unwrap());
}

#[test]
fn test_fill_round_trip() {
    let (pdf, widgets) = create_form_pdf(FormLayout {
        pages: vec![vec!["First", "Last"]],
        index: |ids| ids.iter().map(|id| (*id).into()).collect(),
    });
    let mut doc = PdfDocument::open_from_bytes(&pdf).unwrap();
    let page_count = doc.page_count();

    let resolution = resolve(&mut doc);
    assert_eq!(resolution.state, IndexState::Consistent);
    inject(&mut doc, &mapping(&[("First", "Jane"), ("Last", "Doe")]));
    let output = doc.to_bytes().unwrap();

    let reopened = PdfDocument::open_from_bytes(&output).unwrap();
    assert_eq!(reopened.page_count(), page_count);
    assert_eq!(
        field_value(&reopened, id_of(&widgets, "First")).as_deref(),
        Some("Jane")
    );
    assert_eq!(
        field_value(&reopened, id_of(&widgets, "Last")).as_deref(),
        Some("Doe")
    );
}

#[test]
fn test_open_garbage_is_unreadable() {
    let result = PdfDocument::open_from_bytes(b"not a pdf");
    assert!(matches!(result, Err(form_core::FormError::Unreadable(_))));
}
