use super::*;
use crate::test_support::{build_classic_pdf, build_xref_stream_pdf};

fn simple_fixture() -> Vec<u8> {
    build_classic_pdf(
        &[
            (1, 0, "<< /Type /Catalog /Pages 2 0 R >>"),
            (2, 0, "<< /Type /Pages /Kids [3 0 R] /Count 1 >>"),
            (
                3,
                0,
                "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Resources << >> /Contents 4 0 R >>",
            ),
            (4, 0, "<< /Length 8 >>\nstream\nHello Wo\nendstream"),
            (5, 0, "<< /Producer (Test) >>"),
        ],
        "/Root 1 0 R /Info 5 0 R",
    )
}

#[test]
fn open_reads_page_tree_and_version() {
    let bytes = simple_fixture();
    let document = Document::open(&bytes).expect("fixture should parse");
    assert_eq!(document.version(), "1.4");
    assert_eq!(document.page_count(), 1);
    assert_eq!(document.page_size(0), Some([0.0, 0.0, 612.0, 792.0]));
}

#[test]
fn invalid_page_index_is_none_not_a_panic() {
    let bytes = simple_fixture();
    let document = Document::open(&bytes).expect("fixture should parse");
    assert_eq!(document.get_page(1), None);
    assert_eq!(document.page_size(1), None);
}

#[test]
fn set_version_rejects_malformed_strings() {
    let bytes = simple_fixture();
    let mut document = Document::open(&bytes).expect("fixture should parse");
    assert!(document.set_version("PDF-1.7").is_ok());
    assert_eq!(document.version(), "1.7");
    assert!(matches!(document.set_version("PDF-2.0"), Err(Error::InvalidVersion(_))));
    assert!(matches!(document.set_version("garbage"), Err(Error::InvalidVersion(_))));
}

#[test]
fn incremental_emit_without_mutation_returns_input_unchanged() {
    let bytes = simple_fixture();
    let mut document = Document::open(&bytes).expect("fixture should parse");
    let out = document.emit(false).expect("emit should succeed");
    assert_eq!(out, bytes);
}

#[test]
fn rebuild_emit_does_not_carry_the_original_bytes_verbatim() {
    let bytes = simple_fixture();
    let mut document = Document::open(&bytes).expect("fixture should parse");
    let out = document.emit(true).expect("emit should succeed");
    assert!(out.starts_with(b"%PDF-1.4\n"));

    let reopened = Document::open(&out).expect("rebuilt document should itself be valid");
    assert_eq!(reopened.page_count(), 1);
}

#[test]
fn incremental_update_is_itself_reopenable_and_carries_overrides() {
    let bytes = simple_fixture();
    let mut document = Document::open(&bytes).expect("fixture should parse");

    let info_ref = document.trailer.get(b"Info").unwrap().as_reference().unwrap();
    let mut info = document.get_object(info_ref, false).unwrap().as_dict().unwrap().clone();
    info.set("Producer", Object::string_literal("Changed"));
    document.add_object(info_ref, Object::Dictionary(info));

    let out = document.emit(false).expect("emit should succeed");

    let reopened = Document::open(&out).expect("incremental update should itself be a valid document");
    assert_eq!(reopened.page_count(), 1);
    let info_obj = reopened.get_object(info_ref, false).unwrap();
    assert_eq!(
        info_obj.as_dict().unwrap().get(b"Producer").unwrap().as_str().unwrap(),
        b"Changed"
    );
}

#[test]
fn xref_stream_input_keeps_the_stream_form_on_the_next_revision() {
    let bytes = build_xref_stream_pdf(
        &[
            (1, 0, "<< /Type /Catalog /Pages 2 0 R >>"),
            (2, 0, "<< /Type /Pages /Kids [3 0 R] /Count 1 >>"),
            (3, 0, "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 300 300] /Resources << >> >>"),
            (4, 0, "<< /Producer (Test) >>"),
        ],
        "/Root 1 0 R /Info 4 0 R",
    );
    let mut document = Document::open(&bytes).expect("xref-stream fixture should parse");
    assert_eq!(document.page_count(), 1);

    document.create_object(Object::Dictionary(Dictionary::new()), ObjectKind::Plain);
    let out = document.emit(false).expect("emit should succeed");

    let tail = String::from_utf8_lossy(&out[bytes.len()..]);
    assert!(tail.contains("/Type /XRef"));
    assert!(!tail.contains("trailer\n"));
}

#[test]
fn resolve_follows_a_single_reference() {
    let bytes = simple_fixture();
    let document = Document::open(&bytes).expect("fixture should parse");
    let info_ref = document.trailer.get(b"Info").unwrap().clone();
    let resolved = document.resolve(&info_ref).expect("Info should resolve");
    assert_eq!(resolved.as_dict().unwrap().get(b"Producer").unwrap().as_str().unwrap(), b"Test");
}

#[test]
fn resolve_passes_through_non_reference_values_unchanged() {
    let bytes = simple_fixture();
    let document = Document::open(&bytes).expect("fixture should parse");
    let value = Object::Integer(7);
    assert_eq!(document.resolve(&value).unwrap(), Object::Integer(7));
}

#[test]
fn resolve_rejects_a_list_of_references_as_mixed() {
    let bytes = simple_fixture();
    let document = Document::open(&bytes).expect("fixture should parse");
    let list = Object::Array(vec![Object::reference((1, 0)), Object::reference((2, 0))]);
    assert!(matches!(document.resolve(&list), Err(Error::MixedReference)));
}

#[test]
fn resolve_reports_a_dangling_reference_by_its_own_error() {
    let bytes = simple_fixture();
    let document = Document::open(&bytes).expect("fixture should parse");
    let dangling = Object::reference((999, 0));
    assert!(matches!(document.resolve(&dangling), Err(Error::MissingReference(id)) if id == (999, 0)));
}
