use super::*;
use crate::test_support::{build_classic_pdf, FailingCertLoader, FakeCertLoader, FakeEmbedder, FakeSigner};

fn fixture_with_inline_annots() -> Vec<u8> {
    build_classic_pdf(
        &[
            (1, 0, "<< /Type /Catalog /Pages 2 0 R >>"),
            (2, 0, "<< /Type /Pages /Kids [3 0 R] /Count 1 >>"),
            (
                3,
                0,
                "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Resources << >> /Annots [10 0 R] >>",
            ),
            (4, 0, "<< /Producer (Test) >>"),
        ],
        "/Root 1 0 R /Info 4 0 R",
    )
}

fn fixture_with_metadata() -> Vec<u8> {
    let xmp = "<x:xmpmeta><rdf:RDF><rdf:Description>\
               <xmp:ModifyDate>2020-01-01T00:00:00Z</xmp:ModifyDate>\
               <xmp:MetadataDate>2020-01-01T00:00:00Z</xmp:MetadataDate>\
               </rdf:Description></rdf:RDF></x:xmpmeta>";
    let meta_body = format!("<< /Type /Metadata /Subtype /XML /Length {} >>\nstream\n{xmp}\nendstream", xmp.len());
    build_classic_pdf(
        &[
            (1, 0, "<< /Type /Catalog /Pages 2 0 R /Metadata 5 0 R >>"),
            (2, 0, "<< /Type /Pages /Kids [3 0 R] /Count 1 >>"),
            (3, 0, "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 400 400] /Resources << >> >>"),
            (4, 0, "<< /Producer (Test) >>"),
            (5, 0, meta_body.as_str()),
        ],
        "/Root 1 0 R /Info 4 0 R",
    )
}

#[test]
fn sign_moves_inline_annots_list_to_indirect_and_appends_widget() {
    let bytes = fixture_with_inline_annots();
    let mut document = Document::open(&bytes).unwrap();

    document
        .prepare_signature(
            &FakeCertLoader,
            b"cert",
            "",
            Box::new(FakeSigner { needs_path: false }),
            0,
            [50.0, 50.0, 200.0, 100.0],
            None,
        )
        .expect("prepare_signature should succeed");

    let page_ref = document.get_page(0).unwrap().id;
    let page_obj = document.get_object(page_ref, false).unwrap();
    let annots_ref = page_obj.as_dict().unwrap().get(b"Annots").unwrap().as_reference().unwrap();
    let annots_obj = document.get_object(annots_ref, false).unwrap();
    let items = annots_obj.as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0], Object::reference((10, 0)));

    let root_ref = document.trailer.get(b"Root").unwrap().as_reference().unwrap();
    let catalog = document.get_object(root_ref, false).unwrap();
    let acro_dict = catalog.as_dict().unwrap().get(b"AcroForm").unwrap().as_dict().unwrap();
    let fields = acro_dict.get(b"Fields").unwrap().as_array().unwrap();
    let annot_id = fields.last().unwrap().as_reference().unwrap();
    assert_eq!(items[1], Object::reference(annot_id));
    assert_eq!(acro_dict.get(b"SigFlags").unwrap().as_i64().unwrap(), 3);
}

#[test]
fn sign_and_emit_byte_range_spans_exactly_to_end_of_file() {
    let bytes = fixture_with_inline_annots();
    let mut document = Document::open(&bytes).unwrap();
    document
        .prepare_signature(
            &FakeCertLoader,
            b"cert",
            "",
            Box::new(FakeSigner { needs_path: false }),
            0,
            [50.0, 50.0, 200.0, 100.0],
            None,
        )
        .unwrap();

    let out = document.emit(false).expect("signed emit should succeed");
    let text = String::from_utf8_lossy(&out);

    let marker = "/ByteRange ";
    let after_marker = text.find(marker).expect("output should contain /ByteRange") + marker.len();
    let open = text[after_marker..].find('[').unwrap() + after_marker;
    let close = text[open..].find(']').unwrap() + open;
    let numbers: Vec<u64> = text[open + 1..close].split_whitespace().map(|s| s.parse().unwrap()).collect();

    assert_eq!(numbers.len(), 4);
    assert_eq!(numbers[0], 0);
    let (a, b, c) = (numbers[1], numbers[2], numbers[3]);
    assert!(a < b);
    // The two signed ranges are [0, a) and [b, b + c); together they cover
    // every byte except the /Contents hex placeholder itself, so b + c must
    // land exactly on the end of the file.
    assert_eq!(b + c, out.len() as u64);
    assert_eq!(out[a as usize], b'<');
    assert_eq!(out[(b - 1) as usize], b'>');
}

#[test]
fn path_based_signer_still_produces_a_signed_document() {
    let bytes = fixture_with_inline_annots();
    let mut document = Document::open(&bytes).unwrap();
    document
        .prepare_signature(
            &FakeCertLoader,
            b"cert",
            "",
            Box::new(FakeSigner { needs_path: true }),
            0,
            [1.0, 1.0, 50.0, 20.0],
            None,
        )
        .unwrap();

    let out = document.emit(false).expect("path-based signer should still produce output");
    assert!(out.len() > bytes.len());
}

#[test]
fn sign_with_image_builds_appearance_stack_and_attaches_ap() {
    let bytes = fixture_with_inline_annots();
    let mut document = Document::open(&bytes).unwrap();
    document
        .prepare_signature(
            &FakeCertLoader,
            b"cert",
            "",
            Box::new(FakeSigner { needs_path: false }),
            0,
            [10.0, 10.0, 110.0, 60.0],
            Some((Path::new("stamp.png"), &FakeEmbedder)),
        )
        .unwrap();

    let page_ref = document.get_page(0).unwrap().id;
    let page_obj = document.get_object(page_ref, false).unwrap();
    let annots_ref = page_obj.as_dict().unwrap().get(b"Annots").unwrap().as_reference().unwrap();
    let items = document.get_object(annots_ref, false).unwrap().as_array().unwrap().to_vec();
    let annot_id = items[1].as_reference().unwrap();

    let annot_obj = document.get_object(annot_id, false).unwrap();
    let ap = annot_obj.as_dict().unwrap().get(b"AP").unwrap().as_dict().unwrap();
    let form_id = ap.get(b"N").unwrap().as_reference().unwrap();
    let form_obj = document.get_object(form_id, false).unwrap();
    let form_stream = form_obj.as_stream().unwrap();
    assert_eq!(form_stream.content, b"/FRM Do".to_vec());
    assert_eq!(form_stream.dict.get(b"Subtype").unwrap().as_name().unwrap(), b"Form");
}

#[test]
fn sign_rewrites_xmp_metadata_timestamps() {
    let bytes = fixture_with_metadata();
    let mut document = Document::open(&bytes).unwrap();
    document
        .prepare_signature(
            &FakeCertLoader,
            b"cert",
            "",
            Box::new(FakeSigner { needs_path: false }),
            0,
            [10.0, 10.0, 100.0, 40.0],
            None,
        )
        .unwrap();

    let root_ref = document.trailer.get(b"Root").unwrap().as_reference().unwrap();
    let catalog = document.get_object(root_ref, false).unwrap();
    let meta_ref = catalog.as_dict().unwrap().get(b"Metadata").unwrap().as_reference().unwrap();
    let meta_obj = document.get_object(meta_ref, false).unwrap();
    let stream = meta_obj.as_stream().unwrap();
    let content = String::from_utf8_lossy(&stream.content);
    assert!(!content.contains("2020-01-01T00:00:00Z"));
    assert!(content.contains("<xmp:ModifyDate>"));
    assert!(content.contains("<xmp:MetadataDate>"));
}

#[test]
fn failing_cert_loader_surfaces_as_cert_load_error() {
    let bytes = fixture_with_inline_annots();
    let mut document = Document::open(&bytes).unwrap();
    let overrides_before = document.overrides.clone();

    let err = document
        .prepare_signature(
            &FailingCertLoader,
            b"cert",
            "wrong password",
            Box::new(FakeSigner { needs_path: false }),
            0,
            [1.0, 1.0, 50.0, 20.0],
            None,
        )
        .unwrap_err();

    assert!(matches!(err, Error::CertLoad(_)));
    assert!(document.pending_signature.is_none());
    assert_eq!(document.overrides, overrides_before);
}

#[test]
fn second_prepare_signature_call_fails_and_leaves_state_untouched() {
    let bytes = fixture_with_inline_annots();
    let mut document = Document::open(&bytes).unwrap();
    document
        .prepare_signature(
            &FakeCertLoader,
            b"cert",
            "",
            Box::new(FakeSigner { needs_path: false }),
            0,
            [1.0, 1.0, 50.0, 20.0],
            None,
        )
        .unwrap();

    let overrides_before = document.overrides.clone();
    let err = document
        .prepare_signature(
            &FakeCertLoader,
            b"cert",
            "",
            Box::new(FakeSigner { needs_path: false }),
            0,
            [1.0, 1.0, 50.0, 20.0],
            None,
        )
        .unwrap_err();

    assert!(matches!(err, Error::AlreadyPrepared));
    assert_eq!(document.overrides, overrides_before);
}
