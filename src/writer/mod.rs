mod classic;
mod xref_stream;

use crate::dictionary::Dictionary;
use crate::document::Document;
use crate::error::Result;
use crate::object::{Object, ObjectId};

pub use classic::build_xref as build_xref_classic;
pub use xref_stream::build_xref_stream;

/// Serializes one object as `oid gen obj ... endobj`. A stream payload is
/// framed with `stream\n`/`\nendstream\n`; a `/Filter` key is never added
/// here — that is entirely the caller's / dictionary's decision, tracked by
/// `Stream::filtered`.
pub fn serialize_indirect(id: ObjectId, value: &Object) -> Vec<u8> {
    let mut out = Vec::new();
    let mut buf = itoa::Buffer::new();
    out.extend_from_slice(buf.format(id.0).as_bytes());
    out.push(b' ');
    out.extend_from_slice(buf.format(id.1).as_bytes());
    out.extend_from_slice(b" obj\n");

    match value {
        Object::Stream(stream) => {
            stream.dict.write_to(&mut out);
            out.push(b'\n');
            out.extend_from_slice(b"stream\n");
            out.extend_from_slice(&stream.content);
            out.extend_from_slice(b"\nendstream\n");
        }
        other => {
            other.write_to(&mut out);
            out.push(b'\n');
        }
    }
    out.extend_from_slice(b"endobj\n");
    out
}

/// Which form the xref/trailer emitter should use, and what version the
/// produced revision carries.
pub enum RevisionForm {
    Classic { target_version: String },
    Stream { target_version: String },
}

pub fn select_revision_form(xref_revision_version: &str, document_version: &str) -> RevisionForm {
    if version_ge(xref_revision_version, "1.5") {
        RevisionForm::Stream {
            target_version: version_max(xref_revision_version, document_version),
        }
    } else {
        RevisionForm::Classic {
            target_version: version_min(xref_revision_version, document_version),
        }
    }
}

fn version_key(v: &str) -> (u32, u32) {
    let v = v.trim_start_matches("PDF-");
    let mut parts = v.splitn(2, '.');
    let major: u32 = parts.next().and_then(|s| s.parse().ok()).unwrap_or(1);
    let minor: u32 = parts.next().and_then(|s| s.parse().ok()).unwrap_or(0);
    (major, minor)
}

fn version_ge(a: &str, b: &str) -> bool {
    version_key(a) >= version_key(b)
}

fn version_max(a: &str, b: &str) -> String {
    if version_key(a) >= version_key(b) { a.to_string() } else { b.to_string() }
}

fn version_min(a: &str, b: &str) -> String {
    if version_key(a) <= version_key(b) { a.to_string() } else { b.to_string() }
}

/// One offset table entry handed to the xref builders: the object id plus
/// where (in the emitted bytes) its `obj` record starts.
pub struct Offset {
    pub id: ObjectId,
    pub offset: u64,
}

/// Builds the new revision body: every override serialized, in insertion
/// order, or (on `rebuild`) every reachable object starting from object 1.
/// `exclude` is skipped if present — the signed emission path uses this to
/// hold the signature object back so it can be serialized separately with
/// its final `/ByteRange`. Returns the bytes plus the offset table the xref
/// builders need.
pub(crate) fn build_body(document: &Document, rebuild: bool, base_offset: u64, exclude: Option<ObjectId>) -> (Vec<u8>, Vec<Offset>) {
    let mut body = Vec::new();
    let mut offsets = Vec::new();

    if rebuild {
        for oid in 1..=document.max_oid {
            for gen in 0..=0u16 {
                let id = (oid, gen);
                if Some(id) == exclude {
                    continue;
                }
                if let Some(value) = document.get_object(id, false) {
                    offsets.push(Offset { id, offset: base_offset + body.len() as u64 });
                    body.extend_from_slice(&serialize_indirect(id, &value));
                }
            }
        }
    } else {
        for (&id, value) in document.overrides.iter() {
            if Some(id) == exclude {
                continue;
            }
            offsets.push(Offset { id, offset: base_offset + body.len() as u64 });
            body.extend_from_slice(&serialize_indirect(id, value));
        }
    }

    (body, offsets)
}

/// Builds the trailer dictionary shared by both xref forms: `/Root`,
/// `/Info` (if present in the original trailer), `/Size`, and `/Prev` when
/// incremental. `/Size` is filled in by the caller once the final `max_oid`
/// (which, for the xref-stream form, includes the stream object itself) is
/// known.
pub(crate) fn base_trailer(document: &Document, rebuild: bool) -> Dictionary {
    let mut trailer = document.trailer.clone();
    if rebuild {
        trailer.remove(b"Prev");
    } else {
        trailer.set("Prev", Object::Integer(document.xref_offset_of_input as i64));
    }
    trailer
}

/// Builds the xref+trailer tail in whichever form the revision-selection
/// rule calls for, given the bytes already written (`out_len`) and the
/// offset table collected for them so far. Shared by the plain and signed
/// emission paths so both forms of the xref builder (classic / stream) stay
/// in one place.
pub(crate) fn build_tail(document: &mut Document, rebuild: bool, mut offsets: Vec<Offset>, out_len: u64) -> Vec<u8> {
    let form = select_revision_form(&document.xref_revision_version, &document.version);
    match form {
        RevisionForm::Classic { target_version } => {
            document.version = target_version.trim_start_matches("PDF-").to_string();
            let mut trailer = base_trailer(document, rebuild);
            trailer.set("Size", Object::Integer(document.max_oid as i64 + 1));
            classic::build_xref(&offsets, &trailer, out_len, rebuild)
        }
        RevisionForm::Stream { target_version } => {
            document.version = target_version.trim_start_matches("PDF-").to_string();
            let xref_oid = (document.new_oid(), 0);
            let trailer = base_trailer(document, rebuild);
            offsets.push(Offset { id: xref_oid, offset: out_len });
            xref_stream::build_xref_stream(&offsets, document.max_oid, &trailer, xref_oid, out_len, rebuild)
        }
    }
}

/// Plain (unsigned) emission path: builds the body, then the xref+trailer
/// tail in whichever form the revision-selection rule calls for. An
/// incremental emit (`rebuild = false`) of a document with no overrides has
/// nothing new to append, so it returns the original bytes untouched rather
/// than writing an empty revision.
pub fn emit_plain(document: &mut Document, rebuild: bool) -> Result<Vec<u8>> {
    if !rebuild && document.overrides.is_empty() {
        return Ok(document.original_bytes.clone());
    }

    let mut out = Vec::new();
    let base_offset = if rebuild {
        let header = format!("%PDF-{}\n%\u{e2}\u{e3}\u{cf}\u{d3}\n", document.version);
        out.extend_from_slice(header.as_bytes());
        out.len() as u64
    } else {
        out.extend_from_slice(&document.original_bytes);
        out.len() as u64
    };

    let (body, offsets) = build_body(document, rebuild, base_offset, None);
    out.extend_from_slice(&body);

    let out_len = out.len() as u64;
    let tail = build_tail(document, rebuild, offsets, out_len);
    out.extend_from_slice(&tail);
    Ok(out)
}
