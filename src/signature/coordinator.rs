use log::debug;

use crate::document::Document;
use crate::error::{Error, Result};
use crate::object::ObjectId;
use crate::writer::{build_body, build_tail, Offset};

/// Serializes one indirect object while tracking, as it goes, where inside
/// the output the `/Contents` and `/ByteRange` raw-token values start —
/// both are seeded as fixed-width placeholders by `seed_signature_dictionary`,
/// so locating them this way needs no string search over the hex digits.
fn serialize_signature_entry(id: ObjectId, dict: &crate::dictionary::Dictionary) -> (Vec<u8>, usize, usize) {
    let mut out = Vec::new();
    let mut buf = itoa::Buffer::new();
    out.extend_from_slice(buf.format(id.0).as_bytes());
    out.push(b' ');
    out.extend_from_slice(buf.format(id.1).as_bytes());
    out.extend_from_slice(b" obj\n<<");

    let mut contents_offset = 0;
    let mut byte_range_offset = 0;
    for (key, value) in dict.iter() {
        out.push(b' ');
        out.push(b'/');
        out.extend_from_slice(key);
        out.push(b' ');
        if key.as_slice() == b"Contents" {
            contents_offset = out.len();
        }
        if key.as_slice() == b"ByteRange" {
            byte_range_offset = out.len();
        }
        value.write_to(&mut out);
    }
    out.extend_from_slice(b" >>\n");
    out.extend_from_slice(b"endobj\n");
    (out, contents_offset, byte_range_offset)
}

/// Two-pass signed emission: serializes everything but the signature
/// object, reserves its place, computes `/ByteRange` from the resulting
/// layout, asks the injected `Pkcs7Signer` for the detached CMS bytes over
/// the concatenation minus `/Contents`, then splices the hex result in.
pub fn emit_signed(document: &mut Document, rebuild: bool) -> Result<Vec<u8>> {
    let pending = document.pending_signature.take().expect("emit_signed called without a pending signature");
    let signature_id = pending.signature_id;
    let signer = pending.signer;
    let cert_bundle = pending.cert_bundle;

    let hex_capacity = document.config.signature_hex_capacity;
    let byte_range_capacity = document.config.byte_range_capacity;

    let mut out = Vec::new();
    let base_offset = if rebuild {
        let header = format!("%PDF-{}\n%\u{e2}\u{e3}\u{cf}\u{d3}\n", document.version);
        out.extend_from_slice(header.as_bytes());
        out.len() as u64
    } else {
        out.extend_from_slice(&document.original_bytes);
        out.len() as u64
    };

    let (prefix, mut offsets) = build_body(document, rebuild, base_offset, Some(signature_id));
    let prefix_size = base_offset + prefix.len() as u64;

    let signature_value = document
        .get_object(signature_id, false)
        .ok_or(Error::MissingRoot)?;
    let signature_dict = signature_value.as_dict()?.clone();

    let (sig_entry, contents_offset, byte_range_offset) = serialize_signature_entry(signature_id, &signature_dict);
    offsets.push(Offset { id: signature_id, offset: prefix_size });

    let suffix_offsets = offsets;
    let out_len_after_sig = prefix_size + sig_entry.len() as u64;
    let suffix = build_tail(document, rebuild, suffix_offsets, out_len_after_sig);

    let a = prefix_size + contents_offset as u64;
    let b = a + hex_capacity as u64 + 2;
    let c = suffix.len() as u64
        + (sig_entry.len() as u64 - (hex_capacity as u64 + 2) - contents_offset as u64);

    let byte_range_text = format!("[0 {a} {b} {c}]");
    if byte_range_text.len() > byte_range_capacity {
        return Err(Error::Signer(format!(
            "/ByteRange value {byte_range_text:?} does not fit in the reserved {byte_range_capacity} bytes"
        )));
    }
    let mut byte_range_bytes = byte_range_text.into_bytes();
    byte_range_bytes.resize(byte_range_capacity, b' ');

    let mut sig_entry = sig_entry;
    sig_entry[byte_range_offset..byte_range_offset + byte_range_capacity].copy_from_slice(&byte_range_bytes);

    debug!("signing {} prefix bytes + {} suffix bytes", prefix.len(), suffix.len());

    let signable_len = prefix.len() + sig_entry.len() + suffix.len();
    let mut signable = Vec::with_capacity(signable_len);
    signable.extend_from_slice(&out);
    signable.extend_from_slice(&prefix);
    signable.extend_from_slice(&sig_entry[..contents_offset]);
    signable.extend_from_slice(&sig_entry[contents_offset + hex_capacity + 2..]);
    signable.extend_from_slice(&suffix);

    let der = if signer.needs_path() {
        let mut scratch = tempfile::NamedTempFile::new_in(&document.config.temp_dir)?;
        use std::io::Write;
        scratch.write_all(&signable)?;
        scratch.flush()?;
        signer.sign_path(scratch.path(), &cert_bundle).map_err(|e| Error::Signer(e.to_string()))?
    } else {
        signer.sign(&signable, &cert_bundle).map_err(|e| Error::Signer(e.to_string()))?
    };

    let mut hex = String::with_capacity(hex_capacity);
    for byte in &der {
        use std::fmt::Write;
        let _ = write!(hex, "{byte:02X}");
    }
    if hex.len() > hex_capacity {
        return Err(Error::Signer(format!(
            "signature is {} hex chars, exceeds reserved capacity {hex_capacity}",
            hex.len()
        )));
    }
    while hex.len() < hex_capacity {
        hex.push('0');
    }

    let mut contents_bytes = Vec::with_capacity(hex_capacity + 2);
    contents_bytes.push(b'<');
    contents_bytes.extend_from_slice(hex.as_bytes());
    contents_bytes.push(b'>');
    sig_entry[contents_offset..contents_offset + hex_capacity + 2].copy_from_slice(&contents_bytes);

    out.extend_from_slice(&prefix);
    out.extend_from_slice(&sig_entry);
    out.extend_from_slice(&suffix);

    Ok(out)
}
