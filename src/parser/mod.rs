mod lexer;

use std::cmp;
use std::collections::HashSet;

use log::warn;

use crate::dictionary::Dictionary;
use crate::error::{Error, ParseError, Result, XrefError};
use crate::object::{Object, ObjectId};
use crate::xref::{XrefEntry, XrefTable};

/// What `Document::open` needs out of the raw bytes: version, trailer, a
/// flattened cross-reference table (already walked across `/Prev`), and the
/// byte offset the outermost `startxref` pointed at (`xref_offset_of_input`).
pub struct ParsedStructure {
    pub version: String,
    pub trailer: Dictionary,
    pub xref: XrefTable,
    pub xref_position: u64,
    /// Version implied by the most recent xref section's form: `"1.5"` if
    /// the newest revision used a cross-reference stream, otherwise the
    /// document header version. Used by the emitter to decide whether the
    /// next revision must stay in stream form.
    pub xref_version: String,
}

/// Parses header, xref chain, and trailer out of `bytes`. This is the
/// internal tokenizer boundary: minimal by design (classic + xref-stream
/// revisions only, no object streams, no encrypted content decoding).
pub fn parse_structure(bytes: &[u8]) -> Result<ParsedStructure> {
    let offset = bytes.windows(5).position(|w| w == b"%PDF-").unwrap_or(0);
    let buffer = &bytes[offset..];

    let version = lexer::header(buffer).ok_or(ParseError::InvalidFileHeader)?;

    let xref_start = get_xref_start(buffer)?;
    if xref_start > buffer.len() {
        return Err(Error::Xref(XrefError::Start));
    }

    let (mut xref, mut trailer, mut xref_version) = xref_and_trailer(buffer, xref_start)?;

    let mut already_seen = HashSet::new();
    already_seen.insert(xref_start as i64);
    let mut prev = trailer.remove(b"Prev").and_then(|o| o.as_i64().ok());
    while let Some(prev_offset) = prev {
        if already_seen.contains(&prev_offset) {
            break;
        }
        already_seen.insert(prev_offset);
        if prev_offset < 0 || prev_offset as usize > buffer.len() {
            return Err(Error::Xref(XrefError::PrevStart));
        }

        let (prev_xref, mut prev_trailer, _) = xref_and_trailer(buffer, prev_offset as usize)?;
        xref.merge(prev_xref);

        if let Some(stream_offset) = prev_trailer.remove(b"XRefStm").and_then(|o| o.as_i64().ok()) {
            if stream_offset < 0 || stream_offset as usize > buffer.len() {
                return Err(Error::Xref(XrefError::StreamStart));
            }
            let (stream_xref, _, _) = xref_and_trailer(buffer, stream_offset as usize)?;
            xref.merge(stream_xref);
        }

        prev = prev_trailer.get(b"Prev").ok().and_then(|o| o.as_i64().ok());
    }

    let expected_size = xref.max_id().checked_add(1).ok_or(ParseError::InvalidObject((0, 0)))?;
    if let Ok(size) = trailer.get(b"Size").and_then(Object::as_i64) {
        if size as u32 != expected_size {
            warn!("trailer /Size is {size}, correct value is {expected_size}");
        }
    }

    if trailer.has(b"Encrypt") {
        warn!("document trailer declares /Encrypt; decryption is not attempted");
    }

    // The newest revision (the one `startxref` points straight at) decides
    // the style future incremental updates must keep using.
    if xref_version.is_empty() {
        xref_version = version.clone();
    }

    Ok(ParsedStructure {
        version,
        trailer,
        xref,
        xref_position: xref_start as u64,
        xref_version,
    })
}

/// Parses one indirect object at its xref-reported offset.
pub fn find_object(bytes: &[u8], xref: &XrefTable, id: ObjectId) -> Result<Object> {
    let entry = xref.get(id.0).ok_or(XrefError::MissingEntry(id.0, id.1))?;
    if !entry.in_use {
        return Err(Error::Xref(XrefError::MissingEntry(id.0, id.1)));
    }
    let offset = entry.offset as usize;
    if offset > bytes.len() {
        return Err(Error::Parse(ParseError::InvalidOffset(offset)));
    }
    let (_, (found_id, value)) =
        lexer::indirect_object(&bytes[offset..]).map_err(|_| ParseError::InvalidObject(id))?;
    if found_id.0 != id.0 {
        return Err(Error::Parse(ParseError::InvalidObject(id)));
    }
    Ok(value)
}

/// Locates the offset `startxref` points at by scanning backward from the
/// last `%%EOF` within the final 512 bytes of the buffer — the same
/// heuristic used to tolerate garbage appended after the real end of file.
fn get_xref_start(buffer: &[u8]) -> Result<usize> {
    let seek_pos = buffer.len().saturating_sub(cmp::min(buffer.len(), 512));
    let eof_pos = search_substring(buffer, b"%%EOF", seek_pos).ok_or(Error::Xref(XrefError::Start))?;
    if eof_pos <= 25 {
        return Err(Error::Xref(XrefError::Start));
    }
    let xref_pos = search_substring(buffer, b"startxref", eof_pos.saturating_sub(25)).ok_or(Error::Xref(XrefError::Start))?;
    let (_, offset) = lexer::integer(&buffer[xref_pos + b"startxref".len()..]).map_err(|_| Error::Xref(XrefError::Start))?;
    if offset < 0 {
        return Err(Error::Xref(XrefError::Start));
    }
    Ok(offset as usize)
}

fn search_substring(buffer: &[u8], pattern: &[u8], start_pos: usize) -> Option<usize> {
    buffer
        .get(start_pos..)?
        .windows(pattern.len())
        .rposition(|window| window == pattern)
        .map(|pos| start_pos + pos)
}

/// Parses one xref section (classic `xref`/`trailer`, or a `/Type /XRef`
/// cross-reference stream) anchored at `offset`. Returns the flattened
/// entries, the trailer dictionary, and `"1.5"` if this section was a
/// stream (empty string for classic, resolved by the caller).
fn xref_and_trailer(buffer: &[u8], offset: usize) -> Result<(XrefTable, Dictionary, String)> {
    let slice = &buffer[offset..];
    let trimmed = skip_ws(slice);
    if trimmed.starts_with(b"xref") {
        classic_xref(trimmed)
    } else {
        let (_, (_, value)) = lexer::indirect_object(slice).map_err(|_| Error::Xref(XrefError::Invalid))?;
        let stream = value.as_stream().map_err(|_| Error::Xref(XrefError::Invalid))?;
        let table = decode_xref_stream(stream)?;
        Ok((table, stream.dict.clone(), "1.5".to_string()))
    }
}

fn skip_ws(mut input: &[u8]) -> &[u8] {
    while let Some(&b) = input.first() {
        if b.is_ascii_whitespace() {
            input = &input[1..];
        } else {
            break;
        }
    }
    input
}

fn classic_xref(input: &[u8]) -> Result<(XrefTable, Dictionary, String)> {
    let mut rest = &input[b"xref".len()..];
    let mut table = XrefTable::new();
    loop {
        rest = skip_ws(rest);
        if rest.starts_with(b"trailer") {
            break;
        }
        let (r, start) = lexer::integer(rest).map_err(|_| Error::Xref(XrefError::Invalid))?;
        let (r, count) = lexer::integer(r).map_err(|_| Error::Xref(XrefError::Invalid))?;
        let mut r = skip_ws(r);
        // Consume the trailing end-of-line after the subsection header.
        r = skip_eol(r);
        for i in 0..count {
            if r.len() < 20 {
                return Err(Error::Xref(XrefError::Invalid));
            }
            let entry_line = &r[..20];
            let offset: u64 = std::str::from_utf8(&entry_line[0..10])
                .ok()
                .and_then(|s| s.trim().parse().ok())
                .ok_or(Error::Xref(XrefError::Invalid))?;
            let generation: u16 = std::str::from_utf8(&entry_line[11..16])
                .ok()
                .and_then(|s| s.trim().parse().ok())
                .ok_or(Error::Xref(XrefError::Invalid))?;
            let in_use = entry_line[17] == b'n';
            table.insert((start + i) as u32, XrefEntry { offset, generation, in_use });
            r = &r[20..];
        }
        rest = r;
    }
    rest = skip_ws(&rest[b"trailer".len()..]);
    let (rest, trailer) = lexer::dictionary(rest).map_err(|_| Error::Xref(XrefError::Invalid))?;
    let _ = rest;
    Ok((table, trailer, String::new()))
}

fn skip_eol(input: &[u8]) -> &[u8] {
    if input.first() == Some(&b'\r') && input.get(1) == Some(&b'\n') {
        &input[2..]
    } else if matches!(input.first(), Some(&b'\r') | Some(&b'\n')) {
        &input[1..]
    } else {
        input
    }
}

/// Decodes a cross-reference stream's rows into flat entries, per `/W` field
/// widths. Compressed (type 2) rows are recorded as in-use against their
/// container object but object-stream decoding itself is not implemented
/// (non-goal) — `find_object` will fail if one is actually dereferenced.
fn decode_xref_stream(stream: &crate::object::Stream) -> Result<XrefTable> {
    let widths = stream
        .dict
        .get(b"W")
        .and_then(Object::as_array)
        .map_err(|_| Error::Xref(XrefError::Invalid))?;
    if widths.len() != 3 {
        return Err(Error::Xref(XrefError::Invalid));
    }
    let w: Vec<usize> = widths
        .iter()
        .map(|o| o.as_i64().unwrap_or(0) as usize)
        .collect();

    let size = stream.dict.get(b"Size").and_then(Object::as_i64).unwrap_or(0);
    let index: Vec<i64> = match stream.dict.get(b"Index").and_then(Object::as_array) {
        Ok(items) => items.iter().filter_map(|o| o.as_i64().ok()).collect(),
        Err(_) => vec![0, size],
    };

    let row_len = w[0] + w[1] + w[2];
    let mut table = XrefTable::new();
    let mut pos = 0usize;
    let mut idx = 0usize;
    while idx + 1 < index.len() {
        let start = index[idx];
        let count = index[idx + 1];
        for i in 0..count {
            if pos + row_len > stream.content.len() {
                return Err(Error::Xref(XrefError::Invalid));
            }
            let field_type = if w[0] == 0 { 1 } else { read_be(&stream.content[pos..pos + w[0]]) };
            let f2 = read_be(&stream.content[pos + w[0]..pos + w[0] + w[1]]);
            let f3 = read_be(&stream.content[pos + w[0] + w[1]..pos + row_len]);
            pos += row_len;
            let oid = (start + i) as u32;
            match field_type {
                0 => table.insert(oid, XrefEntry { offset: f2, generation: f3 as u16, in_use: false }),
                1 => table.insert(oid, XrefEntry { offset: f2, generation: f3 as u16, in_use: true }),
                2 => table.insert(oid, XrefEntry { offset: f2, generation: 0, in_use: true }),
                _ => return Err(Error::Xref(XrefError::Invalid)),
            }
        }
        idx += 2;
    }
    Ok(table)
}

fn read_be(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0u64, |acc, &b| (acc << 8) | b as u64)
}

pub use lexer::{indirect_object, object as parse_value};
