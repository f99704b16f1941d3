use crate::dictionary::Dictionary;
use crate::object::{Object, ObjectId, Stream};
use crate::writer::{serialize_indirect, Offset};

/// Builds a cross-reference stream object plus `startxref`/`%%EOF` tail.
/// `xref_oid` is the object id allocated for the stream itself; it must
/// already be present once in `offsets` (pointing at `self_offset`, where
/// the stream object's `obj` record will start in the final output).
pub fn build_xref_stream(
    offsets: &[Offset], max_oid: u32, trailer: &Dictionary, xref_oid: ObjectId, self_offset: u64, rebuild: bool,
) -> Vec<u8> {
    let mut entries: Vec<(u32, u16, u64, u8)> = offsets
        .iter()
        .map(|o| (o.id.0, o.id.1, o.offset, 1u8))
        .collect();
    entries.sort_by_key(|e| e.0);
    if rebuild {
        entries.insert(0, (0, 65535, 0, 0));
    }

    let max_offset = entries.iter().map(|e| e.2).max().unwrap_or(0).max(self_offset);
    let offset_width = byte_width(max_offset);
    let w = [1usize, offset_width, 2usize];

    let mut content = Vec::with_capacity(entries.len() * (w[0] + w[1] + w[2]));
    let mut index_bounds: Vec<(u32, u32)> = Vec::new();
    let mut prev_oid: Option<u32> = None;
    let mut run_start = 0u32;
    let mut run_len = 0u32;
    for &(oid, gen, offset, kind) in &entries {
        write_be(&mut content, kind as u64, w[0]);
        write_be(&mut content, offset, w[1]);
        write_be(&mut content, gen as u64, w[2]);

        match prev_oid {
            Some(p) if oid == p + 1 => run_len += 1,
            _ => {
                if run_len > 0 {
                    index_bounds.push((run_start, run_len));
                }
                run_start = oid;
                run_len = 1;
            }
        }
        prev_oid = Some(oid);
    }
    if run_len > 0 {
        index_bounds.push((run_start, run_len));
    }

    let index: Vec<Object> = index_bounds
        .iter()
        .flat_map(|&(start, len)| [Object::Integer(start as i64), Object::Integer(len as i64)])
        .collect();

    let mut dict = trailer.clone();
    dict.remove(b"Filter");
    dict.remove(b"DecodeParms");
    dict.set("Type", Object::name("XRef"));
    dict.set("Size", Object::Integer(max_oid as i64 + 1));
    dict.set(
        "W",
        Object::Array(w.iter().map(|&n| Object::Integer(n as i64)).collect()),
    );
    dict.set("Index", Object::Array(index));

    let stream = Stream::new(dict, content);
    let mut out = serialize_indirect(xref_oid, &Object::Stream(stream));
    out.extend_from_slice(format!("startxref\n{self_offset}\n%%EOF\n").as_bytes());
    out
}

fn byte_width(value: u64) -> usize {
    let mut width = 1;
    let mut v = value;
    while v > 0xff {
        v >>= 8;
        width += 1;
    }
    width
}

fn write_be(out: &mut Vec<u8>, value: u64, width: usize) {
    for i in (0..width).rev() {
        out.push(((value >> (8 * i)) & 0xff) as u8);
    }
}
