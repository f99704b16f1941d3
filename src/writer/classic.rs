use crate::dictionary::Dictionary;
use crate::writer::Offset;

/// Builds a classic `xref` table plus `trailer` block. Entries are grouped
/// into maximal contiguous oid subsections; object 0 is written only on a
/// full rebuild (an incremental update's object 0 free entry already exists
/// in revision zero).
pub fn build_xref(offsets: &[Offset], trailer: &Dictionary, xref_offset: u64, rebuild: bool) -> Vec<u8> {
    let mut entries: Vec<(u32, u16, u64)> = offsets.iter().map(|o| (o.id.0, o.id.1, o.offset)).collect();
    entries.sort_by_key(|e| e.0);

    let mut out = Vec::new();
    out.extend_from_slice(b"xref\n");

    let mut subsections: Vec<Vec<(u32, u16, u64)>> = Vec::new();
    if rebuild {
        subsections.push(vec![(0, 65535, 0)]);
    }
    let mut current: Vec<(u32, u16, u64)> = Vec::new();
    for entry in entries {
        if let Some(last) = current.last() {
            if entry.0 != last.0 + 1 {
                subsections.push(std::mem::take(&mut current));
            }
        }
        current.push(entry);
    }
    if !current.is_empty() {
        subsections.push(current);
    }

    for subsection in &subsections {
        if subsection.is_empty() {
            continue;
        }
        let start = subsection[0].0;
        out.extend_from_slice(format!("{} {}\n", start, subsection.len()).as_bytes());
        for &(oid, gen, offset) in subsection {
            if oid == 0 && gen == 65535 && offset == 0 {
                out.extend_from_slice(b"0000000000 65535 f \n");
            } else {
                out.extend_from_slice(format!("{offset:010} {gen:05} n \n").as_bytes());
            }
        }
    }

    out.extend_from_slice(b"trailer\n");
    trailer.write_to(&mut out);
    out.push(b'\n');
    out.extend_from_slice(format!("startxref\n{xref_offset}\n%%EOF\n").as_bytes());
    out
}
