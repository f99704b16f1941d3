use std::collections::BTreeMap;

/// One entry of the original document's cross-reference table, indexed by
/// object number. Generation and in-use status are kept per the classic PDF
/// xref entry shape even when the entry came from a cross-reference stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct XrefEntry {
    pub offset: u64,
    pub generation: u16,
    pub in_use: bool,
}

/// Index into `Document::original_bytes`: object number → where its `obj`
/// record starts. Built once by `parser::parse_structure` and never mutated
/// afterward — all new state lives in `Document::overrides`.
#[derive(Debug, Clone, Default)]
pub struct XrefTable {
    pub entries: BTreeMap<u32, XrefEntry>,
}

impl XrefTable {
    pub fn new() -> Self {
        XrefTable::default()
    }

    pub fn get(&self, oid: u32) -> Option<&XrefEntry> {
        self.entries.get(&oid)
    }

    pub fn insert(&mut self, oid: u32, entry: XrefEntry) {
        // First-parsed-wins: an entry already present came from a more recent
        // revision (xref chains are walked from `Document::open` innermost
        // outward in terms of recency, outermost in terms of ascending
        // offset), so do not let a `/Prev` chain's older entry replace it.
        self.entries.entry(oid).or_insert(entry);
    }

    pub fn max_id(&self) -> u32 {
        self.entries.keys().next_back().copied().unwrap_or(0)
    }

    pub fn merge(&mut self, other: XrefTable) {
        for (oid, entry) in other.entries {
            self.insert(oid, entry);
        }
    }
}
