use indexmap::IndexMap;

use crate::config::Config;
use crate::dictionary::Dictionary;
use crate::error::{Error, Result};
use crate::object::{Object, ObjectId};
use crate::pages::{self, PageRef};
use crate::parser::{self, ParsedStructure};
use crate::signature::ports::{CertBundle, Pkcs7Signer};
use crate::xref::XrefTable;

/// What kind of object `create_object` is allocating. `Signature` seeds the
/// fixed signature-dictionary keys around the caller's value instead of
/// leaving that bookkeeping to every call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    Plain,
    Signature,
}

/// Bookkeeping kept from `prepare_signature` through to `emit`: which object
/// holds the signature dictionary, and the signer port that will be asked to
/// produce the detached PKCS#7 bytes once the final byte layout is known.
pub(crate) struct PendingSignature {
    pub signature_id: ObjectId,
    pub signer: Box<dyn Pkcs7Signer>,
    pub cert_bundle: CertBundle,
}

/// The in-memory representation of a PDF revision chain: the original bytes
/// plus whatever this session has created or overridden on top of them.
/// Lookups prefer `overrides`; the parsed structure of `original_bytes` is
/// never mutated.
pub struct Document {
    pub version: String,
    pub(crate) original_bytes: Vec<u8>,
    pub(crate) original_xref: XrefTable,
    pub(crate) xref_revision_version: String,
    pub(crate) overrides: IndexMap<ObjectId, Object>,
    pub trailer: Dictionary,
    pub(crate) xref_offset_of_input: u64,
    pub(crate) max_oid: u32,
    pub(crate) page_index: Vec<PageRef>,
    pub(crate) pending_signature: Option<PendingSignature>,
    pub config: Config,
}

impl Document {
    /// Parses `bytes` and builds the page index. A page-tree failure is
    /// logged and leaves `page_index` empty rather than failing `open`, so a
    /// caller can still inspect or repair a document with a broken tree.
    pub fn open(bytes: &[u8]) -> Result<Document> {
        let ParsedStructure {
            version,
            trailer,
            xref,
            xref_position,
            xref_version,
        } = parser::parse_structure(bytes)?;

        let max_oid = xref.max_id();

        let mut document = Document {
            version,
            original_bytes: bytes.to_vec(),
            original_xref: xref,
            xref_revision_version: xref_version,
            overrides: IndexMap::new(),
            trailer,
            xref_offset_of_input: xref_position,
            max_oid,
            page_index: Vec::new(),
            pending_signature: None,
            config: Config::default(),
        };

        match pages::walk(&document) {
            Ok(index) => document.page_index = index,
            Err(err) => log::warn!("page tree walk failed, page index left empty: {err}"),
        }

        Ok(document)
    }

    /// Dual-source lookup: `overrides` wins unless `prefer_original` is set,
    /// in which case the original parse of `original_bytes` is consulted
    /// even if an override exists.
    ///
    /// Returns an owned `Object` rather than a borrow: objects pulled from
    /// `original_bytes` are re-parsed on every call instead of cached, so
    /// there is no long-lived storage inside `Document` to borrow from.
    pub fn get_object(&self, id: ObjectId, prefer_original: bool) -> Option<Object> {
        if !prefer_original {
            if let Some(obj) = self.overrides.get(&id) {
                return Some(obj.clone());
            }
        }
        let entry = self.original_xref.get(id.0)?;
        if !entry.in_use {
            return None;
        }
        parser::find_object(&self.original_bytes, &self.original_xref, id).ok()
    }

    /// If `value` is a reference, resolves it through `get_object`; a list of
    /// references is a `MixedReference` error, never "take the first one".
    pub fn resolve(&self, value: &Object) -> Result<Object> {
        match value {
            Object::Reference(id) => self.get_object(*id, false).ok_or(Error::MissingReference(*id)),
            Object::Array(items) if items.iter().all(|i| matches!(i, Object::Reference(_))) && items.len() > 1 => {
                Err(Error::MixedReference)
            }
            other => Ok(other.clone()),
        }
    }

    pub fn new_oid(&mut self) -> u32 {
        self.max_oid += 1;
        self.max_oid
    }

    /// Allocates a new object id, optionally seeding the fixed signature
    /// dictionary keys around `value`, and registers the result in
    /// `overrides`.
    pub fn create_object(&mut self, value: Object, kind: ObjectKind) -> ObjectId {
        let id = (self.new_oid(), 0);
        let value = match kind {
            ObjectKind::Plain => value,
            ObjectKind::Signature => crate::signature::seed_signature_dictionary(value, &self.config),
        };
        self.overrides.insert(id, value);
        id
    }

    pub fn add_object(&mut self, id: ObjectId, object: Object) {
        if id.0 > self.max_oid {
            self.max_oid = id.0;
        }
        self.overrides.insert(id, object);
    }

    pub fn page_count(&self) -> usize {
        self.page_index.len()
    }

    pub fn get_page(&self, index: usize) -> Option<&PageRef> {
        self.page_index.get(index)
    }

    pub fn page_size(&self, index: usize) -> Option<[f64; 4]> {
        self.page_index.get(index).map(|p| p.media_box)
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn set_version(&mut self, version: &str) -> Result<()> {
        let valid = version.len() == 7
            && version.starts_with("PDF-1.")
            && version.as_bytes()[6].is_ascii_digit()
            && (b'0'..=b'7').contains(&version.as_bytes()[6]);
        if !valid {
            return Err(Error::InvalidVersion(version.to_string()));
        }
        self.version = version.trim_start_matches("PDF-").to_string();
        Ok(())
    }

    /// Serializes the document. `rebuild = false` appends an incremental
    /// revision after the verbatim original bytes; `rebuild = true` writes
    /// every reachable object fresh with no `/Prev`. If a signature is
    /// pending, delegates to the two-pass signing emitter instead of the
    /// plain writer.
    pub fn emit(&mut self, rebuild: bool) -> Result<Vec<u8>> {
        if self.pending_signature.is_some() {
            crate::signature::coordinator::emit_signed(self, rebuild)
        } else {
            crate::writer::emit_plain(self, rebuild)
        }
    }
}

#[cfg(test)]
mod tests;
