use crate::object::ObjectId;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced at the boundary operations: `open`, `prepare_signature`, `emit`.
///
/// Lookup failures inside `get_object` are not represented here: absence is
/// `None`, not an error. Only callers that require an object to exist turn
/// that absence into one of the named variants below.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("xref error: {0}")]
    Xref(#[from] XrefError),

    #[error("document has no resolvable /Root catalog")]
    MissingRoot,

    #[error("referenced object {0:?} does not exist or is not in use")]
    MissingReference(ObjectId),

    #[error("document has no resolvable /Info dictionary")]
    MissingInfo,

    #[error("page index {0} is out of range or not a /Page node")]
    InvalidPage(usize),

    #[error("page tree node is neither /Pages nor /Page, or /Kids could not be resolved")]
    InvalidTree,

    #[error("expected a single indirect reference but found a list of references")]
    MixedReference,

    #[error("failed to load PKCS#12 bundle: {0}")]
    CertLoad(String),

    #[error("failed to embed image appearance: {0}")]
    Image(String),

    #[error("a signature is already pending on this document")]
    AlreadyPrepared,

    #[error("PKCS#7 signer failed: {0}")]
    Signer(String),

    #[error("invalid PDF version string: {0:?}, expected /^PDF-1\\.[0-7]$/")]
    InvalidVersion(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(thiserror::Error, Debug)]
pub enum ParseError {
    #[error("input does not start with a recognizable %PDF- header")]
    InvalidFileHeader,

    #[error("object {0:?} could not be parsed at its xref-reported offset")]
    InvalidObject(ObjectId),

    #[error("offset {0} lies outside the document buffer")]
    InvalidOffset(usize),

    #[error("stream dictionary is missing or has an invalid /Length")]
    InvalidStream,

    #[error("malformed dictionary")]
    InvalidDictionary,

    #[error("unexpected end of input while parsing")]
    UnexpectedEof,
}

#[derive(thiserror::Error, Debug)]
pub enum XrefError {
    #[error("could not locate startxref / the xref table")]
    Start,

    #[error("/Prev offset in trailer is out of bounds")]
    PrevStart,

    #[error("/XRefStm offset in trailer is out of bounds")]
    StreamStart,

    #[error("xref table is malformed")]
    Invalid,

    #[error("no xref entry for object {0} {1}")]
    MissingEntry(u32, u16),
}
