//! Incremental PDF mutation and detached PKCS#7 signature preparation.
//!
//! [`Document::open`] parses an existing PDF into a dual-source object
//! graph (original bytes plus in-memory overrides); [`Document::emit`]
//! serializes it back out, either as an appended incremental revision or a
//! full rebuild. [`Document::prepare_signature`] reserves a signature field
//! and wires it into the page/AcroForm/Info structure; the actual
//! cryptographic work (certificate loading, CMS signing, raster embedding)
//! is delegated to the traits in [`signature::ports`], which callers supply.

pub mod config;
pub mod dictionary;
pub mod document;
pub mod error;
pub mod object;
pub mod pages;
pub mod parser;
pub mod signature;
pub mod writer;
pub(crate) mod xref;

#[cfg(test)]
mod test_support;

pub use config::Config;
pub use dictionary::Dictionary;
pub use document::{Document, ObjectKind};
pub use error::{Error, ParseError, Result, XrefError};
pub use object::{Object, ObjectId, Stream, StringFormat};
pub use pages::PageRef;
