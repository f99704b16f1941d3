use std::fmt;

use crate::dictionary::Dictionary;
use crate::error::{Error, Result};

/// Identity of an indirect object: object number and generation number.
pub type ObjectId = (u32, u16);

/// How a `String` value was written in the source (or should be written on output).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringFormat {
    Literal,
    Hexadecimal,
}

/// A stream's payload: its dictionary, its raw bytes, and whether those bytes
/// are already filtered. Folding the stream payload into `Object::Stream`
/// (rather than a separate struct keyed by oid) makes "a stream only attaches
/// to a dictionary" a type-level invariant instead of a runtime check.
#[derive(Debug, Clone, PartialEq)]
pub struct Stream {
    pub dict: Dictionary,
    pub content: Vec<u8>,
    pub filtered: bool,
    /// Byte offset of the first content byte within the original document,
    /// set only for streams parsed out of `original_bytes`.
    pub start_position: Option<usize>,
}

impl Stream {
    pub fn new(dict: Dictionary, content: Vec<u8>) -> Self {
        let mut dict = dict;
        dict.set("Length", Object::Integer(content.len() as i64));
        Stream {
            dict,
            content,
            filtered: false,
            start_position: None,
        }
    }

    pub fn set_content(&mut self, content: Vec<u8>) {
        self.dict.set("Length", Object::Integer(content.len() as i64));
        self.content = content;
    }
}

/// The PDF value tree: a tagged variant over every primitive a `Document` can
/// hold. `RawToken` is the escape hatch used for pre-serialized placeholder
/// bytes (the signature's `/ByteRange` and `/Contents` reservations) that must
/// not be re-escaped when the containing dictionary is serialized.
#[derive(Debug, Clone, PartialEq)]
pub enum Object {
    Null,
    Boolean(bool),
    Integer(i64),
    Real(f64),
    Name(Vec<u8>),
    String(Vec<u8>, StringFormat),
    Array(Vec<Object>),
    Dictionary(Dictionary),
    Stream(Stream),
    Reference(ObjectId),
    RawToken(Vec<u8>),
}

impl Object {
    pub fn name<S: Into<Vec<u8>>>(name: S) -> Self {
        Object::Name(name.into())
    }

    pub fn string_literal<S: Into<Vec<u8>>>(s: S) -> Self {
        Object::String(s.into(), StringFormat::Literal)
    }

    pub fn reference(id: ObjectId) -> Self {
        Object::Reference(id)
    }

    pub fn array<I: Into<Vec<Object>>>(items: I) -> Self {
        Object::Array(items.into())
    }

    pub fn as_reference(&self) -> Result<ObjectId> {
        match self {
            Object::Reference(id) => Ok(*id),
            _ => Err(Error::MixedReference),
        }
    }

    pub fn as_array(&self) -> Result<&[Object]> {
        match self {
            Object::Array(items) => Ok(items),
            _ => Err(Error::Parse(crate::error::ParseError::InvalidDictionary)),
        }
    }

    pub fn as_array_mut(&mut self) -> Result<&mut Vec<Object>> {
        match self {
            Object::Array(items) => Ok(items),
            _ => Err(Error::Parse(crate::error::ParseError::InvalidDictionary)),
        }
    }

    pub fn as_dict(&self) -> Result<&Dictionary> {
        match self {
            Object::Dictionary(dict) => Ok(dict),
            Object::Stream(stream) => Ok(&stream.dict),
            _ => Err(Error::Parse(crate::error::ParseError::InvalidDictionary)),
        }
    }

    pub fn as_dict_mut(&mut self) -> Result<&mut Dictionary> {
        match self {
            Object::Dictionary(dict) => Ok(dict),
            Object::Stream(stream) => Ok(&mut stream.dict),
            _ => Err(Error::Parse(crate::error::ParseError::InvalidDictionary)),
        }
    }

    pub fn as_stream(&self) -> Result<&Stream> {
        match self {
            Object::Stream(stream) => Ok(stream),
            _ => Err(Error::Parse(crate::error::ParseError::InvalidDictionary)),
        }
    }

    pub fn as_stream_mut(&mut self) -> Result<&mut Stream> {
        match self {
            Object::Stream(stream) => Ok(stream),
            _ => Err(Error::Parse(crate::error::ParseError::InvalidDictionary)),
        }
    }

    pub fn as_i64(&self) -> Result<i64> {
        match self {
            Object::Integer(i) => Ok(*i),
            Object::Real(r) => Ok(*r as i64),
            _ => Err(Error::Parse(crate::error::ParseError::InvalidDictionary)),
        }
    }

    pub fn as_f64(&self) -> Result<f64> {
        match self {
            Object::Integer(i) => Ok(*i as f64),
            Object::Real(r) => Ok(*r),
            _ => Err(Error::Parse(crate::error::ParseError::InvalidDictionary)),
        }
    }

    pub fn as_name(&self) -> Result<&[u8]> {
        match self {
            Object::Name(n) => Ok(n),
            _ => Err(Error::Parse(crate::error::ParseError::InvalidDictionary)),
        }
    }

    pub fn as_str(&self) -> Result<&[u8]> {
        match self {
            Object::String(s, _) => Ok(s),
            _ => Err(Error::Parse(crate::error::ParseError::InvalidDictionary)),
        }
    }

    /// A list of more than one reference where a single reference was
    /// wanted is a deliberate `MixedReference` error rather than "take the
    /// first one".
    pub fn as_single_reference(&self) -> Result<ObjectId> {
        match self {
            Object::Reference(id) => Ok(*id),
            Object::Array(items) if items.len() == 1 => items[0].as_reference(),
            Object::Array(_) => Err(Error::MixedReference),
            _ => Err(Error::Parse(crate::error::ParseError::InvalidDictionary)),
        }
    }

    /// Serializes this value to its canonical PDF textual form. Streams are
    /// serialized as just their dictionary here; the `stream ... endstream`
    /// framing is added by `writer::serialize_indirect` since it is only
    /// valid at the top level of an indirect object.
    pub fn write_to(&self, out: &mut Vec<u8>) {
        match self {
            Object::Null => out.extend_from_slice(b"null"),
            Object::Boolean(b) => out.extend_from_slice(if *b { b"true" } else { b"false" }),
            Object::Integer(i) => {
                let mut buf = itoa::Buffer::new();
                out.extend_from_slice(buf.format(*i).as_bytes());
            }
            Object::Real(r) => write_real(*r, out),
            Object::Name(name) => write_name(name, out),
            Object::String(s, StringFormat::Literal) => write_literal_string(s, out),
            Object::String(s, StringFormat::Hexadecimal) => write_hex_string(s, out),
            Object::Array(items) => {
                out.push(b'[');
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push(b' ');
                    }
                    item.write_to(out);
                }
                out.push(b']');
            }
            Object::Dictionary(dict) => dict.write_to(out),
            Object::Stream(stream) => stream.dict.write_to(out),
            Object::Reference(id) => {
                let mut buf = itoa::Buffer::new();
                out.extend_from_slice(buf.format(id.0).as_bytes());
                out.push(b' ');
                out.extend_from_slice(buf.format(id.1).as_bytes());
                out.extend_from_slice(b" R");
            }
            Object::RawToken(bytes) => out.extend_from_slice(bytes),
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.write_to(&mut out);
        out
    }
}

impl From<i64> for Object {
    fn from(i: i64) -> Self {
        Object::Integer(i)
    }
}

impl From<i32> for Object {
    fn from(i: i32) -> Self {
        Object::Integer(i as i64)
    }
}

impl From<f64> for Object {
    fn from(r: f64) -> Self {
        Object::Real(r)
    }
}

impl From<bool> for Object {
    fn from(b: bool) -> Self {
        Object::Boolean(b)
    }
}

impl From<ObjectId> for Object {
    fn from(id: ObjectId) -> Self {
        Object::Reference(id)
    }
}

impl From<&str> for Object {
    fn from(s: &str) -> Self {
        Object::Name(s.as_bytes().to_vec())
    }
}

impl From<Dictionary> for Object {
    fn from(d: Dictionary) -> Self {
        Object::Dictionary(d)
    }
}

impl From<Vec<Object>> for Object {
    fn from(items: Vec<Object>) -> Self {
        Object::Array(items)
    }
}

impl fmt::Display for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.to_bytes()))
    }
}

fn write_real(r: f64, out: &mut Vec<u8>) {
    if r.fract() == 0.0 && r.abs() < 1e15 {
        let mut buf = itoa::Buffer::new();
        out.extend_from_slice(buf.format(r as i64).as_bytes());
        return;
    }
    let mut s = format!("{r:.6}");
    while s.ends_with('0') {
        s.pop();
    }
    if s.ends_with('.') {
        s.pop();
    }
    out.extend_from_slice(s.as_bytes());
}

fn needs_name_escape(b: u8) -> bool {
    !(0x21..=0x7e).contains(&b) || matches!(b, b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%' | b'#')
}

fn write_name(name: &[u8], out: &mut Vec<u8>) {
    out.push(b'/');
    for &b in name {
        if needs_name_escape(b) {
            out.push(b'#');
            out.extend_from_slice(format!("{b:02x}").as_bytes());
        } else {
            out.push(b);
        }
    }
}

fn write_literal_string(s: &[u8], out: &mut Vec<u8>) {
    out.push(b'(');
    for &b in s {
        match b {
            b'\\' => out.extend_from_slice(b"\\\\"),
            b'(' => out.extend_from_slice(b"\\("),
            b')' => out.extend_from_slice(b"\\)"),
            b'\r' => out.extend_from_slice(b"\\r"),
            b'\n' => out.extend_from_slice(b"\\n"),
            b'\t' => out.extend_from_slice(b"\\t"),
            0x08 => out.extend_from_slice(b"\\b"),
            0x0c => out.extend_from_slice(b"\\f"),
            0x20..=0x7e => out.push(b),
            _ => out.extend_from_slice(format!("\\{b:03o}").as_bytes()),
        }
    }
    out.push(b')');
}

fn write_hex_string(s: &[u8], out: &mut Vec<u8>) {
    out.push(b'<');
    for &b in s {
        out.extend_from_slice(format!("{b:02X}").as_bytes());
    }
    out.push(b'>');
}
