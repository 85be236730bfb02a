use std::{fmt, sync::Arc};

use bytes::{Bytes, BytesMut};
use indexmap::IndexMap;

use crate::{DecodeError, EncodeError};

mod decoding;
mod encoding;


pub use decoding::{Amf3DecoderState, MAX_NESTING_DEPTH};
pub use encoding::Amf3EncoderState;

pub(crate) const UNDEFINED: u8 = 0x00;
pub(crate) const NULL: u8 = 0x01;
pub(crate) const FALSE: u8 = 0x02;
pub(crate) const TRUE: u8 = 0x03;
pub(crate) const INTEGER: u8 = 0x04;
pub(crate) const DOUBLE: u8 = 0x05;
pub(crate) const STRING: u8 = 0x06;
pub(crate) const DATE: u8 = 0x08;
pub(crate) const ARRAY: u8 = 0x09;
pub(crate) const OBJECT: u8 = 0x0A;
pub(crate) const BYTE_ARRAY: u8 = 0x0C;

/// AMF0 marker announcing that an AMF3 value follows.
pub(crate) const AVMPLUS: u8 = 0x11;

/// Name/value mapping that keeps insertion order. Equality does not depend on order.
pub type Members = IndexMap<String, Amf3Value>;

#[derive(Debug, Clone, PartialEq)]
pub enum Amf3Value {
    Undefined,
    Null,
    Boolean(bool),
    Integer(i32),
    Double(f64),
    String(String),
    /// Milliseconds since the Unix epoch.
    Date(f64),
    ByteArray(Bytes),
    Array(Vec<Amf3Value>),
    /// Array with named members. Mixed arrays decode into this shape with
    /// their ordinal elements keyed by index.
    AssocArray(Members),
    Object {
        members: Members,
        traits: Traits,
    },
    /// Enclosing container identified by its object-table index. Decoding
    /// produces it for containers that reference themselves before they are
    /// complete, encoding writes it as a reference to that container.
    Reference(usize),
    /// Caller value without an AMF3 counterpart, sent as its text form.
    Other(Opaque),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Traits {
    pub class_name: Option<String>,
    pub externalizable: bool,
    pub dynamic: bool,
    pub sealed_props: Vec<String>,
}

impl Traits {
    /// Traits of an anonymous object with only dynamic members, the only
    /// shape the encoder emits.
    pub fn anonymous() -> Self {
        Self {
            class_name: None,
            externalizable: false,
            dynamic: true,
            sealed_props: vec![],
        }
    }
}

impl Default for Traits {
    fn default() -> Self {
        Self::anonymous()
    }
}

#[derive(Clone)]
pub struct Opaque(Arc<dyn fmt::Display + Send + Sync>);

impl Opaque {
    pub fn new<T>(value: T) -> Self
    where
        T: fmt::Display + Send + Sync + 'static,
    {
        Self(Arc::new(value))
    }
}

impl fmt::Display for Opaque {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl fmt::Debug for Opaque {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Opaque").field(&self.0.to_string()).finish()
    }
}

impl PartialEq for Opaque {
    fn eq(&self, other: &Self) -> bool {
        self.0.to_string() == other.0.to_string()
    }
}

impl Amf3Value {
    pub fn object(members: Members) -> Self {
        Amf3Value::Object {
            members,
            traits: Traits::anonymous(),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Amf3Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Amf3Value::Integer(i) => Some(*i as f64),
            Amf3Value::Double(d) => Some(*d),
            _ => None,
        }
    }

    /// Named members of objects and associative arrays.
    pub fn members(&self) -> Option<&Members> {
        match self {
            Amf3Value::Object { members, .. } | Amf3Value::AssocArray(members) => Some(members),
            _ => None,
        }
    }

    pub fn get(&self, key: &str) -> Option<&Amf3Value> {
        self.members().and_then(|members| members.get(key))
    }
}

impl From<bool> for Amf3Value {
    fn from(b: bool) -> Self {
        Amf3Value::Boolean(b)
    }
}

impl From<i32> for Amf3Value {
    fn from(i: i32) -> Self {
        Amf3Value::Integer(i)
    }
}

impl From<f64> for Amf3Value {
    fn from(d: f64) -> Self {
        Amf3Value::Double(d)
    }
}

impl From<&str> for Amf3Value {
    fn from(s: &str) -> Self {
        Amf3Value::String(s.to_string())
    }
}

impl From<String> for Amf3Value {
    fn from(s: String) -> Self {
        Amf3Value::String(s)
    }
}

impl From<Vec<Amf3Value>> for Amf3Value {
    fn from(values: Vec<Amf3Value>) -> Self {
        Amf3Value::Array(values)
    }
}

impl<T: Into<Amf3Value>> From<Option<T>> for Amf3Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Amf3Value::Null)
    }
}

/// Encode a single AMF3 value, type marker included.
pub fn encode_amf3_value(value: &Amf3Value) -> Result<Bytes, EncodeError> {
    let mut encoder = Amf3EncoderState::new(BytesMut::new());
    encoder.put_value(value)?;
    Ok(encoder.buf.freeze())
}

/// Decode a single AMF3 value from the start of `amf_bytes`.
///
/// Trailing bytes after the value are ignored.
pub fn decode_amf3_value(amf_bytes: Bytes) -> Result<Amf3Value, DecodeError> {
    let mut decoder = Amf3DecoderState::new(amf_bytes);
    decoder.decode_value()
}
