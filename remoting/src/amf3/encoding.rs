use bytes::BufMut;
use tracing::warn;

use crate::{EncodeError, amf3::*};

const U29_MASK: u32 = 0x1F_FF_FF_FF;
const U28_MAX: u32 = (1 << 28) - 1;

// The peer accepts integers in this band only, note that it is not symmetric
// with the full 29-bit signed range.
const INT28_MAX: i32 = 0x0F_FF_FF_FF;
const INT28_MIN: i32 = -0x0F_FF_FF_FF;

/// Inline traits of an anonymous object: no sealed members, dynamic, not
/// externalizable.
const DYNAMIC_ANONYMOUS_TRAITS: u32 = 0x0B;

/// Inline empty string, also terminates associative and dynamic sections.
const EMPTY_STRING: u32 = 0x01;

pub struct Amf3EncoderState<T> {
    pub(crate) buf: T,
    // Markers of the complex values written inline, in object-table order.
    complexes: Vec<u8>,
}

impl<T> Amf3EncoderState<T>
where
    T: BufMut,
{
    pub fn new(buf: T) -> Self {
        Self {
            buf,
            complexes: vec![],
        }
    }

    pub fn into_inner(self) -> T {
        self.buf
    }

    pub fn put_value(&mut self, amf3_value: &Amf3Value) -> Result<(), EncodeError> {
        match amf3_value {
            Amf3Value::Undefined => self.put_marker(UNDEFINED),
            Amf3Value::Null => self.put_marker(NULL),
            Amf3Value::Boolean(b) => self.put_boolean(*b),
            Amf3Value::Integer(i) => self.put_integer(*i)?,
            Amf3Value::Double(d) => self.put_double(*d),
            Amf3Value::String(s) => self.put_string(s)?,
            Amf3Value::Date(d) => self.put_date(*d)?,
            Amf3Value::ByteArray(ba) => self.put_byte_array(ba)?,
            Amf3Value::Array(dense) => self.put_array(dense)?,
            Amf3Value::AssocArray(associative) => self.put_assoc_array(associative)?,
            Amf3Value::Object { members, .. } => self.put_object(members)?,
            Amf3Value::Reference(idx) => self.put_reference(*idx)?,
            Amf3Value::Other(opaque) => {
                let text = opaque.to_string();
                warn!(%text, "Value without AMF3 type, encoding it as a string.");
                self.put_string(&text)?
            }
        }
        Ok(())
    }

    /// Write an unsigned 29-bit integer using 1 to 4 bytes. The last byte of
    /// the 4-byte form carries 8 bits instead of 7.
    pub fn put_u29(&mut self, value: u32) -> Result<(), EncodeError> {
        let u29 = value & U29_MASK;
        match u29 {
            n if n < 0x80 => {
                self.buf.put_u8(n as u8);
            }
            n if n < 0x40_00 => {
                self.buf.put_u8((((n >> 7) & 0x7F) | 0x80) as u8);
                self.buf.put_u8((n & 0x7F) as u8);
            }
            n if n < 0x20_00_00 => {
                self.buf.put_u8((((n >> 14) & 0x7F) | 0x80) as u8);
                self.buf.put_u8((((n >> 7) & 0x7F) | 0x80) as u8);
                self.buf.put_u8((n & 0x7F) as u8);
            }
            n if n < 0x40_00_00_00 => {
                self.buf.put_u8((((n >> 22) & 0x7F) | 0x80) as u8);
                self.buf.put_u8((((n >> 15) & 0x7F) | 0x80) as u8);
                self.buf.put_u8((((n >> 8) & 0x7F) | 0x80) as u8);
                self.buf.put_u8((n & 0xFF) as u8);
            }
            _ => return Err(EncodeError::IntegerOutOfRange(value)),
        }
        Ok(())
    }

    /// Write UTF-8 text prefixed either with an inline AMF3 length
    /// (`as_u29_len`) or with a plain big-endian `u16` length.
    pub fn put_utf(&mut self, s: &str, as_u29_len: bool) -> Result<(), EncodeError> {
        if as_u29_len {
            if s.len() > U28_MAX as usize {
                return Err(EncodeError::StringTooLong(s.len()));
            }
            self.put_u29(((s.len() as u32) << 1) | 0b1)?;
        } else {
            if s.len() > u16::MAX as usize {
                return Err(EncodeError::UriTooLong(s.len()));
            }
            self.buf.put_u16(s.len() as u16);
        }
        self.buf.put_slice(s.as_bytes());
        Ok(())
    }

    fn put_marker(&mut self, marker: u8) {
        self.buf.put_u8(marker);
    }

    fn put_boolean(&mut self, b: bool) {
        match b {
            false => self.put_marker(FALSE),
            true => self.put_marker(TRUE),
        }
    }

    fn put_integer(&mut self, i: i32) -> Result<(), EncodeError> {
        if !(INT28_MIN..=INT28_MAX).contains(&i) {
            self.put_double(i as f64);
            return Ok(());
        }
        self.put_marker(INTEGER);
        self.put_u29((i as u32) & U29_MASK)
    }

    fn put_double(&mut self, d: f64) {
        self.put_marker(DOUBLE);
        self.buf.put_f64(d);
    }

    fn put_string(&mut self, s: &str) -> Result<(), EncodeError> {
        self.put_marker(STRING);
        self.put_string_raw(s)
    }

    // Strings are always written inline, the encoder keeps no string table.
    fn put_string_raw(&mut self, s: &str) -> Result<(), EncodeError> {
        if s.is_empty() {
            return self.put_u29(EMPTY_STRING);
        }
        self.put_utf(s, true)
    }

    fn put_date(&mut self, d: f64) -> Result<(), EncodeError> {
        self.put_marker(DATE);
        self.complexes.push(DATE);
        self.put_u29(1)?;
        self.buf.put_f64(d);
        Ok(())
    }

    fn put_byte_array(&mut self, ba: &[u8]) -> Result<(), EncodeError> {
        if ba.len() > U28_MAX as usize {
            return Err(EncodeError::ByteArrayTooLong(ba.len()));
        }
        self.put_marker(BYTE_ARRAY);
        self.complexes.push(BYTE_ARRAY);
        self.put_u29(((ba.len() as u32) << 1) | 0b1)?;
        self.buf.put_slice(ba);
        Ok(())
    }

    fn put_array(&mut self, dense: &[Amf3Value]) -> Result<(), EncodeError> {
        if dense.len() > U28_MAX as usize {
            return Err(EncodeError::ArrayTooLong(dense.len()));
        }
        self.put_marker(ARRAY);
        self.complexes.push(ARRAY);
        self.put_u29(((dense.len() as u32) << 1) | 0b1)?;
        self.put_u29(EMPTY_STRING)?;
        for value in dense {
            self.put_value(value)?;
        }
        Ok(())
    }

    fn put_assoc_array(&mut self, associative: &Members) -> Result<(), EncodeError> {
        self.put_marker(ARRAY);
        self.complexes.push(ARRAY);
        // no ordinal part
        self.put_u29(0b1)?;
        self.put_pairs(associative)
    }

    fn put_object(&mut self, members: &Members) -> Result<(), EncodeError> {
        self.put_marker(OBJECT);
        self.complexes.push(OBJECT);
        self.put_u29(DYNAMIC_ANONYMOUS_TRAITS)?;
        self.put_string_raw("")?;
        self.put_pairs(members)
    }

    // Only containers written earlier by this encoder can be referenced.
    fn put_reference(&mut self, idx: usize) -> Result<(), EncodeError> {
        let marker = *self
            .complexes
            .get(idx)
            .ok_or(EncodeError::BadReference(idx))?;
        self.put_marker(marker);
        self.put_u29((idx as u32) << 1)
    }

    fn put_pairs(&mut self, pairs: &Members) -> Result<(), EncodeError> {
        for (key, value) in pairs {
            self.put_string_raw(key)?;
            self.put_value(value)?;
        }
        self.put_u29(EMPTY_STRING)
    }
}
