use bytes::{Buf, Bytes};
use tracing::{trace, warn};

use crate::{DecodeError, amf3::*};

/// AMF0 string marker, the only non-AMF3 header value understood.
const AMF0_STRING: u8 = 0x02;

/// Deepest nesting of arrays and objects accepted from the peer.
pub const MAX_NESTING_DEPTH: usize = 128;

// Containers are registered before their members are decoded, so that the
// reference indices match the order in which the peer assigned them.
#[derive(Debug)]
enum Complex {
    Pending,
    Ready(Amf3Value),
}

pub struct Amf3DecoderState<T> {
    buf: T,
    strings: Vec<String>,
    traits: Vec<Traits>,
    complexes: Vec<Complex>,
    depth: usize,
}

impl<T> Amf3DecoderState<T>
where
    T: Buf,
{
    pub fn new(amf_buf: T) -> Self {
        Self {
            buf: amf_buf,
            strings: vec![],
            traits: vec![],
            complexes: vec![],
            depth: 0,
        }
    }

    /// Forget every string, trait and object seen so far. References that
    /// follow are resolved against empty tables.
    pub fn reset_tables(&mut self) {
        trace!(
            strings = self.strings.len(),
            traits = self.traits.len(),
            objects = self.complexes.len(),
            "Resetting AMF3 reference tables."
        );
        self.strings.clear();
        self.traits.clear();
        self.complexes.clear();
    }

    pub fn remaining(&self) -> usize {
        self.buf.remaining()
    }

    pub fn read_u8(&mut self) -> Result<u8, DecodeError> {
        if !self.buf.has_remaining() {
            return Err(DecodeError::UnexpectedEnd);
        }
        Ok(self.buf.get_u8())
    }

    pub fn read_u16(&mut self) -> Result<u16, DecodeError> {
        if self.buf.remaining() < 2 {
            return Err(DecodeError::UnexpectedEnd);
        }
        Ok(self.buf.get_u16())
    }

    pub fn read_u32(&mut self) -> Result<u32, DecodeError> {
        if self.buf.remaining() < 4 {
            return Err(DecodeError::UnexpectedEnd);
        }
        Ok(self.buf.get_u32())
    }

    pub fn read_f64(&mut self) -> Result<f64, DecodeError> {
        if self.buf.remaining() < 8 {
            return Err(DecodeError::UnexpectedEnd);
        }
        Ok(self.buf.get_f64())
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<Bytes, DecodeError> {
        if self.buf.remaining() < len {
            return Err(DecodeError::UnexpectedEnd);
        }
        Ok(self.buf.copy_to_bytes(len))
    }

    /// Read UTF-8 text of the given length, or prefixed with a big-endian
    /// `u16` length when `len` is `None`.
    pub fn read_utf(&mut self, len: Option<usize>) -> Result<String, DecodeError> {
        let len = match len {
            Some(len) => len,
            None => self.read_u16()? as usize,
        };
        if len == 0 {
            return Ok(String::new());
        }
        let utf8 = self.read_bytes(len)?;
        String::from_utf8(utf8.to_vec()).map_err(|_| DecodeError::InvalidUtf8)
    }

    // https://github.com/q191201771/doc/blob/master/spec-amf-file-format-spec.pdf
    // Check amf3 spec sections 1.3.1 and 3.6 to learn more about how this serialization works
    pub fn read_u29(&mut self) -> Result<u32, DecodeError> {
        let mut result: u32 = 0;
        for _ in 0..3 {
            let byte = self.read_u8()?;
            result = (result << 7) | (byte & 0x7F) as u32;
            if byte & 0x80 == 0 {
                return Ok(result);
            }
        }
        let last = self.read_u8()?;
        Ok((result << 8) | last as u32)
    }

    pub fn decode_value(&mut self) -> Result<Amf3Value, DecodeError> {
        let mut marker = self.read_u8()?;
        // AVM+ markers in front of a value carry nothing
        while marker == AVMPLUS {
            marker = self.read_u8()?;
        }

        if self.depth >= MAX_NESTING_DEPTH {
            return Err(DecodeError::NestingTooDeep(MAX_NESTING_DEPTH));
        }
        self.depth += 1;
        let result = self.decode_marked_value(marker);
        self.depth -= 1;
        result
    }

    /// Decode a header value: either an AMF3 value announced by the AVM+
    /// marker or a plain AMF0 string.
    pub fn decode_header_value(&mut self) -> Result<Amf3Value, DecodeError> {
        match self.read_u8()? {
            AVMPLUS => self.decode_value(),
            AMF0_STRING => Ok(Amf3Value::String(self.read_utf(None)?)),
            marker => Err(DecodeError::UnknownHeaderType(marker)),
        }
    }

    fn decode_marked_value(&mut self, marker: u8) -> Result<Amf3Value, DecodeError> {
        match marker {
            UNDEFINED => Ok(Amf3Value::Undefined),
            NULL => Ok(Amf3Value::Null),
            FALSE => Ok(Amf3Value::Boolean(false)),
            TRUE => Ok(Amf3Value::Boolean(true)),
            INTEGER => self.decode_integer(),
            DOUBLE => Ok(Amf3Value::Double(self.read_f64()?)),
            STRING => Ok(Amf3Value::String(self.decode_string_raw()?)),
            DATE => self.decode_date(),
            ARRAY => self.decode_array(),
            OBJECT => self.decode_object(),
            BYTE_ARRAY => self.decode_byte_array(),
            _ => Err(DecodeError::UnknownType(marker)),
        }
    }

    fn decode_integer(&mut self) -> Result<Amf3Value, DecodeError> {
        let u29 = self.read_u29()?;
        // sign extend from 29 to 32 bits
        Ok(Amf3Value::Integer(((u29 << 3) as i32) >> 3))
    }

    fn decode_string_raw(&mut self) -> Result<String, DecodeError> {
        let u29 = self.read_u29()?;
        let u28 = (u29 >> 1) as usize;
        if u29 & 0b1 == 0 {
            return self
                .strings
                .get(u28)
                .cloned()
                .ok_or(DecodeError::BadReference(u28));
        }
        if u28 == 0 {
            return Ok(String::new());
        }
        let string = self.read_utf(Some(u28))?;
        self.strings.push(string.clone());
        Ok(string)
    }

    fn decode_date(&mut self) -> Result<Amf3Value, DecodeError> {
        let u29 = self.read_u29()?;
        if u29 & 0b1 == 0 {
            return self.get_complex((u29 >> 1) as usize);
        }
        let amf_value = Amf3Value::Date(self.read_f64()?);
        self.complexes.push(Complex::Ready(amf_value.clone()));
        Ok(amf_value)
    }

    fn decode_byte_array(&mut self) -> Result<Amf3Value, DecodeError> {
        let u29 = self.read_u29()?;
        let u28 = (u29 >> 1) as usize;
        if u29 & 0b1 == 0 {
            return self.get_complex(u28);
        }
        let amf_value = Amf3Value::ByteArray(self.read_bytes(u28)?);
        self.complexes.push(Complex::Ready(amf_value.clone()));
        Ok(amf_value)
    }

    fn decode_array(&mut self) -> Result<Amf3Value, DecodeError> {
        let u29 = self.read_u29()?;
        let u28 = (u29 >> 1) as usize;
        if u29 & 0b1 == 0 {
            return self.get_complex(u28);
        }

        let idx = self.register_complex();
        let mut associative = self.decode_pairs()?;

        let amf_value = if associative.is_empty() {
            let dense = (0..u28)
                .map(|_| self.decode_value())
                .collect::<Result<_, _>>()?;
            Amf3Value::Array(dense)
        } else {
            // Mixed arrays degrade to a mapping, ordinal keys overwrite
            // colliding names.
            for i in 0..u28 {
                let value = self.decode_value()?;
                associative.insert(i.to_string(), value);
            }
            Amf3Value::AssocArray(associative)
        };

        self.complete_complex(idx, &amf_value);
        Ok(amf_value)
    }

    fn decode_object(&mut self) -> Result<Amf3Value, DecodeError> {
        let u29 = self.read_u29()?;
        if u29 & 0b1 == 0 {
            return self.get_complex((u29 >> 1) as usize);
        }

        let traits = self.decode_object_traits(u29)?;
        let idx = self.register_complex();
        let mut members = Members::new();

        if traits.externalizable {
            warn!(
                class_name = ?traits.class_name,
                "Externalizable object payload is not supported, decoding it as empty object."
            );
        } else {
            for prop in &traits.sealed_props {
                let value = self.decode_value()?;
                members.insert(prop.clone(), value);
            }
            if traits.dynamic {
                for (key, value) in self.decode_pairs()? {
                    members.insert(key, value);
                }
            }
        }

        let amf_value = Amf3Value::Object { members, traits };
        self.complete_complex(idx, &amf_value);
        Ok(amf_value)
    }

    fn decode_object_traits(&mut self, u29: u32) -> Result<Traits, DecodeError> {
        // https://github.com/q191201771/doc/blob/master/spec-amf-file-format-spec.pdf
        // Flags explained in section 3.12

        const TRAIT_REFERENCE_MASK: u32 = 0b11;
        const TRAIT_REFERENCE: u32 = 0b01;
        const EXTERNALIZABLE_FLAG: u32 = 0b100;
        const DYNAMIC_FLAG: u32 = 0b1000;

        if u29 & TRAIT_REFERENCE_MASK == TRAIT_REFERENCE {
            let trait_idx = (u29 >> 2) as usize;
            return self
                .traits
                .get(trait_idx)
                .cloned()
                .ok_or(DecodeError::BadReference(trait_idx));
        }

        let sealed_count = u29 >> 4;
        let class_name = self.decode_string_raw()?;
        let class_name = if class_name.is_empty() {
            None
        } else {
            Some(class_name)
        };
        let sealed_props = (0..sealed_count)
            .map(|_| self.decode_string_raw())
            .collect::<Result<_, _>>()?;

        let traits = Traits {
            class_name,
            externalizable: u29 & EXTERNALIZABLE_FLAG != 0,
            dynamic: u29 & DYNAMIC_FLAG != 0,
            sealed_props,
        };
        self.traits.push(traits.clone());
        Ok(traits)
    }

    /// Name/value pairs terminated by an empty name.
    fn decode_pairs(&mut self) -> Result<Members, DecodeError> {
        let mut pairs = Members::new();
        loop {
            let key = self.decode_string_raw()?;
            if key.is_empty() {
                return Ok(pairs);
            }
            let value = self.decode_value()?;
            pairs.insert(key, value);
        }
    }

    fn register_complex(&mut self) -> usize {
        self.complexes.push(Complex::Pending);
        self.complexes.len() - 1
    }

    fn complete_complex(&mut self, idx: usize, amf_value: &Amf3Value) {
        if let Some(slot) = self.complexes.get_mut(idx) {
            *slot = Complex::Ready(amf_value.clone());
        }
    }

    fn get_complex(&self, idx: usize) -> Result<Amf3Value, DecodeError> {
        match self.complexes.get(idx) {
            Some(Complex::Ready(amf_value)) => Ok(amf_value.clone()),
            Some(Complex::Pending) => Ok(Amf3Value::Reference(idx)),
            None => Err(DecodeError::BadReference(idx)),
        }
    }
}
