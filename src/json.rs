//! Mapping between JSON documents and AMF3 values.
//!
//! Dates and byte arrays have no JSON counterpart, they are written as
//! single-key objects: `{"$date": <millis>}` and `{"$bytes": "<base64>"}`.
//! References to an enclosing container are written as `{"$ref": <index>}`.

use base64::{Engine, engine::general_purpose::STANDARD};
use bytes::Bytes;
use remoting::{Amf3Value, Members};
use serde_json::{Map, Number, Value};
use thiserror::Error;

const DATE_KEY: &str = "$date";
const BYTES_KEY: &str = "$bytes";
const REF_KEY: &str = "$ref";

#[derive(Error, Debug)]
pub enum JsonError {
    #[error("\"$date\" must be a number of milliseconds")]
    InvalidDate,

    #[error("\"$bytes\" must be a base64 string")]
    BytesNotString,

    #[error("Invalid base64 in \"$bytes\": {0}")]
    InvalidBase64(#[from] base64::DecodeError),

    #[error("\"$ref\" must be a non-negative integer")]
    InvalidReference,

    #[error("Call arguments must be a JSON array")]
    ArgumentsNotArray,
}

pub fn amf_from_json(json: Value) -> Result<Amf3Value, JsonError> {
    let value = match json {
        Value::Null => Amf3Value::Null,
        Value::Bool(b) => Amf3Value::Boolean(b),
        Value::Number(n) => amf_from_number(&n),
        Value::String(s) => Amf3Value::String(s),
        Value::Array(values) => Amf3Value::Array(
            values
                .into_iter()
                .map(amf_from_json)
                .collect::<Result<_, _>>()?,
        ),
        Value::Object(map) => amf_from_map(map)?,
    };
    Ok(value)
}

/// Argument list of a remote call.
pub fn args_from_json(json: Value) -> Result<Vec<Amf3Value>, JsonError> {
    match amf_from_json(json)? {
        Amf3Value::Array(args) => Ok(args),
        _ => Err(JsonError::ArgumentsNotArray),
    }
}

fn amf_from_number(n: &Number) -> Amf3Value {
    match n.as_i64().map(i32::try_from) {
        Some(Ok(i)) => Amf3Value::Integer(i),
        _ => Amf3Value::Double(n.as_f64().unwrap_or(f64::NAN)),
    }
}

fn amf_from_map(mut map: Map<String, Value>) -> Result<Amf3Value, JsonError> {
    if map.len() == 1 {
        if let Some(date) = map.get(DATE_KEY) {
            let millis = date.as_f64().ok_or(JsonError::InvalidDate)?;
            return Ok(Amf3Value::Date(millis));
        }
        if let Some(encoded) = map.remove(BYTES_KEY) {
            let Value::String(encoded) = encoded else {
                return Err(JsonError::BytesNotString);
            };
            let bytes = STANDARD.decode(encoded)?;
            return Ok(Amf3Value::ByteArray(Bytes::from(bytes)));
        }
        if let Some(idx) = map.get(REF_KEY) {
            let idx = idx
                .as_u64()
                .and_then(|idx| usize::try_from(idx).ok())
                .ok_or(JsonError::InvalidReference)?;
            return Ok(Amf3Value::Reference(idx));
        }
    }

    let members = map
        .into_iter()
        .map(|(key, value)| Ok((key, amf_from_json(value)?)))
        .collect::<Result<Members, JsonError>>()?;
    Ok(Amf3Value::object(members))
}

pub fn amf_to_json(value: &Amf3Value) -> Value {
    match value {
        Amf3Value::Undefined | Amf3Value::Null => Value::Null,
        Amf3Value::Boolean(b) => Value::Bool(*b),
        Amf3Value::Integer(i) => Value::from(*i),
        Amf3Value::Double(d) => Number::from_f64(*d).map_or(Value::Null, Value::Number),
        Amf3Value::String(s) => Value::String(s.clone()),
        Amf3Value::Date(millis) => {
            let millis = Number::from_f64(*millis).map_or(Value::Null, Value::Number);
            Value::Object(Map::from_iter([(DATE_KEY.to_string(), millis)]))
        }
        Amf3Value::ByteArray(bytes) => Value::Object(Map::from_iter([(
            BYTES_KEY.to_string(),
            Value::String(STANDARD.encode(bytes)),
        )])),
        Amf3Value::Array(values) => Value::Array(values.iter().map(amf_to_json).collect()),
        Amf3Value::AssocArray(members) | Amf3Value::Object { members, .. } => {
            members_to_json(members)
        }
        Amf3Value::Reference(idx) => {
            Value::Object(Map::from_iter([(REF_KEY.to_string(), Value::from(*idx))]))
        }
        Amf3Value::Other(opaque) => Value::String(opaque.to_string()),
    }
}

pub fn members_to_json(members: &Members) -> Value {
    Value::Object(
        members
            .iter()
            .map(|(key, value)| (key.clone(), amf_to_json(value)))
            .collect(),
    )
}
