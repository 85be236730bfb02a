pub mod amf3;
pub mod envelope;
pub mod error;

use bytes::Bytes;
use tracing::debug;

pub use amf3::{Amf3Value, Members, Opaque, Traits, decode_amf3_value, encode_amf3_value};
pub use envelope::{Message, MessageBody, deserialize_first_body};
pub use error::{DecodeError, EncodeError};

/// Encode a request envelope with a single body addressed to `target_uri`.
pub fn encode_call(
    target_uri: &str,
    response_uri: &str,
    value: Amf3Value,
) -> Result<Bytes, EncodeError> {
    let message = Message {
        version: envelope::DEFAULT_VERSION,
        bodies: vec![MessageBody {
            target_uri: target_uri.to_string(),
            response_uri: response_uri.to_string(),
            value,
        }],
    };
    let bytes = message.serialize()?;
    debug!(%target_uri, %response_uri, len = bytes.len(), "Encoded remoting call.");
    Ok(bytes)
}

/// Decode the value of the first body of a reply envelope. A reply without
/// bodies yields `Null`.
pub fn decode_first_reply(bytes: Bytes) -> Result<Amf3Value, DecodeError> {
    let body = deserialize_first_body(bytes)?;
    Ok(body.map(|body| body.value).unwrap_or(Amf3Value::Null))
}

/// Flatten a reply value into named fields.
///
/// Objects and associative arrays are returned as they are, except typed
/// objects carrying a `body` mapping: its members come first and the other
/// members of the object are laid over them. A plain array is treated as a
/// status list and only its first element is kept under `status`, any other
/// value is put under `status` directly.
pub fn normalize_reply(value: Amf3Value) -> Members {
    match value {
        Amf3Value::Null | Amf3Value::Undefined => Members::new(),
        Amf3Value::Object { members, traits } if traits.class_name.is_some() => {
            merge_body(members)
        }
        Amf3Value::Object { members, .. } | Amf3Value::AssocArray(members) => members,
        Amf3Value::Array(values) => {
            let status = values.into_iter().next().unwrap_or(Amf3Value::Null);
            Members::from([("status".to_string(), status)])
        }
        other => Members::from([("status".to_string(), other)]),
    }
}

fn merge_body(members: Members) -> Members {
    let Some(Amf3Value::Object { members: body, .. } | Amf3Value::AssocArray(body)) =
        members.get("body")
    else {
        return members;
    };
    let mut merged = body.clone();
    merged.extend(members.into_iter().filter(|(key, _)| key != "body"));
    merged
}

#[cfg(test)]
mod lib_test {
    use bytes::Bytes;

    use crate::{
        Amf3Value, DecodeError, Members, Traits, decode_first_reply, encode_call,
        normalize_reply,
    };

    #[test]
    fn test_call_round_trip() {
        let args = Amf3Value::Array(vec![
            Amf3Value::from("Test"),
            Amf3Value::Integer(12),
            Amf3Value::object(Members::from([(
                "hash".to_string(),
                Amf3Value::from("abc"),
            )])),
        ]);
        let bytes = encode_call("Service.method", "/1", args.clone()).unwrap();
        assert_eq!(decode_first_reply(bytes).unwrap(), args);
    }

    #[test]
    fn test_reply_without_bodies() {
        let bytes = Bytes::from_static(&[0, 3, 0, 0, 0, 0]);
        assert_eq!(decode_first_reply(bytes).unwrap(), Amf3Value::Null);
    }

    #[test]
    fn test_malformed_reply() {
        assert_eq!(
            decode_first_reply(Bytes::from_static(&[0, 3, 0])),
            Err(DecodeError::UnexpectedEnd)
        );
    }

    #[test]
    fn test_normalize_reply() {
        assert!(normalize_reply(Amf3Value::Null).is_empty());

        let members = Members::from([("status".to_string(), Amf3Value::Integer(1))]);
        assert_eq!(
            normalize_reply(Amf3Value::object(members.clone())),
            members
        );
        assert_eq!(
            normalize_reply(Amf3Value::AssocArray(members.clone())),
            members
        );

        assert_eq!(
            normalize_reply(Amf3Value::Array(vec![
                Amf3Value::Integer(1),
                Amf3Value::from("ignored")
            ])),
            members
        );
        assert_eq!(
            normalize_reply(Amf3Value::Array(vec![])),
            Members::from([("status".to_string(), Amf3Value::Null)])
        );
        assert_eq!(normalize_reply(Amf3Value::Integer(1)), members);
    }

    #[test]
    fn test_normalize_typed_reply_merges_body() {
        let typed = |members| Amf3Value::Object {
            members,
            traits: Traits {
                class_name: Some("flex.messaging.messages.AcknowledgeMessage".to_string()),
                ..Traits::anonymous()
            },
        };
        let body = Amf3Value::object(Members::from([
            ("status".to_string(), Amf3Value::Integer(1)),
            ("messageId".to_string(), Amf3Value::from("from body")),
        ]));
        let reply = typed(Members::from([
            ("messageId".to_string(), Amf3Value::from("abc")),
            ("body".to_string(), body),
        ]));

        let normalized = normalize_reply(reply);
        assert_eq!(
            normalized.keys().collect::<Vec<_>>(),
            vec!["status", "messageId"]
        );
        assert_eq!(normalized.get("status"), Some(&Amf3Value::Integer(1)));
        assert_eq!(normalized.get("messageId"), Some(&Amf3Value::from("abc")));

        // a body that is not a mapping stays a plain member
        let reply = typed(Members::from([("body".to_string(), Amf3Value::Integer(7))]));
        assert_eq!(
            normalize_reply(reply),
            Members::from([("body".to_string(), Amf3Value::Integer(7))])
        );

        // anonymous objects are not merged
        let nested = Members::from([(
            "body".to_string(),
            Amf3Value::AssocArray(Members::from([("x".to_string(), Amf3Value::Integer(1))])),
        )]);
        assert_eq!(normalize_reply(Amf3Value::object(nested.clone())), nested);
    }
}
