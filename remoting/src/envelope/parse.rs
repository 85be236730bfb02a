use bytes::Bytes;
use tracing::{debug, trace};

use crate::{DecodeError, amf3::Amf3DecoderState, envelope::MessageBody};

/// Parse the envelope framing and decode the value of its first body.
///
/// Headers are decoded and dropped. Every header and the first body get their
/// own reference tables. Bodies after the first one are never parsed, so
/// trailing garbage there is not detected.
pub fn deserialize_first_body(bytes: Bytes) -> Result<Option<MessageBody>, DecodeError> {
    let mut decoder = Amf3DecoderState::new(bytes);

    let version = decoder.read_u16()?;
    let header_count = decoder.read_u16()?;
    debug!(version, header_count, "Reading remoting envelope.");

    for _ in 0..header_count {
        skip_header(&mut decoder)?;
    }

    let body_count = decoder.read_u16()?;
    if body_count == 0 {
        debug!("Remoting envelope has no bodies.");
        return Ok(None);
    }

    let target_uri = decoder.read_utf(None)?;
    let response_uri = decoder.read_utf(None)?;
    // body length, unreliable on some peers
    let _length = decoder.read_u32()?;
    decoder.reset_tables();
    let value = decoder.decode_value()?;

    debug!(
        body_count,
        %target_uri,
        %response_uri,
        unread = decoder.remaining(),
        "Decoded first remoting body."
    );
    Ok(Some(MessageBody {
        target_uri,
        response_uri,
        value,
    }))
}

fn skip_header(decoder: &mut Amf3DecoderState<Bytes>) -> Result<(), DecodeError> {
    let name = decoder.read_utf(None)?;
    let must_understand = decoder.read_u8()? != 0;
    let _length = decoder.read_u32()?;
    decoder.reset_tables();
    let value = decoder.decode_header_value()?;
    trace!(%name, must_understand, ?value, "Skipping remoting header.");
    Ok(())
}

#[cfg(test)]
mod parse_test {
    use bytes::{BufMut, Bytes, BytesMut};

    use crate::{
        DecodeError,
        amf3::{Amf3Value, Members},
        envelope::{
            DEFAULT_RESPONSE_URI, DEFAULT_VERSION, Message, MessageBody, deserialize_first_body,
        },
    };

    fn body(target: &str, value: Amf3Value) -> MessageBody {
        MessageBody {
            target_uri: target.to_string(),
            response_uri: "/1".to_string(),
            value,
        }
    }

    #[test]
    fn test_round_trip() {
        let message = Message {
            version: 3,
            bodies: vec![body("Test", Amf3Value::from("hello"))],
        };
        let bytes = message.serialize().unwrap();
        let decoded = deserialize_first_body(bytes).unwrap();
        assert_eq!(decoded, Some(body("Test", Amf3Value::from("hello"))));
    }

    #[test]
    fn test_only_first_body_is_read() {
        let message = Message {
            version: 3,
            bodies: vec![
                body("first", Amf3Value::Integer(1)),
                body("second", Amf3Value::Integer(2)),
            ],
        };
        let mut bytes = BytesMut::from(&message.serialize().unwrap()[..]);
        // garbage after the first body is never looked at
        bytes.put_u8(0xFF);
        let decoded = deserialize_first_body(bytes.freeze()).unwrap();
        assert_eq!(decoded, Some(body("first", Amf3Value::Integer(1))));
    }

    #[test]
    fn test_no_bodies() {
        let bytes = Bytes::from_static(&[0, 3, 0, 0, 0, 0]);
        assert_eq!(deserialize_first_body(bytes), Ok(None));
    }

    #[test]
    fn test_headers_are_skipped_with_own_tables() {
        let mut buf = BytesMut::new();
        buf.put_u16(3);
        buf.put_u16(2);
        // AMF0 string header
        buf.put_u16(4);
        buf.put_slice(b"auth");
        buf.put_u8(1);
        buf.put_u32(0xFFFF_FFFF);
        buf.put_slice(&[0x02, 0x00, 0x03, b'a', b'b', b'c']);
        // AMF3 header interning "key"
        buf.put_u16(3);
        buf.put_slice(b"log");
        buf.put_u8(0);
        buf.put_u32(0);
        buf.put_slice(&[0x11, 0x06, 0x07, b'k', b'e', b'y']);
        // body referencing string 0, which only existed in the header
        buf.put_u16(1);
        buf.put_u16(0);
        buf.put_u16(0);
        buf.put_u32(0);
        buf.put_slice(&[0x11, 0x06, 0x00]);

        assert_eq!(
            deserialize_first_body(buf.freeze()),
            Err(DecodeError::BadReference(0))
        );
    }

    #[test]
    fn test_header_then_body() {
        let mut buf = BytesMut::new();
        buf.put_u16(3);
        buf.put_u16(1);
        buf.put_u16(1);
        buf.put_slice(b"h");
        buf.put_u8(0);
        buf.put_u32(2);
        buf.put_slice(&[0x11, 0x01]);
        buf.put_u16(1);
        buf.put_u16(11);
        buf.put_slice(b"/1/onResult");
        buf.put_u16(0);
        buf.put_u32(0);
        // raw AMF3 value without the AVM+ marker
        buf.put_slice(&[0x0A, 0x0B, 0x01, 0x0D, b's', b't', b'a', b't', b'u', b's', 0x04, 0x01, 0x01]);

        let decoded = deserialize_first_body(buf.freeze()).unwrap().unwrap();
        assert_eq!(decoded.target_uri, "/1/onResult");
        assert_eq!(decoded.response_uri, "");
        assert_eq!(
            decoded.value,
            Amf3Value::object(Members::from([("status".to_string(), Amf3Value::Integer(1))]))
        );
    }

    #[test]
    fn test_unknown_header_type() {
        let mut buf = BytesMut::new();
        buf.put_u16(3);
        buf.put_u16(1);
        buf.put_u16(0);
        buf.put_u8(0);
        buf.put_u32(0);
        buf.put_u8(0x03);
        assert_eq!(
            deserialize_first_body(buf.freeze()),
            Err(DecodeError::UnknownHeaderType(0x03))
        );
    }

    #[test]
    fn test_truncated_envelope() {
        let message = Message::call(
            "Test",
            vec![Amf3Value::from("hello"), Amf3Value::Integer(3)],
            DEFAULT_RESPONSE_URI,
            DEFAULT_VERSION,
        );
        let bytes = message.serialize().unwrap();
        for len in 0..bytes.len() {
            assert_eq!(
                deserialize_first_body(bytes.slice(..len)),
                Err(DecodeError::UnexpectedEnd),
                "truncated to {len} bytes"
            );
        }
    }
}
