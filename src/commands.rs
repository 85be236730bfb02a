use std::{fs, path::Path};

use anyhow::{Context, Result};
use bytes::Bytes;
use remoting::{Message, MessageBody, deserialize_first_body, normalize_reply};
use serde_json::{Value, json};
use tracing::info;

use crate::json::{amf_to_json, args_from_json, members_to_json};

#[derive(Debug, Clone)]
pub struct EncodeOptions {
    pub target: String,
    pub response_uri: String,
    pub version: u16,
    /// JSON array with the call arguments.
    pub args: String,
}

/// Build a request envelope calling `target` with the given JSON arguments.
pub fn encode_request(opts: &EncodeOptions) -> Result<Bytes> {
    let args: Value = serde_json::from_str(&opts.args).context("Failed to parse call arguments")?;
    let args = args_from_json(args)?;

    let bytes = Message::call(&opts.target, args, &opts.response_uri, opts.version)
        .serialize()
        .with_context(|| format!("Failed to encode call to {}", opts.target))?;
    Ok(bytes)
}

pub fn encode_to_file(opts: &EncodeOptions, out: &Path) -> Result<()> {
    let bytes = encode_request(opts)?;
    fs::write(out, &bytes).with_context(|| format!("Failed to write {}", out.display()))?;
    info!(target = %opts.target, path = %out.display(), len = bytes.len(), "Request written.");
    Ok(())
}

/// Decode the first body of an envelope into JSON.
///
/// With `normalize` only the normalized reply fields are returned, otherwise
/// the body's URIs are included next to its value.
pub fn decode_reply(bytes: Bytes, normalize: bool) -> Result<Value> {
    let body = deserialize_first_body(bytes).context("Failed to decode remoting envelope")?;

    let json = match (body, normalize) {
        (None, true) => json!({}),
        (None, false) => Value::Null,
        (Some(body), true) => members_to_json(&normalize_reply(body.value)),
        (Some(MessageBody {
            target_uri,
            response_uri,
            value,
        }), false) => json!({
            "target_uri": target_uri,
            "response_uri": response_uri,
            "value": amf_to_json(&value),
        }),
    };
    Ok(json)
}

/// Decode an envelope captured to a file, e.g. exported from a proxy.
pub fn decode_file(path: &Path, normalize: bool) -> Result<Value> {
    let bytes = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    info!(path = %path.display(), len = bytes.len(), "Decoding captured envelope.");
    decode_reply(Bytes::from(bytes), normalize)
}

#[cfg(test)]
mod commands_test {
    use std::env;

    use serde_json::json;

    use super::{EncodeOptions, decode_file, decode_reply, encode_request, encode_to_file};

    fn opts(args: &str) -> EncodeOptions {
        EncodeOptions {
            target: "SystemLogin.checkVersion".to_string(),
            response_uri: "/1".to_string(),
            version: 3,
            args: args.to_string(),
        }
    }

    #[test]
    fn encode_then_decode() {
        let bytes = encode_request(&opts(r#"["0.52", 7, {"$date": 5}]"#)).unwrap();
        let decoded = decode_reply(bytes, false).unwrap();
        assert_eq!(
            decoded,
            json!({
                "target_uri": "SystemLogin.checkVersion",
                "response_uri": "/1",
                "value": ["0.52", 7, {"$date": 5.0}],
            })
        );
    }

    #[test]
    fn encode_uses_version_and_response_uri() {
        let opts = EncodeOptions {
            response_uri: "/9".to_string(),
            version: 0,
            ..opts("[]")
        };
        let bytes = encode_request(&opts).unwrap();
        assert_eq!(&bytes[..2], &[0, 0]);
        let decoded = decode_reply(bytes, false).unwrap();
        assert_eq!(decoded["response_uri"], json!("/9"));
    }

    #[test]
    fn normalized_status_list() {
        let bytes = encode_request(&opts("[1, 2]")).unwrap();
        assert_eq!(decode_reply(bytes, true).unwrap(), json!({"status": 1}));
    }

    #[test]
    fn invalid_args() {
        assert!(encode_request(&opts("{\"a\": 1}")).is_err());
        assert!(encode_request(&opts("[1,")).is_err());
    }

    #[test]
    fn file_round_trip() {
        let path = env::temp_dir().join(format!("amfkit-{}.amf", std::process::id()));
        encode_to_file(&opts(r#"[{"name": "x"}]"#), &path).unwrap();
        let decoded = decode_file(&path, false).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(decoded["value"], json!([{"name": "x"}]));
    }
}
