use crate::amf3::Amf3Value;

mod parse;
mod serialize;

pub use parse::deserialize_first_body;

/// Version written by default into request envelopes.
pub const DEFAULT_VERSION: u16 = 3;

/// Response URI identifying the first (and only) call of a request.
pub const DEFAULT_RESPONSE_URI: &str = "/1";

/// Remoting envelope. Headers are never written and skipped when read.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub version: u16,
    pub bodies: Vec<MessageBody>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MessageBody {
    /// Remote method the body is addressed to, or the response target on replies.
    pub target_uri: String,
    /// Identifies the call, e.g. `/1`. Replies target it with `/onResult` or `/onStatus`.
    pub response_uri: String,
    pub value: Amf3Value,
}

impl Message {
    /// Single call envelope passing `args` as the argument list of `target`.
    pub fn call(target: &str, args: Vec<Amf3Value>, response_uri: &str, version: u16) -> Self {
        Self {
            version,
            bodies: vec![MessageBody {
                target_uri: target.to_string(),
                response_uri: response_uri.to_string(),
                value: Amf3Value::Array(args),
            }],
        }
    }
}
