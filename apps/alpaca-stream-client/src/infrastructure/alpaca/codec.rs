//! Envelope Codec
//!
//! Encodes outbound control envelopes and decodes inbound ones in the
//! feed's [`WireFormat`].
//!
//! - **Stock feeds (SIP/IEX)**: JSON text frames
//! - **Option feeds (OPRA/indicative)**: `MessagePack` binary frames
//!
//! The server batches messages into arrays (`[{"T":"success",...}]`), but
//! some control messages arrive as a bare object. Both shapes decode to a
//! list of messages.

use serde::Serialize;
use serde_json::Value;

use super::messages::{ControlMessage, ErrorMessage, SubscriptionMessage, SuccessMessage};
use crate::domain::subscription::WireFormat;

/// Codec errors.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// JSON encoding/decoding failed.
    #[error("JSON codec error: {0}")]
    Json(#[from] serde_json::Error),

    /// `MessagePack` encoding failed.
    #[error("`MessagePack` encode error: {0}")]
    MsgPackEncode(#[from] rmp_serde::encode::Error),

    /// `MessagePack` decoding failed.
    #[error("`MessagePack` decode error: {0}")]
    MsgPackDecode(#[from] rmp_serde::decode::Error),

    /// Invalid message format.
    #[error("invalid message format: {0}")]
    InvalidFormat(String),
}

/// Envelope codec bound to one wire format.
#[derive(Debug, Default, Clone, Copy)]
pub struct EnvelopeCodec {
    format: WireFormat,
}

impl EnvelopeCodec {
    /// Create a codec for `format`.
    #[must_use]
    pub const fn new(format: WireFormat) -> Self {
        Self { format }
    }

    /// Wire format this codec speaks.
    #[must_use]
    pub const fn format(&self) -> WireFormat {
        self.format
    }

    /// Encode an outbound envelope.
    ///
    /// `MessagePack` output uses named fields (maps with string keys), which
    /// is what the server expects.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, CodecError> {
        match self.format {
            WireFormat::Json => Ok(serde_json::to_vec(value)?),
            WireFormat::MsgPack => Ok(rmp_serde::to_vec_named(value)?),
        }
    }

    /// Decode a frame into untyped message objects.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes are not a message object or an array
    /// of message objects.
    pub fn decode_values(&self, data: &[u8]) -> Result<Vec<Value>, CodecError> {
        let value: Value = match self.format {
            WireFormat::Json => serde_json::from_slice(data)?,
            WireFormat::MsgPack => rmp_serde::from_slice(data)?,
        };

        match value {
            Value::Array(items) => Ok(items),
            obj @ Value::Object(_) => Ok(vec![obj]),
            other => Err(CodecError::InvalidFormat(format!(
                "expected message array or object, got: {}",
                truncate(&other.to_string(), 50)
            ))),
        }
    }

    /// Decode a frame into control messages.
    ///
    /// Non-control entries (market data, unknown tags) come back as
    /// [`ControlMessage::Other`] so a caller can tell "no confirmation" from
    /// "garbage".
    ///
    /// # Errors
    ///
    /// Returns an error if the frame cannot be decoded or a control message
    /// is malformed.
    pub fn decode_control(&self, data: &[u8]) -> Result<Vec<ControlMessage>, CodecError> {
        self.decode_values(data)?
            .into_iter()
            .map(decode_control_value)
            .collect()
    }
}

fn decode_control_value(value: Value) -> Result<ControlMessage, CodecError> {
    let tag = value.get("T").and_then(Value::as_str).map(str::to_string);

    let message = match tag.as_deref() {
        Some("success") => ControlMessage::Success(serde_json::from_value::<SuccessMessage>(value)?),
        Some("error") => ControlMessage::Error(serde_json::from_value::<ErrorMessage>(value)?),
        Some("subscription") => {
            ControlMessage::Subscription(serde_json::from_value::<SubscriptionMessage>(value)?)
        }
        _ => ControlMessage::Other(tag),
    };

    Ok(message)
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::alpaca::messages::{AuthRequest, SuccessKind};

    #[test]
    fn decode_success_array() {
        let codec = EnvelopeCodec::new(WireFormat::Json);
        let messages = codec
            .decode_control(br#"[{"T":"success","msg":"connected"}]"#)
            .unwrap();

        assert_eq!(messages.len(), 1);
        match &messages[0] {
            ControlMessage::Success(msg) => assert_eq!(msg.msg, SuccessKind::Connected),
            other => panic!("expected Success message, got {other:?}"),
        }
    }

    #[test]
    fn decode_single_error_object() {
        let codec = EnvelopeCodec::new(WireFormat::Json);
        let messages = codec
            .decode_control(br#"{"T":"error","code":402,"msg":"auth failed"}"#)
            .unwrap();

        assert!(matches!(&messages[0], ControlMessage::Error(e) if e.code == 402));
    }

    #[test]
    fn decode_subscription() {
        let codec = EnvelopeCodec::new(WireFormat::Json);
        let messages = codec
            .decode_control(
                br#"{"T":"subscription","trades":["AAPL","TSLA"],"quotes":["AAPL"],"bars":[]}"#,
            )
            .unwrap();

        let ControlMessage::Subscription(sub) = &messages[0] else {
            panic!("expected Subscription message");
        };
        assert_eq!(sub.trades.len(), 2);
        assert_eq!(sub.quotes.len(), 1);
        assert_eq!(sub.bars.len(), 0);
    }

    #[test]
    fn market_data_is_other() {
        let codec = EnvelopeCodec::new(WireFormat::Json);
        let messages = codec
            .decode_control(br#"[{"T":"t","S":"AAPL","p":1.0}]"#)
            .unwrap();
        assert_eq!(messages, vec![ControlMessage::Other(Some("t".to_string()))]);
    }

    #[test]
    fn empty_array_decodes_to_nothing() {
        let codec = EnvelopeCodec::new(WireFormat::Json);
        assert!(codec.decode_control(b"[]").unwrap().is_empty());
    }

    #[test]
    fn scalar_rejected() {
        let codec = EnvelopeCodec::new(WireFormat::Json);
        assert!(matches!(
            codec.decode_control(b"42"),
            Err(CodecError::InvalidFormat(_))
        ));
    }

    #[test]
    fn msgpack_roundtrip_of_control_message() {
        let codec = EnvelopeCodec::new(WireFormat::MsgPack);
        let success = vec![SuccessMessage {
            msg_type: "success".to_string(),
            msg: SuccessKind::Authenticated,
        }];

        let bytes = codec.encode(&success).unwrap();
        let messages = codec.decode_control(&bytes).unwrap();
        assert!(messages[0].is_authenticated());
    }

    #[test]
    fn msgpack_auth_uses_named_fields() {
        let codec = EnvelopeCodec::new(WireFormat::MsgPack);
        let bytes = codec
            .encode(&AuthRequest::new("k".to_string(), "s".to_string()))
            .unwrap();

        let value: Value = rmp_serde::from_slice(&bytes).unwrap();
        assert_eq!(value["action"], "auth");
        assert_eq!(value["key"], "k");
    }
}
