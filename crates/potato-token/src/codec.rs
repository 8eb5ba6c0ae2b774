//! Textual token codec.

use crate::error::{Error, Result};
use crate::Token;

/// Serializes tokens into the string stored in a transport slot.
pub trait TokenCodec {
    /// Encode a token for transmission.
    fn encode(&self, token: &Token) -> Result<String>;

    /// Decode a token received from a peer.
    fn decode(&self, data: &str) -> Result<Token>;
}

/// JSON object codec: `message`, `holder`, `times_passed`, `time_elapsed`, `timestamp`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl TokenCodec for JsonCodec {
    fn encode(&self, token: &Token) -> Result<String> {
        serde_json::to_string(token).map_err(Error::Encode)
    }

    fn decode(&self, data: &str) -> Result<Token> {
        serde_json::from_str(data).map_err(Error::Decode)
    }
}

/// Decode the contents of a transport slot.
///
/// An absent or empty slot means nothing is pending and yields `Ok(None)`.
pub fn decode_slot<C: TokenCodec + ?Sized>(codec: &C, slot: Option<&str>) -> Result<Option<Token>> {
    match slot {
        None => Ok(None),
        Some(data) if data.is_empty() => Ok(None),
        Some(data) => codec.decode(data).map(Some),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NodeId;
    use proptest::prelude::*;

    #[test]
    fn encodes_wire_keys() {
        let token = Token::from_parts("hi", "unit/0".into(), 2, 0.5, 1_700_000_000.25);
        let json = JsonCodec.encode(&token).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["message"], "hi");
        assert_eq!(value["holder"], "unit/0");
        assert_eq!(value["times_passed"], 2);
        assert_eq!(value["time_elapsed"], 0.5);
        assert_eq!(value["timestamp"], 1_700_000_000.25);
    }

    #[test]
    fn decodes_integer_elapsed() {
        // Freshly started games store a bare integer zero.
        let json = r#"{"message":"hi","holder":"unit/1","times_passed":0,"time_elapsed":0,"timestamp":1700000000.5}"#;
        let token = JsonCodec.decode(json).unwrap();

        assert_eq!(token.holder, "unit/1");
        assert_eq!(token.time_elapsed, 0.0);
        assert_eq!(token.timestamp, 1_700_000_000.5);
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(matches!(JsonCodec.decode("not json"), Err(Error::Decode(_))));
        assert!(matches!(JsonCodec.decode(r#"{"message":"hi"}"#), Err(Error::Decode(_))));
    }

    #[test]
    fn decode_rejects_negative_passes() {
        let json = r#"{"message":"hi","holder":"A","times_passed":-1,"time_elapsed":0,"timestamp":0}"#;
        assert!(matches!(JsonCodec.decode(json), Err(Error::Decode(_))));
    }

    #[test]
    fn empty_slot_is_not_an_error() {
        assert!(decode_slot(&JsonCodec, None).unwrap().is_none());
        assert!(decode_slot(&JsonCodec, Some("")).unwrap().is_none());
    }

    #[test]
    fn malformed_slot_is_an_error() {
        assert!(decode_slot(&JsonCodec, Some("{")).is_err());
    }

    proptest! {
        #[test]
        fn roundtrip(
            message in ".*",
            holder in "[a-z]{1,8}/[0-9]{1,3}",
            times_passed in any::<u64>(),
            time_elapsed in 0.0f64..1.0e9,
            timestamp in 0.0f64..4.0e9,
        ) {
            let token = Token::from_parts(message, NodeId::new(holder), times_passed, time_elapsed, timestamp);
            let encoded = JsonCodec.encode(&token).unwrap();
            let decoded = decode_slot(&JsonCodec, Some(&encoded)).unwrap();
            prop_assert_eq!(decoded, Some(token));
        }
    }
}
