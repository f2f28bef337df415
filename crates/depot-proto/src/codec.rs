use crate::error::{ProtocolError, ProtocolResult};
use crate::message::{Message, MAX_FRAME_SIZE};

/// Codec for broker frames: `[2-byte big-endian length][bincode payload]`.
pub struct Codec;

impl Codec {
    /// Encode a message with its length prefix.
    ///
    /// Fails with [`ProtocolError::MessageTooLarge`] if the encoded payload
    /// does not fit the u16 length field; this bound is what keeps scan
    /// responses from growing without limit.
    pub fn encode(msg: &Message) -> ProtocolResult<Vec<u8>> {
        let payload =
            bincode::serialize(msg).map_err(|e| ProtocolError::Serialization(e.to_string()))?;
        if payload.len() > MAX_FRAME_SIZE {
            return Err(ProtocolError::MessageTooLarge {
                size: payload.len(),
                max: MAX_FRAME_SIZE,
            });
        }
        let mut buf = Vec::with_capacity(2 + payload.len());
        buf.extend_from_slice(&(payload.len() as u16).to_be_bytes());
        buf.extend_from_slice(&payload);
        Ok(buf)
    }

    /// Decode one frame payload (the bytes after the length prefix).
    pub fn decode_payload(data: &[u8]) -> ProtocolResult<Message> {
        bincode::deserialize(data).map_err(|e| ProtocolError::Deserialization(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{ErrorCode, Query, Reply};

    macro_rules! roundtrip_test {
        ($name:ident, $msg:expr) => {
            #[test]
            fn $name() {
                let msg = $msg;
                let encoded = Codec::encode(&msg).unwrap();
                let declared = u16::from_be_bytes([encoded[0], encoded[1]]) as usize;
                assert_eq!(declared, encoded.len() - 2);
                let decoded = Codec::decode_payload(&encoded[2..]).unwrap();
                assert_eq!(decoded, msg);
            }
        };
    }

    roundtrip_test!(get_roundtrip, Message::query(Query::Get { key: b"k".to_vec() }));

    roundtrip_test!(
        set_roundtrip,
        Message::query(Query::Set {
            key: b"key".to_vec(),
            value: b"value".to_vec(),
        })
    );

    roundtrip_test!(
        delete_roundtrip,
        Message::query(Query::Delete { key: b"k".to_vec() })
    );

    roundtrip_test!(
        range_scan_roundtrip,
        Message::query(Query::RangeScan {
            start: b"t:".to_vec(),
            end: None,
        })
    );

    roundtrip_test!(
        bounded_scan_roundtrip,
        Message::query(Query::RangeScan {
            start: b"a".to_vec(),
            end: Some(b"z".to_vec()),
        })
    );

    roundtrip_test!(
        delete_range_roundtrip,
        Message::query(Query::DeleteRange {
            start: b"p:".to_vec(),
            end: None,
        })
    );

    roundtrip_test!(
        value_response_roundtrip,
        Message::response(
            Query::Get { key: b"k".to_vec() },
            Reply::ValueReturned { value: b"v".to_vec() },
        )
    );

    roundtrip_test!(
        key_missing_roundtrip,
        Message::response(Query::Get { key: b"nope".to_vec() }, Reply::KeyMissing)
    );

    roundtrip_test!(
        entries_roundtrip,
        Message::response(
            Query::RangeScan { start: b"t:".to_vec(), end: None },
            Reply::Entries {
                pairs: vec![
                    (b"t:1".to_vec(), b"/dbs/1.sqlite3".to_vec()),
                    (b"t:2".to_vec(), b"/dbs/2.sqlite3".to_vec()),
                ],
            },
        )
    );

    roundtrip_test!(
        error_roundtrip,
        Message::error(ErrorCode::UnrecognizedQuery, "unknown message kind")
    );

    #[test]
    fn oversized_payload_rejected() {
        let msg = Message::response(
            Query::RangeScan { start: vec![], end: None },
            Reply::Entries {
                pairs: vec![(vec![0u8; 40_000], vec![0u8; 40_000])],
            },
        );
        let err = Codec::encode(&msg).unwrap_err();
        assert!(matches!(err, ProtocolError::MessageTooLarge { .. }));
    }

    #[test]
    fn garbage_payload_rejected() {
        let err = Codec::decode_payload(&[0xFF, 0xFF, 0xFF, 0xFF, 0xFF]).unwrap_err();
        assert!(matches!(err, ProtocolError::Deserialization(_)));
    }

    #[test]
    fn empty_payload_rejected() {
        let err = Codec::decode_payload(&[]).unwrap_err();
        assert!(matches!(err, ProtocolError::Deserialization(_)));
    }
}
