//! Property and fuzz-style tests for the frame codec.
//!
//! Runs on host (x86_64) only — proptest is not available for ESP32
//! targets. On ESP32, these tests are compiled out.

#![cfg(not(target_os = "espidf"))]

use corc::cmd::codec::{
    self, DecodeError, FRAME_MAGIC, MAX_FRAME_LEN, MAX_PAYLOAD_LEN, REQUEST_HEADER_LEN,
    RESPONSE_HEADER_LEN, ResultCode, decode, encode_response,
};
use proptest::prelude::*;

proptest! {
    /// Decoding must be total: any byte string either decodes or fails
    /// cleanly, and never reads past the end of the input.
    #[test]
    fn decode_never_panics(bytes in proptest::collection::vec(any::<u8>(), 0..=512)) {
        match decode(&bytes) {
            Ok(req) => {
                prop_assert!(req.payload.len() <= MAX_PAYLOAD_LEN);
                prop_assert!(REQUEST_HEADER_LEN + req.payload.len() <= bytes.len());
            }
            Err(_) => {}
        }
        let _ = codec::peek_header(&bytes);
    }

    /// Every input shorter than the request header fails `TooShort`.
    #[test]
    fn short_inputs_fail_too_short(bytes in proptest::collection::vec(any::<u8>(), 0..5)) {
        prop_assert_eq!(decode(&bytes), Err(DecodeError::TooShort));
    }

    /// Any input whose first two bytes differ from the magic is rejected
    /// regardless of the remaining content.
    #[test]
    fn wrong_magic_is_always_rejected(
        magic in any::<u16>(),
        rest in proptest::collection::vec(any::<u8>(), 3..=300),
    ) {
        prop_assume!(magic != FRAME_MAGIC);
        let mut bytes = magic.to_le_bytes().to_vec();
        bytes.extend_from_slice(&rest);
        prop_assert_eq!(decode(&bytes), Err(DecodeError::BadMagic));
    }

    /// For any valid header+payload combination, decoding the request and
    /// encoding a response from it preserves request id and opcode.
    #[test]
    fn decode_then_encode_preserves_id_and_opcode(
        id in any::<u8>(),
        opcode in any::<u8>(),
        payload in proptest::collection::vec(any::<u8>(), 0..=MAX_PAYLOAD_LEN),
    ) {
        let mut request = FRAME_MAGIC.to_le_bytes().to_vec();
        request.extend_from_slice(&[id, opcode, payload.len() as u8]);
        request.extend_from_slice(&payload);

        let parsed = decode(&request).unwrap();
        prop_assert_eq!(parsed.id, id);
        prop_assert_eq!(parsed.opcode, opcode);
        prop_assert_eq!(parsed.payload, &payload[..]);

        let mut buf = [0u8; MAX_FRAME_LEN];
        let len =
            encode_response(parsed.id, parsed.opcode, ResultCode::Ok, &[], &mut buf).unwrap();
        prop_assert_eq!(len, RESPONSE_HEADER_LEN);
        prop_assert_eq!(buf[2], id);
        prop_assert_eq!(buf[3], opcode);
    }

    /// A frame that declares more payload than it carries always fails
    /// `Truncated` and reports the id/opcode it parsed.
    #[test]
    fn truncated_frames_report_parsed_header(
        id in any::<u8>(),
        opcode in any::<u8>(),
        declared in 1..=255u8,
        short_by in 1..=255u8,
    ) {
        prop_assume!(short_by <= declared);
        let carried = (declared - short_by) as usize;

        let mut bytes = FRAME_MAGIC.to_le_bytes().to_vec();
        bytes.extend_from_slice(&[id, opcode, declared]);
        bytes.extend(core::iter::repeat(0xEE).take(carried));

        prop_assert_eq!(decode(&bytes), Err(DecodeError::Truncated { id, opcode }));
    }
}
