//! Fuzz target: `codec::decode`
//!
//! Drives arbitrary byte sequences into the frame decoder and asserts
//! that it never panics, never yields a payload outside the input, and
//! that anything it accepts re-encodes within the single-frame cap.
//!
//! cargo fuzz run fuzz_frame_codec

#![no_main]

use corc::cmd::codec::{decode, encode_response, MAX_FRAME_LEN, MAX_PAYLOAD_LEN, ResultCode};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(req) = decode(data) {
        assert!(req.payload.len() <= MAX_PAYLOAD_LEN, "payload exceeds cap");
        assert!(
            req.payload.len() + 5 <= data.len(),
            "payload escapes the input"
        );

        // Echoing the request back must always fit one response frame.
        let mut buf = [0u8; MAX_FRAME_LEN];
        let len = encode_response(req.id, req.opcode, ResultCode::Ok, req.payload, &mut buf)
            .expect("decoded payload must re-encode");
        assert!(len <= MAX_FRAME_LEN);
    }
});
