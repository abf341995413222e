//! Command-channel frame codec.
//!
//! Wire format (all multi-byte integers little-endian):
//! ```text
//! request   ┌─────────┬────┬────────┬─────┬─────────────┐
//!           │magic(2B)│id  │ opcode │ len │ payload (N) │
//!           └─────────┴────┴────────┴─────┴─────────────┘
//! response  ┌─────────┬────┬────────┬────────┬─────┬─────────────┐
//!           │magic(2B)│id  │ opcode │ result │ len │ payload (N) │
//!           └─────────┴────┴────────┴────────┴─────┴─────────────┘
//! ```
//!
//! One frame per characteristic write / notification; there is no
//! multi-frame continuation, so payloads are capped at 255 bytes. The
//! layout is byte-exact against the deployed companion app — treat every
//! constant here as a wire contract.

use core::fmt;

/// Protocol magic, `7C C0` on the wire.
pub const FRAME_MAGIC: u16 = 0xC07C;

/// Request header: 2 magic + 1 id + 1 opcode + 1 length.
pub const REQUEST_HEADER_LEN: usize = 5;

/// Response header: 2 magic + 1 id + 1 opcode + 1 result + 1 length.
pub const RESPONSE_HEADER_LEN: usize = 6;

/// Single-frame payload cap (length field is one byte).
pub const MAX_PAYLOAD_LEN: usize = 255;

/// Largest frame either direction can carry.
pub const MAX_FRAME_LEN: usize = RESPONSE_HEADER_LEN + MAX_PAYLOAD_LEN;

/// Raw frame bytes as staged by the radio glue.
pub type RawFrame = heapless::Vec<u8, MAX_FRAME_LEN>;

// ───────────────────────────────────────────────────────────────
// Opcodes and result codes
// ───────────────────────────────────────────────────────────────

/// Command opcodes understood by the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Opcode {
    /// Liveness probe; empty response.
    Ping = 0x01,
    /// Firmware version triple.
    Version = 0x02,
    /// Largest single-notification payload for this link.
    GetDataMaxLen = 0x03,
}

impl Opcode {
    /// Dispatch-table lookup; `None` falls to the default handler.
    pub fn from_u8(raw: u8) -> Option<Self> {
        match raw {
            0x01 => Some(Self::Ping),
            0x02 => Some(Self::Version),
            0x03 => Some(Self::GetDataMaxLen),
            _ => None,
        }
    }
}

/// Response result codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ResultCode {
    Ok = 0x00,
    RequestNotSupported = 0x06,
    InvalidAttributeLength = 0x0D,
    Unsupported = 0x11,
    BadParam = 0x12,
    InvalidState = 0x13,
    Busy = 0x14,
    Failure = 0xFF,
}

// ───────────────────────────────────────────────────────────────
// Decode
// ───────────────────────────────────────────────────────────────

/// A decoded request, borrowing its payload from the raw bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestFrame<'a> {
    /// Correlation token, echoed verbatim in the response.
    pub id: u8,
    pub opcode: u8,
    pub payload: &'a [u8],
}

/// Decode failures. None is fatal; see the pipeline for the per-variant
/// response policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// Shorter than the 5-byte request header — no id to respond with.
    TooShort,
    /// First two bytes are not the protocol magic.
    BadMagic,
    /// Declared payload length exceeds the bytes that follow. Carries the
    /// parsed id/opcode so the pipeline can still answer.
    Truncated { id: u8, opcode: u8 },
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooShort => write!(f, "frame shorter than request header"),
            Self::BadMagic => write!(f, "bad frame magic"),
            Self::Truncated { id, opcode } => {
                write!(f, "truncated payload (id={id:#04x}, opcode={opcode:#04x})")
            }
        }
    }
}

/// Parse one request frame. Trailing bytes beyond the declared payload are
/// ignored, not an error.
pub fn decode(bytes: &[u8]) -> Result<RequestFrame<'_>, DecodeError> {
    if bytes.len() < REQUEST_HEADER_LEN {
        return Err(DecodeError::TooShort);
    }

    let magic = u16::from_le_bytes([bytes[0], bytes[1]]);
    if magic != FRAME_MAGIC {
        return Err(DecodeError::BadMagic);
    }

    let id = bytes[2];
    let opcode = bytes[3];
    let declared = bytes[4] as usize;

    let rest = &bytes[REQUEST_HEADER_LEN..];
    if rest.len() < declared {
        return Err(DecodeError::Truncated { id, opcode });
    }

    Ok(RequestFrame {
        id,
        opcode,
        payload: &rest[..declared],
    })
}

/// Cheap header probe for frames rejected before decoding (queue overflow):
/// id/opcode if the magic checks out and both bytes are present.
pub fn peek_header(bytes: &[u8]) -> Option<(u8, u8)> {
    if bytes.len() < 4 {
        return None;
    }
    if u16::from_le_bytes([bytes[0], bytes[1]]) != FRAME_MAGIC {
        return None;
    }
    Some((bytes[2], bytes[3]))
}

// ───────────────────────────────────────────────────────────────
// Encode
// ───────────────────────────────────────────────────────────────

/// Encode a response frame into `out`.
///
/// Returns the total number of bytes written, or `None` if the payload
/// exceeds the single-frame cap or `out` is too small.
pub fn encode_response(
    id: u8,
    opcode: u8,
    result: ResultCode,
    payload: &[u8],
    out: &mut [u8],
) -> Option<usize> {
    let total = RESPONSE_HEADER_LEN + payload.len();
    if payload.len() > MAX_PAYLOAD_LEN || total > out.len() {
        return None;
    }

    out[..2].copy_from_slice(&FRAME_MAGIC.to_le_bytes());
    out[2] = id;
    out[3] = opcode;
    out[4] = result as u8;
    out[5] = payload.len() as u8;
    out[RESPONSE_HEADER_LEN..total].copy_from_slice(payload);

    Some(total)
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────
