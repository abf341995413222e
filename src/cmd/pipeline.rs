//! Command pipeline — the single consumer of the inbound queue.
//!
//! Idle → (wake) → Draining → Idle, for the process lifetime. Each drain
//! answers pending busy notices, then decodes and dispatches every queued
//! frame. Every dispatch produces exactly one response, sent as one
//! notification; a failed send is logged and the drain continues with the
//! next item — not fatal, not retried. Nothing in an iteration can
//! propagate out of the loop.

use std::sync::Arc;

use log::{debug, info, warn};

use crate::ble::ConnHandle;
use crate::peripheral::Shared;
use crate::ports::Radio;

use super::codec::{self, DecodeError, Opcode, RequestFrame, ResultCode};
use super::queue::InboundFrame;

/// Firmware version triple reported by `Version`.
pub const VERSION_MAJOR: u8 = 1;
pub const VERSION_MINOR: u8 = 0;
pub const VERSION_PATCH: u8 = 0;

/// Fixed ATT overhead per notification (opcode + attribute handle), so
/// `mtu - 3` bounds the largest single-frame payload the peer can receive.
const ATT_NOTIFY_OVERHEAD: u16 = 3;

/// `GetDataMaxLen` answer for a handle the registry does not know
/// (23-byte default MTU minus the ATT overhead).
const FALLBACK_DATA_MAX_LEN: u8 = 20;

/// Largest response payload any built-in handler produces.
const MAX_HANDLER_PAYLOAD: usize = 8;

/// Single-consumer opcode dispatcher.
pub struct CommandPipeline<R: Radio> {
    shared: Arc<Shared>,
    radio: Arc<R>,
}

impl<R: Radio> CommandPipeline<R> {
    pub fn new(shared: Arc<Shared>, radio: Arc<R>) -> Self {
        Self { shared, radio }
    }

    /// Run for the process lifetime: wait for the wake signal, then drain
    /// the queue.
    pub async fn run(&self) {
        info!("CMD: pipeline task started");
        loop {
            self.shared.inbound.wait().await;
            self.drain();
        }
    }

    /// Fully drain pending busy notices and queued frames.
    pub fn drain(&self) {
        while let Some(notice) = self.shared.inbound.take_notice() {
            debug!(
                "CMD[{}]: answering rejected frame id={:#04x} with Busy",
                notice.handle, notice.id
            );
            self.respond(notice.handle, notice.id, notice.opcode, ResultCode::Busy, &[]);
        }

        while let Some(frame) = self.shared.inbound.pop() {
            self.process(&frame);
        }
    }

    // ── Internal dispatch ─────────────────────────────────────

    fn process(&self, frame: &InboundFrame) {
        match codec::decode(&frame.data) {
            Ok(req) => {
                let mut payload = heapless::Vec::<u8, MAX_HANDLER_PAYLOAD>::new();
                let result = self.dispatch(frame.handle, &req, &mut payload);
                self.respond(frame.handle, req.id, req.opcode, result, &payload);
            }
            // No id to respond with — drop silently.
            Err(DecodeError::TooShort) => {
                debug!("CMD[{}]: runt frame dropped", frame.handle);
            }
            Err(DecodeError::BadMagic) => {
                warn!("CMD[{}]: bad frame magic, dropped", frame.handle);
            }
            Err(DecodeError::Truncated { id, opcode }) => {
                warn!(
                    "CMD[{}]: truncated payload (id={:#04x}, opcode={:#04x})",
                    frame.handle, id, opcode
                );
                self.respond(frame.handle, id, opcode, ResultCode::InvalidAttributeLength, &[]);
            }
        }
    }

    fn dispatch(
        &self,
        handle: ConnHandle,
        req: &RequestFrame<'_>,
        payload: &mut heapless::Vec<u8, MAX_HANDLER_PAYLOAD>,
    ) -> ResultCode {
        match Opcode::from_u8(req.opcode) {
            Some(Opcode::Ping) => {
                info!("CMD[{}]: Ping (id={:#04x})", handle, req.id);
                ResultCode::Ok
            }

            Some(Opcode::Version) => {
                info!("CMD[{}]: Version (id={:#04x})", handle, req.id);
                let _ = payload.extend_from_slice(&[VERSION_MAJOR, VERSION_MINOR, VERSION_PATCH]);
                ResultCode::Ok
            }

            Some(Opcode::GetDataMaxLen) => {
                let max_len = self.data_max_len(handle);
                info!(
                    "CMD[{}]: GetDataMaxLen (id={:#04x}) -> {}",
                    handle, req.id, max_len
                );
                let _ = payload.push(max_len);
                ResultCode::Ok
            }

            None => {
                warn!(
                    "CMD[{}]: unsupported opcode {:#04x} (id={:#04x})",
                    handle, req.opcode, req.id
                );
                ResultCode::RequestNotSupported
            }
        }
    }

    /// Largest single-notification payload for this link, from the most
    /// recent MTU observed for the handle.
    fn data_max_len(&self, handle: ConnHandle) -> u8 {
        self.shared
            .with_registry(|reg| reg.get(handle).map(|link| link.mtu))
            .map(|mtu| {
                let max = mtu.saturating_sub(ATT_NOTIFY_OVERHEAD);
                u8::try_from(max).unwrap_or(u8::MAX)
            })
            .unwrap_or(FALLBACK_DATA_MAX_LEN)
    }

    fn respond(&self, handle: ConnHandle, id: u8, opcode: u8, result: ResultCode, payload: &[u8]) {
        let mut buf = [0u8; codec::MAX_FRAME_LEN];
        let Some(len) = codec::encode_response(id, opcode, result, payload, &mut buf) else {
            warn!(
                "CMD[{}]: response encode failed ({} payload bytes)",
                handle,
                payload.len()
            );
            return;
        };

        if let Err(e) = self.radio.notify(handle, &buf[..len]) {
            // Link may already be gone; the response dies with it.
            warn!("CMD[{}]: notify failed: {} — response dropped", handle, e);
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────
