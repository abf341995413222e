//! Radio event dispatcher — the callback-context entry point.
//!
//! The radio stack invokes [`EventDispatcher::on_radio_event`] synchronously
//! for every link/GATT event, from a context that behaves like an interrupt
//! handler: it may run whenever the cooperative executor has yielded, and it
//! must return in bounded time. Everything here is therefore a single-call
//! mutation — a registry operation behind a short critical section, a queue
//! push, an atomic flag, a signal raise. No method blocks, suspends, or
//! calls back into the stack, and no failure ever escapes (an escaping
//! failure would abort delivery of subsequent hardware events).
//!
//! Advertising is NOT restarted here on disconnect: the stack forbids
//! reentrant GAP calls from within event delivery, so the dispatcher only
//! arms `advertise_pending` and the orchestrator performs the restart on
//! its next tick.

use std::sync::Arc;

use log::{debug, info, warn};

use crate::cmd::codec;
use crate::cmd::queue::{BusyNotice, InboundFrame, QueueFull};
use crate::peripheral::Shared;
use crate::ports::Radio;

use super::link::{ConnParams, SecurityInfo};
use super::{AttrHandle, ConnHandle};

// ───────────────────────────────────────────────────────────────
// Events
// ───────────────────────────────────────────────────────────────

/// Link/GATT events delivered by the radio stack, already lifted out of
/// the stack's raw callback parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RadioEvent {
    Connected {
        handle: ConnHandle,
        addr_type: u8,
        addr: [u8; 6],
    },
    Disconnected {
        handle: ConnHandle,
        reason: u8,
    },
    /// A peer wrote `attr`; the value is staged in the Radio.
    Write {
        handle: ConnHandle,
        attr: AttrHandle,
    },
    MtuExchanged {
        handle: ConnHandle,
        mtu: u16,
    },
    ConnParamsUpdated {
        handle: ConnHandle,
        interval: u16,
        latency: u16,
        supervision_timeout: u16,
        status: u8,
    },
    EncryptionUpdated {
        handle: ConnHandle,
        encrypted: bool,
        authenticated: bool,
        bonded: bool,
        key_size: u8,
    },
    /// Any event kind the firmware does not recognise.
    Unknown {
        code: u16,
    },
}

// ───────────────────────────────────────────────────────────────
// Dispatcher
// ───────────────────────────────────────────────────────────────

/// Mutates the shared link state and feeds the inbound queue from the
/// radio callback context.
pub struct EventDispatcher<R: Radio> {
    shared: Arc<Shared>,
    radio: Arc<R>,
}

impl<R: Radio> EventDispatcher<R> {
    pub fn new(shared: Arc<Shared>, radio: Arc<R>) -> Self {
        Self { shared, radio }
    }

    /// Handle one radio event. Bounded time, never suspends, never fails.
    pub fn on_radio_event(&self, event: RadioEvent) {
        match event {
            RadioEvent::Connected {
                handle,
                addr_type,
                addr,
            } => {
                info!("BLE: CONNECT handle={} addr_type={}", handle, addr_type);
                self.shared
                    .with_registry(|reg| reg.add(handle, addr_type, addr));
            }

            RadioEvent::Disconnected { handle, reason } => {
                info!("BLE: DISCONNECT handle={} reason={:#04x}", handle, reason);
                self.shared.with_registry(|reg| {
                    reg.remove(handle);
                });
                let purged = self.shared.inbound.purge(handle);
                if purged > 0 {
                    debug!(
                        "BLE: dropped {} queued frame(s) for dead handle {}",
                        purged, handle
                    );
                }
                // Restart is requested, not performed, here.
                self.shared.request_advertise_restart();
            }

            RadioEvent::Write { handle, attr } => {
                if attr != self.radio.inbound_attr() {
                    debug!("BLE: write to foreign attr {:#06x}, ignoring", attr);
                    return;
                }
                match self.radio.read_written(handle, attr) {
                    Ok(data) => self.enqueue(handle, data),
                    Err(e) => warn!("BLE: RX read failed on handle {}: {}", handle, e),
                }
            }

            RadioEvent::MtuExchanged { handle, mtu } => {
                self.shared.with_registry(|reg| reg.update_mtu(handle, mtu));
            }

            RadioEvent::ConnParamsUpdated {
                handle,
                interval,
                latency,
                supervision_timeout,
                status,
            } => {
                info!(
                    "BLE: CONN_UPDATE handle={} interval={} latency={} timeout={} status={}",
                    handle, interval, latency, supervision_timeout, status
                );
                self.shared.with_registry(|reg| {
                    reg.update_params(
                        handle,
                        ConnParams {
                            interval,
                            latency,
                            supervision_timeout,
                            status,
                        },
                    );
                });
            }

            RadioEvent::EncryptionUpdated {
                handle,
                encrypted,
                authenticated,
                bonded,
                key_size,
            } => {
                info!(
                    "BLE: ENC_UPDATE handle={} enc={} auth={} bonded={} key_size={}",
                    handle, encrypted, authenticated, bonded, key_size
                );
                self.shared.with_registry(|reg| {
                    reg.update_security(
                        handle,
                        SecurityInfo {
                            encrypted,
                            authenticated,
                            bonded,
                            key_size: (key_size > 0).then_some(key_size),
                        },
                    );
                });
            }

            RadioEvent::Unknown { code } => {
                debug!("BLE: unknown event code {}, ignoring", code);
            }
        }
    }

    /// Queue an inbound frame and wake the pipeline. On overflow, leave a
    /// `Busy` notice behind (the header is probed before the bytes move
    /// into the queue).
    fn enqueue(&self, handle: ConnHandle, data: codec::RawFrame) {
        let header = codec::peek_header(&data);

        match self.shared.inbound.push(InboundFrame { handle, data }) {
            Ok(()) => self.shared.inbound.wake(),
            Err(QueueFull) => match header {
                Some((id, opcode)) => {
                    warn!(
                        "BLE: inbound queue full, rejecting frame from handle {} (id={:#04x})",
                        handle, id
                    );
                    if self.shared.inbound.push_notice(BusyNotice { handle, id, opcode }) {
                        self.shared.inbound.wake();
                    } else {
                        warn!("BLE: busy notice list full, frame from handle {} dropped", handle);
                    }
                }
                None => {
                    // Nothing parseable to answer — drop outright.
                    warn!(
                        "BLE: inbound queue full, dropping unparseable frame from handle {}",
                        handle
                    );
                }
            },
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────
