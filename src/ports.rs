//! Port traits — the boundary between the firmware core and the radio stack.
//!
//! ```text
//!   Bluedroid / simulation ──▶ Port trait ──▶ dispatcher + pipeline (core)
//! ```
//!
//! [`Radio`] is the restricted capability handed to code that runs in the
//! stack's event-delivery context. Its contract cannot be expressed in the
//! type system, so it is enforced by interface segregation: every method is
//! a single bounded-time call — no method blocks, suspends, or re-enters
//! the stack. Implementations buffer internally and expose `&self` methods
//! because the dispatcher (callback context) and the pipeline (cooperative
//! task) share one instance.
//!
//! [`Advertiser`] is only ever driven from the cooperative loop; the radio
//! stack forbids reentrant GAP calls from within event delivery.

use core::fmt;

use crate::ble::advertising::AdvertisingSet;
use crate::ble::{AttrHandle, ConnHandle};
use crate::cmd::codec::RawFrame;

// ───────────────────────────────────────────────────────────────
// Radio port
// ───────────────────────────────────────────────────────────────

/// GATT-side capability: read what a peer wrote, push notifications out.
pub trait Radio {
    /// Attribute handle of the inbound (write) characteristic.
    fn inbound_attr(&self) -> AttrHandle;

    /// Consume the value most recently written to `attr` by `conn`.
    ///
    /// Called by the event dispatcher from within event delivery, before
    /// the callback returns — the value is staged by the stack glue and
    /// consumed exactly once.
    fn read_written(&self, conn: ConnHandle, attr: AttrHandle) -> Result<RawFrame, RadioError>;

    /// Send `data` as a single notification on the outbound characteristic.
    fn notify(&self, conn: ConnHandle, data: &[u8]) -> Result<(), RadioError>;
}

// ───────────────────────────────────────────────────────────────
// Advertiser port
// ───────────────────────────────────────────────────────────────

/// GAP-side capability: broadcast a prebuilt ≤31-byte payload.
pub trait Advertiser {
    /// Start (or restart) advertising with the given payload set.
    fn start(&mut self, set: &AdvertisingSet) -> Result<(), AdvertiseError>;

    /// Stop advertising.
    fn stop(&mut self) -> Result<(), AdvertiseError>;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`Radio`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RadioError {
    /// The radio stack failed to initialise.
    StackInitFailed,
    /// No written value is staged for this connection/attribute.
    NoPendingWrite,
    /// The written value exceeds the maximum frame length.
    WriteTooLong,
    /// The stack rejected the notification.
    NotifyFailed,
    /// The link dropped before the operation completed.
    LinkDropped,
}

/// Errors from [`Advertiser`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvertiseError {
    /// The GAP layer is not ready to accept advertising data.
    StackNotReady,
    /// Broadcasting could not be started.
    StartFailed,
    /// Broadcasting could not be stopped.
    StopFailed,
}

impl fmt::Display for RadioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StackInitFailed => write!(f, "radio stack initialisation failed"),
            Self::NoPendingWrite => write!(f, "no staged write for attribute"),
            Self::WriteTooLong => write!(f, "written value exceeds max frame length"),
            Self::NotifyFailed => write!(f, "notification send rejected"),
            Self::LinkDropped => write!(f, "link dropped"),
        }
    }
}

impl fmt::Display for AdvertiseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StackNotReady => write!(f, "GAP layer not ready"),
            Self::StartFailed => write!(f, "advertising start failed"),
            Self::StopFailed => write!(f, "advertising stop failed"),
        }
    }
}
