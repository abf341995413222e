//! In-memory Radio/Advertiser simulation for host-side testing.
//!
//! [`SimRadio`] stages written values the way the Bluedroid glue does and
//! records every notification; [`SimAdvertiser`] records broadcast starts
//! and can be told to fail, which is how the deferred-restart retry path
//! is exercised without a radio.

use std::sync::Mutex;

use log::info;

use crate::ble::advertising::AdvertisingSet;
use crate::ble::{AttrHandle, ConnHandle};
use crate::cmd::codec::RawFrame;
use crate::ports::{AdvertiseError, Advertiser, Radio, RadioError};

/// Attribute handle the simulation assigns to the RX characteristic.
pub const SIM_RX_ATTR: AttrHandle = 0x002A;

// ───────────────────────────────────────────────────────────────
// SimRadio
// ───────────────────────────────────────────────────────────────

/// Recording Radio double. `&self` interior mutability mirrors the real
/// adapter, which is shared between the callback context and the pipeline.
pub struct SimRadio {
    staged: Mutex<Option<(ConnHandle, AttrHandle, Vec<u8>)>>,
    notifications: Mutex<Vec<(ConnHandle, Vec<u8>)>>,
    failing: Mutex<Vec<ConnHandle>>,
}

impl SimRadio {
    pub fn new() -> Self {
        Self {
            staged: Mutex::new(None),
            notifications: Mutex::new(Vec::new()),
            failing: Mutex::new(Vec::new()),
        }
    }

    /// Stage a written value, as the stack glue would before the write
    /// event reaches the dispatcher.
    pub fn stage_write(&self, conn: ConnHandle, attr: AttrHandle, bytes: &[u8]) {
        if let Ok(mut slot) = self.staged.lock() {
            *slot = Some((conn, attr, bytes.to_vec()));
        }
    }

    /// Make every notify to `conn` fail, as on a dropped link.
    pub fn fail_notifies_for(&self, conn: ConnHandle) {
        if let Ok(mut failing) = self.failing.lock() {
            failing.push(conn);
        }
    }

    /// Drain the recorded notifications.
    pub fn take_notifications(&self) -> Vec<(ConnHandle, Vec<u8>)> {
        self.notifications
            .lock()
            .map(|mut n| core::mem::take(&mut *n))
            .unwrap_or_default()
    }
}

impl Radio for SimRadio {
    fn inbound_attr(&self) -> AttrHandle {
        SIM_RX_ATTR
    }

    fn read_written(&self, conn: ConnHandle, attr: AttrHandle) -> Result<RawFrame, RadioError> {
        let staged = self.staged.lock().ok().and_then(|mut slot| slot.take());
        match staged {
            Some((c, a, bytes)) if c == conn && a == attr => {
                let mut frame = RawFrame::new();
                frame
                    .extend_from_slice(&bytes)
                    .map_err(|()| RadioError::WriteTooLong)?;
                Ok(frame)
            }
            _ => Err(RadioError::NoPendingWrite),
        }
    }

    fn notify(&self, conn: ConnHandle, data: &[u8]) -> Result<(), RadioError> {
        let failing = self
            .failing
            .lock()
            .map(|f| f.contains(&conn))
            .unwrap_or(false);
        if failing {
            return Err(RadioError::NotifyFailed);
        }

        if let Ok(mut notifications) = self.notifications.lock() {
            notifications.push((conn, data.to_vec()));
        }
        Ok(())
    }
}

// ───────────────────────────────────────────────────────────────
// SimAdvertiser
// ───────────────────────────────────────────────────────────────

/// Recording Advertiser double with switchable failure injection.
pub struct SimAdvertiser {
    active: bool,
    failing: bool,
    start_count: usize,
    last_set: Option<AdvertisingSet>,
}

impl SimAdvertiser {
    pub fn new() -> Self {
        Self {
            active: false,
            failing: false,
            start_count: 0,
            last_set: None,
        }
    }

    /// When `true`, every `start` fails with [`AdvertiseError::StartFailed`].
    pub fn fail_starts(&mut self, failing: bool) {
        self.failing = failing;
    }

    pub fn start_count(&self) -> usize {
        self.start_count
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn last_set(&self) -> Option<AdvertisingSet> {
        self.last_set.clone()
    }
}

impl Advertiser for SimAdvertiser {
    fn start(&mut self, set: &AdvertisingSet) -> Result<(), AdvertiseError> {
        if self.failing {
            return Err(AdvertiseError::StartFailed);
        }
        self.start_count += 1;
        self.active = true;
        self.last_set = Some(set.clone());
        info!(
            "ADV(sim): broadcasting ({} adv bytes, {} scan-rsp bytes, {}ms)",
            set.adv_data.len(),
            set.scan_resp.len(),
            set.interval_ms
        );
        Ok(())
    }

    fn stop(&mut self) -> Result<(), AdvertiseError> {
        self.active = false;
        info!("ADV(sim): stopped");
        Ok(())
    }
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────
