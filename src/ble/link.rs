//! Per-link records and the connection registry.
//!
//! One [`LinkRecord`] per active connection handle, created on connect,
//! mutated by later link events, removed on disconnect. The registry is
//! only ever touched through single-call operations so the radio callback
//! context and the command pipeline can share it behind a short critical
//! section.

use core::fmt;

use log::{info, warn};

use super::{ConnHandle, DEFAULT_ATT_MTU};

/// Upper bound on simultaneous links (power of 2 for the index map).
pub const MAX_LINKS: usize = 4;

// ───────────────────────────────────────────────────────────────
// Peer address
// ───────────────────────────────────────────────────────────────

/// 6-byte peer address, formatted `AA:BB:CC:DD:EE:FF` for the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeerAddr(pub [u8; 6]);

impl fmt::Display for PeerAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let a = &self.0;
        write!(
            f,
            "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            a[0], a[1], a[2], a[3], a[4], a[5]
        )
    }
}

// ───────────────────────────────────────────────────────────────
// Link record
// ───────────────────────────────────────────────────────────────

/// Connection parameters reported by the stack after an update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnParams {
    /// Connection interval (units of 1.25 ms).
    pub interval: u16,
    /// Peripheral latency (connection events).
    pub latency: u16,
    /// Supervision timeout (units of 10 ms).
    pub supervision_timeout: u16,
    /// Stack status code for the update.
    pub status: u8,
}

/// Link security attributes. Recorded, never negotiated here.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SecurityInfo {
    pub encrypted: bool,
    pub authenticated: bool,
    pub bonded: bool,
    pub key_size: Option<u8>,
}

/// Per-connection state for one BLE link (central ↔ CORC peripheral).
#[derive(Debug, Clone)]
pub struct LinkRecord {
    pub handle: ConnHandle,
    pub addr_type: u8,
    pub addr: PeerAddr,
    /// Negotiated ATT MTU; starts at 23 until an exchange completes.
    pub mtu: u16,
    /// Unset until the first connection-parameter update.
    pub conn_params: Option<ConnParams>,
    pub security: SecurityInfo,
}

impl LinkRecord {
    pub fn new(handle: ConnHandle, addr_type: u8, addr: [u8; 6]) -> Self {
        Self {
            handle,
            addr_type,
            addr: PeerAddr(addr),
            mtu: DEFAULT_ATT_MTU,
            conn_params: None,
            security: SecurityInfo::default(),
        }
    }
}

impl fmt::Display for LinkRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "link(handle={}, addr_type={}, addr={}, mtu={}, enc={}, auth={}, bonded={})",
            self.handle,
            self.addr_type,
            self.addr,
            self.mtu,
            self.security.encrypted,
            self.security.authenticated,
            self.security.bonded,
        )
    }
}

// ───────────────────────────────────────────────────────────────
// Connection registry
// ───────────────────────────────────────────────────────────────

/// Handle → [`LinkRecord`] map. Keys unique; no ordering semantics.
pub struct ConnectionRegistry {
    links: heapless::FnvIndexMap<ConnHandle, LinkRecord, MAX_LINKS>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            links: heapless::FnvIndexMap::new(),
        }
    }

    /// Insert a fresh record for `handle`. A record already occupying the
    /// handle is evicted first — duplicate handles never coexist.
    pub fn add(&mut self, handle: ConnHandle, addr_type: u8, addr: [u8; 6]) {
        if let Some(stale) = self.links.remove(&handle) {
            warn!("LINK: evicting stale record for handle {}: {}", handle, stale);
        }

        let record = LinkRecord::new(handle, addr_type, addr);
        info!("LINK: new {}", record);

        if self.links.insert(handle, record).is_err() {
            // Map full: the stack is tracking more links than we provision
            // for. Drop the record rather than panic in callback context.
            warn!("LINK: registry full, dropping record for handle {}", handle);
        }
    }

    /// Remove and return the record for `handle`, if any.
    pub fn remove(&mut self, handle: ConnHandle) -> Option<LinkRecord> {
        let removed = self.links.remove(&handle);
        if let Some(record) = &removed {
            info!("LINK: removed {}", record);
        }
        removed
    }

    /// Read-only lookup.
    pub fn get(&self, handle: ConnHandle) -> Option<&LinkRecord> {
        self.links.get(&handle)
    }

    /// Update the negotiated MTU. No-op on an unknown handle.
    pub fn update_mtu(&mut self, handle: ConnHandle, mtu: u16) {
        if let Some(record) = self.links.get_mut(&handle) {
            record.mtu = mtu;
            info!("LINK: handle {} MTU now {} ({})", handle, mtu, record.addr);
        }
    }

    /// Record a connection-parameter update. No-op on an unknown handle.
    pub fn update_params(&mut self, handle: ConnHandle, params: ConnParams) {
        if let Some(record) = self.links.get_mut(&handle) {
            record.conn_params = Some(params);
        }
    }

    /// Record the link security tuple. No-op on an unknown handle.
    pub fn update_security(&mut self, handle: ConnHandle, security: SecurityInfo) {
        if let Some(record) = self.links.get_mut(&handle) {
            record.security = security;
        }
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────
