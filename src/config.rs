//! Device configuration parameters
//!
//! All tunable parameters for the CORC peripheral. Bootstrap and
//! persistence live outside this crate; this struct is the boundary they
//! hand over.

use serde::{Deserialize, Serialize};

/// Core device configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    // --- Identity ---
    /// Complete local name carried in the advertisement (truncated to fit
    /// the 31-byte payload).
    pub device_name: heapless::String<24>,

    // --- BLE link ---
    /// ATT MTU requested from the stack at startup. Peers may negotiate
    /// down; the per-link value lives in the connection registry.
    pub preferred_mtu: u16,
    /// Advertising interval (milliseconds).
    pub advertising_interval_ms: u32,

    // --- Timing ---
    /// Period of the deferred advertising-restart retry tick (milliseconds).
    pub advertise_retry_ms: u32,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        let mut device_name = heapless::String::new();
        // "CORC" always fits the 24-byte identity buffer.
        let _ = device_name.push_str("CORC");

        Self {
            device_name,
            preferred_mtu: 247,
            advertising_interval_ms: 500,
            advertise_retry_ms: 250,
        }
    }
}
