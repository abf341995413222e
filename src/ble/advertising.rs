//! GAP advertising payload construction.
//!
//! The advertisement carries flags + complete local name; the 128-bit
//! service UUID goes in the scan response. Both payloads are capped at 31
//! bytes and the name is truncated to fit. Byte layout is part of the
//! deployed client contract.

use crate::config::DeviceConfig;

use super::SERVICE_UUID;

/// Hard GAP limit on legacy advertising payloads.
pub const ADV_MAX_LEN: usize = 31;

// AD structure types.
const ADV_TYPE_FLAGS: u8 = 0x01;
const ADV_TYPE_UUID128_COMPLETE: u8 = 0x07;
const ADV_TYPE_COMPLETE_NAME: u8 = 0x09;

// General discoverable, BR/EDR not supported.
const ADV_FLAGS_VALUE: u8 = 0x06;

/// A single ≤31-byte advertising payload.
pub type AdvPayload = heapless::Vec<u8, ADV_MAX_LEN>;

/// Everything the Advertiser needs to broadcast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdvertisingSet {
    pub interval_ms: u32,
    pub adv_data: AdvPayload,
    pub scan_resp: AdvPayload,
}

impl AdvertisingSet {
    /// Build the advertisement + scan response for this device.
    pub fn for_device(config: &DeviceConfig) -> Self {
        Self {
            interval_ms: config.advertising_interval_ms,
            adv_data: build_adv_payload(config.device_name.as_str()),
            scan_resp: build_scan_response(SERVICE_UUID),
        }
    }
}

/// Flags + complete local name, name truncated so the total fits 31 bytes.
pub fn build_adv_payload(name: &str) -> AdvPayload {
    let mut payload = AdvPayload::new();

    // Flags AD: length 2, type, value. Always fits an empty payload.
    let _ = payload.push(2);
    let _ = payload.push(ADV_TYPE_FLAGS);
    let _ = payload.push(ADV_FLAGS_VALUE);

    let name_bytes = name.as_bytes();
    if !name_bytes.is_empty() {
        // 31 bytes total - current payload length - 2 bytes (len + type).
        let max_name_len = ADV_MAX_LEN - payload.len() - 2;
        let name_bytes = &name_bytes[..name_bytes.len().min(max_name_len)];

        let _ = payload.push(name_bytes.len() as u8 + 1);
        let _ = payload.push(ADV_TYPE_COMPLETE_NAME);
        let _ = payload.extend_from_slice(name_bytes);
    }

    payload
}

/// Scan response carrying one complete 128-bit service UUID (little-endian).
pub fn build_scan_response(uuid: u128) -> AdvPayload {
    let mut payload = AdvPayload::new();
    let uuid_bytes = uuid.to_le_bytes();

    let _ = payload.push(uuid_bytes.len() as u8 + 1);
    let _ = payload.push(ADV_TYPE_UUID128_COMPLETE);
    let _ = payload.extend_from_slice(&uuid_bytes);

    payload
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────
