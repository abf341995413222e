//! BLE link layer state: per-connection records, the radio event
//! dispatcher, and advertising payload construction.
//!
//! The GATT surface is one private service with a write-only inbound
//! characteristic and a notify-only outbound characteristic. The three
//! UUIDs are part of the deployed companion-app contract — never reorder
//! or regenerate them.
//!
//! | Characteristic | UUID                                   | Perms            |
//! |----------------|----------------------------------------|------------------|
//! | Command RX     | `B13A1001-9F2A-4F3B-9C8E-A7D4E3C8B125` | Write+WriteNoRsp |
//! | Command TX     | `B13A1002-9F2A-4F3B-9C8E-A7D4E3C8B125` | Notify           |

pub mod advertising;
pub mod events;
pub mod link;

// ───────────────────────────────────────────────────────────────
// GATT identity
// ───────────────────────────────────────────────────────────────

pub const SERVICE_UUID: u128 = 0xB13A1000_9F2A_4F3B_9C8E_A7D4E3C8B125;
pub const RX_CHAR_UUID: u128 = 0xB13A1001_9F2A_4F3B_9C8E_A7D4E3C8B125;
pub const TX_CHAR_UUID: u128 = 0xB13A1002_9F2A_4F3B_9C8E_A7D4E3C8B125;

/// Connection handle assigned by the radio stack to an active link.
pub type ConnHandle = u16;

/// GATT attribute handle.
pub type AttrHandle = u16;

/// ATT MTU every link starts at until an exchange completes.
pub const DEFAULT_ATT_MTU: u16 = 23;
