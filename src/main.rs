//! CORC Firmware — Main Entry Point
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                    Adapters (outer ring)                   │
//! │                                                            │
//! │   EspRadio (Radio)            EspAdvertiser (Advertiser)   │
//! │                                                            │
//! │  ──────────────── Port Trait Boundary ───────────────────  │
//! │                                                            │
//! │  ┌──────────────────────────────────────────────────────┐  │
//! │  │   EventDispatcher · ConnectionRegistry · Pipeline    │  │
//! │  │   (pure logic, host-testable)                        │  │
//! │  └──────────────────────────────────────────────────────┘  │
//! │                                                            │
//! │  Peripheral orchestrator (executor + advertise retry)      │
//! └────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use anyhow::Result;
use log::info;

use corc::adapters::radio::{EspAdvertiser, EspRadio, install_dispatcher};
use corc::config::DeviceConfig;
use corc::peripheral::Peripheral;

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  CORC v{}                         ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Configuration ──────────────────────────────────────
    // Bootstrap/persistence is an external collaborator; the defaults are
    // the deployed identity.
    let config = DeviceConfig::default();

    // ── 3. Radio stack + orchestrator ─────────────────────────
    let radio = EspRadio::init(&config)?;
    let peripheral = Peripheral::new(&config, radio, EspAdvertiser::new())?;

    // Callbacks route link events here from the Bluedroid task context.
    install_dispatcher(peripheral.dispatcher())?;

    info!("System ready. Entering command loop.");

    // ── 4. Cooperative loop (never returns) ───────────────────
    peripheral.run();

    Ok(())
}
