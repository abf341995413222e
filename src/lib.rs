//! CORC firmware library.
//!
//! Exposes the pure-logic modules for integration testing and external
//! inspection. All ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod ble;
pub mod cmd;
pub mod config;
pub mod peripheral;
pub mod ports;

pub mod error;

// Re-export the ESP-IDF-only adapters so the crate compiles everywhere;
// the Bluedroid implementation is guarded by cfg attributes inside.
pub mod adapters;
