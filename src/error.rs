//! Unified error types for the CORC firmware.
//!
//! Follows embedded best practice: a single `Error` enum that every
//! subsystem can convert into, keeping the startup path's error handling
//! uniform. All variants are `Copy` so they can be cheaply passed around
//! without allocation. Inside the command pipeline and event dispatcher
//! nothing is fatal — failures there go to the log, not to this type.

use core::fmt;

use crate::ports::{AdvertiseError, RadioError};

/// Every fallible startup/orchestration operation funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The radio stack failed.
    Radio(RadioError),
    /// The advertiser failed.
    Advertise(AdvertiseError),
    /// Peripheral initialisation failed.
    Init(&'static str),
    /// Configuration is invalid.
    Config(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Radio(e) => write!(f, "radio: {e}"),
            Self::Advertise(e) => write!(f, "advertise: {e}"),
            Self::Init(msg) => write!(f, "init: {msg}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

impl core::error::Error for Error {}

impl From<RadioError> for Error {
    fn from(e: RadioError) -> Self {
        Self::Radio(e)
    }
}

impl From<AdvertiseError> for Error {
    fn from(e: AdvertiseError) -> Self {
        Self::Advertise(e)
    }
}

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
