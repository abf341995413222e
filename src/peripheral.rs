//! Peripheral orchestrator — owns the shared state and drives the
//! cooperative side of the firmware.
//!
//! ```text
//!  ┌─────────────────────────────────────────────────────────┐
//!  │  Cooperative thread                                     │
//!  │  ┌───────────────────────────────────────────────────┐  │
//!  │  │  futures_lite::block_on (drives the executor)     │  │
//!  │  │  ┌───────────────────────────────────────────────┐│  │
//!  │  │  │  edge_executor::LocalExecutor                 ││  │
//!  │  │  │  ┌──────────────┐  ┌─────────────────────┐  ││  │
//!  │  │  │  │ Pipeline      │  │ Advertise retry     │  ││  │
//!  │  │  │  │ wake-on-signal│  │ fixed tick ⏱       │  ││  │
//!  │  │  │  └──────────────┘  └─────────────────────┘  ││  │
//!  │  │  └───────────────────────────────────────────────┘│  │
//!  │  └───────────────────────────────────────────────────┘  │
//!  └─────────────────────────────────────────────────────────┘
//! ```
//!
//! The radio callback context only ever touches [`Shared`] through the
//! single-call operations it exposes; the registry and queue critical
//! sections never span an await or a stack call.

use core::cell::RefCell;
use core::sync::atomic::{AtomicBool, Ordering};
use core::time::Duration;
use std::sync::Arc;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use log::{info, warn};

use crate::ble::DEFAULT_ATT_MTU;
use crate::ble::advertising::AdvertisingSet;
use crate::ble::events::EventDispatcher;
use crate::ble::link::ConnectionRegistry;
use crate::cmd::pipeline::CommandPipeline;
use crate::cmd::queue::InboundQueue;
use crate::config::DeviceConfig;
use crate::error::{Error, Result};
use crate::ports::{Advertiser, Radio};

// ───────────────────────────────────────────────────────────────
// Shared state
// ───────────────────────────────────────────────────────────────

/// State touched from both execution contexts. Owned by the orchestrator,
/// handed by `Arc` to the dispatcher and pipeline — no process-wide
/// globals.
pub struct Shared {
    registry: Mutex<CriticalSectionRawMutex, RefCell<ConnectionRegistry>>,
    pub inbound: InboundQueue,
    advertise_pending: AtomicBool,
}

impl Shared {
    pub fn new() -> Self {
        Self {
            registry: Mutex::new(RefCell::new(ConnectionRegistry::new())),
            inbound: InboundQueue::new(),
            advertise_pending: AtomicBool::new(false),
        }
    }

    /// Run `f` against the registry inside a short critical section.
    pub fn with_registry<T>(&self, f: impl FnOnce(&mut ConnectionRegistry) -> T) -> T {
        self.registry.lock(|reg| f(&mut reg.borrow_mut()))
    }

    /// Arm the deferred advertising restart (callback-context safe).
    pub fn request_advertise_restart(&self) {
        self.advertise_pending.store(true, Ordering::Release);
    }

    pub fn advertise_restart_pending(&self) -> bool {
        self.advertise_pending.load(Ordering::Acquire)
    }

    fn clear_advertise_restart(&self) {
        self.advertise_pending.store(false, Ordering::Release);
    }
}

// ───────────────────────────────────────────────────────────────
// Orchestrator
// ───────────────────────────────────────────────────────────────

/// Wires registry, queue, dispatcher, pipeline and advertiser together.
pub struct Peripheral<R: Radio, A: Advertiser> {
    shared: Arc<Shared>,
    radio: Arc<R>,
    advertiser: A,
    adv_set: AdvertisingSet,
    retry_period: Duration,
}

impl<R: Radio, A: Advertiser> Peripheral<R, A> {
    pub fn new(config: &DeviceConfig, radio: Arc<R>, advertiser: A) -> Result<Self> {
        if config.device_name.is_empty() {
            return Err(Error::Config("device name must not be empty"));
        }
        if config.preferred_mtu < DEFAULT_ATT_MTU {
            return Err(Error::Config("preferred MTU below ATT minimum"));
        }

        Ok(Self {
            shared: Arc::new(Shared::new()),
            radio,
            advertiser,
            adv_set: AdvertisingSet::for_device(config),
            retry_period: Duration::from_millis(u64::from(config.advertise_retry_ms)),
        })
    }

    /// Shared state handle for the radio glue.
    pub fn shared(&self) -> Arc<Shared> {
        self.shared.clone()
    }

    /// Build the dispatcher the radio stack's callback must invoke.
    pub fn dispatcher(&self) -> EventDispatcher<R> {
        EventDispatcher::new(self.shared.clone(), self.radio.clone())
    }

    /// Direct access to the advertiser (diagnostics and test doubles).
    pub fn advertiser_mut(&mut self) -> &mut A {
        &mut self.advertiser
    }

    /// One poll of the pending-advertise-restart flag. Returns `true` when
    /// a restart was performed. On failure the flag stays set for the next
    /// tick — bounded-period indefinite retry, not fatal.
    pub fn advertise_tick(&mut self) -> bool {
        advertise_restart_tick(&self.shared, &mut self.advertiser, &self.adv_set)
    }

    /// Run the cooperative side forever: the command pipeline and the
    /// advertise retry loop as executor tasks.
    pub fn run(self) {
        let Self {
            shared,
            radio,
            advertiser,
            adv_set,
            retry_period,
        } = self;

        // First broadcast goes through the same retry path.
        shared.request_advertise_restart();

        let executor: edge_executor::LocalExecutor<'_, 4> = edge_executor::LocalExecutor::new();

        let pipeline = CommandPipeline::new(shared.clone(), radio.clone());
        executor
            .spawn(async move { pipeline.run().await })
            .detach();
        executor
            .spawn(advertise_loop(shared, advertiser, adv_set, retry_period))
            .detach();

        info!(
            "PERIPHERAL: started (advertise retry tick {:?})",
            retry_period
        );

        // The executor drives both tasks for the process lifetime.
        futures_lite::future::block_on(executor.run(core::future::pending::<()>()));
    }
}

/// Poll the restart flag once; start broadcasting if it is armed.
fn advertise_restart_tick<A: Advertiser>(
    shared: &Shared,
    advertiser: &mut A,
    set: &AdvertisingSet,
) -> bool {
    if !shared.advertise_restart_pending() {
        return false;
    }

    match advertiser.start(set) {
        Ok(()) => {
            shared.clear_advertise_restart();
            info!("ADV: broadcasting started");
            true
        }
        Err(e) => {
            warn!("ADV: restart failed: {} — retrying next tick", e);
            false
        }
    }
}

/// Advertise retry task — polls the flag at a fixed reactor-timer tick,
/// always outside the radio callback context.
async fn advertise_loop<A: Advertiser>(
    shared: Arc<Shared>,
    mut advertiser: A,
    set: AdvertisingSet,
    period: Duration,
) {
    loop {
        advertise_restart_tick(&shared, &mut advertiser, &set);
        async_io_mini::Timer::after(period).await;
    }
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────
