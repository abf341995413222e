//! Link lifecycle across radio events: registry contents, queue purge
//! ordering, and the deferred advertising restart.

use std::sync::Arc;

use corc::adapters::sim::{SimAdvertiser, SimRadio};
use corc::ble::events::{EventDispatcher, RadioEvent};
use corc::ble::DEFAULT_ATT_MTU;
use corc::config::DeviceConfig;
use corc::peripheral::{Peripheral, Shared};
use corc::ports::Radio;

fn harness() -> (Arc<Shared>, Arc<SimRadio>, EventDispatcher<SimRadio>) {
    let shared = Arc::new(Shared::new());
    let radio = Arc::new(SimRadio::new());
    let dispatcher = EventDispatcher::new(shared.clone(), radio.clone());
    (shared, radio, dispatcher)
}

fn connect(dispatcher: &EventDispatcher<SimRadio>, handle: u16, first_octet: u8) {
    dispatcher.on_radio_event(RadioEvent::Connected {
        handle,
        addr_type: 1,
        addr: [first_octet, 2, 3, 4, 5, 6],
    });
}

fn write(
    dispatcher: &EventDispatcher<SimRadio>,
    radio: &SimRadio,
    handle: u16,
    bytes: &[u8],
) {
    let attr = radio.inbound_attr();
    radio.stage_write(handle, attr, bytes);
    dispatcher.on_radio_event(RadioEvent::Write { handle, attr });
}

#[test]
fn full_link_lifecycle() {
    let (shared, _radio, dispatcher) = harness();

    connect(&dispatcher, 5, 0xAA);
    assert_eq!(
        shared.with_registry(|reg| reg.get(5).map(|l| l.mtu)),
        Some(DEFAULT_ATT_MTU)
    );

    dispatcher.on_radio_event(RadioEvent::MtuExchanged { handle: 5, mtu: 247 });
    dispatcher.on_radio_event(RadioEvent::ConnParamsUpdated {
        handle: 5,
        interval: 36,
        latency: 0,
        supervision_timeout: 400,
        status: 0,
    });
    dispatcher.on_radio_event(RadioEvent::EncryptionUpdated {
        handle: 5,
        encrypted: true,
        authenticated: false,
        bonded: true,
        key_size: 16,
    });

    shared.with_registry(|reg| {
        let link = reg.get(5).cloned().unwrap();
        assert_eq!(link.mtu, 247);
        let params = link.conn_params.unwrap();
        assert_eq!(params.interval, 36);
        assert_eq!(params.supervision_timeout, 400);
        assert!(link.security.encrypted);
        assert!(link.security.bonded);
    });

    dispatcher.on_radio_event(RadioEvent::Disconnected { handle: 5, reason: 0x16 });
    assert!(shared.with_registry(|reg| reg.get(5).is_none()));
}

#[test]
fn reconnect_with_same_handle_starts_fresh() {
    let (shared, _radio, dispatcher) = harness();

    connect(&dispatcher, 3, 0xAA);
    dispatcher.on_radio_event(RadioEvent::MtuExchanged { handle: 3, mtu: 185 });

    // Stack reuses the handle without a disconnect in between: the stale
    // record is evicted, not merged.
    connect(&dispatcher, 3, 0xBB);

    shared.with_registry(|reg| {
        assert_eq!(reg.len(), 1);
        let link = reg.get(3).unwrap();
        assert_eq!(link.addr.0[0], 0xBB);
        assert_eq!(link.mtu, DEFAULT_ATT_MTU);
    });
}

#[test]
fn scenario_e_disconnect_purges_only_that_handles_frames() {
    let (shared, radio, dispatcher) = harness();
    connect(&dispatcher, 1, 0x01);
    connect(&dispatcher, 2, 0x02);

    // #1 queues 3 frames, #2 queues 1.
    write(&dispatcher, &radio, 1, &[0x7C, 0xC0, 0xA1, 0x01, 0x00]);
    write(&dispatcher, &radio, 1, &[0x7C, 0xC0, 0xA2, 0x01, 0x00]);
    write(&dispatcher, &radio, 2, &[0x7C, 0xC0, 0xB1, 0x01, 0x00]);
    write(&dispatcher, &radio, 1, &[0x7C, 0xC0, 0xA3, 0x01, 0x00]);

    dispatcher.on_radio_event(RadioEvent::Disconnected { handle: 1, reason: 0x08 });

    // Only #2's frame survives, in its original position.
    assert_eq!(shared.inbound.len(), 1);
    let frame = shared.inbound.pop().unwrap();
    assert_eq!(frame.handle, 2);
    assert_eq!(frame.data[2], 0xB1);
}

#[test]
fn disconnect_arms_deferred_advertise_restart() {
    let (shared, _radio, dispatcher) = harness();
    connect(&dispatcher, 1, 0x01);

    assert!(!shared.advertise_restart_pending());
    dispatcher.on_radio_event(RadioEvent::Disconnected { handle: 1, reason: 0x13 });
    assert!(shared.advertise_restart_pending());
}

#[test]
fn advertise_restart_retries_until_the_stack_accepts() {
    let radio = Arc::new(SimRadio::new());
    let mut peripheral = Peripheral::new(
        &DeviceConfig::default(),
        radio.clone(),
        SimAdvertiser::new(),
    )
    .unwrap();

    let shared = peripheral.shared();
    let dispatcher = EventDispatcher::new(shared.clone(), radio);

    // Peer drops while the GAP layer is refusing restarts.
    dispatcher.on_radio_event(RadioEvent::Connected {
        handle: 1,
        addr_type: 0,
        addr: [9; 6],
    });
    dispatcher.on_radio_event(RadioEvent::Disconnected { handle: 1, reason: 0x13 });

    peripheral.advertiser_mut().fail_starts(true);
    assert!(!peripheral.advertise_tick());
    assert!(peripheral.shared().advertise_restart_pending());
    assert!(!peripheral.advertise_tick());

    // Next tick after the stack recovers succeeds and disarms the flag.
    peripheral.advertiser_mut().fail_starts(false);
    assert!(peripheral.advertise_tick());
    assert!(!peripheral.shared().advertise_restart_pending());
    assert_eq!(peripheral.advertiser_mut().start_count(), 1);
}
