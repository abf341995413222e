//! End-to-end command flow: radio write event → dispatcher → queue →
//! pipeline → notification, asserting the exact wire bytes the companion
//! app sees.

use std::sync::Arc;

use corc::adapters::sim::SimRadio;
use corc::ble::events::{EventDispatcher, RadioEvent};
use corc::cmd::pipeline::CommandPipeline;
use corc::peripheral::Shared;
use corc::ports::Radio;

// ── Harness ───────────────────────────────────────────────────

struct Channel {
    shared: Arc<Shared>,
    radio: Arc<SimRadio>,
    dispatcher: EventDispatcher<SimRadio>,
    pipeline: CommandPipeline<SimRadio>,
}

impl Channel {
    fn new() -> Self {
        let shared = Arc::new(Shared::new());
        let radio = Arc::new(SimRadio::new());
        Self {
            dispatcher: EventDispatcher::new(shared.clone(), radio.clone()),
            pipeline: CommandPipeline::new(shared.clone(), radio.clone()),
            shared,
            radio,
        }
    }

    fn connect(&self, handle: u16) {
        self.dispatcher.on_radio_event(RadioEvent::Connected {
            handle,
            addr_type: 0,
            addr: [0x10, 0x20, 0x30, 0x40, 0x50, handle as u8],
        });
    }

    fn write(&self, handle: u16, bytes: &[u8]) {
        let attr = self.radio.inbound_attr();
        self.radio.stage_write(handle, attr, bytes);
        self.dispatcher
            .on_radio_event(RadioEvent::Write { handle, attr });
    }

    fn drain(&self) -> Vec<(u16, Vec<u8>)> {
        self.pipeline.drain();
        self.radio.take_notifications()
    }
}

// ── Wire scenarios ────────────────────────────────────────────

#[test]
fn scenario_a_ping() {
    let ch = Channel::new();
    ch.connect(1);
    ch.write(1, &[0x7C, 0xC0, 0x05, 0x01, 0x00]);

    let sent = ch.drain();
    assert_eq!(sent, vec![(1, vec![0x7C, 0xC0, 0x05, 0x01, 0x00, 0x00])]);
}

#[test]
fn scenario_b_version() {
    let ch = Channel::new();
    ch.connect(1);
    ch.write(1, &[0x7C, 0xC0, 0x09, 0x02, 0x00]);

    let sent = ch.drain();
    assert_eq!(
        sent,
        vec![(1, vec![0x7C, 0xC0, 0x09, 0x02, 0x00, 0x03, 0x01, 0x00, 0x00])]
    );
}

#[test]
fn scenario_c_truncated_answers_invalid_attribute_length() {
    let ch = Channel::new();
    ch.connect(1);
    // Claims len=10, zero payload bytes follow.
    ch.write(1, &[0x7C, 0xC0, 0x01, 0x03, 0x0A]);

    let sent = ch.drain();
    assert_eq!(sent, vec![(1, vec![0x7C, 0xC0, 0x01, 0x03, 0x0D, 0x00])]);
}

#[test]
fn scenario_d_data_max_len_after_mtu_exchange() {
    let ch = Channel::new();
    ch.connect(7);
    ch.dispatcher
        .on_radio_event(RadioEvent::MtuExchanged { handle: 7, mtu: 185 });
    ch.write(7, &[0x7C, 0xC0, 0x02, 0x03, 0x00]);

    let sent = ch.drain();
    assert_eq!(sent, vec![(7, vec![0x7C, 0xC0, 0x02, 0x03, 0x00, 0x01, 182])]);
}

#[test]
fn two_links_with_different_mtus_answer_differently() {
    let ch = Channel::new();
    ch.connect(1);
    ch.connect(2);
    ch.dispatcher
        .on_radio_event(RadioEvent::MtuExchanged { handle: 2, mtu: 247 });

    ch.write(1, &[0x7C, 0xC0, 0xA0, 0x03, 0x00]);
    ch.write(2, &[0x7C, 0xC0, 0xB0, 0x03, 0x00]);

    let sent = ch.drain();
    assert_eq!(sent.len(), 2);
    // Handle 1 still at the 23-byte default: 23 - 3 = 20.
    assert_eq!(sent[0], (1, vec![0x7C, 0xC0, 0xA0, 0x03, 0x00, 0x01, 20]));
    assert_eq!(sent[1], (2, vec![0x7C, 0xC0, 0xB0, 0x03, 0x00, 0x01, 244]));
}

#[test]
fn unknown_opcode_never_raises_and_answers_request_not_supported() {
    let ch = Channel::new();
    ch.connect(1);
    for opcode in [0x00u8, 0x04, 0x10, 0x7F, 0xFE] {
        ch.write(1, &[0x7C, 0xC0, 0x33, opcode, 0x00]);
    }

    let sent = ch.drain();
    assert_eq!(sent.len(), 5);
    for ((_, frame), opcode) in sent.iter().zip([0x00u8, 0x04, 0x10, 0x7F, 0xFE]) {
        assert_eq!(frame, &vec![0x7C, 0xC0, 0x33, opcode, 0x06, 0x00]);
    }
}

#[test]
fn runt_write_produces_no_response() {
    let ch = Channel::new();
    ch.connect(1);
    ch.write(1, &[0x7C, 0xC0, 0x05]);

    assert!(ch.drain().is_empty());
}

#[test]
fn responses_echo_request_id_for_correlation() {
    let ch = Channel::new();
    ch.connect(1);
    for id in [0x00u8, 0x01, 0x80, 0xFF] {
        ch.write(1, &[0x7C, 0xC0, id, 0x01, 0x00]);
    }

    let sent = ch.drain();
    let ids: Vec<u8> = sent.iter().map(|(_, frame)| frame[2]).collect();
    assert_eq!(ids, vec![0x00, 0x01, 0x80, 0xFF]);
}

#[test]
fn dropped_link_notification_failure_skips_only_that_response() {
    let ch = Channel::new();
    ch.connect(1);
    ch.connect(2);
    ch.radio.fail_notifies_for(1);

    ch.write(1, &[0x7C, 0xC0, 0x05, 0x01, 0x00]);
    ch.write(2, &[0x7C, 0xC0, 0x06, 0x01, 0x00]);

    let sent = ch.drain();
    assert_eq!(sent, vec![(2, vec![0x7C, 0xC0, 0x06, 0x01, 0x00, 0x00])]);
    // The queue is fully drained either way.
    assert!(ch.shared.inbound.is_empty());
}

#[test]
fn saturated_queue_answers_busy_after_drain() {
    let ch = Channel::new();
    ch.connect(1);
    // Fill the queue, then one more.
    for i in 0..corc::cmd::queue::QUEUE_DEPTH {
        ch.write(1, &[0x7C, 0xC0, i as u8, 0x01, 0x00]);
    }
    ch.write(1, &[0x7C, 0xC0, 0xEE, 0x02, 0x00]);

    let sent = ch.drain();
    assert_eq!(sent.len(), corc::cmd::queue::QUEUE_DEPTH + 1);
    // The rejected frame's reply leads the drain and carries Busy.
    assert_eq!(sent[0].1, vec![0x7C, 0xC0, 0xEE, 0x02, 0x14, 0x00]);
    // Every accepted ping got its normal reply.
    for (i, (_, frame)) in sent.iter().skip(1).enumerate() {
        assert_eq!(frame, &vec![0x7C, 0xC0, i as u8, 0x01, 0x00, 0x00]);
    }
}
