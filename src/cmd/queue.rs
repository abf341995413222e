//! Inbound frame queue — the bridge between the radio callback context and
//! the command pipeline.
//!
//! ```text
//! ┌──────────────────┐  InboundFrame   ┌──────────────────┐
//! │ Event Dispatcher │───────────────▶│ Command Pipeline  │
//! │ (callback ctx)   │  wake signal ─▶│ (cooperative task)│
//! └──────────────────┘                 └──────────────────┘
//! ```
//!
//! One global FIFO across all connections, bounded so a misbehaving peer
//! cannot grow memory without limit; rejected frames leave a busy notice
//! behind so the pipeline can still answer `Busy`. The wake signal is a
//! single slot — raises before the consumer wakes collapse into one, and
//! the consumer always drains fully before re-waiting, so no entry is
//! ever stranded.
//!
//! Producers only push or purge single entries inside a critical section;
//! the consumer alone iterates. Critical sections never span an await.

use core::cell::RefCell;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use heapless::Deque;

use crate::ble::ConnHandle;

use super::codec::RawFrame;

/// Queue depth for inbound frames.
pub const QUEUE_DEPTH: usize = 8;

/// Pending busy notices kept while the queue is saturated.
const NOTICE_DEPTH: usize = 4;

/// One characteristic write, queued for the pipeline.
#[derive(Debug)]
pub struct InboundFrame {
    pub handle: ConnHandle,
    pub data: RawFrame,
}

impl InboundFrame {
    /// Copy `bytes` into a frame; `None` if they exceed the frame cap.
    pub fn new(handle: ConnHandle, bytes: &[u8]) -> Option<Self> {
        let mut data = RawFrame::new();
        data.extend_from_slice(bytes).ok()?;
        Some(Self { handle, data })
    }
}

/// Record of a frame rejected on overflow; answered with `Busy`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusyNotice {
    pub handle: ConnHandle,
    pub id: u8,
    pub opcode: u8,
}

/// Push rejection: the FIFO is at capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueFull;

type Slot<T, const N: usize> = Mutex<CriticalSectionRawMutex, RefCell<Deque<T, N>>>;

/// Bounded global FIFO plus the single-slot wake primitive.
pub struct InboundQueue {
    frames: Slot<InboundFrame, QUEUE_DEPTH>,
    notices: Slot<BusyNotice, NOTICE_DEPTH>,
    wake: Signal<CriticalSectionRawMutex, ()>,
}

impl InboundQueue {
    pub fn new() -> Self {
        Self {
            frames: Mutex::new(RefCell::new(Deque::new())),
            notices: Mutex::new(RefCell::new(Deque::new())),
            wake: Signal::new(),
        }
    }

    /// Append a frame. Callback-context safe: single bounded critical
    /// section, no allocation.
    pub fn push(&self, frame: InboundFrame) -> Result<(), QueueFull> {
        self.frames.lock(|q| {
            q.borrow_mut().push_back(frame).map_err(|_| QueueFull)
        })
    }

    /// Record a busy notice for a rejected frame. Returns `false` when the
    /// notice list itself is saturated and the frame vanishes with only a
    /// log line to show for it.
    pub fn push_notice(&self, notice: BusyNotice) -> bool {
        self.notices.lock(|q| q.borrow_mut().push_back(notice).is_ok())
    }

    /// Take the oldest queued frame.
    pub fn pop(&self) -> Option<InboundFrame> {
        self.frames.lock(|q| q.borrow_mut().pop_front())
    }

    /// Take the oldest pending busy notice.
    pub fn take_notice(&self) -> Option<BusyNotice> {
        self.notices.lock(|q| q.borrow_mut().pop_front())
    }

    /// Drop every queued frame and notice belonging to `handle`, keeping
    /// the relative order of all other handles' entries. Returns how many
    /// frames were discarded.
    pub fn purge(&self, handle: ConnHandle) -> usize {
        let removed = self.frames.lock(|q| {
            let q = &mut *q.borrow_mut();
            let before = q.len();
            for _ in 0..before {
                if let Some(frame) = q.pop_front() {
                    if frame.handle != handle {
                        // Re-queue: capacity cannot be exceeded, we only
                        // put back what we just took out.
                        let _ = q.push_back(frame);
                    }
                }
            }
            before - q.len()
        });

        self.notices.lock(|q| {
            let q = &mut *q.borrow_mut();
            for _ in 0..q.len() {
                if let Some(notice) = q.pop_front() {
                    if notice.handle != handle {
                        let _ = q.push_back(notice);
                    }
                }
            }
        });

        removed
    }

    /// Raise the consumer wake signal. Multiple raises collapse into one.
    pub fn wake(&self) {
        self.wake.signal(());
    }

    /// Wait until the next wake. Consumed on return.
    pub async fn wait(&self) {
        self.wake.wait().await;
    }

    pub fn len(&self) -> usize {
        self.frames.lock(|q| q.borrow().len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(handle: ConnHandle, tag: u8) -> InboundFrame {
        InboundFrame::new(handle, &[0x7C, 0xC0, tag, 0x01, 0x00]).unwrap()
    }

    #[test]
    fn fifo_order_across_handles() {
        let q = InboundQueue::new();
        q.push(frame(1, 0xA1)).unwrap();
        q.push(frame(2, 0xB1)).unwrap();
        q.push(frame(1, 0xA2)).unwrap();

        assert_eq!(q.pop().unwrap().data[2], 0xA1);
        assert_eq!(q.pop().unwrap().data[2], 0xB1);
        assert_eq!(q.pop().unwrap().data[2], 0xA2);
        assert!(q.pop().is_none());
    }

    #[test]
    fn push_fails_at_capacity() {
        let q = InboundQueue::new();
        for i in 0..QUEUE_DEPTH {
            q.push(frame(1, i as u8)).unwrap();
        }
        assert_eq!(q.push(frame(1, 0xFF)), Err(QueueFull));
        assert_eq!(q.len(), QUEUE_DEPTH);
    }

    #[test]
    fn purge_removes_exactly_one_handles_frames() {
        let q = InboundQueue::new();
        // #1 has 3 queued frames, #2 has 1.
        q.push(frame(1, 0xA1)).unwrap();
        q.push(frame(2, 0xB1)).unwrap();
        q.push(frame(1, 0xA2)).unwrap();
        q.push(frame(1, 0xA3)).unwrap();

        assert_eq!(q.purge(1), 3);

        let survivor = q.pop().unwrap();
        assert_eq!(survivor.handle, 2);
        assert_eq!(survivor.data[2], 0xB1);
        assert!(q.pop().is_none());
    }

    #[test]
    fn purge_preserves_relative_order_of_others() {
        let q = InboundQueue::new();
        q.push(frame(3, 0x31)).unwrap();
        q.push(frame(9, 0x91)).unwrap();
        q.push(frame(3, 0x32)).unwrap();
        q.push(frame(9, 0x92)).unwrap();
        q.push(frame(9, 0x93)).unwrap();

        assert_eq!(q.purge(9), 3);

        assert_eq!(q.pop().unwrap().data[2], 0x31);
        assert_eq!(q.pop().unwrap().data[2], 0x32);
        assert!(q.pop().is_none());
    }

    #[test]
    fn purge_drops_pending_notices_too() {
        let q = InboundQueue::new();
        assert!(q.push_notice(BusyNotice {
            handle: 4,
            id: 0x10,
            opcode: 0x01
        }));
        assert!(q.push_notice(BusyNotice {
            handle: 5,
            id: 0x11,
            opcode: 0x01
        }));

        q.purge(4);

        let left = q.take_notice().unwrap();
        assert_eq!(left.handle, 5);
        assert!(q.take_notice().is_none());
    }

    #[test]
    fn notice_list_is_bounded() {
        let q = InboundQueue::new();
        for i in 0..NOTICE_DEPTH {
            assert!(q.push_notice(BusyNotice {
                handle: 1,
                id: i as u8,
                opcode: 0x01
            }));
        }
        assert!(!q.push_notice(BusyNotice {
            handle: 1,
            id: 0xFF,
            opcode: 0x01
        }));
    }

    #[test]
    fn wake_raises_collapse_into_one() {
        let q = InboundQueue::new();
        q.wake();
        q.wake();
        futures_lite::future::block_on(q.wait());
        // Second raise was absorbed by the single slot.
        assert!(q.pop().is_none());
    }

    #[test]
    fn oversized_write_is_rejected_at_construction() {
        let too_big = [0u8; super::super::codec::MAX_FRAME_LEN + 1];
        assert!(InboundFrame::new(1, &too_big).is_none());
    }
}
