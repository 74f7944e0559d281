//! Shared mocks for unit tests
//!
//! `BusLog` records frames and delays in the order they happen, so tests can
//! check that delays sit around packages and that nothing is sent after a
//! transport error.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;
use std::vec::Vec;

use agwlink_hal::{CanFrame, CanRx, CanTx};
use embedded_hal::delay::DelayNs;

/// Something that happened on the mock bus
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entry {
    Frame(CanFrame),
    Delay(u32),
}

/// Error produced by the mock transport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockError;

#[derive(Default)]
struct Shared {
    entries: RefCell<Vec<Entry>>,
    rx: RefCell<VecDeque<CanFrame>>,
    fail_at: Cell<Option<usize>>,
    rx_error: Cell<bool>,
}

/// Handle on the shared log of a mock bus and delay pair
#[derive(Clone, Default)]
pub struct BusLog {
    shared: Rc<Shared>,
}

impl BusLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a bus and a delay that both write into this log
    pub fn split(&self) -> (MockBus, MockDelay) {
        (
            MockBus { log: self.clone() },
            MockDelay { log: self.clone() },
        )
    }

    pub fn entries(&self) -> Vec<Entry> {
        self.shared.entries.borrow().clone()
    }

    pub fn sent_frames(&self) -> Vec<CanFrame> {
        self.shared
            .entries
            .borrow()
            .iter()
            .filter_map(|e| match e {
                Entry::Frame(frame) => Some(*frame),
                Entry::Delay(_) => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.shared.entries.borrow_mut().clear();
    }

    /// Fail the transmit call that would send frame number `index` (counted
    /// over the whole log)
    pub fn fail_at(&self, index: usize) {
        self.shared.fail_at.set(Some(index));
    }

    /// Queue a frame for the driver to receive
    pub fn push_rx(&self, frame: CanFrame) {
        self.shared.rx.borrow_mut().push_back(frame);
    }

    pub fn pending_rx(&self) -> usize {
        self.shared.rx.borrow().len()
    }

    /// Make every receive call fail
    pub fn fail_rx(&self) {
        self.shared.rx_error.set(true);
    }
}

pub struct MockBus {
    log: BusLog,
}

impl CanTx for MockBus {
    type Error = MockError;

    fn transmit(&mut self, frame: &CanFrame) -> Result<(), Self::Error> {
        if self.log.shared.fail_at.get() == Some(self.log.sent_frames().len()) {
            return Err(MockError);
        }
        self.log.shared.entries.borrow_mut().push(Entry::Frame(*frame));
        Ok(())
    }
}

impl CanRx for MockBus {
    type Error = MockError;

    fn try_receive(&mut self) -> Result<Option<CanFrame>, Self::Error> {
        if self.log.shared.rx_error.get() {
            return Err(MockError);
        }
        Ok(self.log.shared.rx.borrow_mut().pop_front())
    }
}

pub struct MockDelay {
    log: BusLog,
}

impl DelayNs for MockDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.delay_ms(ns / 1_000_000);
    }

    fn delay_ms(&mut self, ms: u32) {
        self.log.shared.entries.borrow_mut().push(Entry::Delay(ms));
    }
}
