//! ISO 15765-2 style transport for packages
//!
//! Frame format (8 data bytes each, unused bytes padded with 0x00):
//! - First frame: `1L LL D0 D1 D2 D3 D4 D5` (12-bit total length)
//! - Consecutive frame: `2N D.. (7 bytes)` with sequence number N = 1..=7
//!
//! The gateway never waits for flow control, and a first frame is used even
//! when the package would fit in a single frame. Eight frames carry at most
//! 6 + 7 * 7 = 55 bytes, which is where the package size limit comes from.

use heapless::Vec;

use crate::package::{PayloadBuffer, MAX_PAYLOAD_SIZE};

/// Bytes per bus frame
pub const FRAME_LEN: usize = 8;

/// Payload bytes carried by the first frame
pub const FIRST_FRAME_DATA: usize = 6;

/// Payload bytes carried by each consecutive frame
pub const CONSECUTIVE_FRAME_DATA: usize = 7;

/// Frames in the longest transfer
pub const MAX_FRAMES: usize = 8;

// Protocol control information, high nibble of byte 0
pub const PCI_SINGLE: u8 = 0x00;
pub const PCI_FIRST: u8 = 0x10;
pub const PCI_CONSECUTIVE: u8 = 0x20;
pub const PCI_FLOW_CONTROL: u8 = 0x30;

const PADDING: u8 = 0x00;

/// Number of frames needed to carry `len` payload bytes
pub fn frame_count(len: usize) -> usize {
    if len <= FIRST_FRAME_DATA {
        1
    } else {
        1 + (len - FIRST_FRAME_DATA).div_ceil(CONSECUTIVE_FRAME_DATA)
    }
}

/// Splits an encoded package into bus frames, in send order
#[derive(Debug, Clone)]
pub struct Segmenter<'a> {
    payload: &'a [u8],
    offset: usize,
    seq: u8,
    started: bool,
}

impl<'a> Segmenter<'a> {
    /// Segment a package
    ///
    /// Takes a [`PayloadBuffer`] so the 55 byte bound holds by construction.
    pub fn new(payload: &'a PayloadBuffer) -> Self {
        Self {
            payload: payload.as_slice(),
            offset: 0,
            seq: 1,
            started: false,
        }
    }

    /// Total number of frames this transfer produces
    pub fn frame_count(&self) -> usize {
        frame_count(self.payload.len())
    }
}

impl<'a> Iterator for Segmenter<'a> {
    type Item = [u8; FRAME_LEN];

    fn next(&mut self) -> Option<Self::Item> {
        let mut frame = [PADDING; FRAME_LEN];

        if !self.started {
            self.started = true;
            let len = self.payload.len();
            frame[0] = PCI_FIRST | ((len >> 8) & 0x0F) as u8;
            frame[1] = (len & 0xFF) as u8;

            let chunk = len.min(FIRST_FRAME_DATA);
            frame[2..2 + chunk].copy_from_slice(&self.payload[..chunk]);
            self.offset = chunk;
            return Some(frame);
        }

        if self.offset >= self.payload.len() {
            return None;
        }

        frame[0] = PCI_CONSECUTIVE | (self.seq & 0x0F);
        let chunk = (self.payload.len() - self.offset).min(CONSECUTIVE_FRAME_DATA);
        frame[1..1 + chunk].copy_from_slice(&self.payload[self.offset..self.offset + chunk]);

        self.offset += chunk;
        self.seq = (self.seq + 1) & 0x0F;
        Some(frame)
    }
}

/// Errors that can occur while reassembling a transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ReassemblyError {
    /// Frame type not valid in the current state
    UnexpectedFrame,
    /// Consecutive frame out of order
    SequenceError { expected: u8, got: u8 },
    /// Announced length exceeds the package limit
    Overflow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RxState {
    /// Waiting for a first frame
    Idle,
    /// Collecting consecutive frames
    Receiving,
}

/// State machine that rebuilds packages from frames
#[derive(Debug, Clone)]
pub struct Reassembler {
    state: RxState,
    expected_len: usize,
    buffer: Vec<u8, MAX_PAYLOAD_SIZE>,
    next_seq: u8,
}

impl Default for Reassembler {
    fn default() -> Self {
        Self::new()
    }
}

impl Reassembler {
    /// Create a new reassembler
    pub const fn new() -> Self {
        Self {
            state: RxState::Idle,
            expected_len: 0,
            buffer: Vec::new(),
            next_seq: 1,
        }
    }

    /// Drop any partial transfer
    pub fn reset(&mut self) {
        self.state = RxState::Idle;
        self.expected_len = 0;
        self.buffer.clear();
        self.next_seq = 1;
    }

    /// Returns true while a transfer is in progress
    pub fn is_receiving(&self) -> bool {
        self.state == RxState::Receiving
    }

    /// Feed one frame
    ///
    /// Returns `Ok(Some(package))` when the transfer is complete, `Ok(None)`
    /// when more frames are needed. A first frame always restarts the
    /// transfer.
    pub fn feed(&mut self, frame: &[u8; FRAME_LEN]) -> Result<Option<PayloadBuffer>, ReassemblyError> {
        match frame[0] & 0xF0 {
            PCI_FIRST => {
                self.reset();
                let len = (usize::from(frame[0] & 0x0F) << 8) | usize::from(frame[1]);
                if len > MAX_PAYLOAD_SIZE {
                    return Err(ReassemblyError::Overflow);
                }
                self.expected_len = len;
                self.state = RxState::Receiving;
                let chunk = len.min(FIRST_FRAME_DATA);
                self.take(&frame[2..2 + chunk])
            }
            PCI_CONSECUTIVE if self.state == RxState::Receiving => {
                let seq = frame[0] & 0x0F;
                if seq != self.next_seq {
                    let expected = self.next_seq;
                    self.reset();
                    return Err(ReassemblyError::SequenceError { expected, got: seq });
                }
                self.next_seq = (self.next_seq + 1) & 0x0F;
                let chunk = (self.expected_len - self.buffer.len()).min(CONSECUTIVE_FRAME_DATA);
                self.take(&frame[1..1 + chunk])
            }
            _ => Err(ReassemblyError::UnexpectedFrame),
        }
    }

    fn take(&mut self, bytes: &[u8]) -> Result<Option<PayloadBuffer>, ReassemblyError> {
        self.buffer
            .extend_from_slice(bytes)
            .map_err(|_| ReassemblyError::Overflow)?;

        if self.buffer.len() < self.expected_len {
            return Ok(None);
        }

        let payload =
            PayloadBuffer::from_slice(&self.buffer).map_err(|_| ReassemblyError::Overflow)?;
        self.reset();
        Ok(Some(payload))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn payload(len: usize) -> PayloadBuffer {
        let bytes: Vec<u8, MAX_PAYLOAD_SIZE> = (0..len).map(|i| i as u8 + 1).collect();
        PayloadBuffer::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_short_payload_uses_first_frame() {
        let buf = payload(3);
        let frames: Vec<[u8; 8], 8> = Segmenter::new(&buf).collect();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0], [0x10, 0x03, 1, 2, 3, 0, 0, 0]);
    }

    #[test]
    fn test_full_transfer_layout() {
        let buf = payload(MAX_PAYLOAD_SIZE);
        let frames: Vec<[u8; 8], 8> = Segmenter::new(&buf).collect();
        assert_eq!(frames.len(), MAX_FRAMES);
        assert_eq!(&frames[0][..2], &[0x10, 55]);
        for (i, frame) in frames.iter().enumerate().skip(1) {
            assert_eq!(frame[0], 0x20 | i as u8);
        }
        // Last consecutive frame is completely filled
        assert_eq!(frames[7][7], 55);
    }

    #[test]
    fn test_padding_after_last_byte() {
        let buf = payload(8);
        let frames: Vec<[u8; 8], 8> = Segmenter::new(&buf).collect();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[1], [0x21, 7, 8, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_frame_count_boundaries() {
        assert_eq!(frame_count(0), 1);
        assert_eq!(frame_count(6), 1);
        assert_eq!(frame_count(7), 2);
        assert_eq!(frame_count(13), 2);
        assert_eq!(frame_count(14), 3);
        assert_eq!(frame_count(55), 8);
    }

    #[test]
    fn test_sequence_error_resets() {
        let buf = payload(20);
        let frames: Vec<[u8; 8], 8> = Segmenter::new(&buf).collect();

        let mut rx = Reassembler::new();
        assert_eq!(rx.feed(&frames[0]), Ok(None));
        assert_eq!(
            rx.feed(&frames[2]),
            Err(ReassemblyError::SequenceError {
                expected: 1,
                got: 2
            })
        );
        assert!(!rx.is_receiving());
    }

    #[test]
    fn test_consecutive_without_first_frame() {
        let mut rx = Reassembler::new();
        assert_eq!(
            rx.feed(&[0x21, 0, 0, 0, 0, 0, 0, 0]),
            Err(ReassemblyError::UnexpectedFrame)
        );
    }

    #[test]
    fn test_oversized_first_frame() {
        let mut rx = Reassembler::new();
        assert_eq!(
            rx.feed(&[0x10, 56, 0, 0, 0, 0, 0, 0]),
            Err(ReassemblyError::Overflow)
        );
    }

    #[test]
    fn test_first_frame_restarts_transfer() {
        let long = payload(30);
        let short = payload(4);
        let mut rx = Reassembler::new();

        let first_long = Segmenter::new(&long).next().unwrap();
        assert_eq!(rx.feed(&first_long), Ok(None));

        let first_short = Segmenter::new(&short).next().unwrap();
        assert_eq!(rx.feed(&first_short), Ok(Some(short.clone())));
    }

    proptest! {
        #[test]
        fn prop_frame_count(len in 0usize..=MAX_PAYLOAD_SIZE) {
            let buf = payload(len);
            let produced = Segmenter::new(&buf).count();
            let expected = if len <= 6 { 1 } else { (len - 6).div_ceil(7) + 1 };
            prop_assert_eq!(produced, expected);
            prop_assert!(produced <= MAX_FRAMES);
        }

        #[test]
        fn prop_reassembly_roundtrip(bytes in proptest::collection::vec(any::<u8>(), 0..=MAX_PAYLOAD_SIZE)) {
            let buf = PayloadBuffer::from_slice(&bytes).unwrap();
            let mut rx = Reassembler::new();
            let mut result = None;
            for frame in Segmenter::new(&buf) {
                prop_assert!(result.is_none());
                result = rx.feed(&frame).unwrap();
            }
            let rebuilt = result.unwrap();
            prop_assert_eq!(rebuilt.as_slice(), &bytes[..]);
        }
    }
}
