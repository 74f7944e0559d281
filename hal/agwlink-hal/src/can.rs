//! CAN bus abstractions
//!
//! Provides the frame type and the traits for sending and receiving raw
//! classic CAN frames. Implementations are expected to be non-blocking:
//! the display driver runs inside the caller's polling loop.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Number of data bytes in every frame on the cluster bus
pub const FRAME_DATA_LEN: usize = 8;

/// Highest valid 11-bit standard identifier
pub const MAX_STANDARD_ID: u16 = 0x7FF;

/// A classic CAN frame with a standard identifier
///
/// The cluster protocol always uses a DLC of 8, so the data block is fixed
/// size. Unused bytes are padding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CanFrame {
    /// 11-bit standard identifier
    pub id: u16,
    /// Data bytes
    pub data: [u8; FRAME_DATA_LEN],
}

impl CanFrame {
    /// Create a frame, returning `None` if the identifier is not an 11-bit id
    pub fn new(id: u16, data: [u8; FRAME_DATA_LEN]) -> Option<Self> {
        if id > MAX_STANDARD_ID {
            return None;
        }
        Some(Self { id, data })
    }

    /// Create a frame from a short slice, padding the rest with zeros
    ///
    /// Returns `None` if the slice is longer than a frame or the identifier
    /// is out of range.
    pub fn from_slice(id: u16, bytes: &[u8]) -> Option<Self> {
        if bytes.len() > FRAME_DATA_LEN {
            return None;
        }
        let mut data = [0u8; FRAME_DATA_LEN];
        data[..bytes.len()].copy_from_slice(bytes);
        Self::new(id, data)
    }
}

/// CAN transmitter
pub trait CanTx {
    /// Error type for transmit operations
    type Error;

    /// Queue a frame for transmission
    ///
    /// Frames handed over in order must reach the bus in that order.
    fn transmit(&mut self, frame: &CanFrame) -> Result<(), Self::Error>;
}

/// CAN receiver
pub trait CanRx {
    /// Error type for receive operations
    type Error;

    /// Take the next pending frame, if any
    ///
    /// Returns `Ok(None)` when nothing is waiting. Never blocks.
    fn try_receive(&mut self) -> Result<Option<CanFrame>, Self::Error>;
}

/// Combined CAN interface
///
/// For controllers that provide both TX and RX on a single peripheral.
pub trait CanBus: CanTx + CanRx {}

// Blanket implementation
impl<T: CanTx + CanRx> CanBus for T {}
