//! Timed multi-frame transmission

use agwlink_hal::{CanFrame, CanTx};
use agwlink_protocol::{PayloadBuffer, Segmenter};
use embedded_hal::delay::DelayNs;

use crate::config::SendTiming;

/// A frame could not be handed to the bus
///
/// The remaining frames were not sent. The cluster has no way to tell us
/// what it got, so the whole operation has to be repeated by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SendError<E> {
    /// Index of the failed frame within the package
    pub frame_index: usize,
    /// Error reported by the transport
    pub error: E,
}

/// Send a package on `id`
///
/// Waits `timing.pre_delay_ms`, sends all frames in order without gaps,
/// then waits `timing.post_delay_ms`. Stops at the first transport error.
/// Returns the number of frames sent.
pub fn send_payload<T, D>(
    bus: &mut T,
    delay: &mut D,
    id: u16,
    payload: &PayloadBuffer,
    timing: SendTiming,
) -> Result<usize, SendError<T::Error>>
where
    T: CanTx + ?Sized,
    D: DelayNs + ?Sized,
{
    if timing.pre_delay_ms > 0 {
        delay.delay_ms(timing.pre_delay_ms);
    }

    let mut sent = 0;
    for (frame_index, data) in Segmenter::new(payload).enumerate() {
        bus.transmit(&CanFrame { id, data }).map_err(|error| {
            #[cfg(feature = "defmt")]
            defmt::warn!("CAN transmit failed at frame {}, package dropped", frame_index);
            SendError { frame_index, error }
        })?;
        sent += 1;
    }

    if timing.post_delay_ms > 0 {
        delay.delay_ms(timing.post_delay_ms);
    }

    Ok(sent)
}
