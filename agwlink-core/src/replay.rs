//! Replay of recorded bus traces
//!
//! Bus dumps hold one frame per line:
//!
//! ```text
//! time=2019-03-02 17:45:01.123456,B:id=420:len=8:10:1b:03:29:00:19:10:4e
//! ```
//!
//! The identifier is decimal, the data bytes hex. [`Replayer`] runs such a
//! dump through the same page tracker the controller uses and rebuilds the
//! packages the gateway sent, which makes it the tool for checking the
//! encoder against captured factory traffic.

use core::marker::PhantomData;

use agwlink_hal::{CanFrame, FRAME_DATA_LEN};
use chrono::NaiveDateTime;
use agwlink_protocol::package::inspect;
use agwlink_protocol::{
    AgwChecksum, Checksum, ClusterEvent, PackageError, PackageKind, Page, Reassembler,
    ReassemblyError,
};
use embedded_hal::delay::DelayNs;

use crate::config::ClusterConfig;
use crate::state::DisplayTracker;

/// One frame of a bus dump
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TraceRecord {
    /// Capture time in microseconds since the Unix epoch
    pub time_us: u64,
    /// The frame, padded to eight bytes
    pub frame: CanFrame,
}

/// Parse one dump line
///
/// Returns `None` for anything that is not a well formed record.
pub fn parse_line(line: &str) -> Option<TraceRecord> {
    let rest = line.trim_end().strip_prefix("time=")?;
    let (stamp, frame) = rest.split_once(',')?;
    let time_us = parse_timestamp(stamp)?;

    let mut fields = frame.split(':');
    let _tag = fields.next()?;
    let id = fields.next()?.strip_prefix("id=")?.parse::<u16>().ok()?;
    let len = fields.next()?.strip_prefix("len=")?.parse::<usize>().ok()?;
    if len > FRAME_DATA_LEN {
        return None;
    }

    let mut data = [0u8; FRAME_DATA_LEN];
    let mut count = 0;
    for field in fields {
        let slot = data.get_mut(count)?;
        *slot = u8::from_str_radix(field, 16).ok()?;
        count += 1;
    }
    if count != len {
        return None;
    }

    Some(TraceRecord {
        time_us,
        frame: CanFrame::new(id, data)?,
    })
}

/// `YYYY-MM-DD HH:MM:SS.ffffff` to microseconds since the epoch
///
/// Dates before the epoch or outside chrono's range are rejected.
fn parse_timestamp(stamp: &str) -> Option<u64> {
    let time = NaiveDateTime::parse_from_str(stamp, "%Y-%m-%d %H:%M:%S%.f").ok()?;
    u64::try_from(time.and_utc().timestamp_micros()).ok()
}

/// Iterator over the records of a dump, skipping malformed lines
#[derive(Debug, Clone)]
pub struct Trace<'a> {
    lines: core::str::Lines<'a>,
}

impl<'a> Trace<'a> {
    pub fn new(dump: &'a str) -> Self {
        Self {
            lines: dump.lines(),
        }
    }
}

impl Iterator for Trace<'_> {
    type Item = TraceRecord;

    fn next(&mut self) -> Option<Self::Item> {
        self.lines.by_ref().find_map(parse_line)
    }
}

/// Something recognised while replaying
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ReplayEvent {
    /// Frame from the cluster
    Cluster(ClusterEvent),
    /// Complete gateway package with a valid checksum
    Package {
        page: Page,
        kind: PackageKind,
        len: usize,
    },
    /// Complete gateway package that failed inspection
    CorruptPackage(PackageError),
    /// Gateway frames that do not form a transfer
    Transport(ReassemblyError),
}

/// Plays a recorded trace through the page tracker and the reassembler
#[derive(Debug, Clone)]
pub struct Replayer<C = AgwChecksum> {
    tracker: DisplayTracker,
    send_id: u16,
    reassembler: Reassembler,
    last_time_us: Option<u64>,
    _checksum: PhantomData<C>,
}

impl Replayer {
    /// Create a replayer for the identifiers in `config`
    pub fn new(config: &ClusterConfig) -> Self {
        Self::with_checksum(config)
    }
}

impl<C: Checksum> Replayer<C> {
    /// Create a replayer that checks packages with `C`
    pub fn with_checksum(config: &ClusterConfig) -> Self {
        Self {
            tracker: DisplayTracker::new(config.receive_id, config.default_page),
            send_id: config.send_id,
            reassembler: Reassembler::new(),
            last_time_us: None,
            _checksum: PhantomData,
        }
    }

    /// Page tracker as driven by the trace so far
    pub fn tracker(&self) -> &DisplayTracker {
        &self.tracker
    }

    /// Process one record without pacing
    pub fn feed(&mut self, record: &TraceRecord) -> Option<ReplayEvent> {
        let frame = &record.frame;
        if frame.id != self.send_id {
            return self.tracker.process_frame(frame).map(ReplayEvent::Cluster);
        }

        match self.reassembler.feed(&frame.data) {
            Ok(Some(payload)) => Some(match inspect::<C>(payload.as_slice()) {
                Ok((page, kind)) => {
                    #[cfg(feature = "defmt")]
                    defmt::debug!("Replayed {:?} package for {:?}", kind, page);
                    ReplayEvent::Package {
                        page,
                        kind,
                        len: payload.len(),
                    }
                }
                Err(e) => {
                    #[cfg(feature = "defmt")]
                    defmt::warn!("Replayed package rejected: {:?}", e);
                    ReplayEvent::CorruptPackage(e)
                }
            }),
            Ok(None) => None,
            Err(e) => Some(ReplayEvent::Transport(e)),
        }
    }

    /// Replay a whole dump in recorded time
    ///
    /// Waits out the gap between consecutive records on `delay` before each
    /// one, then hands every recognised event to `on_event`. Gaps longer
    /// than `u32::MAX` microseconds are clamped. Returns the number of
    /// records replayed.
    pub fn run<D: DelayNs>(
        &mut self,
        dump: &str,
        delay: &mut D,
        mut on_event: impl FnMut(&TraceRecord, &ReplayEvent),
    ) -> usize {
        let mut count = 0;
        for record in Trace::new(dump) {
            if let Some(last) = self.last_time_us {
                let gap = record.time_us.saturating_sub(last);
                if gap > 0 {
                    delay.delay_us(u32::try_from(gap).unwrap_or(u32::MAX));
                }
            }
            self.last_time_us = Some(record.time_us);

            if let Some(event) = self.feed(&record) {
                on_event(&record, &event);
            }
            count += 1;
        }
        count
    }
}
