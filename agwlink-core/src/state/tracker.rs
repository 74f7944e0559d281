//! Tracker for the page the cluster currently shows
//!
//! The tracker is the only writer of the current page. Encoders read it
//! through `&DisplayTracker`; updates need `&mut`, so the borrow rules keep
//! a single writer.

use agwlink_hal::CanFrame;
use agwlink_protocol::{ClusterEvent, PackageKind, Page};

/// Follows the cluster's page reports
#[derive(Debug, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DisplayTracker {
    receive_id: u16,
    current: Page,
    last_ack: Option<(Page, PackageKind)>,
    overrides: u32,
}

impl DisplayTracker {
    /// Create a tracker listening on `receive_id`, starting at `default_page`
    pub const fn new(receive_id: u16, default_page: Page) -> Self {
        Self {
            receive_id,
            current: default_page,
            last_ack: None,
            overrides: 0,
        }
    }

    /// Page the cluster is believed to show
    pub fn current_page(&self) -> Page {
        self.current
    }

    /// Last package the cluster acknowledged
    pub fn last_ack(&self) -> Option<(Page, PackageKind)> {
        self.last_ack
    }

    /// Number of page changes reported by the cluster that we did not ask for
    pub fn override_count(&self) -> u32 {
        self.overrides
    }

    /// Record a page we activated ourselves
    pub fn page_activated(&mut self, page: Page) {
        self.current = page;
    }

    /// Process a frame read from the bus
    ///
    /// Frames on other identifiers and unrecognised payloads are ignored.
    /// A page report replaces the current page unconditionally.
    pub fn process_frame(&mut self, frame: &CanFrame) -> Option<ClusterEvent> {
        if frame.id != self.receive_id {
            return None;
        }

        let Some(event) = ClusterEvent::from_data(&frame.data) else {
            #[cfg(feature = "defmt")]
            defmt::trace!("Ignoring cluster frame {:02x}", frame.data);
            return None;
        };

        match event {
            ClusterEvent::PageActivated(page) => {
                if page != self.current {
                    self.overrides = self.overrides.saturating_add(1);
                    #[cfg(feature = "defmt")]
                    defmt::info!("Cluster switched page {:?} -> {:?}", self.current, page);
                }
                self.current = page;
            }
            ClusterEvent::Acknowledged { page, kind } => {
                #[cfg(feature = "defmt")]
                defmt::trace!("Cluster acknowledged {:?} on {:?}", kind, page);
                self.last_ack = Some((page, kind));
            }
            ClusterEvent::FlowControl => {}
        }

        Some(event)
    }
}
