//! Frames sent by the cluster back to the gateway
//!
//! The cluster answers with ISO-TP single frames:
//! ```text
//! 0N PAGE KIND ..
//! ```
//! - KIND 0x20: the cluster now shows PAGE. This is authoritative, it is
//!   also sent when the factory gateway switches pages behind our back.
//! - KIND 0x24 / 0x26 / 0x29: the package of that id for PAGE was accepted.
//!
//! Flow control frames (0x3X) follow our first frames and carry nothing we
//! act on. Everything else on the identifier is ignored.

use crate::isotp::{FRAME_LEN, PCI_FLOW_CONTROL, PCI_SINGLE};
use crate::package::PackageKind;
use crate::page::Page;

/// Response kind: page became active
pub const RSP_PAGE_ACTIVE: u8 = 0x20;

/// Events the cluster reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ClusterEvent {
    /// The cluster switched to this page
    PageActivated(Page),
    /// A package was accepted
    Acknowledged { page: Page, kind: PackageKind },
    /// Flow control after a first frame
    FlowControl,
}

impl ClusterEvent {
    /// Parse an event from frame data
    ///
    /// Returns `None` for anything unrecognised or malformed.
    pub fn from_data(data: &[u8; FRAME_LEN]) -> Option<Self> {
        match data[0] & 0xF0 {
            PCI_FLOW_CONTROL => Some(ClusterEvent::FlowControl),
            PCI_SINGLE => {
                let len = usize::from(data[0] & 0x0F);
                if !(2..FRAME_LEN).contains(&len) {
                    return None;
                }
                let page = Page::from_byte(data[1])?;
                match data[2] {
                    RSP_PAGE_ACTIVE => Some(ClusterEvent::PageActivated(page)),
                    kind => PackageKind::from_byte(kind)
                        .map(|kind| ClusterEvent::Acknowledged { page, kind }),
                }
            }
            _ => None,
        }
    }

    /// Encode this event into frame data (for testing or simulation)
    pub fn to_data(&self) -> [u8; FRAME_LEN] {
        let mut data = [0u8; FRAME_LEN];
        match *self {
            ClusterEvent::PageActivated(page) => {
                data[..3].copy_from_slice(&[PCI_SINGLE | 2, page.to_byte(), RSP_PAGE_ACTIVE]);
            }
            ClusterEvent::Acknowledged { page, kind } => {
                data[..3].copy_from_slice(&[PCI_SINGLE | 2, page.to_byte(), kind.to_byte()]);
            }
            ClusterEvent::FlowControl => data[0] = PCI_FLOW_CONTROL,
        }
        data
    }

    /// Page this event is about, if any
    pub fn page(&self) -> Option<Page> {
        match *self {
            ClusterEvent::PageActivated(page) | ClusterEvent::Acknowledged { page, .. } => {
                Some(page)
            }
            ClusterEvent::FlowControl => None,
        }
    }
}
