//! Configuration type definitions
//!
//! Defaults reproduce what the factory gateway does on the W203 bus.

use agwlink_protocol::{GlyphPolicy, Page, PackageKind, RECEIVE_CAN_ID, SEND_CAN_ID};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Delays around one package transmission
///
/// The cluster needs time to digest some packages before it accepts the
/// next one. Frames inside a package are always sent back to back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SendTiming {
    /// Wait before the first frame (ms)
    pub pre_delay_ms: u32,
    /// Wait after the last frame (ms)
    pub post_delay_ms: u32,
}

impl SendTiming {
    /// No waiting at all
    pub const NONE: Self = Self::new(0, 0);

    pub const fn new(pre_delay_ms: u32, post_delay_ms: u32) -> Self {
        Self {
            pre_delay_ms,
            post_delay_ms,
        }
    }
}

/// Timing per package type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PackageTimings {
    /// Page setup packages
    pub init: SendTiming,
    /// Header packages
    pub header: SendTiming,
    /// Body packages (single and multi-line)
    pub body: SendTiming,
}

impl Default for PackageTimings {
    fn default() -> Self {
        Self {
            // Init switches the page layout, the cluster drops anything
            // that arrives while it redraws
            init: SendTiming::new(0, 20),
            header: SendTiming::new(0, 5),
            body: SendTiming::new(0, 5),
        }
    }
}

impl PackageTimings {
    /// Timing for a package type
    pub fn for_kind(&self, kind: PackageKind) -> SendTiming {
        match kind {
            PackageKind::Init => self.init,
            PackageKind::Header => self.header,
            PackageKind::Body => self.body,
        }
    }
}

/// Cluster display driver configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ClusterConfig {
    /// CAN id used for gateway → cluster packages
    pub send_id: u16,
    /// CAN id the cluster answers on
    pub receive_id: u16,
    /// Page assumed active before the cluster reports one
    pub default_page: Page,
    /// Delays around each package type
    pub timing: PackageTimings,
    /// Handling of the crash glyph in outgoing text
    pub glyph_policy: GlyphPolicy,
    /// Refuse body text wider than the display
    pub enforce_body_width: bool,
    /// Re-send remembered content when the cluster switches pages on its own
    pub reassert_on_page_change: bool,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            send_id: SEND_CAN_ID,
            receive_id: RECEIVE_CAN_ID,
            default_page: Page::Audio,
            timing: PackageTimings::default(),
            glyph_policy: GlyphPolicy::Reject,
            enforce_body_width: true,
            reassert_on_page_change: true,
        }
    }
}
