//! Display controller impersonating the audio gateway

use core::marker::PhantomData;

use agwlink_hal::{CanBus, CanFrame, CanTx};
use agwlink_protocol::{
    can_fit_body_text, text_width_with, AgwChecksum, Checksum, ClusterEvent, Package,
    PackageError, PayloadBuffer, Page, Symbol, DISPLAY_WIDTH_PX,
};
use embedded_hal::delay::DelayNs;

use super::content::PageContents;
use super::sender::send_payload;
use super::{DisplayError, PageSelect};
use crate::config::ClusterConfig;
use crate::state::DisplayTracker;

/// Frames drained per [`IcDisplay::update`] call at most
pub const MAX_FRAMES_PER_UPDATE: usize = 32;

type TxError<B> = <B as CanTx>::Error;

/// What one [`IcDisplay::update`] call did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct UpdateSummary {
    /// Frames read from the bus
    pub frames_read: usize,
    /// Cluster events recognised among them
    pub events: usize,
    /// Page the cluster switched to without being asked, if any
    pub page_override: Option<Page>,
    /// Remembered content was sent again
    pub reasserted: bool,
}

/// Cluster display driver
///
/// Owns the bus, the delay source and the single payload buffer. All
/// operations run to completion before returning, so only one package is
/// ever in flight.
pub struct IcDisplay<B, D, C = AgwChecksum> {
    bus: B,
    delay: D,
    config: ClusterConfig,
    tracker: DisplayTracker,
    buffer: PayloadBuffer,
    contents: PageContents,
    _checksum: PhantomData<C>,
}

impl<B: CanBus, D: DelayNs> IcDisplay<B, D> {
    /// Create a driver with the factory configuration
    pub fn new(bus: B, delay: D) -> Self {
        Self::with_config(bus, delay, ClusterConfig::default())
    }
}

impl<B: CanBus, D: DelayNs, C: Checksum> IcDisplay<B, D, C> {
    /// Create a driver with a custom configuration
    pub fn with_config(bus: B, delay: D, config: ClusterConfig) -> Self {
        Self {
            bus,
            delay,
            tracker: DisplayTracker::new(config.receive_id, config.default_page),
            config,
            buffer: PayloadBuffer::new(),
            contents: PageContents::default(),
            _checksum: PhantomData,
        }
    }

    /// Active configuration
    pub fn config(&self) -> &ClusterConfig {
        &self.config
    }

    /// Page tracker
    pub fn tracker(&self) -> &DisplayTracker {
        &self.tracker
    }

    /// Page the cluster is believed to show
    pub fn current_page(&self) -> Page {
        self.tracker.current_page()
    }

    /// Returns true if `text` fits on a body line
    pub fn can_fit_body_text(&self, text: &str) -> bool {
        can_fit_body_text(text)
    }

    /// Give back the bus and delay
    pub fn release(self) -> (B, D) {
        (self.bus, self.delay)
    }

    /// Set up a page (package 24)
    ///
    /// Has to be sent once each time a page is activated, before header and
    /// body text for it.
    pub fn init_page(
        &mut self,
        page: Page,
        header: &str,
        centered: bool,
        upper: Symbol,
        lower: Symbol,
    ) -> Result<(), DisplayError<TxError<B>>> {
        self.send(&Package::Init {
            page,
            header,
            centered,
            upper,
            lower,
        })?;
        self.tracker.page_activated(page);
        Ok(())
    }

    /// Replace the header text of a page (package 29)
    pub fn set_header(
        &mut self,
        page: impl Into<PageSelect>,
        text: &str,
        centered: bool,
    ) -> Result<(), DisplayError<TxError<B>>> {
        let page = self.resolve(page.into());
        self.send(&Package::Header {
            page,
            text,
            centered,
        })
    }

    /// Replace the body line of a page (package 26)
    ///
    /// `centered = false` left-justifies the text.
    pub fn set_body(
        &mut self,
        page: impl Into<PageSelect>,
        text: &str,
        centered: bool,
    ) -> Result<(), DisplayError<TxError<B>>> {
        self.check_width(text)?;
        let page = self.resolve(page.into());
        self.send(&Package::Body {
            page,
            text,
            centered,
        })
    }

    /// Replace the body of the Telephone page with up to four lines
    pub fn set_body_multiline(&mut self, lines: &[&str]) -> Result<(), DisplayError<TxError<B>>> {
        for line in lines {
            self.check_width(line)?;
        }
        self.send(&Package::BodyMultiline {
            page: Page::Telephone,
            lines,
        })
    }

    /// Feed one frame read from the bus into the page tracker
    ///
    /// Returns the recognised cluster event. Frames that are not from the
    /// cluster, or not understood, return `None`.
    pub fn process_incoming_frame(&mut self, frame: &CanFrame) -> Option<ClusterEvent> {
        self.tracker.process_frame(frame)
    }

    /// Polling step
    ///
    /// Drains pending frames through the page tracker. If the cluster moved
    /// to a page we had content on without being asked, that content is
    /// sent again (when `reassert_on_page_change` is set).
    ///
    /// Receive errors end the drain for this step but are not returned; a
    /// transmit error while re-sending content is.
    pub fn update(&mut self) -> Result<UpdateSummary, DisplayError<TxError<B>>> {
        let mut summary = UpdateSummary::default();

        for _ in 0..MAX_FRAMES_PER_UPDATE {
            let frame = match self.bus.try_receive() {
                Ok(Some(frame)) => frame,
                Ok(None) => break,
                Err(_) => {
                    #[cfg(feature = "defmt")]
                    defmt::warn!("CAN receive error, retrying next update");
                    break;
                }
            };
            summary.frames_read += 1;

            let before = self.tracker.current_page();
            if let Some(event) = self.tracker.process_frame(&frame) {
                summary.events += 1;
                if let ClusterEvent::PageActivated(page) = event {
                    if page != before {
                        summary.page_override = Some(page);
                    }
                }
            }
        }

        if let Some(page) = summary.page_override {
            if self.config.reassert_on_page_change && !self.contents.get(page).is_empty() {
                self.reassert(page)?;
                summary.reasserted = true;
            }
        }

        Ok(summary)
    }

    fn resolve(&self, select: PageSelect) -> Page {
        match select {
            PageSelect::Current => self.tracker.current_page(),
            PageSelect::Page(page) => page,
        }
    }

    /// Width of `text` as it will be sent, checked against the display
    fn check_width(&self, text: &str) -> Result<(), DisplayError<TxError<B>>> {
        if !self.config.enforce_body_width {
            return Ok(());
        }
        let width =
            text_width_with(text, self.config.glyph_policy).map_err(PackageError::Glyph)?;
        if width > DISPLAY_WIDTH_PX {
            #[cfg(feature = "defmt")]
            defmt::debug!("Body text too wide for the display");
            return Err(DisplayError::Layout);
        }
        Ok(())
    }

    /// Encode, transmit and remember a package
    fn send(&mut self, package: &Package) -> Result<(), DisplayError<TxError<B>>> {
        self.transmit(package)?;
        self.contents.get_mut(package.page()).remember(package);
        Ok(())
    }

    fn transmit(&mut self, package: &Package) -> Result<(), DisplayError<TxError<B>>> {
        let _len = package
            .encode_into::<C>(&mut self.buffer, self.config.glyph_policy)
            .map_err(|e| {
                #[cfg(feature = "defmt")]
                defmt::warn!("Refusing {:?} package: {:?}", package.kind(), e);
                e
            })?;

        let timing = self.config.timing.for_kind(package.kind());
        let _frames = send_payload(
            &mut self.bus,
            &mut self.delay,
            self.config.send_id,
            &self.buffer,
            timing,
        )?;

        #[cfg(feature = "defmt")]
        defmt::debug!(
            "Sent {:?} package to {:?}: {} bytes in {} frames",
            package.kind(),
            package.page(),
            _len,
            _frames
        );
        Ok(())
    }

    /// Send the remembered content of `page` again
    fn reassert(&mut self, page: Page) -> Result<(), DisplayError<TxError<B>>> {
        #[cfg(feature = "defmt")]
        defmt::info!("Reasserting content on {:?}", page);

        // Content is moved out so packages can borrow it while we send
        let content = core::mem::take(self.contents.get_mut(page));
        let result = content.replay(page, |package| self.transmit(package));
        *self.contents.get_mut(page) = content;
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::SendError;
    use crate::test_utils::{BusLog, Entry, MockBus, MockDelay, MockError};
    use agwlink_hal::CanRx;
    use agwlink_protocol::package::inspect;
    use proptest::prelude::*;
    use agwlink_protocol::{
        GlyphError, GlyphPolicy, PackageError, PackageKind, Reassembler, RECEIVE_CAN_ID,
        SEND_CAN_ID,
    };
    use std::vec::Vec;

    fn no_delay_config() -> ClusterConfig {
        ClusterConfig {
            timing: crate::config::PackageTimings {
                init: crate::config::SendTiming::NONE,
                header: crate::config::SendTiming::NONE,
                body: crate::config::SendTiming::NONE,
            },
            ..ClusterConfig::default()
        }
    }

    fn display(config: ClusterConfig) -> (IcDisplay<MockBus, MockDelay>, BusLog) {
        let log = BusLog::new();
        let (bus, delay) = log.split();
        (IcDisplay::with_config(bus, delay, config), log)
    }

    fn cluster(event: ClusterEvent) -> CanFrame {
        CanFrame {
            id: RECEIVE_CAN_ID,
            data: event.to_data(),
        }
    }

    /// Rebuild the packages that went out on the bus
    fn sent_packages(log: &BusLog) -> Vec<PayloadBuffer> {
        let mut rx = Reassembler::new();
        log.sent_frames()
            .iter()
            .filter_map(|frame| rx.feed(&frame.data).unwrap())
            .collect()
    }

    #[test]
    fn test_header_roundtrip() {
        let (mut display, log) = display(no_delay_config());
        display.set_header(Page::Audio, "Now Playing", true).unwrap();

        let expected = Package::Header {
            page: Page::Audio,
            text: "Now Playing",
            centered: true,
        }
        .encode(GlyphPolicy::Reject)
        .unwrap();

        let packages = sent_packages(&log);
        assert_eq!(packages, [expected]);
        assert!(log.sent_frames().iter().all(|f| f.id == SEND_CAN_ID));
        assert_eq!(
            inspect::<AgwChecksum>(packages[0].as_slice()),
            Ok((Page::Audio, PackageKind::Header))
        );
    }

    #[test]
    fn test_crash_glyph_never_reaches_bus() {
        let (mut display, log) = display(no_delay_config());
        let result = display.set_body(Page::Audio, "~", true);
        assert_eq!(
            result,
            Err(DisplayError::Package(PackageError::Glyph(
                GlyphError::CrashGlyph { index: 0 }
            )))
        );
        assert!(log.entries().is_empty());
    }

    #[test]
    fn test_strip_policy_sends_sanitized_text() {
        let config = ClusterConfig {
            glyph_policy: GlyphPolicy::Strip,
            ..no_delay_config()
        };
        let (mut display, log) = display(config);
        display.set_header(Page::Audio, "a~b", true).unwrap();
        let packages = sent_packages(&log);
        assert_eq!(&packages[0].as_slice()[4..8], b"\x10ab\x00");
    }

    #[test]
    fn test_strip_policy_body_measured_after_stripping() {
        let config = ClusterConfig {
            glyph_policy: GlyphPolicy::Strip,
            ..no_delay_config()
        };
        let (mut display, log) = display(config);
        display.set_body(Page::Audio, "a~b", true).unwrap();
        let packages = sent_packages(&log);
        assert_eq!(&packages[0].as_slice()[5..9], b"\x10ab\x00");

        // Seven A's fill the display once the glyph is gone
        display.set_body(Page::Audio, "AAA~AAAA", true).unwrap();
        assert_eq!(
            display.set_body(Page::Audio, "AAA~AAAAg", true),
            Err(DisplayError::Layout)
        );
    }

    #[test]
    fn test_crash_glyph_in_multiline_is_content_error() {
        let (mut display, log) = display(no_delay_config());
        assert_eq!(
            display.set_body_multiline(&["ok", "a~"]),
            Err(DisplayError::Package(PackageError::Glyph(
                GlyphError::CrashGlyph { index: 1 }
            )))
        );
        assert!(log.entries().is_empty());
    }

    #[test]
    fn test_too_wide_body_rejected_before_send() {
        let (mut display, log) = display(no_delay_config());
        assert_eq!(
            display.set_body(Page::Audio, "AAAAAAg", true),
            Err(DisplayError::Layout)
        );
        assert!(log.entries().is_empty());

        display.set_body(Page::Audio, "AAAAAAA", true).unwrap();
        assert_eq!(sent_packages(&log).len(), 1);
    }

    #[test]
    fn test_width_check_can_be_disabled() {
        let config = ClusterConfig {
            enforce_body_width: false,
            ..no_delay_config()
        };
        let (mut display, _log) = display(config);
        assert!(!display.can_fit_body_text("A very long line of text"));
        assert_eq!(display.set_body(Page::Audio, "A very long line of text", true), Ok(()));
    }

    #[test]
    fn test_multiline_targets_telephone() {
        let (mut display, log) = display(no_delay_config());
        display
            .set_body_multiline(&["Phone", "call", "", "Mum"])
            .unwrap();
        let packages = sent_packages(&log);
        assert_eq!(
            inspect::<AgwChecksum>(packages[0].as_slice()),
            Ok((Page::Telephone, PackageKind::Body))
        );
        assert_eq!(packages[0].as_slice()[2], 4);
    }

    #[test]
    fn test_current_page_follows_cluster() {
        let (mut display, log) = display(no_delay_config());
        assert_eq!(display.current_page(), Page::Audio);

        log.push_rx(cluster(ClusterEvent::PageActivated(Page::Telephone)));
        let summary = display.update().unwrap();
        assert_eq!(summary.frames_read, 1);
        assert_eq!(summary.page_override, Some(Page::Telephone));
        assert_eq!(display.current_page(), Page::Telephone);

        display.set_header(PageSelect::Current, "Phone", true).unwrap();
        assert_eq!(sent_packages(&log)[0].as_slice()[0], Page::Telephone.to_byte());
    }

    #[test]
    fn test_init_page_sets_current_page() {
        let (mut display, _log) = display(no_delay_config());
        display
            .init_page(Page::Other, "Nav", true, Symbol::None, Symbol::None)
            .unwrap();
        assert_eq!(display.current_page(), Page::Other);
    }

    #[test]
    fn test_override_reasserts_content() {
        let (mut display, log) = display(no_delay_config());
        display
            .init_page(Page::Audio, "USB", true, Symbol::SkipTrack, Symbol::PrevTrack)
            .unwrap();
        display.set_body(Page::Audio, "Track 1", true).unwrap();
        display
            .init_page(Page::Telephone, "Phone", true, Symbol::UpArrow, Symbol::DownArrow)
            .unwrap();
        log.clear();

        // Gateway brings the audio page back with its own content
        log.push_rx(cluster(ClusterEvent::PageActivated(Page::Audio)));
        let summary = display.update().unwrap();
        assert!(summary.reasserted);

        let kinds: Vec<_> = sent_packages(&log)
            .iter()
            .map(|p| inspect::<AgwChecksum>(p.as_slice()).unwrap())
            .collect();
        assert_eq!(
            kinds,
            [
                (Page::Audio, PackageKind::Init),
                (Page::Audio, PackageKind::Body)
            ]
        );
    }

    #[test]
    fn test_confirmation_of_own_page_sends_nothing() {
        let (mut display, log) = display(no_delay_config());
        display
            .init_page(Page::Audio, "USB", true, Symbol::None, Symbol::None)
            .unwrap();
        log.clear();

        log.push_rx(cluster(ClusterEvent::PageActivated(Page::Audio)));
        let summary = display.update().unwrap();
        assert_eq!(summary.events, 1);
        assert_eq!(summary.page_override, None);
        assert!(!summary.reasserted);
        assert!(log.entries().is_empty());
    }

    #[test]
    fn test_reassert_disabled() {
        let config = ClusterConfig {
            reassert_on_page_change: false,
            ..no_delay_config()
        };
        let (mut display, log) = display(config);
        display.set_header(Page::Telephone, "Phone", true).unwrap();
        log.clear();

        log.push_rx(cluster(ClusterEvent::PageActivated(Page::Telephone)));
        let summary = display.update().unwrap();
        assert_eq!(summary.page_override, Some(Page::Telephone));
        assert!(!summary.reasserted);
        assert!(log.entries().is_empty());
    }

    #[test]
    fn test_update_ignores_noise() {
        let (mut display, log) = display(no_delay_config());
        log.push_rx(CanFrame {
            id: 0x3E8,
            data: [0xFF; 8],
        });
        log.push_rx(CanFrame {
            id: RECEIVE_CAN_ID,
            data: [0xEE; 8],
        });
        let summary = display.update().unwrap();
        assert_eq!(summary.frames_read, 2);
        assert_eq!(summary.events, 0);
        assert_eq!(display.current_page(), Page::Audio);
    }

    #[test]
    fn test_update_drain_is_bounded() {
        let (mut display, log) = display(no_delay_config());
        for _ in 0..MAX_FRAMES_PER_UPDATE + 5 {
            log.push_rx(cluster(ClusterEvent::FlowControl));
        }
        let summary = display.update().unwrap();
        assert_eq!(summary.frames_read, MAX_FRAMES_PER_UPDATE);
        assert_eq!(log.pending_rx(), 5);
    }

    #[test]
    fn test_receive_error_is_not_fatal() {
        let (mut display, log) = display(no_delay_config());
        log.fail_rx();
        assert_eq!(display.update(), Ok(UpdateSummary::default()));
    }

    #[test]
    fn test_transport_failure_surfaces() {
        let (mut display, log) = display(no_delay_config());
        log.fail_at(2);
        let result = display.set_header(Page::Audio, "A header long enough", true);
        assert_eq!(
            result,
            Err(DisplayError::Send(SendError {
                frame_index: 2,
                error: MockError
            }))
        );
        assert_eq!(log.sent_frames().len(), 2);
    }

    #[test]
    fn test_failed_package_is_not_remembered() {
        let (mut display, log) = display(no_delay_config());
        log.fail_at(0);
        assert!(display.set_header(Page::Telephone, "Phone", true).is_err());

        log.push_rx(cluster(ClusterEvent::PageActivated(Page::Telephone)));
        let summary = display.update().unwrap();
        assert!(!summary.reasserted);
    }

    #[test]
    fn test_init_timing_applied() {
        let (mut display, log) = display(ClusterConfig::default());
        display
            .init_page(Page::Audio, "FM", true, Symbol::None, Symbol::None)
            .unwrap();
        let entries = log.entries();
        assert_eq!(entries.last(), Some(&Entry::Delay(20)));
        assert!(matches!(entries.first(), Some(Entry::Frame(_))));
    }

    struct XorChecksum;

    impl Checksum for XorChecksum {
        fn checksum(bytes: &[u8]) -> u8 {
            bytes.iter().fold(0, |cs, b| cs ^ b)
        }
    }

    #[test]
    fn test_checksum_is_swappable() {
        let log = BusLog::new();
        let (bus, delay) = log.split();
        let mut display: IcDisplay<_, _, XorChecksum> =
            IcDisplay::with_config(bus, delay, no_delay_config());
        display.set_header(Page::Audio, "x", true).unwrap();

        let package = &sent_packages(&log)[0];
        let (&cs, content) = package.as_slice().split_last().unwrap();
        assert_eq!(cs, XorChecksum::checksum(content));
        assert_eq!(
            inspect::<XorChecksum>(package.as_slice()),
            Ok((Page::Audio, PackageKind::Header))
        );
    }

    #[test]
    fn test_release_returns_bus() {
        let (display, log) = display(no_delay_config());
        let (mut bus, _delay) = display.release();
        log.push_rx(cluster(ClusterEvent::FlowControl));
        assert!(bus.try_receive().unwrap().is_some());
    }

    proptest! {
        #[test]
        fn test_fitting_body_reaches_bus_as_encoded(
            text in "[ -}]{0,12}",
            centered in any::<bool>()
        ) {
            prop_assume!(can_fit_body_text(&text));
            let (mut display, log) = display(no_delay_config());
            display.set_body(Page::Audio, &text, centered).unwrap();

            let expected = Package::Body {
                page: Page::Audio,
                text: &text,
                centered,
            }
            .encode(GlyphPolicy::Reject)
            .unwrap();
            prop_assert_eq!(sent_packages(&log), [expected]);
        }
    }
}
