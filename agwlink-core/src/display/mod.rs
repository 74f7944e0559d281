//! Cluster display controller
//!
//! Turns page, header and body requests into packages and pushes them onto
//! the bus the way the factory gateway does.
//!
//! # Polling model
//!
//! Nothing here runs on its own. The caller invokes [`IcDisplay::update`]
//! periodically; it drains frames the cluster sent, updates the page
//! tracker and, if the gateway took a page away from us, re-sends what we
//! had on it. Text operations transmit immediately and return once the last
//! frame and the configured post delay are done.

pub mod content;
pub mod controller;
pub mod sender;

use agwlink_protocol::{PackageError, Page};

pub use controller::{IcDisplay, UpdateSummary};
pub use sender::{send_payload, SendError};

/// Target page of an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PageSelect {
    /// Whatever page the cluster currently shows
    #[default]
    Current,
    /// A specific page
    Page(Page),
}

impl From<Page> for PageSelect {
    fn from(page: Page) -> Self {
        PageSelect::Page(page)
    }
}

/// Errors returned by display operations
///
/// Every error leaves the bus untouched except [`DisplayError::Send`],
/// where some frames of the package may already be out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DisplayError<E> {
    /// Text is wider than the display
    Layout,
    /// Package could not be encoded
    Package(PackageError),
    /// Transport failed mid-package; the package is lost
    Send(SendError<E>),
}

impl<E> From<PackageError> for DisplayError<E> {
    fn from(e: PackageError) -> Self {
        DisplayError::Package(e)
    }
}

impl<E> From<SendError<E>> for DisplayError<E> {
    fn from(e: SendError<E>) -> Self {
        DisplayError::Send(e)
    }
}
