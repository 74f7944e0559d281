//! Display state tracking
//!
//! The factory gateway can switch the cluster to another page at any time.
//! The only reliable source for the active page is the cluster itself, so
//! its reports overwrite whatever we believed.

pub mod tracker;

pub use tracker::DisplayTracker;
