//! Board-agnostic instrument cluster display driver
//!
//! This crate impersonates the factory audio gateway on the cluster's CAN
//! bus well enough that the cluster renders our text:
//!
//! - Display controller: page setup, header and body text, timed delivery
//! - Display state tracking: follows the page the cluster really shows
//! - Configuration type definitions
//! - Replay of recorded bus traces
//!
//! Everything runs inside the caller's polling loop. The bus is reached
//! through the `agwlink-hal` traits and timing through `embedded-hal`'s
//! `DelayNs`.

#![cfg_attr(not(any(test, feature = "std")), no_std)]
#![deny(unsafe_code)]

pub mod config;
pub mod display;
pub mod replay;
pub mod state;

#[cfg(test)]
pub(crate) mod test_utils;

pub use config::{ClusterConfig, ConfigError, PackageTimings, SendTiming};
pub use display::{DisplayError, IcDisplay, PageSelect, SendError, UpdateSummary};
pub use state::DisplayTracker;
