//! AGW → IC Display Protocol
//!
//! This crate implements the message protocol the factory audio gateway (AGW)
//! uses to push text and icons to the instrument cluster (IC) display over
//! CAN. Everything here was reverse engineered from captured bus traffic.
//!
//! # Protocol Overview
//!
//! The gateway sends *packages* of up to 55 bytes. Each package starts with
//! the target page and a package id, and ends with a checksum:
//! ```text
//! ┌──────┬────────────┬──────────────────────────┬──────────┐
//! │ PAGE │ PACKAGE ID │ BODY                     │ CHECKSUM │
//! │ 1B   │ 1B         │ 0–52B                    │ 1B       │
//! └──────┴────────────┴──────────────────────────┴──────────┘
//! ```
//!
//! Packages travel in an ISO 15765-2 style transport: one first frame with
//! the total length and six payload bytes, then up to seven consecutive
//! frames of seven bytes each.
//!
//! The cluster answers on its own identifier with short single frames that
//! announce page changes and acknowledge packages.

#![cfg_attr(not(any(test, feature = "std")), no_std)]
#![deny(unsafe_code)]

pub mod glyph;
pub mod isotp;
pub mod package;
pub mod page;
pub mod response;

pub use glyph::{
    can_fit_body_text, text_width, text_width_with, width_of, GlyphError, DISPLAY_WIDTH_PX,
};
pub use isotp::{Reassembler, ReassemblyError, Segmenter, MAX_FRAMES};
pub use package::{
    AgwChecksum, Checksum, GlyphPolicy, Package, PackageError, PackageKind, PayloadBuffer,
    MAX_PAYLOAD_SIZE,
};
pub use page::{Page, Symbol};
pub use response::ClusterEvent;

/// CAN id of the gateway when talking to the cluster display
pub const SEND_CAN_ID: u16 = 0x1A4;

/// CAN id the cluster display answers on
pub const RECEIVE_CAN_ID: u16 = 0x1D0;
