//! agwlink Hardware Abstraction Layer
//!
//! This crate defines the bus abstraction that the cluster display driver
//! talks through. A board support package implements the traits on top of
//! its CAN controller (MCP2515, bxCAN, SocketCAN on a host, ...), so the
//! protocol code never touches a peripheral directly.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  agwlink-core (display controller)      │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  agwlink-hal (this crate - traits)      │
//! └─────────────────────────────────────────┘
//!                     │
//!         ┌───────────┴───────────┐
//!         ▼                       ▼
//! ┌───────────────┐       ┌───────────────┐
//! │  MCP2515 over │       │  SocketCAN /  │
//! │      SPI      │       │  bench tools  │
//! └───────────────┘       └───────────────┘
//! ```
//!
//! # Traits
//!
//! - [`can::CanTx`], [`can::CanRx`] - Frame transmit and receive
//! - [`can::CanBus`] - Combined bus interface

#![no_std]
#![deny(unsafe_code)]

pub mod can;

// Re-export key types at crate root for convenience
pub use can::{CanBus, CanFrame, CanRx, CanTx, FRAME_DATA_LEN};
