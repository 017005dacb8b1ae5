//! Flowlink Hardware Abstraction Layer
//!
//! This crate defines the seams between the board-agnostic transport engine
//! and the peripheral drivers that differ per MCU family (UART FIFO, USB CDC
//! packet buffer, DMA descriptor).
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  Firmware (flowlink-firmware, etc.)     │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  flowlink-core (channel, parser, pump)  │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  flowlink-hal (this crate - traits)     │
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Traits
//!
//! - [`serial::SerialTx`] - Non-blocking byte sink drained by the pump
//! - [`clock::MillisClock`] - Wrapping millisecond timestamp source

#![no_std]
#![deny(unsafe_code)]

pub mod clock;
pub mod serial;

pub use clock::MillisClock;
pub use serial::{DataBits, Parity, SerialTx, StopBits, UartConfig};
