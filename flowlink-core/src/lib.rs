//! Board-agnostic transport engine for the flowlink command protocol
//!
//! This crate contains everything between the serial peripheral and the
//! command handlers that does not depend on specific hardware:
//!
//! - Ring buffers for the Rx and Tx byte streams
//! - Callback timer queue driving the idle-timeout resynchronizer
//! - FlowParser: frame detection, validation and dispatch
//! - Channel object tying a buffer pair to a command table
//! - Transport pump into non-blocking serial sinks
//! - Link configuration and statistics
//!
//! Data flow for one channel:
//!
//! ```text
//! ISR/DMA ──receive()──▶ Rx ──process_all()──▶ handler ──▶ Tx ──pump()──▶ peripheral
//!                         ▲
//!        idle timeout ────┘ reset
//! ```

#![cfg_attr(not(any(test, feature = "std")), no_std)]
#![deny(unsafe_code)]

pub mod buffer;
pub mod channel;
pub mod config;
pub mod parser;
pub mod pump;
pub mod stats;
pub mod timer;

pub use buffer::RingBuffer;
pub use channel::{Channel, InitError};
pub use config::{ConfigError, LinkConfig, DEFAULT_IDLE_TIMEOUT_MS};
pub use parser::{process, Discard, Outcome, ParseState, Response};
pub use pump::{pump, PacketSink};
pub use stats::LinkStats;
pub use timer::{Expired, TimerError, TimerQueue, TimerSlot, DEFAULT_MAX_DELAY_MS};
