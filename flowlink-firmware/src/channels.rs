//! Shared link objects and inter-task signals
//!
//! The channel itself is shared by reference: its buffers are guarded by
//! critical-section mutexes, so the RX, TX and tick tasks can all hold a
//! `&'static Link`.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;

use flowlink_core::{Channel, TimerQueue};
use flowlink_protocol::DEFAULT_PACKET_LENGTH;

use crate::handlers::Device;

/// One idle timer per channel
pub const TIMER_SLOTS: usize = 1;

/// Rx/Tx capacity; must hold the longest frame of the command table
pub const PACKET_LENGTH: usize = DEFAULT_PACKET_LENGTH;

pub type Timers = TimerQueue<CriticalSectionRawMutex, TIMER_SLOTS>;

/// The host link on UART0
pub type Link = Channel<'static, CriticalSectionRawMutex, Device, PACKET_LENGTH, TIMER_SLOTS>;

/// Signal that the Tx buffer has bytes to pump
pub static TX_KICK: Signal<CriticalSectionRawMutex, ()> = Signal::new();
