//! Channel: one transport instance with its own Rx/Tx buffer pair
//!
//! Roles:
//! - producer (UART interrupt, DMA completion, USB callback) calls
//!   [`Channel::receive`]
//! - processing context calls [`Channel::process_all`]
//! - transmit side calls [`Channel::pump`] after processing and on every
//!   "space available" event
//! - tick context passes [`TimerQueue::expire`] results to
//!   [`Channel::handle_expired`]
//!
//! Each buffer sits in its own blocking mutex, locked for single buffer
//! operations only. With `CriticalSectionRawMutex` that masks interrupts
//! for the span of an index/length update. When the Rx lock is held the
//! timer lock may be taken inside it, never the other way round.

use core::cell::{Cell, RefCell};

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::blocking_mutex::Mutex;
use flowlink_hal::SerialTx;
use flowlink_protocol::CommandTable;

use crate::buffer::RingBuffer;
use crate::config::{ConfigError, LinkConfig};
use crate::parser::{self, Outcome};
use crate::pump;
use crate::stats::LinkStats;
use crate::timer::{Expired, TimerError, TimerQueue, TimerSlot};

/// Errors from channel construction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InitError {
    /// Link settings rejected
    Config(ConfigError),
    /// A request or response frame cannot fit in the buffers
    FrameTooLarge { needed: usize, capacity: usize },
    /// No idle timer could be allocated
    Timer(TimerError),
}

impl From<ConfigError> for InitError {
    fn from(e: ConfigError) -> Self {
        InitError::Config(e)
    }
}

impl From<TimerError> for InitError {
    fn from(e: TimerError) -> Self {
        InitError::Timer(e)
    }
}

/// A logical transport channel
///
/// - `M`: raw mutex guarding the buffers (`CriticalSectionRawMutex` when
///   an interrupt feeds the channel)
/// - `C`: application context handed to command handlers
/// - `N`: Rx and Tx capacity, at least the longest frame
/// - `S`: slot count of the shared timer queue
pub struct Channel<'a, M: RawMutex, C, const N: usize, const S: usize> {
    config: LinkConfig,
    table: CommandTable<'a, C>,
    timers: &'a TimerQueue<M, S>,
    idle: TimerSlot,
    rx: Mutex<M, RefCell<RingBuffer<N>>>,
    tx: Mutex<M, RefCell<RingBuffer<N>>>,
    stats: Mutex<M, Cell<LinkStats>>,
}

impl<'a, M: RawMutex, C, const N: usize, const S: usize> Channel<'a, M, C, N, S> {
    /// Build a channel and allocate its idle timer
    ///
    /// Fails if the settings are invalid, if any frame of `table` is longer
    /// than `N`, or if `timers` has no free slot.
    pub fn new(
        config: LinkConfig,
        table: CommandTable<'a, C>,
        timers: &'a TimerQueue<M, S>,
    ) -> Result<Self, InitError> {
        config.validate(timers.max_delay_ms())?;

        let needed = table.max_frame_len(config.checksum);
        if needed > N {
            return Err(InitError::FrameTooLarge {
                needed,
                capacity: N,
            });
        }

        let idle = timers.allocate()?;

        let mut rx = RingBuffer::new();
        rx.set_overwrite(config.rx_overwrite);

        Ok(Self {
            config,
            table,
            timers,
            idle,
            rx: Mutex::new(RefCell::new(rx)),
            tx: Mutex::new(RefCell::new(RingBuffer::new())),
            stats: Mutex::new(Cell::new(LinkStats::new())),
        })
    }

    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    /// Timer slot owned by this channel
    pub fn idle_slot(&self) -> TimerSlot {
        self.idle
    }

    /// Push one received byte; `false` if Rx was full and it was dropped
    pub fn receive_byte(&self, byte: u8, now_ms: u32) -> bool {
        self.receive(&[byte], now_ms) == 1
    }

    /// Push received bytes and restart the idle timeout
    ///
    /// Returns how many bytes were stored. Bytes that do not fit are
    /// dropped and counted; with overwrite enabled the displaced oldest
    /// bytes are counted instead.
    pub fn receive(&self, bytes: &[u8], now_ms: u32) -> usize {
        if bytes.is_empty() {
            return 0;
        }

        let (stored, displaced) = self.rx.lock(|rx| {
            let mut rx = rx.borrow_mut();
            let before = rx.len();
            let stored = bytes.iter().filter(|&&byte| rx.put_byte(byte)).count();
            let displaced = before + stored - rx.len();
            // Delay was checked against the queue in new()
            let _ = self
                .timers
                .arm(self.idle, self.config.idle_timeout_ms, now_ms);
            (stored, displaced)
        });

        let dropped = bytes.len() - stored + displaced;
        if dropped > 0 {
            #[cfg(feature = "defmt")]
            defmt::warn!("rx full, dropped {} bytes", dropped);
            self.update_stats(|stats| stats.record_rx_dropped(dropped));
        }
        stored
    }

    /// Make one parser step
    pub fn process(&self, ctx: &mut C) -> Outcome {
        let outcome = parser::step::<C, N>(
            &self.config,
            ctx,
            |frame| {
                self.rx.lock(|rx| {
                    parser::take_frame(&mut *rx.borrow_mut(), &self.table, &self.config, frame)
                })
            },
            |bytes| self.tx.lock(|tx| tx.borrow_mut().put_span(bytes)),
        );

        #[cfg(feature = "defmt")]
        if let Outcome::Discarded { reason, .. } = outcome {
            defmt::debug!("frame discarded: {}", reason);
        }

        if outcome.progressed() {
            self.update_stats(|stats| stats.record(&outcome));
        }
        outcome
    }

    /// Step the parser until no complete frame is buffered
    ///
    /// Returns the number of frames dispatched.
    pub fn process_all(&self, ctx: &mut C) -> usize {
        let mut frames = 0;
        loop {
            match self.process(ctx) {
                Outcome::Incomplete(_) => break,
                Outcome::Processed { .. } => frames += 1,
                Outcome::Discarded { .. } | Outcome::Synced { .. } => {}
            }
        }
        frames
    }

    /// Move queued Tx bytes into `sink` while it has room
    ///
    /// Each byte is checked, written and dequeued under one Tx lock, so a
    /// pump from another context never sees a byte that is already in
    /// flight. A pump started from inside the sink while an outer pump
    /// holds Tx moves nothing; the outer one carries on when it returns.
    pub fn pump<T: SerialTx>(&self, sink: &mut T) -> Result<usize, T::Error> {
        let mut sent = 0;
        while self.tx.lock(|tx| match tx.try_borrow_mut() {
            Ok(mut tx) => pump::send_byte(&mut *tx, sink),
            Err(_) => Ok(false),
        })? {
            sent += 1;
        }
        Ok(sent)
    }

    /// Run the idle-timeout handler if this channel's timer fired
    ///
    /// Rx is reset only if the timer has not been re-armed or cancelled
    /// since `expired` was taken, so a byte arriving in between keeps its
    /// partial frame. Returns whether Rx was reset.
    pub fn handle_expired(&self, expired: &Expired<S>) -> bool {
        let Some(generation) = expired.generation_of(self.idle) else {
            return false;
        };

        let dropped = self.rx.lock(|rx| {
            if !self.timers.is_current(self.idle, generation) {
                return None;
            }
            let mut rx = rx.borrow_mut();
            let dropped = rx.len();
            rx.reset();
            rx.set_overwrite(self.config.rx_overwrite);
            Some(dropped)
        });

        match dropped {
            Some(0) => true,
            Some(_count) => {
                #[cfg(feature = "defmt")]
                defmt::debug!("idle timeout, dropped {} bytes", _count);
                self.update_stats(LinkStats::record_idle_reset);
                true
            }
            None => false,
        }
    }

    /// Discard buffered input and stop the idle timer
    pub fn resync(&self, now_ms: u32) {
        self.rx.lock(|rx| {
            self.timers.cancel(self.idle, now_ms);
            let mut rx = rx.borrow_mut();
            rx.reset();
            rx.set_overwrite(self.config.rx_overwrite);
        });
    }

    pub fn rx_len(&self) -> usize {
        self.rx.lock(|rx| rx.borrow().len())
    }

    pub fn tx_len(&self) -> usize {
        self.tx.lock(|tx| tx.borrow().len())
    }

    /// Snapshot of the link counters
    pub fn stats(&self) -> LinkStats {
        self.stats.lock(Cell::get)
    }

    fn update_stats(&self, f: impl FnOnce(&mut LinkStats)) {
        self.stats.lock(|cell| {
            let mut stats = cell.get();
            f(&mut stats);
            cell.set(stats);
        });
    }
}
