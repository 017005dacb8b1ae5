//! Millisecond time source
//!
//! Timestamps are `u32` milliseconds that wrap at 2^32. Consumers must
//! compare them with wrapping arithmetic only.

/// Monotonic millisecond clock
pub trait MillisClock {
    /// Current time in milliseconds, wrapping at 2^32
    fn now_ms(&self) -> u32;
}

impl<T: MillisClock + ?Sized> MillisClock for &T {
    fn now_ms(&self) -> u32 {
        (**self).now_ms()
    }
}

/// Clock backed by the embassy time driver
#[cfg(feature = "embassy-time")]
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbassyClock;

#[cfg(feature = "embassy-time")]
impl MillisClock for EmbassyClock {
    fn now_ms(&self) -> u32 {
        // Truncation is the wrap
        embassy_time::Instant::now().as_millis() as u32
    }
}
