//! Tick task for time-based updates
//!
//! Polls the timer queue so the idle timeout can reset a stalled Rx
//! buffer, and logs the link counters now and then.

use defmt::*;
use embassy_time::{Duration, Ticker};

use flowlink_hal::clock::EmbassyClock;
use flowlink_hal::MillisClock;

use crate::channels::{Link, Timers};

/// Tick interval in milliseconds; bounds how late an idle reset can be
pub const TICK_INTERVAL_MS: u32 = 10;

/// Interval between statistics reports
const STATS_INTERVAL_MS: u32 = 60_000;

/// Tick task - fires expired timers and reports link statistics
#[embassy_executor::task]
pub async fn tick_task(timers: &'static Timers, link: &'static Link) {
    info!("Tick task started");

    let clock = EmbassyClock;
    let mut ticker = Ticker::every(Duration::from_millis(TICK_INTERVAL_MS as u64));
    let mut last_report = clock.now_ms();

    loop {
        ticker.next().await;

        let now_ms = clock.now_ms();
        let expired = timers.expire(now_ms);
        if !expired.is_empty() && link.handle_expired(&expired) {
            debug!("Link idle, Rx reset");
        }

        if now_ms.wrapping_sub(last_report) >= STATS_INTERVAL_MS {
            last_report = now_ms;
            let stats = link.stats();
            info!(
                "Link: {} frames, {} unknown-tag bytes, {} bad checksums, {} rx dropped, {} tx dropped, {} idle resets",
                stats.frames,
                stats.unknown_tag_bytes,
                stats.checksum_errors,
                stats.rx_dropped,
                stats.tx_dropped,
                stats.idle_resets
            );
        }
    }
}
