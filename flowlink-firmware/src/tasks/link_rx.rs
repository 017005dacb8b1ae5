//! Host link UART receive task
//!
//! Feeds received bytes into the channel and runs the parser until no
//! complete frame is left.

use defmt::*;
use embassy_rp::uart::BufferedUartRx;
use embedded_io_async::Read;

use flowlink_hal::clock::EmbassyClock;
use flowlink_hal::MillisClock;

use crate::channels::{Link, TX_KICK};
use crate::handlers::Device;

/// Bytes taken from the UART driver per read
const RX_CHUNK: usize = 32;

/// Link RX task - receives bytes and dispatches frames
#[embassy_executor::task]
pub async fn link_rx_task(mut rx: BufferedUartRx, link: &'static Link) {
    info!("Link RX task started");

    let clock = EmbassyClock;
    let mut device = Device::new();
    let mut buf = [0u8; RX_CHUNK];

    loop {
        match rx.read(&mut buf).await {
            Ok(n) if n > 0 => {
                trace!("RX: {} bytes", n);

                let stored = link.receive(&buf[..n], clock.now_ms());
                if stored < n {
                    warn!("Rx full, dropped {} bytes", n - stored);
                }

                let frames = link.process_all(&mut device);
                if frames > 0 {
                    trace!("Dispatched {} frames", frames);
                }

                // Replies, sync bytes and error tags all land in Tx
                if link.tx_len() > 0 {
                    TX_KICK.signal(());
                }
            }
            Ok(_) => {
                // No bytes read, continue
            }
            Err(e) => {
                warn!("UART read error: {:?}", e);
            }
        }
    }
}
