//! Host link UART transmit task
//!
//! Pumps the channel's Tx buffer into packet-sized chunks and hands each
//! chunk to the buffered UART. The write completing is the "transmit
//! space available" event that triggers the next pump.

use defmt::*;
use embassy_rp::uart::BufferedUartTx;
use embedded_io_async::Write;

use flowlink_core::PacketSink;

use crate::channels::{Link, TX_KICK};

/// Bytes staged per UART write
const TX_PACKET: usize = 64;

/// Link TX task - drains responses to the host
#[embassy_executor::task]
pub async fn link_tx_task(mut tx: BufferedUartTx, link: &'static Link) {
    info!("Link TX task started");

    let mut packet = PacketSink::<TX_PACKET>::new();

    loop {
        TX_KICK.wait().await;

        loop {
            match link.pump(&mut packet) {
                Ok(_) => {}
                Err(never) => match never {},
            }
            if packet.is_empty() {
                break;
            }

            if let Err(e) = tx.write_all(packet.as_slice()).await {
                warn!("Failed to send {} bytes: {:?}", packet.len(), e);
            } else {
                trace!("TX: {} bytes", packet.len());
            }
            packet.clear();
        }
    }
}
