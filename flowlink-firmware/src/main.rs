//! Flowlink - Command Transport Firmware
//!
//! Firmware binary for RP2040-based instruments. Serves the flowlink
//! command protocol on UART0: framed requests from the host are parsed,
//! dispatched to the command handlers, and answered on the same line.

#![no_std]
#![no_main]

use defmt::*;
use embassy_executor::Spawner;
use embassy_rp::bind_interrupts;
use embassy_rp::peripherals::UART0;
use embassy_rp::uart::{self, BufferedInterruptHandler, Uart};
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

use flowlink_core::{TimerQueue, DEFAULT_MAX_DELAY_MS};
use flowlink_hal::{DataBits, Parity, StopBits, UartConfig};
use flowlink_protocol::CommandTable;

use crate::channels::{Link, Timers, PACKET_LENGTH};
use crate::config::{parse_config, FirmwareConfig};

/// Embedded link configuration (compiled into firmware)
/// Edit link.toml and rebuild to customize
const EMBEDDED_CONFIG: &str = include_str!("../link.toml");

mod channels;
mod config;
mod handlers;
mod tasks;

bind_interrupts!(struct Irqs {
    UART0_IRQ => BufferedInterruptHandler<UART0>;
});

// Static cells for UART driver buffers (must live forever)
static TX_BUF: StaticCell<[u8; PACKET_LENGTH]> = StaticCell::new();
static RX_BUF: StaticCell<[u8; PACKET_LENGTH]> = StaticCell::new();

/// Idle timers for every channel
static TIMERS: Timers = TimerQueue::new(DEFAULT_MAX_DELAY_MS);

/// The host link, shared by the RX, TX and tick tasks
static LINK: StaticCell<Link> = StaticCell::new();

/// Main entry point
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("Flowlink firmware starting...");

    let p = embassy_rp::init(Default::default());
    info!("Peripherals initialized");

    let config = load_config();
    info!(
        "Link config: idle {} ms, {} baud",
        config.link.idle_timeout_ms, config.uart.baudrate
    );

    let table = match CommandTable::new(&handlers::COMMANDS) {
        Ok(table) => table,
        Err(e) => defmt::panic!("Invalid command table: {:?}", e),
    };

    let link: &'static Link = match Link::new(config.link, table, &TIMERS) {
        Ok(link) => LINK.init(link),
        Err(e) => defmt::panic!("Link init failed: {:?}", e),
    };
    info!("Link ready, {} commands", table.len());

    let tx_buf = TX_BUF.init([0u8; PACKET_LENGTH]);
    let rx_buf = RX_BUF.init([0u8; PACKET_LENGTH]);

    let uart = Uart::new_blocking(p.UART0, p.PIN_0, p.PIN_1, rp_uart_config(&config.uart));
    let uart = uart.into_buffered(Irqs, tx_buf, rx_buf);
    let (tx, rx) = uart.split();

    info!("UART initialized for host link");

    spawner.spawn(tasks::tick_task(&TIMERS, link)).unwrap();
    spawner.spawn(tasks::link_rx_task(rx, link)).unwrap();
    spawner.spawn(tasks::link_tx_task(tx, link)).unwrap();

    info!("All tasks spawned, firmware running");

    loop {
        embassy_time::Timer::after_secs(60).await;
        trace!("Main loop heartbeat");
    }
}

/// Parse the link.toml file that was embedded at compile time
///
/// build.rs validates the file, so a failure here means the reader and
/// the build check disagree; fall back to defaults.
fn load_config() -> FirmwareConfig {
    match parse_config(EMBEDDED_CONFIG) {
        Ok(config) => {
            info!("Parsed embedded configuration successfully");
            config
        }
        Err(e) => {
            error!("Failed to parse embedded config: {:?}", e);
            error!("Using default link configuration");
            FirmwareConfig::default()
        }
    }
}

/// Translate line settings into the RP2040 UART driver's configuration
fn rp_uart_config(line: &UartConfig) -> uart::Config {
    let mut cfg = uart::Config::default();
    cfg.baudrate = line.baudrate;
    cfg.data_bits = match line.data_bits {
        DataBits::Seven => uart::DataBits::DataBits7,
        DataBits::Eight => uart::DataBits::DataBits8,
        DataBits::Nine => {
            warn!("RP2040 UART has no 9-bit mode, using 8 data bits");
            uart::DataBits::DataBits8
        }
    };
    cfg.parity = match line.parity {
        Parity::None => uart::Parity::ParityNone,
        Parity::Even => uart::Parity::ParityEven,
        Parity::Odd => uart::Parity::ParityOdd,
    };
    cfg.stop_bits = match line.stop_bits {
        StopBits::One => uart::StopBits::STOP1,
        StopBits::Two => uart::StopBits::STOP2,
    };
    cfg
}
