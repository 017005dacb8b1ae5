//! Serial transmit abstractions
//!
//! The transmit side of a channel is drained opportunistically: the pump
//! moves bytes while the peripheral reports room, and stops as soon as it
//! does not. Nothing behind these traits may wait for the hardware.

/// Non-blocking serial transmitter
///
/// Implemented by UART FIFOs, USB packet buffers and DMA staging areas.
pub trait SerialTx {
    /// Error type for transmit operations
    type Error;

    /// Whether the peripheral can accept at least one more byte right now
    fn can_write(&mut self) -> bool;

    /// Hand one byte to the peripheral
    ///
    /// Only called after [`can_write`](Self::can_write) returned `true`.
    fn write_byte(&mut self, byte: u8) -> Result<(), Self::Error>;
}

impl<T: SerialTx + ?Sized> SerialTx for &mut T {
    type Error = T::Error;

    fn can_write(&mut self) -> bool {
        (**self).can_write()
    }

    fn write_byte(&mut self, byte: u8) -> Result<(), Self::Error> {
        (**self).write_byte(byte)
    }
}

/// UART line configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct UartConfig {
    /// Baud rate in bits per second
    pub baudrate: u32,
    /// Number of data bits (typically 8)
    pub data_bits: DataBits,
    /// Parity mode
    pub parity: Parity,
    /// Number of stop bits
    pub stop_bits: StopBits,
}

impl Default for UartConfig {
    fn default() -> Self {
        Self {
            baudrate: 115200,
            data_bits: DataBits::Eight,
            parity: Parity::None,
            stop_bits: StopBits::One,
        }
    }
}

impl UartConfig {
    /// Bits on the wire per transmitted byte (start + data + parity + stop)
    pub fn bits_per_byte(&self) -> u32 {
        let data = match self.data_bits {
            DataBits::Seven => 7,
            DataBits::Eight => 8,
            DataBits::Nine => 9,
        };
        let parity = match self.parity {
            Parity::None => 0,
            Parity::Even | Parity::Odd => 1,
        };
        let stop = match self.stop_bits {
            StopBits::One => 1,
            StopBits::Two => 2,
        };
        1 + data + parity + stop
    }

    /// Milliseconds needed to move `bytes` over the line, rounded up
    ///
    /// The idle timeout must stay well above the time one full frame takes
    /// on the wire, otherwise slow links reset mid-frame.
    pub fn transfer_time_ms(&self, bytes: usize) -> u32 {
        let bits = bytes as u64 * self.bits_per_byte() as u64 * 1000;
        let baud = self.baudrate.max(1) as u64;
        bits.div_ceil(baud) as u32
    }
}

/// Number of data bits per frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DataBits {
    Seven,
    Eight,
    Nine,
}

/// Parity mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Parity {
    None,
    Even,
    Odd,
}

/// Number of stop bits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StopBits {
    One,
    Two,
}
