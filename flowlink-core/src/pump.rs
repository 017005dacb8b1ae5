//! Transport pump: Tx buffer to peripheral
//!
//! Run after the parser queued output and again whenever the peripheral
//! reports free transmit space. Each run moves bytes until Tx is empty or
//! the sink is full, then returns; it never waits.

use core::convert::Infallible;

use flowlink_hal::SerialTx;
use heapless::Vec;

use crate::buffer::RingBuffer;

/// Drain `tx` into `sink`, returning the number of bytes moved
///
/// A byte leaves `tx` only after the sink accepted it, so a write error
/// keeps it queued for the next run.
pub fn pump<S: SerialTx, const N: usize>(
    tx: &mut RingBuffer<N>,
    sink: &mut S,
) -> Result<usize, S::Error> {
    let mut sent = 0;
    while send_byte(tx, sink)? {
        sent += 1;
    }
    Ok(sent)
}

/// Move the head byte of `tx` into `sink`
///
/// Returns `false` when Tx is empty or the sink has no room. Check, write
/// and discard happen on one borrow, so a [`Channel`](crate::Channel) can
/// run the whole hand-off under its Tx lock.
pub(crate) fn send_byte<S: SerialTx, const N: usize>(
    tx: &mut RingBuffer<N>,
    sink: &mut S,
) -> Result<bool, S::Error> {
    if !sink.can_write() {
        return Ok(false);
    }
    let Some(byte) = tx.peek_byte() else {
        return Ok(false);
    };
    sink.write_byte(byte)?;
    tx.discard(1);
    Ok(true)
}

/// Packet-sized staging area for block transports
///
/// Accepts bytes until `P` are held, like a USB packet buffer or a DMA
/// descriptor. The transport sends [`as_slice`](Self::as_slice) in one
/// transfer, then calls [`clear`](Self::clear) and pumps again.
#[derive(Debug, Clone, Default)]
pub struct PacketSink<const P: usize> {
    packet: Vec<u8, P>,
}

impl<const P: usize> PacketSink<P> {
    pub const fn new() -> Self {
        Self { packet: Vec::new() }
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.packet
    }

    pub fn clear(&mut self) {
        self.packet.clear();
    }

    pub fn len(&self) -> usize {
        self.packet.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packet.is_empty()
    }
}

impl<const P: usize> SerialTx for PacketSink<P> {
    type Error = Infallible;

    fn can_write(&mut self) -> bool {
        !self.packet.is_full()
    }

    fn write_byte(&mut self, byte: u8) -> Result<(), Self::Error> {
        // Only reached after can_write
        let _ = self.packet.push(byte);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// FIFO that takes `room` bytes, optionally failing on one of them
    struct Fifo {
        room: usize,
        written: std::vec::Vec<u8>,
        fail_at: Option<usize>,
    }

    impl Fifo {
        fn new(room: usize) -> Self {
            Self {
                room,
                written: std::vec::Vec::new(),
                fail_at: None,
            }
        }
    }

    impl SerialTx for Fifo {
        type Error = ();

        fn can_write(&mut self) -> bool {
            self.written.len() < self.room
        }

        fn write_byte(&mut self, byte: u8) -> Result<(), ()> {
            if self.fail_at == Some(self.written.len()) {
                self.fail_at = None;
                return Err(());
            }
            self.written.push(byte);
            Ok(())
        }
    }

    #[test]
    fn test_pump_until_empty() {
        let mut tx = RingBuffer::<16>::new();
        tx.put_span(b"pong");
        let mut fifo = Fifo::new(32);

        assert_eq!(pump(&mut tx, &mut fifo), Ok(4));
        assert_eq!(fifo.written, b"pong");
        assert!(tx.is_empty());
        assert_eq!(pump(&mut tx, &mut fifo), Ok(0));
    }

    #[test]
    fn test_pump_stops_when_peripheral_full() {
        let mut tx = RingBuffer::<16>::new();
        tx.put_span(&[1, 2, 3, 4, 5, 6]);
        let mut fifo = Fifo::new(4);

        assert_eq!(pump(&mut tx, &mut fifo), Ok(4));
        assert_eq!(tx.len(), 2);

        // "Transmit space available"
        fifo.room = 8;
        assert_eq!(pump(&mut tx, &mut fifo), Ok(2));
        assert_eq!(fifo.written, [1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_failed_byte_stays_queued() {
        let mut tx = RingBuffer::<16>::new();
        tx.put_span(&[7, 8, 9]);
        let mut fifo = Fifo::new(8);
        fifo.fail_at = Some(1);

        assert_eq!(pump(&mut tx, &mut fifo), Err(()));
        assert_eq!(tx.peek_byte(), Some(8));
        assert_eq!(pump(&mut tx, &mut fifo), Ok(2));
        assert_eq!(fifo.written, [7, 8, 9]);
    }

    #[test]
    fn test_packet_sink_fills_packets() {
        let mut tx = RingBuffer::<32>::new();
        tx.put_span(&[0xAB; 20]);
        let mut sink = PacketSink::<8>::new();

        let mut packets = std::vec::Vec::new();
        loop {
            let moved = pump(&mut tx, &mut sink).unwrap();
            if moved == 0 && sink.is_empty() {
                break;
            }
            packets.push(sink.len());
            sink.clear();
        }
        assert_eq!(packets, [8, 8, 4]);
    }
}
