//! CRC-16 checksum used to validate and emit frames.
//!
//! CRC-16/MODBUS: reflected polynomial `0xA001`, seed `0xFFFF`, no final XOR.
//! The same seed must be used for validation and for responses.

/// Seed for every frame checksum
pub const CRC16_SEED: u16 = 0xFFFF;

/// Reflected form of the 0x8005 polynomial
const POLYNOMIAL: u16 = 0xA001;

const TABLE: [u16; 256] = build_table();

const fn build_table() -> [u16; 256] {
    let mut table = [0u16; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = i as u16;
        let mut bit = 0;
        while bit < 8 {
            if crc & 0x0001 != 0 {
                crc = (crc >> 1) ^ POLYNOMIAL;
            } else {
                crc >>= 1;
            }
            bit += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
}

/// Table-driven CRC-16 over `block`, starting from `seed`
pub fn crc16(block: &[u8], seed: u16) -> u16 {
    let mut crc = Crc16::from(seed);
    crc.add_bytes(block);
    crc.get()
}

/// Bit-at-a-time CRC-16, identical output to [`crc16`]
///
/// Kept for targets where the 512-byte table does not fit.
pub fn crc16_bitwise(block: &[u8], seed: u16) -> u16 {
    let mut crc = seed;
    for &byte in block {
        crc ^= u16::from(byte);
        for _bit in 0..8 {
            let carry = crc & 0x0001 != 0;
            crc >>= 1;
            if carry {
                crc ^= POLYNOMIAL;
            }
        }
    }
    crc
}

/// Incremental CRC-16 accumulator
///
/// Lets a frame checksum be computed over the tag and payload without
/// copying them into one contiguous span.
#[derive(Debug, Clone, Copy)]
pub struct Crc16(u16);

impl Default for Crc16 {
    fn default() -> Self {
        Self(CRC16_SEED)
    }
}

impl Crc16 {
    pub const LENGTH: usize = 2;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, byte: u8) {
        let index = ((self.0 ^ u16::from(byte)) & 0x00FF) as usize;
        self.0 = (self.0 >> 8) ^ TABLE[index];
    }

    pub fn add_bytes(&mut self, bytes: &[u8]) {
        bytes.iter().for_each(|&byte| self.add(byte));
    }

    pub fn get(&self) -> u16 {
        self.0
    }
}

impl From<u16> for Crc16 {
    fn from(value: u16) -> Self {
        Self(value)
    }
}
