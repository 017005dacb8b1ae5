//! Flowlink Wire Protocol
//!
//! This crate defines the byte-level format exchanged between a host and an
//! instrument over UART or USB virtual serial. The device answers every
//! request frame with a response frame that echoes the request tag.
//!
//! # Frame Format
//!
//! ```text
//! ┌─────────────┬─────────────────────┬──────────┐
//! │ TAG         │ PAYLOAD             │ CRC-16   │
//! │ 4B (ASCII)  │ N bytes, N = f(TAG) │ 2B (LE)  │
//! └─────────────┴─────────────────────┴──────────┘
//! ```
//!
//! The payload length is not transmitted: both ends know it from the
//! command table. The checksum is CRC-16/MODBUS, seeded with `0xFFFF`.

#![cfg_attr(not(any(test, feature = "std")), no_std)]
#![deny(unsafe_code)]

pub mod command;
pub mod crc;
pub mod frame;

pub use command::{Command, CommandTable, HandlerFn, Reply, TableError};
pub use crc::{crc16, crc16_bitwise, Crc16, CRC16_SEED};
pub use frame::{
    encode_frame, frame_len, seal_frame, verify_frame, ChecksumScope, ErrorReply, FrameError, Tag, CRC_LEN,
    DEFAULT_PACKET_LENGTH, TAG_LEN,
};
