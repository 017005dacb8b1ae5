//! Command handlers served over the host link
//!
//! Handlers run inside the RX task's processing loop and must return
//! without awaiting anything.

use embassy_time::Instant;
use flowlink_protocol::{Command, ErrorReply, Reply, Tag};

/// Firmware version reported by `gfwv`: major, minor, patch, build
const FIRMWARE_VERSION: [u8; 4] = [0, 1, 0, 0];

/// Largest value `sval` accepts
const MAX_VALUE: u32 = 1_000_000;

/// Device state reachable from command handlers
pub struct Device {
    value: u32,
    requests: u32,
}

impl Device {
    pub const fn new() -> Self {
        Self {
            value: 0,
            requests: 0,
        }
    }
}

/// Command table of the host link
pub static COMMANDS: [Command<Device>; 5] = [
    Command::new(Tag::from_ascii(b"gfwv"), 0, 4, get_firmware_version),
    Command::new(Tag::from_ascii(b"ping"), 4, 4, ping),
    Command::new(Tag::from_ascii(b"gupt"), 0, 4, get_uptime),
    Command::new(Tag::from_ascii(b"sval"), 4, 0, set_value),
    Command::new(Tag::from_ascii(b"gval"), 0, 8, get_value),
];

fn read_u32(bytes: &[u8]) -> u32 {
    let mut word = [0u8; 4];
    word.copy_from_slice(&bytes[..4]);
    u32::from_le_bytes(word)
}

fn get_firmware_version(device: &mut Device, _: &[u8], response: &mut [u8]) -> Reply {
    device.requests = device.requests.wrapping_add(1);
    response.copy_from_slice(&FIRMWARE_VERSION);
    Reply::Respond
}

/// Echo the request payload
fn ping(device: &mut Device, request: &[u8], response: &mut [u8]) -> Reply {
    device.requests = device.requests.wrapping_add(1);
    response.copy_from_slice(request);
    Reply::Respond
}

/// Seconds since boot
fn get_uptime(device: &mut Device, _: &[u8], response: &mut [u8]) -> Reply {
    device.requests = device.requests.wrapping_add(1);
    let seconds = Instant::now().as_secs() as u32;
    response.copy_from_slice(&seconds.to_le_bytes());
    Reply::Respond
}

fn set_value(device: &mut Device, request: &[u8], _: &mut [u8]) -> Reply {
    device.requests = device.requests.wrapping_add(1);
    let value = read_u32(request);
    if value > MAX_VALUE {
        return Reply::Reject(ErrorReply::Value);
    }
    device.value = value;
    Reply::Respond
}

/// Stored value followed by the number of requests served
fn get_value(device: &mut Device, _: &[u8], response: &mut [u8]) -> Reply {
    device.requests = device.requests.wrapping_add(1);
    response[..4].copy_from_slice(&device.value.to_le_bytes());
    response[4..].copy_from_slice(&device.requests.to_le_bytes());
    Reply::Respond
}
