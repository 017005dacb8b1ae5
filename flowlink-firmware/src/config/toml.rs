//! Simple TOML reader for the link configuration
//!
//! Handles only the subset `link.toml` needs. It does NOT support the full
//! TOML spec.
//!
//! Supported features:
//! - `[link]` and `[uart]` section headers
//! - Key = value pairs (string, integer, boolean)
//! - Comments (# ...)

use flowlink_core::LinkConfig;
use flowlink_hal::{DataBits, Parity, StopBits, UartConfig};
use flowlink_protocol::ChecksumScope;

/// Parse error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ParseError {
    /// Section other than `[link]` or `[uart]`
    InvalidSection,
    /// Value of the wrong type or out of range
    InvalidValue,
    /// Key not known in its section
    UnknownKey,
}

/// Settings read from `link.toml`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FirmwareConfig {
    pub link: LinkConfig,
    pub uart: UartConfig,
}

#[derive(Debug, Clone, Copy)]
enum Section {
    Root,
    Link,
    Uart,
}

/// Parse `link.toml` into a [`FirmwareConfig`]
///
/// Missing keys keep their defaults.
pub fn parse_config(input: &str) -> Result<FirmwareConfig, ParseError> {
    let mut config = FirmwareConfig::default();
    let mut section = Section::Root;

    for line in input.lines() {
        let line = line.trim();

        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if line.starts_with('[') && line.ends_with(']') {
            section = match line[1..line.len() - 1].trim() {
                "link" => Section::Link,
                "uart" => Section::Uart,
                _ => return Err(ParseError::InvalidSection),
            };
            continue;
        }

        let Some((key, value)) = parse_key_value(line) else {
            return Err(ParseError::InvalidValue);
        };

        match section {
            Section::Root => return Err(ParseError::UnknownKey),
            Section::Link => apply_link(&mut config.link, key, value)?,
            Section::Uart => apply_uart(&mut config.uart, key, value)?,
        }
    }

    Ok(config)
}

fn apply_link(link: &mut LinkConfig, key: &str, value: &str) -> Result<(), ParseError> {
    match key {
        "idle_timeout_ms" => link.idle_timeout_ms = parse_int(value)?,
        "rx_overwrite" => link.rx_overwrite = parse_bool(value)?,
        "zero_sync" => link.zero_sync = parse_bool(value)?,
        "error_replies" => link.error_replies = parse_bool(value)?,
        "checksum" => {
            link.checksum = match parse_string(value)? {
                "tag-and-payload" => ChecksumScope::TagAndPayload,
                "payload-only" => ChecksumScope::PayloadOnly,
                _ => return Err(ParseError::InvalidValue),
            }
        }
        _ => return Err(ParseError::UnknownKey),
    }
    Ok(())
}

fn apply_uart(uart: &mut UartConfig, key: &str, value: &str) -> Result<(), ParseError> {
    match key {
        "baudrate" => uart.baudrate = parse_int(value)?,
        "data_bits" => {
            uart.data_bits = match parse_int::<u8>(value)? {
                7 => DataBits::Seven,
                8 => DataBits::Eight,
                9 => DataBits::Nine,
                _ => return Err(ParseError::InvalidValue),
            }
        }
        "parity" => {
            uart.parity = match parse_string(value)? {
                "none" => Parity::None,
                "even" => Parity::Even,
                "odd" => Parity::Odd,
                _ => return Err(ParseError::InvalidValue),
            }
        }
        "stop_bits" => {
            uart.stop_bits = match parse_int::<u8>(value)? {
                1 => StopBits::One,
                2 => StopBits::Two,
                _ => return Err(ParseError::InvalidValue),
            }
        }
        _ => return Err(ParseError::UnknownKey),
    }
    Ok(())
}

/// Split `key = value`, dropping a trailing comment
fn parse_key_value(line: &str) -> Option<(&str, &str)> {
    let eq_pos = line.find('=')?;
    let key = line[..eq_pos].trim();
    let value = line[eq_pos + 1..].trim();

    let value = match value.find('#') {
        // Only strip when the # is not inside a string
        Some(hash_pos) if value[..hash_pos].matches('"').count() % 2 == 0 => {
            value[..hash_pos].trim()
        }
        _ => value,
    };

    if key.is_empty() || value.is_empty() {
        return None;
    }
    Some((key, value))
}

/// Parse a string value, with or without quotes
fn parse_string(value: &str) -> Result<&str, ParseError> {
    if value.starts_with('"') && value.ends_with('"') && value.len() >= 2 {
        Ok(&value[1..value.len() - 1])
    } else {
        Ok(value)
    }
}

/// Parse an integer value, allowing `_` separators
fn parse_int<T: core::str::FromStr>(value: &str) -> Result<T, ParseError> {
    let mut digits = heapless::String::<16>::new();
    for c in value.chars().filter(|&c| c != '_') {
        digits.push(c).map_err(|_| ParseError::InvalidValue)?;
    }
    digits.parse().map_err(|_| ParseError::InvalidValue)
}

/// Parse a boolean value
fn parse_bool(value: &str) -> Result<bool, ParseError> {
    match value {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(ParseError::InvalidValue),
    }
}
