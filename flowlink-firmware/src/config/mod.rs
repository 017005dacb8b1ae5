//! Configuration loading
//!
//! The link configuration is compiled in from `link.toml`.

pub mod toml;

pub use toml::{parse_config, FirmwareConfig, ParseError};
