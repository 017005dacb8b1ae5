//! Configuration type definitions

use flowlink_protocol::ChecksumScope;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Rx inactivity after which a partial frame is dropped, in milliseconds
pub const DEFAULT_IDLE_TIMEOUT_MS: u32 = 2000;

/// Per-channel link settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct LinkConfig {
    /// Idle delay before the Rx buffer is reset
    pub idle_timeout_ms: u32,
    /// Drop the oldest Rx byte instead of the newest when Rx is full
    pub rx_overwrite: bool,
    /// Answer a leading `0x00` with a single `0x00`
    pub zero_sync: bool,
    /// Answer unknown tags with `errc` and checksum failures with `errd`
    pub error_replies: bool,
    /// Bytes covered by the frame checksum
    pub checksum: ChecksumScope,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            idle_timeout_ms: DEFAULT_IDLE_TIMEOUT_MS,
            rx_overwrite: false,
            zero_sync: true,
            error_replies: false,
            checksum: ChecksumScope::TagAndPayload,
        }
    }
}

/// Configuration validation errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// An idle timeout of zero would reset Rx between any two bytes
    ZeroIdleTimeout,
    /// Idle timeout exceeds what the timer queue can arm
    IdleTimeoutTooLong { max_ms: u32 },
}

impl LinkConfig {
    /// Check the settings against the timer queue's longest delay
    pub fn validate(&self, max_delay_ms: u32) -> Result<(), ConfigError> {
        if self.idle_timeout_ms == 0 {
            return Err(ConfigError::ZeroIdleTimeout);
        }
        if self.idle_timeout_ms > max_delay_ms {
            return Err(ConfigError::IdleTimeoutTooLong {
                max_ms: max_delay_ms,
            });
        }
        Ok(())
    }
}
