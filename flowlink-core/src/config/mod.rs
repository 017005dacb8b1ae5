//! Configuration types
//!
//! Board-agnostic link settings. Firmware loads them from its embedded
//! `link.toml`; host tools can deserialize them with serde.

pub mod types;

pub use types::*;
