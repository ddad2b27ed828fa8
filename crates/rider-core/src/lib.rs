//! rider-core — configuration and wire constants shared by the relay
//! binary and its tests. Nothing in here touches the network.

pub mod config;
pub mod wire;

pub use config::{ConfigError, InputConfig, QuicConfig, RiderConfig, SyslogConfig, SyslogTransport};
