//! Configuration system for rider.
//!
//! Resolution order: environment variables → config file → defaults.
//! Command-line flags are applied on top by the binary.
//!
//! Config file location:
//!   1. $RIDER_CONFIG (explicit override)
//!   2. $XDG_CONFIG_HOME/rider/config.toml
//!   3. ~/.config/rider/config.toml
//!
//! The loaded value is immutable once handed to the pipeline. Components
//! receive the pieces they need at construction.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::wire;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RiderConfig {
    pub input: InputConfig,
    pub syslog: SyslogConfig,
    pub quic: QuicConfig,
    /// Use the QUIC transport instead of plain syslog.
    pub experimental: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// Max bytes per read. None = transport default.
    pub chunk_size: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyslogTransport {
    #[default]
    Udp,
    Tcp,
    /// The host's local syslog socket.
    Local,
}

impl std::str::FromStr for SyslogTransport {
    type Err = ConfigError;

    /// Unknown names fall back to the local socket, matching how the
    /// transport selector has always behaved.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_ascii_lowercase().as_str() {
            "udp" => Self::Udp,
            "tcp" => Self::Tcp,
            _ => Self::Local,
        })
    }
}

impl std::fmt::Display for SyslogTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Udp => "udp",
            Self::Tcp => "tcp",
            Self::Local => "local",
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyslogConfig {
    pub transport: SyslogTransport,
    /// host:port of the collector. Ignored for `local`.
    pub address: String,
    /// Tag stamped on every message.
    pub tag: String,
    /// Echo the byte count of every message to stderr.
    pub verbose: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QuicConfig {
    /// host:port of the collector.
    pub address: String,
    /// Application protocol offered in the handshake.
    pub alpn: String,
    pub handshake_timeout_ms: u64,
    pub heartbeat_interval_secs: u64,
    /// Bound on waiting for the forwarder to acknowledge shutdown.
    pub shutdown_timeout_ms: u64,
}

// ── Defaults ──────────────────────────────────────────────────────────────────

impl Default for SyslogConfig {
    fn default() -> Self {
        Self {
            transport: SyslogTransport::Udp,
            address: wire::DEFAULT_ADDRESS.to_string(),
            tag: wire::DEFAULT_TAG.to_string(),
            verbose: false,
        }
    }
}

impl Default for QuicConfig {
    fn default() -> Self {
        Self {
            address: wire::DEFAULT_ADDRESS.to_string(),
            alpn: wire::ALPN_PROTOCOL.to_string(),
            handshake_timeout_ms: wire::HANDSHAKE_TIMEOUT_SECS * 1000,
            heartbeat_interval_secs: wire::HEARTBEAT_INTERVAL_SECS,
            shutdown_timeout_ms: wire::SHUTDOWN_TIMEOUT_MS,
        }
    }
}

impl QuicConfig {
    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_millis(self.handshake_timeout_ms)
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }
}

// ── Path helpers ──────────────────────────────────────────────────────────────

fn config_dir() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| dirs_or_home().join(".config"))
        .join("rider")
}

fn dirs_or_home() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {0}: {1}")]
    ReadFailed(PathBuf, std::io::Error),
    #[error("failed to parse {0}: {1}")]
    ParseFailed(PathBuf, toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

// ── Loading ───────────────────────────────────────────────────────────────────

impl RiderConfig {
    /// Load config: env vars → file → defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::file_path();
        let mut config = if path.exists() {
            let text = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::ReadFailed(path.clone(), e))?;
            toml::from_str(&text).map_err(|e| ConfigError::ParseFailed(path.clone(), e))?
        } else {
            RiderConfig::default()
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Parse a config document without touching the environment.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|e| ConfigError::ParseFailed(PathBuf::from("<inline>"), e))
    }

    /// Config file path.
    pub fn file_path() -> PathBuf {
        std::env::var("RIDER_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| config_dir().join("config.toml"))
    }

    /// Apply RIDER_* overrides fetched through `lookup`.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let flag = |v: String| v == "true" || v == "1";

        if let Some(v) = lookup("RIDER_CHUNK_SIZE") {
            if let Ok(n) = v.parse() {
                self.input.chunk_size = Some(n);
            }
        }
        if let Some(v) = lookup("RIDER_SYSLOG__TRANSPORT") {
            if let Ok(t) = v.parse() {
                self.syslog.transport = t;
            }
        }
        if let Some(v) = lookup("RIDER_SYSLOG__ADDRESS") {
            self.syslog.address = v;
        }
        if let Some(v) = lookup("RIDER_SYSLOG__TAG") {
            self.syslog.tag = v;
        }
        if let Some(v) = lookup("RIDER_SYSLOG__VERBOSE") {
            self.syslog.verbose = flag(v);
        }
        if let Some(v) = lookup("RIDER_QUIC__ADDRESS") {
            self.quic.address = v;
        }
        if let Some(v) = lookup("RIDER_QUIC__HANDSHAKE_TIMEOUT_MS") {
            if let Ok(ms) = v.parse() {
                self.quic.handshake_timeout_ms = ms;
            }
        }
        if let Some(v) = lookup("RIDER_QUIC__HEARTBEAT_INTERVAL_SECS") {
            if let Ok(secs) = v.parse() {
                self.quic.heartbeat_interval_secs = secs;
            }
        }
        if let Some(v) = lookup("RIDER_EXPERIMENTAL") {
            self.experimental = flag(v);
        }
    }

    /// Chunk size for the active transport.
    pub fn effective_chunk_size(&self) -> usize {
        self.input.chunk_size.unwrap_or(if self.experimental {
            wire::QUIC_CHUNK_SIZE
        } else {
            wire::SYSLOG_CHUNK_SIZE
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.input.chunk_size == Some(0) {
            return Err(ConfigError::Invalid("chunk size must be positive".into()));
        }
        if self.quic.alpn.is_empty() {
            return Err(ConfigError::Invalid("alpn must not be empty".into()));
        }
        if self.quic.handshake_timeout_ms == 0 {
            return Err(ConfigError::Invalid("handshake timeout must be positive".into()));
        }
        if self.quic.heartbeat_interval_secs == 0 {
            return Err(ConfigError::Invalid("heartbeat interval must be positive".into()));
        }
        Ok(())
    }
}
