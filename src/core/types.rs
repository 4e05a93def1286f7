use std::fmt;
use std::time::Duration;

use serde::{Serialize, Deserialize};

use super::{Error, Result};

/// Card identifier as tracked per port
///
/// Readers return identifiers of 4, 7 or 10 bytes. They are normalized to
/// `UID_LEN` bytes: shorter ones are zero padded, longer ones truncated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Uid(pub [u8; super::UID_LEN]);

impl Uid {
    /// Creates an identifier from raw reader bytes
    pub fn from_slice(bytes: &[u8]) -> Self {
        let mut uid = [0u8; super::UID_LEN];
        let len = bytes.len().min(super::UID_LEN);
        uid[..len].copy_from_slice(&bytes[..len]);
        Uid(uid)
    }

    /// Returns the identifier bytes
    pub fn as_bytes(&self) -> &[u8; super::UID_LEN] {
        &self.0
    }
}

impl fmt::Display for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&crate::util::hex_dump(&self.0))
    }
}

/// Bus address of the adapter itself
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdapterAddress {
    /// High byte, reprogrammable only through its dedicated slot
    pub high: u8,
    /// Low byte, end-user reprogrammable
    pub low: u8,
}

impl AdapterAddress {
    /// Creates an adapter address
    pub fn new(high: u8, low: u8) -> Self {
        AdapterAddress { high, low }
    }

    /// Returns whether a frame sent to `(dst_low, dst_high)` is meant for this adapter
    pub fn accepts(&self, dst_low: u8, dst_high: u8) -> bool {
        let low_ok = dst_low == self.low || dst_low == super::BROADCAST_ADDR_LOW;
        let high_ok = dst_high == self.high || dst_high == super::PROGRAMMING_ADDR_HIGH;
        low_ok && high_ok
    }
}

impl Default for AdapterAddress {
    fn default() -> Self {
        AdapterAddress::new(super::DEFAULT_ADDR_HIGH, super::DEFAULT_ADDR_LOW)
    }
}

impl fmt::Display for AdapterAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.high, self.low)
    }
}

/// Bus-visible sensor address of a port (1-based, 14 bits significant)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct SensorAddress(pub u16);

impl SensorAddress {
    /// Full address
    pub fn full(&self) -> u16 {
        self.0
    }

    /// Upper seven bits as carried on the bus
    pub fn high(&self) -> u8 {
        ((self.0 >> 7) & 0x7F) as u8
    }

    /// Lower seven bits as carried on the bus
    pub fn low(&self) -> u8 {
        (self.0 & 0x7F) as u8
    }
}

/// Type code stored as the first byte of a port record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PortType(pub u8);

impl PortType {
    /// Sensor input
    pub const INPUT: PortType = PortType(0x0F);
    /// Output object
    pub const OUTPUT: PortType = PortType(0x10);

    /// Returns whether this type is counted as an output object
    pub fn is_output(&self) -> bool {
        *self == PortType::OUTPUT
    }
}

impl Default for PortType {
    fn default() -> Self {
        PortType::INPUT
    }
}

/// How the adapter learns that a reader has fresh data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReaderMode {
    /// Every port is read on every poll tick
    Polling,
    /// Only ports whose ready flag was raised are read
    Interrupt,
}

/// Configuration for the adapter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdapterConfig {
    /// Interval between reader poll cycles
    #[serde(serialize_with = "super::serde::serialize_duration_ms")]
    #[serde(deserialize_with = "super::serde::deserialize_duration_ms")]
    pub poll_interval: Duration,
    /// Largest backoff handed to the transport for programming replies
    pub backoff_max: u8,
    /// Reader servicing mode
    pub reader_mode: ReaderMode,
    /// Drop inbound frames whose checksum does not verify
    pub verify_inbound_checksum: bool,
    /// Boot marker written to the top of the variable store
    pub board_version: String,
}

/// Longest boot marker accepted
pub const MAX_BOARD_VERSION_LEN: usize = 16;

impl AdapterConfig {
    /// Checks that the configuration is usable
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval.is_zero() {
            return Err(Error::config("Poll interval must be non-zero"));
        }
        if self.board_version.is_empty() {
            return Err(Error::config("Board version marker must not be empty"));
        }
        if self.board_version.len() > MAX_BOARD_VERSION_LEN {
            return Err(Error::config(format!(
                "Board version marker longer than {} bytes",
                MAX_BOARD_VERSION_LEN
            )));
        }
        if self.backoff_max < 10 {
            return Err(Error::config("Backoff maximum must be at least 10"));
        }
        Ok(())
    }
}

impl Default for AdapterConfig {
    fn default() -> Self {
        AdapterConfig {
            poll_interval: Duration::from_millis(50),
            backoff_max: 56,
            reader_mode: ReaderMode::Polling,
            verify_inbound_checksum: false,
            board_version: "RFID2LN1".to_string(),
        }
    }
}
