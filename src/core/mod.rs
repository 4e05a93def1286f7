//! Core types and traits for the RFID bus adapter
//! 
//! This module contains the fundamental building blocks used throughout the library.

pub mod error;
pub mod types;
pub mod serde;

pub use self::error::{Error, Result};
pub use self::types::{
    AdapterAddress,
    AdapterConfig,
    PortType,
    ReaderMode,
    SensorAddress,
    Uid,
};

/// Number of card readers attached to the adapter
pub const NR_OF_RFID_PORTS: usize = 2;

/// Ceiling on ports addressable through the programming protocol
pub const TOTAL_NR_OF_PORTS: usize = 8;

/// Length of a stored card identifier in bytes
pub const UID_LEN: usize = 7;

/// Consecutive empty reads before a port reports the card as gone
pub const MAX_EMPTY_READS: u8 = 2;

/// Factory adapter address, high byte
pub const DEFAULT_ADDR_HIGH: u8 = 1;

/// Factory adapter address, low byte
pub const DEFAULT_ADDR_LOW: u8 = 88;

/// Destination-low value every adapter answers to
pub const BROADCAST_ADDR_LOW: u8 = 0;

/// Destination-high wildcard used while addressing unprogrammed units
pub const PROGRAMMING_ADDR_HIGH: u8 = 0x7F;
