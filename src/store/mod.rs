//! Variable store module
//!
//! The adapter keeps its configuration in a small byte-addressed store
//! (conceptually addresses 0..255). This module defines the store
//! contract, its layout and the boot-time initialisation.

mod init;
mod file;
mod memory;

pub use self::init::{boot, BootReport};
pub use self::file::FileStore;
pub use self::memory::MemoryStore;

use crate::core::Result;

/// Size of the addressable store in bytes
pub const STORE_SIZE: usize = 256;

/// Adapter address, low byte
pub const SV_ADDR_NODE_ID_L: u16 = 3;
/// Adapter address, high byte
pub const SV_ADDR_NODE_ID_H: u16 = 4;
/// Serial number, low byte
pub const SV_ADDR_SERIAL_NUMBER_L: u16 = 5;
/// Serial number, high byte
pub const SV_ADDR_SERIAL_NUMBER_H: u16 = 6;
/// Base of the user area addressed by programming indices
pub const SV_ADDR_USER_BASE: u16 = 7;

/// Programming index of the first port record
pub const FIRST_RECORD_INDEX: u8 = 3;

/// Bytes per port record: type, address low, address high + flags
pub const RECORD_LEN: u8 = 3;

/// Factory serial number
pub const DEFAULT_SERIAL: (u8, u8) = (0x56, 0x78);

/// Contract of the persistent byte store
///
/// Reads past the end of the store return 0 and writes there are dropped.
pub trait VariableStore {
    /// Reads one byte
    fn read_byte(&self, addr: u16) -> u8;

    /// Writes one byte
    fn write_byte(&mut self, addr: u16, value: u8);

    /// Flushes pending writes to the backing medium
    fn commit(&mut self) -> Result<()> {
        Ok(())
    }
}

impl<S: VariableStore + ?Sized> VariableStore for Box<S> {
    fn read_byte(&self, addr: u16) -> u8 {
        (**self).read_byte(addr)
    }

    fn write_byte(&mut self, addr: u16, value: u8) {
        (**self).write_byte(addr, value)
    }

    fn commit(&mut self) -> Result<()> {
        (**self).commit()
    }
}

/// Store address of a programming index
pub fn index_addr(index: u8) -> u16 {
    SV_ADDR_USER_BASE + u16::from(index)
}

/// Store address of the first byte of a port's record
pub fn record_addr(port: usize) -> u16 {
    let addr = usize::from(index_addr(FIRST_RECORD_INDEX)) + usize::from(RECORD_LEN) * port;
    u16::try_from(addr).unwrap_or(u16::MAX)
}
