use super::{VariableStore, STORE_SIZE};

/// In-memory variable store
///
/// A fresh store reads as erased memory (`0xFF`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryStore {
    bytes: [u8; STORE_SIZE],
}

impl MemoryStore {
    /// Creates an erased store
    pub fn new() -> Self {
        MemoryStore {
            bytes: [0xFF; STORE_SIZE],
        }
    }

    /// Creates a store from a raw image
    pub fn from_image(bytes: [u8; STORE_SIZE]) -> Self {
        MemoryStore { bytes }
    }

    /// Raw store image
    pub fn image(&self) -> &[u8; STORE_SIZE] {
        &self.bytes
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        MemoryStore::new()
    }
}

impl VariableStore for MemoryStore {
    fn read_byte(&self, addr: u16) -> u8 {
        self.bytes.get(usize::from(addr)).copied().unwrap_or(0)
    }

    fn write_byte(&mut self, addr: u16, value: u8) {
        match self.bytes.get_mut(usize::from(addr)) {
            Some(byte) => *byte = value,
            None => tracing::warn!(addr, "Write past end of variable store dropped"),
        }
    }
}
