use tracing::{debug, warn};

use crate::core::{SensorAddress, TOTAL_NR_OF_PORTS};
use crate::store::{index_addr, VariableStore};
use super::resolver::resolve_record;

/// Port record programmed as an output object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputSlot {
    /// Programming index of the record's type byte
    pub index: u8,
    /// Address resolved from the record
    pub addr: SensorAddress,
}

/// Output objects registered through programming writes
#[derive(Debug, Clone, Default)]
pub struct OutputList {
    slots: Vec<OutputSlot>,
    changed: bool,
}

impl OutputList {
    /// Creates an empty list
    pub fn new() -> Self {
        OutputList::default()
    }

    /// Registers the record whose type byte sits at programming `index`
    ///
    /// Every call raises the "outputs changed" flag. Returns false if no
    /// slot was added because the record was already registered or the
    /// list is full.
    pub fn register<S: VariableStore + ?Sized>(&mut self, store: &S, index: u8) -> bool {
        self.changed = true;
        if self.slots.iter().any(|slot| slot.index == index) {
            debug!(index, "Output already registered");
            return false;
        }
        if self.slots.len() >= TOTAL_NR_OF_PORTS {
            warn!(index, "Output list full, registration dropped");
            return false;
        }

        let addr = resolve_record(store, index_addr(index)).address;
        self.slots.push(OutputSlot { index, addr });
        debug!(index, addr = addr.full(), "Output registered");
        true
    }

    /// Re-resolves the address of every registered output
    pub fn refresh<S: VariableStore + ?Sized>(&mut self, store: &S) {
        for slot in &mut self.slots {
            slot.addr = resolve_record(store, index_addr(slot.index)).address;
        }
    }

    /// Registered outputs
    pub fn slots(&self) -> &[OutputSlot] {
        &self.slots
    }

    /// Reads and clears the "outputs changed" flag
    pub fn take_changed(&mut self) -> bool {
        std::mem::replace(&mut self.changed, false)
    }
}
