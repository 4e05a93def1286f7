use crate::core::{PortType, SensorAddress};
use crate::store::{record_addr, VariableStore};

/// Bus-visible identity of a port record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ResolvedPort {
    /// Sensor address
    pub address: SensorAddress,
    /// Record type code
    pub port_type: PortType,
}

/// Derives the sensor address from a raw record
///
/// The low nibble of `high` holds address bits 8..11 and bits 7..5 a
/// sub-address offset; the result is 1-based.
pub fn sensor_address(low: u8, high: u8) -> SensorAddress {
    let full = 256 * u16::from(high & 0x0F)
        + 2 * u16::from(low)
        + u16::from((high >> 5) & 0x07)
        + 1;
    SensorAddress(full)
}

/// Resolves the record starting at store address `addr`
pub fn resolve_record<S: VariableStore + ?Sized>(store: &S, addr: u16) -> ResolvedPort {
    let port_type = PortType(store.read_byte(addr));
    let low = store.read_byte(addr.saturating_add(1));
    let high = store.read_byte(addr.saturating_add(2));
    ResolvedPort {
        address: sensor_address(low, high),
        port_type,
    }
}

/// Resolves the record of `port`
pub fn resolve<S: VariableStore + ?Sized>(store: &S, port: usize) -> ResolvedPort {
    resolve_record(store, record_addr(port))
}
