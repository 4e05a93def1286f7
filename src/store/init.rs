use tracing::{debug, info};

use crate::core::{AdapterAddress, PortType, Result};
use super::{
    record_addr, VariableStore, DEFAULT_SERIAL, STORE_SIZE, SV_ADDR_NODE_ID_H,
    SV_ADDR_NODE_ID_L, SV_ADDR_SERIAL_NUMBER_H, SV_ADDR_SERIAL_NUMBER_L,
};

/// Outcome of bringing up the variable store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BootReport {
    /// Adapter address in effect after boot
    pub identity: AdapterAddress,
    /// Whether factory defaults were written
    pub initialized: bool,
}

fn marker_addr(marker_len: usize, i: usize) -> u16 {
    let start = (STORE_SIZE - 1).saturating_sub(marker_len);
    (start + i) as u16
}

/// Checks the boot marker and loads or initialises the store
///
/// A store whose marker does not match has never been used by this
/// adapter: the marker, factory address, serial number and one input
/// record per port are written. Otherwise the stored address is loaded.
pub fn boot<S: VariableStore + ?Sized>(
    store: &mut S,
    marker: &[u8],
    port_count: usize,
) -> Result<BootReport> {
    let marker_ok = marker
        .iter()
        .enumerate()
        .all(|(i, b)| store.read_byte(marker_addr(marker.len(), i)) == *b);

    if marker_ok {
        let identity = AdapterAddress::new(
            store.read_byte(SV_ADDR_NODE_ID_H),
            store.read_byte(SV_ADDR_NODE_ID_L),
        );
        info!(%identity, ports = port_count, "Variable store loaded");
        return Ok(BootReport {
            identity,
            initialized: false,
        });
    }

    info!("First run, writing default values to variable store");
    for (i, b) in marker.iter().enumerate() {
        store.write_byte(marker_addr(marker.len(), i), *b);
    }

    let identity = AdapterAddress::default();
    store.write_byte(SV_ADDR_NODE_ID_H, identity.high);
    store.write_byte(SV_ADDR_NODE_ID_L, identity.low);
    store.write_byte(SV_ADDR_SERIAL_NUMBER_H, DEFAULT_SERIAL.0);
    store.write_byte(SV_ADDR_SERIAL_NUMBER_L, DEFAULT_SERIAL.1);

    for port in 0..port_count {
        let addr = record_addr(port);
        // Sub-address bits in the high byte give port 0 -> 1, port 1 -> 2, ...
        let high = ((port as u8) & 0x07) << 5;
        store.write_byte(addr + 2, high);
        store.write_byte(addr + 1, 0);
        store.write_byte(addr, PortType::INPUT.0);
        debug!(port, high, "Default port record written");
    }

    store.commit()?;
    Ok(BootReport {
        identity,
        initialized: true,
    })
}
