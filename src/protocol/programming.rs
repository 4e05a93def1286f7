//! Programming requests
//!
//! Configuration tools read and write the adapter's variable store with
//! addressed peer transfers. Every request that reaches this adapter gets
//! exactly one reply; requests for other adapters are ignored.

use tracing::{debug, info, trace};

use crate::core::{AdapterAddress, PortType, PROGRAMMING_ADDR_HIGH, TOTAL_NR_OF_PORTS};
use crate::port::OutputList;
use crate::store::{
    index_addr, VariableStore, FIRST_RECORD_INDEX, RECORD_LEN, SV_ADDR_NODE_ID_H,
    SV_ADDR_NODE_ID_L,
};
use super::message::{PeerXfer, SvCommand, REPLY_MARKER, VER_LOW};

/// Register value flagging that the adapter is in programming mode
const PROGRAMMING_MODE: u8 = 0x7F;

/// First register of a read reply
const READ_REPLY_TAG: u8 = 0x01;

/// Applies one peer transfer to the adapter state
///
/// Returns the reply frame when the request was addressed to this adapter,
/// `None` otherwise. Changes to the adapter address take effect before the
/// reply is assembled, so the reply already carries the new source address.
pub fn process_xfer<S: VariableStore + ?Sized>(
    request: &PeerXfer,
    identity: &mut AdapterAddress,
    store: &mut S,
    outputs: &mut OutputList,
) -> Option<PeerXfer> {
    if !identity.accepts(request.dst_low(), request.dst_high()) {
        trace!(
            dst_low = request.dst_low(),
            dst_high = request.dst_high(),
            "Peer transfer not for this adapter"
        );
        return None;
    }

    let [command, index, _mask, value] = request.request_regs();
    let data = match SvCommand::from(command) {
        SvCommand::Write => write(index, value, identity, store, outputs),
        SvCommand::Read => read(index, store),
        other => {
            debug!(?other, index, "Unhandled programming command");
            [0; 4]
        }
    };

    Some(PeerXfer::build(
        identity.low,
        request.src_low(),
        identity.high,
        [command, index, VER_LOW, REPLY_MARKER],
        data,
    ))
}

fn write<S: VariableStore + ?Sized>(
    index: u8,
    value: u8,
    identity: &mut AdapterAddress,
    store: &mut S,
    outputs: &mut OutputList,
) -> [u8; 4] {
    let records_end = FIRST_RECORD_INDEX as usize + RECORD_LEN as usize * TOTAL_NR_OF_PORTS;

    match index {
        0 => {
            // Some tools bump this value on every write cycle
            debug!(value = value & 0xFE, "Write to address-high slot ignored");
            [identity.high, 0, 0, 0]
        }
        1 => {
            identity.low = value;
            store.write_byte(SV_ADDR_NODE_ID_L, value);
            info!(identity = %*identity, "Adapter low address programmed");
            [PROGRAMMING_MODE, 0, 0, value]
        }
        2 => {
            if value != PROGRAMMING_ADDR_HIGH {
                identity.high = value;
                store.write_byte(SV_ADDR_NODE_ID_H, value);
                info!(identity = %*identity, "Adapter high address programmed");
            }
            [PROGRAMMING_MODE, 0, 0, PROGRAMMING_MODE]
        }
        i if (i as usize) < records_end => {
            let addr = index_addr(i);
            store.write_byte(addr, value);
            debug!(index = i, value, "Port record byte written");

            let is_type_byte = (i - FIRST_RECORD_INDEX) % RECORD_LEN == 0;
            if is_type_byte && PortType(value).is_output() {
                outputs.register(&*store, i);
            }
            [identity.high, 0, 0, store.read_byte(addr)]
        }
        i => {
            debug!(index = i, "Write outside the programmable range");
            [0; 4]
        }
    }
}

fn read<S: VariableStore + ?Sized>(index: u8, store: &S) -> [u8; 4] {
    let addr = index_addr(index);
    [
        READ_REPLY_TAG,
        store.read_byte(addr),
        store.read_byte(addr + 1),
        store.read_byte(addr + 2),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::checksum;
    use crate::protocol::message::OPC_PEER_XFER;
    use crate::store::{boot, record_addr, MemoryStore};

    const TOOL_ADDR: u8 = 0x50;

    fn request(dst_low: u8, dst_high: u8, command: u8, index: u8, value: u8) -> PeerXfer {
        PeerXfer::build(TOOL_ADDR, dst_low, dst_high, [command, index, 0, value], [0; 4])
    }

    fn booted() -> (AdapterAddress, MemoryStore, OutputList) {
        let mut store = MemoryStore::new();
        let report = boot(&mut store, b"TEST", 2).unwrap();
        (report.identity, store, OutputList::new())
    }

    #[test]
    fn test_read_record() {
        let (mut identity, mut store, mut outputs) = booted();
        store.write_byte(record_addr(0) + 1, 0x9A);

        let reply = process_xfer(&request(88, 1, 0x02, 3, 0), &mut identity, &mut store, &mut outputs).unwrap();
        let bytes = reply.as_bytes();

        assert_eq!(bytes[0], OPC_PEER_XFER);
        assert_eq!(bytes[1], 0x10);
        assert_eq!(bytes[2], 88);
        assert_eq!(bytes[3], TOOL_ADDR);
        assert_eq!(bytes[4], 1);
        assert_eq!(bytes[6], 0x02);
        assert_eq!(bytes[7], 3);
        assert_eq!(bytes[8], VER_LOW);
        assert_eq!(bytes[9], REPLY_MARKER);
        // 0x9A travels as 0x1A with its MSB in bit 2 of the packed byte
        assert_eq!(bytes[0x0A], 0x04);
        assert_eq!(&bytes[0x0B..0x0F], &[0x01, 0x0F, 0x1A, 0x00]);
        assert_eq!(reply.response_regs(), [0x01, 0x0F, 0x9A, 0x00]);
        assert!(checksum::verify(bytes));
    }

    #[test]
    fn test_command_zero_reads() {
        let (mut identity, mut store, mut outputs) = booted();
        let reply = process_xfer(&request(88, 1, 0x00, 6, 0), &mut identity, &mut store, &mut outputs).unwrap();
        assert_eq!(reply.as_bytes()[6], 0x00);
        assert_eq!(reply.response_regs(), [0x01, 0x0F, 0x00, 0x20]);
    }

    #[test]
    fn test_foreign_address_ignored() {
        let (mut identity, mut store, mut outputs) = booted();
        let before = store.clone();

        assert!(process_xfer(&request(200, 1, 0x01, 1, 45), &mut identity, &mut store, &mut outputs).is_none());
        assert!(process_xfer(&request(88, 3, 0x01, 1, 45), &mut identity, &mut store, &mut outputs).is_none());
        assert_eq!(store, before);
        assert_eq!(identity, AdapterAddress::new(1, 88));
    }

    #[test]
    fn test_broadcast_and_wildcard_accepted() {
        let (mut identity, mut store, mut outputs) = booted();
        assert!(process_xfer(&request(0, 1, 0x02, 3, 0), &mut identity, &mut store, &mut outputs).is_some());
        assert!(process_xfer(&request(88, 0x7F, 0x02, 3, 0), &mut identity, &mut store, &mut outputs).is_some());
        assert!(process_xfer(&request(0, 0x7F, 0x02, 3, 0), &mut identity, &mut store, &mut outputs).is_some());
    }

    #[test]
    fn test_write_low_address() {
        let (mut identity, mut store, mut outputs) = booted();
        let reply = process_xfer(&request(88, 1, 0x01, 1, 45), &mut identity, &mut store, &mut outputs).unwrap();

        assert_eq!(identity.low, 45);
        assert_eq!(store.read_byte(SV_ADDR_NODE_ID_L), 45);

        let bytes = reply.as_bytes();
        assert_eq!(bytes[2], 45);
        assert_eq!(bytes[3], TOOL_ADDR);
        assert_eq!(reply.response_regs(), [0x7F, 0, 0, 45]);

        // The old address no longer qualifies
        assert!(process_xfer(&request(88, 1, 0x02, 3, 0), &mut identity, &mut store, &mut outputs).is_none());
        assert!(process_xfer(&request(45, 1, 0x02, 3, 0), &mut identity, &mut store, &mut outputs).is_some());
    }

    #[test]
    fn test_write_high_address() {
        let (mut identity, mut store, mut outputs) = booted();
        let reply = process_xfer(&request(88, 1, 0x01, 2, 5), &mut identity, &mut store, &mut outputs).unwrap();
        assert_eq!(identity.high, 5);
        assert_eq!(store.read_byte(SV_ADDR_NODE_ID_H), 5);
        assert_eq!(reply.as_bytes()[4], 5);
        assert_eq!(reply.response_regs(), [0x7F, 0, 0, 0x7F]);

        // The wildcard value is never stored
        let reply = process_xfer(&request(88, 5, 0x01, 2, 0x7F), &mut identity, &mut store, &mut outputs).unwrap();
        assert_eq!(identity.high, 5);
        assert_eq!(store.read_byte(SV_ADDR_NODE_ID_H), 5);
        assert_eq!(reply.response_regs(), [0x7F, 0, 0, 0x7F]);
    }

    #[test]
    fn test_write_index_zero_is_noop() {
        let (mut identity, mut store, mut outputs) = booted();
        let before = store.clone();
        let reply = process_xfer(&request(88, 1, 0x01, 0, 3), &mut identity, &mut store, &mut outputs).unwrap();
        assert_eq!(identity, AdapterAddress::new(1, 88));
        assert_eq!(store, before);
        assert_eq!(reply.response_regs(), [1, 0, 0, 0]);
    }

    #[test]
    fn test_write_record_byte_with_msb() {
        let (mut identity, mut store, mut outputs) = booted();
        // Value 0xC4 arrives as 0x44 with bit 3 of the packed byte set
        let req = request(88, 1, 0x01, 4, 0xC4);
        assert_eq!(req.as_bytes()[5], 0x08);
        assert_eq!(req.as_bytes()[9], 0x44);

        let reply = process_xfer(&req, &mut identity, &mut store, &mut outputs).unwrap();
        assert_eq!(store.read_byte(index_addr(4)), 0xC4);
        assert_eq!(reply.as_bytes()[0x0A], 0x08);
        assert_eq!(reply.as_bytes()[0x0E], 0x44);
        assert_eq!(reply.response_regs(), [1, 0, 0, 0xC4]);
        assert!(outputs.slots().is_empty());
    }

    #[test]
    fn test_output_type_registers_output() {
        let (mut identity, mut store, mut outputs) = booted();
        process_xfer(&request(88, 1, 0x01, 6, 0x10), &mut identity, &mut store, &mut outputs).unwrap();

        assert_eq!(outputs.slots().len(), 1);
        assert_eq!(outputs.slots()[0].index, 6);
        assert!(outputs.take_changed());

        // Same value in a non-type byte does not register anything
        process_xfer(&request(88, 1, 0x01, 7, 0x10), &mut identity, &mut store, &mut outputs).unwrap();
        assert_eq!(outputs.slots().len(), 1);
        assert!(!outputs.take_changed());
    }

    #[test]
    fn test_repeated_output_write_sets_changed() {
        let (mut identity, mut store, mut outputs) = booted();
        let write = request(88, 1, 0x01, 6, 0x10);

        process_xfer(&write, &mut identity, &mut store, &mut outputs).unwrap();
        assert!(outputs.take_changed());

        process_xfer(&write, &mut identity, &mut store, &mut outputs).unwrap();
        assert!(outputs.take_changed());
        assert_eq!(outputs.slots().len(), 1);
    }

    #[test]
    fn test_write_past_records_is_noop() {
        let (mut identity, mut store, mut outputs) = booted();
        let before = store.clone();
        let reply = process_xfer(&request(88, 1, 0x01, 27, 9), &mut identity, &mut store, &mut outputs).unwrap();
        assert_eq!(store, before);
        assert_eq!(reply.response_regs(), [0; 4]);
    }

    #[test]
    fn test_masked_write_passthrough() {
        let (mut identity, mut store, mut outputs) = booted();
        let before = store.clone();
        let reply = process_xfer(&request(88, 1, 0x03, 4, 0x55), &mut identity, &mut store, &mut outputs).unwrap();
        assert_eq!(store, before);
        assert_eq!(reply.as_bytes()[6], 0x03);
        assert_eq!(reply.response_regs(), [0; 4]);
        assert!(checksum::verify(reply.as_bytes()));
    }
}
