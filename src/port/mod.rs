//! Reader ports
//!
//! Each port couples one card reader with a sensor record in the variable
//! store. The port owns its presence state machine and the cached header
//! of its presence report.

pub mod outputs;
pub mod presence;
pub mod resolver;
pub mod signals;

pub use self::outputs::{OutputList, OutputSlot};
pub use self::presence::{PresenceEvent, PresenceState, PresenceTracker};
pub use self::resolver::{resolve, resolve_record, sensor_address, ResolvedPort};
pub use self::signals::PortSignals;

use crate::core::{PortType, SensorAddress, Uid};
use crate::protocol::message::{ReportHeader, SensorReport};
use crate::store::VariableStore;

/// One physical reader channel
#[derive(Debug, Clone)]
pub struct Port {
    index: usize,
    address: SensorAddress,
    port_type: PortType,
    header: ReportHeader,
    tracker: PresenceTracker,
}

impl Port {
    /// Creates an unresolved port
    pub fn new(index: usize) -> Self {
        Port {
            index,
            address: SensorAddress::default(),
            port_type: PortType::default(),
            header: ReportHeader::default(),
            tracker: PresenceTracker::new(),
        }
    }

    /// Port index
    pub fn index(&self) -> usize {
        self.index
    }

    /// Resolved sensor address
    pub fn address(&self) -> SensorAddress {
        self.address
    }

    /// Record type code
    pub fn port_type(&self) -> PortType {
        self.port_type
    }

    /// Cached report header
    pub fn header(&self) -> &ReportHeader {
        &self.header
    }

    /// Presence state machine
    pub fn tracker(&self) -> &PresenceTracker {
        &self.tracker
    }

    /// Re-derives address, type and report header from the store
    pub fn refresh<S: VariableStore + ?Sized>(&mut self, store: &S) {
        let resolved = resolve(store, self.index);
        if resolved.address != self.address {
            tracing::debug!(
                port = self.index,
                full = resolved.address.full(),
                high = resolved.address.high(),
                low = resolved.address.low(),
                "Sensor address resolved"
            );
        }
        self.address = resolved.address;
        self.port_type = resolved.port_type;
        self.header = ReportHeader::new(resolved.address);
    }

    /// Feeds a poll result and returns the report to send, if any
    pub fn observe(&mut self, read: Option<Uid>) -> (Option<PresenceEvent>, Option<SensorReport>) {
        let event = self.tracker.observe(read);
        let report = match event {
            Some(PresenceEvent::Detected(uid)) => Some(self.header.report(&uid)),
            _ => None,
        };
        (event, report)
    }
}
