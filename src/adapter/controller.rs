use std::sync::Arc;

use tracing::{debug, info, trace, warn};

use crate::core::{
    AdapterAddress, AdapterConfig, Error, ReaderMode, Result, Uid, NR_OF_RFID_PORTS,
    TOTAL_NR_OF_PORTS,
};
use crate::port::{OutputList, Port, PortSignals, PresenceEvent};
use crate::protocol::checksum;
use crate::protocol::message::{PeerXfer, SensorReport, OPC_PEER_XFER, PEER_XFER_LEN};
use crate::protocol::programming::process_xfer;
use crate::store::VariableStore;
use crate::util;
use super::{BusTransport, CardReader};

/// The adapter: identity, variable store and `N` reader ports
pub struct Adapter<S: VariableStore, const N: usize = NR_OF_RFID_PORTS> {
    config: AdapterConfig,
    identity: AdapterAddress,
    store: S,
    ports: [Port; N],
    outputs: OutputList,
    signals: Arc<PortSignals>,
}

impl<S: VariableStore, const N: usize> Adapter<S, N> {
    /// Boots the adapter from `store`
    ///
    /// Initialises the store with factory defaults if its boot marker does
    /// not match `config.board_version`, then resolves every port.
    pub fn new(mut store: S, config: AdapterConfig) -> Result<Self> {
        config.validate()?;
        if N == 0 || N > TOTAL_NR_OF_PORTS {
            return Err(Error::config(format!(
                "Port count must be between 1 and {}, got {}",
                TOTAL_NR_OF_PORTS, N
            )));
        }

        let report = crate::store::boot(&mut store, config.board_version.as_bytes(), N)?;
        let mut adapter = Adapter {
            identity: report.identity,
            store,
            ports: std::array::from_fn(Port::new),
            outputs: OutputList::new(),
            signals: Arc::new(PortSignals::new(N)),
            config,
        };
        adapter.refresh_ports();

        info!(
            identity = %adapter.identity,
            ports = N,
            mode = ?adapter.config.reader_mode,
            "Adapter ready"
        );
        Ok(adapter)
    }

    /// Current bus address
    pub fn identity(&self) -> AdapterAddress {
        self.identity
    }

    /// Configuration in effect
    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    /// Variable store
    pub fn store(&self) -> &S {
        &self.store
    }

    /// All ports
    pub fn ports(&self) -> &[Port; N] {
        &self.ports
    }

    /// One port
    pub fn port(&self, index: usize) -> Result<&Port> {
        self.ports.get(index).ok_or(Error::InvalidPort(index))
    }

    /// Output objects registered through programming
    pub fn outputs(&self) -> &OutputList {
        &self.outputs
    }

    /// Reads and clears the "outputs changed" flag
    pub fn take_outputs_changed(&mut self) -> bool {
        self.outputs.take_changed()
    }

    /// Ready flags for interrupt-driven readers
    pub fn signals(&self) -> Arc<PortSignals> {
        Arc::clone(&self.signals)
    }

    /// Backoff used when answering programming requests
    pub fn reply_backoff(&self) -> u8 {
        util::reply_backoff(self.config.backoff_max, self.identity.low)
    }

    /// Re-derives every port's address and the output list from the store
    pub fn refresh_ports(&mut self) {
        for port in self.ports.iter_mut() {
            port.refresh(&self.store);
        }
        self.outputs.refresh(&self.store);
    }

    /// Applies an inbound bus frame
    ///
    /// Returns the reply when the frame was a programming request for this
    /// adapter. Every other frame is ignored.
    pub fn process_frame(&mut self, frame: &[u8]) -> Option<PeerXfer> {
        if frame.len() != PEER_XFER_LEN || frame[0] != OPC_PEER_XFER {
            trace!(opcode = frame.first().copied(), len = frame.len(), "Ignoring frame");
            return None;
        }
        if self.config.verify_inbound_checksum && !checksum::verify(frame) {
            warn!("Dropping peer transfer with bad checksum");
            return None;
        }

        let request = match PeerXfer::from_bytes(frame) {
            Ok(request) => request,
            Err(e) => {
                debug!("Malformed peer transfer: {}", e);
                return None;
            }
        };

        let reply = process_xfer(&request, &mut self.identity, &mut self.store, &mut self.outputs)?;
        if let Err(e) = self.store.commit() {
            warn!("Failed to persist variable store: {}", e);
        }
        self.refresh_ports();
        Some(reply)
    }

    /// Applies an inbound frame and sends the reply, if any
    ///
    /// Returns whether a reply was produced.
    pub fn handle_frame<T: BusTransport + ?Sized>(&mut self, frame: &[u8], transport: &mut T) -> bool {
        let reply = match self.process_frame(frame) {
            Some(reply) => reply,
            None => return false,
        };

        let backoff = self.reply_backoff();
        if let Err(e) = transport.send_with_backoff(reply.as_bytes(), backoff) {
            warn!("Failed to send programming reply: {}", e);
        }
        true
    }

    /// Feeds one poll result for `port` and returns the report to send
    pub fn observe(&mut self, port: usize, read: Option<Uid>) -> Result<Option<SensorReport>> {
        let entry = self.ports.get_mut(port).ok_or(Error::InvalidPort(port))?;
        let (event, report) = entry.observe(read);
        match event {
            Some(PresenceEvent::Detected(uid)) => {
                info!(port, uid = %uid, addr = entry.address().full(), "Card detected");
            }
            Some(PresenceEvent::Removed(uid)) => {
                info!(port, uid = %uid, "Card removed");
            }
            None => {}
        }
        Ok(report)
    }

    /// Reads `reader`, updates `port` and sends its report, if any
    pub fn poll_port<R, T>(
        &mut self,
        port: usize,
        reader: &mut R,
        transport: &mut T,
    ) -> Result<Option<SensorReport>>
    where
        R: CardReader + ?Sized,
        T: BusTransport + ?Sized,
    {
        let read = match reader.read_uid() {
            Ok(read) => read.map(|bytes| Uid::from_slice(&bytes)),
            Err(e) => {
                // Counts as an empty read so a failing reader drops its card
                warn!(port, "Reader failed: {}", e);
                None
            }
        };

        let report = self.observe(port, read)?;
        if let Some(report) = &report {
            if let Err(e) = transport.send(report.as_bytes()) {
                warn!(port, "Failed to send presence report: {}", e);
            }
        }
        Ok(report)
    }

    /// Runs one poll cycle over all ports
    ///
    /// In interrupt mode only ports whose ready flag was raised are read.
    /// Returns the number of reports sent.
    pub fn poll_readers<T: BusTransport + ?Sized>(
        &mut self,
        readers: &mut [Box<dyn CardReader + Send>],
        transport: &mut T,
    ) -> Result<usize> {
        if readers.len() != N {
            return Err(Error::config(format!("Expected {} readers, got {}", N, readers.len())));
        }

        let mut sent = 0;
        for (port, reader) in readers.iter_mut().enumerate() {
            if self.config.reader_mode == ReaderMode::Interrupt && !self.signals.take(port) {
                continue;
            }
            if self.poll_port(port, &mut **reader, transport)?.is_some() {
                sent += 1;
            }
        }
        Ok(sent)
    }
}
