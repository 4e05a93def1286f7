use bytes::Bytes;
use futures::{Stream, StreamExt};
use tokio::io::AsyncRead;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::codec::FramedRead;
use tracing::{debug, info, warn};

use crate::core::{Error, Result, NR_OF_RFID_PORTS};
use crate::protocol::LnCodec;
use crate::store::VariableStore;
use super::{Adapter, BusTransport, CardReader};

/// Cooperative main loop of the adapter
///
/// Services inbound bus frames as they arrive and polls the readers on a
/// fixed tick, all from one task.
pub struct AdapterRunner<S: VariableStore, T: BusTransport, const N: usize = NR_OF_RFID_PORTS> {
    adapter: Adapter<S, N>,
    readers: Vec<Box<dyn CardReader + Send>>,
    transport: T,
}

impl<S: VariableStore, T: BusTransport, const N: usize> AdapterRunner<S, T, N> {
    /// Creates a runner with one reader per port
    pub fn new(
        adapter: Adapter<S, N>,
        readers: Vec<Box<dyn CardReader + Send>>,
        transport: T,
    ) -> Result<Self> {
        if readers.len() != N {
            return Err(Error::config(format!("Expected {} readers, got {}", N, readers.len())));
        }
        Ok(AdapterRunner {
            adapter,
            readers,
            transport,
        })
    }

    /// Adapter being driven
    pub fn adapter(&self) -> &Adapter<S, N> {
        &self.adapter
    }

    /// Runs until `inbound` ends, returning the adapter
    pub async fn run<I>(mut self, mut inbound: I) -> Result<Adapter<S, N>>
    where
        I: Stream<Item = Result<Bytes>> + Unpin,
    {
        let mut ticker = time::interval(self.adapter.config().poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(identity = %self.adapter.identity(), "Adapter loop started");
        loop {
            tokio::select! {
                frame = inbound.next() => match frame {
                    Some(Ok(frame)) => {
                        if self.adapter.handle_frame(&frame, &mut self.transport) {
                            debug!(identity = %self.adapter.identity(), "Programming request answered");
                        }
                    }
                    Some(Err(e)) => {
                        warn!("Inbound bus stream failed: {}", e);
                        return Err(e);
                    }
                    None => break,
                },
                _ = ticker.tick() => {
                    self.adapter.poll_readers(&mut self.readers, &mut self.transport)?;
                }
            }
        }

        info!("Inbound bus stream closed, adapter loop stopped");
        Ok(self.adapter)
    }

    /// Runs with inbound frames split from a raw byte stream
    pub async fn run_with_reader<R>(self, reader: R) -> Result<Adapter<S, N>>
    where
        R: AsyncRead + Unpin,
    {
        self.run(FramedRead::new(reader, LnCodec::new())).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::adapter::ChannelTransport;
    use crate::core::AdapterConfig;
    use crate::protocol::checksum;
    use crate::protocol::message::{PeerXfer, SensorReport, OPC_PEER_XFER, OPC_SENSOR_REPORT};
    use crate::store::MemoryStore;

    fn readers(first: Option<Vec<u8>>) -> Vec<Box<dyn CardReader + Send>> {
        let empty: Box<dyn CardReader + Send> = Box::new(|| -> Result<Option<Vec<u8>>> { Ok(None) });
        let first: Box<dyn CardReader + Send> = Box::new(move || -> Result<Option<Vec<u8>>> { Ok(first.clone()) });
        vec![first, empty]
    }

    fn config() -> AdapterConfig {
        AdapterConfig {
            poll_interval: Duration::from_millis(5),
            ..Default::default()
        }
    }

    #[test]
    fn test_reader_count_checked() {
        let adapter: Adapter<MemoryStore> = Adapter::new(MemoryStore::new(), config()).unwrap();
        let (transport, _rx) = ChannelTransport::new();
        assert!(AdapterRunner::new(adapter, Vec::new(), transport).is_err());
    }

    #[tokio::test]
    async fn test_answers_programming_request() {
        let adapter: Adapter<MemoryStore> = Adapter::new(MemoryStore::new(), config()).unwrap();
        let (transport, mut rx) = ChannelTransport::new();
        let runner = AdapterRunner::new(adapter, readers(None), transport).unwrap();

        let request = PeerXfer::build(0x50, 88, 1, [0x01, 1, 0, 45], [0; 4]);
        let mut stream = Vec::new();
        // Noise and foreign traffic around the request
        stream.extend_from_slice(&[0x13, 0xB0, 0x01, 0x30, 0x7E]);
        stream.extend_from_slice(request.as_bytes());

        let mock = tokio_test::io::Builder::new().read(&stream).build();
        let adapter = runner.run_with_reader(mock).await.unwrap();
        assert_eq!(adapter.identity().low, 45);

        let mut replies = Vec::new();
        while let Ok(frame) = rx.try_recv() {
            if frame.bytes[0] == OPC_PEER_XFER {
                replies.push(frame);
            }
        }
        assert_eq!(replies.len(), 1);
        let reply = PeerXfer::from_bytes(&replies[0].bytes).unwrap();
        assert_eq!(reply.src_low(), 45);
        assert_eq!(reply.dst_low(), 0x50);
        assert!(checksum::verify(reply.as_bytes()));
    }

    #[tokio::test]
    async fn test_polls_until_stopped() {
        let adapter: Adapter<MemoryStore> = Adapter::new(MemoryStore::new(), config()).unwrap();
        let (transport, mut rx) = ChannelTransport::new();
        let runner = AdapterRunner::new(adapter, readers(Some(vec![0x04, 0x5A, 0xC1, 0x02])), transport).unwrap();

        let inbound = futures::stream::pending::<Result<Bytes>>();
        let outcome = time::timeout(Duration::from_millis(60), runner.run(inbound)).await;
        assert!(outcome.is_err());

        let mut reports = Vec::new();
        while let Ok(frame) = rx.try_recv() {
            assert_eq!(frame.bytes[0], OPC_SENSOR_REPORT);
            reports.push(SensorReport::from_bytes(&frame.bytes).unwrap());
        }
        // The card stays on the reader: one detection, no repeats
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].uid().as_bytes()[..4], [0x04, 0x5A, 0xC1, 0x02]);
    }

    #[tokio::test]
    async fn test_stream_error_stops_loop() {
        let adapter: Adapter<MemoryStore> = Adapter::new(MemoryStore::new(), config()).unwrap();
        let (transport, _rx) = ChannelTransport::new();
        let runner = AdapterRunner::new(adapter, readers(None), transport).unwrap();

        let inbound = futures::stream::iter(vec![Err(Error::transport("line break"))]);
        let result = runner.run(inbound).await;
        assert!(matches!(result, Err(Error::Transport(_))));
    }
}
