//! Adapter module
//!
//! Ties the store, the ports and the programming handler together and
//! drives them from reader polls and inbound bus frames. The bus transport
//! and the card readers are external collaborators seen through the
//! traits below.

mod controller;
mod runner;

pub use self::controller::Adapter;
pub use self::runner::AdapterRunner;

use bytes::Bytes;
use tokio::sync::mpsc;

use crate::core::{Error, Result};

/// Source of card identifiers for one port
pub trait CardReader {
    /// Returns the identifier of the card on the reader, if any
    fn read_uid(&mut self) -> Result<Option<Vec<u8>>>;
}

impl<F> CardReader for F
where
    F: FnMut() -> Result<Option<Vec<u8>>>,
{
    fn read_uid(&mut self) -> Result<Option<Vec<u8>>> {
        self()
    }
}

/// Outbound side of the bus
///
/// Collision detection and retries belong to the implementation.
pub trait BusTransport {
    /// Sends a frame with the transport's default backoff
    fn send(&mut self, frame: &[u8]) -> Result<()>;

    /// Sends a frame waiting `backoff` bit times after the bus goes idle
    fn send_with_backoff(&mut self, frame: &[u8], backoff: u8) -> Result<()> {
        let _ = backoff;
        self.send(frame)
    }
}

/// Frame queued for the bus
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundFrame {
    /// Frame bytes including checksum
    pub bytes: Bytes,
    /// Requested backoff, `None` for the transport default
    pub backoff: Option<u8>,
}

/// Transport handing frames to a channel drained by the bus driver
#[derive(Debug, Clone)]
pub struct ChannelTransport {
    tx: mpsc::UnboundedSender<OutboundFrame>,
}

impl ChannelTransport {
    /// Creates a transport and the receiving end of its queue
    pub fn new() -> (Self, mpsc::UnboundedReceiver<OutboundFrame>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (ChannelTransport { tx }, rx)
    }

    fn queue(&self, frame: &[u8], backoff: Option<u8>) -> Result<()> {
        self.tx
            .send(OutboundFrame {
                bytes: Bytes::copy_from_slice(frame),
                backoff,
            })
            .map_err(|e| Error::transport(format!("Failed to queue frame: {}", e)))
    }
}

impl BusTransport for ChannelTransport {
    fn send(&mut self, frame: &[u8]) -> Result<()> {
        self.queue(frame, None)
    }

    fn send_with_backoff(&mut self, frame: &[u8], backoff: u8) -> Result<()> {
        self.queue(frame, Some(backoff))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_transport() {
        let (mut transport, mut rx) = ChannelTransport::new();
        transport.send(&[0x83, 0x7C]).unwrap();
        transport.send_with_backoff(&[0x82, 0x7D], 48).unwrap();

        let first = rx.try_recv().unwrap();
        assert_eq!(&first.bytes[..], &[0x83, 0x7C]);
        assert_eq!(first.backoff, None);

        let second = rx.try_recv().unwrap();
        assert_eq!(second.backoff, Some(48));
    }

    #[test]
    fn test_closed_channel() {
        let (mut transport, rx) = ChannelTransport::new();
        drop(rx);
        assert!(matches!(transport.send(&[0x83, 0x7C]), Err(Error::Transport(_))));
    }

    #[test]
    fn test_closure_reader() {
        let mut reads = vec![None, Some(vec![0x04, 0x11])].into_iter();
        let mut reader = move || -> Result<Option<Vec<u8>>> { Ok(reads.next().flatten()) };
        assert_eq!(reader.read_uid().unwrap(), None);
        assert_eq!(reader.read_uid().unwrap(), Some(vec![0x04, 0x11]));
    }
}
