use std::time::Duration;

use bytes::Bytes;
use futures::{Stream, StreamExt};
use rfid2ln::adapter::{ChannelTransport, OutboundFrame};
use rfid2ln::core::AdapterConfig;
use rfid2ln::protocol::PeerXfer;
use rfid2ln::store::FileStore;
use rfid2ln::util::{hex_dump, init_tracing};
use rfid2ln::{Adapter, AdapterRunner, CardReader, Result};
use tokio::sync::mpsc::UnboundedReceiver;

/// Simulated reader: a card shows up after a few polls and leaves again
fn simulated_reader(uid: Vec<u8>, arrive: u32, leave: u32) -> Box<dyn CardReader + Send> {
    let mut polls = 0u32;
    Box::new(move || -> Result<Option<Vec<u8>>> {
        polls += 1;
        Ok((arrive..leave).contains(&polls).then(|| uid.clone()))
    })
}

async fn print_bus(mut rx: UnboundedReceiver<OutboundFrame>) {
    while let Some(frame) = rx.recv().await {
        println!("bus <- {} (backoff {:?})", hex_dump(&frame.bytes), frame.backoff);
    }
}

/// Programming requests a configuration tool would send, spaced in time
fn ticking_requests(requests: Vec<PeerXfer>, gap: Duration) -> impl Stream<Item = Result<Bytes>> + Unpin {
    Box::pin(futures::stream::iter(requests).then(move |request| async move {
        tokio::time::sleep(gap).await;
        println!("bus -> {}", hex_dump(request.as_bytes()));
        Ok(Bytes::copy_from_slice(request.as_bytes()))
    }))
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing(tracing::Level::INFO);

    let config: AdapterConfig = serde_json::from_str(
        r#"{"poll_interval":100,"backoff_max":56,"reader_mode":"polling",
            "verify_inbound_checksum":false,"board_version":"RFID2LN1"}"#,
    )
    .map_err(|e| rfid2ln::Error::config(e.to_string()))?;

    let store = FileStore::open(std::env::temp_dir().join("rfid2ln-demo.bin"))?;
    let adapter: Adapter<FileStore> = Adapter::new(store, config)?;
    println!("Adapter address: {}", adapter.identity());
    for port in adapter.ports() {
        println!(
            "Port {}: sensor {} (high {}, low {})",
            port.index(),
            port.address().full(),
            port.address().high(),
            port.address().low()
        );
    }

    let (transport, rx) = ChannelTransport::new();
    tokio::spawn(print_bus(rx));

    let readers = vec![
        simulated_reader(vec![0x04, 0x8A, 0x21, 0x5C, 0xB2, 0x3F, 0x80], 3, 8),
        simulated_reader(vec![0xDE, 0xAD, 0xBE, 0xEF], 6, 20),
    ];
    let runner = AdapterRunner::new(adapter, readers, transport)?;

    // Read port 0's record, then set port 1's address-low byte to 5
    let requests = vec![
        PeerXfer::build(0x50, 88, 1, [0x02, 3, 0, 0], [0; 4]),
        PeerXfer::build(0x50, 88, 1, [0x01, 7, 0, 5], [0; 4]),
    ];
    let adapter = runner
        .run(ticking_requests(requests, Duration::from_millis(700)))
        .await?;

    println!("Port 1 now reports as sensor {}", adapter.port(1)?.address().full());
    Ok(())
}
