//! RFID2LN: proximity-card readers on a model-railway control bus
//! 
//! This library turns card presence on one or more readers into sensor
//! reports on the bus, and lets configuration tools reprogram the adapter
//! address and per-port sensor records over the same bus.
pub mod core;

pub mod adapter;
pub mod port;
pub mod protocol;
pub mod store;
pub mod util;

// Re-export commonly used items
pub use crate::core::{Error, Result};
pub use adapter::{Adapter, AdapterRunner, BusTransport, CardReader};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
