//! Protocol implementation module
//! 
//! This module defines the bus frames the adapter exchanges, the frame
//! checksum, stream framing and the programming request handler.

pub mod checksum;
pub mod codec;
pub mod message;
pub mod programming;

pub use self::codec::LnCodec;
pub use self::message::{PeerXfer, ReportHeader, SensorReport, SvCommand};
pub use self::programming::process_xfer;
