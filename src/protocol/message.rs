use crate::core::{Error, Result, SensorAddress, Uid, UID_LEN};
use super::checksum;

/// Addressed peer-to-peer transfer opcode
pub const OPC_PEER_XFER: u8 = 0xE5;

/// Variable length sensor report opcode
pub const OPC_SENSOR_REPORT: u8 = 0xE4;

/// Length of a peer transfer frame
pub const PEER_XFER_LEN: usize = 16;

/// Length of a presence report frame
pub const REPORT_LEN: usize = 14;

/// Report type carried in byte 2 of a presence report
pub const REPORT_TYPE: u8 = 0x41;

/// Firmware version sent in programming replies
pub const VER_LOW: u8 = 0x01;

/// Filler byte sent after the version in programming replies
pub const REPLY_MARKER: u8 = 0x7B;

const REPORT_HEADER_LEN: usize = 5;
const REPORT_MSB_IDX: usize = REPORT_HEADER_LEN + UID_LEN;

/// System variable commands carried in the command register of a peer transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SvCommand {
    /// Write one byte
    Write,
    /// Read three consecutive bytes (also sent as command 0 by older tools)
    Read,
    /// Masked single byte write
    MaskedWrite,
    /// Four byte write
    Write4,
    /// Four byte read
    Read4,
    /// All devices identify themselves
    Discover,
    /// One device identifies itself
    Identify,
    /// Change the device address
    ChangeAddress,
    /// Reconfigure or reset the device
    Reconfigure,
    /// Anything else
    Unknown(u8),
}

impl From<u8> for SvCommand {
    fn from(byte: u8) -> Self {
        match byte {
            0x00 | 0x02 => SvCommand::Read,
            0x01 => SvCommand::Write,
            0x03 => SvCommand::MaskedWrite,
            0x05 => SvCommand::Write4,
            0x06 => SvCommand::Read4,
            0x07 => SvCommand::Discover,
            0x08 => SvCommand::Identify,
            0x09 => SvCommand::ChangeAddress,
            0x4F => SvCommand::Reconfigure,
            other => SvCommand::Unknown(other),
        }
    }
}

/// Restores the high bit of four co-transmitted registers
///
/// Bit `k` of `packed` becomes bit 7 of `regs[k]`.
pub fn unpack_msbs(packed: u8, regs: [u8; 4]) -> [u8; 4] {
    let mut out = regs;
    for (k, reg) in out.iter_mut().enumerate() {
        if packed & (1 << k) != 0 {
            *reg |= 0x80;
        }
    }
    out
}

/// Moves the high bit of four registers into a packed byte
///
/// Returns the packed byte and the registers with bit 7 cleared.
pub fn pack_msbs(regs: [u8; 4]) -> (u8, [u8; 4]) {
    let mut packed = 0u8;
    let mut out = regs;
    for (k, reg) in out.iter_mut().enumerate() {
        if *reg & 0x80 != 0 {
            packed |= 1 << k;
            *reg &= 0x7F;
        }
    }
    (packed, out)
}

/// 16 byte addressed peer transfer frame
///
/// Layout: opcode, length, src-low, dst-low, dst-high, packed MSBs of the
/// request registers, four request registers (command, index, mask, value),
/// packed MSBs of the response registers, four response registers, checksum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeerXfer([u8; PEER_XFER_LEN]);

impl PeerXfer {
    /// Wraps raw frame bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let frame: [u8; PEER_XFER_LEN] = bytes.try_into().map_err(|_| {
            Error::protocol(format!("Peer transfer must be {} bytes, got {}", PEER_XFER_LEN, bytes.len()))
        })?;
        if frame[0] != OPC_PEER_XFER {
            return Err(Error::protocol(format!("Not a peer transfer opcode: {:#04x}", frame[0])));
        }
        Ok(PeerXfer(frame))
    }

    /// Builds a sealed frame from its fields, packing register MSBs
    pub fn build(
        src_low: u8,
        dst_low: u8,
        dst_high: u8,
        request: [u8; 4],
        response: [u8; 4],
    ) -> Self {
        let mut frame = [0u8; PEER_XFER_LEN];
        frame[0x00] = OPC_PEER_XFER;
        frame[0x01] = PEER_XFER_LEN as u8;
        frame[0x02] = src_low;
        frame[0x03] = dst_low;
        frame[0x04] = dst_high;

        let (packed, regs) = pack_msbs(request);
        frame[0x05] = packed;
        frame[0x06..0x0A].copy_from_slice(&regs);

        let (packed, regs) = pack_msbs(response);
        frame[0x0A] = packed;
        frame[0x0B..0x0F].copy_from_slice(&regs);

        checksum::seal(&mut frame);
        PeerXfer(frame)
    }

    /// Source low address
    pub fn src_low(&self) -> u8 {
        self.0[0x02]
    }

    /// Destination low address
    pub fn dst_low(&self) -> u8 {
        self.0[0x03]
    }

    /// Destination high address
    pub fn dst_high(&self) -> u8 {
        self.0[0x04]
    }

    /// Request registers with their MSBs restored
    pub fn request_regs(&self) -> [u8; 4] {
        let mut regs = [0u8; 4];
        regs.copy_from_slice(&self.0[0x06..0x0A]);
        unpack_msbs(self.0[0x05], regs)
    }

    /// Response registers with their MSBs restored
    pub fn response_regs(&self) -> [u8; 4] {
        let mut regs = [0u8; 4];
        regs.copy_from_slice(&self.0[0x0B..0x0F]);
        unpack_msbs(self.0[0x0A], regs)
    }

    /// Raw frame bytes
    pub fn as_bytes(&self) -> &[u8; PEER_XFER_LEN] {
        &self.0
    }
}

/// Cached first five bytes of a port's presence report
///
/// Only the payload and checksum change per event, so the header and its
/// partial checksum are computed once per address change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportHeader {
    bytes: [u8; REPORT_HEADER_LEN],
    seed: u8,
}

impl ReportHeader {
    /// Creates the header for a sensor address
    pub fn new(address: SensorAddress) -> Self {
        let bytes = [
            OPC_SENSOR_REPORT,
            REPORT_LEN as u8,
            REPORT_TYPE,
            address.high(),
            address.low(),
        ];
        let seed = bytes.iter().fold(0xFF, |acc, b| acc ^ b);
        ReportHeader { bytes, seed }
    }

    /// Header bytes
    pub fn bytes(&self) -> &[u8; REPORT_HEADER_LEN] {
        &self.bytes
    }

    /// Builds the sealed report announcing `uid`
    pub fn report(&self, uid: &Uid) -> SensorReport {
        let mut frame = [0u8; REPORT_LEN];
        frame[..REPORT_HEADER_LEN].copy_from_slice(&self.bytes);

        let mut msbs = 0u8;
        for (k, byte) in uid.as_bytes().iter().enumerate() {
            frame[REPORT_HEADER_LEN + k] = byte & 0x7F;
            if byte & 0x80 != 0 {
                msbs |= 1 << k;
            }
        }
        frame[REPORT_MSB_IDX] = msbs;

        let sum = frame[REPORT_HEADER_LEN..REPORT_LEN - 1]
            .iter()
            .fold(self.seed, |acc, b| acc ^ b);
        frame[REPORT_LEN - 1] = sum;
        SensorReport(frame)
    }
}

impl Default for ReportHeader {
    fn default() -> Self {
        ReportHeader::new(SensorAddress::default())
    }
}

/// Presence report frame announcing a card on a sensor address
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorReport([u8; REPORT_LEN]);

impl SensorReport {
    /// Parses a report frame received from the bus
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let frame: [u8; REPORT_LEN] = bytes.try_into().map_err(|_| {
            Error::protocol(format!("Sensor report must be {} bytes, got {}", REPORT_LEN, bytes.len()))
        })?;
        if frame[0] != OPC_SENSOR_REPORT || frame[2] != REPORT_TYPE {
            return Err(Error::protocol("Not a presence report"));
        }
        Ok(SensorReport(frame))
    }

    /// Sensor address the report is for
    pub fn address(&self) -> SensorAddress {
        SensorAddress(((self.0[3] as u16) << 7) | self.0[4] as u16)
    }

    /// Identifier carried by the report, MSBs restored
    pub fn uid(&self) -> Uid {
        let msbs = self.0[REPORT_MSB_IDX];
        let mut uid = [0u8; UID_LEN];
        for (k, byte) in uid.iter_mut().enumerate() {
            *byte = self.0[REPORT_HEADER_LEN + k];
            if msbs & (1 << k) != 0 {
                *byte |= 0x80;
            }
        }
        Uid(uid)
    }

    /// Raw frame bytes
    pub fn as_bytes(&self) -> &[u8; REPORT_LEN] {
        &self.0
    }
}
